//! The rewards engine: sequences cap checks, ledger appends, vesting
//! sweeps, commission cascades, and withdrawal gating over the store and
//! the external provider seams.

use contracts::{
    CommissionDetail, EligibilityReport, EntryKind, EntryStatus, LedgerEntryRecord,
    PlatformConfig, ReferralStats, TaskState, UserProfile, WithdrawalReceipt, WithdrawalRequest,
    SCHEMA_VERSION_V1,
};

use crate::balance::{summarize, unmet_gates};
use crate::clock::{day_key, Clock};
use crate::commission::{commission_source_ref, plan_cascade};
use crate::error::CoreError;
use crate::providers::{CompletionVerifier, PayoutExecutor, UserDirectory};
use crate::store::{NewEntry, SqliteLedgerStore};
use crate::tasks::TaskCatalog;
use crate::vesting::VestingPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStart {
    pub task_id: String,
    pub attempt: i64,
    pub state: TaskState,
    pub expires_at: i64,
    pub potential_reward: i64,
    pub provider_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCompletion {
    pub task_id: String,
    pub attempt: i64,
    pub entry_id: i64,
    pub amount: i64,
    pub entry_status: EntryStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyBonusClaim {
    pub entry_id: i64,
    pub amount: i64,
    pub streak: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VipPurchase {
    pub entry_id: i64,
    pub new_level: u8,
    pub price: i64,
    pub commission_entry_ids: Vec<i64>,
}

pub struct RewardsEngine {
    store: SqliteLedgerStore,
    config: PlatformConfig,
    catalog: TaskCatalog,
    vesting: VestingPolicy,
    clock: Box<dyn Clock>,
    directory: Box<dyn UserDirectory>,
    verifier: Box<dyn CompletionVerifier>,
    payout: Box<dyn PayoutExecutor>,
}

impl RewardsEngine {
    pub fn new(
        store: SqliteLedgerStore,
        config: PlatformConfig,
        catalog: TaskCatalog,
        clock: Box<dyn Clock>,
        directory: Box<dyn UserDirectory>,
        verifier: Box<dyn CompletionVerifier>,
        payout: Box<dyn PayoutExecutor>,
    ) -> Self {
        let vesting = VestingPolicy::from_config(&config);
        Self {
            store,
            config,
            catalog,
            vesting,
            clock,
            directory,
            verifier,
            payout,
        }
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    fn now(&self) -> i64 {
        self.clock.now_unix()
    }

    fn today(&self) -> i64 {
        day_key(self.now(), self.config.utc_offset_secs)
    }

    fn profile(&self, user_id: &str) -> Result<UserProfile, CoreError> {
        match self.directory.get_user(user_id)? {
            Some(profile) => Ok(profile),
            None => Err(CoreError::UserNotFound(user_id.to_string())),
        }
    }

    fn ensure_unfrozen(&self, user_id: &str) -> Result<(), CoreError> {
        if self.store.is_frozen(user_id)? {
            return Err(CoreError::AccountFrozen(user_id.to_string()));
        }
        Ok(())
    }

    fn append_entry(
        &mut self,
        user_id: &str,
        amount: i64,
        kind: EntryKind,
        source_ref_id: String,
        description: String,
        commission: Option<CommissionDetail>,
    ) -> Result<(i64, EntryStatus), CoreError> {
        let now = self.now();
        let (status, vested_at) = self.vesting.initial_state(kind, now);
        let entry_id = self.store.append(&NewEntry {
            user_id: user_id.to_string(),
            amount,
            kind,
            source_ref_id,
            status,
            description,
            commission,
            created_at: now,
            vested_at,
        })?;
        Ok((entry_id, status))
    }

    /// Record the one-hop flat bonus for a referred signup. Returns `None`
    /// when the new user has no referrer or the bonus was already paid
    /// (retry no-op).
    pub fn record_signup(&mut self, new_user_id: &str) -> Result<Option<i64>, CoreError> {
        let profile = self.profile(new_user_id)?;
        let Some(referrer_id) = profile.referrer_id.clone() else {
            return Ok(None);
        };
        // A dangling referral code pays nobody rather than minting credits
        // for a ghost account, and never fails the signup itself.
        if self.directory.get_user(&referrer_id)?.is_none() {
            return Ok(None);
        }
        if self.store.is_frozen(&referrer_id)? {
            return Ok(None);
        }

        let source_ref = format!("signup:{new_user_id}");
        let description = format!("signup bonus for referring {new_user_id}");
        match self.append_entry(
            &referrer_id,
            self.config.signup_bonus,
            EntryKind::ReferralSignupBonus,
            source_ref,
            description,
            None,
        ) {
            Ok((entry_id, _)) => Ok(Some(entry_id)),
            Err(CoreError::DuplicateSourceRef) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// Begin a task attempt. Re-issues the current attempt if one is still
    /// live, so a double-tap on the UI does not burn the daily limit.
    pub fn start_task(&mut self, user_id: &str, task_id: &str) -> Result<TaskStart, CoreError> {
        self.ensure_unfrozen(user_id)?;
        let profile = self.profile(user_id)?;
        let task = self
            .catalog
            .get(task_id)
            .cloned()
            .ok_or_else(|| CoreError::TaskUnavailable(format!("unknown task {task_id}")))?;

        let now = self.now();
        let today = self.today();
        let potential_reward = task.base_reward * self.config.vip_multiplier(profile.vip_level);

        if let Some(instance) = self.store.active_instance(user_id, task_id)? {
            if instance.expires_at > now {
                return Ok(TaskStart {
                    task_id: task.task_id,
                    attempt: instance.attempt,
                    state: instance.state,
                    expires_at: instance.expires_at,
                    potential_reward,
                    provider_url: task.provider_url,
                });
            }
            self.store.set_instance_state(
                user_id,
                task_id,
                instance.attempt,
                TaskState::Expired,
                None,
            )?;
        }

        let completed = self.store.completions_on_day(user_id, task_id, today)?;
        if completed >= task.daily_limit {
            return Err(CoreError::TaskUnavailable(format!(
                "daily limit of {} reached for {task_id}",
                task.daily_limit
            )));
        }

        // Non-reserving peek: the reservation itself happens at completion.
        let cap = self.config.daily_cap(profile.vip_level);
        let earned = self.store.daily_totals(user_id, today)?.credits_earned;
        let remaining = (cap - earned).max(0);
        if potential_reward > remaining {
            return Err(CoreError::DailyCapExceeded { remaining });
        }

        let instance =
            self.store
                .insert_instance(user_id, task_id, now, now + task.expiry_secs)?;

        Ok(TaskStart {
            task_id: task.task_id,
            attempt: instance.attempt,
            state: instance.state,
            expires_at: instance.expires_at,
            potential_reward,
            provider_url: task.provider_url,
        })
    }

    /// Validate a claimed completion, reserve cap headroom, and credit the
    /// reward. Safe to retry: a re-run after a partial failure finds the
    /// existing entry and finishes the instance instead of double-paying.
    pub fn complete_task(
        &mut self,
        user_id: &str,
        task_id: &str,
        proof: &str,
    ) -> Result<TaskCompletion, CoreError> {
        self.ensure_unfrozen(user_id)?;
        let profile = self.profile(user_id)?;
        let task = self
            .catalog
            .get(task_id)
            .cloned()
            .ok_or_else(|| CoreError::TaskUnavailable(format!("unknown task {task_id}")))?;

        let instance = self
            .store
            .latest_instance(user_id, task_id)?
            .ok_or_else(|| CoreError::TaskUnavailable(format!("{task_id} was never started")))?;

        match instance.state {
            TaskState::Completed => return Err(CoreError::AlreadyCompleted),
            TaskState::Cancelled => {
                return Err(CoreError::TaskUnavailable(format!(
                    "{task_id} attempt was cancelled"
                )))
            }
            TaskState::Expired => return Err(CoreError::TaskExpired),
            TaskState::Pending | TaskState::InProgress => {}
        }

        let now = self.now();
        let today = self.today();
        if now > instance.expires_at {
            self.store.set_instance_state(
                user_id,
                task_id,
                instance.attempt,
                TaskState::Expired,
                None,
            )?;
            return Err(CoreError::TaskExpired);
        }

        let source_ref = format!("task:{task_id}:a{}", instance.attempt);

        // Retry path: the credit already landed but the instance was left
        // in progress (e.g. a crash between append and state update).
        if let Some(existing) =
            self.store
                .entry_by_source(user_id, EntryKind::TaskCompletion, &source_ref)?
        {
            self.store.set_instance_state(
                user_id,
                task_id,
                instance.attempt,
                TaskState::Completed,
                Some(today),
            )?;
            return Ok(TaskCompletion {
                task_id: task.task_id,
                attempt: instance.attempt,
                entry_id: existing.entry_id,
                amount: existing.amount,
                entry_status: existing.status,
            });
        }

        // Provider verification happens before any write; a provider error
        // leaves the instance in progress so the caller can retry.
        if !self.verifier.validate_completion(&task, proof)? {
            return Err(CoreError::ProofInvalid);
        }

        let reward = task.base_reward * self.config.vip_multiplier(profile.vip_level);
        let cap = self.config.daily_cap(profile.vip_level);
        let outcome =
            self.store
                .try_reserve(user_id, today, reward, cap, task.category.is_ad())?;
        if !outcome.accepted {
            return Err(CoreError::DailyCapExceeded {
                remaining: outcome.remaining,
            });
        }

        let description = format!("completed {}", task.title);
        let (entry_id, entry_status) = self.append_entry(
            user_id,
            reward,
            EntryKind::TaskCompletion,
            source_ref.clone(),
            description,
            None,
        )?;

        self.store.set_instance_state(
            user_id,
            task_id,
            instance.attempt,
            TaskState::Completed,
            Some(today),
        )?;

        // Cascades fire only on settled amounts; with a zero vesting delay
        // the entry is already vested and propagates inline.
        if entry_status == EntryStatus::Vested {
            self.propagate_for(user_id, reward, &source_ref)?;
        }

        Ok(TaskCompletion {
            task_id: task.task_id,
            attempt: instance.attempt,
            entry_id,
            amount: reward,
            entry_status,
        })
    }

    pub fn cancel_task(&mut self, user_id: &str, task_id: &str) -> Result<(), CoreError> {
        let instance = self
            .store
            .latest_instance(user_id, task_id)?
            .ok_or_else(|| CoreError::TaskUnavailable(format!("{task_id} was never started")))?;

        match instance.state {
            TaskState::Pending | TaskState::InProgress => {
                self.store.set_instance_state(
                    user_id,
                    task_id,
                    instance.attempt,
                    TaskState::Cancelled,
                    None,
                )?;
                Ok(())
            }
            TaskState::Completed => Err(CoreError::AlreadyCompleted),
            TaskState::Expired => Err(CoreError::TaskExpired),
            TaskState::Cancelled => Ok(()),
        }
    }

    /// Daily check-in bonus: once per platform day, streak-scaled, vests
    /// immediately. The once-per-day rule is the store's uniqueness
    /// invariant on `daily:{day_key}`.
    pub fn claim_daily_bonus(&mut self, user_id: &str) -> Result<DailyBonusClaim, CoreError> {
        self.ensure_unfrozen(user_id)?;
        let profile = self.profile(user_id)?;

        let today = self.today();
        let amount = self.config.daily_bonus_base + i64::from(profile.streak.min(10));
        let (entry_id, _) = self.append_entry(
            user_id,
            amount,
            EntryKind::DailyBonus,
            format!("daily:{today}"),
            "daily check-in bonus".to_string(),
            None,
        )?;

        let streak = self.directory.increment_streak(user_id)?;

        Ok(DailyBonusClaim {
            entry_id,
            amount,
            streak,
        })
    }

    /// Walk the referrer chain and append one commission entry per hop.
    /// Idempotent per originating ref via the store uniqueness invariant.
    fn propagate_for(
        &mut self,
        origin_user_id: &str,
        original_amount: i64,
        origin_source_ref: &str,
    ) -> Result<Vec<i64>, CoreError> {
        let mut chain = Vec::new();
        // The sweep runs across all users; an earner no longer known to the
        // directory simply has no chain to pay.
        let mut cursor = self
            .directory
            .get_user(origin_user_id)?
            .and_then(|profile| profile.referrer_id);
        while let Some(referrer_id) = cursor {
            let Some(profile) = self.directory.get_user(&referrer_id)? else {
                break;
            };
            chain.push(referrer_id);
            if chain.len() >= usize::from(crate::commission::MAX_COMMISSION_DEPTH) {
                break;
            }
            cursor = profile.referrer_id;
        }

        let planned = plan_cascade(&chain, original_amount, &self.config);
        let mut entry_ids = Vec::with_capacity(planned.len());
        for commission in planned {
            // Frozen accounts take no new credits; the hop is dropped, same
            // as for signup bonuses.
            if self.store.is_frozen(&commission.recipient_id)? {
                continue;
            }
            let source_ref =
                commission_source_ref(origin_user_id, origin_source_ref, commission.level);
            let description = format!(
                "level {} commission on {original_amount} earned by {origin_user_id}",
                commission.level
            );
            let detail = CommissionDetail {
                from_user_id: origin_user_id.to_string(),
                level: commission.level,
                percent: commission.percent,
                original_amount,
            };
            match self.append_entry(
                &commission.recipient_id,
                commission.amount,
                commission.kind,
                source_ref,
                description,
                Some(detail),
            ) {
                Ok((entry_id, _)) => entry_ids.push(entry_id),
                // Partial re-run of an earlier propagation.
                Err(CoreError::DuplicateSourceRef) => continue,
                Err(other) => return Err(other),
            }
        }

        Ok(entry_ids)
    }

    /// Pull-based vesting sweep. Newly settled task completions trigger
    /// their commission cascades here, so commissions are only ever
    /// computed on settled originating amounts.
    ///
    /// Per entry the cascade runs before the vest mark: a failure mid-sweep
    /// leaves the entry pending and the next sweep retries both steps, with
    /// the unique commission refs turning any re-run into a no-op.
    pub fn sweep_vesting(&mut self) -> Result<Vec<LedgerEntryRecord>, CoreError> {
        let now = self.now();
        let mut vested = Vec::new();

        for (kind, delay) in self.vesting.swept_kinds() {
            if delay <= 0 {
                continue;
            }
            for record in self.store.due_pending(kind, now - delay)? {
                if record.kind == EntryKind::TaskCompletion {
                    self.propagate_for(&record.user_id, record.amount, &record.source_ref_id)?;
                }
                self.store.mark_vested(record.entry_id, now)?;
                vested.push(LedgerEntryRecord {
                    status: EntryStatus::Vested,
                    vested_at: Some(now),
                    ..record
                });
            }
        }

        Ok(vested)
    }

    pub fn get_balance(&mut self, user_id: &str) -> Result<contracts::BalanceSummary, CoreError> {
        let profile = self.profile(user_id)?;
        self.sweep_vesting()?;

        let components = self.store.balance_components(user_id)?;
        self.check_consistency(user_id, components.vested_net)?;

        let daily = self.store.daily_totals(user_id, self.today())?;
        Ok(summarize(&profile, components, daily, &self.config))
    }

    pub fn history(
        &mut self,
        user_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<LedgerEntryRecord>, usize), CoreError> {
        self.profile(user_id)?;
        self.sweep_vesting()?;
        Ok(self.store.list_by_user(user_id, offset, limit)?)
    }

    pub fn referral_stats(&mut self, user_id: &str) -> Result<ReferralStats, CoreError> {
        self.profile(user_id)?;
        Ok(ReferralStats {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            user_id: user_id.to_string(),
            level1: self
                .store
                .referral_level_stats(user_id, EntryKind::ReferralCommissionL1)?,
            level2: self
                .store
                .referral_level_stats(user_id, EntryKind::ReferralCommissionL2)?,
            level3: self
                .store
                .referral_level_stats(user_id, EntryKind::ReferralCommissionL3)?,
        })
    }

    pub fn check_eligibility(&mut self, user_id: &str) -> Result<EligibilityReport, CoreError> {
        let profile = self.profile(user_id)?;
        self.sweep_vesting()?;

        let components = self.store.balance_components(user_id)?;
        self.check_consistency(user_id, components.vested_net)?;

        let reasons = unmet_gates(&profile, components.vested_net, &self.config);
        Ok(EligibilityReport {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            user_id: user_id.to_string(),
            eligible: reasons.is_empty(),
            reasons,
        })
    }

    /// Withdrawal: gates, then balance check, then debit-before-payout.
    /// The reserving debit lands before the gateway call so racing requests
    /// cannot double-spend; a failed payout reverses the debit.
    pub fn request_withdrawal(
        &mut self,
        user_id: &str,
        request: &WithdrawalRequest,
    ) -> Result<WithdrawalReceipt, CoreError> {
        self.ensure_unfrozen(user_id)?;
        let profile = self.profile(user_id)?;

        if request.amount <= 0 {
            return Err(CoreError::Validation(format!(
                "withdrawal amount must be positive, got {}",
                request.amount
            )));
        }
        if request.account_details.trim().is_empty() {
            return Err(CoreError::Validation(
                "account details must not be empty".to_string(),
            ));
        }

        self.sweep_vesting()?;
        let components = self.store.balance_components(user_id)?;
        self.check_consistency(user_id, components.vested_net)?;
        let withdrawable = components.vested_net;

        let reasons = unmet_gates(&profile, withdrawable, &self.config);
        if !reasons.is_empty() {
            return Err(CoreError::EligibilityNotMet(reasons));
        }

        if request.amount > withdrawable {
            return Err(CoreError::InsufficientBalance {
                withdrawable,
                requested: request.amount,
            });
        }

        let seq = self.store.withdrawal_seq(user_id)?;
        let source_ref = format!("wd:{seq:06}");
        let (debit_id, _) = self.append_entry(
            user_id,
            -request.amount,
            EntryKind::WithdrawalDebit,
            source_ref.clone(),
            format!("withdrawal of {} via {:?}", request.amount, request.method),
            None,
        )?;

        match self.payout.execute_payout(
            user_id,
            request.amount,
            request.method,
            &request.account_details,
        ) {
            Ok(transaction_id) => Ok(WithdrawalReceipt {
                schema_version: SCHEMA_VERSION_V1.to_string(),
                user_id: user_id.to_string(),
                accepted: true,
                amount: request.amount,
                withdrawal_ref: Some(source_ref),
                provider_transaction_id: Some(transaction_id),
                reasons: Vec::new(),
            }),
            Err(failure) => {
                // Release the reservation before surfacing the failure.
                self.store.reverse(debit_id)?;
                Err(CoreError::Provider {
                    message: failure.message,
                    retryable: failure.retryable,
                })
            }
        }
    }

    /// Buy a VIP tier from the available balance. The debit settles
    /// immediately, so the purchase cascades commissions inline.
    pub fn purchase_vip(
        &mut self,
        user_id: &str,
        target_level: u8,
    ) -> Result<VipPurchase, CoreError> {
        self.ensure_unfrozen(user_id)?;
        let profile = self.profile(user_id)?;

        if target_level <= profile.vip_level {
            return Err(CoreError::Validation(format!(
                "already at VIP level {}, cannot buy level {target_level}",
                profile.vip_level
            )));
        }
        let price = self
            .config
            .vip_price(target_level)
            .ok_or_else(|| CoreError::Validation(format!("unknown VIP tier {target_level}")))?;

        self.sweep_vesting()?;
        let components = self.store.balance_components(user_id)?;
        self.check_consistency(user_id, components.vested_net)?;
        if price > components.vested_net {
            return Err(CoreError::InsufficientBalance {
                withdrawable: components.vested_net,
                requested: price,
            });
        }

        let source_ref = format!("vip:l{target_level}");
        let (entry_id, _) = self.append_entry(
            user_id,
            -price,
            EntryKind::VipPurchaseDebit,
            source_ref.clone(),
            format!("VIP level {target_level} purchase"),
            None,
        )?;

        self.directory.set_vip_level(user_id, target_level)?;
        let commission_entry_ids = self.propagate_for(user_id, price, &source_ref)?;

        Ok(VipPurchase {
            entry_id,
            new_level: target_level,
            price,
            commission_entry_ids,
        })
    }

    /// Manual correction entry (admin surface). Positive or negative;
    /// vests immediately and is idempotent per adjustment reference.
    pub fn record_adjustment(
        &mut self,
        user_id: &str,
        amount: i64,
        adjustment_ref: &str,
        description: &str,
    ) -> Result<i64, CoreError> {
        self.profile(user_id)?;
        let (entry_id, _) = self.append_entry(
            user_id,
            amount,
            EntryKind::Adjustment,
            format!("adj:{adjustment_ref}"),
            description.to_string(),
            None,
        )?;
        Ok(entry_id)
    }

    /// Reverse an entry; reversing an originating credit also reverses the
    /// commissions derived from it, so no payout is left orphaned.
    pub fn reverse_entry(&mut self, entry_id: i64) -> Result<Vec<i64>, CoreError> {
        let record = self.store.reverse(entry_id)?;
        let mut reversed = vec![record.entry_id];

        let cascades = matches!(
            record.kind,
            EntryKind::TaskCompletion | EntryKind::VipPurchaseDebit
        );
        if cascades {
            for level in 1..=crate::commission::MAX_COMMISSION_DEPTH {
                let Some(kind) = EntryKind::commission_for_level(level) else {
                    break;
                };
                let source_ref =
                    commission_source_ref(&record.user_id, &record.source_ref_id, level);
                if let Some(commission) = self.store.commission_by_source(kind, &source_ref)? {
                    self.store.reverse(commission.entry_id)?;
                    reversed.push(commission.entry_id);
                }
            }
        }

        Ok(reversed)
    }

    /// Admin release of a frozen account once the corrective adjustment has
    /// landed. The next balance read re-freezes if the ledger is still
    /// negative.
    pub fn unfreeze_account(&mut self, user_id: &str) -> Result<(), CoreError> {
        self.profile(user_id)?;
        self.store.unfreeze_account(user_id)?;
        Ok(())
    }

    /// Negative withdrawable means the ledger itself is broken. Freeze the
    /// account durably and refuse to proceed; recovery requires an explicit
    /// adjusting entry, never silent correction.
    fn check_consistency(&mut self, user_id: &str, vested_net: i64) -> Result<(), CoreError> {
        if vested_net >= 0 {
            return Ok(());
        }

        let detail = format!("user {user_id} has negative vested balance {vested_net}");
        self.store
            .freeze_account(user_id, self.now(), &detail)
            .map_err(CoreError::from)?;
        Err(CoreError::InternalInconsistency(detail))
    }
}
