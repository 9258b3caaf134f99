//! v1 cross-boundary contracts for the credit ledger, API, and CLI.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION_V1: &str = "1.0";

/// Seconds added to unix time before day-key division. Fixed platform
/// timezone: IST (UTC+5:30). Daily counters reset at midnight IST.
pub const UTC_OFFSET_SECS: i64 = 19_800;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Closed set of ledger entry kinds. The balance calculator and commission
/// propagator match exhaustively on this.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    TaskCompletion,
    DailyBonus,
    ReferralSignupBonus,
    ReferralCommissionL1,
    ReferralCommissionL2,
    ReferralCommissionL3,
    VipPurchaseDebit,
    WithdrawalDebit,
    Adjustment,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaskCompletion => "task_completion",
            Self::DailyBonus => "daily_bonus",
            Self::ReferralSignupBonus => "referral_signup_bonus",
            Self::ReferralCommissionL1 => "referral_commission_l1",
            Self::ReferralCommissionL2 => "referral_commission_l2",
            Self::ReferralCommissionL3 => "referral_commission_l3",
            Self::VipPurchaseDebit => "vip_purchase_debit",
            Self::WithdrawalDebit => "withdrawal_debit",
            Self::Adjustment => "adjustment",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "task_completion" => Some(Self::TaskCompletion),
            "daily_bonus" => Some(Self::DailyBonus),
            "referral_signup_bonus" => Some(Self::ReferralSignupBonus),
            "referral_commission_l1" => Some(Self::ReferralCommissionL1),
            "referral_commission_l2" => Some(Self::ReferralCommissionL2),
            "referral_commission_l3" => Some(Self::ReferralCommissionL3),
            "vip_purchase_debit" => Some(Self::VipPurchaseDebit),
            "withdrawal_debit" => Some(Self::WithdrawalDebit),
            "adjustment" => Some(Self::Adjustment),
            _ => None,
        }
    }

    pub fn commission_for_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::ReferralCommissionL1),
            2 => Some(Self::ReferralCommissionL2),
            3 => Some(Self::ReferralCommissionL3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Vested,
    Reversed,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Vested => "vested",
            Self::Reversed => "reversed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "vested" => Some(Self::Vested),
            "reversed" => Some(Self::Reversed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    AdView,
    AppInstall,
    Survey,
    Offer,
}

impl TaskCategory {
    pub fn is_ad(self) -> bool {
        matches!(self, Self::AdView)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    InProgress,
    Completed,
    Expired,
    Cancelled,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "expired" => Some(Self::Expired),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    Unverified,
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalMethod {
    Upi,
    BankTransfer,
    Paypal,
}

/// External user profile as read from the Auth/Profile collaborator.
/// The ledger core never mutates this beyond streak and VIP level, and
/// only through the directory interface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: String,
    pub vip_level: u8,
    pub referrer_id: Option<String>,
    pub email_verified: bool,
    pub kyc_status: KycStatus,
    pub streak: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskDefinition {
    pub task_id: String,
    pub title: String,
    pub category: TaskCategory,
    pub base_reward: i64,
    pub daily_limit: u32,
    pub expiry_secs: i64,
    pub provider_url: Option<String>,
}

/// Platform-wide tunables. Percentages and caps are configuration, not
/// literals scattered through the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformConfig {
    pub schema_version: String,
    /// Minimum withdrawable balance before a withdrawal is accepted.
    pub min_withdrawal: i64,
    /// Flat one-hop bonus paid to the direct referrer on signup.
    pub signup_bonus: i64,
    /// Commission percentages for referral levels 1..=3.
    pub commission_percents: [i64; 3],
    /// Anti-fraud vesting delay for task completions, in seconds.
    pub task_vesting_secs: i64,
    /// Vesting delay for the signup bonus, in seconds.
    pub signup_vesting_secs: i64,
    /// Daily earning caps indexed by VIP level; the last entry applies to
    /// all higher levels.
    pub daily_caps: Vec<i64>,
    /// Reward multipliers indexed by VIP level, same clamping rule.
    pub vip_multipliers: Vec<i64>,
    /// Price of each VIP tier, indexed by target level minus one.
    pub vip_prices: Vec<i64>,
    /// Base daily check-in bonus before streak scaling.
    pub daily_bonus_base: i64,
    /// Offset applied to unix seconds before computing the platform day.
    pub utc_offset_secs: i64,
}

impl PlatformConfig {
    pub fn daily_cap(&self, vip_level: u8) -> i64 {
        clamp_indexed(&self.daily_caps, vip_level, 30)
    }

    pub fn vip_multiplier(&self, vip_level: u8) -> i64 {
        clamp_indexed(&self.vip_multipliers, vip_level, 1)
    }

    pub fn commission_percent(&self, level: u8) -> Option<i64> {
        match level {
            1..=3 => Some(self.commission_percents[usize::from(level) - 1]),
            _ => None,
        }
    }

    pub fn vip_price(&self, target_level: u8) -> Option<i64> {
        if target_level == 0 {
            return None;
        }
        self.vip_prices.get(usize::from(target_level) - 1).copied()
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            min_withdrawal: 100,
            signup_bonus: 10,
            commission_percents: [50, 10, 5],
            task_vesting_secs: SECONDS_PER_DAY,
            signup_vesting_secs: SECONDS_PER_DAY,
            daily_caps: vec![30, 60, 120, 250],
            vip_multipliers: vec![1, 2, 3, 5],
            vip_prices: vec![200, 500, 1200],
            daily_bonus_base: 5,
            utc_offset_secs: UTC_OFFSET_SECS,
        }
    }
}

fn clamp_indexed(table: &[i64], level: u8, fallback: i64) -> i64 {
    match table.last() {
        Some(last) => table.get(usize::from(level)).copied().unwrap_or(*last),
        None => fallback,
    }
}

/// Commission columns carried by referral commission entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommissionDetail {
    pub from_user_id: String,
    pub level: u8,
    pub percent: i64,
    pub original_amount: i64,
}

/// One ledger row as exposed over the API (history, admin inspection).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntryRecord {
    pub entry_id: i64,
    pub user_id: String,
    pub amount: i64,
    pub kind: EntryKind,
    pub source_ref_id: String,
    pub status: EntryStatus,
    pub description: String,
    pub created_at: i64,
    pub vested_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<CommissionDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceSummary {
    pub schema_version: String,
    pub user_id: String,
    pub total_credits: i64,
    pub pending_credits: i64,
    pub available_credits: i64,
    pub withdrawable_credits: i64,
    pub daily_credits_earned: i64,
    pub daily_credit_limit: i64,
    pub daily_ads_watched: i64,
    pub streak: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityGate {
    EmailUnverified,
    KycIncomplete,
    BelowMinimumWithdrawal,
}

impl EligibilityGate {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmailUnverified => "email_unverified",
            Self::KycIncomplete => "kyc_incomplete",
            Self::BelowMinimumWithdrawal => "below_minimum_withdrawal",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EligibilityReason {
    pub gate: EligibilityGate,
    pub detail: String,
}

/// Per-gate eligibility report; the UI renders one actionable line per
/// unmet gate rather than a single opaque boolean.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EligibilityReport {
    pub schema_version: String,
    pub user_id: String,
    pub eligible: bool,
    pub reasons: Vec<EligibilityReason>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferralLevelStats {
    pub count: u64,
    pub total_commission: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferralStats {
    pub schema_version: String,
    pub user_id: String,
    pub level1: ReferralLevelStats,
    pub level2: ReferralLevelStats,
    pub level3: ReferralLevelStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WithdrawalRequest {
    pub amount: i64,
    pub method: WithdrawalMethod,
    pub account_details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WithdrawalReceipt {
    pub schema_version: String,
    pub user_id: String,
    pub accepted: bool,
    pub amount: i64,
    pub withdrawal_ref: Option<String>,
    pub provider_transaction_id: Option<String>,
    #[serde(default)]
    pub reasons: Vec<EligibilityReason>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    DuplicateSourceRef,
    DailyCapExceeded,
    TaskUnavailable,
    TaskExpired,
    AlreadyCompleted,
    ProofInvalid,
    InsufficientBalance,
    EligibilityNotMet,
    ProviderError,
    UserNotFound,
    AccountFrozen,
    InternalInconsistency,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub schema_version: String,
    pub error_code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            error_code,
            message: message.into(),
            details,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.error_code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}
