//! Vesting policy: when a credited amount becomes withdrawable.
//!
//! Vesting only gates reads (the withdrawable balance), so the sweep is
//! pull-based at read time rather than a background job.

use contracts::{EntryKind, EntryStatus, PlatformConfig};

#[derive(Debug, Clone, Copy)]
pub struct VestingPolicy {
    task_secs: i64,
    signup_secs: i64,
}

impl VestingPolicy {
    pub fn from_config(config: &PlatformConfig) -> Self {
        Self {
            task_secs: config.task_vesting_secs,
            signup_secs: config.signup_vesting_secs,
        }
    }

    /// Anti-fraud delay before an entry of this kind settles. Zero means
    /// the entry is created already vested: daily bonuses vest immediately,
    /// commissions derive from an already-settled amount, and debits are
    /// reservations that must bind at once.
    pub fn delay_for(&self, kind: EntryKind) -> i64 {
        match kind {
            EntryKind::TaskCompletion => self.task_secs,
            EntryKind::ReferralSignupBonus => self.signup_secs,
            EntryKind::DailyBonus
            | EntryKind::ReferralCommissionL1
            | EntryKind::ReferralCommissionL2
            | EntryKind::ReferralCommissionL3
            | EntryKind::VipPurchaseDebit
            | EntryKind::WithdrawalDebit
            | EntryKind::Adjustment => 0,
        }
    }

    /// Status and vested_at for a freshly appended entry.
    pub fn initial_state(&self, kind: EntryKind, now: i64) -> (EntryStatus, Option<i64>) {
        if self.delay_for(kind) == 0 {
            (EntryStatus::Vested, Some(now))
        } else {
            (EntryStatus::Pending, None)
        }
    }

    /// Kinds the read-time sweep has to visit, with their delays.
    pub fn swept_kinds(&self) -> [(EntryKind, i64); 2] {
        [
            (EntryKind::TaskCompletion, self.task_secs),
            (EntryKind::ReferralSignupBonus, self.signup_secs),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_credits_vest_after_delay_bonuses_immediately() {
        let policy = VestingPolicy::from_config(&PlatformConfig::default());

        assert_eq!(policy.delay_for(EntryKind::TaskCompletion), 86_400);
        assert_eq!(policy.delay_for(EntryKind::DailyBonus), 0);
        assert_eq!(policy.delay_for(EntryKind::WithdrawalDebit), 0);

        let (status, vested_at) = policy.initial_state(EntryKind::TaskCompletion, 5_000);
        assert_eq!(status, EntryStatus::Pending);
        assert_eq!(vested_at, None);

        let (status, vested_at) = policy.initial_state(EntryKind::DailyBonus, 5_000);
        assert_eq!(status, EntryStatus::Vested);
        assert_eq!(vested_at, Some(5_000));
    }
}
