//! Multi-level commission arithmetic, kept pure so the cascade can be
//! planned and tested without touching the store.

use contracts::{EntryKind, PlatformConfig};

pub const MAX_COMMISSION_DEPTH: u8 = 3;

/// Whole-unit commission with round-half-up. Amounts are rupee credits;
/// the UI renders no decimals, so the ledger stores none.
pub fn commission_amount(original_amount: i64, percent: i64) -> i64 {
    (original_amount * percent + 50).div_euclid(100)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommission {
    pub recipient_id: String,
    pub level: u8,
    pub kind: EntryKind,
    pub percent: i64,
    pub amount: i64,
}

/// Map a referrer chain (direct referrer first) onto commission entries.
/// Stops at the configured depth or the end of the chain, whichever comes
/// first; zero-amount hops are dropped rather than written as no-op rows.
pub fn plan_cascade(
    referrer_chain: &[String],
    original_amount: i64,
    config: &PlatformConfig,
) -> Vec<PlannedCommission> {
    let mut planned = Vec::new();

    for (index, recipient_id) in referrer_chain
        .iter()
        .take(usize::from(MAX_COMMISSION_DEPTH))
        .enumerate()
    {
        let level = index as u8 + 1;
        let Some(percent) = config.commission_percent(level) else {
            break;
        };
        let Some(kind) = EntryKind::commission_for_level(level) else {
            break;
        };

        let amount = commission_amount(original_amount, percent);
        if amount == 0 {
            continue;
        }

        planned.push(PlannedCommission {
            recipient_id: recipient_id.clone(),
            level,
            kind,
            percent,
            amount,
        });
    }

    planned
}

/// Source reference for one commission hop, derived from the originating
/// transaction so re-running propagation is a store-level no-op. The earner
/// id is part of the ref because originating refs are only unique per user.
pub fn commission_source_ref(from_user_id: &str, origin_source_ref: &str, level: u8) -> String {
    format!("cmsn:{from_user_id}:{origin_source_ref}:l{level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn three_level_split_matches_business_rule() {
        let config = PlatformConfig::default();
        let planned = plan_cascade(&chain(&["u3", "u2", "u1"]), 100, &config);

        assert_eq!(planned.len(), 3);
        assert_eq!(planned[0].amount, 50);
        assert_eq!(planned[0].kind, EntryKind::ReferralCommissionL1);
        assert_eq!(planned[1].amount, 10);
        assert_eq!(planned[2].amount, 5);
        assert_eq!(planned[2].recipient_id, "u1");
    }

    #[test]
    fn short_chain_stops_without_error() {
        let config = PlatformConfig::default();
        let planned = plan_cascade(&chain(&["u1"]), 100, &config);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].level, 1);

        assert!(plan_cascade(&[], 100, &config).is_empty());
    }

    #[test]
    fn long_chain_is_cut_at_three_levels() {
        let config = PlatformConfig::default();
        let planned = plan_cascade(&chain(&["a", "b", "c", "d", "e"]), 100, &config);
        assert_eq!(planned.len(), 3);
    }

    #[test]
    fn rounding_is_half_up_in_whole_units() {
        assert_eq!(commission_amount(10, 5), 1); // 0.5 rounds up
        assert_eq!(commission_amount(9, 5), 0); // 0.45 rounds down
        assert_eq!(commission_amount(10, 50), 5);
        assert_eq!(commission_amount(3, 10), 0);
    }

    #[test]
    fn zero_amount_hops_are_dropped() {
        let config = PlatformConfig::default();
        // 3 * 10% = 0.3 -> 0, 3 * 5% = 0.15 -> 0; only L1 (1.5 -> 2) stays.
        let planned = plan_cascade(&chain(&["u3", "u2", "u1"]), 3, &config);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].level, 1);
        assert_eq!(planned[0].amount, 2);
    }
}
