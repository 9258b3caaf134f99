//! Balance aggregation and withdrawal eligibility gates, as pure functions
//! over store components so they can be tested without a database.

use contracts::{
    BalanceSummary, EligibilityGate, EligibilityReason, KycStatus, PlatformConfig, UserProfile,
    SCHEMA_VERSION_V1,
};

use crate::store::{BalanceComponents, DailyTotals};

pub fn summarize(
    profile: &UserProfile,
    components: BalanceComponents,
    daily: DailyTotals,
    config: &PlatformConfig,
) -> BalanceSummary {
    BalanceSummary {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        user_id: profile.user_id.clone(),
        total_credits: components.vested_credits,
        pending_credits: components.pending_credits,
        available_credits: components.vested_net,
        withdrawable_credits: components.vested_net,
        daily_credits_earned: daily.credits_earned,
        daily_credit_limit: config.daily_cap(profile.vip_level),
        daily_ads_watched: daily.ads_watched,
        streak: profile.streak,
    }
}

/// Evaluate all three withdrawal gates independently; the caller renders
/// one actionable reason per unmet gate.
pub fn unmet_gates(
    profile: &UserProfile,
    withdrawable: i64,
    config: &PlatformConfig,
) -> Vec<EligibilityReason> {
    let mut reasons = Vec::new();

    if !profile.email_verified {
        reasons.push(EligibilityReason {
            gate: EligibilityGate::EmailUnverified,
            detail: "verify your email address to unlock withdrawals".to_string(),
        });
    }

    if profile.kyc_status != KycStatus::Verified {
        reasons.push(EligibilityReason {
            gate: EligibilityGate::KycIncomplete,
            detail: format!("KYC status is {:?}, must be verified", profile.kyc_status),
        });
    }

    if withdrawable < config.min_withdrawal {
        reasons.push(EligibilityReason {
            gate: EligibilityGate::BelowMinimumWithdrawal,
            detail: format!(
                "withdrawable balance {withdrawable} is below the minimum of {}",
                config.min_withdrawal
            ),
        });
    }

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verified_profile() -> UserProfile {
        UserProfile {
            user_id: "u1".to_string(),
            vip_level: 0,
            referrer_id: None,
            email_verified: true,
            kyc_status: KycStatus::Verified,
            streak: 3,
        }
    }

    #[test]
    fn summary_carries_cap_for_vip_level() {
        let config = PlatformConfig::default();
        let mut profile = verified_profile();
        profile.vip_level = 2;

        let summary = summarize(
            &profile,
            BalanceComponents {
                vested_credits: 200,
                pending_credits: 40,
                vested_net: 150,
            },
            DailyTotals {
                credits_earned: 25,
                ads_watched: 2,
            },
            &config,
        );

        assert_eq!(summary.total_credits, 200);
        assert_eq!(summary.pending_credits, 40);
        assert_eq!(summary.withdrawable_credits, 150);
        assert_eq!(summary.daily_credit_limit, 120);
        assert_eq!(summary.streak, 3);
    }

    #[test]
    fn all_gates_reported_independently() {
        let config = PlatformConfig::default();
        let profile = UserProfile {
            email_verified: false,
            kyc_status: KycStatus::Pending,
            ..verified_profile()
        };

        let reasons = unmet_gates(&profile, 50, &config);
        let gates: Vec<EligibilityGate> = reasons.iter().map(|reason| reason.gate).collect();
        assert_eq!(
            gates,
            [
                EligibilityGate::EmailUnverified,
                EligibilityGate::KycIncomplete,
                EligibilityGate::BelowMinimumWithdrawal,
            ]
        );
    }

    #[test]
    fn fully_verified_user_above_threshold_passes() {
        let config = PlatformConfig::default();
        assert!(unmet_gates(&verified_profile(), 100, &config).is_empty());
        assert_eq!(unmet_gates(&verified_profile(), 99, &config).len(), 1);
    }
}
