//! External collaborator seams: Auth/Profile directory, ad-network
//! completion verification, and payout execution. The engine only ever
//! talks to these traits; in-memory implementations back the CLI demo and
//! tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use contracts::{TaskDefinition, UserProfile, WithdrawalMethod};

#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub message: String,
    pub retryable: bool,
}

impl ProviderFailure {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (retryable={})", self.message, self.retryable)
    }
}

impl std::error::Error for ProviderFailure {}

/// Auth/Profile subsystem boundary. `None` from `get_user` means the user
/// id is unknown to the platform.
pub trait UserDirectory: Send + Sync {
    fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, ProviderFailure>;
    fn increment_streak(&self, user_id: &str) -> Result<u32, ProviderFailure>;
    fn set_vip_level(&self, user_id: &str, vip_level: u8) -> Result<(), ProviderFailure>;
}

/// Ad-network / offer-provider boundary: provider-specific proof checks.
pub trait CompletionVerifier: Send + Sync {
    fn validate_completion(
        &self,
        task: &TaskDefinition,
        proof: &str,
    ) -> Result<bool, ProviderFailure>;
}

/// Payment-gateway boundary. Returns the provider transaction id.
pub trait PayoutExecutor: Send + Sync {
    fn execute_payout(
        &self,
        user_id: &str,
        amount: i64,
        method: WithdrawalMethod,
        account_details: &str,
    ) -> Result<String, ProviderFailure>;
}

/// Shared-handle in-memory directory; clones see the same users.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    users: Arc<Mutex<HashMap<String, UserProfile>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, profile: UserProfile) {
        let mut users = self.users.lock().expect("directory lock");
        users.insert(profile.user_id.clone(), profile);
    }

    pub fn update<F>(&self, user_id: &str, apply: F) -> bool
    where
        F: FnOnce(&mut UserProfile),
    {
        let mut users = self.users.lock().expect("directory lock");
        match users.get_mut(user_id) {
            Some(profile) => {
                apply(profile);
                true
            }
            None => false,
        }
    }
}

impl UserDirectory for InMemoryDirectory {
    fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, ProviderFailure> {
        let users = self.users.lock().expect("directory lock");
        Ok(users.get(user_id).cloned())
    }

    fn increment_streak(&self, user_id: &str) -> Result<u32, ProviderFailure> {
        let mut users = self.users.lock().expect("directory lock");
        match users.get_mut(user_id) {
            Some(profile) => {
                profile.streak += 1;
                Ok(profile.streak)
            }
            None => Err(ProviderFailure::permanent(format!(
                "unknown user {user_id}"
            ))),
        }
    }

    fn set_vip_level(&self, user_id: &str, vip_level: u8) -> Result<(), ProviderFailure> {
        let mut users = self.users.lock().expect("directory lock");
        match users.get_mut(user_id) {
            Some(profile) => {
                profile.vip_level = vip_level;
                Ok(())
            }
            None => Err(ProviderFailure::permanent(format!(
                "unknown user {user_id}"
            ))),
        }
    }
}

/// Accepts any proof carrying the configured prefix; stands in for the
/// provider-specific postback/token validation.
#[derive(Debug, Clone)]
pub struct PrefixVerifier {
    prefix: String,
}

impl PrefixVerifier {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for PrefixVerifier {
    fn default() -> Self {
        Self::new("confirmed:")
    }
}

impl CompletionVerifier for PrefixVerifier {
    fn validate_completion(
        &self,
        _task: &TaskDefinition,
        proof: &str,
    ) -> Result<bool, ProviderFailure> {
        Ok(proof.starts_with(&self.prefix))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPayout {
    pub user_id: String,
    pub amount: i64,
    pub method: WithdrawalMethod,
    pub account_details: String,
}

/// Records payouts; can be told to fail the next call to exercise the
/// debit-reversal path.
#[derive(Debug, Clone, Default)]
pub struct RecordingPayout {
    payouts: Arc<Mutex<Vec<RecordedPayout>>>,
    fail_next: Arc<Mutex<bool>>,
}

impl RecordingPayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_call(&self) {
        *self.fail_next.lock().expect("payout lock") = true;
    }

    pub fn recorded(&self) -> Vec<RecordedPayout> {
        self.payouts.lock().expect("payout lock").clone()
    }
}

impl PayoutExecutor for RecordingPayout {
    fn execute_payout(
        &self,
        user_id: &str,
        amount: i64,
        method: WithdrawalMethod,
        account_details: &str,
    ) -> Result<String, ProviderFailure> {
        let mut fail_next = self.fail_next.lock().expect("payout lock");
        if *fail_next {
            *fail_next = false;
            return Err(ProviderFailure::retryable("gateway timeout"));
        }
        drop(fail_next);

        let mut payouts = self.payouts.lock().expect("payout lock");
        payouts.push(RecordedPayout {
            user_id: user_id.to_string(),
            amount,
            method,
            account_details: account_details.to_string(),
        });
        Ok(format!("txn-{:04}", payouts.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::KycStatus;

    fn profile(user_id: &str) -> UserProfile {
        UserProfile {
            user_id: user_id.to_string(),
            vip_level: 0,
            referrer_id: None,
            email_verified: false,
            kyc_status: KycStatus::Unverified,
            streak: 0,
        }
    }

    #[test]
    fn directory_clones_share_users() {
        let directory = InMemoryDirectory::new();
        let handle = directory.clone();
        directory.register(profile("u1"));

        assert!(handle.get_user("u1").expect("lookup").is_some());
        assert_eq!(handle.increment_streak("u1").expect("streak"), 1);
        assert!(handle.get_user("missing").expect("lookup").is_none());
    }

    #[test]
    fn recording_payout_fails_once_when_told() {
        let payout = RecordingPayout::new();
        payout.fail_next_call();

        let failed = payout.execute_payout("u1", 100, WithdrawalMethod::Upi, "u1@bank");
        assert!(failed.is_err());

        let txn = payout
            .execute_payout("u1", 100, WithdrawalMethod::Upi, "u1@bank")
            .expect("second call succeeds");
        assert_eq!(txn, "txn-0001");
        assert_eq!(payout.recorded().len(), 1);
    }
}
