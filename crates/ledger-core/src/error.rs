use std::fmt;

use contracts::EligibilityReason;

use crate::providers::ProviderFailure;
use crate::store::StoreError;

/// Engine-level error taxonomy. Duplicate, cap, and eligibility rejections
/// are expected control flow and carry the data the caller needs to render
/// an actionable response; `InternalInconsistency` is fatal for the affected
/// account and freezes it durably.
#[derive(Debug)]
pub enum CoreError {
    Validation(String),
    DuplicateSourceRef,
    DailyCapExceeded { remaining: i64 },
    TaskUnavailable(String),
    TaskExpired,
    AlreadyCompleted,
    ProofInvalid,
    InsufficientBalance { withdrawable: i64, requested: i64 },
    EligibilityNotMet(Vec<EligibilityReason>),
    Provider { message: String, retryable: bool },
    UserNotFound(String),
    AccountFrozen(String),
    InternalInconsistency(String),
    Store(StoreError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(detail) => write!(f, "validation error: {detail}"),
            Self::DuplicateSourceRef => write!(f, "duplicate source reference"),
            Self::DailyCapExceeded { remaining } => {
                write!(f, "daily cap exceeded, remaining headroom {remaining}")
            }
            Self::TaskUnavailable(detail) => write!(f, "task unavailable: {detail}"),
            Self::TaskExpired => write!(f, "task expired"),
            Self::AlreadyCompleted => write!(f, "task already completed"),
            Self::ProofInvalid => write!(f, "completion proof invalid"),
            Self::InsufficientBalance {
                withdrawable,
                requested,
            } => write!(
                f,
                "insufficient balance: requested {requested}, withdrawable {withdrawable}"
            ),
            Self::EligibilityNotMet(reasons) => {
                write!(f, "withdrawal eligibility not met ({} gates)", reasons.len())
            }
            Self::Provider { message, retryable } => {
                write!(f, "provider error (retryable={retryable}): {message}")
            }
            Self::UserNotFound(user_id) => write!(f, "user not found: {user_id}"),
            Self::AccountFrozen(user_id) => {
                write!(f, "account {user_id} is frozen pending investigation")
            }
            Self::InternalInconsistency(detail) => {
                write!(f, "internal inconsistency: {detail}")
            }
            Self::Store(err) => write!(f, "store error: {err}"),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<StoreError> for CoreError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateSourceRef => Self::DuplicateSourceRef,
            other => Self::Store(other),
        }
    }
}

impl From<ProviderFailure> for CoreError {
    fn from(value: ProviderFailure) -> Self {
        Self::Provider {
            message: value.message,
            retryable: value.retryable,
        }
    }
}
