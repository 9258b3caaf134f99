#[derive(Debug)]
pub enum ServerError {
    Io(std::io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "server io error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Debug)]
struct HttpApiError {
    status: StatusCode,
    error: ApiError,
}

impl HttpApiError {
    fn invalid_request(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiError::new(ErrorCode::ValidationError, message, details),
        }
    }

    fn from_core(err: CoreError) -> Self {
        let message = err.to_string();
        let (status, error_code, details) = match err {
            CoreError::Validation(detail) => {
                (StatusCode::BAD_REQUEST, ErrorCode::ValidationError, Some(detail))
            }
            CoreError::DuplicateSourceRef => {
                (StatusCode::CONFLICT, ErrorCode::DuplicateSourceRef, None)
            }
            CoreError::DailyCapExceeded { remaining } => (
                StatusCode::CONFLICT,
                ErrorCode::DailyCapExceeded,
                Some(format!("remaining={remaining}")),
            ),
            CoreError::TaskUnavailable(detail) => {
                (StatusCode::CONFLICT, ErrorCode::TaskUnavailable, Some(detail))
            }
            CoreError::TaskExpired => (StatusCode::GONE, ErrorCode::TaskExpired, None),
            CoreError::AlreadyCompleted => {
                (StatusCode::CONFLICT, ErrorCode::AlreadyCompleted, None)
            }
            CoreError::ProofInvalid => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::ProofInvalid, None)
            }
            CoreError::InsufficientBalance {
                withdrawable,
                requested,
            } => (
                StatusCode::CONFLICT,
                ErrorCode::InsufficientBalance,
                Some(format!("withdrawable={withdrawable} requested={requested}")),
            ),
            CoreError::EligibilityNotMet(reasons) => {
                let gates = reasons
                    .iter()
                    .map(|reason| reason.gate.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                (
                    StatusCode::FORBIDDEN,
                    ErrorCode::EligibilityNotMet,
                    Some(format!("gates={gates}")),
                )
            }
            CoreError::Provider { message, retryable } => (
                StatusCode::BAD_GATEWAY,
                ErrorCode::ProviderError,
                Some(format!("retryable={retryable} message={message}")),
            ),
            CoreError::UserNotFound(user_id) => (
                StatusCode::NOT_FOUND,
                ErrorCode::UserNotFound,
                Some(format!("user_id={user_id}")),
            ),
            CoreError::AccountFrozen(user_id) => (
                StatusCode::LOCKED,
                ErrorCode::AccountFrozen,
                Some(format!("user_id={user_id}")),
            ),
            CoreError::InternalInconsistency(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalInconsistency,
                Some(detail),
            ),
            CoreError::Store(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                Some(err.to_string()),
            ),
        };

        Self {
            status,
            error: ApiError::new(error_code, message, details),
        }
    }
}

impl IntoResponse for HttpApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}
