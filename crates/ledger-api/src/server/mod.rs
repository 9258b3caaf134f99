use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, Request, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::Method;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use contracts::{
    ApiError, BalanceSummary, EligibilityReport, ErrorCode, KycStatus, LedgerEntryRecord,
    ReferralStats, TaskDefinition, TaskState, UserProfile, WithdrawalReceipt, WithdrawalRequest,
    SCHEMA_VERSION_V1,
};
use ledger_core::providers::{InMemoryDirectory, UserDirectory};
use ledger_core::{CoreError, RewardsEngine};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 200;

include!("error.rs");
include!("state.rs");
include!("routes/users.rs");
include!("routes/tasks.rs");
include!("routes/account.rs");
include!("routes/withdrawals.rs");
include!("util.rs");

pub async fn serve(
    addr: SocketAddr,
    engine: RewardsEngine,
    directory: InMemoryDirectory,
) -> Result<(), ServerError> {
    let state = AppState::new(engine, directory);
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/users", post(register_user))
        .route("/api/v1/users/{user_id}/verification", post(update_verification))
        .route("/api/v1/users/{user_id}/unfreeze", post(unfreeze_account))
        .route("/api/v1/tasks", get(list_tasks))
        .route(
            "/api/v1/users/{user_id}/tasks/{task_id}/start",
            post(start_task),
        )
        .route(
            "/api/v1/users/{user_id}/tasks/{task_id}/complete",
            post(complete_task),
        )
        .route(
            "/api/v1/users/{user_id}/tasks/{task_id}/cancel",
            post(cancel_task),
        )
        .route("/api/v1/users/{user_id}/daily-bonus", post(claim_daily_bonus))
        .route("/api/v1/users/{user_id}/balance", get(get_balance))
        .route("/api/v1/users/{user_id}/history", get(get_history))
        .route("/api/v1/users/{user_id}/referrals", get(get_referrals))
        .route(
            "/api/v1/users/{user_id}/withdrawals/eligibility",
            get(get_eligibility),
        )
        .route("/api/v1/users/{user_id}/withdrawals", post(request_withdrawal))
        .route("/api/v1/users/{user_id}/vip", post(purchase_vip))
        .route("/api/v1/users/{user_id}/adjustments", post(record_adjustment))
        .route("/api/v1/entries/{entry_id}/reverse", post(reverse_entry))
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state)
}

async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = Response::new(axum::body::Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}
