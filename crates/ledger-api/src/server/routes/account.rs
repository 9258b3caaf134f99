async fn get_balance(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BalanceSummary>, HttpApiError> {
    let mut engine = state.engine.lock().await;
    let summary = engine
        .get_balance(&user_id)
        .map_err(HttpApiError::from_core)?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize, Default)]
struct PaginationQuery {
    cursor: Option<usize>,
    page_size: Option<usize>,
}

#[derive(Debug, Serialize)]
struct HistoryPage {
    schema_version: String,
    user_id: String,
    cursor: usize,
    next_cursor: Option<usize>,
    total: usize,
    entries: Vec<LedgerEntryRecord>,
}

async fn get_history(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<HistoryPage>, HttpApiError> {
    let cursor = query.cursor.unwrap_or(0);
    let page_size = clamp_page_size(query.page_size);

    let mut engine = state.engine.lock().await;
    let (entries, total) = engine
        .history(&user_id, cursor, page_size)
        .map_err(HttpApiError::from_core)?;

    if cursor > total {
        return Err(HttpApiError::invalid_request(
            "cursor is out of bounds",
            Some(format!("cursor={cursor} total={total}")),
        ));
    }

    let end = cursor + entries.len();
    let next_cursor = if end < total { Some(end) } else { None };

    Ok(Json(HistoryPage {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        user_id,
        cursor,
        next_cursor,
        total,
        entries,
    }))
}

async fn get_referrals(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ReferralStats>, HttpApiError> {
    let mut engine = state.engine.lock().await;
    let stats = engine
        .referral_stats(&user_id)
        .map_err(HttpApiError::from_core)?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
struct AdjustmentRequest {
    amount: i64,
    adjustment_ref: String,
    description: String,
}

#[derive(Debug, Serialize)]
struct AdjustmentResponse {
    schema_version: String,
    user_id: String,
    entry_id: i64,
    amount: i64,
}

async fn record_adjustment(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<AdjustmentRequest>,
) -> Result<Json<AdjustmentResponse>, HttpApiError> {
    if request.amount == 0 {
        return Err(HttpApiError::invalid_request(
            "adjustment amount must not be zero",
            None,
        ));
    }
    if request.adjustment_ref.trim().is_empty() {
        return Err(HttpApiError::invalid_request(
            "adjustment_ref must not be empty",
            None,
        ));
    }

    let mut engine = state.engine.lock().await;
    let entry_id = engine
        .record_adjustment(
            &user_id,
            request.amount,
            request.adjustment_ref.trim(),
            &request.description,
        )
        .map_err(HttpApiError::from_core)?;

    Ok(Json(AdjustmentResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        user_id,
        entry_id,
        amount: request.amount,
    }))
}

#[derive(Debug, Serialize)]
struct ReverseEntryResponse {
    schema_version: String,
    reversed_entry_ids: Vec<i64>,
}

async fn reverse_entry(
    Path(entry_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ReverseEntryResponse>, HttpApiError> {
    let mut engine = state.engine.lock().await;
    let reversed_entry_ids = engine
        .reverse_entry(entry_id)
        .map_err(HttpApiError::from_core)?;

    Ok(Json(ReverseEntryResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        reversed_entry_ids,
    }))
}
