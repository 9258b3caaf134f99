async fn get_eligibility(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<EligibilityReport>, HttpApiError> {
    let mut engine = state.engine.lock().await;
    let report = engine
        .check_eligibility(&user_id)
        .map_err(HttpApiError::from_core)?;
    Ok(Json(report))
}

async fn request_withdrawal(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<WithdrawalRequest>,
) -> Result<Json<WithdrawalReceipt>, HttpApiError> {
    let mut engine = state.engine.lock().await;
    // Unmet gates come back as an accepted=false receipt with reasons, not
    // an error status; callers render them as a checklist.
    match engine.request_withdrawal(&user_id, &request) {
        Ok(receipt) => Ok(Json(receipt)),
        Err(CoreError::EligibilityNotMet(reasons)) => Ok(Json(WithdrawalReceipt {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            user_id,
            accepted: false,
            amount: request.amount,
            withdrawal_ref: None,
            provider_transaction_id: None,
            reasons,
        })),
        Err(other) => Err(HttpApiError::from_core(other)),
    }
}

#[derive(Debug, Deserialize)]
struct VipPurchaseRequest {
    target_level: u8,
}

#[derive(Debug, Serialize)]
struct VipPurchaseResponse {
    schema_version: String,
    user_id: String,
    entry_id: i64,
    new_level: u8,
    price: i64,
    commission_entry_ids: Vec<i64>,
}

async fn purchase_vip(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<VipPurchaseRequest>,
) -> Result<Json<VipPurchaseResponse>, HttpApiError> {
    let mut engine = state.engine.lock().await;
    let purchase = engine
        .purchase_vip(&user_id, request.target_level)
        .map_err(HttpApiError::from_core)?;

    Ok(Json(VipPurchaseResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        user_id,
        entry_id: purchase.entry_id,
        new_level: purchase.new_level,
        price: purchase.price,
        commission_entry_ids: purchase.commission_entry_ids,
    }))
}
