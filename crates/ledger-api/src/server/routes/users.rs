#[derive(Debug, Deserialize)]
struct RegisterUserRequest {
    user_id: String,
    referrer_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct RegisterUserResponse {
    schema_version: String,
    user_id: String,
    referrer_id: Option<String>,
    referral_bonus_entry_id: Option<i64>,
}

async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<Json<RegisterUserResponse>, HttpApiError> {
    let user_id = request.user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(HttpApiError::invalid_request(
            "user_id must not be empty",
            None,
        ));
    }
    if request.referrer_id.as_deref() == Some(user_id.as_str()) {
        return Err(HttpApiError::invalid_request(
            "a user cannot refer themselves",
            Some(format!("user_id={user_id}")),
        ));
    }

    let mut engine = state.engine.lock().await;
    if state
        .directory
        .get_user(&user_id)
        .map_err(|failure| HttpApiError::from_core(CoreError::from(failure)))?
        .is_some()
    {
        return Err(HttpApiError::invalid_request(
            "user_id is already registered",
            Some(format!("user_id={user_id}")),
        ));
    }

    state.directory.register(UserProfile {
        user_id: user_id.clone(),
        vip_level: 0,
        referrer_id: request.referrer_id.clone(),
        email_verified: false,
        kyc_status: KycStatus::Unverified,
        streak: 0,
    });

    let referral_bonus_entry_id = engine
        .record_signup(&user_id)
        .map_err(HttpApiError::from_core)?;

    Ok(Json(RegisterUserResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        user_id,
        referrer_id: request.referrer_id,
        referral_bonus_entry_id,
    }))
}

#[derive(Debug, Deserialize)]
struct VerificationRequest {
    email_verified: Option<bool>,
    kyc_status: Option<KycStatus>,
}

#[derive(Debug, Serialize)]
struct VerificationResponse {
    schema_version: String,
    user_id: String,
    email_verified: bool,
    kyc_status: KycStatus,
}

async fn update_verification(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<VerificationRequest>,
) -> Result<Json<VerificationResponse>, HttpApiError> {
    let updated = state.directory.update(&user_id, |profile| {
        if let Some(email_verified) = request.email_verified {
            profile.email_verified = email_verified;
        }
        if let Some(kyc_status) = request.kyc_status {
            profile.kyc_status = kyc_status;
        }
    });
    if !updated {
        return Err(HttpApiError::from_core(CoreError::UserNotFound(user_id)));
    }

    let profile = state
        .directory
        .get_user(&user_id)
        .map_err(|failure| HttpApiError::from_core(CoreError::from(failure)))?
        .ok_or_else(|| HttpApiError::from_core(CoreError::UserNotFound(user_id.clone())))?;

    Ok(Json(VerificationResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        user_id: profile.user_id,
        email_verified: profile.email_verified,
        kyc_status: profile.kyc_status,
    }))
}

#[derive(Debug, Serialize)]
struct UnfreezeResponse {
    schema_version: String,
    user_id: String,
    frozen: bool,
}

async fn unfreeze_account(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UnfreezeResponse>, HttpApiError> {
    let mut engine = state.engine.lock().await;
    engine
        .unfreeze_account(&user_id)
        .map_err(HttpApiError::from_core)?;

    Ok(Json(UnfreezeResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        user_id,
        frozen: false,
    }))
}
