#[derive(Debug, Serialize)]
struct TaskListResponse {
    schema_version: String,
    tasks: Vec<TaskDefinition>,
}

async fn list_tasks(State(state): State<AppState>) -> Json<TaskListResponse> {
    let engine = state.engine.lock().await;
    Json(TaskListResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        tasks: engine.catalog().list(),
    })
}

#[derive(Debug, Serialize)]
struct StartTaskResponse {
    schema_version: String,
    user_id: String,
    task_id: String,
    attempt: i64,
    state: TaskState,
    expires_at: i64,
    potential_reward: i64,
    provider_url: Option<String>,
}

async fn start_task(
    Path((user_id, task_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<StartTaskResponse>, HttpApiError> {
    let mut engine = state.engine.lock().await;
    let started = engine
        .start_task(&user_id, &task_id)
        .map_err(HttpApiError::from_core)?;

    Ok(Json(StartTaskResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        user_id,
        task_id: started.task_id,
        attempt: started.attempt,
        state: started.state,
        expires_at: started.expires_at,
        potential_reward: started.potential_reward,
        provider_url: started.provider_url,
    }))
}

#[derive(Debug, Deserialize)]
struct CompleteTaskRequest {
    proof: String,
}

#[derive(Debug, Serialize)]
struct CompleteTaskResponse {
    schema_version: String,
    user_id: String,
    task_id: String,
    attempt: i64,
    entry_id: i64,
    amount: i64,
    entry_status: contracts::EntryStatus,
}

async fn complete_task(
    Path((user_id, task_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Json(request): Json<CompleteTaskRequest>,
) -> Result<Json<CompleteTaskResponse>, HttpApiError> {
    let mut engine = state.engine.lock().await;
    let completed = engine
        .complete_task(&user_id, &task_id, &request.proof)
        .map_err(HttpApiError::from_core)?;

    Ok(Json(CompleteTaskResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        user_id,
        task_id: completed.task_id,
        attempt: completed.attempt,
        entry_id: completed.entry_id,
        amount: completed.amount,
        entry_status: completed.entry_status,
    }))
}

#[derive(Debug, Serialize)]
struct CancelTaskResponse {
    schema_version: String,
    user_id: String,
    task_id: String,
    cancelled: bool,
}

async fn cancel_task(
    Path((user_id, task_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<CancelTaskResponse>, HttpApiError> {
    let mut engine = state.engine.lock().await;
    engine
        .cancel_task(&user_id, &task_id)
        .map_err(HttpApiError::from_core)?;

    Ok(Json(CancelTaskResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        user_id,
        task_id,
        cancelled: true,
    }))
}

#[derive(Debug, Serialize)]
struct DailyBonusResponse {
    schema_version: String,
    user_id: String,
    entry_id: i64,
    amount: i64,
    streak: u32,
}

async fn claim_daily_bonus(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DailyBonusResponse>, HttpApiError> {
    let mut engine = state.engine.lock().await;
    let claim = engine
        .claim_daily_bonus(&user_id)
        .map_err(HttpApiError::from_core)?;

    Ok(Json(DailyBonusResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        user_id,
        entry_id: claim.entry_id,
        amount: claim.amount,
        streak: claim.streak,
    }))
}
