use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};
use tracing::info;

use super::{
    models::{
        CreditsResponse, GrantRequest, HairstyleAccepted, HairstyleRequest, KieWebhookNotice,
        TaskStatusResponse, TaskView,
    },
    state::AppState,
    validation::RequestValidationError,
};
use crate::api::error::ApiError;
use crate::tasks::HairstyleOrder;

/// Primary intake endpoint (POST /api/hairstyles)
///
/// Accepts one photo plus a style selection and fans it out into one
/// generation task per requested style.
///
/// ## Flow:
/// 1. Resolve the calling user from the X-Salon-User header
/// 2. Read and decode the JSON body, enforcing the payload cap
/// 3. Validate the request against the configured limits
/// 4. Debit one credit per style (refused orders cost nothing)
/// 5. Stage the input photo into managed storage, once
/// 6. Persist one pending task per style in a single atomic batch
/// 7. Return 202 Accepted with the created tasks and the debit receipt
///
/// Tasks are not submitted to the provider here. The first status poll
/// (`GET /api/tasks/{task_no}`) starts a pending task once it is due.
pub async fn submit_hairstyles(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = super::utils::require_user(&headers)?;

    let limits = state.config.server.api.clone();
    let request: HairstyleRequest =
        super::utils::read_json_body(&headers, body, limits.max_payload_bytes).await?;
    super::validation::validate_hairstyle_request(&request, &limits)
        .map_err(map_validation_error)?;

    let order = HairstyleOrder {
        photo_url: request.photo_url,
        provider: request.provider,
        styles: request.styles,
        color: request.color,
        detail: request.detail,
    };
    let receipt = state.intake.create_hairstyle_tasks(&user_id, order).await?;

    // Return 202 Accepted - tasks are persisted but generation has not begun
    let response = HairstyleAccepted {
        tasks: receipt.tasks.iter().map(TaskView::from).collect(),
        credits: receipt.credits,
    };

    Ok((axum::http::StatusCode::ACCEPTED, Json(response)))
}

/// Maps request validation errors to API errors
fn map_validation_error(err: RequestValidationError) -> ApiError {
    ApiError::InvalidPayload(err.to_string())
}

/// Task status endpoint (GET /api/tasks/{task_no})
///
/// Polling doubles as the lifecycle driver: a due pending task is
/// submitted to the provider, a running one has its provider report
/// fetched and committed when conclusive. Terminal tasks are returned
/// as stored without touching the provider.
pub async fn get_task(
    State(state): State<AppState>,
    axum::extract::Path(task_no): axum::extract::Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let progress = state.engine.reconcile(&task_no).await?;

    let response = TaskStatusResponse {
        task: TaskView::from(&progress.task),
        progress: progress.progress,
    };

    Ok((axum::http::StatusCode::OK, Json(response)))
}

/// Credit balance for the calling user (GET /api/credits)
pub async fn get_credits(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = super::utils::require_user(&headers)?;
    let balance = state
        .credits
        .balance(&user_id)
        .map_err(|e| ApiError::Internal(format!("Failed to read balance: {}", e)))?;

    Ok((
        axum::http::StatusCode::OK,
        Json(CreditsResponse { user_id, balance }),
    ))
}

/// Provider push notification endpoint (POST /webhooks/kie-image)
///
/// KIE calls back when a job finishes. Only the job id in the payload
/// is used; the task is reconciled against a fresh provider query so a
/// spoofed or stale callback cannot plant a result. Callbacks that do
/// not match a running task are answered with 404.
pub async fn kie_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let notice: KieWebhookNotice = super::utils::read_json_body(
        &headers,
        body,
        state.config.server.api.max_payload_bytes,
    )
    .await?;

    let progress = state
        .engine
        .reconcile_by_provider_job(&notice.data.task_id)
        .await?;

    info!(
        job_id = %notice.data.task_id,
        task_no = %progress.task.task_no,
        status = %progress.task.status,
        "Processed provider callback"
    );

    Ok(axum::http::StatusCode::OK)
}

/// Operator endpoint for topping up a user's credit balance
/// (POST /operators/credits/{user_id})
pub async fn grant_credits(
    State(state): State<AppState>,
    axum::extract::Path(user_id): axum::extract::Path<String>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let grant: GrantRequest = super::utils::read_json_body(
        &headers,
        body,
        state.config.server.api.max_payload_bytes,
    )
    .await?;

    if grant.amount <= 0 {
        return Err(ApiError::InvalidPayload(
            "amount must be positive".to_string(),
        ));
    }

    let account = state
        .credits
        .grant(&user_id, grant.amount)
        .map_err(|e| ApiError::Internal(format!("Failed to grant credits: {}", e)))?;

    Ok((
        axum::http::StatusCode::OK,
        Json(CreditsResponse {
            user_id: account.user_id,
            balance: account.balance,
        }),
    ))
}

/// Counter snapshot for operators (GET /operators/metrics)
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (axum::http::StatusCode::OK, Json(state.metrics.snapshot()))
}

/// Health check endpoint (GET /health)
///
/// Returns health status of the service components:
/// - api: Axum HTTP server
/// - fjall: ledger (Fjall KV store)
/// - storage: object storage backend
///
/// Returns 503 Service Unavailable if any component is unhealthy.
/// Returns 200 OK otherwise.
pub async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    use std::collections::HashMap;

    let mut components = HashMap::new();

    // Check each component - in v0 we assume healthy if running
    components.insert("api".to_string(), "healthy".to_string());
    components.insert("fjall".to_string(), "healthy".to_string());
    components.insert("storage".to_string(), "healthy".to_string());

    // TODO: Add actual health checks for each component
    // For now, if we can respond, we're healthy

    let all_healthy = components.values().all(|status| status == "healthy");
    let overall_status = if all_healthy {
        "healthy"
    } else {
        "unhealthy"
    };

    let status_code = if all_healthy {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    let response = super::models::HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}
