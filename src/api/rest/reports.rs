use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Extension, Path,
    },
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::{
    domain::models::Principal,
    infrastructure::state::AppState,
    services::{
        errors::ServiceError,
        reports::{
            AssignReportRequest, RejectReportRequest, ReportService, SubmitReportRequest,
            UpdateStatusRequest,
        },
    },
};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_my_reports).post(submit_report))
        .route("/all", get(list_all_reports))
        .route("/assigned", get(list_assigned_reports))
        .route("/assign", put(assign_report))
        .route("/status", put(update_status))
        .route("/reject", put(reject_report))
        .route("/:id", delete(delete_report))
}

type ApiResult<T> = Result<T, ServiceError>;

/// Malformed bodies are reported as validation errors with the same envelope
/// as every other failure.
fn body<T: DeserializeOwned>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ServiceError::Validation(rejection.body_text()))
}

async fn submit_report(
    Extension(state): Extension<Arc<AppState>>,
    user: Principal,
    payload: Result<Json<SubmitReportRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let id = ReportService::new(state)
        .submit_report(&user, body(payload)?)
        .await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn list_my_reports(
    Extension(state): Extension<Arc<AppState>>,
    user: Principal,
) -> ApiResult<Json<serde_json::Value>> {
    let reports = ReportService::new(state).list_my_reports(&user).await?;
    Ok(Json(serde_json::json!({ "reports": reports })))
}

async fn list_all_reports(
    Extension(state): Extension<Arc<AppState>>,
    user: Principal,
) -> ApiResult<Json<serde_json::Value>> {
    let reports = ReportService::new(state).list_all_reports(&user).await?;
    Ok(Json(serde_json::json!({ "reports": reports })))
}

async fn list_assigned_reports(
    Extension(state): Extension<Arc<AppState>>,
    user: Principal,
) -> ApiResult<Json<serde_json::Value>> {
    let reports = ReportService::new(state)
        .list_assigned_reports(&user)
        .await?;
    Ok(Json(serde_json::json!({ "reports": reports })))
}

async fn assign_report(
    Extension(state): Extension<Arc<AppState>>,
    user: Principal,
    payload: Result<Json<AssignReportRequest>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let report = ReportService::new(state)
        .assign_report(&user, body(payload)?)
        .await?;
    Ok(Json(serde_json::json!({ "report": report })))
}

async fn update_status(
    Extension(state): Extension<Arc<AppState>>,
    user: Principal,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let report = ReportService::new(state)
        .update_status(&user, body(payload)?)
        .await?;
    Ok(Json(serde_json::json!({ "report": report })))
}

async fn reject_report(
    Extension(state): Extension<Arc<AppState>>,
    user: Principal,
    payload: Result<Json<RejectReportRequest>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let report = ReportService::new(state)
        .reject_report(&user, body(payload)?)
        .await?;
    Ok(Json(serde_json::json!({ "report": report })))
}

async fn delete_report(
    Extension(state): Extension<Arc<AppState>>,
    user: Principal,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id.map_err(|rejection| ServiceError::Validation(rejection.body_text()))?;
    ReportService::new(state).delete_report(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
