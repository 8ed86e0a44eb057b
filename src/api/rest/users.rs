use std::sync::Arc;

use axum::{extract::Extension, routing::get, Json, Router};

use crate::{
    domain::models::Principal,
    infrastructure::state::AppState,
    services::{errors::ServiceError, reports::ReportService},
};

pub fn router() -> Router {
    Router::new().route("/employees", get(list_employees))
}

async fn list_employees(
    Extension(state): Extension<Arc<AppState>>,
    user: Principal,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let employees = ReportService::new(state).list_employees(&user).await?;
    Ok(Json(serde_json::json!({ "employees": employees })))
}
