use axum::{routing::get, Router};

use crate::api::rest::{
    auth::router as auth_router, reports::router as reports_router,
    users::router as users_router,
};

pub mod auth;
pub mod health;
pub mod reports;
pub mod users;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health::healthcheck))
        .nest("/auth", auth_router())
        .nest("/users", users_router())
        .nest("/reports", reports_router())
}
