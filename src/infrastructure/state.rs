use std::sync::Arc;

use crate::infrastructure::{
    auth::JwtKeys,
    config::Config,
    store::{ReportStore, Stores, UserDirectory},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub reports: Arc<dyn ReportStore>,
    pub users: Arc<dyn UserDirectory>,
    pub jwt_keys: JwtKeys,
}

impl AppState {
    pub fn new(config: Arc<Config>, stores: Stores) -> Self {
        let jwt_keys = JwtKeys::new(&config.auth.jwt_secret);
        Self {
            config,
            reports: stores.reports,
            users: stores.users,
            jwt_keys,
        }
    }
}
