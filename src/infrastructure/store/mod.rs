//! Report persistence and the user directory.
//!
//! Both sit behind traits so the services run unchanged against Postgres or
//! the in-process `memory` provider used by tests and local demos.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    domain::models::{NewReport, Report, ReportPatch, Role, User},
    infrastructure::{config::StoreConfig, db::PgPool},
    services::errors::ServiceError,
};

pub mod memory;
pub mod postgres;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::{MemoryReportStore, MemoryUserDirectory};
pub use postgres::{PgReportStore, PgUserDirectory};

/// Durable report records keyed by id.
///
/// The store enforces optimistic concurrency on `update` but nothing else:
/// authorization and transition rules are checked by the services first.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persists a new report as `submitted` at version 0.
    async fn create(&self, report: NewReport) -> Result<Uuid, ServiceError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Report, ServiceError>;
    /// Newest first.
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Report>, ServiceError>;
    /// Newest first.
    async fn list_by_assignee(&self, assignee_id: Uuid) -> Result<Vec<Report>, ServiceError>;
    /// Newest first.
    async fn list_all(&self) -> Result<Vec<Report>, ServiceError>;
    /// Applies `patch` only if the stored version still equals
    /// `expected_version`; otherwise fails with `ServiceError::Conflict` and
    /// leaves the record untouched.
    async fn update(
        &self,
        id: Uuid,
        expected_version: i32,
        patch: ReportPatch,
    ) -> Result<Report, ServiceError>;
    async fn delete(&self, id: Uuid) -> Result<(), ServiceError>;
}

/// Read access to known principals, fed by the identity service.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ServiceError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;
    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, ServiceError>;
    async fn insert(&self, user: User) -> Result<(), ServiceError>;
}

pub struct Stores {
    pub reports: Arc<dyn ReportStore>,
    pub users: Arc<dyn UserDirectory>,
}

/// Builds the configured backends. `pool` is required for `postgres`.
pub fn build_stores(config: &StoreConfig, pool: Option<PgPool>) -> anyhow::Result<Stores> {
    match config.provider.as_str() {
        "postgres" => {
            let Some(pool) = pool else {
                anyhow::bail!("postgres store provider requires a database pool");
            };
            Ok(Stores {
                reports: Arc::new(PgReportStore::new(pool.clone())),
                users: Arc::new(PgUserDirectory::new(pool)),
            })
        }
        "memory" => Ok(Stores {
            reports: Arc::new(MemoryReportStore::default()),
            users: Arc::new(MemoryUserDirectory::default()),
        }),
        other => anyhow::bail!("unsupported store provider: {other}"),
    }
}
