//! Report store wrapper for exercising writes that race a service's load.

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{MemoryReportStore, ReportStore};
use crate::{
    domain::models::{NewReport, Report, ReportPatch},
    services::errors::ServiceError,
};

/// Delegates to a [`MemoryReportStore`], except that the next `get_by_id`
/// returns its snapshot and only then applies the queued patches, each at
/// the version current at that moment.
#[derive(Default)]
pub(crate) struct InterleavingStore {
    inner: MemoryReportStore,
    queued: Mutex<Vec<ReportPatch>>,
}

impl InterleavingStore {
    pub(crate) fn interleave(&self, patches: Vec<ReportPatch>) {
        *self.queued.lock() = patches;
    }
}

#[async_trait]
impl ReportStore for InterleavingStore {
    async fn create(&self, report: NewReport) -> Result<Uuid, ServiceError> {
        self.inner.create(report).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Report, ServiceError> {
        let snapshot = self.inner.get_by_id(id).await?;
        let queued = std::mem::take(&mut *self.queued.lock());
        for patch in queued {
            let current = self.inner.get_by_id(id).await?;
            self.inner.update(id, current.version, patch).await?;
        }
        Ok(snapshot)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Report>, ServiceError> {
        self.inner.list_by_owner(owner_id).await
    }

    async fn list_by_assignee(&self, assignee_id: Uuid) -> Result<Vec<Report>, ServiceError> {
        self.inner.list_by_assignee(assignee_id).await
    }

    async fn list_all(&self) -> Result<Vec<Report>, ServiceError> {
        self.inner.list_all().await
    }

    async fn update(
        &self,
        id: Uuid,
        expected_version: i32,
        patch: ReportPatch,
    ) -> Result<Report, ServiceError> {
        self.inner.update(id, expected_version, patch).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.inner.delete(id).await
    }
}
