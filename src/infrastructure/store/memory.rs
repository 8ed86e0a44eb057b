use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{ReportStore, UserDirectory};
use crate::{
    domain::models::{NewReport, Report, ReportPatch, ReportStatus, Role, User},
    services::errors::ServiceError,
    validation::rules::validate_new_report,
};

/// In-process report store. The lock is never held across an `.await`, so
/// each call is atomic with respect to every other call.
#[derive(Default)]
pub struct MemoryReportStore {
    reports: RwLock<HashMap<Uuid, Report>>,
}

impl MemoryReportStore {
    fn collect<F>(&self, filter: F) -> Vec<Report>
    where
        F: Fn(&Report) -> bool,
    {
        let mut reports: Vec<Report> = self
            .reports
            .read()
            .values()
            .filter(|report| filter(report))
            .cloned()
            .collect();
        reports.sort_by(newest_first);
        reports
    }
}

/// Same order as the Postgres listings: `created_at DESC, id DESC`.
fn newest_first(a: &Report, b: &Report) -> Ordering {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn create(&self, report: NewReport) -> Result<Uuid, ServiceError> {
        validate_new_report(&report)?;
        let now = Utc::now();
        let record = Report {
            id: Uuid::new_v4(),
            owner_id: report.owner_id,
            report_type: report.report_type,
            description: report.description,
            location: report.location,
            status: ReportStatus::Submitted,
            assignee_id: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        let id = record.id;
        self.reports.write().insert(id, record);
        Ok(id)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Report, ServiceError> {
        self.reports
            .read()
            .get(&id)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Report>, ServiceError> {
        Ok(self.collect(|report| report.owner_id == owner_id))
    }

    async fn list_by_assignee(&self, assignee_id: Uuid) -> Result<Vec<Report>, ServiceError> {
        Ok(self.collect(|report| report.assignee_id == Some(assignee_id)))
    }

    async fn list_all(&self) -> Result<Vec<Report>, ServiceError> {
        Ok(self.collect(|_| true))
    }

    async fn update(
        &self,
        id: Uuid,
        expected_version: i32,
        patch: ReportPatch,
    ) -> Result<Report, ServiceError> {
        let mut reports = self.reports.write();
        let stored = reports.get_mut(&id).ok_or(ServiceError::NotFound)?;
        if stored.version != expected_version {
            return Err(ServiceError::Conflict);
        }

        let mut updated = stored.clone();
        patch.apply(&mut updated);
        // Mirrors the `reports_assignee_matches_status` check constraint.
        if updated.assignee_id.is_some() && !updated.status.holds_assignee() {
            return Err(ServiceError::Internal(format!(
                "report {id} cannot keep an assignee while {}",
                updated.status
            )));
        }
        updated.version += 1;
        updated.updated_at = Utc::now();
        *stored = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.reports
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(ServiceError::NotFound)
    }
}

#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ServiceError> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self
            .users
            .read()
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, ServiceError> {
        let mut users: Vec<User> = self
            .users
            .read()
            .values()
            .filter(|user| user.role == role)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn insert(&self, user: User) -> Result<(), ServiceError> {
        let mut users = self.users.write();
        if users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(ServiceError::Validation(format!(
                "a user with email {} already exists",
                user.email
            )));
        }
        users.insert(user.id, user);
        Ok(())
    }
}
