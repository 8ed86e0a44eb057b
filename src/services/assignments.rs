//! Binds submitted reports to the employee responsible for resolving them.
//!
//! Backs `PUT /api/reports/assign`. The version captured when the report is
//! loaded travels with the write, so of two admins assigning the same report
//! at once only the first lands; the second sees `ServiceError::Conflict`
//! (or `InvalidState` if it loaded after the first committed).

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::{
        authorization::{authorize, Action},
        models::{Principal, Report, ReportPatch, ReportStatus, Role},
        transitions,
    },
    infrastructure::state::AppState,
};

use super::errors::ServiceError;

pub struct AssignmentEngine {
    state: Arc<AppState>,
}

impl AssignmentEngine {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Assigns `report_id` to `employee_id` on behalf of `actor`.
    ///
    /// Fails with:
    /// * `Forbidden` unless `actor` is an admin.
    /// * `NotFound` when the report does not exist.
    /// * `InvalidState` unless the report is still `submitted`; reassignment
    ///   is not supported.
    /// * `Validation` when `employee_id` is not a known employee.
    /// * `Conflict` when another write landed after the report was loaded.
    pub async fn assign(
        &self,
        actor: &Principal,
        report_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Report, ServiceError> {
        authorize(actor, Action::Assign, None).into_result()?;

        let report = self.state.reports.get_by_id(report_id).await?;
        if report.status != ReportStatus::Submitted {
            return Err(ServiceError::InvalidState(format!(
                "report is {} and can only be assigned while submitted",
                report.status
            )));
        }

        self.ensure_employee(employee_id).await?;
        transitions::validate(report.status, ReportStatus::Assigned)?;

        let patch = ReportPatch {
            status: Some(ReportStatus::Assigned),
            assignee_id: Some(Some(employee_id)),
        };
        let updated = self
            .state
            .reports
            .update(report.id, report.version, patch)
            .await
            .inspect_err(|err| {
                if matches!(err, ServiceError::Conflict) {
                    warn!(%report_id, version = report.version, "assignment lost a version race");
                }
            })?;

        info!(
            %report_id,
            %employee_id,
            admin_id = %actor.id,
            version = updated.version,
            "report assigned"
        );
        Ok(updated)
    }

    async fn ensure_employee(&self, employee_id: Uuid) -> Result<(), ServiceError> {
        match self.state.users.find_by_id(employee_id).await? {
            Some(user) if user.role == Role::Employee => Ok(()),
            Some(user) => Err(ServiceError::Validation(format!(
                "user {employee_id} is a {} and cannot take assignments",
                user.role.as_str()
            ))),
            None => Err(ServiceError::Validation(format!(
                "unknown employee {employee_id}"
            ))),
        }
    }
}
