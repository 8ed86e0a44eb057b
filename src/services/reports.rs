//! Report lifecycle operations exposed under `/api/reports`.
//!
//! Every operation runs the same sequence: ask the authorization gate, check
//! the domain rule (transition or current state), then write through the
//! report store. A failure at any step returns before anything is persisted.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::{
        authorization::{authorize, Action},
        models::{
            Location, NewReport, Principal, Report, ReportPatch, ReportStatus, ReportType, Role,
            User,
        },
        transitions,
    },
    infrastructure::state::AppState,
};

use super::{assignments::AssignmentEngine, errors::ServiceError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportRequest {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Location,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignReportRequest {
    pub report_id: Uuid,
    pub employee_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub report_id: Uuid,
    pub status: ReportStatus,
    pub expected_version: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectReportRequest {
    pub report_id: Uuid,
    pub expected_version: i32,
}

pub struct ReportService {
    state: Arc<AppState>,
}

impl ReportService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Files a new report owned by the calling citizen and returns its id.
    pub async fn submit_report(
        &self,
        actor: &Principal,
        payload: SubmitReportRequest,
    ) -> Result<Uuid, ServiceError> {
        authorize(actor, Action::Submit, None).into_result()?;

        let report_type = payload.report_type;
        let id = self
            .state
            .reports
            .create(NewReport {
                owner_id: actor.id,
                report_type,
                description: payload.description,
                location: payload.location,
            })
            .await?;

        info!(report_id = %id, owner_id = %actor.id, report_type = report_type.as_str(), "report submitted");
        Ok(id)
    }

    pub async fn list_my_reports(&self, actor: &Principal) -> Result<Vec<Report>, ServiceError> {
        authorize(actor, Action::ListMine, None).into_result()?;
        self.state.reports.list_by_owner(actor.id).await
    }

    pub async fn list_all_reports(&self, actor: &Principal) -> Result<Vec<Report>, ServiceError> {
        authorize(actor, Action::ListAll, None).into_result()?;
        self.state.reports.list_all().await
    }

    pub async fn assign_report(
        &self,
        actor: &Principal,
        payload: AssignReportRequest,
    ) -> Result<Report, ServiceError> {
        AssignmentEngine::new(Arc::clone(&self.state))
            .assign(actor, payload.report_id, payload.employee_id)
            .await
    }

    pub async fn list_assigned_reports(
        &self,
        actor: &Principal,
    ) -> Result<Vec<Report>, ServiceError> {
        authorize(actor, Action::ListAssigned, None).into_result()?;
        self.state.reports.list_by_assignee(actor.id).await
    }

    /// Moves an assigned report along the status graph on behalf of its
    /// assignee.
    ///
    /// A report that does not exist is refused exactly like one assigned to
    /// someone else. Moving to `rejected` also releases the assignee.
    pub async fn update_status(
        &self,
        actor: &Principal,
        payload: UpdateStatusRequest,
    ) -> Result<Report, ServiceError> {
        let report = match self.state.reports.get_by_id(payload.report_id).await {
            Ok(report) => Some(report),
            Err(ServiceError::NotFound) => None,
            Err(err) => return Err(err),
        };
        authorize(actor, Action::UpdateStatus, report.as_ref()).into_result()?;
        let Some(report) = report else {
            return Err(ServiceError::NotFound);
        };
        ensure_current(&report, payload.expected_version)?;

        transitions::validate(report.status, payload.status)?;

        let patch = ReportPatch {
            status: Some(payload.status),
            assignee_id: (payload.status == ReportStatus::Rejected).then_some(None),
        };
        let updated = self.write(report.id, report.version, patch).await?;

        info!(
            report_id = %updated.id,
            employee_id = %actor.id,
            from = report.status.as_str(),
            to = updated.status.as_str(),
            version = updated.version,
            "report status updated"
        );
        Ok(updated)
    }

    /// Admin rejection of a report that has not started work yet.
    pub async fn reject_report(
        &self,
        actor: &Principal,
        payload: RejectReportRequest,
    ) -> Result<Report, ServiceError> {
        authorize(actor, Action::Reject, None).into_result()?;
        let report = self.state.reports.get_by_id(payload.report_id).await?;
        ensure_current(&report, payload.expected_version)?;
        transitions::validate(report.status, ReportStatus::Rejected)?;

        let patch = ReportPatch {
            status: Some(ReportStatus::Rejected),
            assignee_id: Some(None),
        };
        let updated = self.write(report.id, report.version, patch).await?;

        info!(report_id = %updated.id, admin_id = %actor.id, version = updated.version, "report rejected");
        Ok(updated)
    }

    pub async fn delete_report(&self, actor: &Principal, report_id: Uuid) -> Result<(), ServiceError> {
        authorize(actor, Action::Delete, None).into_result()?;
        self.state.reports.delete(report_id).await?;
        info!(%report_id, admin_id = %actor.id, "report deleted");
        Ok(())
    }

    /// Employees an admin can hand reports to.
    pub async fn list_employees(&self, actor: &Principal) -> Result<Vec<User>, ServiceError> {
        authorize(actor, Action::ListEmployees, None).into_result()?;
        self.state.users.list_by_role(Role::Employee).await
    }

    async fn write(
        &self,
        report_id: Uuid,
        expected_version: i32,
        patch: ReportPatch,
    ) -> Result<Report, ServiceError> {
        self.state
            .reports
            .update(report_id, expected_version, patch)
            .await
            .inspect_err(|err| {
                if matches!(err, ServiceError::Conflict) {
                    warn!(%report_id, expected_version, "report changed between load and write");
                }
            })
    }
}

/// The caller's version must match the record the rules were checked against.
fn ensure_current(report: &Report, expected_version: i32) -> Result<(), ServiceError> {
    if report.version != expected_version {
        warn!(
            report_id = %report.id,
            expected_version,
            stored_version = report.version,
            "rejected write with stale version"
        );
        return Err(ServiceError::Conflict);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        domain::models::Coordinates,
        infrastructure::{
            config::Config,
            store::{self, testing::InterleavingStore, MemoryUserDirectory, Stores},
        },
    };

    struct Fixture {
        state: Arc<AppState>,
        service: ReportService,
        citizen: Principal,
        admin: Principal,
        employee: Principal,
    }

    async fn fixture() -> Fixture {
        let mut config = Config::default();
        config.store.provider = "memory".to_string();
        let stores = store::build_stores(&config.store, None).unwrap();
        fixture_with(config, stores).await
    }

    /// Fixture whose report store lets queued writes land right after the
    /// service loads a report.
    async fn interleaving_fixture() -> (Fixture, Arc<InterleavingStore>) {
        let reports = Arc::new(InterleavingStore::default());
        let stores = Stores {
            reports: reports.clone(),
            users: Arc::new(MemoryUserDirectory::default()),
        };
        (fixture_with(Config::default(), stores).await, reports)
    }

    async fn fixture_with(config: Config, stores: Stores) -> Fixture {
        let state = Arc::new(AppState::new(Arc::new(config), stores));

        let employee = Principal {
            id: Uuid::new_v4(),
            role: Role::Employee,
            name: "Ravi".to_string(),
        };
        state
            .users
            .insert(User {
                id: employee.id,
                name: employee.name.clone(),
                email: "ravi@city.gov".to_string(),
                role: Role::Employee,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        Fixture {
            service: ReportService::new(Arc::clone(&state)),
            state,
            citizen: Principal {
                id: Uuid::new_v4(),
                role: Role::Citizen,
                name: "Mina".to_string(),
            },
            admin: Principal {
                id: Uuid::new_v4(),
                role: Role::Admin,
                name: "Yogendra".to_string(),
            },
            employee,
        }
    }

    fn leak_request() -> SubmitReportRequest {
        SubmitReportRequest {
            report_type: ReportType::Water,
            description: "leak".to_string(),
            location: Location {
                address: "4 Canal Rd".to_string(),
                city: "Lalitpur".to_string(),
                postal_code: "44700".to_string(),
                country: "Nepal".to_string(),
                coordinates: Some(Coordinates {
                    longitude: 85.3240,
                    latitude: 27.6588,
                }),
            },
        }
    }

    fn status(report_id: Uuid, status: ReportStatus, expected_version: i32) -> UpdateStatusRequest {
        UpdateStatusRequest {
            report_id,
            status,
            expected_version,
        }
    }

    #[tokio::test]
    async fn full_lifecycle_bumps_version_at_each_step() {
        let f = fixture().await;

        let id = f.service.submit_report(&f.citizen, leak_request()).await.unwrap();
        let submitted = f.state.reports.get_by_id(id).await.unwrap();
        assert_eq!(submitted.status, ReportStatus::Submitted);
        assert_eq!(submitted.version, 0);
        assert_eq!(submitted.location.city, "Lalitpur");

        let assigned = f
            .service
            .assign_report(
                &f.admin,
                AssignReportRequest {
                    report_id: id,
                    employee_id: f.employee.id,
                },
            )
            .await
            .unwrap();
        assert_eq!(assigned.status, ReportStatus::Assigned);
        assert_eq!(assigned.assignee_id, Some(f.employee.id));
        assert_eq!(assigned.version, 1);

        let in_progress = f
            .service
            .update_status(&f.employee, status(id, ReportStatus::InProgress, 1))
            .await
            .unwrap();
        assert_eq!(in_progress.status, ReportStatus::InProgress);
        assert_eq!(in_progress.version, 2);

        let resolved = f
            .service
            .update_status(&f.employee, status(id, ReportStatus::Resolved, 2))
            .await
            .unwrap();
        assert_eq!(resolved.status, ReportStatus::Resolved);
        assert_eq!(resolved.version, 3);

        let err = f
            .service
            .update_status(&f.employee, status(id, ReportStatus::InProgress, 3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::IllegalTransition {
                from: ReportStatus::Resolved,
                to: ReportStatus::InProgress
            }
        ));
        assert_eq!(f.state.reports.get_by_id(id).await.unwrap(), resolved);
    }

    #[tokio::test]
    async fn citizens_only_see_their_own_reports() {
        let f = fixture().await;
        let neighbour = Principal {
            id: Uuid::new_v4(),
            role: Role::Citizen,
            name: "Neighbour".to_string(),
        };

        let mine = f.service.submit_report(&f.citizen, leak_request()).await.unwrap();
        let theirs = f.service.submit_report(&neighbour, leak_request()).await.unwrap();

        let listed = f.service.list_my_reports(&f.citizen).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine);
        assert!(listed.iter().all(|report| report.id != theirs));

        let all = f.service.list_all_reports(&f.admin).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(matches!(
            f.service.list_all_reports(&f.citizen).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn only_the_assignee_may_update_status() {
        let f = fixture().await;
        let id = f.service.submit_report(&f.citizen, leak_request()).await.unwrap();
        f.service
            .assign_report(
                &f.admin,
                AssignReportRequest {
                    report_id: id,
                    employee_id: f.employee.id,
                },
            )
            .await
            .unwrap();

        let colleague = Principal {
            id: Uuid::new_v4(),
            role: Role::Employee,
            name: "Colleague".to_string(),
        };
        let err = f
            .service
            .update_status(&colleague, status(id, ReportStatus::InProgress, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let missing = f
            .service
            .update_status(&colleague, status(Uuid::new_v4(), ReportStatus::InProgress, 0))
            .await
            .unwrap_err();
        assert!(matches!(missing, ServiceError::Forbidden(_)));

        assert!(f
            .service
            .list_assigned_reports(&colleague)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            f.service
                .list_assigned_reports(&f.employee)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict_and_changes_nothing() {
        let f = fixture().await;
        let id = f.service.submit_report(&f.citizen, leak_request()).await.unwrap();
        let assigned = f
            .service
            .assign_report(
                &f.admin,
                AssignReportRequest {
                    report_id: id,
                    employee_id: f.employee.id,
                },
            )
            .await
            .unwrap();

        let err = f
            .service
            .update_status(&f.employee, status(id, ReportStatus::InProgress, 0))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Conflict));
        assert_eq!(f.state.reports.get_by_id(id).await.unwrap(), assigned);
    }

    #[tokio::test]
    async fn resolved_report_stays_resolved_when_it_changes_after_load() {
        let (f, reports) = interleaving_fixture().await;
        let id = f.service.submit_report(&f.citizen, leak_request()).await.unwrap();
        f.service
            .assign_report(
                &f.admin,
                AssignReportRequest {
                    report_id: id,
                    employee_id: f.employee.id,
                },
            )
            .await
            .unwrap();

        let progress = |to| ReportPatch {
            status: Some(to),
            assignee_id: None,
        };

        // The service loads v1 (assigned); the assignee's own writes then take
        // the report to resolved at v3 before the rejection is written.
        reports.interleave(vec![
            progress(ReportStatus::InProgress),
            progress(ReportStatus::Resolved),
        ]);
        let err = f
            .service
            .update_status(&f.employee, status(id, ReportStatus::Rejected, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict));

        let stored = f.state.reports.get_by_id(id).await.unwrap();
        assert_eq!(stored.status, ReportStatus::Resolved);
        assert_eq!(stored.version, 3);
        assert_eq!(stored.assignee_id, Some(f.employee.id));
    }

    #[tokio::test]
    async fn write_after_load_is_refused_even_with_loaded_version() {
        let (f, reports) = interleaving_fixture().await;
        let id = f.service.submit_report(&f.citizen, leak_request()).await.unwrap();
        f.service
            .assign_report(
                &f.admin,
                AssignReportRequest {
                    report_id: id,
                    employee_id: f.employee.id,
                },
            )
            .await
            .unwrap();

        reports.interleave(vec![ReportPatch {
            status: Some(ReportStatus::InProgress),
            assignee_id: None,
        }]);
        let err = f
            .service
            .update_status(&f.employee, status(id, ReportStatus::Rejected, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict));
        let stored = f.state.reports.get_by_id(id).await.unwrap();
        assert_eq!(stored.status, ReportStatus::InProgress);
        assert_eq!(stored.version, 2);

        let pending = f.service.submit_report(&f.citizen, leak_request()).await.unwrap();
        reports.interleave(vec![ReportPatch {
            status: Some(ReportStatus::Assigned),
            assignee_id: Some(Some(f.employee.id)),
        }]);
        let err = f
            .service
            .reject_report(
                &f.admin,
                RejectReportRequest {
                    report_id: pending,
                    expected_version: 0,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict));
        let stored = f.state.reports.get_by_id(pending).await.unwrap();
        assert_eq!(stored.status, ReportStatus::Assigned);
        assert_eq!(stored.assignee_id, Some(f.employee.id));
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn assignment_racing_another_write_is_a_conflict() {
        let (f, reports) = interleaving_fixture().await;
        let id = f.service.submit_report(&f.citizen, leak_request()).await.unwrap();

        // Bumps the version without leaving `submitted`.
        reports.interleave(vec![ReportPatch::default()]);
        let err = f
            .service
            .assign_report(
                &f.admin,
                AssignReportRequest {
                    report_id: id,
                    employee_id: f.employee.id,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict));

        let stored = f.state.reports.get_by_id(id).await.unwrap();
        assert_eq!(stored.status, ReportStatus::Submitted);
        assert_eq!(stored.assignee_id, None);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn rejection_releases_the_assignee() {
        let f = fixture().await;
        let id = f.service.submit_report(&f.citizen, leak_request()).await.unwrap();
        f.service
            .assign_report(
                &f.admin,
                AssignReportRequest {
                    report_id: id,
                    employee_id: f.employee.id,
                },
            )
            .await
            .unwrap();

        let rejected = f
            .service
            .update_status(&f.employee, status(id, ReportStatus::Rejected, 1))
            .await
            .unwrap();

        assert_eq!(rejected.status, ReportStatus::Rejected);
        assert_eq!(rejected.assignee_id, None);
        assert!(f
            .service
            .list_assigned_reports(&f.employee)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn admin_rejects_submitted_report_but_not_work_in_progress() {
        let f = fixture().await;
        let untouched = f.service.submit_report(&f.citizen, leak_request()).await.unwrap();
        let rejected = f
            .service
            .reject_report(
                &f.admin,
                RejectReportRequest {
                    report_id: untouched,
                    expected_version: 0,
                },
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, ReportStatus::Rejected);
        assert_eq!(rejected.version, 1);

        let started = f.service.submit_report(&f.citizen, leak_request()).await.unwrap();
        f.service
            .assign_report(
                &f.admin,
                AssignReportRequest {
                    report_id: started,
                    employee_id: f.employee.id,
                },
            )
            .await
            .unwrap();
        f.service
            .update_status(&f.employee, status(started, ReportStatus::InProgress, 1))
            .await
            .unwrap();

        let err = f
            .service
            .reject_report(
                &f.admin,
                RejectReportRequest {
                    report_id: started,
                    expected_version: 2,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn terminal_reports_remain_deletable_by_admin() {
        let f = fixture().await;
        let id = f.service.submit_report(&f.citizen, leak_request()).await.unwrap();
        f.service
            .reject_report(
                &f.admin,
                RejectReportRequest {
                    report_id: id,
                    expected_version: 0,
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            f.service.delete_report(&f.citizen, id).await,
            Err(ServiceError::Forbidden(_))
        ));
        f.service.delete_report(&f.admin, id).await.unwrap();
        assert!(matches!(
            f.service.delete_report(&f.admin, id).await,
            Err(ServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn submit_is_citizen_only_and_validated() {
        let f = fixture().await;

        assert!(matches!(
            f.service.submit_report(&f.admin, leak_request()).await,
            Err(ServiceError::Forbidden(_))
        ));

        let mut blank = leak_request();
        blank.description = String::new();
        assert!(matches!(
            f.service.submit_report(&f.citizen, blank).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(f.service.list_my_reports(&f.citizen).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn joined_assignments_let_exactly_one_win() {
        let f = fixture().await;
        let id = f.service.submit_report(&f.citizen, leak_request()).await.unwrap();
        let request = || AssignReportRequest {
            report_id: id,
            employee_id: f.employee.id,
        };

        let (first, second) = futures::future::join(
            f.service.assign_report(&f.admin, request()),
            f.service.assign_report(&f.admin, request()),
        )
        .await;

        let outcomes = [first, second];
        let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(outcomes.iter().any(|outcome| matches!(
            outcome,
            Err(ServiceError::Conflict) | Err(ServiceError::InvalidState(_))
        )));
        assert_eq!(f.state.reports.get_by_id(id).await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn employees_listing_is_admin_only() {
        let f = fixture().await;

        let employees = f.service.list_employees(&f.admin).await.unwrap();
        assert_eq!(employees.len(), 1);
        assert_eq!(employees[0].id, f.employee.id);

        assert!(matches!(
            f.service.list_employees(&f.employee).await,
            Err(ServiceError::Forbidden(_))
        ));
    }
}
