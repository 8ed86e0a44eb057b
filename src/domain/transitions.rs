use crate::{domain::models::ReportStatus, services::errors::ServiceError};

/// Directed edges a report status may follow. Anything absent here, including
/// staying on the same status, is illegal.
const EDGES: &[(ReportStatus, ReportStatus)] = &[
    (ReportStatus::Submitted, ReportStatus::Assigned),
    (ReportStatus::Assigned, ReportStatus::InProgress),
    (ReportStatus::InProgress, ReportStatus::Resolved),
    (ReportStatus::Submitted, ReportStatus::Rejected),
    (ReportStatus::Assigned, ReportStatus::Rejected),
];

pub fn is_allowed(current: ReportStatus, requested: ReportStatus) -> bool {
    EDGES
        .iter()
        .any(|&(from, to)| from == current && to == requested)
}

pub fn is_terminal(status: ReportStatus) -> bool {
    !EDGES.iter().any(|&(from, _)| from == status)
}

pub fn validate(current: ReportStatus, requested: ReportStatus) -> Result<(), ServiceError> {
    if is_allowed(current, requested) {
        Ok(())
    } else {
        Err(ServiceError::IllegalTransition {
            from: current,
            to: requested,
        })
    }
}
