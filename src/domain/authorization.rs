//! Central authorization gate for report operations.
//!
//! Every report operation asks [`authorize`] before touching domain rules or
//! the store. Roles are non-hierarchical: an admin holds no citizen or
//! employee powers and vice versa.

use crate::{
    domain::models::{Principal, Report, Role},
    services::errors::ServiceError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Submit,
    ListMine,
    ListAll,
    Assign,
    ListAssigned,
    UpdateStatus,
    Delete,
    Reject,
    ListEmployees,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Submit => "submit",
            Action::ListMine => "list-mine",
            Action::ListAll => "list-all",
            Action::Assign => "assign",
            Action::ListAssigned => "list-assigned",
            Action::UpdateStatus => "update-status",
            Action::Delete => "delete",
            Action::Reject => "reject",
            Action::ListEmployees => "list-employees",
        }
    }

    fn required_role(&self) -> Role {
        match self {
            Action::Submit | Action::ListMine => Role::Citizen,
            Action::ListAssigned | Action::UpdateStatus => Role::Employee,
            Action::ListAll
            | Action::Assign
            | Action::Delete
            | Action::Reject
            | Action::ListEmployees => Role::Admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), ServiceError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(ServiceError::Forbidden(reason)),
        }
    }
}

/// Decides whether `principal` may perform `action`.
///
/// `report` is only consulted for `UpdateStatus`, which is limited to the
/// report's assignee; passing `None` there always denies, so a missing report
/// looks the same as someone else's.
pub fn authorize(principal: &Principal, action: Action, report: Option<&Report>) -> Decision {
    let required = action.required_role();
    if principal.role != required {
        return Decision::Deny(format!(
            "{} requires the {} role",
            action.as_str(),
            required.as_str()
        ));
    }

    if action == Action::UpdateStatus {
        let is_assignee = report
            .and_then(|report| report.assignee_id)
            .is_some_and(|assignee| assignee == principal.id);
        if !is_assignee {
            return Decision::Deny("report is not assigned to you".to_string());
        }
    }

    Decision::Allow
}
