//! Role rules for leave operations.
//!
//! Every decision here is a pure function of the caller's [`Role`] (and, for
//! cancellation, the request status). Ownership checks that need the
//! employee directory are carried out by the service.

use crate::model::{leave_request::StatusKind, role::Role};

/// Whose records a role may act on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Any employee, named explicitly by the caller.
    AnyEmployee,
    /// Only the employee record linked to the caller's user account.
    OwnOnly,
}

/// Scope for apply, balance and listing operations.
pub fn employee_scope(role: Role) -> Scope {
    match role {
        Role::Admin | Role::HrOfficer | Role::Master | Role::MasterAdmin => Scope::AnyEmployee,
        Role::Viewer | Role::FinanceOfficer => Scope::OwnOnly,
    }
}

pub fn can_read_leave_types(_role: Role) -> bool {
    true
}

pub fn can_list_locked_dates(role: Role) -> bool {
    role.is_admin() || role.is_hr() || role.is_staff() || role.is_master()
}

/// Creating, updating and deactivating leave types; locking and unlocking dates.
pub fn can_manage_reference_data(role: Role) -> bool {
    role.is_admin()
}

/// Approve, reject and absence conversion.
pub fn can_decide(role: Role) -> bool {
    role.is_admin() || role.is_hr()
}

/// Master update and master delete.
pub fn can_override(role: Role) -> bool {
    role.is_master()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CancelRule {
    Allowed,
    /// Allowed only if the caller owns the request.
    OwnerOnly,
    Forbidden,
    /// The current status has no cancellation path.
    NoTransition,
}

pub fn cancel_rule(role: Role, status: StatusKind) -> CancelRule {
    match status {
        StatusKind::Pending if can_decide(role) => CancelRule::Allowed,
        StatusKind::Pending => CancelRule::OwnerOnly,
        StatusKind::Approved if can_decide(role) => CancelRule::Allowed,
        StatusKind::Approved => CancelRule::Forbidden,
        StatusKind::Rejected | StatusKind::Cancelled => CancelRule::NoTransition,
    }
}
