use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

use crate::api::leave::{ConvertAbsenceInput, YearQuery};
use crate::model::{
    balance::{Balance, BalanceSummary},
    leave_request::{
        ApplyInput, DecisionInput, LeaveRequest, LeaveRequestItem, LeaveStatus, RequestFilter, RequestList,
        Stamp, StatusKind,
    },
    leave_type::{LeaveType, LeaveTypeInput},
    locked_date::{LockDateInput, LockedDate},
    role::Role,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Leave API",
        version = "1.0.0",
        description = r#"
## Leave Request & Balance Engine

Leave requests, approvals and per-employee balances for the HRM system.

### 🔹 Key Features
- **Leave Types**: entitlement, paid and approval flags; deactivated, never deleted
- **Locked Dates**: days on which no leave may be taken
- **Leave Requests**: apply, approve, reject, cancel, master override
- **Balances**: total, reserved, pending, approved and available days per type and year

### 🔐 Security
All endpoints require a **JWT Bearer** token. What a caller may do depends on
the role carried in the token (Admin, HR Officer, Finance Officer, Viewer,
Master, Master Admin).

### 📦 Response Format
- JSON; errors are `{ "message": "..." }`
- Pagination supported for the request list
"#,
    ),
    paths(
        crate::api::leave::list_leave_types,
        crate::api::leave::create_leave_type,
        crate::api::leave::update_leave_type,
        crate::api::leave::deactivate_leave_type,

        crate::api::leave::list_locked_dates,
        crate::api::leave::lock_date,
        crate::api::leave::unlock_date,

        crate::api::leave::list_requests,
        crate::api::leave::apply_leave,
        crate::api::leave::get_request,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,
        crate::api::leave::cancel_leave,
        crate::api::leave::master_update,
        crate::api::leave::master_delete,
        crate::api::leave::convert_absence,

        crate::api::leave::my_balance,
        crate::api::leave::employee_balance
    ),
    components(
        schemas(
            LeaveType,
            LeaveTypeInput,
            LockedDate,
            LockDateInput,
            LeaveRequest,
            LeaveRequestItem,
            LeaveStatus,
            Stamp,
            StatusKind,
            Role,
            ApplyInput,
            DecisionInput,
            RequestFilter,
            RequestList,
            ConvertAbsenceInput,
            YearQuery,
            Balance,
            BalanceSummary
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave request lifecycle APIs"),
        (name = "Leave Types", description = "Leave type administration APIs"),
        (name = "Locked Dates", description = "Locked date administration APIs"),
        (name = "Balance", description = "Leave balance APIs"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_leave_route_is_documented() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/api/v1/leave/types",
            "/api/v1/leave/types/{id}",
            "/api/v1/leave/locked-dates",
            "/api/v1/leave/locked-dates/{date}",
            "/api/v1/leave/requests",
            "/api/v1/leave/requests/{id}",
            "/api/v1/leave/requests/{id}/approve",
            "/api/v1/leave/requests/{id}/reject",
            "/api/v1/leave/requests/{id}/cancel",
            "/api/v1/leave/requests/{id}/master",
            "/api/v1/leave/absences/convert",
            "/api/v1/leave/balance/me",
            "/api/v1/leave/balance/{employee_id}",
        ] {
            assert!(paths.contains(&expected), "{expected} missing from OpenAPI doc");
        }
        assert!(doc.components.unwrap().security_schemes.contains_key("bearer_auth"));
    }
}
