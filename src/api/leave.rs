use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::api::error::ApiError;
use crate::auth::auth::AuthUser;
use crate::leave::service::LeaveService;
use crate::model::{
    balance::BalanceSummary,
    leave_request::{ApplyInput, DecisionInput, LeaveRequest, RequestFilter, RequestList},
    leave_type::{LeaveType, LeaveTypeInput},
    locked_date::{LockDateInput, LockedDate},
};

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct YearQuery {
    /// Calendar year, defaults to the current year
    #[schema(example = 2026)]
    pub year: Option<i32>,
}

impl YearQuery {
    fn year(&self) -> i32 {
        self.year.unwrap_or_else(|| Utc::now().year())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConvertAbsenceInput {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026-02-23", format = "date")]
    pub date: String,
    #[schema(example = 1)]
    pub leave_type_id: u64,
}

fn decision(payload: Option<web::Json<DecisionInput>>) -> DecisionInput {
    payload.map(web::Json::into_inner).unwrap_or_default()
}

/* =========================
Leave types
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/types",
    responses(
        (status = 200, description = "All leave types, active or not", body = [LeaveType]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Types"
)]
pub async fn list_leave_types(auth: AuthUser, service: web::Data<LeaveService>) -> ApiResult<impl Responder> {
    let types = service.list_leave_types(&auth.actor()).await?;
    Ok(HttpResponse::Ok().json(types))
}

#[utoipa::path(
    post,
    path = "/api/v1/leave/types",
    request_body(content = LeaveTypeInput, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave type created", body = Object, example = json!({
            "message": "Leave type created",
            "data": { "id": 1, "name": "Annual" }
        })),
        (status = 400, description = "Blank name or negative entitlement"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Types"
)]
pub async fn create_leave_type(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    payload: web::Json<LeaveTypeInput>,
) -> ApiResult<impl Responder> {
    let created = service.create_leave_type(&auth.actor(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave type created",
        "data": created
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/leave/types/{id}",
    params(("id" = u64, Path, description = "Leave type id")),
    request_body(content = LeaveTypeInput, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave type updated", body = Object),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Leave type not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Types"
)]
pub async fn update_leave_type(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    payload: web::Json<LeaveTypeInput>,
) -> ApiResult<impl Responder> {
    let updated = service
        .update_leave_type(&auth.actor(), path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave type updated",
        "data": updated
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/leave/types/{id}",
    params(("id" = u64, Path, description = "Leave type id")),
    responses(
        (status = 200, description = "Leave type deactivated", body = Object, example = json!({
            "message": "Leave type deactivated"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Leave type not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Types"
)]
pub async fn deactivate_leave_type(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> ApiResult<impl Responder> {
    service.deactivate_leave_type(&auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Leave type deactivated" })))
}

/* =========================
Locked dates
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/locked-dates",
    params(YearQuery),
    responses(
        (status = 200, description = "Locked dates of the year", body = [LockedDate]),
        (status = 400, description = "Year before 2000")
    ),
    security(("bearer_auth" = [])),
    tag = "Locked Dates"
)]
pub async fn list_locked_dates(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<YearQuery>,
) -> ApiResult<impl Responder> {
    let dates = service.list_locked_dates(&auth.actor(), query.year()).await?;
    Ok(HttpResponse::Ok().json(dates))
}

#[utoipa::path(
    post,
    path = "/api/v1/leave/locked-dates",
    request_body(content = LockDateInput, content_type = "application/json"),
    responses(
        (status = 200, description = "Date locked; locking again replaces the reason", body = Object),
        (status = 400, description = "Date is not YYYY-MM-DD"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Locked Dates"
)]
pub async fn lock_date(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    payload: web::Json<LockDateInput>,
) -> ApiResult<impl Responder> {
    let locked = service.lock_date(&auth.actor(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Date locked",
        "data": locked
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/leave/locked-dates/{date}",
    params(("date" = String, Path, description = "Date to unlock, YYYY-MM-DD")),
    responses(
        (status = 200, description = "Date unlocked", body = Object, example = json!({
            "message": "Date unlocked"
        })),
        (status = 400, description = "Date is not YYYY-MM-DD"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Locked Dates"
)]
pub async fn unlock_date(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<String>,
) -> ApiResult<impl Responder> {
    service.unlock_date(&auth.actor(), &path).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Date unlocked" })))
}

/* =========================
Leave requests
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/requests",
    params(RequestFilter),
    responses(
        (status = 200, description = "Paginated leave requests, newest first", body = RequestList),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee record linked to the caller")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_requests(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<RequestFilter>,
) -> ApiResult<impl Responder> {
    let list = service.list_requests(&auth.actor(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(list))
}

#[utoipa::path(
    post,
    path = "/api/v1/leave/requests",
    request_body(
        content = ApplyInput,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave request submitted", body = Object, example = json!({
            "message": "Leave request submitted",
            "data": { "id": 1, "working_days": 3, "status": { "state": "Pending" } }
        })),
        (status = 400, description = "Invalid input or no working days"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave type not found or inactive"),
        (status = 409, description = "Locked date, approved overlap or concurrent change"),
        (status = 422, description = "Insufficient balance")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn apply_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    payload: web::Json<ApplyInput>,
) -> ApiResult<impl Responder> {
    let created = service.apply(&auth.actor(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave request submitted",
        "data": created
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/leave/requests/{id}",
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 403, description = "Not the caller's request"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_request(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> ApiResult<impl Responder> {
    let request = service.get_request(&auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/v1/leave/requests/{id}/approve",
    params(("id" = u64, Path, description = "ID of the leave request to approve")),
    request_body(content = Option<DecisionInput>, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave approved", body = Object, example = json!({
            "message": "Leave approved"
        })),
        (status = 403, description = "Admin/HR only"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request is not pending, or balance changed concurrently"),
        (status = 422, description = "Insufficient balance")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    payload: Option<web::Json<DecisionInput>>,
) -> ApiResult<impl Responder> {
    let updated = service
        .approve(&auth.actor(), path.into_inner(), decision(payload))
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave approved",
        "data": updated
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/leave/requests/{id}/reject",
    params(("id" = u64, Path, description = "ID of the leave request to reject")),
    request_body(content = Option<DecisionInput>, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave rejected", body = Object, example = json!({
            "message": "Leave rejected"
        })),
        (status = 403, description = "Admin/HR only"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request is not pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    payload: Option<web::Json<DecisionInput>>,
) -> ApiResult<impl Responder> {
    let updated = service
        .reject(&auth.actor(), path.into_inner(), decision(payload))
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave rejected",
        "data": updated
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/leave/requests/{id}/cancel",
    params(("id" = u64, Path, description = "ID of the leave request to cancel")),
    request_body(content = Option<DecisionInput>, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave cancelled", body = Object, example = json!({
            "message": "Leave cancelled"
        })),
        (status = 403, description = "Not the owner, or approved leave cancelled by non Admin/HR"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request already rejected or cancelled")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    payload: Option<web::Json<DecisionInput>>,
) -> ApiResult<impl Responder> {
    let updated = service
        .cancel(&auth.actor(), path.into_inner(), decision(payload))
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave cancelled",
        "data": updated
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/leave/requests/{id}/master",
    params(("id" = u64, Path, description = "Leave request id")),
    request_body(content = ApplyInput, description = "employee_id is required", content_type = "application/json"),
    responses(
        (status = 200, description = "Leave request rewritten, status kept", body = Object),
        (status = 400, description = "Invalid input or no working days"),
        (status = 403, description = "Master tier only"),
        (status = 404, description = "Leave request or type not found"),
        (status = 409, description = "Locked date, approved overlap or concurrent change"),
        (status = 422, description = "Insufficient balance")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn master_update(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    payload: web::Json<ApplyInput>,
) -> ApiResult<impl Responder> {
    let updated = service
        .master_update(&auth.actor(), path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave request updated",
        "data": updated
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/leave/requests/{id}/master",
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave request deleted", body = Object, example = json!({
            "message": "Leave request deleted"
        })),
        (status = 403, description = "Master tier only"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn master_delete(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> ApiResult<impl Responder> {
    service.master_delete(&auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Leave request deleted" })))
}

#[utoipa::path(
    post,
    path = "/api/v1/leave/absences/convert",
    request_body(content = ConvertAbsenceInput, content_type = "application/json"),
    responses(
        (status = 200, description = "One-day leave request filed for the absence", body = Object),
        (status = 403, description = "Admin/HR only")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn convert_absence(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    payload: web::Json<ConvertAbsenceInput>,
) -> ApiResult<impl Responder> {
    let input = payload.into_inner();
    let created = service
        .convert_absence_to_leave(&auth.actor(), input.employee_id, &input.date, input.leave_type_id)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Absence converted to leave",
        "data": created
    })))
}

/* =========================
Balances
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/balance/me",
    params(YearQuery),
    responses(
        (status = 200, description = "Caller's balances", body = BalanceSummary),
        (status = 400, description = "Year before 2000"),
        (status = 403, description = "No employee record linked to the caller")
    ),
    security(("bearer_auth" = [])),
    tag = "Balance"
)]
pub async fn my_balance(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<YearQuery>,
) -> ApiResult<impl Responder> {
    let summary = service.me_balance(&auth.actor(), query.year()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    get,
    path = "/api/v1/leave/balance/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee id"),
        YearQuery
    ),
    responses(
        (status = 200, description = "Employee balances", body = BalanceSummary),
        (status = 400, description = "Year before 2000"),
        (status = 403, description = "Self-service roles may only read their own balance")
    ),
    security(("bearer_auth" = [])),
    tag = "Balance"
)]
pub async fn employee_balance(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    query: web::Query<YearQuery>,
) -> ApiResult<impl Responder> {
    let summary = service
        .admin_balance(&auth.actor(), path.into_inner(), query.year())
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}
