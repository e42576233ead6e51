//! Persistence port of the leave engine.
//!
//! One adapter per storage technology implements [`LeaveStore`]; the
//! service only ever sees this trait. Adapters report missing rows with the
//! matching policy error (`NotFound`, `TypeNotFound`) and wrap every other
//! failure in [`LeaveError::Store`](super::error::LeaveError::Store).

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::leave::error::LeaveResult;
use crate::model::{
    balance::{BalanceRow, UsedDays},
    leave_entitlement::{EntitlementVersion, LeaveEntitlement},
    leave_request::{LeaveRequest, NewLeaveRequest, RequestChange, RequestFilter, RequestList, StatusChange},
    leave_type::{LeaveType, LeaveTypeInput},
    locked_date::LockedDate,
};

#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn list_leave_types(&self) -> LeaveResult<Vec<LeaveType>>;

    async fn create_leave_type(&self, input: &LeaveTypeInput) -> LeaveResult<LeaveType>;

    async fn update_leave_type(&self, leave_type_id: u64, input: &LeaveTypeInput) -> LeaveResult<LeaveType>;

    async fn deactivate_leave_type(&self, leave_type_id: u64) -> LeaveResult<()>;

    /// Upserts by date: locking an already locked date replaces its reason.
    async fn lock_date(&self, date: NaiveDate, reason: &str, created_by: u64) -> LeaveResult<LockedDate>;

    /// Unlocking a date that is not locked is not an error.
    async fn unlock_date(&self, date: NaiveDate) -> LeaveResult<()>;

    async fn list_locked_dates(&self, year: i32) -> LeaveResult<Vec<LockedDate>>;

    /// Employee record linked to a user account, if any.
    async fn resolve_employee_by_user_id(&self, user_id: u64) -> LeaveResult<Option<u64>>;

    async fn get_leave_type(&self, leave_type_id: u64) -> LeaveResult<LeaveType>;

    /// Creates the row from the type's annual entitlement on first use.
    /// Unknown employee is `NotFound`, unknown type `TypeNotFound`.
    async fn get_or_create_entitlement(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
    ) -> LeaveResult<LeaveEntitlement>;

    /// Pending and approved working days of requests starting in `year`.
    async fn used_days(&self, employee_id: u64, leave_type_id: u64, year: i32) -> LeaveResult<UsedDays>;

    /// Approved requests of the employee intersecting `[start, end]`.
    async fn count_approved_overlap(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
        exclude_id: Option<u64>,
    ) -> LeaveResult<u64>;

    async fn any_locked_date(&self, dates: &[NaiveDate]) -> LeaveResult<bool>;

    /// Inserts in `Pending`. With a version, the write is admitted only if
    /// the entitlement is still at that version, which it then bumps.
    async fn create_request(
        &self,
        request: &NewLeaveRequest,
        version: Option<EntitlementVersion>,
    ) -> LeaveResult<LeaveRequest>;

    async fn get_request(&self, request_id: u64) -> LeaveResult<LeaveRequest>;

    /// Compare-and-set on the status; a stale `expected` status fails with
    /// `InvalidStatusTransition`.
    async fn update_request_status(
        &self,
        request_id: u64,
        change: &StatusChange,
        version: Option<EntitlementVersion>,
    ) -> LeaveResult<LeaveRequest>;

    async fn update_request_by_master(
        &self,
        request_id: u64,
        change: &RequestChange,
        version: Option<EntitlementVersion>,
    ) -> LeaveResult<LeaveRequest>;

    async fn delete_request(&self, request_id: u64) -> LeaveResult<()>;

    /// `filter.page` and `filter.page_size` are already normalized.
    async fn list_requests(&self, filter: &RequestFilter) -> LeaveResult<RequestList>;

    async fn list_balances(&self, employee_id: u64, year: i32) -> LeaveResult<Vec<BalanceRow>>;
}
