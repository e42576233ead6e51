//! Leave request lifecycle.
//!
//! ```text
//!           apply               approve
//!  (none) -------> Pending --------------> Approved
//!                   |  \----- reject ----> Rejected
//!                   \-------- cancel ----> Cancelled
//!  Approved ------- cancel (Admin/HR) ---> Cancelled
//!  any ------------ master update/delete (Master tier)
//! ```
//!
//! Every operation completes all of its checks before the single store
//! write. Writes admitted against a balance carry the entitlement version
//! the check observed, and status writes are compare-and-set, so a write
//! that raced another one fails instead of overdrawing or double-deciding.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, instrument, warn};

use crate::leave::error::{LeaveError, LeaveResult};
use crate::leave::guards::{ensure_no_approved_overlap, ensure_no_locked_dates};
use crate::leave::policy::{self, CancelRule, Scope};
use crate::leave::rules::{available_balance, compute_working_days, used_percent};
use crate::leave::store::LeaveStore;
use crate::model::{
    actor::Actor,
    balance::{Balance, BalanceSummary},
    leave_entitlement::EntitlementVersion,
    leave_request::{
        ApplyInput, DecisionInput, LeaveRequest, LeaveStatus, NewLeaveRequest, RequestChange,
        RequestFilter, RequestList, Stamp, StatusChange, StatusKind,
    },
    leave_type::LeaveType,
};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
/// Earliest year accepted by balance and calendar queries.
pub const MIN_YEAR: i32 = 2000;
pub const ABSENCE_CONVERSION_COMMENT: &str = "absence conversion";

/// Parses a `YYYY-MM-DD` calendar date, ignoring surrounding whitespace.
pub fn parse_date(value: &str) -> LeaveResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| LeaveError::InvalidInput)
}

/// Output of the apply-time validation pipeline.
struct ValidatedWindow {
    leave_type: LeaveType,
    start: NaiveDate,
    end: NaiveDate,
    working_days: i32,
    working_dates: Vec<NaiveDate>,
}

#[derive(Clone)]
pub struct LeaveService {
    pub(crate) store: Arc<dyn LeaveStore>,
}

impl LeaveService {
    pub fn new(store: Arc<dyn LeaveStore>) -> Self {
        Self { store }
    }

    #[instrument(name = "leave_apply", skip(self, input), fields(user_id = actor.user_id, role = %actor.role))]
    pub async fn apply(&self, actor: &Actor, input: ApplyInput) -> LeaveResult<LeaveRequest> {
        let employee_id = self.resolve_target_employee(actor, input.employee_id).await?;
        let window = self.validate_window(&input, employee_id, None).await?;
        let version = self.admit(employee_id, &window).await?;
        ensure_no_locked_dates(self.store.as_ref(), &window.working_dates).await?;

        let created = self
            .store
            .create_request(
                &NewLeaveRequest {
                    employee_id,
                    leave_type_id: window.leave_type.id,
                    start_date: window.start,
                    end_date: window.end,
                    working_days: window.working_days,
                    requested_by: actor.user_id,
                    comment: input.comment,
                },
                version,
            )
            .await?;

        info!(
            request_id = created.id,
            employee_id,
            leave_type_id = created.leave_type_id,
            working_days = created.working_days,
            "Leave request submitted"
        );
        Ok(created)
    }

    #[instrument(name = "leave_approve", skip(self, input), fields(user_id = actor.user_id))]
    pub async fn approve(&self, actor: &Actor, request_id: u64, input: DecisionInput) -> LeaveResult<LeaveRequest> {
        if !policy::can_decide(actor.role) {
            return Err(LeaveError::Forbidden);
        }
        let request = self.store.get_request(request_id).await?;
        if request.status.kind() != StatusKind::Pending {
            return Err(LeaveError::InvalidStatusTransition);
        }

        // Dates are immutable on approval, so only the balance is re-checked.
        let leave_type = self.store.get_leave_type(request.leave_type_id).await?;
        let version = if leave_type.counts_toward_entitlement {
            Some(
                self.check_balance(
                    request.employee_id,
                    request.leave_type_id,
                    request.start_date.year(),
                    request.working_days,
                )
                .await?,
            )
        } else {
            None
        };

        let change = StatusChange {
            expected: StatusKind::Pending,
            next: LeaveStatus::Approved {
                approved: Stamp::now(actor.user_id),
            },
            comment: input.comment,
        };
        let updated = self.store.update_request_status(request_id, &change, version).await?;
        info!(request_id, "Leave request approved");
        Ok(updated)
    }

    #[instrument(name = "leave_reject", skip(self, input), fields(user_id = actor.user_id))]
    pub async fn reject(&self, actor: &Actor, request_id: u64, input: DecisionInput) -> LeaveResult<LeaveRequest> {
        if !policy::can_decide(actor.role) {
            return Err(LeaveError::Forbidden);
        }
        let request = self.store.get_request(request_id).await?;
        if request.status.kind() != StatusKind::Pending {
            return Err(LeaveError::InvalidStatusTransition);
        }

        let change = StatusChange {
            expected: StatusKind::Pending,
            next: LeaveStatus::Rejected {
                rejected: Stamp::now(actor.user_id),
            },
            comment: input.comment,
        };
        let updated = self.store.update_request_status(request_id, &change, None).await?;
        info!(request_id, "Leave request rejected");
        Ok(updated)
    }

    #[instrument(name = "leave_cancel", skip(self, input), fields(user_id = actor.user_id))]
    pub async fn cancel(&self, actor: &Actor, request_id: u64, input: DecisionInput) -> LeaveResult<LeaveRequest> {
        let request = self.store.get_request(request_id).await?;
        let current = request.status.kind();

        match policy::cancel_rule(actor.role, current) {
            CancelRule::Allowed => {}
            CancelRule::OwnerOnly => {
                let own = self.store.resolve_employee_by_user_id(actor.user_id).await?;
                if own != Some(request.employee_id) {
                    warn!(request_id, "Cancel refused: caller does not own the request");
                    return Err(LeaveError::Forbidden);
                }
            }
            CancelRule::Forbidden => return Err(LeaveError::Forbidden),
            CancelRule::NoTransition => return Err(LeaveError::InvalidStatusTransition),
        }

        let change = StatusChange {
            expected: current,
            next: LeaveStatus::Cancelled {
                cancelled: Stamp::now(actor.user_id),
                approved: request.status.approval(),
            },
            comment: input.comment,
        };
        let updated = self.store.update_request_status(request_id, &change, None).await?;
        info!(request_id, from = %current, "Leave request cancelled");
        Ok(updated)
    }

    /// Rewrites employee, type, dates and comment of any request after
    /// re-running the full apply validation. Status and stamps are kept.
    #[instrument(name = "leave_master_update", skip(self, input), fields(user_id = actor.user_id))]
    pub async fn master_update(&self, actor: &Actor, request_id: u64, input: ApplyInput) -> LeaveResult<LeaveRequest> {
        if !policy::can_override(actor.role) {
            return Err(LeaveError::Forbidden);
        }
        if request_id == 0 {
            return Err(LeaveError::InvalidInput);
        }
        let employee_id = match input.employee_id {
            Some(id) if id > 0 => id,
            _ => return Err(LeaveError::InvalidInput),
        };

        let window = self.validate_window(&input, employee_id, Some(request_id)).await?;
        let version = self.admit(employee_id, &window).await?;
        ensure_no_locked_dates(self.store.as_ref(), &window.working_dates).await?;

        let change = RequestChange {
            employee_id,
            leave_type_id: window.leave_type.id,
            start_date: window.start,
            end_date: window.end,
            working_days: window.working_days,
            comment: input.comment,
        };
        let updated = self
            .store
            .update_request_by_master(request_id, &change, version)
            .await?;
        warn!(request_id, employee_id, "Leave request overridden by master");
        Ok(updated)
    }

    #[instrument(name = "leave_master_delete", skip(self), fields(user_id = actor.user_id))]
    pub async fn master_delete(&self, actor: &Actor, request_id: u64) -> LeaveResult<()> {
        if !policy::can_override(actor.role) {
            return Err(LeaveError::Forbidden);
        }
        if request_id == 0 {
            return Err(LeaveError::InvalidInput);
        }
        self.store.delete_request(request_id).await?;
        warn!(request_id, "Leave request deleted by master");
        Ok(())
    }

    pub async fn get_request(&self, actor: &Actor, request_id: u64) -> LeaveResult<LeaveRequest> {
        let request = self.store.get_request(request_id).await?;
        if policy::employee_scope(actor.role) == Scope::OwnOnly {
            let own = self.resolve_self(actor).await?;
            if own != request.employee_id {
                return Err(LeaveError::Forbidden);
            }
        }
        Ok(request)
    }

    /// Files a one-day request for an absence. Attendance records are left
    /// untouched.
    pub async fn convert_absence_to_leave(
        &self,
        actor: &Actor,
        employee_id: u64,
        absence_date: &str,
        leave_type_id: u64,
    ) -> LeaveResult<LeaveRequest> {
        if !policy::can_decide(actor.role) {
            return Err(LeaveError::Forbidden);
        }
        self.apply(
            actor,
            ApplyInput {
                employee_id: Some(employee_id),
                leave_type_id,
                start_date: absence_date.to_string(),
                end_date: absence_date.to_string(),
                comment: ABSENCE_CONVERSION_COMMENT.to_string(),
            },
        )
        .await
    }

    pub async fn me_balance(&self, actor: &Actor, year: i32) -> LeaveResult<BalanceSummary> {
        let employee_id = self.resolve_self(actor).await?;
        self.admin_balance(actor, employee_id, year).await
    }

    pub async fn admin_balance(&self, actor: &Actor, employee_id: u64, year: i32) -> LeaveResult<BalanceSummary> {
        if year < MIN_YEAR || employee_id == 0 {
            return Err(LeaveError::InvalidInput);
        }
        if policy::employee_scope(actor.role) == Scope::OwnOnly {
            let own = self.resolve_self(actor).await?;
            if own != employee_id {
                warn!(employee_id, "Balance query refused: not the caller's record");
                return Err(LeaveError::Forbidden);
            }
        }

        let items = self
            .store
            .list_balances(employee_id, year)
            .await?
            .into_iter()
            .map(|row| Balance {
                available: available_balance(row.total, row.reserved, row.pending, row.approved),
                used_percent: used_percent(row.total, row.pending, row.approved),
                employee_id: row.employee_id,
                year: row.year,
                leave_type_id: row.leave_type_id,
                type_name: row.type_name,
                total: row.total,
                reserved: row.reserved,
                pending: row.pending,
                approved: row.approved,
            })
            .collect();

        Ok(BalanceSummary {
            employee_id,
            year,
            items,
        })
    }

    pub async fn list_requests(&self, actor: &Actor, mut filter: RequestFilter) -> LeaveResult<RequestList> {
        filter.page = Some(filter.page.unwrap_or(1).max(1));
        filter.page_size = Some(match filter.page_size {
            None | Some(0) => DEFAULT_PAGE_SIZE,
            Some(size) => size.min(MAX_PAGE_SIZE),
        });

        if policy::employee_scope(actor.role) == Scope::OwnOnly {
            filter.employee_id = Some(self.resolve_self(actor).await?);
        }
        debug!(?filter, "Listing leave requests");
        self.store.list_requests(&filter).await
    }

    /// The caller's own employee id; no directory link means forbidden.
    pub(crate) async fn resolve_self(&self, actor: &Actor) -> LeaveResult<u64> {
        self.store
            .resolve_employee_by_user_id(actor.user_id)
            .await?
            .ok_or_else(|| {
                warn!(user_id = actor.user_id, "No employee linked to user");
                LeaveError::Forbidden
            })
    }

    async fn resolve_target_employee(&self, actor: &Actor, requested: Option<u64>) -> LeaveResult<u64> {
        match policy::employee_scope(actor.role) {
            Scope::AnyEmployee => match requested {
                Some(id) if id > 0 => Ok(id),
                _ => Err(LeaveError::InvalidInput),
            },
            Scope::OwnOnly => self.resolve_self(actor).await,
        }
    }

    /// Date window, active type, working days and approved-overlap checks.
    async fn validate_window(
        &self,
        input: &ApplyInput,
        employee_id: u64,
        exclude_id: Option<u64>,
    ) -> LeaveResult<ValidatedWindow> {
        if input.leave_type_id == 0 {
            return Err(LeaveError::InvalidInput);
        }
        let start = parse_date(&input.start_date)?;
        let end = parse_date(&input.end_date)?;
        if end < start {
            return Err(LeaveError::InvalidInput);
        }

        let leave_type = self.store.get_leave_type(input.leave_type_id).await?;
        if !leave_type.is_active {
            return Err(LeaveError::TypeNotFound);
        }

        let (working_days, working_dates) = compute_working_days(start, end);
        if working_days <= 0 {
            return Err(LeaveError::NoWorkingDays);
        }

        ensure_no_approved_overlap(self.store.as_ref(), employee_id, start, end, exclude_id).await?;

        Ok(ValidatedWindow {
            leave_type,
            start,
            end,
            working_days,
            working_dates,
        })
    }

    /// Balance check for types counting toward entitlement.
    async fn admit(&self, employee_id: u64, window: &ValidatedWindow) -> LeaveResult<Option<EntitlementVersion>> {
        if !window.leave_type.counts_toward_entitlement {
            return Ok(None);
        }
        let version = self
            .check_balance(
                employee_id,
                window.leave_type.id,
                window.start.year(),
                window.working_days,
            )
            .await?;
        Ok(Some(version))
    }

    async fn check_balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
        requested_days: i32,
    ) -> LeaveResult<EntitlementVersion> {
        let entitlement = self
            .store
            .get_or_create_entitlement(employee_id, leave_type_id, year)
            .await?;
        let used = self.store.used_days(employee_id, leave_type_id, year).await?;
        let available = available_balance(
            entitlement.total_days,
            entitlement.reserved_days,
            used.pending,
            used.approved,
        );
        if requested_days > available {
            info!(employee_id, leave_type_id, year, requested_days, available, "Insufficient leave balance");
            return Err(LeaveError::InsufficientBalance);
        }
        Ok(entitlement.version_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leave::memory_store::MemoryLeaveStore;
    use crate::model::{leave_type::LeaveTypeInput, role::Role};

    const EMPLOYEE: u64 = 10;
    const STAFF_USER: u64 = 100;

    struct Fixture {
        svc: LeaveService,
        store: Arc<MemoryLeaveStore>,
        annual: u64,
        unpaid: u64,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryLeaveStore::new());
        store
            .add_employee(EMPLOYEE, Some(STAFF_USER), "Doe, John", Some((3, "Engineering")))
            .unwrap();
        store.add_employee(11, Some(101), "Roe, Jane", None).unwrap();
        let annual = store
            .create_leave_type(&LeaveTypeInput {
                name: "Annual".into(),
                annual_entitlement_days: 20,
                counts_toward_entitlement: true,
                is_active: true,
                ..LeaveTypeInput::default()
            })
            .await
            .unwrap()
            .id;
        let unpaid = store
            .create_leave_type(&LeaveTypeInput {
                name: "Unpaid".into(),
                annual_entitlement_days: 0,
                is_active: true,
                ..LeaveTypeInput::default()
            })
            .await
            .unwrap()
            .id;
        Fixture {
            svc: LeaveService::new(store.clone()),
            store,
            annual,
            unpaid,
        }
    }

    fn hr() -> Actor {
        Actor::new(2, Role::HrOfficer)
    }

    fn staff() -> Actor {
        Actor::new(STAFF_USER, Role::Viewer)
    }

    fn master() -> Actor {
        Actor::new(5, Role::Master)
    }

    fn apply_input(leave_type_id: u64, start: &str, end: &str) -> ApplyInput {
        ApplyInput {
            employee_id: Some(EMPLOYEE),
            leave_type_id,
            start_date: start.into(),
            end_date: end.into(),
            comment: String::new(),
        }
    }

    async fn annual_balance(f: &Fixture) -> Balance {
        let summary = f.svc.admin_balance(&hr(), EMPLOYEE, 2026).await.unwrap();
        summary
            .items
            .into_iter()
            .find(|b| b.leave_type_id == f.annual)
            .unwrap()
    }

    #[actix_web::test]
    async fn apply_then_approve_moves_days_from_pending_to_approved() {
        let f = fixture().await;
        // Mon..Wed
        let created = f
            .svc
            .apply(&hr(), apply_input(f.annual, "2026-02-23", "2026-02-25"))
            .await
            .unwrap();
        assert_eq!(created.status, LeaveStatus::Pending);
        assert_eq!(created.working_days, 3);
        assert_eq!(created.requested_by, 2);

        let balance = annual_balance(&f).await;
        assert_eq!((balance.total, balance.pending, balance.approved, balance.available), (20, 3, 0, 17));

        let approved = f.svc.approve(&hr(), created.id, DecisionInput::default()).await.unwrap();
        assert_eq!(approved.status.approval().map(|s| s.by), Some(2));

        let balance = annual_balance(&f).await;
        assert_eq!((balance.pending, balance.approved, balance.available), (0, 3, 17));
        assert!((balance.used_percent - 15.0).abs() < 1e-9);
    }

    #[actix_web::test]
    async fn second_approval_is_an_invalid_transition() {
        let f = fixture().await;
        let created = f
            .svc
            .apply(&hr(), apply_input(f.annual, "2026-02-23", "2026-02-23"))
            .await
            .unwrap();
        f.svc.approve(&hr(), created.id, DecisionInput::default()).await.unwrap();
        assert!(matches!(
            f.svc.approve(&hr(), created.id, DecisionInput::default()).await,
            Err(LeaveError::InvalidStatusTransition)
        ));
    }

    #[actix_web::test]
    async fn staff_applies_for_self_only() {
        let f = fixture().await;
        let mut input = apply_input(f.annual, "2026-03-02", "2026-03-02");
        input.employee_id = Some(11);
        let created = f.svc.apply(&staff(), input).await.unwrap();
        assert_eq!(created.employee_id, EMPLOYEE);

        let unlinked = Actor::new(999, Role::FinanceOfficer);
        assert!(matches!(
            f.svc.apply(&unlinked, apply_input(f.annual, "2026-03-03", "2026-03-03")).await,
            Err(LeaveError::Forbidden)
        ));
    }

    #[actix_web::test]
    async fn privileged_caller_must_name_employee() {
        let f = fixture().await;
        let mut input = apply_input(f.annual, "2026-03-02", "2026-03-02");
        input.employee_id = None;
        assert!(matches!(f.svc.apply(&hr(), input).await, Err(LeaveError::InvalidInput)));
    }

    #[actix_web::test]
    async fn window_validation() {
        let f = fixture().await;
        let cases = [
            (apply_input(0, "2026-03-02", "2026-03-02"), "zero type"),
            (apply_input(f.annual, "2026-3-2x", "2026-03-02"), "bad start"),
            (apply_input(f.annual, "2026-03-03", "2026-03-02"), "inverted"),
        ];
        for (input, label) in cases {
            assert!(
                matches!(f.svc.apply(&hr(), input).await, Err(LeaveError::InvalidInput)),
                "{label}"
            );
        }
        // Sat..Sun
        assert!(matches!(
            f.svc.apply(&hr(), apply_input(f.annual, "2026-02-21", "2026-02-22")).await,
            Err(LeaveError::NoWorkingDays)
        ));
        assert!(matches!(
            f.svc.apply(&hr(), apply_input(77, "2026-03-02", "2026-03-02")).await,
            Err(LeaveError::TypeNotFound)
        ));
    }

    #[actix_web::test]
    async fn inactive_type_is_not_found() {
        let f = fixture().await;
        f.store.deactivate_leave_type(f.unpaid).await.unwrap();
        assert!(matches!(
            f.svc.apply(&hr(), apply_input(f.unpaid, "2026-03-02", "2026-03-02")).await,
            Err(LeaveError::TypeNotFound)
        ));
    }

    #[actix_web::test]
    async fn overlap_with_approved_blocks_any_type() {
        let f = fixture().await;
        let first = f
            .svc
            .apply(&hr(), apply_input(f.annual, "2026-03-02", "2026-03-06"))
            .await
            .unwrap();
        // still pending: no block
        f.svc
            .apply(&hr(), apply_input(f.unpaid, "2026-03-04", "2026-03-04"))
            .await
            .unwrap();
        f.svc.approve(&hr(), first.id, DecisionInput::default()).await.unwrap();

        for lt in [f.annual, f.unpaid] {
            assert!(matches!(
                f.svc.apply(&hr(), apply_input(lt, "2026-03-06", "2026-03-09")).await,
                Err(LeaveError::OverlapApproved)
            ));
        }
    }

    #[actix_web::test]
    async fn one_locked_day_rejects_the_whole_range() {
        let f = fixture().await;
        f.store
            .lock_date(NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(), "audit", 1)
            .await
            .unwrap();
        for lt in [f.annual, f.unpaid] {
            assert!(matches!(
                f.svc.apply(&hr(), apply_input(lt, "2026-03-02", "2026-03-06")).await,
                Err(LeaveError::LockedDate)
            ));
        }
        assert!(f.svc.list_requests(&hr(), RequestFilter::default()).await.unwrap().items.is_empty());
    }

    #[actix_web::test]
    async fn balance_counts_reserved_and_usage() {
        let f = fixture().await;
        f.store.set_reserved_days(EMPLOYEE, f.annual, 2026, 15).unwrap();
        // 5 days available, ask for 6 (Mon..Mon)
        assert!(matches!(
            f.svc.apply(&hr(), apply_input(f.annual, "2026-03-02", "2026-03-09")).await,
            Err(LeaveError::InsufficientBalance)
        ));
        f.svc
            .apply(&hr(), apply_input(f.annual, "2026-03-02", "2026-03-06"))
            .await
            .unwrap();
        // unpaid leave does not count toward entitlement
        f.svc
            .apply(&hr(), apply_input(f.unpaid, "2026-03-09", "2026-03-13"))
            .await
            .unwrap();
        let balance = annual_balance(&f).await;
        assert_eq!((balance.reserved, balance.pending, balance.available), (15, 5, 0));
    }

    #[actix_web::test]
    async fn cancellation_rules() {
        let f = fixture().await;
        let own = f
            .svc
            .apply(&staff(), apply_input(f.annual, "2026-03-02", "2026-03-02"))
            .await
            .unwrap();
        let other_staff = Actor::new(101, Role::Viewer);
        assert!(matches!(
            f.svc.cancel(&other_staff, own.id, DecisionInput::default()).await,
            Err(LeaveError::Forbidden)
        ));
        let cancelled = f.svc.cancel(&staff(), own.id, DecisionInput::default()).await.unwrap();
        assert_eq!(cancelled.status.kind(), StatusKind::Cancelled);
        assert!(matches!(
            f.svc.cancel(&hr(), own.id, DecisionInput::default()).await,
            Err(LeaveError::InvalidStatusTransition)
        ));

        let approved = f
            .svc
            .apply(&staff(), apply_input(f.annual, "2026-03-03", "2026-03-03"))
            .await
            .unwrap();
        f.svc.approve(&hr(), approved.id, DecisionInput::default()).await.unwrap();
        assert!(matches!(
            f.svc.cancel(&staff(), approved.id, DecisionInput::default()).await,
            Err(LeaveError::Forbidden)
        ));
        let cancelled = f.svc.cancel(&hr(), approved.id, DecisionInput::default()).await.unwrap();
        match cancelled.status {
            LeaveStatus::Cancelled { cancelled, approved } => {
                assert_eq!(cancelled.by, 2);
                assert_eq!(approved.map(|s| s.by), Some(2));
            }
            other => panic!("unexpected status {other:?}"),
        }

        let rejected = f
            .svc
            .apply(&staff(), apply_input(f.annual, "2026-03-04", "2026-03-04"))
            .await
            .unwrap();
        f.svc.reject(&hr(), rejected.id, DecisionInput::default()).await.unwrap();
        assert!(matches!(
            f.svc.cancel(&hr(), rejected.id, DecisionInput::default()).await,
            Err(LeaveError::InvalidStatusTransition)
        ));
    }

    #[actix_web::test]
    async fn decisions_require_admin_or_hr() {
        let f = fixture().await;
        let created = f
            .svc
            .apply(&hr(), apply_input(f.annual, "2026-03-02", "2026-03-02"))
            .await
            .unwrap();
        for actor in [staff(), master()] {
            assert!(matches!(
                f.svc.approve(&actor, created.id, DecisionInput::default()).await,
                Err(LeaveError::Forbidden)
            ));
            assert!(matches!(
                f.svc.reject(&actor, created.id, DecisionInput::default()).await,
                Err(LeaveError::Forbidden)
            ));
        }
        assert!(matches!(
            f.svc.reject(&hr(), 404, DecisionInput::default()).await,
            Err(LeaveError::NotFound)
        ));
    }

    #[actix_web::test]
    async fn master_update_revalidates_and_keeps_status() {
        let f = fixture().await;
        let created = f
            .svc
            .apply(&hr(), apply_input(f.annual, "2026-03-02", "2026-03-02"))
            .await
            .unwrap();
        f.svc.approve(&hr(), created.id, DecisionInput::default()).await.unwrap();

        assert!(matches!(
            f.svc
                .master_update(&hr(), created.id, apply_input(f.annual, "2026-03-02", "2026-03-03"))
                .await,
            Err(LeaveError::Forbidden)
        ));
        let mut no_employee = apply_input(f.annual, "2026-03-02", "2026-03-03");
        no_employee.employee_id = None;
        assert!(matches!(
            f.svc.master_update(&master(), created.id, no_employee).await,
            Err(LeaveError::InvalidInput)
        ));

        // overlapping only itself is fine
        let updated = f
            .svc
            .master_update(&master(), created.id, apply_input(f.annual, "2026-03-02", "2026-03-03"))
            .await
            .unwrap();
        assert_eq!(updated.working_days, 2);
        assert_eq!(updated.status.kind(), StatusKind::Approved);

        f.store
            .lock_date(NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(), "audit", 1)
            .await
            .unwrap();
        assert!(matches!(
            f.svc
                .master_update(&master(), created.id, apply_input(f.annual, "2026-03-10", "2026-03-10"))
                .await,
            Err(LeaveError::LockedDate)
        ));
    }

    #[actix_web::test]
    async fn master_delete() {
        let f = fixture().await;
        let created = f
            .svc
            .apply(&hr(), apply_input(f.unpaid, "2026-03-02", "2026-03-02"))
            .await
            .unwrap();
        assert!(matches!(f.svc.master_delete(&hr(), created.id).await, Err(LeaveError::Forbidden)));
        f.svc.master_delete(&master(), created.id).await.unwrap();
        assert!(matches!(
            f.svc.master_delete(&master(), created.id).await,
            Err(LeaveError::NotFound)
        ));
    }

    #[actix_web::test]
    async fn staff_reads_are_scoped_to_self() {
        let f = fixture().await;
        let mine = f
            .svc
            .apply(&hr(), apply_input(f.unpaid, "2026-03-02", "2026-03-02"))
            .await
            .unwrap();
        let mut other = apply_input(f.unpaid, "2026-03-03", "2026-03-03");
        other.employee_id = Some(11);
        let theirs = f.svc.apply(&hr(), other).await.unwrap();

        let listed = f
            .svc
            .list_requests(
                &staff(),
                RequestFilter {
                    employee_id: Some(11),
                    ..RequestFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.items[0].request.id, mine.id);

        assert!(f.svc.get_request(&staff(), mine.id).await.is_ok());
        assert!(matches!(
            f.svc.get_request(&staff(), theirs.id).await,
            Err(LeaveError::Forbidden)
        ));
        assert!(matches!(
            f.svc.admin_balance(&staff(), 11, 2026).await,
            Err(LeaveError::Forbidden)
        ));
        assert!(f.svc.me_balance(&staff(), 2026).await.is_ok());
        assert!(f.svc.admin_balance(&master(), 11, 2026).await.is_ok());
        assert_eq!(f.svc.list_requests(&hr(), RequestFilter::default()).await.unwrap().total, 2);
    }

    #[actix_web::test]
    async fn balance_query_validation() {
        let f = fixture().await;
        assert!(matches!(
            f.svc.admin_balance(&hr(), EMPLOYEE, 1999).await,
            Err(LeaveError::InvalidInput)
        ));
        assert!(matches!(
            f.svc.admin_balance(&hr(), 0, 2026).await,
            Err(LeaveError::InvalidInput)
        ));
        assert!(matches!(
            f.svc.me_balance(&Actor::new(4242, Role::Admin), 2026).await,
            Err(LeaveError::Forbidden)
        ));
    }

    #[actix_web::test]
    async fn pagination_defaults_and_cap() {
        let f = fixture().await;
        let listed = f
            .svc
            .list_requests(
                &hr(),
                RequestFilter {
                    page: Some(0),
                    page_size: Some(500),
                    ..RequestFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!((listed.page, listed.page_size), (1, MAX_PAGE_SIZE));

        let listed = f.svc.list_requests(&hr(), RequestFilter::default()).await.unwrap();
        assert_eq!(listed.page_size, DEFAULT_PAGE_SIZE);
    }

    #[actix_web::test]
    async fn far_page_is_empty() {
        let f = fixture().await;
        f.svc
            .apply(&hr(), apply_input(f.unpaid, "2026-03-02", "2026-03-02"))
            .await
            .unwrap();
        let listed = f
            .svc
            .list_requests(
                &hr(),
                RequestFilter {
                    page: Some(u32::MAX),
                    page_size: Some(MAX_PAGE_SIZE),
                    ..RequestFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(listed.total, 1);
        assert!(listed.items.is_empty());
        assert_eq!(listed.page, u32::MAX);
    }

    #[actix_web::test]
    async fn approval_counts_the_pending_request_itself() {
        let f = fixture().await;
        let short = f
            .store
            .create_leave_type(&LeaveTypeInput {
                name: "Study".into(),
                annual_entitlement_days: 3,
                counts_toward_entitlement: true,
                is_active: true,
                ..LeaveTypeInput::default()
            })
            .await
            .unwrap()
            .id;

        // Mon..Wed takes the whole entitlement
        let created = f
            .svc
            .apply(&hr(), apply_input(short, "2026-02-23", "2026-02-25"))
            .await
            .unwrap();
        assert!(matches!(
            f.svc.approve(&hr(), created.id, DecisionInput::default()).await,
            Err(LeaveError::InsufficientBalance)
        ));
        assert_eq!(
            f.svc.get_request(&hr(), created.id).await.unwrap().status,
            LeaveStatus::Pending
        );

        let smaller = f
            .svc
            .apply(&hr(), apply_input(short, "2026-03-02", "2026-03-02"))
            .await;
        assert!(matches!(smaller, Err(LeaveError::InsufficientBalance)));
        f.svc.reject(&hr(), created.id, DecisionInput::default()).await.unwrap();
        // one pending day against three still fits on approval
        let one_day = f
            .svc
            .apply(&hr(), apply_input(short, "2026-03-02", "2026-03-02"))
            .await
            .unwrap();
        let approved = f.svc.approve(&hr(), one_day.id, DecisionInput::default()).await.unwrap();
        assert_eq!(approved.status.kind(), StatusKind::Approved);
    }

    #[actix_web::test]
    async fn reject_requires_pending() {
        let f = fixture().await;
        let created = f
            .svc
            .apply(&hr(), apply_input(f.annual, "2026-02-23", "2026-02-23"))
            .await
            .unwrap();
        f.svc.approve(&hr(), created.id, DecisionInput::default()).await.unwrap();
        assert!(matches!(
            f.svc.reject(&hr(), created.id, DecisionInput::default()).await,
            Err(LeaveError::InvalidStatusTransition)
        ));
        assert!(matches!(
            f.svc.reject(&hr(), 404, DecisionInput::default()).await,
            Err(LeaveError::NotFound)
        ));
        assert_eq!(
            f.svc.get_request(&hr(), created.id).await.unwrap().status.kind(),
            StatusKind::Approved
        );
    }

    #[actix_web::test]
    async fn absence_conversion_files_one_day() {
        let f = fixture().await;
        assert!(matches!(
            f.svc
                .convert_absence_to_leave(&staff(), EMPLOYEE, "2026-03-02", f.annual)
                .await,
            Err(LeaveError::Forbidden)
        ));
        let created = f
            .svc
            .convert_absence_to_leave(&hr(), EMPLOYEE, "2026-03-02", f.annual)
            .await
            .unwrap();
        assert_eq!(created.start_date, created.end_date);
        assert_eq!(created.comment, ABSENCE_CONVERSION_COMMENT);
        assert_eq!(created.status, LeaveStatus::Pending);
    }
}
