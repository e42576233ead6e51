//! In-process [`LeaveStore`] adapter.
//!
//! Holds everything behind one `RwLock`, so each store call is atomic and
//! the optimistic version checks behave like the MySQL adapter's.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};

use crate::leave::error::{LeaveError, LeaveResult};
use crate::leave::rules::ranges_overlap;
use crate::leave::store::LeaveStore;
use crate::model::{
    balance::{BalanceRow, UsedDays},
    leave_entitlement::{EntitlementVersion, LeaveEntitlement},
    leave_request::{
        LeaveRequest, LeaveRequestItem, LeaveStatus, NewLeaveRequest, RequestChange, RequestFilter,
        RequestList, StatusChange, StatusKind,
    },
    leave_type::{LeaveType, LeaveTypeInput},
    locked_date::LockedDate,
};

#[derive(Debug, Clone)]
struct EmployeeEntry {
    user_id: Option<u64>,
    name: String,
    department_id: Option<u64>,
    department_name: String,
}

#[derive(Debug, Default)]
struct State {
    employees: HashMap<u64, EmployeeEntry>,
    leave_types: BTreeMap<u64, LeaveType>,
    entitlements: HashMap<(u64, u64, i32), LeaveEntitlement>,
    requests: BTreeMap<u64, LeaveRequest>,
    locked_dates: BTreeMap<NaiveDate, LockedDate>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn claim(&mut self, version: Option<EntitlementVersion>) -> LeaveResult<()> {
        let Some(token) = version else {
            return Ok(());
        };
        let entitlement = self
            .entitlements
            .values_mut()
            .find(|e| e.id == token.entitlement_id)
            .ok_or(LeaveError::Conflict)?;
        if entitlement.version != token.version {
            return Err(LeaveError::Conflict);
        }
        entitlement.version += 1;
        Ok(())
    }

    fn used_days(&self, employee_id: u64, leave_type_id: u64, year: i32) -> UsedDays {
        self.requests
            .values()
            .filter(|r| {
                r.employee_id == employee_id
                    && r.leave_type_id == leave_type_id
                    && r.start_date.year() == year
            })
            .fold(UsedDays::default(), |mut used, r| {
                match r.status.kind() {
                    StatusKind::Pending => used.pending += r.working_days,
                    StatusKind::Approved => used.approved += r.working_days,
                    _ => {}
                }
                used
            })
    }

    fn item(&self, request: &LeaveRequest) -> LeaveRequestItem {
        let employee = self.employees.get(&request.employee_id);
        LeaveRequestItem {
            request: request.clone(),
            employee_name: employee.map(|e| e.name.clone()).unwrap_or_default(),
            department_id: employee.and_then(|e| e.department_id),
            department_name: employee.map(|e| e.department_name.clone()).unwrap_or_default(),
            type_name: self
                .leave_types
                .get(&request.leave_type_id)
                .map(|t| t.name.clone())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryLeaveStore {
    state: RwLock<State>,
}

impl MemoryLeaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> LeaveResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| LeaveError::Store(anyhow!("memory leave store poisoned")))
    }

    fn write(&self) -> LeaveResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| LeaveError::Store(anyhow!("memory leave store poisoned")))
    }

    /// Registers an employee, optionally linked to a user account.
    pub fn add_employee(
        &self,
        employee_id: u64,
        user_id: Option<u64>,
        name: &str,
        department: Option<(u64, &str)>,
    ) -> LeaveResult<()> {
        self.write()?.employees.insert(
            employee_id,
            EmployeeEntry {
                user_id,
                name: name.to_string(),
                department_id: department.map(|(id, _)| id),
                department_name: department.map(|(_, n)| n.to_string()).unwrap_or_default(),
            },
        );
        Ok(())
    }

    /// Withholds days from an entitlement, creating it if needed.
    pub fn set_reserved_days(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
        reserved_days: i32,
    ) -> LeaveResult<()> {
        let mut state = self.write()?;
        let total = state
            .leave_types
            .get(&leave_type_id)
            .map(|t| t.annual_entitlement_days)
            .ok_or(LeaveError::TypeNotFound)?;
        let id = state.next_id();
        state
            .entitlements
            .entry((employee_id, leave_type_id, year))
            .or_insert(LeaveEntitlement {
                id,
                employee_id,
                leave_type_id,
                year,
                total_days: total,
                reserved_days: 0,
                version: 0,
            })
            .reserved_days = reserved_days;
        Ok(())
    }
}

#[async_trait]
impl LeaveStore for MemoryLeaveStore {
    async fn list_leave_types(&self) -> LeaveResult<Vec<LeaveType>> {
        let mut items: Vec<LeaveType> = self.read()?.leave_types.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn create_leave_type(&self, input: &LeaveTypeInput) -> LeaveResult<LeaveType> {
        let mut state = self.write()?;
        let now = Utc::now();
        let item = LeaveType {
            id: state.next_id(),
            name: input.name.trim().to_string(),
            annual_entitlement_days: input.annual_entitlement_days,
            is_paid: input.is_paid,
            requires_attachment: input.requires_attachment,
            requires_approval: input.requires_approval,
            counts_toward_entitlement: input.counts_toward_entitlement,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        state.leave_types.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_leave_type(&self, leave_type_id: u64, input: &LeaveTypeInput) -> LeaveResult<LeaveType> {
        let mut state = self.write()?;
        let item = state
            .leave_types
            .get_mut(&leave_type_id)
            .ok_or(LeaveError::TypeNotFound)?;
        item.name = input.name.trim().to_string();
        item.annual_entitlement_days = input.annual_entitlement_days;
        item.is_paid = input.is_paid;
        item.requires_attachment = input.requires_attachment;
        item.requires_approval = input.requires_approval;
        item.counts_toward_entitlement = input.counts_toward_entitlement;
        item.is_active = input.is_active;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn deactivate_leave_type(&self, leave_type_id: u64) -> LeaveResult<()> {
        let mut state = self.write()?;
        let item = state
            .leave_types
            .get_mut(&leave_type_id)
            .ok_or(LeaveError::TypeNotFound)?;
        item.is_active = false;
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn lock_date(&self, date: NaiveDate, reason: &str, created_by: u64) -> LeaveResult<LockedDate> {
        let mut state = self.write()?;
        let existing = state.locked_dates.get(&date).map(|e| (e.id, e.created_at));
        let (id, created_at) = match existing {
            Some(kept) => kept,
            None => (state.next_id(), Utc::now()),
        };
        let item = LockedDate {
            id,
            lock_date: date,
            reason: reason.trim().to_string(),
            created_by: Some(created_by),
            created_at,
        };
        state.locked_dates.insert(date, item.clone());
        Ok(item)
    }

    async fn unlock_date(&self, date: NaiveDate) -> LeaveResult<()> {
        self.write()?.locked_dates.remove(&date);
        Ok(())
    }

    async fn list_locked_dates(&self, year: i32) -> LeaveResult<Vec<LockedDate>> {
        Ok(self
            .read()?
            .locked_dates
            .values()
            .filter(|d| d.lock_date.year() == year)
            .cloned()
            .collect())
    }

    async fn resolve_employee_by_user_id(&self, user_id: u64) -> LeaveResult<Option<u64>> {
        Ok(self
            .read()?
            .employees
            .iter()
            .find(|(_, e)| e.user_id == Some(user_id))
            .map(|(id, _)| *id))
    }

    async fn get_leave_type(&self, leave_type_id: u64) -> LeaveResult<LeaveType> {
        self.read()?
            .leave_types
            .get(&leave_type_id)
            .cloned()
            .ok_or(LeaveError::TypeNotFound)
    }

    async fn get_or_create_entitlement(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
    ) -> LeaveResult<LeaveEntitlement> {
        let mut state = self.write()?;
        if let Some(existing) = state.entitlements.get(&(employee_id, leave_type_id, year)) {
            return Ok(existing.clone());
        }
        if !state.employees.contains_key(&employee_id) {
            return Err(LeaveError::NotFound);
        }
        let total_days = state
            .leave_types
            .get(&leave_type_id)
            .map(|t| t.annual_entitlement_days)
            .ok_or(LeaveError::TypeNotFound)?;
        let entitlement = LeaveEntitlement {
            id: state.next_id(),
            employee_id,
            leave_type_id,
            year,
            total_days,
            reserved_days: 0,
            version: 0,
        };
        state
            .entitlements
            .insert((employee_id, leave_type_id, year), entitlement.clone());
        Ok(entitlement)
    }

    async fn used_days(&self, employee_id: u64, leave_type_id: u64, year: i32) -> LeaveResult<UsedDays> {
        Ok(self.read()?.used_days(employee_id, leave_type_id, year))
    }

    async fn count_approved_overlap(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
        exclude_id: Option<u64>,
    ) -> LeaveResult<u64> {
        Ok(self
            .read()?
            .requests
            .values()
            .filter(|r| {
                r.employee_id == employee_id
                    && r.status.kind() == StatusKind::Approved
                    && Some(r.id) != exclude_id
                    && ranges_overlap(r.start_date, r.end_date, start, end)
            })
            .count() as u64)
    }

    async fn any_locked_date(&self, dates: &[NaiveDate]) -> LeaveResult<bool> {
        let state = self.read()?;
        Ok(dates.iter().any(|d| state.locked_dates.contains_key(d)))
    }

    async fn create_request(
        &self,
        request: &NewLeaveRequest,
        version: Option<EntitlementVersion>,
    ) -> LeaveResult<LeaveRequest> {
        let mut state = self.write()?;
        state.claim(version)?;
        let now = Utc::now();
        let created = LeaveRequest {
            id: state.next_id(),
            employee_id: request.employee_id,
            leave_type_id: request.leave_type_id,
            start_date: request.start_date,
            end_date: request.end_date,
            working_days: request.working_days,
            status: LeaveStatus::Pending,
            requested_by: request.requested_by,
            comment: request.comment.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        state.requests.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_request(&self, request_id: u64) -> LeaveResult<LeaveRequest> {
        self.read()?
            .requests
            .get(&request_id)
            .cloned()
            .ok_or(LeaveError::NotFound)
    }

    async fn update_request_status(
        &self,
        request_id: u64,
        change: &StatusChange,
        version: Option<EntitlementVersion>,
    ) -> LeaveResult<LeaveRequest> {
        let mut state = self.write()?;
        let current = state
            .requests
            .get(&request_id)
            .map(|r| r.status.kind())
            .ok_or(LeaveError::NotFound)?;
        if current != change.expected {
            return Err(LeaveError::InvalidStatusTransition);
        }
        state.claim(version)?;
        let request = state
            .requests
            .get_mut(&request_id)
            .ok_or(LeaveError::NotFound)?;
        request.status = change.next;
        request.comment = change.comment.trim().to_string();
        request.updated_at = Utc::now();
        Ok(request.clone())
    }

    async fn update_request_by_master(
        &self,
        request_id: u64,
        change: &RequestChange,
        version: Option<EntitlementVersion>,
    ) -> LeaveResult<LeaveRequest> {
        let mut state = self.write()?;
        if !state.requests.contains_key(&request_id) {
            return Err(LeaveError::NotFound);
        }
        state.claim(version)?;
        let request = state
            .requests
            .get_mut(&request_id)
            .ok_or(LeaveError::NotFound)?;
        request.employee_id = change.employee_id;
        request.leave_type_id = change.leave_type_id;
        request.start_date = change.start_date;
        request.end_date = change.end_date;
        request.working_days = change.working_days;
        request.comment = change.comment.trim().to_string();
        request.updated_at = Utc::now();
        Ok(request.clone())
    }

    async fn delete_request(&self, request_id: u64) -> LeaveResult<()> {
        self.write()?
            .requests
            .remove(&request_id)
            .map(|_| ())
            .ok_or(LeaveError::NotFound)
    }

    async fn list_requests(&self, filter: &RequestFilter) -> LeaveResult<RequestList> {
        let state = self.read()?;
        let mut matched: Vec<&LeaveRequest> = state
            .requests
            .values()
            .filter(|r| filter.from_date.is_none_or(|from| r.start_date >= from))
            .filter(|r| filter.to_date.is_none_or(|to| r.end_date <= to))
            .filter(|r| filter.employee_id.is_none_or(|id| r.employee_id == id))
            .filter(|r| filter.leave_type_id.is_none_or(|id| r.leave_type_id == id))
            .filter(|r| filter.status.is_none_or(|s| r.status.kind() == s))
            .filter(|r| {
                filter.department_id.is_none_or(|dept| {
                    state
                        .employees
                        .get(&r.employee_id)
                        .and_then(|e| e.department_id)
                        == Some(dept)
                })
            })
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let page = filter.page.unwrap_or(1).max(1);
        let page_size = filter.page_size.unwrap_or(20).max(1);
        let offset = u64::from(page - 1).saturating_mul(u64::from(page_size));
        let items = matched
            .iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(page_size as usize)
            .map(|r| state.item(r))
            .collect();

        Ok(RequestList {
            items,
            total: matched.len() as i64,
            page,
            page_size,
        })
    }

    async fn list_balances(&self, employee_id: u64, year: i32) -> LeaveResult<Vec<BalanceRow>> {
        let state = self.read()?;
        let mut rows: Vec<BalanceRow> = state
            .entitlements
            .values()
            .filter(|e| e.employee_id == employee_id && e.year == year)
            .map(|e| {
                let used = state.used_days(employee_id, e.leave_type_id, year);
                BalanceRow {
                    employee_id,
                    year,
                    leave_type_id: e.leave_type_id,
                    type_name: state
                        .leave_types
                        .get(&e.leave_type_id)
                        .map(|t| t.name.clone())
                        .unwrap_or_default(),
                    total: e.total_days,
                    reserved: e.reserved_days,
                    pending: used.pending,
                    approved: used.approved,
                }
            })
            .collect();
        rows.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn annual() -> LeaveTypeInput {
        LeaveTypeInput {
            name: " Annual ".into(),
            annual_entitlement_days: 20,
            counts_toward_entitlement: true,
            is_active: true,
            ..LeaveTypeInput::default()
        }
    }

    fn new_request(leave_type_id: u64) -> NewLeaveRequest {
        NewLeaveRequest {
            employee_id: 10,
            leave_type_id,
            start_date: date(2, 23),
            end_date: date(2, 25),
            working_days: 3,
            requested_by: 1,
            comment: String::new(),
        }
    }

    #[actix_web::test]
    async fn entitlement_is_created_once_from_type() {
        let store = MemoryLeaveStore::new();
        store.add_employee(10, Some(100), "Doe, John", None).unwrap();
        let lt = store.create_leave_type(&annual()).await.unwrap();
        assert_eq!(lt.name, "Annual");

        let first = store.get_or_create_entitlement(10, lt.id, 2026).await.unwrap();
        assert_eq!((first.total_days, first.reserved_days), (20, 0));
        let again = store.get_or_create_entitlement(10, lt.id, 2026).await.unwrap();
        assert_eq!(first.id, again.id);

        assert!(matches!(
            store.get_or_create_entitlement(10, 999, 2026).await,
            Err(LeaveError::TypeNotFound)
        ));
        assert!(matches!(
            store.get_or_create_entitlement(77, lt.id, 2026).await,
            Err(LeaveError::NotFound)
        ));
    }

    #[actix_web::test]
    async fn stale_version_is_a_conflict() {
        let store = MemoryLeaveStore::new();
        store.add_employee(10, Some(100), "Doe, John", None).unwrap();
        let lt = store.create_leave_type(&annual()).await.unwrap();
        let ent = store.get_or_create_entitlement(10, lt.id, 2026).await.unwrap();
        let token = ent.version_token();

        store.create_request(&new_request(lt.id), Some(token)).await.unwrap();
        assert!(matches!(
            store.create_request(&new_request(lt.id), Some(token)).await,
            Err(LeaveError::Conflict)
        ));

        let used = store.used_days(10, lt.id, 2026).await.unwrap();
        assert_eq!(used, UsedDays { pending: 3, approved: 0 });
    }

    #[actix_web::test]
    async fn status_write_is_compare_and_set() {
        let store = MemoryLeaveStore::new();
        let lt = store.create_leave_type(&annual()).await.unwrap();
        let created = store.create_request(&new_request(lt.id), None).await.unwrap();
        let reject = StatusChange {
            expected: StatusKind::Pending,
            next: LeaveStatus::Rejected {
                rejected: crate::model::leave_request::Stamp::now(2),
            },
            comment: "no".into(),
        };
        store.update_request_status(created.id, &reject, None).await.unwrap();
        assert!(matches!(
            store.update_request_status(created.id, &reject, None).await,
            Err(LeaveError::InvalidStatusTransition)
        ));
        assert!(matches!(
            store.update_request_status(404, &reject, None).await,
            Err(LeaveError::NotFound)
        ));
    }

    #[actix_web::test]
    async fn lock_date_upserts_by_date() {
        let store = MemoryLeaveStore::new();
        let first = store.lock_date(date(12, 25), "holiday", 1).await.unwrap();
        let second = store.lock_date(date(12, 25), " closing ", 2).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.reason, "closing");
        assert_eq!(store.list_locked_dates(2026).await.unwrap().len(), 1);
        assert!(store.list_locked_dates(2027).await.unwrap().is_empty());

        store.unlock_date(date(12, 25)).await.unwrap();
        store.unlock_date(date(12, 25)).await.unwrap();
        assert!(!store.any_locked_date(&[date(12, 25)]).await.unwrap());
    }

    #[actix_web::test]
    async fn listing_filters_and_pages() {
        let store = MemoryLeaveStore::new();
        store
            .add_employee(10, Some(100), "Doe, John", Some((3, "Engineering")))
            .unwrap();
        let lt = store.create_leave_type(&annual()).await.unwrap();
        for _ in 0..5 {
            store.create_request(&new_request(lt.id), None).await.unwrap();
        }

        let page = store
            .list_requests(&RequestFilter {
                department_id: Some(3),
                page: Some(2),
                page_size: Some(2),
                ..RequestFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].employee_name, "Doe, John");
        assert_eq!(page.items[0].type_name, "Annual");

        let none = store
            .list_requests(&RequestFilter {
                status: Some(StatusKind::Approved),
                ..RequestFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(none.total, 0);
    }
}
