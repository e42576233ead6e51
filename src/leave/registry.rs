//! Reference data administration: leave types and locked dates.

use tracing::{info, instrument};

use crate::leave::error::{LeaveError, LeaveResult};
use crate::leave::policy;
use crate::leave::service::{LeaveService, MIN_YEAR, parse_date};
use crate::model::{
    actor::Actor,
    leave_type::{LeaveType, LeaveTypeInput},
    locked_date::{LockDateInput, LockedDate},
};

fn validate_type_input(input: &LeaveTypeInput) -> LeaveResult<()> {
    if input.name.trim().is_empty() || input.annual_entitlement_days < 0 {
        return Err(LeaveError::InvalidInput);
    }
    Ok(())
}

impl LeaveService {
    pub async fn list_leave_types(&self, actor: &Actor) -> LeaveResult<Vec<LeaveType>> {
        if !policy::can_read_leave_types(actor.role) {
            return Err(LeaveError::Forbidden);
        }
        self.store.list_leave_types().await
    }

    #[instrument(name = "leave_type_create", skip(self, input), fields(user_id = actor.user_id))]
    pub async fn create_leave_type(&self, actor: &Actor, input: LeaveTypeInput) -> LeaveResult<LeaveType> {
        if !policy::can_manage_reference_data(actor.role) {
            return Err(LeaveError::Forbidden);
        }
        validate_type_input(&input)?;
        let created = self.store.create_leave_type(&input).await?;
        info!(leave_type_id = created.id, name = %created.name, "Leave type created");
        Ok(created)
    }

    #[instrument(name = "leave_type_update", skip(self, input), fields(user_id = actor.user_id))]
    pub async fn update_leave_type(
        &self,
        actor: &Actor,
        leave_type_id: u64,
        input: LeaveTypeInput,
    ) -> LeaveResult<LeaveType> {
        if !policy::can_manage_reference_data(actor.role) {
            return Err(LeaveError::Forbidden);
        }
        if leave_type_id == 0 {
            return Err(LeaveError::InvalidInput);
        }
        validate_type_input(&input)?;
        self.store.update_leave_type(leave_type_id, &input).await
    }

    /// Leave types are never deleted, only taken out of use.
    #[instrument(name = "leave_type_deactivate", skip(self), fields(user_id = actor.user_id))]
    pub async fn deactivate_leave_type(&self, actor: &Actor, leave_type_id: u64) -> LeaveResult<()> {
        if !policy::can_manage_reference_data(actor.role) {
            return Err(LeaveError::Forbidden);
        }
        if leave_type_id == 0 {
            return Err(LeaveError::InvalidInput);
        }
        self.store.deactivate_leave_type(leave_type_id).await?;
        info!(leave_type_id, "Leave type deactivated");
        Ok(())
    }

    #[instrument(name = "leave_lock_date", skip(self, input), fields(user_id = actor.user_id))]
    pub async fn lock_date(&self, actor: &Actor, input: LockDateInput) -> LeaveResult<LockedDate> {
        if !policy::can_manage_reference_data(actor.role) {
            return Err(LeaveError::Forbidden);
        }
        let day = parse_date(&input.date)?;
        let locked = self
            .store
            .lock_date(day, input.reason.trim(), actor.user_id)
            .await?;
        info!(date = %day, "Leave date locked");
        Ok(locked)
    }

    #[instrument(name = "leave_unlock_date", skip(self), fields(user_id = actor.user_id))]
    pub async fn unlock_date(&self, actor: &Actor, date: &str) -> LeaveResult<()> {
        if !policy::can_manage_reference_data(actor.role) {
            return Err(LeaveError::Forbidden);
        }
        let day = parse_date(date)?;
        self.store.unlock_date(day).await?;
        info!(date = %day, "Leave date unlocked");
        Ok(())
    }

    pub async fn list_locked_dates(&self, actor: &Actor, year: i32) -> LeaveResult<Vec<LockedDate>> {
        if year < MIN_YEAR {
            return Err(LeaveError::InvalidInput);
        }
        if !policy::can_list_locked_dates(actor.role) {
            return Err(LeaveError::Forbidden);
        }
        self.store.list_locked_dates(year).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leave::memory_store::MemoryLeaveStore;
    use crate::model::role::Role;
    use std::sync::Arc;

    fn service() -> LeaveService {
        LeaveService::new(Arc::new(MemoryLeaveStore::new()))
    }

    fn admin() -> Actor {
        Actor::new(1, Role::Admin)
    }

    fn input(name: &str, days: i32) -> LeaveTypeInput {
        LeaveTypeInput {
            name: name.into(),
            annual_entitlement_days: days,
            is_active: true,
            ..LeaveTypeInput::default()
        }
    }

    #[actix_web::test]
    async fn only_admin_creates_types() {
        let svc = service();
        for role in [Role::HrOfficer, Role::Viewer, Role::Master] {
            assert!(matches!(
                svc.create_leave_type(&Actor::new(2, role), input("Sick", 10)).await,
                Err(LeaveError::Forbidden)
            ));
        }
        let created = svc.create_leave_type(&admin(), input("Sick", 10)).await.unwrap();
        let listed = svc.list_leave_types(&Actor::new(3, Role::Viewer)).await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[actix_web::test]
    async fn type_input_is_validated() {
        let svc = service();
        assert!(matches!(
            svc.create_leave_type(&admin(), input("  ", 10)).await,
            Err(LeaveError::InvalidInput)
        ));
        assert!(matches!(
            svc.create_leave_type(&admin(), input("Annual", -1)).await,
            Err(LeaveError::InvalidInput)
        ));
        assert!(matches!(
            svc.update_leave_type(&admin(), 0, input("Annual", 1)).await,
            Err(LeaveError::InvalidInput)
        ));
        assert!(matches!(
            svc.update_leave_type(&admin(), 42, input("Annual", 1)).await,
            Err(LeaveError::TypeNotFound)
        ));
    }

    #[actix_web::test]
    async fn deactivation_keeps_the_type() {
        let svc = service();
        let created = svc.create_leave_type(&admin(), input("Study", 5)).await.unwrap();
        svc.deactivate_leave_type(&admin(), created.id).await.unwrap();
        let listed = svc.list_leave_types(&admin()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].is_active);
    }

    #[actix_web::test]
    async fn locked_dates_round_trip() {
        let svc = service();
        let locked = svc
            .lock_date(
                &admin(),
                LockDateInput {
                    date: " 2026-12-24 ".into(),
                    reason: "closing".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(locked.created_by, Some(1));

        let hr = Actor::new(2, Role::HrOfficer);
        assert_eq!(svc.list_locked_dates(&hr, 2026).await.unwrap().len(), 1);
        assert!(matches!(
            svc.list_locked_dates(&hr, 1999).await,
            Err(LeaveError::InvalidInput)
        ));
        assert!(matches!(svc.unlock_date(&hr, "2026-12-24").await, Err(LeaveError::Forbidden)));
        assert!(matches!(
            svc.unlock_date(&admin(), "24/12/2026").await,
            Err(LeaveError::InvalidInput)
        ));
        svc.unlock_date(&admin(), "2026-12-24").await.unwrap();
        assert!(svc.list_locked_dates(&hr, 2026).await.unwrap().is_empty());
    }
}
