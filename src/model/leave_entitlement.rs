use serde::{Deserialize, Serialize};

/// Annual allowance for one (employee, leave type, year).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeaveEntitlement {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type_id: u64,
    pub year: i32,
    pub total_days: i32,
    pub reserved_days: i32,
    /// Bumped by every write that was admitted against this balance.
    pub version: i64,
}

impl LeaveEntitlement {
    pub fn version_token(&self) -> EntitlementVersion {
        EntitlementVersion {
            entitlement_id: self.id,
            version: self.version,
        }
    }
}

/// The entitlement version a balance check observed. A store write carrying
/// one must fail with a conflict if the version moved in the meantime.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EntitlementVersion {
    pub entitlement_id: u64,
    pub version: i64,
}
