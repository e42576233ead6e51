use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Entitlement plus live usage sums, as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceRow {
    pub employee_id: u64,
    pub year: i32,
    pub leave_type_id: u64,
    pub type_name: String,
    pub total: i32,
    pub reserved: i32,
    pub pending: i32,
    pub approved: i32,
}

/// Pending and approved working days for one (employee, type, year).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct UsedDays {
    pub pending: i32,
    pub approved: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Balance {
    pub employee_id: u64,
    pub year: i32,
    pub leave_type_id: u64,
    #[schema(example = "Annual")]
    pub type_name: String,
    #[schema(example = 20)]
    pub total: i32,
    #[schema(example = 0)]
    pub reserved: i32,
    #[schema(example = 3)]
    pub pending: i32,
    #[schema(example = 0)]
    pub approved: i32,
    #[schema(example = 17)]
    pub available: i32,
    #[schema(example = 15.0)]
    pub used_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BalanceSummary {
    pub employee_id: u64,
    pub year: i32,
    pub items: Vec<Balance>,
}
