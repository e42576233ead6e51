use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "name": "Annual",
    "annual_entitlement_days": 20,
    "is_paid": true,
    "requires_attachment": false,
    "requires_approval": true,
    "counts_toward_entitlement": true,
    "is_active": true,
    "created_at": "2026-01-01T00:00:00Z",
    "updated_at": "2026-01-01T00:00:00Z"
}))]
pub struct LeaveType {
    pub id: u64,
    pub name: String,
    pub annual_entitlement_days: i32,
    pub is_paid: bool,
    pub requires_attachment: bool,
    pub requires_approval: bool,
    pub counts_toward_entitlement: bool,
    pub is_active: bool,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LeaveTypeInput {
    #[schema(example = "Annual")]
    pub name: String,
    #[schema(example = 20)]
    pub annual_entitlement_days: i32,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub requires_attachment: bool,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub counts_toward_entitlement: bool,
    #[serde(default)]
    pub is_active: bool,
}
