use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LockedDate {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "2026-12-25", format = "date", value_type = String)]
    pub lock_date: NaiveDate,
    #[schema(example = "Year-end closing")]
    pub reason: String,
    #[schema(example = 1, nullable = true)]
    pub created_by: Option<u64>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LockDateInput {
    #[schema(example = "2026-12-25", format = "date")]
    pub date: String,
    #[serde(default)]
    #[schema(example = "Year-end closing")]
    pub reason: String,
}
