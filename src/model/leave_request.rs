use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use utoipa::{IntoParams, ToSchema};

/// Status name as stored in the `status` column and accepted by filters.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, IntoStaticStr,
    ToSchema,
)]
pub enum StatusKind {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

/// Who moved a request into a state, and when (UTC).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Stamp {
    #[schema(example = 2)]
    pub by: u64,
    #[schema(example = "2026-02-20T09:00:00Z", format = "date-time", value_type = String)]
    pub at: DateTime<Utc>,
}

impl Stamp {
    pub fn now(by: u64) -> Self {
        Self { by, at: Utc::now() }
    }
}

/// Lifecycle state of a request. Each terminal state carries only its own
/// stamps; a cancelled request keeps the approval it had, if any.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "state")]
pub enum LeaveStatus {
    Pending,
    Approved {
        approved: Stamp,
    },
    Rejected {
        rejected: Stamp,
    },
    Cancelled {
        cancelled: Stamp,
        approved: Option<Stamp>,
    },
}

impl LeaveStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            LeaveStatus::Pending => StatusKind::Pending,
            LeaveStatus::Approved { .. } => StatusKind::Approved,
            LeaveStatus::Rejected { .. } => StatusKind::Rejected,
            LeaveStatus::Cancelled { .. } => StatusKind::Cancelled,
        }
    }

    pub fn approval(&self) -> Option<Stamp> {
        match self {
            LeaveStatus::Approved { approved } => Some(*approved),
            LeaveStatus::Cancelled { approved, .. } => *approved,
            _ => None,
        }
    }

    /// Flattens the state into the nullable stamp columns of `leave_requests`.
    pub fn columns(&self) -> StatusColumns {
        let mut cols = StatusColumns {
            status: self.kind(),
            ..StatusColumns::default()
        };
        if let Some(approved) = self.approval() {
            cols.approved_by = Some(approved.by);
            cols.approved_at = Some(approved.at);
        }
        match self {
            LeaveStatus::Rejected { rejected } => {
                cols.rejected_by = Some(rejected.by);
                cols.rejected_at = Some(rejected.at);
            }
            LeaveStatus::Cancelled { cancelled, .. } => {
                cols.cancelled_by = Some(cancelled.by);
                cols.cancelled_at = Some(cancelled.at);
            }
            _ => {}
        }
        cols
    }

    /// Rebuilds the state from stored columns, refusing combinations the
    /// lifecycle cannot produce.
    pub fn from_columns(cols: &StatusColumns) -> Result<Self> {
        fn stamp(by: Option<u64>, at: Option<DateTime<Utc>>) -> Option<Stamp> {
            Some(Stamp { by: by?, at: at? })
        }
        let approved = stamp(cols.approved_by, cols.approved_at);
        let rejected = stamp(cols.rejected_by, cols.rejected_at);
        let cancelled = stamp(cols.cancelled_by, cols.cancelled_at);

        match (cols.status, approved, rejected, cancelled) {
            (StatusKind::Pending, None, None, None) => Ok(LeaveStatus::Pending),
            (StatusKind::Approved, Some(approved), None, None) => {
                Ok(LeaveStatus::Approved { approved })
            }
            (StatusKind::Rejected, None, Some(rejected), None) => {
                Ok(LeaveStatus::Rejected { rejected })
            }
            (StatusKind::Cancelled, approved, None, Some(cancelled)) => {
                Ok(LeaveStatus::Cancelled {
                    cancelled,
                    approved,
                })
            }
            (status, ..) => Err(anyhow!("inconsistent stamps for {status} leave request")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusColumns {
    pub status: StatusKind,
    pub approved_by: Option<u64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<u64>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<u64>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Default for StatusColumns {
    fn default() -> Self {
        Self {
            status: StatusKind::Pending,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            cancelled_by: None,
            cancelled_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "leave_type_id": 1,
    "start_date": "2026-02-23",
    "end_date": "2026-02-25",
    "working_days": 3,
    "status": { "state": "Pending" },
    "requested_by": 7,
    "comment": "family trip",
    "created_at": "2026-02-01T00:00:00Z",
    "updated_at": "2026-02-01T00:00:00Z"
}))]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type_id: u64,
    #[schema(example = "2026-02-23", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-02-25", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub working_days: i32,
    pub status: LeaveStatus,
    pub requested_by: u64,
    pub comment: String,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

/// `leave_requests` row as selected by the MySQL store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeaveRequestRow {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub working_days: i32,
    pub status: String,
    pub requested_by: u64,
    pub approved_by: Option<u64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<u64>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<u64>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<LeaveRequestRow> for LeaveRequest {
    type Error = anyhow::Error;

    fn try_from(row: LeaveRequestRow) -> Result<Self> {
        let status = row
            .status
            .parse::<StatusKind>()
            .map_err(|_| anyhow!("unknown leave status '{}' on request {}", row.status, row.id))?;
        let status = LeaveStatus::from_columns(&StatusColumns {
            status,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            rejected_by: row.rejected_by,
            rejected_at: row.rejected_at,
            cancelled_by: row.cancelled_by,
            cancelled_at: row.cancelled_at,
        })?;

        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            leave_type_id: row.leave_type_id,
            start_date: row.start_date,
            end_date: row.end_date,
            working_days: row.working_days,
            status,
            requested_by: row.requested_by,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Listing row: the request plus the names the leave screens display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequestItem {
    #[serde(flatten)]
    pub request: LeaveRequest,
    #[schema(example = "Doe, John")]
    pub employee_name: String,
    #[schema(nullable = true)]
    pub department_id: Option<u64>,
    #[schema(example = "Engineering")]
    pub department_name: String,
    #[schema(example = "Annual")]
    pub type_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ApplyInput {
    /// Required for Admin/HR/Master callers, ignored for self-service roles.
    #[schema(example = 1000, nullable = true)]
    pub employee_id: Option<u64>,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2026-02-23", format = "date")]
    pub start_date: String,
    #[schema(example = "2026-02-25", format = "date")]
    pub end_date: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DecisionInput {
    #[serde(default)]
    #[schema(example = "enjoy")]
    pub comment: String,
}

/// A validated request ready to be inserted in `Pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub leave_type_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub working_days: i32,
    pub requested_by: u64,
    pub comment: String,
}

/// A validated master override. Status and stamps are not part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestChange {
    pub employee_id: u64,
    pub leave_type_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub working_days: i32,
    pub comment: String,
}

/// A compare-and-set status write: applied only while the stored status is
/// still `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub expected: StatusKind,
    pub next: LeaveStatus,
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams, ToSchema)]
pub struct RequestFilter {
    /// Requests starting on or after this date
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub from_date: Option<NaiveDate>,
    /// Requests ending on or before this date
    #[schema(example = "2026-12-31", format = "date", value_type = Option<String>)]
    pub to_date: Option<NaiveDate>,
    pub department_id: Option<u64>,
    /// Ignored for self-service roles
    pub employee_id: Option<u64>,
    pub leave_type_id: Option<u64>,
    #[schema(example = "Pending")]
    pub status: Option<StatusKind>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u32>,
    /// Items per page, at most 100
    #[schema(example = 20)]
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RequestList {
    pub items: Vec<LeaveRequestItem>,
    #[schema(example = 1)]
    pub total: i64,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub page_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2026, 2, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn cancelled_after_approval_keeps_both_stamps() {
        let status = LeaveStatus::Cancelled {
            cancelled: Stamp { by: 3, at: at(2) },
            approved: Some(Stamp { by: 2, at: at(1) }),
        };
        let cols = status.columns();
        assert_eq!(cols.status, StatusKind::Cancelled);
        assert_eq!(cols.approved_by, Some(2));
        assert_eq!(cols.cancelled_by, Some(3));
        assert_eq!(cols.rejected_by, None);
        assert_eq!(LeaveStatus::from_columns(&cols).unwrap(), status);
    }

    #[test]
    fn rejects_impossible_column_combinations() {
        let cols = StatusColumns {
            status: StatusKind::Rejected,
            approved_by: Some(2),
            approved_at: Some(at(1)),
            rejected_by: Some(3),
            rejected_at: Some(at(2)),
            ..StatusColumns::default()
        };
        assert!(LeaveStatus::from_columns(&cols).is_err());

        let cols = StatusColumns {
            status: StatusKind::Approved,
            ..StatusColumns::default()
        };
        assert!(LeaveStatus::from_columns(&cols).is_err());
    }

    #[test]
    fn unknown_status_string_is_an_error() {
        let row = LeaveRequestRow {
            id: 9,
            employee_id: 1,
            leave_type_id: 1,
            start_date: NaiveDate::from_ymd_opt(2026, 2, 23).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 2, 23).unwrap(),
            working_days: 1,
            status: "Archived".into(),
            requested_by: 1,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            cancelled_by: None,
            cancelled_at: None,
            comment: String::new(),
            created_at: at(1),
            updated_at: at(1),
        };
        assert!(LeaveRequest::try_from(row).is_err());
    }

    #[test]
    fn status_serializes_with_state_tag() {
        let json = serde_json::to_value(LeaveStatus::Approved {
            approved: Stamp { by: 2, at: at(1) },
        })
        .unwrap();
        assert_eq!(json["state"], "Approved");
        assert_eq!(json["approved"]["by"], 2);
    }
}
