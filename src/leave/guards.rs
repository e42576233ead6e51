//! Store-backed guards that must pass before a request is written.

use chrono::NaiveDate;
use tracing::info;

use crate::leave::error::{LeaveError, LeaveResult};
use crate::leave::store::LeaveStore;

/// Rejects the whole request if any of its working dates is locked.
pub async fn ensure_no_locked_dates(store: &dyn LeaveStore, working_dates: &[NaiveDate]) -> LeaveResult<()> {
    if store.any_locked_date(working_dates).await? {
        info!(days = working_dates.len(), "Leave period hits a locked date");
        return Err(LeaveError::LockedDate);
    }
    Ok(())
}

/// Rejects a period intersecting approved leave of the same employee.
/// Pending, rejected and cancelled requests never block.
pub async fn ensure_no_approved_overlap(
    store: &dyn LeaveStore,
    employee_id: u64,
    start: NaiveDate,
    end: NaiveDate,
    exclude_id: Option<u64>,
) -> LeaveResult<()> {
    let overlaps = store
        .count_approved_overlap(employee_id, start, end, exclude_id)
        .await?;
    if overlaps > 0 {
        info!(employee_id, %start, %end, overlaps, "Leave period overlaps approved leave");
        return Err(LeaveError::OverlapApproved);
    }
    Ok(())
}
