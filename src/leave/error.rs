//! Errors surfaced by the leave engine.
//!
//! Policy variants mean "the request was refused"; [`LeaveError::Store`]
//! means "the system failed" and carries the infrastructure cause.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeaveError {
    #[error("invalid leave input")]
    InvalidInput,

    #[error("forbidden")]
    Forbidden,

    #[error("leave request not found")]
    NotFound,

    #[error("leave type not found")]
    TypeNotFound,

    #[error("requested period has no working days")]
    NoWorkingDays,

    #[error("requested period contains locked dates")]
    LockedDate,

    #[error("requested period overlaps approved leave")]
    OverlapApproved,

    #[error("insufficient leave balance")]
    InsufficientBalance,

    #[error("invalid status transition")]
    InvalidStatusTransition,

    /// The entitlement changed between the balance check and the write.
    #[error("leave balance changed concurrently, retry the operation")]
    Conflict,

    #[error("leave store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl LeaveError {
    /// True for refusals decided by leave policy, false for infrastructure
    /// failures.
    pub fn is_policy(&self) -> bool {
        !matches!(self, LeaveError::Store(_))
    }
}

pub type LeaveResult<T> = Result<T, LeaveError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn store_errors_are_not_policy() {
        let err: LeaveError = anyhow!("connection reset").context("get leave request").into();
        assert!(!err.is_policy());
        assert_eq!(
            err.to_string(),
            "leave store failure: get leave request: connection reset"
        );
        assert!(LeaveError::LockedDate.is_policy());
        assert!(LeaveError::Conflict.is_policy());
    }

    #[test]
    fn messages_are_stable() {
        assert_eq!(LeaveError::OverlapApproved.to_string(), "requested period overlaps approved leave");
        assert_eq!(LeaveError::NoWorkingDays.to_string(), "requested period has no working days");
    }

    #[test]
    fn propagates_with_question_mark() {
        fn inner() -> anyhow::Result<()> {
            Err(anyhow!("boom"))
        }
        fn outer() -> LeaveResult<()> {
            inner()?;
            Ok(())
        }
        assert!(matches!(outer(), Err(LeaveError::Store(_))));
    }
}
