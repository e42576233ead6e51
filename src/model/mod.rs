pub mod actor;
pub mod balance;
pub mod leave_entitlement;
pub mod leave_request;
pub mod leave_type;
pub mod locked_date;
pub mod role;
