pub mod error;
pub mod leave;
