pub mod error;
pub mod guards;
pub mod memory_store;
pub mod mysql_store;
pub mod policy;
pub mod registry;
pub mod rules;
pub mod service;
pub mod store;
