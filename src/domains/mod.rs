//! Domains module containing business logic organized by bounded contexts.
//!
//! - **operations**: the registry and dispatcher that publish groups as tools
//! - **groups**: the group types bundled with the server

pub mod groups;
pub mod operations;
