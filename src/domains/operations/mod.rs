//! Operations domain module.
//!
//! This module turns configured groups into callable tools and serves
//! invocations against them.
//!
//! ## Architecture
//!
//! - `operation.rs` - Operation marker: name, schema, description, timeout
//! - `group.rs` - `ServiceGroup` trait and the explicit `GroupCatalog`
//! - `config.rs` - `GroupConfig` / `ServiceConfig` records
//! - `dispatcher.rs` - Qualified-name table and per-call deadline handling
//! - `context.rs` - Per-invocation context (cancellation, progress)
//! - `error.rs` - Load-time and invocation error types
//!
//! ## Adding a New Group
//!
//! 1. Implement `ServiceGroup` for your type (see `domains/groups/`)
//! 2. Register it in a `GroupCatalog` (`builtin_catalog()` for bundled ones)
//! 3. Reference its kind from a service document

mod config;
pub(crate) mod context;
mod dispatcher;
mod error;
mod group;
mod operation;

pub use config::{GroupConfig, ServiceConfig, SettingsPolicy, positive_seconds};
pub use context::{OperationContext, PeerProgress, ProgressReporter};
pub use dispatcher::{
    DEFAULT_TIMEOUT, DispatchOptions, Dispatcher, InvocationState, OperationHandle,
};
pub use error::{DispatchError, LoadError};
pub use group::{GroupCatalog, GroupDescription, NoSettings, ServiceGroup};
pub use operation::{Operation, OperationFuture, OperationMetadata, OperationOutput};
