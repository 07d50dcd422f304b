//! Domain data layer and tool bridge for Copiloto.
//!
//! The read-only query tools run here; side-effecting tools are only
//! described (catalog + confirmation policy) and executed elsewhere after a
//! human approves them.

mod catalog;
mod domain;
mod error;
mod executor;
mod policy;
mod queries;
mod sqlite;
mod store;

pub use catalog::tool_definitions;
pub use domain::{Client, Meeting, Payment, Task};
pub use error::{Result, ToolError};
pub use executor::{QueryExecutionResult, ToolExecutor};
pub use policy::{ConfirmationType, confirmation_type_for, tool_requires_confirmation};
pub use sqlite::SqliteStore;
pub use store::{MemoryStore, Store};
