//! Query model and execution
//!
//! A [`Query`] is assembled through the fluent builder, then interpreted by
//! the [`QueryExecutor`] under one lock episode coordinated by the lock set.

pub mod ast;
pub mod condition;
pub mod executor;
pub(crate) mod locks;
pub mod transport;

// Re-export main types
pub use ast::{Method, Query, SortDirection, SortMode, SortSpec, SubQuery, Traversal};
pub use condition::{Condition, Field, GroupOp, Operator};
pub use executor::QueryExecutor;
pub use transport::{Transport, TransportEntity, TransportRelation};
