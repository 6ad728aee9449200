//! HTTP handlers
//!
//! Glob re-exports keep the utoipa `__path_*` items reachable from
//! `crate::gateway::handlers` for the OpenAPI document.

pub mod dlq;
pub mod health;
pub mod transaction;

pub use dlq::*;
pub use health::*;
pub use transaction::*;
