//! HTTP handlers for data-source content and catalog endpoints.

pub mod databases;
pub mod gateway;
pub use databases::*;
pub use gateway::*;
