//! Command descriptors: compilation from descriptor documents and per-request binding.

pub mod binder;
pub mod compiler;
pub mod types;

pub use binder::{bind, ParameterValues};
pub use compiler::compile;
pub use types::{
    parameter_key, BoundCommand, BoundValue, CoercionTarget, CommandDescriptor, CommandKind,
    DeclaredType, Direction, ParameterDescriptor, SqlValue, DEFAULT_TIMEOUT_SECONDS,
};
