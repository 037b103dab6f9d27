//! Statement construction: placeholders and typed bind values.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
