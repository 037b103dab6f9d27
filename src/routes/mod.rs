pub mod common;
pub mod gateway;

pub use common::common_routes;
pub use gateway::{app, gateway_routes};
