//! Gateway services: descriptor cache, database runner, executor and catalog endpoints.

mod cache;
mod databases;
mod executor;
mod runner;
pub use cache::DescriptorCache;
pub use databases::{DatabaseCatalog, DatabaseInfo, DATABASES_DESCRIPTOR, OBJECTS_DESCRIPTOR, OBJECT_DESCRIPTOR};
pub use executor::GatewayExecutor;
pub use runner::{CommandRunner, ConnectionTarget, PgCommandRunner, PreparedCommand};
