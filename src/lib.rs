//! Data gateway: file-based data source definitions turned into SQL queries, served as
//! JSON or XML per tenant.

pub mod coerce;
pub mod command;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod resolver;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod tenant;

pub use coerce::{coerce_lenient, coerce_strict, Coercible, RawValue};
pub use command::{bind, compile, BoundCommand, CommandDescriptor, ParameterValues};
pub use config::{load_settings, load_settings_from_env, parse_settings, GatewaySettings};
pub use error::{AppError, CoerceError, ConfigError, DescriptorError};
pub use resolver::{AcceptedMedia, DataSourceResolver, MediaType, Resolution, ResolvedArtifact};
pub use routes::{app, common_routes, gateway_routes};
pub use service::{CommandRunner, ConnectionTarget, GatewayExecutor, PgCommandRunner, PreparedCommand};
pub use state::AppState;
pub use tenant::{TenantContext, TenantRegistry};
