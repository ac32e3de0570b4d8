//! Named rewriting rules and the configuration that activates one.
pub mod config;
pub mod registry;

pub use config::{ConfigError, PassConfig};
pub use registry::{PropertyFactory, PropertyRegistry, RegistryError};
