//! Configuration loading for proxyvet.
//!
//! Values resolve in order: environment (optionally seeded from `.env`),
//! then the TOML file, then built-in defaults. Guard rails run on the
//! composed result and either reject it or attach warnings.

pub mod loader;
pub mod models;
pub mod sources;
mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::{
    Config, ConfigMetadata, DEFAULT_REDIS_URL, DEFAULT_REQUEST_TIMEOUT, RedisConfig,
};
pub use sources::{EnvConfig, FileConfig};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
