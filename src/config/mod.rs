//! Configuration management.
//!
//! # Data Flow
//! ```text
//! logging.toml / logging.json
//!     -> loader.rs      (parse, ${VAR} substitution, env key overrides)
//!     -> schema.rs      (LoggingConfig)
//!     -> validation.rs  (referential checks, every error collected)
//!     -> registry.rs    (class tag -> constructor)
//!     -> core::Logging  (live graph)
//! ```

pub mod loader;
pub mod params;
pub mod registry;
pub mod schema;
pub mod validation;

pub use loader::{
    load_config, load_config_with, load_default, load_default_with, parse_config,
    process_env, resolve_source, ConfigFormat, ConfigSource, CONFIG_PATH_ENV,
};
pub use params::Params;
pub use registry::{HandlerContext, Registry};
pub use schema::{
    FilterConfig, FormatterConfig, HandlerConfig, LoggerConfig, LoggingConfig, RootConfig,
};
pub use validation::{validate_config, ValidationError};
