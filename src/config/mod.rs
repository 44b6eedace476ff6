//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ControlConfig (validated, immutable)
//!     → seeds the ConfigStore and tunes the server
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server replaces the route table if `routes` changed, then broadcasts
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only `routes` is hot-reloadable; listener settings need a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{apply_overrides, load_config, ConfigError};
pub use schema::{
    AdminConfig, ControlConfig, ListenerConfig, ObservabilityConfig, StreamingConfig,
    TimeoutConfig,
};
pub use validation::{validate_routes, ValidationError};
