//! # Configuration Module
//!
//! Declarative application configuration: handler registrations and
//! their URL patterns, application-wide parameters, security constraints,
//! the authentication mode, users, and the context mount.
//!
//! ## Overview
//!
//! An [`AppConfig`] can be parsed from a YAML or JSON file with
//! [`load_config`], assembled in code with the fluent `with_*` methods,
//! or both - a common shape is loading the declarative part from a file
//! and then installing factories and listeners in code:
//!
//! ```rust,ignore
//! let mut config = hostlet::config::load_config("app.yaml")?;
//! config.register_factory("reports", my_factory);
//! let host = hostlet::Host::start(config)?;
//! ```
//!
//! Everything that can be wrong with a configuration - duplicate names
//! or patterns, constraints without an authentication mode, unresolvable
//! login endpoints - fails fast when the application starts, never at
//! request time.

mod error;
mod load;
mod types;

pub use error::ConfigError;
pub use load::load_config;
pub use types::{AppConfig, AuthConfig, ConstraintConfig, HandlerConfig, UserConfig};
