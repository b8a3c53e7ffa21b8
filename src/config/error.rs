use std::fmt;

/// Configuration error
///
/// Returned by [`Application::start`](crate::app::Application::start) when
/// the declarative configuration is malformed. Configuration problems fail
/// fast at start; they are never surfaced at request time.
#[derive(Debug)]
pub enum ConfigError {
    /// Two handler registrations share a name
    DuplicateHandler { name: String },
    /// A handler registration has no factory installed
    MissingFactory { name: String },
    /// A URL pattern string does not parse as exact, prefix, extension, or default
    InvalidPattern { pattern: String, reason: String },
    /// Two registrations claim the same URL pattern
    DuplicatePattern { pattern: String },
    /// A security constraint exists but no authentication mode is configured
    ConstraintWithoutAuthMode { constraint: String },
    /// A security constraint declares an extension or default pattern;
    /// constraints are restricted to exact and prefix forms
    UnsupportedConstraintPattern { constraint: String, pattern: String },
    /// The configured login or error endpoint does not resolve to a handler
    UnresolvedAuthPath { role: &'static str, path: String },
    /// The redirect-login submit path is empty or does not start with `/`
    InvalidSubmitPath { path: String },
    /// Two configured users share a username
    DuplicateUser { username: String },
    /// An eagerly loaded handler factory failed during startup
    HandlerInit {
        name: String,
        source: anyhow::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DuplicateHandler { name } => {
                write!(f, "duplicate handler registration '{}'", name)
            }
            ConfigError::MissingFactory { name } => {
                write!(f, "handler '{}' has no factory installed", name)
            }
            ConfigError::InvalidPattern { pattern, reason } => {
                write!(f, "invalid URL pattern '{}': {}", pattern, reason)
            }
            ConfigError::DuplicatePattern { pattern } => {
                write!(f, "URL pattern '{}' is claimed by more than one handler", pattern)
            }
            ConfigError::ConstraintWithoutAuthMode { constraint } => {
                write!(
                    f,
                    "security constraint '{}' requires authorization but no authentication mode is configured",
                    constraint
                )
            }
            ConfigError::UnsupportedConstraintPattern { constraint, pattern } => {
                write!(
                    f,
                    "security constraint '{}' declares pattern '{}'; only exact and prefix patterns may be constrained",
                    constraint, pattern
                )
            }
            ConfigError::UnresolvedAuthPath { role, path } => {
                write!(f, "configured {} path '{}' does not resolve to a handler", role, path)
            }
            ConfigError::InvalidSubmitPath { path } => {
                write!(f, "login submit path '{}' must be a non-empty absolute path", path)
            }
            ConfigError::DuplicateUser { username } => {
                write!(f, "duplicate user '{}'", username)
            }
            ConfigError::HandlerInit { name, .. } => {
                write!(f, "handler '{}' failed to initialize at startup", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::HandlerInit { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
