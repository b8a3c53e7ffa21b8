//! # Security Module
//!
//! Authentication and authorization for dispatched requests.
//!
//! ## Overview
//!
//! A [`SecurityPolicy`] is built from the configured constraints, the
//! authentication mode, and a [`UserStore`]. Per request the dispatcher
//! asks three questions:
//!
//! 1. Does this path require authorization at all
//!    ([`SecurityPolicy::requires_authorization`])?
//! 2. Which roles may access it ([`SecurityPolicy::permitted_roles`] -
//!    the union across every matching constraint)?
//! 3. Do the submitted credentials map to an identity
//!    ([`SecurityPolicy::authenticate`])?
//!
//! ## Authentication modes
//!
//! - **None** - nothing requires authorization; handlers are invoked
//!   directly. Declaring a constraint in this mode is a configuration
//!   error caught at start.
//! - **Challenge** - protected paths demand `Basic` credentials on the
//!   request; a missing credential yields an authentication-required
//!   outcome carrying the configured realm, a bad credential or a
//!   non-permitted role yields forbidden.
//! - **FormRedirect** - protected paths redirect unauthenticated callers
//!   to a login handler; a designated submit endpoint accepts `username`
//!   and `password` fields, binds the resulting identity to the session,
//!   and re-dispatches the originally requested path.
//!
//! ## User stores
//!
//! Credential checking is pluggable through the [`UserStore`] trait.
//! The built-in [`InMemoryUserStore`] is populated from configuration;
//! custom stores can defer to anything that can answer
//! username/password lookups.

mod policy;
mod users;

pub use policy::{Constraint, SecurityPolicy};
pub use users::InMemoryUserStore;

use std::collections::HashSet;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Submitted username/password pair, prior to verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// An authenticated caller: user name plus granted roles.
///
/// Absent until authentication succeeds. In redirect-login mode the
/// identity is bound to the originating session once established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub roles: HashSet<String>,
}

impl Identity {
    pub fn new<R: Into<String>>(
        username: impl Into<String>,
        roles: impl IntoIterator<Item = R>,
    ) -> Self {
        Self {
            username: username.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the identity carries the given role.
    #[must_use]
    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Validates submitted credentials and produces identities.
pub trait UserStore: Send + Sync {
    /// Returns the identity for valid credentials, `None` otherwise.
    fn authenticate(&self, credentials: &Credentials) -> Option<Identity>;
}

/// Error raised when submitted credentials are rejected.
///
/// Recoverable: the caller may retry with different credentials. In
/// credential-challenge mode the dispatcher converts a rejection into a
/// forbidden outcome; in redirect-login mode it routes to the configured
/// error handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidCredentials;

impl std::fmt::Display for InvalidCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "submitted credentials were rejected")
    }
}

impl std::error::Error for InvalidCredentials {}

/// Authentication mode resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// No authentication; nothing requires authorization
    None,
    /// HTTP Basic credential challenge
    Challenge { realm: String },
    /// Redirect unauthenticated callers to a login handler
    FormRedirect {
        realm: String,
        login_path: String,
        error_path: String,
        submit_path: String,
    },
}

/// The challenge scheme advertised with authentication-required outcomes.
pub const BASIC_SCHEME: &str = "Basic";

/// Field names accepted by the redirect-login submit endpoint.
pub const LOGIN_USERNAME_FIELD: &str = "username";
pub const LOGIN_PASSWORD_FIELD: &str = "password";

/// Decode `Basic <base64(user:pass)>` authorization header values.
///
/// Returns `None` for non-Basic schemes or undecodable payloads; the
/// caller treats that the same as absent credentials.
#[must_use]
pub fn parse_basic_authorization(header_value: &str) -> Option<Credentials> {
    let encoded = header_value.strip_prefix("Basic ")?.trim();
    let decoded = BASE64.decode(encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some(Credentials::new(username, password))
}

/// Encode a username/password pair as a `Basic` authorization header value.
#[must_use]
pub fn basic_authorization(username: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{username}:{password}")))
}
