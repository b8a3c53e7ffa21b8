use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;

use crate::events::{
    ApplicationListener, EventDispatcher, SessionAttributeListener, SessionListener,
};
use crate::handler::HandlerFactory;
use crate::mapping::UrlPattern;

use super::ConfigError;

/// Declarative description of one handler registration.
#[derive(Debug, Clone, Deserialize)]
pub struct HandlerConfig {
    /// Unique registration name
    pub name: String,
    /// URL patterns the handler is bound to; a handler may own several
    /// patterns of mixed kinds
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Startup order. Present: the handler is instantiated eagerly at
    /// application start, ascending by value then declaration order.
    /// Absent: instantiated lazily on first resolution.
    #[serde(default)]
    pub load_order: Option<u32>,
    /// Init parameters handed to the factory (unique names)
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl HandlerConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            patterns: Vec::new(),
            load_order: None,
            params: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    #[must_use]
    pub fn with_load_order(mut self, order: u32) -> Self {
        self.load_order = Some(order);
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// Declarative description of one security constraint.
#[derive(Debug, Clone, Deserialize)]
pub struct ConstraintConfig {
    pub name: String,
    /// Exact and prefix patterns only
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl ConstraintConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            patterns: Vec::new(),
            roles: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }
}

/// One configured user for the built-in user store.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Authentication mode selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum AuthConfig {
    /// No authentication; declaring constraints in this mode fails at start
    #[default]
    None,
    /// HTTP Basic credential challenge
    Challenge { realm: String },
    /// Redirect unauthenticated callers to a login handler
    Form {
        realm: String,
        /// Path of the login handler (itself unauthenticated)
        login_path: String,
        /// Path of the handler shown after a rejected login
        error_path: String,
        /// Engine-internal endpoint accepting `username` and `password`
        submit_path: String,
    },
}

fn default_app_name() -> String {
    "application".to_string()
}

/// Declarative application configuration.
///
/// The serde-visible part describes handlers, patterns, constraints,
/// users, and the authentication mode; it can come from a YAML or JSON
/// file via [`load_config`](crate::config::load_config) or be assembled
/// in code. Handler factories and lifecycle listeners are code, not
/// data - install them with the `with_*`/`register_*` methods before
/// starting the application.
#[derive(Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Mount prefix for the whole mapping table; `""` mounts at the root
    pub context_path: String,
    /// Application-wide parameters visible to every handler factory
    pub params: HashMap<String, String>,
    pub handlers: Vec<HandlerConfig>,
    pub constraints: Vec<ConstraintConfig>,
    pub auth: AuthConfig,
    pub users: Vec<UserConfig>,
    #[serde(skip)]
    pub(crate) factories: HashMap<String, Arc<dyn HandlerFactory>>,
    #[serde(skip)]
    pub(crate) listeners: EventDispatcher,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("name", &self.name)
            .field("context_path", &self.context_path)
            .field("params", &self.params)
            .field("handlers", &self.handlers)
            .field("constraints", &self.constraints)
            .field("auth", &self.auth)
            .field("users", &self.users)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Declare a handler and install its factory in one step.
    #[must_use]
    pub fn with_handler(mut self, handler: HandlerConfig, factory: Arc<dyn HandlerFactory>) -> Self {
        self.factories.insert(handler.name.clone(), factory);
        self.handlers.push(handler);
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: ConstraintConfig) -> Self {
        self.constraints.push(constraint);
        self
    }

    #[must_use]
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    #[must_use]
    pub fn with_user<R: Into<String>>(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        roles: impl IntoIterator<Item = R>,
    ) -> Self {
        self.users.push(UserConfig {
            username: username.into(),
            password: password.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        });
        self
    }

    #[must_use]
    pub fn with_application_listener(mut self, listener: Arc<dyn ApplicationListener>) -> Self {
        self.listeners.register_application_listener(listener);
        self
    }

    #[must_use]
    pub fn with_session_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listeners.register_session_listener(listener);
        self
    }

    #[must_use]
    pub fn with_attribute_listener(mut self, listener: Arc<dyn SessionAttributeListener>) -> Self {
        self.listeners.register_attribute_listener(listener);
        self
    }

    /// Install the factory for a handler declared in loaded configuration.
    pub fn register_factory(&mut self, name: impl Into<String>, factory: Arc<dyn HandlerFactory>) {
        self.factories.insert(name.into(), factory);
    }

    pub fn register_application_listener(&mut self, listener: Arc<dyn ApplicationListener>) {
        self.listeners.register_application_listener(listener);
    }

    pub fn register_session_listener(&mut self, listener: Arc<dyn SessionListener>) {
        self.listeners.register_session_listener(listener);
    }

    pub fn register_attribute_listener(&mut self, listener: Arc<dyn SessionAttributeListener>) {
        self.listeners.register_attribute_listener(listener);
    }

    /// Check everything that can go wrong before any component is built.
    ///
    /// Resolvability of the redirect-login endpoints needs the mapping
    /// table and is checked during
    /// [`Application::start`](crate::app::Application::start).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut handler_names = HashSet::new();
        for handler in &self.handlers {
            if !handler_names.insert(handler.name.as_str()) {
                return Err(ConfigError::DuplicateHandler {
                    name: handler.name.clone(),
                });
            }
            if !self.factories.contains_key(&handler.name) {
                return Err(ConfigError::MissingFactory {
                    name: handler.name.clone(),
                });
            }
            for pattern in &handler.patterns {
                UrlPattern::parse(pattern)?;
            }
        }

        for constraint in &self.constraints {
            if matches!(self.auth, AuthConfig::None) {
                return Err(ConfigError::ConstraintWithoutAuthMode {
                    constraint: constraint.name.clone(),
                });
            }
            for pattern in &constraint.patterns {
                match UrlPattern::parse(pattern)? {
                    UrlPattern::Exact(_) | UrlPattern::Prefix(_) => {}
                    UrlPattern::Extension(_) | UrlPattern::Default => {
                        return Err(ConfigError::UnsupportedConstraintPattern {
                            constraint: constraint.name.clone(),
                            pattern: pattern.clone(),
                        });
                    }
                }
            }
        }

        if let AuthConfig::Form { submit_path, .. } = &self.auth {
            if submit_path.is_empty() || !submit_path.starts_with('/') {
                return Err(ConfigError::InvalidSubmitPath {
                    path: submit_path.clone(),
                });
            }
        }

        let mut usernames = HashSet::new();
        for user in &self.users {
            if !usernames.insert(user.username.as_str()) {
                return Err(ConfigError::DuplicateUser {
                    username: user.username.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::shared_handler;
    use crate::dispatch::HandlerReply;
    use serde_json::json;

    fn noop_factory() -> Arc<dyn HandlerFactory> {
        shared_handler(|_req| Ok(HandlerReply::ok(json!({}))))
    }

    #[test]
    fn duplicate_handler_names_fail_validation() {
        let config = AppConfig::new("app")
            .with_handler(HandlerConfig::new("same").with_pattern("/a"), noop_factory())
            .with_handler(HandlerConfig::new("same").with_pattern("/b"), noop_factory());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateHandler { .. })
        ));
    }

    #[test]
    fn missing_factory_fails_validation() {
        let mut config = AppConfig::new("app");
        config.handlers.push(HandlerConfig::new("orphan"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingFactory { .. })
        ));
    }

    #[test]
    fn constraint_without_auth_mode_fails_validation() {
        let config = AppConfig::new("app")
            .with_constraint(ConstraintConfig::new("secure").with_pattern("/secret"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ConstraintWithoutAuthMode { .. })
        ));
    }

    #[test]
    fn constraint_with_extension_pattern_fails_validation() {
        let config = AppConfig::new("app")
            .with_auth(AuthConfig::Challenge {
                realm: "r".to_string(),
            })
            .with_constraint(ConstraintConfig::new("secure").with_pattern("*.html"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedConstraintPattern { .. })
        ));
    }

    #[test]
    fn duplicate_users_fail_validation() {
        let config = AppConfig::new("app")
            .with_user("me", "a", ["x"])
            .with_user("me", "b", ["y"]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateUser { .. })
        ));
    }
}
