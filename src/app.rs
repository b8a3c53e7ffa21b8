//! The application context: one object owning the mapping table,
//! security policy, session store, event dispatcher, and handler cache,
//! built from configuration at start and discarded at stop. There is no
//! ambient global state; the dispatcher receives the context explicitly.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::config::{AppConfig, AuthConfig, ConfigError, HandlerConfig};
use crate::events::{ApplicationEvent, EventDispatcher};
use crate::handler::{Handler, HandlerFactory, HandlerInit};
use crate::mapping::{MappingTable, UrlPattern};
use crate::security::{AuthMode, Constraint, InMemoryUserStore, SecurityPolicy};
use crate::session::SessionStore;

struct Registration {
    config: HandlerConfig,
    factory: Arc<dyn HandlerFactory>,
}

/// A started application.
///
/// Construction validates the whole configuration and eagerly
/// instantiates every handler registration carrying a load order,
/// ascending by value with ties broken by declaration order. Handlers
/// without a load order are instantiated lazily on first resolution and
/// cached for reuse.
pub struct Application {
    name: String,
    params: HashMap<String, String>,
    mapping: MappingTable,
    policy: SecurityPolicy,
    sessions: SessionStore,
    events: Arc<EventDispatcher>,
    registrations: Vec<Registration>,
    index: HashMap<String, usize>,
    cache: DashMap<String, Arc<dyn Handler>>,
}

impl Application {
    /// Build every component from configuration, instantiate ordered
    /// handlers, and fire the application-started notification.
    ///
    /// All configuration problems surface here, never at request time.
    pub fn start(config: AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let AppConfig {
            name,
            context_path,
            params,
            handlers,
            constraints,
            auth,
            users,
            factories,
            listeners,
        } = config;

        let mut pairs = Vec::new();
        for handler in &handlers {
            for pattern in &handler.patterns {
                pairs.push((handler.name.clone(), UrlPattern::parse(pattern)?));
            }
        }
        let mapping = MappingTable::build(&context_path, &pairs)?;

        let mode = match &auth {
            AuthConfig::None => AuthMode::None,
            AuthConfig::Challenge { realm } => AuthMode::Challenge {
                realm: realm.clone(),
            },
            AuthConfig::Form {
                realm,
                login_path,
                error_path,
                submit_path,
            } => {
                if mapping.resolve_relative(login_path).is_none() {
                    return Err(ConfigError::UnresolvedAuthPath {
                        role: "login",
                        path: login_path.clone(),
                    });
                }
                if mapping.resolve_relative(error_path).is_none() {
                    return Err(ConfigError::UnresolvedAuthPath {
                        role: "error",
                        path: error_path.clone(),
                    });
                }
                AuthMode::FormRedirect {
                    realm: realm.clone(),
                    login_path: login_path.clone(),
                    error_path: error_path.clone(),
                    submit_path: submit_path.clone(),
                }
            }
        };

        let mut store = InMemoryUserStore::new();
        for user in &users {
            store.add_user(&user.username, &user.password, user.roles.iter().cloned());
        }

        let mut policy_constraints = Vec::with_capacity(constraints.len());
        for constraint in &constraints {
            let patterns = constraint
                .patterns
                .iter()
                .map(|p| UrlPattern::parse(p))
                .collect::<Result<Vec<_>, _>>()?;
            policy_constraints.push(Constraint {
                name: constraint.name.clone(),
                patterns,
                roles: constraint.roles.iter().cloned().collect(),
            });
        }
        let policy = SecurityPolicy::new(mode, policy_constraints, Arc::new(store));

        let events = Arc::new(listeners);
        let sessions = SessionStore::new(Arc::clone(&events));

        let mut registrations = Vec::with_capacity(handlers.len());
        let mut index = HashMap::new();
        for handler in handlers {
            let factory = factories
                .get(&handler.name)
                .map(Arc::clone)
                .ok_or_else(|| ConfigError::MissingFactory {
                    name: handler.name.clone(),
                })?;
            index.insert(handler.name.clone(), registrations.len());
            registrations.push(Registration {
                config: handler,
                factory,
            });
        }

        let app = Self {
            name,
            params,
            mapping,
            policy,
            sessions,
            events,
            registrations,
            index,
            cache: DashMap::new(),
        };

        let mut eager: Vec<(u32, usize)> = app
            .registrations
            .iter()
            .enumerate()
            .filter_map(|(idx, r)| r.config.load_order.map(|order| (order, idx)))
            .collect();
        eager.sort_by_key(|&(order, idx)| (order, idx));
        for (order, idx) in eager {
            let name = app.registrations[idx].config.name.clone();
            debug!(handler = %name, load_order = order, "Eagerly instantiating handler");
            app.instantiate(idx)
                .map(|_| ())
                .map_err(|source| ConfigError::HandlerInit { name, source })?;
        }

        info!(
            application = %app.name,
            handlers = app.registrations.len(),
            context_path = %app.mapping.context_path(),
            "Application started"
        );
        app.events.application_started(&ApplicationEvent {
            application: app.name.clone(),
        });
        Ok(app)
    }

    /// Fire the application-stopped notification (reverse registration
    /// order) and discard all state.
    pub fn stop(self) {
        info!(application = %self.name, live_sessions = self.sessions.len(), "Application stopping");
        self.events.application_stopped(&ApplicationEvent {
            application: self.name.clone(),
        });
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    #[must_use]
    pub fn mapping(&self) -> &MappingTable {
        &self.mapping
    }

    #[must_use]
    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Whether the named handler has been instantiated (eagerly or by a
    /// previous resolution).
    #[must_use]
    pub fn is_instantiated(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Fetch the cached handler instance, instantiating it on first use.
    pub(crate) fn handler(&self, name: &str) -> anyhow::Result<Arc<dyn Handler>> {
        let idx = self
            .index
            .get(name)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no handler registration named '{name}'"))?;
        self.instantiate(idx)
    }

    fn instantiate(&self, idx: usize) -> anyhow::Result<Arc<dyn Handler>> {
        let registration = &self.registrations[idx];
        let name = registration.config.name.as_str();
        match self.cache.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                // the vacant entry holds its shard lock, so a concurrent
                // first use waits instead of instantiating twice
                let init = HandlerInit {
                    name,
                    params: &registration.config.params,
                    app_params: &self.params,
                };
                let handler = registration.factory.create(&init)?;
                entry.insert(Arc::clone(&handler));
                info!(handler = %name, "Handler instantiated");
                Ok(handler)
            }
        }
    }
}
