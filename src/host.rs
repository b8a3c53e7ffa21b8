//! The top-level host: owns the running application and makes start and
//! stop exclusive with respect to in-flight dispatches.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::app::Application;
use crate::config::{AppConfig, ConfigError};
use crate::dispatch::{Dispatcher, DispatchError, DispatchOutcome, RequestDescriptor};
use crate::session::Session;

/// Owns a started [`Application`] and serializes lifecycle against
/// dispatch.
///
/// Every dispatch runs under a read guard while `stop` takes the write
/// guard, so no request begins dispatch while the application is being
/// torn down and `stop` waits for in-flight dispatches to complete
/// before discarding shared state.
pub struct Host {
    app: RwLock<Option<Application>>,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("running", &self.is_running())
            .finish()
    }
}

impl Host {
    /// Start an application from configuration.
    ///
    /// Fails fast on any configuration error; see
    /// [`Application::start`].
    pub fn start(config: AppConfig) -> Result<Self, ConfigError> {
        let app = Application::start(config)?;
        Ok(Self {
            app: RwLock::new(Some(app)),
        })
    }

    /// Dispatch one request against the running application.
    ///
    /// Returns [`DispatchError::NotRunning`] after [`stop`](Self::stop).
    pub fn dispatch(&self, request: RequestDescriptor) -> Result<DispatchOutcome, DispatchError> {
        let guard = self.app.read().unwrap_or_else(PoisonError::into_inner);
        let app = guard.as_ref().ok_or(DispatchError::NotRunning)?;
        Dispatcher::new(app).dispatch(request)
    }

    /// Stop the application, waiting for in-flight dispatches first.
    ///
    /// Idempotent; a second call is a no-op.
    pub fn stop(&self) {
        let mut guard = self.app.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(app) = guard.take() {
            app.stop();
        } else {
            info!("Host already stopped");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.app
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Look up a live session by token, for inspection.
    #[must_use]
    pub fn session(&self, id: &str) -> Option<Arc<Session>> {
        let guard = self.app.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().and_then(|app| app.sessions().get(id))
    }

    /// Run a closure against the application, if it is running.
    ///
    /// Holds the read guard for the duration of the closure; useful for
    /// inspecting component state without racing a concurrent `stop`.
    pub fn with_application<T>(&self, f: impl FnOnce(&Application) -> T) -> Option<T> {
        let guard = self.app.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(f)
    }
}
