//! Handler and handler-factory traits.
//!
//! A handler is a unit of request-processing logic bound to one or more
//! URL patterns. Registrations carry a factory rather than an instance:
//! the application instantiates eagerly at start for registrations with
//! a load order, lazily on first resolution otherwise, and caches the
//! instance either way.

use std::collections::HashMap;
use std::sync::Arc;

use crate::dispatch::{HandlerReply, HandlerRequest};

/// Context handed to a factory when a handler is instantiated.
///
/// Exposes the registration's init parameters and the application-wide
/// parameters.
#[derive(Debug, Clone, Copy)]
pub struct HandlerInit<'a> {
    /// Name of the registration being instantiated
    pub name: &'a str,
    /// Per-registration init parameters
    pub params: &'a HashMap<String, String>,
    /// Application-wide parameters
    pub app_params: &'a HashMap<String, String>,
}

impl HandlerInit<'_> {
    /// Look up an init parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Look up an application-wide parameter by name.
    #[must_use]
    pub fn app_param(&self, name: &str) -> Option<&str> {
        self.app_params.get(name).map(String::as_str)
    }
}

/// A unit of request-processing logic.
///
/// Failures propagate unchanged through the dispatcher to the caller.
pub trait Handler: Send + Sync {
    fn handle(&self, request: HandlerRequest) -> anyhow::Result<HandlerReply>;
}

/// Produces handler instances for a registration.
pub trait HandlerFactory: Send + Sync {
    fn create(&self, init: &HandlerInit<'_>) -> anyhow::Result<Arc<dyn Handler>>;
}

/// Adapter turning a plain function into a [`Handler`].
pub struct FnHandler<F>(F);

impl<F> Handler for FnHandler<F>
where
    F: Fn(HandlerRequest) -> anyhow::Result<HandlerReply> + Send + Sync,
{
    fn handle(&self, request: HandlerRequest) -> anyhow::Result<HandlerReply> {
        (self.0)(request)
    }
}

/// Wrap a function as a shareable handler.
pub fn handler_fn<F>(f: F) -> Arc<dyn Handler>
where
    F: Fn(HandlerRequest) -> anyhow::Result<HandlerReply> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// Adapter turning a plain function into a [`HandlerFactory`].
pub struct FnFactory<F>(F);

impl<F> HandlerFactory for FnFactory<F>
where
    F: for<'a> Fn(&HandlerInit<'a>) -> anyhow::Result<Arc<dyn Handler>> + Send + Sync,
{
    fn create(&self, init: &HandlerInit<'_>) -> anyhow::Result<Arc<dyn Handler>> {
        (self.0)(init)
    }
}

/// Wrap a function as a shareable factory.
pub fn factory_fn<F>(f: F) -> Arc<dyn HandlerFactory>
where
    F: for<'a> Fn(&HandlerInit<'a>) -> anyhow::Result<Arc<dyn Handler>> + Send + Sync + 'static,
{
    Arc::new(FnFactory(f))
}

/// Factory that hands out clones of one pre-built handler, ignoring init
/// parameters. Convenient for stateless handlers and tests.
pub struct SharedFactory(Arc<dyn Handler>);

impl SharedFactory {
    #[must_use]
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self(handler)
    }
}

impl HandlerFactory for SharedFactory {
    fn create(&self, _init: &HandlerInit<'_>) -> anyhow::Result<Arc<dyn Handler>> {
        Ok(Arc::clone(&self.0))
    }
}

/// Shorthand: wrap a request function as a factory for a shared handler.
pub fn shared_handler<F>(f: F) -> Arc<dyn HandlerFactory>
where
    F: Fn(HandlerRequest) -> anyhow::Result<HandlerReply> + Send + Sync + 'static,
{
    Arc::new(SharedFactory::new(handler_fn(f)))
}
