//! # Events Module
//!
//! Ordered delivery of application, session, and session-attribute
//! lifecycle notifications.
//!
//! ## Overview
//!
//! Listeners are registered per category before the application starts and
//! the registration order is preserved for the lifetime of the application.
//! Delivery direction depends on the kind of event:
//!
//! - **Construction kinds** (application started, session created,
//!   attribute added/replaced) are delivered in registration order, so an
//!   earlier-registered listener may assume its dependencies are ready when
//!   later listeners run.
//! - **Destruction kinds** (application stopped, session destroyed) are
//!   delivered in *reverse* registration order, modelling structured
//!   teardown: last registered, first torn down.
//!
//! Attribute mutation events are not teardown; they always use
//! registration order regardless of whether the mutation was an add,
//! replace, or remove.
//!
//! All delivery is synchronous on the thread performing the triggering
//! mutation. A slow listener delays the triggering request.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::session::Session;

/// Payload for application started/stopped notifications.
#[derive(Debug, Clone)]
pub struct ApplicationEvent {
    /// Name of the application being started or stopped
    pub application: String,
}

/// Payload for session created/destroyed notifications.
#[derive(Clone)]
pub struct SessionEvent {
    /// The session the event concerns. During a destroyed notification the
    /// session is still valid; it is cleared and marked invalid only after
    /// every listener has run.
    pub session: Arc<Session>,
}

/// Payload for session-attribute mutation notifications.
///
/// Carries the full mutation: `old` is present for replace and remove,
/// `new` is present for add and replace.
#[derive(Clone)]
pub struct SessionAttributeEvent {
    pub session: Arc<Session>,
    /// Attribute name that was mutated
    pub name: String,
    /// Previous value, if the name was bound before the mutation
    pub old: Option<Value>,
    /// New value, if the name is bound after the mutation
    pub new: Option<Value>,
}

/// Observer of application start/stop.
pub trait ApplicationListener: Send + Sync {
    fn application_started(&self, event: &ApplicationEvent) {
        let _ = event;
    }
    fn application_stopped(&self, event: &ApplicationEvent) {
        let _ = event;
    }
}

/// Observer of whole-session lifecycle.
pub trait SessionListener: Send + Sync {
    fn session_created(&self, event: &SessionEvent) {
        let _ = event;
    }
    fn session_destroyed(&self, event: &SessionEvent) {
        let _ = event;
    }
}

/// Observer of per-attribute session mutation.
pub trait SessionAttributeListener: Send + Sync {
    fn attribute_added(&self, event: &SessionAttributeEvent) {
        let _ = event;
    }
    fn attribute_replaced(&self, event: &SessionAttributeEvent) {
        let _ = event;
    }
    fn attribute_removed(&self, event: &SessionAttributeEvent) {
        let _ = event;
    }
}

/// Delivery direction for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    /// Registration order
    Construction,
    /// Reverse registration order
    Destruction,
}

/// Holds the ordered listener registrations for every category and
/// delivers notifications with direction-dependent ordering.
///
/// Registration happens while the configuration is being assembled; once
/// the application has started the dispatcher is shared read-only, so no
/// locking is needed on the fire path.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    application: Vec<Arc<dyn ApplicationListener>>,
    session: Vec<Arc<dyn SessionListener>>,
    attribute: Vec<Arc<dyn SessionAttributeListener>>,
}

fn deliver<L: ?Sized>(listeners: &[Arc<L>], delivery: Delivery, mut notify: impl FnMut(&L)) {
    match delivery {
        Delivery::Construction => {
            for listener in listeners {
                notify(listener.as_ref());
            }
        }
        Delivery::Destruction => {
            for listener in listeners.iter().rev() {
                notify(listener.as_ref());
            }
        }
    }
}

impl EventDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an application listener; order of registration is significant.
    pub fn register_application_listener(&mut self, listener: Arc<dyn ApplicationListener>) {
        self.application.push(listener);
    }

    /// Append a session listener; order of registration is significant.
    pub fn register_session_listener(&mut self, listener: Arc<dyn SessionListener>) {
        self.session.push(listener);
    }

    /// Append a session-attribute listener; order of registration is significant.
    pub fn register_attribute_listener(&mut self, listener: Arc<dyn SessionAttributeListener>) {
        self.attribute.push(listener);
    }

    pub fn application_started(&self, event: &ApplicationEvent) {
        debug!(
            application = %event.application,
            listeners = self.application.len(),
            "Delivering application started"
        );
        deliver(&self.application, Delivery::Construction, |l| {
            l.application_started(event)
        });
    }

    pub fn application_stopped(&self, event: &ApplicationEvent) {
        debug!(
            application = %event.application,
            listeners = self.application.len(),
            "Delivering application stopped"
        );
        deliver(&self.application, Delivery::Destruction, |l| {
            l.application_stopped(event)
        });
    }

    pub fn session_created(&self, event: &SessionEvent) {
        deliver(&self.session, Delivery::Construction, |l| {
            l.session_created(event)
        });
    }

    pub fn session_destroyed(&self, event: &SessionEvent) {
        deliver(&self.session, Delivery::Destruction, |l| {
            l.session_destroyed(event)
        });
    }

    pub fn attribute_added(&self, event: &SessionAttributeEvent) {
        deliver(&self.attribute, Delivery::Construction, |l| {
            l.attribute_added(event)
        });
    }

    pub fn attribute_replaced(&self, event: &SessionAttributeEvent) {
        deliver(&self.attribute, Delivery::Construction, |l| {
            l.attribute_replaced(event)
        });
    }

    pub fn attribute_removed(&self, event: &SessionAttributeEvent) {
        deliver(&self.attribute, Delivery::Construction, |l| {
            l.attribute_removed(event)
        });
    }
}
