//! # hostlet
//!
//! **hostlet** is a deterministic request-dispatch, authorization, and
//! lifecycle engine for simulated web-application hosting.
//!
//! ## Overview
//!
//! Given a declarative description of registered handlers, URL-pattern
//! mappings, security constraints, and lifecycle listeners, hostlet
//! resolves an incoming request descriptor to a handler, enforces
//! authentication and authorization before invoking it, and manages
//! session and application lifecycle with deterministic event ordering.
//!
//! The engine operates on already-parsed request descriptors: wire
//! transport, HTML parsing, and browser-style navigation are external
//! collaborators. A dispatch produces exactly one of a handler reply, a
//! redirect, an authentication challenge, or a not-found/forbidden
//! outcome.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`config`]** - Declarative configuration: handlers, patterns, constraints, users, listeners
//! - **[`mapping`]** - URL-pattern precedence resolution and context-path mounting
//! - **[`security`]** - Authentication modes, constraints, identities, pluggable user stores
//! - **[`session`]** - Counter-keyed session store with serialized per-session mutation
//! - **[`events`]** - Ordered lifecycle/attribute listener delivery (construction vs teardown order)
//! - **[`app`]** - The application context: start, eager handler instantiation, stop
//! - **[`dispatch`]** - Per-request orchestration across all of the above
//! - **[`host`]** - Top-level object serializing start/stop against in-flight dispatches
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Host
//!     participant Mapping as MappingTable
//!     participant Security as SecurityPolicy
//!     participant Sessions as SessionStore
//!     participant Handler
//!
//!     Caller->>Host: dispatch(descriptor)
//!     Host->>Mapping: resolve(path)
//!     alt No mapping matched
//!         Mapping-->>Caller: NotFound
//!     end
//!     Host->>Security: requires_authorization(path)?
//!     alt Challenge mode, no credentials
//!         Security-->>Caller: AuthenticationRequired(realm)
//!     else Redirect mode, unauthenticated
//!         Security-->>Caller: Redirect(login)
//!     else Role not permitted
//!         Security-->>Caller: Forbidden
//!     end
//!     Host->>Sessions: join or create
//!     Host->>Handler: handle(request)
//!     Handler-->>Caller: reply (+ session token when created)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use hostlet::config::{AppConfig, HandlerConfig};
//! use hostlet::dispatch::{HandlerReply, RequestDescriptor};
//! use hostlet::handler::shared_handler;
//! use hostlet::Host;
//! use serde_json::json;
//!
//! let config = AppConfig::new("demo").with_handler(
//!     HandlerConfig::new("hello").with_pattern("/hello"),
//!     shared_handler(|_req| Ok(HandlerReply::ok(json!({ "greeting": "hi" })))),
//! );
//!
//! let host = Host::start(config).unwrap();
//! let outcome = host.dispatch(RequestDescriptor::get("/hello")).unwrap();
//! assert_eq!(outcome.status(), Some(200));
//! host.stop();
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Exactly one matching rule wins per request: exact, then longest
//!   segment-aligned prefix, then first-registered extension, then the
//!   default mapping.
//! - Session identifiers are strictly increasing from 1 and never
//!   reused, even after invalidation.
//! - Eager handler instantiation follows ascending load order with ties
//!   broken by declaration order.
//! - Construction-kind listener events fire in registration order;
//!   destruction-kind events fire in exactly the reverse order.
//!
//! ## Concurrency Model
//!
//! Requests dispatch independently and may run concurrently. A single
//! session serializes its own mutation while distinct sessions proceed
//! in parallel. Listener notification is synchronous on the mutating
//! thread. Application start and stop are exclusive operations: no
//! request begins dispatch during either, and stop waits for in-flight
//! dispatches to complete.

pub mod app;
pub mod config;
pub mod dispatch;
pub mod events;
pub mod handler;
pub mod host;
pub mod ids;
pub mod mapping;
pub mod security;
pub mod session;

pub use app::Application;
pub use config::{load_config, AppConfig, AuthConfig, ConfigError, ConstraintConfig, HandlerConfig};
pub use dispatch::{
    Disposition, DispatchError, DispatchOutcome, Dispatcher, HandlerReply, HandlerRequest,
    RequestDescriptor,
};
pub use handler::{Handler, HandlerFactory};
pub use host::Host;
pub use security::{Credentials, Identity, UserStore};
pub use session::{Session, SessionError, SessionStore};
