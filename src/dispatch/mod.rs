//! # Dispatch Module
//!
//! Per-request orchestration: resolve a handler, enforce security,
//! resolve the session, invoke the handler, surface the outcome.
//!
//! ## Overview
//!
//! The [`Dispatcher`] composes the other components for a single request:
//!
//! 1. Apply the context mount and resolve the path through the mapping
//!    table (failing with [`DispatchError::NotFound`]).
//! 2. Evaluate the security policy for the authentication mode in force
//!    (failing with [`DispatchError::AuthenticationRequired`] or
//!    [`DispatchError::Forbidden`], or producing a redirect to the login
//!    handler).
//! 3. Join the presented session or create a fresh one; a token for a
//!    session created during the dispatch rides back on the outcome for
//!    the caller to persist.
//! 4. Instantiate the handler lazily if it is not already cached, and
//!    invoke it with the resolved path info, identity, and session.
//!
//! Handler-level failures propagate unchanged to the caller; the only
//! failure handled inside the engine is the redirect-login internal
//! re-dispatch.

mod core;
mod types;

pub use core::Dispatcher;
pub use types::{
    Disposition, DispatchError, DispatchOutcome, HandlerReply, HandlerRequest, HeaderVec,
    ParamVec, RequestDescriptor, MAX_INLINE_HEADERS, MAX_INLINE_PARAMS,
};
