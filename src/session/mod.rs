//! # Session Module
//!
//! Server-side conversation state keyed by engine-assigned identifiers.
//!
//! ## Overview
//!
//! The [`SessionStore`] creates, retrieves, and invalidates [`Session`]
//! objects. Identifiers come from a monotonically increasing counter
//! starting at 1 and are never reused for the lifetime of the store,
//! even after invalidation.
//!
//! Each session owns an attribute mapping and a few bookkeeping fields
//! (creation time, last-access time, max-inactive interval, an `is_new`
//! flag cleared by the first join after creation). A session stays valid
//! until [`Session::invalidate`]; invalidation clears the attributes and
//! is permanent - every subsequent accessor fails with
//! [`SessionError::InvalidState`].
//!
//! ## Concurrency
//!
//! Distinct sessions are independent and may be mutated in parallel; a
//! single session serializes mutation behind its own lock, and readers
//! observe a consistent snapshot. Lifecycle and attribute listeners are
//! notified synchronously on the mutating thread, after the lock has
//! been released, so a listener may read back through the same session.

mod core;

pub use core::{Session, SessionError, SessionStore, DEFAULT_MAX_INACTIVE_SECS};
