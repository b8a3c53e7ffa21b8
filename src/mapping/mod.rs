//! # Mapping Module
//!
//! The mapping module stores handler registrations and resolves a request
//! path to a handler through deterministic precedence rules.
//!
//! ## Overview
//!
//! The mapping table is responsible for:
//! - Parsing declared URL patterns into their four kinds
//!   (exact, path-prefix, extension, default)
//! - Resolving an incoming path to exactly one handler
//! - Splitting off `path_info` for prefix matches
//! - Enforcing the context-path mount for the whole table
//!
//! ## Precedence
//!
//! Resolution evaluates the rules in order; the first hit wins:
//!
//! 1. **Exact** - a registration whose pattern equals the path verbatim.
//! 2. **Longest prefix** - among `/*`-suffixed patterns whose prefix is a
//!    path-segment-aligned prefix of the path, the longest prefix wins.
//! 3. **Extension** - among `*.ext` patterns whose extension equals the
//!    suffix of the last path segment after its final `.`, the first
//!    registered wins.
//! 4. **Default** - the registration for pattern `/`, if present.
//!
//! If no rule matches the result is no-match, surfaced by the dispatcher
//! as a 404-equivalent.
//!
//! ## Example
//!
//! ```rust
//! use hostlet::mapping::{MappingTable, UrlPattern};
//!
//! let table = MappingTable::build(
//!     "",
//!     &[
//!         ("files".to_string(), UrlPattern::parse("/files/*").unwrap()),
//!         ("index".to_string(), UrlPattern::parse("/").unwrap()),
//!     ],
//! )
//! .unwrap();
//!
//! let hit = table.resolve("/files/reports/q3.txt").unwrap();
//! assert_eq!(hit.handler, "files");
//! assert_eq!(hit.path_info.as_deref(), Some("/reports/q3.txt"));
//! ```

mod core;

pub use core::{MappingTable, Resolution, UrlPattern};
