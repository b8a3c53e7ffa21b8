use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::config::ConfigError;

/// A declarative URL pattern, one of the four supported kinds.
///
/// Patterns are case-sensitive strings. A handler may own multiple
/// patterns of mixed kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UrlPattern {
    /// Matches the path verbatim (`/admin/settings`)
    Exact(String),
    /// Declared with a trailing `/*`; stored without it. Matches the
    /// prefix itself and anything below it on a segment boundary.
    Prefix(String),
    /// Declared as `*.ext`; matches when the last path segment ends in
    /// `.ext`.
    Extension(String),
    /// Declared as `/`; matches anything nothing else claimed.
    Default,
}

impl UrlPattern {
    /// Parse a declared pattern string into its kind.
    ///
    /// Returns a [`ConfigError::InvalidPattern`] for anything that is not
    /// an absolute exact path, a `/*`-suffixed prefix, a `*.ext`
    /// extension form, or the bare default `/`.
    pub fn parse(raw: &str) -> Result<UrlPattern, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidPattern {
            pattern: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw == "/" {
            return Ok(UrlPattern::Default);
        }
        if let Some(ext) = raw.strip_prefix("*.") {
            if ext.is_empty() {
                return Err(invalid("extension pattern needs a suffix after '*.'"));
            }
            if ext.contains('/') || ext.contains('.') {
                return Err(invalid("extension suffix may not contain '/' or '.'"));
            }
            return Ok(UrlPattern::Extension(ext.to_string()));
        }
        if !raw.starts_with('/') {
            return Err(invalid("pattern must start with '/' or '*.'"));
        }
        if let Some(prefix) = raw.strip_suffix("/*") {
            // "/*" yields the empty prefix, which matches every path.
            return Ok(UrlPattern::Prefix(prefix.to_string()));
        }
        if raw.contains('*') {
            return Err(invalid("'*' is only allowed as '/*' suffix or '*.' prefix"));
        }
        Ok(UrlPattern::Exact(raw.to_string()))
    }

    /// Whether this pattern matches the given context-relative path.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            UrlPattern::Exact(p) => p == path,
            UrlPattern::Prefix(prefix) => {
                path == prefix || path.strip_prefix(prefix.as_str()).is_some_and(|r| r.starts_with('/'))
            }
            UrlPattern::Extension(ext) => last_segment_extension(path) == Some(ext.as_str()),
            UrlPattern::Default => true,
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlPattern::Exact(p) => write!(f, "{}", p),
            UrlPattern::Prefix(p) => write!(f, "{}/*", p),
            UrlPattern::Extension(e) => write!(f, "*.{}", e),
            UrlPattern::Default => write!(f, "/"),
        }
    }
}

fn last_segment_extension(path: &str) -> Option<&str> {
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rfind('.') {
        Some(idx) if idx + 1 < segment.len() => Some(&segment[idx + 1..]),
        _ => None,
    }
}

/// Result of successfully resolving a path against the mapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Name of the handler registration that won
    pub handler: String,
    /// The pattern that matched
    pub pattern: UrlPattern,
    /// Remainder of the path beyond the matched prefix, for prefix
    /// matches with a non-empty remainder; `None` otherwise.
    pub path_info: Option<String>,
    /// The context path the table is mounted under (`""` for the root)
    pub context_path: String,
}

/// Resolves request paths to handler names via precedence rules.
///
/// Built once from configuration at application start and shared
/// read-only afterwards. The whole table may be mounted under a context
/// path; paths outside the mount do not resolve.
#[derive(Debug, Clone)]
pub struct MappingTable {
    context_path: String,
    exact: HashMap<String, String>,
    /// (prefix, handler), sorted by descending prefix length
    prefixes: Vec<(String, String)>,
    /// (extension, handler), in declaration order
    extensions: Vec<(String, String)>,
    default: Option<String>,
}

impl MappingTable {
    /// Build a table from `(handler, pattern)` pairs in declaration order.
    ///
    /// Duplicate patterns of any kind are a configuration error: exactly
    /// one matching rule must win per request, so a valid configuration
    /// never claims the same pattern twice.
    pub fn build(
        context_path: &str,
        registrations: &[(String, UrlPattern)],
    ) -> Result<Self, ConfigError> {
        let context_path = normalize_context(context_path);

        let mut exact = HashMap::new();
        let mut prefixes: Vec<(String, String)> = Vec::new();
        let mut extensions: Vec<(String, String)> = Vec::new();
        let mut default = None;

        for (handler, pattern) in registrations {
            let duplicate = || ConfigError::DuplicatePattern {
                pattern: pattern.to_string(),
            };
            match pattern {
                UrlPattern::Exact(p) => {
                    if exact.insert(p.clone(), handler.clone()).is_some() {
                        return Err(duplicate());
                    }
                }
                UrlPattern::Prefix(p) => {
                    if prefixes.iter().any(|(existing, _)| existing == p) {
                        return Err(duplicate());
                    }
                    prefixes.push((p.clone(), handler.clone()));
                }
                UrlPattern::Extension(e) => {
                    // duplicates are allowed here; the first registered wins
                    extensions.push((e.clone(), handler.clone()));
                }
                UrlPattern::Default => {
                    if default.replace(handler.clone()).is_some() {
                        return Err(duplicate());
                    }
                }
            }
        }

        // Longest prefix must win; ties cannot occur past the duplicate check.
        prefixes.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));

        info!(
            context_path = %context_path,
            exact = exact.len(),
            prefixes = prefixes.len(),
            extensions = extensions.len(),
            has_default = default.is_some(),
            "Mapping table loaded"
        );

        Ok(Self {
            context_path,
            exact,
            prefixes,
            extensions,
            default,
        })
    }

    /// The context path the table is mounted under; `""` for the root.
    #[must_use]
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Strip the context path from a full request path.
    ///
    /// Returns `None` when the path lies outside the mount. A request for
    /// the mount point itself maps to `/`.
    #[must_use]
    pub fn relative<'a>(&self, full_path: &'a str) -> Option<&'a str> {
        if self.context_path.is_empty() {
            return Some(full_path);
        }
        let rest = full_path.strip_prefix(self.context_path.as_str())?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    /// Resolve a full request path to a handler.
    ///
    /// Applies the context mount, then the four precedence rules in
    /// order. Returns `None` when the path is outside the mount or no
    /// rule matches.
    #[must_use]
    pub fn resolve(&self, full_path: &str) -> Option<Resolution> {
        let Some(path) = self.relative(full_path) else {
            warn!(path = %full_path, context_path = %self.context_path, "Path outside context mount");
            return None;
        };

        let hit = self.resolve_relative(path);
        match &hit {
            Some(resolution) => debug!(
                path = %path,
                handler = %resolution.handler,
                pattern = %resolution.pattern,
                path_info = ?resolution.path_info,
                "Mapping resolved"
            ),
            None => warn!(path = %path, "No mapping matched"),
        }
        hit
    }

    /// Resolve a context-relative path, bypassing the mount check.
    #[must_use]
    pub fn resolve_relative(&self, path: &str) -> Option<Resolution> {
        if let Some(handler) = self.exact.get(path) {
            return Some(self.hit(handler, UrlPattern::Exact(path.to_string()), None));
        }

        // prefixes are sorted longest-first, so the first aligned hit wins
        for (prefix, handler) in &self.prefixes {
            let aligned = path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|r| r.starts_with('/'));
            if aligned {
                let remainder = &path[prefix.len()..];
                let path_info = if remainder.is_empty() {
                    None
                } else {
                    Some(remainder.to_string())
                };
                return Some(self.hit(handler, UrlPattern::Prefix(prefix.clone()), path_info));
            }
        }

        if let Some(ext) = last_segment_extension(path) {
            for (candidate, handler) in &self.extensions {
                if candidate == ext {
                    return Some(self.hit(handler, UrlPattern::Extension(candidate.clone()), None));
                }
            }
        }

        self.default
            .as_ref()
            .map(|handler| self.hit(handler, UrlPattern::Default, None))
    }

    fn hit(&self, handler: &str, pattern: UrlPattern, path_info: Option<String>) -> Resolution {
        Resolution {
            handler: handler.to_string(),
            pattern,
            path_info,
            context_path: self.context_path.clone(),
        }
    }
}

fn normalize_context(context_path: &str) -> String {
    let trimmed = context_path.trim_end_matches('/');
    trimmed.to_string()
}
