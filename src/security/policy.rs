use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::mapping::UrlPattern;

use super::{AuthMode, Credentials, Identity, InvalidCredentials, UserStore};

/// A named rule binding URL patterns to the roles permitted to access them.
///
/// Constraints are restricted to exact and prefix pattern forms; the
/// restriction is enforced when configuration is validated.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub name: String,
    pub patterns: Vec<UrlPattern>,
    pub roles: HashSet<String>,
}

impl Constraint {
    fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}

/// Decides whether a request requires authorization and whether a given
/// identity may proceed.
///
/// Built once at application start from the configured constraints,
/// authentication mode, and user store; shared read-only afterwards.
/// Paths are matched in their context-relative form, with the same
/// exact/prefix rules the mapping table uses.
#[derive(Clone)]
pub struct SecurityPolicy {
    mode: AuthMode,
    constraints: Vec<Constraint>,
    users: Arc<dyn UserStore>,
}

impl SecurityPolicy {
    pub fn new(mode: AuthMode, constraints: Vec<Constraint>, users: Arc<dyn UserStore>) -> Self {
        for constraint in &constraints {
            if constraint.roles.is_empty() {
                warn!(
                    constraint = %constraint.name,
                    "Security constraint declares no roles; any authenticated identity will be permitted"
                );
            }
        }
        info!(
            mode = ?ModeName(&mode),
            constraints = constraints.len(),
            "Security policy loaded"
        );
        Self {
            mode,
            constraints,
            users,
        }
    }

    #[must_use]
    pub fn mode(&self) -> &AuthMode {
        &self.mode
    }

    /// True iff the path matches any constraint's pattern set.
    ///
    /// Always false when no authentication mode is configured.
    #[must_use]
    pub fn requires_authorization(&self, path: &str) -> bool {
        if matches!(self.mode, AuthMode::None) {
            return false;
        }
        self.constraints.iter().any(|c| c.matches(path))
    }

    /// Union of authorized roles across all constraints matching the path.
    ///
    /// An empty set means the matching constraints state no role
    /// restriction; authentication alone suffices.
    #[must_use]
    pub fn permitted_roles(&self, path: &str) -> HashSet<String> {
        let mut roles = HashSet::new();
        for constraint in &self.constraints {
            if constraint.matches(path) {
                roles.extend(constraint.roles.iter().cloned());
            }
        }
        roles
    }

    /// Validate submitted credentials against the user store.
    pub fn authenticate(&self, credentials: &Credentials) -> Result<Identity, InvalidCredentials> {
        match self.users.authenticate(credentials) {
            Some(identity) => {
                debug!(username = %identity.username, roles = ?identity.roles, "Credentials accepted");
                Ok(identity)
            }
            None => {
                debug!(username = %credentials.username, "Credentials rejected");
                Err(InvalidCredentials)
            }
        }
    }

    /// Whether an authenticated identity may access the path.
    ///
    /// Permitted when the union of matching role sets is empty (no stated
    /// restriction) or intersects the identity's roles.
    #[must_use]
    pub fn permits(&self, identity: &Identity, path: &str) -> bool {
        let permitted = self.permitted_roles(path);
        permitted.is_empty() || permitted.iter().any(|r| identity.is_in_role(r))
    }
}

/// Compact mode label for startup logging; keeps realm and paths out of
/// the log line.
struct ModeName<'a>(&'a AuthMode);

impl std::fmt::Debug for ModeName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            AuthMode::None => write!(f, "none"),
            AuthMode::Challenge { .. } => write!(f, "challenge"),
            AuthMode::FormRedirect { .. } => write!(f, "form-redirect"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::InMemoryUserStore;

    fn policy(mode: AuthMode, constraints: Vec<Constraint>) -> SecurityPolicy {
        let users = InMemoryUserStore::default()
            .with_user("me", "secret", ["supervisor"])
            .with_user("peon", "secret", ["staff"]);
        SecurityPolicy::new(mode, constraints, Arc::new(users))
    }

    fn constraint(name: &str, patterns: &[&str], roles: &[&str]) -> Constraint {
        Constraint {
            name: name.to_string(),
            patterns: patterns
                .iter()
                .map(|p| UrlPattern::parse(p).unwrap())
                .collect(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn no_mode_never_requires_authorization() {
        let p = policy(
            AuthMode::None,
            vec![constraint("secure", &["/secret"], &["supervisor"])],
        );
        assert!(!p.requires_authorization("/secret"));
    }

    #[test]
    fn matching_constraint_requires_authorization() {
        let p = policy(
            AuthMode::Challenge {
                realm: "r".to_string(),
            },
            vec![constraint("secure", &["/secret", "/admin/*"], &["supervisor"])],
        );
        assert!(p.requires_authorization("/secret"));
        assert!(p.requires_authorization("/admin/settings"));
        assert!(!p.requires_authorization("/open"));
    }

    #[test]
    fn permitted_roles_is_the_union_of_matching_constraints() {
        let p = policy(
            AuthMode::Challenge {
                realm: "r".to_string(),
            },
            vec![
                constraint("one", &["/both/*"], &["alpha"]),
                constraint("two", &["/both/here"], &["beta"]),
            ],
        );
        let roles = p.permitted_roles("/both/here");
        assert!(roles.contains("alpha") && roles.contains("beta"));
        assert_eq!(
            p.permitted_roles("/both/other"),
            HashSet::from(["alpha".to_string()])
        );
    }

    #[test]
    fn empty_role_union_permits_any_identity() {
        let p = policy(
            AuthMode::Challenge {
                realm: "r".to_string(),
            },
            vec![constraint("open-but-authenticated", &["/members/*"], &[])],
        );
        let id = Identity::new("someone", ["unrelated"]);
        assert!(p.requires_authorization("/members/area"));
        assert!(p.permits(&id, "/members/area"));
    }

    #[test]
    fn authenticate_checks_the_user_store() {
        let p = policy(
            AuthMode::Challenge {
                realm: "r".to_string(),
            },
            Vec::new(),
        );
        let id = p.authenticate(&Credentials::new("me", "secret")).unwrap();
        assert!(id.is_in_role("supervisor"));
        assert!(p.authenticate(&Credentials::new("me", "wrong")).is_err());
    }

    #[test]
    fn permits_requires_role_intersection() {
        let p = policy(
            AuthMode::Challenge {
                realm: "r".to_string(),
            },
            vec![constraint("secure", &["/secret"], &["supervisor"])],
        );
        assert!(p.permits(&Identity::new("me", ["supervisor", "agent"]), "/secret"));
        assert!(!p.permits(&Identity::new("peon", ["staff"]), "/secret"));
    }
}
