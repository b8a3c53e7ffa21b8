use std::collections::HashMap;

use super::{Credentials, Identity, UserStore};

/// User store backed by the configured user list.
///
/// Passwords are compared as plain strings; the engine simulates a
/// container and does not hash credentials, just as it does not speak
/// TLS.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: HashMap<String, (String, Vec<String>)>,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user; replaces any previous entry for the same username.
    pub fn add_user<R: Into<String>>(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        roles: impl IntoIterator<Item = R>,
    ) {
        self.users.insert(
            username.into(),
            (
                password.into(),
                roles.into_iter().map(Into::into).collect(),
            ),
        );
    }

    /// Builder-style [`add_user`](Self::add_user).
    #[must_use]
    pub fn with_user<R: Into<String>>(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        roles: impl IntoIterator<Item = R>,
    ) -> Self {
        self.add_user(username, password, roles);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserStore for InMemoryUserStore {
    fn authenticate(&self, credentials: &Credentials) -> Option<Identity> {
        let (password, roles) = self.users.get(&credentials.username)?;
        if password != &credentials.password {
            return None;
        }
        Some(Identity::new(&credentials.username, roles.iter().cloned()))
    }
}
