//! The access-control registry.
//!
//! `Acl` owns the full user set and the connection session table and is the
//! entry point for every access-control operation: connection registration,
//! authentication, user mutation, and load/save. One `RwLock` serializes
//! mutations; read-only introspection takes the shared side. Every operation
//! under the lock is bounded CPU work, so no lock is ever held across an
//! await point.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::oneshot;

use super::errors::AclError;
use super::persistence::{self, LoadMode};
use super::session::{ConnId, Session};
use super::user::{Credential, DEFAULT_USERNAME, User, sha256_hex};
use crate::config::ServerConfig;

#[derive(Debug, Default)]
pub(super) struct AclState {
    pub(super) users: Vec<User>,
    pub(super) sessions: HashMap<ConnId, Session>,
}

/// The access-control registry.
#[derive(Debug)]
pub struct Acl {
    pub(super) state: RwLock<AclState>,
    pub(super) config: ServerConfig,
    next_conn: AtomicU64,
}

impl Acl {
    /// Build the registry from process configuration.
    ///
    /// The built-in `default` user is created first; when a password is
    /// globally required its credential set is populated from
    /// `config.password`. A configured user file then replaces the user
    /// list wholesale, except that the built-in default is prepended when
    /// the file does not define one. A malformed file is an error here, and
    /// the caller treats it as fatal: the server cannot run without a valid
    /// initial permission set.
    pub fn new(config: ServerConfig) -> crate::Result<Self> {
        let mut default_user = User::new(DEFAULT_USERNAME);
        if config.require_pass {
            default_user.no_password = false;
            default_user
                .credentials
                .push(Credential::plaintext(&config.password));
        }

        let mut users = match &config.acl_file {
            Some(path) if path.exists() => {
                let loaded = persistence::load_users(path)?;
                tracing::info!(
                    "loaded {} user(s) from {}",
                    loaded.len(),
                    path.display()
                );
                loaded
            }
            _ => Vec::new(),
        };

        if !users.iter().any(|u| u.username == DEFAULT_USERNAME) {
            users.insert(0, default_user);
        }

        for user in &mut users {
            user.normalize();
        }

        Ok(Self {
            state: RwLock::new(AclState {
                users,
                sessions: HashMap::new(),
            }),
            config,
            next_conn: AtomicU64::new(1),
        })
    }

    /// Register a newly established connection.
    ///
    /// The session starts bound to the current `default` user and is
    /// authenticated iff that user has the no-password flag. The returned
    /// receiver fires if the registry forcibly invalidates the session; the
    /// connection read loop must observe it at every blocking wait.
    pub fn register_connection(&self) -> (ConnId, oneshot::Receiver<()>) {
        let conn = ConnId::from_raw(self.next_conn.fetch_add(1, Ordering::Relaxed));

        let mut state = self.state.write().unwrap();
        let no_password = state
            .users
            .iter()
            .find(|u| u.username == DEFAULT_USERNAME)
            .expect("registry always contains the default user")
            .no_password;

        let (session, cancel_rx) = Session::new(DEFAULT_USERNAME, no_password);
        state.sessions.insert(conn, session);
        tracing::debug!("{conn} registered, authenticated={no_password}");

        (conn, cancel_rx)
    }

    /// Drop the session of a closing connection.
    pub fn unregister_connection(&self, conn: ConnId) {
        self.state.write().unwrap().sessions.remove(&conn);
        tracing::debug!("{conn} unregistered");
    }

    /// Authenticate a connection with `AUTH [username] password`.
    ///
    /// Both representations of the supplied password are computed; the
    /// target user must be enabled and either carry the no-password flag or
    /// hold a credential matching one of the representations. On success the
    /// session is rebound to the target user. Repeated successful calls
    /// simply rebind; prior session state never makes this fail.
    pub fn authenticate(
        &self,
        conn: ConnId,
        username: Option<&str>,
        password: &str,
    ) -> crate::Result<()> {
        let target = username.unwrap_or(DEFAULT_USERNAME);

        let mut state = self.state.write().unwrap();

        let user = state
            .users
            .iter()
            .find(|u| u.username == target)
            .ok_or_else(|| AclError::UserNotFound {
                username: target.to_string(),
            })?;

        if !user.enabled {
            return Err(AclError::UserDisabled {
                username: user.username.clone(),
            }
            .into());
        }

        let candidates = [
            Credential::plaintext(password),
            Credential::sha256(sha256_hex(password)),
        ];
        let matched = user.no_password
            || user
                .credentials
                .iter()
                .any(|stored| candidates.iter().any(|c| stored == c));
        let bound = user.username.clone();

        if !matched {
            tracing::warn!("{conn} failed authentication for user {bound}");
            return Err(AclError::AuthenticationFailed.into());
        }

        let session = state
            .sessions
            .get_mut(&conn)
            .ok_or(AclError::NotAuthenticated)?;
        session.bind(bound.clone());
        tracing::info!("{conn} authenticated as {bound}");
        Ok(())
    }

    /// Create or mutate a user from a SETUSER token stream.
    ///
    /// `tokens[0]` is the username, the rest the rule stream. Mutation works
    /// on a copy that is committed only when every token applied, so readers
    /// never observe a half-applied rule stream.
    pub fn set_user(&self, tokens: &[String]) -> crate::Result<()> {
        let (username, rules) = tokens.split_first().ok_or(AclError::InvalidRule {
            token: String::new(),
        })?;

        let mut state = self.state.write().unwrap();

        if let Some(idx) = state.users.iter().position(|u| &u.username == username) {
            let mut updated = state.users[idx].clone();
            updated.apply_rules(rules)?;
            updated.normalize();
            state.users[idx] = updated;
            tracing::info!("updated user {username}");
        } else {
            let mut user = User::new(username.clone());
            user.apply_rules(rules)?;
            user.normalize();
            state.users.push(user);
            tracing::info!("created user {username}");
        }
        Ok(())
    }

    /// Delete users and forcibly invalidate their live sessions.
    ///
    /// The `default` user and unknown usernames are silently skipped.
    pub fn delete_users(&self, usernames: &[String]) {
        let mut state = self.state.write().unwrap();

        for username in usernames {
            if username == DEFAULT_USERNAME {
                tracing::debug!("skipping deletion of the default user");
                continue;
            }

            let Some(idx) = state.users.iter().position(|u| &u.username == username) else {
                continue;
            };

            let mut cancelled = 0usize;
            for session in state.sessions.values_mut() {
                if &session.username == username {
                    session.cancel();
                    cancelled += 1;
                }
            }

            state.users.remove(idx);
            tracing::info!("deleted user {username}, cancelled {cancelled} session(s)");
        }
    }

    /// Look up a user by name, as a snapshot.
    pub fn lookup_user(&self, username: &str) -> Option<User> {
        self.state
            .read()
            .unwrap()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
    }

    /// Usernames currently in the registry, in registry order.
    pub fn usernames(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap()
            .users
            .iter()
            .map(|u| u.username.clone())
            .collect()
    }

    /// Snapshot of the full user set.
    pub fn users_snapshot(&self) -> Vec<User> {
        self.state.read().unwrap().users.clone()
    }

    /// Authentication state and bound username of a connection.
    pub fn session_info(&self, conn: ConnId) -> Option<(bool, String)> {
        self.state
            .read()
            .unwrap()
            .sessions
            .get(&conn)
            .map(|s| (s.authenticated, s.username.clone()))
    }

    /// Reload users from the configured file.
    ///
    /// Loaded users that share a username with an in-memory user are merged
    /// into it or replace it depending on `mode`; new usernames are
    /// appended. Parse failures here are recoverable and reported to the
    /// caller.
    pub fn load(&self, mode: LoadMode) -> crate::Result<usize> {
        let path = self.require_acl_file()?;
        let loaded = persistence::load_users(&path)?;
        let count = loaded.len();

        let mut state = self.state.write().unwrap();
        for mut user in loaded {
            user.normalize();
            if let Some(existing) = state
                .users
                .iter_mut()
                .find(|u| u.username == user.username)
            {
                match mode {
                    LoadMode::Merge => existing.merge(&user),
                    LoadMode::Replace => existing.replace(&user),
                }
            } else {
                state.users.push(user);
            }
        }

        tracing::info!("applied {count} user(s) from file in {mode:?} mode");
        Ok(count)
    }

    /// Serialize the current user set to the configured file.
    pub fn save(&self) -> crate::Result<()> {
        let path = self.require_acl_file()?;
        let users = self.users_snapshot();
        persistence::save_users(&path, &users)?;
        tracing::info!("saved {} user(s) to {}", users.len(), path.display());
        Ok(())
    }

    /// Whether the server configuration requires authentication.
    pub fn requires_password(&self) -> bool {
        self.config.require_pass
    }

    fn require_acl_file(&self) -> Result<std::path::PathBuf, AclError> {
        self.config
            .acl_file
            .clone()
            .ok_or_else(|| AclError::Persistence {
                path: "(unset)".to_string(),
                reason: "no ACL config file configured".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_config() -> ServerConfig {
        ServerConfig::default()
    }

    fn password_config(password: &str) -> ServerConfig {
        ServerConfig {
            require_pass: true,
            password: password.to_string(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_default_user_always_present() {
        let acl = Acl::new(open_config()).unwrap();
        assert!(acl.lookup_user(DEFAULT_USERNAME).is_some());

        let acl = Acl::new(password_config("secret")).unwrap();
        let default = acl.lookup_user(DEFAULT_USERNAME).unwrap();
        assert_eq!(default.credentials, vec![Credential::plaintext("secret")]);
    }

    #[test]
    fn test_fresh_session_authenticated_iff_nopass() {
        let acl = Acl::new(open_config()).unwrap();
        let (conn, _cancel) = acl.register_connection();
        let (authenticated, username) = acl.session_info(conn).unwrap();
        assert!(!authenticated);
        assert_eq!(username, DEFAULT_USERNAME);

        acl.set_user(&["default".to_string(), "nopass".to_string()])
            .unwrap();
        let (conn, _cancel) = acl.register_connection();
        let (authenticated, _) = acl.session_info(conn).unwrap();
        assert!(authenticated);
    }

    #[test]
    fn test_authenticate_default_user() {
        let acl = Acl::new(password_config("secret")).unwrap();
        let (conn, _cancel) = acl.register_connection();

        let err = acl.authenticate(conn, None, "wrong").unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Acl(AclError::AuthenticationFailed)
        ));
        assert!(!acl.session_info(conn).unwrap().0);

        acl.authenticate(conn, None, "secret").unwrap();
        assert!(acl.session_info(conn).unwrap().0);

        // Repeated AUTH simply rebinds.
        acl.authenticate(conn, None, "secret").unwrap();
    }

    #[test]
    fn test_authenticate_named_user_with_digest() {
        let acl = Acl::new(open_config()).unwrap();
        acl.set_user(&[
            "alice".to_string(),
            format!("#{}", sha256_hex("pw")).to_uppercase(),
        ])
        .unwrap();

        let (conn, _cancel) = acl.register_connection();
        acl.authenticate(conn, Some("alice"), "pw").unwrap();
        let (authenticated, username) = acl.session_info(conn).unwrap();
        assert!(authenticated);
        assert_eq!(username, "alice");
    }

    #[test]
    fn test_authenticate_unknown_and_disabled() {
        let acl = Acl::new(open_config()).unwrap();
        let (conn, _cancel) = acl.register_connection();

        let err = acl.authenticate(conn, Some("ghost"), "pw").unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Acl(AclError::UserNotFound { .. })
        ));

        acl.set_user(&["bob".to_string(), "off".to_string(), ">pw".to_string()])
            .unwrap();
        let err = acl.authenticate(conn, Some("bob"), "pw").unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Acl(AclError::UserDisabled { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_user_cancels_sessions() {
        let acl = Acl::new(open_config()).unwrap();
        acl.set_user(&["alice".to_string(), ">pw".to_string()])
            .unwrap();

        let (conn_a, cancel_a) = acl.register_connection();
        let (conn_b, cancel_b) = acl.register_connection();
        let (_conn_c, mut cancel_c) = acl.register_connection();
        acl.authenticate(conn_a, Some("alice"), "pw").unwrap();
        acl.authenticate(conn_b, Some("alice"), "pw").unwrap();

        acl.delete_users(&["alice".to_string()]);

        assert!(acl.lookup_user("alice").is_none());
        // Both of alice's connections observe the cancellation immediately.
        cancel_a.await.unwrap();
        cancel_b.await.unwrap();
        // The unrelated connection stays live.
        assert!(cancel_c.try_recv().is_err());
    }

    #[test]
    fn test_delete_default_is_noop() {
        let acl = Acl::new(open_config()).unwrap();
        let (conn, mut cancel) = acl.register_connection();

        acl.delete_users(&[DEFAULT_USERNAME.to_string(), "ghost".to_string()]);

        assert!(acl.lookup_user(DEFAULT_USERNAME).is_some());
        assert!(acl.session_info(conn).is_some());
        assert!(cancel.try_recv().is_err());
    }

    #[test]
    fn test_set_user_partial_failure_leaves_user_untouched() {
        let acl = Acl::new(open_config()).unwrap();
        acl.set_user(&["alice".to_string(), "+@read".to_string()])
            .unwrap();

        let err = acl.set_user(&[
            "alice".to_string(),
            "+@write".to_string(),
            "bogus-token".to_string(),
        ]);
        assert!(err.is_err());

        let alice = acl.lookup_user("alice").unwrap();
        assert_eq!(alice.included_categories, vec!["read"]);
    }
}
