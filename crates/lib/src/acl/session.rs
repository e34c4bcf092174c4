//! Connection sessions.
//!
//! A session is the authentication state of one network connection. Sessions
//! are owned by the registry and keyed by an opaque per-connection handle
//! issued at registration, so nothing here depends on address stability of
//! the connection object itself.

use tokio::sync::oneshot;

/// Opaque per-connection handle.
///
/// Issued by the registry when a connection is registered; equality is
/// connection identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(u64);

impl ConnId {
    /// Build a handle from its raw value. Intended for tests and tooling;
    /// real handles come out of `Acl::register_connection`.
    pub fn from_raw(raw: u64) -> Self {
        ConnId(raw)
    }

    /// The raw value, for logging.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Authentication state bound to one connection.
///
/// The user reference is by name: the registry owns the users, sessions only
/// observe. The cancel side of a oneshot channel is armed at registration;
/// the registry fires it when the bound user is deleted, and the connection
/// read loop observes it at its next blocking wait.
#[derive(Debug)]
pub struct Session {
    /// Whether the connection has passed (or was exempted from) AUTH.
    pub authenticated: bool,

    /// Username of the bound user.
    pub username: String,

    /// Cancellation signal for forced invalidation. Consumed on delivery.
    pub(crate) cancel: Option<oneshot::Sender<()>>,
}

impl Session {
    /// Create a session bound to `username`.
    pub(crate) fn new(
        username: impl Into<String>,
        authenticated: bool,
    ) -> (Self, oneshot::Receiver<()>) {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        (
            Self {
                authenticated,
                username: username.into(),
                cancel: Some(cancel_tx),
            },
            cancel_rx,
        )
    }

    /// Rebind this session to another user and mark it authenticated.
    pub(crate) fn bind(&mut self, username: impl Into<String>) {
        self.username = username.into();
        self.authenticated = true;
    }

    /// Fire the cancellation signal, if it has not fired yet.
    pub(crate) fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            // The receiver may already be gone if the connection is mid-close.
            let _ = cancel.send(());
        }
    }
}
