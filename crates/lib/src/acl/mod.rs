//! The access-control engine.
//!
//! Authenticates network connections, maintains per-user permission sets
//! across the capability dimensions (categories, commands, keys, read-keys,
//! write-keys, pub/sub channels), and evaluates an authorization decision
//! for every incoming command before it executes. Users live in the
//! registry; sessions observe them by name and are forcibly invalidated
//! when their user is deleted.

pub mod commands;
mod errors;
mod persistence;
mod registry;
mod session;
mod user;

mod authorize;

pub use errors::AclError;
pub use persistence::{LoadMode, load_users, save_users};
pub use registry::Acl;
pub use session::{ConnId, Session};
pub use user::{Credential, CredentialKind, DEFAULT_USERNAME, User};
