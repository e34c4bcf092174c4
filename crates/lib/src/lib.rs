//!
//! Emberstore: a Redis-style in-memory data server with a real access-control engine.
//! This library provides the core components the `emberstore` binary is assembled from.
//!
//! ## Core Concepts
//!
//! * **Store (`store::Store`)**: The in-memory keyspace holding strings, numbers, and lists.
//! * **Wire (`wire`)**: The length-prefixed line codec used for requests and replies.
//! * **Commands (`commands::CommandTable`)**: The dispatch table. Every command declares its
//!   capability categories and a key-extraction function; the ACL engine consumes commands
//!   only through that declaration.
//! * **ACL (`acl::Acl`)**: The access-control registry. It owns the user set and the
//!   connection session table, authenticates `AUTH` calls, and runs the authorization
//!   decision for every incoming command before it executes.
//! * **Server (`server::Server`)**: The TCP listener and per-connection read loop tying the
//!   pieces together.

pub mod acl;
pub mod commands;
pub mod config;
pub mod pubsub;
pub mod server;
pub mod store;
pub mod wire;

/// Re-export the registry entry point for easier access.
pub use acl::Acl;
pub use config::ServerConfig;
pub use server::Server;

/// Result type used throughout the emberstore library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the emberstore library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Structured access-control errors from the acl module
    #[error(transparent)]
    Acl(acl::AclError),

    /// Structured dispatch errors from the commands module
    #[error(transparent)]
    Command(commands::CommandError),

    /// Structured data-store errors from the store module
    #[error(transparent)]
    Store(store::StoreError),

    /// Structured codec errors from the wire module
    #[error(transparent)]
    Wire(wire::WireError),

    /// Structured listener errors from the server module
    #[error(transparent)]
    Server(server::ServerError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Acl(_) => "acl",
            Error::Command(_) => "commands",
            Error::Store(_) => "store",
            Error::Wire(_) => "wire",
            Error::Server(_) => "server",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
        }
    }

    /// Check if this error indicates a failed or missing authentication.
    pub fn is_authentication_error(&self) -> bool {
        match self {
            Error::Acl(acl_err) => acl_err.is_authentication_error(),
            _ => false,
        }
    }

    /// Check if this error indicates an authorization denial.
    pub fn is_authorization_error(&self) -> bool {
        match self {
            Error::Acl(acl_err) => acl_err.is_authorization_error(),
            _ => false,
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Acl(acl_err) => acl_err.is_not_found(),
            Error::Command(cmd_err) => cmd_err.is_unknown_command(),
            Error::Store(store_err) => store_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is persistence-related (user file load/save).
    pub fn is_persistence_error(&self) -> bool {
        match self {
            Error::Acl(acl_err) => acl_err.is_persistence_error(),
            Error::Io(_) | Error::Json(_) | Error::Yaml(_) => true,
            _ => false,
        }
    }
}
