//! Process configuration for the emberstore server.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration consumed by the listener and the ACL registry.
///
/// The binary builds this from CLI flags and environment variables; tests
/// construct it directly. `acl_file` is optional: without it the server runs
/// with only the built-in `default` user and `ACL LOAD`/`ACL SAVE` report an
/// error instead of touching disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the TCP listener.
    pub host: String,

    /// Bind port. Port 0 asks the OS for a free port.
    pub port: u16,

    /// Whether connections must authenticate before running commands.
    pub require_pass: bool,

    /// Password for the built-in `default` user when `require_pass` is set.
    pub password: String,

    /// Path to the persisted user file (`.json`, `.yaml`, or `.yml`).
    pub acl_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            require_pass: false,
            password: String::new(),
            acl_file: None,
        }
    }
}
