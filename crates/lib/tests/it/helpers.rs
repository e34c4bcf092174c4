use std::path::{Path, PathBuf};

use emberstore::acl::{User, save_users};
use emberstore::{Acl, ServerConfig};

/// Configuration with no password requirement and no user file.
pub fn open_config() -> ServerConfig {
    ServerConfig::default()
}

/// Configuration that requires AUTH with the given default password.
pub fn password_config(password: &str) -> ServerConfig {
    ServerConfig {
        require_pass: true,
        password: password.to_string(),
        ..ServerConfig::default()
    }
}

/// Owned token vector from string literals.
pub fn tokens(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

/// Build a user from a SETUSER rule stream.
pub fn user_from_rules(username: &str, rules: &[&str]) -> User {
    let mut user = User::new(username);
    user.apply_rules(&tokens(rules)).unwrap();
    user.normalize();
    user
}

/// Write a user array to `<dir>/users.json` and return the path.
pub fn write_user_file(dir: &Path, users: &[User]) -> PathBuf {
    let path = dir.join("users.json");
    save_users(&path, users).unwrap();
    path
}

/// Registry wired to a user file in a fresh temp dir.
pub fn acl_with_user_file(users: &[User]) -> (Acl, tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_user_file(dir.path(), users);
    let config = ServerConfig {
        acl_file: Some(path.clone()),
        ..ServerConfig::default()
    };
    (Acl::new(config).unwrap(), dir, path)
}
