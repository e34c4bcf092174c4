//! Loading and saving the persisted user file.
//!
//! The file is an array of user records (field names as serialized by the
//! user module); the format is selected by extension, `.json` for JSON and
//! `.yaml`/`.yml` for YAML.

use std::path::Path;

use super::errors::AclError;
use super::user::User;

/// How `ACL LOAD` folds loaded users into users already in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Union the permission lists and credentials of same-named users.
    Merge,
    /// Overwrite same-named users field by field.
    Replace,
}

impl LoadMode {
    /// Parse a MERGE/REPLACE token, case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("merge") {
            Some(LoadMode::Merge)
        } else if token.eq_ignore_ascii_case("replace") {
            Some(LoadMode::Replace)
        } else {
            None
        }
    }
}

/// Deserialize the user array at `path`.
pub fn load_users(path: &Path) -> crate::Result<Vec<User>> {
    let raw = std::fs::read_to_string(path).map_err(|e| persistence_error(path, e))?;

    let users = match extension(path) {
        Extension::Json => {
            serde_json::from_str(&raw).map_err(|e| persistence_error(path, e))?
        }
        Extension::Yaml => {
            serde_yaml::from_str(&raw).map_err(|e| persistence_error(path, e))?
        }
        Extension::Other => return Err(unsupported(path)),
    };

    Ok(users)
}

/// Serialize `users` to `path`.
pub fn save_users(path: &Path, users: &[User]) -> crate::Result<()> {
    let out = match extension(path) {
        Extension::Json => {
            serde_json::to_string_pretty(users).map_err(|e| persistence_error(path, e))?
        }
        Extension::Yaml => serde_yaml::to_string(users).map_err(|e| persistence_error(path, e))?,
        Extension::Other => return Err(unsupported(path)),
    };

    std::fs::write(path, out).map_err(|e| persistence_error(path, e))?;
    Ok(())
}

enum Extension {
    Json,
    Yaml,
    Other,
}

fn extension(path: &Path) -> Extension {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Extension::Json,
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            Extension::Yaml
        }
        _ => Extension::Other,
    }
}

fn persistence_error(path: &Path, err: impl std::fmt::Display) -> crate::Error {
    AclError::Persistence {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
    .into()
}

fn unsupported(path: &Path) -> crate::Error {
    AclError::Persistence {
        path: path.display().to_string(),
        reason: "unsupported file extension, expected .json, .yaml, or .yml".to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_users() -> Vec<User> {
        let mut alice = User::new("alice");
        alice
            .apply_rules(
                &[">pw", "+@read", "+get", "%RW~app:*", "+&events"]
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>(),
            )
            .unwrap();

        let mut bob = User::new("bob");
        bob.apply_rules(
            &["off", "nopass"]
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>(),
        )
        .unwrap();

        vec![alice, bob]
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        let users = sample_users();

        save_users(&path, &users).unwrap();
        let loaded = load_users(&path).unwrap();
        assert_eq!(loaded, users);
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.yml");
        let users = sample_users();

        save_users(&path, &users).unwrap();
        let loaded = load_users(&path).unwrap();
        assert_eq!(loaded, users);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.toml");

        let err = save_users(&path, &sample_users()).unwrap_err();
        assert!(err.is_persistence_error());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "this is not json").unwrap();

        let err = load_users(&path).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Acl(AclError::Persistence { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_users(Path::new("/nonexistent/users.json")).unwrap_err();
        assert!(err.is_persistence_error());
    }

    #[test]
    fn test_load_mode_parse() {
        assert_eq!(LoadMode::parse("MERGE"), Some(LoadMode::Merge));
        assert_eq!(LoadMode::parse("replace"), Some(LoadMode::Replace));
        assert_eq!(LoadMode::parse("upsert"), None);
    }
}
