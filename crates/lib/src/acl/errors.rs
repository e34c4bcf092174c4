//! Access-control error types.
//!
//! This module defines structured error types for authentication,
//! authorization, and user-persistence failures, providing better error
//! context and type safety compared to string-based errors.

use thiserror::Error as ThisError;

use crate::Error;

/// Errors that can occur during access-control operations.
///
/// The authorization variants mirror the dimensions of the decision
/// algorithm: categories, commands, keys, read-keys, write-keys, and
/// pub/sub channels each deny with their own variant so callers can tell
/// exactly which check failed.
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum AclError {
    /// AUTH named a user that does not exist.
    #[error("no user with username {username}")]
    UserNotFound {
        /// The username that was not found
        username: String,
    },

    /// The target user exists but is disabled.
    #[error("user {username} is disabled")]
    UserDisabled {
        /// The disabled user
        username: String,
    },

    /// No stored credential matched the supplied password.
    #[error("could not authenticate user")]
    AuthenticationFailed,

    /// A password is required and the session has not authenticated.
    #[error("user must be authenticated")]
    NotAuthenticated,

    /// A command category is missing from the user's included categories.
    #[error("not authorized to run @{category} commands")]
    CategoryNotIncluded {
        /// The category that was not included
        category: String,
    },

    /// A command category appears in the user's excluded categories.
    #[error("not authorized to run @{category} commands")]
    CategoryExcluded {
        /// The excluded category (`all` for a wildcard veto)
        category: String,
    },

    /// The command is missing from the user's included commands.
    #[error("not authorized to run {command} command")]
    CommandNotIncluded {
        /// The resolved command name
        command: String,
    },

    /// The command appears in the user's excluded commands.
    #[error("not authorized to run {command} command")]
    CommandExcluded {
        /// The resolved command name (`all` for a wildcard veto)
        command: String,
    },

    /// A touched key is missing from the user's general key list.
    #[error("not authorized to access key %RW~{key}")]
    KeyNotIncluded {
        /// The key that was not included
        key: String,
    },

    /// A touched key is missing from the user's read-key list.
    #[error("not authorized to access key %R~{key}")]
    ReadKeyNotIncluded {
        /// The key that was not included
        key: String,
    },

    /// A touched key is missing from the user's write-key list.
    #[error("not authorized to access key %W~{key}")]
    WriteKeyNotIncluded {
        /// The key that was not included
        key: String,
    },

    /// A pub/sub channel is not authorized for the user.
    #[error("not authorized to access pubsub channel &{channel}")]
    ChannelNotAuthorized {
        /// The channel name (`*` for a wildcard veto)
        channel: String,
    },

    /// A SETUSER rule token did not match the grammar.
    #[error("unknown rule token: {token}")]
    InvalidRule {
        /// The token that failed to parse
        token: String,
    },

    /// User-file load or save failed.
    #[error("persistence failure for {path}: {reason}")]
    Persistence {
        /// The file the operation targeted
        path: String,
        /// Description of the failure
        reason: String,
    },
}

impl AclError {
    /// Check if this error indicates a missing user.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AclError::UserNotFound { .. })
    }

    /// Check if this error came out of the authentication path.
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            AclError::UserNotFound { .. }
                | AclError::UserDisabled { .. }
                | AclError::AuthenticationFailed
                | AclError::NotAuthenticated
        )
    }

    /// Check if this error is an authorization denial.
    pub fn is_authorization_error(&self) -> bool {
        matches!(
            self,
            AclError::CategoryNotIncluded { .. }
                | AclError::CategoryExcluded { .. }
                | AclError::CommandNotIncluded { .. }
                | AclError::CommandExcluded { .. }
                | AclError::KeyNotIncluded { .. }
                | AclError::ReadKeyNotIncluded { .. }
                | AclError::WriteKeyNotIncluded { .. }
                | AclError::ChannelNotAuthorized { .. }
        )
    }

    /// Check if this error is a user-file load/save failure.
    pub fn is_persistence_error(&self) -> bool {
        matches!(self, AclError::Persistence { .. })
    }
}

// Conversion from AclError to the main Error type
impl From<AclError> for Error {
    fn from(err: AclError) -> Self {
        Error::Acl(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = AclError::UserNotFound {
            username: "ghost".to_string(),
        };
        assert!(err.is_not_found());
        assert!(err.is_authentication_error());
        assert!(!err.is_authorization_error());

        let err = AclError::CommandExcluded {
            command: "get".to_string(),
        };
        assert!(err.is_authorization_error());
        assert!(!err.is_authentication_error());

        let err = AclError::Persistence {
            path: "users.json".to_string(),
            reason: "parse".to_string(),
        };
        assert!(err.is_persistence_error());
    }

    #[test]
    fn test_error_conversion() {
        let acl_err = AclError::AuthenticationFailed;
        let err: Error = acl_err.into();
        assert!(err.is_authentication_error());
        assert_eq!(err.module(), "acl");
    }
}
