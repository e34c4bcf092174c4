//! The authorization decision algorithm.
//!
//! Evaluated in a fixed order; the first failing step terminates evaluation.
//! Include and exclude lists are independent per dimension, and an exclude
//! match always vetoes regardless of any include match in the same
//! dimension. A `"*"` in an excluded list vetoes the whole dimension without
//! per-item comparison.

use super::Acl;
use super::errors::AclError;
use super::session::ConnId;
use crate::commands::{CommandSpec, SubCommandSpec, category};

impl Acl {
    /// Decide whether `conn` may run the given command invocation.
    ///
    /// The resolved command name is `command|subcommand` when a subcommand
    /// matched; categories are the union of both declarations, and the keys
    /// come from the subcommand's extractor when one is present.
    pub fn authorize(
        &self,
        conn: ConnId,
        args: &[String],
        command: &CommandSpec,
        subcommand: Option<&SubCommandSpec>,
    ) -> crate::Result<()> {
        let mut resolved = command.name.to_string();
        let mut categories: Vec<&str> = command.categories.to_vec();
        let mut keys = (command.key_extractor)(args)?;

        if let Some(sub) = subcommand {
            resolved = format!("{}|{}", command.name, sub.name);
            categories.extend_from_slice(sub.categories);
            keys = (sub.key_extractor)(args)?;
        }

        // Authentication must be reachable even when unauthenticated.
        if resolved.eq_ignore_ascii_case("auth") {
            return Ok(());
        }

        let state = self.state.read().unwrap();

        let session = state.sessions.get(&conn).ok_or(AclError::NotAuthenticated)?;
        if self.config.require_pass && !session.authenticated {
            return Err(AclError::NotAuthenticated.into());
        }

        // A session whose user was just deleted is as good as unauthenticated;
        // its cancellation signal is already in flight.
        let user = state
            .users
            .iter()
            .find(|u| u.username == session.username)
            .ok_or(AclError::NotAuthenticated)?;

        // Pub/sub is checked only against the channel lists; the remaining
        // dimensions do not apply to it.
        if categories.contains(&category::PUBSUB) {
            let channels = &keys;

            if !has_wildcard(&user.included_pub_sub_channels) {
                for channel in channels {
                    if !user.included_pub_sub_channels.contains(channel) {
                        return Err(AclError::ChannelNotAuthorized {
                            channel: channel.clone(),
                        }
                        .into());
                    }
                }
            }

            if has_wildcard(&user.excluded_pub_sub_channels) {
                return Err(AclError::ChannelNotAuthorized {
                    channel: "*".to_string(),
                }
                .into());
            }
            for channel in channels {
                if user.excluded_pub_sub_channels.contains(channel) {
                    return Err(AclError::ChannelNotAuthorized {
                        channel: channel.clone(),
                    }
                    .into());
                }
            }
            return Ok(());
        }

        // Every category of the command must be included.
        if !has_wildcard(&user.included_categories) {
            for cat in &categories {
                if !contains_str(&user.included_categories, cat) {
                    return Err(AclError::CategoryNotIncluded {
                        category: cat.to_string(),
                    }
                    .into());
                }
            }
        }

        // An excluded category vetoes, wildcard vetoes everything.
        if has_wildcard(&user.excluded_categories) {
            return Err(AclError::CategoryExcluded {
                category: "all".to_string(),
            }
            .into());
        }
        for cat in &categories {
            if contains_str(&user.excluded_categories, cat) {
                return Err(AclError::CategoryExcluded {
                    category: cat.to_string(),
                }
                .into());
            }
        }

        // The resolved command must be included.
        if !has_wildcard(&user.included_commands)
            && !user
                .included_commands
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&resolved))
        {
            return Err(AclError::CommandNotIncluded { command: resolved }.into());
        }

        // An excluded command vetoes, wildcard vetoes everything.
        if has_wildcard(&user.excluded_commands) {
            return Err(AclError::CommandExcluded {
                command: "all".to_string(),
            }
            .into());
        }
        if user
            .excluded_commands
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&resolved))
        {
            return Err(AclError::CommandExcluded { command: resolved }.into());
        }

        // Every touched key must be in the general key list.
        if !has_wildcard(&user.included_keys) {
            for key in &keys {
                if !user.included_keys.contains(key) {
                    return Err(AclError::KeyNotIncluded { key: key.clone() }.into());
                }
            }
        }

        // Read-category commands additionally need the read-key list.
        if categories.contains(&category::READ) && !has_wildcard(&user.included_read_keys) {
            for key in &keys {
                if !user.included_read_keys.contains(key) {
                    return Err(AclError::ReadKeyNotIncluded { key: key.clone() }.into());
                }
            }
        }

        // Write-category commands additionally need the write-key list.
        if categories.contains(&category::WRITE) && !has_wildcard(&user.included_write_keys) {
            for key in &keys {
                if !user.included_write_keys.contains(key) {
                    return Err(AclError::WriteKeyNotIncluded { key: key.clone() }.into());
                }
            }
        }

        Ok(())
    }
}

fn has_wildcard(list: &[String]) -> bool {
    list.iter().any(|entry| entry == "*")
}

fn contains_str(list: &[String], value: &str) -> bool {
    list.iter().any(|entry| entry == value)
}
