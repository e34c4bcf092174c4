//! The command dispatch table.
//!
//! Every command declares a name, its capability categories, a key-extraction
//! function, and a handler; commands with subcommands carry them as explicit
//! descriptors instead of runtime-typed parameters. The access-control engine
//! consumes commands only through this declaration: the categories and the
//! extracted keys (or channels) are the entire interface between dispatch and
//! authorization.

mod keyvalue;
mod list;
mod pubsub;

use thiserror::Error as ThisError;

use crate::acl::{Acl, ConnId};
use crate::pubsub::{PubSub, PushSender};
use crate::store::Store;

/// Capability category names.
///
/// Categories are plain lowercase strings because user configuration refers
/// to them textually (`+@read`, `-@dangerous`).
pub mod category {
    pub const ADMIN: &str = "admin";
    pub const CONNECTION: &str = "connection";
    pub const DANGEROUS: &str = "dangerous";
    pub const FAST: &str = "fast";
    pub const KEYSPACE: &str = "keyspace";
    pub const LIST: &str = "list";
    pub const PUBSUB: &str = "pubsub";
    pub const READ: &str = "read";
    pub const SLOW: &str = "slow";
    pub const WRITE: &str = "write";
}

/// Errors from command lookup and argument handling.
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum CommandError {
    /// The command arity did not match.
    #[error("wrong number of arguments for {command} command")]
    WrongArgumentCount {
        /// The command as the client spelled it
        command: String,
    },

    /// No such command in the table.
    #[error("unknown command {command}")]
    UnknownCommand {
        /// The unrecognized name
        command: String,
    },

    /// A management subcommand that does not exist.
    #[error("not implemented")]
    NotImplemented,

    /// An argument failed to parse.
    #[error("{reason}")]
    InvalidArgument {
        /// What was wrong with it
        reason: String,
    },

    /// ACL CAT named a category no command declares.
    #[error("category not found")]
    CategoryNotFound,
}

impl CommandError {
    /// Check if this error is an unknown-command lookup failure.
    pub fn is_unknown_command(&self) -> bool {
        matches!(self, CommandError::UnknownCommand { .. })
    }
}

impl From<CommandError> for crate::Error {
    fn from(err: CommandError) -> Self {
        crate::Error::Command(err)
    }
}

/// Extracts the keys (or pub/sub channels) a command invocation touches.
pub type KeyExtractor = fn(&[String]) -> crate::Result<Vec<String>>;

/// Executes a command invocation and produces the encoded reply.
pub type Handler = fn(&HandlerContext<'_>, &[String]) -> crate::Result<Vec<u8>>;

/// Everything a handler may touch, borrowed for the duration of one dispatch.
pub struct HandlerContext<'a> {
    pub acl: &'a Acl,
    pub store: &'a Store,
    pub pubsub: &'a PubSub,
    pub table: &'a CommandTable,
    /// Outbound push channel of the dispatching connection.
    pub push: &'a PushSender,
    pub conn: ConnId,
}

/// Descriptor of a subcommand.
#[derive(Debug, Clone, Copy)]
pub struct SubCommandSpec {
    pub name: &'static str,
    pub categories: &'static [&'static str],
    pub description: &'static str,
    pub key_extractor: KeyExtractor,
}

/// Descriptor of a command.
#[derive(Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub categories: &'static [&'static str],
    pub description: &'static str,
    pub key_extractor: KeyExtractor,
    pub handler: Handler,
    pub subcommands: &'static [SubCommandSpec],
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("categories", &self.categories)
            .field("subcommands", &self.subcommands.len())
            .finish()
    }
}

impl CommandSpec {
    /// Match a subcommand token, case-insensitively.
    pub fn subcommand(&self, token: &str) -> Option<&'static SubCommandSpec> {
        self.subcommands
            .iter()
            .find(|sub| sub.name.eq_ignore_ascii_case(token))
    }
}

/// The table of every command the server dispatches.
#[derive(Debug)]
pub struct CommandTable {
    commands: Vec<&'static CommandSpec>,
}

impl CommandTable {
    /// The builtin command set: connection, key/value, list, pub/sub, and
    /// the access-control management surface.
    pub fn standard() -> Self {
        let mut commands: Vec<&'static CommandSpec> = Vec::new();
        commands.extend(keyvalue::SPECS);
        commands.extend(list::SPECS);
        commands.extend(pubsub::SPECS);
        commands.extend(crate::acl::commands::SPECS);
        Self { commands }
    }

    /// Look up a command by name, case-insensitively.
    pub fn lookup(&self, name: &str) -> Option<&'static CommandSpec> {
        self.commands
            .iter()
            .copied()
            .find(|spec| spec.name.eq_ignore_ascii_case(name))
    }

    /// All registered commands, in registration order.
    pub fn commands(&self) -> &[&'static CommandSpec] {
        &self.commands
    }
}

/// Extractor for commands that touch no keys.
pub(crate) fn no_keys(_args: &[String]) -> crate::Result<Vec<String>> {
    Ok(Vec::new())
}

/// Extractor for commands whose single key is the first argument.
pub(crate) fn key_at_1(args: &[String]) -> crate::Result<Vec<String>> {
    match args.get(1) {
        Some(key) => Ok(vec![key.clone()]),
        None => Err(wrong_args(args).into()),
    }
}

/// Extractor for commands that take one or more keys from the first argument
/// on.
pub(crate) fn keys_from_1(args: &[String]) -> crate::Result<Vec<String>> {
    if args.len() < 2 {
        return Err(wrong_args(args).into());
    }
    Ok(args[1..].to_vec())
}

/// Extractor for commands whose first two arguments are both keys.
pub(crate) fn keys_at_1_and_2(args: &[String]) -> crate::Result<Vec<String>> {
    if args.len() < 3 {
        return Err(wrong_args(args).into());
    }
    Ok(vec![args[1].clone(), args[2].clone()])
}

/// Arity error naming the command as the client spelled it.
pub(crate) fn wrong_args(args: &[String]) -> CommandError {
    CommandError::WrongArgumentCount {
        command: args
            .first()
            .map(|c| c.to_ascii_lowercase())
            .unwrap_or_default(),
    }
}

/// Parse an integer argument.
pub(crate) fn int_arg(args: &[String], index: usize, what: &str) -> crate::Result<i64> {
    let raw = args.get(index).ok_or_else(|| wrong_args(args))?;
    raw.parse().map_err(|_| {
        CommandError::InvalidArgument {
            reason: format!("{what} must be an integer"),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_lookup() {
        let table = CommandTable::standard();
        assert!(table.lookup("get").is_some());
        assert!(table.lookup("LPUSH").is_some());
        assert!(table.lookup("auth").is_some());
        assert!(table.lookup("flushall").is_none());
    }

    #[test]
    fn test_subcommand_matching() {
        let table = CommandTable::standard();
        let acl = table.lookup("acl").unwrap();
        assert!(acl.subcommand("GETUSER").is_some());
        assert!(acl.subcommand("frobnicate").is_none());
    }

    #[test]
    fn test_extractors() {
        let args: Vec<String> = ["get", "hello"].iter().map(|s| s.to_string()).collect();
        assert_eq!(key_at_1(&args).unwrap(), vec!["hello"]);

        let args: Vec<String> = ["mget"].iter().map(|s| s.to_string()).collect();
        assert!(keys_from_1(&args).is_err());

        let args: Vec<String> = ["lmove", "a", "b", "left", "right"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(keys_at_1_and_2(&args).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_every_command_is_uniquely_named() {
        let table = CommandTable::standard();
        let mut names: Vec<&str> = table.commands().iter().map(|c| c.name).collect();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(before, names.len());
    }
}
