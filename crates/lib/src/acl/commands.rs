//! AUTH and the ACL management command surface.
//!
//! These handlers mutate the registry directly (through the authenticator or
//! the user-mutation operations); everything else about them is ordinary
//! command dispatch, and the `ACL` subcommands carry their declared
//! categories through the authorizer like any other command.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::errors::AclError;
use super::persistence::LoadMode;
use crate::commands::{
    CommandError, CommandSpec, HandlerContext, SubCommandSpec, category, no_keys, wrong_args,
};
use crate::wire;

pub(crate) static SPECS: &[CommandSpec] = &[
    CommandSpec {
        name: "auth",
        categories: &[category::CONNECTION, category::SLOW],
        description: "(AUTH [username] password) Authenticates the connection",
        key_extractor: no_keys,
        handler: handle_auth,
        subcommands: &[],
    },
    CommandSpec {
        name: "acl",
        categories: &[],
        description: "Access-control management commands",
        key_extractor: no_keys,
        handler: handle_acl,
        subcommands: ACL_SUBCOMMANDS,
    },
];

static ACL_SUBCOMMANDS: &[SubCommandSpec] = &[
    SubCommandSpec {
        name: "cat",
        categories: &[category::SLOW],
        description: "(ACL CAT [category]) List categories, or the commands inside one",
        key_extractor: no_keys,
    },
    SubCommandSpec {
        name: "users",
        categories: &[category::ADMIN, category::SLOW, category::DANGEROUS],
        description: "(ACL USERS) List the usernames of the configured users",
        key_extractor: no_keys,
    },
    SubCommandSpec {
        name: "setuser",
        categories: &[category::ADMIN, category::SLOW, category::DANGEROUS],
        description: "(ACL SETUSER username rule...) Configure a new or existing user",
        key_extractor: no_keys,
    },
    SubCommandSpec {
        name: "getuser",
        categories: &[category::ADMIN, category::SLOW, category::DANGEROUS],
        description: "(ACL GETUSER username) List the rules of a user",
        key_extractor: no_keys,
    },
    SubCommandSpec {
        name: "deluser",
        categories: &[category::ADMIN, category::SLOW, category::DANGEROUS],
        description: "(ACL DELUSER username...) Delete users and terminate their connections",
        key_extractor: no_keys,
    },
    SubCommandSpec {
        name: "whoami",
        categories: &[category::FAST],
        description: "(ACL WHOAMI) Return the user the connection is bound to",
        key_extractor: no_keys,
    },
    SubCommandSpec {
        name: "list",
        categories: &[category::ADMIN, category::SLOW, category::DANGEROUS],
        description: "(ACL LIST) Dump the effective rules in user-file rule format",
        key_extractor: no_keys,
    },
    SubCommandSpec {
        name: "load",
        categories: &[category::ADMIN, category::SLOW, category::DANGEROUS],
        description: "(ACL LOAD <MERGE|REPLACE>) Reload users from the configured user file",
        key_extractor: no_keys,
    },
    SubCommandSpec {
        name: "save",
        categories: &[category::ADMIN, category::SLOW, category::DANGEROUS],
        description: "(ACL SAVE) Save the effective users to the configured user file",
        key_extractor: no_keys,
    },
];

fn handle_auth(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    let (username, password) = match args {
        [_, password] => (None, password),
        [_, username, password] => (Some(username.as_str()), password),
        _ => return Err(wrong_args(args).into()),
    };
    ctx.acl.authenticate(ctx.conn, username, password)?;
    Ok(wire::ok())
}

fn handle_acl(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    let Some(subcommand) = args.get(1) else {
        return Err(wrong_args(args).into());
    };

    match subcommand.to_ascii_lowercase().as_str() {
        "getuser" => handle_get_user(ctx, args),
        "cat" => handle_cat(ctx, args),
        "users" => handle_users(ctx, args),
        "setuser" => handle_set_user(ctx, args),
        "deluser" => handle_del_user(ctx, args),
        "whoami" => handle_whoami(ctx, args),
        "list" => handle_list(ctx, args),
        "load" => handle_load(ctx, args),
        "save" => handle_save(ctx, args),
        _ => Err(CommandError::NotImplemented.into()),
    }
}

/// GETUSER renders a twelve-entry document: username, flags, categories,
/// commands, keys, and channels, each as a label line followed by a counted
/// group.
fn handle_get_user(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() != 3 {
        return Err(wrong_args(args).into());
    }

    let user = ctx
        .acl
        .lookup_user(&args[2])
        .ok_or_else(|| AclError::UserNotFound {
            username: args[2].clone(),
        })?;

    let mut res = format!("*12\r\n+username\r\n*1\r\n+{}", user.username);

    let mut flags: Vec<&str> = vec![if user.enabled { "on" } else { "off" }];
    if user.no_password {
        flags.push("nopass");
    }
    if user.no_keys {
        flags.push("nokeys");
    }
    let _ = write!(res, "\r\n+flags\r\n*{}", flags.len());
    for flag in flags {
        let _ = write!(res, "\r\n+{flag}");
    }

    let _ = write!(
        res,
        "\r\n+categories\r\n*{}",
        user.included_categories.len() + user.excluded_categories.len()
    );
    for cat in &user.included_categories {
        let _ = write!(res, "\r\n++@{}", wildcard_name(cat));
    }
    for cat in &user.excluded_categories {
        let _ = write!(res, "\r\n+-@{}", wildcard_name(cat));
    }

    let _ = write!(
        res,
        "\r\n+commands\r\n*{}",
        user.included_commands.len() + user.excluded_commands.len()
    );
    for command in &user.included_commands {
        let _ = write!(res, "\r\n++{}", wildcard_name(command));
    }
    for command in &user.excluded_commands {
        let _ = write!(res, "\r\n+-{}", wildcard_name(command));
    }

    let _ = write!(
        res,
        "\r\n+keys\r\n*{}",
        user.included_keys.len() + user.included_read_keys.len() + user.included_write_keys.len()
    );
    for key in &user.included_keys {
        let _ = write!(res, "\r\n+%RW~{key}");
    }
    for key in &user.included_read_keys {
        let _ = write!(res, "\r\n+%R~{key}");
    }
    for key in &user.included_write_keys {
        let _ = write!(res, "\r\n+%W~{key}");
    }

    let _ = write!(
        res,
        "\r\n+channels\r\n*{}",
        user.included_pub_sub_channels.len() + user.excluded_pub_sub_channels.len()
    );
    for channel in &user.included_pub_sub_channels {
        let _ = write!(res, "\r\n++&{channel}");
    }
    for channel in &user.excluded_pub_sub_channels {
        let _ = write!(res, "\r\n+-&{channel}");
    }

    res.push_str("\r\n\n");
    Ok(res.into_bytes())
}

fn handle_cat(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() > 3 {
        return Err(wrong_args(args).into());
    }

    let mut categories: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for spec in ctx.table.commands() {
        if spec.subcommands.is_empty() {
            for &cat in spec.categories {
                categories.entry(cat).or_default().push(spec.name.to_string());
            }
            continue;
        }
        for sub in spec.subcommands {
            for &cat in sub.categories {
                categories
                    .entry(cat)
                    .or_default()
                    .push(format!("{}|{}", spec.name, sub.name));
            }
        }
    }

    match args.get(2) {
        None => Ok(wire::simple_array(categories.keys())),
        Some(wanted) => {
            let wanted = wanted.to_ascii_lowercase();
            let commands = categories
                .get(wanted.as_str())
                .ok_or(CommandError::CategoryNotFound)?;
            Ok(wire::simple_array(commands))
        }
    }
}

fn handle_users(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() != 2 {
        return Err(wrong_args(args).into());
    }
    Ok(wire::bulk_array(ctx.acl.usernames()))
}

fn handle_set_user(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() < 3 {
        return Err(wrong_args(args).into());
    }
    ctx.acl.set_user(&args[2..])?;
    Ok(wire::ok())
}

fn handle_del_user(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() < 3 {
        return Err(wrong_args(args).into());
    }
    ctx.acl.delete_users(&args[2..]);
    Ok(wire::ok())
}

fn handle_whoami(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() != 2 {
        return Err(wrong_args(args).into());
    }
    let (_, username) = ctx
        .acl
        .session_info(ctx.conn)
        .ok_or(AclError::NotAuthenticated)?;
    Ok(wire::simple_string(username))
}

fn handle_list(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() != 2 {
        return Err(wrong_args(args).into());
    }
    let lines: Vec<String> = ctx
        .acl
        .users_snapshot()
        .iter()
        .map(|user| user.rule_line())
        .collect();
    Ok(wire::bulk_array(lines))
}

fn handle_load(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() != 3 {
        return Err(wrong_args(args).into());
    }
    let mode = LoadMode::parse(&args[2]).ok_or_else(|| CommandError::InvalidArgument {
        reason: "load mode must be MERGE or REPLACE".to_string(),
    })?;
    ctx.acl.load(mode)?;
    Ok(wire::ok())
}

fn handle_save(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() != 2 {
        return Err(wrong_args(args).into());
    }
    ctx.acl.save()?;
    Ok(wire::ok())
}

/// `"*"` renders as `all` in the introspection documents.
fn wildcard_name(entry: &str) -> &str {
    if entry == "*" { "all" } else { entry }
}
