//! PING and the basic key/value commands.

use super::{
    CommandSpec, HandlerContext, category, key_at_1, keys_from_1, no_keys, wrong_args,
};
use crate::store::Value;
use crate::wire;

pub(super) static SPECS: &[CommandSpec] = &[
    CommandSpec {
        name: "ping",
        categories: &[category::CONNECTION, category::FAST],
        description: "(PING [message]) Test the connection",
        key_extractor: no_keys,
        handler: handle_ping,
        subcommands: &[],
    },
    CommandSpec {
        name: "set",
        categories: &[category::KEYSPACE, category::WRITE, category::SLOW],
        description: "(SET key value) Set the value at key",
        key_extractor: key_at_1,
        handler: handle_set,
        subcommands: &[],
    },
    CommandSpec {
        name: "get",
        categories: &[category::KEYSPACE, category::READ, category::FAST],
        description: "(GET key) Get the value at key",
        key_extractor: key_at_1,
        handler: handle_get,
        subcommands: &[],
    },
    CommandSpec {
        name: "mget",
        categories: &[category::KEYSPACE, category::READ, category::FAST],
        description: "(MGET key1 [key2]) Get the values of all the given keys",
        key_extractor: keys_from_1,
        handler: handle_mget,
        subcommands: &[],
    },
];

fn handle_ping(_ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    match args.len() {
        1 => Ok(wire::simple_string("PONG")),
        2 => Ok(wire::simple_string(format!("\"{}\"", args[1]))),
        _ => Err(wrong_args(args).into()),
    }
}

fn handle_set(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() != 3 {
        return Err(wrong_args(args).into());
    }
    ctx.store.set(&args[1], Value::adapt(&args[2]));
    Ok(wire::ok())
}

fn handle_get(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() != 2 {
        return Err(wrong_args(args).into());
    }
    match ctx.store.get(&args[1]) {
        Some(value) => Ok(wire::simple_string(value.to_string())),
        None => Ok(wire::simple_string("nil")),
    }
}

fn handle_mget(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() < 2 {
        return Err(wrong_args(args).into());
    }
    let values: Vec<String> = args[1..]
        .iter()
        .map(|key| match ctx.store.get(key) {
            Some(value) => value.to_string(),
            None => "nil".to_string(),
        })
        .collect();
    Ok(wire::bulk_array(values))
}
