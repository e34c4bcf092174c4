//! The list command suite.

use super::{
    CommandError, CommandSpec, HandlerContext, category, int_arg, key_at_1, keys_at_1_and_2,
    wrong_args,
};
use crate::store::{Side, Value};
use crate::wire;

static READ_CATEGORIES: &[&str] = &[
    category::KEYSPACE,
    category::LIST,
    category::READ,
    category::FAST,
];
static WRITE_CATEGORIES: &[&str] = &[
    category::KEYSPACE,
    category::LIST,
    category::WRITE,
    category::SLOW,
];

pub(super) static SPECS: &[CommandSpec] = &[
    CommandSpec {
        name: "llen",
        categories: READ_CATEGORIES,
        description: "(LLEN key) Return the length of a list",
        key_extractor: key_at_1,
        handler: handle_llen,
        subcommands: &[],
    },
    CommandSpec {
        name: "lindex",
        categories: READ_CATEGORIES,
        description: "(LINDEX key index) Get a list element by index",
        key_extractor: key_at_1,
        handler: handle_lindex,
        subcommands: &[],
    },
    CommandSpec {
        name: "lrange",
        categories: READ_CATEGORIES,
        description: "(LRANGE key start end) Return a range of elements between the given indices",
        key_extractor: key_at_1,
        handler: handle_lrange,
        subcommands: &[],
    },
    CommandSpec {
        name: "lset",
        categories: WRITE_CATEGORIES,
        description: "(LSET key index value) Set the value of an element by index",
        key_extractor: key_at_1,
        handler: handle_lset,
        subcommands: &[],
    },
    CommandSpec {
        name: "ltrim",
        categories: WRITE_CATEGORIES,
        description: "(LTRIM key start end) Trim a list to the specified range",
        key_extractor: key_at_1,
        handler: handle_ltrim,
        subcommands: &[],
    },
    CommandSpec {
        name: "lrem",
        categories: WRITE_CATEGORIES,
        description: "(LREM key count value) Remove elements from a list",
        key_extractor: key_at_1,
        handler: handle_lrem,
        subcommands: &[],
    },
    CommandSpec {
        name: "lmove",
        categories: WRITE_CATEGORIES,
        description: "(LMOVE source destination <LEFT|RIGHT> <LEFT|RIGHT>) Move an element between lists",
        key_extractor: keys_at_1_and_2,
        handler: handle_lmove,
        subcommands: &[],
    },
    CommandSpec {
        name: "lpush",
        categories: WRITE_CATEGORIES,
        description: "(LPUSH key value1 [value2]) Prepend values to a list, creating it if absent",
        key_extractor: key_at_1,
        handler: handle_lpush,
        subcommands: &[],
    },
    CommandSpec {
        name: "lpushx",
        categories: WRITE_CATEGORIES,
        description: "(LPUSHX key value1 [value2]) Prepend values to an existing list",
        key_extractor: key_at_1,
        handler: handle_lpushx,
        subcommands: &[],
    },
    CommandSpec {
        name: "rpush",
        categories: WRITE_CATEGORIES,
        description: "(RPUSH key value1 [value2]) Append values to a list, creating it if absent",
        key_extractor: key_at_1,
        handler: handle_rpush,
        subcommands: &[],
    },
    CommandSpec {
        name: "rpushx",
        categories: WRITE_CATEGORIES,
        description: "(RPUSHX key value1 [value2]) Append values to an existing list",
        key_extractor: key_at_1,
        handler: handle_rpushx,
        subcommands: &[],
    },
    CommandSpec {
        name: "lpop",
        categories: WRITE_CATEGORIES,
        description: "(LPOP key) Remove and return the first element of a list",
        key_extractor: key_at_1,
        handler: handle_lpop,
        subcommands: &[],
    },
    CommandSpec {
        name: "rpop",
        categories: WRITE_CATEGORIES,
        description: "(RPOP key) Remove and return the last element of a list",
        key_extractor: key_at_1,
        handler: handle_rpop,
        subcommands: &[],
    },
];

fn handle_llen(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() != 2 {
        return Err(wrong_args(args).into());
    }
    let len = ctx.store.llen(&args[1])?;
    Ok(wire::integer(len as i64))
}

fn handle_lindex(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() != 3 {
        return Err(wrong_args(args).into());
    }
    let index = int_arg(args, 2, "index")?;
    let value = ctx.store.lindex(&args[1], index)?;
    Ok(wire::simple_string(value.to_string()))
}

fn handle_lrange(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() != 4 {
        return Err(wrong_args(args).into());
    }
    let start = int_arg(args, 2, "start index")?;
    let end = int_arg(args, 3, "end index")?;
    let values = ctx.store.lrange(&args[1], start, end)?;
    Ok(wire::bulk_array(
        values.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
    ))
}

fn handle_lset(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() != 4 {
        return Err(wrong_args(args).into());
    }
    let index = int_arg(args, 2, "index")?;
    ctx.store.lset(&args[1], index, Value::adapt(&args[3]))?;
    Ok(wire::ok())
}

fn handle_ltrim(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() != 4 {
        return Err(wrong_args(args).into());
    }
    let start = int_arg(args, 2, "start index")?;
    let end = int_arg(args, 3, "end index")?;
    ctx.store.ltrim(&args[1], start, end)?;
    Ok(wire::ok())
}

fn handle_lrem(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() != 4 {
        return Err(wrong_args(args).into());
    }
    let count = int_arg(args, 2, "count")?;
    ctx.store.lrem(&args[1], count, &args[3])?;
    Ok(wire::ok())
}

fn handle_lmove(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() != 5 {
        return Err(wrong_args(args).into());
    }
    let (from, to) = match (Side::parse(&args[3]), Side::parse(&args[4])) {
        (Some(from), Some(to)) => (from, to),
        _ => {
            return Err(CommandError::InvalidArgument {
                reason: "wherefrom and whereto arguments must be either LEFT or RIGHT".to_string(),
            }
            .into());
        }
    };
    ctx.store.lmove(&args[1], &args[2], from, to)?;
    Ok(wire::ok())
}

fn push(
    ctx: &HandlerContext<'_>,
    args: &[String],
    side: Side,
    require_exists: bool,
) -> crate::Result<Vec<u8>> {
    if args.len() < 3 {
        return Err(wrong_args(args).into());
    }
    let elems: Vec<Value> = args[2..].iter().map(|raw| Value::adapt(raw)).collect();
    ctx.store.push(&args[1], elems, side, require_exists)?;
    Ok(wire::ok())
}

fn handle_lpush(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    push(ctx, args, Side::Left, false)
}

fn handle_lpushx(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    push(ctx, args, Side::Left, true)
}

fn handle_rpush(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    push(ctx, args, Side::Right, false)
}

fn handle_rpushx(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    push(ctx, args, Side::Right, true)
}

fn pop(ctx: &HandlerContext<'_>, args: &[String], side: Side) -> crate::Result<Vec<u8>> {
    if args.len() != 2 {
        return Err(wrong_args(args).into());
    }
    let value = ctx.store.pop(&args[1], side)?;
    Ok(wire::simple_string(value.to_string()))
}

fn handle_lpop(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    pop(ctx, args, Side::Left)
}

fn handle_rpop(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    pop(ctx, args, Side::Right)
}
