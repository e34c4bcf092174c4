//! SUBSCRIBE and PUBLISH.
//!
//! For these commands the key extractor returns channel names, and the
//! authorizer checks them against the user's pub/sub channel lists instead
//! of the key dimensions.

use super::{CommandSpec, HandlerContext, category, key_at_1, keys_from_1, wrong_args};
use crate::wire;

pub(super) static SPECS: &[CommandSpec] = &[
    CommandSpec {
        name: "subscribe",
        categories: &[category::PUBSUB, category::CONNECTION, category::SLOW],
        description: "(SUBSCRIBE channel [channel]) Subscribe the connection to channels",
        key_extractor: keys_from_1,
        handler: handle_subscribe,
        subcommands: &[],
    },
    CommandSpec {
        name: "publish",
        categories: &[category::PUBSUB, category::FAST],
        description: "(PUBLISH channel message) Publish a message to a channel",
        key_extractor: key_at_1,
        handler: handle_publish,
        subcommands: &[],
    },
];

fn handle_subscribe(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() < 2 {
        return Err(wrong_args(args).into());
    }
    ctx.pubsub.subscribe(ctx.conn, ctx.push, &args[1..]);
    Ok(wire::ok())
}

fn handle_publish(ctx: &HandlerContext<'_>, args: &[String]) -> crate::Result<Vec<u8>> {
    if args.len() != 3 {
        return Err(wrong_args(args).into());
    }
    let receivers = ctx.pubsub.publish(&args[1], &args[2]);
    Ok(wire::integer(receivers as i64))
}
