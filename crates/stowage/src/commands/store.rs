//! One-shot store commands.

use anyhow::Result;
use clap::Args;
use tracing::debug;

use super::Context;
use super::ops::{self, StoreOp};

/// Arguments for the set command.
#[derive(Args, Debug)]
pub struct SetArgs {
    /// Key to write
    pub key: String,

    /// Value (JSON, or a plain string)
    pub value: String,

    /// Expire the entry this many milliseconds from now
    #[arg(short, long)]
    pub expire: Option<u64>,
}

/// Arguments for the get command.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Key to read
    pub key: String,

    /// Value to print when the key is absent or expired
    #[arg(short, long)]
    pub default: Option<String>,
}

/// Arguments for commands taking a single key.
#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Key to act on
    pub key: String,
}

/// Open the targeted store, run `op`, print the result.
fn run_op(op: StoreOp, ctx: &Context) -> Result<()> {
    let registry = ctx.open_registry()?;
    let store = registry.get(ctx.target);
    debug!(store = %ctx.target, namespace = %store.namespace(), ?op, "Running store command");

    let output = ops::execute(store, op)?;
    ops::print_output(&output, ctx.json_output)
}

pub fn set(args: SetArgs, ctx: &Context) -> Result<()> {
    run_op(
        StoreOp::Set {
            key: args.key,
            value: ops::parse_value(&args.value),
            expire_ms: args.expire,
        },
        ctx,
    )
}

pub fn get(args: GetArgs, ctx: &Context) -> Result<()> {
    run_op(
        StoreOp::Get {
            key: args.key,
            default: args.default.as_deref().map(ops::parse_value),
        },
        ctx,
    )
}

pub fn remove(args: KeyArgs, ctx: &Context) -> Result<()> {
    run_op(StoreOp::Remove { key: args.key }, ctx)
}

pub fn has(args: KeyArgs, ctx: &Context) -> Result<()> {
    run_op(StoreOp::Has { key: args.key }, ctx)
}

pub fn keys(ctx: &Context) -> Result<()> {
    run_op(StoreOp::Keys, ctx)
}

pub fn all(ctx: &Context) -> Result<()> {
    run_op(StoreOp::All, ctx)
}

pub fn prune(ctx: &Context) -> Result<()> {
    run_op(StoreOp::Prune, ctx)
}

pub fn size(ctx: &Context) -> Result<()> {
    run_op(StoreOp::Size, ctx)
}

pub fn clear(ctx: &Context) -> Result<()> {
    run_op(StoreOp::Clear, ctx)
}
