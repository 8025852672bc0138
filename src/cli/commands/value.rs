//! get and set commands - Read and write bound values

use anyhow::Result;
use serde_json::Value;

use super::{open_manager, resolve_target};
use crate::cli::output;
use crate::cli::Context;
use crate::core::literal::parse_literal;
use crate::core::types::OwnerId;
use crate::reactive::Signal;

/// Print the value at a bind target as JSON.
pub fn get(ctx: &Context, file: &str, target: &str) -> Result<()> {
    let target = resolve_target(ctx, file, target)?;
    let manager = open_manager(ctx);
    let value = manager.read(&target)?;
    output::debug(format!("read {target}"), ctx.verbosity);
    output::result(serde_json::to_string(&value)?);
    Ok(())
}

/// Write a literal through a subscription and persist it.
pub fn set(ctx: &Context, file: &str, target: &str, value: &str) -> Result<()> {
    let target = resolve_target(ctx, file, target)?;
    let value = parse_literal(value);
    let manager = open_manager(ctx);

    let subscription = manager.subscribe(
        OwnerId::new("mb set"),
        Signal::new(Value::Null),
        target.clone(),
        || {},
    )?;
    subscription.write(value.clone())?;
    let flushed = manager.flush_all()?;
    output::debug(format!("flushed {flushed} document(s)"), ctx.verbosity);
    output::print(format!("{target} = {value}"), ctx.verbosity);
    Ok(())
}
