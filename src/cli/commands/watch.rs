//! watch command - Follow a bound value through the cycle timer

use std::cell::Cell;
use std::ops::ControlFlow;
use std::rc::Rc;

use anyhow::Result;
use serde_json::Value;

use super::{open_manager, resolve_target};
use crate::cli::output;
use crate::cli::Context;
use crate::core::types::OwnerId;
use crate::reactive::Signal;

/// Print the value now and on every change.
///
/// Stops when the document is removed, after `cycles` cycles, or on Ctrl-C.
pub async fn watch(ctx: &Context, file: &str, target: &str, cycles: Option<u64>) -> Result<()> {
    let target = resolve_target(ctx, file, target)?;
    let manager = open_manager(ctx);

    let signal = Signal::new(Value::Null);
    signal.register_listener(|value: &Value| output::result(value));

    let removed = Rc::new(Cell::new(false));
    let flag = Rc::clone(&removed);
    let _subscription = manager.subscribe(OwnerId::new("mb watch"), signal, target.clone(), move || {
        flag.set(true)
    })?;
    output::debug(
        format!("watching {target} every {:?}", ctx.engine.cycle_interval),
        ctx.verbosity,
    );

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    manager
        .run(shutdown, |report| {
            let done = removed.get() || cycles.is_some_and(|limit| report.cycle >= limit);
            if done {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .await;

    if removed.get() {
        output::print(format!("{} was removed", target.storage_path), ctx.verbosity);
    }
    manager.teardown()?;
    Ok(())
}
