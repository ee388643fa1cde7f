//! Sandboxed Lua environment wiring for one run.
//!
//! Builds the VM a script body executes in and registers the
//! script-observable surface:
//!
//! - `log(...)` — append a space-joined line to the run's log buffer
//! - `register_callback(handler)` — subscribe to delivered events
//!   (last write wins)
//! - `invoke(operation_id, context_name)` — run one host operation and
//!   suspend on its deferred result
//!
//! The standard `print` is replaced with an inert function and the
//! dangerous stdlib entry points are stripped, so the log buffer is the
//! single capturable diagnostic channel and the environment stays
//! isolated.

use crate::bridge;
use crate::capture::RunCapture;
use crate::error::HarnessError;
use crate::slot::CallbackSlot;
use mlua::{Lua, LuaSerdeExt, MultiValue, Value};
use parking_lot::Mutex;
use std::sync::Arc;
use tether_host::ExecCapability;

/// Creates the sandboxed VM with the full script surface registered.
pub(crate) fn build_lua(
    capture: Arc<Mutex<RunCapture>>,
    slot: Arc<CallbackSlot>,
    exec: Arc<dyn ExecCapability>,
) -> Result<Lua, HarnessError> {
    let lua = Lua::new();

    sandbox_globals(&lua)?;
    register_log(&lua, capture)?;
    register_callback_fn(&lua, slot)?;
    register_invoke(&lua, exec)?;

    Ok(lua)
}

/// Strips escape hatches and silences stdout.
fn sandbox_globals(lua: &Lua) -> Result<(), HarnessError> {
    lua.load(
        r#"
        os = nil
        io = nil
        load = nil
        loadfile = nil
        dofile = nil
        debug = nil
        require = nil
        package = nil
        "#,
    )
    .exec()?;

    // Inert stdout: scripts must go through log() to be heard.
    let print_fn = lua.create_function(|_, _: MultiValue| Ok(()))?;
    lua.globals().set("print", print_fn)?;

    Ok(())
}

fn register_log(lua: &Lua, capture: Arc<Mutex<RunCapture>>) -> Result<(), HarnessError> {
    let log_fn = lua.create_function(move |_, args: MultiValue| {
        let parts: Vec<String> = args.iter().map(lua_display).collect();
        capture.lock().append(parts.join(" "));
        Ok(())
    })?;
    lua.globals().set("log", log_fn)?;
    Ok(())
}

fn register_callback_fn(lua: &Lua, slot: Arc<CallbackSlot>) -> Result<(), HarnessError> {
    let register_fn = lua.create_function(move |lua, handler: mlua::Function| {
        slot.replace(lua, handler)
    })?;
    lua.globals().set("register_callback", register_fn)?;
    Ok(())
}

fn register_invoke(lua: &Lua, exec: Arc<dyn ExecCapability>) -> Result<(), HarnessError> {
    let invoke_fn = lua.create_async_function(
        move |lua, (operation_id, context_name): (i64, String)| {
            let exec = Arc::clone(&exec);
            async move {
                match bridge::invoke_deferred(exec.as_ref(), operation_id, &context_name).await {
                    Ok(result) => lua.to_value(&result),
                    Err(failure) => Err(mlua::Error::RuntimeError(failure.message)),
                }
            }
        },
    )?;
    lua.globals().set("invoke", invoke_fn)?;
    Ok(())
}

/// Renders one Lua value the way it would display, for log joining.
fn lua_display(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => format!("{n}"),
        Value::String(s) => s
            .to_str()
            .map_or_else(|_| "<invalid utf8>".into(), |s| s.to_string()),
        Value::Table(_) => format!("table: {value:p}"),
        Value::Function(_) => format!("function: {value:p}"),
        _ => format!("{value:?}"),
    }
}
