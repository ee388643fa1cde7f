//! Single-subscriber delivery slot.
//!
//! Holds at most one script handler at a time. Registering a new handler
//! discards the previous one: last write wins, no multiplexing. An empty
//! slot behaves as a no-op handler: delivery parses and drops the event.

use mlua::{Function, Lua, RegistryKey};
use parking_lot::Mutex;

#[derive(Default)]
pub(crate) struct CallbackSlot {
    key: Mutex<Option<RegistryKey>>,
}

impl CallbackSlot {
    /// Replaces the current handler with `handler`.
    pub(crate) fn replace(&self, lua: &Lua, handler: Function) -> mlua::Result<()> {
        let key = lua.create_registry_value(handler)?;
        let previous = self.key.lock().replace(key);
        if let Some(previous) = previous {
            lua.remove_registry_value(previous)?;
        }
        tracing::debug!("delivery handler replaced");
        Ok(())
    }

    /// The currently registered handler, if any.
    pub(crate) fn current(&self, lua: &Lua) -> mlua::Result<Option<Function>> {
        match &*self.key.lock() {
            Some(key) => Ok(Some(lua.registry_value(key)?)),
            None => Ok(None),
        }
    }
}
