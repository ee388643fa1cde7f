//! Error types for the harness surface.

use thiserror::Error;

/// Errors the harness can hand back to the embedding host.
///
/// Script-side failures never appear here: they are captured into the
/// run's error slot (the host cannot catch an exception across the
/// suspend/resume boundary), so this enum covers only the host-facing
/// entry points themselves.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Lua VM construction or registration error.
    #[error("lua error: {0}")]
    Runtime(#[from] mlua::Error),

    /// Delivered payload failed to parse as a structured document.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The log document could not be encoded.
    #[error("log serialization failed: {0}")]
    LogEncode(#[from] serde_json::Error),
}

/// Flattens an mlua error into the message a host wants to read.
///
/// Callback errors are unwrapped to their cause so the script author's
/// own message survives the trip through the engine.
pub(crate) fn flatten_lua_error(err: &mlua::Error) -> String {
    match err {
        mlua::Error::RuntimeError(message) => message.clone(),
        mlua::Error::CallbackError { cause, .. } => flatten_lua_error(cause),
        mlua::Error::SyntaxError { message, .. } => format!("compile error: {message}"),
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_error_message_survives() {
        let err = mlua::Error::RuntimeError("boom".to_string());
        assert_eq!(flatten_lua_error(&err), "boom");
    }

    #[test]
    fn callback_error_unwraps_to_cause() {
        let err = mlua::Error::CallbackError {
            traceback: "stack traceback: ...".to_string(),
            cause: std::sync::Arc::new(mlua::Error::RuntimeError("inner".to_string())),
        };
        assert_eq!(flatten_lua_error(&err), "inner");
    }

    #[test]
    fn syntax_error_is_prefixed() {
        let err = mlua::Error::SyntaxError {
            message: "unexpected symbol".to_string(),
            incomplete_input: false,
        };
        assert_eq!(flatten_lua_error(&err), "compile error: unexpected symbol");
    }
}
