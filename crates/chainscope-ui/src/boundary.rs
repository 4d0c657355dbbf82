use std::panic::{AssertUnwindSafe, catch_unwind};

/// Runs a render callback, turning both `Err` and a panic into a message.
/// Failures are logged here, once, at warn level.
pub fn guard<R>(what: &str, f: impl FnOnce() -> anyhow::Result<R>) -> Result<R, String> {
    let message = match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(err)) => format!("{err:#}"),
        Err(payload) => {
            if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else {
                "unknown panic".to_string()
            }
        }
    };
    log::warn!("{what} failed: {message}");
    Err(message)
}
