use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

use crate::process::ObjectId;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid cell size {0}: must be a positive, finite number of world units")]
    InvalidCellSize(f32),
    #[error("invalid frame rate {0}: must be at least 1 fps")]
    InvalidFrameRate(u32),
    #[error("camera viewport {width}x{height} must have a non-zero size")]
    MissingCamera { width: u32, height: u32 },
    #[error("pointer slot count must be between 1 and {max}, got {got}")]
    InvalidPointerSlots { got: usize, max: usize },
    #[error("texture '{path}' expects {expected} bytes of pixel data, got {actual}")]
    InvalidPixelData {
        path: String,
        expected: usize,
        actual: usize,
    },
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Error type returned by object hooks. Any error works; the engine only logs it.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

pub type HookResult = Result<(), HookError>;

/// Runs one hook call. Errors are logged at `warn`, panics caught and logged at
/// `error`; either way the caller gets `None` and the tick carries on.
pub(crate) fn isolate<T>(
    object: ObjectId,
    hook: &str,
    call: impl FnOnce() -> Result<T, HookError>,
) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            log::warn!("[ENGINE] {} hook of object {:?} failed: {}", hook, object, err);
            None
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("[ENGINE] {} hook of object {:?} panicked: {}", hook, object, message);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolate_passes_values_through() {
        assert_eq!(isolate(ObjectId(1), "update", || Ok(3)), Some(3));
    }

    #[test]
    fn isolate_swallows_errors_and_panics() {
        let failed: Option<()> = isolate(ObjectId(1), "update", || Err("boom".into()));
        assert!(failed.is_none());

        let panicked: Option<()> = isolate(ObjectId(2), "on_collision", || panic!("kaboom"));
        assert!(panicked.is_none());
    }
}
