//! Purpose: Error Channel over the engine's sticky last-error slot.
//! Exports: `take_last_error`, `require_handle`, `require_packed`, `require_finite`, `classify`.
//! Role: The only place where failure sentinels (`0` handle, `0` packed string, non-finite
//! number) are turned into `Error` values.
//! Invariants: The slot is cleared after every successful read so a stale message can never
//! be attributed to a later failure.
//! Invariants: Successful results never touch the slot.
//! Notes: Classification matches on message text because the engine exposes no error code.
use tracing::debug;

use crate::core::codec::decode_text;
use crate::core::engine::{Engine, PackedString, RawHandle};
use crate::core::error::{Error, ErrorKind};
use crate::core::handle::Handle;

const FALLBACK_MESSAGE: &str = "temporalz error";

/// Reads, classifies and clears the engine's last error.
///
/// An empty slot (zero pointer or zero length) yields a `Generic` error; the slot is left
/// alone in that case since there is nothing to clear.
pub fn take_last_error(engine: &mut dyn Engine) -> Error {
    match read_last_error(engine) {
        Ok(Some(message)) => {
            let kind = classify(&message);
            debug!(?kind, message = %message, "engine reported failure");
            Error::new(kind).with_message(message)
        }
        Ok(None) => {
            debug!("engine failed without a last-error message");
            Error::new(ErrorKind::Generic).with_message(FALLBACK_MESSAGE)
        }
        Err(err) => err,
    }
}

fn read_last_error(engine: &mut dyn Engine) -> Result<Option<String>, Error> {
    let ptr = engine.last_error_ptr()?;
    let len = engine.last_error_len()?;
    if ptr == 0 || len == 0 {
        return Ok(None);
    }
    let bytes = engine.read_memory(ptr, len);
    engine.last_error_clear()?;
    let message = decode_text(&bytes?)?;
    Ok(Some(message))
}

pub fn classify(message: &str) -> ErrorKind {
    if message.contains("Range") {
        ErrorKind::Range
    } else if message.contains("Type") {
        ErrorKind::Type
    } else {
        ErrorKind::Generic
    }
}

/// Passes a nonzero handle through untouched; a zero handle becomes the engine's error.
pub fn require_handle(engine: &mut dyn Engine, raw: RawHandle) -> Result<Handle, Error> {
    Handle::new(raw).ok_or_else(|| take_last_error(engine))
}

pub fn require_packed(engine: &mut dyn Engine, packed: PackedString) -> Result<PackedString, Error> {
    if packed == 0 {
        return Err(take_last_error(engine));
    }
    Ok(packed)
}

pub fn require_finite(engine: &mut dyn Engine, value: f64) -> Result<f64, Error> {
    if !value.is_finite() {
        return Err(take_last_error(engine));
    }
    Ok(value)
}
