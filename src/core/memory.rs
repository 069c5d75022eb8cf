//! Purpose: Memory/Allocation Bridge between host data and engine-owned buffers.
//! Exports: `StagedBuffer`, `take_string`.
//! Role: Sole owner of raw-byte access rules for outgoing and incoming buffers.
//! Invariants: Every staged region is released exactly once, on every exit path (Drop).
//! Invariants: Every packed string is released exactly once, after it has been copied out.
//! Invariants: No view into engine memory is held across a boundary call; reads and writes
//! go through `Engine::read_memory`/`write_memory`, which re-derive the view per access.
use tracing::{trace, warn};

use crate::core::codec::{decode_text, unpack_string};
use crate::core::engine::{Engine, PackedString, Ptr};
use crate::core::error::{Error, ErrorKind};
use crate::core::last_error::{require_packed, take_last_error};

/// Host bytes copied into an engine allocation for the duration of one call.
///
/// The guard borrows the engine, so the only way to reach it while the buffer is live is
/// through [`StagedBuffer::engine`]; the region is freed when the guard drops.
pub struct StagedBuffer<'e> {
    engine: &'e mut dyn Engine,
    ptr: Ptr,
    len: u32,
}

impl<'e> StagedBuffer<'e> {
    pub fn stage(engine: &'e mut dyn Engine, bytes: &[u8]) -> Result<Self, Error> {
        let len = u32::try_from(bytes.len()).map_err(|_| {
            Error::new(ErrorKind::Range).with_message("input exceeds engine address space")
        })?;
        let ptr = engine.alloc(len)?;
        if ptr == 0 {
            return Err(take_last_error(engine));
        }
        let mut staged = Self { engine, ptr, len };
        trace!(ptr, len, "staged buffer");
        // Drop releases the region if the copy fails.
        staged.engine.write_memory(ptr, bytes)?;
        Ok(staged)
    }

    pub fn region(&self) -> (Ptr, u32) {
        (self.ptr, self.len)
    }

    pub fn engine(&mut self) -> &mut dyn Engine {
        &mut *self.engine
    }
}

impl Drop for StagedBuffer<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.engine.free(self.ptr, self.len) {
            warn!(ptr = self.ptr, len = self.len, error = %err, "failed to release staged buffer");
        }
    }
}

/// One-shot read of an engine-owned string: copy out, release, then decode.
pub fn take_string(engine: &mut dyn Engine, packed: PackedString) -> Result<String, Error> {
    let packed = require_packed(engine, packed)?;
    let (ptr, len) = unpack_string(packed);
    trace!(ptr, len, "reading packed string");
    let bytes = engine.read_memory(ptr, len);
    let released = engine.string_free(ptr, len);
    let bytes = bytes?;
    released?;
    decode_text(&bytes)
}
