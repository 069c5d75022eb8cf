// Opaque engine object handles; zero never survives past `last_error::require_handle`.
use std::fmt;
use std::num::NonZeroU32;

use crate::core::engine::RawHandle;

/// Non-owning reference to an immutable engine-resident value object.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct Handle(NonZeroU32);

impl Handle {
    pub(crate) fn new(raw: RawHandle) -> Option<Self> {
        NonZeroU32::new(raw).map(Handle)
    }

    pub fn raw(self) -> RawHandle {
        self.0.get()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle(#{})", self.0)
    }
}
