//! Purpose: The `Temporal` namespace: engine ownership plus the unimplemented surface members.
//! Exports: `Temporal`, `Now`.
//! Role: Serializes every boundary call sequence through one `RefCell` borrow.
//! Invariants: At most one call sequence (stage -> call -> read result/error -> release) is in
//! flight per engine; overlapping attempts fail instead of sharing engine memory.
//! Invariants: `Temporal` is `!Send`; multi-threaded hosts need their own outer lock.
//! Invariants: Unimplemented members fail loudly with `ErrorKind::NotImplemented`.
use std::cell::RefCell;
use std::convert::Infallible;
use std::fmt;
use std::rc::Rc;

use crate::api::instant::Instant;
use crate::api::plain_date::PlainDate;
use crate::core::codec::{encode_text, encode_utf16};
use crate::core::config::EngineConfig;
use crate::core::engine::{Engine, Ptr, RawHandle};
use crate::core::error::{Error, not_implemented};
use crate::core::handle::Handle;
use crate::core::last_error::require_handle;
use crate::core::memory::{StagedBuffer, take_string};
use crate::core::wasm::WasmEngine;

pub(crate) type TextParser = fn(&mut dyn Engine, Ptr, u32) -> Result<RawHandle, Error>;

/// Shared handle to one engine instance; clones refer to the same engine.
#[derive(Clone)]
pub struct Temporal {
    engine: Rc<RefCell<Box<dyn Engine>>>,
}

impl Temporal {
    pub fn new(engine: impl Engine + 'static) -> Self {
        let engine: Box<dyn Engine> = Box::new(engine);
        Self {
            engine: Rc::new(RefCell::new(engine)),
        }
    }

    /// Instantiates the engine from module bytes (for runners that inject the module).
    pub fn from_wasm_bytes(bytes: &[u8]) -> Result<Self, Error> {
        WasmEngine::from_bytes(bytes, true).map(Self::new)
    }

    pub fn load(config: &EngineConfig) -> Result<Self, Error> {
        WasmEngine::load(config).map(Self::new)
    }

    pub fn now(&self) -> Now {
        Now
    }

    pub fn plain_time(&self) -> Result<Infallible, Error> {
        Err(not_implemented("Temporal.PlainTime"))
    }

    pub fn plain_date_time(&self) -> Result<Infallible, Error> {
        Err(not_implemented("Temporal.PlainDateTime"))
    }

    pub fn plain_year_month(&self) -> Result<Infallible, Error> {
        Err(not_implemented("Temporal.PlainYearMonth"))
    }

    pub fn plain_month_day(&self) -> Result<Infallible, Error> {
        Err(not_implemented("Temporal.PlainMonthDay"))
    }

    pub fn zoned_date_time(&self) -> Result<Infallible, Error> {
        Err(not_implemented("Temporal.ZonedDateTime"))
    }

    pub(crate) fn same_engine(&self, other: &Temporal) -> bool {
        Rc::ptr_eq(&self.engine, &other.engine)
    }

    pub(crate) fn with_engine<R>(
        &self,
        call: impl FnOnce(&mut dyn Engine) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let mut engine = self
            .engine
            .try_borrow_mut()
            .map_err(|_| Error::boundary("engine is already executing a call"))?;
        call(&mut **engine)
    }

    /// Runs a constructing call and funnels its result through `require_handle`.
    pub(crate) fn construct(
        &self,
        call: impl FnOnce(&mut dyn Engine) -> Result<RawHandle, Error>,
    ) -> Result<Handle, Error> {
        self.with_engine(|engine| {
            let raw = call(&mut *engine)?;
            require_handle(engine, raw)
        })
    }

    /// Stages `text`, hands it to `parse`, releases the buffer, then checks the handle.
    pub(crate) fn parse_text(
        &self,
        text: &str,
        what: &str,
        parse: TextParser,
    ) -> Result<Handle, Error> {
        if text.is_empty() {
            return Err(Error::range(format!("empty string is not a valid {what}")));
        }
        self.parse_bytes(&encode_text(text), parse)
    }

    /// UTF-16 variant of [`Temporal::parse_text`]; lone surrogates are type errors.
    pub(crate) fn parse_utf16(
        &self,
        units: &[u16],
        what: &str,
        parse: TextParser,
    ) -> Result<Handle, Error> {
        if units.is_empty() {
            return Err(Error::range(format!("empty string is not a valid {what}")));
        }
        self.parse_bytes(&encode_utf16(units)?, parse)
    }

    fn parse_bytes(&self, bytes: &[u8], parse: TextParser) -> Result<Handle, Error> {
        self.with_engine(|engine| {
            let raw = {
                let mut staged = StagedBuffer::stage(&mut *engine, bytes)?;
                let (ptr, len) = staged.region();
                parse(staged.engine(), ptr, len)?
            };
            require_handle(engine, raw)
        })
    }

    pub(crate) fn read_string(
        &self,
        call: impl FnOnce(&mut dyn Engine) -> Result<u64, Error>,
    ) -> Result<String, Error> {
        self.with_engine(|engine| {
            let packed = call(&mut *engine)?;
            take_string(engine, packed)
        })
    }

    pub(crate) fn ensure_same_engine(&self, other: &Temporal) -> Result<(), Error> {
        if self.same_engine(other) {
            Ok(())
        } else {
            Err(Error::type_error(
                "value belongs to a different engine instance",
            ))
        }
    }
}

impl fmt::Debug for Temporal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Temporal").finish_non_exhaustive()
    }
}

/// `Temporal.Now`: the current-moment family, not provided by the engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct Now;

impl Now {
    pub fn instant(&self) -> Result<Instant, Error> {
        Err(not_implemented("Temporal.Now.instant"))
    }

    pub fn plain_date_iso(&self) -> Result<PlainDate, Error> {
        Err(not_implemented("Temporal.Now.plainDateISO"))
    }

    pub fn plain_date_time_iso(&self) -> Result<Infallible, Error> {
        Err(not_implemented("Temporal.Now.plainDateTimeISO"))
    }

    pub fn plain_time_iso(&self) -> Result<Infallible, Error> {
        Err(not_implemented("Temporal.Now.plainTimeISO"))
    }

    pub fn time_zone_id(&self) -> Result<String, Error> {
        Err(not_implemented("Temporal.Now.timeZoneId"))
    }

    pub fn zoned_date_time_iso(&self) -> Result<Infallible, Error> {
        Err(not_implemented("Temporal.Now.zonedDateTimeISO"))
    }
}
