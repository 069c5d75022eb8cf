//! Purpose: `Instant` value object (exact point on the UTC timeline, nanosecond precision).
//! Exports: `Instant`, `InstantLike`.
//! Role: Epoch conversions, duration arithmetic, rounding, comparison and formatting.
//! Invariants: Epoch nanoseconds cross the boundary as two `i64` halves and are rejoined
//! exactly; no `f64` round trip is involved.
//! Invariants: `value_of` always fails with a type error.
use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;
use time::OffsetDateTime;

use crate::api::duration::{Duration, DurationLike};
use crate::api::input::{finite_number, integer_i128, present, rounding_increment_code};
use crate::api::options::RoundOptions;
use crate::api::temporal::Temporal;
use crate::core::codec::{join_i128, split_i128};
use crate::core::engine::{Engine, RawHandle};
use crate::core::error::Error;
use crate::core::handle::Handle;
use crate::core::units::{rounding_mode_code, unit_code};

/// Anything `Instant::from_input` accepts.
#[derive(Clone, Debug)]
pub enum InstantLike {
    Instant(Instant),
    Text(String),
    EpochNanoseconds(i128),
    EpochMilliseconds(f64),
    Json(Value),
}

impl From<Instant> for InstantLike {
    fn from(instant: Instant) -> Self {
        InstantLike::Instant(instant)
    }
}

impl From<&Instant> for InstantLike {
    fn from(instant: &Instant) -> Self {
        InstantLike::Instant(instant.clone())
    }
}

impl From<&str> for InstantLike {
    fn from(text: &str) -> Self {
        InstantLike::Text(text.to_string())
    }
}

impl From<String> for InstantLike {
    fn from(text: String) -> Self {
        InstantLike::Text(text)
    }
}

impl From<i128> for InstantLike {
    fn from(epoch_ns: i128) -> Self {
        InstantLike::EpochNanoseconds(epoch_ns)
    }
}

impl From<Value> for InstantLike {
    fn from(value: Value) -> Self {
        InstantLike::Json(value)
    }
}

#[derive(Clone)]
pub struct Instant {
    temporal: Temporal,
    handle: Handle,
}

impl Instant {
    pub(crate) fn from_handle(temporal: &Temporal, handle: Handle) -> Self {
        Self {
            temporal: temporal.clone(),
            handle,
        }
    }

    pub fn from_epoch_milliseconds(temporal: &Temporal, epoch_ms: f64) -> Result<Self, Error> {
        if !epoch_ms.is_finite() {
            return Err(Error::range("epochMilliseconds must be finite"));
        }
        let handle =
            temporal.construct(|engine| engine.instant_from_epoch_milliseconds(epoch_ms))?;
        Ok(Self::from_handle(temporal, handle))
    }

    pub fn from_epoch_nanoseconds(temporal: &Temporal, epoch_ns: i128) -> Result<Self, Error> {
        let (hi, lo) = split_i128(epoch_ns);
        let handle =
            temporal.construct(|engine| engine.instant_from_epoch_nanoseconds_parts(hi, lo))?;
        Ok(Self::from_handle(temporal, handle))
    }

    pub fn parse(temporal: &Temporal, text: &str) -> Result<Self, Error> {
        let handle = temporal.parse_text(text, "Instant string", |engine, ptr, len| {
            engine.instant_from_utf8(ptr, len)
        })?;
        Ok(Self::from_handle(temporal, handle))
    }

    /// Parses host text held as UTF-16 code units.
    pub fn parse_utf16(temporal: &Temporal, units: &[u16]) -> Result<Self, Error> {
        let handle = temporal.parse_utf16(units, "Instant string", |engine, ptr, len| {
            engine.instant_from_utf8(ptr, len)
        })?;
        Ok(Self::from_handle(temporal, handle))
    }

    /// Converts a `time` timestamp, keeping full nanosecond precision.
    pub fn from_offset_date_time(
        temporal: &Temporal,
        moment: OffsetDateTime,
    ) -> Result<Self, Error> {
        Self::from_epoch_nanoseconds(temporal, moment.unix_timestamp_nanos())
    }

    pub fn from_input(temporal: &Temporal, input: impl Into<InstantLike>) -> Result<Self, Error> {
        match input.into() {
            InstantLike::Instant(instant) => {
                temporal.ensure_same_engine(&instant.temporal)?;
                Ok(instant)
            }
            InstantLike::Text(text) => Self::parse(temporal, &text),
            InstantLike::EpochNanoseconds(epoch_ns) => {
                Self::from_epoch_nanoseconds(temporal, epoch_ns)
            }
            InstantLike::EpochMilliseconds(epoch_ms) => {
                Self::from_epoch_milliseconds(temporal, epoch_ms)
            }
            InstantLike::Json(Value::String(text)) => Self::parse(temporal, &text),
            InstantLike::Json(Value::Object(object)) => {
                if let Some(value) = present(&object, "epochNanoseconds") {
                    let epoch_ns = integer_i128(value, "epochNanoseconds")?;
                    Self::from_epoch_nanoseconds(temporal, epoch_ns)
                } else if let Some(value) = present(&object, "epochMilliseconds") {
                    let epoch_ms = finite_number(value, "epochMilliseconds")?;
                    Self::from_epoch_milliseconds(temporal, epoch_ms)
                } else {
                    Err(Error::type_error(
                        "Instant object needs epochNanoseconds or epochMilliseconds",
                    ))
                }
            }
            InstantLike::Json(_) => Err(Error::type_error(
                "Instant.from expects a string or object",
            )),
        }
    }

    pub fn compare(
        temporal: &Temporal,
        left: impl Into<InstantLike>,
        right: impl Into<InstantLike>,
    ) -> Result<Ordering, Error> {
        let left = Self::from_input(temporal, left)?;
        let right = Self::from_input(temporal, right)?;
        let (lh, rh) = (left.handle.raw(), right.handle.raw());
        temporal
            .with_engine(|engine| engine.instant_compare(lh, rh))
            .map(|ordering| ordering.cmp(&0))
    }

    /// Whole milliseconds since the epoch, floored by the engine.
    pub fn epoch_milliseconds(&self) -> Result<i64, Error> {
        let handle = self.handle.raw();
        self.temporal
            .with_engine(|engine| engine.instant_epoch_milliseconds(handle))
    }

    pub fn epoch_nanoseconds(&self) -> Result<i128, Error> {
        let handle = self.handle.raw();
        self.temporal.with_engine(|engine| {
            let hi = engine.instant_epoch_nanoseconds_hi(handle)?;
            let lo = engine.instant_epoch_nanoseconds_lo(handle)?;
            Ok(join_i128(hi, lo))
        })
    }

    pub fn to_offset_date_time(&self) -> Result<OffsetDateTime, Error> {
        let epoch_ns = self.epoch_nanoseconds()?;
        OffsetDateTime::from_unix_timestamp_nanos(epoch_ns)
            .map_err(|err| Error::range("instant is outside the supported range").with_source(err))
    }

    pub fn add(&self, duration: impl Into<DurationLike>) -> Result<Instant, Error> {
        let duration = Duration::from_input(&self.temporal, duration)?;
        let (ih, dh) = (self.handle.raw(), duration.handle().raw());
        self.derive(|engine| engine.instant_add(ih, dh))
    }

    pub fn subtract(&self, duration: impl Into<DurationLike>) -> Result<Instant, Error> {
        let duration = Duration::from_input(&self.temporal, duration)?;
        let (ih, dh) = (self.handle.raw(), duration.handle().raw());
        self.derive(|engine| engine.instant_subtract(ih, dh))
    }

    /// Largest-unit and relativeTo have no meaning for instants and are ignored.
    pub fn round(&self, options: &RoundOptions) -> Result<Instant, Error> {
        let Some(smallest) = options.smallest_unit else {
            return Err(Error::range("smallestUnit is required"));
        };
        let increment = rounding_increment_code(options.rounding_increment)?;
        let smallest = unit_code(Some(smallest));
        let mode = rounding_mode_code(options.rounding_mode);
        let handle = self.handle.raw();
        self.derive(|engine| engine.instant_round(handle, smallest, mode, increment))
    }

    pub fn equals(&self, other: impl Into<InstantLike>) -> Result<bool, Error> {
        let other = Self::from_input(&self.temporal, other)?;
        let (lh, rh) = (self.handle.raw(), other.handle.raw());
        self.temporal
            .with_engine(|engine| engine.instant_equals(lh, rh))
            .map(|flag| flag == 1)
    }

    pub fn to_iso_string(&self) -> Result<String, Error> {
        let handle = self.handle.raw();
        self.temporal
            .read_string(|engine| engine.instant_to_string(handle))
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        self.to_iso_string()
    }

    pub fn to_locale_string(&self) -> Result<String, Error> {
        self.to_iso_string()
    }

    pub fn value_of(&self) -> Result<f64, Error> {
        Err(Error::type_error(
            "Cannot convert Temporal.Instant to a number",
        ))
    }

    fn derive(
        &self,
        call: impl FnOnce(&mut dyn Engine) -> Result<RawHandle, Error>,
    ) -> Result<Instant, Error> {
        let handle = self.temporal.construct(call)?;
        Ok(Self::from_handle(&self.temporal, handle))
    }
}

impl fmt::Debug for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instant").field(&self.handle).finish()
    }
}
