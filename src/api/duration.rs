//! Purpose: `Duration` value object with arithmetic, rounding, totals and comparison.
//! Exports: `Duration`, `DurationLike`, `DurationFields`.
//! Role: Validates options and calendar-relative requirements, then delegates to the engine.
//! Invariants: Calendar components (years/months/weeks, plus days for round/total) require a
//! `relativeTo` date; the check runs here because the engine cannot report it distinctly.
//! Invariants: Every operation returns a new `Duration`; none mutates `self`.
use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::input::{finite_number, integer_i64, present, rounding_increment_code};
use crate::api::options::{CompareOptions, RoundOptions, TotalOptions};
use crate::api::plain_date::{PlainDate, PlainDateLike};
use crate::api::temporal::Temporal;
use crate::core::engine::{DurationField, Engine, RawHandle};
use crate::core::error::Error;
use crate::core::handle::Handle;
use crate::core::last_error::require_finite;
use crate::core::units::{rounding_mode_code, unit_code};

/// Property bag for durations; `None` means the field was not supplied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DurationFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub months: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weeks: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milliseconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub microseconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nanoseconds: Option<f64>,
}

impl DurationFields {
    fn whole(&self) -> [i64; 8] {
        [
            self.years.unwrap_or(0),
            self.months.unwrap_or(0),
            self.weeks.unwrap_or(0),
            self.days.unwrap_or(0),
            self.hours.unwrap_or(0),
            self.minutes.unwrap_or(0),
            self.seconds.unwrap_or(0),
            self.milliseconds.unwrap_or(0),
        ]
    }

    fn mask(&self) -> u32 {
        let supplied = [
            self.years.is_some(),
            self.months.is_some(),
            self.weeks.is_some(),
            self.days.is_some(),
            self.hours.is_some(),
            self.minutes.is_some(),
            self.seconds.is_some(),
            self.milliseconds.is_some(),
            self.microseconds.is_some(),
            self.nanoseconds.is_some(),
        ];
        DurationField::ALL
            .iter()
            .zip(supplied)
            .filter(|(_, supplied)| *supplied)
            .fold(0, |mask, (field, _)| mask | field.mask_bit())
    }

    fn from_json(object: &Map<String, Value>) -> Result<Self, Error> {
        let whole = |field: DurationField| {
            present(object, field.name())
                .map(|value| integer_i64(value, field.name()))
                .transpose()
        };
        let fractional = |field: DurationField| {
            present(object, field.name())
                .map(|value| finite_number(value, field.name()))
                .transpose()
        };
        Ok(Self {
            years: whole(DurationField::Years)?,
            months: whole(DurationField::Months)?,
            weeks: whole(DurationField::Weeks)?,
            days: whole(DurationField::Days)?,
            hours: whole(DurationField::Hours)?,
            minutes: whole(DurationField::Minutes)?,
            seconds: whole(DurationField::Seconds)?,
            milliseconds: whole(DurationField::Milliseconds)?,
            microseconds: fractional(DurationField::Microseconds)?,
            nanoseconds: fractional(DurationField::Nanoseconds)?,
        })
    }
}

/// Anything `Duration::from_input` accepts.
#[derive(Clone, Debug)]
pub enum DurationLike {
    Duration(Duration),
    Text(String),
    Fields(DurationFields),
    Json(Value),
}

impl From<Duration> for DurationLike {
    fn from(duration: Duration) -> Self {
        DurationLike::Duration(duration)
    }
}

impl From<&Duration> for DurationLike {
    fn from(duration: &Duration) -> Self {
        DurationLike::Duration(duration.clone())
    }
}

impl From<&str> for DurationLike {
    fn from(text: &str) -> Self {
        DurationLike::Text(text.to_string())
    }
}

impl From<String> for DurationLike {
    fn from(text: String) -> Self {
        DurationLike::Text(text)
    }
}

impl From<DurationFields> for DurationLike {
    fn from(fields: DurationFields) -> Self {
        DurationLike::Fields(fields)
    }
}

impl From<Value> for DurationLike {
    fn from(value: Value) -> Self {
        DurationLike::Json(value)
    }
}

#[derive(Clone)]
pub struct Duration {
    temporal: Temporal,
    handle: Handle,
}

impl Duration {
    pub(crate) fn from_handle(temporal: &Temporal, handle: Handle) -> Self {
        Self {
            temporal: temporal.clone(),
            handle,
        }
    }

    pub(crate) fn handle(&self) -> Handle {
        self.handle
    }

    /// Positional constructor: every omitted field is zero.
    pub fn new(temporal: &Temporal, fields: &DurationFields) -> Result<Self, Error> {
        let whole = fields.whole();
        let microseconds = fields.microseconds.unwrap_or(0.0);
        let nanoseconds = fields.nanoseconds.unwrap_or(0.0);
        check_fraction(microseconds, "microseconds")?;
        check_fraction(nanoseconds, "nanoseconds")?;
        let handle =
            temporal.construct(|engine| engine.duration_init(whole, microseconds, nanoseconds))?;
        Ok(Self::from_handle(temporal, handle))
    }

    pub fn parse(temporal: &Temporal, text: &str) -> Result<Self, Error> {
        let handle = temporal.parse_text(text, "Duration string", |engine, ptr, len| {
            engine.duration_from_utf8(ptr, len)
        })?;
        Ok(Self::from_handle(temporal, handle))
    }

    /// Parses host text held as UTF-16 code units.
    pub fn parse_utf16(temporal: &Temporal, units: &[u16]) -> Result<Self, Error> {
        let handle = temporal.parse_utf16(units, "Duration string", |engine, ptr, len| {
            engine.duration_from_utf8(ptr, len)
        })?;
        Ok(Self::from_handle(temporal, handle))
    }

    pub fn from_input(temporal: &Temporal, input: impl Into<DurationLike>) -> Result<Self, Error> {
        match input.into() {
            DurationLike::Duration(duration) => {
                temporal.ensure_same_engine(&duration.temporal)?;
                Ok(duration)
            }
            DurationLike::Text(text) => Self::parse(temporal, &text),
            DurationLike::Fields(fields) => Self::from_fields(temporal, &fields),
            DurationLike::Json(Value::String(text)) => Self::parse(temporal, &text),
            DurationLike::Json(Value::Object(object)) => {
                Self::from_fields(temporal, &DurationFields::from_json(&object)?)
            }
            DurationLike::Json(_) => Err(Error::type_error(
                "Duration.from expects a string or object",
            )),
        }
    }

    fn from_fields(temporal: &Temporal, fields: &DurationFields) -> Result<Self, Error> {
        let mask = fields.mask();
        if mask == 0 {
            return Err(Error::type_error(
                "duration object must have at least one duration property",
            ));
        }
        let whole = fields.whole();
        let microseconds = fields.microseconds.unwrap_or(0.0);
        let nanoseconds = fields.nanoseconds.unwrap_or(0.0);
        check_fraction(microseconds, "microseconds")?;
        check_fraction(nanoseconds, "nanoseconds")?;
        let handle = temporal.construct(|engine| {
            engine.duration_from_parts(mask, whole, microseconds, nanoseconds)
        })?;
        Ok(Self::from_handle(temporal, handle))
    }

    pub fn compare(
        temporal: &Temporal,
        left: impl Into<DurationLike>,
        right: impl Into<DurationLike>,
        options: &CompareOptions,
    ) -> Result<Ordering, Error> {
        let left = Self::from_input(temporal, left)?;
        let right = Self::from_input(temporal, right)?;
        let relative_to = resolve_relative_to(temporal, options.relative_to.as_ref())?;
        let (lh, rh) = (left.handle.raw(), right.handle.raw());
        let ordering = match relative_to {
            Some(date) => {
                let dh = date.handle().raw();
                temporal.with_engine(|engine| engine.duration_compare_plain_date(lh, rh, dh))?
            }
            None => {
                if left.has_year_month_week()? || right.has_year_month_week()? {
                    return Err(Error::range("relativeTo is required for calendar units"));
                }
                temporal.with_engine(|engine| engine.duration_compare(lh, rh))?
            }
        };
        Ok(ordering.cmp(&0))
    }

    pub fn add(&self, other: impl Into<DurationLike>) -> Result<Duration, Error> {
        let other = Self::from_input(&self.temporal, other)?;
        let (lh, rh) = (self.handle.raw(), other.handle.raw());
        self.derive(|engine| engine.duration_add(lh, rh))
    }

    pub fn subtract(&self, other: impl Into<DurationLike>) -> Result<Duration, Error> {
        let other = Self::from_input(&self.temporal, other)?;
        let (lh, rh) = (self.handle.raw(), other.handle.raw());
        self.derive(|engine| engine.duration_subtract(lh, rh))
    }

    pub fn abs(&self) -> Result<Duration, Error> {
        let handle = self.handle.raw();
        self.derive(|engine| engine.duration_abs(handle))
    }

    pub fn negated(&self) -> Result<Duration, Error> {
        let handle = self.handle.raw();
        self.derive(|engine| engine.duration_negated(handle))
    }

    pub fn round(&self, options: &RoundOptions) -> Result<Duration, Error> {
        if options.smallest_unit.is_none() && options.largest_unit.is_none() {
            return Err(Error::range(
                "at least one of smallestUnit or largestUnit is required",
            ));
        }
        let increment = rounding_increment_code(options.rounding_increment)?;
        let smallest = unit_code(options.smallest_unit);
        let largest = unit_code(options.largest_unit);
        let mode = rounding_mode_code(options.rounding_mode);
        let relative_to = resolve_relative_to(&self.temporal, options.relative_to.as_ref())?;
        let handle = self.handle.raw();
        match relative_to {
            Some(date) => {
                let dh = date.handle().raw();
                self.derive(|engine| {
                    engine.duration_round_plain_date(handle, smallest, largest, mode, increment, dh)
                })
            }
            None => {
                self.require_no_calendar_units()?;
                self.derive(|engine| {
                    engine.duration_round(handle, smallest, largest, mode, increment)
                })
            }
        }
    }

    pub fn total(&self, options: &TotalOptions) -> Result<f64, Error> {
        let unit = options
            .unit
            .ok_or_else(|| Error::range("unit is required"))?;
        let relative_to = resolve_relative_to(&self.temporal, options.relative_to.as_ref())?;
        let handle = self.handle.raw();
        match relative_to {
            Some(date) => {
                let dh = date.handle().raw();
                self.temporal.with_engine(|engine| {
                    let total = engine.duration_total_plain_date(handle, unit.code(), dh)?;
                    require_finite(engine, total)
                })
            }
            None => {
                self.require_no_calendar_units()?;
                self.temporal.with_engine(|engine| {
                    let total = engine.duration_total(handle, unit.code())?;
                    require_finite(engine, total)
                })
            }
        }
    }

    pub fn sign(&self) -> Result<i32, Error> {
        let handle = self.handle.raw();
        self.temporal
            .with_engine(|engine| engine.duration_sign(handle))
            .map(|sign| sign.signum())
    }

    pub fn is_blank(&self) -> Result<bool, Error> {
        let handle = self.handle.raw();
        self.temporal
            .with_engine(|engine| engine.duration_blank(handle))
            .map(|flag| flag == 1)
    }

    pub fn field(&self, field: DurationField) -> Result<f64, Error> {
        let handle = self.handle.raw();
        self.temporal
            .with_engine(|engine| engine.duration_field(handle, field))
    }

    pub fn years(&self) -> Result<f64, Error> {
        self.field(DurationField::Years)
    }

    pub fn months(&self) -> Result<f64, Error> {
        self.field(DurationField::Months)
    }

    pub fn weeks(&self) -> Result<f64, Error> {
        self.field(DurationField::Weeks)
    }

    pub fn days(&self) -> Result<f64, Error> {
        self.field(DurationField::Days)
    }

    pub fn hours(&self) -> Result<f64, Error> {
        self.field(DurationField::Hours)
    }

    pub fn minutes(&self) -> Result<f64, Error> {
        self.field(DurationField::Minutes)
    }

    pub fn seconds(&self) -> Result<f64, Error> {
        self.field(DurationField::Seconds)
    }

    pub fn milliseconds(&self) -> Result<f64, Error> {
        self.field(DurationField::Milliseconds)
    }

    pub fn microseconds(&self) -> Result<f64, Error> {
        self.field(DurationField::Microseconds)
    }

    pub fn nanoseconds(&self) -> Result<f64, Error> {
        self.field(DurationField::Nanoseconds)
    }

    /// Snapshot of every component, all marked as supplied.
    pub fn to_fields(&self) -> Result<DurationFields, Error> {
        let handle = self.handle.raw();
        self.temporal.with_engine(|engine| {
            let mut whole = [0i64; 8];
            for (slot, field) in whole.iter_mut().zip(DurationField::ALL) {
                *slot = engine.duration_whole_field(handle, field)?;
            }
            let microseconds =
                engine.duration_fraction_field(handle, DurationField::Microseconds)?;
            let nanoseconds = engine.duration_fraction_field(handle, DurationField::Nanoseconds)?;
            let [years, months, weeks, days, hours, minutes, seconds, milliseconds] =
                whole.map(Some);
            Ok(DurationFields {
                years,
                months,
                weeks,
                days,
                hours,
                minutes,
                seconds,
                milliseconds,
                microseconds: Some(microseconds),
                nanoseconds: Some(nanoseconds),
            })
        })
    }

    pub fn to_iso_string(&self) -> Result<String, Error> {
        let handle = self.handle.raw();
        self.temporal
            .read_string(|engine| engine.duration_to_string(handle))
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        self.to_iso_string()
    }

    pub fn to_locale_string(&self) -> Result<String, Error> {
        self.to_iso_string()
    }

    /// Numeric coercion is always refused.
    pub fn value_of(&self) -> Result<f64, Error> {
        Err(Error::type_error(
            "Cannot convert Temporal.Duration to a number",
        ))
    }

    fn derive(
        &self,
        call: impl FnOnce(&mut dyn Engine) -> Result<RawHandle, Error>,
    ) -> Result<Duration, Error> {
        let handle = self.temporal.construct(call)?;
        Ok(Self::from_handle(&self.temporal, handle))
    }

    fn has_year_month_week(&self) -> Result<bool, Error> {
        Ok(self.years()? != 0.0 || self.months()? != 0.0 || self.weeks()? != 0.0)
    }

    fn require_no_calendar_units(&self) -> Result<(), Error> {
        if self.has_year_month_week()? || self.days()? != 0.0 {
            return Err(Error::range("relativeTo is required for calendar units"));
        }
        Ok(())
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Duration").field(&self.handle).finish()
    }
}

fn check_fraction(value: f64, name: &str) -> Result<(), Error> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::range(format!("{name} must be finite")))
    }
}

fn resolve_relative_to(
    temporal: &Temporal,
    relative_to: Option<&PlainDateLike>,
) -> Result<Option<PlainDate>, Error> {
    relative_to
        .map(|like| PlainDate::from_input(temporal, like.clone()))
        .transpose()
}
