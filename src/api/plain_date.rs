//! Purpose: `PlainDate` value object (ISO calendar date held by the engine).
//! Exports: `PlainDate`, `PlainDateLike`, `PlainDateFields`.
//! Role: Calendar reference point for `relativeTo`; construction, parsing and formatting.
//! Invariants: Wraps exactly one engine handle; never mutated after construction.
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::api::input::{integer_i32, present};
use crate::api::temporal::Temporal;
use crate::core::error::Error;
use crate::core::handle::Handle;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct PlainDateFields {
    pub year: i32,
    pub month: i32,
    pub day: i32,
}

/// Anything `PlainDate::from_input` accepts.
#[derive(Clone, Debug)]
pub enum PlainDateLike {
    Date(PlainDate),
    Text(String),
    Fields(PlainDateFields),
    Json(Value),
}

impl From<PlainDate> for PlainDateLike {
    fn from(date: PlainDate) -> Self {
        PlainDateLike::Date(date)
    }
}

impl From<&PlainDate> for PlainDateLike {
    fn from(date: &PlainDate) -> Self {
        PlainDateLike::Date(date.clone())
    }
}

impl From<&str> for PlainDateLike {
    fn from(text: &str) -> Self {
        PlainDateLike::Text(text.to_string())
    }
}

impl From<String> for PlainDateLike {
    fn from(text: String) -> Self {
        PlainDateLike::Text(text)
    }
}

impl From<PlainDateFields> for PlainDateLike {
    fn from(fields: PlainDateFields) -> Self {
        PlainDateLike::Fields(fields)
    }
}

impl From<Value> for PlainDateLike {
    fn from(value: Value) -> Self {
        PlainDateLike::Json(value)
    }
}

#[derive(Clone)]
pub struct PlainDate {
    temporal: Temporal,
    handle: Handle,
}

impl PlainDate {
    pub(crate) fn from_handle(temporal: &Temporal, handle: Handle) -> Self {
        Self {
            temporal: temporal.clone(),
            handle,
        }
    }

    pub(crate) fn handle(&self) -> Handle {
        self.handle
    }

    pub fn new(temporal: &Temporal, year: i32, month: i32, day: i32) -> Result<Self, Error> {
        let handle = temporal.construct(|engine| engine.plain_date_init(year, month, day))?;
        Ok(Self::from_handle(temporal, handle))
    }

    pub fn parse(temporal: &Temporal, text: &str) -> Result<Self, Error> {
        let handle = temporal.parse_text(text, "PlainDate string", |engine, ptr, len| {
            engine.plain_date_from_utf8(ptr, len)
        })?;
        Ok(Self::from_handle(temporal, handle))
    }

    /// Parses host text held as UTF-16 code units.
    pub fn parse_utf16(temporal: &Temporal, units: &[u16]) -> Result<Self, Error> {
        let handle = temporal.parse_utf16(units, "PlainDate string", |engine, ptr, len| {
            engine.plain_date_from_utf8(ptr, len)
        })?;
        Ok(Self::from_handle(temporal, handle))
    }

    pub fn from_date(temporal: &Temporal, date: time::Date) -> Result<Self, Error> {
        Self::new(temporal, date.year(), u8::from(date.month()) as i32, date.day() as i32)
    }

    pub fn from_input(temporal: &Temporal, input: impl Into<PlainDateLike>) -> Result<Self, Error> {
        match input.into() {
            PlainDateLike::Date(date) => {
                temporal.ensure_same_engine(&date.temporal)?;
                Ok(date)
            }
            PlainDateLike::Text(text) => Self::parse(temporal, &text),
            PlainDateLike::Fields(fields) => {
                Self::new(temporal, fields.year, fields.month, fields.day)
            }
            PlainDateLike::Json(value) => Self::from_json(temporal, &value),
        }
    }

    fn from_json(temporal: &Temporal, value: &Value) -> Result<Self, Error> {
        match value {
            Value::String(text) => Self::parse(temporal, text),
            Value::Object(object) => {
                let field = |name: &str| {
                    integer_i32(present(object, name).unwrap_or(&Value::Null), name)
                };
                let year = field("year")?;
                let month = field("month")?;
                let day = field("day")?;
                Self::new(temporal, year, month, day)
            }
            _ => Err(Error::type_error(
                "PlainDate.from expects a string or object",
            )),
        }
    }

    pub fn to_iso_string(&self) -> Result<String, Error> {
        let handle = self.handle.raw();
        self.temporal
            .read_string(|engine| engine.plain_date_to_string(handle))
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        self.to_iso_string()
    }

    pub fn to_locale_string(&self) -> Result<String, Error> {
        self.to_iso_string()
    }
}

impl fmt::Debug for PlainDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PlainDate").field(&self.handle).finish()
    }
}
