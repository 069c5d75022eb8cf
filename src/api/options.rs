//! Purpose: Typed option bags for round/total/compare, with JSON parsing in the standard's
//! vocabulary (`smallestUnit`, `largestUnit`, `roundingMode`, `roundingIncrement`, `relativeTo`).
//! Exports: `RoundOptions`, `TotalOptions`, `CompareOptions`.
//! Role: Validate labels and shapes before any engine call is attempted.
//! Invariants: Unknown labels are range errors; non-object options are type errors.
//! Invariants: A string in place of an options object names the primary unit.
use serde_json::{Map, Value};

use crate::api::input::{finite_number, present};
use crate::api::plain_date::PlainDateLike;
use crate::core::error::Error;
use crate::core::units::{RoundingMode, Unit};

#[derive(Clone, Debug, Default)]
pub struct RoundOptions {
    pub smallest_unit: Option<Unit>,
    pub largest_unit: Option<Unit>,
    pub rounding_mode: Option<RoundingMode>,
    pub rounding_increment: Option<f64>,
    pub relative_to: Option<PlainDateLike>,
}

impl RoundOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_smallest_unit(mut self, unit: Unit) -> Self {
        self.smallest_unit = Some(unit);
        self
    }

    pub fn with_largest_unit(mut self, unit: Unit) -> Self {
        self.largest_unit = Some(unit);
        self
    }

    pub fn with_rounding_mode(mut self, mode: RoundingMode) -> Self {
        self.rounding_mode = Some(mode);
        self
    }

    pub fn with_rounding_increment(mut self, increment: f64) -> Self {
        self.rounding_increment = Some(increment);
        self
    }

    pub fn with_relative_to(mut self, relative_to: impl Into<PlainDateLike>) -> Self {
        self.relative_to = Some(relative_to.into());
        self
    }

    pub fn from_json(value: &Value) -> Result<Self, Error> {
        match value {
            Value::String(label) => Ok(Self::new()
                .with_smallest_unit(Unit::parse_option(label, "smallestUnit")?)),
            Value::Object(object) => Ok(Self {
                smallest_unit: unit_option(object, "smallestUnit")?,
                largest_unit: unit_option(object, "largestUnit")?,
                rounding_mode: rounding_mode_option(object)?,
                rounding_increment: increment_option(object)?,
                relative_to: relative_to_option(object)?,
            }),
            _ => Err(Error::type_error("round options must be an object")),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TotalOptions {
    pub unit: Option<Unit>,
    pub relative_to: Option<PlainDateLike>,
}

impl TotalOptions {
    pub fn new(unit: Unit) -> Self {
        Self {
            unit: Some(unit),
            relative_to: None,
        }
    }

    pub fn with_relative_to(mut self, relative_to: impl Into<PlainDateLike>) -> Self {
        self.relative_to = Some(relative_to.into());
        self
    }

    pub fn from_json(value: &Value) -> Result<Self, Error> {
        match value {
            Value::String(label) => Ok(Self::new(Unit::parse_option(label, "unit")?)),
            Value::Object(object) => Ok(Self {
                unit: unit_option(object, "unit")?,
                relative_to: relative_to_option(object)?,
            }),
            _ => Err(Error::type_error("total options must be an object")),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CompareOptions {
    pub relative_to: Option<PlainDateLike>,
}

impl CompareOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relative_to(mut self, relative_to: impl Into<PlainDateLike>) -> Self {
        self.relative_to = Some(relative_to.into());
        self
    }

    /// `null` means "no options"; anything other than an object is a type error.
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(object) => Ok(Self {
                relative_to: relative_to_option(object)?,
            }),
            _ => Err(Error::type_error("options must be an object")),
        }
    }
}

fn unit_option(object: &Map<String, Value>, key: &str) -> Result<Option<Unit>, Error> {
    match present(object, key) {
        None => Ok(None),
        Some(Value::String(label)) => Unit::parse_option(label, key).map(Some),
        Some(_) => Err(Error::range(format!("Invalid {key}"))),
    }
}

fn rounding_mode_option(object: &Map<String, Value>) -> Result<Option<RoundingMode>, Error> {
    match present(object, "roundingMode") {
        None => Ok(None),
        Some(Value::String(label)) => label.parse().map(Some),
        Some(_) => Err(Error::range("Invalid roundingMode")),
    }
}

fn increment_option(object: &Map<String, Value>) -> Result<Option<f64>, Error> {
    object
        .get("roundingIncrement")
        .map(|value| {
            finite_number(value, "roundingIncrement")
                .map_err(|_| Error::range("Invalid roundingIncrement"))
        })
        .transpose()
}

fn relative_to_option(object: &Map<String, Value>) -> Result<Option<PlainDateLike>, Error> {
    match object.get("relativeTo") {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(PlainDateLike::Text(text.clone()))),
        Some(value @ Value::Object(_)) => Ok(Some(PlainDateLike::Json(value.clone()))),
        Some(_) => Err(Error::type_error("Invalid relativeTo")),
    }
}
