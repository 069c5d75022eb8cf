// Field-by-field validation of property-bag values before they reach the engine.
// Numbers follow the host's loose numeric coercion: JSON numbers or numeric strings.
use serde_json::Value;

use crate::core::error::Error;

// 2^127 as f64.
const I128_LIMIT: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;

fn coerce_number(value: &Value, name: &str) -> Result<f64, Error> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(number) if number.is_finite() => Ok(number),
        _ => Err(Error::range(format!("{name} must be finite"))),
    }
}

/// Finite number; fractional values allowed.
pub(crate) fn finite_number(value: &Value, name: &str) -> Result<f64, Error> {
    coerce_number(value, name)
}

/// Integral value that fits in `i64`, without going through `f64` when the JSON is exact.
pub(crate) fn integer_i64(value: &Value, name: &str) -> Result<i64, Error> {
    if let Some(exact) = value.as_i64() {
        return Ok(exact);
    }
    if let Some(exact) = value.as_str().and_then(|text| text.trim().parse::<i64>().ok()) {
        return Ok(exact);
    }
    let number = coerce_number(value, name)?;
    if number.fract() != 0.0 {
        return Err(Error::range(format!("{name} must be an integer")));
    }
    if number < i64::MIN as f64 || number >= i64::MAX as f64 {
        return Err(Error::range(format!("{name} is out of range")));
    }
    Ok(number as i64)
}

pub(crate) fn integer_i32(value: &Value, name: &str) -> Result<i32, Error> {
    let wide = integer_i64(value, name)?;
    i32::try_from(wide).map_err(|_| Error::range(format!("{name} is out of range")))
}

/// Exact 128-bit integer from a JSON number or a decimal string.
pub(crate) fn integer_i128(value: &Value, name: &str) -> Result<i128, Error> {
    match value {
        Value::String(text) => text
            .trim()
            .parse::<i128>()
            .map_err(|_| Error::range(format!("{name} must be an integer"))),
        Value::Number(number) => {
            if let Some(exact) = number.as_i64() {
                return Ok(exact as i128);
            }
            if let Some(exact) = number.as_u64() {
                return Ok(exact as i128);
            }
            // Large JSON integers arrive as f64; any integral value within i128 is exact.
            let wide = coerce_number(value, name)?;
            if wide.fract() != 0.0 {
                return Err(Error::range(format!("{name} must be an integer")));
            }
            if wide.abs() >= I128_LIMIT {
                return Err(Error::range(format!("{name} is out of range")));
            }
            Ok(wide as i128)
        }
        _ => Err(Error::range(format!("{name} must be finite"))),
    }
}

/// A property that is absent or `null` counts as not supplied.
pub(crate) fn present<'a>(object: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|value| !value.is_null())
}

/// Validates `roundingIncrement`; `0` tells the engine to use its default.
pub(crate) fn rounding_increment_code(increment: Option<f64>) -> Result<u32, Error> {
    let Some(increment) = increment else {
        return Ok(0);
    };
    if !increment.is_finite()
        || increment.fract() != 0.0
        || increment <= 0.0
        || increment > u32::MAX as f64
    {
        return Err(Error::range("Invalid roundingIncrement"));
    }
    Ok(increment as u32)
}
