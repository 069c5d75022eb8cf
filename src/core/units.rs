//! Purpose: Enumeration Codec for time units and rounding modes.
//! Exports: `Unit`, `RoundingMode`, `UNSPECIFIED`, `unit_code`, `rounding_mode_code`.
//! Role: Turn option labels into stable integer codes before anything reaches the engine.
//! Invariants: Codes are 1..N and unique per enumeration; 255 means "caller omitted it".
//! Invariants: Unknown labels fail with a range error; the engine never sees a bad code.
//! Notes: Encode-only; the engine never sends these codes back.
use std::fmt;
use std::str::FromStr;

use crate::core::error::Error;

pub const UNSPECIFIED: u8 = 255;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Unit {
    Nanosecond = 1,
    Microsecond = 2,
    Millisecond = 3,
    Second = 4,
    Minute = 5,
    Hour = 6,
    Day = 7,
    Week = 8,
    Month = 9,
    Year = 10,
    Auto = 11,
}

impl Unit {
    pub const ALL: [Unit; 11] = [
        Unit::Nanosecond,
        Unit::Microsecond,
        Unit::Millisecond,
        Unit::Second,
        Unit::Minute,
        Unit::Hour,
        Unit::Day,
        Unit::Week,
        Unit::Month,
        Unit::Year,
        Unit::Auto,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Unit::Nanosecond => "nanosecond",
            Unit::Microsecond => "microsecond",
            Unit::Millisecond => "millisecond",
            Unit::Second => "second",
            Unit::Minute => "minute",
            Unit::Hour => "hour",
            Unit::Day => "day",
            Unit::Week => "week",
            Unit::Month => "month",
            Unit::Year => "year",
            Unit::Auto => "auto",
        }
    }

    /// Parses a singular or plural label, naming `option` in the error.
    pub fn parse_option(label: &str, option: &str) -> Result<Self, Error> {
        let singular = label
            .strip_suffix('s')
            .filter(|stem| *stem != "auto")
            .unwrap_or(label);
        Unit::ALL
            .into_iter()
            .find(|unit| unit.label() == singular)
            .ok_or_else(|| Error::range(format!("Invalid {option}: {label}")))
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Unit::parse_option(label, "unit")
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RoundingMode {
    Ceil = 1,
    Floor = 2,
    Expand = 3,
    Trunc = 4,
    HalfCeil = 5,
    HalfFloor = 6,
    HalfExpand = 7,
    HalfTrunc = 8,
    HalfEven = 9,
}

impl RoundingMode {
    pub const ALL: [RoundingMode; 9] = [
        RoundingMode::Ceil,
        RoundingMode::Floor,
        RoundingMode::Expand,
        RoundingMode::Trunc,
        RoundingMode::HalfCeil,
        RoundingMode::HalfFloor,
        RoundingMode::HalfExpand,
        RoundingMode::HalfTrunc,
        RoundingMode::HalfEven,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            RoundingMode::Ceil => "ceil",
            RoundingMode::Floor => "floor",
            RoundingMode::Expand => "expand",
            RoundingMode::Trunc => "trunc",
            RoundingMode::HalfCeil => "halfCeil",
            RoundingMode::HalfFloor => "halfFloor",
            RoundingMode::HalfExpand => "halfExpand",
            RoundingMode::HalfTrunc => "halfTrunc",
            RoundingMode::HalfEven => "halfEven",
        }
    }
}

impl FromStr for RoundingMode {
    type Err = Error;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        RoundingMode::ALL
            .into_iter()
            .find(|mode| mode.label() == label)
            .ok_or_else(|| Error::range(format!("Invalid roundingMode: {label}")))
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn unit_code(unit: Option<Unit>) -> u8 {
    unit.map_or(UNSPECIFIED, Unit::code)
}

pub fn rounding_mode_code(mode: Option<RoundingMode>) -> u8 {
    mode.map_or(UNSPECIFIED, RoundingMode::code)
}
