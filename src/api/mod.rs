//! Purpose: Public Temporal surface (`Instant`, `Duration`, `PlainDate`) over one engine.
//! Exports: Value objects, option bags, units, and the shared error type.
//! Role: Additive-only surface; boundary plumbing stays in `core`.
//! Invariants: Every value object holds a `Temporal` clone and exactly one engine handle.
//! Invariants: Option validation happens here, before any boundary call.

mod duration;
mod input;
mod instant;
mod options;
mod plain_date;
mod temporal;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::config::EngineConfig;
pub use crate::core::engine::{DurationField, Engine};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::units::{RoundingMode, Unit};
pub use duration::{Duration, DurationFields, DurationLike};
pub use instant::{Instant, InstantLike};
pub use options::{CompareOptions, RoundOptions, TotalOptions};
pub use plain_date::{PlainDate, PlainDateFields, PlainDateLike};
pub use temporal::{Now, Temporal};
