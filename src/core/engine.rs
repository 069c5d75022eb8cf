//! Purpose: Describe the engine's flat export table as a Rust trait.
//! Exports: `Engine`, `Ptr`, `RawHandle`, `PackedString`.
//! Role: The only seam between host code and the compiled computation engine.
//! Invariants: Every method is exactly one boundary crossing; no method caches memory views.
//! Invariants: `read_memory`/`write_memory` re-derive the memory view on each call because
//! any other call may grow (and relocate) engine memory.
//! Notes: Return values are raw protocol values; `0` handles and `0` packed strings are
//! failure sentinels interpreted only by `last_error`.
use crate::core::error::Error;

/// Offset into engine linear memory.
pub type Ptr = u32;
/// Engine object handle as it crosses the boundary; `0` means "no object".
pub type RawHandle = u32;
/// Pointer in the high 32 bits, byte length in the low 32 bits; `0` means failure.
pub type PackedString = u64;

pub trait Engine {
    fn read_memory(&mut self, ptr: Ptr, len: u32) -> Result<Vec<u8>, Error>;
    fn write_memory(&mut self, ptr: Ptr, bytes: &[u8]) -> Result<(), Error>;

    fn alloc(&mut self, len: u32) -> Result<Ptr, Error>;
    fn free(&mut self, ptr: Ptr, len: u32) -> Result<(), Error>;
    fn string_free(&mut self, ptr: Ptr, len: u32) -> Result<(), Error>;

    fn last_error_ptr(&mut self) -> Result<Ptr, Error>;
    fn last_error_len(&mut self) -> Result<u32, Error>;
    fn last_error_clear(&mut self) -> Result<(), Error>;

    fn instant_from_epoch_milliseconds(&mut self, epoch_ms: f64) -> Result<RawHandle, Error>;
    fn instant_from_epoch_nanoseconds_parts(&mut self, hi: i64, lo: i64)
    -> Result<RawHandle, Error>;
    fn instant_from_utf8(&mut self, ptr: Ptr, len: u32) -> Result<RawHandle, Error>;
    fn instant_epoch_milliseconds(&mut self, instant: RawHandle) -> Result<i64, Error>;
    fn instant_epoch_nanoseconds_hi(&mut self, instant: RawHandle) -> Result<i64, Error>;
    fn instant_epoch_nanoseconds_lo(&mut self, instant: RawHandle) -> Result<i64, Error>;
    fn instant_to_string(&mut self, instant: RawHandle) -> Result<PackedString, Error>;
    fn instant_add(&mut self, instant: RawHandle, duration: RawHandle)
    -> Result<RawHandle, Error>;
    fn instant_subtract(
        &mut self,
        instant: RawHandle,
        duration: RawHandle,
    ) -> Result<RawHandle, Error>;
    fn instant_round(
        &mut self,
        instant: RawHandle,
        smallest_unit: u8,
        rounding_mode: u8,
        rounding_increment: u32,
    ) -> Result<RawHandle, Error>;
    fn instant_equals(&mut self, left: RawHandle, right: RawHandle) -> Result<i32, Error>;
    fn instant_compare(&mut self, left: RawHandle, right: RawHandle) -> Result<i32, Error>;

    fn plain_date_init(&mut self, year: i32, month: i32, day: i32) -> Result<RawHandle, Error>;
    fn plain_date_from_utf8(&mut self, ptr: Ptr, len: u32) -> Result<RawHandle, Error>;
    fn plain_date_to_string(&mut self, date: RawHandle) -> Result<PackedString, Error>;

    /// Fields in order: years, months, weeks, days, hours, minutes, seconds, milliseconds.
    fn duration_init(
        &mut self,
        whole: [i64; 8],
        microseconds: f64,
        nanoseconds: f64,
    ) -> Result<RawHandle, Error>;
    /// Bit `i` of `mask` is set when field `i` (years..nanoseconds) was supplied.
    fn duration_from_parts(
        &mut self,
        mask: u32,
        whole: [i64; 8],
        microseconds: f64,
        nanoseconds: f64,
    ) -> Result<RawHandle, Error>;
    fn duration_from_utf8(&mut self, ptr: Ptr, len: u32) -> Result<RawHandle, Error>;
    fn duration_compare(&mut self, left: RawHandle, right: RawHandle) -> Result<i32, Error>;
    fn duration_compare_plain_date(
        &mut self,
        left: RawHandle,
        right: RawHandle,
        relative_to: RawHandle,
    ) -> Result<i32, Error>;
    fn duration_add(&mut self, left: RawHandle, right: RawHandle) -> Result<RawHandle, Error>;
    fn duration_subtract(&mut self, left: RawHandle, right: RawHandle)
    -> Result<RawHandle, Error>;
    fn duration_abs(&mut self, duration: RawHandle) -> Result<RawHandle, Error>;
    fn duration_negated(&mut self, duration: RawHandle) -> Result<RawHandle, Error>;
    fn duration_round(
        &mut self,
        duration: RawHandle,
        smallest_unit: u8,
        largest_unit: u8,
        rounding_mode: u8,
        rounding_increment: u32,
    ) -> Result<RawHandle, Error>;
    fn duration_round_plain_date(
        &mut self,
        duration: RawHandle,
        smallest_unit: u8,
        largest_unit: u8,
        rounding_mode: u8,
        rounding_increment: u32,
        relative_to: RawHandle,
    ) -> Result<RawHandle, Error>;
    fn duration_total(&mut self, duration: RawHandle, unit: u8) -> Result<f64, Error>;
    fn duration_total_plain_date(
        &mut self,
        duration: RawHandle,
        unit: u8,
        relative_to: RawHandle,
    ) -> Result<f64, Error>;
    fn duration_sign(&mut self, duration: RawHandle) -> Result<i32, Error>;
    fn duration_blank(&mut self, duration: RawHandle) -> Result<i32, Error>;
    fn duration_to_string(&mut self, duration: RawHandle) -> Result<PackedString, Error>;
    /// Years through milliseconds, exactly as the engine stores them.
    fn duration_whole_field(
        &mut self,
        duration: RawHandle,
        field: DurationField,
    ) -> Result<i64, Error>;
    /// Microseconds and nanoseconds, which the engine keeps as `f64`.
    fn duration_fraction_field(
        &mut self,
        duration: RawHandle,
        field: DurationField,
    ) -> Result<f64, Error>;

    fn duration_field(&mut self, duration: RawHandle, field: DurationField) -> Result<f64, Error> {
        if field.is_fractional() {
            self.duration_fraction_field(duration, field)
        } else {
            self.duration_whole_field(duration, field)
                .map(|value| value as f64)
        }
    }
}

/// Duration components in boundary order; the discriminant is the presence-mask bit.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DurationField {
    Years = 0,
    Months = 1,
    Weeks = 2,
    Days = 3,
    Hours = 4,
    Minutes = 5,
    Seconds = 6,
    Milliseconds = 7,
    Microseconds = 8,
    Nanoseconds = 9,
}

impl DurationField {
    pub const ALL: [DurationField; 10] = [
        DurationField::Years,
        DurationField::Months,
        DurationField::Weeks,
        DurationField::Days,
        DurationField::Hours,
        DurationField::Minutes,
        DurationField::Seconds,
        DurationField::Milliseconds,
        DurationField::Microseconds,
        DurationField::Nanoseconds,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DurationField::Years => "years",
            DurationField::Months => "months",
            DurationField::Weeks => "weeks",
            DurationField::Days => "days",
            DurationField::Hours => "hours",
            DurationField::Minutes => "minutes",
            DurationField::Seconds => "seconds",
            DurationField::Milliseconds => "milliseconds",
            DurationField::Microseconds => "microseconds",
            DurationField::Nanoseconds => "nanoseconds",
        }
    }

    pub fn mask_bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Microseconds and nanoseconds cross the boundary as `f64`, the rest as `i64`.
    pub fn is_fractional(self) -> bool {
        matches!(self, DurationField::Microseconds | DurationField::Nanoseconds)
    }
}
