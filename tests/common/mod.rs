//! In-process stand-in for the engine module: growable linear memory, a sticky last-error
//! slot, an allocation ledger and per-export call counters.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime};

use temporalz::api::{DurationField, Engine, Error, ErrorKind};
use temporalz::core::codec::{join_i128, pack_string, split_i128};
use temporalz::core::engine::{PackedString, Ptr, RawHandle};
use temporalz::core::units::UNSPECIFIED;

// Indexed by unit code - 1, nanosecond through week.
const NS_PER_UNIT: [i128; 8] = [
    1,
    1_000,
    1_000_000,
    1_000_000_000,
    60_000_000_000,
    3_600_000_000_000,
    86_400_000_000_000,
    604_800_000_000_000,
];
const NS_MAX_INSTANT: i128 = 8_640_000_000_000_000_000_000;

/// Observable side of a [`FakeEngine`], shared with the test after the engine moves into
/// a `Temporal`.
#[derive(Default)]
pub struct Ledger {
    pub calls: Cell<usize>,
    pub allocs: Cell<usize>,
    pub frees: Cell<usize>,
    pub string_frees: Cell<usize>,
    pub error_reads: Cell<usize>,
    pub error_clears: Cell<usize>,
    pub live_buffers: RefCell<BTreeMap<Ptr, u32>>,
    pub live_strings: RefCell<BTreeMap<Ptr, u32>>,
    pub fail_writes: Cell<bool>,
    pub fail_allocs: Cell<bool>,
    /// Failures leave the last-error slot empty.
    pub drop_errors: Cell<bool>,
    /// Runs once, from inside `instant_to_string`, while the engine is borrowed.
    pub reentry: RefCell<Option<Box<dyn FnMut()>>>,
}

impl Ledger {
    pub fn is_balanced(&self) -> bool {
        self.live_buffers.borrow().is_empty() && self.live_strings.borrow().is_empty()
    }
}

#[derive(Clone, Copy, Debug)]
struct Fields {
    whole: [i64; 8],
    microseconds: f64,
    nanoseconds: f64,
}

impl Fields {
    fn has_calendar(&self) -> bool {
        self.whole[..3].iter().any(|value| *value != 0)
    }

    fn has_days(&self) -> bool {
        self.has_calendar() || self.whole[3] != 0
    }

    fn sign(&self) -> i32 {
        let mut values = self.whole.iter().map(|value| value.signum() as i32).collect::<Vec<_>>();
        values.push(self.microseconds.signum() as i32 * (self.microseconds != 0.0) as i32);
        values.push(self.nanoseconds.signum() as i32 * (self.nanoseconds != 0.0) as i32);
        values.into_iter().find(|sign| *sign != 0).unwrap_or(0)
    }

    fn mixed_signs(&self) -> bool {
        let positive = self.whole.iter().any(|v| *v > 0)
            || self.microseconds > 0.0
            || self.nanoseconds > 0.0;
        let negative = self.whole.iter().any(|v| *v < 0)
            || self.microseconds < 0.0
            || self.nanoseconds < 0.0;
        positive && negative
    }

    /// Days through nanoseconds, with a day counted as 24 hours.
    fn time_ns(&self) -> i128 {
        let whole: i128 = (3..8)
            .map(|index| self.whole[index] as i128 * NS_PER_UNIT[9 - index])
            .sum();
        whole + self.microseconds as i128 * 1_000 + self.nanoseconds as i128
    }

    fn map(&self, op: impl Fn(i64) -> i64, opf: impl Fn(f64) -> f64) -> Self {
        let mut whole = self.whole;
        for value in whole.iter_mut() {
            *value = op(*value);
        }
        Self {
            whole,
            microseconds: opf(self.microseconds),
            nanoseconds: opf(self.nanoseconds),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Object {
    Instant(i128),
    Duration(Fields),
    Date(Date),
}

pub struct FakeEngine {
    memory: Vec<u8>,
    next: u32,
    objects: Vec<Object>,
    error: Option<(Ptr, u32)>,
    ledger: Rc<Ledger>,
}

impl FakeEngine {
    pub fn new() -> (Self, Rc<Ledger>) {
        let ledger = Rc::new(Ledger::default());
        let engine = Self {
            memory: vec![0; 64],
            next: 64,
            objects: Vec::new(),
            error: None,
            ledger: Rc::clone(&ledger),
        };
        (engine, ledger)
    }

    fn tick(&self) {
        self.ledger.calls.set(self.ledger.calls.get() + 1);
    }

    /// Bump allocation; memory grows on demand like a wasm `memory.grow`.
    fn carve(&mut self, len: u32) -> Ptr {
        let ptr = self.next;
        self.next += len.max(1);
        if self.memory.len() < self.next as usize {
            self.memory.resize(self.next as usize * 2, 0);
        }
        ptr
    }

    fn fail(&mut self, message: &str) {
        if self.ledger.drop_errors.get() {
            self.error = None;
            return;
        }
        let bytes = message.as_bytes();
        let ptr = self.carve(bytes.len() as u32);
        self.memory[ptr as usize..ptr as usize + bytes.len()].copy_from_slice(bytes);
        self.error = Some((ptr, bytes.len() as u32));
    }

    fn fail_handle(&mut self, message: &str) -> RawHandle {
        self.fail(message);
        0
    }

    fn store(&mut self, object: Object) -> RawHandle {
        self.objects.push(object);
        self.objects.len() as RawHandle
    }

    fn object(&self, handle: RawHandle) -> Option<Object> {
        (handle as usize)
            .checked_sub(1)
            .and_then(|index| self.objects.get(index).copied())
    }

    fn instant(&self, handle: RawHandle) -> Result<i128, Error> {
        match self.object(handle) {
            Some(Object::Instant(ns)) => Ok(ns),
            _ => Err(Error::boundary(format!("handle {handle} is not an instant"))),
        }
    }

    fn duration(&self, handle: RawHandle) -> Result<Fields, Error> {
        match self.object(handle) {
            Some(Object::Duration(fields)) => Ok(fields),
            _ => Err(Error::boundary(format!("handle {handle} is not a duration"))),
        }
    }

    fn date(&self, handle: RawHandle) -> Result<Date, Error> {
        match self.object(handle) {
            Some(Object::Date(date)) => Ok(date),
            _ => Err(Error::boundary(format!("handle {handle} is not a date"))),
        }
    }

    fn text(&self, ptr: Ptr, len: u32) -> String {
        String::from_utf8_lossy(&self.memory[ptr as usize..(ptr + len) as usize]).into_owned()
    }

    fn emit(&mut self, text: &str) -> PackedString {
        let bytes = text.as_bytes();
        let ptr = self.carve(bytes.len() as u32);
        self.memory[ptr as usize..ptr as usize + bytes.len()].copy_from_slice(bytes);
        self.ledger
            .live_strings
            .borrow_mut()
            .insert(ptr, bytes.len() as u32);
        pack_string(ptr, bytes.len() as u32)
    }

    fn new_duration(&mut self, fields: Fields) -> RawHandle {
        if fields.mixed_signs() {
            return self.fail_handle("RangeError: mixed-sign duration");
        }
        self.store(Object::Duration(fields))
    }

    fn new_instant(&mut self, ns: i128) -> RawHandle {
        if ns.abs() > NS_MAX_INSTANT {
            return self.fail_handle("RangeError: instant out of range");
        }
        self.store(Object::Instant(ns))
    }

    /// Nanoseconds spanned by `fields` when laid out from `start`.
    fn relative_ns(start: Date, fields: &Fields) -> Option<i128> {
        let months = fields.whole[0] * 12 + fields.whole[1];
        let shifted = add_months(start, months)?;
        let end = shifted.checked_add(time::Duration::days(fields.whole[2] * 7))?;
        let days = (end - start).whole_days() as i128;
        Some(days * NS_PER_UNIT[6] + fields.time_ns())
    }

    fn rounded(
        &mut self,
        fields: Fields,
        total_ns: i128,
        smallest: u8,
        largest: u8,
        mode: u8,
        increment: u32,
    ) -> RawHandle {
        let smallest = if smallest == UNSPECIFIED { 1 } else { smallest };
        let default_largest = largest_unit_of(&fields).max(smallest);
        let largest = match largest {
            UNSPECIFIED | 11 => default_largest,
            code => code,
        };
        if smallest > 7 || largest > 7 || smallest > largest {
            return self.fail_handle("RangeError: unsupported rounding units");
        }
        let step = NS_PER_UNIT[smallest as usize - 1] * increment.max(1) as i128;
        let rounded = round_to(total_ns, step, mode);
        self.new_duration(balance(rounded, largest))
    }
}

fn add_months(date: Date, months: i64) -> Option<Date> {
    let index = date.year() as i64 * 12 + (u8::from(date.month()) as i64 - 1) + months;
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = Month::try_from((index.rem_euclid(12) + 1) as u8).ok()?;
    let day = date.day().min(time::util::days_in_month(month, year));
    Date::from_calendar_date(year, month, day).ok()
}

fn largest_unit_of(fields: &Fields) -> u8 {
    if let Some(index) = fields.whole.iter().position(|value| *value != 0) {
        return 10 - index as u8;
    }
    if fields.microseconds != 0.0 { 2 } else { 1 }
}

fn balance(total_ns: i128, largest: u8) -> Fields {
    let sign = total_ns.signum();
    let mut remaining = total_ns.abs();
    let mut whole = [0i64; 8];
    let mut parts = [0i128; 3];
    for unit in (1..=largest.min(7)).rev() {
        let size = NS_PER_UNIT[unit as usize - 1];
        let amount = remaining / size;
        remaining %= size;
        match unit {
            7 => whole[3] = (amount * sign) as i64,
            6 => whole[4] = (amount * sign) as i64,
            5 => whole[5] = (amount * sign) as i64,
            4 => whole[6] = (amount * sign) as i64,
            3 => whole[7] = (amount * sign) as i64,
            2 => parts[1] = amount * sign,
            _ => parts[2] = amount * sign,
        }
    }
    Fields {
        whole,
        microseconds: parts[1] as f64,
        nanoseconds: parts[2] as f64,
    }
}

fn round_to(value: i128, step: i128, mode: u8) -> i128 {
    let floor = value.div_euclid(step) * step;
    let remainder = value - floor;
    if remainder == 0 {
        return value;
    }
    let ceil = floor + step;
    let (toward_zero, away) = if value < 0 { (ceil, floor) } else { (floor, ceil) };
    let twice = remainder * 2;
    match mode {
        1 => ceil,
        2 => floor,
        3 => away,
        4 => toward_zero,
        _ if twice < step => floor,
        _ if twice > step => ceil,
        5 => ceil,
        6 => floor,
        8 => toward_zero,
        9 if (floor / step) % 2 == 0 => floor,
        9 => ceil,
        _ => away,
    }
}

fn format_duration(fields: &Fields) -> String {
    let sign = if fields.sign() < 0 { "-" } else { "" };
    let [years, months, weeks, days, hours, minutes, seconds, millis] =
        fields.whole.map(|value| value.unsigned_abs());
    let mut date = String::new();
    for (value, suffix) in [(years, 'Y'), (months, 'M'), (weeks, 'W'), (days, 'D')] {
        if value != 0 {
            date.push_str(&format!("{value}{suffix}"));
        }
    }
    let sub_second = millis as u128 * 1_000_000
        + fields.microseconds.abs() as u128 * 1_000
        + fields.nanoseconds.abs() as u128;
    let mut time = String::new();
    for (value, suffix) in [(hours, 'H'), (minutes, 'M')] {
        if value != 0 {
            time.push_str(&format!("{value}{suffix}"));
        }
    }
    if seconds != 0 || sub_second != 0 {
        let whole_seconds = seconds as u128 + sub_second / 1_000_000_000;
        let fraction = sub_second % 1_000_000_000;
        if fraction == 0 {
            time.push_str(&format!("{whole_seconds}S"));
        } else {
            let digits = format!("{fraction:09}");
            time.push_str(&format!("{whole_seconds}.{}S", digits.trim_end_matches('0')));
        }
    }
    if date.is_empty() && time.is_empty() {
        return "PT0S".to_string();
    }
    if time.is_empty() {
        format!("{sign}P{date}")
    } else {
        format!("{sign}P{date}T{time}")
    }
}

/// `[-]P[nY][nM][nW][nD][T[nH][nM][nS]]` with integer components only.
fn parse_duration(text: &str) -> Option<Fields> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let rest = rest.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) if !time.is_empty() => (date, Some(time)),
        Some(_) => return None,
        None => (rest, None),
    };
    let mut whole = [0i64; 8];
    let mut seen = false;
    let mut take = |part: &str, slots: &[(char, usize)]| -> Option<()> {
        let mut digits = String::new();
        let mut cursor = 0;
        for ch in part.chars() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                continue;
            }
            let position = slots[cursor..].iter().position(|(suffix, _)| *suffix == ch)?;
            let (_, slot) = slots[cursor + position];
            whole[slot] = digits.parse().ok()?;
            digits.clear();
            cursor += position + 1;
            seen = true;
        }
        digits.is_empty().then_some(())
    };
    take(date_part, &[('Y', 0), ('M', 1), ('W', 2), ('D', 3)])?;
    if let Some(time_part) = time_part {
        take(time_part, &[('H', 4), ('M', 5), ('S', 6)])?;
    }
    if !seen {
        return None;
    }
    if negative {
        for value in whole.iter_mut() {
            *value = -*value;
        }
    }
    Some(Fields {
        whole,
        microseconds: 0.0,
        nanoseconds: 0.0,
    })
}

fn parse_date(text: &str) -> Option<Date> {
    let mut parts = text.splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u8 = parts.next()?.parse().ok()?;
    let day: u8 = parts.next()?.parse().ok()?;
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

impl Engine for FakeEngine {
    fn read_memory(&mut self, ptr: Ptr, len: u32) -> Result<Vec<u8>, Error> {
        self.tick();
        let end = ptr as usize + len as usize;
        self.memory
            .get(ptr as usize..end)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::boundary("read out of bounds"))
    }

    fn write_memory(&mut self, ptr: Ptr, bytes: &[u8]) -> Result<(), Error> {
        self.tick();
        if self.ledger.fail_writes.get() {
            return Err(Error::boundary("write rejected"));
        }
        let end = ptr as usize + bytes.len();
        self.memory
            .get_mut(ptr as usize..end)
            .ok_or_else(|| Error::boundary("write out of bounds"))?
            .copy_from_slice(bytes);
        Ok(())
    }

    fn alloc(&mut self, len: u32) -> Result<Ptr, Error> {
        self.tick();
        self.ledger.allocs.set(self.ledger.allocs.get() + 1);
        if self.ledger.fail_allocs.get() {
            self.fail("OutOfMemory");
            return Ok(0);
        }
        let ptr = self.carve(len);
        self.ledger.live_buffers.borrow_mut().insert(ptr, len);
        Ok(ptr)
    }

    fn free(&mut self, ptr: Ptr, len: u32) -> Result<(), Error> {
        self.tick();
        self.ledger.frees.set(self.ledger.frees.get() + 1);
        match self.ledger.live_buffers.borrow_mut().remove(&ptr) {
            Some(size) if size == len => Ok(()),
            _ => Err(Error::boundary(format!("free of unknown region {ptr}+{len}"))),
        }
    }

    fn string_free(&mut self, ptr: Ptr, len: u32) -> Result<(), Error> {
        self.tick();
        self.ledger.string_frees.set(self.ledger.string_frees.get() + 1);
        match self.ledger.live_strings.borrow_mut().remove(&ptr) {
            Some(size) if size == len => Ok(()),
            _ => Err(Error::boundary(format!("string_free of unknown region {ptr}+{len}"))),
        }
    }

    fn last_error_ptr(&mut self) -> Result<Ptr, Error> {
        self.tick();
        self.ledger.error_reads.set(self.ledger.error_reads.get() + 1);
        Ok(self.error.map_or(0, |(ptr, _)| ptr))
    }

    fn last_error_len(&mut self) -> Result<u32, Error> {
        self.tick();
        Ok(self.error.map_or(0, |(_, len)| len))
    }

    fn last_error_clear(&mut self) -> Result<(), Error> {
        self.tick();
        self.ledger.error_clears.set(self.ledger.error_clears.get() + 1);
        self.error = None;
        Ok(())
    }

    fn instant_from_epoch_milliseconds(&mut self, epoch_ms: f64) -> Result<RawHandle, Error> {
        self.tick();
        if !epoch_ms.is_finite() || epoch_ms.fract() != 0.0 {
            return Ok(self.fail_handle("RangeError: epochMilliseconds must be an integer"));
        }
        Ok(self.new_instant(epoch_ms as i128 * 1_000_000))
    }

    fn instant_from_epoch_nanoseconds_parts(
        &mut self,
        hi: i64,
        lo: i64,
    ) -> Result<RawHandle, Error> {
        self.tick();
        Ok(self.new_instant(join_i128(hi, lo)))
    }

    fn instant_from_utf8(&mut self, ptr: Ptr, len: u32) -> Result<RawHandle, Error> {
        self.tick();
        let text = self.text(ptr, len);
        match OffsetDateTime::parse(&text, &Rfc3339) {
            Ok(moment) => Ok(self.new_instant(moment.unix_timestamp_nanos())),
            Err(_) => Ok(self.fail_handle("RangeError: invalid instant string")),
        }
    }

    fn instant_epoch_milliseconds(&mut self, instant: RawHandle) -> Result<i64, Error> {
        self.tick();
        Ok(self.instant(instant)?.div_euclid(1_000_000) as i64)
    }

    fn instant_epoch_nanoseconds_hi(&mut self, instant: RawHandle) -> Result<i64, Error> {
        self.tick();
        Ok(split_i128(self.instant(instant)?).0)
    }

    fn instant_epoch_nanoseconds_lo(&mut self, instant: RawHandle) -> Result<i64, Error> {
        self.tick();
        Ok(split_i128(self.instant(instant)?).1)
    }

    fn instant_to_string(&mut self, instant: RawHandle) -> Result<PackedString, Error> {
        self.tick();
        let hook = self.ledger.reentry.borrow_mut().take();
        if let Some(mut hook) = hook {
            hook();
        }
        let ns = self.instant(instant)?;
        let text = OffsetDateTime::from_unix_timestamp_nanos(ns)
            .ok()
            .and_then(|moment| moment.format(&Rfc3339).ok());
        match text {
            Some(text) => Ok(self.emit(&text)),
            None => {
                self.fail("RangeError: instant cannot be formatted");
                Ok(0)
            }
        }
    }

    fn instant_add(&mut self, instant: RawHandle, duration: RawHandle) -> Result<RawHandle, Error> {
        self.tick();
        let (ns, fields) = (self.instant(instant)?, self.duration(duration)?);
        if fields.has_days() {
            return Ok(self.fail_handle("RangeError: calendar units not allowed on instants"));
        }
        Ok(self.new_instant(ns + fields.time_ns()))
    }

    fn instant_subtract(
        &mut self,
        instant: RawHandle,
        duration: RawHandle,
    ) -> Result<RawHandle, Error> {
        self.tick();
        let (ns, fields) = (self.instant(instant)?, self.duration(duration)?);
        if fields.has_days() {
            return Ok(self.fail_handle("RangeError: calendar units not allowed on instants"));
        }
        Ok(self.new_instant(ns - fields.time_ns()))
    }

    fn instant_round(
        &mut self,
        instant: RawHandle,
        smallest_unit: u8,
        rounding_mode: u8,
        rounding_increment: u32,
    ) -> Result<RawHandle, Error> {
        self.tick();
        let ns = self.instant(instant)?;
        if !(1..=6).contains(&smallest_unit) {
            return Ok(self.fail_handle("RangeError: invalid smallestUnit for instant"));
        }
        let step = NS_PER_UNIT[smallest_unit as usize - 1] * rounding_increment.max(1) as i128;
        Ok(self.new_instant(round_to(ns, step, rounding_mode)))
    }

    fn instant_equals(&mut self, left: RawHandle, right: RawHandle) -> Result<i32, Error> {
        self.tick();
        Ok((self.instant(left)? == self.instant(right)?) as i32)
    }

    fn instant_compare(&mut self, left: RawHandle, right: RawHandle) -> Result<i32, Error> {
        self.tick();
        Ok(self.instant(left)?.cmp(&self.instant(right)?) as i32)
    }

    fn plain_date_init(&mut self, year: i32, month: i32, day: i32) -> Result<RawHandle, Error> {
        self.tick();
        let date = u8::try_from(month)
            .ok()
            .and_then(|month| Month::try_from(month).ok())
            .zip(u8::try_from(day).ok())
            .and_then(|(month, day)| Date::from_calendar_date(year, month, day).ok());
        match date {
            Some(date) => Ok(self.store(Object::Date(date))),
            None => Ok(self.fail_handle("RangeError: invalid date")),
        }
    }

    fn plain_date_from_utf8(&mut self, ptr: Ptr, len: u32) -> Result<RawHandle, Error> {
        self.tick();
        match parse_date(&self.text(ptr, len)) {
            Some(date) => Ok(self.store(Object::Date(date))),
            None => Ok(self.fail_handle("RangeError: invalid date string")),
        }
    }

    fn plain_date_to_string(&mut self, date: RawHandle) -> Result<PackedString, Error> {
        self.tick();
        let date = self.date(date)?;
        let text = format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            u8::from(date.month()),
            date.day()
        );
        Ok(self.emit(&text))
    }

    fn duration_init(
        &mut self,
        whole: [i64; 8],
        microseconds: f64,
        nanoseconds: f64,
    ) -> Result<RawHandle, Error> {
        self.tick();
        Ok(self.new_duration(Fields {
            whole,
            microseconds,
            nanoseconds,
        }))
    }

    fn duration_from_parts(
        &mut self,
        mask: u32,
        whole: [i64; 8],
        microseconds: f64,
        nanoseconds: f64,
    ) -> Result<RawHandle, Error> {
        self.tick();
        if mask == 0 {
            return Ok(self.fail_handle("TypeError: no duration fields"));
        }
        Ok(self.new_duration(Fields {
            whole,
            microseconds,
            nanoseconds,
        }))
    }

    fn duration_from_utf8(&mut self, ptr: Ptr, len: u32) -> Result<RawHandle, Error> {
        self.tick();
        match parse_duration(&self.text(ptr, len)) {
            Some(fields) => Ok(self.new_duration(fields)),
            None => Ok(self.fail_handle("RangeError: invalid duration string")),
        }
    }

    fn duration_compare(&mut self, left: RawHandle, right: RawHandle) -> Result<i32, Error> {
        self.tick();
        let (left, right) = (self.duration(left)?, self.duration(right)?);
        if left.has_calendar() || right.has_calendar() {
            self.fail("RangeError: calendar units need a reference date");
            return Ok(0);
        }
        Ok(left.time_ns().cmp(&right.time_ns()) as i32)
    }

    fn duration_compare_plain_date(
        &mut self,
        left: RawHandle,
        right: RawHandle,
        relative_to: RawHandle,
    ) -> Result<i32, Error> {
        self.tick();
        let (left, right) = (self.duration(left)?, self.duration(right)?);
        let start = self.date(relative_to)?;
        match (
            Self::relative_ns(start, &left),
            Self::relative_ns(start, &right),
        ) {
            (Some(left), Some(right)) => Ok(left.cmp(&right) as i32),
            _ => {
                self.fail("RangeError: date out of range");
                Ok(0)
            }
        }
    }

    fn duration_add(&mut self, left: RawHandle, right: RawHandle) -> Result<RawHandle, Error> {
        self.tick();
        let (left, right) = (self.duration(left)?, self.duration(right)?);
        if left.has_calendar() || right.has_calendar() {
            return Ok(self.fail_handle("RangeError: calendar units need a reference date"));
        }
        let largest = largest_unit_of(&left).max(largest_unit_of(&right)).min(7);
        Ok(self.new_duration(balance(left.time_ns() + right.time_ns(), largest)))
    }

    fn duration_subtract(
        &mut self,
        left: RawHandle,
        right: RawHandle,
    ) -> Result<RawHandle, Error> {
        self.tick();
        let (left, right) = (self.duration(left)?, self.duration(right)?);
        if left.has_calendar() || right.has_calendar() {
            return Ok(self.fail_handle("RangeError: calendar units need a reference date"));
        }
        let largest = largest_unit_of(&left).max(largest_unit_of(&right)).min(7);
        Ok(self.new_duration(balance(left.time_ns() - right.time_ns(), largest)))
    }

    fn duration_abs(&mut self, duration: RawHandle) -> Result<RawHandle, Error> {
        self.tick();
        let fields = self.duration(duration)?.map(i64::abs, f64::abs);
        Ok(self.new_duration(fields))
    }

    fn duration_negated(&mut self, duration: RawHandle) -> Result<RawHandle, Error> {
        self.tick();
        let fields = self.duration(duration)?.map(|v| -v, |v| -v);
        Ok(self.new_duration(fields))
    }

    fn duration_round(
        &mut self,
        duration: RawHandle,
        smallest_unit: u8,
        largest_unit: u8,
        rounding_mode: u8,
        rounding_increment: u32,
    ) -> Result<RawHandle, Error> {
        self.tick();
        let fields = self.duration(duration)?;
        if fields.has_calendar() {
            return Ok(self.fail_handle("RangeError: calendar units need a reference date"));
        }
        let total = fields.time_ns();
        Ok(self.rounded(
            fields,
            total,
            smallest_unit,
            largest_unit,
            rounding_mode,
            rounding_increment,
        ))
    }

    fn duration_round_plain_date(
        &mut self,
        duration: RawHandle,
        smallest_unit: u8,
        largest_unit: u8,
        rounding_mode: u8,
        rounding_increment: u32,
        relative_to: RawHandle,
    ) -> Result<RawHandle, Error> {
        self.tick();
        let fields = self.duration(duration)?;
        let start = self.date(relative_to)?;
        let Some(total) = Self::relative_ns(start, &fields) else {
            return Ok(self.fail_handle("RangeError: date out of range"));
        };
        let flattened = balance(total, 7);
        Ok(self.rounded(
            flattened,
            total,
            smallest_unit,
            largest_unit,
            rounding_mode,
            rounding_increment,
        ))
    }

    fn duration_total(&mut self, duration: RawHandle, unit: u8) -> Result<f64, Error> {
        self.tick();
        let fields = self.duration(duration)?;
        if fields.has_calendar() || !(1..=8).contains(&unit) {
            self.fail("RangeError: total needs a reference date");
            return Ok(f64::NAN);
        }
        Ok(fields.time_ns() as f64 / NS_PER_UNIT[unit as usize - 1] as f64)
    }

    fn duration_total_plain_date(
        &mut self,
        duration: RawHandle,
        unit: u8,
        relative_to: RawHandle,
    ) -> Result<f64, Error> {
        self.tick();
        let fields = self.duration(duration)?;
        let start = self.date(relative_to)?;
        match Self::relative_ns(start, &fields) {
            Some(total) if (1..=8).contains(&unit) => {
                Ok(total as f64 / NS_PER_UNIT[unit as usize - 1] as f64)
            }
            _ => {
                self.fail("RangeError: unsupported total unit");
                Ok(f64::NAN)
            }
        }
    }

    fn duration_sign(&mut self, duration: RawHandle) -> Result<i32, Error> {
        self.tick();
        Ok(self.duration(duration)?.sign())
    }

    fn duration_blank(&mut self, duration: RawHandle) -> Result<i32, Error> {
        self.tick();
        Ok((self.duration(duration)?.sign() == 0) as i32)
    }

    fn duration_to_string(&mut self, duration: RawHandle) -> Result<PackedString, Error> {
        self.tick();
        let text = format_duration(&self.duration(duration)?);
        Ok(self.emit(&text))
    }

    fn duration_whole_field(
        &mut self,
        duration: RawHandle,
        field: DurationField,
    ) -> Result<i64, Error> {
        self.tick();
        let fields = self.duration(duration)?;
        fields
            .whole
            .get(field as usize)
            .copied()
            .ok_or_else(|| Error::boundary(format!("{} is not a whole field", field.name())))
    }

    fn duration_fraction_field(
        &mut self,
        duration: RawHandle,
        field: DurationField,
    ) -> Result<f64, Error> {
        self.tick();
        let fields = self.duration(duration)?;
        match field {
            DurationField::Microseconds => Ok(fields.microseconds),
            DurationField::Nanoseconds => Ok(fields.nanoseconds),
            other => Err(Error::boundary(format!("{} is not a fractional field", other.name()))),
        }
    }
}

/// Minimal engine module: fixed strings, a bump allocator and a sticky error slot.
pub const TEST_MODULE: &str = r#"
(module
  (import "env" "console" (func $console (param i32 i32)))
  (memory (export "memory") 1)
  (global $heap (mut i32) (i32.const 1024))
  (global $err_ptr (mut i32) (i32.const 0))
  (global $err_len (mut i32) (i32.const 0))
  (data (i32.const 16) "RangeError: invalid date")
  (data (i32.const 64) "1970-01-01T00:00:00Z")
  (data (i32.const 96) "engine ready")

  (func $fail (result i32)
    (global.set $err_ptr (i32.const 16))
    (global.set $err_len (i32.const 24))
    (i32.const 0))

  (func (export "temporalz_alloc") (param $len i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $heap))
    (global.set $heap (i32.add (global.get $heap) (local.get $len)))
    (local.get $ptr))
  (func (export "temporalz_free") (param i32 i32))
  (func (export "temporalz_string_free") (param i32 i32))
  (func (export "temporalz_last_error_ptr") (result i32) (global.get $err_ptr))
  (func (export "temporalz_last_error_len") (result i32) (global.get $err_len))
  (func (export "temporalz_last_error_clear")
    (global.set $err_ptr (i32.const 0))
    (global.set $err_len (i32.const 0)))

  (func (export "temporalz_instant_from_epoch_milliseconds") (param $ms f64) (result i32)
    (if (result i32) (f64.eq (local.get $ms) (f64.const 0))
      (then (i32.const 1))
      (else (call $fail))))
  (func (export "temporalz_instant_epoch_milliseconds") (param i32) (result i64)
    (i64.const 0))
  (func (export "temporalz_instant_epoch_nanoseconds_hi") (param i32) (result i64)
    (i64.const 0))
  (func (export "temporalz_instant_epoch_nanoseconds_lo") (param i32) (result i64)
    (i64.const 0))
  (func (export "temporalz_instant_to_string") (param i32) (result i64)
    (i64.const 274877906964))
  (func (export "temporalz_plain_date_init") (param i32 i32 i32) (result i32)
    (call $fail))
  (func (export "temporalz_plain_date_from_utf8") (param $ptr i32) (param $len i32) (result i32)
    (if (result i32) (i32.eq (i32.load8_u (local.get $ptr)) (i32.const 50))
      (then (i32.const 7))
      (else (call $fail))))
  (func (export "_start")
    (call $console (i32.const 96) (i32.const 12)))
)
"#;

pub fn module_bytes() -> Vec<u8> {
    wat::parse_str(TEST_MODULE).expect("wat")
}

pub fn assert_kind<T: std::fmt::Debug>(result: Result<T, Error>, kind: ErrorKind) -> Error {
    let err = result.expect_err("operation should fail");
    assert_eq!(err.kind(), kind, "unexpected error: {err}");
    err
}
