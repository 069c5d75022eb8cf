//! Purpose: Wide-value and text codecs for values the boundary cannot carry natively.
//! Exports: `split_i128`, `join_i128`, `pack_string`, `unpack_string`, `encode_text`,
//! `decode_text`, `encode_utf16`, `decode_utf16`.
//! Role: Bit-exact conversions between host values and engine primitives.
//! Invariants: `join_i128(split_i128(v)) == v` for every `i128`; no rounding anywhere.
//! Invariants: Text crosses the boundary as UTF-8; UTF-16 host text is recombined into
//! scalar values before encoding and split back into surrogate pairs on decode.
use crate::core::engine::{PackedString, Ptr};
use crate::core::error::{Error, ErrorKind};

const LOW_MASK: i128 = (1 << 64) - 1;

/// Splits a 128-bit value into (high, low) 64-bit halves.
pub fn split_i128(value: i128) -> (i64, i64) {
    let hi = (value >> 64) as i64;
    let lo = (value & LOW_MASK) as u64 as i64;
    (hi, lo)
}

/// Inverse of [`split_i128`]: `(hi << 64) | (lo & mask)`.
pub fn join_i128(hi: i64, lo: i64) -> i128 {
    ((hi as i128) << 64) | ((lo as u64 as i128) & LOW_MASK)
}

pub fn pack_string(ptr: Ptr, len: u32) -> PackedString {
    ((ptr as u64) << 32) | len as u64
}

pub fn unpack_string(packed: PackedString) -> (Ptr, u32) {
    ((packed >> 32) as Ptr, (packed & 0xffff_ffff) as u32)
}

/// Variable-length 1-4 byte encoding of each scalar value.
pub fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut scratch = [0u8; 4];
    for ch in text.chars() {
        out.extend_from_slice(ch.encode_utf8(&mut scratch).as_bytes());
    }
    out
}

pub fn decode_text(bytes: &[u8]) -> Result<String, Error> {
    String::from_utf8(bytes.to_vec()).map_err(|err| {
        Error::new(ErrorKind::Boundary)
            .with_message("engine returned invalid utf-8")
            .with_source(err)
    })
}

/// Encodes UTF-16 code units, recombining surrogate pairs into one 4-byte sequence.
pub fn encode_utf16(units: &[u16]) -> Result<Vec<u8>, Error> {
    let mut out = Vec::with_capacity(units.len());
    let mut scratch = [0u8; 4];
    for decoded in char::decode_utf16(units.iter().copied()) {
        let ch = decoded.map_err(|err| {
            Error::type_error(format!(
                "text contains an unpaired surrogate 0x{:04x}",
                err.unpaired_surrogate()
            ))
        })?;
        out.extend_from_slice(ch.encode_utf8(&mut scratch).as_bytes());
    }
    Ok(out)
}

/// Decodes engine bytes into UTF-16 code units, emitting surrogate pairs above 0xFFFF.
pub fn decode_utf16(bytes: &[u8]) -> Result<Vec<u16>, Error> {
    Ok(decode_text(bytes)?.encode_utf16().collect())
}
