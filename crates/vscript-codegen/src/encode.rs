//! Binary encoding primitives.

use crate::types::SectionId;

/// Append `value` as signed LEB128.
///
/// Seven bits per byte, least significant group first. Emission stops once
/// the remaining value is all sign bits and the sign bit of the last byte
/// agrees with it.
pub fn write_leb128(buf: &mut Vec<u8>, mut value: i64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if !done {
            byte |= 0x80;
        }
        buf.push(byte);
        if done {
            return;
        }
    }
}

/// Append an index or length. Encoded through [`write_leb128`], so values
/// with bit 6 set in their top group take one extra byte; decoders accept
/// both forms.
pub fn write_var_u32(buf: &mut Vec<u8>, value: u32) {
    write_leb128(buf, i64::from(value));
}

/// Decode a signed LEB128 value from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed, or `None` when the
/// input ends mid-value or runs past 64 bits.
pub fn read_leb128(bytes: &[u8]) -> Option<(i64, usize)> {
    let mut result: i64 = 0;
    let mut shift = 0u32;
    for (i, &byte) in bytes.iter().enumerate() {
        if shift >= 64 {
            return None;
        }
        result |= i64::from(byte & 0x7f) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            if shift < 64 && byte & 0x40 != 0 {
                result |= -1i64 << shift;
            }
            return Some((result, i + 1));
        }
    }
    None
}

/// Append a section: id byte, body length, body. The body is built in a
/// scratch buffer by `body`.
pub fn write_section(buf: &mut Vec<u8>, id: SectionId, body: impl FnOnce(&mut Vec<u8>)) {
    let mut scratch = Vec::new();
    body(&mut scratch);
    buf.push(id as u8);
    write_var_u32(buf, scratch.len() as u32);
    buf.extend_from_slice(&scratch);
}

/// Append a length-prefixed UTF-8 name.
pub fn write_name(buf: &mut Vec<u8>, name: &str) {
    write_var_u32(buf, name.len() as u32);
    buf.extend_from_slice(name.as_bytes());
}

/// Append an `f32` immediate.
pub fn write_f32(buf: &mut Vec<u8>, value: f32) {
    buf.extend_from_slice(&value.to_le_bytes());
}
