//! Sortable binary encoding for values and packed keys
//!
//! Each value is encoded as a type tag followed by a payload laid out so
//! that byte-wise comparison of encodings matches `Value`'s own ordering.
//! Integers are big-endian with the sign bit flipped; strings and byte
//! strings are 0x00-escaped and 0x00 0x00 terminated so that prefix ranges
//! over concatenated keys stay contiguous.
//!
//! A *packed* sequence is a u32 big-endian count followed by the encoded
//! values; that is the wire shape of search keys and row payloads in row
//! requests. A *key* encoding is the bare concatenation, used by ordered
//! indexes as their comparison key.

use crate::Value;
use keel_common::{Error, Result};

const TAG_NULL: u8 = 0x00;
const TAG_BOOLEAN: u8 = 0x01;
const TAG_UNSIGNED: u8 = 0x02;
const TAG_INTEGER: u8 = 0x03;
const TAG_STRING: u8 = 0x04;
const TAG_BYTES: u8 = 0x05;

// ============================================================================
// Encoding
// ============================================================================

/// Encode one value in sortable binary format with a type tag.
pub fn encode_value(value: &Value, output: &mut Vec<u8>) {
    match value {
        Value::Null => {
            output.push(TAG_NULL); // NULL sorts first
        }
        Value::Boolean(b) => {
            output.push(TAG_BOOLEAN);
            output.push(if *b { 1 } else { 0 });
        }
        Value::Unsigned(u) => {
            output.push(TAG_UNSIGNED);
            output.extend_from_slice(&u.to_be_bytes());
        }
        Value::Integer(i) => {
            output.push(TAG_INTEGER);
            let u = (*i as u64) ^ (1u64 << 63);
            output.extend_from_slice(&u.to_be_bytes());
        }
        Value::String(s) => {
            output.push(TAG_STRING);
            encode_terminated(s.as_bytes(), output);
        }
        Value::Bytes(b) => {
            output.push(TAG_BYTES);
            encode_terminated(b, output);
        }
    }
}

/// Escape 0x00 as 0x00 0xFF and terminate with 0x00 0x00, so that the
/// encoding of a shorter string never sorts after one it prefixes.
fn encode_terminated(bytes: &[u8], output: &mut Vec<u8>) {
    for &b in bytes {
        output.push(b);
        if b == 0x00 {
            output.push(0xFF);
        }
    }
    output.push(0x00);
    output.push(0x00);
}

/// Encode a key as the bare concatenation of its part encodings.
pub fn encode_key(parts: &[Value]) -> Vec<u8> {
    let mut output = Vec::new();
    for part in parts {
        encode_value(part, &mut output);
    }
    output
}

/// Encode a packed value sequence: u32 count, then the encoded values.
pub fn encode_packed(values: &[Value]) -> Vec<u8> {
    let mut output = Vec::new();
    output.extend_from_slice(&(values.len() as u32).to_be_bytes());
    for value in values {
        encode_value(value, &mut output);
    }
    output
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode one value, advancing the input slice past its encoding.
pub fn decode_value(input: &mut &[u8]) -> Result<Value> {
    let tag = take(input, 1)?[0];
    match tag {
        TAG_NULL => Ok(Value::Null),
        TAG_BOOLEAN => Ok(Value::Boolean(take(input, 1)?[0] != 0)),
        TAG_UNSIGNED => Ok(Value::Unsigned(u64::from_be_bytes(take_array(input)?))),
        TAG_INTEGER => {
            let u = u64::from_be_bytes(take_array(input)?) ^ (1u64 << 63);
            Ok(Value::Integer(u as i64))
        }
        TAG_STRING => {
            let bytes = decode_terminated(input)?;
            String::from_utf8(bytes)
                .map(Value::String)
                .map_err(|_| Error::invalid_argument("Malformed key: invalid UTF-8 string"))
        }
        TAG_BYTES => Ok(Value::Bytes(decode_terminated(input)?)),
        _ => Err(Error::invalid_argument(format!(
            "Malformed key: unknown type tag {:#04x}",
            tag
        ))),
    }
}

fn decode_terminated(input: &mut &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        let b = take(input, 1)?[0];
        if b != 0x00 {
            out.push(b);
            continue;
        }
        match take(input, 1)?[0] {
            0x00 => return Ok(out),
            0xFF => out.push(0x00),
            other => {
                return Err(Error::invalid_argument(format!(
                    "Malformed key: bad escape byte {:#04x}",
                    other
                )));
            }
        }
    }
}

/// Decode a packed value sequence. The leading count is the field count of
/// the search key; an empty input is rejected (absent keys are represented
/// by omitting the key entirely, not by empty bytes).
pub fn decode_packed(mut input: &[u8]) -> Result<Vec<Value>> {
    let count = u32::from_be_bytes(take_array(&mut input)?);
    let mut values = Vec::with_capacity(count as usize);
    for _ in 0..count {
        values.push(decode_value(&mut input)?);
    }
    if !input.is_empty() {
        return Err(Error::invalid_argument(
            "Malformed key: trailing bytes after the last field",
        ));
    }
    Ok(values)
}

fn take<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if input.len() < n {
        return Err(Error::invalid_argument("Malformed key: truncated input"));
    }
    let (head, tail) = input.split_at(n);
    *input = tail;
    Ok(head)
}

fn take_array<const N: usize>(input: &mut &[u8]) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(take(input, N)?);
    Ok(out)
}

// ============================================================================
// Prefix ranges
// ============================================================================

/// Smallest byte string strictly greater than every string with the given
/// prefix, or `None` when no such bound exists (all bytes 0xFF).
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let end = prefix.iter().rposition(|&b| b != 0xFF)?;
    let mut out = prefix[..=end].to_vec();
    out[end] += 1;
    Some(out)
}
