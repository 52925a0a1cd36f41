//! Order-preserving, self-delimiting key encoding.
//!
//! A [`Key`] is a growable buffer of encoded segments. Every segment is
//! `[tag byte][payload][0x00 terminator]` where the payload never contains a
//! zero byte, so:
//!
//! - unsigned lexicographic comparison of two whole keys orders them
//!   segment-by-segment with each segment obeying its type's natural order;
//! - a comparator can count field boundaries by counting zero bytes, without
//!   decoding anything.
//!
//! | Tag    | Byte | Payload                                       |
//! |--------|------|-----------------------------------------------|
//! | BEFORE | 0x01 | empty; sorts below every value                |
//! | NULL   | 0x02 | empty                                         |
//! | ORDINAL| 0x05 | u32 in five high-bit-set 7-bit groups         |
//! | INT    | 0x10 | sign-flipped u64 in ten high-bit-set groups   |
//! | DECIMAL| 0x12 | sign byte, biased exponent, mantissa digits   |
//! | FLOAT  | 0x14 | total-order-transformed bits, ten groups      |
//! | TEXT   | 0x20 | UTF-8 with zero escape (00→01 01, 01→01 02)   |
//! | BYTES  | 0x24 | raw bytes, same escape                        |
//! | AFTER  | 0xFE | empty; sorts above every value                |
//!
//! Integer and 32-bit integer columns share the INT tag so mixed-width
//! comparisons order numerically; the declared type narrows on decode.

use hkv_error::{HkvError, Result};

use crate::decimal::{Decimal, MAX_SCALE};
use crate::value::{ScalarType, ScalarValue};

const SIGN_FLIP: u64 = 1 << 63;

// Decimal payload bytes. The exponent is biased by 64 and offset so every
// encoded byte (and its 0xFF-complement for negatives) stays clear of 0x00.
const DEC_NEG: u8 = 0x7f;
const DEC_ZERO: u8 = 0x80;
const DEC_POS: u8 = 0x81;
const DEC_EXP_BASE: i16 = 0x20;
const DEC_EXP_BIAS: i16 = 64;
const DEC_DIGIT_BASE: u8 = 0x10;
const DEC_NEG_END: u8 = 0xff;

/// Segment type tag, the first byte of every encoded segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum SegmentTag {
    Before = 0x01,
    Null = 0x02,
    Ordinal = 0x05,
    Int = 0x10,
    Decimal = 0x12,
    Float = 0x14,
    Text = 0x20,
    Bytes = 0x24,
    After = 0xfe,
}

impl SegmentTag {
    /// Parse a tag byte; unknown bytes are corruption.
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::Before),
            0x02 => Some(Self::Null),
            0x05 => Some(Self::Ordinal),
            0x10 => Some(Self::Int),
            0x12 => Some(Self::Decimal),
            0x14 => Some(Self::Float),
            0x20 => Some(Self::Text),
            0x24 => Some(Self::Bytes),
            0xfe => Some(Self::After),
            _ => None,
        }
    }
}

/// The closed set of things that can be appended to a [`Key`].
///
/// Edge sentinels and structural ordinals are first-class variants rather
/// than special cases of a scalar append, so there is no runtime
/// unsupported-variant path.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySegment {
    /// A column value.
    Scalar(ScalarValue),
    /// A structural table-type tag separating hierarchy levels.
    Ordinal(i32),
    /// Sentinel comparing below every real value at this position.
    Before,
    /// Sentinel comparing above every real value at this position.
    After,
}

/// A growable buffer of ordered, self-delimiting key segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    bytes: Vec<u8>,
}

impl Key {
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Validate and adopt raw encoded bytes (e.g. read from the key-value
    /// engine). Malformed structure is [`HkvError::Corrupt`].
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        validate_encoded(raw)?;
        Ok(Self {
            bytes: raw.to_vec(),
        })
    }

    /// Replace this key's contents with validated raw bytes, reusing the
    /// backing allocation.
    pub fn set_bytes(&mut self, raw: &[u8]) -> Result<()> {
        validate_encoded(raw)?;
        self.bytes.clear();
        self.bytes.extend_from_slice(raw);
        Ok(())
    }

    /// Reset encoded length to zero without releasing backing storage.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn encoded_len(&self) -> usize {
        self.bytes.len()
    }

    /// Number of complete segments currently encoded.
    pub fn segment_count(&self) -> usize {
        self.bytes.iter().filter(|&&b| b == 0).count()
    }

    pub fn append(&mut self, segment: &KeySegment) {
        match segment {
            KeySegment::Scalar(v) => self.append_value(v),
            KeySegment::Ordinal(o) => self.append_ordinal(*o),
            KeySegment::Before => self.append_before(),
            KeySegment::After => self.append_after(),
        }
    }

    pub fn append_value(&mut self, value: &ScalarValue) {
        match value {
            ScalarValue::Null => self.append_empty(SegmentTag::Null),
            ScalarValue::Int(v) => self.append_int(*v),
            ScalarValue::Int32(v) => self.append_int(i64::from(*v)),
            ScalarValue::Float(v) => {
                self.bytes.push(SegmentTag::Float as u8);
                push_u64_grouped(&mut self.bytes, float_to_ordered_bits(*v));
                self.bytes.push(0);
            }
            ScalarValue::Decimal(d) => {
                self.bytes.push(SegmentTag::Decimal as u8);
                push_decimal(&mut self.bytes, *d);
                self.bytes.push(0);
            }
            ScalarValue::Text(s) => {
                self.bytes.push(SegmentTag::Text as u8);
                push_escaped(&mut self.bytes, s.as_bytes());
                self.bytes.push(0);
            }
            ScalarValue::Bytes(b) => {
                self.bytes.push(SegmentTag::Bytes as u8);
                push_escaped(&mut self.bytes, b);
                self.bytes.push(0);
            }
        }
    }

    fn append_int(&mut self, v: i64) {
        self.bytes.push(SegmentTag::Int as u8);
        push_u64_grouped(&mut self.bytes, (v as u64) ^ SIGN_FLIP);
        self.bytes.push(0);
    }

    /// Append a structural table-ordinal segment. Ordinals are catalog
    /// ordinals and therefore non-negative.
    pub fn append_ordinal(&mut self, ordinal: i32) {
        debug_assert!(ordinal >= 0, "table ordinals are non-negative");
        self.bytes.push(SegmentTag::Ordinal as u8);
        push_u32_grouped(&mut self.bytes, ordinal as u32);
        self.bytes.push(0);
    }

    /// Append the low sentinel used to form half-open scan bounds.
    pub fn append_before(&mut self) {
        self.append_empty(SegmentTag::Before);
    }

    /// Append the high sentinel used to form half-open scan bounds.
    pub fn append_after(&mut self) {
        self.append_empty(SegmentTag::After);
    }

    /// Append a spatial z-value as one INT segment. Z-values occupy 63 bits
    /// (bit 63 clear), so the cast never changes sign.
    pub fn append_z_value(&mut self, z: u64) {
        debug_assert!(z & SIGN_FLIP == 0, "z-values are 63-bit");
        self.append_int(z as i64);
    }

    fn append_empty(&mut self, tag: SegmentTag) {
        self.bytes.push(tag as u8);
        self.bytes.push(0);
    }

    /// Borrowed view over the i-th encoded segment (tag and payload, without
    /// the terminator). No copying.
    pub fn segment_raw(&self, index: usize) -> Result<&[u8]> {
        let (start, end) = self.segment_bounds(index)?;
        Ok(&self.bytes[start..end])
    }

    /// Append an already-encoded segment verbatim, re-terminating it.
    pub fn append_raw_segment(&mut self, raw: &[u8]) {
        self.bytes.extend_from_slice(raw);
        self.bytes.push(0);
    }

    /// Keep only the first `count` segments.
    pub fn truncate_segments(&mut self, count: usize) {
        let mut seen = 0usize;
        for (pos, &b) in self.bytes.iter().enumerate() {
            if b == 0 {
                seen += 1;
                if seen == count {
                    self.bytes.truncate(pos + 1);
                    return;
                }
            }
        }
    }

    /// Tag of the i-th segment.
    pub fn tag(&self, index: usize) -> Result<SegmentTag> {
        let raw = self.segment_raw(index)?;
        let b = raw
            .first()
            .ok_or_else(|| HkvError::corrupt(format!("segment {index} has no tag byte")))?;
        SegmentTag::from_byte(*b)
            .ok_or_else(|| HkvError::corrupt(format!("segment {index} has unknown tag {b:#04x}")))
    }

    /// Decode the i-th segment under a declared type. A NULL segment decodes
    /// to NULL under any type; a tag that contradicts the declared type is a
    /// shape mismatch.
    pub fn decode_segment(&self, index: usize, ty: ScalarType) -> Result<ScalarValue> {
        let raw = self.segment_raw(index)?;
        let tag = self.tag(index)?;
        let payload = &raw[1..];
        match (tag, ty) {
            (SegmentTag::Null, _) => Ok(ScalarValue::Null),
            (SegmentTag::Int, ScalarType::Int) => {
                Ok(ScalarValue::Int(decode_int_payload(payload, index)?))
            }
            (SegmentTag::Int, ScalarType::Int32) => {
                let wide = decode_int_payload(payload, index)?;
                let narrow = i32::try_from(wide).map_err(|_| {
                    HkvError::corrupt(format!("segment {index}: int32 value {wide} out of range"))
                })?;
                Ok(ScalarValue::Int32(narrow))
            }
            (SegmentTag::Float, ScalarType::Float) => {
                let bits = read_u64_grouped(payload)
                    .ok_or_else(|| HkvError::corrupt(format!("segment {index}: bad float")))?;
                Ok(ScalarValue::Float(ordered_bits_to_float(bits)))
            }
            (SegmentTag::Decimal, ScalarType::Decimal) => {
                Ok(ScalarValue::Decimal(decode_decimal(payload, index)?))
            }
            (SegmentTag::Text, ScalarType::Text) => {
                let bytes = unescape(payload)
                    .ok_or_else(|| HkvError::corrupt(format!("segment {index}: bad escape")))?;
                let text = String::from_utf8(bytes).map_err(|_| {
                    HkvError::corrupt(format!("segment {index}: invalid UTF-8"))
                })?;
                Ok(ScalarValue::Text(text))
            }
            (SegmentTag::Bytes, ScalarType::Bytes) => {
                let bytes = unescape(payload)
                    .ok_or_else(|| HkvError::corrupt(format!("segment {index}: bad escape")))?;
                Ok(ScalarValue::Bytes(bytes))
            }
            (tag, ty) => Err(HkvError::shape(format!(
                "segment {index}: encoded as {tag:?}, declared {ty}"
            ))),
        }
    }

    /// Decode the i-th segment as a structural ordinal.
    pub fn decode_ordinal(&self, index: usize) -> Result<i32> {
        let raw = self.segment_raw(index)?;
        match self.tag(index)? {
            SegmentTag::Ordinal => {
                let v = read_u32_grouped(&raw[1..])
                    .ok_or_else(|| HkvError::corrupt(format!("segment {index}: bad ordinal")))?;
                Ok(v as i32)
            }
            tag => Err(HkvError::shape(format!(
                "segment {index}: expected ordinal, found {tag:?}"
            ))),
        }
    }

    fn segment_bounds(&self, index: usize) -> Result<(usize, usize)> {
        let mut start = 0usize;
        let mut seen = 0usize;
        for (pos, &b) in self.bytes.iter().enumerate() {
            if b == 0 {
                if seen == index {
                    return Ok((start, pos));
                }
                seen += 1;
                start = pos + 1;
            }
        }
        if start < self.bytes.len() {
            return Err(HkvError::corrupt(format!(
                "trailing unterminated segment after {seen} segments"
            )));
        }
        Err(HkvError::shape(format!(
            "segment {index} out of range, key has {seen} segments"
        )))
    }
}

/// Structural validation of raw encoded bytes: known tags, every segment
/// terminated. Payload contents are checked lazily on decode.
fn validate_encoded(raw: &[u8]) -> Result<()> {
    let mut pos = 0usize;
    while pos < raw.len() {
        let tag = raw[pos];
        if SegmentTag::from_byte(tag).is_none() {
            return Err(HkvError::corrupt(format!(
                "unknown tag {tag:#04x} at offset {pos}"
            )));
        }
        match raw[pos..].iter().position(|&b| b == 0) {
            Some(rel) => pos += rel + 1,
            None => {
                return Err(HkvError::corrupt(format!(
                    "unterminated segment at offset {pos}"
                )))
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Payload encodings
// ---------------------------------------------------------------------------

/// Emit a u64 as ten bytes, each `0x80 | 7 bits` (the last byte carries the
/// final bit). Same-length, high-bit-set bytes: zero-free and
/// lexicographically order-preserving.
fn push_u64_grouped(out: &mut Vec<u8>, u: u64) {
    for i in 0..9 {
        out.push(0x80 | ((u >> (57 - 7 * i)) & 0x7f) as u8);
    }
    out.push(0x80 | (u & 0x01) as u8);
}

fn read_u64_grouped(payload: &[u8]) -> Option<u64> {
    if payload.len() != 10 {
        return None;
    }
    let mut u = 0u64;
    for (i, &b) in payload.iter().take(9).enumerate() {
        if b & 0x80 == 0 {
            return None;
        }
        u |= u64::from(b & 0x7f) << (57 - 7 * i);
    }
    let last = payload[9];
    if last & 0x80 == 0 || last & 0x7e != 0 {
        return None;
    }
    u |= u64::from(last & 0x01);
    Some(u)
}

/// Decode a grouped integer payload back through the sign bias.
fn decode_int_payload(payload: &[u8], index: usize) -> Result<i64> {
    let u = read_u64_grouped(payload)
        .ok_or_else(|| HkvError::corrupt(format!("segment {index}: bad int")))?;
    Ok((u ^ SIGN_FLIP) as i64)
}

/// u32 variant: five bytes, the last carrying four bits.
fn push_u32_grouped(out: &mut Vec<u8>, u: u32) {
    for i in 0..4 {
        out.push(0x80 | ((u >> (25 - 7 * i)) & 0x7f) as u8);
    }
    out.push(0x80 | (u & 0x0f) as u8);
}

fn read_u32_grouped(payload: &[u8]) -> Option<u32> {
    if payload.len() != 5 {
        return None;
    }
    let mut u = 0u32;
    for (i, &b) in payload.iter().take(4).enumerate() {
        if b & 0x80 == 0 {
            return None;
        }
        u |= u32::from(b & 0x7f) << (25 - 7 * i);
    }
    let last = payload[4];
    if last & 0x80 == 0 || last & 0x70 != 0 {
        return None;
    }
    u |= u32::from(last & 0x0f);
    Some(u)
}

/// IEEE 754 total-order transform: negatives flip all bits, non-negatives
/// flip the sign bit. Byte order of the result matches numeric order.
fn float_to_ordered_bits(f: f64) -> u64 {
    let bits = f.to_bits();
    if bits & SIGN_FLIP != 0 {
        !bits
    } else {
        bits ^ SIGN_FLIP
    }
}

fn ordered_bits_to_float(u: u64) -> f64 {
    let bits = if u & SIGN_FLIP != 0 {
        u ^ SIGN_FLIP
    } else {
        !u
    };
    f64::from_bits(bits)
}

/// Order-preserving zero escape: `0x00 → 0x01 0x01`, `0x01 → 0x01 0x02`.
fn push_escaped(out: &mut Vec<u8>, bytes: &[u8]) {
    for &b in bytes {
        match b {
            0x00 => out.extend_from_slice(&[0x01, 0x01]),
            0x01 => out.extend_from_slice(&[0x01, 0x02]),
            _ => out.push(b),
        }
    }
}

fn unescape(payload: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(payload.len());
    let mut iter = payload.iter();
    while let Some(&b) = iter.next() {
        if b == 0x01 {
            match iter.next() {
                Some(0x01) => out.push(0x00),
                Some(0x02) => out.push(0x01),
                _ => return None,
            }
        } else {
            out.push(b);
        }
    }
    Some(out)
}

/// Scientific-notation decimal encoding: sign byte, biased decimal exponent,
/// mantissa digits with trailing zeros stripped. Negative payloads are
/// byte-complemented and closed with 0xFF so magnitude order reverses.
fn push_decimal(out: &mut Vec<u8>, d: Decimal) {
    if d.is_zero() {
        out.push(DEC_ZERO);
        return;
    }
    let negative = d.unscaled() < 0;
    let mut digits = [0u8; 20];
    let mut n = 0usize;
    let mut mag = d.unscaled().unsigned_abs();
    while mag > 0 {
        digits[n] = (mag % 10) as u8;
        mag /= 10;
        n += 1;
    }
    // digits[] holds least-significant first; mantissa drops trailing
    // (least-significant) zeros.
    let mut lo = 0usize;
    while lo < n && digits[lo] == 0 {
        lo += 1;
    }
    let exponent = (n as i16 - 1) - i16::from(d.scale());
    let exp_byte = (DEC_EXP_BASE + DEC_EXP_BIAS + exponent) as u8;

    if negative {
        out.push(DEC_NEG);
        out.push(0xff - exp_byte);
        for i in (lo..n).rev() {
            out.push(0xff - (DEC_DIGIT_BASE + digits[i]));
        }
        out.push(DEC_NEG_END);
    } else {
        out.push(DEC_POS);
        out.push(exp_byte);
        for i in (lo..n).rev() {
            out.push(DEC_DIGIT_BASE + digits[i]);
        }
    }
}

fn decode_decimal(payload: &[u8], index: usize) -> Result<Decimal> {
    let corrupt = || HkvError::corrupt(format!("segment {index}: bad decimal"));
    let (&sign, rest) = payload.split_first().ok_or_else(corrupt)?;
    if sign == DEC_ZERO {
        if !rest.is_empty() {
            return Err(corrupt());
        }
        return Ok(Decimal::from_int(0));
    }
    let negative = match sign {
        DEC_POS => false,
        DEC_NEG => true,
        _ => return Err(corrupt()),
    };
    let (&exp_raw, digit_bytes) = rest.split_first().ok_or_else(corrupt)?;
    let exp_byte = if negative { 0xff - exp_raw } else { exp_raw };
    let exponent = i16::from(exp_byte) - DEC_EXP_BASE - DEC_EXP_BIAS;

    let digit_bytes = if negative {
        let (&end, body) = digit_bytes.split_last().ok_or_else(corrupt)?;
        if end != DEC_NEG_END {
            return Err(corrupt());
        }
        body
    } else {
        digit_bytes
    };
    if digit_bytes.is_empty() {
        return Err(corrupt());
    }

    let mut mantissa: i64 = 0;
    for &raw in digit_bytes {
        let b = if negative { 0xff - raw } else { raw };
        if !(DEC_DIGIT_BASE..=DEC_DIGIT_BASE + 9).contains(&b) {
            return Err(corrupt());
        }
        mantissa = mantissa
            .checked_mul(10)
            .and_then(|m| m.checked_add(i64::from(b - DEC_DIGIT_BASE)))
            .ok_or_else(corrupt)?;
    }

    let n_digits = digit_bytes.len() as i16;
    let scale = (n_digits - 1) - exponent;
    let unscaled = if scale >= 0 {
        if scale > i16::from(MAX_SCALE) {
            return Err(corrupt());
        }
        mantissa
    } else {
        let pow = 10i64
            .checked_pow(u32::try_from(-scale).map_err(|_| corrupt())?)
            .ok_or_else(corrupt)?;
        mantissa.checked_mul(pow).ok_or_else(corrupt)?
    };
    let unscaled = if negative { -unscaled } else { unscaled };
    Decimal::new(unscaled, scale.max(0) as u8).ok_or_else(corrupt)
}
