//! Bit-position codec
//!
//! The database stores a signal's position as a linear 0-based bit offset
//! plus a length, but the files and editors use a textual "byte.bit" form,
//! in one of two byte-local numbering conventions:
//!
//! - native mode labels the bits of byte 1 as `1.7 1.6 .. 1.0`, then
//!   `2.7 2.6 ..` - the bit index is the offset modulo 8;
//! - logical mode labels the same physical positions mirrored,
//!   `1.0 1.1 .. 1.7`, matching another vendor's documentation style.
//!
//! Both directions of the conversion walk the range bit by bit, which keeps
//! the two modes and the multi-byte wrap behaviour in a single algorithm.

use crate::types::{DbError, Result};

/// Byte-local bit numbering convention used for display and file tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberingMode {
    /// Native convention: bit index is `start % 8`
    #[default]
    Native,
    /// Mirrored convention: bit index is `7 - start % 8`
    Logical,
}

impl NumberingMode {
    /// Apply the mode's bit labelling to a native bit index (involution)
    fn label(self, bit: u8) -> u8 {
        match self {
            NumberingMode::Native => bit,
            NumberingMode::Logical => 7 - bit,
        }
    }
}

/// A bit position as (1-based byte, bit-in-byte) in native numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitAddress {
    /// 1-based byte index (byte 1 is the first transmitted byte)
    pub byte: u32,
    /// Bit index within the byte, 0..=7, native numbering
    pub bit: u8,
}

impl BitAddress {
    /// Address of a linear bit offset
    pub fn from_linear(start: u32) -> Self {
        // + 1 so the division works with 1-indexed bytes
        Self {
            byte: (start + 8) / 8,
            bit: (start % 8) as u8,
        }
    }

    /// Back to the linear bit offset
    pub fn to_linear(self) -> u32 {
        (self.byte - 1) * 8 + self.bit as u32
    }

    /// Step one bit towards the end of the signal, wrapping into the next
    /// byte when the bit index underflows
    fn step(&mut self) {
        if self.bit == 0 {
            self.byte += 1;
            self.bit = 7;
        } else {
            self.bit -= 1;
        }
    }

    /// Render as "byte.bit" in the given mode
    fn render(self, mode: NumberingMode) -> String {
        format!("{}.{}", self.byte, mode.label(self.bit))
    }
}

/// Encode a (start, length) pair as a textual bit-range token.
///
/// Single-bit signals produce `"B.b"`, longer signals `"B1.b1-B2.b2"` where
/// the second address is the last bit of the range.
pub fn encode_bits(start: u32, length: u32, mode: NumberingMode) -> String {
    let first = BitAddress::from_linear(start);

    if length == 1 {
        return first.render(mode);
    }

    let mut last = first;
    for _ in 0..length - 1 {
        last.step();
    }

    format!("{}-{}", first.render(mode), last.render(mode))
}

/// Decode a textual bit-range token back to (start, length).
///
/// Exact inverse of [`encode_bits`]. The walk from start to end is bounded:
/// if it leaves byte 8 without reaching the end address the token is
/// malformed and `InvalidBitRange` is returned.
pub fn decode_bits(token: &str, mode: NumberingMode) -> Result<(u32, u32)> {
    match token.split_once('-') {
        None => {
            let start = parse_address(token, mode)?;
            Ok((start.to_linear(), 1))
        }
        Some((start_tok, end_tok)) => {
            let start = parse_address(start_tok, mode)?;
            let end = parse_address(end_tok, mode)?;

            let mut cursor = start;
            let mut length = 1;
            while cursor != end {
                cursor.step();
                length += 1;

                if cursor.byte > 8 {
                    return Err(DbError::InvalidBitRange(format!(
                        "end bit never reached in '{}'",
                        token
                    )));
                }
            }

            Ok((start.to_linear(), length))
        }
    }
}

/// Parse one "byte.bit" endpoint, applying the mode's bit labelling.
///
/// The byte index is bounded to 1..=8, the same frame bound the decode
/// walk enforces.
fn parse_address(text: &str, mode: NumberingMode) -> Result<BitAddress> {
    let malformed = || DbError::InvalidBitRange(format!("malformed bit position '{}'", text));

    let (byte_str, bit_str) = text.trim().split_once('.').ok_or_else(malformed)?;
    let byte: u32 = byte_str.parse().map_err(|_| malformed())?;
    let bit: u8 = bit_str.parse().map_err(|_| malformed())?;

    if byte == 0 || byte > 8 || bit > 7 {
        return Err(malformed());
    }

    Ok(BitAddress {
        byte,
        bit: mode.label(bit),
    })
}

/// Translate a linear start offset into the bit index of an MSB-first
/// byte stream.
///
/// Raw frame bytes are stored most significant bit first, while `start`
/// counts from the least significant end of each byte. The formatter and
/// the C generator both address the stream form.
pub fn endian_translate(start: u32) -> u32 {
    let addr = BitAddress::from_linear(start);
    (addr.byte - 1) * 8 + (7 - addr.bit as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_single_bit() {
        assert_eq!(encode_bits(0, 1, NumberingMode::Native), "1.0");
        assert_eq!(encode_bits(7, 1, NumberingMode::Native), "1.7");
        assert_eq!(encode_bits(8, 1, NumberingMode::Native), "2.0");
    }

    #[test]
    fn test_encode_logical_mirrors_bit_label() {
        // same physical bit, opposite label
        assert_eq!(encode_bits(0, 1, NumberingMode::Native), "1.0");
        assert_eq!(encode_bits(0, 1, NumberingMode::Logical), "1.7");
        assert_eq!(encode_bits(7, 1, NumberingMode::Logical), "1.0");
    }

    #[test]
    fn test_encode_range_wraps_into_next_byte() {
        // walking down from 1.1 crosses into byte 2 at bit 7
        assert_eq!(encode_bits(1, 3, NumberingMode::Native), "1.1-2.7");
        // full first byte, starting at its high label
        assert_eq!(encode_bits(7, 8, NumberingMode::Native), "1.7-1.0");
    }

    #[test]
    fn test_decode_single_bit() {
        assert_eq!(decode_bits("1.0", NumberingMode::Native).unwrap(), (0, 1));
        assert_eq!(decode_bits("2.0", NumberingMode::Native).unwrap(), (8, 1));
        assert_eq!(decode_bits("1.7", NumberingMode::Logical).unwrap(), (0, 1));
    }

    #[test]
    fn test_decode_range() {
        assert_eq!(
            decode_bits("1.7-1.0", NumberingMode::Native).unwrap(),
            (7, 8)
        );
        assert_eq!(
            decode_bits("1.1-2.7", NumberingMode::Native).unwrap(),
            (1, 3)
        );
    }

    #[test]
    fn test_decode_rejects_malformed_tokens() {
        assert!(decode_bits("", NumberingMode::Native).is_err());
        assert!(decode_bits("1", NumberingMode::Native).is_err());
        assert!(decode_bits("1.8", NumberingMode::Native).is_err());
        assert!(decode_bits("0.3", NumberingMode::Native).is_err());
        assert!(decode_bits("1.x-2.0", NumberingMode::Native).is_err());
    }

    #[test]
    fn test_decode_rejects_out_of_frame_byte_index() {
        // byte indices past the frame must come back as errors, never
        // overflow the linear conversion
        assert!(decode_bits("9.0", NumberingMode::Native).is_err());
        assert!(decode_bits("536870913.0", NumberingMode::Native).is_err());
        assert!(decode_bits("1.0-536870913.0", NumberingMode::Native).is_err());
    }

    #[test]
    fn test_range_walking_past_byte_8_is_rejected() {
        // start byte 7 bit 0: the walk spills through byte 8 into byte 9,
        // which no 8 byte frame can hold
        assert_eq!(encode_bits(48, 10, NumberingMode::Native), "7.0-9.7");
        assert!(decode_bits("7.0-9.7", NumberingMode::Native).is_err());
    }

    #[test]
    fn test_decode_unreachable_end_is_an_error() {
        // the end address lies before the start, the walk runs off byte 8
        let err = decode_bits("2.0-1.7", NumberingMode::Native).unwrap_err();
        assert!(matches!(err, DbError::InvalidBitRange(_)));
    }

    #[test]
    fn test_round_trip_both_modes() {
        for mode in [NumberingMode::Native, NumberingMode::Logical] {
            for start in 0..64u32 {
                for length in 1..=16u32 {
                    // only ranges whose walk stays inside an 8 byte frame
                    // are representable
                    let mut end = BitAddress::from_linear(start);
                    for _ in 0..length - 1 {
                        end.step();
                    }
                    if end.byte > 8 {
                        continue;
                    }
                    let token = encode_bits(start, length, mode);
                    assert_eq!(
                        decode_bits(&token, mode).unwrap(),
                        (start, length),
                        "token {} in {:?}",
                        token,
                        mode
                    );
                }
            }
        }
    }

    #[test]
    fn test_endian_translate() {
        // bit 0 of byte 1 is the last bit of the first streamed byte
        assert_eq!(endian_translate(0), 7);
        assert_eq!(endian_translate(7), 0);
        assert_eq!(endian_translate(8), 15);
        assert_eq!(endian_translate(3), 4);
    }
}
