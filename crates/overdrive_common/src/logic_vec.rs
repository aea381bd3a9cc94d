//! Packed 4-state bit vectors of arbitrary width.
//!
//! Bit 0 is the least significant bit. Conversions to and from byte buffers
//! use most-significant-byte-first order, which is how wide values are
//! exchanged with testbench code.

use crate::logic::Logic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// Logic values per storage word (2 bits each).
const VALUES_PER_WORD: u32 = 32;

/// A vector of [`Logic`] values, 2 bits per value, 32 values per `u64` word.
///
/// Equality compares the width and every bit, so two vectors of different
/// widths are never equal even if their numeric values agree.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicVec {
    width: u32,
    data: Vec<u64>,
}

impl LogicVec {
    /// Creates an all-`Zero` vector.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            data: vec![0; word_count(width)],
        }
    }

    /// Creates a vector with every bit set to `value`.
    pub fn filled(width: u32, value: Logic) -> Self {
        let mut v = Self::new(width);
        if value != Logic::Zero {
            for i in 0..width {
                v.set(i, value);
            }
        }
        v
    }

    /// Creates an all-`X` vector.
    pub fn all_x(width: u32) -> Self {
        Self::filled(width, Logic::X)
    }

    /// Number of bits.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> Logic {
        assert!(
            index < self.width,
            "bit {index} out of range for width {}",
            self.width
        );
        let (word, shift) = locate(index);
        Logic::from_code(self.data[word] >> shift)
    }

    /// Overwrites the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, value: Logic) {
        assert!(
            index < self.width,
            "bit {index} out of range for width {}",
            self.width
        );
        let (word, shift) = locate(index);
        self.data[word] = (self.data[word] & !(0b11 << shift)) | ((value as u64) << shift);
    }

    /// A one-bit vector holding `value`.
    pub fn from_bool(value: bool) -> Self {
        let mut v = Self::new(1);
        v.set(0, Logic::from_bool(value));
        v
    }

    /// Builds a vector from the low `width` bits of `value`; higher bits are dropped
    /// and widths above 64 are zero-extended.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut v = Self::new(width);
        for i in 0..width.min(64) {
            if (value >> i) & 1 == 1 {
                v.set(i, Logic::One);
            }
        }
        v
    }

    /// Builds a two's-complement vector: negative values are sign-extended past
    /// bit 63 and truncated to `width` bits.
    pub fn from_i64(value: i64, width: u32) -> Self {
        let mut v = Self::from_u64(value as u64, width);
        if value < 0 {
            for i in 64..width {
                v.set(i, Logic::One);
            }
        }
        v
    }

    /// Builds a vector from an MSB-first byte buffer.
    ///
    /// The last byte supplies bits 0..8. Bits beyond `width` are dropped and a
    /// short buffer is zero-extended.
    pub fn from_bytes_be(bytes: &[u8], width: u32) -> Self {
        let mut v = Self::new(width);
        for (byte_idx, byte) in bytes.iter().rev().enumerate() {
            for bit in 0..8u32 {
                let index = byte_idx as u32 * 8 + bit;
                if index >= width {
                    return v;
                }
                if (byte >> bit) & 1 == 1 {
                    v.set(index, Logic::One);
                }
            }
        }
        v
    }

    /// Returns the MSB-first byte buffer, `ceil(width / 8)` bytes long.
    ///
    /// Returns `None` if any bit is `X` or `Z`.
    pub fn to_bytes_be(&self) -> Option<Vec<u8>> {
        let len = self.width.div_ceil(8) as usize;
        let mut bytes = vec![0u8; len];
        for i in 0..self.width {
            if self.get(i).to_bool()? {
                bytes[len - 1 - (i / 8) as usize] |= 1 << (i % 8);
            }
        }
        Some(bytes)
    }

    /// Returns the unsigned value, if every bit is known and no bit at index 64
    /// or above is set.
    pub fn to_u64(&self) -> Option<u64> {
        let mut result = 0u64;
        for i in 0..self.width {
            if self.get(i).to_bool()? {
                if i >= 64 {
                    return None;
                }
                result |= 1 << i;
            }
        }
        Some(result)
    }

    /// Interprets the vector as a two's-complement number of its own width.
    ///
    /// Returns `None` for widths above 64 or when a bit is unknown.
    pub fn to_i64(&self) -> Option<i64> {
        if self.width == 0 || self.width > 64 {
            return None;
        }
        let raw = self.to_u64()?;
        let shift = 64 - self.width;
        Some(((raw << shift) as i64) >> shift)
    }

    /// Returns `true` when every bit is `Zero` or `One`.
    pub fn is_fully_known(&self) -> bool {
        (0..self.width).all(|i| self.get(i).is_known())
    }

    /// Number of bits needed to hold the value unsigned: one past the highest
    /// bit that is not `Zero`. An all-zero vector needs 0 bits.
    pub fn significant_width(&self) -> u32 {
        (0..self.width)
            .rev()
            .find(|&i| self.get(i) != Logic::Zero)
            .map_or(0, |i| i + 1)
    }

    /// Returns a copy truncated or zero-extended to `width` bits.
    pub fn resized(&self, width: u32) -> Self {
        let mut v = Self::new(width);
        for i in 0..width.min(self.width) {
            v.set(i, self.get(i));
        }
        v
    }

    /// Parses a binary string such as `"10xz"`; the first character is the MSB.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let mut v = Self::new(s.chars().count() as u32);
        for (i, c) in s.chars().rev().enumerate() {
            v.set(i as u32, Logic::from_char(c)?);
        }
        Some(v)
    }

    /// Lowercase hex digits, MSB first, or `None` if a bit is unknown.
    ///
    /// Digits are assembled nibble by nibble so arbitrarily wide vectors never
    /// pass through a numeric intermediate.
    pub fn to_hex_string(&self) -> Option<String> {
        let digits = self.width.div_ceil(4).max(1);
        let mut out = String::with_capacity(digits as usize);
        for d in (0..digits).rev() {
            let mut nibble = 0u32;
            for bit in 0..4u32 {
                let index = d * 4 + bit;
                if index < self.width && self.get(index).to_bool()? {
                    nibble |= 1 << bit;
                }
            }
            out.push(char::from_digit(nibble, 16)?);
        }
        Some(out)
    }

    fn zip_with(&self, rhs: &Self, op: &str, f: impl Fn(Logic, Logic) -> Logic) -> Self {
        assert_eq!(self.width, rhs.width, "LogicVec width mismatch in {op}");
        let mut out = Self::new(self.width);
        for i in 0..self.width {
            out.set(i, f(self.get(i), rhs.get(i)));
        }
        out
    }
}

impl fmt::Display for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            write!(f, "{}", self.get(i).to_char())?;
        }
        Ok(())
    }
}

impl fmt::Debug for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogicVec({}'b{self})", self.width)
    }
}

impl BitAnd for &LogicVec {
    type Output = LogicVec;

    fn bitand(self, rhs: Self) -> LogicVec {
        self.zip_with(rhs, "AND", |a, b| a & b)
    }
}

impl BitOr for &LogicVec {
    type Output = LogicVec;

    fn bitor(self, rhs: Self) -> LogicVec {
        self.zip_with(rhs, "OR", |a, b| a | b)
    }
}

impl BitXor for &LogicVec {
    type Output = LogicVec;

    fn bitxor(self, rhs: Self) -> LogicVec {
        self.zip_with(rhs, "XOR", |a, b| a ^ b)
    }
}

impl Not for &LogicVec {
    type Output = LogicVec;

    fn not(self) -> LogicVec {
        let mut out = LogicVec::new(self.width);
        for i in 0..self.width {
            out.set(i, !self.get(i));
        }
        out
    }
}

fn word_count(width: u32) -> usize {
    width.div_ceil(VALUES_PER_WORD) as usize
}

fn locate(index: u32) -> (usize, u32) {
    (
        (index / VALUES_PER_WORD) as usize,
        (index % VALUES_PER_WORD) * 2,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_all_states() {
        let mut v = LogicVec::new(4);
        v.set(1, Logic::One);
        v.set(2, Logic::X);
        v.set(3, Logic::Z);
        assert_eq!(v.get(0), Logic::Zero);
        assert_eq!(v.get(1), Logic::One);
        assert_eq!(v.get(2), Logic::X);
        assert_eq!(v.get(3), Logic::Z);
        assert_eq!(v.to_string(), "zx10");
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn get_out_of_range_panics() {
        LogicVec::new(3).get(3);
    }

    #[test]
    fn spans_multiple_words() {
        let mut v = LogicVec::new(100);
        v.set(0, Logic::One);
        v.set(63, Logic::One);
        v.set(99, Logic::Z);
        assert_eq!(v.get(63), Logic::One);
        assert_eq!(v.get(64), Logic::Zero);
        assert_eq!(v.get(99), Logic::Z);
    }

    #[test]
    fn widths_differ_means_unequal() {
        assert_ne!(LogicVec::from_u64(5, 4), LogicVec::from_u64(5, 8));
    }

    #[test]
    fn from_u64_truncates() {
        let v = LogicVec::from_u64(0x1ff, 8);
        assert_eq!(v.to_u64(), Some(0xff));
    }

    #[test]
    fn from_i64_sign_extends_wide() {
        let v = LogicVec::from_i64(-1, 72);
        assert!((0..72).all(|i| v.get(i) == Logic::One));
        assert_eq!(LogicVec::from_i64(-2, 4).to_string(), "1110");
    }

    #[test]
    fn to_i64_uses_vector_width() {
        assert_eq!(LogicVec::from_u64(0b1111, 4).to_i64(), Some(-1));
        assert_eq!(LogicVec::from_u64(0b0111, 4).to_i64(), Some(7));
        assert_eq!(LogicVec::new(65).to_i64(), None);
    }

    #[test]
    fn to_u64_rejects_unknown_and_high_bits() {
        assert_eq!(LogicVec::from_binary_str("1x").unwrap().to_u64(), None);
        let mut wide = LogicVec::new(80);
        wide.set(3, Logic::One);
        assert_eq!(wide.to_u64(), Some(8));
        wide.set(70, Logic::One);
        assert_eq!(wide.to_u64(), None);
    }

    #[test]
    fn bytes_are_msb_first() {
        let v = LogicVec::from_bytes_be(&[0x12, 0x34], 16);
        assert_eq!(v.to_u64(), Some(0x1234));
        assert_eq!(v.to_bytes_be(), Some(vec![0x12, 0x34]));
    }

    #[test]
    fn bytes_partial_top_byte() {
        let v = LogicVec::from_bytes_be(&[0x01, 0xff], 9);
        assert_eq!(v.to_u64(), Some(0x1ff));
        assert_eq!(v.to_bytes_be(), Some(vec![0x01, 0xff]));
    }

    #[test]
    fn bytes_wide_vector() {
        let mut bytes = vec![0u8; 16];
        bytes[0] = 0x80;
        bytes[15] = 0x08;
        let v = LogicVec::from_bytes_be(&bytes, 128);
        assert_eq!(v.get(127), Logic::One);
        assert_eq!(v.get(3), Logic::One);
        assert_eq!(v.to_bytes_be(), Some(bytes));
    }

    #[test]
    fn bytes_none_with_unknown() {
        assert_eq!(LogicVec::all_x(8).to_bytes_be(), None);
    }

    #[test]
    fn significant_width_counts_top_bit() {
        assert_eq!(LogicVec::new(8).significant_width(), 0);
        assert_eq!(LogicVec::from_u64(4, 8).significant_width(), 3);
        assert_eq!(LogicVec::from_binary_str("0x00").unwrap().significant_width(), 3);
    }

    #[test]
    fn resize_zero_extends_and_truncates() {
        let v = LogicVec::from_binary_str("101").unwrap();
        assert_eq!(v.resized(5).to_string(), "00101");
        assert_eq!(v.resized(2).to_string(), "01");
    }

    #[test]
    fn parse_binary() {
        assert_eq!(LogicVec::from_binary_str("10XZ").unwrap().to_string(), "10xz");
        assert!(LogicVec::from_binary_str("102").is_none());
    }

    #[test]
    fn hex_string_wide() {
        let v = LogicVec::from_bytes_be(&[0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 0, 0x01], 72);
        assert_eq!(v.to_hex_string().unwrap(), "deadbeef0000000001");
        assert_eq!(LogicVec::from_u64(5, 3).to_hex_string().unwrap(), "5");
        assert_eq!(LogicVec::all_x(4).to_hex_string(), None);
    }

    #[test]
    fn bitwise_ops() {
        let a = LogicVec::from_binary_str("1100").unwrap();
        let b = LogicVec::from_binary_str("10x0").unwrap();
        assert_eq!((&a & &b).to_string(), "1000");
        assert_eq!((&a | &b).to_string(), "11x0");
        assert_eq!((&a ^ &b).to_string(), "01x0");
        assert_eq!((!&b).to_string(), "01x1");
    }

    #[test]
    fn debug_format() {
        assert_eq!(format!("{:?}", LogicVec::from_u64(2, 2)), "LogicVec(2'b10)");
    }

    #[test]
    fn serde_roundtrip() {
        let v = LogicVec::from_binary_str("10xz1010").unwrap();
        let json = serde_json::to_string(&v).unwrap();
        let back: LogicVec = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
