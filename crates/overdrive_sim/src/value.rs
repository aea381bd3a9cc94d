//! Signal kinds, canonical values, literals, and multi-driver resolution.
//!
//! Every signal value is stored as a [`LogicVec`] tagged with its
//! [`ValueKind`]. Integer, boolean and real payloads use the same packed
//! representation (two's complement and IEEE-754 bit patterns respectively),
//! so forcing and releasing treat all kinds identically.

use std::fmt;

use overdrive_common::{Logic, LogicVec};
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::SimError;

/// The declared type of a signal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ValueKind {
    /// A single 4-state logic bit.
    Bit,
    /// A 4-state logic vector of any positive width.
    Vector,
    /// A fixed-width integer of at most 64 bits.
    Integer {
        /// Whether the payload is two's complement.
        signed: bool,
    },
    /// A one-bit boolean.
    Boolean,
    /// A 64-bit IEEE-754 real.
    Real,
}

impl ValueKind {
    /// Returns `true` for the 4-state logic kinds.
    pub fn is_logic(self) -> bool {
        matches!(self, ValueKind::Bit | ValueKind::Vector)
    }

    /// Checks `width` against the kind's constraints.
    pub fn check_width(self, width: u32) -> Result<(), SimError> {
        let reason = match self {
            ValueKind::Bit if width != 1 => "bits are 1 bit wide",
            ValueKind::Boolean if width != 1 => "booleans are 1 bit wide",
            ValueKind::Real if width != 64 => "reals are 64 bits wide",
            ValueKind::Vector if width == 0 => "vectors need at least 1 bit",
            ValueKind::Integer { .. } if width == 0 || width > 64 => {
                "integers are 1 to 64 bits wide"
            }
            _ => return Ok(()),
        };
        Err(SimError::InvalidWidth {
            kind: self,
            width,
            reason,
        })
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bit => f.write_str("bit"),
            ValueKind::Vector => f.write_str("vector"),
            ValueKind::Integer { signed: true } => f.write_str("signed integer"),
            ValueKind::Integer { signed: false } => f.write_str("unsigned integer"),
            ValueKind::Boolean => f.write_str("boolean"),
            ValueKind::Real => f.write_str("real"),
        }
    }
}

/// A canonical signal value: a kind tag over an exact-width bit payload.
///
/// Equality requires the same kind, the same width, and the same bits.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Value {
    kind: ValueKind,
    bits: LogicVec,
}

impl Value {
    pub(crate) fn from_parts(kind: ValueKind, bits: LogicVec) -> Self {
        Self { kind, bits }
    }

    /// A single logic bit.
    pub fn bit(value: bool) -> Self {
        Self::from_parts(ValueKind::Bit, LogicVec::from_bool(value))
    }

    /// A boolean.
    pub fn boolean(value: bool) -> Self {
        Self::from_parts(ValueKind::Boolean, LogicVec::from_bool(value))
    }

    /// An unsigned logic vector; fails if `value` needs more than `width` bits.
    pub fn unsigned(value: u64, width: u32) -> Result<Self, SimError> {
        codec::encode(ValueKind::Vector, width, Literal::Unsigned(value))
    }

    /// A two's-complement logic vector; fails if `value` needs more than `width` bits.
    pub fn signed(value: i64, width: u32) -> Result<Self, SimError> {
        codec::encode(ValueKind::Vector, width, Literal::Signed(value))
    }

    /// A fixed-width integer. Out-of-range values wrap.
    pub fn integer(value: i64, width: u32, signed: bool) -> Result<Self, SimError> {
        codec::encode(ValueKind::Integer { signed }, width, Literal::Signed(value))
    }

    /// A logic vector from an MSB-first byte buffer.
    pub fn from_bytes(bytes: &[u8], width: u32) -> Result<Self, SimError> {
        codec::encode(ValueKind::Vector, width, Literal::Bytes(bytes.to_vec()))
    }

    /// A 64-bit real.
    pub fn real(value: f64) -> Self {
        Self::from_parts(ValueKind::Real, LogicVec::from_u64(value.to_bits(), 64))
    }

    /// The kind tag.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Width in bits.
    pub fn width(&self) -> u32 {
        self.bits.width()
    }

    /// The raw 4-state payload.
    pub fn bits(&self) -> &LogicVec {
        &self.bits
    }

    /// Consumes the value, returning its payload.
    pub fn into_bits(self) -> LogicVec {
        self.bits
    }

    /// Returns `true` if no bit is `X` or `Z`.
    pub fn is_fully_known(&self) -> bool {
        self.bits.is_fully_known()
    }

    /// The payload as an unsigned number.
    pub fn to_u64(&self) -> Result<u64, SimError> {
        self.bits.to_u64().ok_or_else(|| self.unresolved())
    }

    /// The payload as a two's-complement number of the value's width.
    pub fn to_i64(&self) -> Result<i64, SimError> {
        self.bits.to_i64().ok_or_else(|| self.unresolved())
    }

    /// The least significant bit as a boolean.
    pub fn to_bool(&self) -> Result<bool, SimError> {
        self.bits.get(0).to_bool().ok_or_else(|| self.unresolved())
    }

    /// The MSB-first byte buffer, `ceil(width / 8)` bytes long.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SimError> {
        self.bits.to_bytes_be().ok_or_else(|| self.unresolved())
    }

    pub(crate) fn unresolved(&self) -> SimError {
        SimError::UnresolvedValue {
            value: self.to_string(),
        }
    }
}

impl fmt::Display for Value {
    /// Verilog-style rendering: `1`, `8'h2a`, `4'b1x0z`, `-3`, `true`, `2.5`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = self.width();
        if !self.is_fully_known() {
            return if w == 1 {
                write!(f, "{}", self.bits.get(0).to_char())
            } else {
                write!(f, "{w}'b{}", self.bits)
            };
        }
        match self.kind {
            ValueKind::Bit => write!(f, "{}", self.bits.get(0).to_char()),
            ValueKind::Vector => match self.bits.to_hex_string() {
                Some(hex) => write!(f, "{w}'h{}", trim_hex(&hex)),
                None => write!(f, "{w}'b{}", self.bits),
            },
            ValueKind::Integer { signed: true } => match self.bits.to_i64() {
                Some(v) => write!(f, "{v}"),
                None => write!(f, "{w}'b{}", self.bits),
            },
            ValueKind::Integer { signed: false } => match self.bits.to_u64() {
                Some(v) => write!(f, "{v}"),
                None => write!(f, "{w}'b{}", self.bits),
            },
            ValueKind::Boolean => write!(f, "{}", self.bits.get(0) == Logic::One),
            ValueKind::Real => match self.bits.to_u64() {
                Some(raw) => write!(f, "{}", f64::from_bits(raw)),
                None => write!(f, "{w}'b{}", self.bits),
            },
        }
    }
}

fn trim_hex(hex: &str) -> &str {
    let trimmed = hex.trim_start_matches('0');
    if trimmed.is_empty() {
        "0"
    } else {
        trimmed
    }
}

/// Source forms accepted when writing or constructing a value.
///
/// A literal carries no width; [`codec::encode`] fits it to the destination.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    /// A single bit, `0` or `1`.
    Bit(bool),
    /// An unsigned integer.
    Unsigned(u64),
    /// A signed integer.
    Signed(i64),
    /// A boolean.
    Bool(bool),
    /// An MSB-first byte buffer.
    Bytes(Vec<u8>),
    /// An explicit 4-state bit pattern.
    Logic(LogicVec),
    /// A real number.
    Real(f64),
    /// An already-encoded value, which must match the destination width.
    Value(Value),
}

impl Literal {
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Literal::Bit(_) => "a bit",
            Literal::Unsigned(_) => "an unsigned integer",
            Literal::Signed(_) => "a signed integer",
            Literal::Bool(_) => "a boolean",
            Literal::Bytes(_) => "a byte buffer",
            Literal::Logic(_) => "a logic vector",
            Literal::Real(_) => "a real number",
            Literal::Value(_) => "an encoded value",
        }
    }
}

macro_rules! literal_from {
    ($variant:ident <- $($ty:ty),+) => {
        $(impl From<$ty> for Literal {
            fn from(v: $ty) -> Self {
                Literal::$variant(v.into())
            }
        })+
    };
}

literal_from!(Unsigned <- u8, u16, u32, u64);
literal_from!(Signed <- i8, i16, i32, i64);
literal_from!(Bool <- bool);
literal_from!(Bytes <- Vec<u8>, &[u8]);
literal_from!(Logic <- LogicVec);
literal_from!(Real <- f64);
literal_from!(Value <- Value);

impl<const N: usize> From<[u8; N]> for Literal {
    fn from(bytes: [u8; N]) -> Self {
        Literal::Bytes(bytes.to_vec())
    }
}

impl From<&Value> for Literal {
    fn from(v: &Value) -> Self {
        Literal::Value(v.clone())
    }
}

/// Resolves the contributions of several drivers of one net.
///
/// A single contribution wins outright. With several, bits on which every
/// driver agrees keep that value and conflicting bits become `X`.
pub fn resolve_drivers(contributions: &[&LogicVec], width: u32) -> LogicVec {
    match contributions {
        [] => LogicVec::filled(width, Logic::Z),
        [only] => (*only).clone(),
        [first, rest @ ..] => {
            let mut out = LogicVec::new(width);
            for bit in 0..width {
                let v = first.get(bit);
                let agreed = rest.iter().all(|c| c.get(bit) == v);
                out.set(bit, if agreed { v } else { Logic::X });
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_width_rules() {
        assert!(ValueKind::Bit.check_width(1).is_ok());
        assert!(ValueKind::Bit.check_width(2).is_err());
        assert!(ValueKind::Vector.check_width(0).is_err());
        assert!(ValueKind::Vector.check_width(4096).is_ok());
        assert!(ValueKind::Integer { signed: true }.check_width(64).is_ok());
        assert!(ValueKind::Integer { signed: true }.check_width(65).is_err());
        assert!(ValueKind::Real.check_width(32).is_err());
    }

    #[test]
    fn equality_needs_same_width() {
        let a = Value::unsigned(3, 4).unwrap();
        let b = Value::unsigned(3, 8).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, Value::unsigned(3, 4).unwrap());
    }

    #[test]
    fn equality_needs_same_kind() {
        let v = Value::unsigned(1, 1).unwrap();
        assert_ne!(v, Value::bit(true));
        assert_ne!(Value::boolean(true), Value::bit(true));
    }

    #[test]
    fn numeric_views() {
        let v = Value::integer(-3, 8, true).unwrap();
        assert_eq!(v.to_i64().unwrap(), -3);
        assert_eq!(v.to_u64().unwrap(), 0xfd);
        assert!(Value::boolean(true).to_bool().unwrap());
    }

    #[test]
    fn unresolved_views_fail() {
        let v = Value::from_parts(ValueKind::Vector, LogicVec::all_x(4));
        assert!(matches!(v.to_u64(), Err(SimError::UnresolvedValue { .. })));
        assert!(v.to_bytes().is_err());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::bit(true).to_string(), "1");
        assert_eq!(Value::unsigned(0x2a, 8).unwrap().to_string(), "8'h2a");
        assert_eq!(Value::unsigned(0, 8).unwrap().to_string(), "8'h0");
        assert_eq!(Value::integer(-3, 32, true).unwrap().to_string(), "-3");
        assert_eq!(Value::boolean(false).to_string(), "false");
        assert_eq!(Value::real(2.5).to_string(), "2.5");
        let xz = Value::from_parts(
            ValueKind::Vector,
            LogicVec::from_binary_str("1x0z").unwrap(),
        );
        assert_eq!(xz.to_string(), "4'b1x0z");
    }

    #[test]
    fn display_wide_vector_is_bytewise() {
        let mut bytes = vec![0u8; 16];
        bytes[0] = 0x80;
        let v = Value::from_bytes(&bytes, 128).unwrap();
        assert_eq!(
            v.to_string(),
            "128'h80000000000000000000000000000000"
        );
    }

    #[test]
    fn literal_conversions() {
        assert_eq!(Literal::from(5u8), Literal::Unsigned(5));
        assert_eq!(Literal::from(-5i32), Literal::Signed(-5));
        assert_eq!(Literal::from(true), Literal::Bool(true));
        assert_eq!(Literal::from([1u8, 2]), Literal::Bytes(vec![1, 2]));
        assert_eq!(Literal::from(&b"\x01"[..]), Literal::Bytes(vec![1]));
    }

    #[test]
    fn resolve_single_driver_wins() {
        let a = LogicVec::from_u64(0b1010, 4);
        assert_eq!(resolve_drivers(&[&a], 4), a);
    }

    #[test]
    fn resolve_no_drivers_is_z() {
        assert_eq!(resolve_drivers(&[], 2).to_string(), "zz");
    }

    #[test]
    fn resolve_conflicts_become_x() {
        let a = LogicVec::from_u64(0b1100, 4);
        let b = LogicVec::from_u64(0b1010, 4);
        assert_eq!(resolve_drivers(&[&a, &b], 4).to_string(), "1xx0");
    }

    #[test]
    fn serde_roundtrip() {
        let v = Value::integer(42, 16, false).unwrap();
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
