//! Encoding literals into canonical [`Value`]s and decoding them back.
//!
//! Logic kinds are strict: a literal that needs more bits than the
//! destination declares is rejected. Integer and boolean kinds follow
//! fixed-width arithmetic and wrap instead.

use overdrive_common::LogicVec;

use crate::error::SimError;
use crate::value::{Literal, Value, ValueKind};

/// A value decoded into its natural Rust form.
#[derive(Clone, Debug, PartialEq)]
pub enum Decoded {
    /// Bit and vector payloads, unchanged.
    Logic(LogicVec),
    /// An unsigned integer.
    Unsigned(u64),
    /// A signed integer.
    Signed(i64),
    /// A boolean.
    Bool(bool),
    /// A real.
    Real(f64),
}

/// Fits `literal` to a destination of `kind` and `width`.
pub fn encode(kind: ValueKind, width: u32, literal: impl Into<Literal>) -> Result<Value, SimError> {
    kind.check_width(width)?;
    let literal = literal.into();
    let bits = match kind {
        ValueKind::Bit | ValueKind::Vector => encode_logic(kind, width, literal)?,
        ValueKind::Integer { .. } | ValueKind::Boolean => encode_wrapping(kind, width, literal)?,
        ValueKind::Real => encode_real(literal)?,
    };
    Ok(Value::from_parts(kind, bits))
}

/// Decodes a value into its natural form.
///
/// Logic kinds decode losslessly, including `X` and `Z` bits. Numeric kinds
/// fail with [`SimError::UnresolvedValue`] if any bit is unknown.
pub fn decode(value: &Value) -> Result<Decoded, SimError> {
    let bits = value.bits();
    let decoded = match value.kind() {
        ValueKind::Bit | ValueKind::Vector => Decoded::Logic(bits.clone()),
        ValueKind::Integer { signed: true } => Decoded::Signed(value.to_i64()?),
        ValueKind::Integer { signed: false } => Decoded::Unsigned(value.to_u64()?),
        ValueKind::Boolean => Decoded::Bool(value.to_bool()?),
        ValueKind::Real => Decoded::Real(f64::from_bits(value.to_u64()?)),
    };
    Ok(decoded)
}

fn encode_logic(kind: ValueKind, width: u32, literal: Literal) -> Result<LogicVec, SimError> {
    let too_wide = |needed: u32, what: String| SimError::WidthMismatch {
        width,
        reason: format!("{what} needs {needed} bits"),
    };
    match literal {
        Literal::Bit(b) | Literal::Bool(b) => Ok(LogicVec::from_bool(b).resized(width)),
        Literal::Unsigned(u) => {
            let needed = u64::BITS - u.leading_zeros();
            if needed > width {
                return Err(too_wide(needed, format!("value {u}")));
            }
            Ok(LogicVec::from_u64(u, width))
        }
        Literal::Signed(i) => {
            let needed = if i < 0 {
                u64::BITS - (!i as u64).leading_zeros() + 1
            } else {
                u64::BITS - (i as u64).leading_zeros()
            };
            if needed > width {
                return Err(too_wide(needed, format!("value {i}")));
            }
            Ok(LogicVec::from_i64(i, width))
        }
        Literal::Bytes(bytes) => {
            let raw = LogicVec::from_bytes_be(&bytes, bytes.len() as u32 * 8);
            let needed = raw.significant_width();
            if needed > width {
                return Err(too_wide(needed, format!("{}-byte buffer", bytes.len())));
            }
            Ok(raw.resized(width))
        }
        Literal::Logic(lv) => {
            let needed = lv.significant_width();
            if needed > width {
                return Err(too_wide(needed, format!("pattern {lv}")));
            }
            Ok(lv.resized(width))
        }
        Literal::Value(v) => exact_width(v, width),
        Literal::Real(_) => Err(SimError::TypeMismatch {
            kind,
            literal: "a real number",
        }),
    }
}

fn encode_wrapping(kind: ValueKind, width: u32, literal: Literal) -> Result<LogicVec, SimError> {
    match literal {
        Literal::Bit(b) | Literal::Bool(b) => Ok(LogicVec::from_bool(b).resized(width)),
        Literal::Unsigned(u) => Ok(LogicVec::from_u64(u, width)),
        Literal::Signed(i) => Ok(LogicVec::from_i64(i, width)),
        Literal::Bytes(bytes) => Ok(LogicVec::from_bytes_be(&bytes, width)),
        Literal::Logic(lv) => Ok(lv.resized(width)),
        Literal::Value(v) => exact_width(v, width),
        Literal::Real(_) => Err(SimError::TypeMismatch {
            kind,
            literal: "a real number",
        }),
    }
}

fn encode_real(literal: Literal) -> Result<LogicVec, SimError> {
    let real = match literal {
        Literal::Real(f) => f,
        Literal::Unsigned(u) => u as f64,
        Literal::Signed(i) => i as f64,
        Literal::Value(v) => return exact_width(v, 64),
        other => {
            return Err(SimError::TypeMismatch {
                kind: ValueKind::Real,
                literal: other.describe(),
            })
        }
    };
    Ok(LogicVec::from_u64(real.to_bits(), 64))
}

/// Pre-encoded values are re-tagged, never resized.
fn exact_width(value: Value, width: u32) -> Result<LogicVec, SimError> {
    if value.width() != width {
        return Err(SimError::WidthMismatch {
            width,
            reason: format!("value {value} is {} bits wide", value.width()),
        });
    }
    Ok(value.into_bits())
}

#[cfg(test)]
mod tests {
    use super::*;
    use overdrive_common::Logic;

    const SIGNED: ValueKind = ValueKind::Integer { signed: true };
    const UNSIGNED: ValueKind = ValueKind::Integer { signed: false };

    #[test]
    fn vector_accepts_fitting_unsigned() {
        let v = encode(ValueKind::Vector, 4, 15u64).unwrap();
        assert_eq!(v.to_u64().unwrap(), 15);
        assert_eq!(v.width(), 4);
    }

    #[test]
    fn vector_rejects_truncation() {
        let err = encode(ValueKind::Vector, 4, 16u64).unwrap_err();
        assert!(matches!(err, SimError::WidthMismatch { width: 4, .. }));
    }

    #[test]
    fn vector_signed_bounds() {
        assert_eq!(encode(ValueKind::Vector, 4, -8i64).unwrap().to_i64().unwrap(), -8);
        assert!(encode(ValueKind::Vector, 4, -9i64).is_err());
        assert!(encode(ValueKind::Vector, 4, 8i64).is_ok());
        assert!(encode(ValueKind::Vector, 1, -1i64).is_ok());
    }

    #[test]
    fn bit_from_integer_literals() {
        assert_eq!(encode(ValueKind::Bit, 1, 0).unwrap(), Value::bit(false));
        assert_eq!(encode(ValueKind::Bit, 1, 1u8).unwrap(), Value::bit(true));
        assert!(encode(ValueKind::Bit, 1, 2).is_err());
    }

    #[test]
    fn bytes_with_leading_zeros_fit() {
        let v = encode(ValueKind::Vector, 12, vec![0x00, 0x0a, 0xbc]).unwrap();
        assert_eq!(v.to_u64().unwrap(), 0xabc);
        assert!(encode(ValueKind::Vector, 11, vec![0x0a, 0xbc]).is_err());
    }

    #[test]
    fn wide_bytes_are_msb_first() {
        let bytes = hex_bytes("0000000000000008");
        let v = encode(ValueKind::Vector, 64, bytes.clone()).unwrap();
        assert_eq!(v.to_bytes().unwrap(), bytes);
        assert_eq!(v.to_u64().unwrap(), 8);
    }

    #[test]
    fn logic_pattern_keeps_unknowns() {
        let lv = LogicVec::from_binary_str("1xz0").unwrap();
        let v = encode(ValueKind::Vector, 6, lv.clone()).unwrap();
        assert_eq!(v.bits().get(2), Logic::X);
        assert_eq!(decode(&v).unwrap(), Decoded::Logic(lv.resized(6)));
    }

    #[test]
    fn integer_wraps() {
        assert_eq!(encode(UNSIGNED, 8, 256u64).unwrap().to_u64().unwrap(), 0);
        assert_eq!(encode(SIGNED, 8, 200u64).unwrap().to_i64().unwrap(), -56);
        assert_eq!(encode(SIGNED, 32, -1i64).unwrap().to_u64().unwrap(), 0xffff_ffff);
    }

    #[test]
    fn boolean_wraps_to_low_bit() {
        assert_eq!(encode(ValueKind::Boolean, 1, 2u64).unwrap(), Value::boolean(false));
        assert_eq!(encode(ValueKind::Boolean, 1, true).unwrap(), Value::boolean(true));
    }

    #[test]
    fn real_payload() {
        let v = encode(ValueKind::Real, 64, 2.5f64).unwrap();
        assert_eq!(decode(&v).unwrap(), Decoded::Real(2.5));
        let v = encode(ValueKind::Real, 64, 3i32).unwrap();
        assert_eq!(decode(&v).unwrap(), Decoded::Real(3.0));
        assert!(matches!(
            encode(ValueKind::Real, 64, vec![1u8]),
            Err(SimError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn real_into_logic_rejected() {
        assert!(matches!(
            encode(ValueKind::Vector, 8, 1.0f64),
            Err(SimError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn encoded_value_must_match_width() {
        let v = Value::unsigned(3, 8).unwrap();
        let retagged = encode(UNSIGNED, 8, v.clone()).unwrap();
        assert_eq!(retagged.kind(), UNSIGNED);
        assert!(encode(ValueKind::Vector, 16, v).is_err());
    }

    #[test]
    fn invalid_destination_width() {
        assert!(matches!(
            encode(ValueKind::Boolean, 2, true),
            Err(SimError::InvalidWidth { .. })
        ));
    }

    #[test]
    fn decode_numeric_kinds() {
        assert_eq!(
            decode(&encode(SIGNED, 16, -300i64).unwrap()).unwrap(),
            Decoded::Signed(-300)
        );
        assert_eq!(
            decode(&encode(UNSIGNED, 16, 300u64).unwrap()).unwrap(),
            Decoded::Unsigned(300)
        );
        assert_eq!(decode(&Value::boolean(true)).unwrap(), Decoded::Bool(true));
    }

    #[test]
    fn decode_unknown_integer_fails() {
        let v = encode(UNSIGNED, 4, LogicVec::all_x(4)).unwrap();
        assert!(matches!(decode(&v), Err(SimError::UnresolvedValue { .. })));
    }

    fn hex_bytes(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }
}
