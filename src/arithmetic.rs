//! Binary arithmetic shared by both front ends.
//!
//! Integer operations are computed exactly on big integers; the caller casts
//! the result to the expression type, which is where wraparound happens.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{Float, ToPrimitive, Zero};

use crate::ast::BinaryOp;
use crate::cast::wrap_integer;
use crate::types::{FloatKind, IntRank, IntType, Type};

/// Which language's rules apply.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Flavor {
    C,
    Java,
}

/// Integer division or remainder with a zero divisor.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DivisionByZero;

/// Exact integer arithmetic on operands already converted to a `width`-bit type.
///
/// Returns `Ok(None)` when the result is not determined (C shift out of range).
pub fn integer_arithmetic(
    op: BinaryOp,
    lhs: &BigInt,
    rhs: &BigInt,
    width: u32,
    flavor: Flavor,
) -> Result<Option<BigInt>, DivisionByZero> {
    let result = match op {
        BinaryOp::Plus => lhs + rhs,
        BinaryOp::Minus => lhs - rhs,
        BinaryOp::Multiply => lhs * rhs,
        // BigInt division truncates towards zero and the remainder takes the
        // sign of the dividend, as in both C99 and Java.
        BinaryOp::Divide => {
            if rhs.is_zero() {
                return Err(DivisionByZero);
            }
            lhs / rhs
        }
        BinaryOp::Modulo => {
            if rhs.is_zero() {
                return Err(DivisionByZero);
            }
            lhs % rhs
        }
        BinaryOp::BinaryAnd => lhs & rhs,
        BinaryOp::BinaryOr => lhs | rhs,
        BinaryOp::BinaryXor => lhs ^ rhs,
        BinaryOp::ShiftLeft | BinaryOp::ShiftRight | BinaryOp::UnsignedShiftRight => {
            let amount = match shift_amount(rhs, width, flavor) {
                Some(a) => a,
                None => return Ok(None),
            };
            match op {
                BinaryOp::ShiftLeft => lhs << amount,
                // Arithmetic shift: BigInt shifts of negatives round towards -inf.
                BinaryOp::ShiftRight => lhs >> amount,
                _ => wrap_integer(lhs, width, false) >> amount,
            }
        }
        _ => unreachable!("operator {} is not arithmetic", op),
    };
    Ok(Some(result))
}

/// Effective shift distance: C leaves out-of-range shifts undefined, Java masks
/// the distance to the low bits of the promoted width.
fn shift_amount(rhs: &BigInt, width: u32, flavor: Flavor) -> Option<usize> {
    match flavor {
        Flavor::C => {
            let amount = rhs.to_i64()?;
            if amount < 0 || amount >= width as i64 {
                log::debug!("Shift by {} on a {}-bit operand is undefined", amount, width);
                None
            } else {
                Some(amount as usize)
            }
        }
        Flavor::Java => {
            let mask = (width - 1) as i64;
            let low = wrap_integer(rhs, 64, true).to_i64().unwrap_or(0);
            Some((low & mask) as usize)
        }
    }
}

pub fn integer_comparison(op: BinaryOp, lhs: &BigInt, rhs: &BigInt) -> bool {
    compare(op, lhs.cmp(rhs))
}

fn compare(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Equals => ordering == Ordering::Equal,
        BinaryOp::NotEquals => ordering != Ordering::Equal,
        BinaryOp::LessThan => ordering == Ordering::Less,
        BinaryOp::LessEqual => ordering != Ordering::Greater,
        BinaryOp::GreaterThan => ordering == Ordering::Greater,
        BinaryOp::GreaterEqual => ordering != Ordering::Less,
        _ => unreachable!("operator {} is not relational", op),
    }
}

/// IEEE-754 arithmetic in the precision of `F`.
///
/// `%` is the truncating remainder (C `fmod`, Java `%`); the C front end never
/// produces it for floats.
pub fn float_arithmetic<F: Float>(op: BinaryOp, lhs: F, rhs: F) -> F {
    match op {
        BinaryOp::Plus => lhs + rhs,
        BinaryOp::Minus => lhs - rhs,
        BinaryOp::Multiply => lhs * rhs,
        BinaryOp::Divide => lhs / rhs,
        BinaryOp::Modulo => lhs % rhs,
        _ => panic!("operator {} is not defined on floating-point operands", op),
    }
}

/// IEEE-754 comparison: every ordered comparison with NaN is false, `!=` is true.
pub fn float_comparison<F: Float>(op: BinaryOp, lhs: F, rhs: F) -> bool {
    match lhs.partial_cmp(&rhs) {
        Some(ordering) => compare(op, ordering),
        None => op == BinaryOp::NotEquals,
    }
}

/// Binary numeric promotion (JLS §5.6.2).
pub fn java_binary_promotion(lhs: &Type, rhs: &Type) -> Type {
    match (lhs, rhs) {
        (Type::Float(FloatKind::Double), _) | (_, Type::Float(FloatKind::Double)) => Type::double(),
        (Type::Float(_), _) | (_, Type::Float(_)) => Type::float(),
        _ if is_java_long(lhs) || is_java_long(rhs) => Type::java_long(),
        _ => Type::java_int(),
    }
}

/// Unary numeric promotion: `byte`, `short` and `char` widen to `int`.
pub fn java_unary_promotion(ty: &Type) -> Type {
    match ty {
        Type::Float(FloatKind::Float) => Type::float(),
        Type::Float(_) => Type::double(),
        _ if is_java_long(ty) => Type::java_long(),
        _ => Type::java_int(),
    }
}

fn is_java_long(ty: &Type) -> bool {
    matches!(ty, Type::Int(IntType { rank: IntRank::Long | IntRank::LongLong, .. }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn big(v: i64) -> BigInt {
        BigInt::from(v)
    }

    #[test]
    fn test_truncating_division() {
        let r = integer_arithmetic(BinaryOp::Divide, &big(-7), &big(2), 32, Flavor::C);
        assert_eq!(r, Ok(Some(big(-3))));
        let r = integer_arithmetic(BinaryOp::Modulo, &big(-7), &big(2), 32, Flavor::C);
        assert_eq!(r, Ok(Some(big(-1))));
        let r = integer_arithmetic(BinaryOp::Modulo, &big(7), &big(-2), 32, Flavor::Java);
        assert_eq!(r, Ok(Some(big(1))));
    }

    #[test]
    fn test_division_by_zero_is_reported() {
        let r = integer_arithmetic(BinaryOp::Divide, &big(1), &big(0), 32, Flavor::C);
        assert_eq!(r, Err(DivisionByZero));
        let r = integer_arithmetic(BinaryOp::Modulo, &big(1), &big(0), 32, Flavor::Java);
        assert_eq!(r, Err(DivisionByZero));
    }

    #[test]
    fn test_c_shift_out_of_range_is_undetermined() {
        let r = integer_arithmetic(BinaryOp::ShiftLeft, &big(1), &big(32), 32, Flavor::C);
        assert_eq!(r, Ok(None));
        let r = integer_arithmetic(BinaryOp::ShiftLeft, &big(1), &big(-1), 32, Flavor::C);
        assert_eq!(r, Ok(None));
        let r = integer_arithmetic(BinaryOp::ShiftRight, &big(-8), &big(1), 32, Flavor::C);
        assert_eq!(r, Ok(Some(big(-4))));
    }

    #[test]
    fn test_java_shift_masks_distance() {
        let r = integer_arithmetic(BinaryOp::ShiftLeft, &big(1), &big(33), 32, Flavor::Java);
        assert_eq!(r, Ok(Some(big(2))));
        let r = integer_arithmetic(BinaryOp::UnsignedShiftRight, &big(-1), &big(28), 32, Flavor::Java);
        assert_eq!(r, Ok(Some(big(15))));
    }

    #[test]
    fn test_bitwise_on_negatives() {
        let r = integer_arithmetic(BinaryOp::BinaryAnd, &big(-1), &big(0xF0), 32, Flavor::C);
        assert_eq!(r, Ok(Some(big(0xF0))));
        let r = integer_arithmetic(BinaryOp::BinaryXor, &big(-1), &big(1), 32, Flavor::C);
        assert_eq!(r, Ok(Some(big(-2))));
    }

    #[test]
    fn test_float_semantics() {
        assert!(float_arithmetic(BinaryOp::Divide, 1.0f64, 0.0).is_infinite());
        assert!(float_arithmetic(BinaryOp::Divide, 0.0f32, 0.0).is_nan());
        assert_eq!(float_arithmetic(BinaryOp::Modulo, 7.5f64, 2.0), 1.5);
        assert!(!float_comparison(BinaryOp::Equals, f64::NAN, f64::NAN));
        assert!(float_comparison(BinaryOp::NotEquals, f64::NAN, f64::NAN));
        assert!(!float_comparison(BinaryOp::LessThan, f64::NAN, 1.0));
        assert!(float_comparison(BinaryOp::Equals, 0.0f64, -0.0));
    }

    #[test]
    fn test_java_promotion() {
        assert_eq!(java_binary_promotion(&Type::java_byte(), &Type::java_char()), Type::java_int());
        assert_eq!(java_binary_promotion(&Type::java_int(), &Type::java_long()), Type::java_long());
        assert_eq!(java_binary_promotion(&Type::java_long(), &Type::float()), Type::float());
        assert_eq!(java_binary_promotion(&Type::float(), &Type::double()), Type::double());
        assert_eq!(java_unary_promotion(&Type::java_short()), Type::java_int());
    }

    #[test]
    #[should_panic(expected = "not defined on floating-point")]
    fn test_float_shift_is_a_logic_error() {
        float_arithmetic(BinaryOp::ShiftLeft, 1.0f64, 1.0);
    }
}
