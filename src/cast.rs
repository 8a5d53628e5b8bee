//! Conversions between numeric types.
//!
//! C conversions reduce integers modulo `2^width` and recentre them into the
//! target range; Java conversions follow the JLS narrowing rules, whose
//! float-to-integral step saturates and maps NaN to zero.

use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};

use crate::machine::MachineModel;
use crate::number::Number;
use crate::types::{FloatKind, Type};
use crate::value::Value;

/// Smallest and largest value of an integer type of `width` bits.
///
/// A zero-width bitfield holds only zero.
pub fn integer_range(width: u32, signed: bool) -> (BigInt, BigInt) {
    if width == 0 {
        (BigInt::zero(), BigInt::zero())
    } else if signed {
        let half = BigInt::one() << (width - 1);
        (-half.clone(), half - 1)
    } else {
        (BigInt::zero(), (BigInt::one() << width) - 1)
    }
}

pub fn fits_in(value: &BigInt, width: u32, signed: bool) -> bool {
    let (lo, hi) = integer_range(width, signed);
    &lo <= value && value <= &hi
}

/// Two's-complement reduction of `value` to `width` bits.
pub fn wrap_integer(value: &BigInt, width: u32, signed: bool) -> BigInt {
    if width == 0 {
        return BigInt::zero();
    }
    if width <= 64 {
        if let Some(v) = value.to_i128() {
            let modulus = 1i128 << width;
            let mut r = v.rem_euclid(modulus);
            if signed && r >= modulus / 2 {
                r -= modulus;
            }
            return BigInt::from(r);
        }
    }
    let modulus = BigInt::one() << width;
    let mut r = value % &modulus;
    if r < BigInt::zero() {
        r += &modulus;
    }
    if signed && r >= (BigInt::one() << (width - 1)) {
        r -= &modulus;
    }
    r
}

/// C conversion of a concrete value to `target`.
///
/// Values that are not numeric are returned unchanged; the caller deals with
/// symbolic operands.
pub fn cast_c(value: &Value, target: &Type, machine: &MachineModel) -> Value {
    let number = match value {
        Value::Numeric(n) => n.clone(),
        Value::Boolean(b) => Number::Int(*b as i64),
        other => return other.clone(),
    };
    match target {
        Type::Bool => Value::int((number.is_nan() || !number.is_zero()) as i64),
        Type::Int(_) | Type::Enum(_) | Type::Pointer(_) => match machine.integer_view(target) {
            Some((width, signed)) => cast_to_integer(&number, width, signed),
            None => Value::Unknown,
        },
        Type::Float(kind) => cast_to_float(&number, *kind),
        _ => value.clone(),
    }
}

/// Integer conversion with C wraparound.
///
/// NaN, infinities and values with a fractional part are rejected.
pub fn cast_to_integer(number: &Number, width: u32, signed: bool) -> Value {
    if number.is_nan() || number.is_infinite() || number.has_fraction() {
        return Value::Unknown;
    }
    match number.to_bigint() {
        Some(big) => Value::Numeric(Number::from_bigint(wrap_integer(&big, width, signed))),
        None => Value::Unknown,
    }
}

pub fn cast_to_float(number: &Number, kind: FloatKind) -> Value {
    match kind {
        FloatKind::Float => match number {
            Number::NegativeNaN => Value::Numeric(Number::NegativeNaN),
            n => Value::float(n.to_f32()),
        },
        FloatKind::Double => match number {
            Number::NegativeNaN => Value::Numeric(Number::NegativeNaN),
            n => Value::double(n.to_f64()),
        },
        FloatKind::LongDouble | FloatKind::Float128 => {
            log::debug!("Cannot represent {} as {:?}, returning unknown", number, kind);
            Value::Unknown
        }
    }
}

/// Java conversion of a concrete value to `target` (JLS §5.1.2, §5.1.3).
pub fn cast_java(value: &Value, target: &Type) -> Value {
    let number = match value {
        Value::Numeric(n) => n,
        other => return other.clone(),
    };
    let machine = MachineModel::java();
    match target {
        Type::Int(it) => {
            let width = machine.int_width(it);
            if number.is_float_kind() {
                // Through `int` (or `long`), then narrowed; `as` saturates and sends NaN to 0.
                let d = number.to_f64();
                let wide = if width > 32 {
                    BigInt::from(d as i64)
                } else {
                    BigInt::from(d as i32)
                };
                Value::Numeric(Number::from_bigint(wrap_integer(&wide, width, it.signed)))
            } else {
                cast_to_integer(number, width, it.signed)
            }
        }
        Type::Float(kind @ (FloatKind::Float | FloatKind::Double)) => cast_to_float(number, *kind),
        _ => value.clone(),
    }
}

/// Whether a double survives a round trip through `float` unchanged.
pub fn is_exact_in_float(d: f64) -> bool {
    d.is_nan() || (d as f32) as f64 == d
}
