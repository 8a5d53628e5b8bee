//! C math library calls evaluated on concrete operands.
//!
//! Calls are recognised by name. The precision (`float` or `double`) comes from
//! the declared result type for value-returning functions and from the argument
//! for the classification predicates.

use std::num::FpCategory;

use num_traits::Float;

use crate::cast::cast_c;
use crate::machine::MachineModel;
use crate::number::Number;
use crate::types::{FloatKind, Type};
use crate::value::Value;

// glibc values of the `FP_*` classification macros.
const FP_NAN: i64 = 0;
const FP_INFINITE: i64 = 1;
const FP_ZERO: i64 = 2;
const FP_SUBNORMAL: i64 = 3;
const FP_NORMAL: i64 = 4;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Builtin {
    Abs,
    Fabs,
    Floor,
    Ceil,
    Round,
    Trunc,
    IsNan,
    IsInf,
    IsFinite,
    SignBit,
    FpClassify,
    Fmin,
    Fmax,
    Fdim,
    Fmod,
    Remainder,
    CopySign,
    Nan,
}

impl Builtin {
    fn arity(self) -> usize {
        match self {
            Builtin::Fmin
            | Builtin::Fmax
            | Builtin::Fdim
            | Builtin::Fmod
            | Builtin::Remainder
            | Builtin::CopySign => 2,
            _ => 1,
        }
    }
}

fn lookup(name: &str) -> Option<Builtin> {
    let name = name.trim_start_matches("__builtin_");
    let b = match name {
        "abs" | "labs" | "llabs" => Builtin::Abs,
        "isnan" | "__isnan" | "__isnanf" | "isnanf" => Builtin::IsNan,
        "isinf" | "__isinf" | "__isinff" | "isinff" => Builtin::IsInf,
        "isfinite" | "finite" | "__finite" | "__finitef" | "finitef" => Builtin::IsFinite,
        "signbit" | "__signbit" | "__signbitf" => Builtin::SignBit,
        "fpclassify" | "__fpclassify" | "__fpclassifyf" => Builtin::FpClassify,
        _ => {
            // Remaining names come in `f`, `f`-suffixed and `l`-suffixed flavours.
            let base = name
                .strip_suffix('f')
                .or_else(|| name.strip_suffix('l'))
                .filter(|b| float_function(b).is_some())
                .unwrap_or(name);
            return float_function(base);
        }
    };
    Some(b)
}

fn float_function(name: &str) -> Option<Builtin> {
    Some(match name {
        "fabs" => Builtin::Fabs,
        "floor" => Builtin::Floor,
        "ceil" => Builtin::Ceil,
        "round" => Builtin::Round,
        "trunc" => Builtin::Trunc,
        "fmin" => Builtin::Fmin,
        "fmax" => Builtin::Fmax,
        "fdim" => Builtin::Fdim,
        "fmod" => Builtin::Fmod,
        "remainder" => Builtin::Remainder,
        "copysign" => Builtin::CopySign,
        "nan" => Builtin::Nan,
        _ => return None,
    })
}

/// Whether calls to `name` are evaluated by [`evaluate`].
pub fn is_builtin(name: &str) -> bool {
    lookup(name).is_some()
}

/// Evaluates a call to `name` with already evaluated arguments.
///
/// Returns `None` when `name` is not a recognised function, and
/// `Some(Value::Unknown)` when it is but an argument is not concrete.
pub fn evaluate(name: &str, args: &[Value], result_type: &Type, machine: &MachineModel) -> Option<Value> {
    let builtin = lookup(name)?;
    if builtin == Builtin::Nan {
        return Some(match result_type {
            Type::Float(FloatKind::Float) => Value::float(f32::NAN),
            Type::Float(FloatKind::Double) => Value::double(f64::NAN),
            _ => Value::Unknown,
        });
    }
    if args.len() != builtin.arity() || args.iter().any(|a| !matches!(a, Value::Numeric(_))) {
        return Some(Value::Unknown);
    }
    let result = match builtin {
        Builtin::Abs => {
            let n = args[0].as_number().and_then(Number::to_bigint);
            match n {
                Some(v) => cast_c(&Value::Numeric(Number::from_bigint(num_traits::Signed::abs(&v))), result_type, machine),
                None => Value::Unknown,
            }
        }
        Builtin::IsNan | Builtin::IsInf | Builtin::IsFinite | Builtin::SignBit | Builtin::FpClassify => {
            classify(builtin, &args[0])
        }
        _ => match result_type {
            Type::Float(FloatKind::Float) => {
                let xs: Vec<f32> = args
                    .iter()
                    .map(|a| cast_operand(a, FloatKind::Float, machine).to_f32())
                    .collect();
                Value::float(apply(builtin, &xs))
            }
            Type::Float(FloatKind::Double) => {
                let xs: Vec<f64> = args
                    .iter()
                    .map(|a| cast_operand(a, FloatKind::Double, machine).to_f64())
                    .collect();
                Value::double(apply(builtin, &xs))
            }
            other => {
                log::debug!("Cannot evaluate {} with result type {}", name, other);
                Value::Unknown
            }
        },
    };
    Some(result)
}

fn cast_operand(value: &Value, kind: FloatKind, machine: &MachineModel) -> Number {
    match cast_c(value, &Type::Float(kind), machine) {
        Value::Numeric(n) => n,
        _ => Number::Double(f64::NAN),
    }
}

fn classify(builtin: Builtin, arg: &Value) -> Value {
    let number = match arg {
        Value::Numeric(n) => n,
        _ => return Value::Unknown,
    };
    let (category, negative) = match number {
        Number::Float(f) => (f.classify(), f.is_sign_negative()),
        Number::NegativeNaN => (FpCategory::Nan, true),
        n => {
            let d = n.to_f64();
            (d.classify(), d.is_sign_negative())
        }
    };
    let result = match builtin {
        Builtin::IsNan => (category == FpCategory::Nan) as i64,
        Builtin::IsInf => (category == FpCategory::Infinite) as i64,
        Builtin::IsFinite => !matches!(category, FpCategory::Nan | FpCategory::Infinite) as i64,
        Builtin::SignBit => negative as i64,
        Builtin::FpClassify => match category {
            FpCategory::Nan => FP_NAN,
            FpCategory::Infinite => FP_INFINITE,
            FpCategory::Zero => FP_ZERO,
            FpCategory::Subnormal => FP_SUBNORMAL,
            FpCategory::Normal => FP_NORMAL,
        },
        _ => unreachable!("{:?} is not a classification", builtin),
    };
    Value::int(result)
}

fn apply<F: Float>(builtin: Builtin, xs: &[F]) -> F {
    let x = xs[0];
    match builtin {
        Builtin::Fabs => x.abs(),
        Builtin::Floor => x.floor(),
        Builtin::Ceil => x.ceil(),
        // Half-way cases away from zero, as C `round`.
        Builtin::Round => x.round(),
        Builtin::Trunc => x.trunc(),
        Builtin::Fmin => x.min(xs[1]),
        Builtin::Fmax => x.max(xs[1]),
        Builtin::Fdim => {
            let y = xs[1];
            if x.is_nan() || y.is_nan() {
                F::nan()
            } else if x > y {
                x - y
            } else {
                F::zero()
            }
        }
        Builtin::Fmod => x % xs[1],
        Builtin::Remainder => ieee_remainder(x, xs[1]),
        Builtin::CopySign => {
            if x.is_sign_negative() != xs[1].is_sign_negative() {
                -x
            } else {
                x
            }
        }
        _ => unreachable!("{:?} is not a floating-point function", builtin),
    }
}

/// `x - n*y` with `n` the integer nearest `x/y`, ties to even.
fn ieee_remainder<F: Float>(x: F, y: F) -> F {
    if x.is_nan() || y.is_nan() || x.is_infinite() || y.is_zero() {
        return F::nan();
    }
    if y.is_infinite() {
        return x;
    }
    let two = F::one() + F::one();
    let half = F::one() / two;
    let y = y.abs();
    // r in [0, 2y): its position relative to y gives the parity of the quotient.
    let r = x.abs() % (two * y);
    let (r, odd) = if r >= y { (r - y, true) } else { (r, false) };
    let r = if r > y * half || (r == y * half && odd) {
        r - y
    } else {
        r
    };
    if x.is_sign_negative() {
        -r
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn m() -> MachineModel {
        MachineModel::linux64()
    }

    fn call(name: &str, args: &[Value], ty: Type) -> Value {
        evaluate(name, args, &ty, &m()).unwrap()
    }

    #[test]
    fn test_recognition() {
        assert!(is_builtin("fabsf"));
        assert!(is_builtin("__builtin_fabs"));
        assert!(is_builtin("remainderl"));
        assert!(is_builtin("__fpclassify"));
        assert!(!is_builtin("printf"));
        assert!(!is_builtin("f"));
        assert!(evaluate("malloc", &[Value::int(4)], &Type::int(), &m()).is_none());
    }

    #[test]
    fn test_rounding_family() {
        assert_eq!(call("round", &[Value::double(2.5)], Type::double()), Value::double(3.0));
        assert_eq!(call("round", &[Value::double(-2.5)], Type::double()), Value::double(-3.0));
        assert_eq!(call("floorf", &[Value::float(-1.5)], Type::float()), Value::float(-2.0));
        assert_eq!(call("ceil", &[Value::double(1.2)], Type::double()), Value::double(2.0));
        assert_eq!(call("trunc", &[Value::double(-1.7)], Type::double()), Value::double(-1.0));
    }

    #[test]
    fn test_integer_abs() {
        assert_eq!(call("abs", &[Value::int(-5)], Type::int()), Value::int(5));
        // abs(INT_MIN) wraps back to INT_MIN.
        assert_eq!(
            call("abs", &[Value::int(i32::MIN as i64)], Type::int()),
            Value::int(i32::MIN as i64)
        );
    }

    #[test]
    fn test_classification() {
        assert_eq!(call("isnan", &[Value::double(f64::NAN)], Type::int()), Value::int(1));
        assert_eq!(call("isinf", &[Value::double(1.0)], Type::int()), Value::int(0));
        assert_eq!(call("isfinite", &[Value::float(3.0)], Type::int()), Value::int(1));
        assert_eq!(call("signbit", &[Value::double(-0.0)], Type::int()), Value::int(1));
        assert_eq!(call("__fpclassify", &[Value::double(0.0)], Type::int()), Value::int(FP_ZERO));
        assert_eq!(
            call("__fpclassify", &[Value::double(f64::MIN_POSITIVE / 2.0)], Type::int()),
            Value::int(FP_SUBNORMAL)
        );
        assert_eq!(
            call("signbit", &[Value::Numeric(Number::NegativeNaN)], Type::int()),
            Value::int(1)
        );
    }

    #[test]
    fn test_two_argument_functions() {
        assert_eq!(call("fmin", &[Value::double(f64::NAN), Value::double(1.0)], Type::double()), Value::double(1.0));
        assert_eq!(call("fmax", &[Value::double(2.0), Value::double(1.0)], Type::double()), Value::double(2.0));
        assert_eq!(call("fdim", &[Value::double(1.0), Value::double(3.0)], Type::double()), Value::double(0.0));
        assert_eq!(call("fmod", &[Value::double(-7.0), Value::double(2.0)], Type::double()), Value::double(-1.0));
        assert_eq!(call("copysign", &[Value::double(3.0), Value::double(-0.0)], Type::double()), Value::double(-3.0));
    }

    #[test]
    fn test_remainder_ties_to_even() {
        assert_eq!(call("remainder", &[Value::double(5.0), Value::double(2.0)], Type::double()), Value::double(1.0));
        assert_eq!(call("remainder", &[Value::double(7.0), Value::double(2.0)], Type::double()), Value::double(-1.0));
        assert_eq!(call("remainder", &[Value::double(-5.0), Value::double(2.0)], Type::double()), Value::double(-1.0));
        assert_eq!(call("remainder", &[Value::double(5.5), Value::double(2.0)], Type::double()), Value::double(-0.5));
        let nan = call("remainder", &[Value::double(1.0), Value::double(0.0)], Type::double());
        assert!(nan.as_number().unwrap().is_nan());
    }

    #[test]
    fn test_non_concrete_arguments() {
        assert_eq!(call("fabs", &[Value::Unknown], Type::double()), Value::Unknown);
        assert_eq!(call("fmin", &[Value::double(1.0)], Type::double()), Value::Unknown);
        assert_eq!(
            call("fabs", &[Value::double(-1.0)], Type::Float(FloatKind::LongDouble)),
            Value::Unknown
        );
    }
}
