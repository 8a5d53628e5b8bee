//! Concrete numbers carried by [`Value::Numeric`](crate::value::Value::Numeric).
//!
//! Equality and hashing are *bitwise* for floats: two states agree on a float
//! variable only when the stored bits agree, so `NaN == NaN` here while IEEE
//! comparison (done by the evaluator) says otherwise.

use std::fmt;
use std::hash::{Hash, Hasher};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

/// Exact decimal `unscaled * 10^-scale`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Decimal {
    pub unscaled: BigInt,
    pub scale: u32,
}

impl Decimal {
    pub fn new(unscaled: BigInt, scale: u32) -> Self {
        Self { unscaled, scale }
    }

    /// Parses plain decimal notation such as `-12.050`.
    pub fn parse(text: &str) -> Option<Self> {
        let (int_part, frac_part) = text.split_once('.').unwrap_or((text, ""));
        if frac_part.chars().any(|c| !c.is_ascii_digit()) {
            return None;
        }
        let digits = format!("{}{}", int_part, frac_part);
        let unscaled = digits.parse::<BigInt>().ok()?;
        Some(Self::new(unscaled, frac_part.len() as u32))
    }

    pub fn to_rational(&self) -> BigRational {
        let denom = num_traits::pow(BigInt::from(10), self.scale as usize);
        BigRational::new(self.unscaled.clone(), denom)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.unscaled);
        }
        let digits = self.unscaled.abs().to_string();
        let scale = self.scale as usize;
        let padded = format!("{:0>width$}", digits, width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        let sign = if self.unscaled.is_negative() { "-" } else { "" };
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

#[derive(Debug, Clone)]
pub enum Number {
    Int(i64),
    /// Integer outside the `i64` range; construct through [`Number::from_bigint`].
    Big(BigInt),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Rational(BigRational),
    /// A NaN with the sign bit set, as produced by negating NaN in C.
    NegativeNaN,
}

impl Number {
    /// Normalising constructor: values fitting `i64` become [`Number::Int`].
    pub fn from_bigint(value: BigInt) -> Self {
        match value.to_i64() {
            Some(v) => Number::Int(v),
            None => Number::Big(value),
        }
    }

    pub fn is_integer_kind(&self) -> bool {
        matches!(self, Number::Int(_) | Number::Big(_))
    }

    pub fn is_float_kind(&self) -> bool {
        matches!(self, Number::Float(_) | Number::Double(_) | Number::NegativeNaN)
    }

    pub fn is_nan(&self) -> bool {
        match self {
            Number::Float(f) => f.is_nan(),
            Number::Double(d) => d.is_nan(),
            Number::NegativeNaN => true,
            _ => false,
        }
    }

    pub fn is_infinite(&self) -> bool {
        match self {
            Number::Float(f) => f.is_infinite(),
            Number::Double(d) => d.is_infinite(),
            _ => false,
        }
    }

    /// Numeric zero, including `-0.0`.
    pub fn is_zero(&self) -> bool {
        match self {
            Number::Int(i) => *i == 0,
            Number::Big(_) => false,
            Number::Float(f) => *f == 0.0,
            Number::Double(d) => *d == 0.0,
            Number::Decimal(d) => d.unscaled.is_zero(),
            Number::Rational(r) => r.is_zero(),
            Number::NegativeNaN => false,
        }
    }

    pub fn is_one(&self) -> bool {
        match self {
            Number::Int(i) => *i == 1,
            Number::Float(f) => *f == 1.0,
            Number::Double(d) => *d == 1.0,
            Number::Decimal(d) => d.to_rational().is_one(),
            Number::Rational(r) => r.is_one(),
            Number::Big(_) | Number::NegativeNaN => false,
        }
    }

    pub fn is_sign_negative(&self) -> bool {
        match self {
            Number::Int(i) => *i < 0,
            Number::Big(b) => b.is_negative(),
            Number::Float(f) => f.is_sign_negative(),
            Number::Double(d) => d.is_sign_negative(),
            Number::Decimal(d) => d.unscaled.is_negative(),
            Number::Rational(r) => r.is_negative(),
            Number::NegativeNaN => true,
        }
    }

    /// The exact integer value, if this number is a finite integer.
    pub fn to_bigint(&self) -> Option<BigInt> {
        match self {
            Number::Int(i) => Some(BigInt::from(*i)),
            Number::Big(b) => Some(b.clone()),
            Number::Float(f) if f.is_finite() && f.fract() == 0.0 => BigInt::from_f32_exact(*f),
            Number::Double(d) if d.is_finite() && d.fract() == 0.0 => BigInt::from_f64_exact(*d),
            Number::Decimal(d) => {
                let r = d.to_rational();
                r.is_integer().then(|| r.to_integer())
            }
            Number::Rational(r) => r.is_integer().then(|| r.to_integer()),
            _ => None,
        }
    }

    /// Whether this is a finite value with a non-zero fractional part.
    pub fn has_fraction(&self) -> bool {
        match self {
            Number::Float(f) => f.is_finite() && f.fract() != 0.0,
            Number::Double(d) => d.is_finite() && d.fract() != 0.0,
            Number::Decimal(d) => !d.to_rational().is_integer(),
            Number::Rational(r) => !r.is_integer(),
            _ => false,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(*i),
            _ => self.to_bigint().and_then(|b| b.to_i64()),
        }
    }

    /// Nearest `f64`.
    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Int(i) => *i as f64,
            Number::Big(b) => b.to_f64().unwrap_or(if b.is_negative() {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }),
            Number::Float(f) => *f as f64,
            Number::Double(d) => *d,
            Number::Decimal(d) => rational_to_f64(&d.to_rational()),
            Number::Rational(r) => rational_to_f64(r),
            Number::NegativeNaN => -f64::NAN,
        }
    }

    /// Nearest `f32`, rounding once from integers and doubles.
    pub fn to_f32(&self) -> f32 {
        match self {
            Number::Int(i) => *i as f32,
            Number::Big(b) => b.to_f32().unwrap_or(if b.is_negative() {
                f32::NEG_INFINITY
            } else {
                f32::INFINITY
            }),
            Number::Float(f) => *f,
            Number::Double(d) => *d as f32,
            Number::NegativeNaN => -f32::NAN,
            other => other.to_f64() as f32,
        }
    }
}

fn rational_to_f64(r: &BigRational) -> f64 {
    match (r.numer().to_f64(), r.denom().to_f64()) {
        (Some(n), Some(d)) => n / d,
        _ => f64::NAN,
    }
}

trait FromFloatExact: Sized {
    fn from_f32_exact(f: f32) -> Option<Self>;
    fn from_f64_exact(d: f64) -> Option<Self>;
}

impl FromFloatExact for BigInt {
    fn from_f32_exact(f: f32) -> Option<Self> {
        num_traits::FromPrimitive::from_f32(f)
    }

    fn from_f64_exact(d: f64) -> Option<Self> {
        num_traits::FromPrimitive::from_f64(d)
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Big(a), Number::Big(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => a.to_bits() == b.to_bits(),
            (Number::Double(a), Number::Double(b)) => a.to_bits() == b.to_bits(),
            (Number::Decimal(a), Number::Decimal(b)) => a == b,
            (Number::Rational(a), Number::Rational(b)) => a == b,
            (Number::NegativeNaN, Number::NegativeNaN) => true,
            _ => false,
        }
    }
}

impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Number::Int(i) => i.hash(state),
            Number::Big(b) => b.hash(state),
            Number::Float(f) => f.to_bits().hash(state),
            Number::Double(d) => d.to_bits().hash(state),
            Number::Decimal(d) => d.hash(state),
            Number::Rational(r) => r.hash(state),
            Number::NegativeNaN => {}
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<BigInt> for Number {
    fn from(value: BigInt) -> Self {
        Number::from_bigint(value)
    }
}

impl From<f32> for Number {
    fn from(value: f32) -> Self {
        Number::Float(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Double(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Big(b) => write!(f, "{}", b),
            Number::Float(x) => write!(f, "{:?}f", x),
            Number::Double(x) => write!(f, "{:?}", x),
            Number::Decimal(d) => write!(f, "{}", d),
            Number::Rational(r) => write!(f, "{}", r),
            Number::NegativeNaN => write!(f, "-NaN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_normalisation() {
        assert_eq!(Number::from_bigint(BigInt::from(42)), Number::Int(42));
        let big = BigInt::from(u64::MAX);
        assert_eq!(Number::from_bigint(big.clone()), Number::Big(big));
    }

    #[test]
    fn test_bitwise_float_equality() {
        assert_eq!(Number::Double(f64::NAN), Number::Double(f64::NAN));
        assert_ne!(Number::Double(0.0), Number::Double(-0.0));
        assert!(Number::Double(-0.0).is_zero());
    }

    #[test]
    fn test_exact_integer_conversion() {
        assert_eq!(Number::Double(3.0).to_bigint(), Some(BigInt::from(3)));
        assert_eq!(Number::Double(3.5).to_bigint(), None);
        assert!(Number::Double(3.5).has_fraction());
        assert_eq!(Number::Float(f32::INFINITY).to_bigint(), None);
        assert_eq!(Number::NegativeNaN.to_bigint(), None);
    }

    #[test]
    fn test_decimal() {
        let d = Decimal::parse("-12.050").unwrap();
        assert_eq!(d.scale, 3);
        assert_eq!(d.to_string(), "-12.050");
        assert!(Number::Decimal(d).has_fraction());
        let whole = Decimal::parse("7.00").unwrap();
        assert_eq!(Number::Decimal(whole).to_bigint(), Some(BigInt::from(7)));
        assert_eq!(Decimal::parse("0.05").unwrap().to_string(), "0.05");
    }
}
