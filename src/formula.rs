//! Export of a state as an SMT-LIB formula.
//!
//! Every tracked integer becomes a bitvector equality and every tracked
//! `float`/`double` an IEEE equality over its exact bit pattern. Values
//! without a fixed-width encoding (symbolic, references, arrays) are left out.

use std::fmt;

use num_bigint::BigInt;

use crate::cast::wrap_integer;
use crate::machine::MachineModel;
use crate::number::Number;
use crate::state::ValueState;
use crate::types::{FloatKind, Type};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    True,
    And(Vec<Formula>),
    /// `name` as a bitvector of `width` bits equals `value`.
    BvEquals { name: String, width: u32, value: BigInt },
    /// `name` as a float with `exponent` and `significand` bits (hidden bit
    /// included) has the bit pattern `bits`.
    FpEquals {
        name: String,
        exponent: u32,
        significand: u32,
        bits: u64,
    },
    BoolEquals { name: String, value: bool },
}

impl Formula {
    /// Conjunction, flattened; the empty conjunction is `True`.
    pub fn and(parts: Vec<Formula>) -> Formula {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Formula::True => {}
                Formula::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Formula::True,
            1 => flat.pop().unwrap_or(Formula::True),
            _ => Formula::And(flat),
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::True => write!(f, "true"),
            Formula::And(parts) => {
                write!(f, "(and")?;
                for p in parts {
                    write!(f, " {}", p)?;
                }
                write!(f, ")")
            }
            Formula::BvEquals { name, width, value } => {
                let unsigned = wrap_integer(value, *width, false);
                write!(f, "(= |{}| (_ bv{} {}))", name, unsigned, width)
            }
            Formula::FpEquals {
                name,
                exponent,
                significand,
                bits,
            } => {
                let e = *exponent as usize;
                let m = (*significand - 1) as usize;
                let sign = (bits >> (e + m)) & 1;
                let biased = (bits >> m) & ((1u64 << e) - 1);
                let mantissa = bits & ((1u64 << m) - 1);
                write!(
                    f,
                    "(= |{}| (fp #b{} #b{:0e$b} #b{:0m$b}))",
                    name,
                    sign,
                    biased,
                    mantissa,
                    e = e,
                    m = m
                )
            }
            Formula::BoolEquals { name, value } => write!(f, "(= |{}| {})", name, value),
        }
    }
}

fn float_bits(n: &Number, kind: FloatKind) -> Option<u64> {
    Some(match (kind, n) {
        (FloatKind::Float, Number::NegativeNaN) => (-f32::NAN).to_bits() as u64,
        (FloatKind::Double, Number::NegativeNaN) => (-f64::NAN).to_bits(),
        (FloatKind::Float, n) => n.to_f32().to_bits() as u64,
        (FloatKind::Double, n) => n.to_f64().to_bits(),
        _ => return None,
    })
}

impl ValueState {
    /// The conjunction of the equalities describing this state.
    pub fn to_formula(&self, machine: &MachineModel) -> Formula {
        let mut parts = Vec::new();
        for (location, entry) in self.entries() {
            let name = location.to_string();
            let part = match (&entry.value, &entry.ty) {
                (Value::Boolean(b), _) => Formula::BoolEquals { name, value: *b },
                (Value::Numeric(n), Type::Float(kind)) => match float_bits(n, *kind) {
                    Some(bits) => Formula::FpEquals {
                        name,
                        exponent: if *kind == FloatKind::Float { 8 } else { 11 },
                        significand: kind.mantissa_digits(),
                        bits,
                    },
                    None => continue,
                },
                (Value::Numeric(n), ty) => {
                    let width = match ty {
                        Type::Bool => machine.size_of_in_bits(ty).map(|w| w as u32),
                        other => machine.integer_view(other).map(|(w, _)| w),
                    };
                    match (width, n.to_bigint()) {
                        (Some(width), Some(value)) => Formula::BvEquals { name, width, value },
                        _ => continue,
                    }
                }
                _ => continue,
            };
            parts.push(part);
        }
        Formula::and(parts)
    }
}
