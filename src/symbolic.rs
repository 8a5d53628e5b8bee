//! Symbolic values: expression trees over unknown inputs.
//!
//! The evaluator never builds these nodes directly; it goes through a
//! [`SymbolicFactory`], so a constraint-solving collaborator can substitute its
//! own node construction (e.g. with simplification or hash-consing).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::ast::{BinaryOp, UnaryOp};
use crate::location::MemoryLocation;
use crate::types::Type;
use crate::value::Value;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum SymbolicExpr {
    /// A fresh unknown input, optionally remembering the location it was created for.
    Identifier {
        id: u64,
        location: Option<MemoryLocation>,
        ty: Type,
    },
    /// A concrete operand wrapped with its type.
    Constant { value: Value, ty: Type },
    Binary {
        op: BinaryOp,
        lhs: Arc<SymbolicExpr>,
        rhs: Arc<SymbolicExpr>,
        calc_type: Type,
        ty: Type,
    },
    Unary {
        op: UnaryOp,
        operand: Arc<SymbolicExpr>,
        ty: Type,
    },
    Cast { operand: Arc<SymbolicExpr>, ty: Type },
    /// Address of a memory location.
    Address { location: MemoryLocation, ty: Type },
}

impl SymbolicExpr {
    pub fn ty(&self) -> &Type {
        match self {
            SymbolicExpr::Identifier { ty, .. }
            | SymbolicExpr::Constant { ty, .. }
            | SymbolicExpr::Binary { ty, .. }
            | SymbolicExpr::Unary { ty, .. }
            | SymbolicExpr::Cast { ty, .. }
            | SymbolicExpr::Address { ty, .. } => ty,
        }
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        match self {
            SymbolicExpr::Identifier { .. } | SymbolicExpr::Constant { .. } | SymbolicExpr::Address { .. } => 1,
            SymbolicExpr::Binary { lhs, rhs, .. } => 1 + lhs.size() + rhs.size(),
            SymbolicExpr::Unary { operand, .. } | SymbolicExpr::Cast { operand, .. } => 1 + operand.size(),
        }
    }
}

impl fmt::Display for SymbolicExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolicExpr::Identifier { id, .. } => write!(f, "s{}", id),
            SymbolicExpr::Constant { value, .. } => write!(f, "{}", value),
            SymbolicExpr::Binary { op, lhs, rhs, .. } => write!(f, "({} {} {})", lhs, op, rhs),
            SymbolicExpr::Unary { op, operand, .. } => write!(f, "{}{}", op, operand),
            SymbolicExpr::Cast { operand, ty } => write!(f, "({}){}", ty, operand),
            SymbolicExpr::Address { location, .. } => write!(f, "&{}", location),
        }
    }
}

/// Construction interface for symbolic nodes.
pub trait SymbolicFactory: fmt::Debug + Send + Sync {
    /// A new identifier, distinct from every identifier produced before.
    fn fresh_identifier(&self, location: Option<&MemoryLocation>, ty: &Type) -> SymbolicExpr;

    fn binary(&self, op: BinaryOp, lhs: SymbolicExpr, rhs: SymbolicExpr, calc_type: &Type, ty: &Type) -> SymbolicExpr;

    fn unary(&self, op: UnaryOp, operand: SymbolicExpr, ty: &Type) -> SymbolicExpr;

    fn cast(&self, operand: SymbolicExpr, ty: &Type) -> SymbolicExpr;

    fn address_of(&self, location: MemoryLocation, ty: &Type) -> SymbolicExpr;

    /// Typed operand wrapper: symbolic values pass through, concrete ones become constants.
    fn wrap(&self, value: &Value, ty: &Type) -> SymbolicExpr {
        match value {
            Value::Symbolic(s) => (**s).clone(),
            other => SymbolicExpr::Constant {
                value: other.clone(),
                ty: ty.clone(),
            },
        }
    }
}

/// Plain tree construction with a monotonic identifier counter.
#[derive(Debug, Default)]
pub struct ExpressionFactory {
    next_id: AtomicU64,
}

impl ExpressionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identifiers handed out so far.
    pub fn identifiers_created(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }
}

impl SymbolicFactory for ExpressionFactory {
    fn fresh_identifier(&self, location: Option<&MemoryLocation>, ty: &Type) -> SymbolicExpr {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        SymbolicExpr::Identifier {
            id,
            location: location.cloned(),
            ty: ty.clone(),
        }
    }

    fn binary(&self, op: BinaryOp, lhs: SymbolicExpr, rhs: SymbolicExpr, calc_type: &Type, ty: &Type) -> SymbolicExpr {
        SymbolicExpr::Binary {
            op,
            lhs: Arc::new(lhs),
            rhs: Arc::new(rhs),
            calc_type: calc_type.clone(),
            ty: ty.clone(),
        }
    }

    fn unary(&self, op: UnaryOp, operand: SymbolicExpr, ty: &Type) -> SymbolicExpr {
        SymbolicExpr::Unary {
            op,
            operand: Arc::new(operand),
            ty: ty.clone(),
        }
    }

    fn cast(&self, operand: SymbolicExpr, ty: &Type) -> SymbolicExpr {
        // A cast to the operand's own type is the operand.
        if operand.ty() == ty {
            return operand;
        }
        SymbolicExpr::Cast {
            operand: Arc::new(operand),
            ty: ty.clone(),
        }
    }

    fn address_of(&self, location: MemoryLocation, ty: &Type) -> SymbolicExpr {
        SymbolicExpr::Address {
            location,
            ty: ty.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_fresh_identifiers_are_distinct() {
        let factory = ExpressionFactory::new();
        let a = factory.fresh_identifier(None, &Type::int());
        let b = factory.fresh_identifier(None, &Type::int());
        assert_ne!(a, b);
        assert_eq!(factory.identifiers_created(), 2);
    }

    #[test]
    fn test_cast_to_same_type_is_identity() {
        let factory = ExpressionFactory::new();
        let s = factory.fresh_identifier(None, &Type::int());
        assert_eq!(factory.cast(s.clone(), &Type::int()), s);
        assert!(matches!(factory.cast(s, &Type::long()), SymbolicExpr::Cast { .. }));
    }

    #[test]
    fn test_wrap_and_display() {
        let factory = ExpressionFactory::new();
        let s = factory.fresh_identifier(None, &Type::int());
        let c = factory.wrap(&Value::int(3), &Type::int());
        let sum = factory.binary(BinaryOp::Plus, s, c, &Type::int(), &Type::int());
        assert_eq!(sum.to_string(), "(s0 + 3)");
        assert_eq!(sum.size(), 3);
    }
}
