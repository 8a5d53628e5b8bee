//! Facts learned from a condition whose value is unknown.
//!
//! When an assume edge cannot be decided, the branch still tells something:
//! on the branch where `x == c` holds, `x` is `c`. Writing `c` back is only
//! sound when every conversion between `x` and the comparison is injective,
//! otherwise several values of `x` would satisfy the condition and picking
//! one would lose states.

use num_bigint::BigInt;
use num_traits::Signed;

use crate::arithmetic::java_binary_promotion;
use crate::ast::{BinaryOp, CExpr, JExpr, UnaryOp};
use crate::cast::{cast_c, cast_java};
use crate::cfa::{CfaNode, Expr};
use crate::classification::VariableClassification;
use crate::config::ValueAnalysisConfig;
use crate::evaluator::ExpressionEvaluator;
use crate::location::MemoryLocation;
use crate::machine::MachineModel;
use crate::number::Number;
use crate::precision::ValuePrecision;
use crate::types::{FloatKind, Type};
use crate::value::Value;

/// A value the branch forces a location to hold.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NarrowedValue {
    pub location: MemoryLocation,
    pub value: Value,
    pub ty: Type,
}

/// The variable side of a comparison, seen through its conversions.
struct Operand {
    location: MemoryLocation,
    ty: Type,
    /// Conversions applied to the variable, innermost first.
    casts: Vec<Type>,
}

pub struct AssumeNarrowing<'a, 'e> {
    evaluator: &'a ExpressionEvaluator<'e>,
    precision: &'a ValuePrecision,
    node: &'a CfaNode,
    config: &'a ValueAnalysisConfig,
    classification: Option<&'a dyn VariableClassification>,
}

impl<'a, 'e> AssumeNarrowing<'a, 'e> {
    pub fn new(
        evaluator: &'a ExpressionEvaluator<'e>,
        precision: &'a ValuePrecision,
        node: &'a CfaNode,
        config: &'a ValueAnalysisConfig,
        classification: Option<&'a dyn VariableClassification>,
    ) -> Self {
        Self {
            evaluator,
            precision,
            node,
            config,
            classification,
        }
    }

    /// Values implied by `condition` evaluating to `truth`.
    pub fn narrow(&self, condition: &Expr, truth: bool) -> Vec<NarrowedValue> {
        let mut facts = Vec::new();
        match condition {
            Expr::C(e) => self.narrow_c(e, truth, &mut facts),
            Expr::Java(e) => self.narrow_java(e, truth, &mut facts),
        }
        facts
    }

    fn machine(&self) -> &MachineModel {
        self.evaluator.machine()
    }

    /// Whether `location` may receive a narrowed value.
    fn is_open(&self, location: &MemoryLocation, ty: &Type) -> bool {
        let known = self
            .evaluator
            .state()
            .value_of(location)
            .is_some_and(Value::is_explicitly_known);
        !known && self.precision.is_tracking(location, ty, self.node)
    }

    fn is_boolean(&self, operand: &Operand) -> bool {
        operand.ty == Type::Bool || self.classification.is_some_and(|c| c.is_boolean(&operand.location))
    }

    // C

    fn narrow_c(&self, expr: &CExpr, truth: bool, facts: &mut Vec<NarrowedValue>) {
        match expr {
            CExpr::Unary {
                op: UnaryOp::Not,
                operand,
                ..
            } => self.narrow_c(operand, !truth, facts),
            CExpr::Binary {
                op: op @ (BinaryOp::Equals | BinaryOp::NotEquals),
                lhs,
                rhs,
                calc_type,
                ..
            } => {
                let equal = (*op == BinaryOp::Equals) == truth;
                let constant = self.evaluator.evaluate_c(rhs);
                if constant.is_explicitly_known() {
                    self.narrow_c_comparison(lhs, &constant, calc_type, equal, facts);
                }
                let constant = self.evaluator.evaluate_c(lhs);
                if constant.is_explicitly_known() {
                    self.narrow_c_comparison(rhs, &constant, calc_type, equal, facts);
                }
            }
            // `if (x)` is `if (x != 0)`.
            CExpr::Variable { .. } | CExpr::Field { .. } | CExpr::Subscript { .. } | CExpr::Cast { .. } => {
                self.narrow_c_comparison(expr, &Value::int(0), expr.ty(), !truth, facts);
            }
            _ => {}
        }
    }

    fn c_operand(&self, mut expr: &CExpr) -> Option<Operand> {
        let mut casts = Vec::new();
        while let CExpr::Cast { operand, ty } = expr {
            if !self.is_redundant_cast(operand.ty(), ty) {
                casts.push(ty.clone());
            }
            expr = operand;
        }
        casts.reverse();
        match expr {
            CExpr::Variable { ty, .. } | CExpr::Field { ty, .. } | CExpr::Subscript { ty, .. } if ty.is_scalar() => {
                let location = self.evaluator.location_of_c(expr)?;
                Some(Operand {
                    location,
                    ty: ty.clone(),
                    casts,
                })
            }
            _ => None,
        }
    }

    /// A conversion between types of identical representation.
    fn is_redundant_cast(&self, from: &Type, to: &Type) -> bool {
        if from == to {
            return true;
        }
        match (self.machine().integer_view(from), self.machine().integer_view(to)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn narrow_c_comparison(
        &self,
        var_side: &CExpr,
        constant: &Value,
        calc_type: &Type,
        equal: bool,
        facts: &mut Vec<NarrowedValue>,
    ) {
        let operand = match self.c_operand(var_side) {
            Some(operand) => operand,
            None => return,
        };
        if !self.is_open(&operand.location, &operand.ty) {
            return;
        }
        let target = cast_c(constant, calc_type, self.machine());
        let number = match target.as_number() {
            Some(n) => n,
            None => return,
        };

        if !equal {
            let boolean = self.config.optimize_boolean_variables
                && number.is_zero()
                && operand.casts.is_empty()
                && self.is_boolean(&operand);
            if boolean {
                log::trace!("Boolean {} is not 0, so it is 1", operand.location);
                facts.push(NarrowedValue {
                    location: operand.location,
                    value: Value::int(1),
                    ty: operand.ty,
                });
            }
            return;
        }

        if number.is_nan() || (operand.ty.is_float() && number.is_zero()) {
            return;
        }
        if !operand.casts.is_empty() && !self.config.narrow_through_casts {
            return;
        }
        if let Some(candidate) = self.invert_c(&operand, calc_type, &target) {
            log::trace!("Assume implies {} = {}", operand.location, candidate);
            facts.push(NarrowedValue {
                location: operand.location,
                value: candidate,
                ty: operand.ty,
            });
        }
    }

    /// The unique value of the operand's variable that converts to `target`.
    fn invert_c(&self, operand: &Operand, calc_type: &Type, target: &Value) -> Option<Value> {
        let machine = self.machine();
        let candidate = cast_c(target, &operand.ty, machine);
        if !candidate.is_explicitly_known() {
            return None;
        }
        let var_width = match &operand.ty {
            Type::Bool => 1,
            other => machine.integer_view(other).map_or(0, |(w, _)| w),
        };
        let mut current = candidate.clone();
        let mut from = operand.ty.clone();
        for to in operand.casts.iter().chain(std::iter::once(calc_type)) {
            if !is_injective_step(machine, &from, to, var_width, &current) {
                log::trace!("Conversion {} -> {} of {} is not invertible", from, to, operand.location);
                return None;
            }
            current = cast_c(&current, to, machine);
            from = to.clone();
        }
        (current == *target).then_some(candidate)
    }

    // Java

    fn narrow_java(&self, expr: &JExpr, truth: bool, facts: &mut Vec<NarrowedValue>) {
        match expr {
            JExpr::Unary {
                op: UnaryOp::Not,
                operand,
                ..
            } => self.narrow_java(operand, !truth, facts),
            JExpr::Binary {
                op: BinaryOp::ConditionalAnd,
                lhs,
                rhs,
                ..
            } if truth => {
                self.narrow_java(lhs, true, facts);
                self.narrow_java(rhs, true, facts);
            }
            JExpr::Binary {
                op: BinaryOp::ConditionalOr,
                lhs,
                rhs,
                ..
            } if !truth => {
                self.narrow_java(lhs, false, facts);
                self.narrow_java(rhs, false, facts);
            }
            JExpr::Binary {
                op: op @ (BinaryOp::Equals | BinaryOp::NotEquals),
                lhs,
                rhs,
                ..
            } => {
                let equal = (*op == BinaryOp::Equals) == truth;
                if let Ok(constant) = self.evaluator.evaluate_java(rhs) {
                    self.narrow_java_comparison(lhs, &constant, &rhs.ty(), equal, facts);
                }
                if let Ok(constant) = self.evaluator.evaluate_java(lhs) {
                    self.narrow_java_comparison(rhs, &constant, &lhs.ty(), equal, facts);
                }
            }
            JExpr::Variable { ty: Type::Bool, .. } | JExpr::StaticField { ty: Type::Bool, .. } => {
                self.narrow_java_comparison(expr, &Value::Boolean(true), &Type::Bool, truth, facts);
            }
            _ => {}
        }
    }

    fn java_operand(&self, expr: &JExpr) -> Option<(MemoryLocation, Type)> {
        match expr {
            JExpr::Variable { var, ty } => Some((var.location(), ty.clone())),
            JExpr::StaticField { class, field, ty } => Some((crate::ast::static_field_location(class, field), ty.clone())),
            _ => None,
        }
    }

    fn narrow_java_comparison(
        &self,
        var_side: &JExpr,
        constant: &Value,
        constant_type: &Type,
        equal: bool,
        facts: &mut Vec<NarrowedValue>,
    ) {
        if !constant.is_explicitly_known() {
            return;
        }
        let (location, ty) = match self.java_operand(var_side) {
            Some(operand) => operand,
            None => return,
        };
        if !self.is_open(&location, &ty) {
            return;
        }
        let value = match constant {
            Value::Boolean(b) if ty == Type::Bool => Value::Boolean(*b == equal),
            _ if !equal => return,
            Value::Null | Value::EnumConstant(_) if ty.is_java_reference() => constant.clone(),
            Value::Numeric(n) if is_java_numeric(&ty) && is_java_numeric(constant_type) => {
                if n.is_nan() || (ty.is_float() && n.is_zero()) {
                    return;
                }
                match invert_java(&ty, constant, constant_type) {
                    Some(v) => v,
                    None => return,
                }
            }
            _ => return,
        };
        log::trace!("Assume implies {} = {}", location, value);
        facts.push(NarrowedValue { location, value, ty });
    }
}

fn is_java_numeric(ty: &Type) -> bool {
    matches!(ty, Type::Int(_) | Type::Float(_))
}

/// Value of a Java variable of type `ty` equal to `constant` after numeric promotion.
fn invert_java(ty: &Type, constant: &Value, constant_type: &Type) -> Option<Value> {
    let promoted = java_binary_promotion(ty, constant_type);
    let target = cast_java(constant, &promoted);
    let candidate = cast_java(&target, ty);
    if let (Type::Int(_), Type::Float(kind)) = (ty, &promoted) {
        if !fits_mantissa(candidate.as_number()?, *kind) {
            return None;
        }
    }
    (cast_java(&candidate, &promoted) == target).then_some(candidate)
}

/// Whether an integer is exactly representable and alone in its rounding class.
fn fits_mantissa(n: &Number, kind: FloatKind) -> bool {
    match n.to_bigint() {
        Some(v) => v.abs() < (BigInt::from(1) << kind.mantissa_digits()),
        None => false,
    }
}

/// Whether converting `from` to `to` keeps distinct values of the narrowed
/// variable distinct; `current` is the candidate value before this step.
fn is_injective_step(machine: &MachineModel, from: &Type, to: &Type, var_width: u32, current: &Value) -> bool {
    if from == to {
        return true;
    }
    let integral = |t: &Type| *t == Type::Bool || machine.integer_view(t).is_some();
    match (from, to) {
        (_, Type::Bool) => false,
        (Type::Float(a), Type::Float(b)) => b.is_supported() && b.mantissa_digits() >= a.mantissa_digits(),
        (Type::Float(_), _) => false,
        (f, Type::Float(kind)) if integral(f) => {
            kind.is_supported() && current.as_number().is_some_and(|n| fits_mantissa(n, *kind))
        }
        (f, t) if integral(f) && integral(t) => machine.integer_view(t).is_some_and(|(w, _)| w >= var_width),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::VarRef;
    use crate::classification::VariableClasses;
    use crate::state::ValueState;

    use test_log::test;

    fn node() -> CfaNode {
        CfaNode::new(1, "main")
    }

    fn var(name: &str, ty: Type) -> CExpr {
        CExpr::var(VarRef::local("main", name), ty)
    }

    fn loc(name: &str) -> MemoryLocation {
        MemoryLocation::local("main", name)
    }

    fn narrow_with(
        state: &ValueState,
        condition: impl Into<Expr>,
        truth: bool,
        classification: Option<&dyn VariableClassification>,
    ) -> Vec<NarrowedValue> {
        let machine = MachineModel::linux32();
        let evaluator = ExpressionEvaluator::new(state, &machine);
        let precision = ValuePrecision::with_full();
        let node = node();
        let config = ValueAnalysisConfig::default();
        AssumeNarrowing::new(&evaluator, &precision, &node, &config, classification).narrow(&condition.into(), truth)
    }

    fn narrow(condition: impl Into<Expr>, truth: bool) -> Vec<NarrowedValue> {
        narrow_with(&ValueState::new(), condition, truth, None)
    }

    #[test]
    fn test_equality_on_true_branch() {
        let cond = CExpr::binary(BinaryOp::Equals, var("x", Type::int()), CExpr::int(5), Type::int());
        let facts = narrow(cond.clone(), true);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].location, loc("x"));
        assert_eq!(facts[0].value, Value::int(5));
        assert!(narrow(cond, false).is_empty());
    }

    #[test]
    fn test_constant_on_the_left() {
        let cond = CExpr::binary(BinaryOp::NotEquals, CExpr::int(7), var("x", Type::int()), Type::int());
        let facts = narrow(cond, false);
        assert_eq!(facts[0].value, Value::int(7));
    }

    #[test]
    fn test_not_and_bare_variable() {
        let x = var("x", Type::int());
        let facts = narrow(x.clone(), false);
        assert_eq!(facts[0].value, Value::int(0));
        assert!(narrow(x.clone(), true).is_empty());
        let not_x = CExpr::unary(UnaryOp::Not, x, Type::int());
        assert_eq!(narrow(not_x, true)[0].value, Value::int(0));
    }

    #[test]
    fn test_boolean_optimization() {
        let cond = CExpr::binary(BinaryOp::NotEquals, var("b", Type::int()), CExpr::int(0), Type::int());
        assert!(narrow(cond.clone(), true).is_empty());
        let classes = VariableClasses::new().with_boolean("main::b");
        let facts = narrow_with(&ValueState::new(), cond, true, Some(&classes));
        assert_eq!(facts[0].value, Value::int(1));

        let flag = CExpr::cast(var("f", Type::Bool), Type::int());
        let facts = narrow(flag, true);
        assert!(facts.is_empty());
        let facts = narrow(CExpr::binary(BinaryOp::NotEquals, var("f", Type::Bool), CExpr::int(0), Type::int()), true);
        assert_eq!(facts[0].value, Value::int(1));
        assert_eq!(facts[0].ty, Type::Bool);
    }

    #[test]
    fn test_known_variable_is_left_alone() {
        let mut state = ValueState::new();
        state.assign(loc("x"), Value::int(3), Type::int());
        let cond = CExpr::binary(BinaryOp::Equals, var("x", Type::int()), var("y", Type::int()), Type::int());
        let facts = narrow_with(&state, cond, true, None);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].location, loc("y"));
        assert_eq!(facts[0].value, Value::int(3));
    }

    #[test]
    fn test_narrowing_through_invertible_casts() {
        // (unsigned char)(int)c == 255 with c a signed char: only c == -1.
        let c = var("c", Type::schar());
        let cast = CExpr::cast(CExpr::cast(c, Type::int()), Type::uchar());
        let cond = CExpr::binary(BinaryOp::Equals, cast, CExpr::int(255), Type::int());
        let facts = narrow(cond, true);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].value, Value::int(-1));
    }

    #[test]
    fn test_no_narrowing_through_truncation() {
        // (unsigned char)x == 255 holds for x == 255, 511, -1, ...
        let x = var("x", Type::int());
        let cast = CExpr::cast(CExpr::cast(x, Type::int()), Type::uchar());
        let cond = CExpr::binary(BinaryOp::Equals, cast, CExpr::int(255), Type::int());
        assert!(narrow(cond, true).is_empty());
    }

    #[test]
    fn test_unreachable_constant_is_not_narrowed() {
        // An unsigned char never equals 300.
        let u = var("u", Type::uchar());
        let cond = CExpr::binary(BinaryOp::Equals, CExpr::cast(u, Type::int()), CExpr::int(300), Type::int());
        assert!(narrow(cond, true).is_empty());
    }

    #[test]
    fn test_float_narrowing() {
        let d = var("d", Type::double());
        let half = CExpr::float_literal("0.5", Type::double());
        let facts = narrow(CExpr::binary(BinaryOp::Equals, d.clone(), half, Type::double()), true);
        assert_eq!(facts[0].value, Value::double(0.5));

        // 0.0 == -0.0, so a zero says nothing about the sign.
        let zero = CExpr::float_literal("0.0", Type::double());
        assert!(narrow(CExpr::binary(BinaryOp::Equals, d, zero, Type::double()), true).is_empty());

        // int -> float loses precision above 2^24.
        let i = var("i", Type::int());
        let big = CExpr::float_literal("16777216.0", Type::float());
        let cond = CExpr::binary(BinaryOp::Equals, CExpr::cast(i.clone(), Type::float()), big, Type::float());
        assert!(narrow(cond, true).is_empty());
        let small = CExpr::float_literal("1024.0", Type::float());
        let cond = CExpr::binary(BinaryOp::Equals, CExpr::cast(i, Type::float()), small, Type::float());
        assert_eq!(narrow(cond, true)[0].value, Value::int(1024));
    }

    #[test]
    fn test_untracked_variable_is_not_narrowed() {
        let machine = MachineModel::linux32();
        let state = ValueState::new();
        let evaluator = ExpressionEvaluator::new(&state, &machine);
        let precision = ValuePrecision::scoped_empty();
        let node = node();
        let config = ValueAnalysisConfig::default();
        let cond = CExpr::binary(BinaryOp::Equals, var("x", Type::int()), CExpr::int(5), Type::int());
        let facts = AssumeNarrowing::new(&evaluator, &precision, &node, &config, None).narrow(&cond.into(), true);
        assert!(facts.is_empty());
    }

    #[test]
    fn test_java_narrowing() {
        let i = JExpr::var(VarRef::local("main", "i"), Type::java_int());
        let b = JExpr::var(VarRef::local("main", "b"), Type::Bool);
        let cond = JExpr::binary(BinaryOp::Equals, i.clone(), JExpr::int(4), Type::Bool);
        assert_eq!(narrow(cond, true)[0].value, Value::int(4));

        // A long constant outside the int range cannot equal an int.
        let wide = JExpr::binary(BinaryOp::Equals, i.clone(), JExpr::long(1 << 40), Type::Bool);
        assert!(narrow(wide, true).is_empty());

        assert_eq!(narrow(b.clone(), false)[0].value, Value::Boolean(false));
        let neq = JExpr::binary(BinaryOp::NotEquals, b.clone(), JExpr::BoolLiteral(true), Type::Bool);
        assert_eq!(narrow(neq, true)[0].value, Value::Boolean(false));

        let both = JExpr::binary(
            BinaryOp::ConditionalAnd,
            b,
            JExpr::binary(BinaryOp::Equals, i, JExpr::int(1), Type::Bool),
            Type::Bool,
        );
        assert_eq!(narrow(both, true).len(), 2);
    }

    #[test]
    fn test_java_references() {
        let r = JExpr::var(VarRef::local("main", "r"), Type::Reference("Color".into()));
        let red = JExpr::EnumConstant {
            class: "Color".into(),
            name: "RED".into(),
        };
        let facts = narrow(JExpr::binary(BinaryOp::Equals, r.clone(), red, Type::Bool), true);
        assert!(matches!(facts[0].value, Value::EnumConstant(_)));
        let facts = narrow(JExpr::binary(BinaryOp::NotEquals, r, JExpr::NullLiteral, Type::Bool), false);
        assert_eq!(facts[0].value, Value::Null);
    }
}
