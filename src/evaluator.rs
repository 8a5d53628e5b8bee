//! Evaluation of expression trees against an abstract state.
//!
//! C evaluation is total: whatever cannot be computed is [`Value::Unknown`].
//! Java evaluation additionally signals [`IllegalOperation`] for integral
//! division by zero, which only the assume handler catches.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use num_bigint::BigInt;

use crate::arithmetic::{
    float_arithmetic, float_comparison, integer_arithmetic, integer_comparison, java_binary_promotion,
    java_unary_promotion, DivisionByZero, Flavor,
};
use crate::ast::{BinaryOp, CExpr, JExpr, TypeIdOp, UnaryOp};
use crate::builtins;
use crate::cast::{cast_c, cast_java, wrap_integer};
use crate::error::IllegalOperation;
use crate::location::MemoryLocation;
use crate::machine::MachineModel;
use crate::number::Number;
use crate::state::ValueState;
use crate::symbolic::SymbolicFactory;
use crate::types::{ArrayLength, FloatKind, Type};
use crate::value::{ArrayId, ArrayObject, EnumConstant, Value};

/// Arrays longer than this are not materialised in the arena.
pub const MAX_TRACKED_ARRAY_LENGTH: i64 = 1 << 16;

/// Where a Java assignment writes.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum JavaTarget {
    Location(MemoryLocation),
    ArrayElement(ArrayId, i64),
}

pub struct ExpressionEvaluator<'a> {
    state: &'a ValueState,
    machine: &'a MachineModel,
    symbolic: Option<&'a dyn SymbolicFactory>,
    missing_pointer: Cell<bool>,
    missing_field_access: Cell<bool>,
    allocations: RefCell<Vec<(ArrayId, ArrayObject)>>,
    next_array_index: Cell<u32>,
}

impl<'a> ExpressionEvaluator<'a> {
    pub fn new(state: &'a ValueState, machine: &'a MachineModel) -> Self {
        Self {
            state,
            machine,
            symbolic: None,
            missing_pointer: Cell::new(false),
            missing_field_access: Cell::new(false),
            allocations: RefCell::new(Vec::new()),
            next_array_index: Cell::new(0),
        }
    }

    /// Builds symbolic expressions through `factory` where a concrete value is unattainable.
    pub fn with_symbolic(mut self, factory: &'a dyn SymbolicFactory) -> Self {
        self.symbolic = Some(factory);
        self
    }

    pub fn state(&self) -> &ValueState {
        self.state
    }

    pub fn machine(&self) -> &MachineModel {
        self.machine
    }

    pub fn symbolic_factory(&self) -> Option<&'a dyn SymbolicFactory> {
        self.symbolic
    }

    /// Whether a pointer dereference was met since construction.
    pub fn missing_pointer(&self) -> bool {
        self.missing_pointer.get()
    }

    /// Whether a dynamic (instance) field access was met since construction.
    pub fn missing_field_access(&self) -> bool {
        self.missing_field_access.get()
    }

    /// Arrays created during evaluation, to be stored into the successor state.
    pub fn take_allocations(&self) -> Vec<(ArrayId, ArrayObject)> {
        self.allocations.take()
    }

    fn read(&self, location: &MemoryLocation) -> Value {
        self.state.value_of(location).cloned().unwrap_or(Value::Unknown)
    }

    // C

    pub fn evaluate_c(&self, expr: &CExpr) -> Value {
        match expr {
            CExpr::IntLiteral { value, .. } => Value::Numeric(Number::from_bigint(value.clone())),
            CExpr::FloatLiteral { text, ty } => parse_float_literal(text, ty),
            CExpr::CharLiteral { value, ty } => cast_c(&Value::int(*value as i64), ty, self.machine),
            CExpr::StringLiteral { .. } => Value::Unknown,
            CExpr::Variable { var, ty } => {
                if ty.is_aggregate() {
                    return Value::Unknown;
                }
                self.read(&var.location())
            }
            CExpr::Enumerator { value, .. } => value.map_or(Value::Unknown, Value::int),
            CExpr::FunctionName { name, .. } => Value::Function(name.clone()),
            CExpr::Binary {
                op,
                lhs,
                rhs,
                calc_type,
                ty,
            } => self.evaluate_c_binary(*op, lhs, rhs, calc_type, ty),
            CExpr::Unary { op, operand, ty } => self.evaluate_c_unary(*op, operand, ty),
            CExpr::Cast { operand, ty } => {
                let value = self.evaluate_c(operand);
                match &value {
                    Value::Symbolic(_) => self.symbolic_cast(&value, operand.ty(), ty),
                    _ => cast_c(&value, ty, self.machine),
                }
            }
            CExpr::TypeId { op, operand_type, ty } => {
                let size = match op {
                    TypeIdOp::SizeOf => self.size_of(operand_type),
                    TypeIdOp::AlignOf => self.machine.align_of(operand_type).map_or(Value::Unknown, |a| Value::int(a as i64)),
                };
                cast_c(&size, ty, self.machine)
            }
            CExpr::Field { ty, .. } | CExpr::Subscript { ty, .. } => {
                if ty.is_aggregate() {
                    return Value::Unknown;
                }
                match self.location_of_c(expr) {
                    Some(loc) => self.read(&loc),
                    None => Value::Unknown,
                }
            }
            CExpr::Deref { operand, .. } => {
                self.evaluate_c(operand);
                self.missing_pointer.set(true);
                Value::Unknown
            }
            CExpr::AddressOf { operand, ty } => match (self.symbolic, self.location_of_c(operand)) {
                (Some(factory), Some(loc)) => Value::Symbolic(Arc::new(factory.address_of(loc, ty))),
                _ => Value::Unknown,
            },
            CExpr::Call { function, args, ty } => {
                if !builtins::is_builtin(function) {
                    return Value::Unknown;
                }
                let values: Vec<Value> = args.iter().map(|a| self.evaluate_c(a)).collect();
                builtins::evaluate(function, &values, ty, self.machine).unwrap_or(Value::Unknown)
            }
        }
    }

    fn evaluate_c_binary(&self, op: BinaryOp, lhs: &CExpr, rhs: &CExpr, calc_type: &Type, ty: &Type) -> Value {
        let left = self.evaluate_c(lhs);
        let right = self.evaluate_c(rhs);
        if left.is_unknown() || right.is_unknown() {
            return Value::Unknown;
        }
        if left.is_symbolic() || right.is_symbolic() {
            return self.symbolic_binary(op, &left, lhs.ty(), &right, rhs.ty(), calc_type, ty);
        }
        if let (Value::Function(a), Value::Function(b)) = (&left, &right) {
            return match op {
                BinaryOp::Equals => Value::from_bool_as_int(a == b),
                BinaryOp::NotEquals => Value::from_bool_as_int(a != b),
                _ => Value::Unknown,
            };
        }

        let left = cast_c(&left, calc_type, self.machine);
        // Only the low bits of a shift distance matter, and they fit any type.
        let right = if op.is_shift() {
            right
        } else {
            cast_c(&right, calc_type, self.machine)
        };
        let (a, b) = match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Value::Unknown,
        };

        let result = match calc_type {
            Type::Float(kind) => {
                if op == BinaryOp::Modulo || op.is_shift() || op.is_bitwise() {
                    panic!("operator {} applied to {} operands", op, calc_type);
                }
                match kind {
                    FloatKind::Float => float_op(op, a.to_f32(), b.to_f32(), Value::float),
                    FloatKind::Double => float_op(op, a.to_f64(), b.to_f64(), Value::double),
                    _ => {
                        log::debug!("Cannot compute {} on {} operands", op, calc_type);
                        return Value::Unknown;
                    }
                }
            }
            _ => {
                let (width, _) = match calc_type {
                    Type::Bool => (8, false),
                    other => match self.machine.integer_view(other) {
                        Some(view) => view,
                        None => return Value::Unknown,
                    },
                };
                let (a, b) = match (a.to_bigint(), b.to_bigint()) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Value::Unknown,
                };
                if op.is_relational() {
                    Value::from_bool_as_int(integer_comparison(op, &a, &b))
                } else {
                    match integer_arithmetic(op, &a, &b, width, Flavor::C) {
                        Ok(Some(v)) => Value::Numeric(Number::from_bigint(v)),
                        Ok(None) => Value::Unknown,
                        Err(DivisionByZero) => {
                            log::warn!("Division by zero in ({} {} {}), assuming 0", lhs, op, rhs);
                            Value::int(0)
                        }
                    }
                }
            }
        };
        if op.is_relational() {
            result
        } else {
            cast_c(&result, ty, self.machine)
        }
    }

    fn evaluate_c_unary(&self, op: UnaryOp, operand: &CExpr, ty: &Type) -> Value {
        match op {
            UnaryOp::SizeOf => return cast_c(&self.size_of(operand.ty()), ty, self.machine),
            UnaryOp::AlignOf => {
                let align = self.machine.align_of(operand.ty());
                return cast_c(&align.map_or(Value::Unknown, |a| Value::int(a as i64)), ty, self.machine);
            }
            _ => {}
        }
        let value = self.evaluate_c(operand);
        if value.is_symbolic() {
            return self.symbolic_unary(op, &value, operand.ty(), ty);
        }
        match op {
            UnaryOp::Not => match value.truth() {
                Some(t) => Value::from_bool_as_int(!t),
                None => Value::Unknown,
            },
            UnaryOp::Plus => cast_c(&value, ty, self.machine),
            UnaryOp::Minus => match cast_c(&value, ty, self.machine) {
                Value::Numeric(n) => match negate(&n, ty) {
                    Some(v) => cast_c(&v, ty, self.machine),
                    None => Value::Unknown,
                },
                _ => Value::Unknown,
            },
            UnaryOp::Complement => {
                if ty.is_float() {
                    panic!("operator ~ applied to {} operand", ty);
                }
                match cast_c(&value, ty, self.machine).as_number().and_then(Number::to_bigint) {
                    Some(v) => cast_c(&Value::Numeric(Number::from_bigint(-v - 1)), ty, self.machine),
                    None => Value::Unknown,
                }
            }
            UnaryOp::SizeOf | UnaryOp::AlignOf => unreachable!(),
        }
    }

    /// `sizeof` of a type; a variable-length array is sized only when its
    /// length is a literal or a variable with a known value.
    pub fn size_of(&self, ty: &Type) -> Value {
        match ty {
            Type::Array {
                element,
                length: ArrayLength::Variable(length),
            } => {
                let length = match length.as_ref() {
                    CExpr::IntLiteral { .. } | CExpr::Variable { .. } => self.evaluate_c(length).as_i64(),
                    _ => None,
                };
                match (length, self.size_of(element).as_i64()) {
                    (Some(n), Some(size)) if n >= 0 => n.checked_mul(size).map_or(Value::Unknown, Value::int),
                    _ => Value::Unknown,
                }
            }
            other => self
                .machine
                .size_of(other)
                .and_then(|s| i64::try_from(s).ok())
                .map_or(Value::Unknown, Value::int),
        }
    }

    /// Resolves a C lvalue to the memory location it designates.
    ///
    /// Anything reached through a pointer is unresolved and flags missing
    /// pointer information.
    pub fn location_of_c(&self, expr: &CExpr) -> Option<MemoryLocation> {
        match expr {
            CExpr::Variable { var, .. } => Some(var.location()),
            CExpr::Field {
                owner, field, deref, ..
            } => {
                if *deref {
                    self.missing_pointer.set(true);
                    return None;
                }
                let composite = owner.ty().as_composite()?;
                let base = self.location_of_c(owner)?;
                let offset = self.machine.field_offset(composite, field)?;
                base.with_added_offset(offset)
            }
            CExpr::Subscript { array, index, .. } => match array.ty() {
                Type::Array { element, length } => {
                    let base = self.location_of_c(array)?;
                    let i = self.evaluate_c(index).as_i64()?;
                    let in_bounds = match length {
                        ArrayLength::Fixed(n) => i >= 0 && (i as u64) < *n,
                        _ => i >= 0,
                    };
                    if !in_bounds {
                        log::debug!("Index {} out of bounds in {}", i, expr);
                        return None;
                    }
                    let size = self.machine.size_of(element)?;
                    base.with_added_offset((i as u64).checked_mul(size)?)
                }
                _ => {
                    self.missing_pointer.set(true);
                    None
                }
            },
            CExpr::Deref { .. } => {
                self.missing_pointer.set(true);
                None
            }
            _ => None,
        }
    }

    // Java

    pub fn evaluate_java(&self, expr: &JExpr) -> Result<Value, IllegalOperation> {
        let value = match expr {
            JExpr::IntLiteral { value, .. } => Value::int(*value),
            JExpr::FloatLiteral { text, ty } => parse_float_literal(text, ty),
            JExpr::CharLiteral(c) => Value::int(*c as i64),
            JExpr::BoolLiteral(b) => Value::Boolean(*b),
            JExpr::NullLiteral => Value::Null,
            JExpr::StringLiteral(_) => Value::Unknown,
            JExpr::Variable { var, .. } => self.read(&var.location()),
            JExpr::Binary { op, lhs, rhs, ty } => self.evaluate_java_binary(*op, lhs, rhs, ty)?,
            JExpr::Unary { op, operand, ty } => self.evaluate_java_unary(*op, operand, ty)?,
            JExpr::Cast { operand, ty } => {
                let value = self.evaluate_java(operand)?;
                match &value {
                    Value::Symbolic(_) => self.symbolic_cast(&value, &operand.ty(), ty),
                    _ => cast_java(&value, ty),
                }
            }
            JExpr::EnumConstant { class, name } => Value::EnumConstant(EnumConstant {
                class: class.clone(),
                name: name.clone(),
            }),
            JExpr::ArrayCreation {
                site,
                element,
                lengths,
                initializer,
            } => {
                if let Some(init) = initializer {
                    return self.evaluate_java(init);
                }
                let mut dims = Vec::with_capacity(lengths.len());
                for l in lengths {
                    match self.evaluate_java(l)?.as_i64() {
                        Some(n) if n < 0 => {
                            return Err(IllegalOperation(format!("negative array size {} in {}", n, expr)));
                        }
                        Some(n) if n <= MAX_TRACKED_ARRAY_LENGTH => dims.push(n),
                        _ => return Ok(Value::Unknown),
                    }
                }
                if dims.is_empty() {
                    return Ok(Value::Unknown);
                }
                self.new_array(*site, element, &dims)
            }
            JExpr::ArrayInitializer { site, element, elements } => {
                let mut values = Vec::with_capacity(elements.len());
                for e in elements {
                    let v = self.evaluate_java(e)?;
                    values.push(if element.is_scalar() { cast_java(&v, element) } else { v });
                }
                let id = self.next_array_id(*site);
                self.allocations
                    .borrow_mut()
                    .push((id, ArrayObject::new(element.clone(), values)));
                Value::Array(id)
            }
            JExpr::ArrayLength { array } => match self.evaluate_java(array)? {
                Value::Array(id) => self
                    .array(id)
                    .map_or(Value::Unknown, |a| Value::int(a.len() as i64)),
                _ => Value::Unknown,
            },
            JExpr::Subscript { array, index, .. } => {
                let array = self.evaluate_java(array)?;
                let index = self.evaluate_java(index)?;
                match (array, index.as_i64()) {
                    (Value::Array(id), Some(i)) => self
                        .array(id)
                        .and_then(|a| a.get(i).cloned())
                        .unwrap_or(Value::Unknown),
                    _ => Value::Unknown,
                }
            }
            JExpr::StaticField { class, field, .. } => self.read(&crate::ast::static_field_location(class, field)),
            JExpr::InstanceField { owner, .. } => {
                self.evaluate_java(owner)?;
                self.missing_field_access.set(true);
                Value::Unknown
            }
            JExpr::InstanceOf { operand, .. } => match self.evaluate_java(operand)? {
                Value::Null => Value::Boolean(false),
                _ => Value::Unknown,
            },
            JExpr::MethodInvocation { .. } | JExpr::This { .. } => Value::Unknown,
        };
        Ok(value)
    }

    fn evaluate_java_binary(&self, op: BinaryOp, lhs: &JExpr, rhs: &JExpr, ty: &Type) -> Result<Value, IllegalOperation> {
        if matches!(op, BinaryOp::ConditionalAnd | BinaryOp::ConditionalOr) {
            let short_circuit = op == BinaryOp::ConditionalOr;
            return Ok(match self.evaluate_java(lhs)? {
                Value::Boolean(b) if b == short_circuit => Value::Boolean(b),
                Value::Boolean(_) => match self.evaluate_java(rhs)? {
                    v @ Value::Boolean(_) => v,
                    _ => Value::Unknown,
                },
                _ => Value::Unknown,
            });
        }
        let left = self.evaluate_java(lhs)?;
        let right = self.evaluate_java(rhs)?;
        if left.is_unknown() || right.is_unknown() {
            return Ok(Value::Unknown);
        }
        if left.is_symbolic() || right.is_symbolic() {
            let calc_type = if op.is_relational() {
                java_binary_promotion(&lhs.ty(), &rhs.ty())
            } else {
                ty.clone()
            };
            return Ok(self.symbolic_binary(op, &left, &lhs.ty(), &right, &rhs.ty(), &calc_type, ty));
        }
        Ok(match (&left, &right) {
            (Value::Boolean(a), Value::Boolean(b)) => match op {
                BinaryOp::BinaryAnd => Value::Boolean(a & b),
                BinaryOp::BinaryOr => Value::Boolean(a | b),
                BinaryOp::BinaryXor | BinaryOp::NotEquals => Value::Boolean(a ^ b),
                BinaryOp::Equals => Value::Boolean(a == b),
                _ => panic!("operator {} applied to boolean operands", op),
            },
            (Value::Numeric(a), Value::Numeric(b)) => {
                let lt = java_numeric_type(&lhs.ty(), a);
                let rt = java_numeric_type(&rhs.ty(), b);
                java_numeric_binary(op, &left, &lt, &right, &rt).map_err(|_| {
                    IllegalOperation(format!("{} by zero in ({} {} {})", op, lhs, op, rhs))
                })?
            }
            _ if matches!(op, BinaryOp::Equals | BinaryOp::NotEquals) => match reference_equality(&left, &right) {
                Some(equal) => Value::Boolean(equal == (op == BinaryOp::Equals)),
                None => Value::Unknown,
            },
            _ => Value::Unknown,
        })
    }

    fn evaluate_java_unary(&self, op: UnaryOp, operand: &JExpr, ty: &Type) -> Result<Value, IllegalOperation> {
        let value = self.evaluate_java(operand)?;
        if value.is_symbolic() {
            return Ok(self.symbolic_unary(op, &value, &operand.ty(), ty));
        }
        Ok(match (op, &value) {
            (UnaryOp::Not, Value::Boolean(b)) => Value::Boolean(!b),
            (_, Value::Numeric(n)) => {
                let promoted = java_unary_promotion(&java_numeric_type(&operand.ty(), n));
                let promoted_value = cast_java(&value, &promoted);
                match op {
                    UnaryOp::Plus => promoted_value,
                    UnaryOp::Minus => match promoted_value.as_number() {
                        Some(Number::Float(f)) => Value::float(-f),
                        Some(Number::Double(d)) => Value::double(-d),
                        Some(other) => match other.to_bigint() {
                            Some(v) => java_wrap(-v, &promoted),
                            None => Value::Unknown,
                        },
                        None => Value::Unknown,
                    },
                    UnaryOp::Complement => match promoted_value.as_number().and_then(Number::to_bigint) {
                        Some(v) if !promoted.is_float() => java_wrap(-v - 1, &promoted),
                        _ => panic!("operator ~ applied to {} operand", promoted),
                    },
                    _ => Value::Unknown,
                }
            }
            _ => Value::Unknown,
        })
    }

    /// Resolves the target of a Java assignment.
    pub fn java_target(&self, expr: &JExpr) -> Result<Option<JavaTarget>, IllegalOperation> {
        Ok(match expr {
            JExpr::Variable { var, .. } => Some(JavaTarget::Location(var.location())),
            JExpr::StaticField { class, field, .. } => {
                Some(JavaTarget::Location(crate::ast::static_field_location(class, field)))
            }
            JExpr::Subscript { array, index, .. } => {
                let array = self.evaluate_java(array)?;
                let index = self.evaluate_java(index)?;
                match (array, index.as_i64()) {
                    (Value::Array(id), Some(i)) => Some(JavaTarget::ArrayElement(id, i)),
                    _ => None,
                }
            }
            JExpr::InstanceField { .. } => {
                self.missing_field_access.set(true);
                None
            }
            _ => None,
        })
    }

    fn array(&self, id: ArrayId) -> Option<ArrayObject> {
        let pending = self
            .allocations
            .borrow()
            .iter()
            .rev()
            .find(|(pending, _)| *pending == id)
            .map(|(_, a)| a.clone());
        pending.or_else(|| self.state.array(id).cloned())
    }

    fn next_array_id(&self, site: u32) -> ArrayId {
        let index = self.next_array_index.get();
        self.next_array_index.set(index + 1);
        ArrayId { site, index }
    }

    fn new_array(&self, site: u32, element: &Type, dims: &[i64]) -> Value {
        let (&length, rest) = match dims.split_first() {
            Some(split) => split,
            None => return Value::Unknown,
        };
        let id = self.next_array_id(site);
        let slot_type = rest
            .iter()
            .fold(element.clone(), |t, _| Type::JavaArray(Box::new(t)));
        let elements: Vec<Value> = (0..length)
            .map(|_| {
                if rest.is_empty() {
                    Value::java_default(element)
                } else {
                    self.new_array(site, element, rest)
                }
            })
            .collect();
        self.allocations
            .borrow_mut()
            .push((id, ArrayObject::new(slot_type, elements)));
        Value::Array(id)
    }

    // Symbolic fallbacks

    #[allow(clippy::too_many_arguments)]
    fn symbolic_binary(
        &self,
        op: BinaryOp,
        left: &Value,
        left_type: &Type,
        right: &Value,
        right_type: &Type,
        calc_type: &Type,
        ty: &Type,
    ) -> Value {
        match self.symbolic {
            Some(factory) => {
                let expr = factory.binary(op, factory.wrap(left, left_type), factory.wrap(right, right_type), calc_type, ty);
                Value::Symbolic(Arc::new(expr))
            }
            None => Value::Unknown,
        }
    }

    fn symbolic_unary(&self, op: UnaryOp, value: &Value, operand_type: &Type, ty: &Type) -> Value {
        match self.symbolic {
            Some(factory) => Value::Symbolic(Arc::new(factory.unary(op, factory.wrap(value, operand_type), ty))),
            None => Value::Unknown,
        }
    }

    fn symbolic_cast(&self, value: &Value, operand_type: &Type, ty: &Type) -> Value {
        match self.symbolic {
            Some(factory) => Value::Symbolic(Arc::new(factory.cast(factory.wrap(value, operand_type), ty))),
            None => Value::Unknown,
        }
    }
}

fn float_op<F: num_traits::Float>(op: BinaryOp, a: F, b: F, make: fn(F) -> Value) -> Value {
    if op.is_relational() {
        Value::from_bool_as_int(float_comparison(op, a, b))
    } else {
        make(float_arithmetic(op, a, b))
    }
}

/// C negation; negating NaN flips between the two NaN signs.
fn negate(n: &Number, ty: &Type) -> Option<Value> {
    Some(match n {
        Number::Float(f) if f.is_nan() => {
            if f.is_sign_negative() {
                Value::float(f32::NAN)
            } else {
                Value::Numeric(Number::NegativeNaN)
            }
        }
        Number::Double(d) if d.is_nan() => {
            if d.is_sign_negative() {
                Value::double(f64::NAN)
            } else {
                Value::Numeric(Number::NegativeNaN)
            }
        }
        Number::Float(f) => Value::float(-f),
        Number::Double(d) => Value::double(-d),
        Number::NegativeNaN => match ty {
            Type::Float(FloatKind::Float) => Value::float(f32::NAN),
            _ => Value::double(f64::NAN),
        },
        other => Value::Numeric(Number::from_bigint(-other.to_bigint()?)),
    })
}

/// Declared numeric type of a Java operand, falling back on the runtime kind
/// for operands typed as boxes or left unspecified.
fn java_numeric_type(declared: &Type, n: &Number) -> Type {
    match declared {
        Type::Int(_) | Type::Float(_) => declared.clone(),
        _ => match n {
            Number::Float(_) => Type::float(),
            Number::Double(_) | Number::NegativeNaN => Type::double(),
            other => match other.as_i64() {
                Some(v) if i32::try_from(v).is_ok() => Type::java_int(),
                _ => Type::java_long(),
            },
        },
    }
}

fn java_wrap(v: BigInt, ty: &Type) -> Value {
    let width = match ty {
        Type::Int(it) => MachineModel::java().int_width(it),
        _ => 32,
    };
    Value::Numeric(Number::from_bigint(wrap_integer(&v, width, true)))
}

fn java_numeric_binary(op: BinaryOp, left: &Value, lt: &Type, right: &Value, rt: &Type) -> Result<Value, DivisionByZero> {
    let promoted = if op.is_shift() {
        java_unary_promotion(lt)
    } else {
        java_binary_promotion(lt, rt)
    };
    let a = cast_java(left, &promoted);
    let b = if op.is_shift() {
        cast_java(right, &java_unary_promotion(rt))
    } else {
        cast_java(right, &promoted)
    };
    let (a, b) = match (a.as_number(), b.as_number()) {
        (Some(a), Some(b)) => (a.clone(), b.clone()),
        _ => return Ok(Value::Unknown),
    };
    let as_boolean = |v: Value| match v {
        Value::Numeric(n) => Value::Boolean(!n.is_zero()),
        other => other,
    };
    match &promoted {
        Type::Float(kind) => {
            if op.is_shift() || op.is_bitwise() {
                panic!("operator {} applied to {} operands", op, promoted);
            }
            let v = match kind {
                FloatKind::Float => float_op(op, a.to_f32(), b.to_f32(), Value::float),
                _ => float_op(op, a.to_f64(), b.to_f64(), Value::double),
            };
            Ok(if op.is_relational() { as_boolean(v) } else { v })
        }
        _ => {
            let width = match &promoted {
                Type::Int(it) => MachineModel::java().int_width(it),
                _ => 32,
            };
            let (a, b) = match (a.to_bigint(), b.to_bigint()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Ok(Value::Unknown),
            };
            if op.is_relational() {
                return Ok(Value::Boolean(integer_comparison(op, &a, &b)));
            }
            Ok(match integer_arithmetic(op, &a, &b, width, Flavor::Java)? {
                Some(v) => Value::Numeric(Number::from_bigint(wrap_integer(&v, width, true))),
                None => Value::Unknown,
            })
        }
    }
}

/// Identity comparison of Java references, when decidable.
fn reference_equality(a: &Value, b: &Value) -> Option<bool> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(true),
        (Value::Null, Value::Array(_) | Value::EnumConstant(_))
        | (Value::Array(_) | Value::EnumConstant(_), Value::Null) => Some(false),
        (Value::Array(x), Value::Array(y)) => Some(x == y),
        (Value::EnumConstant(x), Value::EnumConstant(y)) => Some(x == y),
        _ => None,
    }
}

/// Parses a floating-point literal of either language into a value of `ty`.
fn parse_float_literal(text: &str, ty: &Type) -> Value {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let body = cleaned.trim_end_matches(['f', 'F', 'd', 'D', 'l', 'L']);
    let kind = match ty {
        Type::Float(kind) => *kind,
        _ => FloatKind::Double,
    };
    let hex = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X"));
    let parsed = match (kind, hex) {
        (FloatKind::Float, None) => body.parse::<f32>().ok().map(Value::float),
        (FloatKind::Double, None) => body.parse::<f64>().ok().map(Value::double),
        (FloatKind::Float, Some(h)) => parse_hex_float(h).map(|d| Value::float(d as f32)),
        (FloatKind::Double, Some(h)) => parse_hex_float(h).map(Value::double),
        _ => None,
    };
    parsed.unwrap_or_else(|| {
        log::debug!("Cannot represent literal {} as {}", text, ty);
        Value::Unknown
    })
}

/// Hexadecimal float body (`1.8p3`), only when exactly representable as `f64`.
fn parse_hex_float(text: &str) -> Option<f64> {
    let (mantissa, exponent) = text.split_once(['p', 'P'])?;
    let exponent: i32 = exponent.parse().ok()?;
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{}{}", int_part, frac_part);
    let m = u64::from_str_radix(&digits, 16).ok()?;
    if m >> 53 != 0 {
        return None;
    }
    let shift = exponent - 4 * frac_part.len() as i32;
    Some(m as f64 * 2f64.powi(shift))
}
