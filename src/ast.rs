//! Expression trees of the two front ends.
//!
//! [`CExpr`] and [`JExpr`] are sibling enumerations: each front end has its own
//! shapes, while operators, types and the numeric helpers are shared.

use std::fmt;
use std::sync::Arc;

use num_bigint::BigInt;

use crate::location::MemoryLocation;
use crate::types::Type;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BinaryOp {
    Multiply,
    Divide,
    Modulo,
    Plus,
    Minus,
    ShiftLeft,
    ShiftRight,
    /// Java `>>>`.
    UnsignedShiftRight,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,
    BinaryAnd,
    BinaryXor,
    BinaryOr,
    Equals,
    NotEquals,
    /// Java `&&`.
    ConditionalAnd,
    /// Java `||`.
    ConditionalOr,
}

impl BinaryOp {
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinaryOp::LessThan
                | BinaryOp::GreaterThan
                | BinaryOp::LessEqual
                | BinaryOp::GreaterEqual
                | BinaryOp::Equals
                | BinaryOp::NotEquals
        )
    }

    pub fn is_shift(self) -> bool {
        matches!(
            self,
            BinaryOp::ShiftLeft | BinaryOp::ShiftRight | BinaryOp::UnsignedShiftRight
        )
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinaryOp::BinaryAnd | BinaryOp::BinaryXor | BinaryOp::BinaryOr)
    }

    /// The operator of `!(a op b)`, for relational operators.
    pub fn negated(self) -> Option<Self> {
        Some(match self {
            BinaryOp::LessThan => BinaryOp::GreaterEqual,
            BinaryOp::GreaterThan => BinaryOp::LessEqual,
            BinaryOp::LessEqual => BinaryOp::GreaterThan,
            BinaryOp::GreaterEqual => BinaryOp::LessThan,
            BinaryOp::Equals => BinaryOp::NotEquals,
            BinaryOp::NotEquals => BinaryOp::Equals,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::UnsignedShiftRight => ">>>",
            BinaryOp::LessThan => "<",
            BinaryOp::GreaterThan => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::BinaryAnd => "&",
            BinaryOp::BinaryXor => "^",
            BinaryOp::BinaryOr => "|",
            BinaryOp::Equals => "==",
            BinaryOp::NotEquals => "!=",
            BinaryOp::ConditionalAnd => "&&",
            BinaryOp::ConditionalOr => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UnaryOp {
    Minus,
    Plus,
    /// Bitwise `~`.
    Complement,
    /// Logical `!`.
    Not,
    SizeOf,
    AlignOf,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Minus => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Complement => "~",
            UnaryOp::Not => "!",
            UnaryOp::SizeOf => "sizeof ",
            UnaryOp::AlignOf => "_Alignof ",
        })
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TypeIdOp {
    SizeOf,
    AlignOf,
}

/// A resolved variable: name plus declaring function (`None` for globals).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct VarRef {
    pub name: Arc<str>,
    pub function: Option<Arc<str>>,
}

impl VarRef {
    pub fn global(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            function: None,
        }
    }

    pub fn local(function: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            function: Some(function.into()),
        }
    }

    pub fn location(&self) -> MemoryLocation {
        MemoryLocation::scoped(self.function.as_deref(), &self.name)
    }
}

/// C expression.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum CExpr {
    IntLiteral {
        value: BigInt,
        ty: Type,
    },
    /// Kept as source text so that `float` literals round once.
    FloatLiteral {
        text: Arc<str>,
        ty: Type,
    },
    CharLiteral {
        value: u32,
        ty: Type,
    },
    StringLiteral {
        value: Arc<str>,
        ty: Type,
    },
    Variable {
        var: VarRef,
        ty: Type,
    },
    Enumerator {
        name: Arc<str>,
        value: Option<i64>,
        ty: Type,
    },
    FunctionName {
        name: Arc<str>,
        ty: Type,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<CExpr>,
        rhs: Box<CExpr>,
        /// Type both operands are converted to before the operation.
        calc_type: Type,
        ty: Type,
    },
    Unary {
        op: UnaryOp,
        operand: Box<CExpr>,
        ty: Type,
    },
    Cast {
        operand: Box<CExpr>,
        ty: Type,
    },
    TypeId {
        op: TypeIdOp,
        operand_type: Type,
        ty: Type,
    },
    /// `owner.field`, or `owner->field` when `deref` is set.
    Field {
        owner: Box<CExpr>,
        field: Arc<str>,
        deref: bool,
        ty: Type,
    },
    Subscript {
        array: Box<CExpr>,
        index: Box<CExpr>,
        ty: Type,
    },
    Deref {
        operand: Box<CExpr>,
        ty: Type,
    },
    AddressOf {
        operand: Box<CExpr>,
        ty: Type,
    },
    Call {
        function: Arc<str>,
        args: Vec<CExpr>,
        ty: Type,
    },
}

impl CExpr {
    pub fn ty(&self) -> &Type {
        match self {
            CExpr::IntLiteral { ty, .. }
            | CExpr::FloatLiteral { ty, .. }
            | CExpr::CharLiteral { ty, .. }
            | CExpr::StringLiteral { ty, .. }
            | CExpr::Variable { ty, .. }
            | CExpr::Enumerator { ty, .. }
            | CExpr::FunctionName { ty, .. }
            | CExpr::Binary { ty, .. }
            | CExpr::Unary { ty, .. }
            | CExpr::Cast { ty, .. }
            | CExpr::TypeId { ty, .. }
            | CExpr::Field { ty, .. }
            | CExpr::Subscript { ty, .. }
            | CExpr::Deref { ty, .. }
            | CExpr::AddressOf { ty, .. }
            | CExpr::Call { ty, .. } => ty,
        }
    }

    pub fn int(value: i64) -> Self {
        CExpr::IntLiteral {
            value: BigInt::from(value),
            ty: Type::int(),
        }
    }

    pub fn int_of(value: impl Into<BigInt>, ty: Type) -> Self {
        CExpr::IntLiteral {
            value: value.into(),
            ty,
        }
    }

    pub fn float_literal(text: &str, ty: Type) -> Self {
        CExpr::FloatLiteral {
            text: text.into(),
            ty,
        }
    }

    pub fn var(var: VarRef, ty: Type) -> Self {
        CExpr::Variable { var, ty }
    }

    /// Binary expression whose calculation and result type coincide.
    pub fn binary(op: BinaryOp, lhs: CExpr, rhs: CExpr, ty: Type) -> Self {
        let result_ty = if op.is_relational() { Type::int() } else { ty.clone() };
        CExpr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            calc_type: ty,
            ty: result_ty,
        }
    }

    pub fn cast(operand: CExpr, ty: Type) -> Self {
        CExpr::Cast {
            operand: Box::new(operand),
            ty,
        }
    }

    pub fn unary(op: UnaryOp, operand: CExpr, ty: Type) -> Self {
        CExpr::Unary {
            op,
            operand: Box::new(operand),
            ty,
        }
    }

    pub fn field(owner: CExpr, field: &str, ty: Type) -> Self {
        CExpr::Field {
            owner: Box::new(owner),
            field: field.into(),
            deref: false,
            ty,
        }
    }

    pub fn subscript(array: CExpr, index: CExpr, ty: Type) -> Self {
        CExpr::Subscript {
            array: Box::new(array),
            index: Box::new(index),
            ty,
        }
    }

    pub fn call(function: &str, args: Vec<CExpr>, ty: Type) -> Self {
        CExpr::Call {
            function: function.into(),
            args,
            ty,
        }
    }
}

impl fmt::Display for CExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CExpr::IntLiteral { value, .. } => write!(f, "{}", value),
            CExpr::FloatLiteral { text, .. } => write!(f, "{}", text),
            CExpr::CharLiteral { value, .. } => write!(f, "'\\x{:x}'", value),
            CExpr::StringLiteral { value, .. } => write!(f, "{:?}", value),
            CExpr::Variable { var, .. } => write!(f, "{}", var.name),
            CExpr::Enumerator { name, .. } | CExpr::FunctionName { name, .. } => write!(f, "{}", name),
            CExpr::Binary { op, lhs, rhs, .. } => write!(f, "({} {} {})", lhs, op, rhs),
            CExpr::Unary { op, operand, .. } => write!(f, "{}{}", op, operand),
            CExpr::Cast { operand, ty } => write!(f, "({}){}", ty, operand),
            CExpr::TypeId { op, operand_type, .. } => match op {
                TypeIdOp::SizeOf => write!(f, "sizeof({})", operand_type),
                TypeIdOp::AlignOf => write!(f, "_Alignof({})", operand_type),
            },
            CExpr::Field {
                owner, field, deref, ..
            } => write!(f, "{}{}{}", owner, if *deref { "->" } else { "." }, field),
            CExpr::Subscript { array, index, .. } => write!(f, "{}[{}]", array, index),
            CExpr::Deref { operand, .. } => write!(f, "*{}", operand),
            CExpr::AddressOf { operand, .. } => write!(f, "&{}", operand),
            CExpr::Call { function, args, .. } => {
                write!(f, "{}(", function)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Java expression.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum JExpr {
    /// `int` or `long` literal, depending on `ty`.
    IntLiteral {
        value: i64,
        ty: Type,
    },
    FloatLiteral {
        text: Arc<str>,
        ty: Type,
    },
    CharLiteral(u16),
    BoolLiteral(bool),
    NullLiteral,
    StringLiteral(Arc<str>),
    Variable {
        var: VarRef,
        ty: Type,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<JExpr>,
        rhs: Box<JExpr>,
        ty: Type,
    },
    Unary {
        op: UnaryOp,
        operand: Box<JExpr>,
        ty: Type,
    },
    Cast {
        operand: Box<JExpr>,
        ty: Type,
    },
    EnumConstant {
        class: Arc<str>,
        name: Arc<str>,
    },
    /// `new T[l0][l1]...`, optionally with an initializer instead of lengths.
    ArrayCreation {
        site: u32,
        element: Type,
        lengths: Vec<JExpr>,
        initializer: Option<Box<JExpr>>,
    },
    /// `{ e0, e1, ... }`
    ArrayInitializer {
        site: u32,
        element: Type,
        elements: Vec<JExpr>,
    },
    ArrayLength {
        array: Box<JExpr>,
    },
    Subscript {
        array: Box<JExpr>,
        index: Box<JExpr>,
        ty: Type,
    },
    StaticField {
        class: Arc<str>,
        field: Arc<str>,
        ty: Type,
    },
    /// Field read through an object reference: needs runtime type information.
    InstanceField {
        owner: Box<JExpr>,
        field: Arc<str>,
        ty: Type,
    },
    InstanceOf {
        operand: Box<JExpr>,
        target: Type,
    },
    MethodInvocation {
        name: Arc<str>,
        args: Vec<JExpr>,
        ty: Type,
    },
    This {
        ty: Type,
    },
}

impl JExpr {
    pub fn ty(&self) -> Type {
        match self {
            JExpr::IntLiteral { ty, .. }
            | JExpr::FloatLiteral { ty, .. }
            | JExpr::Variable { ty, .. }
            | JExpr::Binary { ty, .. }
            | JExpr::Unary { ty, .. }
            | JExpr::Cast { ty, .. }
            | JExpr::Subscript { ty, .. }
            | JExpr::StaticField { ty, .. }
            | JExpr::InstanceField { ty, .. }
            | JExpr::MethodInvocation { ty, .. }
            | JExpr::This { ty } => ty.clone(),
            JExpr::CharLiteral(_) => Type::java_char(),
            JExpr::BoolLiteral(_) | JExpr::InstanceOf { .. } => Type::Bool,
            JExpr::NullLiteral => Type::Null,
            JExpr::StringLiteral(_) => Type::Reference("java.lang.String".into()),
            JExpr::EnumConstant { class, .. } => Type::Reference(class.clone()),
            JExpr::ArrayCreation { element, lengths, .. } => {
                let dims = lengths.len().max(1);
                (0..dims).fold(element.clone(), |t, _| Type::JavaArray(Box::new(t)))
            }
            JExpr::ArrayInitializer { element, .. } => Type::JavaArray(Box::new(element.clone())),
            JExpr::ArrayLength { .. } => Type::java_int(),
        }
    }

    pub fn int(value: i32) -> Self {
        JExpr::IntLiteral {
            value: value as i64,
            ty: Type::java_int(),
        }
    }

    pub fn long(value: i64) -> Self {
        JExpr::IntLiteral {
            value,
            ty: Type::java_long(),
        }
    }

    pub fn var(var: VarRef, ty: Type) -> Self {
        JExpr::Variable { var, ty }
    }

    pub fn binary(op: BinaryOp, lhs: JExpr, rhs: JExpr, ty: Type) -> Self {
        JExpr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty,
        }
    }

    pub fn cast(operand: JExpr, ty: Type) -> Self {
        JExpr::Cast {
            operand: Box::new(operand),
            ty,
        }
    }

    pub fn subscript(array: JExpr, index: JExpr, ty: Type) -> Self {
        JExpr::Subscript {
            array: Box::new(array),
            index: Box::new(index),
            ty,
        }
    }
}

impl fmt::Display for JExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JExpr::IntLiteral { value, .. } => write!(f, "{}", value),
            JExpr::FloatLiteral { text, .. } => write!(f, "{}", text),
            JExpr::CharLiteral(c) => write!(f, "'\\u{:04x}'", c),
            JExpr::BoolLiteral(b) => write!(f, "{}", b),
            JExpr::NullLiteral => write!(f, "null"),
            JExpr::StringLiteral(s) => write!(f, "{:?}", s),
            JExpr::Variable { var, .. } => write!(f, "{}", var.name),
            JExpr::Binary { op, lhs, rhs, .. } => write!(f, "({} {} {})", lhs, op, rhs),
            JExpr::Unary { op, operand, .. } => write!(f, "{}{}", op, operand),
            JExpr::Cast { operand, ty } => write!(f, "({}){}", ty, operand),
            JExpr::EnumConstant { class, name } => write!(f, "{}.{}", class, name),
            JExpr::ArrayCreation { element, lengths, .. } => {
                write!(f, "new {}", element)?;
                for l in lengths {
                    write!(f, "[{}]", l)?;
                }
                Ok(())
            }
            JExpr::ArrayInitializer { elements, .. } => {
                write!(f, "{{")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "}}")
            }
            JExpr::ArrayLength { array } => write!(f, "{}.length", array),
            JExpr::Subscript { array, index, .. } => write!(f, "{}[{}]", array, index),
            JExpr::StaticField { class, field, .. } => write!(f, "{}.{}", class, field),
            JExpr::InstanceField { owner, field, .. } => write!(f, "{}.{}", owner, field),
            JExpr::InstanceOf { operand, target } => write!(f, "{} instanceof {}", operand, target),
            JExpr::MethodInvocation { name, .. } => write!(f, "{}(..)", name),
            JExpr::This { .. } => write!(f, "this"),
        }
    }
}

/// Location of a Java static field.
pub fn static_field_location(class: &str, field: &str) -> MemoryLocation {
    MemoryLocation::global(format!("{}.{}", class, field))
}
