//! Source-language types as seen by the value analysis.
//!
//! One closed [`Type`] enum covers both the C-like and the Java-like front end.
//! Java primitives reuse the integer ranks of C (see [`MachineModel::java`]),
//! Java reference types get their own variants.
//!
//! [`MachineModel::java`]: crate::machine::MachineModel::java

use std::fmt;
use std::sync::Arc;

use crate::ast::CExpr;

/// Rank of an integer type; its width is decided by the machine model.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum IntRank {
    Char,
    Short,
    Int,
    Long,
    LongLong,
    Int128,
}

/// An integer type, possibly narrowed to a bitfield.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct IntType {
    pub rank: IntRank,
    pub signed: bool,
    /// Width in bits when declared as a bitfield member.
    pub bitfield: Option<u32>,
}

impl IntType {
    pub const fn new(rank: IntRank, signed: bool) -> Self {
        Self {
            rank,
            signed,
            bitfield: None,
        }
    }

    pub const fn with_bitfield(self, bits: u32) -> Self {
        Self {
            bitfield: Some(bits),
            ..self
        }
    }
}

/// Floating-point formats.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum FloatKind {
    Float,
    Double,
    /// x87 extended precision; not modelled.
    LongDouble,
    /// IEEE binary128; not modelled.
    Float128,
}

impl FloatKind {
    /// Whether values of this format can be represented natively.
    pub fn is_supported(self) -> bool {
        matches!(self, FloatKind::Float | FloatKind::Double)
    }

    /// Number of significand bits including the implicit one.
    pub fn mantissa_digits(self) -> u32 {
        match self {
            FloatKind::Float => f32::MANTISSA_DIGITS,
            FloatKind::Double => f64::MANTISSA_DIGITS,
            FloatKind::LongDouble => 64,
            FloatKind::Float128 => 113,
        }
    }
}

/// Length of an array type.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ArrayLength {
    Fixed(u64),
    /// Variable-length array; the length is computed at runtime.
    Variable(Box<CExpr>),
    Unspecified,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CompositeKind {
    Struct,
    Union,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Member {
    pub name: Arc<str>,
    pub ty: Type,
}

/// A struct or union with its members in declaration order.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct CompositeType {
    pub kind: CompositeKind,
    pub name: Arc<str>,
    pub members: Vec<Member>,
}

impl CompositeType {
    pub fn member(&self, name: &str) -> Option<(usize, &Member)> {
        self.members.iter().enumerate().find(|(_, m)| &*m.name == name)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct EnumType {
    pub name: Arc<str>,
    pub enumerators: Vec<(Arc<str>, i64)>,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct FunctionType {
    pub return_type: Type,
    pub parameters: Vec<Type>,
    pub variadic: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Type {
    Void,
    Bool,
    Int(IntType),
    Float(FloatKind),
    Pointer(Box<Type>),
    Array {
        element: Box<Type>,
        length: ArrayLength,
    },
    Composite(Arc<CompositeType>),
    Enum(Arc<EnumType>),
    Function(Arc<FunctionType>),
    /// Java class or interface type.
    Reference(Arc<str>),
    /// Java array type.
    JavaArray(Box<Type>),
    /// Type of the Java `null` literal.
    Null,
    Unspecified,
}

impl Type {
    pub const fn int() -> Self {
        Type::Int(IntType::new(IntRank::Int, true))
    }

    pub const fn uint() -> Self {
        Type::Int(IntType::new(IntRank::Int, false))
    }

    pub const fn schar() -> Self {
        Type::Int(IntType::new(IntRank::Char, true))
    }

    pub const fn uchar() -> Self {
        Type::Int(IntType::new(IntRank::Char, false))
    }

    pub const fn short() -> Self {
        Type::Int(IntType::new(IntRank::Short, true))
    }

    pub const fn ushort() -> Self {
        Type::Int(IntType::new(IntRank::Short, false))
    }

    pub const fn long() -> Self {
        Type::Int(IntType::new(IntRank::Long, true))
    }

    pub const fn ulong() -> Self {
        Type::Int(IntType::new(IntRank::Long, false))
    }

    pub const fn long_long() -> Self {
        Type::Int(IntType::new(IntRank::LongLong, true))
    }

    pub const fn ulong_long() -> Self {
        Type::Int(IntType::new(IntRank::LongLong, false))
    }

    pub const fn float() -> Self {
        Type::Float(FloatKind::Float)
    }

    pub const fn double() -> Self {
        Type::Float(FloatKind::Double)
    }

    pub fn pointer_to(ty: Type) -> Self {
        Type::Pointer(Box::new(ty))
    }

    pub fn array_of(element: Type, length: u64) -> Self {
        Type::Array {
            element: Box::new(element),
            length: ArrayLength::Fixed(length),
        }
    }

    // Java primitives, laid out by `MachineModel::java()`.

    pub const fn java_byte() -> Self {
        Type::schar()
    }

    pub const fn java_short() -> Self {
        Type::short()
    }

    pub const fn java_char() -> Self {
        Type::ushort()
    }

    pub const fn java_int() -> Self {
        Type::int()
    }

    pub const fn java_long() -> Self {
        Type::long_long()
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Int(_) | Type::Enum(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float(_))
    }

    /// Integer, enum, boolean, float or pointer.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Type::Bool | Type::Int(_) | Type::Float(_) | Type::Enum(_) | Type::Pointer(_)
        )
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Type::Array { .. } | Type::Composite(_))
    }

    pub fn is_java_reference(&self) -> bool {
        matches!(self, Type::Reference(_) | Type::JavaArray(_) | Type::Null)
    }

    /// Whether values of this type can be stored in a state entry.
    pub fn is_tracked(&self) -> bool {
        self.is_scalar() || self.is_java_reference()
    }

    pub fn as_composite(&self) -> Option<&CompositeType> {
        match self {
            Type::Composite(c) => Some(c),
            _ => None,
        }
    }

    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for IntType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.signed {
            write!(f, "unsigned ")?;
        }
        let name = match self.rank {
            IntRank::Char => "char",
            IntRank::Short => "short",
            IntRank::Int => "int",
            IntRank::Long => "long",
            IntRank::LongLong => "long long",
            IntRank::Int128 => "__int128",
        };
        write!(f, "{}", name)?;
        if let Some(bits) = self.bitfield {
            write!(f, " : {}", bits)?;
        }
        Ok(())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Bool => write!(f, "_Bool"),
            Type::Int(it) => write!(f, "{}", it),
            Type::Float(FloatKind::Float) => write!(f, "float"),
            Type::Float(FloatKind::Double) => write!(f, "double"),
            Type::Float(FloatKind::LongDouble) => write!(f, "long double"),
            Type::Float(FloatKind::Float128) => write!(f, "__float128"),
            Type::Pointer(t) => write!(f, "{}*", t),
            Type::Array { element, length } => match length {
                ArrayLength::Fixed(n) => write!(f, "{}[{}]", element, n),
                _ => write!(f, "{}[]", element),
            },
            Type::Composite(c) => match c.kind {
                CompositeKind::Struct => write!(f, "struct {}", c.name),
                CompositeKind::Union => write!(f, "union {}", c.name),
            },
            Type::Enum(e) => write!(f, "enum {}", e.name),
            Type::Function(func) => write!(f, "{}(*)(..)", func.return_type),
            Type::Reference(name) => write!(f, "{}", name),
            Type::JavaArray(t) => write!(f, "{}[]", t),
            Type::Null => write!(f, "null"),
            Type::Unspecified => write!(f, "?"),
        }
    }
}
