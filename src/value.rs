//! The value domain: what a memory location may hold.

use std::fmt;
use std::sync::Arc;

use crate::number::Number;
use crate::symbolic::SymbolicExpr;
use crate::types::{FloatKind, Type};

/// Identity of a Java array object in the state's array arena.
///
/// `site` is the allocation site supplied by the front end, `index` numbers the
/// nested arrays allocated by one multi-dimensional creation expression.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ArrayId {
    pub site: u32,
    pub index: u32,
}

impl fmt::Display for ArrayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "array#{}.{}", self.site, self.index)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct EnumConstant {
    pub class: Arc<str>,
    pub name: Arc<str>,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Value {
    /// Nothing is known.
    Unknown,
    Numeric(Number),
    Boolean(bool),
    /// Java `null`.
    Null,
    EnumConstant(EnumConstant),
    /// A function designator.
    Function(Arc<str>),
    /// Reference to an array in the state's arena.
    Array(ArrayId),
    Symbolic(Arc<SymbolicExpr>),
}

impl Value {
    pub fn int(value: i64) -> Self {
        Value::Numeric(Number::Int(value))
    }

    pub fn float(value: f32) -> Self {
        Value::Numeric(Number::Float(value))
    }

    pub fn double(value: f64) -> Self {
        Value::Numeric(Number::Double(value))
    }

    pub fn from_bool_as_int(b: bool) -> Self {
        Value::int(b as i64)
    }

    /// The zero of a C scalar type, `Unknown` for anything else.
    pub fn c_zero(ty: &Type) -> Self {
        match ty {
            Type::Bool | Type::Int(_) | Type::Enum(_) | Type::Pointer(_) => Value::int(0),
            Type::Float(FloatKind::Float) => Value::float(0.0),
            Type::Float(FloatKind::Double) => Value::double(0.0),
            _ => Value::Unknown,
        }
    }

    /// Default value of a Java field or array slot of type `ty`.
    pub fn java_default(ty: &Type) -> Self {
        match ty {
            Type::Bool => Value::Boolean(false),
            Type::Int(_) => Value::int(0),
            Type::Float(FloatKind::Float) => Value::float(0.0),
            Type::Float(_) => Value::double(0.0),
            Type::Reference(_) | Type::JavaArray(_) | Type::Null => Value::Null,
            _ => Value::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    /// Known concretely: neither unknown nor symbolic.
    pub fn is_explicitly_known(&self) -> bool {
        !matches!(self, Value::Unknown | Value::Symbolic(_))
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self, Value::Symbolic(_))
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Numeric(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(Number::as_i64)
    }

    pub fn as_symbolic(&self) -> Option<&SymbolicExpr> {
        match self {
            Value::Symbolic(s) => Some(s),
            _ => None,
        }
    }

    /// Truth value as used by conditions: numeric non-zero (or NaN) is true.
    pub fn truth(&self) -> Option<bool> {
        match self {
            Value::Numeric(n) => Some(n.is_nan() || !n.is_zero()),
            Value::Boolean(b) => Some(*b),
            Value::Null => Some(false),
            _ => None,
        }
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Value::Numeric(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unknown => write!(f, "UNKNOWN"),
            Value::Numeric(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::EnumConstant(e) => write!(f, "{}.{}", e.class, e.name),
            Value::Function(name) => write!(f, "&{}", name),
            Value::Array(id) => write!(f, "{}", id),
            Value::Symbolic(s) => write!(f, "{}", s),
        }
    }
}

/// A value together with the declared type of the location holding it.
///
/// The type is kept because widths and signedness are re-derived when the
/// value is read back or cast.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ValueAndType {
    pub value: Value,
    pub ty: Type,
}

impl ValueAndType {
    pub fn new(value: Value, ty: Type) -> Self {
        Self { value, ty }
    }
}

impl fmt::Display for ValueAndType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.ty)
    }
}

/// Contents of a Java array.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ArrayObject {
    pub element_type: Type,
    pub elements: im::Vector<Value>,
}

impl ArrayObject {
    pub fn new(element_type: Type, elements: impl IntoIterator<Item = Value>) -> Self {
        Self {
            element_type,
            elements: elements.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: i64) -> Option<&Value> {
        usize::try_from(index).ok().and_then(|i| self.elements.get(i))
    }

    /// Copy with one slot replaced; `None` when out of bounds.
    pub fn with_element(&self, index: i64, value: Value) -> Option<Self> {
        let i = usize::try_from(index).ok().filter(|&i| i < self.elements.len())?;
        let mut copy = self.clone();
        copy.elements.set(i, value);
        Some(copy)
    }
}
