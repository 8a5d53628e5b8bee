//! The control-flow automaton as seen by the transfer relation.
//!
//! Construction of the automaton is done elsewhere; this module only fixes
//! the shape of nodes and edges handed to [`ValueTransferRelation`].
//!
//! [`ValueTransferRelation`]: crate::transfer::ValueTransferRelation

use std::fmt;
use std::sync::Arc;

use crate::arithmetic::Flavor;
use crate::ast::{CExpr, JExpr, VarRef};
use crate::error::FileLocation;
use crate::types::Type;
use crate::value::Value;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// A program location.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct CfaNode {
    pub id: NodeId,
    pub function: Arc<str>,
    pub loop_head: bool,
    pub function_entry: bool,
    pub function_exit: bool,
}

impl CfaNode {
    pub fn new(id: u32, function: impl Into<Arc<str>>) -> Self {
        Self {
            id: NodeId(id),
            function: function.into(),
            loop_head: false,
            function_entry: false,
            function_exit: false,
        }
    }

    pub fn as_loop_head(self) -> Self {
        Self {
            loop_head: true,
            ..self
        }
    }

    pub fn as_function_entry(self) -> Self {
        Self {
            function_entry: true,
            ..self
        }
    }

    pub fn as_function_exit(self) -> Self {
        Self {
            function_exit: true,
            ..self
        }
    }
}

/// An expression of either front end.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Expr {
    C(CExpr),
    Java(JExpr),
}

impl Expr {
    pub fn ty(&self) -> Type {
        match self {
            Expr::C(e) => e.ty().clone(),
            Expr::Java(e) => e.ty(),
        }
    }

    pub fn flavor(&self) -> Flavor {
        match self {
            Expr::C(_) => Flavor::C,
            Expr::Java(_) => Flavor::Java,
        }
    }
}

impl From<CExpr> for Expr {
    fn from(e: CExpr) -> Self {
        Expr::C(e)
    }
}

impl From<JExpr> for Expr {
    fn from(e: JExpr) -> Self {
        Expr::Java(e)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::C(e) => write!(f, "{}", e),
            Expr::Java(e) => write!(f, "{}", e),
        }
    }
}

/// Initializer of a declaration: one expression, or a brace-enclosed list
/// whose items fill the sub-objects of an aggregate in layout order.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Initializer {
    Expression(Expr),
    List(Vec<Initializer>),
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Declaration {
    pub var: VarRef,
    pub ty: Type,
    pub initializer: Option<Initializer>,
    pub flavor: Flavor,
}

impl Declaration {
    pub fn is_global(&self) -> bool {
        self.var.function.is_none()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Statement {
    /// `lhs = rhs;`
    Assignment { lhs: Expr, rhs: Expr },
    /// An expression evaluated for its effects only.
    Expression(Expr),
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Parameter {
    pub name: Arc<str>,
    pub ty: Type,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum EdgeKind {
    Blank,
    Declaration(Declaration),
    Statement(Statement),
    /// Continue only if `condition` evaluates to `truth`.
    Assume { condition: Expr, truth: bool },
    /// From the call site into the entry of `callee`.
    FunctionCall {
        callee: Arc<str>,
        parameters: Vec<Parameter>,
        arguments: Vec<Expr>,
        variadic: bool,
    },
    /// `return expression;` inside `function`.
    Return {
        function: Arc<str>,
        expression: Option<Expr>,
        return_type: Type,
    },
    /// From the exit of `callee` back to the call site, optionally storing
    /// the returned value into `assign_to`.
    FunctionReturn {
        callee: Arc<str>,
        assign_to: Option<Expr>,
        return_type: Type,
    },
    /// Call skipped by an externally computed summary. `result` is the value
    /// the summary guarantees for the call, if any.
    Summary {
        callee: Arc<str>,
        assign_to: Option<Expr>,
        result: Option<Value>,
    },
    /// End of the analysed program: the frame of the predecessor's function dies.
    Exit,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct CfaEdge {
    pub predecessor: CfaNode,
    pub successor: CfaNode,
    pub kind: EdgeKind,
    pub location: FileLocation,
}

impl CfaEdge {
    pub fn new(predecessor: CfaNode, successor: CfaNode, kind: EdgeKind) -> Self {
        Self {
            predecessor,
            successor,
            kind,
            location: FileLocation::default(),
        }
    }

    pub fn at(self, location: FileLocation) -> Self {
        Self { location, ..self }
    }
}

impl fmt::Display for CfaEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: ", self.predecessor.id, self.successor.id)?;
        match &self.kind {
            EdgeKind::Blank => write!(f, "blank"),
            EdgeKind::Declaration(d) => write!(f, "{} {}", d.ty, d.var.name),
            EdgeKind::Statement(Statement::Assignment { lhs, rhs }) => write!(f, "{} = {}", lhs, rhs),
            EdgeKind::Statement(Statement::Expression(e)) => write!(f, "{}", e),
            EdgeKind::Assume { condition, truth } => {
                if *truth {
                    write!(f, "[{}]", condition)
                } else {
                    write!(f, "[!({})]", condition)
                }
            }
            EdgeKind::FunctionCall { callee, .. } => write!(f, "call {}", callee),
            EdgeKind::Return { expression, .. } => match expression {
                Some(e) => write!(f, "return {}", e),
                None => write!(f, "return"),
            },
            EdgeKind::FunctionReturn { callee, .. } => write!(f, "return from {}", callee),
            EdgeKind::Summary { callee, .. } => write!(f, "summary of {}", callee),
            EdgeKind::Exit => write!(f, "exit"),
        }
    }
}
