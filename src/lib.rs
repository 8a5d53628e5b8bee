//! # value-analysis: explicit-value abstract interpretation
//!
//! **`value-analysis`** tracks, for every program variable it can, the *one* concrete value that variable holds
//! on all executions reaching a program point. It works on control-flow automata (CFAs) of C and Java programs
//! and is meant to be driven by a reachability engine (CPA-style) that explores the CFA edge by edge.
//!
//! ## What is explicit-value analysis?
//!
//! An abstract state is a finite map from memory locations to values. A location missing from the map is
//! **unknown** (any value). Joining two states keeps only the locations on which both agree, so the lattice has
//! finite height per location and the analysis terminates on loops once the precision stops tracking the
//! variables that keep changing.
//!
//! Conditions of `assume` edges are used in two ways: a condition that evaluates to a known truth value prunes
//! the infeasible branch, and an equality with an undecided variable *narrows* that variable to the constant.
//!
//! ## Key Features
//!
//! - **Exact machine semantics**: integer wrap-around, IEEE floats, and casts follow the configured
//!   [`MachineModel`][crate::machine::MachineModel] (`linux32`, `linux64`, or the Java model).
//! - **Persistent states**: [`ValueState`][crate::state::ValueState] is a copy-on-write map, so successors share
//!   structure with their predecessors.
//! - **Refinable precision**: [`ValuePrecision`][crate::precision::ValuePrecision] decides what is tracked and is
//!   refined monotonically by counterexample-guided refinement.
//! - **Narrowing through casts**: `(unsigned char) x == 255` narrows a `signed char` `x` to `-1`, but only when
//!   every cast on the way is invertible.
//! - **Symbolic unknowns** (optional): unknown values become fresh symbolic identifiers instead of being dropped.
//!
//! ## Basic Usage
//!
//! ```rust
//! use value_analysis::arithmetic::Flavor;
//! use value_analysis::ast::{BinaryOp, CExpr, VarRef};
//! use value_analysis::cfa::{CfaEdge, CfaNode, Declaration, EdgeKind, Initializer};
//! use value_analysis::config::ValueAnalysisConfig;
//! use value_analysis::location::MemoryLocation;
//! use value_analysis::machine::MachineModel;
//! use value_analysis::precision::ValuePrecision;
//! use value_analysis::state::ValueState;
//! use value_analysis::transfer::ValueTransferRelation;
//! use value_analysis::types::Type;
//! use value_analysis::value::Value;
//!
//! let relation = ValueTransferRelation::new(ValueAnalysisConfig::default(), MachineModel::linux32());
//! let precision = ValuePrecision::with_full();
//! let x = CExpr::var(VarRef::local("main", "x"), Type::int());
//!
//! // 1. `int x = 5;`
//! let declare = CfaEdge::new(
//!     CfaNode::new(1, "main"),
//!     CfaNode::new(2, "main"),
//!     EdgeKind::Declaration(Declaration {
//!         var: VarRef::local("main", "x"),
//!         ty: Type::int(),
//!         initializer: Some(Initializer::Expression(CExpr::int(5).into())),
//!         flavor: Flavor::C,
//!     }),
//! );
//! let state = relation.get_successor(&ValueState::new(), &precision, &declare).unwrap();
//! let state = state.successor.unwrap();
//! assert_eq!(state.value_of(&MemoryLocation::local("main", "x")), Some(&Value::int(5)));
//!
//! // 2. `assume(x == 6)` has no successor.
//! let assume = CfaEdge::new(
//!     CfaNode::new(2, "main"),
//!     CfaNode::new(3, "main"),
//!     EdgeKind::Assume {
//!         condition: CExpr::binary(BinaryOp::Equals, x, CExpr::int(6), Type::int()).into(),
//!         truth: true,
//!     },
//! );
//! let outcome = relation.get_successor(&state, &precision, &assume).unwrap();
//! assert!(!outcome.is_feasible());
//! ```
//!
//! ## Core Components
//!
//! - **[`state`]**: The abstract state, its lattice operations (join, less-or-equal), and the Java array arena.
//! - **[`evaluator`]**: Evaluation of C and Java expressions over a state, with [`cast`] and [`arithmetic`].
//! - **[`transfer`]**: The transfer relation: one successor (or none) per CFA edge.
//! - **[`narrowing`]**: Learning values from `assume` edges.
//! - **[`precision`]**: What is tracked where, its refinement, and its text format.
//! - **[`adjustment`]**: Abstraction and the reached-set/path thresholds applied after each transfer.
//! - **[`query`]** and **[`formula`]**: Property queries and SMT-LIB export of states.

pub mod adjustment;
pub mod arithmetic;
pub mod ast;
pub mod builtins;
pub mod cast;
pub mod cfa;
pub mod classification;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod formula;
pub mod location;
pub mod machine;
pub mod narrowing;
pub mod number;
pub mod precision;
pub mod query;
pub mod state;
pub mod symbolic;
pub mod transfer;
pub mod types;
pub mod unknown;
pub mod value;
