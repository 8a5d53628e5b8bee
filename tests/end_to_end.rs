use std::sync::Arc;

use test_log::test;

use value_analysis::adjustment::{AssignmentCounter, ReachedSet, ValuePrecisionAdjustment};
use value_analysis::arithmetic::Flavor;
use value_analysis::ast::{BinaryOp, CExpr, JExpr, VarRef};
use value_analysis::cfa::{CfaEdge, CfaNode, Declaration, EdgeKind, Expr, Initializer, Parameter, Statement};
use value_analysis::classification::VariableClasses;
use value_analysis::config::{AbstractionPoints, ValueAnalysisConfig};
use value_analysis::location::MemoryLocation;
use value_analysis::machine::MachineModel;
use value_analysis::precision::{PrecisionIncrement, ValuePrecision};
use value_analysis::state::ValueState;
use value_analysis::transfer::{TransferOutcome, ValueTransferRelation};
use value_analysis::types::Type;
use value_analysis::value::Value;

fn relation() -> ValueTransferRelation {
    ValueTransferRelation::new(ValueAnalysisConfig::default(), MachineModel::linux32())
}

fn x() -> CExpr {
    CExpr::var(VarRef::local("main", "x"), Type::int())
}

fn loc(name: &str) -> MemoryLocation {
    MemoryLocation::local("main", name)
}

fn run(relation: &ValueTransferRelation, state: &ValueState, kind: EdgeKind) -> TransferOutcome {
    let edge = CfaEdge::new(CfaNode::new(1, "main"), CfaNode::new(2, "main"), kind);
    relation.get_successor(state, &ValuePrecision::with_full(), &edge).unwrap()
}

fn assume(condition: impl Into<Expr>, truth: bool) -> EdgeKind {
    EdgeKind::Assume {
        condition: condition.into(),
        truth,
    }
}

fn declare_x(value: i64) -> EdgeKind {
    EdgeKind::Declaration(Declaration {
        var: VarRef::local("main", "x"),
        ty: Type::int(),
        initializer: Some(Initializer::Expression(CExpr::int(value).into())),
        flavor: Flavor::C,
    })
}

#[test]
fn test_declaration_then_assumes() {
    let r = relation();
    let s = run(&r, &ValueState::new(), declare_x(5)).successor.unwrap();
    assert_eq!(s.value_of(&loc("x")), Some(&Value::int(5)));

    let same = run(&r, &s, assume(CExpr::binary(BinaryOp::Equals, x(), CExpr::int(5), Type::int()), true));
    assert_eq!(same.successor, Some(s.clone()));

    let other = run(&r, &s, assume(CExpr::binary(BinaryOp::Equals, x(), CExpr::int(6), Type::int()), true));
    assert!(!other.is_feasible());
    assert_eq!(r.statistics().infeasible_assumes(), 1);
}

#[test]
fn test_false_branch_of_nonzero_test() {
    let r = relation();
    let cond = CExpr::binary(BinaryOp::NotEquals, x(), CExpr::int(0), Type::int());
    let s = run(&r, &ValueState::new(), assume(cond.clone(), false)).successor.unwrap();
    assert_eq!(s.value_of(&loc("x")), Some(&Value::int(0)));

    // Nothing is learned on the true branch of a plain int.
    let s = run(&r, &ValueState::new(), assume(cond, true)).successor.unwrap();
    assert!(s.is_empty());
}

#[test]
fn test_boolean_variable_optimization() {
    let r = relation().with_classification(Arc::new(VariableClasses::new().with_boolean("main::x")));
    let cond = CExpr::binary(BinaryOp::NotEquals, x(), CExpr::int(0), Type::int());
    let s = run(&r, &ValueState::new(), assume(cond.clone(), true)).successor.unwrap();
    assert_eq!(s.value_of(&loc("x")), Some(&Value::int(1)));

    let off = ValueTransferRelation::new(
        ValueAnalysisConfig {
            optimize_boolean_variables: false,
            ..ValueAnalysisConfig::default()
        },
        MachineModel::linux32(),
    )
    .with_classification(Arc::new(VariableClasses::new().with_boolean("main::x")));
    let s = run(&off, &ValueState::new(), assume(cond, true)).successor.unwrap();
    assert!(s.is_empty());
}

#[test]
fn test_narrowing_through_casts() {
    let r = relation();
    let c = CExpr::var(VarRef::local("main", "c"), Type::schar());
    let seen_as_uchar = CExpr::cast(CExpr::cast(c, Type::int()), Type::uchar());
    let cond = CExpr::binary(BinaryOp::Equals, seen_as_uchar, CExpr::int(255), Type::int());
    let s = run(&r, &ValueState::new(), assume(cond, true)).successor.unwrap();
    assert_eq!(s.value_of(&loc("c")), Some(&Value::int(-1)));
    assert_eq!(s.type_of(&loc("c")), Some(&Type::schar()));
    assert_eq!(r.statistics().narrowed_assumes(), 1);
}

#[test]
fn test_java_division_by_zero_in_condition() {
    let r = relation();
    let div = JExpr::binary(BinaryOp::Divide, JExpr::int(1), JExpr::int(0), Type::java_int());
    let cond = JExpr::binary(BinaryOp::Equals, div, JExpr::int(0), Type::Bool);
    assert!(!run(&r, &ValueState::new(), assume(cond.clone(), true)).is_feasible());
    assert!(!run(&r, &ValueState::new(), assume(cond, false)).is_feasible());
}

#[test]
fn test_call_and_return_round_trip() {
    let r = relation();
    let s = run(&r, &ValueState::new(), declare_x(1)).successor.unwrap();
    let call = EdgeKind::FunctionCall {
        callee: "twice".into(),
        parameters: vec![Parameter {
            name: "n".into(),
            ty: Type::int(),
        }],
        arguments: vec![x().into()],
        variadic: false,
    };
    let s = run(&r, &s, call).successor.unwrap();
    let n = CExpr::var(VarRef::local("twice", "n"), Type::int());
    let ret = EdgeKind::Return {
        function: "twice".into(),
        expression: Some(CExpr::binary(BinaryOp::Multiply, n, CExpr::int(2), Type::int()).into()),
        return_type: Type::int(),
    };
    let s = run(&r, &s, ret).successor.unwrap();
    let back = EdgeKind::FunctionReturn {
        callee: "twice".into(),
        assign_to: Some(x().into()),
        return_type: Type::int(),
    };
    let s = run(&r, &s, back).successor.unwrap();
    assert_eq!(s.value_of(&loc("x")), Some(&Value::int(2)));
    assert_eq!(s.size(), 1);
}

#[test]
fn test_refinement_is_monotone_and_idempotent() {
    let node = CfaNode::new(5, "main");
    let empty = Arc::new(ValuePrecision::scoped_empty());
    assert!(!empty.is_tracking(&loc("x"), &Type::int(), &node));

    let mut increment = PrecisionIncrement::new();
    increment.add_everywhere(loc("x"));
    let refined = empty.refine(&increment);
    assert!(refined.is_tracking(&loc("x"), &Type::int(), &node));
    assert!(!refined.is_tracking(&loc("y"), &Type::int(), &node));
    assert!(Arc::ptr_eq(&refined, &refined.refine(&increment)));

    let mut more = PrecisionIncrement::new();
    more.add_everywhere(loc("y"));
    let wider = refined.refine(&more);
    assert!(wider.is_tracking(&loc("x"), &Type::int(), &node));
    assert!(wider.is_tracking(&loc("y"), &Type::int(), &node));
    assert_eq!(wider.size(), 2);
}

#[test]
fn test_loop_counter_is_abstracted_at_loop_head() {
    // x = x + 1 around a loop head, with an empty precision.
    let config = ValueAnalysisConfig {
        abstraction: AbstractionPoints::LoopHeads,
        ..ValueAnalysisConfig::default()
    };
    let r = ValueTransferRelation::new(config.clone(), MachineModel::linux32());
    let adjustment = ValuePrecisionAdjustment::new(config);
    let precision = ValuePrecision::scoped_empty();
    let head = CfaNode::new(2, "main").as_loop_head();
    let increment = CfaEdge::new(
        head.clone(),
        head.clone(),
        EdgeKind::Statement(Statement::Assignment {
            lhs: x().into(),
            rhs: CExpr::binary(BinaryOp::Plus, x(), CExpr::int(1), Type::int()).into(),
        }),
    );

    let mut reached = ReachedSet::new();
    let mut counter = AssignmentCounter::new();
    let mut state = run(&r, &ValueState::new(), declare_x(0)).successor.unwrap();
    for _ in 0..3 {
        let next = r.get_successor(&state, &precision, &increment).unwrap().successor.unwrap();
        counter = counter.record(&next);
        let next = adjustment.prec(next, &precision, &head, &reached, Some(&counter));
        reached.add(head.id, next.clone());
        state = next;
    }
    assert!(!state.contains(&loc("x")));
    assert_eq!(adjustment.statistics().abstractions(), 3);
    // Once forgotten, the state no longer changes: the loop has converged.
    let again = r.get_successor(&state, &precision, &increment).unwrap().successor.unwrap();
    assert!(again.is_less_or_equal(&state) && state.is_less_or_equal(&again));
}
