//! Benchmarks for the state lattice and the transfer relation.
//!
//! Run with:
//! ```bash
//! cargo bench --bench state_lattice
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use value_analysis::ast::{BinaryOp, CExpr, VarRef};
use value_analysis::cfa::{CfaEdge, CfaNode, EdgeKind, Statement};
use value_analysis::config::ValueAnalysisConfig;
use value_analysis::location::MemoryLocation;
use value_analysis::machine::MachineModel;
use value_analysis::precision::ValuePrecision;
use value_analysis::state::ValueState;
use value_analysis::transfer::ValueTransferRelation;
use value_analysis::types::Type;
use value_analysis::value::Value;

/// A state with `n` locals `v0..vn`, where every `stride`-th value differs by `shift`.
fn make_state(n: usize, stride: usize, shift: i64) -> ValueState {
    let mut s = ValueState::new();
    for i in 0..n {
        let v = if i % stride == 0 { i as i64 + shift } else { i as i64 };
        s.assign(MemoryLocation::local("main", format!("v{}", i)), Value::int(v), Type::int());
    }
    s
}

fn bench_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("join");
    for n in [16, 256, 4096] {
        let a = make_state(n, 7, 0);
        let b = make_state(n, 7, 1);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("disagree_1_in_7", n), &(a, b), |bench, (a, b)| {
            bench.iter(|| a.join(b))
        });
    }
    group.finish();
}

fn bench_less_or_equal(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_less_or_equal");
    for n in [16, 256, 4096] {
        let a = make_state(n, 7, 0);
        let j = a.join(&make_state(n, 7, 1));
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("against_join", n), &(a, j), |bench, (a, j)| {
            bench.iter(|| a.is_less_or_equal(j))
        });
    }
    group.finish();
}

fn bench_assignment_edge(c: &mut Criterion) {
    let relation = ValueTransferRelation::new(ValueAnalysisConfig::default(), MachineModel::linux32());
    let precision = ValuePrecision::with_full();
    let v0 = CExpr::var(VarRef::local("main", "v0"), Type::int());
    let v1 = CExpr::var(VarRef::local("main", "v1"), Type::int());
    let edge = CfaEdge::new(
        CfaNode::new(1, "main"),
        CfaNode::new(2, "main"),
        EdgeKind::Statement(Statement::Assignment {
            lhs: v0.clone().into(),
            rhs: CExpr::binary(BinaryOp::Plus, v0, v1, Type::int()).into(),
        }),
    );

    let mut group = c.benchmark_group("transfer");
    for n in [16, 4096] {
        let state = make_state(n, 1, 0);
        group.bench_with_input(BenchmarkId::new("assignment", n), &state, |bench, state| {
            bench.iter(|| relation.get_successor(state, &precision, &edge))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_join, bench_less_or_equal, bench_assignment_edge);
criterion_main!(benches);
