use clap::Parser;

use value_analysis::ast::{BinaryOp, CExpr, VarRef};
use value_analysis::cfa::{CfaEdge, CfaNode, EdgeKind, Statement};
use value_analysis::config::ValueAnalysisConfig;
use value_analysis::machine::MachineModel;
use value_analysis::precision::ValuePrecision;
use value_analysis::state::ValueState;
use value_analysis::transfer::ValueTransferRelation;
use value_analysis::types::Type;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Initial value of `x`.
    #[arg(value_name = "INT", default_value = "100")]
    x: i64,

    /// Use the 64-bit Linux machine model.
    #[clap(long)]
    lp64: bool,

    /// Keep unknown values as symbolic identifiers.
    #[clap(long)]
    symbolic: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let machine = if args.lp64 {
        MachineModel::linux64()
    } else {
        MachineModel::linux32()
    };
    let config = ValueAnalysisConfig {
        symbolic_values: args.symbolic,
        ..ValueAnalysisConfig::default()
    };
    let relation = ValueTransferRelation::new(config, machine.clone());
    let precision = ValuePrecision::with_full();

    // Program:
    //   x = <x>;
    //   c = (unsigned char) x;
    //   y = x * c + u;     (u is an input)
    //   assume(c == x);
    let x = CExpr::var(VarRef::local("main", "x"), Type::int());
    let c = CExpr::var(VarRef::local("main", "c"), Type::uchar());
    let y = CExpr::var(VarRef::local("main", "y"), Type::int());
    let u = CExpr::var(VarRef::local("main", "u"), Type::int());
    let assign = |lhs: &CExpr, rhs: CExpr| {
        EdgeKind::Statement(Statement::Assignment {
            lhs: lhs.clone().into(),
            rhs: rhs.into(),
        })
    };
    let product = CExpr::binary(BinaryOp::Multiply, x.clone(), CExpr::cast(c.clone(), Type::int()), Type::int());
    let program = vec![
        assign(&x, CExpr::int(args.x)),
        assign(&c, CExpr::cast(x.clone(), Type::uchar())),
        assign(&y, CExpr::binary(BinaryOp::Plus, product, u, Type::int())),
        EdgeKind::Assume {
            condition: CExpr::binary(BinaryOp::Equals, CExpr::cast(c, Type::int()), x, Type::int()).into(),
            truth: true,
        },
    ];

    let mut state = ValueState::new();
    for (i, kind) in program.into_iter().enumerate() {
        let edge = CfaEdge::new(CfaNode::new(i as u32, "main"), CfaNode::new(i as u32 + 1, "main"), kind);
        let outcome = relation.get_successor(&state, &precision, &edge)?;
        match outcome.successor {
            Some(next) => {
                println!("{}\n  => {}", edge, next);
                state = next;
            }
            None => {
                println!("{}\n  => infeasible", edge);
                break;
            }
        }
    }

    println!("formula = {}", state.to_formula(&machine));
    let stats = relation.statistics();
    println!(
        "edges = {}, unknown values = {}, infeasible assumes = {}",
        stats.edges(),
        stats.unknown_values(),
        stats.infeasible_assumes()
    );
    println!("Total time: {:.3} s", time_total.elapsed().as_secs_f64());

    Ok(())
}
