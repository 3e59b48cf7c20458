//! 环形拓扑仿真
//!
//! 每个 rank 持有环上连续的一段节点，相邻 rank 的首节点之间互发 ping

use clap::Parser;
use dsim_rs::sched::SchedulerKind;
use dsim_rs::scenario::run_scenario;
use dsim_rs::topo::ring::{RingOpts, build_ring};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "ring-sim", about = "环形拓扑分布式仿真：相邻 rank 之间互发 ping")]
struct Args {
    #[arg(long, default_value_t = 2)]
    ranks: u32,
    #[arg(long, default_value_t = 2)]
    nodes_per_rank: usize,
    /// 相邻节点之间的链路时延（微秒）
    #[arg(long, default_value_t = 10)]
    delay_us: u64,
    #[arg(long, default_value_t = 10)]
    pings: u64,
    /// 两个 ping 的注入间隔（微秒）
    #[arg(long, default_value_t = 5)]
    gap_us: u64,
    #[arg(long)]
    echo: bool,
    #[arg(long, value_enum)]
    scheduler: Option<SchedulerKind>,
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    if args.ranks == 0 || args.nodes_per_rank == 0 {
        eprintln!("error: --ranks and --nodes-per-rank must be positive");
        return ExitCode::FAILURE;
    }

    let opts = RingOpts {
        ranks: args.ranks,
        nodes_per_rank: args.nodes_per_rank,
        delay_us: args.delay_us,
        pings: args.pings,
        gap_us: args.gap_us,
        echo: args.echo,
    };
    let mut spec = build_ring(&opts);
    spec.scheduler = args.scheduler;

    let report = match run_scenario(&spec) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("error: failed to encode report: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    let delivered: u64 = report.flows.iter().map(|f| f.stats.delivered).sum();
    let echoed: u64 = report.flows.iter().map(|f| f.stats.echoed).sum();
    let rounds = report.ranks.iter().map(|r| r.sync_rounds).max().unwrap_or(0);
    let final_time = report.ranks.iter().map(|r| r.final_time).max().unwrap_or_default();
    println!(
        "done @ {}, ranks={}, events={}, sync_rounds={}, delivered={}, echoed={}",
        final_time,
        report.ranks.len(),
        report.total_events(),
        rounds,
        delivered,
        echoed
    );
    ExitCode::SUCCESS
}
