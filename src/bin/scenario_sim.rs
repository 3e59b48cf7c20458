//! 场景仿真
//!
//! 读取 scenario.json，在一个或多个 rank 上运行并打印报告

use clap::Parser;
use dsim_rs::sched::SchedulerKind;
use dsim_rs::scenario::{ScenarioError, ScenarioReport, ScenarioSpec, run_scenario};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "scenario-sim", about = "Run scenario.json on the dsim-rs kernel")]
struct Args {
    /// Path to scenario.json
    #[arg(long)]
    scenario: PathBuf,

    /// Override the event queue backend
    #[arg(long, value_enum)]
    scheduler: Option<SchedulerKind>,

    /// Run until this time (us); defaults to running until completion
    #[arg(long)]
    until_us: Option<u64>,

    /// Override the lookahead bound (us)
    #[arg(long)]
    lookahead_bound_us: Option<u64>,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn run(args: &Args) -> Result<ScenarioReport, ScenarioError> {
    let mut spec = ScenarioSpec::load(&args.scenario)?;
    if args.scheduler.is_some() {
        spec.scheduler = args.scheduler;
    }
    if args.until_us.is_some() {
        spec.until_us = args.until_us;
    }
    if args.lookahead_bound_us.is_some() {
        spec.lookahead_bound_us = args.lookahead_bound_us;
    }
    run_scenario(&spec)
}

fn print_text(report: &ScenarioReport) {
    println!(
        "scenario {} scheduler={} total_events={}",
        report.name.as_deref().unwrap_or("-"),
        report.scheduler,
        report.total_events()
    );
    for r in &report.ranks {
        println!(
            "rank {} lookahead={} sync_rounds={} tx={} rx={} events={} final_time={}",
            r.system_id, r.lookahead, r.sync_rounds, r.tx, r.rx, r.events, r.final_time
        );
    }
    for f in &report.flows {
        println!(
            "flow {} {}->{} hops={} sent={} delivered={} echoed={}",
            f.id, f.src, f.dst, f.hops, f.stats.sent, f.stats.delivered, f.stats.echoed
        );
    }
}

fn main() -> ExitCode {
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
    match run(&args) {
        Ok(report) => {
            if args.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(s) => println!("{s}"),
                    Err(e) => {
                        eprintln!("error: failed to encode report: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                print_text(&report);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
