//! 场景运行器
//!
//! 单 rank 场景直接用 `Simulator`；多 rank 场景每个 rank 一个线程，
//! 通过 `LocalCluster` 互连并由 `DistributedSimulator` 同步。

use super::error::ScenarioError;
use super::ping::{FlowStats, PingWorld, install_flows};
use super::schema::ScenarioSpec;
use crate::distributed::{DistributedSimulator, run_cluster};
use crate::net::{NodeId, PartitionMap};
use crate::sched::SchedulerKind;
use crate::sim::{SimError, SimTime, Simulator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    #[serde(default)]
    pub name: Option<String>,
    pub scheduler: SchedulerKind,
    pub ranks: Vec<RankReport>,
    pub flows: Vec<FlowReport>,
}

impl ScenarioReport {
    pub fn total_events(&self) -> u64 {
        self.ranks.iter().map(|r| r.events).sum()
    }

    pub fn flow(&self, id: u64) -> Option<&FlowReport> {
        self.flows.iter().find(|f| f.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankReport {
    pub system_id: u32,
    pub lookahead: SimTime,
    pub sync_rounds: u64,
    pub tx: u64,
    pub rx: u64,
    pub events: u64,
    pub final_time: SimTime,
    pub last_arrival: Option<SimTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowReport {
    pub id: u64,
    pub src: usize,
    pub dst: usize,
    pub hops: usize,
    #[serde(flatten)]
    pub stats: FlowStats,
}

type RankOutcome = (RankReport, BTreeMap<u64, FlowStats>);

/// 运行场景并汇总各 rank 的结果。
pub fn run_scenario(spec: &ScenarioSpec) -> Result<ScenarioReport, ScenarioError> {
    spec.validate()?;
    let partition = Arc::new(spec.build_partition());
    let kind = spec.scheduler_kind();
    info!(
        name = spec.name.as_deref().unwrap_or("-"),
        ranks = spec.ranks,
        nodes = partition.node_count(),
        links = partition.links().len(),
        flows = spec.flows.len(),
        scheduler = %kind,
        "🧭 运行场景"
    );

    let outcomes: Vec<RankOutcome> = if spec.ranks == 1 {
        vec![run_single(spec, partition.clone(), kind)]
    } else {
        run_cluster(spec.ranks, |comm| -> Result<RankOutcome, SimError> {
            let mut dsim = DistributedSimulator::with_simulator(
                Simulator::with_scheduler(kind),
                Box::new(comm),
                (*partition).clone(),
            );
            if let Some(bound) = spec.lookahead_bound() {
                dsim.bound_lookahead(bound)?;
            }
            let mut world = PingWorld::new(partition.clone());
            install_flows(dsim.sim_mut(), &partition, spec.flow_ids());
            if let Some(until) = spec.until() {
                dsim.sim_mut().stop_after(until);
            }
            dsim.run(&mut world)?;

            let report = RankReport {
                system_id: dsim.system_id(),
                lookahead: dsim.lookahead(),
                sync_rounds: dsim.sync_rounds(),
                tx: dsim.tx_count(),
                rx: dsim.rx_count(),
                events: dsim.sim().event_count(),
                final_time: dsim.sim().now(),
                last_arrival: world.last_arrival,
            };
            dsim.destroy(&mut world);
            Ok((report, world.stats))
        })?
        .into_iter()
        .collect::<Result<_, _>>()?
    };

    let mut merged: BTreeMap<u64, FlowStats> = BTreeMap::new();
    let mut ranks = Vec::with_capacity(outcomes.len());
    for (report, stats) in outcomes {
        for (id, s) in &stats {
            merged.entry(*id).or_default().merge(s);
        }
        ranks.push(report);
    }

    let flows = spec
        .flow_ids()
        .map(|(id, f)| FlowReport {
            id,
            src: f.src,
            dst: f.dst,
            hops: partition
                .route(NodeId(f.src), NodeId(f.dst))
                .map_or(0, |r| r.len() - 1),
            stats: merged.get(&id).copied().unwrap_or_default(),
        })
        .collect();

    let report = ScenarioReport {
        name: spec.name.clone(),
        scheduler: kind,
        ranks,
        flows,
    };
    info!(total_events = report.total_events(), "🏁 场景完成");
    Ok(report)
}

fn run_single(
    spec: &ScenarioSpec,
    partition: Arc<PartitionMap>,
    kind: SchedulerKind,
) -> RankOutcome {
    let mut sim = Simulator::with_scheduler(kind);
    let mut world = PingWorld::new(partition.clone());
    install_flows(&mut sim, &partition, spec.flow_ids());
    if let Some(until) = spec.until() {
        sim.stop_after(until);
    }
    sim.run(&mut world);

    let report = RankReport {
        system_id: 0,
        lookahead: SimTime::ZERO,
        sync_rounds: 0,
        tx: 0,
        rx: 0,
        events: sim.event_count(),
        final_time: sim.now(),
        last_arrival: world.last_arrival,
    };
    sim.destroy(&mut world);
    (report, world.stats)
}
