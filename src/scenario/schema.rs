//! 场景描述文件（scenario.json）

use super::error::ScenarioError;
use super::{MAX_RANKS, SCHEMA_VERSION};
use crate::net::{NodeId, PartitionMap};
use crate::sched::SchedulerKind;
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub schema_version: u32,
    #[serde(default)]
    pub name: Option<String>,
    pub ranks: u32,
    #[serde(default)]
    pub scheduler: Option<SchedulerKind>,
    /// 仿真运行到多少微秒；缺省时运行到事件耗尽
    #[serde(default)]
    pub until_us: Option<u64>,
    /// lookahead 上界（微秒）
    #[serde(default)]
    pub lookahead_bound_us: Option<u64>,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
    #[serde(default)]
    pub flows: Vec<FlowSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: usize,
    pub rank: u32,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSpec {
    pub a: usize,
    pub b: usize,
    pub delay_us: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSpec {
    #[serde(default)]
    pub id: Option<u64>,
    pub src: usize,
    pub dst: usize,
    pub count: u64,
    pub gap_us: u64,
    #[serde(default)]
    pub start_us: Option<u64>,
    /// 目的节点收到后回一个 pong
    #[serde(default)]
    pub echo: bool,
}

impl FlowSpec {
    pub fn start(&self) -> SimTime {
        SimTime::from_micros(self.start_us.unwrap_or(0))
    }

    pub fn gap(&self) -> SimTime {
        SimTime::from_micros(self.gap_us)
    }
}

impl ScenarioSpec {
    pub fn from_json_str(raw: &str) -> Result<Self, ScenarioError> {
        let spec: ScenarioSpec = serde_json::from_str(raw)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn scheduler_kind(&self) -> SchedulerKind {
        self.scheduler.unwrap_or_default()
    }

    pub fn until(&self) -> Option<SimTime> {
        self.until_us.map(SimTime::from_micros)
    }

    pub fn lookahead_bound(&self) -> Option<SimTime> {
        self.lookahead_bound_us.map(SimTime::from_micros)
    }

    /// flow 的有效编号：显式给出的 id，否则为它在列表中的下标。
    pub fn flow_ids(&self) -> impl Iterator<Item = (u64, &FlowSpec)> + '_ {
        self.flows
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id.unwrap_or(i as u64), f))
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ScenarioError::UnsupportedSchema(self.schema_version));
        }
        if self.ranks == 0 {
            return Err(ScenarioError::NoRanks);
        }
        if self.ranks > MAX_RANKS {
            return Err(ScenarioError::TooManyRanks(self.ranks));
        }
        for (field, us) in [
            ("until_us", self.until_us),
            ("lookahead_bound_us", self.lookahead_bound_us),
        ] {
            if us.is_some_and(|us| SimTime::checked_from_micros(us).is_none()) {
                return Err(ScenarioError::TimeOverflow(field.to_string()));
            }
        }

        let mut seen = vec![false; self.nodes.len()];
        for n in &self.nodes {
            if n.id >= self.nodes.len() {
                // 编号越界说明中间缺了某个编号
                let missing = seen.iter().position(|s| !*s).unwrap_or(n.id);
                return Err(ScenarioError::MissingNode(missing));
            }
            if seen[n.id] {
                return Err(ScenarioError::DuplicateNode(n.id));
            }
            seen[n.id] = true;
            if n.rank >= self.ranks {
                return Err(ScenarioError::RankOutOfRange {
                    node: n.id,
                    rank: n.rank,
                    ranks: self.ranks,
                });
            }
        }

        let rank_of = |id: usize| self.nodes.iter().find(|n| n.id == id).map(|n| n.rank);
        for l in &self.links {
            let ra = rank_of(l.a).ok_or(ScenarioError::UnknownNode(l.a))?;
            let rb = rank_of(l.b).ok_or(ScenarioError::UnknownNode(l.b))?;
            if l.a == l.b {
                return Err(ScenarioError::SelfLink(l.a));
            }
            if ra != rb && l.delay_us == 0 {
                return Err(ScenarioError::ZeroDelayRemoteLink { a: l.a, b: l.b });
            }
            if SimTime::checked_from_micros(l.delay_us).is_none() {
                return Err(ScenarioError::TimeOverflow(format!("link {} <-> {}", l.a, l.b)));
            }
        }

        let partition = self.build_partition();
        let mut flow_ids = HashSet::new();
        for (id, f) in self.flow_ids() {
            if !flow_ids.insert(id) {
                return Err(ScenarioError::DuplicateFlow(id));
            }
            for node in [f.src, f.dst] {
                if node >= self.nodes.len() {
                    return Err(ScenarioError::UnknownNode(node));
                }
            }
            let route = (f.src != f.dst)
                .then(|| partition.route(NodeId(f.src), NodeId(f.dst)))
                .flatten()
                .ok_or(ScenarioError::NoRoute {
                    flow: id,
                    src: f.src,
                    dst: f.dst,
                })?;
            if flow_horizon(f, &partition, &route).is_none() {
                return Err(ScenarioError::TimeOverflow(format!("flow {id}")));
            }
        }
        Ok(())
    }

    /// 构建分区拓扑。调用前应先通过 `validate`。
    pub fn build_partition(&self) -> PartitionMap {
        let mut nodes: Vec<&NodeSpec> = self.nodes.iter().collect();
        nodes.sort_by_key(|n| n.id);

        let mut map = PartitionMap::new();
        for n in nodes {
            let name = n.name.clone().unwrap_or_else(|| format!("n{}", n.id));
            map.add_node(n.rank, name);
        }
        for l in &self.links {
            map.connect(NodeId(l.a), NodeId(l.b), SimTime::from_micros(l.delay_us));
        }
        map
    }
}

/// flow 最后一个 ping（开启 echo 时为最后一个 pong）回到终点的时间。
/// 任一步超出 `SimTime` 范围时返回 `None`。
fn flow_horizon(f: &FlowSpec, partition: &PartitionMap, route: &[NodeId]) -> Option<SimTime> {
    let start = SimTime::checked_from_micros(f.start_us.unwrap_or(0))?;
    let gap = SimTime::checked_from_micros(f.gap_us)?;
    let last_inject = start.0.checked_add(gap.0.checked_mul(f.count.saturating_sub(1))?)?;

    let mut path = 0u64;
    for hop in route.windows(2) {
        path = path.checked_add(partition.link_between(hop[0], hop[1])?.delay.0)?;
    }
    let trip = if f.echo { path.checked_mul(2)? } else { path };
    last_inject.checked_add(trip).map(SimTime)
}
