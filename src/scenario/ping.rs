//! Ping 模型
//!
//! 每个 flow 从源节点周期性地注入 ping，沿最短路径逐跳转发；
//! 每一跳耗时等于链路时延。下一跳在其他 rank 上时经 `send_remote` 发出。
//! 开启 echo 时，目的节点沿原路回一个 pong。

use crate::net::{NodeId, PartitionMap};
use crate::sim::{Event, SimTime, Simulator, World};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// 单个 flow 在某个 rank 上观察到的计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStats {
    pub sent: u64,
    pub delivered: u64,
    pub echoed: u64,
}

impl FlowStats {
    pub fn merge(&mut self, other: &FlowStats) {
        self.sent += other.sent;
        self.delivered += other.delivered;
        self.echoed += other.echoed;
    }
}

/// 一个 rank 的模型状态
#[derive(Debug)]
pub struct PingWorld {
    partition: Arc<PartitionMap>,
    pub stats: BTreeMap<u64, FlowStats>,
    /// 最近一次 ping/pong 到达终点的时间
    pub last_arrival: Option<SimTime>,
}

impl PingWorld {
    pub fn new(partition: Arc<PartitionMap>) -> Self {
        Self {
            partition,
            stats: BTreeMap::new(),
            last_arrival: None,
        }
    }

    pub fn partition(&self) -> &PartitionMap {
        &self.partition
    }

    fn flow(&mut self, flow_id: u64) -> &mut FlowStats {
        self.stats.entry(flow_id).or_default()
    }
}

impl World for PingWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn ping_world(world: &mut dyn World) -> &mut PingWorld {
    world
        .as_any_mut()
        .downcast_mut::<PingWorld>()
        .expect("world must be PingWorld")
}

/// 在途的 ping 或 pong
#[derive(Debug, Clone)]
pub struct Ping {
    pub flow_id: u64,
    pub seq: u64,
    pub route: Arc<[NodeId]>,
    /// 当前所在节点在 `route` 中的下标
    pub hop: usize,
    pub echo: bool,
    pub is_pong: bool,
}

impl Ping {
    pub fn at(&self) -> NodeId {
        self.route[self.hop]
    }

    fn arrived(&self) -> bool {
        self.hop + 1 == self.route.len()
    }
}

/// 把 ping 送往路径上的下一跳。
fn transmit(sim: &mut Simulator, partition: &PartitionMap, mut ping: Ping) {
    let from = ping.at();
    let to = ping.route[ping.hop + 1];
    let delay = partition
        .link_between(from, to)
        .map(|l| l.delay)
        .unwrap_or_else(|| panic!("no link between {:?} and {:?}", from, to));
    ping.hop += 1;

    let dst_rank = partition.system_of(to);
    if dst_rank == sim.system_id() {
        trace!(?from, ?to, delay = ?delay, "本地转发");
        sim.schedule_with_context(to.context(), delay, DeliverPing { ping });
    } else {
        debug!(?from, ?to, dst_rank, delay = ?delay, "跨 rank 转发");
        sim.send_remote(dst_rank, delay, to.context(), DeliverPing { ping });
    }
}

/// 流量注入事件：每隔 `gap` 发一个 ping，共 `remaining` 个。
#[derive(Debug)]
pub struct InjectPing {
    pub flow_id: u64,
    pub route: Arc<[NodeId]>,
    pub remaining: u64,
    pub gap: SimTime,
    pub echo: bool,
    pub next_seq: u64,
}

impl Event for InjectPing {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let mut me = *self;
        if me.remaining == 0 {
            return;
        }
        let w = ping_world(world);
        w.flow(me.flow_id).sent += 1;

        let ping = Ping {
            flow_id: me.flow_id,
            seq: me.next_seq,
            route: me.route.clone(),
            hop: 0,
            echo: me.echo,
            is_pong: false,
        };
        trace!(flow_id = me.flow_id, seq = me.next_seq, now = ?sim.now(), "注入 ping");
        transmit(sim, &w.partition, ping);

        me.remaining -= 1;
        me.next_seq += 1;
        if me.remaining > 0 {
            let gap = me.gap;
            sim.schedule(gap, me);
        }
    }
}

/// 事件：ping 到达路径上的某个节点。
#[derive(Debug)]
pub struct DeliverPing {
    pub ping: Ping,
}

impl Event for DeliverPing {
    #[tracing::instrument(level = "trace", skip(self, sim, world), fields(flow_id = self.ping.flow_id, seq = self.ping.seq))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPing { ping } = *self;
        debug_assert_eq!(sim.context(), ping.at().context());
        let w = ping_world(world);

        if !ping.arrived() {
            transmit(sim, &w.partition, ping);
            return;
        }

        w.last_arrival = Some(sim.now());
        if ping.is_pong {
            w.flow(ping.flow_id).echoed += 1;
            trace!(flow_id = ping.flow_id, seq = ping.seq, now = ?sim.now(), "收到 pong");
            return;
        }

        w.flow(ping.flow_id).delivered += 1;
        trace!(flow_id = ping.flow_id, seq = ping.seq, now = ?sim.now(), "ping 到达目的节点");
        if ping.echo {
            let mut back: Vec<NodeId> = ping.route.to_vec();
            back.reverse();
            let pong = Ping {
                route: back.into(),
                hop: 0,
                is_pong: true,
                ..ping
            };
            transmit(sim, &w.partition, pong);
        }
    }
}

/// 为源节点位于 `system_id` 上的 flow 安排注入事件。
pub fn install_flows<'a>(
    sim: &mut Simulator,
    partition: &PartitionMap,
    flows: impl Iterator<Item = (u64, &'a super::FlowSpec)>,
) -> usize {
    let mut installed = 0;
    for (flow_id, f) in flows {
        let src = NodeId(f.src);
        if partition.system_of(src) != sim.system_id() || f.count == 0 {
            continue;
        }
        let Some(route) = partition.route(src, NodeId(f.dst)) else {
            continue;
        };
        sim.schedule_with_context(
            src.context(),
            f.start(),
            InjectPing {
                flow_id,
                route: route.into(),
                remaining: f.count,
                gap: f.gap(),
                echo: f.echo,
                next_seq: 0,
            },
        );
        installed += 1;
    }
    info!(system_id = sim.system_id(), installed, "🚀 flow 已安装");
    installed
}
