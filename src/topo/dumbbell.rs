//! Dumbbell 拓扑构建

use crate::scenario::{FlowSpec, LinkSpec, NodeSpec, SCHEMA_VERSION, ScenarioSpec};

/// Dumbbell 拓扑配置选项
#[derive(Debug, Clone)]
pub struct DumbbellOpts {
    pub hosts_per_side: usize,
    pub host_delay_us: u64,
    /// 瓶颈链路时延，也是两个 rank 之间的 lookahead
    pub bottleneck_delay_us: u64,
    pub pings: u64,
    pub gap_us: u64,
    pub echo: bool,
}

impl Default for DumbbellOpts {
    fn default() -> Self {
        Self {
            hosts_per_side: 2,
            host_delay_us: 2,
            bottleneck_delay_us: 20,
            pings: 100,
            gap_us: 10,
            echo: true,
        }
    }
}

/// 构建 dumbbell 拓扑
///
/// 拓扑结构：l* <-> s0 <-> s1 <-> r*
/// 左侧主机与 s0 在 rank 0，右侧主机与 s1 在 rank 1；
/// 第 i 个左侧主机向第 i 个右侧主机发 ping。
pub fn build_dumbbell(opts: &DumbbellOpts) -> ScenarioSpec {
    assert!(opts.hosts_per_side > 0, "dumbbell needs at least one host per side");
    let h = opts.hosts_per_side;
    let s0 = 0;
    let s1 = 1;
    let left = |i: usize| 2 + i;
    let right = |i: usize| 2 + h + i;

    let mut nodes = vec![
        NodeSpec {
            id: s0,
            rank: 0,
            name: Some("s0".to_string()),
        },
        NodeSpec {
            id: s1,
            rank: 1,
            name: Some("s1".to_string()),
        },
    ];
    let mut links = vec![LinkSpec {
        a: s0,
        b: s1,
        delay_us: opts.bottleneck_delay_us,
    }];
    let mut flows = Vec::with_capacity(h);

    for i in 0..h {
        nodes.push(NodeSpec {
            id: left(i),
            rank: 0,
            name: Some(format!("l{i}")),
        });
        nodes.push(NodeSpec {
            id: right(i),
            rank: 1,
            name: Some(format!("r{i}")),
        });
        links.push(LinkSpec {
            a: left(i),
            b: s0,
            delay_us: opts.host_delay_us,
        });
        links.push(LinkSpec {
            a: s1,
            b: right(i),
            delay_us: opts.host_delay_us,
        });
        flows.push(FlowSpec {
            id: Some(i as u64),
            src: left(i),
            dst: right(i),
            count: opts.pings,
            gap_us: opts.gap_us,
            start_us: None,
            echo: opts.echo,
        });
    }

    ScenarioSpec {
        schema_version: SCHEMA_VERSION,
        name: Some(format!("dumbbell-{h}")),
        ranks: 2,
        scheduler: None,
        until_us: None,
        lookahead_bound_us: None,
        nodes,
        links,
        flows,
    }
}
