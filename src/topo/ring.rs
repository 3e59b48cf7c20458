//! 环形拓扑构建

use crate::scenario::{FlowSpec, LinkSpec, NodeSpec, SCHEMA_VERSION, ScenarioSpec};

/// 环形拓扑配置选项
#[derive(Debug, Clone)]
pub struct RingOpts {
    pub ranks: u32,
    pub nodes_per_rank: usize,
    /// 相邻节点之间的链路时延（微秒）
    pub delay_us: u64,
    pub pings: u64,
    pub gap_us: u64,
    pub echo: bool,
}

impl Default for RingOpts {
    fn default() -> Self {
        Self {
            ranks: 2,
            nodes_per_rank: 2,
            delay_us: 10,
            pings: 10,
            gap_us: 5,
            echo: false,
        }
    }
}

/// 构建环形拓扑
///
/// 节点按 rank 连续编号：rank r 拥有 `[r*m, (r+1)*m)`，相邻编号之间连一条链路，
/// 最后一个节点再连回 0。每个 rank 的第一个节点向下一个 rank 的第一个节点发 ping；
/// 只有一个 rank 时由节点 0 发往最后一个节点。
pub fn build_ring(opts: &RingOpts) -> ScenarioSpec {
    assert!(opts.ranks > 0, "ring needs at least one rank");
    assert!(opts.nodes_per_rank > 0, "ring needs at least one node per rank");
    let m = opts.nodes_per_rank;
    let n = opts.ranks as usize * m;

    let nodes = (0..n)
        .map(|i| NodeSpec {
            id: i,
            rank: (i / m) as u32,
            name: Some(format!("r{}n{}", i / m, i % m)),
        })
        .collect();

    let mut links: Vec<LinkSpec> = (0..n.saturating_sub(1))
        .map(|i| LinkSpec {
            a: i,
            b: i + 1,
            delay_us: opts.delay_us,
        })
        .collect();
    // 两个节点时首尾已经相连
    if n > 2 {
        links.push(LinkSpec {
            a: n - 1,
            b: 0,
            delay_us: opts.delay_us,
        });
    }

    let pairs: Vec<(usize, usize)> = if opts.ranks > 1 {
        (0..opts.ranks as usize)
            .map(|r| (r * m, ((r + 1) % opts.ranks as usize) * m))
            .collect()
    } else if n > 1 {
        vec![(0, n - 1)]
    } else {
        Vec::new()
    };

    let flows = pairs
        .into_iter()
        .enumerate()
        .map(|(i, (src, dst))| FlowSpec {
            id: Some(i as u64),
            src,
            dst,
            count: opts.pings,
            gap_us: opts.gap_us,
            start_us: None,
            echo: opts.echo,
        })
        .collect();

    ScenarioSpec {
        schema_version: SCHEMA_VERSION,
        name: Some(format!("ring-{}x{}", opts.ranks, m)),
        ranks: opts.ranks,
        scheduler: None,
        until_us: None,
        lookahead_bound_us: None,
        nodes,
        links,
        flows,
    }
}
