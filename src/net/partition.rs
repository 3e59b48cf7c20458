//! 分区拓扑
//!
//! 记录每个节点归属的 rank 以及节点之间的点对点链路。
//! 分布式引擎用它计算 lookahead，模型层用它决定消息走本地还是跨 rank。

use std::collections::{HashMap, VecDeque};

use super::id::{LinkId, NodeId, SystemId};
use super::link::Link;
use crate::sim::SimTime;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct PartitionMap {
    nodes: Vec<SystemId>,
    names: Vec<String>,
    links: Vec<Link>,
    edges: HashMap<(NodeId, NodeId), LinkId>,
    /// 每个节点的邻居，按节点编号升序
    adj: Vec<Vec<NodeId>>,
}

impl PartitionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个归属于 `system_id` 的节点
    pub fn add_node(&mut self, system_id: SystemId, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(system_id);
        self.names.push(name.into());
        self.adj.push(Vec::new());
        id
    }

    /// 连接两个节点（双向）。重复连接同一对节点时返回已有链路。
    pub fn connect(&mut self, a: NodeId, b: NodeId, delay: SimTime) -> LinkId {
        assert!(a != b, "cannot connect node {:?} to itself", a);
        assert!(
            a.0 < self.nodes.len() && b.0 < self.nodes.len(),
            "unknown node in link {:?} <-> {:?}",
            a,
            b
        );
        if let Some(&id) = self.edges.get(&(a, b)) {
            return id;
        }
        let id = LinkId(self.links.len());
        self.links.push(Link::new(a, b, delay));
        self.edges.insert((a, b), id);
        self.edges.insert((b, a), id);
        for (from, to) in [(a, b), (b, a)] {
            let list = &mut self.adj[from.0];
            let at = list.partition_point(|n| *n < to);
            list.insert(at, to);
        }
        if self.nodes[a.0] != self.nodes[b.0] {
            debug!(?a, ?b, delay = ?delay, "跨 rank 链路");
        }
        id
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn name(&self, node: NodeId) -> &str {
        &self.names[node.0]
    }

    /// 节点所在 rank
    pub fn system_of(&self, node: NodeId) -> SystemId {
        self.nodes[node.0]
    }

    /// 归属于某个 rank 的全部节点
    pub fn nodes_on(&self, system_id: SystemId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, s)| **s == system_id)
            .map(|(i, _)| NodeId(i))
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link_between(&self, a: NodeId, b: NodeId) -> Option<&Link> {
        self.edges.get(&(a, b)).map(|id| &self.links[id.0])
    }

    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        &self.adj[node.0]
    }

    /// `system_id` 上的节点连向其他 rank 的所有链路
    pub fn remote_links_of(&self, system_id: SystemId) -> impl Iterator<Item = &Link> + '_ {
        self.links.iter().filter(move |l| {
            let sa = self.nodes[l.a.0];
            let sb = self.nodes[l.b.0];
            sa != sb && (sa == system_id || sb == system_id)
        })
    }

    /// 最短跳数路径（BFS，邻居按编号升序，结果确定）。
    pub fn route(&self, src: NodeId, dst: NodeId) -> Option<Vec<NodeId>> {
        if src.0 >= self.nodes.len() || dst.0 >= self.nodes.len() {
            return None;
        }
        if src == dst {
            return Some(vec![src]);
        }
        let mut prev: Vec<Option<NodeId>> = vec![None; self.nodes.len()];
        let mut seen = vec![false; self.nodes.len()];
        let mut q = VecDeque::new();
        seen[src.0] = true;
        q.push_back(src);

        while let Some(v) = q.pop_front() {
            for &n in &self.adj[v.0] {
                if seen[n.0] {
                    continue;
                }
                seen[n.0] = true;
                prev[n.0] = Some(v);
                if n == dst {
                    let mut path = vec![dst];
                    let mut cur = dst;
                    while let Some(p) = prev[cur.0] {
                        path.push(p);
                        cur = p;
                    }
                    path.reverse();
                    return Some(path);
                }
                q.push_back(n);
            }
        }
        None
    }
}
