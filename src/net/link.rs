//! 链路类型
//!
//! 点对点链路：两端节点加上传播时延。lookahead 只关心跨 rank 链路的时延。

use super::id::NodeId;
use crate::sim::SimTime;

/// 双向点对点链路
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub a: NodeId,
    pub b: NodeId,
    pub delay: SimTime,
}

impl Link {
    /// 创建新链路
    pub fn new(a: NodeId, b: NodeId, delay: SimTime) -> Self {
        Self { a, b, delay }
    }

    /// 给定一端，返回另一端
    pub fn peer_of(&self, node: NodeId) -> Option<NodeId> {
        if node == self.a {
            Some(self.b)
        } else if node == self.b {
            Some(self.a)
        } else {
            None
        }
    }
}
