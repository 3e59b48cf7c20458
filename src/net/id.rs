//! 标识符类型
//!
//! 定义节点、链路和 rank 的标识符。

use serde::{Deserialize, Serialize};

/// 节点标识符（同时用作事件上下文）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    /// 作为事件上下文使用的值
    pub fn context(self) -> u32 {
        u32::try_from(self.0).unwrap_or(u32::MAX - 1)
    }
}

/// 链路标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub usize);

/// rank（分区）标识符
pub type SystemId = u32;
