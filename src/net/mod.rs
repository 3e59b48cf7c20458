//! 网络拓扑模块
//!
//! 节点到 rank 的划分以及点对点链路，供 lookahead 计算与模型层路由使用。

// 子模块声明
mod id;
mod link;
mod partition;

// 重新导出公共接口
pub use id::{LinkId, NodeId, SystemId};
pub use link::Link;
pub use partition::PartitionMap;
