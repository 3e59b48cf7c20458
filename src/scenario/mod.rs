//! 场景模块
//!
//! 从 JSON 描述构建分区拓扑和 ping 流量，在单 rank 或多 rank 上运行并汇总报告。

mod error;
mod ping;
mod runner;
mod schema;

pub use error::ScenarioError;
pub use ping::{DeliverPing, FlowStats, InjectPing, Ping, PingWorld, install_flows};
pub use runner::{FlowReport, RankReport, ScenarioReport, run_scenario};
pub use schema::{FlowSpec, LinkSpec, NodeSpec, ScenarioSpec};

/// 当前支持的场景文件版本
pub const SCHEMA_VERSION: u32 = 1;

/// 单个场景允许的最大 rank 数（每个 rank 一个线程）
pub const MAX_RANKS: u32 = 1024;
