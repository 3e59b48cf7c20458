//! 分布式仿真模块
//!
//! 保守同步（授权时间窗口）算法、lookahead 计算与 rank 间通信抽象。

mod comm;
mod lbts;
mod local;
mod lookahead;
mod simulator;

pub use comm::{CommError, Communicator, RemoteMessage};
pub use lbts::{LbtsMessage, LbtsSummary};
pub use local::{LocalCluster, LocalComm};
pub use lookahead::{calculate_lookahead, local_lookahead};
pub use simulator::DistributedSimulator;

use crate::sim::SimError;
use std::thread;

/// 为 `size` 个 rank 各起一个线程运行 `f`，按 rank 顺序返回结果。
///
/// 某个 rank panic 时，其余 rank 的通信会因通道断开而出错退出。
pub fn run_cluster<F, R>(size: u32, f: F) -> Result<Vec<R>, SimError>
where
    F: Fn(LocalComm) -> R + Sync,
    R: Send,
{
    let comms = LocalCluster::new(size);
    let f = &f;
    thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| s.spawn(move || f(comm)))
            .collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(rank, h)| h.join().map_err(|_| SimError::RankPanicked(rank as u32)))
            .collect()
    })
}
