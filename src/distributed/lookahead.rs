//! Lookahead 计算
//!
//! lookahead 是任何跨 rank 因果影响的最小延迟，决定一个 rank 在两次同步之间
//! 最多能领先多远。只在每次仿真开始时计算一次。

use super::comm::{CommError, Communicator};
use crate::net::{PartitionMap, SystemId};
use crate::sim::SimTime;
use tracing::{debug, info};

/// 本 rank 的局部 lookahead：所有跨 rank 链路时延与外部上界的最小值。
///
/// 既没有跨 rank 链路也没有外部上界时返回 `SimTime::MAX`。
pub fn local_lookahead(map: &PartitionMap, me: SystemId, bound: Option<SimTime>) -> SimTime {
    map.remote_links_of(me)
        .map(|l| l.delay)
        .chain(bound)
        .min()
        .unwrap_or(SimTime::MAX)
}

/// 计算全局一致的 lookahead。
///
/// 单 rank 时为 0。没有跨 rank 链路的 rank 向最大值归约贡献 0，
/// 并采用归约得到的最大值，使其推进节奏与其他 rank 接近；
/// 若所有 rank 都没有跨 rank 链路，lookahead 保持无穷。
pub fn calculate_lookahead(
    comm: &mut dyn Communicator,
    map: &PartitionMap,
    bound: Option<SimTime>,
) -> Result<SimTime, CommError> {
    let me = comm.system_id();
    if comm.size() <= 1 {
        debug!("单 rank 运行，lookahead 为 0");
        return Ok(SimTime::ZERO);
    }

    let mut lookahead = local_lookahead(map, me, bound);
    let contribution = if lookahead.is_max() { 0 } else { lookahead.0 };
    let max = comm.all_reduce_max(contribution)?;

    if lookahead.is_max() && max != 0 {
        lookahead = SimTime(max);
        debug!(lookahead = ?lookahead, "本 rank 没有跨 rank 链路，采用全局最大值");
    }

    info!(system_id = me, lookahead = %lookahead, "lookahead 计算完成");
    Ok(lookahead)
}
