//! rank 间通信抽象
//!
//! 同步算法只依赖这里的最小接口：点对点投递跨 rank 消息、
//! 定长摘要的全收集（all-gather）以及标量最大值归约。

use super::lbts::LbtsMessage;
use crate::sim::{Event, SimTime};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommError {
    #[error("rank {rank} is not part of this cluster (size {size})")]
    UnknownRank { rank: u32, size: u32 },

    #[error("peer rank {0} disconnected")]
    Disconnected(u32),

    #[error("unexpected collective from rank {peer}: expected {expected}")]
    Protocol { peer: u32, expected: &'static str },

    #[error("communicator already destroyed")]
    Destroyed,
}

/// 跨 rank 消息：在目标 rank 上于 `rx_time` 以 `context` 执行 `ev`。
pub struct RemoteMessage {
    src: u32,
    dst: u32,
    rx_time: SimTime,
    context: u32,
    ev: Box<dyn Event>,
}

impl RemoteMessage {
    pub fn new(src: u32, dst: u32, rx_time: SimTime, context: u32, ev: Box<dyn Event>) -> Self {
        Self {
            src,
            dst,
            rx_time,
            context,
            ev,
        }
    }

    pub fn src(&self) -> u32 {
        self.src
    }

    pub fn dst(&self) -> u32 {
        self.dst
    }

    pub fn rx_time(&self) -> SimTime {
        self.rx_time
    }

    pub fn context(&self) -> u32 {
        self.context
    }

    pub(crate) fn into_parts(self) -> (SimTime, u32, Box<dyn Event>) {
        (self.rx_time, self.context, self.ev)
    }
}

impl fmt::Debug for RemoteMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteMessage")
            .field("src", &self.src)
            .field("dst", &self.dst)
            .field("rx_time", &self.rx_time)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// 集合通信接口
pub trait Communicator: Send {
    /// 本 rank 编号
    fn system_id(&self) -> u32;

    /// rank 总数
    fn size(&self) -> u32;

    /// 发送一条跨 rank 消息（非阻塞）
    fn send(&mut self, msg: RemoteMessage) -> Result<(), CommError>;

    /// 取出一条已到达的消息；没有时返回 `Ok(None)`，不阻塞。
    fn try_recv(&mut self) -> Result<Option<RemoteMessage>, CommError>;

    /// 回收已完成的发送。
    fn test_send_complete(&mut self) -> Result<(), CommError> {
        Ok(())
    }

    /// 全收集：返回按 rank 编号排列的所有摘要。阻塞直到所有 rank 都参与。
    fn all_gather(&mut self, local: LbtsMessage) -> Result<Vec<LbtsMessage>, CommError>;

    /// 全局最大值归约。
    fn all_reduce_max(&mut self, value: u64) -> Result<u64, CommError>;

    /// 拆除传输层；之后的发送返回 `CommError::Destroyed`。
    fn destroy(&mut self) {}
}
