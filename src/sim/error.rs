//! 运行期错误
//!
//! 契约违背（调度到过去、队列为空时弹出等）直接 panic；
//! 这里只收录可以恢复或需要上报的运行期条件。

use crate::distributed::CommError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// 分布式传输层失败（对端线程退出、通道断开等）。
    #[error("communication failure: {0}")]
    Comm(#[from] CommError),

    /// 在 `run` 之后才收紧 lookahead。
    #[error("lookahead can only be bounded before the run starts")]
    LookaheadFrozen,

    /// rank 线程异常退出。
    #[error("rank {0} panicked")]
    RankPanicked(u32),
}
