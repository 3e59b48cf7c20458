//! LBTS 同步消息
//!
//! 每轮同步时各 rank 交换的定长摘要，以及对全体摘要的归约。

use crate::sim::SimTime;

/// 单个 rank 的同步摘要
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LbtsMessage {
    smallest_time: SimTime,
    tx_count: u64,
    rx_count: u64,
    my_id: u32,
    is_finished: bool,
}

impl LbtsMessage {
    pub fn new(rx_count: u64, tx_count: u64, my_id: u32, is_finished: bool, smallest_time: SimTime) -> Self {
        Self {
            smallest_time,
            tx_count,
            rx_count,
            my_id,
            is_finished,
        }
    }

    /// 本 rank 最早的待处理事件时间（无事件时为 `SimTime::MAX`）
    pub fn smallest_time(&self) -> SimTime {
        self.smallest_time
    }

    pub fn tx_count(&self) -> u64 {
        self.tx_count
    }

    pub fn rx_count(&self) -> u64 {
        self.rx_count
    }

    pub fn my_id(&self) -> u32 {
        self.my_id
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }
}

/// 一轮同步的全局归约结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LbtsSummary {
    pub smallest_time: SimTime,
    pub total_tx: u64,
    pub total_rx: u64,
    pub all_finished: bool,
}

impl LbtsSummary {
    pub fn reduce(msgs: &[LbtsMessage]) -> Self {
        msgs.iter().fold(
            LbtsSummary {
                smallest_time: SimTime::MAX,
                total_tx: 0,
                total_rx: 0,
                all_finished: true,
            },
            |acc, m| LbtsSummary {
                smallest_time: acc.smallest_time.min(m.smallest_time),
                total_tx: acc.total_tx + m.tx_count,
                total_rx: acc.total_rx + m.rx_count,
                all_finished: acc.all_finished && m.is_finished,
            },
        )
    }

    /// 仍有已发送但未被接收的消息
    pub fn has_in_flight(&self) -> bool {
        self.total_tx != self.total_rx
    }

    /// 全局终止：所有 rank 完成且没有在途消息
    pub fn is_global_finished(&self) -> bool {
        self.all_finished && !self.has_in_flight()
    }

    /// 新的授权时间；lookahead 为无穷时授权时间也为无穷。
    pub fn granted_time(&self, lookahead: SimTime) -> SimTime {
        if lookahead.is_max() {
            SimTime::MAX
        } else {
            self.smallest_time.saturating_add(lookahead)
        }
    }
}
