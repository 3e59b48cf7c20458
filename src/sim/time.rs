//! 仿真时间类型
//!
//! 定义仿真时间及其单位转换。所有运算都饱和到 `SimTime::MAX`，不会回绕。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 仿真时间（纳秒）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    /// 可表示的最大时间，同时用作“无穷远”。
    pub const MAX: SimTime = SimTime(u64::MAX);

    pub fn from_nanos(ns: u64) -> SimTime {
        SimTime(ns)
    }
    pub fn from_micros(us: u64) -> SimTime {
        SimTime(us.saturating_mul(1_000))
    }
    /// 不饱和的微秒转换；超出纳秒范围时返回 `None`。
    pub fn checked_from_micros(us: u64) -> Option<SimTime> {
        us.checked_mul(1_000).map(SimTime)
    }
    pub fn from_millis(ms: u64) -> SimTime {
        SimTime(ms.saturating_mul(1_000_000))
    }
    pub fn from_secs(s: u64) -> SimTime {
        SimTime(s.saturating_mul(1_000_000_000))
    }

    pub fn as_nanos(self) -> u64 {
        self.0
    }

    pub fn is_max(self) -> bool {
        self == SimTime::MAX
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// 饱和加法：任一操作数为 `MAX` 时结果为 `MAX`。
    pub fn saturating_add(self, other: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(other.0))
    }

    pub fn checked_add(self, other: SimTime) -> Option<SimTime> {
        self.0.checked_add(other.0).map(SimTime)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_max() {
            write!(f, "+inf")
        } else {
            write!(f, "{}ns", self.0)
        }
    }
}
