//! 事件队列（调度器后端）
//!
//! 所有后端都按 `(ts, uid)` 升序给出事件，并支持按键删除任意事件。
//! 仿真器可以在运行中途通过 `set_scheduler` 更换后端。

use crate::sim::{EventKey, ScheduledEvent};
use serde::{Deserialize, Serialize};
use std::fmt;

mod calendar;
mod heap;
mod list;
mod map;

pub use calendar::CalendarScheduler;
pub use heap::HeapScheduler;
pub use list::ListScheduler;
pub use map::MapScheduler;

/// 优先队列抽象
pub trait Scheduler: fmt::Debug + Send {
    /// 插入事件
    fn insert(&mut self, ev: ScheduledEvent);

    fn is_empty(&self) -> bool;

    fn len(&self) -> usize;

    /// 返回最早的事件但不移除。队列为空时 panic。
    fn peek_next(&self) -> &ScheduledEvent;

    /// 移除并返回最早的事件。队列为空时 panic。
    fn remove_next(&mut self) -> ScheduledEvent;

    /// 按键移除指定事件。事件不存在时 panic。
    fn remove(&mut self, key: &EventKey) -> ScheduledEvent;
}

/// 可选的调度器后端
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    /// 二叉堆
    Heap,
    /// 有序树（BTreeMap）
    #[default]
    Map,
    /// 有序列表
    List,
    /// 日历队列
    Calendar,
}

impl SchedulerKind {
    pub fn create(self) -> Box<dyn Scheduler> {
        match self {
            SchedulerKind::Heap => Box::new(HeapScheduler::new()),
            SchedulerKind::Map => Box::new(MapScheduler::new()),
            SchedulerKind::List => Box::new(ListScheduler::new()),
            SchedulerKind::Calendar => Box::new(CalendarScheduler::new()),
        }
    }

    pub const ALL: [SchedulerKind; 4] = [
        SchedulerKind::Heap,
        SchedulerKind::Map,
        SchedulerKind::List,
        SchedulerKind::Calendar,
    ];
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerKind::Heap => "heap",
            SchedulerKind::Map => "map",
            SchedulerKind::List => "list",
            SchedulerKind::Calendar => "calendar",
        };
        f.write_str(name)
    }
}

fn missing_event(key: &EventKey) -> ! {
    panic!(
        "event ts={} uid={} context={} is not in the scheduler",
        key.ts, key.uid, key.context
    )
}
