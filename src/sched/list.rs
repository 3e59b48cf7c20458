//! 有序列表调度器
//!
//! 事件按 `(ts, uid)` 升序存放；取最早事件为常数时间，插入需要移动元素。
//! 新事件通常比已有事件晚，因此插入位置多数落在尾部附近。

use super::{Scheduler, missing_event};
use crate::sim::{EventKey, ScheduledEvent};
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct ListScheduler {
    events: VecDeque<ScheduledEvent>,
}

impl ListScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for ListScheduler {
    fn insert(&mut self, ev: ScheduledEvent) {
        let at = self.events.partition_point(|cur| cur.key < ev.key);
        self.events.insert(at, ev);
    }

    fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn len(&self) -> usize {
        self.events.len()
    }

    fn peek_next(&self) -> &ScheduledEvent {
        self.events.front().expect("peek_next on empty scheduler")
    }

    fn remove_next(&mut self) -> ScheduledEvent {
        self.events
            .pop_front()
            .expect("remove_next on empty scheduler")
    }

    fn remove(&mut self, key: &EventKey) -> ScheduledEvent {
        match self.events.binary_search_by(|cur| cur.key.cmp(key)) {
            Ok(at) => self
                .events
                .remove(at)
                .unwrap_or_else(|| missing_event(key)),
            Err(_) => missing_event(key),
        }
    }
}
