//! 有序树调度器：所有操作均为对数复杂度。

use super::{Scheduler, missing_event};
use crate::sim::{EventKey, ScheduledEvent};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct MapScheduler {
    list: BTreeMap<EventKey, ScheduledEvent>,
}

impl MapScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for MapScheduler {
    fn insert(&mut self, ev: ScheduledEvent) {
        let prev = self.list.insert(ev.key, ev);
        assert!(prev.is_none(), "duplicate event key in scheduler");
    }

    fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    fn peek_next(&self) -> &ScheduledEvent {
        self.list
            .first_key_value()
            .map(|(_, ev)| ev)
            .expect("peek_next on empty scheduler")
    }

    fn remove_next(&mut self) -> ScheduledEvent {
        self.list
            .pop_first()
            .map(|(_, ev)| ev)
            .expect("remove_next on empty scheduler")
    }

    fn remove(&mut self, key: &EventKey) -> ScheduledEvent {
        self.list
            .remove(key)
            .unwrap_or_else(|| missing_event(key))
    }
}
