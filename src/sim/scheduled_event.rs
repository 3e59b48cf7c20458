//! 调度事件
//!
//! 定义调度事件结构及其排序键。

use super::event::{Event, EventId, EventToken};
use super::time::SimTime;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// 排序键：先比较时间，再比较 uid；context 不参与排序。
#[derive(Debug, Clone, Copy)]
pub struct EventKey {
    pub ts: SimTime,
    pub uid: u64,
    pub context: u32,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.ts.cmp(&other.ts) {
            Ordering::Equal => self.uid.cmp(&other.uid),
            ord => ord,
        }
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        self.ts == other.ts && self.uid == other.uid
    }
}

impl Eq for EventKey {}

/// 调度事件，包含排序键、取消标记和事件对象。
///
/// 调度器独占持有；一旦被丢弃，对应的 `EventId` 就会过期。
pub struct ScheduledEvent {
    pub(crate) key: EventKey,
    pub(crate) token: Arc<EventToken>,
    pub(crate) ev: Box<dyn Event>,
}

impl ScheduledEvent {
    pub(crate) fn new(key: EventKey, ev: Box<dyn Event>) -> Self {
        Self {
            key,
            token: Arc::new(EventToken::default()),
            ev,
        }
    }

    pub fn key(&self) -> &EventKey {
        &self.key
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// 测试用：不做任何事的事件。
    #[cfg(test)]
    pub(crate) fn noop(ts: u64, uid: u64) -> Self {
        struct Noop;
        impl Event for Noop {
            fn execute(
                self: Box<Self>,
                _sim: &mut super::simulator::Simulator,
                _world: &mut dyn super::world::World,
            ) {
            }
        }
        let key = EventKey {
            ts: SimTime(ts),
            uid,
            context: 0,
        };
        Self::new(key, Box::new(Noop))
    }

    pub(crate) fn id(&self) -> EventId {
        EventId::new(self.key.ts, self.key.context, self.key.uid, &self.token)
    }
}

impl fmt::Debug for ScheduledEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledEvent")
            .field("key", &self.key)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
