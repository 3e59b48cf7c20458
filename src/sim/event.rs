//! 事件与事件句柄
//!
//! `Event` 是被调度执行的一段延迟计算；`EventId` 是调用者持有的弱句柄，
//! 可以用来查询是否过期或请求取消，但不会延长事件的生命周期。

use super::simulator::Simulator;
use super::time::SimTime;
use super::world::World;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// 不属于任何节点的上下文（从事件之外调度时使用）。
pub const NO_CONTEXT: u32 = u32::MAX;

/// 无效 uid（默认构造的 `EventId`）。
pub const UID_INVALID: u64 = 0;
/// 析构事件共享的 uid，只在析构列表中查找。
pub const UID_DESTROY: u64 = 2;
/// 普通事件的第一个 uid；1 和 3 保留不用。
pub const UID_VALID: u64 = 4;

/// 事件：可被调度执行。使用 `self: Box<Self>` 以支持 move/所有权转移。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}

/// 把闭包包装成事件。
pub(crate) struct FnEvent<F>(pub(crate) F);

impl<F> Event for FnEvent<F>
where
    F: FnOnce(&mut Simulator, &mut dyn World) + Send + 'static,
{
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        (self.0)(sim, world)
    }
}

/// 取消标记。由调度器中的事件独占强引用，`EventId` 只持有弱引用。
#[derive(Debug, Default)]
pub(crate) struct EventToken {
    cancelled: AtomicBool,
}

impl EventToken {
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// 事件句柄：`(ts, context, uid)` 加上指向取消标记的弱引用。
#[derive(Debug, Clone)]
pub struct EventId {
    ts: SimTime,
    context: u32,
    uid: u64,
    token: Weak<EventToken>,
}

impl EventId {
    pub(crate) fn new(ts: SimTime, context: u32, uid: u64, token: &Arc<EventToken>) -> Self {
        Self {
            ts,
            context,
            uid,
            token: Arc::downgrade(token),
        }
    }

    /// 不指向任何事件的句柄，总是过期。
    pub fn invalid() -> Self {
        Self {
            ts: SimTime::ZERO,
            context: NO_CONTEXT,
            uid: UID_INVALID,
            token: Weak::new(),
        }
    }

    pub fn ts(&self) -> SimTime {
        self.ts
    }

    pub fn context(&self) -> u32 {
        self.context
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn is_destroy(&self) -> bool {
        self.uid == UID_DESTROY
    }

    /// 事件是否仍然存活（尚未被执行、删除或丢弃）。
    pub(crate) fn token(&self) -> Option<Arc<EventToken>> {
        self.token.upgrade()
    }

    pub(crate) fn refers_to(&self, token: &Arc<EventToken>) -> bool {
        std::ptr::eq(self.token.as_ptr(), Arc::as_ptr(token))
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::invalid()
    }
}

impl PartialEq for EventId {
    fn eq(&self, other: &Self) -> bool {
        self.ts == other.ts
            && self.context == other.context
            && self.uid == other.uid
            && Weak::ptr_eq(&self.token, &other.token)
    }
}

impl Eq for EventId {}
