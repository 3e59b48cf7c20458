//! 仿真器
//!
//! 单分区事件驱动仿真器：维护当前时间游标、uid 分配、事件队列与析构事件列表。
//! 分布式引擎在此基础上增加时间窗口同步，事件执行路径完全复用。

use super::event::{
    Event, EventId, FnEvent, NO_CONTEXT, UID_DESTROY, UID_INVALID, UID_VALID,
};
use super::scheduled_event::{EventKey, ScheduledEvent};
use super::time::SimTime;
use super::world::World;
use crate::distributed::RemoteMessage;
use crate::sched::{Scheduler, SchedulerKind};
use std::collections::VecDeque;
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
#[derive(Debug)]
pub struct Simulator {
    current_ts: SimTime,
    current_context: u32,
    current_uid: u64,
    next_uid: u64,
    events: Box<dyn Scheduler>,
    destroy_events: VecDeque<ScheduledEvent>,
    /// 已调度但尚未出队的事件数
    unscheduled_events: u64,
    /// 已执行的事件数
    event_count: u64,
    stop: bool,
    system_id: u32,
    system_count: u32,
    /// 待发往其他 rank 的消息，由分布式引擎在事件之间取走
    outbox: Vec<RemoteMessage>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    pub fn new() -> Self {
        Self::with_scheduler(SchedulerKind::default())
    }

    pub fn with_scheduler(kind: SchedulerKind) -> Self {
        Self {
            current_ts: SimTime::ZERO,
            current_context: NO_CONTEXT,
            current_uid: UID_INVALID,
            next_uid: UID_VALID,
            events: kind.create(),
            destroy_events: VecDeque::new(),
            unscheduled_events: 0,
            event_count: 0,
            stop: false,
            system_id: 0,
            system_count: 1,
            outbox: Vec::new(),
        }
    }

    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.current_ts
    }

    /// 当前正在执行的事件的上下文
    pub fn context(&self) -> u32 {
        self.current_context
    }

    /// 本仿真器所在的 rank（单分区时为 0）
    pub fn system_id(&self) -> u32 {
        self.system_id
    }

    pub fn system_count(&self) -> u32 {
        self.system_count
    }

    pub fn maximum_simulation_time(&self) -> SimTime {
        SimTime::MAX
    }

    /// 已执行（未被取消）的事件数
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// 已调度、尚未出队的事件数
    pub fn unscheduled_events(&self) -> u64 {
        self.unscheduled_events
    }

    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// 调度事件在 `delay` 之后执行，继承当前上下文。
    #[tracing::instrument(level = "trace", skip(self, ev), fields(event_type = std::any::type_name::<E>(), delay = ?delay))]
    pub fn schedule<E: Event>(&mut self, delay: SimTime, ev: E) -> EventId {
        let at = self.absolute(delay);
        self.insert(at, self.current_context, Box::new(ev))
    }

    /// 同 `schedule`，事件为闭包。
    pub fn schedule_fn<F>(&mut self, delay: SimTime, f: F) -> EventId
    where
        F: FnOnce(&mut Simulator, &mut dyn World) + Send + 'static,
    {
        self.schedule(delay, FnEvent(f))
    }

    pub fn schedule_now<E: Event>(&mut self, ev: E) -> EventId {
        self.schedule(SimTime::ZERO, ev)
    }

    pub fn schedule_now_fn<F>(&mut self, f: F) -> EventId
    where
        F: FnOnce(&mut Simulator, &mut dyn World) + Send + 'static,
    {
        self.schedule(SimTime::ZERO, FnEvent(f))
    }

    /// 以指定上下文调度事件（例如代表另一个节点）。
    #[tracing::instrument(level = "trace", skip(self, ev), fields(event_type = std::any::type_name::<E>(), delay = ?delay))]
    pub fn schedule_with_context<E: Event>(&mut self, context: u32, delay: SimTime, ev: E) {
        let at = self.absolute(delay);
        self.insert(at, context, Box::new(ev));
    }

    pub fn schedule_with_context_fn<F>(&mut self, context: u32, delay: SimTime, f: F)
    where
        F: FnOnce(&mut Simulator, &mut dyn World) + Send + 'static,
    {
        self.schedule_with_context(context, delay, FnEvent(f))
    }

    /// 注册一个只在 `destroy` 时按注册顺序执行的事件。
    pub fn schedule_destroy<E: Event>(&mut self, ev: E) -> EventId {
        let key = EventKey {
            ts: self.current_ts,
            uid: UID_DESTROY,
            context: NO_CONTEXT,
        };
        let sched = ScheduledEvent::new(key, Box::new(ev));
        let id = sched.id();
        self.destroy_events.push_back(sched);
        self.next_uid += 1;
        id
    }

    pub fn schedule_destroy_fn<F>(&mut self, f: F) -> EventId
    where
        F: FnOnce(&mut Simulator, &mut dyn World) + Send + 'static,
    {
        self.schedule_destroy(FnEvent(f))
    }

    /// 把消息交给分布式引擎，在 `delay` 之后于 `dst` rank 上以 `context` 执行。
    pub fn send_remote<E: Event>(&mut self, dst: u32, delay: SimTime, context: u32, ev: E) {
        assert!(
            dst < self.system_count && dst != self.system_id,
            "no remote channel from rank {} to rank {} (cluster size {})",
            self.system_id,
            dst,
            self.system_count
        );
        let rx_time = self.absolute(delay);
        trace!(dst, rx_time = ?rx_time, context, "跨 rank 消息进入发送队列");
        self.outbox.push(RemoteMessage::new(
            self.system_id,
            dst,
            rx_time,
            context,
            Box::new(ev),
        ));
    }

    pub fn send_remote_fn<F>(&mut self, dst: u32, delay: SimTime, context: u32, f: F)
    where
        F: FnOnce(&mut Simulator, &mut dyn World) + Send + 'static,
    {
        self.send_remote(dst, delay, context, FnEvent(f))
    }

    /// 标记取消；事件留在队列中，出队时跳过。
    pub fn cancel(&mut self, id: &EventId) {
        if self.is_expired(id) {
            return;
        }
        if let Some(token) = id.token() {
            token.cancel();
        }
    }

    /// 从所在容器中物理删除事件；已过期时什么也不做。
    pub fn remove(&mut self, id: &EventId) {
        if id.is_destroy() {
            if let Some(pos) = self
                .destroy_events
                .iter()
                .position(|ev| id.refers_to(&ev.token))
            {
                self.destroy_events.remove(pos);
            }
            return;
        }
        if self.is_expired(id) {
            return;
        }
        let key = EventKey {
            ts: id.ts(),
            uid: id.uid(),
            context: id.context(),
        };
        let ev = self.events.remove(&key);
        debug_assert_eq!(ev.key.context, key.context);
        ev.token.cancel();
        self.unscheduled_events -= 1;
        trace!(uid = key.uid, ts = ?key.ts, "事件已删除");
    }

    pub fn is_expired(&self, id: &EventId) -> bool {
        let Some(token) = id.token() else {
            return true;
        };
        if token.is_cancelled() {
            return true;
        }
        if id.is_destroy() {
            return !self
                .destroy_events
                .iter()
                .any(|ev| id.refers_to(&ev.token));
        }
        id.ts() < self.current_ts || (id.ts() == self.current_ts && id.uid() <= self.current_uid)
    }

    /// 距离事件执行还剩多少时间；已过期返回 0。
    pub fn delay_left(&self, id: &EventId) -> SimTime {
        if self.is_expired(id) {
            SimTime::ZERO
        } else {
            id.ts().saturating_sub(self.current_ts)
        }
    }

    /// 请求在下一个安全点停止运行循环。
    pub fn stop(&mut self) {
        debug!(now = ?self.current_ts, "请求停止");
        self.stop = true;
    }

    /// 在 `delay` 之后停止。
    pub fn stop_after(&mut self, delay: SimTime) -> EventId {
        self.schedule_fn(delay, |sim, _| sim.stop())
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop
    }

    /// 本地是否已无事可做（队列为空或已请求停止）。
    pub fn is_finished(&self) -> bool {
        self.events.is_empty() || self.stop
    }

    /// 下一个事件的时间；本地已结束时为无穷。
    pub fn next_time(&self) -> SimTime {
        if self.is_finished() {
            SimTime::MAX
        } else {
            self.events.peek_next().key.ts
        }
    }

    /// 更换调度器后端，已有事件按原顺序迁移。
    pub fn set_scheduler(&mut self, mut scheduler: Box<dyn Scheduler>) {
        let moved = self.events.len();
        while !self.events.is_empty() {
            scheduler.insert(self.events.remove_next());
        }
        self.events = scheduler;
        debug!(moved, "调度器已更换");
    }

    /// 运行直到事件队列为空或被请求停止。
    #[tracing::instrument(skip(self, world), fields(system_id = self.system_id))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.current_ts, queue_size = self.events.len(), "初始状态");

        self.stop = false;
        while !self.events.is_empty() && !self.stop {
            self.process_one_event(world);
        }

        self.check_no_lost_events();
        info!(
            total_events = self.event_count,
            final_time = ?self.current_ts,
            stopped = self.stop,
            "✅ 仿真完成"
        );
    }

    /// 执行所有析构事件后销毁仿真器。
    #[tracing::instrument(skip(self, world), fields(system_id = self.system_id))]
    pub fn destroy(mut self, world: &mut dyn World) {
        debug!(destroy_events = self.destroy_events.len(), "执行析构事件");
        while let Some(item) = self.destroy_events.pop_front() {
            if item.is_cancelled() {
                continue;
            }
            item.ev.execute(&mut self, world);
        }

        let mut dropped = 0usize;
        while !self.events.is_empty() {
            self.events.remove_next();
            dropped += 1;
        }
        info!(dropped, "仿真器已销毁");
    }

    /// 弹出并执行最早的事件；被取消的事件只出队不执行。
    pub(crate) fn process_one_event(&mut self, world: &mut dyn World) {
        let item = self.events.remove_next();
        assert!(
            item.key.ts >= self.current_ts,
            "event at {} is earlier than current time {}",
            item.key.ts,
            self.current_ts
        );
        self.unscheduled_events -= 1;

        if item.is_cancelled() {
            trace!(uid = item.key.uid, ts = ?item.key.ts, "跳过已取消事件");
            return;
        }

        self.event_count += 1;
        self.current_ts = item.key.ts;
        self.current_context = item.key.context;
        self.current_uid = item.key.uid;

        trace!(
            event_num = self.event_count,
            now = ?self.current_ts,
            uid = item.key.uid,
            context = item.key.context,
            remaining_queue = self.events.len(),
            "执行事件"
        );

        world.pre_event(&item.id());
        let ScheduledEvent { ev, .. } = item;
        ev.execute(self, world);
    }

    /// 队列自然耗尽时，所有调度过的事件都必须已出队。
    pub(crate) fn check_no_lost_events(&self) {
        assert!(
            !self.events.is_empty() || self.unscheduled_events == 0,
            "event queue drained but {} events were never dequeued",
            self.unscheduled_events
        );
    }

    pub(crate) fn set_partition(&mut self, system_id: u32, system_count: u32) {
        self.system_id = system_id;
        self.system_count = system_count;
    }

    pub(crate) fn take_outbox(&mut self) -> Vec<RemoteMessage> {
        std::mem::take(&mut self.outbox)
    }

    /// 把收到的跨 rank 消息按其到达时间排入本地队列。
    pub(crate) fn deliver_remote(&mut self, msg: RemoteMessage) {
        let (rx_time, context, ev) = msg.into_parts();
        assert!(
            rx_time >= self.current_ts,
            "causality violation on rank {}: message for {} arrived at local time {}",
            self.system_id,
            rx_time,
            self.current_ts
        );
        self.insert(rx_time, context, ev);
    }

    pub(crate) fn clear_stop(&mut self) {
        self.stop = false;
    }

    fn absolute(&self, delay: SimTime) -> SimTime {
        self.current_ts.checked_add(delay).unwrap_or_else(|| {
            panic!(
                "event delay {} overflows simulation time at {}",
                delay.0, self.current_ts
            )
        })
    }

    fn insert(&mut self, at: SimTime, context: u32, ev: Box<dyn Event>) -> EventId {
        assert!(
            at >= self.current_ts,
            "cannot schedule event at {} before current time {}",
            at,
            self.current_ts
        );
        let key = EventKey {
            ts: at,
            uid: self.next_uid,
            context,
        };
        self.next_uid += 1;
        self.unscheduled_events += 1;

        let item = ScheduledEvent::new(key, ev);
        let id = item.id();
        self.events.insert(item);
        trace!(now = ?self.current_ts, at = ?at, uid = key.uid, context, queue_size = self.events.len(), "事件已加入队列");
        id
    }
}
