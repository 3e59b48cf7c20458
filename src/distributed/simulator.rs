//! 分布式仿真器（授权时间窗口算法）
//!
//! 每个 rank 只执行时间不超过 `granted_time` 的事件。需要越过窗口、
//! 本地已无事件或被请求停止时，先收取所有到达的跨 rank 消息，再与其他 rank
//! 交换摘要：全局最早事件时间加上 lookahead 即为新的窗口上界。
//! 只有在没有在途消息（发送总数等于接收总数）时才推进窗口。

use super::comm::Communicator;
use super::lbts::{LbtsMessage, LbtsSummary};
use super::lookahead::calculate_lookahead;
use crate::net::PartitionMap;
use crate::sim::{SimError, SimTime, Simulator, World};
use tracing::{debug, info, trace, warn};

pub struct DistributedSimulator {
    sim: Simulator,
    comm: Box<dyn Communicator>,
    partition: PartitionMap,
    lookahead_bound: Option<SimTime>,
    lookahead: SimTime,
    granted_time: SimTime,
    lbts: Vec<LbtsMessage>,
    global_finished: bool,
    tx_count: u64,
    rx_count: u64,
    sync_rounds: u64,
    started: bool,
}

impl DistributedSimulator {
    pub fn new(comm: Box<dyn Communicator>, partition: PartitionMap) -> Self {
        Self::with_simulator(Simulator::new(), comm, partition)
    }

    /// 使用已配置好的单分区仿真器（例如指定了调度器后端）。
    pub fn with_simulator(
        mut sim: Simulator,
        comm: Box<dyn Communicator>,
        partition: PartitionMap,
    ) -> Self {
        let system_id = comm.system_id();
        let size = comm.size();
        sim.set_partition(system_id, size);
        Self {
            sim,
            comm,
            partition,
            lookahead_bound: None,
            lookahead: SimTime::MAX,
            granted_time: SimTime::ZERO,
            lbts: Vec::with_capacity(size as usize),
            global_finished: false,
            tx_count: 0,
            rx_count: 0,
            sync_rounds: 0,
            started: false,
        }
    }

    pub fn sim(&self) -> &Simulator {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut Simulator {
        &mut self.sim
    }

    pub fn partition(&self) -> &PartitionMap {
        &self.partition
    }

    pub fn system_id(&self) -> u32 {
        self.sim.system_id()
    }

    pub fn lookahead(&self) -> SimTime {
        self.lookahead
    }

    pub fn granted_time(&self) -> SimTime {
        self.granted_time
    }

    /// 已完成的同步轮数
    pub fn sync_rounds(&self) -> u64 {
        self.sync_rounds
    }

    pub fn tx_count(&self) -> u64 {
        self.tx_count
    }

    pub fn rx_count(&self) -> u64 {
        self.rx_count
    }

    pub fn is_finished(&self) -> bool {
        self.global_finished
    }

    /// 为 lookahead 设置上界（只能收紧）。必须在 `run` 之前调用。
    pub fn bound_lookahead(&mut self, bound: SimTime) -> Result<(), SimError> {
        if self.started {
            return Err(SimError::LookaheadFrozen);
        }
        if bound.is_zero() {
            warn!("attempted to bound lookahead to a non-positive time");
            return Ok(());
        }
        self.lookahead_bound = Some(self.lookahead_bound.map_or(bound, |b| b.min(bound)));
        debug!(bound = ?self.lookahead_bound, "lookahead 上界已设置");
        Ok(())
    }

    /// 运行直到所有 rank 都完成且没有在途消息。
    #[tracing::instrument(skip(self, world), fields(system_id = self.sim.system_id()))]
    pub fn run(&mut self, world: &mut dyn World) -> Result<(), SimError> {
        if !self.started {
            self.lookahead =
                calculate_lookahead(self.comm.as_mut(), &self.partition, self.lookahead_bound)?;
            self.granted_time = self.lookahead;
            self.started = true;
        }
        info!(lookahead = %self.lookahead, granted_time = %self.granted_time, "▶️  开始分布式仿真");

        self.sim.clear_stop();
        self.global_finished = false;
        self.flush_outbox()?;

        while !self.global_finished {
            let mut next = self.sim.next_time();

            // 下一个事件越过了窗口，或者本地已结束：需要同步。
            // 本地结束的 rank 继续参与同步，直到全体结束。
            if next > self.granted_time || self.sim.is_finished() {
                self.receive_messages()?;
                next = self.sim.next_time();
                self.comm.test_send_complete()?;
                self.synchronize(next)?;
            }

            if next <= self.granted_time && !self.sim.is_finished() {
                self.sim.process_one_event(world);
                self.flush_outbox()?;
            }
        }

        self.sim.check_no_lost_events();
        info!(
            total_events = self.sim.event_count(),
            final_time = ?self.sim.now(),
            sync_rounds = self.sync_rounds,
            tx = self.tx_count,
            rx = self.rx_count,
            "✅ 分布式仿真完成"
        );
        Ok(())
    }

    /// 执行析构事件并拆除传输层。
    pub fn destroy(self, world: &mut dyn World) {
        let DistributedSimulator { sim, mut comm, .. } = self;
        sim.destroy(world);
        comm.destroy();
    }

    fn synchronize(&mut self, next: SimTime) -> Result<(), SimError> {
        let local = LbtsMessage::new(
            self.rx_count,
            self.tx_count,
            self.sim.system_id(),
            self.sim.is_finished(),
            next,
        );
        self.lbts = self.comm.all_gather(local)?;
        self.sync_rounds += 1;

        let summary = LbtsSummary::reduce(&self.lbts);
        self.global_finished = summary.is_global_finished();

        // 有在途消息时不推进窗口，下一轮收完消息再试。
        if !summary.has_in_flight() {
            self.granted_time = summary.granted_time(self.lookahead);
        }

        debug!(
            round = self.sync_rounds,
            smallest_time = %summary.smallest_time,
            total_tx = summary.total_tx,
            total_rx = summary.total_rx,
            in_flight = summary.has_in_flight(),
            granted_time = %self.granted_time,
            global_finished = self.global_finished,
            "同步轮完成"
        );
        Ok(())
    }

    fn receive_messages(&mut self) -> Result<(), SimError> {
        while let Some(msg) = self.comm.try_recv()? {
            self.rx_count += 1;
            trace!(src = msg.src(), rx_time = ?msg.rx_time(), context = msg.context(), "收到跨 rank 消息");
            self.sim.deliver_remote(msg);
        }
        Ok(())
    }

    fn flush_outbox(&mut self) -> Result<(), SimError> {
        for msg in self.sim.take_outbox() {
            self.comm.send(msg)?;
            self.tx_count += 1;
        }
        Ok(())
    }
}
