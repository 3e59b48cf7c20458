use crate::distributed::{
    CommError, Communicator, DistributedSimulator, LbtsMessage, LbtsSummary, LocalComm,
    RemoteMessage, run_cluster,
};
use crate::net::{NodeId, PartitionMap};
use crate::sim::{Event, SimError, SimTime, Simulator, World};
use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// 两个节点分属 rank 0 和 rank 1，之间一条链路。
fn two_rank_partition(delay: SimTime) -> PartitionMap {
    let mut map = PartitionMap::new();
    let a = map.add_node(0, "a");
    let b = map.add_node(1, "b");
    map.connect(a, b, delay);
    map
}

#[derive(Default)]
struct RecWorld {
    seen: Vec<SimTime>,
}

impl World for RecWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn record(sim: &mut Simulator, world: &mut dyn World) {
    let w = world
        .as_any_mut()
        .downcast_mut::<RecWorld>()
        .expect("world must be RecWorld");
    w.seen.push(sim.now());
}

#[test]
fn two_ranks_without_traffic_run_their_local_events() {
    let results = run_cluster(2, |comm| {
        let rank = comm.system_id();
        let mut dsim = DistributedSimulator::new(Box::new(comm), two_rank_partition(SimTime(10)));
        let at = if rank == 0 { SimTime(100) } else { SimTime(50) };
        dsim.sim_mut().schedule_fn(at, record);

        let mut world = RecWorld::default();
        dsim.run(&mut world).expect("run");
        (
            rank,
            world.seen,
            dsim.lookahead(),
            dsim.sync_rounds(),
            dsim.tx_count(),
            dsim.rx_count(),
        )
    })
    .expect("cluster");

    for (rank, seen, lookahead, rounds, tx, rx) in results {
        assert_eq!(lookahead, SimTime(10), "rank {rank}");
        let expected = if rank == 0 { SimTime(100) } else { SimTime(50) };
        assert_eq!(seen, vec![expected], "rank {rank}");
        // 窗口直接跳到全局最早事件 + lookahead：[0,10] -> [.., 60] -> [.., 110] -> 结束
        assert_eq!(rounds, 3, "rank {rank}");
        assert_eq!((tx, rx), (0, 0));
    }
}

struct Bounce {
    remaining: u32,
    delay: SimTime,
    log: Arc<Mutex<Vec<(u32, SimTime)>>>,
}

impl Event for Bounce {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Bounce {
            remaining,
            delay,
            log,
        } = *self;
        record(sim, world);
        log.lock().expect("log lock").push((sim.system_id(), sim.now()));
        if remaining > 0 {
            let peer = 1 - sim.system_id();
            sim.send_remote(
                peer,
                delay,
                0,
                Bounce {
                    remaining: remaining - 1,
                    delay,
                    log,
                },
            );
        }
    }
}

#[test]
fn messages_bounce_between_ranks_in_causal_order() {
    let log: Arc<Mutex<Vec<(u32, SimTime)>>> = Arc::default();
    let delay = SimTime(10);

    let results = run_cluster(2, |comm| {
        let rank = comm.system_id();
        let mut dsim = DistributedSimulator::new(Box::new(comm), two_rank_partition(delay));
        if rank == 0 {
            dsim.sim_mut().schedule(
                SimTime::ZERO,
                Bounce {
                    remaining: 6,
                    delay,
                    log: Arc::clone(&log),
                },
            );
        } else {
            // 与消息交错的本地事件
            for t in [5, 15, 25, 35, 45] {
                dsim.sim_mut().schedule_fn(SimTime(t), record);
            }
        }
        let mut world = RecWorld::default();
        dsim.run(&mut world).expect("run");
        (world.seen, dsim.tx_count(), dsim.rx_count())
    })
    .expect("cluster");

    let log = log.lock().expect("log lock").clone();
    let expected: Vec<(u32, SimTime)> = (0..7u64).map(|i| ((i % 2) as u32, SimTime(i * 10))).collect();
    assert_eq!(log, expected);

    let (tx, rx): (u64, u64) = results.iter().fold((0, 0), |acc, r| (acc.0 + r.1, acc.1 + r.2));
    assert_eq!(tx, 6);
    assert_eq!(rx, 6);
    for (seen, _, _) in &results {
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "local time went backwards: {seen:?}");
    }
    let rank1 = &results[1].0;
    assert_eq!(
        rank1,
        &[5, 10, 15, 25, 30, 35, 45, 50].map(SimTime).to_vec()
    );
}

/// 把收到的消息扣住若干次轮询后才交出，模拟网络中的在途消息。
struct SlowComm {
    inner: LocalComm,
    held: VecDeque<RemoteMessage>,
    hold_polls: u32,
    empty_polls: u32,
}

impl Communicator for SlowComm {
    fn system_id(&self) -> u32 {
        self.inner.system_id()
    }

    fn size(&self) -> u32 {
        self.inner.size()
    }

    fn send(&mut self, msg: RemoteMessage) -> Result<(), CommError> {
        self.inner.send(msg)
    }

    fn try_recv(&mut self) -> Result<Option<RemoteMessage>, CommError> {
        while let Some(msg) = self.inner.try_recv()? {
            self.held.push_back(msg);
        }
        if self.held.is_empty() {
            return Ok(None);
        }
        if self.empty_polls < self.hold_polls {
            self.empty_polls += 1;
            return Ok(None);
        }
        Ok(self.held.pop_front())
    }

    fn all_gather(&mut self, local: LbtsMessage) -> Result<Vec<LbtsMessage>, CommError> {
        self.inner.all_gather(local)
    }

    fn all_reduce_max(&mut self, value: u64) -> Result<u64, CommError> {
        self.inner.all_reduce_max(value)
    }

    fn destroy(&mut self) {
        self.inner.destroy();
    }
}

#[test]
fn window_does_not_advance_while_messages_are_in_flight() {
    let results = run_cluster(2, |comm| {
        let rank = comm.system_id();
        let slow = SlowComm {
            inner: comm,
            held: VecDeque::new(),
            hold_polls: 3,
            empty_polls: 0,
        };
        let mut dsim = DistributedSimulator::new(Box::new(slow), two_rank_partition(SimTime(10)));
        if rank == 0 {
            dsim.sim_mut().schedule_fn(SimTime::ZERO, |sim, _| {
                sim.send_remote_fn(1, SimTime(10), 0, record);
            });
        } else {
            dsim.sim_mut().schedule_fn(SimTime(12), record);
            dsim.sim_mut().schedule_fn(SimTime(30), record);
        }
        let mut world = RecWorld::default();
        dsim.run(&mut world).expect("run");
        (world.seen, dsim.sync_rounds())
    })
    .expect("cluster");

    assert_eq!(results[1].0, vec![SimTime(10), SimTime(12), SimTime(30)]);
    // 消息被扣住的那几轮都不能推进窗口
    assert!(results[1].1 > 3, "rounds={}", results[1].1);
    assert_eq!(results[0].1, results[1].1);
}

#[test]
fn single_rank_cluster_matches_sequential_order() {
    let results = run_cluster(1, |comm| {
        let mut map = PartitionMap::new();
        map.add_node(0, "solo");
        let mut dsim = DistributedSimulator::new(Box::new(comm), map);
        for d in [5u64, 3, 3, 1] {
            dsim.sim_mut().schedule_fn(SimTime(d), record);
        }
        let mut world = RecWorld::default();
        dsim.run(&mut world).expect("run");
        (world.seen, dsim.lookahead())
    })
    .expect("cluster");

    let (seen, lookahead) = &results[0];
    assert_eq!(*lookahead, SimTime::ZERO);
    assert_eq!(seen, &[1, 3, 3, 5].map(SimTime).to_vec());
}

#[test]
fn ranks_without_links_run_with_infinite_lookahead() {
    let results = run_cluster(2, |comm| {
        let rank = comm.system_id();
        let mut map = PartitionMap::new();
        map.add_node(0, "a");
        map.add_node(1, "b");
        let mut dsim = DistributedSimulator::new(Box::new(comm), map);
        for t in 1..=5u64 {
            dsim.sim_mut().schedule_fn(SimTime(t * 100 + rank as u64), record);
        }
        let mut world = RecWorld::default();
        dsim.run(&mut world).expect("run");
        (world.seen.len(), dsim.lookahead(), dsim.granted_time())
    })
    .expect("cluster");

    for (count, lookahead, granted) in results {
        assert_eq!(count, 5);
        assert_eq!(lookahead, SimTime::MAX);
        assert_eq!(granted, SimTime::MAX);
    }
}

#[test]
fn stop_on_one_rank_still_terminates_the_cluster() {
    let results = run_cluster(2, |comm| {
        let rank = comm.system_id();
        let mut dsim = DistributedSimulator::new(Box::new(comm), two_rank_partition(SimTime(10)));
        for t in [10u64, 20, 40, 80] {
            dsim.sim_mut().schedule_fn(SimTime(t), record);
        }
        if rank == 1 {
            dsim.sim_mut().stop_after(SimTime(30));
        }
        let mut world = RecWorld::default();
        dsim.run(&mut world).expect("run");
        (world.seen.len(), dsim.is_finished())
    })
    .expect("cluster");

    assert_eq!(results[0], (4, true));
    assert_eq!(results[1], (2, true));
}

#[test]
fn bound_lookahead_only_before_run() {
    let results = run_cluster(2, |comm| {
        let mut dsim = DistributedSimulator::new(Box::new(comm), two_rank_partition(SimTime(10)));
        dsim.bound_lookahead(SimTime::ZERO).expect("zero bound is ignored");
        dsim.bound_lookahead(SimTime(6)).expect("bound");
        dsim.bound_lookahead(SimTime(8)).expect("looser bound");
        dsim.run(&mut ()).expect("run");
        let frozen = dsim.bound_lookahead(SimTime(1));
        (dsim.lookahead(), matches!(frozen, Err(SimError::LookaheadFrozen)))
    })
    .expect("cluster");

    for (lookahead, frozen) in results {
        assert_eq!(lookahead, SimTime(6));
        assert!(frozen);
    }
}

#[test]
fn destroy_runs_destroy_events_on_every_rank() {
    let counter = Arc::new(Mutex::new(0u32));
    run_cluster(3, |comm| {
        let mut map = PartitionMap::new();
        let nodes: Vec<NodeId> = (0..3).map(|r| map.add_node(r, format!("n{r}"))).collect();
        map.connect(nodes[0], nodes[1], SimTime(5));
        map.connect(nodes[1], nodes[2], SimTime(5));
        let mut dsim = DistributedSimulator::new(Box::new(comm), map);
        let c = Arc::clone(&counter);
        dsim.sim_mut().schedule_destroy_fn(move |_, _| {
            *c.lock().expect("lock") += 1;
        });
        dsim.run(&mut ()).expect("run");
        dsim.destroy(&mut ());
    })
    .expect("cluster");

    assert_eq!(*counter.lock().expect("lock"), 3);
}

#[test]
fn panicking_rank_is_reported() {
    let err = run_cluster(2, |comm| {
        let rank = comm.system_id();
        let mut dsim = DistributedSimulator::new(Box::new(comm), two_rank_partition(SimTime(10)));
        if rank == 1 {
            dsim.sim_mut().schedule_fn(SimTime(1), |_, _| panic!("model failure"));
        }
        dsim.run(&mut ())
    })
    .expect_err("rank 1 panics");

    assert!(matches!(err, SimError::RankPanicked(1)), "{err}");
}

#[test]
fn lbts_reduction_waits_for_in_flight_messages() {
    let msgs = [
        LbtsMessage::new(0, 2, 0, true, SimTime::MAX),
        LbtsMessage::new(1, 0, 1, true, SimTime(40)),
    ];
    let s = LbtsSummary::reduce(&msgs);
    assert_eq!(s.smallest_time, SimTime(40));
    assert_eq!((s.total_tx, s.total_rx), (2, 1));
    assert!(s.has_in_flight());
    assert!(!s.is_global_finished());
    assert_eq!(s.granted_time(SimTime(10)), SimTime(50));
    assert_eq!(s.granted_time(SimTime::MAX), SimTime::MAX);

    let done = LbtsSummary::reduce(&[
        LbtsMessage::new(2, 2, 0, true, SimTime::MAX),
        LbtsMessage::new(2, 2, 1, true, SimTime::MAX),
    ]);
    assert!(done.is_global_finished());
    assert_eq!(done.granted_time(SimTime(10)), SimTime::MAX);
}
