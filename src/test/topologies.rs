use crate::net::NodeId;
use crate::sched::SchedulerKind;
use crate::scenario::run_scenario;
use crate::sim::SimTime;
use crate::topo::dumbbell::{DumbbellOpts, build_dumbbell};
use crate::topo::ring::{RingOpts, build_ring};

#[test]
fn ring_layout_assigns_contiguous_nodes_per_rank() {
    let opts = RingOpts {
        ranks: 3,
        nodes_per_rank: 2,
        ..RingOpts::default()
    };
    let spec = build_ring(&opts);
    spec.validate().expect("ring scenario is valid");

    let map = spec.build_partition();
    assert_eq!(map.node_count(), 6);
    assert_eq!(map.links().len(), 6);
    assert_eq!(map.nodes_on(1).collect::<Vec<_>>(), vec![NodeId(2), NodeId(3)]);
    assert_eq!(map.remote_links_of(0).count(), 2);
    assert_eq!(spec.flows.len(), 3);
    assert_eq!((spec.flows[2].src, spec.flows[2].dst), (4, 0));
}

#[test]
fn two_node_ring_has_a_single_link() {
    let spec = build_ring(&RingOpts {
        ranks: 2,
        nodes_per_rank: 1,
        ..RingOpts::default()
    });
    assert_eq!(spec.links.len(), 1);
    spec.validate().expect("valid");
}

#[test]
fn ring_delivers_and_echoes_across_four_ranks() {
    let opts = RingOpts {
        ranks: 4,
        nodes_per_rank: 3,
        delay_us: 7,
        pings: 20,
        gap_us: 3,
        echo: true,
    };
    let report = run_scenario(&build_ring(&opts)).expect("run ring");

    assert_eq!(report.ranks.len(), 4);
    for r in &report.ranks {
        assert_eq!(r.lookahead, SimTime::from_micros(7));
    }
    for f in &report.flows {
        assert_eq!(f.hops, 3, "flow {}", f.id);
        assert_eq!(f.stats.sent, 20);
        assert_eq!(f.stats.delivered, 20);
        assert_eq!(f.stats.echoed, 20);
    }
    let tx: u64 = report.ranks.iter().map(|r| r.tx).sum();
    let rx: u64 = report.ranks.iter().map(|r| r.rx).sum();
    assert_eq!(tx, rx);
}

#[test]
fn dumbbell_splits_sides_across_two_ranks() {
    let opts = DumbbellOpts {
        hosts_per_side: 3,
        pings: 15,
        ..DumbbellOpts::default()
    };
    let spec = build_dumbbell(&opts);
    let map = spec.build_partition();
    assert_eq!(map.node_count(), 8);
    assert_eq!(map.remote_links_of(0).count(), 1);

    let report = run_scenario(&spec).expect("run dumbbell");
    for r in &report.ranks {
        assert_eq!(r.lookahead, SimTime::from_micros(opts.bottleneck_delay_us));
    }
    for f in &report.flows {
        assert_eq!(f.hops, 3);
        assert_eq!((f.stats.delivered, f.stats.echoed), (15, 15));
    }
}

#[test]
fn every_scheduler_backend_gives_the_same_run() {
    let base = build_dumbbell(&DumbbellOpts {
        pings: 30,
        ..DumbbellOpts::default()
    });
    let mut totals = Vec::new();
    for kind in SchedulerKind::ALL {
        let mut spec = base.clone();
        spec.scheduler = Some(kind);
        let report = run_scenario(&spec).expect("run dumbbell");
        assert_eq!(report.scheduler, kind);
        let final_time = report.ranks.iter().map(|r| r.final_time).max();
        totals.push((report.total_events(), final_time));
    }
    assert!(totals.windows(2).all(|w| w[0] == w[1]), "{totals:?}");
}
