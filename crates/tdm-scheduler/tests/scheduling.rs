//! # Integration tests: scheduler ↔ connection through the public API
//!
//! The tests act as the transmission layer: they ask for a decision, then
//! dequeue the unit and advance path state the way a sender would.

use bytes::Bytes;
use tdm_scheduler::model::{AckMode, PathView};
use tdm_scheduler::scheduler::eligibility::Checks;
use tdm_scheduler::{
    build_scheduler, Connection, Decision, Path, PathIndex, PathScheduler, PathState,
    SchedulerConfig, Segment, SharedConfig, Source,
};

const MSS: u32 = 1460;

// ─── Helpers ────────────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn idx(raw: u8) -> PathIndex {
    PathIndex::new(raw).unwrap()
}

fn scheduler(round_size: u32) -> Box<dyn PathScheduler> {
    init_tracing();
    let config = SchedulerConfig::with_round_size(round_size).unwrap();
    build_scheduler(&SharedConfig::new(config).unwrap())
}

fn connection(paths: u8) -> Connection {
    let mut conn = Connection::new();
    for raw in 1..=paths {
        let mut path = Path::new(idx(raw), MSS);
        path.cwnd = 10_000;
        path.wnd_end = u32::MAX / 2;
        conn.add_path(path).unwrap();
    }
    conn
}

fn queue(conn: &mut Connection, count: u32, len: u32) {
    for i in 0..count {
        conn.push_primary(Segment::new(
            i * len,
            Bytes::from(vec![0u8; len as usize]),
        ));
    }
}

/// Accepts a decision: dequeues the unit and advances the path's cursors.
fn send(sched: &mut dyn PathScheduler, conn: &mut Connection) -> Option<Decision> {
    let decision = sched.next_segment(conn)?;
    match decision.source {
        Source::Reinjected => conn.pop_reinject(),
        Source::Primary | Source::Fallback => conn.pop_primary(),
    };
    let path = conn.path_mut(decision.path).unwrap();
    path.in_flight += 1;
    path.write_seq = path.write_seq.wrapping_add(decision.segment.len());
    path.snd_nxt = path.write_seq;
    Some(decision)
}

fn quota(conn: &Connection, raw: u8) -> u32 {
    conn.path(idx(raw)).unwrap().quota()
}

// ─── Burst locality & rotation ─────────────────────────────────────────────

#[test]
fn single_path_bursts_then_resets() {
    let mut sched = scheduler(3);
    let mut conn = connection(1);
    queue(&mut conn, 4, MSS);

    let mut quotas = Vec::new();
    for _ in 0..4 {
        let d = send(sched.as_mut(), &mut conn).unwrap();
        assert_eq!(d.path, idx(1));
        quotas.push(quota(&conn, 1));
    }
    assert_eq!(quotas, vec![1, 2, 3, 1]);
    assert_eq!(sched.stats().round_resets, 1);
}

#[test]
fn exhausted_round_rotates_and_resets_both_paths() {
    let mut sched = scheduler(2);
    let mut conn = connection(2);
    queue(&mut conn, 5, MSS);

    let first = send(sched.as_mut(), &mut conn).unwrap().path;
    assert_eq!(send(sched.as_mut(), &mut conn).unwrap().path, first);
    let second = send(sched.as_mut(), &mut conn).unwrap().path;
    assert_ne!(second, first);
    assert_eq!(send(sched.as_mut(), &mut conn).unwrap().path, second);

    let config = SchedulerConfig::with_round_size(2).unwrap();
    let snap = conn.snapshot(config.round_size, Checks::selection(&config));
    assert!(snap.iter().all(|p| p.view == PathView::Full(2)));

    let fifth = send(sched.as_mut(), &mut conn).unwrap();
    assert_eq!(quota(&conn, fifth.path.get()), 1);
    assert_eq!(quota(&conn, 1) + quota(&conn, 2), 1);
}

#[test]
fn bursts_spread_over_three_paths() {
    let mut sched = scheduler(4);
    let mut conn = connection(3);
    queue(&mut conn, 12, 500);

    let picks: Vec<u8> = (0..12)
        .map(|_| send(sched.as_mut(), &mut conn).unwrap().path.get())
        .collect();
    for burst in picks.chunks(4) {
        assert!(burst.iter().all(|p| *p == burst[0]), "burst split: {picks:?}");
    }
    let mut owners: Vec<u8> = picks.chunks(4).map(|b| b[0]).collect();
    owners.sort();
    assert_eq!(owners, vec![1, 2, 3]);
}

// ─── Byte limit ─────────────────────────────────────────────────────────────

#[test]
fn byte_limit_tracks_remaining_allowance() {
    let mut sched = scheduler(10_000);
    let mut conn = connection(1);
    conn.push_primary(Segment::new(0, Bytes::from(vec![0u8; (9990 * MSS) as usize])));
    conn.push_primary(Segment::new(9990 * MSS, Bytes::from(vec![0u8; 100])));

    let big = send(sched.as_mut(), &mut conn).unwrap();
    assert_eq!(big.byte_limit, 14_600_000);
    assert_eq!(quota(&conn, 1), 9990);

    let next = send(sched.as_mut(), &mut conn).unwrap();
    assert_eq!(next.byte_limit, 14_600);
}

// ─── Eligibility interplay ──────────────────────────────────────────────────

#[test]
fn no_eligible_path_returns_none_until_state_changes() {
    let mut sched = scheduler(10);
    let mut conn = connection(2);
    for raw in 1..=2 {
        conn.path_mut(idx(raw)).unwrap().state = PathState::PreEstablished;
    }
    queue(&mut conn, 1, 100);

    assert!(sched.next_segment(&mut conn).is_none());
    assert!(sched.next_segment(&mut conn).is_none());
    assert_eq!(sched.stats().no_path, 2);

    conn.path_mut(idx(2)).unwrap().state = PathState::Established;
    assert_eq!(sched.next_segment(&mut conn).unwrap().path, idx(2));
}

#[test]
fn loss_recovery_path_rejoins_after_high_seq_acked() {
    let mut sched = scheduler(10);
    let mut conn = connection(1);
    {
        let p = conn.path_mut(idx(1)).unwrap();
        p.state = PathState::LossRecovery;
        p.ack_mode = AckMode::Cumulative;
        p.snd_una = 100;
        p.high_seq = 400;
    }
    queue(&mut conn, 1, 100);
    assert!(sched.next_segment(&mut conn).is_none());

    conn.path_mut(idx(1)).unwrap().snd_una = 400;
    assert!(sched.next_segment(&mut conn).is_some());
}

#[test]
fn unconfirmed_path_only_takes_next_in_order_unit() {
    let mut sched = scheduler(10);
    let mut conn = connection(2);
    {
        let p = conn.path_mut(idx(2)).unwrap();
        p.state = PathState::FullyEstablishing;
        p.second_unit = true;
        p.last_end_seq = 9999;
    }
    conn.path_mut(idx(1)).unwrap().state = PathState::Unusable;
    queue(&mut conn, 1, 100);
    assert!(sched.next_segment(&mut conn).is_none());

    conn.path_mut(idx(2)).unwrap().last_end_seq = 0;
    assert_eq!(sched.next_segment(&mut conn).unwrap().path, idx(2));
}

#[test]
fn torn_down_path_takes_its_quota_along() {
    let mut sched = scheduler(10);
    let mut conn = connection(2);
    queue(&mut conn, 3, 100);
    let used = send(sched.as_mut(), &mut conn).unwrap().path;
    send(sched.as_mut(), &mut conn).unwrap();
    assert_eq!(quota(&conn, used.get()), 2);

    conn.remove_path(used).unwrap();
    let mut fresh = Path::new(used, MSS);
    fresh.cwnd = 10_000;
    conn.add_path(fresh).unwrap();
    assert_eq!(quota(&conn, used.get()), 0);
}

// ─── Reinjection & close signal ─────────────────────────────────────────────

#[test]
fn reinjected_unit_visits_every_path_before_repeating() {
    let mut sched = scheduler(10);
    let mut conn = connection(3);
    let mut unit = Segment::new(7, Bytes::from_static(b"again"));
    unit.mark_carried(idx(1));
    unit.mark_carried(idx(2));
    conn.push_reinject(unit);

    let d = sched.next_segment(&mut conn).unwrap();
    assert_eq!(d.source, Source::Reinjected);
    assert_eq!(d.path, idx(3));

    let mut unit = conn.pop_reinject().unwrap();
    unit.mark_carried(d.path);
    conn.push_reinject(unit);

    let d = sched.next_segment(&mut conn).unwrap();
    assert!(conn.reinject_head().unwrap().carried().is_empty());
    assert!(conn.path(d.path).is_some());
    assert_eq!(sched.stats().carried_restarts, 1);
}

#[test]
fn close_signal_reply_uses_only_designated_path() {
    let mut sched = scheduler(10);
    let mut conn = connection(3);
    conn.on_peer_close(idx(2));
    let mut fin = Segment::close(1000, Bytes::new());

    assert_eq!(sched.get_path(&conn, &mut fin, true), Some(idx(2)));

    conn.path_mut(idx(2)).unwrap().state = PathState::PossiblyFailed;
    assert_eq!(sched.get_path(&conn, &mut fin, true), None);
}

#[test]
fn get_path_honours_zero_window_flag() {
    let mut sched = scheduler(10);
    let mut conn = connection(2);
    for raw in 1..=2 {
        let p = conn.path_mut(idx(raw)).unwrap();
        p.write_seq = 5000;
        p.snd_nxt = 5000;
        p.wnd_end = 5000;
    }
    let mut unit = Segment::new(5000, Bytes::from_static(b"edge"));

    assert_eq!(sched.get_path(&conn, &mut unit, true), None);
    assert_eq!(sched.get_path(&conn, &mut unit, false), Some(idx(2)));
}

#[test]
fn fallback_mode_sends_primary_head_on_first_path() {
    let mut sched = scheduler(10);
    let mut conn = connection(2);
    conn.fallback = true;
    conn.push_reinject(Segment::new(1, Bytes::from_static(b"r")));
    queue(&mut conn, 1, 300);

    let d = sched.next_segment(&mut conn).unwrap();
    assert_eq!(d.source, Source::Fallback);
    assert_eq!(d.path, idx(1));
    assert_eq!(d.byte_limit, 300);
    assert_eq!(quota(&conn, 1), 0);
}

// ─── Configuration ──────────────────────────────────────────────────────────

#[test]
fn hot_reload_applies_to_next_decision() {
    init_tracing();
    let shared = SharedConfig::new(SchedulerConfig::with_round_size(100).unwrap()).unwrap();
    let mut sched = build_scheduler(&shared);
    let mut conn = connection(2);
    queue(&mut conn, 3, 100);

    let first = send(sched.as_mut(), &mut conn).unwrap();
    assert_eq!(first.byte_limit, 100 * u64::from(MSS));

    shared.reload_from_toml("round_size = 1").unwrap();
    let second = send(sched.as_mut(), &mut conn).unwrap();
    assert_ne!(second.path, first.path);
    assert_eq!(second.byte_limit, u64::from(MSS));

    assert!(shared.reload_from_toml("round_size = 0").is_err());
    assert_eq!(shared.snapshot().round_size, 1);
}
