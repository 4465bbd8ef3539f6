use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver};
use penguin_core::{Color, Direction, EntityId, EntitySnapshot, HeldDirections, MoveUpdate, Position, Viewport};
use penguin_sync::{Applied, Backend, IgnoreReason, SessionOptions, SyncError, SyncSession};
use penguin_transport::{
    Broadcaster, CodecKind, EntityStore, EventSource, Faults, InboundMessage, JsonCodec, LocalHub, MovePayload,
    WireCodec,
};

const TICK: Duration = Duration::from_millis(50);

fn hub() -> LocalHub {
    LocalHub::new("penguin", CodecKind::Json)
}

fn options(username: &str) -> SessionOptions {
    SessionOptions::new(username)
}

fn start(hub: &LocalHub, options: SessionOptions, at: Instant) -> SyncSession {
    SyncSession::start_at(options, Backend::shared(hub.clone()), at).unwrap()
}

/// Listen on the movement channel like a third party would.
fn spy(hub: &LocalHub) -> Receiver<InboundMessage> {
    let (tx, rx) = unbounded();
    hub.subscribe_broadcast("movement", "move", tx);
    rx
}

fn sent_payloads(rx: &Receiver<InboundMessage>) -> Vec<MovePayload> {
    rx.try_iter()
        .map(|message| match message {
            InboundMessage::Broadcast { payload, .. } => JsonCodec.decode_move(&payload).unwrap(),
            other => panic!("unexpected message {:?}", other),
        })
        .collect()
}

#[test]
fn holding_right_for_five_ticks_sends_once_at_125() {
    let hub = hub();
    let spy = spy(&hub);
    let t0 = Instant::now();
    let mut session = start(
        &hub,
        SessionOptions {
            prime_throttle: true,
            ..options("pingu")
        },
        t0,
    );

    let right = HeldDirections::only(Direction::Right);
    let sent: Vec<bool> = (1..=5u32).map(|n| session.tick(right, t0 + TICK * n).sent).collect();

    assert_eq!(session.local().position, Position::new(125.0, 100.0));
    assert_eq!(sent, vec![false, false, false, false, true]);

    let payloads = sent_payloads(&spy);
    assert_eq!(payloads.len(), 1);
    let id = session.id().unwrap().clone();
    assert_eq!(
        payloads[0],
        MovePayload {
            id: id.clone(),
            color: Color::new("blue"),
            x: 125.0,
            y: 100.0,
        }
    );
    assert_eq!(hub.row(&id).unwrap().position(), Position::new(125.0, 100.0));
}

#[test]
fn idle_after_one_move_sends_exactly_once() {
    let hub = hub();
    let spy = spy(&hub);
    let t0 = Instant::now();
    let mut session = start(&hub, options("pingu"), t0);

    session.tick(HeldDirections::only(Direction::Down), t0);
    for n in 1..100u32 {
        session.tick(HeldDirections::NONE, t0 + TICK * n);
    }

    assert_eq!(sent_payloads(&spy).len(), 1);
    assert_eq!(session.throttle_state().last_sent_at, Some(t0));
}

#[test]
fn remote_moves_are_interpolated_between_sessions() {
    let hub = hub();
    let t0 = Instant::now();
    let mut alice = start(&hub, options("alice"), t0);
    let mut bob = start(&hub, options("bob"), t0);
    let alice_id = alice.id().unwrap().clone();

    // Bob learns about Alice from the snapshot; Alice learns about Bob from the change feed.
    assert!(bob.remotes().contains(&alice_id));
    alice.tick(HeldDirections::NONE, t0);
    assert!(alice.remotes().contains(bob.id().unwrap()));

    for n in 1..=6u32 {
        alice.tick(HeldDirections::only(Direction::Right), t0 + TICK * n);
    }
    let alice_now = alice.local().position;

    // Enough idle time for the throttle window to let the last position through.
    alice.tick(HeldDirections::NONE, t0 + Duration::from_secs(1));

    for n in 1..=20u32 {
        bob.tick(HeldDirections::NONE, t0 + Duration::from_secs(1) + TICK * n);
    }
    let seen = bob.remotes().get(&alice_id).unwrap();
    assert_eq!(seen.target, alice_now);
    assert_eq!(seen.rendered, alice_now);
}

#[test]
fn own_broadcasts_are_ignored() {
    let hub = hub();
    let t0 = Instant::now();
    let mut session = start(&hub, options("pingu"), t0);

    let report = session.tick(HeldDirections::only(Direction::Left), t0);
    assert!(report.sent);
    let report = session.tick(HeldDirections::NONE, t0 + TICK);
    assert_eq!(report.events_applied, 0);
    assert!(session.remotes().is_empty());

    let id = session.id().unwrap().clone();
    let applied = session.handle_move(MoveUpdate {
        id,
        color: Color::new("blue"),
        position: Position::new(1.0, 1.0),
    });
    assert_eq!(applied, Applied::Ignored(IgnoreReason::OwnEntity));
    assert_eq!(session.local().position, Position::new(95.0, 100.0));
}

#[test]
fn unknown_move_creates_one_entity_at_target() {
    let hub = hub();
    let mut session = start(&hub, options("pingu"), Instant::now());
    let applied = session.handle_move(MoveUpdate {
        id: EntityId::new("A"),
        color: Color::new("red"),
        position: Position::new(50.0, 50.0),
    });
    assert_eq!(applied, Applied::Created);
    assert_eq!(session.remotes().len(), 1);
    let a = session.remotes().get(&EntityId::new("A")).unwrap();
    assert_eq!(a.rendered, Position::new(50.0, 50.0));
    assert_eq!(a.target, Position::new(50.0, 50.0));
}

#[test]
fn repeated_join_and_stray_leave_are_harmless() {
    let hub = hub();
    let mut session = start(&hub, options("pingu"), Instant::now());
    let join = EntitySnapshot {
        id: EntityId::new("B"),
        color: Color::new("red"),
        position: Position::new(10.0, 20.0),
    };
    assert_eq!(session.handle_join(join.clone()), Applied::Created);
    assert_eq!(session.handle_join(join), Applied::Ignored(IgnoreReason::AlreadyKnown));
    assert_eq!(session.remotes().len(), 1);

    assert_eq!(
        session.handle_leave(&EntityId::new("nobody")),
        Applied::Ignored(IgnoreReason::UnknownEntity)
    );
    assert_eq!(session.remotes().len(), 1);
}

#[test]
fn move_then_tick_and_tick_then_move_both_stay_valid() {
    let hub = hub();
    let t0 = Instant::now();
    let mut first = start(&hub, options("first"), t0);
    let mut second = start(&hub, options("second"), t0);
    let update = MoveUpdate {
        id: EntityId::new("Z"),
        color: Color::new("red"),
        position: Position::new(30.0, 40.0),
    };

    first.handle_move(update.clone());
    first.tick(HeldDirections::NONE, t0);

    second.tick(HeldDirections::NONE, t0);
    second.handle_move(update);

    for session in [&first, &second] {
        let z = session.remotes().get(&EntityId::new("Z")).unwrap();
        assert_eq!(z.target, Position::new(30.0, 40.0));
        assert_eq!(z.rendered, Position::new(30.0, 40.0));
    }
}

#[test]
fn persist_failure_does_not_block_broadcast() {
    let hub = hub();
    let spy = spy(&hub);
    let t0 = Instant::now();
    let mut session = start(&hub, options("pingu"), t0);
    hub.inject_faults(Faults {
        persist: true,
        ..Faults::default()
    });

    let report = session.tick(HeldDirections::only(Direction::Right), t0);

    assert!(report.sent);
    assert_eq!(sent_payloads(&spy).len(), 1);
    let id = session.id().unwrap().clone();
    assert_eq!(hub.row(&id).unwrap().position(), Position::new(100.0, 100.0));
    assert_eq!(session.throttle_state().last_sent_position, Position::new(105.0, 100.0));
}

#[test]
fn broadcast_failure_does_not_block_persist() {
    let hub = hub();
    let t0 = Instant::now();
    let mut session = start(&hub, options("pingu"), t0);
    hub.inject_faults(Faults {
        broadcast: true,
        ..Faults::default()
    });

    session.tick(HeldDirections::only(Direction::Down), t0);

    let id = session.id().unwrap().clone();
    assert_eq!(hub.row(&id).unwrap().position(), Position::new(100.0, 105.0));
    assert_eq!(session.local().position, Position::new(100.0, 105.0));
}

#[test]
fn registration_failure_is_fatal() {
    let hub = hub();
    start(&hub, options("pingu"), Instant::now());

    let result = SyncSession::start(options("pingu"), Backend::shared(hub.clone()));
    assert!(matches!(result, Err(SyncError::Registration(_))));

    hub.inject_faults(Faults {
        register: true,
        ..Faults::default()
    });
    let result = SyncSession::start(options("other"), Backend::shared(hub.clone()));
    assert!(matches!(result, Err(SyncError::Registration(_))));
}

#[test]
fn snapshot_failure_starts_empty_and_recovers_from_events() {
    let hub = hub();
    let t0 = Instant::now();
    let mut early = start(&hub, options("early"), t0);
    hub.inject_faults(Faults {
        snapshot: true,
        ..Faults::default()
    });

    let mut late = start(&hub, options("late"), t0);
    assert!(late.remotes().is_empty());

    hub.clear_faults();
    early.tick(HeldDirections::only(Direction::Up), t0);
    late.tick(HeldDirections::NONE, t0 + TICK);

    assert!(late.remotes().contains(early.id().unwrap()));
}

#[test]
fn malformed_broadcasts_are_dropped() {
    let hub = hub();
    let t0 = Instant::now();
    let mut session = start(&hub, options("pingu"), t0);

    hub.broadcast("movement", "move", br#"{"id":"","color":"red","x":1,"y":1}"#).unwrap();
    hub.broadcast("movement", "move", b"not json").unwrap();
    hub.broadcast("movement", "move", br#"{"id":"A","color":"red","x":1,"y":1}"#).unwrap();

    let report = session.tick(HeldDirections::NONE, t0);
    assert_eq!(report.events_dropped, 2);
    assert_eq!(report.events_applied, 1);
    assert_eq!(session.remotes().len(), 1);
}

#[test]
fn ending_a_session_removes_it_elsewhere() {
    let hub = hub();
    let t0 = Instant::now();
    let mut watcher = start(&hub, options("watcher"), t0);
    let leaver = start(&hub, options("leaver"), t0);
    let leaver_id = leaver.id().unwrap().clone();

    watcher.tick(HeldDirections::NONE, t0);
    assert!(watcher.remotes().contains(&leaver_id));

    let subscribers_before = hub.subscriber_count();
    leaver.end();
    assert_eq!(hub.subscriber_count(), subscribers_before - 2);
    assert!(hub.row(&leaver_id).is_none());

    watcher.tick(HeldDirections::NONE, t0 + TICK);
    assert!(!watcher.remotes().contains(&leaver_id));
}

#[test]
fn resize_reclamps_local_position() {
    let hub = hub();
    let t0 = Instant::now();
    let mut session = start(
        &hub,
        SessionOptions {
            spawn: Position::new(700.0, 500.0),
            ..options("pingu")
        },
        t0,
    );
    session.resize(Viewport::new(320.0, 240.0));
    assert_eq!(session.local().position, Position::new(320.0, 240.0));

    session.tick(HeldDirections::only(Direction::Right), t0);
    assert_eq!(session.local().position, Position::new(320.0, 240.0));
}

#[test]
fn resize_to_unusable_viewport_keeps_old_bounds() {
    let hub = hub();
    let t0 = Instant::now();
    let mut session = start(
        &hub,
        SessionOptions {
            spawn: Position::new(700.0, 500.0),
            ..options("pingu")
        },
        t0,
    );

    session.resize(Viewport::new(-1.0, 0.0));
    session.resize(Viewport::new(f32::NAN, 240.0));

    assert_eq!(session.viewport(), Viewport::new(800.0, 600.0));
    assert_eq!(session.local().position, Position::new(700.0, 500.0));
    session.tick(HeldDirections::only(Direction::Right), t0);
    assert_eq!(session.local().position, Position::new(705.0, 500.0));
}

#[test]
fn unusable_viewport_refuses_to_start() {
    let hub = hub();
    let result = SyncSession::start_at(
        SessionOptions {
            viewport: Viewport::new(0.0, 600.0),
            ..options("pingu")
        },
        Backend::shared(hub.clone()),
        Instant::now(),
    );
    assert!(matches!(result, Err(SyncError::InvalidViewport { .. })));
    assert_eq!(hub.row_count(), 0);
}

#[test]
fn idle_peers_see_the_configured_spawn() {
    let hub = hub();
    let t0 = Instant::now();
    let spawn = Position::new(700.0, 500.0);

    // Carol hears about alice from the change feed, bob from the snapshot.
    let mut carol = start(&hub, options("carol"), t0);
    let mut alice = start(
        &hub,
        SessionOptions {
            spawn,
            ..options("alice")
        },
        t0,
    );
    let mut bob = start(&hub, options("bob"), t0);
    let alice_id = alice.id().unwrap().clone();
    assert_eq!(hub.row(&alice_id).unwrap().position(), spawn);

    let mut now = t0;
    for _ in 0..50 {
        now += TICK;
        alice.tick(HeldDirections::NONE, now);
        bob.tick(HeldDirections::NONE, now);
        carol.tick(HeldDirections::NONE, now);
    }

    for peer in [&bob, &carol] {
        let seen = peer.remotes().get(&alice_id).unwrap();
        assert_eq!(seen.rendered, alice.local().position);
        assert_eq!(seen.target, spawn);
    }
}

#[test]
fn spawn_outside_viewport_is_clamped() {
    let hub = hub();
    let session = start(
        &hub,
        SessionOptions {
            spawn: Position::new(-20.0, 9000.0),
            ..options("pingu")
        },
        Instant::now(),
    );
    assert_eq!(session.local().position, Position::new(0.0, 600.0));
}

#[test]
fn binary_codec_sessions_interoperate() {
    let hub = LocalHub::new("penguin", CodecKind::Binary);
    let t0 = Instant::now();
    let binary = |name: &str| SessionOptions {
        codec: CodecKind::Binary,
        ..options(name)
    };
    let mut alice = start(&hub, binary("alice"), t0);
    let mut bob = start(&hub, binary("bob"), t0);

    alice.tick(HeldDirections::only(Direction::Right), t0);
    let report = bob.tick(HeldDirections::NONE, t0);

    assert_eq!(report.events_dropped, 0);
    let seen = bob.remotes().get(alice.id().unwrap()).unwrap();
    assert_eq!(seen.target, Position::new(105.0, 100.0));
}

#[test]
fn deregistration_failure_is_not_surfaced() {
    let hub = hub();
    let session = start(&hub, options("pingu"), Instant::now());
    let id = session.id().unwrap().clone();
    hub.deregister_entity(&id).unwrap();
    session.end();
    assert_eq!(hub.row_count(), 0);
}

#[test]
fn store_snapshot_rows_prepopulate_remotes() {
    let hub = hub();
    let existing = hub
        .register_entity("robby", &Color::new("green"), Position::new(100.0, 100.0))
        .unwrap();
    hub.persist_position(&existing, Position::new(42.0, 24.0)).unwrap();

    let session = start(&hub, options("pingu"), Instant::now());
    let robby = session.remotes().get(&existing).unwrap();
    assert_eq!(robby.rendered, Position::new(42.0, 24.0));
    assert_eq!(robby.color().as_str(), "green");
}
