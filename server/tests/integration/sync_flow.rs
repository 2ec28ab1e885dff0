// bbox_sync/server/tests/integration/sync_flow.rs

use bbox_sync_core::client::replica::BoundingBoxReplica;
use bbox_sync_core::core::config::SyncConfig;
use bbox_sync_core::core::types::{BoundingBox, BoxKind, Coords, DimensionId, MemberSet, StructureKind, WorldData, WorldEvent};
use bbox_sync_core::network::messages::ClientMessage;
use bbox_sync_core::network::transport::RecordingTransport;
use bbox_sync_core::server::instance::BoundingBoxServer;
use bbox_sync_core::systems::discovery::chunk_processor::spawner_bounds;
use bbox_sync_core::world::chunk::{ChunkSnapshot, StructureStart};

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

// Helper function to set up a test server instance
fn setup_test_server(config: SyncConfig) -> (Arc<BoundingBoxServer>, Arc<RecordingTransport>) {
    info!("[Test Setup] Setting up test server instance...");
    let transport = Arc::new(RecordingTransport::new());
    let server = Arc::new(BoundingBoxServer::new(Arc::new(config), transport.clone()));
    (server, transport)
}

fn temple_chunk() -> ChunkSnapshot {
    ChunkSnapshot::new(0, 0).with_structure(
        StructureStart::new("Desert_Pyramid", Coords::new(0, 60, 0), Coords::new(20, 75, 20))
            .with_piece(Coords::new(0, 60, 0), Coords::new(20, 70, 20))
            .with_piece(Coords::new(8, 71, 8), Coords::new(12, 75, 12)),
    )
}

fn temple_owner() -> BoundingBox {
    BoundingBox::from_corners(
        BoxKind::Structure(StructureKind::DesertTemple),
        Coords::new(0, 60, 0),
        Coords::new(20, 75, 20),
    )
}

#[test]
fn example_session_add_remove_reconnect() {
    let (server, transport) = setup_test_server(SyncConfig::default());
    let overworld = DimensionId::overworld();
    let x = server.observer_id("x");

    server.publish(WorldEvent::ChunkLoaded { dimension: overworld.clone(), chunk: temple_chunk() });
    server.process_pending_events();
    let snapshot = server.cache_snapshot(&overworld);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[&temple_owner()].len(), 2);

    server.publish(WorldEvent::ObserverJoined { observer: x.clone(), dimension: overworld.clone() });
    server.run_tick();
    assert!(server.has_delivered(&x, &overworld, &temple_owner()));
    assert_eq!(transport.count_for("x", "add_bounding_box"), 1);

    // Later ticks send nothing new.
    server.run_tick();
    assert_eq!(transport.count_for("x", "add_bounding_box"), 1);

    let report = server.remove_bounding_box(&overworld, &temple_owner());
    assert_eq!(report.removes_sent, 1);
    assert!(server.cache_snapshot(&overworld).is_empty());
    assert_eq!(server.delivered_count(&x, &overworld), 0);
    assert_eq!(transport.count_for("x", "remove_bounding_box"), 1);

    server.publish(WorldEvent::ObserverLeft { observer: x.clone() });
    server.process_pending_events();
    assert!(!server.is_subscribed(&x));

    transport.take_messages();
    let x = server.observer_id("x");
    server.publish(WorldEvent::ObserverJoined { observer: x.clone(), dimension: overworld.clone() });
    server.run_tick();
    assert_eq!(server.delivered_count(&x, &overworld), 0);
    assert!(transport.is_empty());
}

#[test]
fn join_sends_initialize_before_adds() {
    let (server, transport) = setup_test_server(SyncConfig::default());
    let overworld = DimensionId::overworld();

    server.publish(WorldEvent::WorldLoaded { dimension: overworld.clone(), seed: -7, spawn_x: 100, spawn_z: -40 });
    server.process_pending_events();
    assert_eq!(server.world_data(), Some(WorldData::new(-7, 100, -40)));

    let alice = server.observer_id("alice");
    server.observer_joined(alice, overworld);

    let messages = transport.messages_for("alice");
    assert_eq!(messages.first(), Some(&ClientMessage::Initialize(WorldData::new(-7, 100, -40))));
    // The world spawn owner is the only entry.
    assert_eq!(transport.count_for("alice", "add_bounding_box"), 1);
}

#[test]
fn removal_reaches_only_holders() {
    let (server, transport) = setup_test_server(SyncConfig::default());
    let overworld = DimensionId::overworld();
    let nether = DimensionId::nether();

    server.chunk_loaded(&overworld, &temple_chunk());
    let a = server.observer_id("a");
    let b = server.observer_id("b");
    let c = server.observer_id("c");
    server.observer_joined(a.clone(), overworld.clone());
    server.observer_joined(b.clone(), overworld.clone());
    server.observer_joined(c.clone(), nether.clone());

    let report = server.remove_bounding_box(&overworld, &temple_owner());
    assert_eq!(report.removes_sent, 2);
    assert_eq!(transport.count_for("a", "remove_bounding_box"), 1);
    assert_eq!(transport.count_for("b", "remove_bounding_box"), 1);
    assert!(transport.messages_for("c").is_empty());

    // A second removal of the same owner is a no-op everywhere.
    let report = server.remove_bounding_box(&overworld, &temple_owner());
    assert_eq!(report.removes_sent, 0);
}

#[test]
fn broken_spawner_removes_its_entry() {
    let (server, transport) = setup_test_server(SyncConfig::default());
    let overworld = DimensionId::overworld();
    let spawner = Coords::new(130, 22, -60);

    server.publish(WorldEvent::ChunkLoaded {
        dimension: overworld.clone(),
        chunk: ChunkSnapshot::new(8, -4).with_spawner(spawner),
    });
    server.process_pending_events();
    let owner = spawner_bounds(spawner).unwrap();
    assert!(server.cache_snapshot(&overworld)[&owner].is_empty());

    let watcher = server.observer_id("watcher");
    server.observer_joined(watcher.clone(), overworld.clone());
    assert!(server.has_delivered(&watcher, &overworld, &owner));

    server.publish(WorldEvent::SpawnerBroken { dimension: overworld.clone(), pos: spawner });
    server.process_pending_events();
    assert!(server.cache_snapshot(&overworld).is_empty());
    assert_eq!(
        transport.messages_for("watcher").last(),
        Some(&ClientMessage::RemoveBoundingBox { dimension: overworld, owner })
    );
}

#[test]
fn failed_add_is_retried_next_tick() {
    let (server, transport) = setup_test_server(SyncConfig::default());
    let overworld = DimensionId::overworld();
    server.chunk_loaded(&overworld, &temple_chunk());

    transport.fail_for("flaky");
    let flaky = server.observer_id("flaky");
    let report = server.observer_joined(flaky.clone(), overworld.clone());
    assert_eq!(report.add_failures, 1);
    assert!(!server.has_delivered(&flaky, &overworld, &temple_owner()));

    transport.recover("flaky");
    let report = server.run_tick();
    assert_eq!(report.adds_sent, 1);
    assert!(server.has_delivered(&flaky, &overworld, &temple_owner()));
}

#[test]
fn add_then_remove_in_one_batch_keeps_order() {
    let (server, transport) = setup_test_server(SyncConfig::default());
    let overworld = DimensionId::overworld();
    let spawner = Coords::new(5, 30, 5);
    let x = server.observer_id("x");

    server.publish(WorldEvent::ObserverJoined { observer: x.clone(), dimension: overworld.clone() });
    server.publish(WorldEvent::ChunkLoaded {
        dimension: overworld.clone(),
        chunk: ChunkSnapshot::new(0, 0).with_spawner(spawner),
    });
    server.publish(WorldEvent::ServerTick);
    server.publish(WorldEvent::SpawnerBroken { dimension: overworld.clone(), pos: spawner });
    assert_eq!(server.process_pending_events(), 4);

    let kinds: Vec<&str> = transport.messages_for("x").iter().map(|message| message.kind()).collect();
    assert_eq!(kinds, vec!["add_bounding_box", "remove_bounding_box"]);
    assert_eq!(server.delivered_count(&x, &overworld), 0);
}

#[test]
fn dimension_change_syncs_new_dimension() {
    let (server, transport) = setup_test_server(SyncConfig::default());
    let overworld = DimensionId::overworld();
    let nether = DimensionId::nether();
    let fortress = ChunkSnapshot::new(1, 1).with_structure(StructureStart::new(
        "Fortress",
        Coords::new(16, 40, 16),
        Coords::new(60, 70, 60),
    ));

    server.chunk_loaded(&overworld, &temple_chunk());
    server.chunk_loaded(&nether, &fortress);
    let x = server.observer_id("x");
    server.observer_joined(x.clone(), overworld.clone());

    server.publish(WorldEvent::ObserverChangedDimension { observer: x.clone(), dimension: nether.clone() });
    server.run_tick();
    assert_eq!(transport.count_for("x", "add_bounding_box"), 2);
    assert_eq!(server.delivered_count(&x, &nether), 1);

    // The overworld entry was kept and still gets its removal.
    let report = server.remove_bounding_box(&overworld, &temple_owner());
    assert_eq!(report.removes_sent, 1);
}

#[test]
fn reset_honours_keep_cache_setting() {
    let (server, _transport) = setup_test_server(SyncConfig::default());
    let overworld = DimensionId::overworld();
    server.world_loaded(&overworld, 1, 0, 0);
    server.chunk_loaded(&overworld, &temple_chunk());
    server.observer_joined(server.observer_id("x"), overworld.clone());

    server.reset();
    assert_eq!(server.observer_count(), 0);
    assert!(server.cache_snapshot(&overworld).is_empty());
    assert!(server.world_data().is_none());

    let config = SyncConfig { keep_cache_between_sessions: true, ..SyncConfig::default() };
    let (keeping, _transport) = setup_test_server(config);
    keeping.chunk_loaded(&overworld, &temple_chunk());
    keeping.observer_joined(keeping.observer_id("x"), overworld.clone());
    keeping.reset();
    assert_eq!(keeping.observer_count(), 0);
    assert_eq!(keeping.cache_snapshot(&overworld).len(), 1);
}

#[tokio::test]
async fn sync_loop_delivers_and_stops_on_shutdown() {
    let config = SyncConfig { tick_rate: 100, ..SyncConfig::default() };
    let (server, transport) = setup_test_server(config);
    let overworld = DimensionId::overworld();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(server.clone().run_sync_loop(shutdown_rx));

    server.publish(WorldEvent::ChunkLoaded { dimension: overworld.clone(), chunk: temple_chunk() });
    server.publish(WorldEvent::ObserverJoined { observer: server.observer_id("x"), dimension: overworld });

    let mut waited = Duration::ZERO;
    while transport.count_for("x", "add_bounding_box") == 0 && waited < Duration::from_secs(2) {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }
    assert_eq!(transport.count_for("x", "add_bounding_box"), 1);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("sync loop did not stop")
        .unwrap();
    assert!(server.frame() > 0);
}

#[test]
fn spawners_at_the_coordinate_limits_are_ignored() {
    let (server, transport) = setup_test_server(SyncConfig::default());
    let overworld = DimensionId::overworld();
    let edge = Coords::new(i32::MAX - 1, 10, 0);
    server.observer_joined(server.observer_id("x"), overworld.clone());

    server.publish(WorldEvent::ChunkLoaded {
        dimension: overworld.clone(),
        chunk: ChunkSnapshot::new(edge.chunk_x(), 0).with_spawner(edge).with_spawner(Coords::new(0, 10, 0)),
    });
    server.publish(WorldEvent::ServerTick);
    server.publish(WorldEvent::SpawnerBroken { dimension: overworld.clone(), pos: edge });
    assert_eq!(server.process_pending_events(), 3);

    assert_eq!(server.cache_snapshot(&overworld).len(), 1);
    assert_eq!(transport.count_for("x", "add_bounding_box"), 1);
    assert_eq!(transport.count_for("x", "remove_bounding_box"), 0);
}

#[test]
fn changed_members_reach_the_replica() {
    let (server, transport) = setup_test_server(SyncConfig::default());
    let overworld = DimensionId::overworld();
    let replica = BoundingBoxReplica::new(&SyncConfig::default());
    server.observer_joined(server.observer_id("viewer"), overworld.clone());

    server.chunk_loaded(&overworld, &temple_chunk());
    server.run_tick();
    // Same structure start rescanned with a third piece.
    let mut grown = temple_chunk();
    grown.structure_starts[0] = grown.structure_starts[0].clone().with_piece(Coords::new(2, 60, 2), Coords::new(4, 62, 4));
    server.chunk_loaded(&overworld, &grown);
    server.run_tick();

    for (_, message) in transport.take_messages() {
        replica.apply(message);
    }
    let view = replica.render_view(&overworld);
    assert_eq!(view.entries[&temple_owner()].len(), 3);
    assert_eq!(view.entries, server.cache_snapshot(&overworld));
}

#[derive(Debug, Clone)]
enum Step {
    Upsert(u8, u8),
    Grow(u8),
    Remove(u8),
    Tick,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u8..6, 0u8..4).prop_map(|(owner, members)| Step::Upsert(owner, members)),
        (0u8..6).prop_map(Step::Grow),
        (0u8..6).prop_map(Step::Remove),
        Just(Step::Tick),
    ]
}

fn owner_box(index: u8) -> BoundingBox {
    let base = index as i32 * 32;
    BoundingBox::from_corners(BoxKind::Structure(StructureKind::Igloo), Coords::new(base, 60, 0), Coords::new(base + 10, 70, 10))
}

fn member_boxes(owner: BoundingBox, count: usize) -> impl Iterator<Item = BoundingBox> {
    let min = owner.min();
    (0..count as i32).map(move |i| {
        BoundingBox::from_corners(
            BoxKind::Structure(StructureKind::Igloo),
            Coords::new(min.x + i, min.y, min.z),
            Coords::new(min.x + i, min.y + 1, min.z),
        )
    })
}

fn resolved(entries: impl IntoIterator<Item = (BoundingBox, MemberSet)>) -> HashMap<BoundingBox, MemberSet> {
    entries.into_iter().collect()
}

proptest! {
    #[test]
    fn replica_converges_on_cache_contents(steps in prop::collection::vec(step(), 1..40)) {
        let (server, transport) = setup_test_server(SyncConfig::default());
        let overworld = DimensionId::overworld();
        let cache = server.registry.get_or_create(&overworld).cache.clone();
        let replica = BoundingBoxReplica::new(&SyncConfig::default());
        server.observer_joined(server.observer_id("viewer"), overworld.clone());

        for step in steps {
            match step {
                Step::Upsert(index, count) => {
                    let owner = owner_box(index);
                    cache.add_bounding_boxes(owner, member_boxes(owner, count as usize));
                }
                Step::Grow(index) => {
                    // Replaces the member set of an owner the viewer may
                    // already hold.
                    let owner = owner_box(index);
                    if let Some(members) = cache.members(&owner) {
                        cache.add_bounding_boxes(owner, member_boxes(owner, members.len() + 1));
                        server.run_tick();
                    }
                }
                Step::Remove(index) => {
                    server.remove_bounding_box(&overworld, &owner_box(index));
                }
                Step::Tick => {
                    server.run_tick();
                }
            }
            for (_, message) in transport.take_messages() {
                replica.apply(message);
            }
        }
        server.run_tick();
        for (_, message) in transport.take_messages() {
            replica.apply(message);
        }

        let expected = resolved(server.cache_snapshot(&overworld).iter().map(|(owner, members)| (*owner, (**members).clone())));
        let mirrored = resolved(replica.render_view(&overworld).entries.iter().map(|(owner, members)| (*owner, (**members).clone())));
        prop_assert_eq!(expected, mirrored);
    }
}
