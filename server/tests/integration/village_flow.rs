// bbox_sync/server/tests/integration/village_flow.rs

use bbox_sync_core::client::replica::BoundingBoxReplica;
use bbox_sync_core::core::config::{SyncConfig, VillageConfig};
use bbox_sync_core::core::types::{BoundingBox, BoxKind, BoxMetadata, Coords, DimensionId, WorldEvent};
use bbox_sync_core::network::messages::ClientMessage;
use bbox_sync_core::network::transport::RecordingTransport;
use bbox_sync_core::server::instance::BoundingBoxServer;
use bbox_sync_core::world::village::LiveVillage;

use std::sync::Arc;

fn setup_test_server(village: VillageConfig) -> (Arc<BoundingBoxServer>, Arc<RecordingTransport>) {
    let config = SyncConfig { village, ..SyncConfig::default() };
    let transport = Arc::new(RecordingTransport::new());
    let server = Arc::new(BoundingBoxServer::new(Arc::new(config), transport.clone()));
    (server, transport)
}

fn village(id: i32, x: i32, doors: i32) -> LiveVillage {
    LiveVillage::new(id, Coords::new(x, 64, 0), 24)
        .with_villagers(12)
        .with_doors((0..doors).map(|i| Coords::new(x + i, 64, 3)))
}

fn village_owners(server: &BoundingBoxServer, dimension: &DimensionId) -> Vec<BoundingBox> {
    server
        .cache_snapshot(dimension)
        .keys()
        .filter(|owner| owner.kind() == BoxKind::Village)
        .copied()
        .collect()
}

#[test]
fn village_lifecycle_reaches_observer() {
    let (server, transport) = setup_test_server(VillageConfig::default());
    let overworld = DimensionId::overworld();
    let viewer = server.observer_id("viewer");
    server.observer_joined(viewer.clone(), overworld.clone());

    server.publish(WorldEvent::VillageTick {
        dimension: overworld.clone(),
        villages: vec![village(1, 0, 4), village(2, 500, 4)],
    });
    server.run_tick();
    assert_eq!(village_owners(&server, &overworld).len(), 2);
    assert_eq!(transport.count_for("viewer", "add_bounding_box"), 2);

    // Village 2 disappears.
    server.publish(WorldEvent::VillageTick { dimension: overworld.clone(), villages: vec![village(1, 0, 4)] });
    server.run_tick();
    assert_eq!(village_owners(&server, &overworld).len(), 1);
    assert_eq!(transport.count_for("viewer", "remove_bounding_box"), 1);
    assert_eq!(server.delivered_count(&viewer, &overworld), 1);
}

#[test]
fn changed_village_is_replaced() {
    let (server, transport) = setup_test_server(VillageConfig { iron_golem_min_doors: 5, iron_golem_min_villagers: 10 });
    let overworld = DimensionId::overworld();
    let viewer = server.observer_id("viewer");
    server.observer_joined(viewer.clone(), overworld.clone());

    server.village_tick(&overworld, &[village(7, 100, 4)]);
    server.synchronize_observers();
    let before = village_owners(&server, &overworld);
    assert_eq!(before.len(), 1);

    // A fifth door makes it spawn iron golems, which changes its owner box.
    let outcome = server.village_tick(&overworld, &[village(7, 100, 5)]);
    assert_eq!(outcome.removed, before);
    server.synchronize_observers();

    let after = village_owners(&server, &overworld);
    assert_eq!(after.len(), 1);
    match after[0].metadata() {
        BoxMetadata::Village { spawns_iron_golems, .. } => assert!(*spawns_iron_golems),
        other => panic!("unexpected metadata {:?}", other),
    }
    let snapshot = server.cache_snapshot(&overworld);
    assert!(snapshot[&after[0]].iter().any(|member| member.kind() == BoxKind::IronGolemSpawn));

    let kinds: Vec<&str> = transport.messages_for("viewer").iter().map(|message| message.kind()).collect();
    assert_eq!(kinds, vec!["add_bounding_box", "remove_bounding_box", "add_bounding_box"]);
}

#[test]
fn moved_doors_reach_the_replica() {
    let (server, transport) = setup_test_server(VillageConfig::default());
    let overworld = DimensionId::overworld();
    let replica = BoundingBoxReplica::new(&SyncConfig::default());
    server.observer_joined(server.observer_id("viewer"), overworld.clone());

    server.village_tick(&overworld, &[village(4, 0, 4)]);
    server.run_tick();

    // Same door count, different door positions.
    let moved = LiveVillage::new(4, Coords::new(0, 64, 0), 24)
        .with_villagers(12)
        .with_doors((0..4).map(|i| Coords::new(i, 64, -6)));
    let outcome = server.village_tick(&overworld, &[moved]);
    assert_eq!(outcome.removed.len(), 1);
    server.run_tick();

    for message in transport.messages_for("viewer") {
        replica.apply(message);
    }
    let view = replica.render_view(&overworld);
    assert_eq!(view.entries, server.cache_snapshot(&overworld));
    assert_eq!(village_owners(&server, &overworld).len(), 1);
}

#[test]
fn unchanged_villages_send_nothing_new() {
    let (server, transport) = setup_test_server(VillageConfig::default());
    let overworld = DimensionId::overworld();
    server.observer_joined(server.observer_id("viewer"), overworld.clone());

    for _ in 0..5 {
        let outcome = server.village_tick(&overworld, &[village(3, -200, 6)]);
        assert!(outcome.removed.is_empty());
        server.synchronize_observers();
    }
    assert_eq!(transport.len(), 1);
}

#[test]
fn villages_keep_their_color_across_ticks() {
    let (server, transport) = setup_test_server(VillageConfig::default());
    let overworld = DimensionId::overworld();
    server.observer_joined(server.observer_id("viewer"), overworld.clone());

    server.village_tick(&overworld, &[village(1, 0, 2), village(2, 300, 2)]);
    server.village_tick(&overworld, &[village(1, 0, 2), village(2, 300, 3)]);
    server.synchronize_observers();

    let colors: Vec<_> = transport
        .messages_for("viewer")
        .iter()
        .filter_map(|message| match message {
            ClientMessage::AddBoundingBox { owner, .. } => match owner.metadata() {
                BoxMetadata::Village { color, .. } => Some(*color),
                _ => None,
            },
            _ => None,
        })
        .collect();
    assert_eq!(colors.len(), 2);
    assert_ne!(colors[0], colors[1]);
    assert_eq!(server.registry.colors().len(), 2);
}
