//! Integration tests for tile blocking, path queries and the camera

use tilescape::core::{Camera, NodeBuilder, SimpleRng, Spatial, TileWorld};
use tilescape::demo;
use tilescape::types::{Axis, TileCatalog, TileDef, WorldRecord};

fn catalog() -> TileCatalog {
    TileCatalog::new(vec![
        TileDef::new(7),
        TileDef::new(8).with_footprint(2, 2),
    ])
}

fn blocked(world: &TileWorld) -> Vec<usize> {
    (0..16).filter(|&i| world.tile(i).unwrap().is_blocked()).collect()
}

#[test]
fn test_single_occupant_blocks_only_itself() {
    let mut record = WorldRecord::empty("small", 4, 4);
    record.set_tile(1, 1, 7);
    let world = TileWorld::new(record, catalog()).unwrap();

    assert_eq!(world.tile(5).unwrap().blocked_by, Some(5));
    assert_eq!(blocked(&world), vec![5]);
    assert_eq!(world.blocked_count(), 1);

    let path = world.path_between((0, 0), (3, 3));
    assert!(!path.is_empty());
    assert!(path.len() <= 6, "path too long: {path:?}");
    assert_eq!(path.last(), Some(&15));
    assert!(!path.contains(&5));
    assert!(!path.contains(&0), "start cell is not part of the path");
}

#[test]
fn test_footprint_extends_up_and_left() {
    let mut record = WorldRecord::empty("house", 4, 4);
    record.set_tile(2, 2, 8);
    let world = TileWorld::new(record, catalog()).unwrap();

    // Origin at (2,2) covers (1..=2, 1..=2).
    assert_eq!(blocked(&world), vec![5, 6, 9, 10]);
    for i in [5, 6, 9, 10] {
        assert_eq!(world.tile(i).unwrap().blocked_by, Some(10));
    }
}

#[test]
fn test_footprint_is_clipped_at_the_edge() {
    let mut record = WorldRecord::empty("edge", 4, 4);
    record.set_tile(0, 0, 8);
    let world = TileWorld::new(record, catalog()).unwrap();
    assert_eq!(blocked(&world), vec![0]);
}

#[test]
fn test_update_tile_merge_controls_blocking() {
    let record = WorldRecord::empty("edit", 4, 4);
    let mut world = TileWorld::new(record, catalog()).unwrap();

    assert!(world.update_tile(5, 7, false));
    assert!(blocked(&world).is_empty(), "without merge the grid is stale");
    assert!(!world.path_between((0, 1), (2, 1)).is_empty());

    assert!(world.update_tile(6, 7, true));
    assert_eq!(blocked(&world), vec![5, 6]);
    assert!(!world.update_tile(99, 7, true));
}

#[test]
fn test_walled_off_target_has_no_path() {
    let mut record = WorldRecord::empty("walled", 4, 4);
    for (gx, gz) in [(2, 3), (3, 2), (2, 2)] {
        record.set_tile(gx, gz, 7);
    }
    let world = TileWorld::new(record, catalog()).unwrap();
    assert!(world.path_between((0, 0), (3, 3)).is_empty());
    assert!(world.path_to_tile((0, 0), 99).is_empty());
}

#[test]
fn test_random_free_tiles_are_free() {
    let world = TileWorld::with_sheet(demo::demo_record("rand", 24, 16, 3), &demo::demo_sheet()).unwrap();
    let mut rng = SimpleRng::new(99);
    for _ in 0..50 {
        let i = world.random_free_tile(&mut rng).unwrap();
        assert!(!world.tile(i).unwrap().is_blocked());

        let near = world.random_free_tile_near((2, 2), 4, &mut rng).unwrap();
        let tile = world.tile(near).unwrap();
        assert!(tile.gx <= 4 && tile.gz <= 4);
    }
}

#[test]
fn test_camera_stays_inside_world() {
    let mut camera = Camera::new(320.0, 240.0, 1000.0, 800.0);
    camera.set_position(-50.0, 900.0);
    assert_eq!((camera.x_view(), camera.z_view()), (0.0, 560.0));

    // A view larger than the world is capped.
    camera.update_view_port_size(2000.0, 100.0);
    assert_eq!((camera.w_view(), camera.h_view()), (1000.0, 100.0));
    assert_eq!(camera.x_view(), 0.0);

    camera.update_world_size(500.0, 500.0);
    assert_eq!(camera.w_view(), 500.0);
    assert!(camera.viewport().within(&camera.world()));
}

#[test]
fn test_camera_dead_zone_follow() {
    let mut scene = tilescape::core::Scene::new();
    let target = scene.create(NodeBuilder::new().with_spatial(Spatial::new(0.0, 0.0, 10.0, 10.0)));

    let mut camera = Camera::new(300.0, 300.0, 3000.0, 3000.0);
    camera.follow(target, 100.0, 100.0, false);

    // Inside the dead zone nothing moves.
    camera.update_position(Some((150.0, 150.0)));
    assert_eq!((camera.x_view(), camera.z_view()), (0.0, 0.0));

    // Past the right/bottom margin the view scrolls to keep the margin.
    camera.update_position(Some((500.0, 260.0)));
    assert_eq!((camera.x_view(), camera.z_view()), (300.0, 60.0));

    // Horizontal-only cameras ignore vertical motion.
    camera.set_axis(Axis::Horizontal);
    camera.update_position(Some((500.0, 2000.0)));
    assert_eq!(camera.z_view(), 60.0);
}
