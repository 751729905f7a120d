use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tilescape::core::{AssetCache, MemoryWorldStore, NodeBuilder, RecordingSurface, SimpleRng, TileWorld};
use tilescape::demo;
use tilescape::engine::{Engine, EngineConfig};

fn demo_world(width: u32, height: u32) -> TileWorld {
    TileWorld::with_sheet(demo::demo_record("bench", width, height, 12345), &demo::demo_sheet())
        .expect("demo world")
}

fn bench_generate(c: &mut Criterion) {
    let mut world = demo_world(128, 128);
    c.bench_function("generate_128x128", |b| {
        b.iter(|| {
            world.generate();
        })
    });
}

fn bench_update_blocked(c: &mut Criterion) {
    let mut world = demo_world(128, 128);
    c.bench_function("update_blocked_tiles_128x128", |b| {
        b.iter(|| {
            world.update_blocked_tiles();
        })
    });
}

fn bench_path(c: &mut Criterion) {
    let world = demo_world(128, 128);
    let mut rng = SimpleRng::new(7);
    let targets: Vec<(u32, u32)> = (0..32)
        .filter_map(|_| world.random_free_tile(&mut rng))
        .filter_map(|i| world.tile(i).map(|t| (t.gx, t.gz)))
        .collect();

    c.bench_function("path_between_128x128", |b| {
        let mut i = 0;
        b.iter(|| {
            let to = targets[i % targets.len()];
            i += 1;
            black_box(world.path_between(black_box((0, 0)), to));
        })
    });
}

fn bench_engine_tick(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    let mut engine = rt.block_on(async {
        let assets = AssetCache::empty();
        demo::install(&assets);
        let mut engine = Engine::new(EngineConfig::default(), assets, Arc::new(MemoryWorldStore::new()));
        engine.init().await.expect("init");
        engine
            .add_layer("world", RecordingSurface::new(800.0, 600.0))
            .await
            .expect("layer");
        engine
            .load_world_with("world", None, |id| demo::demo_record(id, 64, 64, 1))
            .await
            .expect("world");

        let mut spots = Vec::new();
        if let Some(world) = engine.layer("world").and_then(|l| l.world()) {
            let mut rng = SimpleRng::new(3);
            for _ in 0..50 {
                if let Some(tile) = world.random_free_tile(&mut rng).and_then(|i| world.tile(i)) {
                    let mut spatial = demo::wanderer(tilescape::types::Color::BLUE, 8);
                    spatial.set_position_by_grid(tile.gx, tile.gz, 0.0, world);
                    spots.push(spatial);
                }
            }
        }
        for spatial in spots {
            engine
                .spawn("world", NodeBuilder::new().with_spatial(spatial))
                .await
                .expect("spawn");
        }
        engine
    });

    let mut now = 0.0;
    c.bench_function("engine_tick_50_wanderers", |b| {
        b.iter(|| {
            now += 16.0;
            engine.tick_at(black_box(now));
            if let Some(layer) = engine.layer_mut("world") {
                layer.surface_mut().take_ops();
            }
        })
    });
}

criterion_group!(
    benches,
    bench_generate,
    bench_update_blocked,
    bench_path,
    bench_engine_tick
);
criterion_main!(benches);
