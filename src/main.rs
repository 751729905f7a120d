//! Terminal tile world runner (default binary).
//!
//! Opens the configured world (or a generated demo world) in the terminal,
//! puts the player in the top-left corner and a few wanderers around it.
//! It uses crossterm for input and the framebuffer-based terminal surface.
//!
//! | Input | Effect |
//! |-------|--------|
//! | W/A/S/D, arrows | walk and turn |
//! | mouse click | walk to the clicked tile |
//! | mouse drag | face the pointer |
//! | G | toggle the grid overlay |
//! | q, Ctrl+C | save and quit |

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use log::{info, warn};

use tilescape::core::{
    AssetCache, DirAssetProvider, JsonDirStore, NodeBuilder, PlayerController, SimpleRng, Spatial,
};
use tilescape::demo;
use tilescape::engine::{Engine, EngineConfig};
use tilescape::input::{apply_mouse_event, should_quit, CellScale, InputHandler};
use tilescape::term::{render_status, StatusInfo, TermSurface, TerminalRenderer};
use tilescape::types::{Color, Key};

const LAYER: &str = "world";
const DEMO_SIZE: (u32, u32) = (48, 32);
const WANDERERS: [(&str, Color); 3] = [
    ("wanderer-1", Color::BLUE),
    ("wanderer-2", Color::rgb(200, 80, 200)),
    ("wanderer-3", Color::rgb(80, 200, 200)),
];

#[tokio::main]
async fn main() -> Result<()> {
    let config = EngineConfig::from_env();
    init_logging(&config)?;

    let mut term = TerminalRenderer::new();
    term.enter()?;

    let result = run(&mut term, config).await;

    // Always try to restore terminal state.
    let _ = term.exit();
    result
}

/// Logs go to `TILESCAPE_LOG_PATH`; the terminal itself is the game screen.
fn init_logging(config: &EngineConfig) -> Result<()> {
    let Some(path) = &config.log_path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

async fn setup(config: EngineConfig, columns: u16, rows: u16) -> Result<Engine<TermSurface>> {
    let assets = AssetCache::new(Arc::new(DirAssetProvider::new(&config.assets_dir)));
    demo::install(&assets);
    let store = Arc::new(JsonDirStore::new(&config.save_dir));
    let seed = std::process::id();

    let mut engine = Engine::new(config, assets, store).with_seed(seed);
    engine.init().await?;
    engine.add_layer(LAYER, TermSurface::new(columns, rows)).await?;
    engine
        .load_world_with(LAYER, None, |id| {
            demo::demo_record(id, DEMO_SIZE.0, DEMO_SIZE.1, seed)
        })
        .await?;

    let mut player = Spatial::new(0.0, 0.0, 24.0, 24.0).with_color(Color::YELLOW);
    let mut wanderers = Vec::new();
    if let Some(world) = engine.layer(LAYER).and_then(|l| l.world()) {
        player.set_position_by_grid(1, 1, 0.0, world);

        let mut rng = SimpleRng::new(seed);
        for (id, color) in WANDERERS {
            let Some(tile) = world.random_free_tile(&mut rng).and_then(|i| world.tile(i)) else {
                continue;
            };
            let mut spatial = demo::wanderer(color, 8);
            spatial.set_position_by_grid(tile.gx, tile.gz, 0.0, world);
            wanderers.push((id, spatial));
        }
    }

    let player = engine
        .spawn(
            LAYER,
            NodeBuilder::new()
                .with_id("player")
                .with_spatial(player)
                .with_behavior(PlayerController::new()),
        )
        .await?;
    engine.set_player_self(LAYER, player, true)?;

    for (id, spatial) in wanderers {
        engine
            .spawn(LAYER, NodeBuilder::new().with_id(id).with_spatial(spatial))
            .await?;
    }

    info!("scene ready with {} nodes", engine.scene().len());
    Ok(engine)
}

async fn run(term: &mut TerminalRenderer, config: EngineConfig) -> Result<()> {
    let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
    let tick_duration = config.tick_duration();
    let dev = config.dev;

    let mut engine = setup(config, w, h).await?;
    let mut input_handler = InputHandler::new();
    let scale = CellScale::new(tilescape::term::DEFAULT_UNIT_W, tilescape::term::DEFAULT_UNIT_H);

    let mut last_tick = Instant::now();
    let mut fps = 0.0f32;
    engine.start();

    while engine.is_running() {
        // Input with timeout until next tick.
        let timeout = tick_duration
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Press && should_quit(key) {
                        engine.stop();
                        continue;
                    }
                    let mapped = input_handler.handle_key_event(engine.input_mut(), key, Instant::now());
                    if mapped == Some(Key::G) && key.kind == KeyEventKind::Press {
                        if let Some(world) = engine.layer_mut(LAYER).and_then(|l| l.world_mut()) {
                            let options = world.options_mut();
                            options.draw_grid = !options.draw_grid;
                        }
                    }
                }
                Event::Mouse(mouse) => {
                    apply_mouse_event(engine.input_mut(), mouse, scale);
                }
                Event::Resize(columns, rows) => {
                    if let Some(layer) = engine.layer_mut(LAYER) {
                        layer.surface_mut().resize(columns, rows);
                    }
                    let (uw, uh) = (scale.unit_w, scale.unit_h);
                    engine.switch_resolution(columns as f32 * uw, rows as f32 * uh);
                    term.invalidate();
                }
                _ => {}
            }
        }

        // Tick.
        if last_tick.elapsed() >= tick_duration {
            last_tick = Instant::now();
            input_handler.update(engine.input_mut(), last_tick);

            let (dt, _) = engine.tick();
            if dt > 0.0 {
                fps = fps * 0.9 + (1.0 / dt) * 0.1;
            }

            let status = status_info(&engine, fps, dev);
            if let Some(layer) = engine.layer_mut(LAYER) {
                let fb = layer.surface_mut().framebuffer_mut();
                render_status(fb, &status);
                term.draw_swap(fb)?;
            }
        }
    }

    if let Err(e) = engine.save_world(LAYER).await {
        warn!("failed to save world: {e}");
    }
    engine.shutdown()?;
    Ok(())
}

fn status_info(engine: &Engine<TermSurface>, fps: f32, dev: bool) -> StatusInfo {
    let world = engine.layer(LAYER).and_then(|l| l.world());
    let player_cell = engine
        .player()
        .and_then(|p| engine.scene().get(p))
        .and_then(|n| n.spatial.as_ref())
        .map(|s| (s.position.gx, s.position.gz));

    StatusInfo {
        world: world.map(|w| w.id().to_string()),
        player_cell,
        selected_tile: world.and_then(|w| w.state().selected_tile),
        hover_tile: world.and_then(|w| w.state().hover_tile),
        fps,
        nodes: dev.then(|| engine.scene().len()),
        blocked: if dev { world.map(|w| w.blocked_count()) } else { None },
    }
}
