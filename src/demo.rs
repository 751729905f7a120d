//! Built-in demo content.
//!
//! A procedurally drawn tile sheet and a seeded world layout, so the binary,
//! the benchmarks and the integration tests run without asset files.

use std::sync::Arc;

use crate::core::{Asset, AssetCache, BehaviorParams, Image, SimpleRng, Spatial, TileSheet};
use crate::types::{Color, FrameRect, TileCatalog, TileDef, WorldRecord};

/// Catalog name of the built-in sheet. New worlds use it by default.
pub const DEMO_SHEET: &str = "tiles";
pub const DEMO_BACKGROUND: &str = "demo-background.png";

pub const ROCK: u32 = 1;
pub const TREE: u32 = 2;
pub const HOUSE: u32 = 3;

const SHEET_W: u32 = 128;
const SHEET_H: u32 = 64;

/// Rock, tree and a 2x2 house on one 128x64 sheet.
pub fn demo_sheet() -> TileSheet {
    let mut pixels = vec![Color::default(); (SHEET_W * SHEET_H) as usize];
    let mut paint = |x0: u32, y0: u32, w: u32, h: u32, f: &dyn Fn(u32, u32) -> Option<Color>| {
        for y in 0..h {
            for x in 0..w {
                if let Some(c) = f(x, y) {
                    pixels[((y0 + y) * SHEET_W + x0 + x) as usize] = c;
                }
            }
        }
    };

    paint(0, 0, 32, 32, &|x, y| {
        let edge = x < 2 || y < 2 || x > 29 || y > 29;
        Some(if edge { Color::rgb(90, 90, 90) } else { Color::rgb(140, 140, 140) })
    });
    paint(32, 0, 32, 32, &|x, y| {
        let (dx, dy) = (x as i32 - 16, y as i32 - 12);
        if dx * dx + dy * dy < 120 {
            Some(Color::rgb(30, 120, 40))
        } else if (14..18).contains(&x) && y >= 20 {
            Some(Color::rgb(100, 60, 20))
        } else {
            None
        }
    });
    paint(64, 0, 64, 64, &|x, y| {
        if y < 24 {
            let half = y + 8;
            (x + half >= 32 && x <= 31 + half).then_some(Color::rgb(170, 40, 30))
        } else if (26..38).contains(&x) && y >= 44 {
            Some(Color::rgb(70, 40, 15))
        } else {
            Some(Color::rgb(200, 180, 140))
        }
    });

    let image = Image::from_pixels(DEMO_SHEET, SHEET_W, SHEET_H, pixels);
    let catalog = TileCatalog::new(vec![
        TileDef::new(ROCK).with_frame(FrameRect { x: 0, y: 0, w: 32, h: 32 }),
        TileDef::new(TREE).with_frame(FrameRect { x: 32, y: 0, w: 32, h: 32 }),
        TileDef::new(HOUSE)
            .with_frame(FrameRect { x: 64, y: 0, w: 64, h: 64 })
            .with_footprint(2, 2),
    ]);
    TileSheet {
        name: DEMO_SHEET.to_string(),
        catalog,
        image: Arc::new(image),
    }
}

/// Make the built-in sheet and background loadable through `assets`.
pub fn install(assets: &AssetCache) {
    assets.insert(DEMO_SHEET, Asset::TileSheet(Arc::new(demo_sheet())));
    let grass = Image::solid(DEMO_BACKGROUND, 1, 1, Color::rgb(34, 60, 30));
    assets.insert(DEMO_BACKGROUND, Asset::Image(Arc::new(grass)));
}

/// Seeded layout of rocks, trees and houses. The top-left 4x4 cells stay free.
pub fn demo_record(id: &str, width: u32, height: u32, seed: u32) -> WorldRecord {
    let mut record = WorldRecord::empty(id, width, height);
    record.tile_catalog = DEMO_SHEET.to_string();
    record.background_image = Some(DEMO_BACKGROUND.to_string());

    let mut rng = SimpleRng::new(seed);
    for gz in 0..height {
        for gx in 0..width {
            if gx < 4 && gz < 4 {
                continue;
            }
            let roll = rng.next_range(100);
            let id = match roll {
                0..=3 => ROCK,
                4..=10 => TREE,
                11 if gx > 0 && gz > 0 && (gx > 4 || gz > 4) => HOUSE,
                _ => continue,
            };
            record.set_tile(gx, gz, id);
        }
    }
    record
}

/// Spatial component of an entity that wanders around its neighborhood.
pub fn wanderer(color: Color, move_radius: u32) -> Spatial {
    let params = BehaviorParams {
        move_radius,
        move_delay_ms: 4000,
        speed: 80.0,
        ..BehaviorParams::default()
    };
    Spatial::new(0.0, 0.0, 24.0, 24.0).with_params(params).with_color(color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TileWorld;

    #[test]
    fn demo_sheet_frames_fit_the_image() {
        let sheet = demo_sheet();
        for def in &sheet.catalog.tiles {
            let frame = def.frame.unwrap();
            assert!(frame.x + frame.w <= sheet.image.width());
            assert!(frame.y + frame.h <= sheet.image.height());
        }
        assert_eq!(sheet.catalog.find(HOUSE).unwrap().footprint(), (2, 2));
    }

    #[test]
    fn demo_world_keeps_start_free_and_is_seeded() {
        let record = demo_record("demo", 20, 15, 7);
        assert_eq!(record, demo_record("demo", 20, 15, 7));

        let world = TileWorld::with_sheet(record, &demo_sheet()).unwrap();
        for gz in 0..3 {
            for gx in 0..3 {
                assert!(!world.tile_at_grid(gx, gz).unwrap().is_blocked());
            }
        }
        assert!(world.blocked_count() > 0);
    }
}
