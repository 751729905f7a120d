//! One-row status line drawn over the bottom of the frame.

use crate::fb::{CellStyle, FrameBuffer, Rgb};

const STATUS_BG: Rgb = Rgb::new(30, 30, 40);
const STATUS_FG: Rgb = Rgb::new(200, 200, 200);
const DEV_FG: Rgb = Rgb::new(240, 200, 80);

/// What the status line shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusInfo {
    pub world: Option<String>,
    /// Grid cell of the player
    pub player_cell: Option<(u32, u32)>,
    pub selected_tile: Option<usize>,
    pub hover_tile: Option<usize>,
    pub fps: f32,
    /// Dev mode extras
    pub nodes: Option<usize>,
    pub blocked: Option<usize>,
}

impl StatusInfo {
    pub fn text(&self) -> String {
        let mut parts = vec![format!("world {}", self.world.as_deref().unwrap_or("-"))];
        if let Some((gx, gz)) = self.player_cell {
            parts.push(format!("at {gx},{gz}"));
        }
        if let Some(tile) = self.selected_tile {
            parts.push(format!("selected #{tile}"));
        }
        if let Some(tile) = self.hover_tile {
            parts.push(format!("hover #{tile}"));
        }
        parts.push(format!("{:.0} fps", self.fps));
        parts.push("q quit".to_string());
        parts.join(" | ")
    }

    fn dev_text(&self) -> Option<String> {
        match (self.nodes, self.blocked) {
            (None, None) => None,
            (nodes, blocked) => Some(format!(
                "nodes {} blocked {}",
                nodes.map_or("-".to_string(), |n| n.to_string()),
                blocked.map_or("-".to_string(), |n| n.to_string())
            )),
        }
    }
}

/// Draw the status line on the last row of `fb`.
pub fn render_status(fb: &mut FrameBuffer, info: &StatusInfo) {
    let Some(row) = fb.height().checked_sub(1) else {
        return;
    };
    let style = CellStyle::new(STATUS_FG, STATUS_BG);
    let area = fb.clip(0, row as i32, fb.width() as i32, row as i32 + 1);
    fb.fill_rect(area, ' ', style);
    fb.put_str(1, row, &info.text(), STATUS_FG);

    if let Some(dev) = info.dev_text() {
        let len = dev.chars().count() as u16;
        if len + 2 < fb.width() {
            fb.put_str(fb.width() - len - 1, row, &dev, DEV_FG);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_text(fb: &FrameBuffer, y: u16) -> String {
        (0..fb.width()).filter_map(|x| fb.get(x, y)).map(|c| c.ch).collect()
    }

    #[test]
    fn text_lists_known_fields() {
        let info = StatusInfo {
            world: Some("island".to_string()),
            player_cell: Some((3, 4)),
            selected_tile: Some(12),
            fps: 59.6,
            ..StatusInfo::default()
        };
        assert_eq!(info.text(), "world island | at 3,4 | selected #12 | 60 fps | q quit");
    }

    #[test]
    fn renders_on_last_row() {
        let mut fb = FrameBuffer::new(80, 3);
        let info = StatusInfo {
            nodes: Some(7),
            ..StatusInfo::default()
        };
        render_status(&mut fb, &info);

        assert!(row_text(&fb, 2).starts_with(" world -"));
        assert!(row_text(&fb, 2).trim_end().ends_with("nodes 7 blocked -"));
        assert_eq!(fb.get(0, 2).unwrap().style.bg, STATUS_BG);
        assert_eq!(fb.get(0, 1).unwrap().style.bg, Rgb::new(0, 0, 0));
    }

    #[test]
    fn empty_buffer_is_ignored() {
        let mut fb = FrameBuffer::new(0, 0);
        render_status(&mut fb, &StatusInfo::default());
    }
}
