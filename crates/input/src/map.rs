//! Mapping from terminal events to engine input.

use crate::types::{InputState, Key};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

/// Map a terminal key to an engine key.
pub fn map_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Left => Some(Key::Left),
        KeyCode::Right => Some(Key::Right),
        KeyCode::Char('w') | KeyCode::Char('W') => Some(Key::W),
        KeyCode::Char('a') | KeyCode::Char('A') => Some(Key::A),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(Key::S),
        KeyCode::Char('d') | KeyCode::Char('D') => Some(Key::D),
        KeyCode::Char('g') | KeyCode::Char('G') => Some(Key::G),
        KeyCode::Char(' ') => Some(Key::Space),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Esc => Some(Key::Escape),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Delete => Some(Key::Delete),
        _ => None,
    }
}

/// Check if key should quit the engine.
pub fn should_quit(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q'))
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

/// Size of one terminal cell in surface units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellScale {
    pub unit_w: f32,
    pub unit_h: f32,
}

impl CellScale {
    pub fn new(unit_w: f32, unit_h: f32) -> Self {
        Self { unit_w, unit_h }
    }

    /// Center of cell `(column, row)` in surface units.
    pub fn to_surface(&self, column: u16, row: u16) -> (f32, f32) {
        (
            (column as f32 + 0.5) * self.unit_w,
            (row as f32 + 0.5) * self.unit_h,
        )
    }
}

/// Apply a left-button mouse event to `input`.
///
/// A release is reported both as pointer up and as a click. Returns `false`
/// for events the engine ignores (other buttons, scrolling).
pub fn apply_mouse_event(input: &mut InputState, event: MouseEvent, scale: CellScale) -> bool {
    let (x, y) = scale.to_surface(event.column, event.row);
    match event.kind {
        MouseEventKind::Down(MouseButton::Left) => input.pointer_down(x, y),
        MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => input.pointer_move(x, y),
        MouseEventKind::Up(MouseButton::Left) => {
            input.pointer_up(x, y);
            input.pointer_click(x, y);
        }
        _ => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_movement_keys() {
        assert_eq!(map_key(KeyCode::Left), Some(Key::Left));
        assert_eq!(map_key(KeyCode::Char('W')), Some(Key::W));
        assert_eq!(map_key(KeyCode::Char('d')), Some(Key::D));
        assert_eq!(map_key(KeyCode::Char('x')), None);
    }

    #[test]
    fn test_quit_keys() {
        assert!(should_quit(KeyEvent::from(KeyCode::Char('q'))));
        assert!(should_quit(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        )));
        assert!(!should_quit(KeyEvent::from(KeyCode::Char('x'))));
    }

    #[test]
    fn test_drag_then_release() {
        let scale = CellScale::new(8.0, 16.0);
        let mut input = InputState::new();

        assert!(apply_mouse_event(&mut input, mouse(MouseEventKind::Down(MouseButton::Left), 1, 1), scale));
        assert!(apply_mouse_event(&mut input, mouse(MouseEventKind::Drag(MouseButton::Left), 3, 2), scale));
        assert!(input.is_dragging());

        apply_mouse_event(&mut input, mouse(MouseEventKind::Up(MouseButton::Left), 3, 2), scale);
        assert!(!input.is_dragging());
        let up = input.pointer.up.unwrap();
        assert_eq!((up.x, up.y), (28.0, 40.0));
        assert_eq!(input.pointer.click, input.pointer.up);
    }

    #[test]
    fn test_other_buttons_ignored() {
        let mut input = InputState::new();
        let scale = CellScale::new(1.0, 1.0);
        assert!(!apply_mouse_event(&mut input, mouse(MouseEventKind::Down(MouseButton::Right), 0, 0), scale));
        assert!(!apply_mouse_event(&mut input, mouse(MouseEventKind::ScrollUp, 0, 0), scale));
        assert!(input.pointer.down.is_none());
    }
}
