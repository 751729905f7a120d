//! Per-frame input state shared between the input source and the scene.
//!
//! Keys are tracked as two bitsets: keys currently held down, and keys released
//! since the last frame. Pointer gestures keep the last down/move/up/click
//! position in screen coordinates. `InputState::clear` drops the transient part
//! (released keys, move, up, click) after every update pass.

/// Keys the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Key {
    Up = 0,
    Down,
    Left,
    Right,
    W,
    A,
    S,
    D,
    G,
    Space,
    Enter,
    Escape,
    Backspace,
    Delete,
    Ctrl,
}

impl Key {
    pub const ALL: [Key; 15] = [
        Key::Up,
        Key::Down,
        Key::Left,
        Key::Right,
        Key::W,
        Key::A,
        Key::S,
        Key::D,
        Key::G,
        Key::Space,
        Key::Enter,
        Key::Escape,
        Key::Backspace,
        Key::Delete,
        Key::Ctrl,
    ];

    #[inline]
    fn bit(self) -> u32 {
        1u32 << (self as u8)
    }

    /// Parse a key name (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "up" => Some(Key::Up),
            "down" => Some(Key::Down),
            "left" => Some(Key::Left),
            "right" => Some(Key::Right),
            "w" => Some(Key::W),
            "a" => Some(Key::A),
            "s" => Some(Key::S),
            "d" => Some(Key::D),
            "g" => Some(Key::G),
            "space" => Some(Key::Space),
            "enter" => Some(Key::Enter),
            "escape" => Some(Key::Escape),
            "backspace" => Some(Key::Backspace),
            "delete" => Some(Key::Delete),
            "ctrl" => Some(Key::Ctrl),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Key::Up => "up",
            Key::Down => "down",
            Key::Left => "left",
            Key::Right => "right",
            Key::W => "w",
            Key::A => "a",
            Key::S => "s",
            Key::D => "d",
            Key::G => "g",
            Key::Space => "space",
            Key::Enter => "enter",
            Key::Escape => "escape",
            Key::Backspace => "backspace",
            Key::Delete => "delete",
            Key::Ctrl => "ctrl",
        }
    }
}

/// Compact set of keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeySet(u32);

impl KeySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, key: Key) {
        self.0 |= key.bit();
    }

    pub fn remove(&mut self, key: Key) {
        self.0 &= !key.bit();
    }

    pub fn contains(&self, key: Key) -> bool {
        self.0 & key.bit() != 0
    }

    /// True if any of `keys` is in the set.
    pub fn any(&self, keys: &[Key]) -> bool {
        keys.iter().any(|&k| self.contains(k))
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = Key> + '_ {
        Key::ALL.into_iter().filter(move |&k| self.contains(k))
    }
}

/// Pointer position in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerPoint {
    pub x: f32,
    pub y: f32,
}

impl PointerPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Last pointer gesture positions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    pub down: Option<PointerPoint>,
    pub moved: Option<PointerPoint>,
    pub up: Option<PointerPoint>,
    pub click: Option<PointerPoint>,
}

/// Input snapshot consumed by one update pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputState {
    pub keys_down: KeySet,
    pub keys_released: KeySet,
    pub pointer: PointerState,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: Key) {
        self.keys_down.insert(key);
    }

    pub fn release(&mut self, key: Key) {
        if self.keys_down.contains(key) {
            self.keys_down.remove(key);
            self.keys_released.insert(key);
        }
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.keys_down.contains(key)
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.pointer.down = Some(PointerPoint::new(x, y));
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.pointer.moved = Some(PointerPoint::new(x, y));
    }

    /// Releasing the pointer ends the drag; the position becomes `up`.
    pub fn pointer_up(&mut self, x: f32, y: f32) {
        self.pointer.down = None;
        self.pointer.moved = None;
        self.pointer.up = Some(PointerPoint::new(x, y));
    }

    pub fn pointer_click(&mut self, x: f32, y: f32) {
        self.pointer.down = None;
        self.pointer.moved = None;
        self.pointer.click = Some(PointerPoint::new(x, y));
    }

    /// True while the pointer is held and has moved since it went down.
    pub fn is_dragging(&self) -> bool {
        self.pointer.down.is_some() && self.pointer.moved.is_some()
    }

    /// Drop per-frame state. Held keys and the pointer-down position survive.
    pub fn clear(&mut self) {
        self.keys_released.clear();
        self.pointer.click = None;
        self.pointer.up = None;
        self.pointer.moved = None;
    }
}
