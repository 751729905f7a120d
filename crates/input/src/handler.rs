//! Held-key tracking for terminal environments.
//!
//! Supports terminals that do not emit key release events by using a timeout:
//! auto-repeat keeps refreshing a held key, and a key that has not been seen
//! for longer than the timeout is released.

use std::time::{Duration, Instant};

use arrayvec::ArrayVec;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::map::map_key;
use crate::types::{InputState, Key};

// Long enough to bridge the initial auto-repeat delay of most terminals.
const DEFAULT_KEY_RELEASE_TIMEOUT_MS: u32 = 150;

const MAX_HELD: usize = Key::ALL.len();

/// Tracks when each held key was last seen.
#[derive(Debug, Clone)]
pub struct InputHandler {
    held: ArrayVec<(Key, Instant), MAX_HELD>,
    key_release_timeout_ms: u32,
    release_events_seen: bool,
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHandler {
    pub fn new() -> Self {
        Self {
            held: ArrayVec::new(),
            key_release_timeout_ms: DEFAULT_KEY_RELEASE_TIMEOUT_MS,
            release_events_seen: false,
        }
    }

    pub fn with_key_release_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.key_release_timeout_ms = timeout_ms;
        self
    }

    pub fn key_release_timeout_ms(&self) -> u32 {
        self.key_release_timeout_ms
    }

    /// Keys currently considered held.
    pub fn held(&self) -> impl Iterator<Item = Key> + '_ {
        self.held.iter().map(|(k, _)| *k)
    }

    /// Feed a terminal key event. Returns the engine key it mapped to.
    pub fn handle_key_event(&mut self, input: &mut InputState, event: KeyEvent, now: Instant) -> Option<Key> {
        match event.kind {
            KeyEventKind::Press | KeyEventKind::Repeat => self.handle_key_press(input, event.code, now),
            KeyEventKind::Release => {
                self.release_events_seen = true;
                self.handle_key_release(input, event.code)
            }
        }
    }

    pub fn handle_key_press(&mut self, input: &mut InputState, code: KeyCode, now: Instant) -> Option<Key> {
        let key = map_key(code)?;
        match self.held.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = now,
            None => {
                let _ = self.held.try_push((key, now));
            }
        }
        input.press(key);
        Some(key)
    }

    pub fn handle_key_release(&mut self, input: &mut InputState, code: KeyCode) -> Option<Key> {
        let key = map_key(code)?;
        self.held.retain(|(k, _)| *k != key);
        input.release(key);
        Some(key)
    }

    /// Release keys not seen for longer than the timeout.
    ///
    /// Once the terminal has delivered a real release event the timeout is no
    /// longer needed and nothing is auto-released.
    pub fn update(&mut self, input: &mut InputState, now: Instant) -> ArrayVec<Key, MAX_HELD> {
        let mut released = ArrayVec::new();
        if self.release_events_seen {
            return released;
        }
        let timeout = Duration::from_millis(self.key_release_timeout_ms as u64);
        self.held.retain(|(key, seen)| {
            if now.saturating_duration_since(*seen) > timeout {
                released.push(*key);
                false
            } else {
                true
            }
        });
        for &key in &released {
            input.release(key);
        }
        released
    }
}
