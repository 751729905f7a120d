//! Local player steering.

use tilescape_types::{Key, TURN_RATE_DIVISOR};

use crate::behavior::{Behavior, SceneCommand, UpdateContext};
use crate::entity::{wrap_angle, Spatial};
use crate::scene::Node;

const TURN_LEFT: [Key; 2] = [Key::A, Key::Left];
const TURN_RIGHT: [Key; 2] = [Key::D, Key::Right];
const FORWARD: [Key; 2] = [Key::W, Key::Up];
const BACKWARD: [Key; 2] = [Key::S, Key::Down];

/// Drives the entity marked `is_self` from keyboard and pointer input.
///
/// | Input | Effect |
/// |-------|--------|
/// | A / Left, D / Right | turn by `speed / 2000` rad per tick |
/// | W / Up, S / Down | walk `speed * dt` along the facing angle |
/// | pointer drag | face the pointer |
/// | pointer release on a free selected tile | walk there along a path, highlight the tile |
///
/// Any steering key cancels the current path.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerController;

impl PlayerController {
    pub fn new() -> Self {
        Self
    }

    /// Returns `true` if any steering key was held.
    fn check_keyboard(spatial: &mut Spatial, ctx: &UpdateContext<'_>) -> bool {
        let keys = &ctx.input.keys_down;
        let speed = spatial.params.speed;
        let step = speed * ctx.dt;
        let mut steered = false;

        if keys.any(&TURN_LEFT) {
            spatial.position.r = wrap_angle(spatial.position.r - speed / TURN_RATE_DIVISOR);
            steered = true;
        }
        if keys.any(&TURN_RIGHT) {
            spatial.position.r = wrap_angle(spatial.position.r + speed / TURN_RATE_DIVISOR);
            steered = true;
        }
        if keys.any(&FORWARD) {
            spatial.position.x += step * spatial.position.r.cos();
            spatial.position.z += step * spatial.position.r.sin();
            steered = true;
        }
        if keys.any(&BACKWARD) {
            spatial.position.x -= step * spatial.position.r.cos();
            spatial.position.z -= step * spatial.position.r.sin();
            steered = true;
        }

        if steered {
            spatial.unset_move_to();
            spatial.is_moving = true;
        }
        steered
    }

    fn check_pointer(spatial: &mut Spatial, ctx: &mut UpdateContext<'_>) {
        let (Some(world), Some(camera)) = (ctx.world, ctx.camera) else {
            return;
        };
        let pointer = ctx.input.pointer;

        if ctx.input.is_dragging() {
            if let Some(at) = pointer.moved {
                spatial.is_moving = true;
                spatial.face_direction_by_screen(at.x, at.y, camera, ctx.scale);
            }
            return;
        }

        if pointer.up.is_none() {
            return;
        }
        let Some(selected) = world.state().selected_tile else {
            return;
        };
        let free = world.tile(selected).is_some_and(|t| !t.is_blocked());
        if free && spatial.move_to_tile(world, selected) {
            ctx.push(SceneCommand::SetHighlight(selected));
        }
    }
}

impl Behavior for PlayerController {
    fn on_update(&mut self, node: &mut Node, ctx: &mut UpdateContext<'_>) {
        let Some(spatial) = node.spatial.as_mut() else {
            return;
        };
        if !spatial.is_self {
            return;
        }

        if spatial.move_path.is_empty() {
            spatial.is_moving = false;
        }
        if Self::check_keyboard(spatial, ctx) {
            ctx.push(SceneCommand::UnsetHighlight);
        }
        Self::check_pointer(spatial, ctx);
    }
}
