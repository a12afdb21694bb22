//! Movement intent component.
//!
//! Intents carry the desired movement from player input or AI. The controller
//! systems read them each fixed tick; edge detection for the jump and dash
//! buttons is handled by the controller.

use bevy::prelude::*;

/// Desired movement of a rolling character.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_roller_controller::prelude::*;
///
/// let mut intent = MovementIntent::new();
/// intent.set_direction(Vec3::new(2.0, 0.0, 0.0));
/// assert!(intent.is_moving());
/// assert_eq!(intent.direction, Vec3::X);
///
/// intent.clear();
/// assert!(!intent.is_moving());
/// ```
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct MovementIntent {
    /// Desired direction in world space, length at most 1.
    ///
    /// Expressed on the horizontal plane (perpendicular to gravity); the
    /// controller rotates it onto slopes.
    pub direction: Vec3,
    /// Camera forward direction, used by dashes without directional input.
    pub camera_forward: Vec3,
    /// Whether the jump button is held.
    ///
    /// Set every frame. The controller arms a jump when this goes from
    /// `false` to `true` and evaluates the jump cutoff when it goes back.
    pub jump_pressed: bool,
    /// Whether the dash button is held.
    pub dash_pressed: bool,
    pub(crate) jump_pressed_prev: bool,
    pub(crate) dash_pressed_prev: bool,
}

impl MovementIntent {
    /// Create a new empty movement intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the desired direction. Longer vectors are clamped to unit length.
    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = if direction.is_finite() {
            direction.clamp_length_max(1.0)
        } else {
            Vec3::ZERO
        };
    }

    /// Set the camera forward direction.
    pub fn set_camera_forward(&mut self, forward: Vec3) {
        self.camera_forward = forward.normalize_or_zero();
    }

    /// Clear the desired direction.
    pub fn clear(&mut self) {
        self.direction = Vec3::ZERO;
    }

    /// Check if there is directional input.
    pub fn is_moving(&self) -> bool {
        self.direction.length_squared() > 1.0e-6
    }

    /// Set the jump button state.
    ///
    /// ```rust,ignore
    /// intent.set_jump_pressed(keyboard.pressed(KeyCode::Space));
    /// ```
    pub fn set_jump_pressed(&mut self, pressed: bool) {
        self.jump_pressed = pressed;
    }

    /// Check if jump is currently held.
    pub fn is_jump_pressed(&self) -> bool {
        self.jump_pressed
    }

    /// Set the dash button state.
    pub fn set_dash_pressed(&mut self, pressed: bool) {
        self.dash_pressed = pressed;
    }

    /// Check if dash is currently held.
    pub fn is_dash_pressed(&self) -> bool {
        self.dash_pressed
    }

    /// Jump went from released to held since the last tick.
    pub fn jump_just_pressed(&self) -> bool {
        self.jump_pressed && !self.jump_pressed_prev
    }

    /// Jump went from held to released since the last tick.
    pub fn jump_just_released(&self) -> bool {
        !self.jump_pressed && self.jump_pressed_prev
    }

    /// Dash went from released to held since the last tick.
    pub fn dash_just_pressed(&self) -> bool {
        self.dash_pressed && !self.dash_pressed_prev
    }

    /// Remember the button states for next tick's edge detection.
    pub(crate) fn latch(&mut self) {
        self.jump_pressed_prev = self.jump_pressed;
        self.dash_pressed_prev = self.dash_pressed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_intent_new() {
        let intent = MovementIntent::new();
        assert_eq!(intent.direction, Vec3::ZERO);
        assert!(!intent.jump_pressed);
        assert!(!intent.jump_pressed_prev);
        assert!(!intent.dash_pressed);
    }

    #[test]
    fn set_direction_clamps_length() {
        let mut intent = MovementIntent::new();
        intent.set_direction(Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(intent.direction, Vec3::new(0.5, 0.0, 0.0));

        intent.set_direction(Vec3::new(3.0, 0.0, 4.0));
        assert!((intent.direction.length() - 1.0).abs() < 1e-6);

        intent.set_direction(Vec3::new(f32::NAN, 0.0, 0.0));
        assert_eq!(intent.direction, Vec3::ZERO);
    }

    #[test]
    fn is_moving_threshold() {
        let mut intent = MovementIntent::new();
        assert!(!intent.is_moving());

        intent.set_direction(Vec3::new(0.0, 0.0, 0.0001));
        assert!(!intent.is_moving());

        intent.set_direction(Vec3::Z);
        assert!(intent.is_moving());
    }

    #[test]
    fn jump_edges() {
        let mut intent = MovementIntent::new();
        intent.set_jump_pressed(true);
        assert!(intent.jump_just_pressed());
        assert!(!intent.jump_just_released());

        intent.latch();
        assert!(intent.is_jump_pressed());
        assert!(!intent.jump_just_pressed());

        intent.set_jump_pressed(false);
        assert!(intent.jump_just_released());

        intent.latch();
        assert!(!intent.jump_just_released());
    }

    #[test]
    fn dash_edges() {
        let mut intent = MovementIntent::new();
        intent.set_dash_pressed(true);
        assert!(intent.dash_just_pressed());
        intent.latch();
        assert!(intent.is_dash_pressed());
        assert!(!intent.dash_just_pressed());
    }

    #[test]
    fn camera_forward_is_normalized() {
        let mut intent = MovementIntent::new();
        intent.set_camera_forward(Vec3::new(0.0, 0.0, -5.0));
        assert_eq!(intent.camera_forward, Vec3::NEG_Z);
    }
}
