//! Multi-charge jumping.
//!
//! Jump requests only arm a flag; the jump itself is applied by the next
//! movement tick so it always happens inside the fixed physics step. Each
//! charge brings its own rise damping and cutoff behavior.

use bevy::prelude::*;

use crate::config::{ControllerConfig, JumpCharge};
use crate::movement::{split_velocity, up_from_gravity};
use crate::slope::terrain_angle;

/// Launch speed reaching `height` under gravity scaled by `gravity_damp_on_rise`.
///
/// `sqrt(2 * height * |g| * gravity_damp_on_rise)`.
#[inline]
pub fn jump_speed(height: f32, gravity_magnitude: f32, gravity_damp_on_rise: f32) -> f32 {
    (2.0 * height * gravity_magnitude * gravity_damp_on_rise).max(0.0).sqrt()
}

/// Result of applying a jump.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpLaunch {
    /// Velocity right after the launch.
    pub velocity: Vec3,
    /// Index of the consumed charge.
    pub charge: usize,
    /// Vertical launch speed along the jump normal.
    pub speed: f32,
}

/// Jump bookkeeping for one character.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct JumpState {
    /// Charges consumed since the last landing.
    pub count: usize,
    /// A jump was requested and will be applied on the next movement tick.
    pub pending: bool,
    /// The jump input was released early; the cutoff acceleration replaces rise damping.
    pub cutoff_pending: bool,
    /// Corrective acceleration applied while the cutoff is pending.
    pub cutoff_acceleration: Vec3,
    /// Planar speed at the last launch, clamped to the air profile's max speed.
    pub takeoff_speed: f32,
}

impl JumpState {
    /// Charges left before landing is required.
    #[inline]
    pub fn charges_left(&self, charges: &[JumpCharge]) -> usize {
        charges.len().saturating_sub(self.count)
    }

    /// Arm a jump if a charge remains. Returns whether a jump was armed.
    pub fn try_jump(&mut self, charges: &[JumpCharge]) -> bool {
        if self.count >= charges.len() {
            return false;
        }
        self.pending = true;
        self.cutoff_pending = false;
        true
    }

    /// Restore every charge (called when landing).
    pub fn reset_charges(&mut self) {
        self.count = 0;
    }

    /// Apply the pending jump to `velocity`.
    ///
    /// `ground_normal` is the resolved ground normal, or zero when there is
    /// none; airborne jumps then go straight up. The normal-aligned part of
    /// the velocity is replaced by the impulse only when the jump normal is
    /// at least `min_slope_angle` away from "up".
    pub fn apply(
        &mut self,
        velocity: Vec3,
        ground_normal: Vec3,
        config: &ControllerConfig,
        gravity: Vec3,
    ) -> Option<JumpLaunch> {
        self.pending = false;
        let charge = config.jump_charges.get(self.count).copied()?;

        let up = up_from_gravity(gravity);
        let jump_normal = match ground_normal.normalize_or_zero() {
            Vec3::ZERO => up,
            normal => normal,
        };

        let speed = jump_speed(charge.height, gravity.length(), charge.gravity_damp_on_rise);

        let angle = terrain_angle(jump_normal, up).unwrap_or(0.0);
        let mut launched = velocity;
        if angle >= config.min_slope_angle {
            launched -= jump_normal * velocity.dot(jump_normal);
        }
        launched += jump_normal * speed;

        let (planar, _) = split_velocity(velocity, up);
        self.takeoff_speed = planar.length().clamp(0.0, config.air.max_speed);

        let index = self.count;
        self.count += 1;

        Some(JumpLaunch {
            velocity: launched,
            charge: index,
            speed,
        })
    }

    /// Extra acceleration to apply this airborne tick.
    ///
    /// While rising: the pending cutoff correction, otherwise the rise damping
    /// `-gravity * (1 - gravity_damp_on_rise)` of the last consumed charge.
    /// Once the character stops rising the cutoff is cleared.
    pub fn rise_acceleration(
        &mut self,
        aligned_velocity: Vec3,
        charges: &[JumpCharge],
        gravity: Vec3,
    ) -> Vec3 {
        let up = up_from_gravity(gravity);

        if aligned_velocity.dot(up) <= 0.0 {
            self.cutoff_pending = false;
            return Vec3::ZERO;
        }

        if self.cutoff_pending {
            return self.cutoff_acceleration;
        }

        match self.count.checked_sub(1).and_then(|i| charges.get(i)) {
            Some(charge) => -gravity * (1.0 - charge.gravity_damp_on_rise),
            None => Vec3::ZERO,
        }
    }

    /// Evaluate the variable-height cutoff after an early jump release.
    ///
    /// Only has an effect while rising. Uses the most recently consumed charge
    /// (the first one if none was consumed yet).
    pub fn evaluate_cut_off(&mut self, velocity: Vec3, charges: &[JumpCharge], gravity: Vec3, dt: f32) {
        if charges.is_empty() || velocity.dot(gravity) >= 0.0 {
            return;
        }

        let index = self.count.clamp(1, charges.len()) - 1;
        let factor = charges[index].jump_cut_off_factor;

        let up = up_from_gravity(gravity);
        let rising_speed = velocity.dot(up).abs();
        let max_gravity = if dt > 0.0 { rising_speed / dt } else { f32::MAX };

        let reduced_gravity = (gravity * factor).clamp_length_max(max_gravity);
        let mut correction = reduced_gravity - gravity;
        // Floating point noise can flip the sign; never pull along gravity.
        if correction.dot(gravity) > 0.0 {
            correction = Vec3::ZERO;
        }

        self.cutoff_pending = true;
        self.cutoff_acceleration = correction;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAVITY: Vec3 = Vec3::new(0.0, -9.8, 0.0);

    fn two_charge_config() -> ControllerConfig {
        ControllerConfig::default()
            .with_slope_angles(0.0, 45.0)
            .with_jump_charges(vec![JumpCharge::new(5.0, 1.0, 1.0), JumpCharge::new(2.0, 0.5, 0.5)])
    }

    #[test]
    fn jump_speed_formula() {
        assert!((jump_speed(5.0, 9.8, 1.0) - 9.899_495).abs() < 1e-3);
        assert!((jump_speed(5.0, 9.8, 0.5) - 7.0).abs() < 1e-3);
    }

    #[test]
    fn try_jump_only_arms_with_charges_left() {
        let config = two_charge_config();
        let mut jump = JumpState::default();

        assert!(jump.try_jump(&config.jump_charges));
        assert!(jump.pending);
        jump.apply(Vec3::ZERO, Vec3::ZERO, &config, GRAVITY).unwrap();

        assert!(jump.try_jump(&config.jump_charges));
        jump.apply(Vec3::ZERO, Vec3::ZERO, &config, GRAVITY).unwrap();
        assert_eq!(jump.count, 2);
        assert_eq!(jump.charges_left(&config.jump_charges), 0);

        // Third request while still airborne does nothing.
        assert!(!jump.try_jump(&config.jump_charges));
        assert!(!jump.pending);

        jump.reset_charges();
        assert_eq!(jump.count, 0);
        assert!(jump.try_jump(&config.jump_charges));
    }

    #[test]
    fn try_jump_with_no_charges_is_ignored() {
        let config = ControllerConfig::default().with_jump_charges(Vec::new());
        let mut jump = JumpState::default();
        assert!(!jump.try_jump(&config.jump_charges));
        assert!(jump.apply(Vec3::ZERO, Vec3::Y, &config, GRAVITY).is_none());
    }

    #[test]
    fn try_jump_clears_pending_cutoff() {
        let mut jump = JumpState {
            cutoff_pending: true,
            ..default()
        };
        jump.try_jump(&[JumpCharge::default()]);
        assert!(!jump.cutoff_pending);
    }

    #[test]
    fn flat_jump_replaces_vertical_velocity() {
        let config = two_charge_config();
        let mut jump = JumpState::default();
        jump.try_jump(&config.jump_charges);

        let launch = jump
            .apply(Vec3::new(3.0, -1.0, 0.0), Vec3::Y, &config, GRAVITY)
            .unwrap();

        assert_eq!(launch.charge, 0);
        assert!((launch.velocity - Vec3::new(3.0, 9.899_495, 0.0)).length() < 1e-3);
        assert!((jump.takeoff_speed - 3.0).abs() < 1e-5);
        assert!(!jump.pending);
    }

    #[test]
    fn below_min_slope_angle_keeps_normal_velocity() {
        let config = two_charge_config().with_slope_angles(10.0, 45.0);
        let mut jump = JumpState::default();
        jump.try_jump(&config.jump_charges);

        let launch = jump
            .apply(Vec3::new(3.0, -1.0, 0.0), Vec3::Y, &config, GRAVITY)
            .unwrap();
        assert!((launch.velocity - Vec3::new(3.0, 8.899_495, 0.0)).length() < 1e-3);
    }

    #[test]
    fn slope_jump_follows_ground_normal() {
        let config = two_charge_config();
        let normal = Quat::from_rotation_z(30f32.to_radians()) * Vec3::Y;
        let mut jump = JumpState::default();
        jump.try_jump(&config.jump_charges);

        let velocity = Vec3::new(0.0, 0.0, 2.0);
        let launch = jump.apply(velocity, normal, &config, GRAVITY).unwrap();
        let along_normal = launch.velocity.dot(normal);
        assert!((along_normal - launch.speed).abs() < 1e-4);
        assert!((launch.velocity.z - 2.0).abs() < 1e-5);
    }

    #[test]
    fn airborne_jump_goes_up() {
        let config = two_charge_config();
        let mut jump = JumpState::default();
        jump.try_jump(&config.jump_charges);
        let launch = jump.apply(Vec3::ZERO, Vec3::ZERO, &config, GRAVITY).unwrap();
        assert!(launch.velocity.x.abs() < 1e-6);
        assert!(launch.velocity.y > 0.0);
    }

    #[test]
    fn takeoff_speed_is_clamped_to_air_max() {
        let config = two_charge_config();
        let mut jump = JumpState::default();
        jump.try_jump(&config.jump_charges);
        jump.apply(Vec3::new(100.0, 0.0, 0.0), Vec3::Y, &config, GRAVITY);
        assert_eq!(jump.takeoff_speed, config.air.max_speed);
    }

    #[test]
    fn rise_damping_uses_last_consumed_charge() {
        let config = two_charge_config();
        let mut jump = JumpState { count: 2, ..default() };

        let accel = jump.rise_acceleration(Vec3::new(0.0, 3.0, 0.0), &config.jump_charges, GRAVITY);
        // Second charge damps by 0.5: half of gravity compensated.
        assert!((accel - Vec3::new(0.0, 4.9, 0.0)).length() < 1e-5);

        // Falling: nothing.
        let accel = jump.rise_acceleration(Vec3::new(0.0, -3.0, 0.0), &config.jump_charges, GRAVITY);
        assert_eq!(accel, Vec3::ZERO);
    }

    #[test]
    fn no_rise_damping_before_any_jump() {
        let config = two_charge_config();
        let mut jump = JumpState::default();
        let accel = jump.rise_acceleration(Vec3::new(0.0, 3.0, 0.0), &config.jump_charges, GRAVITY);
        assert_eq!(accel, Vec3::ZERO);
    }

    #[test]
    fn cutoff_takes_priority_until_descent() {
        let config = two_charge_config();
        let mut jump = JumpState { count: 2, ..default() };

        jump.evaluate_cut_off(Vec3::new(0.0, 5.0, 0.0), &config.jump_charges, GRAVITY, 0.02);
        assert!(jump.cutoff_pending);
        // Factor 0.5: reduced gravity is half, correction points against gravity.
        assert!((jump.cutoff_acceleration - Vec3::new(0.0, 4.9, 0.0)).length() < 1e-5);

        let accel = jump.rise_acceleration(Vec3::new(0.0, 2.0, 0.0), &config.jump_charges, GRAVITY);
        assert_eq!(accel, jump.cutoff_acceleration);

        jump.rise_acceleration(Vec3::new(0.0, -0.1, 0.0), &config.jump_charges, GRAVITY);
        assert!(!jump.cutoff_pending);
    }

    #[test]
    fn cutoff_ignored_when_not_rising() {
        let config = two_charge_config();
        let mut jump = JumpState { count: 1, ..default() };
        jump.evaluate_cut_off(Vec3::new(0.0, -1.0, 0.0), &config.jump_charges, GRAVITY, 0.02);
        assert!(!jump.cutoff_pending);
    }

    #[test]
    fn cutoff_with_full_gravity_factor_is_zero() {
        let config = two_charge_config();
        let mut jump = JumpState { count: 1, ..default() };
        jump.evaluate_cut_off(Vec3::new(0.0, 5.0, 0.0), &config.jump_charges, GRAVITY, 0.02);
        assert!(jump.cutoff_pending);
        assert!(jump.cutoff_acceleration.length() < 1e-6);
    }

    #[test]
    fn cutoff_gravity_cannot_reverse_velocity_in_one_tick() {
        let config = ControllerConfig::default().with_jump_charges(vec![JumpCharge::new(2.0, 0.5, 1.0)]);
        let mut jump = JumpState { count: 1, ..default() };
        let velocity = Vec3::new(0.0, 0.05, 0.0);
        let dt = 0.02;

        jump.evaluate_cut_off(velocity, &config.jump_charges, GRAVITY, dt);

        // Net vertical acceleration = gravity + correction; one tick must not overshoot zero.
        let net = GRAVITY + jump.cutoff_acceleration;
        assert!(net.length() * dt <= velocity.length() + 1e-5);
        assert!(jump.cutoff_acceleration.dot(GRAVITY) <= 0.0);
    }
}
