//! Per-tick velocity integration.
//!
//! Velocity is split against the movement plane normal (the ground normal
//! while grounded, "up" while airborne). Only the planar part is integrated
//! here; the normal-aligned part is handed back untouched so gravity and jump
//! impulses are never fought by lateral movement.
//!
//! Everything in this module is a pure function of its inputs. The systems
//! read the physics state, call these, and write the result back.

use bevy::prelude::*;

use crate::config::{ControllerConfig, MovementProfile};
use crate::slope::TerrainCategory;

/// The "up" direction for a gravity vector. Falls back to `Vec3::Y` for zero gravity.
#[inline]
pub fn up_from_gravity(gravity: Vec3) -> Vec3 {
    let up = -gravity.normalize_or_zero();
    if up == Vec3::ZERO {
        Vec3::Y
    } else {
        up
    }
}

/// Move `current` towards `target` by at most `max_delta`, never overshooting.
pub fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let delta = target - current;
    let distance = delta.length();
    let max_delta = max_delta.max(0.0);
    if distance <= max_delta || distance <= f32::EPSILON {
        target
    } else {
        current + delta / distance * max_delta
    }
}

/// Split `velocity` into `(planar, normal_aligned)` parts relative to `normal`.
///
/// A zero normal leaves the whole velocity planar.
pub fn split_velocity(velocity: Vec3, normal: Vec3) -> (Vec3, Vec3) {
    let normal = normal.normalize_or_zero();
    let aligned = normal * velocity.dot(normal);
    (velocity - aligned, aligned)
}

/// Component of gravity lying in the plane with the given normal.
#[inline]
pub fn gravity_in_plane(gravity: Vec3, normal: Vec3) -> Vec3 {
    split_velocity(gravity, normal).0
}

/// Rotate a direction expressed relative to `up` onto the plane with `normal`.
///
/// Uses the minimal rotation taking `up` onto `normal` (axis `up x normal`,
/// angle `acos(up . normal)`), so horizontal input follows sloped ground.
pub fn rotate_onto_plane(direction: Vec3, up: Vec3, normal: Vec3) -> Vec3 {
    let up = up.normalize_or_zero();
    let normal = normal.normalize_or_zero();
    if up == Vec3::ZERO || normal == Vec3::ZERO || up == normal {
        return direction;
    }
    Quat::from_rotation_arc(up, normal) * direction
}

/// Fixed per-tick inputs shared by every step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext {
    /// Fixed timestep (seconds).
    pub dt: f32,
    /// Gravity acting on the character.
    pub gravity: Vec3,
}

impl StepContext {
    /// Create a new step context.
    pub fn new(dt: f32, gravity: Vec3) -> Self {
        Self { dt, gravity }
    }

    /// The "up" direction.
    #[inline]
    pub fn up(&self) -> Vec3 {
        up_from_gravity(self.gravity)
    }
}

/// Result of a grounded step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlanarStep {
    /// New planar velocity.
    pub planar_velocity: Vec3,
    /// Extra acceleration to apply this tick (gravity compensation).
    pub acceleration: Vec3,
    /// Whether a burnout (sharp turn / steep ground) happened.
    pub burnout: bool,
}

/// The terrain-dependent parameters of a grounded step.
#[derive(Debug, Clone, Copy)]
pub struct GroundedParams<'a> {
    /// Configuration (ground profile, steep multiplier, fall cap).
    pub config: &'a ControllerConfig,
    /// Terrain under the character.
    pub terrain: TerrainCategory,
    /// Profile selected by the classifier.
    pub profile: MovementProfile,
    /// Auto-slope modifier (1.0 when disabled).
    pub modifier: f32,
    /// Movement plane normal (the resolved ground normal).
    pub plane_normal: Vec3,
}

/// Integrate planar velocity on the ground.
///
/// `direction` must already be rotated onto the movement plane.
pub fn grounded_step(
    planar: Vec3,
    direction: Vec3,
    params: &GroundedParams,
    ctx: &StepContext,
) -> PlanarStep {
    let compensation = -gravity_in_plane(ctx.gravity, params.plane_normal);
    match params.terrain {
        TerrainCategory::Flat => flat_step(planar, direction, params, ctx, compensation),
        TerrainCategory::Slope => slope_step(planar, direction, params, ctx, compensation),
        TerrainCategory::Steep => steep_step(planar, direction, params, ctx),
    }
}

fn flat_step(
    planar: Vec3,
    direction: Vec3,
    params: &GroundedParams,
    ctx: &StepContext,
    compensation: Vec3,
) -> PlanarStep {
    let profile = params.profile;
    let mut burnout = false;

    let planar_velocity = if direction * params.modifier != Vec3::ZERO {
        let mut turning_factor = profile.turning_factor;
        if direction.dot(planar) >= 0.0 {
            turning_factor = 1.0;
        } else {
            burnout = true;
        }

        let max_speed = profile.max_speed * params.modifier;
        let acceleration = profile.acceleration * params.modifier * turning_factor;
        move_towards(planar, direction * max_speed, acceleration * ctx.dt)
    } else {
        move_towards(planar, Vec3::ZERO, profile.deceleration * ctx.dt)
    };

    // Cancel the lateral bleed of gravity on (numerically) flat ground.
    PlanarStep {
        planar_velocity,
        acceleration: compensation,
        burnout,
    }
}

fn slope_step(
    planar: Vec3,
    direction: Vec3,
    params: &GroundedParams,
    ctx: &StepContext,
    compensation: Vec3,
) -> PlanarStep {
    let profile = params.profile;
    // Positive when the input points uphill.
    let direction_dot_climb = direction.dot(compensation.normalize_or_zero());

    if direction * params.modifier != Vec3::ZERO && direction_dot_climb >= 0.0 {
        let mut turning_factor = profile.turning_factor;
        let mut burnout = false;
        if direction.dot(planar) >= 0.0 {
            turning_factor = 1.0;
        } else {
            burnout = true;
        }

        let max_speed = profile.max_speed * params.modifier;
        let base = params.config.ground.acceleration;
        let climb = direction_dot_climb.min(1.0);
        let acceleration =
            (base + (profile.acceleration - base) * climb) * params.modifier * turning_factor;

        PlanarStep {
            planar_velocity: move_towards(planar, direction * max_speed, acceleration * ctx.dt),
            acceleration: compensation,
            burnout,
        }
    } else {
        // Let gravity pull the character down the slope.
        PlanarStep {
            planar_velocity: passive_slide(planar, profile, params.config, ctx),
            acceleration: Vec3::ZERO,
            burnout: false,
        }
    }
}

fn steep_step(
    planar: Vec3,
    direction: Vec3,
    params: &GroundedParams,
    ctx: &StepContext,
) -> PlanarStep {
    let profile = params.profile;

    if direction != Vec3::ZERO {
        // Never climb faster than gravity pulls down.
        let acceleration = (profile.acceleration * params.config.steep_acceleration_multiplier)
            .clamp(0.0, ctx.gravity.length());
        PlanarStep {
            planar_velocity: move_towards(
                planar,
                direction * profile.max_speed,
                acceleration * ctx.dt,
            ),
            acceleration: Vec3::ZERO,
            burnout: true,
        }
    } else {
        PlanarStep {
            planar_velocity: passive_slide(planar, profile, params.config, ctx),
            acceleration: Vec3::ZERO,
            burnout: false,
        }
    }
}

/// Decay towards rest and cap at the terminal fall speed.
fn passive_slide(planar: Vec3, profile: MovementProfile, config: &ControllerConfig, ctx: &StepContext) -> Vec3 {
    move_towards(planar, Vec3::ZERO, profile.deceleration * ctx.dt).clamp_length_max(config.fall_speed_cap)
}

/// Airborne air-control parameters.
#[derive(Debug, Clone, Copy)]
pub struct AirborneParams<'a> {
    /// Configuration (air toggles).
    pub config: &'a ControllerConfig,
    /// Active (air) profile.
    pub profile: MovementProfile,
    /// Planar speed recorded at the last jump.
    pub takeoff_speed: f32,
}

/// Integrate planar velocity in the air.
///
/// The plane is the one perpendicular to gravity, so `direction` needs no rotation.
pub fn airborne_step(planar: Vec3, direction: Vec3, params: &AirborneParams, ctx: &StepContext) -> Vec3 {
    let profile = params.profile;

    if direction == Vec3::ZERO {
        return move_towards(planar, Vec3::ZERO, profile.deceleration * ctx.dt);
    }

    let turning_factor = if direction.dot(planar) >= 0.0 {
        1.0
    } else {
        profile.turning_factor
    };

    let max_speed = if params.config.speed_capped_on_jump {
        params.takeoff_speed
    } else {
        profile.max_speed
    };

    // At or over the cap, input may only turn or brake.
    let acceleration = if planar.length_squared() < max_speed * max_speed {
        profile.acceleration * turning_factor
    } else {
        profile.deceleration
    };

    let target = if params.config.can_change_direction_in_air {
        direction * max_speed
    } else {
        Vec3::ZERO
    };

    move_towards(planar, target, acceleration * ctx.dt)
}

/// Limit the falling component of `velocity` to `cap`.
///
/// Only velocity along gravity (descent) is limited; rising and lateral
/// motion are left alone.
pub fn cap_fall_speed(velocity: Vec3, gravity: Vec3, cap: f32) -> Vec3 {
    let down = gravity.normalize_or_zero();
    let fall_speed = velocity.dot(down);
    if down == Vec3::ZERO || fall_speed <= cap {
        velocity
    } else {
        velocity - down * (fall_speed - cap)
    }
}

/// Points a character at the visual model rotated as a rolling ball.
///
/// The model's rotation is treated as a world-space rotation, so it should
/// not inherit rotation from a parent.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct RollingModel(pub Entity);

/// Rotation a rolling ball of `radius` accumulates in `dt` at `velocity`.
///
/// Angular speed is `|velocity| / radius` about `up x velocity`. Returns
/// `None` when there is nothing to rotate.
pub fn rolling_rotation(velocity: Vec3, up: Vec3, radius: f32, dt: f32) -> Option<Quat> {
    let axis = up.cross(velocity).normalize_or_zero();
    if axis == Vec3::ZERO || radius <= 0.0 {
        return None;
    }
    let angular_speed = velocity.length() / radius;
    Some(Quat::from_axis_angle(axis, angular_speed * dt))
}
