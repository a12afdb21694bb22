//! Controller configuration components.
//!
//! This module defines the tunables of a rolling character: movement profiles
//! for each regime, slope limits and bands, jump and dash charges.
//!
//! All angles are in degrees, measured between a surface normal and the
//! "up" direction (opposite of gravity). Configuration is never rejected:
//! out-of-range values are clamped by [`ControllerConfig::normalize()`], which
//! every builder calls and which the plugin re-runs whenever the component
//! changes.

use bevy::prelude::*;

/// Largest slope angle accepted by the configuration (degrees).
pub const SLOPE_ANGLE_LIMIT: f32 = 89.9;

/// Smallest value used where a strictly positive quantity is required.
const MIN_POSITIVE: f32 = 1.0e-3;

/// Replace NaN/infinite values with a fallback before clamping.
#[inline]
fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Tunable constants for one movement regime (ground, air, a slope band...).
///
/// Profiles are plain values: the classifier selects one per tick and hands it
/// to the integrator, nothing mutates a profile after configuration.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct MovementProfile {
    /// Maximum planar speed (units/second). Always > 0.
    pub max_speed: f32,
    /// Rate at which planar velocity approaches the target (units/second^2).
    pub acceleration: f32,
    /// Rate at which planar velocity decays without input (units/second^2).
    pub deceleration: f32,
    /// Acceleration multiplier applied while turning against current motion (0.0-1.0).
    pub turning_factor: f32,
}

impl Default for MovementProfile {
    fn default() -> Self {
        Self {
            max_speed: 8.0,
            acceleration: 20.0,
            deceleration: 10.0,
            turning_factor: 0.5,
        }
    }
}

impl MovementProfile {
    /// Create a new profile. Values are clamped into their valid ranges.
    pub fn new(max_speed: f32, acceleration: f32, deceleration: f32, turning_factor: f32) -> Self {
        Self {
            max_speed,
            acceleration,
            deceleration,
            turning_factor,
        }
        .normalized()
    }

    /// A profile suited for airborne control: lower acceleration, almost no drag.
    pub fn air() -> Self {
        Self {
            max_speed: 8.0,
            acceleration: 8.0,
            deceleration: 1.0,
            turning_factor: 0.3,
        }
    }

    /// Return a copy with every field clamped into its valid range.
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        Self {
            max_speed: finite_or(self.max_speed, defaults.max_speed).max(MIN_POSITIVE),
            acceleration: finite_or(self.acceleration, 0.0).max(0.0),
            deceleration: finite_or(self.deceleration, 0.0).max(0.0),
            turning_factor: finite_or(self.turning_factor, 1.0).clamp(0.0, 1.0),
        }
    }

    /// Builder: set the turning factor.
    pub fn with_turning_factor(mut self, turning_factor: f32) -> Self {
        self.turning_factor = turning_factor;
        self.normalized()
    }
}

/// A range of slope angles mapped to its own movement profile.
///
/// Used when automatic slope handling is disabled. A band matches angles in
/// `(lower_angle, higher_angle]`.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Default)]
pub struct SlopeBand {
    /// Lower bound (excluded), degrees.
    pub lower_angle: f32,
    /// Upper bound (included), degrees.
    pub higher_angle: f32,
    /// Profile used while the ground angle lies inside this band.
    pub profile: MovementProfile,
}

impl SlopeBand {
    /// Create a new band.
    pub fn new(lower_angle: f32, higher_angle: f32, profile: MovementProfile) -> Self {
        Self {
            lower_angle,
            higher_angle,
            profile,
        }
    }

    /// Check whether `angle` falls inside `(lower_angle, higher_angle]`.
    #[inline]
    pub fn contains(&self, angle: f32) -> bool {
        angle > self.lower_angle && angle <= self.higher_angle
    }
}

/// One use of a multi-stage jump.
///
/// The "on jump" notification for a charge is the [`Jumped`](crate::events::Jumped)
/// event, which carries the index of the consumed charge.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct JumpCharge {
    /// Apex height of the jump (units). Always > 0.
    pub height: f32,
    /// Fraction of gravity felt while rising (0.0 exclusive - 1.0).
    /// Lower values give a floatier ascent.
    pub gravity_damp_on_rise: f32,
    /// Gravity scale used while rising after the jump input is released early (0.0-1.0).
    pub jump_cut_off_factor: f32,
}

impl Default for JumpCharge {
    fn default() -> Self {
        Self {
            height: 2.0,
            gravity_damp_on_rise: 0.8,
            jump_cut_off_factor: 1.0,
        }
    }
}

impl JumpCharge {
    /// Create a new jump charge. Values are clamped into their valid ranges.
    pub fn new(height: f32, gravity_damp_on_rise: f32, jump_cut_off_factor: f32) -> Self {
        Self {
            height,
            gravity_damp_on_rise,
            jump_cut_off_factor,
        }
        .normalized()
    }

    /// Return a copy with every field clamped into its valid range.
    pub fn normalized(self) -> Self {
        Self {
            height: finite_or(self.height, MIN_POSITIVE).max(MIN_POSITIVE),
            gravity_damp_on_rise: finite_or(self.gravity_damp_on_rise, 1.0).clamp(MIN_POSITIVE, 1.0),
            jump_cut_off_factor: finite_or(self.jump_cut_off_factor, 1.0).clamp(0.0, 1.0),
        }
    }
}

/// One use of a multi-stage dash.
///
/// The "on dash" notification is the [`Dashed`](crate::events::Dashed) event.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct DashCharge {
    /// Speed held during the active phase (units/second).
    pub speed: f32,
    /// Length of the active phase (seconds). Always > 0.
    pub duration: f32,
    /// Whether the dash follows the input direction (true) or keeps the
    /// current direction of travel (false).
    pub can_change_direction: bool,
    /// Ticks spent frozen in place before the active phase.
    pub freeze_frames: u32,
}

impl Default for DashCharge {
    fn default() -> Self {
        Self {
            speed: 20.0,
            duration: 0.2,
            can_change_direction: true,
            freeze_frames: 3,
        }
    }
}

impl DashCharge {
    /// Create a new dash charge. Values are clamped into their valid ranges.
    pub fn new(speed: f32, duration: f32, can_change_direction: bool, freeze_frames: u32) -> Self {
        Self {
            speed,
            duration,
            can_change_direction,
            freeze_frames,
        }
        .normalized()
    }

    /// Return a copy with every field clamped into its valid range.
    pub fn normalized(self) -> Self {
        Self {
            speed: finite_or(self.speed, 0.0).max(0.0),
            duration: finite_or(self.duration, MIN_POSITIVE).max(MIN_POSITIVE),
            ..self
        }
    }
}

/// How exhausted dash charges are replenished.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashRecharge {
    /// Wait `dash_recharge_time` seconds after the last dash ends.
    #[default]
    Cooldown,
    /// Wait until the character is grounded.
    OnGround,
}

/// Configuration parameters for the rolling controller.
///
/// Keep this consistent by building it through the `with_*` methods, or call
/// [`ControllerConfig::normalize()`] after editing fields directly. The plugin
/// also normalizes any config whose component changed.
#[derive(Component, Reflect, Debug, Clone, PartialEq)]
#[reflect(Component)]
pub struct ControllerConfig {
    // === Movement Profiles ===
    /// Profile used on flat and steep ground, and on slopes in auto mode.
    pub ground: MovementProfile,
    /// Profile used while airborne.
    pub air: MovementProfile,
    /// Acceleration multiplier on steep ground; also caps the auto-slope falloff (0.0-1.0).
    pub steep_acceleration_multiplier: f32,

    // === Air Control ===
    /// Pin airborne max speed to the planar speed at the last takeoff.
    pub speed_capped_on_jump: bool,
    /// Allow input to redirect airborne motion (otherwise input only brakes).
    pub can_change_direction_in_air: bool,

    // === Slope Settings ===
    /// Slopes at or below this angle are flat (degrees).
    pub min_slope_angle: f32,
    /// Slopes above this angle are steep (degrees).
    pub max_slope_angle: f32,
    /// Scale ground speed continuously with the slope angle.
    pub auto_slope: bool,
    /// Per-band profiles used when `auto_slope` is disabled.
    pub slope_bands: Vec<SlopeBand>,

    // === Falling ===
    /// Terminal speed when sliding down or falling (units/second).
    pub fall_speed_cap: f32,

    // === Jump ===
    /// Ordered jump charges, consumed one per jump and restored on landing.
    pub jump_charges: Vec<JumpCharge>,

    // === Dash ===
    /// Ordered dash charges.
    pub dash_charges: Vec<DashCharge>,
    /// How exhausted dash charges come back.
    pub dash_recharge: DashRecharge,
    /// Cooldown after the last charge is spent (seconds), for [`DashRecharge::Cooldown`].
    pub dash_recharge_time: f32,

    // === Model ===
    /// Radius of the ball, used to derive the rolling rotation.
    pub sphere_radius: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Movement profiles
            ground: MovementProfile::default(),
            air: MovementProfile::air(),
            steep_acceleration_multiplier: 0.66,

            // Air control
            speed_capped_on_jump: true,
            can_change_direction_in_air: true,

            // Slopes
            min_slope_angle: 0.0,
            max_slope_angle: 45.0,
            auto_slope: true,
            slope_bands: Vec::new(),

            // Falling
            fall_speed_cap: 12.0,

            // Jump: a regular jump and a smaller air jump
            jump_charges: vec![
                JumpCharge::default(),
                JumpCharge {
                    height: 1.5,
                    gravity_damp_on_rise: 0.9,
                    jump_cut_off_factor: 1.0,
                },
            ],

            // Dash
            dash_charges: vec![DashCharge::default()],
            dash_recharge: DashRecharge::Cooldown,
            dash_recharge_time: 0.5,

            // Model
            sphere_radius: 0.5,
        }
    }
}

impl ControllerConfig {
    /// Create a config optimized for responsive player control.
    pub fn player() -> Self {
        Self {
            ground: MovementProfile::new(10.0, 30.0, 15.0, 0.6),
            air: MovementProfile::new(10.0, 12.0, 2.0, 0.4),
            ..default()
        }
    }

    /// Clamp every value into its valid range and rebuild the slope bands.
    ///
    /// After this call:
    /// - `0 <= min_slope_angle <= max_slope_angle <= SLOPE_ANGLE_LIMIT`
    /// - bands are contiguous: `band[i].lower_angle == band[i - 1].higher_angle`
    /// - `band[0].lower_angle >= min_slope_angle`, every `higher_angle <= max_slope_angle`
    pub fn normalize(&mut self) {
        self.ground = self.ground.normalized();
        self.air = self.air.normalized();
        self.steep_acceleration_multiplier =
            finite_or(self.steep_acceleration_multiplier, 0.0).clamp(0.0, 1.0);

        self.max_slope_angle = finite_or(self.max_slope_angle, 45.0).clamp(0.0, SLOPE_ANGLE_LIMIT);
        self.min_slope_angle = finite_or(self.min_slope_angle, 0.0)
            .clamp(0.0, SLOPE_ANGLE_LIMIT)
            .min(self.max_slope_angle);
        self.rebuild_slope_bands();

        self.fall_speed_cap = finite_or(self.fall_speed_cap, 0.0).max(0.0);

        for charge in &mut self.jump_charges {
            *charge = charge.normalized();
        }
        for charge in &mut self.dash_charges {
            *charge = charge.normalized();
        }
        self.dash_recharge_time = finite_or(self.dash_recharge_time, 0.0).max(0.0);

        self.sphere_radius = finite_or(self.sphere_radius, 0.5).max(MIN_POSITIVE);
    }

    /// Return a normalized copy.
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Force the bands into contiguous, ordered ranges inside the slope limits.
    fn rebuild_slope_bands(&mut self) {
        let (min, max) = (self.min_slope_angle, self.max_slope_angle);
        let mut previous_higher = min;

        for (i, band) in self.slope_bands.iter_mut().enumerate() {
            band.profile = band.profile.normalized();

            let mut higher = finite_or(band.higher_angle, max).min(max);
            let lower = if i == 0 {
                finite_or(band.lower_angle, min).min(higher).max(min)
            } else {
                previous_higher
            };
            higher = higher.max(lower);

            band.lower_angle = lower;
            band.higher_angle = higher;
            previous_higher = higher;
        }
    }

    /// Number of jump charges available per grounding.
    #[inline]
    pub fn jump_charge_count(&self) -> usize {
        self.jump_charges.len()
    }

    /// Number of dash charges available per recharge.
    #[inline]
    pub fn dash_charge_count(&self) -> usize {
        self.dash_charges.len()
    }

    /// Builder: set the ground profile.
    pub fn with_ground(mut self, profile: MovementProfile) -> Self {
        self.ground = profile;
        self.normalized()
    }

    /// Builder: set the air profile.
    pub fn with_air(mut self, profile: MovementProfile) -> Self {
        self.air = profile;
        self.normalized()
    }

    /// Builder: set the slope limits (degrees).
    pub fn with_slope_angles(mut self, min_slope_angle: f32, max_slope_angle: f32) -> Self {
        self.min_slope_angle = min_slope_angle;
        self.max_slope_angle = max_slope_angle;
        self.normalized()
    }

    /// Builder: enable automatic slope handling with the given steep multiplier.
    pub fn with_auto_slope(mut self, steep_acceleration_multiplier: f32) -> Self {
        self.auto_slope = true;
        self.steep_acceleration_multiplier = steep_acceleration_multiplier;
        self.normalized()
    }

    /// Builder: use manual slope bands instead of automatic slope handling.
    pub fn with_slope_bands(mut self, bands: Vec<SlopeBand>) -> Self {
        self.auto_slope = false;
        self.slope_bands = bands;
        self.normalized()
    }

    /// Builder: set the steep acceleration multiplier.
    pub fn with_steep_acceleration_multiplier(mut self, multiplier: f32) -> Self {
        self.steep_acceleration_multiplier = multiplier;
        self.normalized()
    }

    /// Builder: set the terminal fall speed.
    pub fn with_fall_speed_cap(mut self, cap: f32) -> Self {
        self.fall_speed_cap = cap;
        self.normalized()
    }

    /// Builder: set the jump charges.
    pub fn with_jump_charges(mut self, charges: Vec<JumpCharge>) -> Self {
        self.jump_charges = charges;
        self.normalized()
    }

    /// Builder: set the dash charges.
    pub fn with_dash_charges(mut self, charges: Vec<DashCharge>) -> Self {
        self.dash_charges = charges;
        self.normalized()
    }

    /// Builder: set the dash recharge policy and cooldown.
    pub fn with_dash_recharge(mut self, recharge: DashRecharge, recharge_time: f32) -> Self {
        self.dash_recharge = recharge;
        self.dash_recharge_time = recharge_time;
        self.normalized()
    }

    /// Builder: pin airborne max speed to the takeoff speed.
    pub fn with_speed_capped_on_jump(mut self, enabled: bool) -> Self {
        self.speed_capped_on_jump = enabled;
        self
    }

    /// Builder: allow or forbid redirecting motion in the air.
    pub fn with_can_change_direction_in_air(mut self, enabled: bool) -> Self {
        self.can_change_direction_in_air = enabled;
        self
    }

    /// Builder: set the ball radius.
    pub fn with_sphere_radius(mut self, radius: f32) -> Self {
        self.sphere_radius = radius;
        self.normalized()
    }
}
