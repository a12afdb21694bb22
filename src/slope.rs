//! Terrain classification and movement profile selection.
//!
//! The ground normal is turned into a [`TerrainCategory`] by its angle to "up".
//! Classification returns the selected profile as a value; the caller stores
//! it as the last known reading and passes it to the integrator.

use bevy::prelude::*;

use crate::config::{ControllerConfig, MovementProfile};

/// Category of the ground under the character.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerrainCategory {
    /// Angle at or below `min_slope_angle`.
    #[default]
    Flat,
    /// Angle in `(min_slope_angle, max_slope_angle]`.
    Slope,
    /// Angle in `(max_slope_angle, 90]`.
    Steep,
}

/// Result of classifying a ground normal.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct GroundClassification {
    /// Terrain category.
    pub category: TerrainCategory,
    /// Angle between the ground normal and "up" (degrees).
    pub angle: f32,
    /// Profile to move with.
    pub profile: MovementProfile,
}

/// Angle between a surface normal and "up", in degrees.
///
/// Returns `None` for zero vectors.
pub fn terrain_angle(normal: Vec3, up: Vec3) -> Option<f32> {
    let normal = normal.normalize_or_zero();
    let up = up.normalize_or_zero();
    if normal == Vec3::ZERO || up == Vec3::ZERO {
        return None;
    }
    let cos = normal.dot(up).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// Map an angle to a terrain category.
///
/// Returns `None` above 90 degrees: the surface faces down and is not ground.
pub fn categorize(angle: f32, min_slope_angle: f32, max_slope_angle: f32) -> Option<TerrainCategory> {
    if angle <= min_slope_angle {
        Some(TerrainCategory::Flat)
    } else if angle <= max_slope_angle {
        Some(TerrainCategory::Slope)
    } else if angle <= 90.0 {
        Some(TerrainCategory::Steep)
    } else {
        None
    }
}

/// Continuous speed/acceleration scale for slopes in auto mode.
///
/// `1 - clamp((angle - min) / (max - min), 0, steep_acceleration_multiplier)`:
/// 1 at `min_slope_angle`, falling linearly to `1 - multiplier` and staying
/// there. A zero-width slope range jumps straight to the floor value.
pub fn auto_slope_modifier(angle: f32, config: &ControllerConfig) -> f32 {
    let cap = config.steep_acceleration_multiplier;
    let range = config.max_slope_angle - config.min_slope_angle;
    let value = if range > f32::EPSILON {
        ((angle - config.min_slope_angle) / range).clamp(0.0, cap)
    } else if angle > config.min_slope_angle {
        cap
    } else {
        0.0
    };
    1.0 - value
}

/// Find the manual slope band containing `angle`.
pub fn band_profile(angle: f32, config: &ControllerConfig) -> Option<MovementProfile> {
    config
        .slope_bands
        .iter()
        .find(|band| band.contains(angle))
        .map(|band| band.profile)
}

/// Classify a ground normal and pick the profile to move with.
///
/// `current` is the profile active before this call; it is kept when manual
/// mode finds no band for the angle. Returns `None` when the normal is zero
/// or faces away from "up" by more than 90 degrees.
pub fn classify_ground(
    normal: Vec3,
    up: Vec3,
    config: &ControllerConfig,
    current: MovementProfile,
) -> Option<GroundClassification> {
    let angle = terrain_angle(normal, up)?;
    let category = categorize(angle, config.min_slope_angle, config.max_slope_angle)?;

    let profile = match category {
        TerrainCategory::Flat | TerrainCategory::Steep => config.ground,
        TerrainCategory::Slope if config.auto_slope => config.ground,
        TerrainCategory::Slope => band_profile(angle, config).unwrap_or(current),
    };

    Some(GroundClassification {
        category,
        angle,
        profile,
    })
}
