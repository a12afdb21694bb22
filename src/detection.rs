//! Ground detection from contact points.
//!
//! The physics engine can report a contact set that is missing the ground for
//! a single tick right after a real contact (for instance when the ball jumps
//! while touching a wall). [`GroundReading`] keeps last tick's normal around
//! and always resolves to the more upward-facing of the two, so such a tick
//! does not zero the slope computations or drop the character into the air.

use bevy::prelude::*;

use crate::collision::ContactPoint;

/// Pick the contact normal that faces "up" the most.
///
/// Returns `Vec3::ZERO` when there is no contact.
pub fn most_upward_normal(contacts: &[ContactPoint], up: Vec3) -> Vec3 {
    contacts
        .iter()
        .map(|c| c.normal.normalize_or_zero())
        .filter(|n| *n != Vec3::ZERO)
        .max_by(|a, b| a.dot(up).total_cmp(&b.dot(up)))
        .unwrap_or(Vec3::ZERO)
}

/// Ground normal measured this tick and the one measured last tick.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct GroundReading {
    /// Normal computed from this tick's contacts (zero if none).
    pub normal: Vec3,
    /// Normal computed during the previous contact pass.
    pub previous_normal: Vec3,
}

impl GroundReading {
    /// Run a contact-processing pass.
    ///
    /// The current normal is shifted into `previous_normal` before the new one
    /// is computed. Must run every tick, grounded or airborne.
    pub fn sense(&mut self, contacts: &[ContactPoint], up: Vec3) {
        self.previous_normal = self.normal;
        self.normal = most_upward_normal(contacts, up);
    }

    /// Forget the current normal (used when the surface is not valid ground).
    pub fn clear_normal(&mut self) {
        self.normal = Vec3::ZERO;
    }

    /// Reset both slots.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The normal consumers should use: whichever of the current and previous
    /// normals points more along `up`.
    pub fn resolved(&self, up: Vec3) -> Vec3 {
        if self.normal.dot(up) >= self.previous_normal.dot(up) {
            self.normal
        } else {
            self.previous_normal
        }
    }

    /// Whether a usable ground normal exists.
    #[inline]
    pub fn has_ground(&self, up: Vec3) -> bool {
        self.resolved(up) != Vec3::ZERO
    }
}
