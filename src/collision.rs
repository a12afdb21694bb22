//! Contact data handed over by the physics backend.
//!
//! The controller never queries the physics engine for contacts itself. Each
//! tick the backend (or the host application) fills the [`ContactReport`] of
//! every character with the contacts that are active for that tick.

use bevy::prelude::*;

/// A single contact between the character and another collider.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct ContactPoint {
    /// Surface normal at the contact, pointing away from the other collider
    /// (towards the character).
    pub normal: Vec3,
    /// World position of the contact point.
    pub point: Vec3,
    /// Entity that was touched (if known).
    pub entity: Option<Entity>,
}

impl ContactPoint {
    /// Create a contact point.
    pub fn new(normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            normal,
            point,
            entity,
        }
    }

    /// Create a contact that only carries a normal.
    pub fn from_normal(normal: Vec3) -> Self {
        Self {
            normal,
            ..default()
        }
    }
}

/// The contacts touching a character during the current tick.
///
/// An empty report means the physics engine reported no contact this tick.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct ContactReport {
    /// Active contacts.
    pub contacts: Vec<ContactPoint>,
}

impl ContactReport {
    /// Create a report from a list of contacts.
    pub fn new(contacts: Vec<ContactPoint>) -> Self {
        Self { contacts }
    }

    /// Create a report from surface normals only.
    pub fn from_normals(normals: impl IntoIterator<Item = Vec3>) -> Self {
        Self {
            contacts: normals.into_iter().map(ContactPoint::from_normal).collect(),
        }
    }

    /// Remove all contacts.
    pub fn clear(&mut self) {
        self.contacts.clear();
    }

    /// Add a contact.
    pub fn push(&mut self, contact: ContactPoint) {
        self.contacts.push(contact);
    }

    /// Number of contacts.
    #[inline]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Whether no contact was reported.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_point_new() {
        let entity = Entity::from_raw(42);
        let contact = ContactPoint::new(Vec3::Y, Vec3::new(1.0, 0.0, 2.0), Some(entity));

        assert_eq!(contact.normal, Vec3::Y);
        assert_eq!(contact.point, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(contact.entity, Some(entity));
    }

    #[test]
    fn report_from_normals() {
        let mut report = ContactReport::from_normals([Vec3::Y, Vec3::X]);
        assert_eq!(report.len(), 2);
        assert_eq!(report.contacts[1].normal, Vec3::X);
        assert!(report.contacts[0].entity.is_none());

        report.clear();
        assert!(report.is_empty());
    }
}
