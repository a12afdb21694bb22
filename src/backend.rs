//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement to
//! work with the rolling controller. The controller never integrates
//! positions itself: it reads and writes velocity through the backend and
//! accumulates accelerations that the backend applies at the end of the tick.

use bevy::prelude::*;

use crate::state::CharacterController;

/// Trait for physics backend implementations.
///
/// Besides the methods below, a backend is expected to fill each character's
/// [`ContactReport`](crate::collision::ContactReport) before the
/// `Sensors` set ends, and to apply
/// [`CharacterController::accumulated_acceleration()`] in the
/// `FinalApplication` set.
///
/// For an example implementation, see the `rapier` module's `Rapier3dBackend`.
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Get the current linear velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the linear velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Queue an acceleration for this tick.
    ///
    /// The default accumulates into the [`CharacterController`]; backends
    /// read the sum back in `FinalApplication`.
    fn apply_acceleration(world: &mut World, entity: Entity, acceleration: Vec3) {
        if let Some(mut controller) = world.get_mut::<CharacterController>(entity) {
            controller.add_acceleration(acceleration);
        }
    }

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.timestep().as_secs_f32())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}
