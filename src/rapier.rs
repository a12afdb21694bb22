//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::collision::{ContactPoint, ContactReport};
use crate::state::CharacterController;

/// Rapier3D physics backend for the rolling controller.
///
/// Velocity is read and written through Rapier's [`Velocity`]. Contacts are
/// collected from the Rapier context into each character's [`ContactReport`],
/// and the accumulated acceleration is applied through [`ExternalForce`].
pub struct Rapier3dBackend;

impl CharacterPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }
}

/// Force this controller added to [`ExternalForce`] last tick.
///
/// Subtracted again before the next tick so forces from other sources are kept.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct AppliedControllerForce(pub Vec3);

/// Plugin that sets up Rapier3D-specific systems for the rolling controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        use crate::CharacterControllerSet;

        app.add_systems(
            FixedUpdate,
            (clear_controller_forces, sync_gravity).in_set(CharacterControllerSet::Preparation),
        );

        app.add_systems(
            FixedUpdate,
            collect_contacts.in_set(CharacterControllerSet::Sensors),
        );

        app.add_systems(
            FixedUpdate,
            apply_controller_forces.in_set(CharacterControllerSet::FinalApplication),
        );
    }
}

/// Copy Rapier's gravity into every controller.
pub fn sync_gravity(
    q_config: Query<&RapierConfiguration>,
    mut q_controllers: Query<&mut CharacterController>,
) {
    let Some(config) = q_config.iter().next() else {
        return;
    };
    for mut controller in &mut q_controllers {
        if controller.gravity != config.gravity {
            controller.gravity = config.gravity;
        }
    }
}

/// Fill each character's [`ContactReport`] from the Rapier contact graph.
///
/// Normals are flipped as needed so they always point towards the character.
pub fn collect_contacts(
    rapier_context: ReadRapierContext,
    mut q: Query<(Entity, &mut ContactReport), With<CharacterController>>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, mut report) in &mut q {
        report.clear();

        for pair in context.contact_pairs_with(entity) {
            if !pair.has_any_active_contact() {
                continue;
            }

            let (other, sign) = if pair.collider1() == Some(entity) {
                (pair.collider2(), -1.0)
            } else {
                (pair.collider1(), 1.0)
            };

            for manifold in pair.manifolds() {
                if manifold.num_points() == 0 {
                    continue;
                }
                let normal = manifold.normal() * sign;
                report.push(ContactPoint::new(normal, Vec3::ZERO, other));
            }
        }
    }
}

/// Remove the force applied last tick from [`ExternalForce`].
pub fn clear_controller_forces(mut q: Query<(&mut ExternalForce, &mut AppliedControllerForce)>) {
    for (mut ext_force, mut applied) in &mut q {
        ext_force.force -= applied.0;
        applied.0 = Vec3::ZERO;
    }
}

/// Apply the accumulated acceleration as a force, scaled by mass.
pub fn apply_controller_forces(
    mut q: Query<(
        &CharacterController,
        &mut ExternalForce,
        &mut AppliedControllerForce,
        Option<&ReadMassProperties>,
    )>,
) {
    for (controller, mut ext_force, mut applied, mass) in &mut q {
        let mass = mass
            .map(|props| props.mass)
            .filter(|m| *m > 0.0 && m.is_finite())
            .unwrap_or(1.0);

        let force = controller.accumulated_acceleration() * mass;
        ext_force.force += force;
        applied.0 = force;
    }
}

/// Bundle for creating a rolling ball with Rapier3D physics.
///
/// The ball must be free to rotate for contacts to behave like rolling;
/// the visual model is rotated separately via
/// [`RollingModel`](crate::movement::RollingModel).
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use msg_roller_controller::prelude::*;
///
/// fn spawn_player(mut commands: Commands) {
///     let model = commands.spawn(Transform::default()).id();
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         CharacterController::new(),
///         ControllerConfig::player(),
///         RollerBallBundle::new(0.5),
///         RollingModel(model),
///     ));
/// }
/// ```
#[derive(Bundle)]
pub struct RollerBallBundle {
    /// Should be [`RigidBody::Dynamic`].
    pub rigid_body: RigidBody,
    /// Ball collider.
    pub collider: Collider,
    /// Current velocity. Read and written by the controller.
    pub velocity: Velocity,
    /// Receives the controller's accumulated acceleration.
    pub external_force: ExternalForce,
    /// Bookkeeping for [`ExternalForce`].
    pub applied_force: AppliedControllerForce,
    /// Rotations are locked; the model is rotated instead.
    pub locked_axes: LockedAxes,
    /// Contacts must be tracked for the ground sensor.
    pub active_events: ActiveEvents,
    /// Computed mass properties.
    pub mass_properties: ReadMassProperties,
}

impl Default for RollerBallBundle {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl RollerBallBundle {
    /// Create a ball of the given radius.
    pub fn new(radius: f32) -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            collider: Collider::ball(radius.max(f32::EPSILON)),
            velocity: Velocity::default(),
            external_force: ExternalForce::default(),
            applied_force: AppliedControllerForce::default(),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            active_events: ActiveEvents::COLLISION_EVENTS,
            mass_properties: ReadMassProperties::default(),
        }
    }

    /// Set the rigid body type.
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set which axes are locked.
    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = axes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
        app.insert_resource(Time::<Fixed>::from_hz(60.0));
        app
    }

    #[test]
    fn rapier_backend_velocity() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                RigidBody::Dynamic,
                Velocity::linear(Vec3::new(5.0, 3.0, -1.0)),
            ))
            .id();

        let vel = Rapier3dBackend::get_velocity(app.world(), entity);
        assert!((vel - Vec3::new(5.0, 3.0, -1.0)).length() < 0.01);

        Rapier3dBackend::set_velocity(app.world_mut(), entity, Vec3::new(10.0, 0.0, 0.0));

        let vel = Rapier3dBackend::get_velocity(app.world(), entity);
        assert!((vel - Vec3::new(10.0, 0.0, 0.0)).length() < 0.01);
    }

    #[test]
    fn missing_velocity_reads_zero() {
        let mut app = create_test_app();
        let entity = app.world_mut().spawn(Transform::default()).id();
        assert_eq!(Rapier3dBackend::get_velocity(app.world(), entity), Vec3::ZERO);
    }

    #[test]
    fn roller_ball_bundle_creates_valid_entity() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                CharacterController::new(),
                RollerBallBundle::new(0.5),
            ))
            .id();

        assert!(app.world().get::<RigidBody>(entity).is_some());
        assert!(app.world().get::<Velocity>(entity).is_some());
        assert!(app.world().get::<ExternalForce>(entity).is_some());
        assert!(app.world().get::<ContactReport>(entity).is_some());
    }

    #[test]
    fn forces_are_replaced_each_tick() {
        let mut app = App::new();
        app.add_systems(Update, (clear_controller_forces, apply_controller_forces).chain());

        let mut controller = CharacterController::new();
        controller.add_acceleration(Vec3::new(0.0, 2.0, 0.0));
        let entity = app
            .world_mut()
            .spawn((
                controller,
                ExternalForce::default(),
                AppliedControllerForce::default(),
            ))
            .id();

        app.update();
        app.update();

        let force = app.world().get::<ExternalForce>(entity).unwrap();
        assert!((force.force - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-6);
    }
}
