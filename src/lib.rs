//! # `msg_roller_controller`
//!
//! A rolling-ball locomotion controller for Bevy with physics backend abstraction.
//!
//! This crate drives a dynamic sphere through velocity and acceleration:
//! - Senses ground from the contacts reported each tick, with a one-tick
//!   grace period for contacts the physics engine drops
//! - Classifies terrain as flat, slope or steep and picks a movement profile
//! - Integrates planar velocity per regime (ground, slopes, steep, air)
//! - Supports multi-charge jumps with rise damping and variable-height cutoff
//! - Supports multi-charge dashes with freeze frames and recharge policies
//! - Abstracts the physics backend (Rapier3D included behind `rapier3d`)
//!
//! ## Architecture
//!
//! Each fixed tick runs the [`CharacterControllerSet`] chain:
//! 1. The backend fills [`ContactReport`](collision::ContactReport)
//! 2. The ground sensor and Grounded/Airborne state machine update
//! 3. Button edges in [`MovementIntent`](intent::MovementIntent) arm jumps
//!    and start dashes
//! 4. The integrator writes the new velocity and accumulates accelerations
//! 5. A running dash overrides the velocity
//! 6. The backend applies the accumulated acceleration
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use msg_roller_controller::prelude::*;
//!
//! let controller = CharacterController::new();
//! let config = ControllerConfig::player().with_slope_angles(5.0, 40.0);
//! let intent = MovementIntent::default();
//!
//! // Spawn these together with the physics backend's components.
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod collision;
pub mod config;
pub mod dash;
pub mod detection;
pub mod events;
pub mod intent;
pub mod jump;
pub mod movement;
pub mod slope;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::CharacterPhysicsBackend;
    pub use crate::collision::{ContactPoint, ContactReport};
    pub use crate::config::{
        ControllerConfig, DashCharge, DashRecharge, JumpCharge, MovementProfile, SlopeBand,
    };
    pub use crate::dash::DashPhase;
    pub use crate::events::{Burnout, Dashed, Jumped, Landed};
    pub use crate::intent::MovementIntent;
    pub use crate::movement::RollingModel;
    pub use crate::slope::TerrainCategory;
    pub use crate::state::{
        Airborne, CharacterController, ControllerTelemetry, Grounded, MovementState,
    };
    pub use crate::{CharacterControllerPlugin, CharacterControllerSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, RollerBallBundle};
}

/// System sets of the controller, chained in this order in `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum CharacterControllerSet {
    /// Reset per-tick accumulators, normalize edited configs.
    Preparation,
    /// Backend contact collection.
    Sensors,
    /// Ground sensing and state transitions.
    StateMachine,
    /// Jump and dash requests.
    Intent,
    /// Velocity integration.
    Movement,
    /// Dash velocity override.
    Dash,
    /// Model rotation and state markers.
    Presentation,
    /// Backend applies accumulated acceleration.
    FinalApplication,
}

/// Main plugin for the rolling controller.
///
/// This plugin is generic over a physics backend `B` which provides velocity
/// access and applies the accumulated acceleration.
///
/// # Examples
///
/// With the Rapier3D backend:
/// ```rust,ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use msg_roller_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(CharacterControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct CharacterControllerPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for CharacterControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for CharacterControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<state::CharacterController>();
        app.register_type::<state::MovementState>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<config::ControllerConfig>();
        app.register_type::<config::MovementProfile>();
        app.register_type::<config::SlopeBand>();
        app.register_type::<config::JumpCharge>();
        app.register_type::<config::DashCharge>();
        app.register_type::<config::DashRecharge>();
        app.register_type::<collision::ContactReport>();
        app.register_type::<collision::ContactPoint>();
        app.register_type::<intent::MovementIntent>();
        app.register_type::<movement::RollingModel>();
        app.register_type::<slope::TerrainCategory>();
        app.register_type::<slope::GroundClassification>();
        app.register_type::<detection::GroundReading>();
        app.register_type::<jump::JumpState>();
        app.register_type::<dash::DashState>();
        app.register_type::<dash::DashPhase>();

        app.add_event::<events::Jumped>();
        app.add_event::<events::Dashed>();
        app.add_event::<events::Burnout>();
        app.add_event::<events::Landed>();

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.configure_sets(
            FixedUpdate,
            (
                CharacterControllerSet::Preparation,
                CharacterControllerSet::Sensors,
                CharacterControllerSet::StateMachine,
                CharacterControllerSet::Intent,
                CharacterControllerSet::Movement,
                CharacterControllerSet::Dash,
                CharacterControllerSet::Presentation,
                CharacterControllerSet::FinalApplication,
            )
                .chain(),
        );

        app.add_systems(
            FixedUpdate,
            (
                systems::clear_accumulated_acceleration,
                systems::normalize_changed_configs,
            )
                .chain()
                .in_set(CharacterControllerSet::Preparation),
        );
        app.add_systems(
            FixedUpdate,
            systems::update_ground_state.in_set(CharacterControllerSet::StateMachine),
        );
        app.add_systems(
            FixedUpdate,
            systems::process_intents::<B>.in_set(CharacterControllerSet::Intent),
        );
        app.add_systems(
            FixedUpdate,
            systems::apply_movement::<B>.in_set(CharacterControllerSet::Movement),
        );
        app.add_systems(
            FixedUpdate,
            systems::advance_dash::<B>.in_set(CharacterControllerSet::Dash),
        );
        app.add_systems(
            FixedUpdate,
            (systems::roll_models::<B>, systems::sync_state_markers)
                .chain()
                .in_set(CharacterControllerSet::Presentation),
        );
    }
}
