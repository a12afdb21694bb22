//! Movement state machine and state marker components.
//!
//! [`CharacterController`] is the per-character runtime hub: it owns the
//! ground reading, the last terrain classification, the jump and dash
//! bookkeeping and the current [`MovementState`]. The [`Grounded`] and
//! [`Airborne`] markers mirror that state for use in queries.

use std::fmt;

use bevy::prelude::*;

use crate::collision::{ContactPoint, ContactReport};
use crate::config::{ControllerConfig, MovementProfile};
use crate::dash::DashState;
use crate::detection::GroundReading;
use crate::intent::MovementIntent;
use crate::jump::JumpState;
use crate::movement::up_from_gravity;
use crate::slope::{classify_ground, GroundClassification, TerrainCategory};

/// Movement regime of a character.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MovementState {
    /// Touching valid ground.
    Grounded,
    /// Not touching valid ground.
    #[default]
    Airborne,
}

impl fmt::Display for MovementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementState::Grounded => f.write_str("Grounded"),
            MovementState::Airborne => f.write_str("Airborne"),
        }
    }
}

/// A state change performed by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    /// State that was exited.
    pub from: MovementState,
    /// State that was entered.
    pub to: MovementState,
}

impl StateTransition {
    /// Whether this transition is a landing.
    #[inline]
    pub fn is_landing(&self) -> bool {
        self.from == MovementState::Airborne && self.to == MovementState::Grounded
    }
}

/// Marker component indicating the character is grounded.
///
/// Added when the state machine enters [`MovementState::Grounded`], removed
/// when the character becomes airborne.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_roller_controller::prelude::*;
///
/// // Grounded is a marker component - just use it in queries
/// fn check_grounded(grounded: Option<&Grounded>) -> bool {
///     grounded.is_some()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Snapshot of the values shown by a debug overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerTelemetry {
    /// Current movement state.
    pub state: MovementState,
    /// Last known terrain category.
    pub terrain: Option<TerrainCategory>,
    /// Speed along the current movement plane.
    pub planar_speed: f32,
}

impl fmt::Display for ControllerTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terrain = match self.terrain {
            Some(category) => format!("{category:?}"),
            None => "None".to_string(),
        };
        write!(
            f,
            "State: {} | Ground Type: {} | Movement Speed: {:.2}",
            self.state, terrain, self.planar_speed
        )
    }
}

/// Runtime state of a rolling character.
///
/// This component is updated by the controller systems each fixed tick.
/// Other systems should only read it through the accessors.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
#[require(ControllerConfig, ContactReport, MovementIntent)]
pub struct CharacterController {
    /// Gravity acting on this character. "Up" is its opposite.
    pub gravity: Vec3,

    // === Sensors ===
    /// Current and previous ground normals.
    pub ground: GroundReading,
    /// Last valid terrain classification.
    pub terrain: Option<GroundClassification>,
    /// Profile used by the integrator this tick.
    pub active_profile: MovementProfile,

    // === State ===
    pub(crate) state: MovementState,
    pub(crate) state_entered_at: f32,

    // === Abilities ===
    /// Jump bookkeeping.
    pub jump: JumpState,
    /// Dash bookkeeping.
    pub dash: DashState,

    // === Output ===
    /// Acceleration accumulated this tick, applied by the backend.
    pub(crate) accumulated_acceleration: Vec3,
    /// Planar velocity the model should roll with this tick.
    pub(crate) rolling_velocity: Vec3,
    /// Speed along the movement plane after the last tick.
    pub(crate) planar_speed: f32,
}

impl Default for CharacterController {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            ground: GroundReading::default(),
            terrain: None,
            active_profile: MovementProfile::air(),
            state: MovementState::Airborne,
            state_entered_at: 0.0,
            jump: JumpState::default(),
            dash: DashState::default(),
            accumulated_acceleration: Vec3::ZERO,
            rolling_velocity: Vec3::ZERO,
            planar_speed: 0.0,
        }
    }
}

impl CharacterController {
    /// Create a new character controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a controller with custom gravity.
    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            gravity,
            ..default()
        }
    }

    /// The direction opposite to gravity.
    #[inline]
    pub fn up(&self) -> Vec3 {
        up_from_gravity(self.gravity)
    }

    /// Current movement state.
    #[inline]
    pub fn movement_state(&self) -> MovementState {
        self.state
    }

    /// Whether the character is grounded.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.state == MovementState::Grounded
    }

    /// Time (elapsed seconds) at which the current state was entered.
    #[inline]
    pub fn state_entered_at(&self) -> f32 {
        self.state_entered_at
    }

    /// Last known terrain category.
    #[inline]
    pub fn terrain(&self) -> Option<TerrainCategory> {
        self.terrain.map(|t| t.category)
    }

    /// Speed along the movement plane after the last tick.
    #[inline]
    pub fn planar_speed(&self) -> f32 {
        self.planar_speed
    }

    /// The ground normal consumers should use (zero when there is none).
    #[inline]
    pub fn ground_normal(&self) -> Vec3 {
        self.ground.resolved(self.up())
    }

    /// Acceleration accumulated for this tick.
    #[inline]
    pub fn accumulated_acceleration(&self) -> Vec3 {
        self.accumulated_acceleration
    }

    /// Add an acceleration for the backend to apply at the end of the tick.
    pub fn add_acceleration(&mut self, acceleration: Vec3) {
        self.accumulated_acceleration += acceleration;
    }

    /// Clear the accumulated acceleration (start of each tick).
    pub fn clear_acceleration(&mut self) {
        self.accumulated_acceleration = Vec3::ZERO;
    }

    /// Values for a debug overlay.
    pub fn telemetry(&self) -> ControllerTelemetry {
        ControllerTelemetry {
            state: self.state,
            terrain: self.terrain(),
            planar_speed: self.planar_speed,
        }
    }

    /// Run the contact-processing pass for this tick and apply transitions.
    ///
    /// - Grounded with contacts: re-classify; invalid ground goes airborne.
    /// - Airborne with contacts: land if the resolved normal is valid ground.
    /// - No contacts: leave the ground only once the previous normal is gone
    ///   too, so a single empty tick is absorbed.
    pub fn process_contacts(
        &mut self,
        contacts: &[ContactPoint],
        config: &ControllerConfig,
        now: f32,
    ) -> Option<StateTransition> {
        let up = self.up();
        self.ground.sense(contacts, up);

        if contacts.is_empty() {
            if self.state == MovementState::Grounded && !self.ground.has_ground(up) {
                return self.switch_state(MovementState::Airborne, config, now);
            }
            return None;
        }

        match self.state {
            MovementState::Grounded => {
                if self.reclassify(config) {
                    None
                } else {
                    self.switch_state(MovementState::Airborne, config, now)
                }
            }
            MovementState::Airborne => {
                if self.classify(config).is_some() {
                    self.switch_state(MovementState::Grounded, config, now)
                } else {
                    self.ground.clear_normal();
                    None
                }
            }
        }
    }

    /// Change the movement state, running exit/enter actions.
    ///
    /// Switching to the current state does nothing.
    pub fn switch_state(
        &mut self,
        next: MovementState,
        config: &ControllerConfig,
        now: f32,
    ) -> Option<StateTransition> {
        if next == self.state {
            return None;
        }

        let transition = StateTransition {
            from: self.state,
            to: next,
        };
        self.state = next;
        self.state_entered_at = now;

        match next {
            MovementState::Grounded => {
                self.reclassify(config);
                self.jump.reset_charges();
            }
            MovementState::Airborne => {
                self.active_profile = config.air;
            }
        }

        Some(transition)
    }

    fn classify(&self, config: &ControllerConfig) -> Option<GroundClassification> {
        let up = self.up();
        classify_ground(self.ground.resolved(up), up, config, self.active_profile)
    }

    /// Classify the resolved normal and store the result.
    ///
    /// Returns `false` when there is no valid ground; the current normal is
    /// cleared in that case.
    fn reclassify(&mut self, config: &ControllerConfig) -> bool {
        match self.classify(config) {
            Some(classification) => {
                self.terrain = Some(classification);
                self.active_profile = classification.profile;
                true
            }
            None => {
                self.ground.clear_normal();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contacts(normals: &[Vec3]) -> Vec<ContactPoint> {
        normals.iter().copied().map(ContactPoint::from_normal).collect()
    }

    fn tilted(degrees: f32) -> Vec3 {
        Quat::from_rotation_z(degrees.to_radians()) * Vec3::Y
    }

    #[test]
    fn starts_airborne_with_air_profile() {
        let controller = CharacterController::new();
        assert_eq!(controller.movement_state(), MovementState::Airborne);
        assert_eq!(controller.active_profile, MovementProfile::air());
        assert!(controller.terrain().is_none());
    }

    #[test]
    fn lands_on_flat_ground() {
        let config = ControllerConfig::default();
        let mut controller = CharacterController::new();
        controller.jump.count = 2;

        let transition = controller.process_contacts(&contacts(&[Vec3::Y]), &config, 1.5);

        assert!(transition.is_some_and(|t| t.is_landing()));
        assert!(controller.is_grounded());
        assert_eq!(controller.state_entered_at(), 1.5);
        assert_eq!(controller.terrain(), Some(TerrainCategory::Flat));
        assert_eq!(controller.active_profile, config.ground);
        assert_eq!(controller.jump.count, 0);
    }

    #[test]
    fn single_empty_tick_keeps_grounded() {
        let config = ControllerConfig::default();
        let mut controller = CharacterController::new();
        controller.process_contacts(&contacts(&[Vec3::Y]), &config, 0.0);

        assert!(controller.process_contacts(&[], &config, 0.1).is_none());
        assert!(controller.is_grounded());
        assert_eq!(controller.ground_normal(), Vec3::Y);

        let transition = controller.process_contacts(&[], &config, 0.2).unwrap();
        assert_eq!(transition.to, MovementState::Airborne);
        assert_eq!(controller.active_profile, config.air);
    }

    #[test]
    fn ceiling_contact_does_not_land() {
        let config = ControllerConfig::default();
        let mut controller = CharacterController::new();

        assert!(controller
            .process_contacts(&contacts(&[Vec3::NEG_Y]), &config, 0.0)
            .is_none());
        assert!(controller
            .process_contacts(&contacts(&[Vec3::NEG_Y]), &config, 0.1)
            .is_none());
        assert!(!controller.is_grounded());
    }

    #[test]
    fn reclassifies_while_grounded() {
        let config = ControllerConfig::default().with_slope_angles(10.0, 45.0);
        let mut controller = CharacterController::new();
        controller.process_contacts(&contacts(&[Vec3::Y]), &config, 0.0);

        // The previous flat normal still wins this tick.
        controller.process_contacts(&contacts(&[tilted(30.0)]), &config, 0.1);
        assert_eq!(controller.terrain(), Some(TerrainCategory::Flat));

        controller.process_contacts(&contacts(&[tilted(30.0)]), &config, 0.2);
        assert_eq!(controller.terrain(), Some(TerrainCategory::Slope));

        controller.process_contacts(&contacts(&[tilted(60.0)]), &config, 0.3);
        controller.process_contacts(&contacts(&[tilted(60.0)]), &config, 0.4);
        assert_eq!(controller.terrain(), Some(TerrainCategory::Steep));
        assert!(controller.is_grounded());
    }

    #[test]
    fn switching_to_same_state_is_a_no_op() {
        let config = ControllerConfig::default();
        let mut controller = CharacterController::new();
        assert!(controller
            .switch_state(MovementState::Airborne, &config, 3.0)
            .is_none());
        assert_eq!(controller.state_entered_at(), 0.0);
    }

    #[test]
    fn telemetry_display() {
        let mut controller = CharacterController::new();
        controller.planar_speed = 3.14159;
        let text = controller.telemetry().to_string();
        assert_eq!(text, "State: Airborne | Ground Type: None | Movement Speed: 3.14");

        let config = ControllerConfig::default();
        controller.process_contacts(&contacts(&[Vec3::Y]), &config, 0.0);
        let text = controller.telemetry().to_string();
        assert!(text.starts_with("State: Grounded | Ground Type: Flat"));
    }

    #[test]
    fn acceleration_accumulates_until_cleared() {
        let mut controller = CharacterController::new();
        controller.add_acceleration(Vec3::X);
        controller.add_acceleration(Vec3::Y);
        assert_eq!(controller.accumulated_acceleration(), Vec3::new(1.0, 1.0, 0.0));
        controller.clear_acceleration();
        assert_eq!(controller.accumulated_acceleration(), Vec3::ZERO);
    }
}
