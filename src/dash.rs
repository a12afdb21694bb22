//! Multi-charge dashing.
//!
//! A dash goes through a short freeze (velocity held at zero), then an active
//! window where velocity is overridden with `direction * speed`. Both phases
//! cancel gravity. Charges are consumed when the dash starts and come back
//! according to [`DashRecharge`].

use bevy::prelude::*;

use crate::config::{ControllerConfig, DashRecharge};

/// Number of fixed ticks covering `seconds`.
#[inline]
pub fn ticks_for(seconds: f32, dt: f32) -> u32 {
    if dt <= 0.0 || !seconds.is_finite() {
        return 0;
    }
    (seconds.max(0.0) / dt).round() as u32
}

/// Current phase of the dash controller.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashPhase {
    /// Not dashing; charges may remain.
    #[default]
    Ready,
    /// Velocity held at zero for `remaining` more ticks.
    Freeze { remaining: u32 },
    /// Velocity overridden for `remaining` more ticks.
    Active { remaining: u32 },
    /// Charges exhausted, waiting for the ground.
    AwaitingGround,
    /// Charges exhausted, waiting `remaining` more ticks.
    Cooldown { remaining: u32 },
}

/// What the dash wants to do with the velocity this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DashOverride {
    /// Hold velocity at zero.
    Hold,
    /// Drive velocity to this value.
    Drive(Vec3),
}

/// Inputs sampled when a dash starts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DashRequest {
    /// Desired direction from input (may be zero).
    pub input_direction: Vec3,
    /// Camera forward, used when there is no input.
    pub camera_forward: Vec3,
    /// Current planar velocity, used by charges that lock the direction.
    pub planar_velocity: Vec3,
}

/// Dash bookkeeping for one character.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct DashState {
    /// Phase machine.
    pub phase: DashPhase,
    /// Charges consumed since the last recharge.
    pub count: usize,
    /// Direction of the current dash.
    pub direction: Vec3,
    /// Speed of the current dash.
    pub speed: f32,
    active_ticks: u32,
}

impl DashState {
    /// Whether the dash currently owns the velocity.
    #[inline]
    pub fn is_dashing(&self) -> bool {
        matches!(self.phase, DashPhase::Freeze { .. } | DashPhase::Active { .. })
    }

    /// Charges left before a recharge is required.
    #[inline]
    pub fn charges_left(&self, config: &ControllerConfig) -> usize {
        config.dash_charges.len().saturating_sub(self.count)
    }

    /// Start a dash if allowed. Returns the index of the consumed charge.
    ///
    /// Rejected while already dashing or when every charge is spent.
    pub fn try_dash(&mut self, config: &ControllerConfig, request: &DashRequest, dt: f32) -> Option<usize> {
        if self.is_dashing() {
            return None;
        }
        let charge = config.dash_charges.get(self.count).copied()?;

        let camera_forward = request.camera_forward.normalize_or_zero();
        let direction = if charge.can_change_direction {
            request.input_direction.normalize_or_zero()
        } else {
            request.planar_velocity.normalize_or_zero()
        };
        self.direction = if direction == Vec3::ZERO {
            camera_forward
        } else {
            direction
        };
        self.speed = charge.speed;
        self.active_ticks = ticks_for(charge.duration, dt);

        let index = self.count;
        self.count += 1;

        if charge.freeze_frames > 0 {
            self.phase = DashPhase::Freeze {
                remaining: charge.freeze_frames,
            };
        } else {
            self.start_active(config, dt);
        }

        Some(index)
    }

    /// Advance one fixed tick.
    ///
    /// Returns the velocity override for this tick, if any.
    pub fn tick(&mut self, grounded: bool, config: &ControllerConfig, dt: f32) -> Option<DashOverride> {
        match self.phase {
            DashPhase::Ready => None,
            DashPhase::Freeze { remaining } => {
                if remaining > 1 {
                    self.phase = DashPhase::Freeze {
                        remaining: remaining - 1,
                    };
                } else {
                    self.start_active(config, dt);
                }
                Some(DashOverride::Hold)
            }
            DashPhase::Active { remaining } => {
                if remaining > 1 {
                    self.phase = DashPhase::Active {
                        remaining: remaining - 1,
                    };
                } else {
                    self.finish(config, dt);
                }
                Some(DashOverride::Drive(self.direction * self.speed))
            }
            DashPhase::AwaitingGround => {
                if grounded {
                    self.recharge();
                }
                None
            }
            DashPhase::Cooldown { remaining } => {
                if remaining > 1 {
                    self.phase = DashPhase::Cooldown {
                        remaining: remaining - 1,
                    };
                } else {
                    self.recharge();
                }
                None
            }
        }
    }

    /// Restore every charge.
    pub fn recharge(&mut self) {
        self.count = 0;
        self.phase = DashPhase::Ready;
    }

    fn start_active(&mut self, config: &ControllerConfig, dt: f32) {
        if self.active_ticks > 0 {
            self.phase = DashPhase::Active {
                remaining: self.active_ticks,
            };
        } else {
            self.finish(config, dt);
        }
    }

    fn finish(&mut self, config: &ControllerConfig, dt: f32) {
        if self.count < config.dash_charges.len() {
            self.phase = DashPhase::Ready;
            return;
        }
        self.phase = match config.dash_recharge {
            DashRecharge::OnGround => DashPhase::AwaitingGround,
            DashRecharge::Cooldown => match ticks_for(config.dash_recharge_time, dt) {
                0 => {
                    self.count = 0;
                    DashPhase::Ready
                }
                remaining => DashPhase::Cooldown { remaining },
            },
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashCharge;

    const DT: f32 = 0.02;

    fn request(input: Vec3) -> DashRequest {
        DashRequest {
            input_direction: input,
            camera_forward: Vec3::NEG_Z,
            planar_velocity: Vec3::new(3.0, 0.0, 0.0),
        }
    }

    fn single_charge(recharge: DashRecharge) -> ControllerConfig {
        ControllerConfig::default()
            .with_dash_charges(vec![DashCharge::new(20.0, 0.1, true, 2)])
            .with_dash_recharge(recharge, 0.1)
    }

    #[test]
    fn ticks_for_rounds() {
        assert_eq!(ticks_for(0.1, 0.02), 5);
        assert_eq!(ticks_for(0.2, 1.0 / 60.0), 12);
        assert_eq!(ticks_for(1.0, 0.0), 0);
    }

    #[test]
    fn dash_consumes_charge_immediately() {
        let config = single_charge(DashRecharge::OnGround);
        let mut dash = DashState::default();

        assert_eq!(dash.try_dash(&config, &request(Vec3::X), DT), Some(0));
        assert_eq!(dash.charges_left(&config), 0);
        assert!(dash.is_dashing());

        // Already dashing.
        assert_eq!(dash.try_dash(&config, &request(Vec3::X), DT), None);
    }

    #[test]
    fn freeze_then_drive_then_wait_for_ground() {
        let config = single_charge(DashRecharge::OnGround);
        let mut dash = DashState::default();
        dash.try_dash(&config, &request(Vec3::X), DT);

        assert_eq!(dash.tick(false, &config, DT), Some(DashOverride::Hold));
        assert_eq!(dash.tick(false, &config, DT), Some(DashOverride::Hold));
        for _ in 0..5 {
            assert_eq!(
                dash.tick(false, &config, DT),
                Some(DashOverride::Drive(Vec3::new(20.0, 0.0, 0.0)))
            );
        }
        assert!(!dash.is_dashing());
        assert_eq!(dash.phase, DashPhase::AwaitingGround);

        // Airborne: nothing comes back.
        for _ in 0..10 {
            assert_eq!(dash.tick(false, &config, DT), None);
        }
        assert_eq!(dash.try_dash(&config, &request(Vec3::X), DT), None);

        dash.tick(true, &config, DT);
        assert_eq!(dash.count, 0);
        assert_eq!(dash.phase, DashPhase::Ready);
        assert_eq!(dash.try_dash(&config, &request(Vec3::X), DT), Some(0));
    }

    #[test]
    fn cooldown_recharge_after_time() {
        let config = single_charge(DashRecharge::Cooldown);
        let mut dash = DashState::default();
        dash.try_dash(&config, &request(Vec3::X), DT);

        for _ in 0..7 {
            dash.tick(false, &config, DT);
        }
        assert_eq!(dash.phase, DashPhase::Cooldown { remaining: 5 });

        for _ in 0..4 {
            dash.tick(false, &config, DT);
            assert_eq!(dash.count, 1);
        }
        dash.tick(false, &config, DT);
        assert_eq!(dash.count, 0);
        assert_eq!(dash.phase, DashPhase::Ready);
    }

    #[test]
    fn remaining_charges_return_to_ready() {
        let config = ControllerConfig::default()
            .with_dash_charges(vec![DashCharge::new(20.0, 0.02, true, 0), DashCharge::new(10.0, 0.02, true, 0)]);
        let mut dash = DashState::default();

        assert_eq!(dash.try_dash(&config, &request(Vec3::X), DT), Some(0));
        assert_eq!(dash.phase, DashPhase::Active { remaining: 1 });
        dash.tick(false, &config, DT);
        assert_eq!(dash.phase, DashPhase::Ready);

        assert_eq!(dash.try_dash(&config, &request(Vec3::Z), DT), Some(1));
        assert_eq!(dash.speed, 10.0);
        assert_eq!(dash.direction, Vec3::Z);
    }

    #[test]
    fn no_input_dashes_along_camera_forward() {
        let config = single_charge(DashRecharge::OnGround);
        let mut dash = DashState::default();
        dash.try_dash(&config, &request(Vec3::ZERO), DT);
        assert_eq!(dash.direction, Vec3::NEG_Z);
    }

    #[test]
    fn locked_direction_uses_planar_velocity() {
        let config = ControllerConfig::default().with_dash_charges(vec![DashCharge::new(20.0, 0.1, false, 0)]);
        let mut dash = DashState::default();
        dash.try_dash(&config, &request(Vec3::Z), DT);
        assert_eq!(dash.direction, Vec3::X);
    }

    #[test]
    fn no_charges_means_no_dash() {
        let config = ControllerConfig::default().with_dash_charges(Vec::new());
        let mut dash = DashState::default();
        assert_eq!(dash.try_dash(&config, &request(Vec3::X), DT), None);
        assert!(!dash.is_dashing());
    }
}
