//! Core controller systems.
//!
//! These systems run in `FixedUpdate`, ordered by
//! [`CharacterControllerSet`](crate::CharacterControllerSet). The ones that
//! touch velocity are generic over the physics backend.

use bevy::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::collision::ContactReport;
use crate::config::ControllerConfig;
use crate::dash::{DashOverride, DashRequest};
use crate::events::{Burnout, Dashed, Jumped, Landed};
use crate::intent::MovementIntent;
use crate::movement::{
    airborne_step, cap_fall_speed, grounded_step, rolling_rotation, rotate_onto_plane,
    split_velocity, AirborneParams, GroundedParams, RollingModel, StepContext,
};
use crate::slope::{auto_slope_modifier, terrain_angle};
use crate::state::{Airborne, CharacterController, Grounded, MovementState};

/// Reset the per-tick acceleration accumulator.
pub fn clear_accumulated_acceleration(mut q: Query<&mut CharacterController>) {
    for mut controller in &mut q {
        controller.clear_acceleration();
    }
}

/// Re-normalize configs that were edited since the last tick.
pub fn normalize_changed_configs(
    mut q: Query<(Entity, &mut ControllerConfig), Changed<ControllerConfig>>,
) {
    for (entity, mut config) in &mut q {
        let normalized = config.clone().normalized();
        if *config != normalized {
            debug!("{entity:?}: controller config clamped into range");
            *config.bypass_change_detection() = normalized;
        }
    }
}

/// Run the ground sensor and the Grounded/Airborne state machine.
pub fn update_ground_state(world: &mut World) {
    let now = world
        .get_resource::<Time>()
        .map(|t| t.elapsed_secs())
        .unwrap_or(0.0);

    let mut landed = Vec::new();
    let mut query =
        world.query::<(Entity, &ControllerConfig, &ContactReport, &mut CharacterController)>();

    for (entity, config, report, mut controller) in query.iter_mut(world) {
        let terrain = controller.terrain();
        let transition = controller.process_contacts(&report.contacts, config, now);
        if controller.terrain() != terrain {
            trace!("{entity:?}: terrain {:?} -> {:?}", terrain, controller.terrain());
        }

        let Some(transition) = transition else {
            continue;
        };

        debug!(
            "{entity:?}: {} -> {} at {now:.2}s",
            transition.from, transition.to
        );
        if transition.is_landing() {
            landed.push(Landed { entity });
        }
    }

    for event in landed {
        world.send_event(event);
    }
}

/// Turn button edges into jump and dash requests.
pub fn process_intents<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    let entities: Vec<(Entity, ControllerConfig, MovementIntent)> = world
        .query::<(Entity, &ControllerConfig, &MovementIntent, &CharacterController)>()
        .iter(world)
        .map(|(e, config, intent, _)| (e, config.clone(), intent.clone()))
        .collect();

    let mut dashed = Vec::new();

    for (entity, config, intent) in entities {
        let velocity = B::get_velocity(world, entity);

        if let Some(mut controller) = world.get_mut::<CharacterController>(entity) {
            let gravity = controller.gravity;

            if intent.jump_just_pressed() && controller.jump.try_jump(&config.jump_charges) {
                trace!("{entity:?}: jump armed");
            }

            if intent.jump_just_released() {
                controller
                    .jump
                    .evaluate_cut_off(velocity, &config.jump_charges, gravity, dt);
            }

            if intent.dash_just_pressed() {
                let request = DashRequest {
                    input_direction: intent.direction,
                    camera_forward: intent.camera_forward,
                    planar_velocity: split_velocity(velocity, controller.up()).0,
                };
                if let Some(charge) = controller.dash.try_dash(&config, &request, dt) {
                    debug!("{entity:?}: dash {charge} towards {}", controller.dash.direction);
                    dashed.push(Dashed { entity, charge });
                }
            }
        }

        if let Some(mut intent) = world.get_mut::<MovementIntent>(entity) {
            intent.latch();
        }
    }

    for event in dashed {
        world.send_event(event);
    }
}

/// What one movement tick decided for a character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MovementOutcome {
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub jumped: Option<usize>,
    pub burnout: bool,
}

/// Run one movement tick: a pending jump, or the grounded/airborne integrator.
pub(crate) fn integrate_movement(
    controller: &mut CharacterController,
    config: &ControllerConfig,
    direction: Vec3,
    velocity: Vec3,
    dt: f32,
) -> MovementOutcome {
    let ctx = StepContext::new(dt, controller.gravity);
    let up = ctx.up();

    if controller.jump.pending {
        let ground_normal = controller.ground_normal();
        if let Some(launch) = controller.jump.apply(velocity, ground_normal, config, ctx.gravity) {
            controller.rolling_velocity = Vec3::ZERO;
            controller.planar_speed = split_velocity(launch.velocity, up).0.length();
            return MovementOutcome {
                velocity: launch.velocity,
                acceleration: Vec3::ZERO,
                jumped: Some(launch.charge),
                burnout: false,
            };
        }
    }

    match controller.state {
        MovementState::Grounded => {
            let normal = match controller.ground_normal() {
                Vec3::ZERO => up,
                normal => normal,
            };
            let modifier = if config.auto_slope {
                terrain_angle(normal, up)
                    .map(|angle| auto_slope_modifier(angle, config))
                    .unwrap_or(1.0)
            } else {
                1.0
            };
            let params = GroundedParams {
                config,
                terrain: controller.terrain().unwrap_or_default(),
                profile: controller.active_profile,
                modifier,
                plane_normal: normal,
            };

            let direction = rotate_onto_plane(direction, up, normal);
            let (planar, aligned) = split_velocity(velocity, normal);
            let step = grounded_step(planar, direction, &params, &ctx);

            controller.rolling_velocity = step.planar_velocity;
            controller.planar_speed = step.planar_velocity.length();

            MovementOutcome {
                velocity: step.planar_velocity + aligned,
                acceleration: step.acceleration,
                jumped: None,
                burnout: step.burnout,
            }
        }
        MovementState::Airborne => {
            let (planar, aligned) = split_velocity(velocity, up);
            let rise = controller
                .jump
                .rise_acceleration(aligned, &config.jump_charges, ctx.gravity);

            let params = AirborneParams {
                config,
                profile: controller.active_profile,
                takeoff_speed: controller.jump.takeoff_speed,
            };
            let direction = split_velocity(direction, up).0;
            let planar = airborne_step(planar, direction, &params, &ctx);

            controller.rolling_velocity = planar;
            controller.planar_speed = planar.length();

            MovementOutcome {
                velocity: cap_fall_speed(planar + aligned, ctx.gravity, config.fall_speed_cap),
                acceleration: rise,
                jumped: None,
                burnout: false,
            }
        }
    }
}

/// Integrate velocity for every character that is not dashing.
pub fn apply_movement<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    let entities: Vec<(Entity, ControllerConfig, Vec3)> = world
        .query::<(Entity, &ControllerConfig, &MovementIntent, &CharacterController)>()
        .iter(world)
        .filter(|(_, _, _, controller)| !controller.dash.is_dashing())
        .map(|(e, config, intent, _)| (e, config.clone(), intent.direction))
        .collect();

    let mut jumped = Vec::new();
    let mut burnouts = Vec::new();

    for (entity, config, direction) in entities {
        let velocity = B::get_velocity(world, entity);

        let Some(outcome) = world
            .get_mut::<CharacterController>(entity)
            .map(|mut controller| integrate_movement(&mut controller, &config, direction, velocity, dt))
        else {
            continue;
        };

        B::set_velocity(world, entity, outcome.velocity);
        if outcome.acceleration != Vec3::ZERO {
            B::apply_acceleration(world, entity, outcome.acceleration);
        }

        if let Some(charge) = outcome.jumped {
            debug!("{entity:?}: jump {charge}, velocity {}", outcome.velocity);
            jumped.push(Jumped { entity, charge });
        }
        if outcome.burnout {
            burnouts.push(Burnout { entity });
        }
    }

    for event in jumped {
        world.send_event(event);
    }
    for event in burnouts {
        world.send_event(event);
    }
}

/// Advance dash phases and override velocity while a dash is running.
///
/// Both the freeze and the active window cancel gravity.
pub fn advance_dash<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    let entities: Vec<(Entity, ControllerConfig)> = world
        .query::<(Entity, &ControllerConfig, &CharacterController)>()
        .iter(world)
        .map(|(e, config, _)| (e, config.clone()))
        .collect();

    for (entity, config) in entities {
        let Some(mut controller) = world.get_mut::<CharacterController>(entity) else {
            continue;
        };

        let spent = controller.dash.count;
        let grounded = controller.is_grounded();
        let dash = controller.dash.tick(grounded, &config, dt);
        if spent > 0 && controller.dash.count == 0 {
            debug!("{entity:?}: dash charges restored");
        }

        let velocity = match dash {
            Some(DashOverride::Hold) => Vec3::ZERO,
            Some(DashOverride::Drive(velocity)) => velocity,
            None => continue,
        };

        let gravity = controller.gravity;
        controller.rolling_velocity = split_velocity(velocity, controller.up()).0;
        controller.planar_speed = controller.rolling_velocity.length();

        B::set_velocity(world, entity, velocity);
        B::apply_acceleration(world, entity, -gravity);
    }
}

/// Rotate each character's visual model as a ball rolling with its velocity.
pub fn roll_models<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    let rotations: Vec<(Entity, Quat)> = world
        .query::<(&CharacterController, &ControllerConfig, &RollingModel)>()
        .iter(world)
        .filter_map(|(controller, config, model)| {
            rolling_rotation(controller.rolling_velocity, controller.up(), config.sphere_radius, dt)
                .map(|rotation| (model.0, rotation))
        })
        .collect();

    for (model, rotation) in rotations {
        if let Some(mut transform) = world.get_mut::<Transform>(model) {
            transform.rotation = (rotation * transform.rotation).normalize();
        }
    }
}

/// Sync state marker components with the controller's movement state.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(Entity, &CharacterController, Has<Grounded>, Has<Airborne>)>,
) {
    for (entity, controller, has_grounded, has_airborne) in &q_controllers {
        let grounded = controller.is_grounded();

        if grounded && !has_grounded {
            commands.entity(entity).insert(Grounded);
            commands.entity(entity).remove::<Airborne>();
        } else if !grounded && has_grounded {
            commands.entity(entity).remove::<Grounded>();
            commands.entity(entity).insert(Airborne);
        } else if !grounded && !has_airborne {
            commands.entity(entity).insert(Airborne);
        }
    }
}
