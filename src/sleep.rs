//! Sleep / wake (spec §4.10).

use crate::components::{Body2D, Sleep2D};
use crate::contact::Contacts2D;
use crate::ecs::{Entity, System, World};
use crate::fx::Fx;
use crate::resources::PhysicsSleepConfig;

/// Per-body idle detection: accumulates a timer while linear and angular speed stay
/// below threshold, puts the body to sleep once the timer crosses `timeToSleep`.
pub struct SleepUpdateSystem;

impl System for SleepUpdateSystem {
    fn name(&self) -> &'static str {
        "sleep_update"
    }

    fn run(&mut self, world: &mut World) {
        let dt = world.dt();
        let config = *world.resource::<PhysicsSleepConfig>();
        let entities: Vec<Entity> = world.iter_entities_with::<Body2D>();

        for entity in entities {
            let body = *world.get::<Body2D>(entity).unwrap();
            if body.is_static() {
                if let Some(b) = world.get_mut::<Body2D>(entity) {
                    b.awake = true;
                }
                if let Some(s) = world.get_mut::<Sleep2D>(entity) {
                    s.timer = Fx::ZERO;
                }
                continue;
            }

            let lin_sq = body.vx.mul(body.vx) + body.vy.mul(body.vy);
            let keep_awake = world.get::<Sleep2D>(entity).map(|s| s.keep_awake).unwrap_or(false);

            let below_thresh =
                lin_sq <= config.lin_thresh.mul(config.lin_thresh) && body.w.abs() <= config.ang_thresh;

            if keep_awake || !below_thresh {
                if let Some(b) = world.get_mut::<Body2D>(entity) {
                    b.awake = true;
                }
                if let Some(s) = world.get_mut::<Sleep2D>(entity) {
                    s.timer = Fx::ZERO;
                    s.sleeping = false;
                } else {
                    world.insert(entity, Sleep2D { sleeping: false, timer: Fx::ZERO, keep_awake });
                }
                continue;
            }

            let timer = world.get::<Sleep2D>(entity).map(|s| s.timer).unwrap_or(Fx::ZERO);
            let new_timer = timer + dt.mul(config.wake_bias);
            let should_sleep = new_timer >= config.time_to_sleep;

            if should_sleep {
                if let Some(b) = world.get_mut::<Body2D>(entity) {
                    b.awake = false;
                    b.vx = Fx::ZERO;
                    b.vy = Fx::ZERO;
                    b.w = Fx::ZERO;
                }
            }
            match world.get_mut::<Sleep2D>(entity) {
                Some(s) => {
                    s.timer = new_timer;
                    s.sleeping = should_sleep;
                }
                None => {
                    world.insert(entity, Sleep2D { sleeping: should_sleep, timer: new_timer, keep_awake });
                }
            }
        }
    }
}

/// Walks the current contact list and wakes any sleeping body touching an awake one
/// (spec §4.10). Two bodies that are both asleep in the same contact leave each other
/// alone — otherwise a settled stack would wake its neighbors every tick forever.
pub struct WakeOnContactSystem;

impl System for WakeOnContactSystem {
    fn name(&self) -> &'static str {
        "wake_on_contact"
    }

    fn run(&mut self, world: &mut World) {
        let pairs: Vec<(Entity, Entity)> =
            world.resource::<Contacts2D>().list.iter().map(|c| (c.a, c.b)).collect();
        for (a, b) in pairs {
            let awake_a = world.get::<Body2D>(a).map(|body| body.awake).unwrap_or(true);
            let awake_b = world.get::<Body2D>(b).map(|body| body.awake).unwrap_or(true);
            if awake_b {
                wake(world, a);
            }
            if awake_a {
                wake(world, b);
            }
        }
    }
}

pub(crate) fn wake(world: &mut World, entity: Entity) {
    let sleeping = world.get::<Sleep2D>(entity).map(|s| s.sleeping).unwrap_or(false);
    if !sleeping {
        return;
    }
    if let Some(b) = world.get_mut::<Body2D>(entity) {
        if b.is_static() {
            return;
        }
        b.awake = true;
    }
    if let Some(s) = world.get_mut::<Sleep2D>(entity) {
        s.sleeping = false;
        s.timer = Fx::ZERO;
    }
}

/// Wakes a body whose solved impulse exceeded `impulseWake` — called by solver systems
/// rather than run as its own scheduled stage, since it needs the impulse magnitude at
/// the moment it's computed (spec §4.10: "an external system or solver writing an
/// impulse larger than `impulseWake` wakes the target").
pub fn wake_on_impulse(world: &mut World, entity: Entity, impulse_magnitude: Fx) {
    let threshold = world.resource::<PhysicsSleepConfig>().impulse_wake;
    if impulse_magnitude > threshold {
        wake(world, entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_body_falls_asleep_after_time_to_sleep() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        world.insert_resource(PhysicsSleepConfig::default());
        let e = world.spawn();
        world.insert(e, Body2D::new_dynamic(Fx::ZERO, Fx::ZERO, Fx::ONE, Fx::ONE));
        world.get_mut::<Body2D>(e).unwrap().vx = Fx::ZERO;

        for _ in 0..200 {
            SleepUpdateSystem.run(&mut world);
        }
        assert!(world.get::<Sleep2D>(e).unwrap().sleeping);
        let body = world.get::<Body2D>(e).unwrap();
        assert_eq!(body.vx, Fx::ZERO);
        assert!(!body.awake);
    }

    #[test]
    fn moving_body_resets_timer() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        world.insert_resource(PhysicsSleepConfig::default());
        let e = world.spawn();
        let mut b = Body2D::new_dynamic(Fx::ZERO, Fx::ZERO, Fx::ONE, Fx::ONE);
        b.vx = Fx::from_f64(5.0);
        world.insert(e, b);
        SleepUpdateSystem.run(&mut world);
        assert!(!world.get::<Sleep2D>(e).unwrap().sleeping);
        assert_eq!(world.get::<Sleep2D>(e).unwrap().timer, Fx::ZERO);
    }

    #[test]
    fn static_body_is_always_awake() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        world.insert_resource(PhysicsSleepConfig::default());
        let e = world.spawn();
        world.insert(e, Body2D::new_static(Fx::ZERO, Fx::ZERO));
        SleepUpdateSystem.run(&mut world);
        assert!(world.get::<Body2D>(e).unwrap().awake);
    }

    #[test]
    fn wake_on_contact_wakes_sleeping_body() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        world.insert_resource(Contacts2D::new());
        let a = world.spawn();
        world.insert(a, Body2D::new_dynamic(Fx::ZERO, Fx::ZERO, Fx::ONE, Fx::ONE));
        world.insert(a, Sleep2D { sleeping: true, timer: Fx::ZERO, keep_awake: false });
        let b = world.spawn();
        world.insert(b, Body2D::new_dynamic(Fx::ONE, Fx::ZERO, Fx::ONE, Fx::ONE));

        let key = crate::pairkey::make_pair_key(&world, a, b).key;
        world.resource_mut::<Contacts2D>().list.push(crate::contact::Contact::new_regular(
            a,
            b,
            key,
            0,
            crate::fx::Vec2Fx::new(Fx::ONE, Fx::ZERO),
            crate::fx::Vec2Fx::ZERO,
            Fx::ZERO,
            Fx::ZERO,
            Fx::ZERO,
        ));

        WakeOnContactSystem.run(&mut world);
        assert!(!world.get::<Sleep2D>(a).unwrap().sleeping);
    }
}
