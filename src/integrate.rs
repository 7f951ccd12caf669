//! First pipeline stage (spec §2 dataflow): advances position and orientation from each
//! awake dynamic body's current velocity, semi-implicit-Euler style.
//!
//! Gravity and other external forces are deliberately not modelled here — spec.md's own
//! end-to-end scenarios apply gravity "externally" (`vy -= 9.8*dt` written directly onto
//! `Body2D` by the caller before a tick), so this core only integrates whatever velocity
//! is already on the body. That keeps the core's contract to "resolve constraints
//! deterministically," not "own a force model."

use crate::components::Body2D;
use crate::ecs::{Entity, System, World};
use crate::geometry::wrap_to_pi;

pub struct IntegrateVelocitiesSystem;

impl System for IntegrateVelocitiesSystem {
    fn name(&self) -> &'static str {
        "integrate_velocities"
    }

    fn run(&mut self, world: &mut World) {
        let dt = world.dt();
        let entities: Vec<Entity> = world.iter_entities_with::<Body2D>();
        for entity in entities {
            let body = world.get_mut::<Body2D>(entity).unwrap();
            if body.is_static() || !body.awake {
                continue;
            }
            body.px = body.px + body.vx.mul(dt);
            body.py = body.py + body.vy.mul(dt);
            body.angle = wrap_to_pi(body.angle + body.w.mul(dt));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::Fx;

    #[test]
    fn dynamic_body_advances_by_velocity() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        let e = world.spawn();
        let mut b = Body2D::new_dynamic(Fx::ZERO, Fx::ZERO, Fx::ONE, Fx::ONE);
        b.vx = Fx::from_f64(60.0);
        world.insert(e, b);
        IntegrateVelocitiesSystem.run(&mut world);
        let body = world.get::<Body2D>(e).unwrap();
        assert!((body.px.to_f64() - 1.0).abs() < 0.01);
    }

    #[test]
    fn sleeping_body_does_not_move() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        let e = world.spawn();
        let mut b = Body2D::new_dynamic(Fx::ZERO, Fx::ZERO, Fx::ONE, Fx::ONE);
        b.vx = Fx::from_f64(60.0);
        b.awake = false;
        world.insert(e, b);
        IntegrateVelocitiesSystem.run(&mut world);
        assert_eq!(world.get::<Body2D>(e).unwrap().px, Fx::ZERO);
    }

    #[test]
    fn static_body_ignores_velocity() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        let e = world.spawn();
        let mut b = Body2D::new_static(Fx::ZERO, Fx::ZERO);
        b.vx = Fx::from_f64(60.0);
        world.insert(e, b);
        IntegrateVelocitiesSystem.run(&mut world);
        assert_eq!(world.get::<Body2D>(e).unwrap().px, Fx::ZERO);
    }
}
