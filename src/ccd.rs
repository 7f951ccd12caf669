//! Speculative continuous collision detection (spec §4.5).
//!
//! Runs after narrowphase over the same broadphase pairs, adding a synthesized contact
//! for any pair that isn't touching yet but will tunnel through within this tick.

use crate::components::{Body2D, ConvexHull2D, HullWorld2D, ShapeCircle};
use crate::contact::Contact;
use crate::ecs::{Entity, System, World};
use crate::fx::{Fx, Vec2Fx};
use crate::resources::BroadphasePairs;

/// Current separation and contact normal (pointing from `a` to `b`) for a pair that
/// narrowphase did not already report as touching. Returns `None` if the shapes aren't
/// a combination this function knows how to measure (hull-hull CCD is out of scope —
/// hull-hull pairs rely on discrete contacts only).
fn measure(world: &World, a: Entity, b: Entity) -> Option<(Fx, Vec2Fx)> {
    let body_a = world.get::<Body2D>(a)?;
    let body_b = world.get::<Body2D>(b)?;

    if let (Some(ca), Some(cb)) = (world.get::<ShapeCircle>(a), world.get::<ShapeCircle>(b)) {
        let d = body_b.pos() - body_a.pos();
        let dist = d.len_approx();
        let normal = if dist.is_zero() { Vec2Fx::new(Fx::ONE, Fx::ZERO) } else { d.normalize() };
        return Some((dist - ca.r - cb.r, normal));
    }

    if let (Some(hull_shape), Some(hw), Some(circle)) =
        (world.get::<ConvexHull2D>(a), world.get::<HullWorld2D>(a), world.get::<ShapeCircle>(b))
    {
        let center = body_b.pos();
        let n = hw.vertices.len();
        if n == 0 {
            return None;
        }
        let mut max_sep = Fx::from_raw(i32::MIN);
        let mut best_normal = hw.normals[0];
        for i in 0..n {
            let sep = hw.normals[i].dot(center - hw.vertices[i]);
            if sep > max_sep {
                max_sep = sep;
                best_normal = hw.normals[i];
            }
        }
        return Some((max_sep - circle.r - hull_shape.skin, best_normal));
    }

    if let (Some(circle), Some(hull_shape), Some(hw)) =
        (world.get::<ShapeCircle>(a), world.get::<ConvexHull2D>(b), world.get::<HullWorld2D>(b))
    {
        let center = body_a.pos();
        let n = hw.vertices.len();
        if n == 0 {
            return None;
        }
        let mut max_sep = Fx::from_raw(i32::MIN);
        let mut best_normal = hw.normals[0];
        for i in 0..n {
            let sep = hw.normals[i].dot(center - hw.vertices[i]);
            if sep > max_sep {
                max_sep = sep;
                best_normal = hw.normals[i];
            }
        }
        return Some((max_sep - circle.r - hull_shape.skin, best_normal.neg()));
    }

    None
}

pub struct SpeculativeCcdSystem;

impl System for SpeculativeCcdSystem {
    fn name(&self) -> &'static str {
        "speculative_ccd"
    }

    fn run(&mut self, world: &mut World) {
        let dt = world.dt();
        let pairs = world.resource::<BroadphasePairs>().pairs.clone();
        let already_touching: std::collections::HashSet<(Entity, Entity)> = world
            .resource::<crate::contact::Contacts2D>()
            .list
            .iter()
            .map(|c| (c.a, c.b))
            .collect();

        let mut speculative = Vec::new();
        for (a, b) in pairs {
            if already_touching.contains(&(a, b)) {
                continue;
            }
            let (s0, normal) = match measure(world, a, b) {
                Some(v) => v,
                None => continue,
            };
            if s0 <= Fx::ZERO {
                continue;
            }
            let body_a = world.get::<Body2D>(a).unwrap();
            let body_b = world.get::<Body2D>(b).unwrap();
            let vn = (body_b.vel() - body_a.vel()).dot(normal);
            if vn >= Fx::ZERO {
                continue;
            }
            let projected = s0 + vn.mul(dt);
            if projected >= Fx::ZERO {
                continue;
            }

            let key = crate::pairkey::make_pair_key(world, a, b).key;
            let penetration = projected.neg();
            let toi = s0.div(vn.neg()).div(dt).clamp(Fx::ZERO, Fx::ONE);
            let friction = (body_a.friction + body_b.friction).div(Fx::from_f64(2.0));
            let point = body_a.pos() + normal.scale(s0);

            let mut contact = Contact::new_regular(
                a,
                b,
                key,
                crate::contact::FEATURE_CIRCLE,
                normal,
                point,
                penetration,
                friction,
                Fx::ZERO, // restitution forced to zero on speculative contacts (spec §4.5)
            );
            contact.speculative = true;
            contact.toi = toi;
            speculative.push(contact);
        }

        if speculative.is_empty() {
            return;
        }
        let contacts = world.resource_mut::<crate::contact::Contacts2D>();
        contacts.list.extend(speculative);
        contacts.sort_canonical();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadphase::{BroadphaseSystem, SyncAabbSystem};

    #[test]
    fn fast_approach_generates_speculative_contact() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        world.insert_resource(BroadphasePairs::new());
        world.insert_resource(crate::contact::Contacts2D::new());

        let a = world.spawn();
        world.insert(a, Body2D::new_dynamic(Fx::from_f64(-8.0), Fx::ZERO, Fx::ONE, Fx::ONE));
        world.get_mut::<Body2D>(a).unwrap().vx = Fx::from_f64(50.0);
        world.insert(a, ShapeCircle { r: Fx::from_f64(0.1) });

        let b = world.spawn();
        world.insert(b, Body2D::new_static(Fx::from_f64(8.0), Fx::ZERO));
        world.insert(b, ShapeCircle { r: Fx::from_f64(1.0) });

        SyncAabbSystem.run(&mut world);
        BroadphaseSystem.run(&mut world);
        crate::collide::NarrowphaseSystem.run(&mut world);
        SpeculativeCcdSystem.run(&mut world);

        let contacts = world.resource::<crate::contact::Contacts2D>();
        assert!(contacts.list.iter().any(|c| c.speculative));
    }

    #[test]
    fn slow_approach_generates_no_speculative_contact() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        world.insert_resource(BroadphasePairs::new());
        world.insert_resource(crate::contact::Contacts2D::new());

        let a = world.spawn();
        world.insert(a, Body2D::new_dynamic(Fx::from_f64(-8.0), Fx::ZERO, Fx::ONE, Fx::ONE));
        world.get_mut::<Body2D>(a).unwrap().vx = Fx::from_f64(0.01);
        world.insert(a, ShapeCircle { r: Fx::from_f64(0.1) });

        let b = world.spawn();
        world.insert(b, Body2D::new_static(Fx::from_f64(8.0), Fx::ZERO));
        world.insert(b, ShapeCircle { r: Fx::from_f64(1.0) });

        SyncAabbSystem.run(&mut world);
        BroadphaseSystem.run(&mut world);
        crate::collide::NarrowphaseSystem.run(&mut world);
        SpeculativeCcdSystem.run(&mut world);

        let contacts = world.resource::<crate::contact::Contacts2D>();
        assert!(!contacts.list.iter().any(|c| c.speculative));
    }
}
