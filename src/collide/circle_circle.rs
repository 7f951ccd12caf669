//! Circle-circle contact generation (spec §4.4).

use crate::components::{Body2D, ShapeCircle};
use crate::contact::Contact;
use crate::ecs::{Entity, World};
use crate::fx::Vec2Fx;
use crate::pairkey::PairKey;

pub fn generate(world: &World, a: Entity, b: Entity, key: PairKey) -> Option<Contact> {
    let body_a = world.get::<Body2D>(a)?;
    let body_b = world.get::<Body2D>(b)?;
    let shape_a = world.get::<ShapeCircle>(a)?;
    let shape_b = world.get::<ShapeCircle>(b)?;

    let d = body_b.pos() - body_a.pos();
    let r_sum = shape_a.r + shape_b.r;

    // L-infinity reject (spec §4.4).
    if d.x.abs() > r_sum || d.y.abs() > r_sum {
        return None;
    }
    if d.len_sq() >= r_sum.mul(r_sum) {
        return None;
    }

    let (normal, dist) = if d.x.is_zero() && d.y.is_zero() {
        (Vec2Fx::new(crate::fx::Fx::ONE, crate::fx::Fx::ZERO), crate::fx::Fx::ZERO)
    } else {
        let dist = d.len_approx();
        (d.normalize(), dist)
    };

    let penetration = r_sum - dist;
    let point = body_a.pos() + normal.scale(shape_a.r);
    let friction = (body_a.friction + body_b.friction).div(crate::fx::Fx::from_f64(2.0));
    let restitution = body_a.restitution.max(body_b.restitution);

    Some(Contact::new_regular(a, b, key, crate::contact::FEATURE_CIRCLE, normal, point, penetration, friction, restitution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::Fx;

    #[test]
    fn overlapping_circles_generate_contact() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        let a = world.spawn();
        world.insert(a, Body2D::new_dynamic(Fx::ZERO, Fx::ZERO, Fx::ONE, Fx::ONE));
        world.insert(a, ShapeCircle { r: Fx::ONE });
        let b = world.spawn();
        world.insert(b, Body2D::new_dynamic(Fx::from_f64(1.5), Fx::ZERO, Fx::ONE, Fx::ONE));
        world.insert(b, ShapeCircle { r: Fx::ONE });

        let pair = crate::pairkey::make_pair_key(&world, a, b);
        let c = generate(&world, pair.a, pair.b, pair.key).unwrap();
        assert!(c.penetration > Fx::ZERO);
        assert_eq!(c.normal, Vec2Fx::new(Fx::ONE, Fx::ZERO));
    }

    #[test]
    fn distant_circles_generate_no_contact() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        let a = world.spawn();
        world.insert(a, Body2D::new_dynamic(Fx::ZERO, Fx::ZERO, Fx::ONE, Fx::ONE));
        world.insert(a, ShapeCircle { r: Fx::ONE });
        let b = world.spawn();
        world.insert(b, Body2D::new_dynamic(Fx::from_f64(5.0), Fx::ZERO, Fx::ONE, Fx::ONE));
        world.insert(b, ShapeCircle { r: Fx::ONE });

        let pair = crate::pairkey::make_pair_key(&world, a, b);
        assert!(generate(&world, pair.a, pair.b, pair.key).is_none());
    }

    #[test]
    fn concentric_circles_use_fallback_normal() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        let a = world.spawn();
        world.insert(a, Body2D::new_dynamic(Fx::ZERO, Fx::ZERO, Fx::ONE, Fx::ONE));
        world.insert(a, ShapeCircle { r: Fx::ONE });
        let b = world.spawn();
        world.insert(b, Body2D::new_dynamic(Fx::ZERO, Fx::ZERO, Fx::ONE, Fx::ONE));
        world.insert(b, ShapeCircle { r: Fx::ONE });

        let pair = crate::pairkey::make_pair_key(&world, a, b);
        let c = generate(&world, pair.a, pair.b, pair.key).unwrap();
        assert_eq!(c.normal, Vec2Fx::new(Fx::ONE, Fx::ZERO));
        assert_eq!(c.penetration, Fx::from_f64(2.0));
    }
}
