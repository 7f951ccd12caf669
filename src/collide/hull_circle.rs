//! Hull-circle contact generation via SAT over the hull's edge normals (spec §4.4).

use crate::components::{Body2D, ConvexHull2D, HullWorld2D, ShapeCircle};
use crate::contact::{Contact, FEATURE_VERTEX_BIT};
use crate::ecs::{Entity, World};
use crate::fx::Fx;
use crate::pairkey::PairKey;

/// `hull` and `circle` must be the actual shape-bearing entities; caller picks which
/// side of a broadphase pair is which.
pub fn generate(world: &World, hull: Entity, circle: Entity, key: PairKey) -> Option<Contact> {
    let hull_body = world.get::<Body2D>(hull)?;
    let circle_body = world.get::<Body2D>(circle)?;
    let hull_shape = world.get::<ConvexHull2D>(hull)?;
    let circle_shape = world.get::<ShapeCircle>(circle)?;
    let world_hull = world.get::<HullWorld2D>(hull)?;

    let center = circle_body.pos();
    let n = world_hull.vertices.len();
    if n == 0 {
        return None;
    }

    let mut max_sep = Fx::from_raw(i32::MIN);
    let mut best_edge = 0usize;
    for i in 0..n {
        let normal = world_hull.normals[i];
        let v = world_hull.vertices[i];
        let sep = normal.dot(center - v) - circle_shape.r;
        if sep > max_sep {
            max_sep = sep;
            best_edge = i;
        }
    }

    // Circles carry no independent skin radius in this shape model (spec §3), so the
    // combined skin is just the hull's.
    let skin_sum = hull_shape.skin;
    if max_sep > skin_sum {
        return None;
    }

    let v0 = world_hull.vertices[best_edge];
    let v1 = world_hull.vertices[(best_edge + 1) % n];
    let edge = v1 - v0;
    let edge_len_sq = edge.len_sq();
    let t = if edge_len_sq.is_zero() { Fx::ZERO } else { (center - v0).dot(edge).div(edge_len_sq) };

    let (feature_id, surface_point, normal) = if t < Fx::ZERO {
        (FEATURE_VERTEX_BIT | best_edge as u32, v0, (center - v0).normalize())
    } else if t > Fx::ONE {
        let vi = (best_edge + 1) % n;
        (FEATURE_VERTEX_BIT | vi as u32, v1, (center - v1).normalize())
    } else {
        (best_edge as u32, v0 + edge.scale(t), world_hull.normals[best_edge])
    };

    let penetration = circle_shape.r + skin_sum - max_sep;
    if penetration <= Fx::ZERO {
        return None;
    }
    let point = surface_point + normal.scale(penetration.div(Fx::from_f64(2.0)));

    let friction = (hull_body.friction + circle_body.friction).div(Fx::from_f64(2.0));
    let restitution = hull_body.restitution.max(circle_body.restitution);

    Some(Contact::new_regular(hull, circle, key, feature_id, normal, point, penetration, friction, restitution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadphase::SyncAabbSystem;
    use crate::ecs::System;
    use crate::fx::Vec2Fx;

    fn square_hull(half: f64) -> ConvexHull2D {
        ConvexHull2D {
            local_vertices: vec![
                Vec2Fx::new(Fx::from_f64(-half), Fx::from_f64(-half)),
                Vec2Fx::new(Fx::from_f64(half), Fx::from_f64(-half)),
                Vec2Fx::new(Fx::from_f64(half), Fx::from_f64(half)),
                Vec2Fx::new(Fx::from_f64(-half), Fx::from_f64(half)),
            ],
            skin: Fx::ZERO,
        }
    }

    #[test]
    fn circle_touching_face_generates_face_feature() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        let hull = world.spawn();
        world.insert(hull, Body2D::new_static(Fx::ZERO, Fx::ZERO));
        world.insert(hull, square_hull(1.0));
        let circle = world.spawn();
        world.insert(circle, Body2D::new_dynamic(Fx::from_f64(1.5), Fx::ZERO, Fx::ONE, Fx::ONE));
        world.insert(circle, ShapeCircle { r: Fx::from_f64(1.0) });

        SyncAabbSystem.run(&mut world);
        let pair = crate::pairkey::make_pair_key(&world, hull, circle);
        let c = generate(&world, hull, circle, pair.key).unwrap();
        assert_eq!(c.feature_id, 1); // right edge
        assert!(c.penetration > Fx::ZERO);
    }

    #[test]
    fn circle_far_from_hull_generates_no_contact() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        let hull = world.spawn();
        world.insert(hull, Body2D::new_static(Fx::ZERO, Fx::ZERO));
        world.insert(hull, square_hull(1.0));
        let circle = world.spawn();
        world.insert(circle, Body2D::new_dynamic(Fx::from_f64(10.0), Fx::ZERO, Fx::ONE, Fx::ONE));
        world.insert(circle, ShapeCircle { r: Fx::from_f64(1.0) });

        SyncAabbSystem.run(&mut world);
        let pair = crate::pairkey::make_pair_key(&world, hull, circle);
        assert!(generate(&world, hull, circle, pair.key).is_none());
    }
}
