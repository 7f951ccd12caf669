//! AABB sync and sweep-and-prune broadphase (spec §4.3).

use crate::components::{AABB2D, Body2D, CircleWorld2D, HullWorld2D, ShapeCircle};
use crate::ecs::{Entity, System, World};
use crate::fx::Vec2Fx;
use crate::resources::BroadphasePairs;

/// Recomputes [`AABB2D`] for every body carrying a circle or hull shape.
pub struct SyncAabbSystem;

impl System for SyncAabbSystem {
    fn name(&self) -> &'static str {
        "sync_aabb"
    }

    fn run(&mut self, world: &mut World) {
        let circles: Vec<Entity> = world.iter_entities_with::<ShapeCircle>();
        for entity in circles {
            let body = match world.get::<Body2D>(entity) {
                Some(b) => *b,
                None => continue,
            };
            let shape = *world.get::<ShapeCircle>(entity).unwrap();
            let center = body.pos();
            world.insert(entity, CircleWorld2D { center });
            let r = shape.r;
            world.insert(
                entity,
                AABB2D {
                    min: Vec2Fx::new(center.x - r, center.y - r),
                    max: Vec2Fx::new(center.x + r, center.y + r),
                },
            );
        }

        let hulls: Vec<Entity> = world.iter_entities_with::<crate::components::ConvexHull2D>();
        for entity in hulls {
            let body = match world.get::<Body2D>(entity) {
                Some(b) => *b,
                None => continue,
            };
            let hull = world.get::<crate::components::ConvexHull2D>(entity).unwrap().clone();
            let (sin_a, cos_a) = crate::geometry::angle_sin_cos(body.angle);
            let mut vertices = Vec::with_capacity(hull.local_vertices.len());
            for v in &hull.local_vertices {
                vertices.push(crate::geometry::rotate(*v, sin_a, cos_a) + body.pos());
            }
            let mut normals = Vec::with_capacity(vertices.len());
            let n = vertices.len();
            for i in 0..n {
                let edge = vertices[(i + 1) % n] - vertices[i];
                normals.push(edge.perp().normalize());
            }

            let mut min = vertices[0];
            let mut max = vertices[0];
            for v in &vertices[1..] {
                min = Vec2Fx::new(min.x.min(v.x), min.y.min(v.y));
                max = Vec2Fx::new(max.x.max(v.x), max.y.max(v.y));
            }
            let skin = hull.skin;
            world.insert(entity, HullWorld2D { vertices, normals });
            world.insert(
                entity,
                AABB2D {
                    min: Vec2Fx::new(min.x - skin, min.y - skin),
                    max: Vec2Fx::new(max.x + skin, max.y + skin),
                },
            );
        }
    }
}

#[derive(Clone, Copy)]
struct Endpoint {
    x: crate::fx::Fx,
    closing: bool,
    entity: Entity,
    index_in_pairs_input: usize,
}

/// Sweep-and-prune on the X axis, producing candidate pairs in insertion order
/// (ordering guarantees O2/O3).
pub struct BroadphaseSystem;

impl System for BroadphaseSystem {
    fn name(&self) -> &'static str {
        "broadphase"
    }

    fn run(&mut self, world: &mut World) {
        let entities: Vec<Entity> = world.iter_entities_with::<AABB2D>();
        let boxes: Vec<AABB2D> = entities.iter().map(|&e| *world.get::<AABB2D>(e).unwrap()).collect();

        let mut endpoints = Vec::with_capacity(entities.len() * 2);
        for (i, (&entity, aabb)) in entities.iter().zip(boxes.iter()).enumerate() {
            endpoints.push(Endpoint { x: aabb.min.x, closing: false, entity, index_in_pairs_input: i });
            endpoints.push(Endpoint { x: aabb.max.x, closing: true, entity, index_in_pairs_input: i });
        }
        // `(x, side, entityID)` with side open(0) before close(1) (spec §4.3).
        endpoints.sort_by(|a, b| {
            a.x.cmp(&b.x)
                .then(a.closing.cmp(&b.closing))
                .then(a.entity.id().cmp(&b.entity.id()))
        });

        let mut active: Vec<usize> = Vec::new();
        let mut raw_pairs: Vec<(Entity, Entity)> = Vec::new();
        for ep in &endpoints {
            if ep.closing {
                if let Some(pos) = active.iter().position(|&i| i == ep.index_in_pairs_input) {
                    active.remove(pos);
                }
            } else {
                for &other in &active {
                    if boxes[ep.index_in_pairs_input].overlaps_y(&boxes[other]) {
                        raw_pairs.push((ep.entity, entities[other]));
                    }
                }
                active.push(ep.index_in_pairs_input);
            }
        }

        world.resource_mut::<BroadphasePairs>().clear();
        for (e1, e2) in raw_pairs {
            let ordered = crate::pairkey::make_pair_key(world, e1, e2);
            world.resource_mut::<BroadphasePairs>().pairs.push((ordered.a, ordered.b));
        }
    }
}
