//! Hull-hull contact generation: reference/incident face clipping, the same shape as
//! box2d-lite's `CollidePolygons` (grounded on the hull-circle SAT already in this
//! crate, extended to a second polygon instead of a single point).

use crate::components::{Body2D, ConvexHull2D, HullWorld2D};
use crate::contact::Contact;
use crate::ecs::{Entity, World};
use crate::fx::{Fx, Vec2Fx};
use crate::pairkey::PairKey;

struct Hull<'a> {
    vertices: &'a [Vec2Fx],
    normals: &'a [Vec2Fx],
}

fn max_separation(reference: &Hull, incident: &Hull) -> (Fx, usize) {
    let mut best_sep = Fx::from_raw(i32::MIN);
    let mut best_edge = 0;
    for i in 0..reference.vertices.len() {
        let n = reference.normals[i];
        let v = reference.vertices[i];
        let mut min_dot = Fx::from_raw(i32::MAX);
        for p in incident.vertices {
            let d = n.dot(*p - v);
            min_dot = min_dot.min(d);
        }
        if min_dot > best_sep {
            best_sep = min_dot;
            best_edge = i;
        }
    }
    (best_sep, best_edge)
}

fn incident_edge(reference_normal: Vec2Fx, incident: &Hull) -> usize {
    let mut best = 0;
    let mut best_dot = Fx::from_raw(i32::MAX);
    for (i, n) in incident.normals.iter().enumerate() {
        let d = reference_normal.dot(*n);
        if d < best_dot {
            best_dot = d;
            best = i;
        }
    }
    best
}

/// Clip a two-point segment against the half-plane `dot(n, p) <= offset`, discarding or
/// interpolating points as needed. Returns the (at most two) surviving points, each
/// tagged with which original incident vertex index they came from (or `None` if it was
/// synthesized by clipping).
fn clip_segment(
    points: [(Vec2Fx, Option<usize>); 2],
    n: Vec2Fx,
    offset: Fx,
) -> Vec<(Vec2Fx, Option<usize>)> {
    let mut out = Vec::with_capacity(2);
    let dist = [n.dot(points[0].0) - offset, n.dot(points[1].0) - offset];

    if dist[0] <= Fx::ZERO {
        out.push(points[0]);
    }
    if dist[1] <= Fx::ZERO {
        out.push(points[1]);
    }
    if dist[0] * dist[1] < Fx::ZERO {
        let t = dist[0].div(dist[0] - dist[1]);
        let p = points[0].0 + (points[1].0 - points[0].0).scale(t);
        out.push((p, None));
    }
    out
}

pub fn generate(world: &World, a: Entity, b: Entity, key: PairKey) -> Option<Contact> {
    let body_a = world.get::<Body2D>(a)?;
    let body_b = world.get::<Body2D>(b)?;
    let shape_a = world.get::<ConvexHull2D>(a)?;
    let shape_b = world.get::<ConvexHull2D>(b)?;
    let world_a = world.get::<HullWorld2D>(a)?;
    let world_b = world.get::<HullWorld2D>(b)?;
    if world_a.vertices.is_empty() || world_b.vertices.is_empty() {
        return None;
    }

    let hull_a = Hull { vertices: &world_a.vertices, normals: &world_a.normals };
    let hull_b = Hull { vertices: &world_b.vertices, normals: &world_b.normals };

    let skin_sum = shape_a.skin + shape_b.skin;
    let (sep_a, edge_a) = max_separation(&hull_a, &hull_b);
    if sep_a > skin_sum {
        return None;
    }
    let (sep_b, edge_b) = max_separation(&hull_b, &hull_a);
    if sep_b > skin_sum {
        return None;
    }

    // Prefer A as the reference face unless B is unambiguously more separating; the
    // fixed tie-break (prefer A) keeps this deterministic without relying on a
    // tolerance-sensitive "flip" comparison (spec §9's concern about fragile
    // comparisons in the source applies here too).
    let (reference, incident, ref_edge, flip) =
        if sep_b > sep_a + Fx::from_f64(0.001) { (&hull_b, &hull_a, edge_b, true) } else { (&hull_a, &hull_b, edge_a, false) };

    let ref_normal = reference.normals[ref_edge];
    let ref_v0 = reference.vertices[ref_edge];
    let n_ref = reference.vertices.len();
    let ref_v1 = reference.vertices[(ref_edge + 1) % n_ref];

    let inc_edge = incident_edge(ref_normal, incident);
    let n_inc = incident.vertices.len();
    let inc_v0 = incident.vertices[inc_edge];
    let inc_v1 = incident.vertices[(inc_edge + 1) % n_inc];

    let tangent = (ref_v1 - ref_v0).normalize();
    let side1 = tangent.neg();
    let offset1 = side1.dot(ref_v0);
    let side2 = tangent;
    let offset2 = side2.dot(ref_v1);

    let points = [(inc_v0, Some(inc_edge)), (inc_v1, Some((inc_edge + 1) % n_inc))];
    let clipped1 = clip_segment(points, side1, offset1);
    if clipped1.len() < 2 {
        return None;
    }
    let clipped2 = clip_segment([clipped1[0], clipped1[1]], side2, offset2);
    if clipped2.is_empty() {
        return None;
    }

    // Keep only points still penetrating the reference face, then take the deepest one
    // — a single-point manifold keeps the solver simple while the clip above still
    // ensures the chosen point lies within the reference edge's span.
    let mut best: Option<(Vec2Fx, Fx, Option<usize>)> = None;
    for (p, origin) in clipped2 {
        let sep = ref_normal.dot(p - ref_v0);
        if sep <= skin_sum {
            let better = match &best {
                None => true,
                Some((_, best_sep, _)) => sep < *best_sep,
            };
            if better {
                best = Some((p, sep, origin));
            }
        }
    }
    let (point, sep, origin) = best?;

    let penetration = skin_sum - sep;
    if penetration <= Fx::ZERO {
        return None;
    }

    // `ref_normal` points outward from `reference`; flip it so it always points from a
    // to b regardless of which hull ended up as the reference face.
    let normal = if flip { ref_normal.neg() } else { ref_normal };
    let feature_id = ((ref_edge as u32) << 16) | (origin.unwrap_or(0xFFFF) as u32 & 0xFFFF);

    let friction = (body_a.friction + body_b.friction).div(Fx::from_f64(2.0));
    let restitution = body_a.restitution.max(body_b.restitution);

    Some(Contact::new_regular(a, b, key, feature_id, normal, point, penetration, friction, restitution))
}
