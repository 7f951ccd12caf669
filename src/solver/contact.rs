//! Gauss-Seidel sequential-impulse contact solver with split-impulse position
//! correction (spec §4.8).

use crate::components::Body2D;
use crate::contact::{Contact, Contacts2D};
use crate::ecs::{Entity, System, World};
use crate::fx::{Fx, Vec2Fx};

pub const ITER_N: u32 = 8;
pub const ITER_T: u32 = 4;
pub const BAUMGARTE: Fx = Fx::from_raw(13_107); // 0.2
pub const RESTIT_THRESH: Fx = Fx::ONE; // 1.0 m/s
pub const POS_ITERS: u32 = 4;
pub const POS_PERCENT: Fx = Fx::from_raw(52_429); // 0.8
pub const POS_SLOP: Fx = Fx::from_raw(33); // 0.0005

struct Precomputed {
    r_a: Vec2Fx,
    r_b: Vec2Fx,
    tangent: Vec2Fx,
    mass_n: Fx,
    mass_t: Fx,
    bias: Fx,
}

fn effective_mass(body_a: &Body2D, body_b: &Body2D, r_a: Vec2Fx, r_b: Vec2Fx, axis: Vec2Fx) -> Fx {
    let ra_cross = r_a.cross(axis);
    let rb_cross = r_b.cross(axis);
    let denom = body_a.inv_mass
        + body_b.inv_mass
        + ra_cross.mul(ra_cross).mul(body_a.inv_i)
        + rb_cross.mul(rb_cross).mul(body_b.inv_i);
    Fx::ONE.div(denom)
}

fn precompute(world: &World, contact: &Contact, dt: Fx) -> Option<Precomputed> {
    let body_a = world.get::<Body2D>(contact.a)?;
    let body_b = world.get::<Body2D>(contact.b)?;
    if body_a.is_static() && body_b.is_static() {
        return None; // invariant I3
    }
    let r_a = contact.point - body_a.pos();
    let r_b = contact.point - body_b.pos();
    let tangent = Vec2Fx::new(contact.normal.y, contact.normal.x.neg());
    let mass_n = effective_mass(body_a, body_b, r_a, r_b, contact.normal);
    let mass_t = effective_mass(body_a, body_b, r_a, r_b, tangent);
    let bias = BAUMGARTE.mul(contact.penetration.max(Fx::ZERO)).div(dt);
    Some(Precomputed { r_a, r_b, tangent, mass_n, mass_t, bias })
}

fn apply_impulse(world: &mut World, a: Entity, b: Entity, r_a: Vec2Fx, r_b: Vec2Fx, axis: Vec2Fx, dj: Fx) {
    if let Some(body) = world.get_mut::<Body2D>(a) {
        let impulse = axis.scale(dj.mul(body.inv_mass));
        body.vx = body.vx - impulse.x;
        body.vy = body.vy - impulse.y;
        body.w = body.w - r_a.cross(axis).mul(dj).mul(body.inv_i);
    }
    if let Some(body) = world.get_mut::<Body2D>(b) {
        let impulse = axis.scale(dj.mul(body.inv_mass));
        body.vx = body.vx + impulse.x;
        body.vy = body.vy + impulse.y;
        body.w = body.w + r_b.cross(axis).mul(dj).mul(body.inv_i);
    }
}

fn relative_velocity(world: &World, a: Entity, b: Entity, r_a: Vec2Fx, r_b: Vec2Fx) -> Vec2Fx {
    let body_a = world.get::<Body2D>(a).unwrap();
    let body_b = world.get::<Body2D>(b).unwrap();
    body_b.point_velocity(r_b) - body_a.point_velocity(r_a)
}

/// Runs the full per-tick contact solve: warm-start application, `ITER_N` normal
/// passes, `ITER_T` friction passes, then `POS_ITERS` split-impulse position
/// correction passes. Contacts with no solvable pair (both bodies static) are left
/// untouched (`jn`/`jt` stay whatever warm-start set them to — typically zero).
pub struct ContactSolverSystem;

impl System for ContactSolverSystem {
    fn name(&self) -> &'static str {
        "solve_contacts"
    }

    fn run(&mut self, world: &mut World) {
        let dt = world.dt();
        world.resource_scope::<Contacts2D, ()>(|world, contacts| {
            let precomp: Vec<Option<Precomputed>> =
                contacts.list.iter().map(|c| precompute(world, c, dt)).collect();

            // Warm-start: apply each contact's (possibly cached) accumulated impulse
            // once before any iteration (spec §4.8).
            for (contact, pre) in contacts.list.iter().zip(&precomp) {
                let Some(pre) = pre else { continue };
                if !contact.jn.is_zero() {
                    apply_impulse(world, contact.a, contact.b, pre.r_a, pre.r_b, contact.normal, contact.jn);
                }
                if !contact.jt.is_zero() {
                    apply_impulse(world, contact.a, contact.b, pre.r_a, pre.r_b, pre.tangent, contact.jt);
                }
            }

            for _ in 0..ITER_N {
                for (contact, pre) in contacts.list.iter_mut().zip(&precomp) {
                    let Some(pre) = pre else { continue };
                    let v_rel = relative_velocity(world, contact.a, contact.b, pre.r_a, pre.r_b);
                    let vn = v_rel.dot(contact.normal);
                    let bounce = if vn.neg() > RESTIT_THRESH { contact.restitution.mul(vn.neg()) } else { Fx::ZERO };
                    let lambda = pre.mass_n.mul((vn + pre.bias + bounce).neg());
                    let jn_new = (contact.jn + lambda).max(Fx::ZERO);
                    let dj = jn_new - contact.jn;
                    contact.jn = jn_new;
                    apply_impulse(world, contact.a, contact.b, pre.r_a, pre.r_b, contact.normal, dj);
                    crate::sleep::wake_on_impulse(world, contact.a, dj.abs());
                    crate::sleep::wake_on_impulse(world, contact.b, dj.abs());
                }
            }

            for _ in 0..ITER_T {
                for (contact, pre) in contacts.list.iter_mut().zip(&precomp) {
                    let Some(pre) = pre else { continue };
                    let v_rel = relative_velocity(world, contact.a, contact.b, pre.r_a, pre.r_b);
                    let vt = v_rel.dot(pre.tangent);
                    let lambda_t = pre.mass_t.mul(vt.neg());
                    let max_jt = contact.friction.mul(contact.jn);
                    let jt_new = (contact.jt + lambda_t).clamp(max_jt.neg(), max_jt);
                    let dj_t = jt_new - contact.jt;
                    contact.jt = jt_new;
                    apply_impulse(world, contact.a, contact.b, pre.r_a, pre.r_b, pre.tangent, dj_t);
                    crate::sleep::wake_on_impulse(world, contact.a, dj_t.abs());
                    crate::sleep::wake_on_impulse(world, contact.b, dj_t.abs());
                }
            }

            correct_positions(world, &mut contacts.list, &precomp);
        });
    }
}

fn correct_positions(world: &mut World, contacts: &mut [Contact], precomp: &[Option<Precomputed>]) {
    let start_positions: Vec<(Vec2Fx, Vec2Fx)> = contacts
        .iter()
        .map(|c| {
            let pa = world.get::<Body2D>(c.a).map(|b| b.pos()).unwrap_or(Vec2Fx::ZERO);
            let pb = world.get::<Body2D>(c.b).map(|b| b.pos()).unwrap_or(Vec2Fx::ZERO);
            (pa, pb)
        })
        .collect();

    for _ in 0..POS_ITERS {
        for ((contact, pre), (pos_a0, pos_b0)) in contacts.iter().zip(precomp).zip(&start_positions) {
            let Some(_pre) = pre else { continue };
            let body_a = *world.get::<Body2D>(contact.a).unwrap();
            let body_b = *world.get::<Body2D>(contact.b).unwrap();
            let moved = (body_b.pos() - *pos_b0) - (body_a.pos() - *pos_a0);
            let pen_now = contact.penetration - contact.normal.dot(moved);
            if pen_now - POS_SLOP <= Fx::ZERO {
                continue;
            }
            let k = effective_mass(&body_a, &body_b, contact.point - body_a.pos(), contact.point - body_b.pos(), contact.normal);
            let lambda_p = POS_PERCENT.mul(pen_now - POS_SLOP).mul(k);

            if let Some(b) = world.get_mut::<Body2D>(contact.a) {
                let d = contact.normal.scale(lambda_p.mul(b.inv_mass));
                b.px = b.px - d.x;
                b.py = b.py - d.y;
            }
            if let Some(b) = world.get_mut::<Body2D>(contact.b) {
                let d = contact.normal.scale(lambda_p.mul(b.inv_mass));
                b.px = b.px + d.x;
                b.py = b.py + d.y;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ShapeCircle;

    fn head_on_world() -> World {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        world.insert_resource(Contacts2D::new());
        let a = world.spawn();
        let mut ba = Body2D::new_dynamic(Fx::from_f64(-0.5), Fx::ZERO, Fx::ONE, Fx::ONE);
        ba.vx = Fx::from_f64(1.0);
        world.insert(a, ba);
        world.insert(a, ShapeCircle { r: Fx::ONE });
        let b = world.spawn();
        let mut bb = Body2D::new_dynamic(Fx::from_f64(0.5), Fx::ZERO, Fx::ONE, Fx::ONE);
        bb.vx = Fx::from_f64(-1.0);
        world.insert(b, bb);
        world.insert(b, ShapeCircle { r: Fx::ONE });
        let key = crate::pairkey::make_pair_key(&world, a, b).key;
        world.resource_mut::<Contacts2D>().list.push(Contact::new_regular(
            a,
            b,
            key,
            0,
            Vec2Fx::new(Fx::ONE, Fx::ZERO),
            Vec2Fx::ZERO,
            Fx::from_f64(1.0),
            Fx::ZERO,
            Fx::ZERO,
        ));
        world
    }

    #[test]
    fn normal_impulse_stays_non_negative() {
        let mut world = head_on_world();
        ContactSolverSystem.run(&mut world);
        let contacts = world.resource::<Contacts2D>();
        for c in &contacts.list {
            assert!(c.jn >= Fx::ZERO);
        }
    }

    #[test]
    fn head_on_bodies_separate() {
        let mut world = head_on_world();
        ContactSolverSystem.run(&mut world);
        let a = crate::ecs::Entity::from_raw(0);
        let b = crate::ecs::Entity::from_raw(1);
        let ba = world.get::<Body2D>(a).unwrap();
        let bb = world.get::<Body2D>(b).unwrap();
        assert!(ba.vx <= Fx::ZERO);
        assert!(bb.vx >= Fx::ZERO);
    }

    #[test]
    fn friction_cone_is_respected() {
        let mut world = head_on_world();
        world.resource_mut::<Contacts2D>().list[0].friction = Fx::from_f64(0.5);
        ContactSolverSystem.run(&mut world);
        let contacts = world.resource::<Contacts2D>();
        for c in &contacts.list {
            let cone = c.friction.mul(c.jn);
            assert!(c.jt.abs() <= cone + Fx::from_f64(0.001));
        }
    }
}
