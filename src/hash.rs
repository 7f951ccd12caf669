//! Deterministic per-frame state fingerprint (spec §4.11).

use crate::components::Body2D;
use crate::contact::Contacts2D;
use crate::ecs::{Entity, World};
use crate::pairkey::Guid;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

fn fnv_byte(hash: u32, byte: u8) -> u32 {
    (hash ^ byte as u32).wrapping_mul(FNV_PRIME)
}

/// Fold a 32-bit word into the hash as its four little-endian bytes, so the result is
/// independent of host endianness (spec §4.11).
fn fnv_mix(hash: u32, word: u32) -> u32 {
    word.to_le_bytes().into_iter().fold(hash, fnv_byte)
}

fn mix_fx(hash: u32, value: crate::fx::Fx) -> u32 {
    fnv_mix(hash, value.raw() as u32)
}

/// `frameHash(world)`: depends only on `Body2D` and `Contacts2D` state, in the
/// canonical order spec.md §4.11 and invariant I6 describe.
pub fn frame_hash(world: &World) -> u32 {
    let mut bodies: Vec<(Entity, Body2D)> =
        world.iter::<Body2D>().map(|(e, b)| (e, *b)).collect();
    bodies.sort_by_key(|(e, _)| {
        let guid = world.get::<Guid>(*e).copied().unwrap_or_default();
        (guid.hi, guid.lo, e.id())
    });

    let mut hash = FNV_OFFSET;
    for (_entity, body) in &bodies {
        hash = mix_fx(hash, body.px);
        hash = mix_fx(hash, body.py);
        hash = mix_fx(hash, body.vx);
        hash = mix_fx(hash, body.vy);
        hash = mix_fx(hash, body.w);
        hash = mix_fx(hash, body.angle);
        hash = fnv_mix(hash, body.awake as u32);
    }

    let contacts = world.resource::<Contacts2D>();
    for contact in &contacts.list {
        hash = fnv_mix(hash, contact.a.id());
        hash = fnv_mix(hash, contact.b.id());
        hash = mix_fx(hash, contact.jn);
        hash = mix_fx(hash, contact.jt);
        hash = mix_fx(hash, contact.penetration);
        hash = mix_fx(hash, contact.normal.x);
        hash = mix_fx(hash, contact.normal.y);
    }

    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::Fx;

    #[test]
    fn identical_states_hash_identically() {
        let mut w1 = World::new(Fx::from_f64(1.0 / 60.0));
        w1.insert_resource(Contacts2D::new());
        let e1 = w1.spawn();
        w1.insert(e1, Body2D::new_dynamic(Fx::from_f64(1.0), Fx::ZERO, Fx::ONE, Fx::ONE));

        let mut w2 = World::new(Fx::from_f64(1.0 / 60.0));
        w2.insert_resource(Contacts2D::new());
        let e2 = w2.spawn();
        w2.insert(e2, Body2D::new_dynamic(Fx::from_f64(1.0), Fx::ZERO, Fx::ONE, Fx::ONE));

        assert_eq!(frame_hash(&w1), frame_hash(&w2));
    }

    #[test]
    fn different_velocity_changes_hash() {
        let mut w1 = World::new(Fx::from_f64(1.0 / 60.0));
        w1.insert_resource(Contacts2D::new());
        let e1 = w1.spawn();
        w1.insert(e1, Body2D::new_dynamic(Fx::ZERO, Fx::ZERO, Fx::ONE, Fx::ONE));

        let mut w2 = World::new(Fx::from_f64(1.0 / 60.0));
        w2.insert_resource(Contacts2D::new());
        let e2 = w2.spawn();
        let mut b2 = Body2D::new_dynamic(Fx::ZERO, Fx::ZERO, Fx::ONE, Fx::ONE);
        b2.vx = Fx::from_f64(3.0);
        w2.insert(e2, b2);

        assert_ne!(frame_hash(&w1), frame_hash(&w2));
    }

    #[test]
    fn hash_is_order_independent_of_spawn_order_when_guids_sort_them() {
        let mut w1 = World::new(Fx::ZERO);
        w1.insert_resource(Contacts2D::new());
        let a = w1.spawn();
        w1.insert(a, Body2D::new_dynamic(Fx::ONE, Fx::ZERO, Fx::ONE, Fx::ONE));
        w1.insert(a, Guid::new(0, 2));
        let b = w1.spawn();
        w1.insert(b, Body2D::new_dynamic(Fx::from_f64(2.0), Fx::ZERO, Fx::ONE, Fx::ONE));
        w1.insert(b, Guid::new(0, 1));

        let mut w2 = World::new(Fx::ZERO);
        w2.insert_resource(Contacts2D::new());
        let b2 = w2.spawn();
        w2.insert(b2, Body2D::new_dynamic(Fx::from_f64(2.0), Fx::ZERO, Fx::ONE, Fx::ONE));
        w2.insert(b2, Guid::new(0, 1));
        let a2 = w2.spawn();
        w2.insert(a2, Body2D::new_dynamic(Fx::ONE, Fx::ZERO, Fx::ONE, Fx::ONE));
        w2.insert(a2, Guid::new(0, 2));

        assert_eq!(frame_hash(&w1), frame_hash(&w2));
    }
}
