//! Deterministic pair ordering and keying (spec §4.2).
//!
//! Entity IDs are not stable across replays (an ID depends on allocation order, which a
//! different run of the same inputs is only guaranteed to reproduce if nothing else
//! ever diverges first). A [`Guid`], when present, is the stable identity instead. This
//! module is the single place that decides "which of two entities is `a`" and "what map
//! key represents this unordered pair" — every other module must go through it rather
//! than comparing entity IDs directly.

use std::fmt;

use crate::ecs::{Entity, World};

/// Stable 64-bit identity, stored as two words so it round-trips through both
/// sides of a 32-bit or 64-bit host without reinterpreting memory.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Guid {
    pub hi: u32,
    pub lo: u32,
}

impl Guid {
    pub fn new(hi: u32, lo: u32) -> Guid {
        Guid { hi, lo }
    }

    fn is_zero(self) -> bool {
        self.hi == 0 && self.lo == 0
    }
}

/// The per-entity sort key used to decide pair order: `(hi, lo)` from a non-zero
/// [`Guid`], or `(0, entity id)` otherwise. Lexicographic `Ord` on the tuple gives
/// exactly the comparison spec §4.2 describes.
fn sort_key(world: &World, entity: Entity) -> (u32, u32) {
    match world.get::<Guid>(entity) {
        Some(guid) if !guid.is_zero() => (guid.hi, guid.lo),
        _ => (0, entity.id()),
    }
}

/// A deterministic, order-independent identity for an unordered pair of entities.
/// Usable directly as a `HashMap`/`BTreeMap` key — it carries the same four words the
/// canonical string format encodes, so no information is lost relative to the
/// string-keyed contract spec §4.2 and §9 describe; [`PairKey::to_string`] (via
/// `Display`) reproduces that exact string whenever one is needed for logging or
/// persistence.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairKey {
    a_hi: u32,
    a_lo: u32,
    b_hi: u32,
    b_lo: u32,
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}|{}:{}", self.a_hi, self.a_lo, self.b_hi, self.b_lo)
    }
}

/// The result of ordering a pair: `a` is the entity with the lower sort key, `b` the
/// other, and `key` is their deterministic pair identity.
#[derive(Clone, Copy, Debug)]
pub struct OrderedPair {
    pub a: Entity,
    pub b: Entity,
    pub key: PairKey,
}

/// Order two entities and compute their pair key (spec §4.2). Symmetric: calling this
/// with the arguments swapped produces the same `a`, `b`, and `key`.
pub fn make_pair_key(world: &World, e1: Entity, e2: Entity) -> OrderedPair {
    let k1 = sort_key(world, e1);
    let k2 = sort_key(world, e2);
    let (a, b, a_key, b_key) = match k1.cmp(&k2) {
        std::cmp::Ordering::Less => (e1, e2, k1, k2),
        std::cmp::Ordering::Greater => (e2, e1, k2, k1),
        // Ties resolved by entity ID (spec §4.2).
        std::cmp::Ordering::Equal if e1.id() <= e2.id() => (e1, e2, k1, k2),
        std::cmp::Ordering::Equal => (e2, e1, k2, k1),
    };
    OrderedPair {
        a,
        b,
        key: PairKey { a_hi: a_key.0, a_lo: a_key.1, b_hi: b_key.0, b_lo: b_key.1 },
    }
}
