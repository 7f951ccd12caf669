//! Contacts and their cross-frame persistence (spec §3, §4.4, §4.6, §4.7).

use std::collections::BTreeMap;

use crate::ecs::Entity;
use crate::fx::{Fx, Vec2Fx};
use crate::pairkey::PairKey;

/// Feature ID for a circle-circle contact (spec §4.4); hull contacts use the edge index
/// as a face feature, or `0x8000 | vertex_index` for a vertex feature.
pub const FEATURE_CIRCLE: u32 = 0;
pub const FEATURE_VERTEX_BIT: u32 = 0x8000;

/// A single contact point between two bodies. Per the source's ad-hoc speculative flag
/// (spec §9 "Speculative contact flag"), this crate prefers a plain `speculative` bool
/// plus a `toi` that defaults to [`Fx::ONE`] on regular contacts, over a discriminated
/// enum — every consumer (solver, cache, hash) treats the two kinds identically except
/// for the zeroed restitution speculative contacts get.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Contact {
    pub a: Entity,
    pub b: Entity,
    pub key: PairKey,
    pub feature_id: u32,
    pub normal: Vec2Fx,
    pub point: Vec2Fx,
    pub penetration: Fx,
    pub jn: Fx,
    pub jt: Fx,
    pub friction: Fx,
    pub restitution: Fx,
    pub speculative: bool,
    /// Time of impact in `[0,1]`, meaningful only when `speculative`. `ONE` otherwise.
    pub toi: Fx,
}

impl Contact {
    pub fn new_regular(
        a: Entity,
        b: Entity,
        key: PairKey,
        feature_id: u32,
        normal: Vec2Fx,
        point: Vec2Fx,
        penetration: Fx,
        friction: Fx,
        restitution: Fx,
    ) -> Contact {
        Contact {
            a,
            b,
            key,
            feature_id,
            normal,
            point,
            penetration,
            jn: Fx::ZERO,
            jt: Fx::ZERO,
            friction,
            restitution,
            speculative: false,
            toi: Fx::ONE,
        }
    }
}

/// Per-frame contact list plus the lightweight warm-start map used alongside the
/// richer [`crate::resources::ContactCache2D`] (spec §3).
#[derive(Default)]
pub struct Contacts2D {
    pub list: Vec<Contact>,
    /// `pairKey -> (jn, jt)`, the simpler of the two warm-start paths (spec §4.7).
    pub prev: BTreeMap<PairKey, (Fx, Fx)>,
    pub frame: u64,
}

impl Contacts2D {
    pub fn new() -> Contacts2D {
        Contacts2D::default()
    }

    /// Sort the contact list by `(a, b)` ascending (spec §4.4, invariant I4, ordering
    /// guarantee O1). Entity's `Ord` is its packed `u32`, which is index-major, so this
    /// is a real comparator, not the source's self-diff bug (spec §9 Open Questions).
    pub fn sort_canonical(&mut self) {
        self.list.sort_by(|c1, c2| (c1.a, c1.b).cmp(&(c2.a, c2.b)));
    }
}

/// One feature's remembered impulse and geometry, used to decide whether warm-start
/// impulses still apply (spec §4.6, §4.7).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CachedPoint {
    pub jn: Fx,
    pub jt: Fx,
    pub px: Fx,
    pub py: Fx,
    pub nx: Fx,
    pub ny: Fx,
    pub age: u32,
    pub last_frame: u64,
}

/// Per-feature impulse memory across frames, with age/LRU eviction (spec §4.6).
///
/// Both levels are `BTreeMap`s, keyed on [`PairKey`]/feature id respectively, so
/// iteration (eviction, hashing) is always in comparator order and never hash order
/// (ordering guarantee O4).
pub struct ContactCache2D {
    pairs: BTreeMap<PairKey, BTreeMap<u32, CachedPoint>>,
    pub max_pairs: usize,
    pub max_age: u32,
    pub frame: u64,
}

impl ContactCache2D {
    pub const DEFAULT_MAX_PAIRS: usize = 10_000;
    pub const DEFAULT_MAX_AGE: u32 = 8;

    pub fn new() -> ContactCache2D {
        ContactCache2D {
            pairs: BTreeMap::new(),
            max_pairs: Self::DEFAULT_MAX_PAIRS,
            max_age: Self::DEFAULT_MAX_AGE,
            frame: 0,
        }
    }

    pub fn get(&self, key: PairKey, feature_id: u32) -> Option<&CachedPoint> {
        self.pairs.get(&key).and_then(|f| f.get(&feature_id))
    }

    pub fn set(
        &mut self,
        key: PairKey,
        feature_id: u32,
        jn: Fx,
        jt: Fx,
        px: Fx,
        py: Fx,
        nx: Fx,
        ny: Fx,
    ) {
        let frame = self.frame;
        let features = self.pairs.entry(key).or_default();
        let age = features.get(&feature_id).map(|p| p.age + 1).unwrap_or(1);
        features.insert(feature_id, CachedPoint { jn, jt, px, py, nx, ny, age, last_frame: frame });
    }

    /// Update only the impulses of an existing cached point, leaving geometry and age
    /// untouched (spec §4.6: "no age change").
    pub fn update_impulses(&mut self, key: PairKey, feature_id: u32, jn: Fx, jt: Fx) {
        if let Some(point) = self.pairs.get_mut(&key).and_then(|f| f.get_mut(&feature_id)) {
            point.jn = jn;
            point.jt = jt;
        }
    }

    pub fn remove_contact(&mut self, key: PairKey, feature_id: u32) {
        if let Some(features) = self.pairs.get_mut(&key) {
            features.remove(&feature_id);
            if features.is_empty() {
                self.pairs.remove(&key);
            }
        }
    }

    pub fn remove_pair(&mut self, key: PairKey) {
        self.pairs.remove(&key);
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Advance to frame `f`, evict stale entries, then evict whole pairs by ascending
    /// oldest-frame until the pair count is within `max_pairs` (spec §4.6).
    pub fn begin_frame(&mut self, f: u64) {
        self.frame = f;
        let max_age = self.max_age;
        self.pairs.retain(|_, features| {
            features.retain(|_, point| {
                point.age <= max_age && point.last_frame + max_age as u64 >= f
            });
            !features.is_empty()
        });

        if self.pairs.len() > self.max_pairs {
            let mut by_age: Vec<(PairKey, u64)> = self
                .pairs
                .iter()
                .map(|(&key, features)| {
                    let oldest = features.values().map(|p| p.last_frame).min().unwrap_or(f);
                    (key, oldest)
                })
                .collect();
            by_age.sort_by_key(|&(key, oldest)| (oldest, key));
            let evict_count = self.pairs.len() - self.max_pairs;
            for (key, _) in by_age.into_iter().take(evict_count) {
                self.pairs.remove(&key);
            }
        }
    }
}

impl Default for ContactCache2D {
    fn default() -> ContactCache2D {
        ContactCache2D::new()
    }
}
