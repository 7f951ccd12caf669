//! Angle/rotation helpers shared by the geometry-sync step.
//!
//! `Body2D::angle` is a 16-bit wrapped quantity (spec §3); nothing in spec.md pins down
//! how it maps to a rotation, so this implements the obvious thing — `angle` is radians,
//! wrapped into `[-PI, PI)` — entirely in `Fx` so the result is as deterministic as
//! every other primitive in this crate (no `f32::sin`/`cos` anywhere near the hot path).

use crate::fx::Fx;
use crate::fx::Vec2Fx;

const PI: Fx = Fx::from_raw(205_887); // pi * 65536, rounded
const TWO_PI: Fx = Fx::from_raw(411_775);
const HALF_PI: Fx = Fx::from_raw(102_944);

pub fn wrap_to_pi(angle: Fx) -> Fx {
    let mut a = angle;
    while a.raw() >= PI.raw() {
        a = a - TWO_PI;
    }
    while a.raw() < -PI.raw() {
        a = a + TWO_PI;
    }
    a
}

/// Bhaskara I's sine approximation, valid on `[-PI, PI]`, evaluated with `Fx`
/// arithmetic only. Error stays within about 0.0016 radians of the true sine, plenty
/// for rendering-facing rotation where exactness isn't part of the bit-identical
/// contact/solver contract.
fn sin_approx(angle: Fx) -> Fx {
    let a = wrap_to_pi(angle);
    let sign = if a.raw() < 0 { Fx::from_f64(-1.0) } else { Fx::ONE };
    let x = a.abs();
    // sin(x) ~= 16x(pi-x) / (5*pi^2 - 4x(pi-x)), for x in [0, pi].
    let pi_minus_x = PI - x;
    let num = Fx::from_f64(16.0).mul(x).mul(pi_minus_x);
    let five_pi_sq = Fx::from_f64(5.0).mul(PI).mul(PI);
    let den = five_pi_sq - Fx::from_f64(4.0).mul(x).mul(pi_minus_x);
    sign.mul(num.div(den))
}

fn cos_approx(angle: Fx) -> Fx {
    sin_approx(angle + HALF_PI)
}

/// Sine and cosine of `angle`, computed once so callers that need both don't redo the
/// range reduction twice.
pub fn angle_sin_cos(angle: Fx) -> (Fx, Fx) {
    (sin_approx(angle), cos_approx(angle))
}

/// Rotate a vector by a precomputed `(sin, cos)` pair.
pub fn rotate(v: Vec2Fx, sin_a: Fx, cos_a: Fx) -> Vec2Fx {
    Vec2Fx::new(cos_a.mul(v.x) - sin_a.mul(v.y), sin_a.mul(v.x) + cos_a.mul(v.y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_angle_is_identity() {
        let (s, c) = angle_sin_cos(Fx::ZERO);
        assert_eq!(s, Fx::ZERO);
        assert_eq!(c, Fx::ONE);
        let v = Vec2Fx::new(Fx::from_f64(2.0), Fx::from_f64(3.0));
        assert_eq!(rotate(v, s, c), v);
    }

    #[test]
    fn quarter_turn_swaps_axes_with_sign() {
        let (s, c) = angle_sin_cos(HALF_PI);
        let v = Vec2Fx::new(Fx::ONE, Fx::ZERO);
        let rotated = rotate(v, s, c);
        assert!((rotated.x.to_f64()).abs() < 0.01);
        assert!((rotated.y.to_f64() - 1.0).abs() < 0.01);
    }

    #[test]
    fn sine_matches_reference_at_known_points() {
        let half_pi_sin = sin_approx(HALF_PI).to_f64();
        assert!((half_pi_sin - 1.0).abs() < 0.01, "sin(pi/2) = {half_pi_sin}");
    }
}
