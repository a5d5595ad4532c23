// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

//! Hyperboloid model of the hyperbolic plane.
//!
//! Points live on the upper sheet `⟨v,v⟩ = -1` of the form
//! `⟨u,v⟩ = u₀v₀ + u₁v₁ - u₂v₂`. The metric is normalised so that the
//! distance is `arccosh(-⟨u,v⟩)`.

use nalgebra::{Matrix3, Vector3};

use super::{AngleReading, CosineFormula, Extremum, ModelKind, SymmetricSpace};

/// Signature-(2,1) bilinear form.
#[inline]
pub fn form(u: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
    u[0] * v[0] + u[1] * v[1] - u[2] * v[2]
}

/// Squared norm with respect to [`form`].
#[inline]
pub fn norm(v: &Vector3<f64>) -> f64 {
    form(v, v)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Hyperboloid;

impl Hyperboloid {
    pub fn new() -> Self {
        Self
    }

    /// Cosine of the angle at `p` via tangent projections `q + ⟨q,p⟩p`.
    pub fn cos_angle_projected(
        &self,
        p: &Vector3<f64>,
        q: &Vector3<f64>,
        r: &Vector3<f64>,
    ) -> f64 {
        let v1 = q + p * form(q, p);
        let v2 = r + p * form(r, p);
        form(&v1, &v2) / (norm(&v1) * norm(&v2)).sqrt()
    }

    /// Cosine of the angle at `p` via the rescaled points `q/⟨q,p⟩ + p`.
    pub fn cos_angle_rescaled(
        &self,
        p: &Vector3<f64>,
        q: &Vector3<f64>,
        r: &Vector3<f64>,
    ) -> f64 {
        let qq = q / form(q, p) + p;
        let rr = r / form(r, p) + p;
        form(&qq, &rr) / (norm(&qq) * norm(&rr)).sqrt()
    }

    pub fn cos_angle(
        &self,
        p: &Vector3<f64>,
        q: &Vector3<f64>,
        r: &Vector3<f64>,
        formula: CosineFormula,
    ) -> f64 {
        match formula {
            CosineFormula::Projected => self.cos_angle_projected(p, q, r),
            CosineFormula::Rescaled => self.cos_angle_rescaled(p, q, r),
        }
    }

    /// `((1 - ⟨m₁,m₂⟩)/2)^(-1/2)`, i.e. `1/cosh(d(m₁,m₂)/2)`.
    pub fn spacing_factor(&self, m1: &Vector3<f64>, m2: &Vector3<f64>) -> f64 {
        ((1.0 - form(m1, m2)) / 2.0).powf(-0.5)
    }
}

impl SymmetricSpace for Hyperboloid {
    type Point = Vector3<f64>;

    fn kind(&self) -> ModelKind {
        ModelKind::Hyperbolic
    }

    fn basepoint(&self) -> Vector3<f64> {
        Vector3::new(0.0, 0.0, 1.0)
    }

    fn act(&self, g: &Matrix3<f64>, point: &Vector3<f64>) -> Vector3<f64> {
        g * point
    }

    fn midpoint(&self, p: &Vector3<f64>, q: &Vector3<f64>) -> Vector3<f64> {
        let mean = (p + q) / 2.0;
        mean / (-norm(&mean)).sqrt()
    }

    fn distance(&self, p: &Vector3<f64>, q: &Vector3<f64>) -> f64 {
        // -⟨p,q⟩ >= 1 on the sheet; rounding can dip just below it.
        // f64::max would swallow a NaN, so it is passed through first.
        let x = -form(p, q);
        if x.is_nan() {
            f64::NAN
        } else {
            x.max(1.0).acosh()
        }
    }

    fn pair_spacing(&self, m1: &Vector3<f64>, m2: &Vector3<f64>) -> f64 {
        self.spacing_factor(m1, m2)
    }

    fn pair_spacing_extremum(&self) -> Extremum {
        Extremum::Max
    }

    fn angle_at(
        &self,
        at: &Vector3<f64>,
        q: &Vector3<f64>,
        r: &Vector3<f64>,
        formula: CosineFormula,
    ) -> AngleReading {
        AngleReading::single(self.cos_angle(at, q, r, formula))
    }

    fn angle_cross_check(
        &self,
        at: &Vector3<f64>,
        q: &Vector3<f64>,
        r: &Vector3<f64>,
    ) -> Option<f64> {
        Some((self.cos_angle_projected(at, q, r) - self.cos_angle_rescaled(at, q, r)).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::GeneratorSet;
    use crate::word::WordEvaluator;

    fn orbit(word: &str) -> Vector3<f64> {
        let generators = GeneratorSet::genus_two();
        let g = WordEvaluator::new(&generators).evaluate_str(word).unwrap();
        Hyperboloid.apply_basepoint(&g)
    }

    #[test]
    fn orbit_points_stay_on_the_sheet() {
        for word in ["a", "bC", "abcd"] {
            let v = orbit(word);
            assert!((norm(&v) + 1.0).abs() < 1e-6 * v[2] * v[2], "{word}");
            assert!(v[2] > 0.0);
        }
    }

    #[test]
    fn generator_translates_by_its_length() {
        let t = crate::generators::surface_translation_length();
        let h = Hyperboloid;
        assert!((h.distance(&h.basepoint(), &orbit("a")) - t).abs() < 1e-12);
    }

    #[test]
    fn midpoint_is_symmetric_normalised_and_equidistant() {
        let h = Hyperboloid;
        let p = orbit("ab");
        let q = orbit("Dc");
        let m = h.midpoint(&p, &q);
        let n = h.midpoint(&q, &p);
        assert!((m - n).norm() < 1e-9);
        assert!((norm(&m) + 1.0).abs() < 1e-9);
        let dp = h.distance(&m, &p);
        let dq = h.distance(&m, &q);
        assert!((dp - dq).abs() < 1e-9);
        assert!((dp + dq - h.distance(&p, &q)).abs() < 1e-9);
    }

    #[test]
    fn distance_is_zero_on_the_diagonal_and_nonnegative() {
        let h = Hyperboloid;
        let points = [h.basepoint(), orbit("a"), orbit("cB"), orbit("dd")];
        for p in &points {
            // arccosh is ill-conditioned at 1, so the diagonal is only good to sqrt(eps)
            assert!(h.distance(p, p).abs() < 1e-5);
            for q in &points {
                assert!(h.distance(p, q) >= 0.0);
            }
        }
    }

    #[test]
    fn distance_propagates_nan_points() {
        let h = Hyperboloid;
        let broken = Vector3::new(f64::NAN, 0.0, 1.0);
        assert!(h.distance(&h.basepoint(), &broken).is_nan());
        assert!(h.distance(&broken, &broken).is_nan());
    }

    #[test]
    fn angle_with_itself_has_unit_cosine() {
        let h = Hyperboloid;
        let p = h.midpoint(&h.basepoint(), &orbit("ab"));
        let q = orbit("cd");
        for formula in [CosineFormula::Projected, CosineFormula::Rescaled] {
            assert!((h.cos_angle(&p, &q, &q, formula) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn right_angle_at_the_basepoint() {
        let h = Hyperboloid;
        let p = h.basepoint();
        let q = orbit("a");
        let r = orbit("c");
        for formula in [CosineFormula::Projected, CosineFormula::Rescaled] {
            assert!(h.cos_angle(&p, &q, &r, formula).abs() < 1e-9);
        }
        assert!(h.angle_cross_check(&p, &q, &r).unwrap() < 1e-9);
    }

    #[test]
    fn spacing_factor_is_inverse_cosh_of_half_distance() {
        let h = Hyperboloid;
        let m1 = h.origin_midpoint(&orbit("ab"));
        let m2 = h.origin_midpoint(&orbit("BA"));
        let d = h.distance(&m1, &m2);
        assert!((h.spacing_factor(&m1, &m2) - 1.0 / (d / 2.0).cosh()).abs() < 1e-9);
    }
}
