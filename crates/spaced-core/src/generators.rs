// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

//! Generator table for the genus-two surface group acting through SO(2,1).
//!
//! The generator `a` is a hyperbolic translation along the first axis of the
//! hyperboloid. The remaining generators are conjugates of `a` by rotations
//! about the basepoint by π/4, π/2 and 3π/4, which places the four axes
//! symmetrically and realises the relation `a·d·C·b·A·D·c·B = 1`. The same
//! matrices act on SL(3,R)/SO(3) through the inclusion SO(2,1) ⊂ SL(3,R).

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_8};

use nalgebra::Matrix3;
use tracing::debug;

use crate::error::{SpacedError, SpacedResult};
use crate::symbol::Symbol;
use crate::word::Word;

/// Relator of the surface group presentation, `adCbADcB`.
pub const SURFACE_RELATION: [Symbol; 8] = [
    Symbol::A,
    Symbol::D,
    Symbol::CInv,
    Symbol::B,
    Symbol::AInv,
    Symbol::DInv,
    Symbol::C,
    Symbol::BInv,
];

/// Frobenius tolerance used by [`GeneratorSet::verify`] by default.
pub const DEFAULT_RELATION_TOLERANCE: f64 = 1e-9;

/// Translation length `t` with `cosh(t/2) = cot(π/8)`.
pub fn surface_translation_length() -> f64 {
    2.0 * (1.0 / FRAC_PI_8.tan()).acosh()
}

fn translation(t: f64) -> Matrix3<f64> {
    let (c, s) = (t.cosh(), t.sinh());
    Matrix3::new(c, 0.0, s, 0.0, 1.0, 0.0, s, 0.0, c)
}

fn rotation(theta: f64) -> Matrix3<f64> {
    let (ss, cc) = theta.sin_cos();
    Matrix3::new(cc, ss, 0.0, -ss, cc, 0.0, 0.0, 0.0, 1.0)
}

/// Immutable symbol → matrix table, built once per run and shared by
/// reference with every evaluator.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorSet {
    matrices: [Matrix3<f64>; Symbol::COUNT],
}

impl GeneratorSet {
    /// Standard generators for the genus-two surface group.
    pub fn genus_two() -> Self {
        Self::from_translation_length(surface_translation_length())
    }

    /// Builds the symmetric four-axis configuration for an arbitrary
    /// translation length. Only the standard length satisfies the relation.
    pub fn from_translation_length(t: f64) -> Self {
        let a = translation(t);
        let a_inv = translation(-t);

        let mut matrices = [Matrix3::identity(); Symbol::COUNT];
        matrices[Symbol::A.index()] = a;
        matrices[Symbol::AInv.index()] = a_inv;

        let conjugates = [
            (Symbol::B, FRAC_PI_4),
            (Symbol::C, FRAC_PI_2),
            (Symbol::D, 3.0 * FRAC_PI_4),
        ];
        for (symbol, theta) in conjugates {
            let rot = rotation(theta);
            let rot_inv = rot.transpose();
            matrices[symbol.index()] = rot * a * rot_inv;
            matrices[symbol.inverse().index()] = rot * a_inv * rot_inv;
        }

        Self { matrices }
    }

    #[inline]
    pub fn matrix(&self, symbol: Symbol) -> &Matrix3<f64> {
        &self.matrices[symbol.index()]
    }

    /// Left-to-right product of the matrices of `symbols`.
    pub fn product(&self, symbols: &[Symbol]) -> Matrix3<f64> {
        symbols
            .iter()
            .fold(Matrix3::identity(), |acc, &symbol| acc * self.matrix(symbol))
    }

    /// Largest Frobenius distance between `s · s⁻¹` and the identity.
    pub fn inverse_residual(&self) -> f64 {
        Symbol::ALL
            .iter()
            .map(|&symbol| {
                (self.matrix(symbol) * self.matrix(symbol.inverse()) - Matrix3::identity()).norm()
            })
            .fold(0.0, f64::max)
    }

    /// Frobenius distance between the evaluated relator and the identity.
    pub fn relation_residual(&self) -> f64 {
        (self.product(&SURFACE_RELATION) - Matrix3::identity()).norm()
    }

    /// Fails loudly when a sign or ordering convention broke the presentation.
    pub fn verify(&self, tolerance: f64) -> SpacedResult<()> {
        let inverse = self.inverse_residual();
        debug!(residual = inverse, "generator inverse check");
        if inverse.is_nan() || inverse > tolerance {
            return Err(SpacedError::RelationViolated {
                word: "s·S".to_string(),
                residual: inverse,
                tolerance,
            });
        }

        let residual = self.relation_residual();
        let relation = Word::new(SURFACE_RELATION.to_vec());
        debug!(residual, %relation, "surface relation check");
        if residual.is_nan() || residual > tolerance {
            return Err(SpacedError::RelationViolated {
                word: relation.to_string(),
                residual,
                tolerance,
            });
        }
        Ok(())
    }
}

impl Default for GeneratorSet {
    fn default() -> Self {
        Self::genus_two()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_length_matches_cotangent_condition() {
        let t = surface_translation_length();
        assert!(((t / 2.0).cosh() - 1.0 / FRAC_PI_8.tan()).abs() < 1e-12);
        assert!((t - 3.057141838961996).abs() < 1e-12);
    }

    #[test]
    fn every_symbol_times_its_inverse_is_identity() {
        let set = GeneratorSet::genus_two();
        for symbol in Symbol::ALL {
            let product = set.matrix(symbol) * set.matrix(symbol.inverse());
            assert!((product - Matrix3::identity()).norm() < 1e-9, "{symbol}");
        }
    }

    #[test]
    fn surface_relation_evaluates_to_identity() {
        let set = GeneratorSet::genus_two();
        assert!(set.relation_residual() < DEFAULT_RELATION_TOLERANCE);
        set.verify(DEFAULT_RELATION_TOLERANCE).unwrap();
    }

    #[test]
    fn wrong_translation_length_breaks_the_relation() {
        let set = GeneratorSet::from_translation_length(2.5);
        assert!(set.inverse_residual() < 1e-9);
        match set.verify(DEFAULT_RELATION_TOLERANCE) {
            Err(SpacedError::RelationViolated { word, residual, .. }) => {
                assert_eq!(word, "adCbADcB");
                assert!(residual > 1e-3);
            }
            other => panic!("expected relation failure, got {other:?}"),
        }
    }

    #[test]
    fn generators_preserve_the_signature_form() {
        let set = GeneratorSet::genus_two();
        let form = Matrix3::from_diagonal(&nalgebra::Vector3::new(1.0, 1.0, -1.0));
        for symbol in Symbol::ALL {
            let g = set.matrix(symbol);
            assert!((g.transpose() * form * g - form).norm() < 1e-9);
        }
    }
}
