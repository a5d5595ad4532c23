// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

//! Positive-definite model of the rank-two symmetric space SL(3,R)/SO(3).
//!
//! A coset `g·SO(3)` is represented by `g·gᵀ`, the identity coset by `I`.
//! The metric is induced by twice the trace form, so
//! `d(P,Q) = √2·‖½·log λ(P^{-1/2}·Q·P^{-1/2})‖`.
//!
//! Every eigenvalue passed to a fractional power or a logarithm goes through
//! `abs` first: matrices that are positive definite in exact arithmetic come
//! back from the eigensolver with tiny negative eigenvalues once the orbit
//! points get far from the basepoint.

use std::cmp::Ordering;

use nalgebra::{Matrix3, SymmetricEigen, Vector3};

use super::{AngleReading, CosineFormula, Extremum, ModelKind, SymmetricSpace};

const EIGEN_MAX_ITER: usize = 512;

/// Diagonal of the Weyl-chamber direction `diag(2,-1,-1)`.
pub const ZETA: [f64; 3] = [2.0, -1.0, -1.0];

/// Diagonal of the opposite direction `diag(1,1,-2)`.
pub const IOTA_ZETA: [f64; 3] = [1.0, 1.0, -2.0];

/// Eigendecomposition with eigenvalues sorted ascending and eigenvectors as
/// the matching columns.
#[derive(Clone, Copy, Debug)]
pub struct Eigh {
    pub values: Vector3<f64>,
    pub vectors: Matrix3<f64>,
}

impl Eigh {
    /// Decomposes a symmetric matrix. Non-finite input or a stalled solver
    /// yields an all-NaN decomposition so the failure surfaces downstream
    /// as a NaN reading instead of a hang.
    pub fn new(matrix: &Matrix3<f64>) -> Self {
        let solved = if matrix.iter().all(|v| v.is_finite()) {
            SymmetricEigen::try_new(*matrix, f64::EPSILON, EIGEN_MAX_ITER)
        } else {
            None
        };
        let Some(eigen) = solved else {
            return Self {
                values: Vector3::repeat(f64::NAN),
                vectors: Matrix3::repeat(f64::NAN),
            };
        };

        let mut order = [0usize, 1, 2];
        order.sort_by(|&i, &j| {
            eigen.eigenvalues[i]
                .partial_cmp(&eigen.eigenvalues[j])
                .unwrap_or(Ordering::Equal)
        });
        let values = Vector3::from_fn(|row, _| eigen.eigenvalues[order[row]]);
        let vectors = Matrix3::from_fn(|row, col| eigen.eigenvectors[(row, order[col])]);
        Self { values, vectors }
    }

    /// `K·diag(|λ|^exponent)·Kᵀ`.
    pub fn power(&self, exponent: f64) -> Matrix3<f64> {
        let diag = self.values.map(|value| value.abs().powf(exponent));
        self.vectors * Matrix3::from_diagonal(&diag) * self.vectors.transpose()
    }
}

/// `P^exponent` for symmetric `P`, with eigenvalues clamped through `abs`.
pub fn spectral_power(matrix: &Matrix3<f64>, exponent: f64) -> Matrix3<f64> {
    Eigh::new(matrix).power(exponent)
}

fn symmetrise(matrix: Matrix3<f64>) -> Matrix3<f64> {
    (matrix + matrix.transpose()) * 0.5
}

/// Positive-definite model together with the two Weyl-chamber directions its
/// zeta-angles are measured against.
#[derive(Clone, Copy, Debug)]
pub struct PositiveDefinite {
    zeta: Matrix3<f64>,
    iota_zeta: Matrix3<f64>,
}

impl Default for PositiveDefinite {
    fn default() -> Self {
        Self::new()
    }
}

impl PositiveDefinite {
    pub fn new() -> Self {
        Self::with_weyl_direction(ZETA)
    }

    /// Uses `diag(zeta)` and its image under the opposition involution,
    /// `diag(-ζ₃, -ζ₂, -ζ₁)`.
    pub fn with_weyl_direction(zeta: [f64; 3]) -> Self {
        let iota = [-zeta[2], -zeta[1], -zeta[0]];
        Self {
            zeta: Matrix3::from_diagonal(&Vector3::from(zeta)),
            iota_zeta: Matrix3::from_diagonal(&Vector3::from(iota)),
        }
    }

    pub fn zeta(&self) -> &Matrix3<f64> {
        &self.zeta
    }

    pub fn iota_zeta(&self) -> &Matrix3<f64> {
        &self.iota_zeta
    }

    /// Eigenvalues of `P^{-1/2}·Q·P^{-1/2}`, ascending.
    fn relative_spectrum(&self, p: &Matrix3<f64>, q: &Matrix3<f64>) -> Vector3<f64> {
        let g = spectral_power(p, -0.5);
        let x = g * q * g.transpose();
        Eigh::new(&x).values
    }

    /// Pseudometric `d_α`: half the gap between the two largest
    /// log-eigenvalues of `P^{-1/2}·Q·P^{-1/2}`.
    ///
    /// Vanishes whenever the top two singular values coincide, even for
    /// distinct points.
    pub fn d_alpha(&self, p: &Matrix3<f64>, q: &Matrix3<f64>) -> f64 {
        let spectrum = self.relative_spectrum(p, q);
        (spectrum[2].abs().ln() - spectrum[1].abs().ln()) / 2.0
    }

    /// Zeta functional `tr(K₁ZK₁ᵀ·K₂ZK₂ᵀ) / tr(Z²)` of the eigenframes of
    /// `p` and `q`.
    pub fn zeta_angle(&self, p: &Matrix3<f64>, q: &Matrix3<f64>, z: &Matrix3<f64>) -> f64 {
        let k1 = Eigh::new(p).vectors;
        let k2 = Eigh::new(q).vectors;
        let lhs = k1 * z * k1.transpose();
        let rhs = k2 * z * k2.transpose();
        (lhs * rhs).trace() / (z * z).trace()
    }

    /// Zeta-angle based at `at`, measured after translating `at` to `I`.
    pub fn zeta_angle_at(
        &self,
        at: &Matrix3<f64>,
        q: &Matrix3<f64>,
        r: &Matrix3<f64>,
        z: &Matrix3<f64>,
    ) -> f64 {
        let (q_local, r_local) = localise(at, q, r);
        self.zeta_angle(&q_local, &r_local, z)
    }
}

/// Moves `q` and `r` by the isometry `at^{-1/2}`, which carries `at` to `I`.
fn localise(
    at: &Matrix3<f64>,
    q: &Matrix3<f64>,
    r: &Matrix3<f64>,
) -> (Matrix3<f64>, Matrix3<f64>) {
    let g = spectral_power(at, -0.5);
    (g * q * g, g * r * g)
}

impl SymmetricSpace for PositiveDefinite {
    type Point = Matrix3<f64>;

    fn kind(&self) -> ModelKind {
        ModelKind::Rank2
    }

    fn basepoint(&self) -> Matrix3<f64> {
        Matrix3::identity()
    }

    fn act(&self, g: &Matrix3<f64>, point: &Matrix3<f64>) -> Matrix3<f64> {
        g * point * g.transpose()
    }

    fn apply_basepoint(&self, g: &Matrix3<f64>) -> Matrix3<f64> {
        g * g.transpose()
    }

    /// Geometric mean `P^{1/2}·(P^{-1/2}·Q·P^{-1/2})^{1/2}·P^{1/2}`.
    fn midpoint(&self, p: &Matrix3<f64>, q: &Matrix3<f64>) -> Matrix3<f64> {
        let eigen = Eigh::new(p);
        let root = eigen.power(0.5);
        let inv_root = eigen.power(-0.5);
        let relative = symmetrise(inv_root * q * inv_root);
        symmetrise(root * spectral_power(&relative, 0.5) * root)
    }

    /// The principal square root, which is the midpoint of `I` and `Q`.
    fn origin_midpoint(&self, q: &Matrix3<f64>) -> Matrix3<f64> {
        spectral_power(q, 0.5)
    }

    fn distance(&self, p: &Matrix3<f64>, q: &Matrix3<f64>) -> f64 {
        let half_logs = self
            .relative_spectrum(p, q)
            .map(|value| value.abs().ln() / 2.0);
        std::f64::consts::SQRT_2 * half_logs.norm()
    }

    fn pair_spacing(&self, m1: &Matrix3<f64>, m2: &Matrix3<f64>) -> f64 {
        self.d_alpha(m1, m2)
    }

    fn pair_spacing_extremum(&self) -> Extremum {
        Extremum::Min
    }

    /// The rank-two model has a single formulation; `formula` is ignored.
    fn angle_at(
        &self,
        at: &Matrix3<f64>,
        q: &Matrix3<f64>,
        r: &Matrix3<f64>,
        _formula: CosineFormula,
    ) -> AngleReading {
        let (q_local, r_local) = localise(at, q, r);
        AngleReading {
            primary: self.zeta_angle(&q_local, &r_local, &self.zeta),
            secondary: Some(self.zeta_angle(&q_local, &r_local, &self.iota_zeta)),
        }
    }
}
