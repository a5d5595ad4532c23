// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

//! Symmetric-space models the batch evaluator can walk orbits in.
//!
//! Both models are acted on by the same 3×3 generator matrices: the
//! hyperboloid model of H² through SO(2,1) acting on vectors, and the
//! positive-definite model of SL(3,R)/SO(3) through `X ↦ g·X·gᵀ`.

use std::fmt;
use std::str::FromStr;

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

pub mod hyperboloid;
pub mod spd;

pub use hyperboloid::Hyperboloid;
pub use spd::{PositiveDefinite, IOTA_ZETA, ZETA};

/// Which symmetric space a run measures in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Hyperboloid model of the hyperbolic plane.
    Hyperbolic,
    /// Positive-definite matrix model of SL(3,R)/SO(3).
    Rank2,
}

impl ModelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Hyperbolic => "hyperbolic",
            ModelKind::Rank2 => "rank2",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hyperbolic" | "h2" => Ok(ModelKind::Hyperbolic),
            "rank2" | "sl3" | "spd" => Ok(ModelKind::Rank2),
            other => Err(format!("unknown geometry model '{other}'")),
        }
    }
}

/// Direction in which a spacing column is folded into its summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extremum {
    Min,
    Max,
}

impl Extremum {
    /// Neutral element of the fold.
    pub fn identity(self) -> f64 {
        match self {
            Extremum::Min => f64::INFINITY,
            Extremum::Max => f64::NEG_INFINITY,
        }
    }

    /// Combines two partial results. NaN operands are ignored.
    #[inline]
    pub fn combine(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Extremum::Min => lhs.min(rhs),
            Extremum::Max => lhs.max(rhs),
        }
    }
}

/// Which of the two algebraically equivalent cosine formulas to evaluate.
///
/// They agree in exact arithmetic but drift apart in floating point, so
/// evaluating both is used as a sanity cross-check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CosineFormula {
    /// Project each direction onto the tangent space: `q + ⟨q,p⟩p`.
    #[default]
    Projected,
    /// Rescale each point onto the affine chart at `p`: `q/⟨q,p⟩ + p`.
    Rescaled,
}

/// Angle measurement between two geodesic directions at a common base.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AngleReading {
    /// Cosine of the angle (hyperbolic) or zeta-angle (rank 2).
    pub primary: f64,
    /// Iota-zeta-angle; only the rank-2 model produces one.
    pub secondary: Option<f64>,
}

impl AngleReading {
    pub fn single(primary: f64) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    pub fn is_nan(&self) -> bool {
        self.primary.is_nan() || self.secondary.is_some_and(f64::is_nan)
    }
}

/// Capability set the batch evaluator needs from a symmetric space.
pub trait SymmetricSpace: Send + Sync {
    type Point: Clone + Send + Sync;

    fn kind(&self) -> ModelKind;

    /// The point fixed by the maximal compact subgroup.
    fn basepoint(&self) -> Self::Point;

    /// Image of `point` under the isometry `g`.
    fn act(&self, g: &Matrix3<f64>, point: &Self::Point) -> Self::Point;

    fn apply_basepoint(&self, g: &Matrix3<f64>) -> Self::Point {
        self.act(g, &self.basepoint())
    }

    /// Geodesic midpoint, renormalised back onto the model.
    fn midpoint(&self, p: &Self::Point, q: &Self::Point) -> Self::Point;

    /// Midpoint between the basepoint and `q`.
    fn origin_midpoint(&self, q: &Self::Point) -> Self::Point {
        self.midpoint(&self.basepoint(), q)
    }

    fn distance(&self, p: &Self::Point, q: &Self::Point) -> f64;

    /// Per-word spacing between the two midpoints of a pair decomposition.
    fn pair_spacing(&self, m1: &Self::Point, m2: &Self::Point) -> f64;

    /// How pair spacings are folded into the run summary.
    fn pair_spacing_extremum(&self) -> Extremum;

    /// Angle at `at` between the geodesics towards `q` and `r`.
    fn angle_at(
        &self,
        at: &Self::Point,
        q: &Self::Point,
        r: &Self::Point,
        formula: CosineFormula,
    ) -> AngleReading;

    /// Absolute gap between independent formulations of [`Self::angle_at`],
    /// when the model has more than one.
    fn angle_cross_check(
        &self,
        _at: &Self::Point,
        _q: &Self::Point,
        _r: &Self::Point,
    ) -> Option<f64> {
        None
    }
}
