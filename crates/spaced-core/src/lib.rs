// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

//! Numerical verification of the straight-and-spaced condition for the
//! genus-two surface group acting on the hyperbolic plane and on
//! SL(3,R)/SO(3).
//!
//! Data flows leaf-first: [`GeneratorSet`] → [`WordEvaluator`] →
//! [`BatchEvaluator`] (measuring in a [`SymmetricSpace`]) → [`BatchSummary`]
//! → [`criterion::evaluate`].

pub mod batch;
pub mod criterion;
pub mod enumeration;
pub mod error;
pub mod generators;
pub mod geometry;
pub mod persist;
pub mod symbol;
pub mod word;

pub use batch::{Arity, BatchConfig, BatchEvaluator, BatchOutput, BatchSummary, WordReading};
pub use criterion::{CriterionInputs, CriterionReport};
pub use enumeration::{LengthGroup, WordRange, WordSource};
pub use error::{SpacedError, SpacedResult};
pub use generators::{GeneratorSet, DEFAULT_RELATION_TOLERANCE, SURFACE_RELATION};
pub use geometry::{
    AngleReading, CosineFormula, Extremum, Hyperboloid, ModelKind, PositiveDefinite,
    SymmetricSpace,
};
pub use symbol::Symbol;
pub use word::{Word, WordEvaluator};
