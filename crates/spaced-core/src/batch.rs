// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

//! Map-then-reduce evaluation of a word slice in one symmetric space.
//!
//! Every word is decomposed into contiguous sub-words, the sub-words are
//! evaluated to isometries, and the resulting orbit midpoints are measured.
//! The per-word readings land in parallel output arrays in input order while
//! the global extrema are folded with identity elements, so the summary does
//! not depend on the order in which words or chunks are processed.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SpacedResult;
use crate::generators::GeneratorSet;
use crate::geometry::{CosineFormula, Extremum, ModelKind, SymmetricSpace};
use crate::symbol::Symbol;
use crate::word::{Word, WordEvaluator};

/// Below this many words a chunk is evaluated on the calling thread.
const PARALLEL_THRESHOLD: usize = 256;

/// How a word is decomposed before it is measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    /// `w = w₁·w₂`; the angle at `m₁` between the basepoint and `m₂`.
    Pairs,
    /// `w = w₁·w₂·w₃`; the angle at `m₂` between `m₁` and `m₃`.
    Triples,
}

impl Arity {
    pub fn parts(self) -> usize {
        match self {
            Arity::Pairs => 2,
            Arity::Triples => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Arity::Pairs => "pairs",
            Arity::Triples => "triples",
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pairs" | "2" => Ok(Arity::Pairs),
            "triples" | "3" => Ok(Arity::Triples),
            other => Err(format!("unknown decomposition '{other}'")),
        }
    }
}

/// Execution knobs of a batch run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads; `0` uses the global rayon pool.
    pub threads: usize,
    /// Evaluate every word on the calling thread.
    pub sequential: bool,
    /// Evaluate every independent angle formulation and track their gap.
    pub cross_check: bool,
    /// Largest formula gap accepted silently.
    pub cross_check_tolerance: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            sequential: false,
            cross_check: false,
            cross_check_tolerance: 1e-8,
        }
    }
}

/// Readings of a single word.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WordReading {
    pub cos_primary: f64,
    pub cos_secondary: Option<f64>,
    pub spacing: f64,
    pub formula_gap: Option<f64>,
}

impl WordReading {
    pub fn is_nan(&self) -> bool {
        self.cos_primary.is_nan()
            || self.cos_secondary.is_some_and(f64::is_nan)
            || self.spacing.is_nan()
    }
}

/// Scalar statistics over a processed slice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub model: ModelKind,
    pub arity: Arity,
    pub words: usize,
    pub nan_count: usize,
    pub any_nan: bool,
    /// Smallest cosine (hyperbolic) or zeta-angle reading (rank 2).
    pub min_cos_primary: Option<f64>,
    /// Smallest iota-zeta-angle reading; rank 2 only.
    pub min_cos_secondary: Option<f64>,
    pub spacing: Option<f64>,
    pub spacing_extremum: Extremum,
    /// `arccos(min primary) + arccos(min secondary)`; rank 2 only.
    pub worst_combined_angle: Option<f64>,
    pub max_formula_gap: Option<f64>,
    pub elapsed_secs: f64,
}

/// Output arrays, index-aligned with the input words, plus their summary.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchOutput {
    pub cos_primary: Vec<f64>,
    pub cos_secondary: Option<Vec<f64>>,
    pub spacing: Vec<f64>,
    pub summary: BatchSummary,
}

impl BatchOutput {
    pub fn len(&self) -> usize {
        self.cos_primary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cos_primary.is_empty()
    }
}

/// Associative fold state behind [`BatchSummary`].
#[derive(Clone, Copy, Debug)]
struct Accumulator {
    spacing_kind: Extremum,
    words: usize,
    nan_count: usize,
    min_primary: f64,
    min_secondary: f64,
    spacing: f64,
    max_gap: f64,
}

impl Accumulator {
    fn new(spacing_kind: Extremum) -> Self {
        Self {
            spacing_kind,
            words: 0,
            nan_count: 0,
            min_primary: Extremum::Min.identity(),
            min_secondary: Extremum::Min.identity(),
            spacing: spacing_kind.identity(),
            max_gap: Extremum::Max.identity(),
        }
    }

    fn absorb(mut self, reading: &WordReading) -> Self {
        self.words += 1;
        if reading.is_nan() {
            self.nan_count += 1;
        }
        self.min_primary = Extremum::Min.combine(self.min_primary, reading.cos_primary);
        if let Some(secondary) = reading.cos_secondary {
            self.min_secondary = Extremum::Min.combine(self.min_secondary, secondary);
        }
        self.spacing = self.spacing_kind.combine(self.spacing, reading.spacing);
        if let Some(gap) = reading.formula_gap {
            self.max_gap = Extremum::Max.combine(self.max_gap, gap);
        }
        self
    }

    fn merge(self, other: Self) -> Self {
        Self {
            spacing_kind: self.spacing_kind,
            words: self.words + other.words,
            nan_count: self.nan_count + other.nan_count,
            min_primary: Extremum::Min.combine(self.min_primary, other.min_primary),
            min_secondary: Extremum::Min.combine(self.min_secondary, other.min_secondary),
            spacing: self.spacing_kind.combine(self.spacing, other.spacing),
            max_gap: Extremum::Max.combine(self.max_gap, other.max_gap),
        }
    }

    fn finish(self, model: ModelKind, arity: Arity, elapsed_secs: f64) -> BatchSummary {
        let finite = |value: f64| value.is_finite().then_some(value);
        let min_cos_primary = finite(self.min_primary);
        let min_cos_secondary = finite(self.min_secondary);
        let worst_combined_angle = min_cos_primary
            .zip(min_cos_secondary)
            .map(|(primary, secondary)| clamped_acos(primary) + clamped_acos(secondary));
        BatchSummary {
            model,
            arity,
            words: self.words,
            nan_count: self.nan_count,
            any_nan: self.nan_count > 0,
            min_cos_primary,
            min_cos_secondary,
            spacing: finite(self.spacing),
            spacing_extremum: self.spacing_kind,
            worst_combined_angle,
            max_formula_gap: finite(self.max_gap),
            elapsed_secs,
        }
    }
}

/// `arccos` of a reading that rounding may have pushed just past ±1.
fn clamped_acos(cos: f64) -> f64 {
    cos.clamp(-1.0, 1.0).acos()
}

/// Streaming batch run: feed chunks in order, then finish.
///
/// Arrays grow chunk by chunk; the summary state is merged per chunk, so a
/// run over a streamed enumeration gives the same summary as one call on the
/// whole slice.
pub struct BatchRun<'e, 'a, S: SymmetricSpace> {
    evaluator: &'e BatchEvaluator<'a, S>,
    started: Instant,
    acc: Accumulator,
    cos_primary: Vec<f64>,
    cos_secondary: Option<Vec<f64>>,
    spacing: Vec<f64>,
    chunks: usize,
}

impl<'e, 'a, S: SymmetricSpace> BatchRun<'e, 'a, S> {
    /// Evaluates `words` and appends their readings.
    pub fn push_chunk(&mut self, words: &[Word]) -> SpacedResult<()> {
        let readings = self.evaluator.evaluate_words(words)?;
        let acc = self.evaluator.fold(&readings);

        self.cos_primary
            .extend(readings.iter().map(|reading| reading.cos_primary));
        if let Some(column) = self.cos_secondary.as_mut() {
            column.extend(
                readings
                    .iter()
                    .map(|reading| reading.cos_secondary.unwrap_or(f64::NAN)),
            );
        }
        self.spacing.extend(readings.iter().map(|reading| reading.spacing));

        debug!(
            chunk = self.chunks,
            words = readings.len(),
            nan = acc.nan_count,
            min_cos = acc.min_primary,
            spacing = acc.spacing,
            "chunk evaluated"
        );
        self.acc = self.acc.merge(acc);
        self.chunks += 1;
        Ok(())
    }

    pub fn finish(self) -> BatchOutput {
        let elapsed = self.started.elapsed().as_secs_f64();
        let evaluator = self.evaluator;
        let summary = self
            .acc
            .finish(evaluator.space.kind(), evaluator.arity, elapsed);
        evaluator.report(&summary);
        BatchOutput {
            cos_primary: self.cos_primary,
            cos_secondary: self.cos_secondary,
            spacing: self.spacing,
            summary,
        }
    }
}

/// One evaluation engine per (model, arity) strategy.
pub struct BatchEvaluator<'a, S: SymmetricSpace> {
    space: S,
    word_evaluator: WordEvaluator<'a>,
    arity: Arity,
    config: BatchConfig,
    pool: Option<ThreadPool>,
}

impl<'a, S: SymmetricSpace> BatchEvaluator<'a, S> {
    pub fn new(
        space: S,
        generators: &'a GeneratorSet,
        arity: Arity,
        config: BatchConfig,
    ) -> SpacedResult<Self> {
        let pool = if config.sequential || config.threads == 0 {
            None
        } else {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .thread_name(|index| format!("spaced-worker-{index}"))
                .build()?;
            Some(pool)
        };
        Ok(Self {
            space,
            word_evaluator: WordEvaluator::new(generators),
            arity,
            config,
            pool,
        })
    }

    pub fn space(&self) -> &S {
        &self.space
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Opens a streaming run.
    pub fn start(&self) -> BatchRun<'_, 'a, S> {
        info!(
            model = %self.space.kind(),
            arity = %self.arity,
            threads = self.config.threads,
            sequential = self.config.sequential,
            "batch started"
        );
        BatchRun {
            evaluator: self,
            started: Instant::now(),
            acc: Accumulator::new(self.spacing_extremum()),
            cos_primary: Vec::new(),
            cos_secondary: self.has_secondary().then(Vec::new),
            spacing: Vec::new(),
            chunks: 0,
        }
    }

    /// Evaluates an in-memory slice in one pass.
    pub fn evaluate(&self, words: &[Word]) -> SpacedResult<BatchOutput> {
        let mut run = self.start();
        run.push_chunk(words)?;
        Ok(run.finish())
    }

    /// Evaluates a stream of chunks, e.g. a [`crate::enumeration::WordSource`].
    pub fn evaluate_stream<I>(&self, chunks: I) -> SpacedResult<BatchOutput>
    where
        I: IntoIterator<Item = SpacedResult<Vec<Word>>>,
    {
        let mut run = self.start();
        for chunk in chunks {
            run.push_chunk(&chunk?)?;
        }
        Ok(run.finish())
    }

    /// Readings of a single word.
    pub fn evaluate_word(&self, word: &Word) -> SpacedResult<WordReading> {
        let parts = word.split(self.arity.parts())?;
        Ok(match self.arity {
            Arity::Pairs => self.measure_pair(parts[0], parts[1]),
            Arity::Triples => self.measure_triple(parts[0], parts[1], parts[2]),
        })
    }

    fn spacing_extremum(&self) -> Extremum {
        match self.arity {
            Arity::Pairs => self.space.pair_spacing_extremum(),
            Arity::Triples => Extremum::Min,
        }
    }

    fn has_secondary(&self) -> bool {
        self.space.kind() == ModelKind::Rank2
    }

    /// Orbit midpoint `mid(p, g·p)` of the sub-word `g`.
    fn orbit_midpoint(&self, g: &nalgebra::Matrix3<f64>) -> S::Point {
        self.space.origin_midpoint(&self.space.apply_basepoint(g))
    }

    fn measure_pair(&self, first: &[Symbol], second: &[Symbol]) -> WordReading {
        let space = &self.space;
        let m1 = self.orbit_midpoint(&self.word_evaluator.evaluate_inverse(first));
        let m2 = self.orbit_midpoint(&self.word_evaluator.evaluate(second));
        let base = space.basepoint();

        let reading = space.angle_at(&m1, &base, &m2, CosineFormula::Projected);
        let formula_gap = self
            .config
            .cross_check
            .then(|| space.angle_cross_check(&m1, &base, &m2))
            .flatten();
        WordReading {
            cos_primary: reading.primary,
            cos_secondary: reading.secondary,
            spacing: space.pair_spacing(&m1, &m2),
            formula_gap,
        }
    }

    fn measure_triple(&self, first: &[Symbol], second: &[Symbol], third: &[Symbol]) -> WordReading {
        let space = &self.space;
        let g1 = self.word_evaluator.evaluate(first);
        let g2 = self.word_evaluator.evaluate(second);
        let g3 = self.word_evaluator.evaluate(third);

        // m₂ and m₃ are walked out along the word prefix, not taken at the origin.
        let m1 = self.orbit_midpoint(&g1);
        let m2 = space.act(&g1, &self.orbit_midpoint(&g2));
        let m3 = space.act(&(g1 * g2), &self.orbit_midpoint(&g3));

        let reading = space.angle_at(&m2, &m1, &m3, CosineFormula::Rescaled);
        let formula_gap = self
            .config
            .cross_check
            .then(|| space.angle_cross_check(&m2, &m1, &m3))
            .flatten();
        let near = space.distance(&m1, &m2);
        let far = space.distance(&m2, &m3);
        let spacing = if near.is_nan() || far.is_nan() {
            f64::NAN
        } else {
            near.min(far)
        };
        WordReading {
            cos_primary: reading.primary,
            cos_secondary: reading.secondary,
            spacing,
            formula_gap,
        }
    }

    /// Per-word map. Results keep the order of `words`.
    fn evaluate_words(&self, words: &[Word]) -> SpacedResult<Vec<WordReading>> {
        if self.config.sequential || words.len() < PARALLEL_THRESHOLD {
            return words.iter().map(|word| self.evaluate_word(word)).collect();
        }
        let map = || {
            words
                .par_iter()
                .map(|word| self.evaluate_word(word))
                .collect::<SpacedResult<Vec<_>>>()
        };
        match &self.pool {
            Some(pool) => pool.install(map),
            None => map(),
        }
    }

    /// Associative reduction over a chunk's readings.
    fn fold(&self, readings: &[WordReading]) -> Accumulator {
        let identity = Accumulator::new(self.spacing_extremum());
        if self.config.sequential || readings.len() < PARALLEL_THRESHOLD {
            return readings.iter().fold(identity, Accumulator::absorb);
        }
        let reduce = || {
            readings
                .par_iter()
                .fold(|| identity, Accumulator::absorb)
                .reduce(|| identity, Accumulator::merge)
        };
        match &self.pool {
            Some(pool) => pool.install(reduce),
            None => reduce(),
        }
    }

    fn report(&self, summary: &BatchSummary) {
        info!(
            model = %summary.model,
            arity = %summary.arity,
            words = summary.words,
            elapsed_secs = summary.elapsed_secs,
            min_cos = ?summary.min_cos_primary,
            min_cos_secondary = ?summary.min_cos_secondary,
            spacing = ?summary.spacing,
            extremum = ?summary.spacing_extremum,
            "batch finished"
        );
        if summary.any_nan {
            warn!(
                nan_count = summary.nan_count,
                words = summary.words,
                "some words produced NaN readings"
            );
        }
        if let Some(gap) = summary.max_formula_gap {
            if gap > self.config.cross_check_tolerance {
                warn!(
                    gap,
                    tolerance = self.config.cross_check_tolerance,
                    "cosine formulations disagree"
                );
            }
        }
    }
}
