// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

//! Words over the surface-group alphabet and their evaluation to matrices.

use std::fmt;
use std::str::FromStr;

use nalgebra::Matrix3;

use crate::error::{SpacedError, SpacedResult};
use crate::generators::GeneratorSet;
use crate::symbol::Symbol;

/// Immutable sequence of symbols read from the enumeration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Word {
    symbols: Vec<Symbol>,
}

impl Word {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self { symbols }
    }

    /// Parses a word, rejecting any character outside `{a,b,c,d,A,B,C,D}`.
    pub fn parse(text: &str) -> SpacedResult<Self> {
        let symbols = text
            .chars()
            .enumerate()
            .map(|(position, ch)| Symbol::parse(ch, position))
            .collect::<SpacedResult<Vec<_>>>()?;
        Ok(Self { symbols })
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// The word of the inverse element: reversed, with every symbol case-swapped.
    pub fn inverse(&self) -> Self {
        Self {
            symbols: inverse_symbols(&self.symbols),
        }
    }

    /// Splits the word into `parts` contiguous pieces of equal length.
    pub fn split(&self, parts: usize) -> SpacedResult<Vec<&[Symbol]>> {
        if parts == 0 || self.symbols.len() % parts != 0 {
            return Err(SpacedError::InvalidWordLength {
                length: self.symbols.len(),
                arity: parts,
            });
        }
        let chunk = self.symbols.len() / parts;
        if chunk == 0 {
            return Err(SpacedError::InvalidWordLength {
                length: 0,
                arity: parts,
            });
        }
        Ok(self.symbols.chunks(chunk).collect())
    }
}

pub(crate) fn inverse_symbols(symbols: &[Symbol]) -> Vec<Symbol> {
    symbols.iter().rev().map(|symbol| symbol.inverse()).collect()
}

impl FromStr for Word {
    type Err = SpacedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Word::parse(s)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in &self.symbols {
            write!(f, "{symbol}")?;
        }
        Ok(())
    }
}

/// Maps words to their group elements through an injected generator table.
///
/// Composition is left to right: the word `xy` evaluates to `M(x)·M(y)`.
#[derive(Clone, Copy, Debug)]
pub struct WordEvaluator<'a> {
    generators: &'a GeneratorSet,
}

impl<'a> WordEvaluator<'a> {
    pub fn new(generators: &'a GeneratorSet) -> Self {
        Self { generators }
    }

    pub fn generators(&self) -> &'a GeneratorSet {
        self.generators
    }

    pub fn evaluate(&self, symbols: &[Symbol]) -> Matrix3<f64> {
        self.generators.product(symbols)
    }

    /// Evaluates the inverse element by reading `symbols` backwards with
    /// every case swapped.
    pub fn evaluate_inverse(&self, symbols: &[Symbol]) -> Matrix3<f64> {
        symbols
            .iter()
            .rev()
            .fold(Matrix3::identity(), |acc, symbol| {
                acc * self.generators.matrix(symbol.inverse())
            })
    }

    pub fn evaluate_str(&self, text: &str) -> SpacedResult<Matrix3<f64>> {
        Word::parse(text).map(|word| self.evaluate(word.symbols()))
    }
}
