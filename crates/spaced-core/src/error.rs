// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

use std::path::PathBuf;

use thiserror::Error;

pub type SpacedResult<T> = std::result::Result<T, SpacedError>;

/// Errors raised by the generator, word, batch and criterion layers.
///
/// Numerical noise inside the geometry is never an error: it is absorbed by
/// eigenvalue clamping, and whatever NaN survives is counted by the batch
/// summary instead.
#[derive(Debug, Error)]
pub enum SpacedError {
    #[error("invalid symbol {symbol:?} at position {position}{}", line_suffix(.line))]
    InvalidSymbol {
        symbol: char,
        position: usize,
        line: Option<usize>,
    },
    #[error("word of length {length} cannot be split into {arity} equal parts")]
    InvalidWordLength { length: usize, arity: usize },
    #[error("surface relation {word} is off the identity by {residual:e} (tolerance {tolerance:e})")]
    RelationViolated {
        word: String,
        residual: f64,
        tolerance: f64,
    },
    #[error("domain error in {computation}: argument {argument} is outside the valid range")]
    Domain {
        computation: &'static str,
        argument: f64,
    },
    #[error("invalid word range {start}..{end}")]
    InvalidRange { start: usize, end: usize },
    #[error("malformed npy file {path:?}: {reason}")]
    Npy { path: PathBuf, reason: String },
    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" on line {line}"),
        None => String::new(),
    }
}

impl SpacedError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SpacedError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn domain(computation: &'static str, argument: f64) -> Self {
        SpacedError::Domain {
            computation,
            argument,
        }
    }
}
