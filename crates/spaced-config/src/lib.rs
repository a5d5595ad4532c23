// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

pub mod run;
pub mod tracing;

pub use run::{ConfigError, CriterionConfig, EnumerationConfig, ExecutionConfig, RunConfig};
pub use tracing::{flush_tracing, init_tracing, InitError};
