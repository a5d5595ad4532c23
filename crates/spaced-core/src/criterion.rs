// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

//! Closed-form straight-and-spaced criterion.
//!
//! The batch summary supplies the worst zeta and iota-zeta readings and the
//! smallest spacing; from those, an interpolated angle bound `ε_aux` and four
//! thresholds `δ₁..δ₄` are derived and seven inequalities are checked. Any
//! `arccos`, `arccosh` or division that leaves its domain is reported as a
//! [`SpacedError::Domain`] naming the quantity instead of propagating NaN.

use std::fmt;

use serde::Serialize;

use crate::batch::BatchSummary;
use crate::error::{SpacedError, SpacedResult};

/// Safety margin added to every threshold `δᵢ`.
const DELTA_MARGIN: f64 = 1e-10;

pub const DEFAULT_DIM: usize = 3;
pub const DEFAULT_PARAMETER: f64 = 0.7;

/// Scalars the criterion consumes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CriterionInputs {
    pub min_cos_zeta: f64,
    pub min_cos_iota_zeta: f64,
    pub spacing: f64,
    pub dim: usize,
    /// Interpolation weight between the observed angle and `ε_max`, in (0.5, 1).
    pub parameter: f64,
}

impl CriterionInputs {
    pub fn new(min_cos_zeta: f64, min_cos_iota_zeta: f64, spacing: f64) -> Self {
        Self {
            min_cos_zeta,
            min_cos_iota_zeta,
            spacing,
            dim: DEFAULT_DIM,
            parameter: DEFAULT_PARAMETER,
        }
    }

    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    pub fn with_parameter(mut self, parameter: f64) -> Self {
        self.parameter = parameter;
        self
    }

    /// Reads the extrema of a rank-two pairs run.
    pub fn from_summary(summary: &BatchSummary) -> SpacedResult<Self> {
        let require = |value: Option<f64>, computation: &'static str| {
            value.ok_or_else(|| SpacedError::domain(computation, f64::NAN))
        };
        Ok(Self::new(
            require(summary.min_cos_primary, "summary min zeta-angle")?,
            require(summary.min_cos_secondary, "summary min iota-zeta-angle")?,
            require(summary.spacing, "summary spacing")?,
        ))
    }

    /// Takes the minimum of each persisted column. A NaN or an empty column
    /// cannot give a trustworthy bound and is rejected.
    pub fn from_arrays(
        cos_zeta: &[f64],
        cos_iota_zeta: &[f64],
        spacing: &[f64],
    ) -> SpacedResult<Self> {
        Ok(Self::new(
            column_min(cos_zeta, "min of zeta-angle column")?,
            column_min(cos_iota_zeta, "min of iota-zeta-angle column")?,
            column_min(spacing, "min of spacing column")?,
        ))
    }
}

fn column_min(values: &[f64], computation: &'static str) -> SpacedResult<f64> {
    if values.is_empty() {
        return Err(SpacedError::domain(computation, f64::NAN));
    }
    values.iter().try_fold(f64::INFINITY, |acc, &value| {
        if value.is_nan() {
            Err(SpacedError::domain(computation, value))
        } else {
            Ok(acc.min(value))
        }
    })
}

fn checked_acos(value: f64, computation: &'static str) -> SpacedResult<f64> {
    if (-1.0..=1.0).contains(&value) {
        Ok(value.acos())
    } else {
        Err(SpacedError::domain(computation, value))
    }
}

/// `arccosh(√(d / (1 + (d-1)·cos θ))) + margin`.
fn threshold(dim: f64, angle: f64, computation: &'static str) -> SpacedResult<f64> {
    let ratio = dim / (1.0 + (dim - 1.0) * angle.cos());
    if !(ratio.is_finite() && ratio >= 1.0) {
        return Err(SpacedError::domain(computation, ratio));
    }
    Ok(ratio.sqrt().acosh() + DELTA_MARGIN)
}

/// One named inequality `lhs ⋈ rhs`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CriterionItem {
    pub name: &'static str,
    pub lhs: f64,
    pub relation: &'static str,
    pub rhs: f64,
    pub holds: bool,
}

impl CriterionItem {
    fn greater(name: &'static str, lhs: f64, rhs: f64) -> Self {
        Self { name, lhs, relation: ">", rhs, holds: lhs > rhs }
    }

    fn less(name: &'static str, lhs: f64, rhs: f64) -> Self {
        Self { name, lhs, relation: "<", rhs, holds: lhs < rhs }
    }

    fn at_most(name: &'static str, lhs: f64, rhs: f64) -> Self {
        Self { name, lhs, relation: "<=", rhs, holds: lhs <= rhs }
    }
}

impl fmt::Display for CriterionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Item {:<3} {:>22.16} {:<2} {:<22.16} {}",
            self.name, self.lhs, self.relation, self.rhs, self.holds
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CriterionReport {
    pub inputs: CriterionInputs,
    pub zeta0: f64,
    pub eps_max: f64,
    pub eps: f64,
    pub eps_aux: f64,
    pub delta1: f64,
    pub delta2: f64,
    pub delta3: f64,
    pub delta4: f64,
    pub items: [CriterionItem; 7],
}

impl CriterionReport {
    /// True iff all seven items hold.
    pub fn passed(&self) -> bool {
        self.items.iter().all(|item| item.holds)
    }

    pub fn item(&self, name: &str) -> Option<&CriterionItem> {
        self.items.iter().find(|item| item.name == name)
    }

    pub fn failed_items(&self) -> impl Iterator<Item = &CriterionItem> {
        self.items.iter().filter(|item| !item.holds)
    }
}

impl fmt::Display for CriterionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs = &self.inputs;
        writeln!(f, "min cos zeta-angle       = {}", inputs.min_cos_zeta)?;
        writeln!(f, "min cos iota-zeta-angle  = {}", inputs.min_cos_iota_zeta)?;
        writeln!(f, "spacing                  = {}", inputs.spacing)?;
        writeln!(f, "dim = {}, parameter = {}", inputs.dim, inputs.parameter)?;
        writeln!(f, "zeta0   = {}", self.zeta0)?;
        writeln!(f, "eps_max = {}", self.eps_max)?;
        writeln!(f, "eps     = {}", self.eps)?;
        writeln!(f, "eps_aux = {}", self.eps_aux)?;
        writeln!(f, "delta1  = {}", self.delta1)?;
        writeln!(f, "delta2  = {}", self.delta2)?;
        writeln!(f, "delta3  = {}", self.delta3)?;
        writeln!(f, "delta4  = {}", self.delta4)?;
        for item in &self.items {
            writeln!(f, "{item}")?;
        }
        let verdict = if self.passed() { "passed" } else { "failed" };
        write!(f, "straight-and-spaced check {verdict}")
    }
}

/// Evaluates the seven items for `inputs`.
pub fn evaluate(inputs: &CriterionInputs) -> SpacedResult<CriterionReport> {
    if !(inputs.parameter > 0.5 && inputs.parameter < 1.0) {
        return Err(SpacedError::domain("interpolation parameter", inputs.parameter));
    }
    if inputs.dim < 2 {
        return Err(SpacedError::domain("dimension", inputs.dim as f64));
    }
    let d = inputs.dim as f64;
    let s = inputs.spacing;
    let wall = -1.0 / (d - 1.0);

    let zeta0 = (1.0 / (2.0 * d * (d - 1.0))).sqrt();
    let eps_max = wall.acos();
    let eps = checked_acos(inputs.min_cos_zeta, "arccos of min zeta-angle")?
        + checked_acos(inputs.min_cos_iota_zeta, "arccos of min iota-zeta-angle")?;
    let eps_aux = inputs.parameter * eps + (1.0 - inputs.parameter) * eps_max;

    let delta1 = threshold(d, eps_aux, "delta1")?;
    let delta2 = threshold(d, eps_aux - eps, "delta2")?;
    let delta3 = threshold(d, 2.0 * eps_aux - eps, "delta3")?;
    let delta4 = delta3 + delta3.exp_m1() * (-s).exp() + DELTA_MARGIN;

    let gap = (s - delta4).sinh();
    if gap == 0.0 || !gap.is_finite() {
        return Err(SpacedError::domain("sinh(spacing - delta4)", gap));
    }
    let bend = |delta: f64| 1.0 / delta.cosh().powi(2);

    let items = [
        CriterionItem::greater("1a", (2.0 * eps_aux - eps).cos(), wall),
        CriterionItem::greater("1b", (eps_aux + delta4 * zeta0 / gap).cos(), wall),
        CriterionItem::at_most("2a", (1.0 - d) * eps_aux.cos() + d * bend(delta1), 1.0),
        CriterionItem::at_most(
            "2b",
            (1.0 - d) * (2.0 * eps_aux - eps).cos() + d * bend(delta3),
            1.0,
        ),
        CriterionItem::at_most("3", (1.0 - d) * (eps_aux - eps).cos() + d * bend(delta2), 1.0),
        CriterionItem::at_most("4", (delta1 - s).exp() - (-s).exp(), delta2),
        CriterionItem::less("5", 2.0 * delta4, s),
    ];

    Ok(CriterionReport {
        inputs: *inputs,
        zeta0,
        eps_max,
        eps,
        eps_aux,
        delta1,
        delta2,
        delta3,
        delta4,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_outside_open_interval_is_rejected() {
        for parameter in [0.5, 1.0, 0.2, f64::NAN] {
            let inputs = CriterionInputs::new(0.87, 0.86, 5.0).with_parameter(parameter);
            assert!(matches!(
                evaluate(&inputs),
                Err(SpacedError::Domain { computation: "interpolation parameter", .. })
            ));
        }
        let inputs = CriterionInputs::new(0.87, 0.86, 5.0).with_dim(1);
        assert!(evaluate(&inputs).is_err());
    }

    #[test]
    fn cosine_outside_unit_interval_names_the_arccos() {
        let inputs = CriterionInputs::new(1.0000001, 0.86, 5.0);
        match evaluate(&inputs) {
            Err(SpacedError::Domain { computation, argument }) => {
                assert_eq!(computation, "arccos of min zeta-angle");
                assert_eq!(argument, 1.0000001);
            }
            other => panic!("expected domain error, got {other:?}"),
        }
    }

    #[test]
    fn wide_angles_leave_the_threshold_domain() {
        let inputs = CriterionInputs::new(0.2, 0.1, 5.0);
        assert!(matches!(
            evaluate(&inputs),
            Err(SpacedError::Domain { computation: "delta1", .. })
        ));
    }

    #[test]
    fn column_minimum_rejects_nan_and_empty_columns() {
        assert_eq!(column_min(&[0.3, -0.1, 0.2], "col").unwrap(), -0.1);
        assert!(column_min(&[0.3, f64::NAN], "col").is_err());
        assert!(column_min(&[], "col").is_err());
    }

    #[test]
    fn report_display_lists_every_item() {
        let report = evaluate(&CriterionInputs::new(0.87, 0.86, 5.0)).unwrap();
        let text = report.to_string();
        for name in ["1a", "1b", "2a", "2b", "3", "4", "5"] {
            assert!(text.contains(&format!("Item {name}")), "{text}");
        }
        assert!(text.ends_with("passed"));
    }
}
