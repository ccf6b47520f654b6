/// Tunable tolerances for layer analysis and drilling
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{StrataError, StrataResult};

/// Parameters for [`crate::analyzer::LayerGeometryAnalyzer`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnalyzerParams {
    /// Vertices this close to the top (bottom) elevation join the dip centroid
    pub elevation_tolerance: f64,
    pub degenerate_epsilon: f64,
}

impl Default for AnalyzerParams {
    fn default() -> Self {
        Self {
            elevation_tolerance: 1e-4,
            degenerate_epsilon: 1e-6,
        }
    }
}

impl AnalyzerParams {
    #[must_use]
    pub const fn elevation_tolerance(mut self, tolerance: f64) -> Self {
        self.elevation_tolerance = tolerance;
        self
    }

    #[must_use]
    pub const fn degenerate_epsilon(mut self, epsilon: f64) -> Self {
        self.degenerate_epsilon = epsilon;
        self
    }

    pub fn validate(&self) -> StrataResult<()> {
        check_non_negative("analyzer.elevation_tolerance", self.elevation_tolerance)?;
        check_non_negative("analyzer.degenerate_epsilon", self.degenerate_epsilon)
    }
}

/// Parameters for drilling and core-sample reconstruction
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DrillParams {
    pub parallel_epsilon: f64,
    pub footprint_margin: f64,
    /// Seams narrower than this are reconciled instead of reported as voids
    pub gap_tolerance: f64,
}

impl Default for DrillParams {
    fn default() -> Self {
        Self {
            parallel_epsilon: 1e-6,
            footprint_margin: 0.0,
            gap_tolerance: 0.01, // 1 cm
        }
    }
}

impl DrillParams {
    /// Tight tolerances for analytically placed stacks
    #[must_use]
    pub const fn precise() -> Self {
        Self {
            parallel_epsilon: 1e-9,
            footprint_margin: 0.0,
            gap_tolerance: 1e-6,
        }
    }

    /// Loose tolerances for hand-placed patches with visible seams
    #[must_use]
    pub const fn forgiving() -> Self {
        Self {
            parallel_epsilon: 1e-6,
            footprint_margin: 0.05,
            gap_tolerance: 0.05,
        }
    }

    #[must_use]
    pub const fn parallel_epsilon(mut self, epsilon: f64) -> Self {
        self.parallel_epsilon = epsilon;
        self
    }

    #[must_use]
    pub const fn footprint_margin(mut self, margin: f64) -> Self {
        self.footprint_margin = margin;
        self
    }

    #[must_use]
    pub const fn gap_tolerance(mut self, tolerance: f64) -> Self {
        self.gap_tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> StrataResult<()> {
        check_non_negative("drill.parallel_epsilon", self.parallel_epsilon)?;
        check_non_negative("drill.footprint_margin", self.footprint_margin)?;
        check_non_negative("drill.gap_tolerance", self.gap_tolerance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StrataConfig {
    pub analyzer: AnalyzerParams,
    pub drill: DrillParams,
}

impl StrataConfig {
    pub fn validate(&self) -> StrataResult<()> {
        self.analyzer.validate()?;
        self.drill.validate()
    }
}

fn check_non_negative(key: &str, value: f64) -> StrataResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(StrataError::invalid_params(format!(
            "{key} must be a finite, non-negative number (got {value})"
        )))
    }
}
