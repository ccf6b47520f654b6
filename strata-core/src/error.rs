/// Error and warning types for stratigraphy building and drilling
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type StrataResult<T> = Result<T, StrataError>;

/// Conditions that reject input at build time or configuration time
///
/// Rejected sub-geometries are dropped and the build continues; the
/// collected errors are surfaced through [`crate::BuildReport`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrataError {
    #[error("duplicate layer name '{name}': geometry #{dropped} dropped, geometry #{kept} kept")]
    DuplicateLayerName {
        name: String,
        /// Input positions of the accepted and the dropped sub-geometry
        kept: usize,
        dropped: usize,
    },

    #[error("layer '{name}' has no vertices")]
    EmptyGeometry { name: String },

    #[error("layer '{name}' contains non-finite vertex coordinates")]
    NonFiniteGeometry { name: String },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

impl StrataError {
    #[must_use]
    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::InvalidParams(details.into())
    }

    /// Whether this error is a build-time validation failure of authored input
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::InvalidParams(_))
    }
}

/// Conditions that were recovered from automatically
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StrataWarning {
    /// The vector between the extreme-elevation vertices vanished
    #[error("layer '{layer}' has a degenerate dip vector, dip set to 0")]
    DegenerateDip { layer: String },

    #[error("no layer data between depth {start:.3} and {end:.3}, void inserted")]
    ReconstructionGap { start: f64, end: f64 },

    /// `depth` is where the clipped layer now starts
    #[error("layer '{layer}' overlaps a shallower segment, clipped at depth {depth:.3}")]
    OverlapTrimmed { layer: String, depth: f64 },
}

/// Why a drill action collected nothing
///
/// These are normal outcomes ("nothing found here"), not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EmptyReason {
    NoLayers,
    NonPositiveLength,
    DegenerateDirection,
    NothingPenetrated,
}

impl std::fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NoLayers => "no layers registered for this terrain",
            Self::NonPositiveLength => "drill length must be positive",
            Self::DegenerateDirection => "drill direction is degenerate",
            Self::NothingPenetrated => "nothing found here",
        };
        f.write_str(text)
    }
}
