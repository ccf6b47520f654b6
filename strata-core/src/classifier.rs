/// Layer name to rock type classification
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::MaterialHandle;

/// Classified rock type of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RockType {
    Soil,
    Alluvium,
    Sedimentary,
    Metamorphic,
    Igneous,
    Bedrock,
}

impl RockType {
    pub const ALL: [RockType; 6] = [
        RockType::Soil,
        RockType::Alluvium,
        RockType::Sedimentary,
        RockType::Metamorphic,
        RockType::Igneous,
        RockType::Bedrock,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RockType::Soil => "Soil",
            RockType::Alluvium => "Alluvium",
            RockType::Sedimentary => "Sedimentary",
            RockType::Metamorphic => "Metamorphic",
            RockType::Igneous => "Igneous",
            RockType::Bedrock => "Bedrock",
        }
    }

    /// Nominal bulk density in g/cm³
    pub fn density(self) -> f64 {
        match self {
            RockType::Soil => 1.5,
            RockType::Alluvium => 1.8,
            RockType::Sedimentary => 2.3,
            RockType::Igneous => 2.7,
            RockType::Metamorphic => 2.8,
            RockType::Bedrock => 2.9,
        }
    }

    /// Display color as 8-bit RGB
    pub fn display_color(self) -> (u8, u8, u8) {
        match self {
            RockType::Soil => (153, 102, 51),
            RockType::Alluvium => (204, 178, 127),
            RockType::Sedimentary => (178, 178, 204),
            RockType::Metamorphic => (153, 127, 178),
            RockType::Igneous => (102, 102, 102),
            RockType::Bedrock => (76, 76, 76),
        }
    }
}

impl std::fmt::Display for RockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Vocabulary in priority order; every term carries its CJK alias.
const VOCABULARY: &[(&[&str], RockType)] = &[
    (&["soil", "土"], RockType::Soil),
    (&["alluvium", "冲积"], RockType::Alluvium),
    (&["bedrock", "基岩"], RockType::Bedrock),
    (&["igneous", "火成"], RockType::Igneous),
    (&["metamorphic", "变质"], RockType::Metamorphic),
];

/// Classify a layer by name.
///
/// Case-insensitive substring match against the vocabulary; the first term
/// matched in priority order wins and unmatched names are `Sedimentary`.
/// The material handle does not influence the result.
pub fn classify_layer_name(name: &str, _material: &MaterialHandle) -> RockType {
    let name = name.to_lowercase();

    VOCABULARY
        .iter()
        .find(|(terms, _)| terms.iter().any(|term| name.contains(term)))
        .map_or(RockType::Sedimentary, |&(_, rock_type)| rock_type)
}
