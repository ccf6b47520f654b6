/// Strata Core Library - Stratigraphic layer model and core-sample drilling
///
/// This library derives layer attributes from authored layer geometry, orders
/// them into a frozen stack, and reconstructs the core a drill would collect.

pub mod analyzer;
pub mod classifier;
pub mod drill;
pub mod error;
pub mod geometry;
pub mod model;
pub mod params;
pub mod sample;
pub mod transform;

// Re-export commonly used types
pub use analyzer::{LayerAnalysis, LayerGeometryAnalyzer};
pub use classifier::{classify_layer_name, RockType};
pub use drill::{drill, drill_path, DrillIntersectionSolver, DrillOutcome, DrillPath, Intersection};
pub use error::{EmptyReason, StrataError, StrataResult, StrataWarning};
pub use geometry::{box_vertices, Aabb, Footprint, GeometryId, MaterialHandle, SubGeometry};
pub use model::{
    build_stratigraphy, BuildReport, Layer, LayerBuilder, LayerSource, SharedStratigraphy,
    StratigraphyModel,
};
pub use params::{AnalyzerParams, DrillParams, StrataConfig};
pub use sample::{
    Contact, ContactType, CoreSample, CoreSampleReconstructor, LayerStatistics, Reconstruction,
    Segment, SegmentKind, SegmentSource,
};
pub use transform::{EulerAngles, Transform};
