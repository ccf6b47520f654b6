/// Layer records and the frozen stratigraphic stack
use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::{Point3, Unit, Vector3};
use parking_lot::RwLock;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analyzer::LayerGeometryAnalyzer;
use crate::classifier::{classify_layer_name, RockType};
use crate::error::{StrataError, StrataResult, StrataWarning};
use crate::geometry::{Footprint, GeometryId, MaterialHandle, SubGeometry};
use crate::params::StrataConfig;

/// Where a layer came from
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerSource {
    pub geometry: Option<GeometryId>,
    pub material: MaterialHandle,
}

/// One geological layer with derived attributes
///
/// Fields are read-only once built. `order_index` is `None` until the layer
/// has been placed into a [`StratigraphyModel`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Layer {
    name: String,
    rock_type: RockType,
    thickness: f64,
    dip_angle: f64,
    strike: Unit<Vector3<f64>>,
    order_index: Option<usize>,
    center: Point3<f64>,
    footprint: Footprint,
    source: LayerSource,
}

impl Layer {
    /// Start describing a layer; the rock type defaults to the name's classification.
    pub fn builder(name: impl Into<String>) -> LayerBuilder {
        LayerBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rock_type(&self) -> RockType {
        self.rock_type
    }

    /// Apparent vertical thickness (vertical extent of the bounding volume)
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    /// Thickness measured perpendicular to the bedding plane
    pub fn true_thickness(&self) -> f64 {
        self.thickness * self.dip_angle.to_radians().cos()
    }

    pub fn dip_angle(&self) -> f64 {
        self.dip_angle
    }

    pub fn strike(&self) -> Unit<Vector3<f64>> {
        self.strike
    }

    /// Horizontal direction the bed dips toward, `up × strike`
    pub fn dip_direction(&self) -> Unit<Vector3<f64>> {
        Unit::new_normalize(Vector3::y().cross(&self.strike.into_inner()))
    }

    pub fn normal(&self) -> Unit<Vector3<f64>> {
        let dip = self.dip_angle.to_radians();
        Unit::new_normalize(Vector3::y() * dip.cos() + self.dip_direction().into_inner() * dip.sin())
    }

    /// 0 is topmost
    pub fn order_index(&self) -> Option<usize> {
        self.order_index
    }

    pub fn center(&self) -> Point3<f64> {
        self.center
    }

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    pub fn source(&self) -> &LayerSource {
        &self.source
    }
}

#[derive(Debug, Clone)]
pub struct LayerBuilder {
    name: String,
    rock_type: Option<RockType>,
    thickness: f64,
    dip_angle: f64,
    strike: Vector3<f64>,
    center: Point3<f64>,
    footprint: Footprint,
    source: LayerSource,
}

impl LayerBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rock_type: None,
            thickness: 0.0,
            dip_angle: 0.0,
            strike: Vector3::z(),
            center: Point3::origin(),
            footprint: Footprint::default(),
            source: LayerSource::default(),
        }
    }

    #[must_use]
    pub fn rock_type(mut self, rock_type: RockType) -> Self {
        self.rock_type = Some(rock_type);
        self
    }

    #[must_use]
    pub fn thickness(mut self, thickness: f64) -> Self {
        self.thickness = thickness;
        self
    }

    #[must_use]
    pub fn dip_angle(mut self, degrees: f64) -> Self {
        self.dip_angle = degrees;
        self
    }

    #[must_use]
    pub fn strike(mut self, strike: Vector3<f64>) -> Self {
        self.strike = strike;
        self
    }

    #[must_use]
    pub fn center(mut self, center: Point3<f64>) -> Self {
        self.center = center;
        self
    }

    #[must_use]
    pub fn footprint(mut self, footprint: Footprint) -> Self {
        self.footprint = footprint;
        self
    }

    #[must_use]
    pub fn source(mut self, source: LayerSource) -> Self {
        self.source = source;
        self
    }

    /// Finish the layer, clamping thickness to ≥ 0 and dip to [0, 90].
    pub fn build(self) -> Layer {
        let rock_type = self
            .rock_type
            .unwrap_or_else(|| classify_layer_name(&self.name, &self.source.material));

        let thickness = if self.thickness.is_finite() {
            self.thickness.max(0.0)
        } else {
            0.0
        };
        let dip_angle = if self.dip_angle.is_finite() {
            self.dip_angle.clamp(0.0, 90.0)
        } else {
            0.0
        };

        Layer {
            name: self.name,
            rock_type,
            thickness,
            dip_angle,
            strike: horizontal_unit(&self.strike).unwrap_or_else(Vector3::z_axis),
            order_index: None,
            center: self.center,
            footprint: self.footprint,
            source: self.source,
        }
    }
}

/// Project onto the horizontal plane and normalize
pub(crate) fn horizontal_unit(v: &Vector3<f64>) -> Option<Unit<Vector3<f64>>> {
    Unit::try_new(Vector3::new(v.x, 0.0, v.z), 1e-9)
}

/// Ordered, immutable stack of layers, topmost first
#[derive(Debug, Clone, Default)]
pub struct StratigraphyModel {
    layers: Arc<[Layer]>,
}

impl StratigraphyModel {
    /// Order candidate layers into a frozen stack.
    ///
    /// Candidates are checked in the given order; a name already accepted
    /// rejects the later candidate. Accepted layers are sorted by descending
    /// vertical center (ties keep input order) and numbered from 0.
    pub fn build(candidates: Vec<Layer>) -> BuildReport {
        let mut seen: HashMap<String, usize> = HashMap::with_capacity(candidates.len());
        let mut rejected = Vec::new();
        let mut accepted = Vec::with_capacity(candidates.len());

        for (position, layer) in candidates.into_iter().enumerate() {
            let id = layer.source.geometry.map_or(position, |g| g.0);
            if let Some(&kept) = seen.get(&layer.name) {
                warn!(layer = %layer.name, kept, dropped = id, "Duplicate layer name rejected");
                rejected.push(StrataError::DuplicateLayerName {
                    name: layer.name,
                    kept,
                    dropped: id,
                });
                continue;
            }
            seen.insert(layer.name.clone(), id);
            accepted.push(layer);
        }

        accepted.sort_by(|a, b| b.center.y.total_cmp(&a.center.y));
        for (index, layer) in accepted.iter_mut().enumerate() {
            layer.order_index = Some(index);
        }

        info!(
            layers = accepted.len(),
            rejected = rejected.len(),
            "Stratigraphy built"
        );

        BuildReport {
            model: Self {
                layers: accepted.into(),
            },
            rejected,
            warnings: Vec::new(),
        }
    }

    pub fn all(&self) -> &[Layer] {
        &self.layers
    }

    pub fn at(&self, order_index: usize) -> Option<&Layer> {
        self.layers.get(order_index)
    }

    pub fn by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Outcome of building a stratigraphy.
///
/// The model is always usable; `rejected` lists inputs that were dropped.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub model: StratigraphyModel,
    pub rejected: Vec<StrataError>,
    pub warnings: Vec<StrataWarning>,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    /// The model, or the first rejection as a setup-time error.
    pub fn into_result(self) -> StrataResult<StratigraphyModel> {
        match self.rejected.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.model),
        }
    }
}

/// Analyze authored sub-geometries and build a stratigraphy from them.
///
/// Empty or non-finite geometries and duplicate names are rejected and
/// reported; every other sub-geometry becomes a layer.
pub fn build_stratigraphy(sub_geometries: &[SubGeometry], config: &StrataConfig) -> BuildReport {
    let analyzer = LayerGeometryAnalyzer::new(config.analyzer);
    let mut rejected = Vec::new();
    let mut warnings = Vec::new();
    let mut candidates = Vec::with_capacity(sub_geometries.len());

    for (position, geometry) in sub_geometries.iter().enumerate() {
        match analyzer.analyze(GeometryId(position), geometry) {
            Ok(analysis) => {
                warnings.extend(analysis.warnings);
                candidates.push(analysis.layer);
            }
            Err(err) => {
                warn!(layer = %geometry.name, error = %err, "Sub-geometry rejected");
                rejected.push(err);
            }
        }
    }

    let mut report = StratigraphyModel::build(candidates);
    rejected.append(&mut report.rejected);
    report.rejected = rejected;
    report.warnings = warnings;
    report
}

/// Shared handle to the current stratigraphy of a terrain.
///
/// Readers take a snapshot and drill against it without holding the lock;
/// a rebuild swaps the whole model at once.
#[derive(Debug, Default)]
pub struct SharedStratigraphy {
    current: RwLock<Arc<StratigraphyModel>>,
}

impl SharedStratigraphy {
    pub fn new(model: StratigraphyModel) -> Self {
        Self {
            current: RwLock::new(Arc::new(model)),
        }
    }

    pub fn snapshot(&self) -> Arc<StratigraphyModel> {
        Arc::clone(&self.current.read())
    }

    /// Publish a new model, returning the previous one.
    pub fn replace(&self, model: StratigraphyModel) -> Arc<StratigraphyModel> {
        std::mem::replace(&mut *self.current.write(), Arc::new(model))
    }
}
