/// Derivation of layer attributes from authored geometry
use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};

use crate::classifier::classify_layer_name;
use crate::error::{StrataError, StrataResult, StrataWarning};
use crate::geometry::{Aabb, GeometryId, SubGeometry};
use crate::model::{horizontal_unit, Layer, LayerSource};
use crate::params::AnalyzerParams;

/// A derived layer plus whatever was recovered while deriving it.
#[derive(Debug, Clone)]
pub struct LayerAnalysis {
    pub layer: Layer,
    pub warnings: Vec<StrataWarning>,
}

/// Extracts per-layer attributes from sub-geometries. Inputs are never modified.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerGeometryAnalyzer {
    params: AnalyzerParams,
}

impl LayerGeometryAnalyzer {
    pub fn new(params: AnalyzerParams) -> Self {
        Self { params }
    }

    /// Analyze one sub-geometry. The resulting layer has no order index yet.
    pub fn analyze(&self, id: GeometryId, geometry: &SubGeometry) -> StrataResult<LayerAnalysis> {
        if geometry.vertices.is_empty() {
            return Err(StrataError::EmptyGeometry {
                name: geometry.name.clone(),
            });
        }
        if !geometry.is_finite() {
            return Err(StrataError::NonFiniteGeometry {
                name: geometry.name.clone(),
            });
        }

        let world = geometry.world_vertices();
        let bounds = Aabb::from_points(world.iter()).ok_or_else(|| StrataError::EmptyGeometry {
            name: geometry.name.clone(),
        })?;

        let mut warnings = Vec::new();
        let dip_vector = self.dip_vector(&world);
        let dip_angle = match dip_vector {
            Some(vector) => dip_from_vertical(&vector),
            None => {
                warn!(layer = %geometry.name, "Degenerate dip vector, defaulting to 0");
                warnings.push(StrataWarning::DegenerateDip {
                    layer: geometry.name.clone(),
                });
                0.0
            }
        };
        let strike = orient_strike(strike_direction(geometry), dip_vector.as_ref());
        let rock_type = classify_layer_name(&geometry.name, &geometry.material);

        let layer = Layer::builder(geometry.name.clone())
            .rock_type(rock_type)
            .thickness(bounds.size().y)
            .dip_angle(dip_angle)
            .strike(strike)
            .center(bounds.center())
            .footprint(bounds.footprint())
            .source(LayerSource {
                geometry: Some(id),
                material: geometry.material.clone(),
            })
            .build();

        debug!(
            layer = %layer.name(),
            rock_type = %layer.rock_type(),
            thickness = layer.thickness(),
            dip = layer.dip_angle(),
            "Analyzed layer"
        );

        Ok(LayerAnalysis { layer, warnings })
    }

    /// Vector from the lowest to the highest vertices, or `None` when it vanishes.
    fn dip_vector(&self, world: &[Point3<f64>]) -> Option<Vector3<f64>> {
        let tolerance = self.params.elevation_tolerance;
        let max_y = world.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        let min_y = world.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);

        let highest = centroid(world.iter().filter(|p| p.y >= max_y - tolerance))?;
        let lowest = centroid(world.iter().filter(|p| p.y <= min_y + tolerance))?;

        let direction = highest - lowest;
        if direction.norm() < self.params.degenerate_epsilon {
            return None;
        }
        Some(direction)
    }
}

/// Angle between vertical and `direction`, in degrees
fn dip_from_vertical(direction: &Vector3<f64>) -> f64 {
    let cos = (direction.y.abs() / direction.norm()).clamp(0.0, 1.0);
    cos.acos().to_degrees().clamp(0.0, 90.0)
}

/// Flip `strike` so that `up × strike` points down-dip, toward the lowest vertices.
///
/// A vertical or missing dip vector, or one running along strike, leaves it as is.
fn orient_strike(strike: Vector3<f64>, dip_vector: Option<&Vector3<f64>>) -> Vector3<f64> {
    let Some(up_dip) = dip_vector.and_then(horizontal_unit) else {
        return strike;
    };
    if Vector3::y().cross(&strike).dot(&up_dip.into_inner()) > 0.0 {
        -strike
    } else {
        strike
    }
}

fn centroid<'a>(points: impl Iterator<Item = &'a Point3<f64>>) -> Option<Point3<f64>> {
    let (sum, count) = points.fold((Vector3::zeros(), 0usize), |(sum, count), p| {
        (sum + p.coords, count + 1)
    });
    if count == 0 {
        None
    } else {
        Some(Point3::from(sum / count as f64))
    }
}

/// Longer local horizontal axis mapped to world space.
///
/// Local X wins only when strictly longer than local Z.
fn strike_direction(geometry: &SubGeometry) -> Vector3<f64> {
    let Some(local) = geometry.local_bounds() else {
        return Vector3::z();
    };
    let size = local.size();
    let (primary, secondary) = if size.x > size.z {
        (Vector3::x(), Vector3::z())
    } else {
        (Vector3::z(), Vector3::x())
    };

    [primary, secondary]
        .iter()
        .find_map(|axis| horizontal_unit(&geometry.transform.transform_direction(axis)))
        .map_or_else(Vector3::z, |unit| unit.into_inner())
}
