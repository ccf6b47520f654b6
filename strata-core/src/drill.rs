/// Drill paths and ray/slab intersection against the stratigraphy
use nalgebra::{Point3, Unit, Vector3};
use tracing::{debug, info};

use crate::error::{EmptyReason, StrataWarning};
use crate::geometry::Footprint;
use crate::model::{Layer, StratigraphyModel};
use crate::params::DrillParams;
use crate::sample::{CoreSample, CoreSampleReconstructor};

/// A single drill action: where it starts, which way it goes, how far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrillPath {
    origin: Point3<f64>,
    direction: Unit<Vector3<f64>>,
    max_length: f64,
    window: (f64, f64),
}

impl DrillPath {
    /// Create a path. Fails with the matching [`EmptyReason`] when the
    /// length is not positive or the direction cannot be normalized.
    pub fn new(
        origin: Point3<f64>,
        direction: Vector3<f64>,
        max_length: f64,
    ) -> Result<Self, EmptyReason> {
        if !(max_length.is_finite() && max_length > 0.0) {
            return Err(EmptyReason::NonPositiveLength);
        }
        if !direction.iter().all(|c| c.is_finite()) {
            return Err(EmptyReason::DegenerateDirection);
        }
        let direction = Unit::try_new(direction, 1e-12).ok_or(EmptyReason::DegenerateDirection)?;

        Ok(Self {
            origin,
            direction,
            max_length,
            window: (0.0, max_length),
        })
    }

    /// Straight down from `origin`.
    pub fn vertical(origin: Point3<f64>, max_length: f64) -> Result<Self, EmptyReason> {
        Self::new(origin, -Vector3::y(), max_length)
    }

    /// Only report the core between `start` and `end` (distances from the origin).
    #[must_use]
    pub fn with_window(mut self, start: f64, end: f64) -> Self {
        let start = start.clamp(0.0, self.max_length);
        let end = end.clamp(start, self.max_length);
        self.window = (start, end);
        self
    }

    pub fn origin(&self) -> Point3<f64> {
        self.origin
    }

    pub fn direction(&self) -> Unit<Vector3<f64>> {
        self.direction
    }

    pub fn max_length(&self) -> f64 {
        self.max_length
    }

    /// Depth range reported by this path.
    pub fn window(&self) -> (f64, f64) {
        self.window
    }
}

/// The span of the path inside one layer, `0 <= entry < exit <= max_length`.
#[derive(Debug, Clone, Copy)]
pub struct Intersection<'m> {
    layer: &'m Layer,
    entry: f64,
    exit: f64,
}

impl<'m> Intersection<'m> {
    pub(crate) fn new(layer: &'m Layer, entry: f64, exit: f64) -> Self {
        Self { layer, entry, exit }
    }

    pub fn layer(&self) -> &'m Layer {
        self.layer
    }

    pub fn entry(&self) -> f64 {
        self.entry
    }

    pub fn exit(&self) -> f64 {
        self.exit
    }

    pub fn length(&self) -> f64 {
        self.exit - self.entry
    }
}

/// Computes where a drill path enters and leaves each layer slab.
///
/// A layer is a finite slab: two planes parallel to bedding, one true
/// thickness apart, centered on the layer center and bounded by its footprint.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrillIntersectionSolver {
    params: DrillParams,
}

impl DrillIntersectionSolver {
    pub fn new(params: DrillParams) -> Self {
        Self { params }
    }

    /// Intersections sorted by entry distance.
    ///
    /// Layers the path runs parallel to, misses horizontally, or only grazes
    /// are skipped.
    pub fn intersect<'m>(
        &self,
        model: &'m StratigraphyModel,
        path: &DrillPath,
    ) -> Vec<Intersection<'m>> {
        let mut hits: Vec<Intersection<'m>> = model
            .all()
            .iter()
            .filter_map(|layer| self.intersect_layer(layer, path))
            .collect();

        hits.sort_by(|a, b| {
            a.entry
                .total_cmp(&b.entry)
                .then_with(|| a.layer.order_index().cmp(&b.layer.order_index()))
        });
        hits
    }

    fn intersect_layer<'m>(&self, layer: &'m Layer, path: &DrillPath) -> Option<Intersection<'m>> {
        let normal = layer.normal();
        let denom = normal.dot(&path.direction.into_inner());
        if denom.abs() < self.params.parallel_epsilon {
            debug!(layer = %layer.name(), "Drill path parallel to bedding, skipped");
            return None;
        }

        // Planes: n·(p - c) = ±h, with p = o + t·d
        let half = layer.true_thickness() / 2.0;
        let offset = normal.dot(&(layer.center() - path.origin));
        let t_top = (offset + half) / denom;
        let t_bottom = (offset - half) / denom;

        let (window_start, window_end) = path.window;
        let mut entry = t_top.min(t_bottom).max(window_start);
        let mut exit = t_top.max(t_bottom).min(window_end);

        let footprint = layer.footprint().expanded(self.params.footprint_margin);
        let Some((inside_from, inside_to)) = self.footprint_span(&footprint, path) else {
            debug!(layer = %layer.name(), "Drill path outside layer footprint, skipped");
            return None;
        };
        entry = entry.max(inside_from);
        exit = exit.min(inside_to);

        if entry >= exit {
            return None;
        }

        Some(Intersection::new(layer, entry, exit))
    }

    /// Distances over which the path is above the footprint rectangle.
    fn footprint_span(&self, footprint: &Footprint, path: &DrillPath) -> Option<(f64, f64)> {
        let (x_from, x_to) = axis_span(
            path.origin.x,
            path.direction.x,
            footprint.min_x,
            footprint.max_x,
            self.params.parallel_epsilon,
        )?;
        let (z_from, z_to) = axis_span(
            path.origin.z,
            path.direction.z,
            footprint.min_z,
            footprint.max_z,
            self.params.parallel_epsilon,
        )?;

        let from = x_from.max(z_from);
        let to = x_to.min(z_to);
        (from <= to).then_some((from, to))
    }
}

fn axis_span(origin: f64, direction: f64, min: f64, max: f64, epsilon: f64) -> Option<(f64, f64)> {
    if direction.abs() < epsilon {
        return (origin >= min && origin <= max).then_some((f64::NEG_INFINITY, f64::INFINITY));
    }
    let t1 = (min - origin) / direction;
    let t2 = (max - origin) / direction;
    Some((t1.min(t2), t1.max(t2)))
}

/// Result of a drill action.
#[derive(Debug, Clone)]
pub enum DrillOutcome {
    /// A core sample was collected.
    Sample {
        sample: CoreSample,
        warnings: Vec<StrataWarning>,
    },
    /// Nothing was collected; a normal outcome.
    Empty(EmptyReason),
}

impl DrillOutcome {
    pub fn sample(&self) -> Option<&CoreSample> {
        match self {
            DrillOutcome::Sample { sample, .. } => Some(sample),
            DrillOutcome::Empty(_) => None,
        }
    }

    pub fn into_sample(self) -> Option<CoreSample> {
        match self {
            DrillOutcome::Sample { sample, .. } => Some(sample),
            DrillOutcome::Empty(_) => None,
        }
    }

    pub fn empty_reason(&self) -> Option<EmptyReason> {
        match self {
            DrillOutcome::Sample { .. } => None,
            DrillOutcome::Empty(reason) => Some(*reason),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, DrillOutcome::Empty(_))
    }
}

/// Drill into `model` from `origin` along `direction` for up to `max_length`.
pub fn drill(
    model: &StratigraphyModel,
    origin: Point3<f64>,
    direction: Vector3<f64>,
    max_length: f64,
    params: &DrillParams,
) -> DrillOutcome {
    match DrillPath::new(origin, direction, max_length) {
        Ok(path) => drill_path(model, &path, params),
        Err(reason) => DrillOutcome::Empty(reason),
    }
}

/// Drill along a prepared path.
pub fn drill_path(model: &StratigraphyModel, path: &DrillPath, params: &DrillParams) -> DrillOutcome {
    if model.is_empty() {
        return DrillOutcome::Empty(EmptyReason::NoLayers);
    }

    let intersections = DrillIntersectionSolver::new(*params).intersect(model, path);
    if intersections.is_empty() {
        info!(origin = ?path.origin(), "Drill found nothing");
        return DrillOutcome::Empty(EmptyReason::NothingPenetrated);
    }

    let reconstruction =
        CoreSampleReconstructor::new(*params).reconstruct(&intersections, path);

    info!(
        segments = reconstruction.sample.len(),
        depth = reconstruction.sample.penetrated_depth(),
        "Core sample collected"
    );

    DrillOutcome::Sample {
        sample: reconstruction.sample,
        warnings: reconstruction.warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::RockType;
    use approx::assert_relative_eq;

    fn layer(name: &str, center_y: f64, thickness: f64, dip: f64) -> Layer {
        Layer::builder(name)
            .thickness(thickness)
            .dip_angle(dip)
            .strike(Vector3::x())
            .center(Point3::new(0.0, center_y, 0.0))
            .footprint(Footprint::centered(0.0, 0.0, 20.0))
            .build()
    }

    fn model(layers: Vec<Layer>) -> StratigraphyModel {
        StratigraphyModel::build(layers).model
    }

    #[test]
    fn test_path_rejects_bad_input() {
        let origin = Point3::origin();
        assert_eq!(
            DrillPath::new(origin, -Vector3::y(), 0.0),
            Err(EmptyReason::NonPositiveLength)
        );
        assert_eq!(
            DrillPath::new(origin, -Vector3::y(), f64::NAN),
            Err(EmptyReason::NonPositiveLength)
        );
        assert_eq!(
            DrillPath::new(origin, Vector3::zeros(), 5.0),
            Err(EmptyReason::DegenerateDirection)
        );
    }

    #[test]
    fn test_vertical_through_flat_layer() {
        let model = model(vec![layer("Clay", -3.0, 2.0, 0.0)]);
        let path = DrillPath::vertical(Point3::origin(), 10.0).unwrap();
        let hits = DrillIntersectionSolver::default().intersect(&model, &path);

        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].entry(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(hits[0].exit(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_dipping_layer_keeps_vertical_thickness() {
        let model = model(vec![layer("Sandstone", -4.0, 4.0, 30.0)]);
        let path = DrillPath::vertical(Point3::origin(), 20.0).unwrap();
        let hits = DrillIntersectionSolver::default().intersect(&model, &path);

        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].length(), 4.0, epsilon = 1e-9);
        assert_relative_eq!(hits[0].entry(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_clipped_to_max_length() {
        let model = model(vec![layer("Bedrock", -10.0, 10.0, 0.0)]);
        let path = DrillPath::vertical(Point3::origin(), 7.0).unwrap();
        let hits = DrillIntersectionSolver::default().intersect(&model, &path);

        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].entry(), 5.0, epsilon = 1e-12);
        assert_relative_eq!(hits[0].exit(), 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_parallel_path_is_skipped() {
        let model = model(vec![layer("Clay", -1.0, 2.0, 0.0)]);
        let path = DrillPath::new(Point3::new(0.0, -1.0, 0.0), Vector3::x(), 5.0).unwrap();
        assert!(DrillIntersectionSolver::default().intersect(&model, &path).is_empty());
    }

    #[test]
    fn test_outside_footprint_is_skipped() {
        let model = model(vec![layer("Clay", -1.0, 2.0, 0.0)]);
        let path = DrillPath::vertical(Point3::new(50.0, 0.0, 0.0), 5.0).unwrap();
        assert!(DrillIntersectionSolver::default().intersect(&model, &path).is_empty());

        let edge = DrillPath::vertical(Point3::new(10.1, 0.0, 0.0), 5.0).unwrap();
        let loose = DrillIntersectionSolver::new(DrillParams::default().footprint_margin(0.5));
        assert_eq!(loose.intersect(&model, &edge).len(), 1);
    }

    #[test]
    fn test_slanted_path_leaves_footprint() {
        // Leaves the 20 m footprint at x = 10, i.e. after 10·√2 along the path
        let model = model(vec![layer("Bedrock", -50.0, 100.0, 0.0)]);
        let path = DrillPath::new(Point3::origin(), Vector3::new(1.0, -1.0, 0.0), 100.0).unwrap();
        let hits = DrillIntersectionSolver::default().intersect(&model, &path);

        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].entry(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(hits[0].exit(), 10.0 * 2f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_sorted_by_entry_not_order_index() {
        // Centers say A is on top, but A's slab sits below B along the path
        let a = Layer::builder("A")
            .thickness(1.0)
            .center(Point3::new(0.0, 0.0, 0.0))
            .footprint(Footprint::centered(30.0, 0.0, 4.0))
            .build();
        let b = Layer::builder("B")
            .thickness(1.0)
            .center(Point3::new(0.0, -0.5, 0.0))
            .footprint(Footprint::centered(0.0, 0.0, 80.0))
            .build();
        let model = model(vec![a, b]);

        let path = DrillPath::new(Point3::new(0.0, 0.5, 0.0), Vector3::new(1.0, -0.02, 0.0), 40.0)
            .unwrap();
        let hits = DrillIntersectionSolver::default().intersect(&model, &path);
        let names: Vec<_> = hits.iter().map(|h| h.layer().name()).collect();
        assert_eq!(names, ["B", "A"]);
        assert!(hits[0].entry() <= hits[1].entry());
    }

    #[test]
    fn test_drill_empty_outcomes() {
        let params = DrillParams::default();
        let empty = StratigraphyModel::default();
        let outcome = drill(&empty, Point3::origin(), -Vector3::y(), 5.0, &params);
        assert_eq!(outcome.empty_reason(), Some(EmptyReason::NoLayers));

        let model = model(vec![layer("Clay", -1.0, 2.0, 0.0)]);
        let outcome = drill(&model, Point3::origin(), -Vector3::y(), -1.0, &params);
        assert_eq!(outcome.empty_reason(), Some(EmptyReason::NonPositiveLength));

        let outcome = drill(&model, Point3::origin(), Vector3::y(), 5.0, &params);
        assert_eq!(outcome.empty_reason(), Some(EmptyReason::NothingPenetrated));
    }

    #[test]
    fn test_drill_collects_sample() {
        let model = model(vec![layer("TopSoil", -1.0, 2.0, 0.0)]);
        let outcome = drill(
            &model,
            Point3::origin(),
            -Vector3::y(),
            10.0,
            &DrillParams::default(),
        );
        let sample = outcome.into_sample().unwrap();
        assert_eq!(sample.len(), 1);
        assert_eq!(sample.segments()[0].rock_type(), Some(RockType::Soil));
    }

    #[test]
    fn test_window_limits_reported_depth() {
        let model = model(vec![layer("Bedrock", -10.0, 20.0, 0.0)]);
        let path = DrillPath::vertical(Point3::origin(), 20.0)
            .unwrap()
            .with_window(5.0, 8.0);
        let hits = DrillIntersectionSolver::default().intersect(&model, &path);

        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].entry(), 5.0);
        assert_relative_eq!(hits[0].exit(), 8.0);
    }

    #[test]
    fn test_intersections_stay_inside_path() {
        let model = model(vec![
            layer("TopSoil", 1.0, 4.0, 0.0),
            layer("Sandstone", -4.0, 6.0, 20.0),
            layer("Bedrock", -20.0, 20.0, 0.0),
        ]);
        let path = DrillPath::vertical(Point3::origin(), 12.0).unwrap();
        let hits = DrillIntersectionSolver::default().intersect(&model, &path);

        assert_eq!(hits.len(), 3);
        for hit in &hits {
            assert!(0.0 <= hit.entry() && hit.entry() < hit.exit());
            assert!(hit.exit() <= path.max_length());
            assert_relative_eq!(hit.length(), hit.exit() - hit.entry());
        }
        assert_eq!(hits[0].layer().name(), "TopSoil");
        assert_relative_eq!(hits[0].entry(), 0.0);
        assert_relative_eq!(hits[2].exit(), 12.0);
    }
}
