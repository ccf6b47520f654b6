/// Core samples and their reconstruction from drill intersections
use std::f64::consts::PI;

use nalgebra::{Point3, Unit, Vector3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classifier::RockType;
use crate::drill::{DrillPath, Intersection};
use crate::error::StrataWarning;
use crate::params::DrillParams;

/// What a segment of core consists of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SegmentKind {
    Rock(RockType),
    Void,
}

/// A layer that contributed depth to a segment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentSource {
    pub layer_name: String,
    pub rock_type: RockType,
    pub order_index: Option<usize>,
    /// Depth contributed along the path.
    pub thickness: f64,
    pub dip_angle: f64,
    pub normal: Vector3<f64>,
}

impl SegmentSource {
    fn from_hit(hit: &Intersection<'_>, thickness: f64) -> Self {
        let layer = hit.layer();
        Self {
            layer_name: layer.name().to_string(),
            rock_type: layer.rock_type(),
            order_index: layer.order_index(),
            thickness,
            dip_angle: layer.dip_angle(),
            normal: layer.normal().into_inner(),
        }
    }
}

/// A contiguous depth range of a core sample
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    kind: SegmentKind,
    start_depth: f64,
    thickness: f64,
    sources: Vec<SegmentSource>,
}

impl Segment {
    fn rock(rock_type: RockType, start_depth: f64, thickness: f64, source: SegmentSource) -> Self {
        Self {
            kind: SegmentKind::Rock(rock_type),
            start_depth,
            thickness,
            sources: vec![source],
        }
    }

    fn void(start_depth: f64, thickness: f64) -> Self {
        Self {
            kind: SegmentKind::Void,
            start_depth,
            thickness,
            sources: Vec::new(),
        }
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn start_depth(&self) -> f64 {
        self.start_depth
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn end_depth(&self) -> f64 {
        self.start_depth + self.thickness
    }

    pub fn rock_type(&self) -> Option<RockType> {
        match self.kind {
            SegmentKind::Rock(rock_type) => Some(rock_type),
            SegmentKind::Void => None,
        }
    }

    pub fn is_void(&self) -> bool {
        self.kind == SegmentKind::Void
    }

    /// Layers merged into this segment, shallowest first.
    pub fn sources(&self) -> &[SegmentSource] {
        &self.sources
    }

    /// Thickness-weighted dip of the contributing layers.
    pub fn dip_angle(&self) -> f64 {
        let total: f64 = self.sources.iter().map(|s| s.thickness).sum();
        if total <= 0.0 {
            return self.sources.first().map_or(0.0, |s| s.dip_angle);
        }
        self.sources
            .iter()
            .map(|s| s.dip_angle * s.thickness)
            .sum::<f64>()
            / total
    }

    /// The source contributing the most depth.
    pub fn dominant_source(&self) -> Option<&SegmentSource> {
        self.sources
            .iter()
            .max_by(|a, b| a.thickness.total_cmp(&b.thickness))
    }

    fn contains_depth(&self, depth: f64) -> bool {
        depth >= self.start_depth && depth < self.end_depth()
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerStatistics {
    pub layer_name: String,
    pub rock_type: RockType,
    pub thickness: f64,
    /// Percent of the penetrated depth
    pub percentage: f64,
    pub segment_count: usize,
    pub average_dip: f64,
}

/// How two touching beds meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ContactType {
    Conformable,
    Disconformable,
    Unconformable,
}

impl ContactType {
    /// Classify by the angle between bedding planes, in degrees.
    pub fn from_angle(degrees: f64) -> Self {
        if degrees < 10.0 {
            ContactType::Conformable
        } else if degrees > 45.0 {
            ContactType::Unconformable
        } else {
            ContactType::Disconformable
        }
    }
}

/// Boundary between two directly touching rock segments.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Contact {
    pub depth: f64,
    pub upper: RockType,
    pub lower: RockType,
    /// Degrees between the two bedding planes
    pub angle: f64,
    pub contact_type: ContactType,
}

/// Ordered rock segments collected by one drill action.
///
/// Segments are sorted by start depth, touch end to end, and their
/// thicknesses sum to [`CoreSample::penetrated_depth`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoreSample {
    segments: Vec<Segment>,
    origin: Point3<f64>,
    direction: Unit<Vector3<f64>>,
    max_length: f64,
    start_depth: f64,
}

impl CoreSample {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
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

    pub fn start_depth(&self) -> f64 {
        self.start_depth
    }

    pub fn end_depth(&self) -> f64 {
        self.segments
            .last()
            .map_or(self.start_depth, Segment::end_depth)
    }

    /// Length of core recovered, voids included
    pub fn penetrated_depth(&self) -> f64 {
        self.end_depth() - self.start_depth
    }

    pub fn total_thickness(&self) -> f64 {
        self.segments.iter().map(Segment::thickness).sum()
    }

    /// Rock types in depth order, voids skipped
    pub fn rock_types(&self) -> Vec<RockType> {
        self.segments.iter().filter_map(Segment::rock_type).collect()
    }

    pub fn segment_at(&self, depth: f64) -> Option<&Segment> {
        self.segments.iter().find(|s| s.contains_depth(depth))
    }

    /// Per-layer totals in order of first appearance.
    pub fn layer_statistics(&self) -> Vec<LayerStatistics> {
        let depth = self.penetrated_depth();
        let mut stats: Vec<LayerStatistics> = Vec::new();
        let mut weighted_dip: Vec<f64> = Vec::new();

        for segment in &self.segments {
            let mut counted: Vec<&str> = Vec::new();
            for source in segment.sources() {
                let index = match stats.iter().position(|s| s.layer_name == source.layer_name) {
                    Some(index) => index,
                    None => {
                        stats.push(LayerStatistics {
                            layer_name: source.layer_name.clone(),
                            rock_type: source.rock_type,
                            thickness: 0.0,
                            percentage: 0.0,
                            segment_count: 0,
                            average_dip: 0.0,
                        });
                        weighted_dip.push(0.0);
                        stats.len() - 1
                    }
                };
                stats[index].thickness += source.thickness;
                weighted_dip[index] += source.dip_angle * source.thickness;
                if !counted.contains(&source.layer_name.as_str()) {
                    counted.push(&source.layer_name);
                    stats[index].segment_count += 1;
                }
            }
        }

        for (entry, dip) in stats.iter_mut().zip(weighted_dip) {
            if depth > 0.0 {
                entry.percentage = entry.thickness / depth * 100.0;
            }
            if entry.thickness > 0.0 {
                entry.average_dip = dip / entry.thickness;
            }
        }
        stats
    }

    pub fn contacts(&self) -> Vec<Contact> {
        self.segments
            .windows(2)
            .filter_map(|pair| {
                let (upper, lower) = (&pair[0], &pair[1]);
                let upper_source = upper.dominant_source()?;
                let lower_source = lower.dominant_source()?;
                let cos = upper_source.normal.dot(&lower_source.normal).abs().min(1.0);
                let angle = cos.acos().to_degrees();
                Some(Contact {
                    depth: lower.start_depth,
                    upper: upper.rock_type()?,
                    lower: lower.rock_type()?,
                    angle,
                    contact_type: ContactType::from_angle(angle),
                })
            })
            .collect()
    }

    /// Mass in kilograms of a cylindrical core of `radius` meters.
    pub fn estimated_mass(&self, radius: f64) -> f64 {
        let area = PI * radius * radius;
        self.segments
            .iter()
            .filter_map(|s| s.rock_type().map(|rock| area * s.thickness * rock.density() * 1000.0))
            .sum()
    }
}

#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub sample: CoreSample,
    pub warnings: Vec<StrataWarning>,
}

/// Turns sorted intersections into a gap-free [`CoreSample`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreSampleReconstructor {
    params: DrillParams,
}

impl CoreSampleReconstructor {
    pub fn new(params: DrillParams) -> Self {
        Self { params }
    }

    /// Reconcile `intersections` (sorted by entry) into contiguous segments.
    ///
    /// Same-type seams within the gap tolerance merge, small gaps and
    /// overlaps snap to the previous end, and larger gaps become voids.
    pub fn reconstruct(&self, intersections: &[Intersection<'_>], path: &DrillPath) -> Reconstruction {
        let tolerance = self.params.gap_tolerance;
        let (start_depth, _) = path.window();
        let mut cursor = start_depth;
        let mut segments: Vec<Segment> = Vec::with_capacity(intersections.len());
        let mut warnings = Vec::new();

        for hit in intersections {
            let (layer, entry, exit) = (hit.layer(), hit.entry(), hit.exit());
            if exit <= cursor {
                debug!(layer = %layer.name(), "Intersection already covered, dropped");
                continue;
            }

            let rock_type = layer.rock_type();
            let gap = entry - cursor;

            if let Some(last) = segments.last_mut() {
                if last.kind == SegmentKind::Rock(rock_type) && gap <= tolerance {
                    last.sources.push(SegmentSource::from_hit(hit, exit - cursor));
                    last.thickness = exit - last.start_depth;
                    cursor = exit;
                    continue;
                }
                if exit - cursor <= tolerance {
                    // Sliver thinner than the tolerance
                    let extra = exit - cursor;
                    last.thickness += extra;
                    if let Some(source) = last.sources.last_mut() {
                        source.thickness += extra;
                    }
                    cursor = exit;
                    continue;
                }
            }

            let start = if gap > tolerance {
                warn!(start = cursor, end = entry, "Gap in core sample, void inserted");
                warnings.push(StrataWarning::ReconstructionGap {
                    start: cursor,
                    end: entry,
                });
                segments.push(Segment::void(cursor, gap));
                entry
            } else {
                if gap < -tolerance {
                    warn!(layer = %layer.name(), depth = cursor, "Overlapping layer clipped");
                    warnings.push(StrataWarning::OverlapTrimmed {
                        layer: layer.name().to_string(),
                        depth: cursor,
                    });
                }
                cursor
            };

            let thickness = exit - start;
            segments.push(Segment::rock(
                rock_type,
                start,
                thickness,
                SegmentSource::from_hit(hit, thickness),
            ));
            cursor = exit;
        }

        Reconstruction {
            sample: CoreSample {
                segments,
                origin: path.origin(),
                direction: path.direction(),
                max_length: path.max_length(),
                start_depth,
            },
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Layer;
    use approx::assert_relative_eq;

    fn layer(name: &str, rock_type: RockType, dip: f64) -> Layer {
        Layer::builder(name)
            .rock_type(rock_type)
            .dip_angle(dip)
            .strike(Vector3::x())
            .thickness(1.0)
            .build()
    }

    fn hit(layer: &Layer, entry: f64, exit: f64) -> Intersection<'_> {
        Intersection::new(layer, entry, exit)
    }

    fn reconstruct(hits: &[Intersection<'_>]) -> Reconstruction {
        let path = DrillPath::vertical(Point3::origin(), 20.0).unwrap();
        CoreSampleReconstructor::default().reconstruct(hits, &path)
    }

    #[test]
    fn test_contiguous_layers() {
        let soil = layer("TopSoil", RockType::Soil, 0.0);
        let sand = layer("Sandstone", RockType::Sedimentary, 30.0);
        let rock = layer("Bedrock", RockType::Bedrock, 0.0);
        let result = reconstruct(&[hit(&soil, 0.0, 2.0), hit(&sand, 2.0, 6.0), hit(&rock, 6.0, 16.0)]);
        let sample = result.sample;

        assert!(result.warnings.is_empty());
        assert_eq!(
            sample.rock_types(),
            [RockType::Soil, RockType::Sedimentary, RockType::Bedrock]
        );
        assert_relative_eq!(sample.segments()[1].start_depth(), 2.0);
        assert_relative_eq!(sample.segments()[1].thickness(), 4.0);
        assert_relative_eq!(sample.total_thickness(), 16.0);
        assert_relative_eq!(sample.penetrated_depth(), 16.0);
    }

    #[test]
    fn test_same_type_seam_merges() {
        let a = layer("Clay_A", RockType::Sedimentary, 0.0);
        let b = layer("Clay_B", RockType::Sedimentary, 10.0);
        let result = reconstruct(&[hit(&a, 0.0, 2.0), hit(&b, 2.005, 5.0)]);
        let sample = result.sample;

        assert!(result.warnings.is_empty());
        assert_eq!(sample.len(), 1);
        let segment = &sample.segments()[0];
        assert_relative_eq!(segment.thickness(), 5.0);
        assert_eq!(segment.sources().len(), 2);
        assert_relative_eq!(segment.dip_angle(), 10.0 * 3.0 / 5.0, epsilon = 1e-9);
        assert_eq!(segment.dominant_source().unwrap().layer_name, "Clay_B");
    }

    #[test]
    fn test_gap_becomes_void() {
        let soil = layer("TopSoil", RockType::Soil, 0.0);
        let rock = layer("Bedrock", RockType::Bedrock, 0.0);
        let result = reconstruct(&[hit(&soil, 0.0, 2.0), hit(&rock, 3.0, 8.0)]);
        let sample = &result.sample;

        assert_eq!(sample.len(), 3);
        assert!(sample.segments()[1].is_void());
        assert_relative_eq!(sample.segments()[1].thickness(), 1.0);
        assert_relative_eq!(sample.total_thickness(), sample.penetrated_depth());
        assert_eq!(
            result.warnings,
            vec![StrataWarning::ReconstructionGap { start: 2.0, end: 3.0 }]
        );
        assert_relative_eq!(sample.estimated_mass(0.05), {
            let area = PI * 0.05 * 0.05;
            area * 2.0 * 1500.0 + area * 5.0 * 2900.0
        }, max_relative = 1e-12);
    }

    #[test]
    fn test_leading_gap_is_void() {
        let rock = layer("Bedrock", RockType::Bedrock, 0.0);
        let sample = reconstruct(&[hit(&rock, 4.0, 9.0)]).sample;

        assert_eq!(sample.len(), 2);
        assert!(sample.segments()[0].is_void());
        assert_relative_eq!(sample.segments()[0].start_depth(), 0.0);
        assert_relative_eq!(sample.penetrated_depth(), 9.0);
        assert!(sample.segment_at(2.0).unwrap().is_void());
        assert_eq!(sample.segment_at(5.0).unwrap().rock_type(), Some(RockType::Bedrock));
        assert!(sample.segment_at(9.5).is_none());
    }

    #[test]
    fn test_small_gap_and_overlap_snap() {
        let soil = layer("TopSoil", RockType::Soil, 0.0);
        let sand = layer("Sandstone", RockType::Sedimentary, 0.0);
        let rock = layer("Bedrock", RockType::Bedrock, 0.0);
        let result = reconstruct(&[hit(&soil, 0.0, 2.0), hit(&sand, 2.004, 5.0), hit(&rock, 4.0, 9.0)]);
        let segments = result.sample.segments();

        assert_eq!(segments.len(), 3);
        assert_relative_eq!(segments[1].start_depth(), 2.0);
        assert_relative_eq!(segments[1].thickness(), 3.0);
        assert_relative_eq!(segments[2].start_depth(), 5.0);
        assert_relative_eq!(segments[2].thickness(), 4.0);
        assert_eq!(
            result.warnings,
            vec![StrataWarning::OverlapTrimmed {
                layer: "Bedrock".to_string(),
                depth: 5.0
            }]
        );
    }

    #[test]
    fn test_covered_intersection_dropped() {
        let rock = layer("Bedrock", RockType::Bedrock, 0.0);
        let lens = layer("Lens", RockType::Igneous, 0.0);
        let sample = reconstruct(&[hit(&rock, 0.0, 10.0), hit(&lens, 3.0, 4.0)]).sample;

        assert_eq!(sample.len(), 1);
        assert_relative_eq!(sample.total_thickness(), 10.0);
    }

    #[test]
    fn test_contacts_by_bedding_angle() {
        let soil = layer("TopSoil", RockType::Soil, 0.0);
        let clay = layer("Clay", RockType::Alluvium, 5.0);
        let sand = layer("Sandstone", RockType::Sedimentary, 30.0);
        let schist = layer("Schist", RockType::Metamorphic, 80.0);
        let sample = reconstruct(&[
            hit(&soil, 0.0, 1.0),
            hit(&clay, 1.0, 2.0),
            hit(&sand, 2.0, 3.0),
            hit(&schist, 3.0, 4.0),
        ])
        .sample;

        let kinds: Vec<_> = sample.contacts().iter().map(|c| c.contact_type).collect();
        assert_eq!(
            kinds,
            [
                ContactType::Conformable,
                ContactType::Disconformable,
                ContactType::Unconformable
            ]
        );
        assert_relative_eq!(sample.contacts()[1].angle, 25.0, epsilon = 1e-9);
    }

    #[test]
    fn test_no_contact_across_void() {
        let soil = layer("TopSoil", RockType::Soil, 0.0);
        let rock = layer("Bedrock", RockType::Bedrock, 0.0);
        let sample = reconstruct(&[hit(&soil, 0.0, 1.0), hit(&rock, 3.0, 4.0)]).sample;
        assert!(sample.contacts().is_empty());
    }

    #[test]
    fn test_layer_statistics() {
        let a = layer("Clay_A", RockType::Sedimentary, 0.0);
        let soil = layer("TopSoil", RockType::Soil, 0.0);
        let sample = reconstruct(&[hit(&soil, 0.0, 2.0), hit(&a, 2.0, 6.0), hit(&a, 6.0, 8.0)]).sample;
        let stats = sample.layer_statistics();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].layer_name, "TopSoil");
        assert_relative_eq!(stats[0].percentage, 25.0);
        assert_eq!(stats[1].segment_count, 1);
        assert_relative_eq!(stats[1].thickness, 6.0);
        assert_relative_eq!(stats[1].percentage, 75.0);
    }
}
