/// Authored layer geometry and bounding volumes
use nalgebra::{Point3, Vector3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::transform::Transform;

/// Opaque reference to an authored material
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaterialHandle {
    pub id: u64,
    pub name: Option<String>,
}

impl MaterialHandle {
    pub fn new(id: u64) -> Self {
        Self { id, name: None }
    }

    pub fn named(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
        }
    }
}

/// Position of a sub-geometry in the list handed to the builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeometryId(pub usize);

/// A named piece of authored layer geometry
///
/// Vertices are in the local frame; `transform` maps them to world space.
/// World +Y is up.
#[derive(Debug, Clone)]
pub struct SubGeometry {
    pub name: String,
    pub vertices: Vec<Point3<f64>>,
    pub transform: Transform,
    pub material: MaterialHandle,
}

impl SubGeometry {
    pub fn new(name: impl Into<String>, vertices: Vec<Point3<f64>>) -> Self {
        Self {
            name: name.into(),
            vertices,
            transform: Transform::identity(),
            material: MaterialHandle::default(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_material(mut self, material: MaterialHandle) -> Self {
        self.material = material;
        self
    }

    /// Vertex positions in world space
    pub fn world_vertices(&self) -> Vec<Point3<f64>> {
        self.vertices
            .iter()
            .map(|v| self.transform.transform_point(v))
            .collect()
    }

    /// Bounding box of the vertices in the local frame
    pub fn local_bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter())
    }

    pub fn is_finite(&self) -> bool {
        self.vertices
            .iter()
            .all(|v| v.x.is_finite() && v.y.is_finite() && v.z.is_finite())
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Smallest box containing all points; `None` when there are none
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self::new(first, first);
        for p in iter {
            bounds.min = bounds.min.inf(p);
            bounds.max = bounds.max.sup(p);
        }
        Some(bounds)
    }

    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Horizontal (XZ) projection of the box
    pub fn footprint(&self) -> Footprint {
        Footprint {
            min_x: self.min.x,
            max_x: self.max.x,
            min_z: self.min.z,
            max_z: self.max.z,
        }
    }
}

/// Horizontal extent of a layer patch in world XZ
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Footprint {
    pub min_x: f64,
    pub max_x: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl Footprint {
    /// Square footprint of side `size` centered on (x, z)
    pub fn centered(x: f64, z: f64, size: f64) -> Self {
        let half = size / 2.0;
        Self {
            min_x: x - half,
            max_x: x + half,
            min_z: z - half,
            max_z: z + half,
        }
    }

    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            max_x: self.max_x + margin,
            min_z: self.min_z - margin,
            max_z: self.max_z + margin,
        }
    }

    pub fn contains(&self, x: f64, z: f64) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }
}

/// Corner vertices of an axis-aligned box patch centered on the local origin
pub fn box_vertices(size: Vector3<f64>) -> Vec<Point3<f64>> {
    let h = size / 2.0;
    let mut vertices = Vec::with_capacity(8);

    // Top face first, then bottom
    for y in [h.y, -h.y] {
        vertices.push(Point3::new(-h.x, y, -h.z));
        vertices.push(Point3::new(h.x, y, -h.z));
        vertices.push(Point3::new(h.x, y, h.z));
        vertices.push(Point3::new(-h.x, y, h.z));
    }

    vertices
}
