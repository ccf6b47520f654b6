/// Local-to-world transforms for authored layer geometry
use nalgebra::{Matrix4, Point3, Vector3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rotation around three axes, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EulerAngles {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EulerAngles {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Rotation matrix, applied in order Z, Y, X
    pub fn rotation_matrix(&self) -> Matrix4<f64> {
        let rx = Matrix4::new_rotation(Vector3::new(self.x.to_radians(), 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, self.y.to_radians(), 0.0));
        let rz = Matrix4::new_rotation(Vector3::new(0.0, 0.0, self.z.to_radians()));

        rz * ry * rx
    }
}

/// Affine local-to-world transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    matrix: Matrix4<f64>,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self::from_matrix(Matrix4::new_translation(&translation))
    }

    pub fn from_rotation(rotation: EulerAngles) -> Self {
        Self::from_matrix(rotation.rotation_matrix())
    }

    pub fn from_scale(scale: Vector3<f64>) -> Self {
        Self::from_matrix(Matrix4::new_nonuniform_scaling(&scale))
    }

    /// Horizontal shear: each unit of height moves a point by `offset_x`, `offset_z`
    pub fn from_shear(offset_x: f64, offset_z: f64) -> Self {
        let mut matrix = Matrix4::identity();
        matrix[(0, 1)] = offset_x;
        matrix[(2, 1)] = offset_z;
        Self::from_matrix(matrix)
    }

    /// Scale, then rotate, then translate
    pub fn from_trs(translation: Vector3<f64>, rotation: EulerAngles, scale: Vector3<f64>) -> Self {
        let t = Matrix4::new_translation(&translation);
        let s = Matrix4::new_nonuniform_scaling(&scale);
        Self::from_matrix(t * rotation.rotation_matrix() * s)
    }

    /// Apply `self` after `inner`
    pub fn then(&self, inner: &Transform) -> Self {
        Self::from_matrix(self.matrix * inner.matrix)
    }

    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.matrix.transform_point(point)
    }

    /// Transform a direction; translation is ignored
    pub fn transform_direction(&self, direction: &Vector3<f64>) -> Vector3<f64> {
        self.matrix.transform_vector(direction)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
