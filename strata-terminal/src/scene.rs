/// Scene files: the layer patches that make up one terrain
use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use strata_core::{
    box_vertices, EulerAngles, MaterialHandle, StrataConfig, StrataError, SubGeometry, Transform,
};
use thiserror::Error;

use crate::stl::{load_stl, StlError};

/// Errors raised while loading a scene or its configuration
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("patch '{patch}': {source}")]
    Stl {
        patch: String,
        #[source]
        source: StlError,
    },

    #[error(transparent)]
    Config(#[from] StrataError),
}

/// Where a patch's vertices come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchSource {
    /// Axis-aligned box centered on the local origin
    Box { size: [f64; 3] },
    /// STL file, relative paths resolve against the scene file
    Stl { path: PathBuf },
}

/// One authored layer patch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchSpec {
    pub name: String,
    #[serde(default)]
    pub material: Option<u64>,
    pub source: PatchSource,
    #[serde(default)]
    pub translation: [f64; 3],
    /// Degrees around X, Y, Z
    #[serde(default)]
    pub rotation: [f64; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f64; 3],
    /// Horizontal offset of the patch per unit of height (x, z)
    #[serde(default)]
    pub shear: [f64; 2],
}

fn unit_scale() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}

impl PatchSpec {
    pub fn boxed(name: impl Into<String>, size: [f64; 3], center_y: f64) -> Self {
        Self {
            name: name.into(),
            material: None,
            source: PatchSource::Box { size },
            translation: [0.0, center_y, 0.0],
            rotation: [0.0; 3],
            scale: unit_scale(),
            shear: [0.0; 2],
        }
    }

    /// Local-to-world transform: scale, shear, rotate, translate
    pub fn transform(&self) -> Transform {
        let [tx, ty, tz] = self.translation;
        let [rx, ry, rz] = self.rotation;
        let [sx, sy, sz] = self.scale;

        Transform::from_translation(Vector3::new(tx, ty, tz))
            .then(&Transform::from_rotation(EulerAngles::new(rx, ry, rz)))
            .then(&Transform::from_shear(self.shear[0], self.shear[1]))
            .then(&Transform::from_scale(Vector3::new(sx, sy, sz)))
    }

    fn to_sub_geometry(&self, base_dir: &Path) -> Result<SubGeometry, SceneError> {
        let vertices = match &self.source {
            PatchSource::Box { size } => box_vertices(Vector3::new(size[0], size[1], size[2])),
            PatchSource::Stl { path } => {
                load_stl(&base_dir.join(path)).map_err(|source| SceneError::Stl {
                    patch: self.name.clone(),
                    source,
                })?
            }
        };
        let material = self.material.map_or_else(MaterialHandle::default, MaterialHandle::new);

        Ok(SubGeometry::new(self.name.clone(), vertices)
            .with_transform(self.transform())
            .with_material(material))
    }
}

/// A terrain: the patches registered for stratigraphy building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub name: String,
    pub patches: Vec<PatchSpec>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Scene {
    pub fn new(name: impl Into<String>, patches: Vec<PatchSpec>) -> Self {
        Self {
            name: name.into(),
            patches,
            base_dir: PathBuf::new(),
        }
    }

    /// Three-layer demo stack: soil over a sandstone dipping 30° over bedrock
    pub fn demo() -> Self {
        let mut soil = PatchSpec::boxed("TopSoil", [60.0, 2.0, 40.0], -1.0);
        soil.material = Some(1);

        let mut sandstone = PatchSpec::boxed("Sandstone_Layer", [60.0, 4.0, 40.0], -4.0);
        sandstone.material = Some(2);
        sandstone.shear = [0.0, 30f64.to_radians().tan()];

        let mut bedrock = PatchSpec::boxed("Bedrock", [60.0, 10.0, 40.0], -11.0);
        bedrock.material = Some(3);

        Self::new("demo", vec![soil, sandstone, bedrock])
    }

    pub fn from_json(text: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let text = read_text(path)?;
        let mut scene = Self::from_json(&text)?;
        scene.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(scene)
    }

    /// Patches in registration order
    pub fn sub_geometries(&self) -> Result<Vec<SubGeometry>, SceneError> {
        self.patches
            .iter()
            .map(|patch| patch.to_sub_geometry(&self.base_dir))
            .collect()
    }
}

/// Parse and validate an engine configuration
pub fn parse_config(text: &str) -> Result<StrataConfig, SceneError> {
    let config: StrataConfig = serde_json::from_str(text)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<StrataConfig, SceneError> {
    parse_config(&read_text(path)?)
}

fn read_text(path: &Path) -> Result<String, SceneError> {
    std::fs::read_to_string(path).map_err(|source| SceneError::Io {
        path: path.to_path_buf(),
        source,
    })
}
