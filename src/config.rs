//! Render files
//!
//! A render file is YAML with three required sections: `scene`, `camera` and
//! `output`. Shapes and lights are tagged by `type`:
//!
//! ```yaml
//! scene:
//!   background: [0, 0, 0]
//!   ambient: { color: [255, 255, 255], k: 0.1 }
//!   geometries:
//!     - type: Sphere
//!       center: [0, 0, -3]
//!       radius: 1
//!       emission: [0, 0, 200]
//!       material: { kd: 0.5, ks: 0.5, shininess: 30 }
//!   lights:
//!     - type: Point
//!       intensity: [255, 255, 255]
//!       position: [5, 5, 0]
//! camera:
//!   location: [0, 0, 0]
//!   to: [0, 0, -1]
//!   up: [0, 1, 0]
//!   vp_width: 2
//!   vp_height: 2
//!   vp_distance: 1
//!   nx: 200
//!   ny: 200
//! output:
//!   name: sphere
//! ```
use std::{fs::File, io::BufReader, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    cameras::{Camera, CameraConfig},
    error::Result,
    lights::{self, AmbientLight, AmbientLightConfig, LightConfig},
    objects::{Geometries, IntersectableObj},
    output::ImageWriter,
    planar::{self, CuboidConfig, Plane, PlaneConfig, Polygon, PolygonConfig, Triangle, TriangleConfig},
    radial::{Cylinder, CylinderConfig, Sphere, SphereConfig, Tube, TubeConfig},
    scene::{Scene, SceneBuilder},
    tracer::RayTracer,
    utils::SerdeVector,
};

/// Config for shapes and nested groups of shapes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeometryConfig {
    Plane(PlaneConfig),
    Polygon(PolygonConfig),
    Triangle(TriangleConfig),
    Cuboid(CuboidConfig),
    Sphere(SphereConfig),
    Tube(TubeConfig),
    Cylinder(CylinderConfig),
    Group(GroupConfig),
}
impl GeometryConfig {
    pub fn build(&self) -> Result<IntersectableObj> {
        Ok(match self {
            Self::Plane(c) => Box::new(Plane::from_config(c)?),
            Self::Polygon(c) => Box::new(Polygon::from_config(c)?),
            Self::Triangle(c) => Box::new(Triangle::from_config(c)?),
            Self::Cuboid(c) => Box::new(planar::cuboid_from_config(c)?),
            Self::Sphere(c) => Box::new(Sphere::from_config(c)?),
            Self::Tube(c) => Box::new(Tube::from_config(c)?),
            Self::Cylinder(c) => Box::new(Cylinder::from_config(c)?),
            Self::Group(c) => Box::new(build_geometries(&c.geometries)?),
        })
    }
}

/// A nested composite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub geometries: Vec<GeometryConfig>,
}

fn build_geometries(configs: &[GeometryConfig]) -> Result<Geometries> {
    let mut geometries = Geometries::new();
    for config in configs {
        geometries.add_boxed(config.build()?);
    }
    Ok(geometries)
}

fn default_scene_name() -> String {
    "scene".to_string()
}

/// Scene Config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default = "default_scene_name")]
    pub name: String,
    #[serde(default)]
    pub background: SerdeVector,
    #[serde(default)]
    pub ambient: Option<AmbientLightConfig>,
    #[serde(default)]
    pub geometries: Vec<GeometryConfig>,
    #[serde(default)]
    pub lights: Vec<LightConfig>,
}
impl SceneConfig {
    pub fn build(&self) -> Result<Scene> {
        let ambient = match &self.ambient {
            Some(config) => AmbientLight::from_config(config)?,
            None => AmbientLight::NONE,
        };
        let mut builder = SceneBuilder::new(self.name.clone())
            .background(self.background.into())
            .ambient_light(ambient)
            .geometries(build_geometries(&self.geometries)?);
        for light in &self.lights {
            builder = builder.boxed_light(lights::from_config(light)?);
        }
        Ok(builder.build())
    }
}

/// Shader limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    pub max_level: u32,
    pub min_k: f64,
}
impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            max_level: RayTracer::MAX_LEVEL,
            min_k: RayTracer::MIN_K,
        }
    }
}

/// Output Config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub name: String,
}

/// Everything needed to render one image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub scene: SceneConfig,
    pub camera: CameraConfig,
    #[serde(default)]
    pub tracer: TracerConfig,
    pub output: OutputConfig,
}
impl RenderConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading render file {}", path.display());
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_yaml::from_reader(reader)?)
    }

    /// Camera with its image writer and ray tracer attached
    pub fn build_camera(&self) -> Result<Camera> {
        let scene = Arc::new(self.scene.build()?);
        let tracer = RayTracer::new(scene)
            .with_max_level(self.tracer.max_level)
            .with_min_k(self.tracer.min_k);
        let writer = ImageWriter::new(self.output.name.clone(), self.camera.nx, self.camera.ny);
        Ok(Camera::from_config(&self.camera)?
            .with_image_writer(writer)
            .with_ray_tracer(tracer))
    }
}
