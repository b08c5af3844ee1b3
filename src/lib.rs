//! Recursive Ray Tracing Library
//!
//! Casts rays from a camera through every pixel, finds the closest surface each ray
//! hits, and shades it with Phong lighting, shadows, reflection and refraction.
//! Pixels can be scheduled on the calling thread, on a fixed worker pool, or with
//! rayon work stealing.

use nalgebra::Vector3;

pub mod cameras;
pub mod config;
pub mod error;
pub mod lights;
pub mod materials;
pub mod objects;
pub mod output;
pub mod planar;
pub mod radial;
pub mod scene;
pub mod scheduler;
pub mod tracer;
pub mod utils;

use error::Result;
use objects::GeoPoint;
use utils::align_zero;

pub type Vec3 = Vector3<f64>;
pub type Point = Vec3;
pub type Color = Vec3;

/// Prelude
pub mod prelude {
    pub use crate::cameras::{AntiAliasing, Camera};
    pub use crate::error::{Result, TraceError};
    pub use crate::lights::{AmbientLight, DirectionalLight, Light, PointLight, SpotLight};
    pub use crate::materials::Material;
    pub use crate::objects::{GeoPoint, Geometries, Geometry, Intersectable, Surface};
    pub use crate::output::ImageWriter;
    pub use crate::planar::{cuboid, Plane, Polygon, Triangle};
    pub use crate::radial::{Cylinder, Sphere, Tube};
    pub use crate::scene::{Scene, SceneBuilder};
    pub use crate::scheduler::Threads;
    pub use crate::tracer::{RayTracer, TraceRay};
    pub use crate::{Color, Point, Ray, Vec3};
}

/// How far secondary rays are pushed off the surface they start on
pub const DELTA: f64 = 0.1;

/// The ray in ray tracing
///
/// The direction is always unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub orig: Point,
    pub dir: Vec3,
}
impl Ray {
    /// `dir` must be non-zero; it is normalized here
    pub fn new(orig: Point, dir: Vec3) -> Self {
        Self {
            orig,
            dir: dir.normalize(),
        }
    }

    /// Build a ray from user data, rejecting a zero direction
    pub fn try_new(orig: Point, dir: Vec3) -> Result<Self> {
        Ok(Self {
            orig,
            dir: utils::try_unit(dir)?,
        })
    }

    /// Ray leaving a surface point, with its head moved [`DELTA`] along the normal
    /// towards the side `dir` points to. Avoids the surface shadowing itself.
    pub fn offset(head: Point, dir: Vec3, normal: &Vec3) -> Self {
        let nv = align_zero(normal.dot(&dir));
        let orig = if nv > 0.0 {
            head + DELTA * normal
        } else if nv < 0.0 {
            head - DELTA * normal
        } else {
            head
        };
        Self::new(orig, dir)
    }

    pub fn get(&self, t: f64) -> Point {
        self.orig + t * self.dir
    }

    /// Point nearest to the ray head. Ties keep the first one found.
    pub fn closest_point(&self, points: &[Point]) -> Option<Point> {
        let mut closest: Option<(f64, Point)> = None;
        for p in points {
            let d = (p - self.orig).norm_squared();
            if closest.map_or(true, |(best, _)| d < best) {
                closest = Some((d, *p));
            }
        }
        closest.map(|(_, p)| p)
    }

    /// Intersection nearest to the ray head. Ties keep the first one found.
    pub fn closest_geo_point<'a>(&self, points: Vec<GeoPoint<'a>>) -> Option<GeoPoint<'a>> {
        let mut closest: Option<(f64, GeoPoint<'a>)> = None;
        for gp in points {
            let d = (gp.point - self.orig).norm_squared();
            if closest.as_ref().map_or(true, |(best, _)| d < *best) {
                closest = Some((d, gp));
            }
        }
        closest.map(|(_, gp)| gp)
    }
}
