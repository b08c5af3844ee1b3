//! Objects
//!
//! Every shape answers two questions: where does a ray cross it, and what is the
//! surface normal at a point. Shapes and nested [`Geometries`] share the
//! [`Intersectable`] seam so a composite can hold either.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    materials::{Material, MaterialConfig},
    utils::SerdeVector,
    Color, Point, Ray, Vec3,
};

pub type IntersectableObj = Box<dyn Intersectable + Send + Sync>;

pub trait Intersectable {
    /// All crossings of `ray` no further than `max_distance` from its head.
    ///
    /// `None` means nothing was hit; a returned vector is never empty.
    fn find_geo_intersections(&self, ray: &Ray, max_distance: f64) -> Option<Vec<GeoPoint<'_>>>;

    /// Unbounded crossings, points only
    fn find_intersections(&self, ray: &Ray) -> Option<Vec<Point>> {
        self.find_geo_intersections(ray, f64::INFINITY)
            .map(|hits| hits.into_iter().map(|gp| gp.point).collect())
    }

    /// The crossing nearest to the ray head
    fn find_closest_intersection(&self, ray: &Ray) -> Option<GeoPoint<'_>> {
        self.find_geo_intersections(ray, f64::INFINITY)
            .and_then(|hits| ray.closest_geo_point(hits))
    }
}

/// A shape that can be shaded
pub trait Geometry: Intersectable + Send + Sync {
    /// Unit normal at `point`; defined for points off the surface as well
    fn normal(&self, point: &Point) -> Vec3;

    fn surface(&self) -> &Surface;

    fn emission(&self) -> Color {
        self.surface().emission
    }

    fn material(&self) -> &Material {
        &self.surface().material
    }
}

/// Emission color and material of one shape
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Surface {
    pub emission: Color,
    pub material: Material,
}
impl Surface {
    pub fn from_config(config: &SurfaceConfig) -> Result<Self> {
        Ok(Self {
            emission: config.emission.into(),
            material: Material::from_config(&config.material)?,
        })
    }
}

/// Surface Config, flattened into every shape's config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub emission: SerdeVector,
    pub material: MaterialConfig,
}

/// Fluent setters used while assembling a scene
pub trait Surfaced: Sized {
    fn surface_mut(&mut self) -> &mut Surface;

    fn with_emission(mut self, emission: Color) -> Self {
        self.surface_mut().emission = emission;
        self
    }

    fn with_material(mut self, material: Material) -> Self {
        self.surface_mut().material = material;
        self
    }

    fn with_surface(mut self, surface: Surface) -> Self {
        *self.surface_mut() = surface;
        self
    }
}

/// A point on a shape, along with the shape that produced it
#[derive(Clone, Copy)]
pub struct GeoPoint<'a> {
    pub geometry: &'a dyn Geometry,
    pub point: Point,
}
impl<'a> GeoPoint<'a> {
    pub fn new(geometry: &'a dyn Geometry, point: Point) -> Self {
        Self { geometry, point }
    }

    pub fn normal(&self) -> Vec3 {
        self.geometry.normal(&self.point)
    }
}
impl fmt::Debug for GeoPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoPoint")
            .field("point", &self.point)
            .field("emission", &self.geometry.emission())
            .finish()
    }
}

/// An ordered collection of shapes and nested collections
#[derive(Default)]
pub struct Geometries(pub Vec<IntersectableObj>);
impl Geometries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, obj: impl Intersectable + Send + Sync + 'static) {
        self.0.push(Box::new(obj))
    }

    pub fn add_boxed(&mut self, boxed_obj: IntersectableObj) {
        self.0.push(boxed_obj)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl Intersectable for Geometries {
    fn find_geo_intersections(&self, ray: &Ray, max_distance: f64) -> Option<Vec<GeoPoint<'_>>> {
        let mut found = Vec::new();
        for obj in &self.0 {
            if let Some(mut hits) = obj.find_geo_intersections(ray, max_distance) {
                found.append(&mut hits);
            }
        }
        if found.is_empty() {
            None
        } else {
            Some(found)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planar::{Plane, Triangle};
    use crate::radial::Sphere;

    fn sample() -> Geometries {
        let mut geometries = Geometries::new();
        geometries.add(
            Plane::from_points(
                Point::new(0.0, 0.0, 2.0),
                Point::new(1.0, 0.0, 2.0),
                Point::new(0.0, 1.0, 2.0),
            )
            .unwrap(),
        );
        geometries.add(Sphere::new(Point::new(1.0, 0.0, 0.0), 1.0).unwrap());
        geometries.add(
            Triangle::new(
                Point::new(0.0, -1.0, 2.0),
                Point::new(3.0, 3.0, 2.0),
                Point::new(-3.0, 3.0, 2.0),
            )
            .unwrap(),
        );
        geometries
    }

    fn count(obj: &dyn Intersectable, ray: &Ray) -> usize {
        obj.find_intersections(ray).map_or(0, |hits| hits.len())
    }

    #[test]
    fn test_empty_composite_finds_nothing() {
        let ray = Ray::new(Point::new(0.5, 0.0, 3.0), Vec3::new(0.0, 0.0, -6.0));
        assert!(Geometries::new().find_intersections(&ray).is_none());
    }

    #[test]
    fn test_no_child_hit() {
        let ray = Ray::new(Point::new(0.0, -2.0, 2.0), Vec3::new(0.0, 2.0, -0.5));
        assert!(sample().find_intersections(&ray).is_none());
    }

    #[test]
    fn test_one_child_hit() {
        let ray = Ray::new(Point::new(0.0, -4.0, 3.0), Vec3::new(0.0, 4.0, -1.5));
        assert_eq!(count(&sample(), &ray), 1);
    }

    #[test]
    fn test_all_children_hit_union_is_sum() {
        let geometries = sample();
        let ray = Ray::new(Point::new(0.5, 0.0, 3.0), Vec3::new(0.0, 0.0, -6.0));
        let per_child: usize = geometries.0.iter().map(|g| count(g.as_ref(), &ray)).sum();
        assert_eq!(per_child, 4);
        assert_eq!(count(&geometries, &ray), per_child);
    }

    #[test]
    fn test_nested_composites() {
        let mut outer = Geometries::new();
        outer.add(sample());
        outer.add(Sphere::new(Point::new(0.5, 0.0, -5.0), 1.0).unwrap());
        let ray = Ray::new(Point::new(0.5, 0.0, 3.0), Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(count(&outer, &ray), 6);
    }

    #[test]
    fn test_max_distance_bounds_hits() {
        let ray = Ray::new(Point::new(0.5, 0.0, 3.0), Vec3::new(0.0, 0.0, -1.0));
        // plane and triangle at distance 1, sphere further away
        let geometries = sample();
        let hits = geometries.find_geo_intersections(&ray, 1.5).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(geometries.find_geo_intersections(&ray, 0.5).is_none());
    }

    #[test]
    fn test_closest_intersection() {
        let geometries = sample();
        let ray = Ray::new(Point::new(0.5, 0.0, 3.0), Vec3::new(0.0, 0.0, -1.0));
        let closest = geometries.find_closest_intersection(&ray).unwrap();
        assert!((closest.point - Point::new(0.5, 0.0, 2.0)).norm() < 1e-9);
    }
}
