//! Round shapes: spheres, infinite tubes and capped cylinders

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TraceError},
    objects::{GeoPoint, Geometry, Intersectable, Surface, SurfaceConfig, Surfaced},
    utils::{align_zero, SerdeVector, ACCURACY},
    Point, Ray, Vec3,
};

fn check_radius(radius: f64) -> Result<f64> {
    if radius > 0.0 && radius.is_finite() {
        Ok(radius)
    } else {
        Err(TraceError::InvalidGeometry(format!(
            "radius must be positive, got {radius}"
        )))
    }
}

/// Keep the ray parameters ahead of the head and within `max_distance`, nearest first
fn admit(ray: &Ray, mut ts: Vec<f64>, max_distance: f64) -> Option<Vec<Point>> {
    ts.retain(|t| *t > 0.0 && align_zero(t - max_distance) <= 0.0);
    ts.sort_by(|a, b| a.total_cmp(b));
    if ts.is_empty() {
        None
    } else {
        Some(ts.into_iter().map(|t| ray.get(t)).collect())
    }
}

#[derive(Debug, Clone)]
pub struct Sphere {
    center: Point,
    radius: f64,
    surface: Surface,
}
impl Sphere {
    pub fn new(center: Point, radius: f64) -> Result<Self> {
        Ok(Self {
            center,
            radius: check_radius(radius)?,
            surface: Surface::default(),
        })
    }

    pub fn from_config(config: &SphereConfig) -> Result<Self> {
        Ok(Self::new(config.center.into(), config.radius)?
            .with_surface(Surface::from_config(&config.surface)?))
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn crossings(&self, ray: &Ray, max_distance: f64) -> Option<Vec<Point>> {
        let u = self.center - ray.orig;
        if u.norm() < ACCURACY {
            return admit(ray, vec![self.radius], max_distance);
        }
        let tm = u.dot(&ray.dir);
        let d = (u.norm_squared() - tm * tm).max(0.0).sqrt();
        if align_zero(d - self.radius) >= 0.0 {
            return None;
        }
        let th = (self.radius * self.radius - d * d).sqrt();
        let t1 = align_zero(tm - th);
        let t2 = align_zero(tm + th);
        admit(ray, vec![t1, t2], max_distance)
    }
}
impl Intersectable for Sphere {
    fn find_geo_intersections(&self, ray: &Ray, max_distance: f64) -> Option<Vec<GeoPoint<'_>>> {
        self.crossings(ray, max_distance)
            .map(|points| points.into_iter().map(|p| GeoPoint::new(self, p)).collect())
    }
}
impl Geometry for Sphere {
    fn normal(&self, point: &Point) -> Vec3 {
        (point - self.center)
            .try_normalize(ACCURACY)
            .unwrap_or_else(Vec3::z)
    }

    fn surface(&self) -> &Surface {
        &self.surface
    }
}
impl Surfaced for Sphere {
    fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }
}

/// Infinite cylinder around an axis ray
#[derive(Debug, Clone)]
pub struct Tube {
    axis: Ray,
    radius: f64,
    surface: Surface,
}
impl Tube {
    pub fn new(radius: f64, axis: Ray) -> Result<Self> {
        Ok(Self {
            axis,
            radius: check_radius(radius)?,
            surface: Surface::default(),
        })
    }

    pub fn from_config(config: &TubeConfig) -> Result<Self> {
        Ok(Self::new(config.radius, config.axis.to_ray()?)?
            .with_surface(Surface::from_config(&config.surface)?))
    }

    pub fn axis(&self) -> &Ray {
        &self.axis
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Signed distance of the projection of `point` along the axis
    fn projection(&self, point: &Point) -> f64 {
        align_zero(self.axis.dir.dot(&(point - self.axis.orig)))
    }

    fn radial_normal(&self, point: &Point) -> Vec3 {
        let o = self.axis.get(self.projection(point));
        (point - o)
            .try_normalize(ACCURACY)
            .unwrap_or(self.axis.dir)
    }

    /// Ray parameters of the crossings with the tube wall, unfiltered.
    ///
    /// Solves |(p + tv - pa) - ((p + tv - pa)·va)va|² = r²; rays parallel to the axis
    /// and tangent rays give nothing.
    fn wall_params(&self, ray: &Ray) -> Vec<f64> {
        let va = self.axis.dir;
        let dp = ray.orig - self.axis.orig;
        let a_vec = ray.dir - ray.dir.dot(&va) * va;
        let b_vec = dp - dp.dot(&va) * va;
        let a = align_zero(a_vec.norm_squared());
        if a == 0.0 {
            return Vec::new();
        }
        let b = 2.0 * a_vec.dot(&b_vec);
        let c = b_vec.norm_squared() - self.radius * self.radius;
        let disc = align_zero(b * b - 4.0 * a * c);
        if disc <= 0.0 {
            return Vec::new();
        }
        let sq = disc.sqrt();
        vec![
            align_zero((-b - sq) / (2.0 * a)),
            align_zero((-b + sq) / (2.0 * a)),
        ]
    }
}
impl Intersectable for Tube {
    fn find_geo_intersections(&self, ray: &Ray, max_distance: f64) -> Option<Vec<GeoPoint<'_>>> {
        admit(ray, self.wall_params(ray), max_distance)
            .map(|points| points.into_iter().map(|p| GeoPoint::new(self, p)).collect())
    }
}
impl Geometry for Tube {
    fn normal(&self, point: &Point) -> Vec3 {
        self.radial_normal(point)
    }

    fn surface(&self) -> &Surface {
        &self.surface
    }
}
impl Surfaced for Tube {
    fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }
}

/// Tube cut to `height` along its axis and closed by two flat caps
#[derive(Debug, Clone)]
pub struct Cylinder {
    tube: Tube,
    height: f64,
}
impl Cylinder {
    pub fn new(radius: f64, axis: Ray, height: f64) -> Result<Self> {
        if !(height > 0.0 && height.is_finite()) {
            return Err(TraceError::InvalidGeometry(format!(
                "cylinder height must be positive, got {height}"
            )));
        }
        Ok(Self {
            tube: Tube::new(radius, axis)?,
            height,
        })
    }

    pub fn from_config(config: &CylinderConfig) -> Result<Self> {
        Ok(Self::new(config.radius, config.axis.to_ray()?, config.height)?
            .with_surface(Surface::from_config(&config.surface)?))
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn tube(&self) -> &Tube {
        &self.tube
    }

    /// Ray parameter where the ray crosses the cap disc centred at `center`
    fn cap_param(&self, ray: &Ray, center: &Point) -> Option<f64> {
        let va = self.tube.axis.dir;
        let nv = align_zero(va.dot(&ray.dir));
        if nv == 0.0 {
            return None;
        }
        let t = align_zero(va.dot(&(center - ray.orig)) / nv);
        let q = ray.get(t);
        let r = self.tube.radius;
        (align_zero((q - center).norm_squared() - r * r) < 0.0).then_some(t)
    }
}
impl Intersectable for Cylinder {
    fn find_geo_intersections(&self, ray: &Ray, max_distance: f64) -> Option<Vec<GeoPoint<'_>>> {
        let mut ts: Vec<f64> = self
            .tube
            .wall_params(ray)
            .into_iter()
            .filter(|t| {
                let proj = self.tube.projection(&ray.get(*t));
                proj > 0.0 && align_zero(proj - self.height) < 0.0
            })
            .collect();
        let base = self.tube.axis.orig;
        let top = self.tube.axis.get(self.height);
        ts.extend(self.cap_param(ray, &base));
        ts.extend(self.cap_param(ray, &top));
        admit(ray, ts, max_distance)
            .map(|points| points.into_iter().map(|p| GeoPoint::new(self, p)).collect())
    }
}
impl Geometry for Cylinder {
    fn normal(&self, point: &Point) -> Vec3 {
        let proj = self.tube.projection(point);
        if proj <= 0.0 || align_zero(proj - self.height) >= 0.0 {
            self.tube.axis.dir
        } else {
            self.tube.radial_normal(point)
        }
    }

    fn surface(&self) -> &Surface {
        &self.tube.surface
    }
}
impl Surfaced for Cylinder {
    fn surface_mut(&mut self) -> &mut Surface {
        &mut self.tube.surface
    }
}

/// Sphere Config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SphereConfig {
    pub center: SerdeVector,
    pub radius: f64,
    #[serde(flatten)]
    pub surface: SurfaceConfig,
}

/// Axis ray of a tube or cylinder
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AxisConfig {
    pub origin: SerdeVector,
    pub direction: SerdeVector,
}
impl AxisConfig {
    fn to_ray(self) -> Result<Ray> {
        Ray::try_new(self.origin.into(), self.direction.into())
    }
}

/// Tube Config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TubeConfig {
    pub radius: f64,
    pub axis: AxisConfig,
    #[serde(flatten)]
    pub surface: SurfaceConfig,
}

/// Cylinder Config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CylinderConfig {
    pub radius: f64,
    pub axis: AxisConfig,
    pub height: f64,
    #[serde(flatten)]
    pub surface: SurfaceConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point, b: Point) {
        assert!((a - b).norm() < 1e-9, "{a:?} != {b:?}");
    }

    fn unit_sphere() -> Sphere {
        Sphere::new(Point::new(1.0, 0.0, 0.0), 1.0).unwrap()
    }

    #[test]
    fn test_sphere_normal() {
        let n = unit_sphere().normal(&Point::new(0.0, 0.0, 1.0));
        assert!((n.norm() - 1.0).abs() < 1e-8);
        assert_close(n, Vec3::new(-1.0, 0.0, 1.0).normalize());
    }

    #[test]
    fn test_sphere_rejects_bad_radius() {
        assert!(Sphere::new(Point::zeros(), 0.0).is_err());
        assert!(Sphere::new(Point::zeros(), -2.0).is_err());
    }

    #[test]
    fn test_sphere_misses() {
        let sphere = unit_sphere();
        let away = Ray::new(Point::new(-1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        assert!(sphere.find_intersections(&away).is_none());
        let beside = Ray::new(Point::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0));
        assert!(sphere.find_intersections(&beside).is_none());
        let tangent = Ray::new(Point::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(sphere.find_intersections(&tangent).is_none());
    }

    #[test]
    fn test_sphere_two_crossings() {
        let ray = Ray::new(Point::new(-1.0, 0.0, 0.0), Vec3::new(3.0, 1.0, 0.0));
        let found = unit_sphere().find_intersections(&ray).unwrap();
        assert_eq!(found.len(), 2);
        assert_close(found[0], Point::new(0.0651530771650466, 0.355051025721682, 0.0));
        assert_close(found[1], Point::new(1.53484692283495, 0.844948974278318, 0.0));
    }

    #[test]
    fn test_sphere_through_center_distances() {
        let (d, r) = (5.0, 1.5);
        let sphere = Sphere::new(Point::zeros(), r).unwrap();
        let ray = Ray::new(Point::new(0.0, -d, 0.0), Vec3::new(0.0, 1.0, 0.0));
        let found = sphere.find_intersections(&ray).unwrap();
        assert_eq!(found.len(), 2);
        assert!(((found[0] - ray.orig).norm() - (d - r)).abs() < 1e-9);
        assert!(((found[1] - ray.orig).norm() - (d + r)).abs() < 1e-9);
    }

    #[test]
    fn test_sphere_from_inside() {
        let sphere = unit_sphere();
        let from_center = Ray::new(Point::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        let found = sphere.find_intersections(&from_center).unwrap();
        assert_eq!(found.len(), 1);
        assert_close(found[0], Point::new(1.0, 0.0, 1.0));

        let off_center = Ray::new(Point::new(1.5, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        let found = sphere.find_intersections(&off_center).unwrap();
        assert_eq!(found, vec![Point::new(2.0, 0.0, 0.0)]);
    }

    #[test]
    fn test_sphere_starting_on_surface() {
        let sphere = unit_sphere();
        let outwards = Ray::new(Point::new(2.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(sphere.find_intersections(&outwards).is_none());
        let inwards = Ray::new(Point::new(2.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        let found = sphere.find_intersections(&inwards).unwrap();
        assert_eq!(found.len(), 1);
        assert_close(found[0], Point::zeros());
    }

    #[test]
    fn test_sphere_max_distance() {
        let ray = Ray::new(Point::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        let sphere = unit_sphere();
        let near = sphere.find_geo_intersections(&ray, 2.0).unwrap();
        assert_eq!(near.len(), 1);
        assert_close(near[0].point, Point::zeros());
        assert!(sphere.find_geo_intersections(&ray, 0.5).is_none());
    }

    fn z_axis() -> Ray {
        Ray::new(Point::zeros(), Vec3::new(0.0, 0.0, 1.0))
    }

    #[test]
    fn test_sphere_from_config() {
        let config: SphereConfig =
            serde_yaml::from_str("center: [0, 0, -3]\nradius: 1.5\nemission: [0, 0, 255]\n").unwrap();
        let sphere = Sphere::from_config(&config).unwrap();
        assert_eq!(sphere.center(), Point::new(0.0, 0.0, -3.0));
        assert_eq!(sphere.radius(), 1.5);
        assert_eq!(sphere.emission(), Point::new(0.0, 0.0, 255.0));
    }

    #[test]
    fn test_tube_normal() {
        let tube = Tube::new(1.0, z_axis()).unwrap();
        let n = tube.normal(&Point::new(1.0, 0.0, 5.0));
        assert_close(n, Vec3::new(1.0, 0.0, 0.0));
        // orthogonal to the axis even at the axis head
        let n = tube.normal(&Point::new(0.0, 1.0, 0.0));
        assert_close(n, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_tube_intersections() {
        let tube = Tube::new(1.0, z_axis()).unwrap();
        let across = Ray::new(Point::new(-2.0, 0.0, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let found = tube.find_intersections(&across).unwrap();
        assert_eq!(found.len(), 2);
        assert_close(found[0], Point::new(-1.0, 0.0, 0.5));
        assert_close(found[1], Point::new(1.0, 0.0, 0.5));

        let inside = Ray::new(Point::zeros(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(tube.find_intersections(&inside).unwrap().len(), 1);

        let parallel = Ray::new(Point::new(0.5, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(tube.find_intersections(&parallel).is_none());
        let tangent = Ray::new(Point::new(1.0, -2.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        assert!(tube.find_intersections(&tangent).is_none());
        let away = Ray::new(Point::new(-2.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        assert!(tube.find_intersections(&away).is_none());
    }

    fn cylinder() -> Cylinder {
        Cylinder::new(1.0, z_axis(), 2.0).unwrap()
    }

    #[test]
    fn test_cylinder_normals() {
        let cyl = cylinder();
        assert_close(cyl.normal(&Point::new(1.0, 0.0, 1.0)), Vec3::new(1.0, 0.0, 0.0));
        assert_close(cyl.normal(&Point::new(0.5, 0.0, 0.0)), Vec3::new(0.0, 0.0, 1.0));
        assert_close(cyl.normal(&Point::new(0.5, 0.0, 2.0)), Vec3::new(0.0, 0.0, 1.0));
        assert_close(cyl.normal(&Point::zeros()), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_cylinder_from_config_checks_axis() {
        let config: CylinderConfig = serde_yaml::from_str(
            "radius: 1\nheight: 2\naxis:\n  origin: [0, 0, 0]\n  direction: [0, 0, 0]\n",
        )
        .unwrap();
        assert!(matches!(
            Cylinder::from_config(&config),
            Err(TraceError::DegenerateVector)
        ));
    }

    #[test]
    fn test_cylinder_rejects_bad_height() {
        assert!(Cylinder::new(1.0, z_axis(), 0.0).is_err());
        assert!(Cylinder::new(0.0, z_axis(), 1.0).is_err());
    }

    #[test]
    fn test_cylinder_side_and_caps() {
        let cyl = cylinder();
        let side = Ray::new(Point::new(-2.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(cyl.find_intersections(&side).unwrap().len(), 2);

        let through_caps = Ray::new(Point::new(0.5, 0.0, -1.0), Vec3::new(0.0, 0.0, 1.0));
        let found = cyl.find_intersections(&through_caps).unwrap();
        assert_eq!(found.len(), 2);
        assert_close(found[0], Point::new(0.5, 0.0, 0.0));
        assert_close(found[1], Point::new(0.5, 0.0, 2.0));

        let side_then_top = Ray::new(Point::new(-2.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 1.0));
        let found = cyl.find_intersections(&side_then_top).unwrap();
        assert_eq!(found.len(), 2);
        assert_close(found[0], Point::new(-1.0, 0.0, 1.0));
        assert_close(found[1], Point::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn test_cylinder_misses_beyond_height() {
        let cyl = cylinder();
        let above = Ray::new(Point::new(-2.0, 0.0, 3.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(cyl.find_intersections(&above).is_none());
        let outside_caps = Ray::new(Point::new(3.0, 0.0, -1.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(cyl.find_intersections(&outside_caps).is_none());
    }
}
