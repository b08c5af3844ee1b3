//! Recursive shading of rays against a scene

use std::sync::Arc;

use crate::{
    lights::LightSource,
    objects::{GeoPoint, Intersectable},
    scene::Scene,
    utils::{align_zero, lower_than, reflect},
    Color, Ray, Vec3,
};

/// Turns a ray into the color seen along it
pub trait TraceRay: Send + Sync {
    fn trace_ray(&self, ray: &Ray) -> Color;
}

/// Phong shading with shadows, reflection and transparency
///
/// Secondary rays recurse until either `max_level` bounces have been followed or the
/// accumulated attenuation of a branch drops below `min_k` in every channel.
#[derive(Clone)]
pub struct RayTracer {
    scene: Arc<Scene>,
    max_level: u32,
    min_k: f64,
}
impl RayTracer {
    pub const MAX_LEVEL: u32 = 10;
    pub const MIN_K: f64 = 0.001;

    pub fn new(scene: Arc<Scene>) -> Self {
        Self {
            scene,
            max_level: Self::MAX_LEVEL,
            min_k: Self::MIN_K,
        }
    }

    /// Recursion depth; a level of 1 shades local effects only
    pub fn with_max_level(mut self, max_level: u32) -> Self {
        if max_level == 0 {
            log::warn!("max_level 0 would trace nothing, using 1");
        }
        self.max_level = max_level.max(1);
        self
    }

    pub fn with_min_k(mut self, min_k: f64) -> Self {
        self.min_k = min_k.max(0.0);
        self
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    fn closest<'a>(&'a self, ray: &Ray) -> Option<GeoPoint<'a>> {
        self.scene.geometries.find_closest_intersection(ray)
    }

    fn calc_color(&self, gp: &GeoPoint<'_>, ray: &Ray, level: u32, k: &Vec3) -> Color {
        let color = self.local_effects(gp, ray, k);
        if level <= 1 {
            color
        } else {
            color + self.global_effects(gp, ray, level, k)
        }
    }

    fn local_effects(&self, gp: &GeoPoint<'_>, ray: &Ray, k: &Vec3) -> Color {
        let mut color = gp.geometry.emission();
        let n = gp.normal();
        let v = ray.dir;
        let nv = align_zero(n.dot(&v));
        if nv == 0.0 {
            return color;
        }
        let material = gp.geometry.material();

        for light in &self.scene.lights {
            let Some(l) = light.direction_at(&gp.point) else {
                continue;
            };
            let nl = align_zero(n.dot(&l));
            if nl * nv <= 0.0 {
                continue;
            }
            let ktr = self.transparency(gp, light.as_ref(), &l, &n);
            if lower_than(&ktr.component_mul(k), self.min_k) {
                continue;
            }
            let diffuse = material.kd * nl.abs();
            let r = l - 2.0 * nl * n;
            let vr = (-v.dot(&r)).max(0.0);
            let exponent = i32::try_from(material.shininess).unwrap_or(i32::MAX);
            let specular = material.ks * vr.powi(exponent);
            let intensity = light.intensity_at(&gp.point).component_mul(&ktr);
            color += intensity.component_mul(&(diffuse + specular));
        }
        color
    }

    /// Fraction of the light reaching `gp` through everything strictly between them
    fn transparency(&self, gp: &GeoPoint<'_>, light: &dyn LightSource, l: &Vec3, n: &Vec3) -> Vec3 {
        let shadow_ray = Ray::offset(gp.point, -l, n);
        let distance = light.distance(&shadow_ray.orig);
        let mut ktr = Vec3::repeat(1.0);
        let Some(hits) = self.scene.geometries.find_geo_intersections(&shadow_ray, distance) else {
            return ktr;
        };
        let before_light = hits
            .into_iter()
            .filter(|hit| align_zero((hit.point - shadow_ray.orig).norm() - distance) < 0.0);
        for hit in before_light {
            ktr.component_mul_assign(&hit.geometry.material().kt);
            if lower_than(&ktr, self.min_k) {
                return Vec3::zeros();
            }
        }
        ktr
    }

    fn global_effects(&self, gp: &GeoPoint<'_>, ray: &Ray, level: u32, k: &Vec3) -> Color {
        let n = gp.normal();
        let v = ray.dir;
        if align_zero(n.dot(&v)) == 0.0 {
            return Color::zeros();
        }
        let material = gp.geometry.material();
        let reflected = Ray::offset(gp.point, reflect(&v, &n), &n);
        let refracted = Ray::offset(gp.point, v, &n);
        self.global_effect(&reflected, level, k, &material.kr)
            + self.global_effect(&refracted, level, k, &material.kt)
    }

    fn global_effect(&self, ray: &Ray, level: u32, k: &Vec3, kx: &Vec3) -> Color {
        let kkx = kx.component_mul(k);
        if lower_than(&kkx, self.min_k) {
            return Color::zeros();
        }
        let color = match self.closest(ray) {
            Some(gp) => self.calc_color(&gp, ray, level - 1, &kkx),
            None => self.scene.background,
        };
        color.component_mul(kx)
    }
}
impl TraceRay for RayTracer {
    fn trace_ray(&self, ray: &Ray) -> Color {
        match self.closest(ray) {
            Some(gp) => {
                self.scene.ambient_light.intensity()
                    + self.calc_color(&gp, ray, self.max_level, &Vec3::repeat(1.0))
            }
            None => self.scene.background,
        }
    }
}
