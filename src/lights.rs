//! Light sources

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    materials::CoefficientConfig,
    utils::{self, SerdeVector, ACCURACY},
    Color, Point, Vec3,
};

pub type Light = Box<dyn LightSource + Send + Sync>;

/// Config for light sources
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LightConfig {
    Directional(DirectionalLightConfig),
    Point(PointLightConfig),
    Spot(SpotLightConfig),
}

/// Build a boxed light from its config
pub fn from_config(config: &LightConfig) -> Result<Light> {
    Ok(match config {
        LightConfig::Directional(c) => Box::new(DirectionalLight::from_config(c)?),
        LightConfig::Point(c) => Box::new(PointLight::from_config(c)),
        LightConfig::Spot(c) => Box::new(SpotLight::from_config(c)?),
    })
}

/// A light that reaches individual surface points
pub trait LightSource {
    /// Color arriving at `point`, after attenuation
    fn intensity_at(&self, point: &Point) -> Color;

    /// Unit direction the light travels in to reach `point`.
    ///
    /// `None` when the direction is undefined, i.e. the point sits on the light.
    fn direction_at(&self, point: &Point) -> Option<Vec3>;

    /// How far a shadow ray from `point` must search before reaching the light
    fn distance(&self, point: &Point) -> f64;
}

/// Uniform light added to every pixel that hits a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    intensity: Color,
}
impl AmbientLight {
    pub const NONE: AmbientLight = AmbientLight {
        intensity: Color::new(0.0, 0.0, 0.0),
    };

    /// `color` scaled per channel by `k`
    pub fn new(color: Color, k: Vec3) -> Self {
        Self {
            intensity: color.component_mul(&k),
        }
    }

    pub fn from_config(config: &AmbientLightConfig) -> Result<Self> {
        Ok(Self::new(config.color.into(), config.k.to_triple("ambient k")?))
    }

    pub fn intensity(&self) -> Color {
        self.intensity
    }
}
impl Default for AmbientLight {
    fn default() -> Self {
        Self::NONE
    }
}

/// Light from infinitely far away, e.g. the sun
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    intensity: Color,
    direction: Vec3,
}
impl DirectionalLight {
    pub fn new(intensity: Color, direction: Vec3) -> Result<Self> {
        Ok(Self {
            intensity,
            direction: utils::try_unit(direction)?,
        })
    }

    pub fn from_config(config: &DirectionalLightConfig) -> Result<Self> {
        Self::new(config.intensity.into(), config.direction.into())
    }
}
impl LightSource for DirectionalLight {
    fn intensity_at(&self, _point: &Point) -> Color {
        self.intensity
    }

    fn direction_at(&self, _point: &Point) -> Option<Vec3> {
        Some(self.direction)
    }

    fn distance(&self, _point: &Point) -> f64 {
        f64::INFINITY
    }
}

/// Bulb radiating in all directions, fading as 1 / (kc + kl·d + kq·d²)
#[derive(Debug, Clone)]
pub struct PointLight {
    intensity: Color,
    position: Point,
    kc: f64,
    kl: f64,
    kq: f64,
}
impl PointLight {
    pub fn new(intensity: Color, position: Point) -> Self {
        Self {
            intensity,
            position,
            kc: 1.0,
            kl: 0.0,
            kq: 0.0,
        }
    }

    pub fn with_kc(mut self, kc: f64) -> Self {
        self.kc = kc;
        self
    }

    pub fn with_kl(mut self, kl: f64) -> Self {
        self.kl = kl;
        self
    }

    pub fn with_kq(mut self, kq: f64) -> Self {
        self.kq = kq;
        self
    }

    pub fn from_config(config: &PointLightConfig) -> Self {
        Self::new(config.intensity.into(), config.position.into())
            .with_kc(config.kc)
            .with_kl(config.kl)
            .with_kq(config.kq)
    }

    pub fn position(&self) -> Point {
        self.position
    }
}
impl LightSource for PointLight {
    fn intensity_at(&self, point: &Point) -> Color {
        let d = (point - self.position).norm();
        let denominator = self.kc + self.kl * d + self.kq * d * d;
        if denominator <= 0.0 {
            return self.intensity;
        }
        self.intensity / denominator
    }

    fn direction_at(&self, point: &Point) -> Option<Vec3> {
        (point - self.position).try_normalize(ACCURACY)
    }

    fn distance(&self, point: &Point) -> f64 {
        (point - self.position).norm()
    }
}

/// Point light aimed along a direction; `narrow_beam` above 1 tightens the cone
#[derive(Debug, Clone)]
pub struct SpotLight {
    point: PointLight,
    direction: Vec3,
    narrow_beam: f64,
}
impl SpotLight {
    pub fn new(intensity: Color, position: Point, direction: Vec3) -> Result<Self> {
        Ok(Self {
            point: PointLight::new(intensity, position),
            direction: utils::try_unit(direction)?,
            narrow_beam: 1.0,
        })
    }

    pub fn with_kc(mut self, kc: f64) -> Self {
        self.point = self.point.with_kc(kc);
        self
    }

    pub fn with_kl(mut self, kl: f64) -> Self {
        self.point = self.point.with_kl(kl);
        self
    }

    pub fn with_kq(mut self, kq: f64) -> Self {
        self.point = self.point.with_kq(kq);
        self
    }

    pub fn with_narrow_beam(mut self, narrow_beam: f64) -> Self {
        self.narrow_beam = narrow_beam.max(1.0);
        self
    }

    pub fn from_config(config: &SpotLightConfig) -> Result<Self> {
        Ok(Self::new(
            config.intensity.into(),
            config.position.into(),
            config.direction.into(),
        )?
        .with_kc(config.kc)
        .with_kl(config.kl)
        .with_kq(config.kq)
        .with_narrow_beam(config.narrow_beam))
    }
}
impl LightSource for SpotLight {
    fn intensity_at(&self, point: &Point) -> Color {
        let factor = self
            .direction_at(point)
            .map_or(0.0, |l| self.direction.dot(&l).max(0.0).powf(self.narrow_beam));
        self.point.intensity_at(point) * factor
    }

    fn direction_at(&self, point: &Point) -> Option<Vec3> {
        self.point.direction_at(point)
    }

    fn distance(&self, point: &Point) -> f64 {
        self.point.distance(point)
    }
}

fn one() -> f64 {
    1.0
}

/// Ambient Light Config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmbientLightConfig {
    pub color: SerdeVector,
    #[serde(default)]
    pub k: CoefficientConfig,
}

/// Directional Light Config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionalLightConfig {
    pub intensity: SerdeVector,
    pub direction: SerdeVector,
}

/// Point Light Config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointLightConfig {
    pub intensity: SerdeVector,
    pub position: SerdeVector,
    #[serde(default = "one")]
    pub kc: f64,
    #[serde(default)]
    pub kl: f64,
    #[serde(default)]
    pub kq: f64,
}

/// Spot Light Config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotLightConfig {
    pub intensity: SerdeVector,
    pub position: SerdeVector,
    pub direction: SerdeVector,
    #[serde(default = "one")]
    pub kc: f64,
    #[serde(default)]
    pub kl: f64,
    #[serde(default)]
    pub kq: f64,
    #[serde(default = "one")]
    pub narrow_beam: f64,
}
