//! Surface materials

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TraceError},
    utils::SerdeVector,
    Vec3,
};

/// Anything usable as a per-channel coefficient: a scalar applies to all three
pub trait IntoTriple {
    fn into_triple(self) -> Vec3;
}
impl IntoTriple for f64 {
    fn into_triple(self) -> Vec3 {
        Vec3::new(self, self, self)
    }
}
impl IntoTriple for Vec3 {
    fn into_triple(self) -> Vec3 {
        self
    }
}

fn coefficient(k: impl IntoTriple) -> Vec3 {
    k.into_triple().map(|c| c.clamp(0.0, 1.0))
}

/// Phong material coefficients of one surface
///
/// All coefficients default to zero: a surface with the default material shows only
/// its emission.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Diffuse
    pub kd: Vec3,
    /// Specular
    pub ks: Vec3,
    /// Reflection
    pub kr: Vec3,
    /// Transparency
    pub kt: Vec3,
    pub shininess: u32,
}
impl Default for Material {
    fn default() -> Self {
        Self {
            kd: Vec3::zeros(),
            ks: Vec3::zeros(),
            kr: Vec3::zeros(),
            kt: Vec3::zeros(),
            shininess: 0,
        }
    }
}
impl Material {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kd(mut self, kd: impl IntoTriple) -> Self {
        self.kd = coefficient(kd);
        self
    }

    pub fn with_ks(mut self, ks: impl IntoTriple) -> Self {
        self.ks = coefficient(ks);
        self
    }

    pub fn with_kr(mut self, kr: impl IntoTriple) -> Self {
        self.kr = coefficient(kr);
        self
    }

    pub fn with_kt(mut self, kt: impl IntoTriple) -> Self {
        self.kt = coefficient(kt);
        self
    }

    pub fn with_shininess(mut self, shininess: u32) -> Self {
        self.shininess = shininess;
        self
    }

    pub fn from_config(config: &MaterialConfig) -> Result<Self> {
        Ok(Self {
            kd: config.kd.to_triple("kd")?,
            ks: config.ks.to_triple("ks")?,
            kr: config.kr.to_triple("kr")?,
            kt: config.kt.to_triple("kt")?,
            shininess: config.shininess,
        })
    }
}

/// A coefficient in a config file: either `0.5` or `[0.5, 0.0, 0.2]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoefficientConfig {
    Scalar(f64),
    Triple(SerdeVector),
}
impl Default for CoefficientConfig {
    fn default() -> Self {
        Self::Scalar(0.0)
    }
}
impl CoefficientConfig {
    pub(crate) fn to_triple(self, name: &str) -> Result<Vec3> {
        let k = match self {
            Self::Scalar(k) => k.into_triple(),
            Self::Triple(v) => v.into(),
        };
        if k.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(TraceError::InvalidGeometry(format!(
                "material coefficient {name} must lie in [0, 1]"
            )));
        }
        Ok(k)
    }
}

/// Material Config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    pub kd: CoefficientConfig,
    pub ks: CoefficientConfig,
    pub kr: CoefficientConfig,
    pub kt: CoefficientConfig,
    pub shininess: u32,
}
