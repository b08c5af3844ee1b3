//! The world being rendered

use crate::{
    lights::{AmbientLight, Light, LightSource},
    objects::{Geometries, Intersectable},
    Color,
};

/// Everything a ray can meet. Read-only once built.
pub struct Scene {
    pub name: String,
    pub background: Color,
    pub ambient_light: AmbientLight,
    pub geometries: Geometries,
    pub lights: Vec<Light>,
}
impl Scene {
    pub fn builder(name: impl Into<String>) -> SceneBuilder {
        SceneBuilder::new(name)
    }
}

/// Assembles a [`Scene`]; background defaults to black and there is no ambient light
pub struct SceneBuilder {
    name: String,
    background: Color,
    ambient_light: AmbientLight,
    geometries: Geometries,
    lights: Vec<Light>,
}
impl SceneBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            background: Color::zeros(),
            ambient_light: AmbientLight::NONE,
            geometries: Geometries::new(),
            lights: Vec::new(),
        }
    }

    pub fn background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn ambient_light(mut self, ambient_light: AmbientLight) -> Self {
        self.ambient_light = ambient_light;
        self
    }

    pub fn geometries(mut self, geometries: Geometries) -> Self {
        self.geometries = geometries;
        self
    }

    pub fn geometry(mut self, obj: impl Intersectable + Send + Sync + 'static) -> Self {
        self.geometries.add(obj);
        self
    }

    pub fn light(mut self, light: impl LightSource + Send + Sync + 'static) -> Self {
        self.lights.push(Box::new(light));
        self
    }

    pub fn boxed_light(mut self, light: Light) -> Self {
        self.lights.push(light);
        self
    }

    pub fn build(self) -> Scene {
        log::debug!(
            "Scene {:?}: {} top-level geometries, {} lights",
            self.name,
            self.geometries.len(),
            self.lights.len()
        );
        Scene {
            name: self.name,
            background: self.background,
            ambient_light: self.ambient_light,
            geometries: self.geometries,
            lights: self.lights,
        }
    }
}
