//! Image output

use std::{
    fs,
    path::{Path, PathBuf},
};

use image::{Rgb, RgbImage};

use crate::{error::Result, utils::scale_color, Color};

/// Fixed-size RGB raster saved as `<name>.png`
#[derive(Debug, Clone)]
pub struct ImageWriter {
    name: String,
    image: RgbImage,
}
impl ImageWriter {
    pub fn new(name: impl Into<String>, nx: u32, ny: u32) -> Self {
        Self {
            name: name.into(),
            image: RgbImage::new(nx, ny),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nx(&self) -> u32 {
        self.image.width()
    }

    pub fn ny(&self) -> u32 {
        self.image.height()
    }

    /// Store a color, each channel rounded and clamped to [0, 255]
    pub fn write_pixel(&mut self, col: u32, row: u32, color: &Color) {
        self.image.put_pixel(col, row, to_rgb(color));
    }

    pub fn pixel(&self, col: u32, row: u32) -> Color {
        let Rgb([r, g, b]) = *self.image.get_pixel(col, row);
        Color::new(r as f64, g as f64, b as f64)
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Save to `<dir>/<name>.png`, creating `dir` if needed
    pub fn write_to_image(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.png", self.name));
        self.image.save(&path)?;
        log::info!("Wrote {}", path.display());
        Ok(path)
    }
}

pub(crate) fn to_rgb(color: &Color) -> Rgb<u8> {
    Rgb([scale_color(color.x), scale_color(color.y), scale_color(color.z)])
}
