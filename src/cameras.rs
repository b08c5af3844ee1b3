//! Cameras and configs for cameras
use std::{collections::HashMap, path::PathBuf, sync::Arc};

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TraceError},
    output::ImageWriter,
    scheduler::{self, Progress, RenderPixel, Threads},
    tracer::TraceRay,
    utils::{self, color_distance, is_zero, SerdeVector},
    Color, Point, Ray, Vec3,
};

/// How many rays are averaged into one pixel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AntiAliasing {
    /// One ray through the pixel center
    #[default]
    None,
    /// `rows` × `cols` sub-cells, sampled at their centers or, given a seed, at a
    /// random spot inside each cell
    Grid {
        rows: u32,
        cols: u32,
        #[serde(default)]
        jitter: Option<u64>,
    },
    /// Split the pixel into quarters while its corner colors differ by more than
    /// `tolerance` (on the 0-255 scale), at most `max_depth` times
    Adaptive { max_depth: u32, tolerance: f64 },
}

/// Camera Config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub location: SerdeVector,
    pub to: SerdeVector,
    pub up: SerdeVector,
    pub vp_width: f64,
    pub vp_height: f64,
    pub vp_distance: f64,
    pub nx: u32,
    pub ny: u32,
    #[serde(default)]
    pub anti_aliasing: AntiAliasing,
    #[serde(default)]
    pub threads: Threads,
}

/// Pinhole camera looking through a view plane
///
/// The view plane size, its distance, an image writer and a ray tracer must all be set
/// before [`Camera::render_image`].
pub struct Camera {
    location: Point,
    v_to: Vec3,
    v_up: Vec3,
    v_right: Vec3,
    vp_size: Option<(f64, f64)>,
    vp_distance: Option<f64>,
    image_writer: Option<ImageWriter>,
    ray_tracer: Option<Arc<dyn TraceRay>>,
    anti_aliasing: AntiAliasing,
    threads: Threads,
    progress: bool,
}
impl Camera {
    /// `to` and `up` must be orthogonal
    pub fn new(location: Point, to: Vec3, up: Vec3) -> Result<Self> {
        let v_to = utils::try_unit(to)?;
        let v_up = utils::try_unit(up)?;
        if !is_zero(v_to.dot(&v_up)) {
            return Err(TraceError::NonOrthogonalCamera);
        }
        Ok(Self {
            location,
            v_to,
            v_up,
            v_right: v_to.cross(&v_up).normalize(),
            vp_size: None,
            vp_distance: None,
            image_writer: None,
            ray_tracer: None,
            anti_aliasing: AntiAliasing::None,
            threads: Threads::Sequential,
            progress: false,
        })
    }

    /// Everything except the image writer and ray tracer
    pub fn from_config(config: &CameraConfig) -> Result<Self> {
        Ok(Self::new(config.location.into(), config.to.into(), config.up.into())?
            .with_vp_size(config.vp_width, config.vp_height)
            .with_vp_distance(config.vp_distance)
            .with_anti_aliasing(config.anti_aliasing)
            .with_threads(config.threads))
    }

    pub fn with_vp_size(mut self, width: f64, height: f64) -> Self {
        self.vp_size = Some((width, height));
        self
    }

    pub fn with_vp_distance(mut self, distance: f64) -> Self {
        self.vp_distance = Some(distance);
        self
    }

    pub fn with_image_writer(mut self, image_writer: ImageWriter) -> Self {
        self.image_writer = Some(image_writer);
        self
    }

    pub fn with_ray_tracer(mut self, ray_tracer: impl TraceRay + 'static) -> Self {
        self.ray_tracer = Some(Arc::new(ray_tracer));
        self
    }

    pub fn with_anti_aliasing(mut self, anti_aliasing: AntiAliasing) -> Self {
        self.anti_aliasing = anti_aliasing;
        self
    }

    pub fn with_threads(mut self, threads: Threads) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn location(&self) -> Point {
        self.location
    }

    pub fn v_right(&self) -> Vec3 {
        self.v_right
    }

    pub fn image_writer(&self) -> Option<&ImageWriter> {
        self.image_writer.as_ref()
    }

    fn frame(&self, nx: u32, ny: u32) -> Result<Frame> {
        let (width, height) = self.vp_size.ok_or(TraceError::MissingField("view plane size"))?;
        let distance = self
            .vp_distance
            .ok_or(TraceError::MissingField("view plane distance"))?;
        if !(width > 0.0 && height > 0.0 && distance > 0.0) {
            return Err(TraceError::InvalidGeometry(format!(
                "view plane {width}x{height} at distance {distance} must have positive sides"
            )));
        }
        if nx == 0 || ny == 0 {
            return Err(TraceError::InvalidGeometry(format!(
                "resolution {nx}x{ny} must be at least 1x1"
            )));
        }
        Ok(Frame {
            location: self.location,
            v_up: self.v_up,
            v_right: self.v_right,
            center: self.location + distance * self.v_to,
            rx: width / nx as f64,
            ry: height / ny as f64,
            nx,
            ny,
        })
    }

    /// Ray from the camera through the center of pixel (`j`, `i`) of an `nx` × `ny` grid
    pub fn construct_ray(&self, nx: u32, ny: u32, j: u32, i: u32) -> Result<Ray> {
        Ok(self.frame(nx, ny)?.ray_through(j as f64, i as f64))
    }

    /// Shade every pixel into the image writer
    pub fn render_image(&mut self) -> Result<()> {
        if self.vp_size.is_none() {
            return Err(TraceError::MissingField("view plane size"));
        }
        if self.vp_distance.is_none() {
            return Err(TraceError::MissingField("view plane distance"));
        }
        let (nx, ny) = self
            .image_writer
            .as_ref()
            .map(|writer| (writer.nx(), writer.ny()))
            .ok_or(TraceError::MissingField("image writer"))?;
        let tracer = self
            .ray_tracer
            .clone()
            .ok_or(TraceError::MissingField("ray tracer"))?;
        let frame = self.frame(nx, ny)?;

        let renderer = Arc::new(PixelRenderer {
            frame,
            tracer,
            anti_aliasing: self.anti_aliasing,
        });
        let progress = Progress::new(nx as u64 * ny as u64, self.progress);
        let writer = self
            .image_writer
            .as_mut()
            .ok_or(TraceError::MissingField("image writer"))?;
        scheduler::render(renderer, writer, self.threads, &progress)
    }

    /// Paint grid lines every `interval` pixels over the image
    pub fn print_grid(&mut self, interval: u32, color: &Color) -> Result<()> {
        let writer = self
            .image_writer
            .as_mut()
            .ok_or(TraceError::MissingField("image writer"))?;
        let interval = interval.max(1);
        for row in 0..writer.ny() {
            for col in 0..writer.nx() {
                if row % interval == 0 || col % interval == 0 {
                    writer.write_pixel(col, row, color);
                }
            }
        }
        Ok(())
    }

    pub fn write_to_image(&self, dir: impl AsRef<std::path::Path>) -> Result<PathBuf> {
        self.image_writer
            .as_ref()
            .ok_or(TraceError::MissingField("image writer"))?
            .write_to_image(dir)
    }
}

/// View plane geometry for one resolution, in pixel coordinates
#[derive(Debug, Clone, Copy)]
struct Frame {
    location: Point,
    v_up: Vec3,
    v_right: Vec3,
    center: Point,
    rx: f64,
    ry: f64,
    nx: u32,
    ny: u32,
}
impl Frame {
    /// Point on the view plane; `x` runs along columns and `y` down rows, with pixel
    /// centers at whole numbers
    fn point_at(&self, x: f64, y: f64) -> Point {
        let x_j = (x - (self.nx as f64 - 1.0) / 2.0) * self.rx;
        let y_i = -(y - (self.ny as f64 - 1.0) / 2.0) * self.ry;
        self.center + x_j * self.v_right + y_i * self.v_up
    }

    fn ray_to(&self, point: &Point) -> Ray {
        Ray::new(self.location, point - self.location)
    }

    fn ray_through(&self, x: f64, y: f64) -> Ray {
        self.ray_to(&self.point_at(x, y))
    }
}

/// Shared by every render worker
struct PixelRenderer {
    frame: Frame,
    tracer: Arc<dyn TraceRay>,
    anti_aliasing: AntiAliasing,
}
impl PixelRenderer {
    fn trace_at(&self, x: f64, y: f64) -> Color {
        self.tracer.trace_ray(&self.frame.ray_through(x, y))
    }

    fn grid(&self, row: u32, col: u32, rows: u32, cols: u32, jitter: Option<u64>) -> Color {
        let (rows, cols) = (rows.max(1), cols.max(1));
        // seeded per pixel so the result does not depend on which worker renders it
        let mut rng = jitter.map(|seed| {
            StdRng::seed_from_u64(seed ^ ((row as u64) << 32 | col as u64))
        });
        let (sx, sy) = (1.0 / cols as f64, 1.0 / rows as f64);
        let mut sum = Color::zeros();
        for r in 0..rows {
            for c in 0..cols {
                let (ox, oy) = match rng.as_mut() {
                    Some(rng) => (rng.gen::<f64>(), rng.gen::<f64>()),
                    None => (0.5, 0.5),
                };
                let x = col as f64 - 0.5 + (c as f64 + ox) * sx;
                let y = row as f64 - 0.5 + (r as f64 + oy) * sy;
                sum += self.trace_at(x, y);
            }
        }
        sum / (rows * cols) as f64
    }

    fn adaptive(&self, row: u32, col: u32, max_depth: u32, tolerance: f64) -> Color {
        let mut cache: HashMap<[i64; 3], Color> = HashMap::new();
        let mut sample = |x: f64, y: f64| -> Color {
            let p = self.frame.point_at(x, y);
            *cache
                .entry(quantize(&p))
                .or_insert_with(|| self.tracer.trace_ray(&self.frame.ray_to(&p)))
        };

        let mut color = Color::zeros();
        let mut stack = vec![(col as f64 - 0.5, row as f64 - 0.5, 1.0, 0)];
        while let Some((x0, y0, size, depth)) = stack.pop() {
            let corners = [
                sample(x0, y0),
                sample(x0 + size, y0),
                sample(x0, y0 + size),
                sample(x0 + size, y0 + size),
            ];
            let uniform = corners[1..]
                .iter()
                .all(|c| color_distance(c, &corners[0]) <= tolerance);
            if uniform || depth >= max_depth {
                let mean = corners.iter().sum::<Color>() / 4.0;
                color += mean * (size * size);
                continue;
            }
            let half = size / 2.0;
            stack.push((x0, y0, half, depth + 1));
            stack.push((x0 + half, y0, half, depth + 1));
            stack.push((x0, y0 + half, half, depth + 1));
            stack.push((x0 + half, y0 + half, half, depth + 1));
        }
        color
    }
}
impl RenderPixel for PixelRenderer {
    fn render_pixel(&self, row: u32, col: u32) -> Color {
        match self.anti_aliasing {
            AntiAliasing::None => self.trace_at(col as f64, row as f64),
            AntiAliasing::Grid { rows, cols, jitter } => self.grid(row, col, rows, cols, jitter),
            AntiAliasing::Adaptive {
                max_depth,
                tolerance,
            } => self.adaptive(row, col, max_depth, tolerance),
        }
    }
}

/// Hash key for a view plane point
fn quantize(p: &Point) -> [i64; 3] {
    const SCALE: f64 = 1e9;
    [
        (p.x * SCALE).round() as i64,
        (p.y * SCALE).round() as i64,
        (p.z * SCALE).round() as i64,
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::objects::Intersectable;
    use crate::planar::{Plane, Triangle};
    use crate::radial::Sphere;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).norm() < 1e-9, "{a:?} != {b:?}");
    }

    fn camera() -> Camera {
        Camera::new(Point::zeros(), Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, -1.0, 0.0))
            .unwrap()
            .with_vp_size(3.0, 3.0)
            .with_vp_distance(1.0)
    }

    #[test]
    fn test_rejects_bad_axes() {
        let crooked = Camera::new(Point::zeros(), Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 1.0, 1.0));
        assert!(matches!(crooked, Err(TraceError::NonOrthogonalCamera)));
        let zero = Camera::new(Point::zeros(), Vec3::zeros(), Vec3::new(0.0, 1.0, 0.0));
        assert!(matches!(zero, Err(TraceError::DegenerateVector)));
    }

    #[test]
    fn test_construct_ray() {
        let cam = Camera::new(Point::zeros(), Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, -1.0, 0.0))
            .unwrap()
            .with_vp_size(8.0, 8.0)
            .with_vp_distance(10.0);
        assert_close(cam.v_right(), Vec3::new(-1.0, 0.0, 0.0));

        let center = cam.construct_ray(3, 3, 1, 1).unwrap();
        assert_close(center.dir, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(center.orig, Point::zeros());

        // top-left pixel of 4x4 sits 3 units off center on both axes
        let corner = cam.construct_ray(4, 4, 0, 0).unwrap();
        assert_close(corner.dir, Vec3::new(3.0, -3.0, -10.0).normalize());

        let side = cam.construct_ray(3, 3, 2, 1).unwrap();
        assert_close(side.dir, Vec3::new(-8.0 / 3.0, 0.0, -10.0).normalize());
    }

    #[test]
    fn test_construct_ray_needs_view_plane() {
        let cam = Camera::new(Point::zeros(), Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 1.0, 0.0))
            .unwrap();
        assert!(matches!(
            cam.construct_ray(3, 3, 0, 0),
            Err(TraceError::MissingField("view plane size"))
        ));
    }

    fn count_hits(cam: &Camera, obj: &dyn Intersectable) -> usize {
        let mut hits = 0;
        for i in 0..3 {
            for j in 0..3 {
                let ray = cam.construct_ray(3, 3, j, i).unwrap();
                hits += obj.find_intersections(&ray).map_or(0, |found| found.len());
            }
        }
        hits
    }

    #[test]
    fn test_view_plane_meets_spheres() {
        let cam1 = camera();
        let cam2 = Camera::new(Point::new(0.0, 0.0, 0.5), Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, -1.0, 0.0))
            .unwrap()
            .with_vp_size(3.0, 3.0)
            .with_vp_distance(1.0);

        let small = Sphere::new(Point::new(0.0, 0.0, -3.0), 1.0).unwrap();
        assert_eq!(count_hits(&cam1, &small), 2);
        let large = Sphere::new(Point::new(0.0, 0.0, -2.5), 2.5).unwrap();
        assert_eq!(count_hits(&cam2, &large), 18);
        let medium = Sphere::new(Point::new(0.0, 0.0, -2.0), 2.0).unwrap();
        assert_eq!(count_hits(&cam2, &medium), 10);
        let around = Sphere::new(Point::new(0.0, 0.0, -0.5), 4.0).unwrap();
        assert_eq!(count_hits(&cam2, &around), 9);
        let behind = Sphere::new(Point::new(0.0, 0.0, 1.0), 0.5).unwrap();
        assert_eq!(count_hits(&cam1, &behind), 0);
    }

    #[test]
    fn test_view_plane_meets_planes() {
        let cam = camera();
        let facing = Plane::new(Point::new(0.0, 0.0, -2.0), Vec3::new(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(count_hits(&cam, &facing), 9);
        let tilted = Plane::new(Point::new(1.5, 1.5, 0.0), Vec3::new(-1.0, 0.0, 3.0)).unwrap();
        assert_eq!(count_hits(&cam, &tilted), 9);
        let steep = Plane::new(Point::new(1.5, 1.5, 0.0), Vec3::new(-1.0, 0.0, 1.0)).unwrap();
        assert_eq!(count_hits(&cam, &steep), 6);
    }

    #[test]
    fn test_view_plane_meets_triangle() {
        let triangle = Triangle::new(
            Point::new(1.0, 1.0, -2.0),
            Point::new(-1.0, 1.0, -2.0),
            Point::new(0.0, -1.0, -2.0),
        )
        .unwrap();
        assert_eq!(count_hits(&camera(), &triangle), 1);
    }

    #[test]
    fn test_print_grid() {
        let mut cam = camera().with_image_writer(ImageWriter::new("grid", 7, 5));
        let yellow = Color::new(255.0, 255.0, 0.0);
        cam.print_grid(3, &yellow).unwrap();
        let writer = cam.image_writer().unwrap();
        for (col, row) in [(0, 0), (3, 1), (6, 4), (1, 3)] {
            assert_eq!(writer.pixel(col, row), yellow, "({col}, {row})");
        }
        for (col, row) in [(1, 1), (2, 4), (4, 2), (5, 1)] {
            assert_eq!(writer.pixel(col, row), Color::zeros(), "({col}, {row})");
        }
        assert!(matches!(
            camera().print_grid(3, &yellow),
            Err(TraceError::MissingField("image writer"))
        ));
    }

    /// White to the right of the camera axis, black elsewhere; counts rays traced
    struct Split {
        traced: AtomicUsize,
    }
    impl TraceRay for Split {
        fn trace_ray(&self, ray: &Ray) -> Color {
            self.traced.fetch_add(1, Ordering::SeqCst);
            if ray.dir.x > 1e-9 {
                Color::repeat(255.0)
            } else {
                Color::zeros()
            }
        }
    }

    fn split_renderer(anti_aliasing: AntiAliasing) -> PixelRenderer {
        // one pixel spanning x in [-1, 1], right = +x
        let cam = Camera::new(Point::zeros(), Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 1.0, 0.0))
            .unwrap()
            .with_vp_size(2.0, 2.0)
            .with_vp_distance(1.0);
        PixelRenderer {
            frame: cam.frame(1, 1).unwrap(),
            tracer: Arc::new(Split {
                traced: AtomicUsize::new(0),
            }),
            anti_aliasing,
        }
    }

    #[test]
    fn test_grid_averages_sub_cells() {
        let renderer = split_renderer(AntiAliasing::Grid {
            rows: 3,
            cols: 4,
            jitter: None,
        });
        // two of four columns lie right of the axis
        assert_close(renderer.render_pixel(0, 0), Color::repeat(127.5));
    }

    #[test]
    fn test_jittered_grid_is_repeatable() {
        let aa = AntiAliasing::Grid {
            rows: 4,
            cols: 4,
            jitter: Some(7),
        };
        let first = split_renderer(aa).render_pixel(0, 0);
        let second = split_renderer(aa).render_pixel(0, 0);
        assert_eq!(first, second);
        assert!(first.x > 0.0 && first.x < 255.0);
    }

    #[test]
    fn test_adaptive_refines_edges_only() {
        let uniform = split_renderer(AntiAliasing::Adaptive {
            max_depth: 0,
            tolerance: 1.0,
        });
        // corners x = -1 and x = 1
        assert_close(uniform.render_pixel(0, 0), Color::repeat(127.5));

        let refined = split_renderer(AntiAliasing::Adaptive {
            max_depth: 3,
            tolerance: 1.0,
        });
        let color = refined.render_pixel(0, 0);
        assert!(color.x > 0.0 && color.x < 127.5, "{color:?}");
    }

    #[test]
    fn test_adaptive_reuses_corner_samples() {
        struct Flat(AtomicUsize);
        impl TraceRay for Flat {
            fn trace_ray(&self, _ray: &Ray) -> Color {
                self.0.fetch_add(1, Ordering::SeqCst);
                Color::repeat(9.0)
            }
        }
        let flat = Arc::new(Flat(AtomicUsize::new(0)));
        let cam = camera();
        let renderer = PixelRenderer {
            frame: cam.frame(2, 2).unwrap(),
            tracer: flat.clone(),
            anti_aliasing: AntiAliasing::Adaptive {
                max_depth: 4,
                tolerance: 0.5,
            },
        };
        assert_close(renderer.render_pixel(1, 0), Color::repeat(9.0));
        assert_eq!(flat.0.load(Ordering::SeqCst), 4);
    }
}
