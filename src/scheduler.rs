//! Pixel scheduling
//!
//! Hands every pixel of the raster to exactly one worker, collects the colors and
//! writes them out. Shading itself happens behind [`RenderPixel`].
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    str::FromStr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc,
    },
    time::Instant,
};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use threadpool::ThreadPool;

use crate::{
    error::{Result, TraceError},
    output::ImageWriter,
    Color,
};

/// Computes the final color of one pixel
pub trait RenderPixel: Send + Sync {
    fn render_pixel(&self, row: u32, col: u32) -> Color;
}

/// How pixels are spread over threads
///
/// Written as a count (`0` meaning sequential) or `auto`, on the command line and in
/// config files alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "ThreadsRepr", into = "ThreadsRepr")]
pub enum Threads {
    /// Everything on the calling thread
    #[default]
    Sequential,
    /// A fixed pool of worker threads
    Pool(usize),
    /// Rayon work stealing, one task per logical core
    Auto,
}
impl FromStr for Threads {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(Self::Auto),
            n => match n.parse::<usize>() {
                Ok(0) => Ok(Self::Sequential),
                Ok(n) => Ok(Self::Pool(n)),
                Err(_) => Err(format!("expected a thread count or \"auto\", got {s:?}")),
            },
        }
    }
}
impl fmt::Display for Threads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "0"),
            Self::Pool(n) => write!(f, "{n}"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ThreadsRepr {
    Count(usize),
    Named(String),
}
impl TryFrom<ThreadsRepr> for Threads {
    type Error = String;

    fn try_from(repr: ThreadsRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            ThreadsRepr::Count(0) => Ok(Self::Sequential),
            ThreadsRepr::Count(n) => Ok(Self::Pool(n)),
            ThreadsRepr::Named(s) => s.parse(),
        }
    }
}
impl From<Threads> for ThreadsRepr {
    fn from(threads: Threads) -> Self {
        match threads {
            Threads::Sequential => Self::Count(0),
            Threads::Pool(n) => Self::Count(n),
            Threads::Auto => Self::Named("auto".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pixel {
    pub index: usize,
    pub row: u32,
    pub col: u32,
}

/// Monotonic claim counter over a row-major `nx` × `ny` raster
#[derive(Debug)]
pub struct PixelCursor {
    next: AtomicUsize,
    nx: u32,
    total: usize,
}
impl PixelCursor {
    pub fn new(nx: u32, ny: u32) -> Self {
        Self {
            next: AtomicUsize::new(0),
            nx,
            total: nx as usize * ny as usize,
        }
    }

    /// The next unclaimed pixel; `None` once the raster is exhausted
    pub fn claim(&self) -> Option<Pixel> {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        (index < self.total).then(|| pixel_at(index, self.nx))
    }
}

fn pixel_at(index: usize, nx: u32) -> Pixel {
    let nx = nx as usize;
    Pixel {
        index,
        row: (index / nx) as u32,
        col: (index % nx) as u32,
    }
}

/// Progress reporting; hidden unless enabled
#[derive(Debug, Clone)]
pub struct Progress {
    bar: ProgressBar,
}
impl Progress {
    pub fn new(total: u64, enabled: bool) -> Self {
        if !enabled {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar().template("{bar:40} {pos}/{len} ETA: {eta}") {
            bar.set_style(style);
        }
        Self { bar }
    }

    pub fn pixel_done(&self) {
        self.bar.inc(1)
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish()
    }
}

/// Render every pixel of `writer` once and store the results in it.
///
/// Blocks until all workers are done. A panicking worker fails the whole render with
/// [`TraceError::WorkerPanicked`] and leaves `writer` untouched.
pub fn render(
    renderer: Arc<dyn RenderPixel>,
    writer: &mut ImageWriter,
    threads: Threads,
    progress: &Progress,
) -> Result<()> {
    let (nx, ny) = (writer.nx(), writer.ny());
    let start = Instant::now();
    log::info!("Rendering {} ({nx}x{ny}) with threads = {threads}", writer.name());

    let raster = match threads {
        Threads::Pool(0) => {
            log::warn!("A pool of 0 workers renders on the calling thread");
            render_sequential(renderer.as_ref(), nx, ny, progress)
        }
        Threads::Sequential => render_sequential(renderer.as_ref(), nx, ny, progress),
        Threads::Pool(n) => render_pool(renderer, nx, ny, n, progress)?,
        Threads::Auto => render_stealing(renderer.as_ref(), nx, ny, progress)?,
    };
    progress.finish();

    for (index, color) in raster.iter().enumerate() {
        let px = pixel_at(index, nx);
        writer.write_pixel(px.col, px.row, color);
    }
    log::info!("Rendered {} in {:.2?}", writer.name(), start.elapsed());
    Ok(())
}

fn render_sequential(renderer: &dyn RenderPixel, nx: u32, ny: u32, progress: &Progress) -> Vec<Color> {
    log::debug!("Scheduling sequentially on the calling thread");
    let cursor = PixelCursor::new(nx, ny);
    let mut raster = vec![Color::zeros(); cursor.total];
    while let Some(px) = cursor.claim() {
        raster[px.index] = renderer.render_pixel(px.row, px.col);
        progress.pixel_done();
    }
    raster
}

fn render_pool(
    renderer: Arc<dyn RenderPixel>,
    nx: u32,
    ny: u32,
    n_workers: usize,
    progress: &Progress,
) -> Result<Vec<Color>> {
    log::debug!("Scheduling on a pool of {n_workers} workers");
    let pool = ThreadPool::new(n_workers);
    let cursor = Arc::new(PixelCursor::new(nx, ny));
    let total = cursor.total;
    let (tx, rx) = mpsc::channel::<(usize, Color)>();

    for _ in 0..n_workers {
        let tx = tx.clone();
        let cursor = Arc::clone(&cursor);
        let renderer = Arc::clone(&renderer);
        pool.execute(move || {
            while let Some(px) = cursor.claim() {
                let color = renderer.render_pixel(px.row, px.col);
                if tx.send((px.index, color)).is_err() {
                    break;
                }
            }
        });
    }
    // the loop below ends once every worker has dropped its sender
    drop(tx);

    let mut raster = vec![Color::zeros(); total];
    let mut received = 0;
    for (index, color) in rx {
        raster[index] = color;
        received += 1;
        progress.pixel_done();
    }
    pool.join();

    let panicked = pool.panic_count();
    if panicked > 0 || received != total {
        log::error!("{panicked} render workers panicked, {received} of {total} pixels done");
        return Err(TraceError::WorkerPanicked(panicked.max(1)));
    }
    Ok(raster)
}

fn render_stealing(renderer: &dyn RenderPixel, nx: u32, ny: u32, progress: &Progress) -> Result<Vec<Color>> {
    log::debug!(
        "Scheduling with work stealing over {} threads",
        rayon::current_num_threads()
    );
    let mut raster = vec![Color::zeros(); nx as usize * ny as usize];
    panic::catch_unwind(AssertUnwindSafe(|| {
        raster.par_iter_mut().enumerate().for_each(|(index, slot)| {
            let px = pixel_at(index, nx);
            *slot = renderer.render_pixel(px.row, px.col);
            progress.pixel_done();
        });
    }))
    .map_err(|_| {
        log::error!("A render task panicked");
        TraceError::WorkerPanicked(1)
    })?;
    Ok(raster)
}
