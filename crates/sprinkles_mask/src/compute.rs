use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use bevy::prelude::*;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of particle indices handed to a single worker per split.
pub(crate) const WORKGROUP_SIZE: usize = 64;

/// Errors raised while acquiring the compute backend.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ComputeError {
    /// The worker thread pool could not be created.
    #[error("Could not build compute thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Configuration for the parallel execution context that runs particle kernels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeSettings {
    /// Number of worker threads. `None` uses one thread per logical core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    /// Prefix used to name worker threads.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

fn default_thread_name() -> String {
    "sprinkles-mask-compute".to_string()
}

impl Default for ComputeSettings {
    fn default() -> Self {
        Self {
            threads: None,
            thread_name: default_thread_name(),
        }
    }
}

/// Parallel execution context shared by every [`ParticlePool`](crate::pool::ParticlePool).
///
/// Cloning is cheap: all clones dispatch onto the same worker pool.
#[derive(Clone)]
pub struct ComputeBackend {
    pool: Arc<ThreadPool>,
}

impl ComputeBackend {
    /// Builds a new worker pool. Failure here is fatal for pool construction.
    pub fn new(settings: &ComputeSettings) -> Result<Self, ComputeError> {
        let mut builder = ThreadPoolBuilder::new();
        if let Some(threads) = settings.threads {
            builder = builder.num_threads(threads);
        }
        let prefix = settings.thread_name.clone();
        let pool = builder
            .thread_name(move |index| format!("{prefix}-{index}"))
            .build()?;

        debug!(
            "particle compute backend ready with {} threads",
            pool.current_num_threads()
        );

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Number of worker threads kernels are spread across.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `op` inside the worker pool so nested parallel iterators use it.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Invokes `kernel` once for every index in `0..count`, in parallel.
    pub fn dispatch<F>(&self, count: usize, kernel: F)
    where
        F: Fn(usize) + Send + Sync,
    {
        self.pool.install(|| {
            (0..count)
                .into_par_iter()
                .with_min_len(WORKGROUP_SIZE)
                .for_each(kernel)
        });
    }
}

impl std::fmt::Debug for ComputeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeBackend")
            .field("threads", &self.threads())
            .finish()
    }
}

/// Monotonic slot counter claimed atomically by emission draws.
#[derive(Debug, Default)]
pub struct EmitCursor(AtomicU64);

impl EmitCursor {
    /// Claims `count` consecutive cursor values in one step.
    ///
    /// Concurrent callers receive disjoint ranges.
    pub fn claim_range(&self, count: u64) -> Range<u64> {
        let start = self.0.fetch_add(count, Ordering::Relaxed);
        start..start + count
    }

    /// Number of values claimed since the last reset.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Rewinds the cursor to zero.
    pub fn reset(&mut self) {
        *self.0.get_mut() = 0;
    }
}

// one unit of accumulated color is 2^24 fixed-point steps
const FIXED_POINT_ONE: f64 = (1u64 << 24) as f64;

/// RGBA image that many threads can add into at once.
///
/// Channels are stored in 40.24 fixed point inside an [`AtomicI64`]. Integer addition
/// commutes exactly, so the accumulated image does not depend on the order in which
/// workers contribute.
pub struct AccumulationBuffer {
    width: usize,
    height: usize,
    texels: Vec<AtomicI64>,
}

impl AccumulationBuffer {
    /// Creates a zeroed `width`×`height` buffer.
    pub fn new(width: usize, height: usize) -> Self {
        let texels = (0..width * height * 4).map(|_| AtomicI64::new(0)).collect();
        Self {
            width,
            height,
            texels,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Adds `value` into pixel `(x, y)`. Out-of-range coordinates are ignored.
    pub fn accumulate(&self, x: usize, y: usize, value: Vec4) {
        if x >= self.width || y >= self.height {
            return;
        }
        let base = (y * self.width + x) * 4;
        for (channel, amount) in value.to_array().into_iter().enumerate() {
            self.texels[base + channel].fetch_add(to_fixed(amount), Ordering::Relaxed);
        }
    }

    /// Resets every channel to `0.0` on the workers of `backend`.
    pub fn clear(&mut self, backend: &ComputeBackend) {
        let texels = &mut self.texels;
        backend.install(|| {
            texels
                .par_iter_mut()
                .with_min_len(WORKGROUP_SIZE)
                .for_each(|texel| *texel.get_mut() = 0);
        });
    }

    /// Copies the current contents out as one `[r, g, b, a]` entry per pixel, row-major.
    pub fn read(&self) -> Vec<[f32; 4]> {
        self.texels
            .chunks_exact(4)
            .map(|pixel| {
                [
                    from_fixed(pixel[0].load(Ordering::Relaxed)),
                    from_fixed(pixel[1].load(Ordering::Relaxed)),
                    from_fixed(pixel[2].load(Ordering::Relaxed)),
                    from_fixed(pixel[3].load(Ordering::Relaxed)),
                ]
            })
            .collect()
    }
}

fn to_fixed(amount: f32) -> i64 {
    (amount as f64 * FIXED_POINT_ONE).round() as i64
}

fn from_fixed(value: i64) -> f32 {
    (value as f64 / FIXED_POINT_ONE) as f32
}
