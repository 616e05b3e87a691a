//! Curve samplers evaluated by background evaluation
//!
//! Samplers are caller-supplied callbacks. The host may call them from
//! several worker threads at once, so they must be pure functions of the
//! curve parameter and must not touch the design.

use glam::Vec3;
use rayon::prelude::*;

use crate::constants::SAMPLES_PER_TASK;

/// A parametric curve evaluated on worker threads
pub trait CurveSampler: Send + Sync {
    /// Point on the curve at parameter `t` in `[0, 1]`
    fn sample(&self, t: f32) -> Vec3;
}

impl<F> CurveSampler for F
where
    F: Fn(f32) -> Vec3 + Send + Sync,
{
    fn sample(&self, t: f32) -> Vec3 {
        self(t)
    }
}

/// Sample `count` evenly spaced points on `[0, 1]` in parallel
///
/// Results are returned in parameter order regardless of which worker
/// evaluated them. A single sample is taken at `t = 0`.
pub fn sample_parallel(sampler: &dyn CurveSampler, count: usize) -> Vec<Vec3> {
    match count {
        0 => Vec::new(),
        1 => vec![sampler.sample(0.0)],
        _ => {
            let step = 1.0 / (count - 1) as f32;
            (0..count)
                .into_par_iter()
                .with_min_len(SAMPLES_PER_TASK)
                .map(|i| sampler.sample(i as f32 * step))
                .collect()
        }
    }
}
