//! Placeholder data generation
//!
//! The exporter never reads real motion-correction or segmentation output.
//! Pixel masks and fluorescence matrices are drawn from a [`PlaceholderSource`],
//! so tests can swap the thread RNG for a seeded one or a fixed fixture.

use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::nwb::{Dataset, PixelMask, PixelMaskPoint};

/// Shape of one generated pixel mask.
///
/// Defaults follow the sample data: 313 points, `x` in `[321, 340)`,
/// `y` in `[268, 301)`, weight uniform in `[0.001, 0.02)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelMaskSpec {
    /// Number of pixels per mask
    pub points: usize,
    /// Column range (half-open)
    pub x: Range<u32>,
    /// Row range (half-open)
    pub y: Range<u32>,
    /// Weight range (half-open)
    pub weight: Range<f64>,
}

impl Default for PixelMaskSpec {
    fn default() -> Self {
        Self {
            points: 313,
            x: 321..340,
            y: 268..301,
            weight: 0.001..0.02,
        }
    }
}

impl PixelMaskSpec {
    /// Check that every range can be sampled.
    ///
    /// Weight bounds and their difference must be finite; the uniform
    /// sampler panics otherwise.
    #[must_use]
    pub fn is_samplable(&self) -> bool {
        self.points > 0
            && !self.x.is_empty()
            && !self.y.is_empty()
            && self.weight.start.is_finite()
            && self.weight.end.is_finite()
            && (self.weight.end - self.weight.start).is_finite()
            && self.weight.start < self.weight.end
    }
}

/// Source of placeholder arrays.
pub trait PlaceholderSource {
    /// Generate one ROI pixel mask.
    fn pixel_mask(&mut self, spec: &PixelMaskSpec) -> PixelMask;

    /// Generate a `rows × cols` matrix of values in `[0, 1)`.
    fn uniform_matrix(&mut self, rows: usize, cols: usize) -> Dataset;
}

/// Placeholder source backed by any [`Rng`].
#[derive(Debug, Clone)]
pub struct RandomPlaceholders<R> {
    rng: R,
}

impl<R: Rng> RandomPlaceholders<R> {
    /// Wrap an existing RNG.
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Consume the wrapper and hand the RNG back.
    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl RandomPlaceholders<StdRng> {
    /// Deterministic source for reproducible exports and tests.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Source seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> PlaceholderSource for RandomPlaceholders<R> {
    fn pixel_mask(&mut self, spec: &PixelMaskSpec) -> PixelMask {
        // x, y and weight are drawn as three independent columns, then zipped.
        let xs: Vec<u32> = (0..spec.points)
            .map(|_| self.rng.gen_range(spec.x.clone()))
            .collect();
        let ys: Vec<u32> = (0..spec.points)
            .map(|_| self.rng.gen_range(spec.y.clone()))
            .collect();
        let weights: Vec<f64> = (0..spec.points)
            .map(|_| self.rng.gen_range(spec.weight.clone()))
            .collect();

        xs.into_iter()
            .zip(ys)
            .zip(weights)
            .map(|((x, y), weight)| PixelMaskPoint { x, y, weight })
            .collect()
    }

    fn uniform_matrix(&mut self, rows: usize, cols: usize) -> Dataset {
        let values = (0..rows * cols).map(|_| self.rng.gen::<f64>()).collect();
        Dataset::dense(vec![rows, cols], values)
    }
}
