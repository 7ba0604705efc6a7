use crate::gridding::grid::GridData;
use tracing::debug;

/// Normalized Gaussian weights for a blur of the given radius: `2 * floor(radius) + 1` taps
/// with sigma = radius / 3.
pub fn gaussian_kernel(radius: f64) -> Vec<f64> {
    let half = radius.max(0.0).floor() as usize;
    let sigma = radius / 3.0;
    if half == 0 || sigma <= 0.0 {
        return vec![1.0];
    }
    let weights: Vec<f64> = (0..=2 * half)
        .map(|i| {
            let d = i as f64 - half as f64;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// One pass of `kernel` along a line of `len` values starting at `start`, `stride` apart.
/// Taps falling off either end reuse the edge value.
fn convolve_line(src: &[f32], dst: &mut [f32], start: usize, stride: usize, len: usize, kernel: &[f64]) {
    let half = (kernel.len() / 2) as isize;
    for i in 0..len {
        let mut acc = 0.0_f64;
        for (k, w) in kernel.iter().enumerate() {
            let j = (i as isize + k as isize - half).clamp(0, len as isize - 1) as usize;
            acc += w * f64::from(src[start + j * stride]);
        }
        dst[start + i * stride] = acc as f32;
    }
}

/// Smooths a grid in place with a separable Gaussian, horizontal pass first, then vertical.
/// A radius below 1 leaves the grid untouched.
pub fn gaussian_blur(grid: &mut GridData, radius: f64) {
    let kernel = gaussian_kernel(radius);
    if kernel.len() == 1 || grid.values.len() != grid.width * grid.height {
        return;
    }
    debug!(radius, taps = kernel.len(), "blurring grid");

    let mut scratch = grid.values.clone();
    for y in 0..grid.height {
        convolve_line(&grid.values, &mut scratch, y * grid.width, 1, grid.width, &kernel);
    }
    for x in 0..grid.width {
        convolve_line(&scratch, &mut grid.values, x, grid.width, grid.height, &kernel);
    }
}

impl GridData {
    /// See [`gaussian_blur`].
    pub fn blur(&mut self, radius: f64) {
        gaussian_blur(self, radius);
    }
}
