/// Template matching implementation
///
/// Slides the reference over every reference-sized window of an RGB capture
/// and reports the global maximum score. Scores combine the R, G and B planes,
/// so a recoloured or desaturated copy of a reference does not count as a hit.
use super::types::ScoreMethod;
use image::{ImageBuffer, Luma, RgbImage};
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Per-window score map; pixel (x, y) scores the window whose top-left is (x, y)
pub type ScoreMap = ImageBuffer<Luma<f32>, Vec<f32>>;

const CHANNELS: usize = 3;

/// Best-scoring window of one capture
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowScore {
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

/// Template matcher for locating a reference in a capture
pub struct TemplateMatcher {
    method: ScoreMethod,
}

impl TemplateMatcher {
    pub fn new(method: ScoreMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> ScoreMethod {
        self.method
    }

    /// Score every window. `None` when the reference does not fit in the capture.
    pub fn score_map(&self, capture: &RgbImage, reference: &RgbImage) -> Option<ScoreMap> {
        if reference.width() == 0
            || reference.height() == 0
            || reference.width() > capture.width()
            || reference.height() > capture.height()
        {
            return None;
        }

        Some(match self.method {
            ScoreMethod::CorrelationCoefficientNormalized => {
                correlation_coefficient_map(capture, reference)
            }
            ScoreMethod::CrossCorrelationNormalized => cross_correlation_map(capture, reference),
        })
    }

    /// Location of the global maximum (first one in raster order on ties)
    pub fn find_best(&self, capture: &RgbImage, reference: &RgbImage) -> Option<WindowScore> {
        let map = self.score_map(capture, reference)?;
        max_location(&map)
    }
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new(ScoreMethod::CorrelationCoefficientNormalized)
    }
}

/// Global maximum of a score map, ignoring NaN windows
pub fn max_location(map: &ScoreMap) -> Option<WindowScore> {
    let mut best: Option<WindowScore> = None;
    for (x, y, pixel) in map.enumerate_pixels() {
        let score = pixel[0];
        if !score.is_finite() {
            continue;
        }
        if best.is_none_or(|b| score > b.score) {
            best = Some(WindowScore { x, y, score });
        }
    }
    best
}

/// Window sums of one colour plane using summed-area tables
struct IntegralSums {
    stride: usize,
    sum: Vec<u64>,
    sq_sum: Vec<u64>,
}

impl IntegralSums {
    fn new(image: &RgbImage, channel: usize) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let stride = width + 1;
        let mut sum = vec![0u64; stride * (height + 1)];
        let mut sq_sum = vec![0u64; stride * (height + 1)];
        let raw = image.as_raw();

        for y in 0..height {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for x in 0..width {
                let v = raw[(y * width + x) * CHANNELS + channel] as u64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sq_sum[idx] = sq_sum[idx - stride] + row_sq;
            }
        }

        Self {
            stride,
            sum,
            sq_sum,
        }
    }

    fn window(&self, x: usize, y: usize, width: usize, height: usize) -> (u64, u64) {
        let (x1, y1) = (x + width, y + height);
        let at = |table: &[u64], x: usize, y: usize| table[y * self.stride + x];
        let rect = |table: &[u64]| {
            at(table, x1, y1) + at(table, x, y) - at(table, x, y1) - at(table, x1, y)
        };
        (rect(&self.sum), rect(&self.sq_sum))
    }
}

/// Per-channel sums of the reference
struct ReferenceStats {
    sum: [u64; CHANNELS],
    sq_sum: [u64; CHANNELS],
}

impl ReferenceStats {
    fn new(reference: &RgbImage) -> Self {
        let mut stats = Self {
            sum: [0; CHANNELS],
            sq_sum: [0; CHANNELS],
        };
        for pixel in reference.pixels() {
            for c in 0..CHANNELS {
                let v = pixel[c] as u64;
                stats.sum[c] += v;
                stats.sq_sum[c] += v * v;
            }
        }
        stats
    }

    /// `n` times the summed per-channel variance, exact
    fn variance_n(&self, n: u64) -> u128 {
        (0..CHANNELS)
            .map(|c| n as u128 * self.sq_sum[c] as u128 - (self.sum[c] as u128).pow(2))
            .sum()
    }
}

/// Zero-mean normalized cross-correlation over the three colour planes.
///
/// Numerator and variances are summed across channels before normalizing.
/// Variances are exact integers, so flat windows (and a flat reference) score
/// exactly 0 instead of dividing by rounding noise.
fn correlation_coefficient_map(image: &RgbImage, reference: &RgbImage) -> ScoreMap {
    let (tw, th) = reference.dimensions();
    let n = tw as u64 * th as u64;
    let stats = ReferenceStats::new(reference);
    let t_var_n = stats.variance_n(n);

    let out_width = image.width() - tw + 1;
    let out_height = image.height() - th + 1;
    if t_var_n == 0 {
        return ScoreMap::new(out_width, out_height);
    }

    // Sum of I * (T - mean(T)) equals the fully centered cross term
    let means: Vec<f64> = stats.sum.iter().map(|&s| s as f64 / n as f64).collect();
    let cross = cross_correlation(image, reference, |c, v| v as f64 - means[c]);
    let integrals: Vec<IntegralSums> = (0..CHANNELS).map(|c| IntegralSums::new(image, c)).collect();

    score_windows(out_width, out_height, |x, y| {
        let w_var_n: u128 = integrals
            .iter()
            .map(|sums| {
                let (s, sq) = sums.window(x, y, tw as usize, th as usize);
                n as u128 * sq as u128 - (s as u128).pow(2)
            })
            .sum();
        if w_var_n == 0 {
            return 0.0;
        }
        let denom = ((w_var_n as f64) * (t_var_n as f64)).sqrt() / n as f64;
        (cross[y * out_width as usize + x] / denom).clamp(-1.0, 1.0)
    })
}

/// Normalized cross-correlation without mean removal, range [0, 1]
fn cross_correlation_map(image: &RgbImage, reference: &RgbImage) -> ScoreMap {
    let (tw, th) = reference.dimensions();
    let out_width = image.width() - tw + 1;
    let out_height = image.height() - th + 1;
    let t_sq: u64 = ReferenceStats::new(reference).sq_sum.iter().sum();
    if t_sq == 0 {
        return ScoreMap::new(out_width, out_height);
    }

    let cross = cross_correlation(image, reference, |_, v| v as f64);
    let integrals: Vec<IntegralSums> = (0..CHANNELS).map(|c| IntegralSums::new(image, c)).collect();

    score_windows(out_width, out_height, |x, y| {
        let w_sq: u64 = integrals
            .iter()
            .map(|sums| sums.window(x, y, tw as usize, th as usize).1)
            .sum();
        if w_sq == 0 {
            return 0.0;
        }
        let score = cross[y * out_width as usize + x] / ((w_sq as f64) * (t_sq as f64)).sqrt();
        score.clamp(0.0, 1.0)
    })
}

fn score_windows(
    out_width: u32,
    out_height: u32,
    score: impl Fn(usize, usize) -> f64 + Sync,
) -> ScoreMap {
    let mut out = ScoreMap::new(out_width, out_height);
    out.par_chunks_mut(out_width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, value) in row.iter_mut().enumerate() {
                *value = score(x, y) as f32;
            }
        });
    out
}

/// Valid-region cross-correlation `sum(I[x + i, y + j] * k(T[i, j]))`, summed
/// over channels, computed in the frequency domain.
///
/// The transforms use the capture's own size: the reference never wraps
/// around inside the valid region, so no padding is needed. Output is
/// row-major with `(W - tw + 1) x (H - th + 1)` entries.
fn cross_correlation(
    image: &RgbImage,
    reference: &RgbImage,
    kernel: impl Fn(usize, u8) -> f64,
) -> Vec<f64> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let (tw, th) = (reference.width() as usize, reference.height() as usize);
    let plan = Plan2d::new(width, height);

    let mut acc = vec![Complex::new(0.0, 0.0); width * height];
    for c in 0..CHANNELS {
        let mut plane: Vec<Complex<f64>> = image
            .as_raw()
            .iter()
            .skip(c)
            .step_by(CHANNELS)
            .map(|&v| Complex::new(v as f64, 0.0))
            .collect();
        plan.forward(&mut plane, height);

        let mut padded = vec![Complex::new(0.0, 0.0); width * height];
        for (x, y, pixel) in reference.enumerate_pixels() {
            padded[y as usize * width + x as usize] = Complex::new(kernel(c, pixel[c]), 0.0);
        }
        plan.forward(&mut padded, th);

        acc.par_iter_mut()
            .zip(plane.par_iter().zip(padded.par_iter()))
            .for_each(|(a, (i, t))| *a += i * t.conj());
    }

    plan.inverse(&mut acc);
    let norm = (width * height) as f64;
    let (out_width, out_height) = (width - tw + 1, height - th + 1);
    let mut out = Vec::with_capacity(out_width * out_height);
    for y in 0..out_height {
        out.extend(acc[y * width..y * width + out_width].iter().map(|v| v.re / norm));
    }
    out
}

/// Row/column 2-D FFT over a row-major `height x width` buffer.
///
/// The spectrum is kept transposed (`width x height`) between `forward` and
/// `inverse`; only element-wise products happen there.
struct Plan2d {
    width: usize,
    height: usize,
    row_forward: Arc<dyn Fft<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
}

impl Plan2d {
    fn new(width: usize, height: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            width,
            height,
            row_forward: planner.plan_fft_forward(width),
            col_forward: planner.plan_fft_forward(height),
            row_inverse: planner.plan_fft_inverse(width),
            col_inverse: planner.plan_fft_inverse(height),
        }
    }

    /// Only the first `rows` rows may be non-zero; the rest stay zero under a row FFT
    fn forward(&self, data: &mut Vec<Complex<f64>>, rows: usize) {
        fft_rows(&self.row_forward, &mut data[..rows * self.width], self.width);
        *data = transpose(data, self.height, self.width);
        fft_rows(&self.col_forward, data, self.height);
    }

    fn inverse(&self, data: &mut Vec<Complex<f64>>) {
        fft_rows(&self.col_inverse, data, self.height);
        *data = transpose(data, self.width, self.height);
        fft_rows(&self.row_inverse, data, self.width);
    }
}

fn fft_rows(fft: &Arc<dyn Fft<f64>>, data: &mut [Complex<f64>], len: usize) {
    data.par_chunks_mut(len).for_each(|row| fft.process(row));
}

fn transpose(data: &[Complex<f64>], rows: usize, cols: usize) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::new(0.0, 0.0); rows * cols];
    out.par_chunks_mut(rows).enumerate().for_each(|(c, column)| {
        for (r, value) in column.iter_mut().enumerate() {
            *value = data[r * cols + c];
        }
    });
    out
}
