//! Pure transforms that prepare count distributions for plotting.
//!
//! Every function returns new vectors; nothing is adjusted in place.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, Normal};
use statrs::statistics::Statistics;

/// Default number of histogram bins for count distributions.
pub const DEFAULT_BINS: usize = 400;

/// Default number of extra bin edges added on each side before fitting.
pub const DEFAULT_PADDING: usize = 100;

/// Density below which curve tails are trimmed.
pub const DEFAULT_TAIL_THRESHOLD: f64 = 0.00002;

/// A sampled curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Curve {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self { x, y }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Largest y value, or `None` for an empty curve.
    pub fn peak(&self) -> Option<f64> {
        self.y.iter().copied().reduce(f64::max)
    }
}

/// Fitted normal distribution parameters (maximum likelihood).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalFit {
    pub mean: f64,
    pub std_dev: f64,
}

/// `bins + 1` evenly spaced edges spanning the data range.
pub fn histogram_edges(data: &[f64], bins: usize) -> Vec<f64> {
    if data.is_empty() || bins == 0 {
        return Vec::new();
    }
    let mut lo = data.min();
    let mut hi = data.max();
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let step = (hi - lo) / bins as f64;
    (0..=bins).map(|i| lo + step * i as f64).collect()
}

/// Extend evenly spaced edges by `count` steps on each side.
pub fn pad_bins(edges: &[f64], count: usize) -> Vec<f64> {
    if edges.len() < 2 {
        return edges.to_vec();
    }
    let step = edges[1] - edges[0];
    let first = edges[0];
    let last = edges[edges.len() - 1];

    let mut out = Vec::with_capacity(edges.len() + 2 * count);
    out.extend((1..=count).rev().map(|i| first - step * i as f64));
    out.extend_from_slice(edges);
    out.extend((1..=count).map(|i| last + step * i as f64));
    out
}

/// Maximum-likelihood normal fit: sample mean and population deviation.
pub fn fit_normal(data: &[f64]) -> Option<NormalFit> {
    if data.is_empty() {
        return None;
    }
    Some(NormalFit {
        mean: data.mean(),
        std_dev: data.population_std_dev(),
    })
}

/// Sample the normal density at each `x`.
pub fn normal_curve(x: &[f64], fit: NormalFit) -> Result<Curve> {
    let normal = Normal::new(fit.mean, fit.std_dev).map_err(|e| {
        AnalysisError::Argument(format!(
            "cannot build normal curve (mean {}, std dev {}): {e}",
            fit.mean, fit.std_dev
        ))
    })?;
    let y = x.iter().map(|&v| normal.pdf(v)).collect();
    Ok(Curve::new(x.to_vec(), y))
}

/// Drop leading and trailing samples whose y is below `threshold`.
pub fn trim_tails(curve: &Curve, threshold: f64) -> Curve {
    let start = curve.y.iter().position(|&y| y >= threshold);
    let end = curve.y.iter().rposition(|&y| y >= threshold);
    match (start, end) {
        (Some(start), Some(end)) => Curve::new(
            curve.x[start..=end].to_vec(),
            curve.y[start..=end].to_vec(),
        ),
        _ => Curve::default(),
    }
}

/// Histogram edges, padded, fitted and trimmed: the smooth profile drawn
/// over a count histogram.
pub fn gaussian_profile(data: &[f64], bins: usize, padding: usize, threshold: f64) -> Result<Curve> {
    let fit = fit_normal(data).ok_or_else(|| {
        AnalysisError::Argument("cannot fit a distribution to no data".to_string())
    })?;
    let edges = pad_bins(&histogram_edges(data, bins), padding);
    let curve = normal_curve(&edges, fit)?;
    Ok(trim_tails(&curve, threshold))
}

/// Shift x so that the (first) highest sample sits at 0.
pub fn center_on_peak(curve: &Curve) -> Curve {
    let Some(peak) = curve.peak() else {
        return Curve::default();
    };
    let offset = curve
        .y
        .iter()
        .position(|&y| y == peak)
        .map(|i| curve.x[i])
        .unwrap_or_default();
    Curve::new(curve.x.iter().map(|x| x - offset).collect(), curve.y.clone())
}

/// Shift both axes so the curve starts at the origin.
pub fn shift_to_origin(curve: &Curve) -> Curve {
    let (Some(&x0), Some(&y0)) = (curve.x.first(), curve.y.first()) else {
        return Curve::default();
    };
    Curve::new(
        curve.x.iter().map(|x| x - x0).collect(),
        curve.y.iter().map(|y| y - y0).collect(),
    )
}

/// Scale every curve by the tallest peak among them.
pub fn normalize_heights(curves: &[Curve]) -> Vec<Curve> {
    let tallest = curves
        .iter()
        .filter_map(Curve::peak)
        .fold(0.0f64, f64::max);
    if tallest <= 0.0 {
        return curves.to_vec();
    }
    curves
        .iter()
        .map(|c| Curve::new(c.x.clone(), c.y.iter().map(|y| y / tallest).collect()))
        .collect()
}

/// Strip channel suffixes from a series label. Returns the cleaned label
/// and whether the series was recorded without a polarizer.
pub fn clean_label(label: &str) -> (String, bool) {
    let unpolarized = label.contains("NoPolarizer");
    let mut cleaned = label.replace(" NoPolarizer", "");
    for suffix in [" Off Events", " On Events", " All Events"] {
        cleaned = cleaned.replace(suffix, "");
    }
    (cleaned.replace("  ", " "), unpolarized)
}
