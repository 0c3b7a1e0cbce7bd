//! Billed-vs-declared weight regression per provider.
//!
//! A provider that bills a near-constant multiple of declared weight shows
//! up as a high-R² line with slope above 1.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{round2, round4, Shipment};
use crate::storage::{append_capped, clear_list, load_list, Storage};

pub const WEIGHT_POINTS_KEY: &str = "shipaudit.weight_points";
pub const MAX_WEIGHT_POINTS: usize = 10_000;

/// Below this many points a fit is not reported.
pub const MIN_POINTS: usize = 30;
/// Upper bound on points handed to a scatter plot.
pub const PLOT_SAMPLE: usize = 300;

const INFLATION_R_SQUARED: f64 = 0.7;
const INFLATION_PCT: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightDataPoint {
    pub provider: String,
    pub awb: String,
    pub declared_weight_g: f64,
    pub billed_weight_g: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub provider: String,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub avg_overcharge_pct: f64,
    pub point_count: usize,
}

/// Weight points from a normalized invoice. Rows with neither weight are
/// skipped.
pub fn points_from_shipments(
    provider: &str,
    shipments: &[Shipment],
    at: DateTime<Utc>,
) -> Vec<WeightDataPoint> {
    shipments
        .iter()
        .filter(|s| s.actual_weight > 0.0 || s.billed_weight > 0.0)
        .map(|s| WeightDataPoint {
            provider: provider.to_string(),
            awb: s.awb.clone(),
            declared_weight_g: s.actual_weight * 1000.0,
            billed_weight_g: s.billed_weight * 1000.0,
            timestamp: at,
        })
        .collect()
}

/// Ordinary least squares fit of billed on declared weight.
///
/// Returns `None` for fewer than [`MIN_POINTS`] points or when every
/// declared weight is the same.
pub fn fit(points: &[WeightDataPoint]) -> Option<RegressionResult> {
    let n = points.len();
    if n < MIN_POINTS {
        return None;
    }
    let nf = n as f64;

    let (mut sx, mut sy, mut sxy, mut sxx) = (0.0, 0.0, 0.0, 0.0);
    for p in points {
        let (x, y) = (p.declared_weight_g, p.billed_weight_g);
        sx += x;
        sy += y;
        sxy += x * y;
        sxx += x * x;
    }

    let denom = nf * sxx - sx * sx;
    if denom == 0.0 {
        return None;
    }
    let slope = (nf * sxy - sx * sy) / denom;
    let intercept = (sy - slope * sx) / nf;

    let mean_y = sy / nf;
    let (mut ss_tot, mut ss_res) = (0.0, 0.0);
    for p in points {
        let predicted = slope * p.declared_weight_g + intercept;
        ss_tot += (p.billed_weight_g - mean_y).powi(2);
        ss_res += (p.billed_weight_g - predicted).powi(2);
    }
    let r_squared = if ss_tot == 0.0 {
        1.0
    } else {
        1.0 - ss_res / ss_tot
    };

    let pcts: Vec<f64> = points
        .iter()
        .filter(|p| p.declared_weight_g > 0.0)
        .map(|p| (p.billed_weight_g - p.declared_weight_g) / p.declared_weight_g * 100.0)
        .collect();
    let avg_overcharge_pct = if pcts.is_empty() {
        0.0
    } else {
        pcts.iter().sum::<f64>() / pcts.len() as f64
    };

    Some(RegressionResult {
        provider: points[0].provider.clone(),
        slope: round4(slope),
        intercept: round2(intercept),
        r_squared: round4(r_squared),
        avg_overcharge_pct: round2(avg_overcharge_pct),
        point_count: n,
    })
}

/// Evenly strided subsample of at most `max` points, for plotting only.
pub fn sample_for_plot(points: &[WeightDataPoint], max: usize) -> Vec<WeightDataPoint> {
    if max == 0 {
        return Vec::new();
    }
    if points.len() <= max {
        return points.to_vec();
    }
    let step = points.len() as f64 / max as f64;
    (0..max)
        .map(|i| points[(i as f64 * step) as usize].clone())
        .collect()
}

/// Strong linear fit with a meaningful average overcharge.
pub fn is_systematic_inflation(result: &RegressionResult) -> bool {
    result.r_squared >= INFLATION_R_SQUARED && result.avg_overcharge_pct >= INFLATION_PCT
}

/// Persistent weight observations, capped FIFO across all providers.
pub struct WeightTracker<S: Storage> {
    store: S,
}

impl<S: Storage> WeightTracker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn append(&mut self, points: Vec<WeightDataPoint>) {
        if points.is_empty() {
            return;
        }
        log::debug!("appending {} weight points", points.len());
        append_capped(&mut self.store, WEIGHT_POINTS_KEY, points, MAX_WEIGHT_POINTS);
    }

    pub fn load(&self) -> Vec<WeightDataPoint> {
        load_list(&self.store, WEIGHT_POINTS_KEY)
    }

    pub fn clear(&mut self) {
        clear_list(&mut self.store, WEIGHT_POINTS_KEY);
    }

    pub fn by_provider(&self) -> BTreeMap<String, Vec<WeightDataPoint>> {
        let mut grouped: BTreeMap<String, Vec<WeightDataPoint>> = BTreeMap::new();
        for p in self.load() {
            grouped.entry(p.provider.clone()).or_default().push(p);
        }
        grouped
    }

    pub fn analyze(&self, provider: &str) -> Option<RegressionResult> {
        let points: Vec<WeightDataPoint> = self
            .load()
            .into_iter()
            .filter(|p| p.provider == provider)
            .collect();
        fit(&points)
    }

    /// Fit every provider with enough data.
    pub fn analyze_all(&self) -> Vec<RegressionResult> {
        self.by_provider()
            .values()
            .filter_map(|points| fit(points))
            .collect()
    }
}
