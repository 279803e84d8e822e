use serde::{Deserialize, Serialize};
use table_lens_common::ProfilingConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64, // sample, n - 1
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
    pub skew: f64,
    pub insight: NumericInsight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericInsight {
    SkewedLow,
    SkewedHigh,
    HighVariance,
    HighlyConsistent,
    Balanced,
}

impl NumericInsight {
    /// Guards are evaluated top to bottom; the first match wins.
    pub fn classify(mean: f64, std: f64, skew: f64, config: &ProfilingConfig) -> Self {
        if skew.abs() > config.skew_threshold {
            if skew > 0.0 {
                NumericInsight::SkewedHigh
            } else {
                NumericInsight::SkewedLow
            }
        } else if std > mean {
            NumericInsight::HighVariance
        } else if std != 0.0 && std < config.consistency_ratio * mean {
            NumericInsight::HighlyConsistent
        } else {
            NumericInsight::Balanced
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NumericInsight::SkewedLow => "heavily skewed toward the low end",
            NumericInsight::SkewedHigh => "heavily skewed toward the high end",
            NumericInsight::HighVariance => "high variance",
            NumericInsight::HighlyConsistent => "highly consistent",
            NumericInsight::Balanced => "balanced",
        }
    }
}

pub struct NumericAccumulator {
    values: Vec<f64>,
    sum: f64,
}

impl NumericAccumulator {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            sum: 0.0,
        }
    }

    pub fn add(&mut self, v: f64) {
        self.values.push(v);
        self.sum += v;
    }

    /// `None` when no values were added.
    pub fn finish(mut self, config: &ProfilingConfig) -> Option<NumericStats> {
        let count = self.values.len();
        if count == 0 {
            return None;
        }
        let n = count as f64;
        let mean = self.sum / n;
        // central moments in a second pass; the raw-sum formulas lose precision
        let (mut m2, mut m3) = (0.0, 0.0);
        for v in &self.values {
            let d = v - mean;
            m2 += d * d;
            m3 += d * d * d;
        }
        let std = if count > 1 { (m2 / (n - 1.0)).sqrt() } else { 0.0 };
        let pop_var = m2 / n;
        let skew = if pop_var > 0.0 {
            (m3 / n) / pop_var.powf(1.5)
        } else {
            0.0
        };
        self.values.sort_by(f64::total_cmp);
        let sorted = &self.values;
        Some(NumericStats {
            count,
            mean,
            std,
            min: sorted[0],
            p25: percentile(sorted, 0.25),
            p50: percentile(sorted, 0.50),
            p75: percentile(sorted, 0.75),
            max: sorted[count - 1],
            skew,
            insight: NumericInsight::classify(mean, std, skew, config),
        })
    }
}

impl Default for NumericAccumulator {
    fn default() -> Self { Self::new() }
}

/// Linear interpolation between closest ranks over sorted, non-empty input.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests_numeric {
    use super::*;

    fn stats(values: &[f64]) -> NumericStats {
        let mut acc = NumericAccumulator::new();
        values.iter().for_each(|v| acc.add(*v));
        acc.finish(&ProfilingConfig::default()).unwrap()
    }

    #[test] fn empty_is_none() { assert!(NumericAccumulator::new().finish(&ProfilingConfig::default()).is_none()); }
    #[test] fn single_value() { let s = stats(&[4.0]); assert_eq!(s.std, 0.0); assert_eq!(s.p50, 4.0); assert_eq!(s.skew, 0.0); }
    #[test] fn quartiles_interpolate() { let s = stats(&[1.0, 2.0, 3.0, 4.0]); assert_eq!(s.p25, 1.75); assert_eq!(s.p50, 2.5); assert_eq!(s.p75, 3.25); }
    #[test] fn sample_std() { let s = stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]); assert!((s.std - 2.138089935).abs() < 1e-6); }
    #[test] fn symmetric_has_zero_skew() { let s = stats(&[1.0, 2.0, 3.0]); assert!(s.skew.abs() < 1e-12); }
    #[test] fn lopsided_is_skewed_high() { let s = stats(&[1.0, 1.0, 1.0, 1.0, 1.0, 2.0]); assert!(s.skew > 1.0); assert_eq!(s.insight, NumericInsight::SkewedHigh); }
    #[test] fn lopsided_low() { let s = stats(&[2.0, 2.0, 2.0, 2.0, 2.0, 1.0]); assert_eq!(s.insight, NumericInsight::SkewedLow); }
    #[test] fn consistent() { let s = stats(&[100.0, 101.0, 99.0, 100.0]); assert_eq!(s.insight, NumericInsight::HighlyConsistent); }
    #[test] fn constant_is_balanced() { let s = stats(&[3.0, 3.0, 3.0]); assert_eq!(s.insight, NumericInsight::Balanced); }
    #[test] fn high_variance() { let s = stats(&[-5.0, 0.0, 5.0]); assert_eq!(s.insight, NumericInsight::HighVariance); }
}
