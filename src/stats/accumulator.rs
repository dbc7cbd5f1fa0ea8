//! Streaming min / max / mean accumulators

use super::MetricSummary;

/// Running statistics over a stream of values
#[derive(Debug, Clone)]
pub struct RollingStats {
    sum: f64,
    count: usize,
    min_value: f64,
    max_value: f64,
}

impl RollingStats {
    pub fn new() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            min_value: f64::INFINITY,
            max_value: f64::NEG_INFINITY,
        }
    }

    /// Non-finite values are ignored
    pub fn add_value(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }

        self.sum += value;
        self.count += 1;

        if value < self.min_value {
            self.min_value = value;
        }
        if value > self.max_value {
            self.max_value = value;
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max_value)
    }

    /// Summary, or `None` when nothing was added
    pub fn summary(&self) -> Option<MetricSummary> {
        Some(MetricSummary {
            count: self.count,
            min: (self.count > 0).then_some(self.min_value)?,
            max: self.max_value,
            mean: self.average()?,
        })
    }
}

impl Default for RollingStats {
    fn default() -> Self {
        Self::new()
    }
}

impl Extend<f64> for RollingStats {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.add_value(value);
        }
    }
}
