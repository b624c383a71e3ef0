//! Threat aggregation
//!
//! Pluggable sensors each report a normalized threat score with a
//! static weight; the aggregator folds them into one weighted mean and
//! raises a breach signal when the mean meets the threshold. The
//! aggregator knows nothing about sessions - whoever registers the
//! breach handler decides what a breach costs.

use tracing::warn;

/// A pluggable threat source.
///
/// Sensors are independent: no sensor may observe another's state, and
/// a sensor that fails to probe is scored as 0 for that evaluation
/// rather than aborting the aggregate.
pub trait Sensor: Send + Sync {
    /// Human-readable name, used only for diagnostics.
    fn name(&self) -> &str;

    /// Static aggregation weight. Must be positive.
    fn weight(&self) -> f64;

    /// Current threat score in `[0.0, 1.0]`.
    fn score(&self) -> anyhow::Result<f64>;
}

type BreachHandler = Box<dyn Fn(f64) + Send + Sync>;

/// Weighted-mean threat aggregator.
pub struct ThreatAggregator {
    sensors: Vec<Box<dyn Sensor>>,
    threshold: f64,
    current_level: f64,
    on_breach: Option<BreachHandler>,
}

impl ThreatAggregator {
    /// Create an aggregator with a breach threshold in `(0.0, 1.0]`.
    /// Out-of-range values are pulled to the nearest legal threshold.
    pub fn new(threshold: f64) -> Self {
        Self {
            sensors: Vec::new(),
            threshold: threshold.clamp(f64::EPSILON, 1.0),
            current_level: 0.0,
            on_breach: None,
        }
    }

    /// Register a sensor. The set only grows; there is no removal.
    pub fn register_sensor(&mut self, sensor: Box<dyn Sensor>) {
        self.sensors.push(sensor);
    }

    /// Register the handler invoked on every evaluation whose level
    /// meets the threshold. Called synchronously from `evaluate`, with
    /// no aggregator lock held, so the handler may freely burn the
    /// session.
    pub fn set_breach_handler(&mut self, handler: impl Fn(f64) + Send + Sync + 'static) {
        self.on_breach = Some(Box::new(handler));
    }

    /// Number of registered sensors.
    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    /// The level computed by the most recent evaluation.
    pub fn level(&self) -> f64 {
        self.current_level
    }

    /// The configured breach threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Poll every sensor and compute the weighted mean threat level.
    ///
    /// Sensors are polled in registration order. A sensor whose probe
    /// fails contributes a score of 0 for this pass (its weight still
    /// counts) so a stalled probe can never mask a genuine breach from
    /// the others. Fires the breach handler on every qualifying
    /// evaluation, not just the first crossing.
    pub fn evaluate(&mut self) -> f64 {
        if self.sensors.is_empty() {
            self.current_level = 0.0;
            return 0.0;
        }

        let mut total_score = 0.0;
        let mut total_weight = 0.0;

        for sensor in &self.sensors {
            let score = match sensor.score() {
                Ok(s) => s.clamp(0.0, 1.0),
                Err(e) => {
                    warn!(sensor = sensor.name(), error = %e, "sensor probe failed, scoring 0");
                    0.0
                }
            };
            total_score += score * sensor.weight();
            total_weight += sensor.weight();
        }

        self.current_level = if total_weight == 0.0 {
            0.0
        } else {
            (total_score / total_weight).clamp(0.0, 1.0)
        };

        if self.current_level >= self.threshold {
            if let Some(handler) = &self.on_breach {
                handler(self.current_level);
            }
        }

        self.current_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedSensor {
        weight: f64,
        score: f64,
    }

    impl Sensor for FixedSensor {
        fn name(&self) -> &str {
            "fixed"
        }
        fn weight(&self) -> f64 {
            self.weight
        }
        fn score(&self) -> anyhow::Result<f64> {
            Ok(self.score)
        }
    }

    struct BrokenSensor {
        weight: f64,
    }

    impl Sensor for BrokenSensor {
        fn name(&self) -> &str {
            "broken"
        }
        fn weight(&self) -> f64 {
            self.weight
        }
        fn score(&self) -> anyhow::Result<f64> {
            anyhow::bail!("probe unavailable")
        }
    }

    #[test]
    fn test_no_sensors_is_zero() {
        let mut agg = ThreatAggregator::new(0.9);
        assert_eq!(agg.evaluate(), 0.0);
        assert_eq!(agg.level(), 0.0);
    }

    #[test]
    fn test_weighted_mean() {
        let mut agg = ThreatAggregator::new(0.9);
        agg.register_sensor(Box::new(FixedSensor { weight: 1.0, score: 0.2 }));
        agg.register_sensor(Box::new(FixedSensor { weight: 2.0, score: 0.8 }));
        agg.register_sensor(Box::new(FixedSensor { weight: 1.0, score: 0.0 }));

        // (0.2*1 + 0.8*2 + 0.0*1) / 4 = 0.45
        let level = agg.evaluate();
        assert!((level - 0.45).abs() < 1e-9);
        assert_eq!(agg.level(), level);
    }

    #[test]
    fn test_zero_total_weight_is_zero() {
        let mut agg = ThreatAggregator::new(0.9);
        agg.register_sensor(Box::new(FixedSensor { weight: 0.0, score: 1.0 }));
        assert_eq!(agg.evaluate(), 0.0);
    }

    #[test]
    fn test_failing_sensor_scores_zero_without_masking_others() {
        let mut agg = ThreatAggregator::new(0.9);
        agg.register_sensor(Box::new(BrokenSensor { weight: 1.0 }));
        agg.register_sensor(Box::new(FixedSensor { weight: 1.0, score: 1.0 }));

        // (0*1 + 1*1) / 2 = 0.5
        let level = agg.evaluate();
        assert!((level - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_breach_fires_per_qualifying_evaluation() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();

        let mut agg = ThreatAggregator::new(0.9);
        agg.register_sensor(Box::new(FixedSensor { weight: 1.0, score: 0.95 }));
        agg.set_breach_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        agg.evaluate();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Still above threshold: fires again, by policy
        agg.evaluate();
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_threshold_constrained_to_unit_range() {
        assert_eq!(ThreatAggregator::new(1.5).threshold(), 1.0);
        assert!(ThreatAggregator::new(-3.0).threshold() > 0.0);

        // A nonsense negative threshold must not make a quiet system breach
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let mut agg = ThreatAggregator::new(-3.0);
        agg.register_sensor(Box::new(FixedSensor { weight: 1.0, score: 0.0 }));
        agg.set_breach_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        agg.evaluate();
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // And a clamped over-threshold still breaches at full level
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let mut agg = ThreatAggregator::new(1.5);
        agg.register_sensor(Box::new(FixedSensor { weight: 1.0, score: 1.0 }));
        agg.set_breach_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        agg.evaluate();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_breach_below_threshold() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();

        let mut agg = ThreatAggregator::new(0.9);
        agg.register_sensor(Box::new(FixedSensor { weight: 1.0, score: 0.5 }));
        agg.set_breach_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        agg.evaluate();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_breach_handler_receives_level() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let slot = seen.clone();

        let mut agg = ThreatAggregator::new(0.5);
        agg.register_sensor(Box::new(FixedSensor { weight: 1.0, score: 1.0 }));
        agg.set_breach_handler(move |level| {
            *slot.lock().unwrap() = Some(level);
        });

        agg.evaluate();
        assert_eq!(*seen.lock().unwrap(), Some(1.0));
    }
}
