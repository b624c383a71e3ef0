//! Manual panic latch
//!
//! The operator's kill switch. The sensor itself is just a latch; what
//! flips it (a key press, a signal, a console command) is the driver's
//! business. The weight is high enough that a triggered latch breaches
//! any sane threshold on its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cinder_core::Sensor;

/// Default weight; dominates a typical sensor set outright.
const PANIC_WEIGHT: f64 = 10.0;

/// Latching panic sensor. Clones share the same latch, so the driver
/// keeps one handle to trigger while the aggregator owns another.
#[derive(Clone)]
pub struct PanicSensor {
    triggered: Arc<AtomicBool>,
    weight: f64,
}

impl PanicSensor {
    pub fn new() -> Self {
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            weight: PANIC_WEIGHT,
        }
    }

    /// Flip the latch. Stays at maximum threat until `reset`.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.triggered.store(false, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

impl Default for PanicSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Sensor for PanicSensor {
    fn name(&self) -> &str {
        "panic latch"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self) -> anyhow::Result<f64> {
        Ok(if self.is_triggered() { 1.0 } else { 0.0 })
    }
}
