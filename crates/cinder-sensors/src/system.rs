//! System telemetry sensor
//!
//! Coarse host-activity heuristics: sustained CPU load and an unusual
//! process population both nudge the score upward. Deliberately blunt -
//! this sensor exists to contribute background signal, not to diagnose.

use std::sync::Mutex;

use cinder_core::Sensor;
use sysinfo::{ProcessesToUpdate, System};

/// CPU usage above this contributes the large step.
const CPU_HIGH: f32 = 80.0;
const CPU_ELEVATED: f32 = 50.0;

/// Process counts above these contribute smaller steps.
const PROCS_HIGH: usize = 600;
const PROCS_ELEVATED: usize = 400;

pub struct SystemLoadSensor {
    weight: f64,
    system: Mutex<System>,
}

impl SystemLoadSensor {
    pub fn new() -> Self {
        Self::with_weight(1.0)
    }

    pub fn with_weight(weight: f64) -> Self {
        Self {
            weight,
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemLoadSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Sensor for SystemLoadSensor {
    fn name(&self) -> &str {
        "system telemetry"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self) -> anyhow::Result<f64> {
        let mut sys = self
            .system
            .lock()
            .map_err(|_| anyhow::anyhow!("telemetry state poisoned"))?;

        let mut threat = 0.0;

        // CPU usage is measured across calls; the first reading is 0.
        sys.refresh_cpu_usage();
        let cpu = sys.global_cpu_usage();
        if cpu > CPU_HIGH {
            threat += 0.4;
        } else if cpu > CPU_ELEVATED {
            threat += 0.2;
        }

        sys.refresh_processes(ProcessesToUpdate::All, true);
        let procs = sys.processes().len();
        if procs > PROCS_HIGH {
            threat += 0.3;
        } else if procs > PROCS_ELEVATED {
            threat += 0.1;
        }

        Ok(f64::min(threat, 1.0))
    }
}
