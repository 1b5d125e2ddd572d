// SPDX-License-Identifier: MIT
use std::sync::Arc;

use crate::hub::SharedHub;
use crate::store::{HISTORY_DEPTH, field};

/// Placeholder shown while disconnected or before a value exists. Same
/// width as a formatted value so a redraw fully overwrites the old text.
pub const PLACEHOLDER: &str = "---";

/// Read-only view over one named metric, the contract the display layer
/// polls on its own interval. Every method degrades to a safe default;
/// none of them blocks or fails.
pub trait MetricSource {
    /// Current value; 0 when unavailable.
    fn numeric(&self) -> f64;
    /// Fixed-width text rendering of the current value.
    fn text(&self) -> String;
    /// Rolling history, always [`HISTORY_DEPTH`] entries.
    fn history(&self) -> Vec<f64>;
}

/// Facade over one field of the shared hub.
pub struct FieldSensor {
    hub: SharedHub,
    field: &'static str,
}

impl FieldSensor {
    #[must_use]
    pub fn new(hub: SharedHub, field: &'static str) -> Self {
        Self { hub, field }
    }

    #[must_use]
    pub fn fps(hub: &SharedHub) -> Self {
        Self::new(Arc::clone(hub), field::FPS)
    }

    #[must_use]
    pub fn fps_avg(hub: &SharedHub) -> Self {
        Self::new(Arc::clone(hub), field::FPS_AVG)
    }

    #[must_use]
    pub fn one_percent_low(hub: &SharedHub) -> Self {
        Self::new(Arc::clone(hub), field::FPS_1_PERCENT_LOW)
    }

    #[must_use]
    pub fn zero_one_percent_low(hub: &SharedHub) -> Self {
        Self::new(Arc::clone(hub), field::FPS_0_1_PERCENT_LOW)
    }

    #[must_use]
    pub fn gpu_load(hub: &SharedHub) -> Self {
        Self::new(Arc::clone(hub), field::GPU_LOAD)
    }

    #[must_use]
    pub fn gpu_temp(hub: &SharedHub) -> Self {
        Self::new(Arc::clone(hub), field::GPU_TEMP)
    }

    #[must_use]
    pub fn gpu_junction_temp(hub: &SharedHub) -> Self {
        Self::new(Arc::clone(hub), field::GPU_JUNCTION_TEMP)
    }

    #[must_use]
    pub fn gpu_power(hub: &SharedHub) -> Self {
        Self::new(Arc::clone(hub), field::GPU_POWER)
    }

    #[must_use]
    pub fn cpu_load(hub: &SharedHub) -> Self {
        Self::new(Arc::clone(hub), field::CPU_LOAD)
    }

    #[must_use]
    pub fn cpu_temp(hub: &SharedHub) -> Self {
        Self::new(Arc::clone(hub), field::CPU_TEMP)
    }

    #[must_use]
    pub fn cpu_power(hub: &SharedHub) -> Self {
        Self::new(Arc::clone(hub), field::CPU_POWER)
    }

    #[must_use]
    pub fn gpu_vram_used(hub: &SharedHub) -> Self {
        Self::new(Arc::clone(hub), field::GPU_VRAM_USED)
    }

    #[must_use]
    pub fn connected(&self) -> bool {
        self.hub.lock().is_ok_and(|hub| hub.connected())
    }

    #[must_use]
    pub fn producer_id(&self) -> Option<u32> {
        self.hub.lock().ok().and_then(|hub| hub.producer_id())
    }

    fn current(&self) -> Option<f64> {
        let Ok(mut hub) = self.hub.lock() else {
            return None;
        };
        hub.refresh();
        if !hub.connected() {
            return None;
        }
        hub.get(self.field).filter(|v| v.is_finite())
    }
}

impl MetricSource for FieldSensor {
    fn numeric(&self) -> f64 {
        self.current().unwrap_or(0.0)
    }

    fn text(&self) -> String {
        match self.current() {
            #[allow(clippy::cast_possible_truncation)] // rounded first
            Some(value) => format!("{:>3}", value.round() as i64),
            None => PLACEHOLDER.to_string(),
        }
    }

    fn history(&self) -> Vec<f64> {
        self.hub.lock().map_or_else(
            |_| vec![f64::NAN; HISTORY_DEPTH],
            |hub| hub.history(self.field),
        )
    }
}
