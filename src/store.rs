// SPDX-License-Identifier: MIT
use std::collections::{HashMap, VecDeque};

/// Depth of every rolling history (one minute at the nominal 1 Hz poll).
pub const HISTORY_DEPTH: usize = 60;

/// Known snapshot field names.
pub mod field {
    pub const FPS: &str = "fps";
    pub const FPS_AVG: &str = "fps_avg";
    pub const FPS_1_PERCENT_LOW: &str = "fps_1_percent_low";
    pub const FPS_0_1_PERCENT_LOW: &str = "fps_0_1_percent_low";
    pub const FRAMETIME: &str = "frametime";
    pub const GPU_LOAD: &str = "gpu_load";
    pub const GPU_TEMP: &str = "gpu_temp";
    pub const GPU_JUNCTION_TEMP: &str = "gpu_junction_temp";
    pub const GPU_POWER: &str = "gpu_power";
    pub const CPU_LOAD: &str = "cpu_load";
    pub const CPU_TEMP: &str = "cpu_temp";
    pub const CPU_POWER: &str = "cpu_power";
    pub const GPU_VRAM_USED: &str = "gpu_vram_used";
}

/// Fields that keep a rolling history for line graphs.
pub const HISTORY_FIELDS: [&str; 5] = [
    field::FPS,
    field::GPU_LOAD,
    field::GPU_TEMP,
    field::GPU_JUNCTION_TEMP,
    field::GPU_POWER,
];

/// Fixed-depth FIFO of samples, NaN-prefilled so a graph of an idle field
/// renders as "no data" rather than a flat zero line.
///
/// The length is always exactly the construction capacity; a push appends
/// one value and evicts the oldest.
pub struct RollingHistory {
    samples: VecDeque<f64>,
}

impl RollingHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut samples = VecDeque::with_capacity(capacity);
        samples.resize(capacity, f64::NAN);
        Self { samples }
    }

    pub fn push(&mut self, value: f64) {
        self.samples.pop_front();
        self.samples.push_back(value);
    }

    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Latest snapshot of all known fields plus one rolling history per tracked
/// field. Written by the single ingestion path, read by every facade.
pub struct MetricsStore {
    snapshot: HashMap<&'static str, f64>,
    histories: HashMap<&'static str, RollingHistory>,
}

impl MetricsStore {
    #[must_use]
    pub fn new() -> Self {
        let histories = HISTORY_FIELDS
            .iter()
            .map(|&name| (name, RollingHistory::new(HISTORY_DEPTH)))
            .collect();
        Self {
            snapshot: HashMap::new(),
            histories,
        }
    }

    /// Replaces the snapshot wholesale and advances every tracked history,
    /// pushing NaN for fields absent from this update.
    pub fn update(&mut self, fields: HashMap<&'static str, f64>) {
        for (name, history) in &mut self.histories {
            history.push(fields.get(name).copied().unwrap_or(f64::NAN));
        }
        self.snapshot = fields;
    }

    /// Latest value of a field; `None` means unknown, not zero.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<f64> {
        self.snapshot.get(field).copied()
    }

    /// Rolling history of a field, always [`HISTORY_DEPTH`] entries;
    /// NaN-filled for fields without a tracked history.
    #[must_use]
    pub fn history(&self, field: &str) -> Vec<f64> {
        self.histories
            .get(field)
            .map_or_else(|| vec![f64::NAN; HISTORY_DEPTH], RollingHistory::values)
    }
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_starts_full_of_nan() {
        let history = RollingHistory::new(HISTORY_DEPTH);
        let values = history.values();
        assert_eq!(values.len(), HISTORY_DEPTH);
        assert!(values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn push_preserves_length() {
        let mut history = RollingHistory::new(HISTORY_DEPTH);
        for i in 0..10 {
            history.push(f64::from(i));
            assert_eq!(history.len(), HISTORY_DEPTH);
        }
    }

    #[test]
    fn capacity_pushes_evict_all_sentinels() {
        let mut history = RollingHistory::new(HISTORY_DEPTH);
        #[allow(clippy::cast_precision_loss)]
        for i in 0..HISTORY_DEPTH {
            history.push(i as f64);
        }
        let values = history.values();
        assert!(values.iter().all(|v| !v.is_nan()));
        assert!((values[0] - 0.0).abs() < f64::EPSILON);
        assert!((values[HISTORY_DEPTH - 1] - 59.0).abs() < f64::EPSILON);
    }

    #[test]
    fn oldest_value_is_evicted_first() {
        let mut history = RollingHistory::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            history.push(v);
        }
        assert_eq!(history.values(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn update_replaces_snapshot_wholesale() {
        let mut store = MetricsStore::new();
        store.update(HashMap::from([(field::FPS, 60.0), (field::FPS_AVG, 58.0)]));
        store.update(HashMap::from([(field::FPS, 61.0)]));

        assert_eq!(store.get(field::FPS), Some(61.0));
        // fps_avg was absent from the second update: unknown, not stale.
        assert_eq!(store.get(field::FPS_AVG), None);
    }

    #[test]
    fn absent_history_field_gets_sentinel() {
        let mut store = MetricsStore::new();
        store.update(HashMap::from([(field::FPS, 60.0)]));

        let fps = store.history(field::FPS);
        assert!((fps[HISTORY_DEPTH - 1] - 60.0).abs() < f64::EPSILON);

        let gpu = store.history(field::GPU_LOAD);
        assert!(gpu[HISTORY_DEPTH - 1].is_nan());
    }

    #[test]
    fn untracked_field_history_is_sentinel_filled() {
        let store = MetricsStore::new();
        let values = store.history(field::CPU_LOAD);
        assert_eq!(values.len(), HISTORY_DEPTH);
        assert!(values.iter().all(|v| v.is_nan()));
    }
}
