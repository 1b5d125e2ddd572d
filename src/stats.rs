// SPDX-License-Identifier: MIT
use std::collections::VecDeque;
use std::time::Instant;

use crate::hud::wire::FpsPacket;

/// Depth of the reconstructed per-frame time buffer.
pub const SAMPLE_BUFFER_DEPTH: usize = 1000;

/// Upper bound on samples appended by a single ingest, so a long gap in
/// polling cannot flood the buffer with one huge frame delta.
const MAX_SAMPLES_PER_INGEST: u32 = 200;

const ONE_PERCENT_MIN_SAMPLES: usize = 100;
const ZERO_ONE_PERCENT_MIN_SAMPLES: usize = 1000;

/// Percentile-based low frame rates. Zero until enough samples exist.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LowFpsResult {
    pub one_percent_low_fps: f64,
    pub zero_one_percent_low_fps: f64,
}

/// Reconstructs an approximate per-frame time series from periodic
/// observations of the producer's monotonic frame counter and derives
/// 1% / 0.1% low frame rates from it.
///
/// Exact per-frame times are unrecoverable at the polling rate used, so
/// each observed interval is spread evenly across the frames it covered.
pub struct FrameTimeStatistics {
    samples: VecDeque<f64>,
    previous: Option<(u32, Instant)>,
    one_percent_low: Option<f64>,
    zero_one_percent_low: Option<f64>,
}

impl FrameTimeStatistics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(SAMPLE_BUFFER_DEPTH),
            previous: None,
            one_percent_low: None,
            zero_one_percent_low: None,
        }
    }

    /// Feeds one observation of the producer's counter into the buffer.
    ///
    /// A counter that did not increase (stall, producer restart, wrap) only
    /// re-bases the pair; nothing is appended.
    pub fn ingest(&mut self, packet: &FpsPacket, observed_at: Instant) {
        let Some((prev_count, prev_at)) = self.previous.replace((packet.frame_count, observed_at))
        else {
            return;
        };

        if packet.frame_count <= prev_count {
            return;
        }
        let frames_rendered = packet.frame_count - prev_count;

        let elapsed = observed_at.saturating_duration_since(prev_at);
        if elapsed.is_zero() {
            return;
        }

        let avg_frametime_ms = elapsed.as_secs_f64() * 1000.0 / f64::from(frames_rendered);
        for _ in 0..frames_rendered.min(MAX_SAMPLES_PER_INGEST) {
            if self.samples.len() == SAMPLE_BUFFER_DEPTH {
                self.samples.pop_front();
            }
            self.samples.push_back(avg_frametime_ms);
        }

        self.recompute_lows();
    }

    fn recompute_lows(&mut self) {
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        // Worst frame first.
        sorted.sort_by(|a, b| b.total_cmp(a));

        let n = sorted.len();
        if n >= ONE_PERCENT_MIN_SAMPLES {
            self.one_percent_low = Some(low_fps(&sorted, n / 100));
        }
        if n >= ZERO_ONE_PERCENT_MIN_SAMPLES {
            self.zero_one_percent_low = Some(low_fps(&sorted, n / 1000));
        }
    }

    /// 1% low FPS, or `None` while fewer than 100 samples have ever been
    /// collected.
    #[must_use]
    pub fn one_percent_low(&self) -> Option<f64> {
        self.one_percent_low
    }

    /// 0.1% low FPS, or `None` while fewer than 1000 samples have ever been
    /// collected.
    #[must_use]
    pub fn zero_one_percent_low(&self) -> Option<f64> {
        self.zero_one_percent_low
    }

    /// Mean frame rate over the whole sample buffer.
    #[must_use]
    pub fn average_fps(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
        if mean > 0.0 { Some(1000.0 / mean) } else { Some(0.0) }
    }

    #[must_use]
    pub fn lows(&self) -> LowFpsResult {
        LowFpsResult {
            one_percent_low_fps: self.one_percent_low.unwrap_or(0.0),
            zero_one_percent_low_fps: self.zero_one_percent_low.unwrap_or(0.0),
        }
    }

    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl Default for FrameTimeStatistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Average of the `max(1, count)` worst frame times, inverted to FPS.
/// A zero average (degenerate input) maps to 0 FPS, not a division fault.
fn low_fps(sorted_desc: &[f64], count: usize) -> f64 {
    let count = count.max(1);
    #[allow(clippy::cast_precision_loss)]
    let avg_ms = sorted_desc[..count].iter().sum::<f64>() / count as f64;
    if avg_ms > 0.0 { 1000.0 / avg_ms } else { 0.0 }
}
