// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::hud::connection::ConnectionManager;
use crate::hud::endpoint::{AbstractSocketConnector, EndpointLocator};
use crate::stats::{FrameTimeStatistics, LowFpsResult};
use crate::store::{MetricsStore, field};

/// Suppresses duplicate socket reads when several facades are polled in the
/// same display tick.
const REFRESH_GUARD: Duration = Duration::from_millis(10);

/// One hub is shared by every facade; cloning the `Arc` is the only way to
/// hand it out, so there is exactly one connection and one store per hub.
pub type SharedHub = Arc<Mutex<MetricsHub>>;

/// The single ingestion path: connection, statistics, and store behind one
/// lock. All work happens synchronously inside [`MetricsHub::refresh`];
/// nothing here spawns threads or blocks on I/O.
pub struct MetricsHub {
    conn: ConnectionManager,
    stats: FrameTimeStatistics,
    store: MetricsStore,
    last_refresh: Option<Instant>,
}

impl MetricsHub {
    /// Hub wired to the live system registry and connector.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connection(ConnectionManager::new(
            EndpointLocator::new(),
            Box::new(AbstractSocketConnector::new()),
        ))
    }

    /// Hub over a caller-supplied connection manager (tests, alternate
    /// registries or prefixes).
    #[must_use]
    pub fn with_connection(conn: ConnectionManager) -> Self {
        Self {
            conn,
            stats: FrameTimeStatistics::new(),
            store: MetricsStore::new(),
            last_refresh: None,
        }
    }

    #[must_use]
    pub fn into_shared(self) -> SharedHub {
        Arc::new(Mutex::new(self))
    }

    /// Brings the connection up if possible and folds the newest frame into
    /// the statistics and the store.
    ///
    /// With no new frame (or no producer) the store is left untouched, so
    /// readers keep the previous values. Safe to call at any rate; calls
    /// closer together than the guard interval are no-ops.
    pub fn refresh(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_refresh
            && now.duration_since(last) < REFRESH_GUARD
        {
            return;
        }
        self.last_refresh = Some(now);

        if !self.conn.ensure_connected() {
            return;
        }

        let Some(packet) = self.conn.read_latest_packet() else {
            return;
        };
        self.stats.ingest(&packet, now);

        let mut fields: HashMap<&'static str, f64> = HashMap::new();
        fields.insert(field::FPS, packet.fps);
        fields.insert(field::FRAMETIME, f64::from(packet.frametime_ms));
        if let Some(avg) = self.stats.average_fps() {
            fields.insert(field::FPS_AVG, avg);
        }
        if let Some(low) = self.stats.one_percent_low() {
            fields.insert(field::FPS_1_PERCENT_LOW, low);
        }
        if let Some(low) = self.stats.zero_one_percent_low() {
            fields.insert(field::FPS_0_1_PERCENT_LOW, low);
        }
        self.store.update(fields);
    }

    #[must_use]
    pub fn connected(&self) -> bool {
        self.conn.connected()
    }

    #[must_use]
    pub fn producer_id(&self) -> Option<u32> {
        self.conn.producer_id()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<f64> {
        self.store.get(field)
    }

    #[must_use]
    pub fn history(&self, field: &str) -> Vec<f64> {
        self.store.history(field)
    }

    #[must_use]
    pub fn lows(&self) -> LowFpsResult {
        self.stats.lows()
    }
}

impl Default for MetricsHub {
    fn default() -> Self {
        Self::new()
    }
}
