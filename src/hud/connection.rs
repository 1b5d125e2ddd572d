// SPDX-License-Identifier: MIT
use std::os::fd::{AsRawFd, OwnedFd};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::socket::{MsgFlags, recv};

use super::endpoint::{EndpointConnector, EndpointLocator};
use super::wire::{FpsPacket, PACKET_SIZE};

/// Minimum wait between registry scans while no producer is connected.
pub const DISCOVERY_INTERVAL: Duration = Duration::from_secs(5);

enum ConnectionState {
    Disconnected,
    Connected { producer_id: u32, socket: OwnedFd },
}

/// Owns the discovery/connect/disconnect state machine and the one socket
/// handle. All socket reads are non-blocking; every operation is a short
/// synchronous call.
pub struct ConnectionManager {
    locator: EndpointLocator,
    connector: Box<dyn EndpointConnector>,
    state: ConnectionState,
    last_discovery: Option<Instant>,
    last_producer: Option<u32>,
    discovery_interval: Duration,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(locator: EndpointLocator, connector: Box<dyn EndpointConnector>) -> Self {
        Self {
            locator,
            connector,
            state: ConnectionState::Disconnected,
            last_discovery: None,
            last_producer: None,
            discovery_interval: DISCOVERY_INTERVAL,
        }
    }

    /// Idempotently brings the connection up.
    ///
    /// Already connected: returns `true` without rescanning. Disconnected
    /// within the discovery backoff window: returns `false` without
    /// touching the registry. Otherwise scans, tears down any remembered
    /// stale connection if the producer changed, and connects. Connect
    /// failures are transient and reported only as `false`.
    pub fn ensure_connected(&mut self) -> bool {
        if matches!(self.state, ConnectionState::Connected { .. }) {
            return true;
        }

        if let Some(last) = self.last_discovery
            && last.elapsed() < self.discovery_interval
        {
            return false;
        }
        self.last_discovery = Some(Instant::now());

        let Some(producer_id) = self.locator.find_producer() else {
            log::debug!("no producer endpoint in registry");
            return false;
        };

        if self.last_producer.is_some_and(|prev| prev != producer_id) {
            self.disconnect();
        }

        match self.connector.connect(producer_id) {
            Ok(socket) => {
                log::info!("connected to producer {producer_id}");
                self.state = ConnectionState::Connected {
                    producer_id,
                    socket,
                };
                self.last_producer = Some(producer_id);
                true
            }
            Err(err) => {
                log::debug!("connect to producer {producer_id} failed: {err:#}");
                false
            }
        }
    }

    /// Closes the socket if present and resets to disconnected. Closing is
    /// best-effort; the discovery backoff stamp is left untouched.
    pub fn disconnect(&mut self) {
        if let ConnectionState::Connected { producer_id, .. } =
            std::mem::replace(&mut self.state, ConnectionState::Disconnected)
        {
            log::info!("disconnected from producer {producer_id}");
        }
    }

    /// Drains everything currently buffered on the socket and returns the
    /// newest complete frame, if any.
    ///
    /// A zero-length read (peer closed) or a short read forces a
    /// disconnect; a frame already captured in this pass is still returned.
    /// Returns `None` when no new frame has arrived since the last drain;
    /// callers keep their previous value.
    pub fn read_latest_packet(&mut self) -> Option<FpsPacket> {
        let ConnectionState::Connected { socket, .. } = &self.state else {
            return None;
        };
        let fd = socket.as_raw_fd();

        let mut latest = None;
        let mut buf = [0u8; PACKET_SIZE];
        loop {
            match recv(fd, &mut buf, MsgFlags::MSG_DONTWAIT) {
                Ok(0) => {
                    log::debug!("producer closed the connection");
                    self.disconnect();
                    return latest;
                }
                Ok(n) if n == PACKET_SIZE => {
                    latest = FpsPacket::decode(&buf).ok();
                }
                Ok(n) => {
                    log::debug!("short read of {n} bytes, dropping connection");
                    self.disconnect();
                    return latest;
                }
                Err(Errno::EAGAIN) => return latest,
                Err(Errno::EINTR) => {}
                Err(err) => {
                    log::debug!("socket read failed: {err}");
                    self.disconnect();
                    return latest;
                }
            }
        }
    }

    #[must_use]
    pub fn connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected { .. })
    }

    #[must_use]
    pub fn producer_id(&self) -> Option<u32> {
        match self.state {
            ConnectionState::Connected { producer_id, .. } => Some(producer_id),
            ConnectionState::Disconnected => None,
        }
    }
}
