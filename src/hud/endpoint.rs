// SPDX-License-Identifier: MIT
use std::os::fd::{AsRawFd, OwnedFd};
use std::path::{Path, PathBuf};

use anyhow::Context;
use nix::fcntl::{FcntlArg, OFlag, fcntl};
use nix::sys::socket::{AddressFamily, SockFlag, SockType, UnixAddr, connect, socket};

/// Socket name prefix the producer uses; the full name is
/// `<prefix><decimal pid>` in the abstract namespace.
pub const SOCKET_PREFIX: &str = "mangohud_fps-";

/// Default registry of local-domain sockets on Linux.
pub const DEFAULT_REGISTRY: &str = "/proc/net/unix";

/// Scans the local socket registry for a producer endpoint.
///
/// The registry lists every local-domain socket, one per line; abstract
/// names show up with a leading `@`. The locator only parses names, it does
/// not check that the owning process is alive or connectable.
pub struct EndpointLocator {
    registry: PathBuf,
    prefix: String,
}

impl EndpointLocator {
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(DEFAULT_REGISTRY, SOCKET_PREFIX)
    }

    #[must_use]
    pub fn with_registry(registry: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            registry: registry.into(),
            prefix: prefix.into(),
        }
    }

    /// Returns the pid encoded in the first matching registry entry.
    ///
    /// An unreadable registry (missing file, permission) and a registry with
    /// no matching entry both mean "no producer running" and yield `None`.
    #[must_use]
    pub fn find_producer(&self) -> Option<u32> {
        let content = match std::fs::read_to_string(&self.registry) {
            Ok(content) => content,
            Err(err) => {
                log::debug!(
                    "socket registry {} unreadable: {err}",
                    self.registry.display()
                );
                return None;
            }
        };

        content
            .lines()
            .find_map(|line| parse_registry_line(line, &self.prefix))
    }

    #[must_use]
    pub fn registry(&self) -> &Path {
        &self.registry
    }
}

impl Default for EndpointLocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts a pid from a registry line containing `<prefix><digits>`.
fn parse_registry_line(line: &str, prefix: &str) -> Option<u32> {
    let start = line.find(prefix)? + prefix.len();
    let rest = &line[start..];
    let digits: &str = &rest[..rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len())];
    digits.parse().ok()
}

/// Opens a non-blocking stream connection to a producer endpoint.
///
/// The addressing scheme is OS-specific; the connection state machine only
/// sees this seam, so porting means providing another implementation.
pub trait EndpointConnector {
    /// Connects to the endpoint of the given producer.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is missing, refuses the connection,
    /// or the socket cannot be set up. Callers treat this as transient.
    fn connect(&self, producer_id: u32) -> anyhow::Result<OwnedFd>;
}

/// Linux implementation: abstract-namespace `AF_UNIX` stream socket.
pub struct AbstractSocketConnector {
    prefix: String,
}

impl AbstractSocketConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::with_prefix(SOCKET_PREFIX)
    }

    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for AbstractSocketConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointConnector for AbstractSocketConnector {
    fn connect(&self, producer_id: u32) -> anyhow::Result<OwnedFd> {
        let name = format!("{}{producer_id}", self.prefix);
        let addr = UnixAddr::new_abstract(name.as_bytes())
            .with_context(|| format!("invalid abstract socket name {name}"))?;

        let fd = socket(
            AddressFamily::Unix,
            SockType::Stream,
            SockFlag::empty(),
            None,
        )
        .context("failed to create socket")?;

        connect(fd.as_raw_fd(), &addr)
            .with_context(|| format!("failed to connect to @{name}"))?;

        // All reads must be drain-style; a blocking fd would stall the
        // caller's poll tick.
        let flags = fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL)
            .context("failed to read socket flags")?;
        let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFL(flags))
            .context("failed to set socket non-blocking")?;

        Ok(fd)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parse_line_with_abstract_name() {
        let line = "0000000000000000: 00000002 00000000 00010000 0001 01 44379 @mangohud_fps-12345";
        assert_eq!(parse_registry_line(line, SOCKET_PREFIX), Some(12_345));
    }

    #[test]
    fn parse_line_without_match() {
        let line = "0000000000000000: 00000002 00000000 00010000 0001 01 44379 /run/user/1000/bus";
        assert_eq!(parse_registry_line(line, SOCKET_PREFIX), None);
    }

    #[test]
    fn parse_line_with_prefix_but_no_pid() {
        let line = "0000000000000000: 00000002 00000000 00010000 0001 01 44379 @mangohud_fps-";
        assert_eq!(parse_registry_line(line, SOCKET_PREFIX), None);
    }

    #[test]
    fn parse_line_stops_at_non_digit() {
        let line = "... @mangohud_fps-777.bak";
        assert_eq!(parse_registry_line(line, SOCKET_PREFIX), Some(777));
    }

    #[test]
    fn find_producer_returns_first_match() {
        let path = std::env::temp_dir().join(format!(
            "mangotap-registry-first-{}",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Num RefCount Protocol Flags Type St Inode Path").unwrap();
        writeln!(file, "...: 0001 01 100 /tmp/other.sock").unwrap();
        writeln!(file, "...: 0001 01 101 @mangohud_fps-4242").unwrap();
        writeln!(file, "...: 0001 01 102 @mangohud_fps-9999").unwrap();

        let locator = EndpointLocator::with_registry(&path, SOCKET_PREFIX);
        assert_eq!(locator.find_producer(), Some(4242));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn find_producer_missing_registry_is_none() {
        let locator =
            EndpointLocator::with_registry("/nonexistent/mangotap-registry", SOCKET_PREFIX);
        assert_eq!(locator.find_producer(), None);
    }
}
