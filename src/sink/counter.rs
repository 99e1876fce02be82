//! Counter sinks: the `metrics` facade and a DogStatsD UDP client.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use metrics::counter;

use super::CounterSink;
use crate::error::Error;

/// Forwards increments to whatever `metrics` recorder the process has
/// installed. Without a recorder every call is a no-op.
#[derive(Clone, Debug, Default)]
pub struct MetricsCounter {
    prefix: Option<String>,
}

impl MetricsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends `prefix.` to every metric name.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: Some(prefix.into()) }
    }

    fn key(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}.{name}"),
            None => name.to_owned(),
        }
    }
}

impl CounterSink for MetricsCounter {
    fn count(&self, name: &str, value: u64) -> Result<(), Error> {
        counter!(self.key(name)).increment(value);
        Ok(())
    }
}

/// Fire-and-forget DogStatsD client.
///
/// Each increment is one `name:value|c` datagram on a non-blocking socket.
/// A full send buffer surfaces as an error instead of stalling the request.
#[derive(Debug)]
pub struct StatsdCounter {
    socket: UdpSocket,
    target: SocketAddr,
    prefix: Option<String>,
}

impl StatsdCounter {
    /// Binds an ephemeral local port and resolves the agent address once.
    pub fn connect(agent: impl ToSocketAddrs) -> Result<Self, Error> {
        let target = agent
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "statsd address did not resolve"))?;
        let local: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket, target, prefix: None })
    }

    /// Prepends `prefix.` to every metric name.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn target(&self) -> SocketAddr { self.target }

    fn datagram(&self, name: &str, value: u64) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}.{name}:{value}|c"),
            None => format!("{name}:{value}|c"),
        }
    }
}

impl CounterSink for StatsdCounter {
    fn count(&self, name: &str, value: u64) -> Result<(), Error> {
        let payload = self.datagram(name, value);
        self.socket
            .send_to(payload.as_bytes(), self.target)
            .map(|_| ())
            .map_err(|e| Error::Sink(format!("statsd send to {}: {e}", self.target)))
    }
}
