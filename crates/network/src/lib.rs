//! Network command surface.
//!
//! [`NetworkManager`] tracks the session mode and throttles traffic to a fixed tick
//! rate. The wire itself is a pluggable [`NetworkTransport`]; the bundled
//! [`LoopbackTransport`] keeps everything in-process.

use anyhow::{bail, Result};
use std::collections::VecDeque;

/// Sends per second while a session is open.
pub const NETWORK_TICK_RATE: f32 = 20.0;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5555;

/// Received messages kept for scripts. Older ones are dropped first.
pub const INBOX_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkMode {
    #[default]
    None,
    Host,
    Client,
}

/// One application-level message.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkMessage {
    pub channel: String,
    pub payload: String,
}

/// The wire under the manager.
pub trait NetworkTransport {
    fn listen(&mut self, host: &str, port: u16) -> Result<()>;
    fn connect(&mut self, host: &str, port: u16) -> Result<()>;
    fn send(&mut self, message: &NetworkMessage) -> Result<()>;
    /// Messages received since the last call.
    fn receive(&mut self) -> Vec<NetworkMessage>;
    fn close(&mut self);
}

/// In-process transport: everything sent is received back on the next poll.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    open: bool,
    queue: VecDeque<NetworkMessage>,
}

impl NetworkTransport for LoopbackTransport {
    fn listen(&mut self, _host: &str, port: u16) -> Result<()> {
        if port == 0 {
            bail!("port 0 is not a valid listen port");
        }
        self.open = true;
        Ok(())
    }

    fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        if host.is_empty() || port == 0 {
            bail!("invalid address {}:{}", host, port);
        }
        self.open = true;
        Ok(())
    }

    fn send(&mut self, message: &NetworkMessage) -> Result<()> {
        if !self.open {
            bail!("transport is closed");
        }
        self.queue.push_back(message.clone());
        Ok(())
    }

    fn receive(&mut self) -> Vec<NetworkMessage> {
        self.queue.drain(..).collect()
    }

    fn close(&mut self) {
        self.open = false;
        self.queue.clear();
    }
}

/// Session state and buffered traffic.
pub struct NetworkManager {
    transport: Box<dyn NetworkTransport>,
    mode: NetworkMode,
    host: String,
    port: u16,
    outbox: Vec<NetworkMessage>,
    inbox: Vec<NetworkMessage>,
    tick_timer: f32,
    tick_interval: f32,
}

impl Default for NetworkManager {
    fn default() -> Self {
        Self::new(Box::new(LoopbackTransport::default()), DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl NetworkManager {
    pub fn new(transport: Box<dyn NetworkTransport>, default_host: &str, default_port: u16) -> Self {
        Self {
            transport,
            mode: NetworkMode::None,
            host: default_host.to_string(),
            port: default_port,
            outbox: Vec::new(),
            inbox: Vec::new(),
            tick_timer: 0.0,
            tick_interval: 1.0 / NETWORK_TICK_RATE,
        }
    }

    pub fn mode(&self) -> NetworkMode {
        self.mode
    }

    pub fn is_hosting(&self) -> bool {
        self.mode == NetworkMode::Host
    }

    pub fn is_client(&self) -> bool {
        self.mode == NetworkMode::Client
    }

    /// Address of the current (or last) session.
    pub fn address(&self) -> (&str, u16) {
        (&self.host, self.port)
    }

    /// Open a host session. `None` keeps the configured default.
    pub fn start_host(&mut self, host: Option<&str>, port: Option<u16>) -> bool {
        self.start(NetworkMode::Host, host, port)
    }

    pub fn start_client(&mut self, host: Option<&str>, port: Option<u16>) -> bool {
        self.start(NetworkMode::Client, host, port)
    }

    fn start(&mut self, mode: NetworkMode, host: Option<&str>, port: Option<u16>) -> bool {
        if self.mode != NetworkMode::None {
            log::warn!("Network session already running as {:?}; stop it first", self.mode);
            return false;
        }
        if let Some(host) = host {
            self.host = host.to_string();
        }
        if let Some(port) = port {
            self.port = port;
        }
        let result = match mode {
            NetworkMode::Host => self.transport.listen(&self.host, self.port),
            _ => self.transport.connect(&self.host, self.port),
        };
        match result {
            Ok(()) => {
                self.mode = mode;
                self.tick_timer = 0.0;
                log::info!("Network {:?} started on {}:{}", mode, self.host, self.port);
                true
            }
            Err(err) => {
                log::warn!("Failed to start network {:?} on {}:{}: {}", mode, self.host, self.port, err);
                false
            }
        }
    }

    /// Close the session and drop buffered traffic. Safe to call when idle.
    pub fn stop(&mut self) {
        if self.mode == NetworkMode::None {
            return;
        }
        self.transport.close();
        self.mode = NetworkMode::None;
        self.outbox.clear();
        self.inbox.clear();
        log::info!("Network manager stopped.");
    }

    /// Queue a message for the next network tick. Returns `false` with no session open.
    pub fn send(&mut self, channel: &str, payload: &str) -> bool {
        if self.mode == NetworkMode::None {
            log::info!("[local {}] {}", channel, payload);
            return false;
        }
        self.outbox.push(NetworkMessage {
            channel: channel.to_string(),
            payload: payload.to_string(),
        });
        true
    }

    /// Flush and poll at the tick rate.
    pub fn update(&mut self, dt: f32) {
        if self.mode == NetworkMode::None {
            return;
        }
        self.tick_timer += dt;
        if self.tick_timer < self.tick_interval {
            return;
        }
        self.tick_timer = 0.0;

        for message in self.outbox.drain(..) {
            if let Err(err) = self.transport.send(&message) {
                log::warn!("Dropped network message on '{}': {}", message.channel, err);
            }
        }
        self.inbox.extend(self.transport.receive());
        if self.inbox.len() > INBOX_CAPACITY {
            let dropped = self.inbox.len() - INBOX_CAPACITY;
            self.inbox.drain(..dropped);
            log::warn!("Network inbox full, dropped {} unread messages", dropped);
        }
    }

    /// Messages waiting for [`NetworkManager::take_messages`].
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// Take every message received so far.
    pub fn take_messages(&mut self) -> Vec<NetworkMessage> {
        std::mem::take(&mut self.inbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_then_stop() {
        let mut net = NetworkManager::default();
        assert!(net.start_host(None, Some(7000)));
        assert!(net.is_hosting());
        assert_eq!(net.address(), (DEFAULT_HOST, 7000));
        assert!(!net.start_client(None, None), "one session at a time");
        net.stop();
        assert_eq!(net.mode(), NetworkMode::None);
    }

    #[test]
    fn failure_reports_false() {
        let mut net = NetworkManager::default();
        assert!(!net.start_host(None, Some(0)));
        assert_eq!(net.mode(), NetworkMode::None);
        assert!(!net.send("chat", "hello"));
    }

    #[test]
    fn messages_flow_at_tick_rate() {
        let mut net = NetworkManager::default();
        assert!(net.start_client(Some("localhost"), None));
        assert!(net.send("chat", "hi"));

        net.update(0.01);
        assert!(net.take_messages().is_empty());

        net.update(0.05);
        let received = net.take_messages();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].payload, "hi");
    }

    #[test]
    fn unread_messages_are_capped() {
        let mut net = NetworkManager::default();
        assert!(net.start_host(None, None));
        for round in 0..3 {
            for i in 0..200 {
                assert!(net.send("spam", &format!("{round}:{i}")));
            }
            net.update(0.1);
            assert!(net.pending() <= INBOX_CAPACITY);
        }
        let received = net.take_messages();
        assert_eq!(received.len(), INBOX_CAPACITY);
        assert_eq!(received.last().map(|m| m.payload.as_str()), Some("2:199"));
        assert_eq!(net.pending(), 0);
    }
}
