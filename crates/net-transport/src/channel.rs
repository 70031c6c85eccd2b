//! Encrypted character pump between the console and the link
//!
//! Each character travels as its own 4-byte ciphertext unit. There is no
//! acknowledgement, sequencing or resynchronization: a lost or corrupted
//! byte misaligns every unit after it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crypto_session::CipherSession;
use shared_protocol::{SessionConfig, UNIT_SIZE, WireMessage};
use tracing::{debug, info, trace};

use crate::{Console, Link, LinkExt, TransportResult};

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Traffic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub units_sent: u64,
    pub units_received: u64,
}

/// Data-exchange phase: runs until told to stop
pub struct SecureChannel<L, C> {
    link: L,
    console: C,
    session: CipherSession,
    idle_backoff: Duration,
}

impl<L: Link, C: Console> SecureChannel<L, C> {
    /// Enter data exchange, discarding stale link bytes if configured to
    pub fn new(
        link: L,
        console: C,
        session: CipherSession,
        config: &SessionConfig,
    ) -> TransportResult<Self> {
        let mut channel = Self {
            link,
            console,
            session,
            idle_backoff: config.idle_backoff(),
        };
        if config.drain_on_start {
            channel.drain_link()?;
        }
        Ok(channel)
    }

    /// Drop anything left on the link from the handshake
    pub fn drain_link(&mut self) -> TransportResult<usize> {
        let dropped = self.link.discard_available()?;
        if dropped > 0 {
            debug!(dropped, "Discarded stale link bytes");
        }
        Ok(dropped)
    }

    /// One poll of both directions. Returns whether anything moved.
    pub fn step(&mut self) -> TransportResult<bool> {
        let mut progressed = false;

        if self.link.available()? >= UNIT_SIZE {
            let unit = self.link.read_unit()?;
            let c = self.session.decrypt(unit);
            trace!(unit, "Received unit");
            self.console.write_char(c)?;
            progressed = true;
        }

        if let Some(c) = self.console.read_char()? {
            if c == CR {
                self.echo_and_send(CR)?;
                self.echo_and_send(LF)?;
            } else {
                self.echo_and_send(c)?;
            }
            progressed = true;
        }

        Ok(progressed)
    }

    /// Poll until `stop` is set, backing off while idle
    pub fn run(&mut self, stop: &AtomicBool) -> TransportResult<()> {
        let peer = self.session.peer_key();
        info!(
            role = %self.session.role(),
            peer_exponent = peer.exponent,
            peer_modulus = peer.modulus,
            "Secure channel open"
        );

        while !stop.load(Ordering::Relaxed) {
            if !self.step()? {
                if self.idle_backoff.is_zero() {
                    thread::yield_now();
                } else {
                    thread::sleep(self.idle_backoff);
                }
            }
        }

        let stats = self.stats();
        info!(
            sent = stats.units_sent,
            received = stats.units_received,
            "Secure channel stopped"
        );
        Ok(())
    }

    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            units_sent: self.session.send_count(),
            units_received: self.session.recv_count(),
        }
    }

    pub fn session(&self) -> &CipherSession {
        &self.session
    }

    pub fn into_parts(self) -> (L, C, CipherSession) {
        (self.link, self.console, self.session)
    }

    fn echo_and_send(&mut self, c: u8) -> TransportResult<()> {
        self.console.write_char(c)?;
        let unit = self.session.encrypt(c);
        trace!(unit, "Sending unit");
        self.link.send(&WireMessage::Unit(unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryConsole, MemoryLink};
    use crypto_session::{KeyPair, PublicKey};
    use shared_protocol::Role;

    // 3233 = 61 * 53 and 3763 = 53 * 71
    fn caller_keys() -> KeyPair {
        KeyPair::new(17, 2753, 3233)
    }

    fn listener_keys() -> KeyPair {
        KeyPair::new(11, 331, 3763)
    }

    fn channel_pair() -> (
        SecureChannel<MemoryLink, MemoryConsole>,
        MemoryConsole,
        SecureChannel<MemoryLink, MemoryConsole>,
        MemoryConsole,
    ) {
        let config = SessionConfig::default();
        let (a_link, b_link) = MemoryLink::pair();
        let a_console = MemoryConsole::new();
        let b_console = MemoryConsole::new();

        let a_session = CipherSession::new(
            Role::Caller,
            caller_keys(),
            listener_keys().public_key(),
        )
        .unwrap();
        let b_session = CipherSession::new(
            Role::Listener,
            listener_keys(),
            caller_keys().public_key(),
        )
        .unwrap();

        let a = SecureChannel::new(a_link, a_console.clone(), a_session, &config).unwrap();
        let b = SecureChannel::new(b_link, b_console.clone(), b_session, &config).unwrap();
        (a, a_console, b, b_console)
    }

    #[test]
    fn test_listener_keys_are_consistent() {
        let keys = listener_keys();
        assert_eq!(keys.decrypt(keys.public_key().encrypt(b'z')), b'z');
    }

    #[test]
    fn test_typed_char_is_echoed_and_sent_encrypted() {
        let (mut a, a_console, _b, _) = channel_pair();
        a_console.type_bytes(b"A");

        assert!(a.step().unwrap());
        assert_eq!(a_console.output(), b"A");

        let (link, _, _) = a.into_parts();
        assert_eq!(link.in_flight(), UNIT_SIZE);
    }

    #[test]
    fn test_unit_on_wire_is_peer_ciphertext() {
        let (mut a, a_console, b, _) = channel_pair();
        a_console.type_bytes(b"A");
        a.step().unwrap();

        let (mut b_link, _, _) = b.into_parts();
        let unit = b_link.read_unit().unwrap();
        assert_eq!(unit, PublicKey::new(11, 3763).encrypt(b'A'));
    }

    #[test]
    fn test_carriage_return_expands() {
        let (mut a, a_console, mut b, b_console) = channel_pair();
        a_console.type_bytes(b"\r");

        a.step().unwrap();
        assert_eq!(a_console.output(), b"\r\n");
        assert_eq!(a.stats().units_sent, 2);

        while b.step().unwrap() {}
        assert_eq!(b_console.output(), b"\r\n");
        assert_eq!(b.stats().units_received, 2);
    }

    #[test]
    fn test_partial_unit_waits() {
        let (link_a, mut link_b) = MemoryLink::pair();
        let console = MemoryConsole::new();
        let session =
            CipherSession::new(Role::Caller, caller_keys(), listener_keys().public_key()).unwrap();
        let config = SessionConfig {
            drain_on_start: false,
            ..Default::default()
        };
        let mut channel = SecureChannel::new(link_a, console.clone(), session, &config).unwrap();

        let unit = caller_keys().public_key().encrypt(b'k').to_le_bytes();
        link_b.write_all(&unit[..3]).unwrap();
        assert!(!channel.step().unwrap());
        assert!(console.output().is_empty());

        link_b.write_all(&unit[3..]).unwrap();
        assert!(channel.step().unwrap());
        assert_eq!(console.output(), b"k");
    }

    #[test]
    fn test_new_drains_stale_bytes() {
        let (link_a, mut link_b) = MemoryLink::pair();
        link_b.write_all(b"A").unwrap();

        let session =
            CipherSession::new(Role::Caller, caller_keys(), listener_keys().public_key()).unwrap();
        let mut channel = SecureChannel::new(
            link_a,
            MemoryConsole::new(),
            session,
            &SessionConfig::default(),
        )
        .unwrap();
        assert!(!channel.step().unwrap());
    }

    #[test]
    fn test_run_returns_when_stopped() {
        let (mut a, _, _, _) = channel_pair();
        let stop = AtomicBool::new(true);
        a.run(&stop).unwrap();
        assert_eq!(a.stats(), ChannelStats::default());
    }
}
