//! Public key exchange over the link
//!
//! One state machine serves both roles. The caller speaks first with an
//! offer; the listener answers with its own key; a final bare acknowledge
//! from the caller closes the exchange. Timeouts and unexpected tags never
//! surface as errors: they send the machine back to an earlier state and it
//! tries again, indefinitely.
//!
//! ```text
//! Caller:   Start ──offer──▶ AwaitAck ──'A'+key / send 'A'──▶ DataExchange
//!                 ◀──other tag──┘  (timeout: stay)
//!
//! Listener: Listen ──'C'──▶ AwaitKey ──key / send 'A'+key──▶ AwaitAck ──'A'──▶ DataExchange
//!             ▲               │ timeout                        │ 'C' → AwaitKey
//!             └───────────────┴────────────────────────────────┘ timeout
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crypto_session::{CipherSession, KeyPair, PublicKey};
use shared_protocol::{
    HandshakeState, KEY_BODY_SIZE, Role, SessionConfig, TAGGED_KEY_SIZE, Tag, WireMessage,
};
use tracing::{debug, info, trace, warn};

use crate::{Link, LinkExt, TransportError, TransportResult, wait_for_bytes};

/// Handshake in progress for one side of the link
pub struct Handshake {
    role: Role,
    local: KeyPair,
    peer: Option<PublicKey>,
    state: HandshakeState,
    timeout: Option<Duration>,
    poll_interval: Duration,
    /// Times the machine fell back to an earlier state
    retries: u32,
}

impl Handshake {
    pub fn new(role: Role, local: KeyPair, config: &SessionConfig) -> Self {
        Self {
            role,
            local,
            peer: None,
            state: role.initial_state(),
            timeout: config.handshake_timeout(),
            poll_interval: config.poll_interval(),
            retries: 0,
        }
    }

    /// Start a new handshake as caller
    pub fn caller(local: KeyPair, config: &SessionConfig) -> Self {
        Self::new(Role::Caller, local, config)
    }

    /// Start a new handshake as listener
    pub fn listener(local: KeyPair, config: &SessionConfig) -> Self {
        Self::new(Role::Listener, local, config)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Peer key, once received
    pub fn peer(&self) -> Option<PublicKey> {
        self.peer
    }

    pub fn local_key(&self) -> &KeyPair {
        &self.local
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_terminal()
    }

    /// Perform one transition and return the new state
    pub fn step<L: Link + ?Sized>(&mut self, link: &mut L) -> TransportResult<HandshakeState> {
        use HandshakeState::*;

        let next = match (self.role, self.state) {
            (_, DataExchange) => DataExchange,
            (Role::Caller, Start) => self.send_offer(link)?,
            (Role::Caller, AwaitAck) => self.await_ack_with_key(link)?,
            (Role::Listener, Listen) => self.listen(link)?,
            (Role::Listener, AwaitKey) => self.await_key(link)?,
            (Role::Listener, AwaitAck) => self.await_final_ack(link)?,
            (role, state) => {
                warn!(%role, ?state, "State not valid for role, resetting");
                role.initial_state()
            }
        };

        if next != self.state {
            debug!(role = %self.role, from = ?self.state, to = ?next, "Handshake transition");
        }
        self.state = next;
        Ok(next)
    }

    /// Drive the machine until keys are exchanged.
    ///
    /// `stop` is checked between transitions; a wait already in progress
    /// runs to its own timeout first.
    pub fn run<L: Link + ?Sized>(
        mut self,
        link: &mut L,
        stop: &AtomicBool,
    ) -> TransportResult<CipherSession> {
        info!(role = %self.role, "Starting handshake");

        while !self.is_complete() {
            if stop.load(Ordering::Relaxed) {
                return Err(TransportError::Stopped);
            }
            self.step(link)?;
        }

        info!(role = %self.role, retries = self.retries, "Handshake complete");
        self.into_session()
    }

    /// Hand the exchanged keys over to a cipher session
    pub fn into_session(self) -> TransportResult<CipherSession> {
        match (self.state, self.peer) {
            (HandshakeState::DataExchange, Some(peer)) => {
                Ok(CipherSession::new(self.role, self.local, peer)?)
            }
            (state, _) => Err(TransportError::HandshakeIncomplete(state)),
        }
    }

    fn wait<L: Link + ?Sized>(&self, link: &mut L, count: usize) -> TransportResult<bool> {
        wait_for_bytes(link, count, self.timeout, self.poll_interval)
    }

    fn fall_back(&mut self, to: HandshakeState, reason: &str) -> HandshakeState {
        self.retries += 1;
        debug!(role = %self.role, from = ?self.state, ?to, reason, "Handshake fallback");
        to
    }

    /// Accept a received key, or explain why not
    fn accept_peer(&mut self, key: PublicKey) -> bool {
        match key.validate() {
            Ok(()) => {
                self.peer = Some(key);
                true
            }
            Err(e) => {
                warn!(error = %e, "Rejecting peer key");
                false
            }
        }
    }

    // Caller: Start
    fn send_offer<L: Link + ?Sized>(&mut self, link: &mut L) -> TransportResult<HandshakeState> {
        link.send(&WireMessage::Offer(self.local.public_key().into()))?;
        Ok(HandshakeState::AwaitAck)
    }

    // Caller: AwaitAck
    fn await_ack_with_key<L: Link + ?Sized>(
        &mut self,
        link: &mut L,
    ) -> TransportResult<HandshakeState> {
        if !self.wait(link, TAGGED_KEY_SIZE)? {
            trace!("No acknowledge yet, still waiting");
            return Ok(HandshakeState::AwaitAck);
        }

        if link.read_byte()? != Tag::Ack.as_byte() {
            return Ok(self.fall_back(HandshakeState::Start, "unexpected tag"));
        }

        let key = PublicKey::from(link.read_key()?);
        if !self.accept_peer(key) {
            return Ok(self.fall_back(HandshakeState::Start, "invalid key"));
        }

        link.send(&WireMessage::Ack)?;
        Ok(HandshakeState::DataExchange)
    }

    // Listener: Listen
    fn listen<L: Link + ?Sized>(&mut self, link: &mut L) -> TransportResult<HandshakeState> {
        if link.available()? == 0 {
            thread::sleep(self.poll_interval);
            return Ok(HandshakeState::Listen);
        }

        let byte = link.read_byte()?;
        if byte == Tag::Offer.as_byte() {
            Ok(HandshakeState::AwaitKey)
        } else {
            trace!(byte, "Ignoring stray byte while listening");
            Ok(HandshakeState::Listen)
        }
    }

    // Listener: AwaitKey
    fn await_key<L: Link + ?Sized>(&mut self, link: &mut L) -> TransportResult<HandshakeState> {
        if !self.wait(link, KEY_BODY_SIZE)? {
            return Ok(self.fall_back(HandshakeState::Listen, "timed out waiting for key"));
        }

        let key = PublicKey::from(link.read_key()?);
        if !self.accept_peer(key) {
            return Ok(self.fall_back(HandshakeState::Listen, "invalid key"));
        }

        link.send(&WireMessage::AckWithKey(self.local.public_key().into()))?;
        Ok(HandshakeState::AwaitAck)
    }

    // Listener: AwaitAck. The tag byte is read exactly once.
    fn await_final_ack<L: Link + ?Sized>(
        &mut self,
        link: &mut L,
    ) -> TransportResult<HandshakeState> {
        if !self.wait(link, 1)? {
            return Ok(self.fall_back(HandshakeState::Listen, "timed out waiting for ack"));
        }

        let byte = link.read_byte()?;
        match Tag::from_byte(byte) {
            Ok(Tag::Ack) => Ok(HandshakeState::DataExchange),
            Ok(Tag::Offer) => Ok(self.fall_back(HandshakeState::AwaitKey, "offer restarted")),
            Err(_) => {
                trace!(byte, "Ignoring stray byte while awaiting ack");
                Ok(HandshakeState::AwaitAck)
            }
        }
    }
}
