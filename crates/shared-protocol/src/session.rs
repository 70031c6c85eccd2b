//! Session roles, handshake states and configuration

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_HANDSHAKE_TIMEOUT_MS, ProtocolError, ProtocolResult};

/// Which side of the link we are. Decided once at startup from an external
/// signal and never re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Initiator: speaks first with an offer
    Caller,
    /// Responder: waits for an offer
    Listener,
}

impl Role {
    /// Map the external role-select signal onto a role (high = listener)
    pub fn from_signal(high: bool) -> Self {
        if high { Self::Listener } else { Self::Caller }
    }

    /// State the handshake starts in for this role
    pub fn initial_state(self) -> HandshakeState {
        match self {
            Self::Caller => HandshakeState::Start,
            Self::Listener => HandshakeState::Listen,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Caller => write!(f, "caller"),
            Self::Listener => write!(f, "listener"),
        }
    }
}

impl FromStr for Role {
    type Err = ProtocolError;

    fn from_str(s: &str) -> ProtocolResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "caller" | "client" | "initiator" => Ok(Self::Caller),
            "listener" | "server" | "responder" => Ok(Self::Listener),
            other => Err(ProtocolError::UnknownRole(other.to_string())),
        }
    }
}

/// Handshake state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandshakeState {
    /// Caller: about to send an offer
    Start,
    /// Listener: waiting for an offer tag
    Listen,
    /// Listener: offer tag seen, waiting for the caller's key
    AwaitKey,
    /// Waiting for the peer's acknowledge
    AwaitAck,
    /// Keys exchanged; terminal for both roles
    DataExchange,
}

impl HandshakeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::DataExchange)
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Handshake wait in milliseconds; negative waits indefinitely
    pub handshake_timeout_ms: i64,
    /// Sleep between availability polls while waiting
    pub poll_interval_ms: u64,
    /// Back-off when a channel iteration moves no data (0 yields instead)
    pub idle_backoff_ms: u64,
    /// Discard bytes left on the link before data exchange starts
    pub drain_on_start: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
            poll_interval_ms: 1,
            idle_backoff_ms: 1,
            drain_on_start: true,
        }
    }
}

impl SessionConfig {
    /// Handshake deadline, `None` meaning wait forever
    pub fn handshake_timeout(&self) -> Option<Duration> {
        u64::try_from(self.handshake_timeout_ms)
            .ok()
            .map(Duration::from_millis)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn validate(&self) -> ProtocolResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(ProtocolError::InvalidConfig(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_timeout_waits_forever() {
        let config = SessionConfig {
            handshake_timeout_ms: -1,
            ..Default::default()
        };
        assert_eq!(config.handshake_timeout(), None);
        assert_eq!(
            SessionConfig::default().handshake_timeout(),
            Some(Duration::from_millis(1000))
        );
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"handshake_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.handshake_timeout_ms, 250);
        assert_eq!(config.poll_interval_ms, 1);
        assert!(config.drain_on_start);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let config = SessionConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn roles_parse_and_start_in_their_own_state() {
        assert_eq!("Caller".parse::<Role>().unwrap(), Role::Caller);
        assert_eq!("server".parse::<Role>().unwrap(), Role::Listener);
        assert!("bystander".parse::<Role>().is_err());

        assert_eq!(Role::Caller.initial_state(), HandshakeState::Start);
        assert_eq!(Role::Listener.initial_state(), HandshakeState::Listen);
        assert_eq!(Role::from_signal(true), Role::Listener);
    }
}
