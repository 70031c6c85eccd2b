//! Established RSA session: our key pair plus the peer's public key

use shared_protocol::Role;

use crate::{CryptoResult, KeyPair, PublicKey};

/// Cipher state once both public keys are known.
///
/// Outgoing characters are encrypted under the peer's key; incoming units
/// are decrypted with our private exponent.
pub struct CipherSession {
    role: Role,
    local: KeyPair,
    peer: PublicKey,
    /// Units encrypted so far
    send_counter: u64,
    /// Units decrypted so far
    recv_counter: u64,
}

impl CipherSession {
    /// Create a session from the handshake result
    pub fn new(role: Role, local: KeyPair, peer: PublicKey) -> CryptoResult<Self> {
        peer.validate()?;
        Ok(Self {
            role,
            local,
            peer,
            send_counter: 0,
            recv_counter: 0,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn local_key(&self) -> &KeyPair {
        &self.local
    }

    pub fn peer_key(&self) -> PublicKey {
        self.peer
    }

    /// Encrypt one character for the peer
    pub fn encrypt(&mut self, c: u8) -> u32 {
        self.send_counter += 1;
        self.peer.encrypt(c)
    }

    /// Decrypt one unit addressed to us
    pub fn decrypt(&mut self, unit: u32) -> u8 {
        self.recv_counter += 1;
        self.local.decrypt(unit)
    }

    /// Get the current send counter (for debugging/stats)
    pub fn send_count(&self) -> u64 {
        self.send_counter
    }

    /// Get the current receive counter (for debugging/stats)
    pub fn recv_count(&self) -> u64 {
        self.recv_counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CryptoError, KeyGenerator, RngBitSource};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pair(seed: u64) -> KeyPair {
        KeyGenerator::new(RngBitSource::new(StdRng::seed_from_u64(seed)))
            .generate_key_pair()
            .unwrap()
    }

    #[test]
    fn test_sessions_talk_both_ways() {
        let caller_keys = pair(10);
        let listener_keys = pair(20);

        let mut caller =
            CipherSession::new(Role::Caller, caller_keys.clone(), listener_keys.public_key())
                .unwrap();
        let mut listener =
            CipherSession::new(Role::Listener, listener_keys, caller_keys.public_key()).unwrap();

        for &c in b"Hello from caller!\r\n" {
            let unit = caller.encrypt(c);
            assert_eq!(listener.decrypt(unit), c);
        }
        for &c in b"Hello from listener!" {
            let unit = listener.encrypt(c);
            assert_eq!(caller.decrypt(unit), c);
        }

        assert_eq!(caller.send_count(), 20);
        assert_eq!(listener.recv_count(), 20);
        assert_eq!(listener.send_count(), 20);
    }

    #[test]
    fn test_rejects_unusable_peer_key() {
        let result = CipherSession::new(Role::Caller, pair(1), PublicKey::new(3, 0));
        assert!(matches!(
            result,
            Err(CryptoError::InvalidPublicKey { modulus: 0, .. })
        ));
    }
}
