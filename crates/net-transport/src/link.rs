//! Byte link abstraction and framed reads/writes

use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use shared_protocol::{KEY_BODY_SIZE, KeyAnnouncement, UNIT_SIZE, WireMessage, decode_unit};
use tracing::trace;

use crate::{TransportError, TransportResult};

/// Point-to-point byte stream, in order and loss-free.
///
/// `available` must never block. Reads are only issued for bytes that
/// `available` has already reported.
pub trait Link {
    /// Number of bytes readable right now
    fn available(&mut self) -> TransportResult<usize>;

    /// Fill `buf` from bytes already available
    fn read_exact(&mut self, buf: &mut [u8]) -> TransportResult<()>;

    /// Queue `bytes` for transmission
    fn write_all(&mut self, bytes: &[u8]) -> TransportResult<()>;
}

impl<L: Link + ?Sized> Link for &mut L {
    fn available(&mut self) -> TransportResult<usize> {
        (**self).available()
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> TransportResult<()> {
        (**self).read_exact(buf)
    }

    fn write_all(&mut self, bytes: &[u8]) -> TransportResult<()> {
        (**self).write_all(bytes)
    }
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn available(&mut self) -> TransportResult<usize> {
        (**self).available()
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> TransportResult<()> {
        (**self).read_exact(buf)
    }

    fn write_all(&mut self, bytes: &[u8]) -> TransportResult<()> {
        (**self).write_all(bytes)
    }
}

/// Framed helpers over any [`Link`]
pub trait LinkExt: Link {
    fn read_byte(&mut self) -> TransportResult<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Read one little-endian u32
    fn read_unit(&mut self) -> TransportResult<u32> {
        let mut buf = [0u8; UNIT_SIZE];
        self.read_exact(&mut buf)?;
        Ok(decode_unit(&mut &buf[..])?)
    }

    /// Read an exponent/modulus pair
    fn read_key(&mut self) -> TransportResult<KeyAnnouncement> {
        let mut buf = [0u8; KEY_BODY_SIZE];
        self.read_exact(&mut buf)?;
        Ok(KeyAnnouncement::decode(&mut &buf[..])?)
    }

    fn send(&mut self, message: &WireMessage) -> TransportResult<()> {
        let bytes: Bytes = message.to_bytes();
        trace!(?message, len = bytes.len(), "Sending");
        self.write_all(&bytes)
    }

    /// Throw away whatever is currently buffered; returns the count
    fn discard_available(&mut self) -> TransportResult<usize> {
        let pending = self.available()?;
        if pending > 0 {
            let mut sink = vec![0u8; pending];
            self.read_exact(&mut sink)?;
        }
        Ok(pending)
    }
}

impl<L: Link + ?Sized> LinkExt for L {}

/// Wait until `count` bytes are available or the timeout elapses.
///
/// Polls with `poll_interval` sleeps. Returns `true` as soon as enough bytes
/// are present; `false` once the deadline passes first. A `None` timeout
/// waits indefinitely.
pub fn wait_for_bytes<L: Link + ?Sized>(
    link: &mut L,
    count: usize,
    timeout: Option<Duration>,
    poll_interval: Duration,
) -> TransportResult<bool> {
    let deadline = timeout.map(|timeout| Instant::now() + timeout);

    loop {
        if link.available()? >= count {
            return Ok(true);
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Ok(false);
        }
        thread::sleep(poll_interval);
    }
}

/// Error for a read that asks for more than is buffered
pub(crate) fn short_read(needed: usize, available: usize) -> TransportError {
    TransportError::Protocol(shared_protocol::ProtocolError::Truncated { needed, available })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryLink;

    const POLL: Duration = Duration::from_millis(1);

    #[test]
    fn test_wait_times_out_when_short() {
        let (mut a, mut b) = MemoryLink::pair();
        a.write_all(&[1, 2, 3]).unwrap();

        let start = Instant::now();
        let ready = wait_for_bytes(&mut b, 4, Some(Duration::from_millis(30)), POLL).unwrap();
        assert!(!ready);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_wait_returns_immediately_when_present() {
        let (mut a, mut b) = MemoryLink::pair();
        a.write_all(&[0; 9]).unwrap();

        let start = Instant::now();
        let ready = wait_for_bytes(&mut b, 9, Some(Duration::from_secs(5)), POLL).unwrap();
        assert!(ready);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_wakes_on_late_arrival() {
        let (mut a, mut b) = MemoryLink::pair();

        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            a.write_all(&[7; 4]).unwrap();
        });

        let start = Instant::now();
        let ready = wait_for_bytes(&mut b, 4, Some(Duration::from_secs(5)), POLL).unwrap();
        writer.join().unwrap();

        assert!(ready);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_framed_reads() {
        let (mut a, mut b) = MemoryLink::pair();
        a.send(&WireMessage::AckWithKey(KeyAnnouncement::new(17, 3233)))
            .unwrap();
        a.send(&WireMessage::Unit(2790)).unwrap();

        assert_eq!(b.read_byte().unwrap(), b'A');
        assert_eq!(b.read_key().unwrap(), KeyAnnouncement::new(17, 3233));
        assert_eq!(b.read_unit().unwrap(), 2790);
        assert_eq!(b.available().unwrap(), 0);
    }

    #[test]
    fn test_discard_available() {
        let (mut a, mut b) = MemoryLink::pair();
        a.write_all(b"garbage").unwrap();
        assert_eq!(b.discard_available().unwrap(), 7);
        assert_eq!(b.available().unwrap(), 0);
    }
}
