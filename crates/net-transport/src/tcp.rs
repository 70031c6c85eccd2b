//! TCP socket standing in for the point-to-point serial line

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tracing::{debug, info};

use crate::link::short_read;
use crate::{Link, TransportError, TransportResult};

const READ_CHUNK: usize = 256;
const WRITE_RETRY: Duration = Duration::from_millis(1);

/// Non-blocking TCP link.
///
/// Readable bytes are pulled into a local buffer whenever availability is
/// checked, so `available` never blocks.
pub struct TcpLink {
    stream: TcpStream,
    buffer: BytesMut,
    closed: bool,
}

impl TcpLink {
    /// Wrap an already connected stream
    pub fn from_stream(stream: TcpStream) -> TransportResult<Self> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            closed: false,
        })
    }

    /// Connect to a waiting peer
    pub fn connect(addr: impl ToSocketAddrs) -> TransportResult<Self> {
        let stream = TcpStream::connect(addr)?;
        info!("Connected to {}", stream.peer_addr()?);
        Self::from_stream(stream)
    }

    /// Bind `addr` and accept exactly one peer
    pub fn accept(addr: impl ToSocketAddrs) -> TransportResult<Self> {
        let listener = TcpListener::bind(addr)?;
        info!("Waiting for peer on {}", listener.local_addr()?);
        let (stream, remote) = listener.accept()?;
        info!("Accepted peer from {}", remote);
        Self::from_stream(stream)
    }

    pub fn peer_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }

    /// Drain whatever the socket has ready into the local buffer
    fn fill(&mut self) -> TransportResult<()> {
        if self.closed {
            return Ok(());
        }
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    debug!("Peer closed the link");
                    self.closed = true;
                    return Ok(());
                }
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Link for TcpLink {
    fn available(&mut self) -> TransportResult<usize> {
        self.fill()?;
        if self.buffer.is_empty() && self.closed {
            return Err(TransportError::LinkClosed);
        }
        Ok(self.buffer.len())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> TransportResult<()> {
        if self.buffer.len() < buf.len() {
            self.fill()?;
        }
        if self.buffer.len() < buf.len() {
            return Err(short_read(buf.len(), self.buffer.len()));
        }
        self.buffer.copy_to_slice(buf);
        Ok(())
    }

    fn write_all(&mut self, mut bytes: &[u8]) -> TransportResult<()> {
        while !bytes.is_empty() {
            match self.stream.write(bytes) {
                Ok(0) => return Err(TransportError::LinkClosed),
                Ok(n) => bytes = &bytes[n..],
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(WRITE_RETRY),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wait_for_bytes;

    #[test]
    fn test_loopback_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut link = TcpLink::from_stream(stream).unwrap();
            assert!(
                wait_for_bytes(
                    &mut link,
                    4,
                    Some(Duration::from_secs(5)),
                    Duration::from_millis(1)
                )
                .unwrap()
            );
            let mut buf = [0u8; 4];
            link.read_exact(&mut buf).unwrap();
            link.write_all(&buf).unwrap();
        });

        let mut client = TcpLink::connect(addr).unwrap();
        client.write_all(b"echo").unwrap();
        assert!(
            wait_for_bytes(
                &mut client,
                4,
                Some(Duration::from_secs(5)),
                Duration::from_millis(1)
            )
            .unwrap()
        );
        let mut buf = [0u8; 4];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"echo");

        server.join().unwrap();
    }
}
