//! In-process link for simulation and tests

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::link::short_read;
use crate::{Link, TransportResult};

type Pipe = Arc<Mutex<VecDeque<u8>>>;

/// One end of an in-memory, in-order, loss-free byte link.
///
/// Ends are `Send`, so each peer can run on its own thread.
#[derive(Debug, Clone)]
pub struct MemoryLink {
    inbound: Pipe,
    outbound: Pipe,
}

impl MemoryLink {
    /// Create two connected ends
    pub fn pair() -> (Self, Self) {
        let a_to_b: Pipe = Arc::default();
        let b_to_a: Pipe = Arc::default();
        (
            Self {
                inbound: b_to_a.clone(),
                outbound: a_to_b.clone(),
            },
            Self {
                inbound: a_to_b,
                outbound: b_to_a,
            },
        )
    }

    /// Bytes written by this end that the peer has not read yet
    pub fn in_flight(&self) -> usize {
        self.outbound.lock().len()
    }
}

impl Link for MemoryLink {
    fn available(&mut self) -> TransportResult<usize> {
        Ok(self.inbound.lock().len())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> TransportResult<()> {
        let needed = buf.len();
        let mut inbound = self.inbound.lock();
        if inbound.len() < needed {
            return Err(short_read(needed, inbound.len()));
        }
        for (slot, byte) in buf.iter_mut().zip(inbound.drain(..needed)) {
            *slot = byte;
        }
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> TransportResult<()> {
        self.outbound.lock().extend(bytes);
        Ok(())
    }
}
