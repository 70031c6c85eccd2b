//! Local character console (the human side of the channel)

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::TransportResult;

/// Character-oriented console stream
pub trait Console {
    /// Next typed character, if one is waiting. Must not block.
    fn read_char(&mut self) -> TransportResult<Option<u8>>;

    /// Display one character
    fn write_char(&mut self, c: u8) -> TransportResult<()>;
}

impl<C: Console + ?Sized> Console for &mut C {
    fn read_char(&mut self) -> TransportResult<Option<u8>> {
        (**self).read_char()
    }

    fn write_char(&mut self, c: u8) -> TransportResult<()> {
        (**self).write_char(c)
    }
}

impl<C: Console + ?Sized> Console for Box<C> {
    fn read_char(&mut self) -> TransportResult<Option<u8>> {
        (**self).read_char()
    }

    fn write_char(&mut self, c: u8) -> TransportResult<()> {
        (**self).write_char(c)
    }
}

#[derive(Debug, Default)]
struct ConsoleBuffers {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

/// Scripted console with shared buffers.
///
/// Clones share state, so a test can keep a handle for typing and
/// inspecting output while the channel owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryConsole {
    inner: Arc<Mutex<ConsoleBuffers>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue keystrokes
    pub fn type_bytes(&self, bytes: &[u8]) {
        self.inner.lock().input.extend(bytes);
    }

    /// Keystrokes not yet consumed
    pub fn pending_input(&self) -> usize {
        self.inner.lock().input.len()
    }

    /// Everything displayed so far
    pub fn output(&self) -> Vec<u8> {
        self.inner.lock().output.clone()
    }

    /// Take and clear the displayed output
    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut self.inner.lock().output)
    }
}

impl Console for MemoryConsole {
    fn read_char(&mut self) -> TransportResult<Option<u8>> {
        Ok(self.inner.lock().input.pop_front())
    }

    fn write_char(&mut self, c: u8) -> TransportResult<()> {
        self.inner.lock().output.push(c);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_buffers() {
        let handle = MemoryConsole::new();
        let mut console = handle.clone();

        handle.type_bytes(b"ab");
        assert_eq!(console.read_char().unwrap(), Some(b'a'));
        assert_eq!(handle.pending_input(), 1);

        console.write_char(b'z').unwrap();
        assert_eq!(handle.take_output(), b"z");
        assert!(handle.output().is_empty());
    }
}
