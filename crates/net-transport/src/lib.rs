//! Network Transport - link plumbing, handshake and secure channel for Tether
//!
//! A [`Link`] is any point-to-point byte stream with a non-blocking
//! availability check. On top of it, [`Handshake`] exchanges RSA public keys
//! and [`SecureChannel`] pumps encrypted characters between the link and a
//! [`Console`].

mod channel;
mod console;
mod error;
mod handshake;
mod link;
mod memory;
mod tcp;

pub use channel::*;
pub use console::*;
pub use error::*;
pub use handshake::*;
pub use link::*;
pub use memory::*;
pub use tcp::*;
