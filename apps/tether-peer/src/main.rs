//! Tether Peer
//!
//! One end of an RSA-secured character chat. Generates a fresh key pair,
//! exchanges public keys with the other peer over TCP, then relays typed
//! characters in both directions until stdin closes.

mod cli;
mod console;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crypto_session::{KeyGenerator, RngBitSource};
use net_transport::{Handshake, SecureChannel, TcpLink, TransportError};
use tracing::{info, warn};

use crate::cli::{Cli, Endpoint};
use crate::console::StdioConsole;

const CONNECT_RETRY: Duration = Duration::from_millis(500);

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the chat
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tether_peer=info".parse()?)
                .add_directive("net_transport=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.session_config()?;
    let endpoint = cli.endpoint()?;

    let stop = Arc::new(AtomicBool::new(false));
    let mut console = StdioConsole::spawn(stop.clone())?;

    console.announce("Welcome to Tether!")?;
    console.announce(&format!("Running as {}", cli.role))?;

    let keys = KeyGenerator::new(RngBitSource::new(rand::rngs::OsRng)).generate_key_pair()?;
    console.announce(&format!("Public key: {}", keys.public_exponent()))?;
    console.announce(&format!("Modulus: {}", keys.modulus()))?;

    let mut link = open_link(endpoint)?;
    let session = Handshake::new(cli.role, keys, &config).run(&mut link, &stop)?;

    let peer = session.peer_key();
    info!(
        exponent = peer.exponent,
        modulus = peer.modulus,
        "Peer key received"
    );

    let mut channel = SecureChannel::new(link, console, session, &config)?;
    match channel.run(&stop) {
        Ok(()) | Err(TransportError::LinkClosed) => {}
        Err(e) => return Err(e.into()),
    }

    let stats = channel.stats();
    info!(
        sent = stats.units_sent,
        received = stats.units_received,
        "Session closed"
    );
    Ok(())
}

/// Accept or dial the single peer. Dialing retries until the listener is up.
fn open_link(endpoint: Endpoint) -> anyhow::Result<TcpLink> {
    match endpoint {
        Endpoint::Listen(addr) => Ok(TcpLink::accept(addr)?),
        Endpoint::Connect(addr) => loop {
            match TcpLink::connect(addr) {
                Ok(link) => return Ok(link),
                Err(TransportError::Io(e)) => {
                    warn!("Connect to {} failed ({}), retrying", addr, e);
                    thread::sleep(CONNECT_RETRY);
                }
                Err(e) => return Err(e.into()),
            }
        },
    }
}
