pub mod artnet;
pub mod network_config;

use std::io;
use std::net::SocketAddr;

use homestage_fixtures::Frame;
use thiserror::Error;

pub use artnet::ArtNetTransmitter;
pub use network_config::{ArtNetConfig, ArtNetMode};

/// Errors setting up or feeding an output.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to bind output socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("Output socket error: {0}")]
    Socket(#[from] io::Error),
    #[error("Invalid universe {0}")]
    Universe(u16),
    #[error("Failed to encode packet: {0}")]
    Encode(String),
}

/// A sink that owns its own send clock. `send` only replaces the frame it
/// will transmit next.
pub trait Transmitter: Send + Sync {
    /// Begin transmitting. Starting a running transmitter does nothing.
    fn start(&self);

    /// Stop transmitting. Stopping a stopped transmitter does nothing.
    fn stop(&self);

    fn send(&self, frame: Frame);
}
