use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};

/// Standard Art-Net UDP port.
pub const ARTNET_PORT: u16 = 6454;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtNetMode {
    Broadcast,
    /// Specify from (interface) + to (destination) addresses
    Unicast(SocketAddr, SocketAddr),
}

/// Art-Net output settings as stored in the stage config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtNetConfig {
    /// Local interface to send from.
    pub bind: IpAddr,
    /// Node to unicast to. Ignored when broadcasting.
    pub destination: IpAddr,
    pub broadcast: bool,
    pub port: u16,
    /// 15-bit Art-Net port address.
    pub universe: u16,
    /// Output frame rate.
    pub fps: f64,
}

impl Default for ArtNetConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            destination: IpAddr::V4(Ipv4Addr::LOCALHOST),
            broadcast: false,
            port: ARTNET_PORT,
            universe: 0,
            fps: 44.0, // DMX standard 44Hz
        }
    }
}

impl ArtNetConfig {
    pub fn mode(&self) -> ArtNetMode {
        if self.broadcast {
            ArtNetMode::Broadcast
        } else {
            // Ephemeral source port so a node on this host can keep 6454
            ArtNetMode::Unicast(
                SocketAddr::new(self.bind, 0),
                SocketAddr::new(self.destination, self.port),
            )
        }
    }

    /// Where the socket binds for this mode.
    pub fn source(&self) -> SocketAddr {
        match self.mode() {
            ArtNetMode::Unicast(src, _) => src,
            ArtNetMode::Broadcast => SocketAddr::new(self.bind, 0),
        }
    }

    /// Where packets go for this mode.
    pub fn target(&self) -> SocketAddr {
        match self.mode() {
            ArtNetMode::Unicast(_, destination) => destination,
            ArtNetMode::Broadcast => SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), self.port),
        }
    }

    pub fn get_mode_string(&self) -> &str {
        match self.mode() {
            ArtNetMode::Unicast(_, _) => "unicast",
            ArtNetMode::Broadcast => "broadcast",
        }
    }
}

impl fmt::Display for ArtNetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode() {
            ArtNetMode::Unicast(src, destination) => write!(
                f,
                "{} -> {} (universe {})",
                src.ip(),
                destination,
                self.universe
            ),
            ArtNetMode::Broadcast => write!(
                f,
                "{} (broadcast, universe {})",
                self.target(),
                self.universe
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicast_by_default() {
        let config = ArtNetConfig::default();
        assert_eq!(config.get_mode_string(), "unicast");
        assert_eq!(config.target(), "127.0.0.1:6454".parse().unwrap());
        assert_eq!(config.source().port(), 0);
    }

    #[test]
    fn test_broadcast_targets_limited_broadcast() {
        let config: ArtNetConfig =
            serde_json::from_str(r#"{"broadcast": true, "port": 6455}"#).unwrap();
        assert_eq!(config.mode(), ArtNetMode::Broadcast);
        assert_eq!(config.target(), "255.255.255.255:6455".parse().unwrap());
        assert_eq!(config.fps, 44.0);
    }
}
