//! Server configuration parsed from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::frame::ErrorCode;
use crate::services::room::{RoomNameError, validate_room_name};

pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ROOM: &str = "default";
pub const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("invalid DEFAULT_ROOM: {0}")]
    DefaultRoom(#[from] RoomNameError),
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid { .. } => "E_CONFIG_INVALID",
            Self::DefaultRoom(_) => "E_CONFIG_DEFAULT_ROOM",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Room a connection lands in when it does not name one.
    pub default_room: String,
    /// Frames buffered per connection before it counts as lagging.
    pub client_channel_capacity: usize,
}

impl ServerConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `HOST`: default `0.0.0.0`
    /// - `PORT`: default 3000
    /// - `DEFAULT_ROOM`: default `default`
    /// - `CLIENT_CHANNEL_CAPACITY`: default 256, must be positive
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any variable is set but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any variable is set but unparsable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host: IpAddr = parse_var(&lookup, "HOST", DEFAULT_HOST)?;
        let port: u16 = parse_var(&lookup, "PORT", DEFAULT_PORT)?;
        let capacity: usize = parse_var(&lookup, "CLIENT_CHANNEL_CAPACITY", DEFAULT_CLIENT_CHANNEL_CAPACITY)?;
        if capacity == 0 {
            return Err(invalid("CLIENT_CHANNEL_CAPACITY", "0"));
        }

        let default_room = lookup("DEFAULT_ROOM").unwrap_or_else(|| DEFAULT_ROOM.to_string());
        validate_room_name(&default_room)?;

        Ok(Self { bind_addr: SocketAddr::new(host, port), default_room, client_channel_capacity: capacity })
    }

    #[must_use]
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    #[must_use]
    pub fn with_client_channel_capacity(mut self, capacity: usize) -> Self {
        self.client_channel_capacity = capacity.max(1);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(DEFAULT_HOST, DEFAULT_PORT),
            default_room: DEFAULT_ROOM.to_string(),
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| invalid(var, &raw)),
        None => Ok(default),
    }
}

fn invalid(var: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid { var, value: value.to_string() }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
