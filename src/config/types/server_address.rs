use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Unicast server address, 1..=247.
///
/// Address 0 is the broadcast address and 248..=255 are reserved by the
/// Modbus-over-serial-line standard; neither can be assigned to a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ServerAddress(u8);

impl ServerAddress {
    pub fn new(address: u8) -> Result<Self, ConfigError> {
        match address {
            1..=247 => Ok(Self(address)),
            _ => Err(ConfigError::InvalidAddress(address)),
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u8> for ServerAddress {
    type Error = ConfigError;

    fn try_from(address: u8) -> Result<Self, Self::Error> {
        Self::new(address)
    }
}

impl From<ServerAddress> for u8 {
    fn from(address: ServerAddress) -> Self {
        address.0
    }
}

impl std::fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unicast_range_is_accepted() {
        assert_eq!(ServerAddress::new(1).unwrap().get(), 1);
        assert_eq!(ServerAddress::new(247).unwrap().get(), 247);
    }

    #[test]
    fn broadcast_and_reserved_addresses_are_rejected() {
        assert_eq!(ServerAddress::new(0), Err(ConfigError::InvalidAddress(0)));
        assert_eq!(
            ServerAddress::new(248),
            Err(ConfigError::InvalidAddress(248))
        );
        assert_eq!(
            ServerAddress::new(255),
            Err(ConfigError::InvalidAddress(255))
        );
    }
}
