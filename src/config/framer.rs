use serde::{Deserialize, Serialize};

use super::types::{BaudRate, ServerAddress};

/// Framer configuration: who we are on the bus and how fast it runs.
///
/// Both fields validate on construction and on deserialization, so a
/// `Config` value is always usable.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Unicast address this server answers to; broadcast (address 0) is
    /// accepted implicitly
    pub address: ServerAddress,

    /// Baud rate of the serial link; selects the t1.5/t3.5 silent
    /// intervals
    pub baud_rate: BaudRate,
}
