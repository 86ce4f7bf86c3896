use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Inter-character (t1.5) and inter-frame (t3.5) silent intervals in
/// microseconds for a given baud rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilenceIntervals {
    pub t1_5_us: u16,
    pub t3_5_us: u16,
}

/// Serial baud rate, restricted to the rates the RTU timing table covers.
///
/// From 28800 baud upward the silent intervals are fixed at 750 µs and
/// 1750 µs as recommended by the Modbus-over-serial-line standard
/// (§2.5.1.1); below that they scale with the character time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BaudRate(u32);

impl BaudRate {
    pub fn new(rate: u32) -> Result<Self, ConfigError> {
        match rate {
            1200 | 2400 | 4800 | 9600 | 14400 | 19200 | 28800 | 38400 | 57600 | 76800 | 115200 => {
                Ok(Self(rate))
            }
            _ => Err(ConfigError::UnsupportedBaudRate(rate)),
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// Silent intervals used for frame-boundary detection at this rate.
    pub fn silence_intervals(&self) -> SilenceIntervals {
        let (t1_5_us, t3_5_us) = match self.0 {
            1200 => (13750, 32083),
            2400 => (6875, 16041),
            4800 => (3437, 8020),
            9600 => (1719, 4010),
            14400 => (1146, 2674),
            19200 => (859, 2005),
            _ => (750, 1750),
        };
        SilenceIntervals { t1_5_us, t3_5_us }
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        Self(9600)
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = ConfigError;

    fn try_from(rate: u32) -> Result<Self, Self::Error> {
        Self::new(rate)
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> Self {
        rate.0
    }
}

impl std::fmt::Display for BaudRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
