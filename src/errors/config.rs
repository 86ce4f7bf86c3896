use thiserror::Error;

/// Rejected configuration values.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("server address {0} is outside the unicast range 1..=247")]
    InvalidAddress(u8),

    #[error("unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),
}

impl ConfigError {
    /// POSIX-style error value (negative), for hosts bridging into C code.
    pub fn to_errno(self) -> i16 {
        -(libc::EINVAL as i16)
    }
}
