use thiserror::Error;

/// Error reported by a host UART write callback, forwarded to the caller
/// unchanged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("host reported error {0}")]
pub struct HostError(pub i16);

/// Per-event outcome of the framer and server entry points.
///
/// `Again` and `Busy` are flow control rather than faults: `Again` means
/// the same call must be repeated until it stops returning `Again`, `Busy`
/// means the operation cannot start in the current phase and should be
/// attempted later.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Malformed API parameter, or an event that the current phase never
    /// expects.
    #[error("invalid argument")]
    InvalidArgument,

    /// Inbound frame shorter than the minimum or failing its CRC.
    #[error("frame too short or CRC mismatch")]
    BadMessage,

    /// A previous operation still occupies the state machine.
    #[error("busy with a previous operation")]
    Busy,

    /// Progress was made but work remains; repeat the same call.
    #[error("operation still in progress, call again")]
    Again,

    /// An inbound byte would overflow the 256-byte frame buffer.
    #[error("receive buffer exhausted")]
    NoBufferSpace,

    /// The UART did not accept the rest of an outbound frame within a
    /// character time; the frame is lost.
    #[error("transmission not accepted within a character time")]
    Timeout,

    /// Error surfaced by a host callback.
    #[error(transparent)]
    Host(#[from] HostError),
}

impl Error {
    /// `true` for outcomes that ask the caller to repeat the same call.
    pub fn is_retry(self) -> bool {
        matches!(self, Error::Again)
    }

    /// POSIX-style error value (negative), matching the return-code
    /// convention of C Modbus stacks. Host errors pass through unchanged.
    pub fn to_errno(self) -> i16 {
        let errno = match self {
            Error::InvalidArgument => libc::EINVAL,
            Error::BadMessage => libc::EBADMSG,
            Error::Busy => libc::EBUSY,
            Error::Again => libc::EAGAIN,
            Error::NoBufferSpace => libc::ENOBUFS,
            Error::Timeout => libc::ETIMEDOUT,
            Error::Host(HostError(code)) => return code,
        };
        -(errno as i16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_values_match_the_c_convention() {
        assert_eq!(Error::InvalidArgument.to_errno(), -(libc::EINVAL as i16));
        assert_eq!(Error::BadMessage.to_errno(), -(libc::EBADMSG as i16));
        assert_eq!(Error::Busy.to_errno(), -(libc::EBUSY as i16));
        assert_eq!(Error::Again.to_errno(), -(libc::EAGAIN as i16));
        assert_eq!(Error::NoBufferSpace.to_errno(), -(libc::ENOBUFS as i16));
        assert_eq!(Error::Timeout.to_errno(), -(libc::ETIMEDOUT as i16));
    }

    #[test]
    fn host_errors_pass_through_unchanged() {
        assert_eq!(Error::Host(HostError(-42)).to_errno(), -42);
        assert_eq!(Error::from(HostError(-7)), Error::Host(HostError(-7)));
    }

    #[test]
    fn only_again_requests_a_retry() {
        assert!(Error::Again.is_retry());
        assert!(!Error::Busy.is_retry());
        assert!(!Error::Timeout.is_retry());
    }
}
