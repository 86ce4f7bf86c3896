//! Byte layouts of the supported Modbus RTU frames.
//!
//! All helpers operate on the shared 256-byte wire buffer. Requests and
//! replies share their layout prefix, which lets the server compose most
//! replies in place over the request that produced them.

use crate::crc::crc16;

/// Largest RTU frame (ADU) on the wire.
pub const MAX_FRAME_SIZE: usize = 256;

/// Smallest valid frame: address, function code and CRC.
pub const MIN_FRAME_SIZE: usize = 4;

/// Accepted by every server, never replied to.
pub const BROADCAST_ADDRESS: u8 = 0;

/// Upper bound on registers per read request.
pub const MAX_READ_REGS: u16 = 0x7D;

/// Upper bound on registers per write-multiple request.
pub const MAX_WRITE_REGS: u16 = 0x7B;

/// Bit set in the function code of an exception reply.
pub const EXCEPTION_FLAG: u8 = 0x80;

// addr, fc, start address (2B), quantity or value (2B), CRC (2B)
pub(crate) const READ_REQUEST_LEN: usize = 8;
pub(crate) const WRITE_SINGLE_REQUEST_LEN: usize = 8;
// addr, fc, start address (2B), quantity (2B), byte count, one register
// (2B), CRC (2B)
pub(crate) const WRITE_MULTIPLE_MIN_REQUEST_LEN: usize = 11;

/// Function codes this server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCode {
    ReadHoldingRegs = 0x03,
    ReadInputRegs = 0x04,
    WriteSingleReg = 0x06,
    WriteMultipleRegs = 0x10,
}

impl TryFrom<u8> for FunctionCode {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x03 => Ok(Self::ReadHoldingRegs),
            0x04 => Ok(Self::ReadInputRegs),
            0x06 => Ok(Self::WriteSingleReg),
            0x10 => Ok(Self::WriteMultipleRegs),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadHoldingRegs => write!(f, "Read Holding Registers"),
            Self::ReadInputRegs => write!(f, "Read Input Registers"),
            Self::WriteSingleReg => write!(f, "Write Single Register"),
            Self::WriteMultipleRegs => write!(f, "Write Multiple Registers"),
        }
    }
}

/// Exception codes emitted by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExceptionCode {
    IllegalFunction = 0x01,
    IllegalDataAddress = 0x02,
    IllegalDataValue = 0x03,
}

/// Starting register address of a request (bytes 2..=3, big-endian).
pub fn start_addr(frame: &[u8]) -> u16 {
    u16::from_be_bytes([frame[2], frame[3]])
}

/// Register count of a request (bytes 4..=5, big-endian).
pub fn reg_count(frame: &[u8]) -> u16 {
    u16::from_be_bytes([frame[4], frame[5]])
}

/// `true` when the trailing two bytes of `frame` match the CRC over the
/// rest.
pub fn crc_ok(frame: &[u8]) -> bool {
    debug_assert!(frame.len() >= MIN_FRAME_SIZE);
    let (payload, trailer) = frame.split_at(frame.len() - 2);
    crc16(payload) == u16::from_le_bytes([trailer[0], trailer[1]])
}

/// Compute the CRC over `buffer[..len]`, append it and return the full
/// frame length.
pub fn append_crc(buffer: &mut [u8], len: usize) -> usize {
    let crc = crc16(&buffer[..len]);
    buffer[len..len + 2].copy_from_slice(&crc.to_le_bytes());
    len + 2
}

/// Compose an exception reply in place: the buffered function code gains
/// the exception flag and the data is replaced by the exception code.
pub fn compose_exception(buffer: &mut [u8], address: u8, code: ExceptionCode) -> usize {
    buffer[0] = address;
    buffer[1] |= EXCEPTION_FLAG;
    buffer[2] = code as u8;
    append_crc(buffer, 3)
}

/// Compose a read-registers reply around register data already written at
/// `buffer[3..]`.
pub fn compose_read_reply(buffer: &mut [u8], n_regs: u16) -> usize {
    let n_bytes = 2 * n_regs as usize;
    buffer[2] = n_bytes as u8;
    append_crc(buffer, 3 + n_bytes)
}

/// Compose a write reply over the request's first six bytes (address,
/// function code, start address, quantity or value). For function code
/// 0x06 the recomputed CRC equals the request's, so the reply echoes the
/// request byte for byte.
pub fn compose_write_reply(buffer: &mut [u8]) -> usize {
    append_crc(buffer, 6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_field_accessors() {
        let frame = [0x01, 0x03, 0x42, 0x73, 0x00, 0x7B, 0x00, 0x00];
        assert_eq!(start_addr(&frame), 0x4273);
        assert_eq!(reg_count(&frame), 0x7B);
    }

    #[test]
    fn crc_check_accepts_valid_and_rejects_corrupted_frames() {
        let mut frame = [0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B];
        assert!(crc_ok(&frame));
        frame[6] ^= 0x01;
        assert!(!crc_ok(&frame));
    }

    #[test]
    fn exception_reply_layout() {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        buffer[0] = 0x01;
        buffer[1] = 0x04;
        let len = compose_exception(&mut buffer, 0x01, ExceptionCode::IllegalFunction);
        assert_eq!(len, 5);
        assert_eq!(&buffer[..len], [0x01, 0x84, 0x01, 0x82, 0xC0]);
    }

    #[test]
    fn read_reply_layout() {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        buffer[..3].copy_from_slice(&[0x01, 0x03, 0x00]);
        buffer[3..7].copy_from_slice(&[0x00, 0x01, 0x02, 0x03]);
        let len = compose_read_reply(&mut buffer, 2);
        assert_eq!(len, 9);
        assert_eq!(
            &buffer[..len],
            [0x01, 0x03, 0x04, 0x00, 0x01, 0x02, 0x03, 0xEA, 0x92]
        );
    }

    #[test]
    fn write_single_reply_echoes_the_request() {
        let request = [0x01, 0x06, 0x00, 0x00, 0x42, 0x42, 0x39, 0x5B];
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        buffer[..8].copy_from_slice(&request);
        let len = compose_write_reply(&mut buffer);
        assert_eq!(len, 8);
        assert_eq!(&buffer[..len], request);
    }

    #[test]
    fn unknown_function_codes_are_refused() {
        assert_eq!(FunctionCode::try_from(0x03), Ok(FunctionCode::ReadHoldingRegs));
        assert_eq!(FunctionCode::try_from(0x2B), Err(0x2B));
        assert_eq!(FunctionCode::try_from(0x00), Err(0x00));
    }
}
