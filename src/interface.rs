//! Traits at the seams of the library: the UART/timer pair the framer
//! drives, the complete-frame transport the server pumps, and the register
//! handlers the server invokes.

use crate::errors::{Error, HostError};

/// UART and timer primitives the framer drives.
///
/// [`RtuFramer::receive`](crate::RtuFramer::receive) may be called from a
/// UART receive interrupt; in that case [`frame_received`] runs in the same
/// context and must restrict itself to non-blocking work such as setting a
/// flag or a task notification.
///
/// [`frame_received`]: Self::frame_received
pub trait RtuHost {
    /// (Re)arm the one-shot silence timer; a previous arming is cancelled.
    /// The host must eventually deliver the expiry through
    /// [`RtuFramer::timer_timeout`](crate::RtuFramer::timer_timeout).
    fn start_counter(&mut self, duration_us: u16);

    /// Non-blocking UART write. Returns the number of bytes accepted,
    /// anywhere from 0 to `bytes.len()`.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, HostError>;

    /// A complete frame addressed to this server (or to broadcast) has been
    /// buffered. Invoked exactly once per frame, from within the framer's
    /// call stack.
    fn frame_received(&mut self);
}

/// Complete-frame transport consumed by [`Server`](crate::Server).
///
/// A frame comprises the server address, function code, data and CRC. In
/// the integrated stack this is implemented by
/// [`RtuFramer`](crate::RtuFramer); tests bind it to scripted mocks.
pub trait FrameTransport {
    /// Read a pending frame into `buffer`. Returns `Ok(0)` when no complete
    /// frame is available yet, otherwise the frame length including CRC.
    fn read_frame(&mut self, buffer: &mut [u8]) -> Result<usize, Error>;

    /// Write a complete frame. Returns `Ok(0)` once every byte is on its
    /// way, or `Ok(n)` with `n > 0` when `n` bytes are still pending; in
    /// the latter case the caller must call again with the identical frame
    /// until `Ok(0)` or an error comes back.
    fn write_frame(&mut self, frame: &[u8]) -> Result<usize, Error>;
}

/// Register operations a [`RegisterAccess`] implementation provides.
///
/// Function codes whose operation is absent are answered with exception
/// 0x01 (Illegal Function) before any further validation of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SupportedOps {
    pub read_input_regs: bool,
    pub read_holding_regs: bool,
    pub write_regs: bool,
}

impl SupportedOps {
    pub const NONE: Self = Self {
        read_input_regs: false,
        read_holding_regs: false,
        write_regs: false,
    };

    pub const ALL: Self = Self {
        read_input_regs: true,
        read_holding_regs: true,
        write_regs: true,
    };
}

/// Register accesses the server executes on behalf of the client.
///
/// Implementations declare which operations they provide through
/// [`supported`](Self::supported); a handler is only invoked when its flag
/// is set and the request has been validated. Register data is exchanged
/// as big-endian byte pairs, exactly as laid out on the wire.
///
/// The return convention is inherited from the C register maps this crate
/// stays wire-compatible with, and it is asymmetric on purpose:
///
/// - `0` — busy: the server keeps the request and re-invokes the handler
///   with the same parameters on the next poll. A busy handler must not
///   have written through `out`.
/// - reads: `2 * n_regs` — success;
/// - writes: `n_regs` — success;
/// - any other value — exception 0x02 (Illegal Data Address).
pub trait RegisterAccess {
    /// Operations this register map provides.
    fn supported(&self) -> SupportedOps;

    /// Read `n_regs` input registers starting at `start_addr` into `out`
    /// (`out.len() == 2 * n_regs`). `n_regs` is at most 125.
    fn read_input_regs(&mut self, out: &mut [u8], n_regs: u16, start_addr: u16) -> i16 {
        let _ = (out, n_regs, start_addr);
        -1
    }

    /// Read `n_regs` holding registers starting at `start_addr` into `out`
    /// (`out.len() == 2 * n_regs`). `n_regs` is at most 125.
    fn read_holding_regs(&mut self, out: &mut [u8], n_regs: u16, start_addr: u16) -> i16 {
        let _ = (out, n_regs, start_addr);
        -1
    }

    /// Write `n_regs` registers starting at `start_addr` from `data`
    /// (`data.len() == 2 * n_regs`). Serves both function codes 0x06 and
    /// 0x10. `n_regs` is at most 123.
    fn write_regs(&mut self, data: &[u8], n_regs: u16, start_addr: u16) -> i16 {
        let _ = (data, n_regs, start_addr);
        -1
    }
}
