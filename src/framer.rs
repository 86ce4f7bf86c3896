//! Modbus RTU frame detection and emission.
//!
//! [`RtuFramer`] owns the byte-level view of the bus. It accumulates
//! incoming bytes into frames using the t1.5/t3.5 silent-interval rules,
//! applies the address filter once the inter-frame silence has elapsed,
//! and drains outbound frames through the host UART with backpressure and
//! a per-character watchdog.

use tracing::{debug, trace, warn};

use crate::config::FramerConfig;
use crate::errors::Error;
use crate::frame::{BROADCAST_ADDRESS, MAX_FRAME_SIZE};
use crate::interface::{FrameTransport, RtuHost};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for the line to go quiet for the first time.
    Init,
    Idle,
    Receiving,
    /// Frame boundary seen; waiting out the rest of the inter-frame
    /// silence before the address filter runs.
    ControlAndWait,
    /// A complete, addressed frame is buffered and must be read out.
    ProcessRxFrame,
    /// Draining a caller-owned frame through the UART.
    Emitting,
    /// The line must stay quiet for t3.5 after the last transmitted byte.
    WaitForTxComplete,
    /// The UART did not accept the next byte within a character time.
    TxTimeout,
}

/// RTU byte-stream state machine.
///
/// One instance per UART + timer binding. The event entry points
/// ([`receive`](Self::receive), [`timer_timeout`](Self::timer_timeout),
/// [`read_pdu`](Self::read_pdu), [`write_pdu`](Self::write_pdu)) must not
/// be invoked re-entrantly; the caller serializes interrupt and polling
/// contexts, either with a mutex or by deferring interrupt work to the
/// polling context through a notification flag.
pub struct RtuFramer<H: RtuHost> {
    address: u8,
    t1_5_us: u16,
    t3_5_us: u16,
    phase: Phase,
    rx_buffer: [u8; MAX_FRAME_SIZE],
    rx_len: usize,
    /// Identity of the caller buffer currently being drained. Only ever
    /// compared, never dereferenced.
    tx_origin: usize,
    tx_total: usize,
    tx_sent: usize,
    host: H,
}

impl<H: RtuHost> RtuFramer<H> {
    /// Create a framer and arm the initial t3.5 interval. The bus must be
    /// seen quiet once before the first frame is accepted; events arriving
    /// earlier return [`Error::Again`].
    pub fn new(config: FramerConfig, host: H) -> Self {
        let silence = config.baud_rate.silence_intervals();
        let mut framer = Self {
            address: config.address.get(),
            t1_5_us: silence.t1_5_us,
            t3_5_us: silence.t3_5_us,
            phase: Phase::Init,
            rx_buffer: [0; MAX_FRAME_SIZE],
            rx_len: 0,
            tx_origin: 0,
            tx_total: 0,
            tx_sent: 0,
            host,
        };
        framer.host.start_counter(framer.t3_5_us);
        framer
    }

    /// Zeroize all buffered state and restart silence detection, exactly
    /// as a freshly constructed framer would.
    pub fn reset(&mut self) {
        self.phase = Phase::Init;
        self.rx_buffer = [0; MAX_FRAME_SIZE];
        self.rx_len = 0;
        self.tx_origin = 0;
        self.tx_total = 0;
        self.tx_sent = 0;
        self.host.start_counter(self.t3_5_us);
    }

    /// Configured unicast address.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Borrow the host interface, e.g. to drain notification flags set by
    /// `frame_received`.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutably borrow the host interface.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Process one received byte. Call for every byte seen on the bus,
    /// addressed to this server or not; the address filter runs once the
    /// frame is complete.
    pub fn receive(&mut self, byte: u8) -> Result<(), Error> {
        match self.phase {
            Phase::Init => {
                // Still mid-silence after startup; the byte belongs to a
                // frame whose beginning we never saw.
                self.host.start_counter(self.t3_5_us);
                Err(Error::Again)
            }
            Phase::Idle => {
                self.rx_buffer[0] = byte;
                self.rx_len = 1;
                self.host.start_counter(self.t1_5_us);
                self.phase = Phase::Receiving;
                Ok(())
            }
            Phase::Receiving => {
                if self.rx_len == MAX_FRAME_SIZE {
                    return Err(Error::NoBufferSpace);
                }
                self.rx_buffer[self.rx_len] = byte;
                self.rx_len += 1;
                self.host.start_counter(self.t1_5_us);
                Ok(())
            }
            Phase::ControlAndWait => {
                // Late byte: the frame ended more than t1.5 ago, so this
                // one is dropped and the full inter-frame silence starts
                // over.
                self.host.start_counter(self.t3_5_us);
                Err(Error::Busy)
            }
            Phase::ProcessRxFrame
            | Phase::Emitting
            | Phase::WaitForTxComplete
            | Phase::TxTimeout => Err(Error::Busy),
        }
    }

    /// Handle expiry of the armed silence timer.
    pub fn timer_timeout(&mut self) -> Result<(), Error> {
        match self.phase {
            Phase::Init => {
                self.rx_len = 0;
                self.phase = Phase::Idle;
                Ok(())
            }
            Phase::Receiving => {
                // t1.5 elapsed: frame boundary. Wait out the remaining
                // inter-frame silence before the address filter runs.
                self.phase = Phase::ControlAndWait;
                self.host.start_counter(self.t3_5_us - self.t1_5_us);
                Ok(())
            }
            Phase::ControlAndWait => {
                let address = self.rx_buffer[0];
                if address == BROADCAST_ADDRESS || address == self.address {
                    debug!(len = self.rx_len, address, "frame received");
                    self.phase = Phase::ProcessRxFrame;
                    self.host.frame_received();
                } else {
                    trace!(address, "frame for another server, discarding");
                    self.phase = Phase::Idle;
                }
                Ok(())
            }
            Phase::Emitting => {
                // The UART sat on the remainder of the frame for more than
                // a character time.
                warn!(sent = self.tx_sent, total = self.tx_total, "transmit stalled");
                self.phase = Phase::TxTimeout;
                Ok(())
            }
            Phase::WaitForTxComplete => {
                self.phase = Phase::Idle;
                Ok(())
            }
            Phase::TxTimeout => Err(Error::Busy),
            Phase::Idle | Phase::ProcessRxFrame => Err(Error::InvalidArgument),
        }
    }

    /// Copy out a received frame (server address, function code, data and
    /// CRC). Returns `Ok(0)` when no complete frame is pending. The
    /// destination must be strictly larger than the pending frame.
    pub fn read_pdu(&mut self, buffer: &mut [u8]) -> Result<usize, Error> {
        match self.phase {
            Phase::ProcessRxFrame => {
                if self.rx_len >= buffer.len() {
                    return Err(Error::InvalidArgument);
                }
                buffer[..self.rx_len].copy_from_slice(&self.rx_buffer[..self.rx_len]);
                self.phase = Phase::Idle;
                Ok(self.rx_len)
            }
            Phase::Init | Phase::Idle | Phase::Receiving | Phase::ControlAndWait => Ok(0),
            Phase::Emitting | Phase::WaitForTxComplete | Phase::TxTimeout => Err(Error::Busy),
        }
    }

    /// Hand a frame to the UART. Returns `Ok(())` once every byte has been
    /// accepted, `Err(Again)` while bytes remain (repeat the call with the
    /// identical slice), `Err(Busy)` while the bus or a previous frame is
    /// in the way, and `Err(Timeout)` when the previous attempt for this
    /// frame stalled.
    ///
    /// The slice identifies the in-flight frame by address, so it must
    /// stay in place and unchanged until `Ok` or a hard error comes back
    /// for it; offering a different slice meanwhile returns `Busy`.
    pub fn write_pdu(&mut self, frame: &[u8]) -> Result<(), Error> {
        if frame.is_empty() || frame.len() > MAX_FRAME_SIZE {
            return Err(Error::InvalidArgument);
        }
        match self.phase {
            Phase::Init => {
                self.host.start_counter(self.t3_5_us);
                Err(Error::Again)
            }
            Phase::Idle => {
                let accepted = self.host.write(frame)?;
                if accepted < frame.len() {
                    trace!(accepted, total = frame.len(), "partial write, draining");
                    self.tx_origin = frame.as_ptr() as usize;
                    self.tx_total = frame.len();
                    self.tx_sent = accepted;
                    self.phase = Phase::Emitting;
                    self.host.start_counter(self.t1_5_us);
                    Err(Error::Again)
                } else {
                    self.phase = Phase::WaitForTxComplete;
                    self.host.start_counter(self.t3_5_us);
                    Ok(())
                }
            }
            Phase::Emitting => {
                if frame.as_ptr() as usize != self.tx_origin {
                    // Not ready for a new frame until this one is done.
                    return Err(Error::Busy);
                }
                if frame.len() != self.tx_total {
                    // Retries must repeat the original parameters.
                    return Err(Error::InvalidArgument);
                }
                let remaining = self.tx_total - self.tx_sent;
                match self.host.write(&frame[self.tx_sent..]) {
                    Err(err) => {
                        self.phase = Phase::WaitForTxComplete;
                        self.host.start_counter(self.t3_5_us);
                        Err(err.into())
                    }
                    Ok(accepted) if accepted >= remaining => {
                        self.phase = Phase::WaitForTxComplete;
                        self.host.start_counter(self.t3_5_us);
                        Ok(())
                    }
                    Ok(accepted) => {
                        self.tx_sent += accepted;
                        self.host.start_counter(self.t1_5_us);
                        Err(Error::Again)
                    }
                }
            }
            Phase::TxTimeout => {
                if frame.as_ptr() as usize == self.tx_origin {
                    // The frame is lost; a full inter-frame silence must
                    // pass before the next one may start.
                    self.phase = Phase::WaitForTxComplete;
                    self.host.start_counter(self.t3_5_us);
                    Err(Error::Timeout)
                } else {
                    Err(Error::Busy)
                }
            }
            Phase::Receiving
            | Phase::ControlAndWait
            | Phase::ProcessRxFrame
            | Phase::WaitForTxComplete => Err(Error::Busy),
        }
    }
}

impl<H: RtuHost> FrameTransport for RtuFramer<H> {
    fn read_frame(&mut self, buffer: &mut [u8]) -> Result<usize, Error> {
        self.read_pdu(buffer)
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<usize, Error> {
        match self.write_pdu(frame) {
            Ok(()) => Ok(0),
            Err(Error::Again) => Ok(match self.phase {
                Phase::Emitting => self.tx_total - self.tx_sent,
                _ => frame.len(),
            }),
            Err(err) => Err(err),
        }
    }
}
