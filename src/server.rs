//! Modbus application server: request validation, register dispatch and
//! reply composition.

use tracing::{debug, trace};

use crate::config::ServerAddress;
use crate::errors::Error;
use crate::frame::{
    self, ExceptionCode, FunctionCode, BROADCAST_ADDRESS, MAX_FRAME_SIZE, MAX_READ_REGS,
    MAX_WRITE_REGS, MIN_FRAME_SIZE, READ_REQUEST_LEN, WRITE_MULTIPLE_MIN_REQUEST_LEN,
    WRITE_SINGLE_REQUEST_LEN,
};
use crate::interface::{FrameTransport, RegisterAccess};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// A validated request is buffered; its register handler reported busy
    /// and is re-invoked with the same parameters on the next poll.
    ProcessingRequest,
    /// A complete reply (normal or exception) is buffered and draining
    /// through the transport.
    SendReply,
}

/// Application-level request/response state machine.
///
/// The server owns no transport: [`poll`](Self::poll) pumps whichever
/// [`FrameTransport`] it is handed, the [`RtuFramer`](crate::RtuFramer) in
/// the integrated stack. The address must equal the framer's.
pub struct Server<R: RegisterAccess> {
    address: u8,
    registers: R,
    phase: Phase,
    buffer: [u8; MAX_FRAME_SIZE],
    frame_len: usize,
}

impl<R: RegisterAccess> Server<R> {
    pub fn new(address: ServerAddress, registers: R) -> Self {
        Self {
            address: address.get(),
            registers,
            phase: Phase::Idle,
            buffer: [0; MAX_FRAME_SIZE],
            frame_len: 0,
        }
    }

    /// Borrow the register handlers.
    pub fn registers(&self) -> &R {
        &self.registers
    }

    /// Mutably borrow the register handlers.
    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.registers
    }

    /// Drive one step of the request/response cycle.
    ///
    /// Non-blocking and idempotent: returns `Ok(())` when there is nothing
    /// (left) to do, `Err(Again)` when it should be called again soon
    /// because a register handler reported busy or the reply is only
    /// partially written, [`Error::BadMessage`] for an undecodable frame,
    /// and any transport error after forwarding it.
    ///
    /// Replies are composed in an internal buffer whose address identifies
    /// the in-flight frame to the transport, so the server must stay in
    /// place while a reply is draining.
    pub fn poll<T: FrameTransport>(&mut self, transport: &mut T) -> Result<(), Error> {
        match self.phase {
            Phase::Idle => self.await_request(transport),
            Phase::ProcessingRequest => self.dispatch(transport),
            Phase::SendReply => self.emit_reply(transport),
        }
    }

    fn await_request<T: FrameTransport>(&mut self, transport: &mut T) -> Result<(), Error> {
        let len = transport.read_frame(&mut self.buffer)?;
        if len == 0 {
            return Ok(());
        }
        if len < MIN_FRAME_SIZE {
            return Err(Error::BadMessage);
        }
        if !frame::crc_ok(&self.buffer[..len]) {
            debug!(len, "dropping frame with bad CRC");
            return Err(Error::BadMessage);
        }
        let address = self.buffer[0];
        if address != self.address && address != BROADCAST_ADDRESS {
            trace!(address, "frame for another server");
            return Ok(());
        }
        self.frame_len = len;
        self.dispatch(transport)
    }

    fn dispatch<T: FrameTransport>(&mut self, transport: &mut T) -> Result<(), Error> {
        match FunctionCode::try_from(self.buffer[1]) {
            Ok(fc @ (FunctionCode::ReadHoldingRegs | FunctionCode::ReadInputRegs)) => {
                self.process_read(transport, fc)
            }
            Ok(FunctionCode::WriteSingleReg) => self.process_write_single(transport),
            Ok(FunctionCode::WriteMultipleRegs) => self.process_write_multiple(transport),
            Err(code) => {
                trace!(code, "unsupported function code");
                self.reply_exception(transport, ExceptionCode::IllegalFunction)
            }
        }
    }

    fn process_read<T: FrameTransport>(
        &mut self,
        transport: &mut T,
        fc: FunctionCode,
    ) -> Result<(), Error> {
        let supported = match fc {
            FunctionCode::ReadHoldingRegs => self.registers.supported().read_holding_regs,
            _ => self.registers.supported().read_input_regs,
        };
        if !supported {
            return self.reply_exception(transport, ExceptionCode::IllegalFunction);
        }
        if self.frame_len != READ_REQUEST_LEN {
            return self.reply_exception(transport, ExceptionCode::IllegalDataValue);
        }
        let n_regs = frame::reg_count(&self.buffer);
        if n_regs > MAX_READ_REGS {
            return self.reply_exception(transport, ExceptionCode::IllegalDataValue);
        }
        let start_addr = frame::start_addr(&self.buffer);

        // Register data lands directly where the reply expects it.
        let out = &mut self.buffer[3..3 + 2 * n_regs as usize];
        let ret = match fc {
            FunctionCode::ReadHoldingRegs => {
                self.registers.read_holding_regs(out, n_regs, start_addr)
            }
            _ => self.registers.read_input_regs(out, n_regs, start_addr),
        };
        match ret {
            0 => {
                self.phase = Phase::ProcessingRequest;
                Err(Error::Again)
            }
            n if n == 2 * n_regs as i16 => {
                if self.suppress_broadcast_reply() {
                    return Ok(());
                }
                self.frame_len = frame::compose_read_reply(&mut self.buffer, n_regs);
                self.emit_reply(transport)
            }
            _ => self.reply_exception(transport, ExceptionCode::IllegalDataAddress),
        }
    }

    fn process_write_single<T: FrameTransport>(&mut self, transport: &mut T) -> Result<(), Error> {
        if !self.registers.supported().write_regs {
            return self.reply_exception(transport, ExceptionCode::IllegalFunction);
        }
        if self.frame_len != WRITE_SINGLE_REQUEST_LEN {
            return self.reply_exception(transport, ExceptionCode::IllegalDataValue);
        }
        self.finish_write(transport, 4, 1)
    }

    fn process_write_multiple<T: FrameTransport>(
        &mut self,
        transport: &mut T,
    ) -> Result<(), Error> {
        if !self.registers.supported().write_regs {
            return self.reply_exception(transport, ExceptionCode::IllegalFunction);
        }
        if self.frame_len < WRITE_MULTIPLE_MIN_REQUEST_LEN {
            return self.reply_exception(transport, ExceptionCode::IllegalDataValue);
        }
        let n_regs = frame::reg_count(&self.buffer);
        let n_bytes = self.buffer[6] as usize;
        // addr, fc, start address (2B), quantity (2B), byte count, data,
        // CRC (2B)
        let expected_len = 9 + 2 * n_regs as usize;
        if self.frame_len != expected_len
            || n_bytes != 2 * n_regs as usize
            || n_regs > MAX_WRITE_REGS
        {
            return self.reply_exception(transport, ExceptionCode::IllegalDataValue);
        }
        self.finish_write(transport, 7, n_regs)
    }

    fn finish_write<T: FrameTransport>(
        &mut self,
        transport: &mut T,
        data_offset: usize,
        n_regs: u16,
    ) -> Result<(), Error> {
        let start_addr = frame::start_addr(&self.buffer);
        let data = &self.buffer[data_offset..data_offset + 2 * n_regs as usize];
        match self.registers.write_regs(data, n_regs, start_addr) {
            0 => {
                self.phase = Phase::ProcessingRequest;
                Err(Error::Again)
            }
            n if n == n_regs as i16 => {
                if self.suppress_broadcast_reply() {
                    return Ok(());
                }
                self.frame_len = frame::compose_write_reply(&mut self.buffer);
                self.emit_reply(transport)
            }
            _ => self.reply_exception(transport, ExceptionCode::IllegalDataAddress),
        }
    }

    fn reply_exception<T: FrameTransport>(
        &mut self,
        transport: &mut T,
        code: ExceptionCode,
    ) -> Result<(), Error> {
        if self.suppress_broadcast_reply() {
            return Ok(());
        }
        trace!(code = code as u8, fc = self.buffer[1], "exception reply");
        self.frame_len = frame::compose_exception(&mut self.buffer, self.address, code);
        self.emit_reply(transport)
    }

    /// Broadcast requests are executed but never answered; on a shared bus
    /// a reply would collide with the other servers'.
    fn suppress_broadcast_reply(&mut self) -> bool {
        if self.buffer[0] == BROADCAST_ADDRESS {
            trace!("broadcast request, reply suppressed");
            self.reset_state();
            true
        } else {
            false
        }
    }

    fn emit_reply<T: FrameTransport>(&mut self, transport: &mut T) -> Result<(), Error> {
        self.phase = Phase::SendReply;
        match transport.write_frame(&self.buffer[..self.frame_len]) {
            Ok(0) => {
                trace!(len = self.frame_len, "reply sent");
                self.reset_state();
                Ok(())
            }
            Ok(_pending) => Err(Error::Again),
            Err(err) => {
                self.reset_state();
                Err(err)
            }
        }
    }

    fn reset_state(&mut self) {
        self.phase = Phase::Idle;
        self.frame_len = 0;
    }
}
