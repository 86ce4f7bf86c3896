//! Embeddable Modbus RTU server.
//!
//! This crate terminates Modbus application-layer requests carried over a
//! serial RTU link. It performs no I/O of its own: bytes come in from a
//! host-provided UART driver, silence detection runs off a host-provided
//! one-shot microsecond timer, and register accesses go through
//! caller-supplied handlers. That makes the stack usable from a bare-metal
//! superloop, an RTOS task or a plain test harness alike.
//!
//! The core is two cooperating state machines:
//!
//! - [`RtuFramer`] turns the raw byte stream into discrete frames using the
//!   Modbus t1.5/t3.5 silent-interval rules and drives outbound frames byte
//!   by byte with backpressure and timeout recovery;
//! - [`Server`] validates a received frame (address, CRC, function code,
//!   parameter ranges), invokes the register handlers and emits a normal or
//!   exception reply through the framer.
//!
//! Wire the two together by implementing [`RtuHost`] for your UART/timer
//! pair and [`RegisterAccess`] for your register map, then
//!
//! - call [`RtuFramer::receive`] for every byte seen on the bus,
//! - call [`RtuFramer::timer_timeout`] when the armed timer elapses,
//! - call [`Server::poll`] from your main context, repeating while it
//!   returns [`Error::Again`].
//!
//! The caller serializes those entry points; the crate starts no threads
//! and never blocks. Supported function codes: 0x03 (Read Holding
//! Registers), 0x04 (Read Input Registers), 0x06 (Write Single Register)
//! and 0x10 (Write Multiple Registers).

pub mod config;
pub mod crc;
pub mod errors;
pub mod frame;
pub mod framer;
pub mod interface;
pub mod server;

pub use config::{BaudRate, FramerConfig, ServerAddress, SilenceIntervals};
pub use errors::{ConfigError, Error, HostError};
pub use framer::RtuFramer;
pub use interface::{FrameTransport, RegisterAccess, RtuHost, SupportedOps};
pub use server::Server;
