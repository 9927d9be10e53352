//! Register-bus transaction engine.
//!
//! Two layers make up the bus stack. [`BusPort`] is the cycle-level boundary
//! to simulated or physical hardware: it drives request wires, advances one
//! clock at a time, and samples handshake wires. [`BusTransactor`] turns that
//! into word-level transactions with a bounded-retry failure model, and is the
//! sole implementor of [`RegisterBus`], the contract the rest of the crate
//! consumes.

mod port;
mod transactor;

pub use port::BusPort;
pub use transactor::BusTransactor;

use thiserror::Error;

/// Fixed register word size, in bytes, for the supported bus width.
pub const WORD_BYTES: u32 = 4;

/// Default per-beat polling-cycle bound before a transaction is abandoned.
pub const DEFAULT_BOMB_THRESHOLD: u32 = 32;

/// Handshake discipline a [`BusTransactor`] drives on its port.
///
/// The two disciplines share one request/response port shape; they differ in
/// when the explicit error wire carries a meaningful value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Handshake {
    /// Pipelined discipline: a request may be held off by a stall wire and
    /// completion arrives as a delayed acknowledge. The error wire is live on
    /// every cycle of an open transaction.
    #[default]
    StallAck,
    /// Channel discipline: request and response handshake independently with
    /// valid/ready pairs. The error wire is only meaningful on cycles where
    /// the response is valid.
    ValidReady,
}

/// Address sequencing mode for burst transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AddrMode {
    /// Advance the address by one word per accepted beat.
    Increment,
    /// Hold the address constant, streaming a FIFO-style data register.
    Fixed,
}

/// Runtime configuration for a [`BusTransactor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TransactorConfig {
    /// Handshake discipline driven on the port.
    pub handshake: Handshake,
    /// Polling cycles allowed per beat before the transaction is abandoned.
    /// Bursts scale this linearly by beat count.
    pub bomb_threshold: u32,
    /// Whether the port's explicit error response wire is honored.
    pub error_reporting: bool,
    /// Whether the port's interrupt wire is sampled and latched on each tick.
    pub interrupt_polling: bool,
}

impl Default for TransactorConfig {
    fn default() -> Self {
        Self {
            handshake: Handshake::StallAck,
            bomb_threshold: DEFAULT_BOMB_THRESHOLD,
            error_reporting: false,
            interrupt_polling: false,
        }
    }
}

/// Terminal failures of a bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum BusError {
    /// No acknowledge/valid arrived within the scaled bomb threshold.
    #[error("no bus response after {cycles} polling cycles")]
    Timeout {
        /// Polling cycles spent before the transaction was abandoned.
        cycles: u32,
    },
    /// The bus asserted its explicit error response.
    #[error("bus signalled an error response")]
    ProtocolError,
}

/// Word-level register bus consumed by the capture controller and decoder.
///
/// [`BusTransactor`] is the production implementor; tests substitute stubs.
pub trait RegisterBus {
    /// Reads one register word.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Timeout`] when no response arrives within the bomb
    /// threshold, or [`BusError::ProtocolError`] on an explicit error
    /// response.
    fn read_register(&mut self, addr: u32) -> Result<u32, BusError>;

    /// Writes one register word.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`RegisterBus::read_register`].
    fn write_register(&mut self, addr: u32, value: u32) -> Result<(), BusError>;

    /// Reads `count` words starting at `addr`, sequencing the address per
    /// `mode`. Completions are matched to requests in FIFO order.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Timeout`] when the burst does not complete within
    /// `count` times the bomb threshold, or [`BusError::ProtocolError`] on an
    /// explicit error response.
    fn read_burst(&mut self, addr: u32, count: usize, mode: AddrMode) -> Result<Vec<u32>, BusError>;

    /// Writes `values` starting at `addr`, sequencing the address per `mode`.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`RegisterBus::read_burst`].
    fn write_burst(&mut self, addr: u32, values: &[u32], mode: AddrMode) -> Result<(), BusError>;

    /// Returns true when a latched interrupt is pending.
    fn interrupt_pending(&mut self) -> bool {
        false
    }
}
