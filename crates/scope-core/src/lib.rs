//! Host-side toolkit for bus-attached logic capture instruments.
//!
//! A capture instrument ("scope") sits behind a register bus and exposes two
//! word-wide registers: a combined control/status register and a data register
//! that streams the capture buffer out one word per read. This crate drives
//! the bus cycle by cycle, interprets the status register, expands the
//! (optionally run-length-compressed) sample stream, and renders the result
//! as a value-change-dump waveform document.

/// Register-bus transaction engine and transport contracts.
pub mod bus;
pub use bus::{
    AddrMode, BusError, BusPort, BusTransactor, Handshake, RegisterBus, TransactorConfig,
    DEFAULT_BOMB_THRESHOLD, WORD_BYTES,
};

/// Control/status register bit-field model.
pub mod status;
pub use status::{
    StatusSnapshot, StatusWord, CMD_DISABLE, CMD_MANUAL_TRIGGER, CMD_NO_RESET, HOLDOFF_MASK,
};

/// Instrument control surface built on the register bus.
pub mod controller;
pub use controller::{CaptureController, DATA_OFFSET, STATUS_OFFSET};

/// Capture-buffer fetch, caching, and run-length expansion.
pub mod capture;
pub use capture::{
    collapse_runs, expand_compressed, print_compressed, print_uncompressed, CaptureDecoder,
    CaptureError, CaptureRecord, DisplayRow, MIN_BUFFER_WORDS, RUN_LENGTH_FLAG, SAMPLE_MASK,
    TRIGGER_FLAG,
};

/// Value-change-dump waveform encoder.
pub mod vcd;
pub use vcd::{TraceError, TraceField, VcdWriter, WaveformSource, MAX_TRACES};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
