//! Capture-buffer fetch and run-length expansion.
//!
//! Compressed instruments emit two kinds of words. A word with the top bit
//! set is a run-length token: it advances the logical sample address by its
//! lower 31 bits without carrying data. Any other word is a real sample at
//! the current logical address; its bit 30 marks the sample captured at the
//! trigger event.

use std::io;

use thiserror::Error;

use crate::bus::{AddrMode, RegisterBus};
use crate::controller::CaptureController;

/// Top bit: this word is a run-length token, not a sample.
pub const RUN_LENGTH_FLAG: u32 = 1 << 31;
/// Bit 30 of a real sample: this sample was captured at the trigger event.
pub const TRIGGER_FLAG: u32 = 1 << 30;
/// Payload mask for both run-length tokens and samples.
pub const SAMPLE_MASK: u32 = RUN_LENGTH_FLAG - 1;

/// Buffers of this many words or fewer are not real instruments.
pub const MIN_BUFFER_WORDS: usize = 4;

/// Terminal failures of capture fetch and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The reported buffer length is too small to be a real instrument.
    #[error("capture buffer length {length} is too small to be an instrument")]
    InvalidGeometry {
        /// Buffer length reported by the status register.
        length: usize,
    },
    /// The run-length stream ended on a token instead of a sample.
    #[error("run-length stream ends on a token at word {index}")]
    MalformedCapture {
        /// Buffer index of the offending final token.
        index: usize,
    },
    /// The underlying bus transaction failed.
    #[error(transparent)]
    Bus(#[from] crate::bus::BusError),
}

/// One decoded sample from a compressed capture stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureRecord {
    /// Dense time axis position of this sample.
    pub logical_address: u64,
    /// Raw sample word as read from the buffer.
    pub word: u32,
    /// True when this sample was captured at the trigger event.
    pub is_trigger: bool,
}

/// Expands a run-length-compressed sample stream into dense records.
///
/// # Errors
///
/// Returns [`CaptureError::MalformedCapture`] when the final buffer word is a
/// run-length token; a valid capture always ends on a real sample.
pub fn expand_compressed(words: &[u32]) -> Result<Vec<CaptureRecord>, CaptureError> {
    let mut records = Vec::new();
    let mut address: u64 = 0;
    for (index, &word) in words.iter().enumerate() {
        if word & RUN_LENGTH_FLAG != 0 {
            if index + 1 == words.len() {
                return Err(CaptureError::MalformedCapture { index });
            }
            address += u64::from(word & SAMPLE_MASK);
        } else {
            records.push(CaptureRecord {
                logical_address: address,
                word,
                is_trigger: word & TRIGGER_FLAG != 0,
            });
            address += 1;
        }
    }
    Ok(records)
}

/// One row of a duplicate-collapsed uncompressed listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayRow {
    /// A sample worth showing.
    Sample {
        /// Buffer index of the sample.
        index: usize,
        /// Raw sample word.
        word: u32,
    },
    /// Marker standing in for a skipped run of duplicates.
    Elided,
}

/// Collapses consecutive duplicate words for display.
///
/// The first word of each run and the final buffer word are always shown; a
/// skipped run is replaced by a single [`DisplayRow::Elided`] marker. This is
/// a display aid only and never feeds decoding.
#[must_use]
pub fn collapse_runs(words: &[u32]) -> Vec<DisplayRow> {
    let mut rows = Vec::new();
    let mut skipped = false;
    for (index, &word) in words.iter().enumerate() {
        let duplicate = index > 0 && word == words[index - 1] && index + 1 != words.len();
        if duplicate {
            skipped = true;
            continue;
        }
        if skipped {
            rows.push(DisplayRow::Elided);
            skipped = false;
        }
        rows.push(DisplayRow::Sample { index, word });
    }
    rows
}

/// Writes a compressed capture as a textual listing.
///
/// Each record line carries the logical address and raw word, then whatever
/// the caller's `decode` callback appends for the payload bits.
///
/// # Errors
///
/// Propagates write failures from `out` or the callback.
pub fn print_compressed(
    out: &mut dyn io::Write,
    records: &[CaptureRecord],
    decode: &dyn Fn(&mut dyn io::Write, u32) -> io::Result<()>,
) -> io::Result<()> {
    let mut last_address: Option<u64> = None;
    for record in records {
        let jump = match last_address {
            Some(last) => record.logical_address - last - 1,
            None => record.logical_address,
        };
        if jump > 0 {
            writeln!(out, " ** (+{jump})")?;
        }
        let trigger = if record.is_trigger { " T" } else { "  " };
        write!(
            out,
            "{:10}{trigger} {:08x}: ",
            record.logical_address, record.word
        )?;
        decode(out, record.word)?;
        writeln!(out)?;
        last_address = Some(record.logical_address);
    }
    Ok(())
}

/// Writes an uncompressed capture as a duplicate-collapsed textual listing.
///
/// # Errors
///
/// Propagates write failures from `out` or the callback.
pub fn print_uncompressed(
    out: &mut dyn io::Write,
    words: &[u32],
    decode: &dyn Fn(&mut dyn io::Write, u32) -> io::Result<()>,
) -> io::Result<()> {
    for row in collapse_runs(words) {
        match row {
            DisplayRow::Sample { index, word } => {
                write!(out, "{index:9} {word:08x}: ")?;
                decode(out, word)?;
                writeln!(out)?;
            }
            DisplayRow::Elided => writeln!(out, " **** ****")?,
        }
    }
    Ok(())
}

/// Session-scoped reader for one instrument's capture buffer.
///
/// The raw buffer is fetched once per session and cached; only an explicit
/// [`CaptureDecoder::invalidate`] allows a fresh fetch.
#[derive(Debug)]
pub struct CaptureDecoder<B> {
    controller: CaptureController<B>,
    compressed: bool,
    vector_read: bool,
    data: Option<Vec<u32>>,
}

impl<B: RegisterBus> CaptureDecoder<B> {
    /// Creates a decoder over `controller`. `compressed` selects run-length
    /// expansion of the sample stream.
    pub const fn new(controller: CaptureController<B>, compressed: bool) -> Self {
        Self {
            controller,
            compressed,
            vector_read: true,
            data: None,
        }
    }

    /// Selects between one vectored burst (the default) and single-beat
    /// register reads for the buffer fetch. Both yield identical data; the
    /// single-beat path is for transports that are not yet trustworthy under
    /// burst traffic.
    #[must_use]
    pub const fn with_vector_read(mut self, vector_read: bool) -> Self {
        self.vector_read = vector_read;
        self
    }

    /// True when this decoder expects a run-length-compressed stream.
    #[must_use]
    pub const fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Borrows the underlying controller.
    pub fn controller_mut(&mut self) -> &mut CaptureController<B> {
        &mut self.controller
    }

    /// Consumes the decoder, returning the controller.
    pub fn into_controller(self) -> CaptureController<B> {
        self.controller
    }

    /// The cached raw buffer, when fetched.
    #[must_use]
    pub fn raw(&self) -> Option<&[u32]> {
        self.data.as_deref()
    }

    /// Discards the cached buffer so the next fetch reads the bus again.
    pub fn invalidate(&mut self) {
        self.data = None;
    }

    /// Fetches the raw buffer into the session cache. A second call is a
    /// no-op until [`CaptureDecoder::invalidate`].
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidGeometry`] when the reported length is
    /// four words or fewer (no real instrument), and propagates bus failures.
    pub fn fetch(&mut self) -> Result<(), CaptureError> {
        if self.data.is_some() {
            return Ok(());
        }
        let length = self.controller.buffer_length()?;
        if length <= MIN_BUFFER_WORDS {
            return Err(CaptureError::InvalidGeometry { length });
        }
        let addr = self.controller.data_addr();
        let words = if self.vector_read {
            // Zero-increment burst: every beat targets the data register.
            self.controller
                .bus_mut()
                .read_burst(addr, length, AddrMode::Fixed)?
        } else {
            let mut words = Vec::with_capacity(length);
            for _ in 0..length {
                words.push(self.controller.bus_mut().read_register(addr)?);
            }
            words
        };
        self.data = Some(words);
        Ok(())
    }

    /// Fetches (if needed) and expands the compressed sample stream.
    ///
    /// # Errors
    ///
    /// Propagates fetch failures and [`CaptureError::MalformedCapture`] from
    /// the expansion.
    pub fn decode_compressed(&mut self) -> Result<Vec<CaptureRecord>, CaptureError> {
        self.fetch()?;
        expand_compressed(self.data.as_deref().unwrap_or(&[]))
    }

    /// Fetches (if needed) and returns the raw buffer, one word per address.
    ///
    /// # Errors
    ///
    /// Propagates fetch failures.
    pub fn decode_uncompressed(&mut self) -> Result<&[u32], CaptureError> {
        self.fetch()?;
        Ok(self.data.as_deref().unwrap_or(&[]))
    }

    /// Index, on the dense time axis, of the sample captured at the trigger
    /// event, when it lies inside the buffer.
    ///
    /// Compressed streams carry an explicit trigger mark. Uncompressed
    /// buffers locate it from the geometry: the capture ends `holdoff`
    /// samples after the trigger, so the trigger sits at
    /// `buffer_length - 1 - holdoff`.
    ///
    /// # Errors
    ///
    /// Propagates fetch and decode failures.
    pub fn trigger_index(&mut self) -> Result<Option<u64>, CaptureError> {
        self.fetch()?;
        if self.compressed {
            let records = expand_compressed(self.data.as_deref().unwrap_or(&[]))?;
            Ok(records
                .iter()
                .find(|record| record.is_trigger)
                .map(|record| record.logical_address))
        } else {
            let length = self.controller.buffer_length()?;
            let holdoff = self.controller.holdoff()?;
            let last = length as u64 - 1;
            Ok(last.checked_sub(u64::from(holdoff)))
        }
    }
}
