//! Value-change-dump waveform encoder.
//!
//! Turns decoded capture data plus caller-declared bit-field traces into a
//! VCD document any standard waveform viewer can load. Compressed captures
//! produce one timestamped record per real sample on the dense time axis;
//! uncompressed captures synthesize a clock-edge pair per sample index.

use std::io;

use thiserror::Error;

use crate::capture::CaptureRecord;

/// Identifier code of the raw sample word.
const RAW_KEY: &str = "'R";
/// Identifier code of the synthetic clock in uncompressed dumps.
const CLOCK_KEY: &str = "'C";
/// Name of the raw sample word variable.
const RAW_NAME: &str = "_raw_data";
/// Valid data width of a compressed sample word.
const COMPRESSED_RAW_BITS: u32 = 31;
/// Width of an uncompressed sample word.
const UNCOMPRESSED_RAW_BITS: u32 = 32;

/// Maximum number of declarable trace fields, bounded by the identifier
/// enumeration `a..z`, `A..Z`, `0..9`.
pub const MAX_TRACES: usize = 26 + 26 + 10;

/// Failures of trace declaration and document emission.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The identifier enumeration is exhausted.
    #[error("trace identifier space exhausted ({MAX_TRACES} fields)")]
    TooManyTraces,
    /// A declared field does not fit inside the raw sample word.
    #[error("trace field {name:?} does not fit a 32-bit word (bits {bits}, shift {shift})")]
    InvalidField {
        /// Rejected field name.
        name: String,
        /// Declared width in bits.
        bits: u32,
        /// Declared bit offset.
        shift: u32,
    },
    /// A declaration arrived after a dump had started.
    #[error("trace declarations are locked once a dump has started")]
    DeclarationLocked,
    /// The output stream failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A named bit-field sliced out of the raw sample word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceField {
    /// Signal name in the waveform document.
    pub name: String,
    /// Field width in bits.
    pub bits: u32,
    /// Bit offset of the field within the raw word.
    pub shift: u32,
    /// Assigned identifier code, fixed at declaration.
    key: String,
}

impl TraceField {
    /// Identifier code assigned to this field.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Identifier character for the `index`-th declared trace.
const fn key_char(index: usize) -> char {
    match index {
        0..=25 => (b'a' + index as u8) as char,
        26..=51 => (b'A' + (index - 26) as u8) as char,
        _ => (b'0' + (index - 52) as u8) as char,
    }
}

/// Sample stream handed to [`VcdWriter::emit`].
#[derive(Debug, Clone, Copy)]
pub enum WaveformSource<'a> {
    /// Expanded records from a run-length-compressed capture.
    Compressed(&'a [CaptureRecord]),
    /// Raw words from an uncompressed capture, one per sample index.
    Uncompressed(&'a [u32]),
}

/// Waveform-document builder: declared traces plus output parameters.
///
/// The declared field set is immutable once the first dump starts; given
/// identical input and declarations the emitted document is byte-identical
/// (no environment-dependent content unless a date string is supplied).
#[derive(Debug)]
pub struct VcdWriter {
    traces: Vec<TraceField>,
    clock_hz: u64,
    date: Option<String>,
    locked: bool,
}

impl VcdWriter {
    /// Creates a writer for a capture clocked at `clock_hz`.
    #[must_use]
    pub const fn new(clock_hz: u64) -> Self {
        Self {
            traces: Vec::new(),
            clock_hz,
            date: None,
            locked: false,
        }
    }

    /// Adds a `$date` line to the header. Left unset, the document carries no
    /// environment-dependent content.
    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Declared trace fields, in declaration order.
    #[must_use]
    pub fn traces(&self) -> &[TraceField] {
        &self.traces
    }

    /// Declares a named bit-field of the raw sample word.
    ///
    /// Identifier codes are assigned in declaration order from a fixed
    /// enumeration, so identical declaration sequences always produce
    /// identical documents.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::DeclarationLocked`] once a dump has started,
    /// [`TraceError::TooManyTraces`] when the identifier space is exhausted,
    /// and [`TraceError::InvalidField`] when the field does not fit inside a
    /// 32-bit sample word (`bits` outside `1..=32` or `shift >= 32`).
    pub fn register_trace(
        &mut self,
        name: impl Into<String>,
        bits: u32,
        shift: u32,
    ) -> Result<(), TraceError> {
        if self.locked {
            return Err(TraceError::DeclarationLocked);
        }
        if self.traces.len() >= MAX_TRACES {
            return Err(TraceError::TooManyTraces);
        }
        if bits == 0 || bits > 32 || shift >= 32 {
            return Err(TraceError::InvalidField {
                name: name.into(),
                bits,
                shift,
            });
        }
        let key = format!("v{}", key_char(self.traces.len()));
        self.traces.push(TraceField {
            name: name.into(),
            bits,
            shift,
            key,
        });
        Ok(())
    }

    /// Writes the full waveform document for `source` to `out`.
    ///
    /// `trigger` is the dense-axis index of the trigger sample, when known;
    /// it becomes a `$timezero` so viewers place the trigger at time zero.
    ///
    /// # Errors
    ///
    /// Propagates output failures as [`TraceError::Io`].
    pub fn emit(
        &mut self,
        source: WaveformSource<'_>,
        trigger: Option<u64>,
        out: &mut dyn io::Write,
    ) -> Result<(), TraceError> {
        self.locked = true;
        self.write_header(source, trigger, out)?;
        match source {
            WaveformSource::Compressed(records) => self.write_compressed_body(records, out)?,
            WaveformSource::Uncompressed(words) => self.write_uncompressed_body(words, out)?,
        }
        Ok(())
    }

    /// Nanosecond timestamp of dense-axis position `address`.
    fn timestamp_ns(&self, address: u64) -> u64 {
        let ns = u128::from(address) * 1_000_000_000 / u128::from(self.clock_hz);
        u64::try_from(ns).unwrap_or(u64::MAX)
    }

    /// Nanosecond timestamp of the falling edge after sample `index`.
    fn half_period_ns(&self, index: u64) -> u64 {
        let ns = (u128::from(index) * 2 + 1) * 500_000_000 / u128::from(self.clock_hz);
        u64::try_from(ns).unwrap_or(u64::MAX)
    }

    fn write_header(
        &self,
        source: WaveformSource<'_>,
        trigger: Option<u64>,
        out: &mut dyn io::Write,
    ) -> io::Result<()> {
        writeln!(out, "$version scope-core waveform dump $end")?;
        if let Some(date) = &self.date {
            writeln!(out, "$date {date} $end")?;
        }
        writeln!(out, "$timescale 1ns $end")?;
        writeln!(out)?;
        if let Some(trigger) = trigger {
            // Negative offset shifts the trigger sample to display time zero.
            writeln!(out, "$timezero -{} $end", self.timestamp_ns(trigger))?;
            writeln!(out)?;
        }

        writeln!(out, " $scope module SCOPE $end")?;
        match source {
            WaveformSource::Compressed(_) => {
                writeln!(
                    out,
                    "  $var wire {COMPRESSED_RAW_BITS:2} {RAW_KEY} {RAW_NAME} [{}:0] $end",
                    COMPRESSED_RAW_BITS - 1
                )?;
            }
            WaveformSource::Uncompressed(_) => {
                writeln!(out, "  $var wire  1 {CLOCK_KEY} clk $end")?;
                writeln!(
                    out,
                    "  $var wire {UNCOMPRESSED_RAW_BITS:2} {RAW_KEY} {RAW_NAME} [{}:0] $end",
                    UNCOMPRESSED_RAW_BITS - 1
                )?;
            }
        }
        for trace in &self.traces {
            if trace.bits > 1 {
                writeln!(
                    out,
                    "  $var wire {:2} {} {} [{}:0] $end",
                    trace.bits,
                    trace.key,
                    trace.name,
                    trace.bits - 1
                )?;
            } else {
                writeln!(
                    out,
                    "  $var wire {:2} {} {} $end",
                    trace.bits, trace.key, trace.name
                )?;
            }
        }
        writeln!(out, " $upscope $end")?;
        writeln!(out, "$enddefinitions $end")?;
        Ok(())
    }

    fn write_compressed_body(
        &self,
        records: &[CaptureRecord],
        out: &mut dyn io::Write,
    ) -> io::Result<()> {
        for record in records {
            writeln!(out, "#{}", self.timestamp_ns(record.logical_address))?;
            write_value(out, COMPRESSED_RAW_BITS, record.word, RAW_KEY)?;
            for trace in &self.traces {
                write_value(out, trace.bits, record.word >> trace.shift, &trace.key)?;
            }
        }
        Ok(())
    }

    fn write_uncompressed_body(&self, words: &[u32], out: &mut dyn io::Write) -> io::Result<()> {
        for (index, &word) in words.iter().enumerate() {
            let index = index as u64;
            // Rising edge: everything changes here.
            writeln!(out, "#{}", self.timestamp_ns(index))?;
            writeln!(out, "1{CLOCK_KEY}")?;
            write_value(out, UNCOMPRESSED_RAW_BITS, word, RAW_KEY)?;
            for trace in &self.traces {
                write_value(out, trace.bits, word >> trace.shift, &trace.key)?;
            }
            // Falling edge half a period later.
            writeln!(out, "#{}", self.half_period_ns(index))?;
            writeln!(out, "0{CLOCK_KEY}")?;
        }
        Ok(())
    }
}

/// Writes one value-change line, masking `value` to exactly `bits` bits.
fn write_value(out: &mut dyn io::Write, bits: u32, value: u32, key: &str) -> io::Result<()> {
    if bits <= 1 {
        return writeln!(out, "{}{key}", value & 1);
    }
    let masked = if bits >= 32 {
        value
    } else {
        value & ((1 << bits) - 1)
    };
    writeln!(out, "b{masked:0width$b} {key}", width = bits as usize)
}
