//! Instrument control surface.
//!
//! A [`CaptureController`] owns the register-bus handle and the instrument's
//! base address, and interprets the control/status register so callers never
//! touch raw bit arithmetic. The buffer geometry (length and holdoff) is a
//! fixed hardware configuration parameter, so it is latched on the first
//! successful status decode and never re-derived within a session.

use crate::bus::{BusError, RegisterBus};
use crate::status::{
    StatusSnapshot, StatusWord, CMD_DISABLE, CMD_MANUAL_TRIGGER, CMD_NO_RESET, HOLDOFF_MASK,
};

/// Byte offset of the control/status register from the instrument base.
pub const STATUS_OFFSET: u32 = 0;
/// Byte offset of the capture data register from the instrument base.
pub const DATA_OFFSET: u32 = 4;

/// Geometry latched from the first status read that reported an instrument.
#[derive(Debug, Clone, Copy)]
struct Geometry {
    buffer_length: usize,
    holdoff: u32,
}

/// Status interpreter and control writer for one capture instrument.
#[derive(Debug)]
pub struct CaptureController<B> {
    bus: B,
    base: u32,
    geometry: Option<Geometry>,
}

impl<B: RegisterBus> CaptureController<B> {
    /// Creates a controller for the instrument at `base` on `bus`.
    pub const fn new(bus: B, base: u32) -> Self {
        Self {
            bus,
            base,
            geometry: None,
        }
    }

    /// Address of the control/status register.
    #[must_use]
    pub const fn status_addr(&self) -> u32 {
        self.base + STATUS_OFFSET
    }

    /// Address of the capture data register.
    #[must_use]
    pub const fn data_addr(&self) -> u32 {
        self.base + DATA_OFFSET
    }

    /// Borrows the underlying bus handle.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Consumes the controller, returning the bus handle.
    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Reads and decodes the status register, latching the geometry on the
    /// first read that reports a present instrument.
    ///
    /// # Errors
    ///
    /// Propagates any [`BusError`] from the status-register read.
    fn read_status(&mut self) -> Result<StatusWord, BusError> {
        let status = StatusWord(self.bus.read_register(self.status_addr())?);
        if self.geometry.is_none() && status.buffer_length() != 0 {
            self.geometry = Some(Geometry {
                buffer_length: status.buffer_length(),
                holdoff: status.holdoff(),
            });
        }
        Ok(status)
    }

    /// True when a capture is complete and the buffer can be read out.
    ///
    /// A zero-length instrument (nothing installed at this address) is never
    /// ready; this reports `false` rather than failing.
    ///
    /// # Errors
    ///
    /// Propagates any [`BusError`] from the status-register read.
    pub fn is_ready(&mut self) -> Result<bool, BusError> {
        let status = self.read_status()?;
        Ok(status.is_ready() && self.geometry.is_some())
    }

    /// Capture-buffer length in words, or 0 when no instrument is present.
    ///
    /// Performs exactly one status read the first time the geometry is
    /// needed and none thereafter within a session.
    ///
    /// # Errors
    ///
    /// Propagates any [`BusError`] from the status-register read.
    pub fn buffer_length(&mut self) -> Result<usize, BusError> {
        if let Some(geometry) = self.geometry {
            return Ok(geometry.buffer_length);
        }
        self.read_status()?;
        Ok(self.geometry.map_or(0, |geometry| geometry.buffer_length))
    }

    /// Latched holdoff: samples captured after the trigger event.
    ///
    /// # Errors
    ///
    /// Propagates any [`BusError`] from the status-register read.
    pub fn holdoff(&mut self) -> Result<u32, BusError> {
        if let Some(geometry) = self.geometry {
            return Ok(geometry.holdoff);
        }
        self.read_status()?;
        Ok(self.geometry.map_or(0, |geometry| geometry.holdoff))
    }

    /// Full decoded status for diagnostic display.
    ///
    /// The live flags come from a fresh read; the geometry fields report the
    /// latched session values so they can never drift mid-session.
    ///
    /// # Errors
    ///
    /// Propagates any [`BusError`] from the status-register read.
    pub fn describe(&mut self) -> Result<StatusSnapshot, BusError> {
        let mut snapshot = self.read_status()?.snapshot();
        if let Some(geometry) = self.geometry {
            snapshot.buffer_length = geometry.buffer_length;
            snapshot.holdoff = geometry.holdoff;
        }
        Ok(snapshot)
    }

    /// Programs a new holdoff, keeping the instrument out of reset.
    ///
    /// # Errors
    ///
    /// Propagates any [`BusError`] from the control-register write.
    pub fn set_holdoff(&mut self, holdoff: u32) -> Result<(), BusError> {
        self.bus
            .write_register(self.status_addr(), CMD_NO_RESET | (holdoff & HOLDOFF_MASK))
    }

    /// Forces a manual trigger.
    ///
    /// # Errors
    ///
    /// Propagates any [`BusError`] from the control-register write.
    pub fn manual_trigger(&mut self) -> Result<(), BusError> {
        self.bus
            .write_register(self.status_addr(), CMD_MANUAL_TRIGGER)
    }

    /// Disables the trigger so the capture free-runs.
    ///
    /// # Errors
    ///
    /// Propagates any [`BusError`] from the control-register write.
    pub fn disable(&mut self) -> Result<(), BusError> {
        self.bus.write_register(self.status_addr(), CMD_DISABLE)
    }

    /// Resets the instrument, discarding the current capture.
    ///
    /// The session geometry latch is kept: the buffer length is a synthesis
    /// parameter and survives reset.
    ///
    /// # Errors
    ///
    /// Propagates any [`BusError`] from the control-register write.
    pub fn reset(&mut self) -> Result<(), BusError> {
        self.bus.write_register(self.status_addr(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::CaptureController;
    use crate::bus::{AddrMode, BusError, RegisterBus};
    use crate::status::{CMD_DISABLE, CMD_MANUAL_TRIGGER, CMD_NO_RESET};

    /// Register-level stub that serves a scripted sequence of status words.
    struct ScriptedBus {
        status_words: Vec<u32>,
        status_reads: usize,
        writes: Vec<(u32, u32)>,
    }

    impl ScriptedBus {
        fn new(status_words: Vec<u32>) -> Self {
            Self {
                status_words,
                status_reads: 0,
                writes: Vec::new(),
            }
        }
    }

    impl RegisterBus for ScriptedBus {
        fn read_register(&mut self, addr: u32) -> Result<u32, BusError> {
            assert_eq!(addr, 0x400, "only the status register is scripted");
            let word = self
                .status_words
                .get(self.status_reads)
                .copied()
                .unwrap_or_else(|| *self.status_words.last().unwrap());
            self.status_reads += 1;
            Ok(word)
        }

        fn write_register(&mut self, addr: u32, value: u32) -> Result<(), BusError> {
            self.writes.push((addr, value));
            Ok(())
        }

        fn read_burst(
            &mut self,
            _addr: u32,
            count: usize,
            _mode: AddrMode,
        ) -> Result<Vec<u32>, BusError> {
            Ok(vec![0; count])
        }

        fn write_burst(
            &mut self,
            _addr: u32,
            _values: &[u32],
            _mode: AddrMode,
        ) -> Result<(), BusError> {
            Ok(())
        }
    }

    fn controller(status_words: Vec<u32>) -> CaptureController<ScriptedBus> {
        CaptureController::new(ScriptedBus::new(status_words), 0x400)
    }

    #[test]
    fn ready_status_latches_length_and_holdoff() {
        let mut ctrl = controller(vec![0x6010_0005]);

        assert_eq!(ctrl.is_ready(), Ok(true));
        assert_eq!(ctrl.buffer_length(), Ok(2));
        assert_eq!(ctrl.holdoff(), Ok(5));
        // Geometry queries after the latch issue no further bus reads.
        assert_eq!(ctrl.into_bus().status_reads, 1);
    }

    #[test]
    fn buffer_length_reads_status_exactly_once() {
        let mut ctrl = controller(vec![0x00C0_0064]);

        assert_eq!(ctrl.buffer_length(), Ok(1 << 12));
        assert_eq!(ctrl.buffer_length(), Ok(1 << 12));
        assert_eq!(ctrl.holdoff(), Ok(100));
        assert_eq!(ctrl.into_bus().status_reads, 1);
    }

    #[test]
    fn absent_instrument_reports_not_ready_without_failing() {
        // Length field zero: nothing installed at this address, even though
        // the stopped/triggered bits happen to read back set.
        let mut ctrl = controller(vec![0x6000_0000]);

        assert_eq!(ctrl.is_ready(), Ok(false));
        assert_eq!(ctrl.buffer_length(), Ok(0));
        assert_eq!(ctrl.is_ready(), Ok(false));
    }

    #[test]
    fn geometry_latch_waits_for_an_instrument_to_appear() {
        // First probe sees nothing; a later probe finds the instrument.
        let mut ctrl = controller(vec![0x0000_0000, 0x2050_000A]);

        assert_eq!(ctrl.buffer_length(), Ok(0));
        assert_eq!(ctrl.buffer_length(), Ok(1 << 5));
        assert_eq!(ctrl.holdoff(), Ok(10));
    }

    #[test]
    fn describe_reports_live_flags_with_latched_geometry() {
        // The latch comes from the first word; the second read flips the
        // holdoff field, which must not leak into the session geometry.
        let mut ctrl = controller(vec![0x2050_000A, 0x6050_0099]);

        let first = ctrl.describe().unwrap();
        assert!(first.triggered);
        assert!(!first.stopped);
        assert_eq!(first.buffer_length, 32);
        assert_eq!(first.holdoff, 10);

        let second = ctrl.describe().unwrap();
        assert!(second.stopped);
        assert_eq!(second.holdoff, 10);
    }

    #[test]
    fn control_writes_target_the_status_register() {
        let mut ctrl = controller(vec![0x6010_0005]);

        ctrl.set_holdoff(0x1_0042).unwrap();
        ctrl.manual_trigger().unwrap();
        ctrl.disable().unwrap();
        ctrl.reset().unwrap();

        let writes = ctrl.into_bus().writes;
        assert_eq!(
            writes,
            vec![
                (0x400, CMD_NO_RESET | 0x1_0042),
                (0x400, CMD_MANUAL_TRIGGER),
                (0x400, CMD_DISABLE),
                (0x400, 0),
            ]
        );
    }
}
