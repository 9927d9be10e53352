//! Control/status register bit-field model.
//!
//! The instrument packs its whole control surface into one 32-bit word:
//!
//! ```text
//!  31     30      29        28     27     26      25   24..20      19..0
//! RESET STOPPED TRIGGERED PRIMED MANUAL DISABLED ZERO LENGTH-LOG2 HOLDOFF
//! ```
//!
//! Reads decode through [`StatusWord`]; writes are composed from the `CMD_*`
//! command bits plus a holdoff value.

/// Reset-ongoing flag (the instrument holds itself reset while clear).
pub const STAT_RESET: u32 = 1 << 31;
/// Capture-stopped flag.
pub const STAT_STOPPED: u32 = 1 << 30;
/// Trigger-seen flag.
pub const STAT_TRIGGERED: u32 = 1 << 29;
/// Buffer-primed flag.
pub const STAT_PRIMED: u32 = 1 << 28;
/// Manual-trigger flag.
pub const STAT_MANUAL: u32 = 1 << 27;
/// Trigger-disabled flag.
pub const STAT_DISABLED: u32 = 1 << 26;
/// Reserved, implementation-defined flag.
pub const STAT_ZERO: u32 = 1 << 25;

/// Mask of the 20-bit holdoff field.
pub const HOLDOFF_MASK: u32 = (1 << 20) - 1;

/// Write this bit to keep the instrument out of reset.
pub const CMD_NO_RESET: u32 = STAT_RESET;
/// Write command forcing a manual trigger.
pub const CMD_MANUAL_TRIGGER: u32 = CMD_NO_RESET | STAT_MANUAL;
/// Write command disabling the trigger.
pub const CMD_DISABLE: u32 = CMD_NO_RESET | STAT_DISABLED;

const LENGTH_LOG2_SHIFT: u32 = 20;
const LENGTH_LOG2_MASK: u32 = 0x1F;
const READY_MASK: u32 = STAT_STOPPED | STAT_TRIGGERED;

/// Decoded view over the raw control/status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord(pub u32);

impl StatusWord {
    /// Raw register value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// True while the instrument's reset is still ongoing.
    #[must_use]
    pub const fn reset_ongoing(self) -> bool {
        self.0 & STAT_RESET != 0
    }

    /// True once the capture has stopped.
    #[must_use]
    pub const fn stopped(self) -> bool {
        self.0 & STAT_STOPPED != 0
    }

    /// True once the trigger has been seen.
    #[must_use]
    pub const fn triggered(self) -> bool {
        self.0 & STAT_TRIGGERED != 0
    }

    /// True once the buffer has filled with pre-trigger samples.
    #[must_use]
    pub const fn primed(self) -> bool {
        self.0 & STAT_PRIMED != 0
    }

    /// True while a manual trigger request is latched.
    #[must_use]
    pub const fn manual(self) -> bool {
        self.0 & STAT_MANUAL != 0
    }

    /// True while the trigger is disabled.
    #[must_use]
    pub const fn disabled(self) -> bool {
        self.0 & STAT_DISABLED != 0
    }

    /// Reserved flag, implementation-defined.
    #[must_use]
    pub const fn zero_flag(self) -> bool {
        self.0 & STAT_ZERO != 0
    }

    /// Log2 of the capture-buffer length, as configured in hardware.
    #[must_use]
    pub const fn length_log2(self) -> u32 {
        (self.0 >> LENGTH_LOG2_SHIFT) & LENGTH_LOG2_MASK
    }

    /// Capture-buffer length in words, or 0 when no instrument is present.
    #[must_use]
    pub const fn buffer_length(self) -> usize {
        if self.length_log2() == 0 {
            0
        } else {
            1 << self.length_log2()
        }
    }

    /// Configured holdoff: samples captured after the trigger event.
    #[must_use]
    pub const fn holdoff(self) -> u32 {
        self.0 & HOLDOFF_MASK
    }

    /// True when a capture is complete: stopped and triggered.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        self.0 & READY_MASK == READY_MASK
    }

    /// Full decoded field set for diagnostic display.
    #[must_use]
    pub const fn snapshot(self) -> StatusSnapshot {
        StatusSnapshot {
            reset_ongoing: self.reset_ongoing(),
            stopped: self.stopped(),
            triggered: self.triggered(),
            primed: self.primed(),
            manual: self.manual(),
            disabled: self.disabled(),
            zero_flag: self.zero_flag(),
            buffer_length: self.buffer_length(),
            holdoff: self.holdoff(),
        }
    }
}

/// Read-only decoded status, suitable for diagnostic printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StatusSnapshot {
    /// Reset still ongoing.
    pub reset_ongoing: bool,
    /// Capture stopped.
    pub stopped: bool,
    /// Trigger seen.
    pub triggered: bool,
    /// Pre-trigger buffer primed.
    pub primed: bool,
    /// Manual trigger latched.
    pub manual: bool,
    /// Trigger disabled.
    pub disabled: bool,
    /// Reserved flag.
    pub zero_flag: bool,
    /// Capture-buffer length in words; 0 means no instrument present.
    pub buffer_length: usize,
    /// Post-trigger holdoff in samples.
    pub holdoff: u32,
}
