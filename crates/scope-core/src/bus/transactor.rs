//! Word-level transaction driver over a cycle-level port.

use crate::bus::{
    AddrMode, BusError, BusPort, Handshake, RegisterBus, TransactorConfig, WORD_BYTES,
};

/// Drives single-beat and burst register transactions over a [`BusPort`].
///
/// One transactor owns one port; no two transactions are ever in flight at
/// once. Every operation either completes within the configured bomb
/// threshold (scaled by beat count for bursts) or is abandoned with
/// [`BusError::Timeout`], leaving the port released and ready for the next
/// transaction.
#[derive(Debug)]
pub struct BusTransactor<P: BusPort> {
    port: P,
    config: TransactorConfig,
    cycles: u64,
    irq_latched: bool,
}

impl<P: BusPort> BusTransactor<P> {
    /// Creates a transactor over `port` with the given configuration.
    pub const fn new(port: P, config: TransactorConfig) -> Self {
        Self {
            port,
            config,
            cycles: 0,
            irq_latched: false,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &TransactorConfig {
        &self.config
    }

    /// Total polling cycles driven on the port since construction.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// True when an interrupt has been latched since the last
    /// [`BusTransactor::clear_interrupt`].
    #[must_use]
    pub const fn poll(&self) -> bool {
        self.irq_latched
    }

    /// Clears the latched interrupt flag.
    pub fn clear_interrupt(&mut self) {
        self.irq_latched = false;
    }

    /// Consumes the transactor, returning the underlying port.
    pub fn into_port(self) -> P {
        self.port
    }

    /// Parks the bus with no request presented for `count` cycles.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::ProtocolError`] if the port asserts its error
    /// response while idling and error reporting is enabled.
    pub fn idle(&mut self, count: u32) -> Result<(), BusError> {
        self.port.release();
        for _ in 0..count {
            self.step()?;
        }
        Ok(())
    }

    /// Advances one polling cycle: tick the port, account the cycle, latch
    /// interrupts, and honor the error wire per the handshake discipline.
    fn step(&mut self) -> Result<(), BusError> {
        self.port.tick();
        self.cycles += 1;
        if self.config.interrupt_polling && self.port.interrupt() {
            self.irq_latched = true;
        }
        if self.error_live() && self.port.response_error() {
            self.port.release();
            return Err(BusError::ProtocolError);
        }
        Ok(())
    }

    /// Whether the error wire carries a meaningful value this cycle.
    ///
    /// Under stall/acknowledge the wire is live for the whole transaction;
    /// under valid/ready it qualifies only the cycle a response is valid.
    fn error_live(&self) -> bool {
        if !self.config.error_reporting {
            return false;
        }
        match self.config.handshake {
            Handshake::StallAck => true,
            Handshake::ValidReady => self.port.response_ready(),
        }
    }

    /// Abandons the open transaction and reports a timeout.
    fn abandon<T>(&mut self, cycles: u32) -> Result<T, BusError> {
        self.port.release();
        Err(BusError::Timeout { cycles })
    }

    /// Polling budget for a burst of `count` beats.
    fn burst_limit(&self, count: usize) -> u32 {
        let beats = u32::try_from(count).unwrap_or(u32::MAX);
        self.config.bomb_threshold.saturating_mul(beats)
    }

    /// Shared single-beat engine for reads and writes.
    fn single_beat(&mut self, addr: u32, write: Option<u32>) -> Result<u32, BusError> {
        let limit = self.config.bomb_threshold;
        let mut polls = 0_u32;

        match write {
            Some(value) => self.port.drive_write(addr, value),
            None => self.port.drive_read(addr),
        }

        while self.port.request_held() {
            if polls >= limit {
                return self.abandon(polls);
            }
            self.step()?;
            polls += 1;
        }
        // The cycle the request is accepted.
        self.step()?;
        self.port.end_request();

        while !self.port.response_ready() {
            if polls >= limit {
                return self.abandon(polls);
            }
            self.step()?;
            polls += 1;
        }
        let word = self.port.response_data();

        self.port.release();
        self.step()?;
        Ok(word)
    }
}

impl<P: BusPort> RegisterBus for BusTransactor<P> {
    fn read_register(&mut self, addr: u32) -> Result<u32, BusError> {
        self.single_beat(addr, None)
    }

    fn write_register(&mut self, addr: u32, value: u32) -> Result<(), BusError> {
        self.single_beat(addr, Some(value)).map(|_| ())
    }

    fn read_burst(
        &mut self,
        addr: u32,
        count: usize,
        mode: AddrMode,
    ) -> Result<Vec<u32>, BusError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let limit = self.burst_limit(count);
        let mut polls = 0_u32;
        let mut words = Vec::with_capacity(count);
        let mut accepted = 0_usize;
        let mut beat_addr = addr;

        self.port.drive_read(beat_addr);
        while accepted < count {
            if polls >= limit {
                return self.abandon(polls);
            }
            // Sampled the same cycle the request is presented.
            let taken = !self.port.request_held();
            self.step()?;
            polls += 1;
            if self.port.response_ready() && words.len() < count {
                words.push(self.port.response_data());
            }
            if taken {
                accepted += 1;
                if accepted < count {
                    if mode == AddrMode::Increment {
                        beat_addr = beat_addr.wrapping_add(WORD_BYTES);
                    }
                    self.port.drive_read(beat_addr);
                }
            }
        }
        self.port.end_request();

        // Drain completions still owed after the request phase.
        while words.len() < count {
            if polls >= limit {
                return self.abandon(polls);
            }
            self.step()?;
            polls += 1;
            if self.port.response_ready() {
                words.push(self.port.response_data());
            }
        }

        self.port.release();
        self.step()?;
        Ok(words)
    }

    fn write_burst(&mut self, addr: u32, values: &[u32], mode: AddrMode) -> Result<(), BusError> {
        if values.is_empty() {
            return Ok(());
        }
        let count = values.len();
        let limit = self.burst_limit(count);
        let mut polls = 0_u32;
        let mut acks = 0_usize;
        let mut accepted = 0_usize;
        let mut beat_addr = addr;

        self.port.drive_write(beat_addr, values[0]);
        while accepted < count {
            if polls >= limit {
                return self.abandon(polls);
            }
            let taken = !self.port.request_held();
            self.step()?;
            polls += 1;
            // Acknowledges arriving while later beats stall still count.
            if self.port.response_ready() {
                acks += 1;
            }
            if taken {
                accepted += 1;
                if accepted < count {
                    if mode == AddrMode::Increment {
                        beat_addr = beat_addr.wrapping_add(WORD_BYTES);
                    }
                    self.port.drive_write(beat_addr, values[accepted]);
                }
            }
        }
        self.port.end_request();

        while acks < count {
            if polls >= limit {
                return self.abandon(polls);
            }
            self.step()?;
            polls += 1;
            if self.port.response_ready() {
                acks += 1;
            }
        }

        self.port.release();
        self.step()?;
        Ok(())
    }

    fn interrupt_pending(&mut self) -> bool {
        self.irq_latched
    }
}
