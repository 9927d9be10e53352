//! Cycle-level transport contract.

/// One clock's worth of bus wires, as seen by the transactor.
///
/// Implementations wrap whatever carries the bus: a simulated digital design,
/// a serial debug link, or a network bridge. The transactor drives requests,
/// calls [`BusPort::tick`] to advance one polling cycle, and samples the
/// handshake wires in between. Wire naming is discipline-neutral:
/// `request_held` is the stall wire in a stall/acknowledge port and the
/// inverted request-ready wire in a valid/ready port; `response_ready` is the
/// acknowledge or the response-valid wire respectively.
pub trait BusPort {
    /// Presents a read request for `addr` on the request wires.
    fn drive_read(&mut self, addr: u32);

    /// Presents a write request for `addr` carrying `data`.
    fn drive_write(&mut self, addr: u32, data: u32);

    /// Withdraws the request strobe/valid while keeping the transaction open.
    fn end_request(&mut self);

    /// Closes the transaction and releases the bus.
    fn release(&mut self);

    /// Advances the transport by one clock.
    fn tick(&mut self);

    /// True while the port cannot accept the presented request.
    fn request_held(&self) -> bool;

    /// True on cycles where a completion (acknowledge or response-valid) is
    /// present.
    fn response_ready(&self) -> bool;

    /// Read-response data word; meaningful only when
    /// [`BusPort::response_ready`] is true.
    fn response_data(&self) -> u32;

    /// Explicit error response wire.
    fn response_error(&self) -> bool;

    /// Interrupt wire, for ports that carry one.
    fn interrupt(&self) -> bool {
        false
    }
}
