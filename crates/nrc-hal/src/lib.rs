#![no_std]
#![forbid(unsafe_code)]

use nrc_core::Error;

/// A point-to-point lossy datagram channel.
///
/// INVARIANT: both calls must be non-blocking; `WouldBlock` means "nothing
/// right now", not failure. Datagram boundaries are preserved.
pub trait DatagramLink {
    /// Send one datagram to the peer. Returns bytes accepted.
    fn send(&mut self, frame: &[u8]) -> nb::Result<usize, Error>;

    /// Receive one datagram into `buf`. Returns bytes read.
    fn recv(&mut self, buf: &mut [u8]) -> nb::Result<usize, Error>;
}

/// Monotonic session time.
pub trait WallClock {
    fn now_ms(&self) -> u64;
}
