#![no_std]
#![forbid(unsafe_code)]
#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

mod scanner;
mod writer;

pub use scanner::{scan, scan_with, ScanConfig, ScanReport};
pub use writer::{write_container, write_fragment};

/// Delimits the start of every fragment.
pub const START_MARKER: [u8; 4] = [0xAA, 0x55, 0xAA, 0x55];
/// Delimits the end of every fragment.
pub const END_MARKER: [u8; 4] = [0x55, 0xAA, 0x55, 0xAA];

/// Payload bytes carried by one fragment.
pub const FRAG_DATA_SIZE: usize = 31;
/// Total on-wire fragment size:
/// start(4) + chunk_num(2) + total(2) + crc32(4) + data(31) + end(4).
pub const FRAGMENT_SIZE: usize = 47;

pub(crate) fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
