#![no_std]
#![forbid(unsafe_code)]
#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

use alloc::string::String;

pub mod wire;

pub use wire::{AckStatus, ChunkAck, ChunkHeader, FileHeader, StateSync, SyncRequest};

/// Protocol magics, little-endian on the wire.
pub const MAGIC_FILE_HEADER: u32 = 0x4649_4C45; // "FILE"
pub const MAGIC_FILE_CHUNK: u32 = 0x4348_4E4B; // "CHNK"
pub const MAGIC_FILE_ACK: u32 = 0x4143_4B00; // "ACK\0"
pub const MAGIC_SYNC_REQUEST: u32 = 0x5359_4E43; // "SYNC"

/// Out-of-band state sync packets start with these four bytes and never pass
/// through the codec.
pub const SYNC_PACKET_PREFIX: [u8; 4] = [0xFF, 0xFE, 0xFD, 0xFC];
pub const SYNC_PACKET_LEN: usize = 12;

/// Data bytes carried by one in-session chunk.
pub const CHUNK_DATA_SIZE: usize = 8192;
/// Upper bound on any single datagram this stack emits or accepts.
pub const MAX_PACKET_SIZE: usize = 16384;

pub const ACK_TIMEOUT_MS: u64 = 1000;
pub const MAX_RETRIES: u32 = 3;
/// Floor between consecutive sync requests from a receiver that cannot
/// decode what it is being sent.
pub const MIN_SYNC_INTERVAL_MS: u64 = 1000;

pub type Result<T> = core::result::Result<T, Error>;

/// Hard failures surfaced to callers. Recoverable conditions (skipped
/// symbols, discarded fragments, partial container recovery) are reported
/// through counters and result values instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Codec parameters outside their legal ranges.
    InvalidParameter(String),
    /// Coefficient table malformed or sized wrongly for Q.
    InvalidCoefficients(String),
    /// Operations invoked out of order (e.g. coefficients before configure).
    OrderingError(&'static str),
    /// A buffer did not parse as the expected wire structure.
    WireFormat(&'static str),
    /// Chunk payload failed its CRC32 check.
    CrcMismatch { chunk: u32 },
    /// No fragment start marker anywhere in the container.
    ContainerEmpty,
    /// Reassembled file does not match the hash announced in the header.
    FileHashMismatch,
    /// Peer never acknowledged a chunk within the retry budget.
    AckTimeout { chunk: u32 },
    /// Transport failure below the protocol.
    Link(&'static str),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidParameter(ctx) => write!(f, "invalid parameter: {ctx}"),
            Error::InvalidCoefficients(ctx) => write!(f, "invalid coefficients: {ctx}"),
            Error::OrderingError(ctx) => write!(f, "ordering error: {ctx}"),
            Error::WireFormat(ctx) => write!(f, "wire format error: {ctx}"),
            Error::CrcMismatch { chunk } => write!(f, "crc mismatch in chunk {chunk}"),
            Error::ContainerEmpty => write!(f, "no fragment markers found in container"),
            Error::FileHashMismatch => write!(f, "file hash mismatch after reassembly"),
            Error::AckTimeout { chunk } => write!(f, "no ack for chunk {chunk} within retry budget"),
            Error::Link(ctx) => write!(f, "link error: {ctx}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
