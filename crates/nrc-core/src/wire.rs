//! Wire structures for the file-transfer protocol.
//!
//! Every multi-byte field is little-endian and read explicitly; nothing here
//! relies on host struct layout.

use alloc::string::String;
use alloc::vec::Vec;

use crate::{
    Error, Result, MAGIC_FILE_ACK, MAGIC_FILE_CHUNK, MAGIC_FILE_HEADER, MAGIC_SYNC_REQUEST,
    SYNC_PACKET_LEN, SYNC_PACKET_PREFIX,
};

/// Announces one file: sizes, chunking, integrity hash, name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub file_size: u32,
    pub total_chunks: u32,
    pub chunk_size: u32,
    pub file_hash: [u8; 32],
    pub filename: String,
}

impl FileHeader {
    /// Byte length before the variable-length filename.
    pub const FIXED_LEN: usize = 52;

    pub fn to_bytes(&self) -> Vec<u8> {
        let name = self.filename.as_bytes();
        let mut out = Vec::with_capacity(Self::FIXED_LEN + name.len());
        out.extend_from_slice(&MAGIC_FILE_HEADER.to_le_bytes());
        out.extend_from_slice(&self.file_size.to_le_bytes());
        out.extend_from_slice(&self.total_chunks.to_le_bytes());
        out.extend_from_slice(&self.chunk_size.to_le_bytes());
        out.extend_from_slice(&self.file_hash);
        out.extend_from_slice(&(name.len() as u32).to_le_bytes());
        out.extend_from_slice(name);
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::FIXED_LEN {
            return Err(Error::WireFormat("file header truncated"));
        }
        let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        if magic != MAGIC_FILE_HEADER {
            return Err(Error::WireFormat("file header magic mismatch"));
        }
        let file_size = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        let total_chunks = u32::from_le_bytes(buf[8..12].try_into().unwrap());
        let chunk_size = u32::from_le_bytes(buf[12..16].try_into().unwrap());
        let mut file_hash = [0u8; 32];
        file_hash.copy_from_slice(&buf[16..48]);
        let filename_len = u32::from_le_bytes(buf[48..52].try_into().unwrap()) as usize;
        if buf.len() < Self::FIXED_LEN + filename_len {
            return Err(Error::WireFormat("file header filename truncated"));
        }
        let filename = String::from_utf8_lossy(&buf[52..52 + filename_len]).into_owned();
        Ok(Self {
            file_size,
            total_chunks,
            chunk_size,
            file_hash,
            filename,
        })
    }
}

/// Header preceding each chunk's payload inside a framed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub chunk_index: u32,
    pub total_chunks: u32,
    pub data_size: u32,
    pub crc32: u32,
}

impl ChunkHeader {
    pub const SIZE: usize = 20;

    pub fn to_bytes_with_data(&self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE + data.len());
        out.extend_from_slice(&MAGIC_FILE_CHUNK.to_le_bytes());
        out.extend_from_slice(&self.chunk_index.to_le_bytes());
        out.extend_from_slice(&self.total_chunks.to_le_bytes());
        out.extend_from_slice(&self.data_size.to_le_bytes());
        out.extend_from_slice(&self.crc32.to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    /// Splits a buffer into the parsed header and its payload slice.
    /// The CRC field is carried through untouched; the session layer checks it.
    pub fn from_bytes(buf: &[u8]) -> Result<(Self, &[u8])> {
        if buf.len() < Self::SIZE {
            return Err(Error::WireFormat("chunk header truncated"));
        }
        let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        if magic != MAGIC_FILE_CHUNK {
            return Err(Error::WireFormat("chunk magic mismatch"));
        }
        let header = Self {
            chunk_index: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            total_chunks: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            data_size: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
            crc32: u32::from_le_bytes(buf[16..20].try_into().unwrap()),
        };
        let data_size = header.data_size as usize;
        if buf.len() < Self::SIZE + data_size {
            return Err(Error::WireFormat("chunk payload truncated"));
        }
        Ok((header, &buf[Self::SIZE..Self::SIZE + data_size]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AckStatus {
    Ok = 0,
    Resend = 1,
    Error = 2,
}

/// Acknowledgement for one chunk index (index 0 doubles as the header ack).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkAck {
    pub chunk_index: u32,
    pub status: AckStatus,
}

impl ChunkAck {
    pub const SIZE: usize = 12;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&MAGIC_FILE_ACK.to_le_bytes());
        out.extend_from_slice(&self.chunk_index.to_le_bytes());
        out.extend_from_slice(&(self.status as u32).to_le_bytes());
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::WireFormat("ack truncated"));
        }
        let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        if magic != MAGIC_FILE_ACK {
            return Err(Error::WireFormat("ack magic mismatch"));
        }
        let chunk_index = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        let status = match u32::from_le_bytes(buf[8..12].try_into().unwrap()) {
            0 => AckStatus::Ok,
            1 => AckStatus::Resend,
            2 => AckStatus::Error,
            _ => return Err(Error::WireFormat("unknown ack status")),
        };
        Ok(Self {
            chunk_index,
            status,
        })
    }
}

/// Receiver-to-sender request for a codec state resync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncRequest {
    pub expected_chunk: u32,
}

impl SyncRequest {
    pub const SIZE: usize = 8;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&MAGIC_SYNC_REQUEST.to_le_bytes());
        out.extend_from_slice(&self.expected_chunk.to_le_bytes());
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::WireFormat("sync request truncated"));
        }
        let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        if magic != MAGIC_SYNC_REQUEST {
            return Err(Error::WireFormat("sync request magic mismatch"));
        }
        Ok(Self {
            expected_chunk: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
        })
    }
}

/// Out-of-band codec state carrier. Recognized by its prefix before any
/// decode attempt and applied directly to the rolling states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSync {
    pub h1: i32,
    pub h2: i32,
}

impl StateSync {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SYNC_PACKET_LEN);
        out.extend_from_slice(&SYNC_PACKET_PREFIX);
        out.extend_from_slice(&self.h1.to_le_bytes());
        out.extend_from_slice(&self.h2.to_le_bytes());
        out
    }

    /// Returns `None` when the buffer is not a sync packet at all; callers
    /// fall through to normal decoding in that case.
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < SYNC_PACKET_LEN || buf[0..4] != SYNC_PACKET_PREFIX {
            return None;
        }
        Some(Self {
            h1: i32::from_le_bytes(buf[4..8].try_into().unwrap()),
            h2: i32::from_le_bytes(buf[8..12].try_into().unwrap()),
        })
    }
}
