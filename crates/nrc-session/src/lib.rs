#![no_std]
#![forbid(unsafe_code)]
#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use sha2::{Digest, Sha256};

use nrc_core::{ChunkHeader, Error, FileHeader, Result, CHUNK_DATA_SIZE};

mod pipeline;
mod receiver;
mod sender;

pub use pipeline::{decode_frame_stream, encode_frame_stream};
pub use receiver::{ReceiveSession, ReceiverAction};
pub use sender::SendSession;

pub(crate) fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

pub(crate) fn sha256(data: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// A fully buffered file on the sending side, pre-chunked and hashed.
pub struct FilePayload {
    header: FileHeader,
    data: Vec<u8>,
}

impl FilePayload {
    pub fn new(filename: &str, data: Vec<u8>) -> Self {
        let total_chunks = ((data.len() + CHUNK_DATA_SIZE - 1) / CHUNK_DATA_SIZE) as u32;
        let header = FileHeader {
            file_size: data.len() as u32,
            total_chunks,
            chunk_size: CHUNK_DATA_SIZE as u32,
            file_hash: sha256(&data),
            filename: String::from(filename),
        };
        Self { header, data }
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn total_chunks(&self) -> u32 {
        self.header.total_chunks
    }

    /// Chunk header plus payload window for one index.
    pub fn chunk(&self, index: u32) -> Option<(ChunkHeader, &[u8])> {
        if index >= self.header.total_chunks {
            return None;
        }
        let start = index as usize * CHUNK_DATA_SIZE;
        let end = (start + CHUNK_DATA_SIZE).min(self.data.len());
        let data = &self.data[start..end];
        let header = ChunkHeader {
            chunk_index: index,
            total_chunks: self.header.total_chunks,
            data_size: data.len() as u32,
            crc32: crc32(data),
        };
        Some((header, data))
    }
}

/// Sparse receive-side store: presence bitmap plus per-index buffers.
pub struct FileAssembly {
    header: FileHeader,
    present: Vec<bool>,
    buffers: Vec<Vec<u8>>,
    received: u32,
}

impl FileAssembly {
    pub fn new(header: FileHeader) -> Self {
        let total = header.total_chunks as usize;
        Self {
            header,
            present: vec![false; total],
            buffers: vec![Vec::new(); total],
            received: 0,
        }
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Store one verified chunk. Returns false for an (idempotent)
    /// duplicate. The CRC must be checked before storing.
    pub fn insert(&mut self, chunk: &ChunkHeader, data: &[u8]) -> Result<bool> {
        let index = chunk.chunk_index as usize;
        if index >= self.present.len() {
            return Err(Error::WireFormat("chunk index beyond announced total"));
        }
        if crc32(data) != chunk.crc32 {
            return Err(Error::CrcMismatch {
                chunk: chunk.chunk_index,
            });
        }
        if self.present[index] {
            return Ok(false);
        }
        self.buffers[index] = data.to_vec();
        self.present[index] = true;
        self.received += 1;
        Ok(true)
    }

    pub fn is_complete(&self) -> bool {
        self.received == self.header.total_chunks
    }

    pub fn received_count(&self) -> u32 {
        self.received
    }

    pub fn progress(&self) -> f32 {
        if self.header.total_chunks == 0 {
            return 100.0;
        }
        100.0 * self.received as f32 / self.header.total_chunks as f32
    }

    pub fn missing(&self) -> Vec<u32> {
        self.present
            .iter()
            .enumerate()
            .filter(|(_, &p)| !p)
            .map(|(i, _)| i as u32)
            .collect()
    }

    pub fn first_missing(&self) -> u32 {
        self.present.iter().position(|&p| !p).unwrap_or(0) as u32
    }

    /// Concatenate all chunks and verify size and hash.
    pub fn assemble(&self) -> Result<Vec<u8>> {
        if !self.is_complete() {
            return Err(Error::WireFormat("assembly incomplete"));
        }
        let mut data = Vec::with_capacity(self.header.file_size as usize);
        for buffer in &self.buffers {
            data.extend_from_slice(buffer);
        }
        if data.len() != self.header.file_size as usize {
            return Err(Error::FileHashMismatch);
        }
        if sha256(&data) != self.header.file_hash {
            return Err(Error::FileHashMismatch);
        }
        Ok(data)
    }
}
