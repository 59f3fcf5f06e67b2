//! Receiving side of a file-transfer session.
//!
//! Pure protocol: one datagram in, a list of actions out. The caller owns
//! the transport and the clock.

use alloc::vec;
use alloc::vec::Vec;

use log::{debug, info, warn};
use rand_core::RngCore;

use nrc_codec::{Codec, Dialect};
use nrc_core::{
    AckStatus, ChunkAck, ChunkHeader, Error, FileHeader, Result, StateSync, SyncRequest,
    MIN_SYNC_INTERVAL_MS,
};

use crate::FileAssembly;

/// What the caller should do after feeding a datagram in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverAction {
    /// Transmit these bytes back to the sender.
    Transmit(Vec<u8>),
    /// Every chunk is stored; call `take_file`.
    Complete,
}

pub struct ReceiveSession<R: RngCore> {
    codec: Codec<R>,
    assembly: Option<FileAssembly>,
    last_sync_request_ms: Option<u64>,
    sync_interval_ms: u64,
    complete: bool,
}

impl<R: RngCore> ReceiveSession<R> {
    /// The codec must be configured with coefficients loaded; the session
    /// resets it to mirror the sender's starting state.
    pub fn new(mut codec: Codec<R>) -> Self {
        codec.reset();
        Self {
            codec,
            assembly: None,
            last_sync_request_ms: None,
            sync_interval_ms: MIN_SYNC_INTERVAL_MS,
            complete: false,
        }
    }

    pub fn codec(&self) -> &Codec<R> {
        &self.codec
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn header(&self) -> Option<&FileHeader> {
        self.assembly.as_ref().map(|a| a.header())
    }

    pub fn progress(&self) -> f32 {
        self.assembly.as_ref().map_or(0.0, |a| a.progress())
    }

    /// Reassemble and verify the finished file.
    pub fn take_file(&self) -> Result<(FileHeader, Vec<u8>)> {
        let assembly = self
            .assembly
            .as_ref()
            .ok_or(Error::WireFormat("no file header received"))?;
        let data = assembly.assemble()?;
        Ok((assembly.header().clone(), data))
    }

    fn ack(index: u32, status: AckStatus) -> ReceiverAction {
        ReceiverAction::Transmit(
            ChunkAck {
                chunk_index: index,
                status,
            }
            .to_bytes(),
        )
    }

    /// At most one sync request per interval; the sender answers with its
    /// rolling state and never retransmits data on this path.
    fn request_sync(&mut self, now_ms: u64) -> Vec<ReceiverAction> {
        if let Some(last) = self.last_sync_request_ms {
            if now_ms.saturating_sub(last) < self.sync_interval_ms {
                return Vec::new();
            }
        }
        self.last_sync_request_ms = Some(now_ms);
        let expected_chunk = self.assembly.as_ref().map_or(0, |a| a.first_missing());
        warn!("cannot decode incoming data; requesting state sync at chunk {expected_chunk}");
        vec![ReceiverAction::Transmit(
            SyncRequest { expected_chunk }.to_bytes(),
        )]
    }

    /// Digest one datagram from the sender.
    pub fn handle_datagram(&mut self, datagram: &[u8], now_ms: u64) -> Result<Vec<ReceiverAction>> {
        // Sync packets bypass the codec entirely.
        if let Some(sync) = StateSync::from_bytes(datagram) {
            info!("applying state sync ({}, {})", sync.h1, sync.h2);
            self.codec.sync_states(sync.h1, sync.h2);
            return Ok(Vec::new());
        }

        let decoded = self
            .codec
            .decode_message(datagram, 0, Dialect::Simple, false)?;
        if decoded.is_empty() {
            return Ok(self.request_sync(now_ms));
        }

        if self.assembly.is_none() {
            return self.handle_first_message(&decoded, now_ms);
        }
        self.handle_chunk_message(&decoded, now_ms)
    }

    /// Before the header arrives, the only meaningful message is the header.
    fn handle_first_message(&mut self, decoded: &[u8], now_ms: u64) -> Result<Vec<ReceiverAction>> {
        match FileHeader::from_bytes(decoded) {
            Ok(header) => {
                info!(
                    "receiving {:?}: {} bytes in {} chunks",
                    header.filename, header.file_size, header.total_chunks
                );
                let empty = header.total_chunks == 0;
                self.assembly = Some(FileAssembly::new(header));
                let mut actions = vec![Self::ack(0, AckStatus::Ok)];
                if empty {
                    self.complete = true;
                    actions.push(ReceiverAction::Complete);
                }
                Ok(actions)
            }
            Err(_) => {
                debug!(
                    "expected a file header, got {} bytes that do not parse as one",
                    decoded.len()
                );
                Ok(self.request_sync(now_ms))
            }
        }
    }

    fn handle_chunk_message(&mut self, decoded: &[u8], now_ms: u64) -> Result<Vec<ReceiverAction>> {
        let (chunk_header, data) = match ChunkHeader::from_bytes(decoded) {
            Ok(parsed) => parsed,
            Err(_) => {
                // A duplicated header after a lost ack parses here.
                if FileHeader::from_bytes(decoded).is_ok() {
                    debug!("duplicate file header, re-acking");
                    return Ok(vec![Self::ack(0, AckStatus::Ok)]);
                }
                return Ok(self.request_sync(now_ms));
            }
        };

        let index = chunk_header.chunk_index;
        let (outcome, now_complete, total, progress) = match self.assembly.as_mut() {
            Some(assembly) => {
                let outcome = assembly.insert(&chunk_header, data);
                (
                    outcome,
                    assembly.is_complete(),
                    assembly.header().total_chunks,
                    assembly.progress(),
                )
            }
            None => return Ok(Vec::new()),
        };

        match outcome {
            Ok(true) => {
                info!(
                    "chunk {}/{total} stored ({} bytes, {progress:.1}%)",
                    index + 1,
                    data.len()
                );
                let mut actions = vec![Self::ack(index, AckStatus::Ok)];
                if now_complete {
                    self.complete = true;
                    actions.push(ReceiverAction::Complete);
                }
                Ok(actions)
            }
            Ok(false) => {
                debug!("duplicate chunk {index}, re-acking");
                Ok(vec![Self::ack(index, AckStatus::Ok)])
            }
            Err(Error::CrcMismatch { chunk }) => {
                warn!("crc mismatch in chunk {chunk}; asking for a resend");
                Ok(vec![Self::ack(chunk, AckStatus::Resend)])
            }
            Err(e) => {
                warn!("rejecting chunk {index}: {e}");
                Ok(Vec::new())
            }
        }
    }
}
