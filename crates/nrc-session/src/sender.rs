//! Sending side of a file-transfer session.
//!
//! Time- and event-driven state machine with no transport of its own:
//! `poll` decides what to put on the wire, `handle_datagram` digests
//! whatever came back. Retries re-encode the message from plaintext, since
//! the rolling codec state has moved on; the self-synchronizing property of
//! the code (the state is always the last two transmitted words) plus the
//! out-of-band sync packets bring a lost receiver back in step.

use alloc::vec::Vec;

use log::{debug, info, warn};
use rand_core::RngCore;

use nrc_codec::{Codec, Dialect};
use nrc_core::{
    AckStatus, ChunkAck, Error, Result, StateSync, SyncRequest, ACK_TIMEOUT_MS, MAX_RETRIES,
};

use crate::FilePayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Announce the file header; acked as chunk 0.
    Header,
    /// Transmit chunk `i`; acked as chunk `i`.
    Chunk(u32),
    Done,
}

pub struct SendSession<R: RngCore> {
    codec: Codec<R>,
    file: FilePayload,
    phase: Phase,
    /// Set once the current message is on the wire: (attempt count,
    /// deadline for the ack).
    in_flight: Option<(u32, u64)>,
    ack_timeout_ms: u64,
    max_retries: u32,
}

impl<R: RngCore> SendSession<R> {
    /// The codec must be configured with coefficients loaded; the session
    /// resets it so both ends start from the agreed initial state.
    pub fn new(mut codec: Codec<R>, file: FilePayload) -> Self {
        codec.reset();
        info!(
            "sending {:?}: {} bytes in {} chunks",
            file.header().filename,
            file.header().file_size,
            file.total_chunks()
        );
        Self {
            codec,
            file,
            phase: Phase::Header,
            in_flight: None,
            ack_timeout_ms: ACK_TIMEOUT_MS,
            max_retries: MAX_RETRIES,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn codec(&self) -> &Codec<R> {
        &self.codec
    }

    /// Index the current phase expects an ack for.
    fn awaited_index(&self) -> Option<u32> {
        match self.phase {
            Phase::Header => Some(0),
            Phase::Chunk(i) => Some(i),
            Phase::Done => None,
        }
    }

    /// Encode the message for the current phase from plaintext.
    fn encode_current(&mut self) -> Result<Vec<u8>> {
        let plain = match self.phase {
            Phase::Header => self.file.header().to_bytes(),
            Phase::Chunk(i) => {
                let (chunk_header, data) = self
                    .file
                    .chunk(i)
                    .ok_or(Error::WireFormat("chunk index out of range"))?;
                chunk_header.to_bytes_with_data(data)
            }
            Phase::Done => return Err(Error::WireFormat("session already complete")),
        };
        self.codec.encode_message(&plain, Dialect::Simple, false)
    }

    /// Advance the clock. Returns a datagram to transmit, or `None` when
    /// the session is idle (waiting for an ack) or finished. Exhausting the
    /// retry budget fails the session.
    pub fn poll(&mut self, now_ms: u64) -> Result<Option<Vec<u8>>> {
        let Some(index) = self.awaited_index() else {
            return Ok(None);
        };

        match self.in_flight {
            None => {
                let frame = self.encode_current()?;
                self.in_flight = Some((1, now_ms + self.ack_timeout_ms));
                debug!("transmitting message for chunk {index} ({} bytes)", frame.len());
                Ok(Some(frame))
            }
            Some((attempts, deadline)) if now_ms >= deadline => {
                if attempts >= self.max_retries {
                    warn!("chunk {index}: no ack after {attempts} attempts");
                    return Err(Error::AckTimeout { chunk: index });
                }
                let frame = self.encode_current()?;
                self.in_flight = Some((attempts + 1, now_ms + self.ack_timeout_ms));
                warn!("chunk {index}: ack timeout, retransmitting (attempt {})", attempts + 1);
                Ok(Some(frame))
            }
            Some(_) => Ok(None),
        }
    }

    /// Digest a datagram from the receiver: an ack or a sync request.
    /// Returns a datagram to transmit in response, if any.
    pub fn handle_datagram(&mut self, datagram: &[u8], now_ms: u64) -> Result<Option<Vec<u8>>> {
        if let Ok(request) = SyncRequest::from_bytes(datagram) {
            // Hand the receiver our current rolling state out-of-band; data
            // is never retransmitted on this path.
            let (h1, h2) = self.codec.enc_state();
            debug!(
                "sync requested at chunk {}; sending state ({h1}, {h2})",
                request.expected_chunk
            );
            return Ok(Some(StateSync { h1, h2 }.to_bytes()));
        }

        let Ok(ack) = ChunkAck::from_bytes(datagram) else {
            debug!("ignoring unrecognized datagram of {} bytes", datagram.len());
            return Ok(None);
        };

        let Some(index) = self.awaited_index() else {
            return Ok(None);
        };
        if ack.chunk_index != index {
            debug!("stale ack for chunk {} while at {index}", ack.chunk_index);
            return Ok(None);
        }

        match ack.status {
            AckStatus::Ok => {
                self.in_flight = None;
                self.phase = match self.phase {
                    Phase::Header if self.file.total_chunks() == 0 => Phase::Done,
                    Phase::Header => Phase::Chunk(0),
                    Phase::Chunk(i) if i + 1 == self.file.total_chunks() => Phase::Done,
                    Phase::Chunk(i) => Phase::Chunk(i + 1),
                    Phase::Done => Phase::Done,
                };
                if self.phase == Phase::Done {
                    info!("transfer complete: all chunks acknowledged");
                }
                Ok(None)
            }
            AckStatus::Resend => {
                let Some((attempts, _)) = self.in_flight else {
                    return Ok(None);
                };
                if attempts >= self.max_retries {
                    return Err(Error::AckTimeout { chunk: index });
                }
                let frame = self.encode_current()?;
                self.in_flight = Some((attempts + 1, now_ms + self.ack_timeout_ms));
                warn!("chunk {index}: receiver asked for a resend");
                Ok(Some(frame))
            }
            AckStatus::Error => Err(Error::Link("receiver reported an unrecoverable error")),
        }
    }
}
