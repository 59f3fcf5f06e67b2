//! Length-prefixed message framing over the codec.
//!
//! Frame layout: `[len u16 LE][coded words...]` where `len` counts the
//! plaintext payload bytes (including the optional 32-byte integrity hash),
//! never the coded tail.

use alloc::vec::Vec;

use log::warn;
use rand_core::RngCore;
use sha2::{Digest, Sha256};

use nrc_core::{Error, Result};

use crate::{Codec, Dialect};

/// Bytes of the optional SHA-256 prefix.
pub const HASH_LEN: usize = 32;

impl<R: RngCore> Codec<R> {
    /// Frame and encode one payload. Rolling state carries over from any
    /// previous message on this codec.
    pub fn encode_message(
        &mut self,
        payload: &[u8],
        dialect: Dialect,
        with_hash: bool,
    ) -> Result<Vec<u8>> {
        let hashed;
        let body: &[u8] = if with_hash {
            let digest = Sha256::digest(payload);
            let mut buf = Vec::with_capacity(HASH_LEN + payload.len());
            buf.extend_from_slice(&digest);
            buf.extend_from_slice(payload);
            hashed = buf;
            &hashed
        } else {
            payload
        };

        if body.len() > u16::MAX as usize {
            return Err(Error::InvalidParameter(alloc::format!(
                "message payload of {} bytes exceeds the 65535-byte frame limit",
                body.len()
            )));
        }

        let symbols = nrc_ring::pack::pack(body, self.params.bits_q);
        let coded = match dialect {
            Dialect::Simple => self.encode_symbols(&symbols)?,
            Dialect::Paired => self.encode_symbols_paired(&symbols)?,
        };

        let mut framed = Vec::with_capacity(2 + coded.len());
        framed.extend_from_slice(&(body.len() as u16).to_le_bytes());
        framed.extend_from_slice(&coded);
        Ok(framed)
    }

    /// Decode one frame back to payload bytes.
    ///
    /// A nonzero `expected_len` overrides the length prefix. Too-short
    /// frames decode to empty. A hash mismatch is reported but the payload
    /// is still returned; the caller decides what a damaged message is
    /// worth.
    pub fn decode_message(
        &mut self,
        frame: &[u8],
        expected_len: usize,
        dialect: Dialect,
        with_hash: bool,
    ) -> Result<Vec<u8>> {
        if frame.len() < 2 {
            return Ok(Vec::new());
        }
        let mut len = u16::from_le_bytes([frame[0], frame[1]]) as usize;
        if expected_len != 0 {
            len = expected_len;
        }

        let symbols = match dialect {
            Dialect::Simple => self.decode_symbols(&frame[2..])?,
            Dialect::Paired => self.decode_symbols_paired(&frame[2..])?,
        };
        let bytes = nrc_ring::pack::unpack(&symbols, len, self.params.bits_q);

        if with_hash {
            if bytes.len() < HASH_LEN {
                warn!(
                    "decoded frame too short for integrity hash ({} bytes); \
                     codec parameters may not match the sender",
                    bytes.len()
                );
                return Ok(Vec::new());
            }
            let (received, data) = bytes.split_at(HASH_LEN);
            let actual = Sha256::digest(data);
            if received != actual.as_slice() {
                warn!("message hash mismatch; payload may be damaged");
            }
            return Ok(data.to_vec());
        }
        Ok(bytes)
    }
}
