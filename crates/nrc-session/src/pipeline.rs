//! On-disk container of codec frames.
//!
//! The stream is the file header message followed by one message per chunk,
//! each framed message preceded by a `u16 LE` count of its total length.
//! The rolling codec state evolves across frames and is reset exactly once
//! per stream on each side.

use alloc::vec::Vec;

use log::{info, warn};
use rand_core::RngCore;

use nrc_codec::{Codec, Dialect};
use nrc_core::{ChunkHeader, Error, FileHeader, Result};

use crate::{FileAssembly, FilePayload};

fn push_framed(out: &mut Vec<u8>, frame: &[u8]) -> Result<()> {
    if frame.is_empty() || frame.len() > u16::MAX as usize {
        return Err(Error::InvalidParameter(alloc::format!(
            "coded frame of {} bytes does not fit the 16-bit stream framing",
            frame.len()
        )));
    }
    out.extend_from_slice(&(frame.len() as u16).to_le_bytes());
    out.extend_from_slice(frame);
    Ok(())
}

/// Encode a whole file into a frame stream.
pub fn encode_frame_stream<R: RngCore>(
    codec: &mut Codec<R>,
    filename: &str,
    data: Vec<u8>,
    dialect: Dialect,
) -> Result<Vec<u8>> {
    codec.reset();
    let payload = FilePayload::new(filename, data);
    let total = payload.total_chunks();
    info!(
        "encoding {filename:?}: {} bytes in {total} chunks",
        payload.header().file_size
    );

    let mut out = Vec::new();
    let header_frame = codec.encode_message(&payload.header().to_bytes(), dialect, false)?;
    push_framed(&mut out, &header_frame)?;

    for index in 0..total {
        let (chunk_header, chunk_data) = payload
            .chunk(index)
            .ok_or(Error::WireFormat("chunk index out of range"))?;
        let frame = codec.encode_message(&chunk_header.to_bytes_with_data(chunk_data), dialect, false)?;
        push_framed(&mut out, &frame)?;
    }
    Ok(out)
}

/// Decode a frame stream back into the announced file.
pub fn decode_frame_stream<R: RngCore>(
    codec: &mut Codec<R>,
    stream: &[u8],
    dialect: Dialect,
) -> Result<(FileHeader, Vec<u8>)> {
    codec.reset();
    let mut assembly: Option<FileAssembly> = None;
    let mut pos = 0usize;

    while pos + 2 <= stream.len() {
        let frame_len = u16::from_le_bytes([stream[pos], stream[pos + 1]]) as usize;
        pos += 2;
        if frame_len == 0 {
            return Err(Error::WireFormat("zero-length frame in stream"));
        }
        if pos + frame_len > stream.len() {
            return Err(Error::WireFormat("truncated frame in stream"));
        }
        let frame = &stream[pos..pos + frame_len];
        pos += frame_len;

        let decoded = codec.decode_message(frame, 0, dialect, false)?;
        if decoded.is_empty() {
            return Err(Error::WireFormat("frame failed to decode"));
        }

        match &mut assembly {
            None => {
                let header = FileHeader::from_bytes(&decoded)?;
                info!(
                    "decoding {:?}: {} bytes in {} chunks",
                    header.filename, header.file_size, header.total_chunks
                );
                assembly = Some(FileAssembly::new(header));
            }
            Some(assembly) => {
                let (chunk_header, chunk_data) = ChunkHeader::from_bytes(&decoded)?;
                if assembly.insert(&chunk_header, chunk_data)? {
                    info!(
                        "chunk {}/{} decoded ({} bytes)",
                        chunk_header.chunk_index + 1,
                        assembly.header().total_chunks,
                        chunk_data.len()
                    );
                } else {
                    warn!("duplicate chunk {} in stream", chunk_header.chunk_index);
                }
            }
        }
    }

    let assembly = assembly.ok_or(Error::WireFormat("stream carries no file header"))?;
    let data = assembly.assemble()?;
    Ok((assembly.header().clone(), data))
}
