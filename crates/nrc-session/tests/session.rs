use nrc_codec::{Codec, CodecParams, Dialect};
use nrc_core::{AckStatus, ChunkAck, ChunkHeader, Error, FileHeader, SyncRequest, ACK_TIMEOUT_MS};
use nrc_session::{FileAssembly, FilePayload, ReceiveSession, ReceiverAction, SendSession};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Collision-free table: f_k(x, y) = x + k over sixteen functions.
fn make_codec() -> Codec<ChaCha20Rng> {
    let csv: String = (0..16).map(|k| format!("1, 0, {k}\n")).collect();
    let mut codec = Codec::new(ChaCha20Rng::seed_from_u64(42));
    codec
        .configure(CodecParams {
            bits_q: 4,
            ..Default::default()
        })
        .unwrap();
    codec.load_coefficients_csv(&csv).unwrap();
    codec
}

fn test_file(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 131 % 251) as u8).collect()
}

/// Deliver every datagram both ways until the transfer settles.
fn run_transfer(
    sender: &mut SendSession<ChaCha20Rng>,
    receiver: &mut ReceiveSession<ChaCha20Rng>,
) -> Vec<u8> {
    let mut now = 0u64;
    for _ in 0..10_000 {
        if sender.is_complete() && receiver.is_complete() {
            break;
        }
        if let Some(frame) = sender.poll(now).unwrap() {
            let actions = receiver.handle_datagram(&frame, now).unwrap();
            for action in actions {
                if let ReceiverAction::Transmit(bytes) = action {
                    if let Some(reply) = sender.handle_datagram(&bytes, now).unwrap() {
                        receiver.handle_datagram(&reply, now).unwrap();
                    }
                }
            }
        }
        now += 10;
    }
    assert!(sender.is_complete(), "sender never finished");
    assert!(receiver.is_complete(), "receiver never finished");
    let (_, data) = receiver.take_file().unwrap();
    data
}

#[test]
fn lossless_transfer_roundtrip() {
    let payload = test_file(20_000); // three chunks, last one partial
    let mut sender = SendSession::new(make_codec(), FilePayload::new("blob.bin", payload.clone()));
    let mut receiver = ReceiveSession::new(make_codec());

    let data = run_transfer(&mut sender, &mut receiver);
    assert_eq!(data, payload);

    let header = receiver.header().unwrap();
    assert_eq!(header.filename, "blob.bin");
    assert_eq!(header.total_chunks, 3);
}

#[test]
fn empty_file_transfer() {
    let mut sender = SendSession::new(make_codec(), FilePayload::new("empty", Vec::new()));
    let mut receiver = ReceiveSession::new(make_codec());

    let data = run_transfer(&mut sender, &mut receiver);
    assert!(data.is_empty());
}

#[test]
fn transfer_recovers_from_a_lost_datagram() {
    let payload = test_file(20_000);
    let mut sender = SendSession::new(make_codec(), FilePayload::new("lossy.bin", payload.clone()));
    let mut receiver = ReceiveSession::new(make_codec());

    let mut now = 0u64;
    let mut dropped = false;
    for _ in 0..10_000 {
        if sender.is_complete() && receiver.is_complete() {
            break;
        }
        if let Some(frame) = sender.poll(now).unwrap() {
            // Swallow the first transmission of chunk 1 entirely.
            if !dropped && receiver.progress() > 0.0 && receiver.progress() < 50.0 {
                dropped = true;
            } else {
                let actions = receiver.handle_datagram(&frame, now).unwrap();
                for action in actions {
                    if let ReceiverAction::Transmit(bytes) = action {
                        if let Some(reply) = sender.handle_datagram(&bytes, now).unwrap() {
                            receiver.handle_datagram(&reply, now).unwrap();
                        }
                    }
                }
            }
        }
        now += ACK_TIMEOUT_MS / 4;
    }

    assert!(dropped, "loss was never injected");
    assert!(sender.is_complete() && receiver.is_complete());
    assert_eq!(receiver.take_file().unwrap().1, payload);
}

#[test]
fn sender_times_out_after_retry_budget() {
    let mut sender = SendSession::new(make_codec(), FilePayload::new("x", test_file(100)));

    assert!(sender.poll(0).unwrap().is_some()); // attempt 1
    assert!(sender.poll(10).unwrap().is_none()); // still waiting
    assert!(sender.poll(ACK_TIMEOUT_MS + 1).unwrap().is_some()); // attempt 2
    assert!(sender.poll(2 * ACK_TIMEOUT_MS + 2).unwrap().is_some()); // attempt 3
    assert!(matches!(
        sender.poll(3 * ACK_TIMEOUT_MS + 3),
        Err(Error::AckTimeout { chunk: 0 })
    ));
}

#[test]
fn sender_ignores_stale_acks() {
    let mut sender = SendSession::new(make_codec(), FilePayload::new("x", test_file(100)));
    sender.poll(0).unwrap().unwrap();

    let stale = ChunkAck {
        chunk_index: 7,
        status: AckStatus::Ok,
    };
    assert!(sender.handle_datagram(&stale.to_bytes(), 5).unwrap().is_none());
    assert!(!sender.is_complete());

    // The right ack for a single-chunk file: header ack, then chunk 0 ack.
    let ack0 = ChunkAck {
        chunk_index: 0,
        status: AckStatus::Ok,
    };
    sender.handle_datagram(&ack0.to_bytes(), 6).unwrap();
    sender.poll(7).unwrap().unwrap(); // chunk 0 goes out
    sender.handle_datagram(&ack0.to_bytes(), 8).unwrap();
    assert!(sender.is_complete());
}

#[test]
fn sender_answers_sync_requests_with_its_state() {
    let mut sender = SendSession::new(make_codec(), FilePayload::new("x", test_file(100)));
    sender.poll(0).unwrap().unwrap();

    let request = SyncRequest { expected_chunk: 0 };
    let reply = sender
        .handle_datagram(&request.to_bytes(), 1)
        .unwrap()
        .expect("sync request deserves a sync packet");
    assert_eq!(reply.len(), 12);
    assert_eq!(&reply[0..4], &[0xFF, 0xFE, 0xFD, 0xFC]);

    let (h1, h2) = sender.codec().enc_state();
    assert_eq!(i32::from_le_bytes(reply[4..8].try_into().unwrap()), h1);
    assert_eq!(i32::from_le_bytes(reply[8..12].try_into().unwrap()), h2);
}

#[test]
fn receiver_rate_limits_sync_requests() {
    let mut receiver = ReceiveSession::new(make_codec());

    // Decodes to garbage that parses as nothing: words land in the
    // candidate range but the bytes are not a header.
    let mut garbage = vec![50u8, 0u8];
    garbage.extend(std::iter::repeat(0x08).take(100));

    let actions = receiver.handle_datagram(&garbage, 0).unwrap();
    assert_eq!(actions.len(), 1, "first failure requests a sync");

    let actions = receiver.handle_datagram(&garbage, 500).unwrap();
    assert!(actions.is_empty(), "second request inside the interval is suppressed");

    let actions = receiver.handle_datagram(&garbage, 1100).unwrap();
    assert_eq!(actions.len(), 1, "interval elapsed, sync allowed again");
}

#[test]
fn receiver_asks_for_resend_on_chunk_crc_mismatch() {
    let mut enc = make_codec();
    let mut receiver = ReceiveSession::new(make_codec());

    let header = FileHeader {
        file_size: 10,
        total_chunks: 2,
        chunk_size: 5,
        file_hash: [0; 32],
        filename: "crc".into(),
    };
    let frame = enc
        .encode_message(&header.to_bytes(), Dialect::Simple, false)
        .unwrap();
    let actions = receiver.handle_datagram(&frame, 0).unwrap();
    assert_eq!(actions.len(), 1);

    // Deliberately wrong CRC for the chunk payload.
    let bad_chunk = ChunkHeader {
        chunk_index: 0,
        total_chunks: 2,
        data_size: 5,
        crc32: 0xBAD0_BAD0,
    }
    .to_bytes_with_data(b"hello");
    let frame = enc
        .encode_message(&bad_chunk, Dialect::Simple, false)
        .unwrap();

    let actions = receiver.handle_datagram(&frame, 10).unwrap();
    let ReceiverAction::Transmit(bytes) = &actions[0] else {
        panic!("expected a transmit action");
    };
    let ack = ChunkAck::from_bytes(bytes).unwrap();
    assert_eq!(ack.chunk_index, 0);
    assert_eq!(ack.status, AckStatus::Resend);
}

#[test]
fn duplicate_chunks_are_acked_idempotently() {
    let mut enc = make_codec();
    let mut receiver = ReceiveSession::new(make_codec());
    let payload = FilePayload::new("dup", test_file(100));

    let frame = enc
        .encode_message(&payload.header().to_bytes(), Dialect::Simple, false)
        .unwrap();
    receiver.handle_datagram(&frame, 0).unwrap();

    let (chunk_header, data) = payload.chunk(0).unwrap();
    let plain = chunk_header.to_bytes_with_data(data);

    let frame = enc.encode_message(&plain, Dialect::Simple, false).unwrap();
    let first = receiver.handle_datagram(&frame, 10).unwrap();
    // Single-chunk file: stored plus complete.
    assert!(first.contains(&ReceiverAction::Complete));

    // Same chunk again (the ack was lost): ack again, no state change.
    let frame = enc.encode_message(&plain, Dialect::Simple, false).unwrap();
    let second = receiver.handle_datagram(&frame, 20).unwrap();
    assert_eq!(second.len(), 1);
    let ReceiverAction::Transmit(bytes) = &second[0] else {
        panic!("expected an ack");
    };
    assert_eq!(ChunkAck::from_bytes(bytes).unwrap().status, AckStatus::Ok);

    assert_eq!(receiver.take_file().unwrap().1, test_file(100));
}

#[test]
fn assembly_checks_crc_and_bounds() {
    let header = FileHeader {
        file_size: 4,
        total_chunks: 1,
        chunk_size: 8192,
        file_hash: [0; 32],
        filename: "a".into(),
    };
    let mut assembly = FileAssembly::new(header);

    let out_of_range = ChunkHeader {
        chunk_index: 5,
        total_chunks: 1,
        data_size: 4,
        crc32: 0,
    };
    assert!(assembly.insert(&out_of_range, b"data").is_err());

    let bad_crc = ChunkHeader {
        chunk_index: 0,
        total_chunks: 1,
        data_size: 4,
        crc32: 1,
    };
    assert!(matches!(
        assembly.insert(&bad_crc, b"data"),
        Err(Error::CrcMismatch { chunk: 0 })
    ));
    assert_eq!(assembly.first_missing(), 0);
}

#[test]
fn assembly_detects_file_hash_mismatch() {
    let payload = FilePayload::new("h", b"correct contents".to_vec());
    let mut header = payload.header().clone();
    header.file_hash = [0xEE; 32]; // sender announced a different file

    let mut assembly = FileAssembly::new(header);
    let (chunk_header, data) = payload.chunk(0).unwrap();
    assembly.insert(&chunk_header, data).unwrap();
    assert!(assembly.is_complete());
    assert!(matches!(
        assembly.assemble(),
        Err(Error::FileHashMismatch)
    ));
}

#[test]
fn frame_stream_roundtrip_multi_chunk() {
    let payload = test_file(20_000);
    let mut enc = make_codec();
    let stream =
        nrc_session::encode_frame_stream(&mut enc, "stream.bin", payload.clone(), Dialect::Simple)
            .unwrap();

    let mut dec = make_codec();
    let (header, data) =
        nrc_session::decode_frame_stream(&mut dec, &stream, Dialect::Simple).unwrap();
    assert_eq!(header.filename, "stream.bin");
    assert_eq!(header.total_chunks, 3);
    assert_eq!(data, payload);
}

#[test]
fn frame_stream_roundtrip_paired_dialect() {
    let payload = test_file(500);
    let mut enc = make_codec();
    let stream =
        nrc_session::encode_frame_stream(&mut enc, "paired.bin", payload.clone(), Dialect::Paired)
            .unwrap();

    let mut dec = make_codec();
    let (_, data) = nrc_session::decode_frame_stream(&mut dec, &stream, Dialect::Paired).unwrap();
    assert_eq!(data, payload);
}

#[test]
fn frame_stream_rejects_truncation() {
    let payload = test_file(1000);
    let mut enc = make_codec();
    let stream =
        nrc_session::encode_frame_stream(&mut enc, "t", payload, Dialect::Simple).unwrap();

    let mut dec = make_codec();
    let cut = &stream[..stream.len() - 5];
    assert!(nrc_session::decode_frame_stream(&mut dec, cut, Dialect::Simple).is_err());
}
