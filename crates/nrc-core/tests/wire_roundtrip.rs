use nrc_core::{AckStatus, ChunkAck, ChunkHeader, Error, FileHeader, StateSync, SyncRequest};

#[test]
fn file_header_roundtrip() {
    let header = FileHeader {
        file_size: 123_456,
        total_chunks: 16,
        chunk_size: 8192,
        file_hash: [0xAB; 32],
        filename: "report.pdf".into(),
    };

    let bytes = header.to_bytes();
    assert_eq!(bytes.len(), FileHeader::FIXED_LEN + 10);
    assert_eq!(&bytes[0..4], &0x4649_4C45u32.to_le_bytes());

    let parsed = FileHeader::from_bytes(&bytes).unwrap();
    assert_eq!(parsed, header);
}

#[test]
fn file_header_rejects_wrong_magic() {
    let header = FileHeader {
        file_size: 1,
        total_chunks: 1,
        chunk_size: 8192,
        file_hash: [0; 32],
        filename: "x".into(),
    };
    let mut bytes = header.to_bytes();
    bytes[0] ^= 0xFF;
    assert!(matches!(
        FileHeader::from_bytes(&bytes),
        Err(Error::WireFormat(_))
    ));
}

#[test]
fn chunk_roundtrip_carries_payload() {
    let data = b"payload bytes";
    let header = ChunkHeader {
        chunk_index: 3,
        total_chunks: 7,
        data_size: data.len() as u32,
        crc32: 0xDEAD_BEEF,
    };

    let bytes = header.to_bytes_with_data(data);
    let (parsed, payload) = ChunkHeader::from_bytes(&bytes).unwrap();
    assert_eq!(parsed, header);
    assert_eq!(payload, data);
}

#[test]
fn chunk_rejects_short_payload() {
    let header = ChunkHeader {
        chunk_index: 0,
        total_chunks: 1,
        data_size: 100,
        crc32: 0,
    };
    let bytes = header.to_bytes_with_data(&[0u8; 10]);
    assert!(ChunkHeader::from_bytes(&bytes).is_err());
}

#[test]
fn ack_roundtrip_and_status_codes() {
    for status in [AckStatus::Ok, AckStatus::Resend, AckStatus::Error] {
        let ack = ChunkAck {
            chunk_index: 42,
            status,
        };
        let parsed = ChunkAck::from_bytes(&ack.to_bytes()).unwrap();
        assert_eq!(parsed, ack);
    }
}

#[test]
fn sync_request_roundtrip() {
    let req = SyncRequest { expected_chunk: 9 };
    assert_eq!(SyncRequest::from_bytes(&req.to_bytes()).unwrap(), req);
}

#[test]
fn state_sync_prefix_discrimination() {
    let sync = StateSync { h1: -5, h2: 117 };
    let bytes = sync.to_bytes();
    assert_eq!(bytes.len(), 12);
    assert_eq!(StateSync::from_bytes(&bytes), Some(sync));

    // Anything not starting with the reserved prefix is not a sync packet.
    assert_eq!(StateSync::from_bytes(b"FILExxxxxxxx"), None);
    assert_eq!(StateSync::from_bytes(&bytes[..11]), None);
}
