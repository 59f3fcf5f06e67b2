use nrc_ring::pack::{pack, unpack};
use nrc_ring::Ring;

#[test]
fn wrap_literals_m8() {
    let ring = Ring::new(8);
    assert_eq!(ring.wrap(130), -126);
    assert_eq!(ring.wrap(-130), 126);
    assert_eq!(ring.wrap(0), 0);
    assert_eq!(ring.wrap(127), 127);
    assert_eq!(ring.wrap(128), -128);
}

#[test]
fn wrap_stays_closed_for_all_widths() {
    // a +/- b*c over representative operands must land inside the ring.
    let samples: [i64; 7] = [i32::MIN as i64, -123_456_789, -1, 0, 1, 987_654_321, i32::MAX as i64];
    for m in 1..=31 {
        let ring = Ring::new(m);
        let lo = -(1i64 << (m - 1));
        let hi = 1i64 << (m - 1);
        for &a in &samples {
            for &b in &samples {
                let v = ring.add(a, ring.mul(b, a ^ b) as i64) as i64;
                assert!(v >= lo && v < hi, "m={m} a={a} b={b} escaped: {v}");
            }
        }
    }
}

#[test]
fn word_bytes_roundtrip_all_widths() {
    for m in 1..=31 {
        let ring = Ring::new(m);
        let values = [
            ring.wrap(0),
            ring.wrap(1),
            ring.wrap(-1),
            ring.wrap(0x55AA_55AA),
            ring.wrap(i64::from(i32::MIN)),
        ];
        for &v in &values {
            let mut buf = Vec::new();
            ring.write_word(v, &mut buf);
            assert_eq!(buf.len(), ring.bytes_per_word());
            assert_eq!(ring.read_word(&buf), v, "m={m} v={v}");
        }
    }
}

#[test]
fn bytes_per_word_boundaries() {
    assert_eq!(Ring::new(1).bytes_per_word(), 1);
    assert_eq!(Ring::new(8).bytes_per_word(), 1);
    assert_eq!(Ring::new(9).bytes_per_word(), 2);
    assert_eq!(Ring::new(16).bytes_per_word(), 2);
    assert_eq!(Ring::new(17).bytes_per_word(), 3);
    assert_eq!(Ring::new(24).bytes_per_word(), 3);
    assert_eq!(Ring::new(25).bytes_per_word(), 4);
    assert_eq!(Ring::new(31).bytes_per_word(), 4);
}

#[test]
fn pack_roundtrip_every_q() {
    let payloads: [&[u8]; 5] = [
        b"",
        b"\x00",
        b"Hello, world!",
        b"\xFF\xFE\xFD\xFC\xFB",
        b"a longer payload that does not divide evenly into most symbol sizes",
    ];
    for q in 1..=16 {
        for payload in payloads {
            let symbols = pack(payload, q);
            let back = unpack(&symbols, payload.len(), q);
            assert_eq!(back, payload, "q={q}");
        }
    }
}

#[test]
fn pack_q8_is_identity() {
    let data = b"identity at eight bits";
    let symbols = pack(data, 8);
    assert_eq!(symbols.len(), data.len());
    for (sym, &b) in symbols.iter().zip(data.iter()) {
        assert_eq!(*sym, b as u16);
    }
}

#[test]
fn pack_q1_emits_one_symbol_per_bit() {
    let symbols = pack(&[0b1010_0110], 1);
    assert_eq!(symbols.len(), 8);
    // little-endian bit order: lsb first
    assert_eq!(symbols, vec![0, 1, 1, 0, 0, 1, 0, 1]);
}

#[test]
fn unpack_truncates_padding() {
    // 3 bytes -> 5-bit symbols: 24 bits -> 5 symbols carrying 25 bits.
    let data = [0xDE, 0xAD, 0xBF];
    let symbols = pack(&data, 5);
    assert_eq!(symbols.len(), 5);
    assert_eq!(unpack(&symbols, 3, 5), data);
    // Asking for fewer bytes stops early.
    assert_eq!(unpack(&symbols, 2, 5), &data[..2]);
}
