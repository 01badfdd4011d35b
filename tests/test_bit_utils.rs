use teds_rust::teds_common_rs::record::core::bit_utils::{
    mask_bits, BitPacker, Cursor, ReservedBytes, END_OF_DATA,
};
use teds_rust::teds_common_rs::record::core::exceptions::PackError;

fn block_packer() -> BitPacker {
    BitPacker::new(ReservedBytes::EveryBlock { block_size: 32 })
}

#[test]
fn test_cursor_starts_after_first_checksum_byte() {
    assert_eq!(Cursor::start(ReservedBytes::default()), Cursor::new(1, 0));
    assert_eq!(Cursor::start(ReservedBytes::LeadingByte), Cursor::new(1, 0));
}

#[test]
fn test_exact_byte_fill_resets_bit_offset() {
    let mut buf = [0u8; 32];
    let p = block_packer();
    let c = p.append(&mut buf, Cursor::new(1, 0), 0b101, 3).unwrap();
    let c = p.append(&mut buf, c, 0b11111, 5).unwrap();
    assert_eq!(c.bit_offset, 0);
    assert_eq!(c.byte_index, 2);
    assert_eq!(buf[1], 0b1011_1111);
}

#[test]
fn test_field_landing_on_reserved_byte_skips_it() {
    let mut buf = [0u8; 64];
    let p = block_packer();
    // fill bytes 1..=31 exactly
    let mut c = Cursor::new(1, 0);
    for _ in 0..31 {
        c = p.append(&mut buf, c, 0xAA, 8).unwrap();
    }
    assert_eq!(c, Cursor::new(33, 0));
    let c = p.append(&mut buf, c, 0x55, 8).unwrap();
    assert_eq!(buf[32], 0x00);
    assert_eq!(buf[33], 0x55);
    assert_eq!(c, Cursor::new(34, 0));
}

#[test]
fn test_cursor_pointing_at_reserved_byte_is_advanced() {
    let mut buf = [0u8; 64];
    let c = block_packer().append(&mut buf, Cursor::new(32, 0), 0x7, 3).unwrap();
    assert_eq!(buf[32], 0x00);
    assert_eq!(buf[33], 0b1110_0000);
    assert_eq!(c, Cursor::new(33, 3));
}

#[test]
fn test_reserved_bytes_never_written() {
    let mut buf = vec![0u8; 128];
    let p = block_packer();
    let mut c = Cursor::new(1, 0);
    let widths = [3usize, 17, 9, 32, 5, 11, 1, 24, 7, 30, 13, 19, 8, 32, 32, 32, 32, 32, 32, 32, 32, 32, 32];
    for (i, &w) in widths.iter().enumerate() {
        c = p.append(&mut buf, c, 0xFFFF_FFFF ^ (i as u32), w).unwrap();
    }
    for block in buf.chunks(32) {
        assert_eq!(block[0], 0x00);
    }
}

#[test]
fn test_round_trip_of_mixed_widths() {
    let mut buf = vec![0u8; 96];
    let p = block_packer();
    let values: Vec<(u32, usize)> = vec![
        (0x1, 1),
        (0x2A, 6),
        (0x3FFF, 14),
        (0x1234_5678, 32),
        (0x155, 9),
        (0x7F_FFFF, 23),
        (0x0, 2),
        (0xABCDE, 20),
        (0x12, 5),
        (0xCAFE_F00D, 32),
        (0x3, 2),
        (0xBEEF, 16),
    ];
    let mut starts = Vec::new();
    let mut c = Cursor::new(1, 0);
    for &(v, w) in &values {
        starts.push(c);
        c = p.append(&mut buf, c, v, w).unwrap();
    }
    for (&(v, w), &start) in values.iter().zip(starts.iter()) {
        let (read, _) = p.extract(&buf, start, w).unwrap();
        assert_eq!(read, mask_bits(v, w), "width {} at {:?}", w, start);
    }
}

#[test]
fn test_high_bits_beyond_length_are_discarded() {
    let mut buf = [0u8; 32];
    let p = block_packer();
    p.append(&mut buf, Cursor::new(1, 0), 0xFFFF_FF05, 8).unwrap();
    assert_eq!(buf[1], 0x05);
}

#[test]
fn test_terminator_after_byte_aligned_data() {
    let mut buf = [0u8; 32];
    let p = block_packer();
    let c = p.append(&mut buf, Cursor::new(1, 0), 0x05, 8).unwrap();
    let (index, end) = p.finish(&mut buf, c).unwrap();
    assert_eq!(index, 2);
    assert_eq!(buf[2], END_OF_DATA);
    assert_eq!(end, Cursor::new(3, 0));
}

#[test]
fn test_terminator_skips_reserved_byte() {
    let mut buf = [0u8; 64];
    let p = block_packer();
    let (index, _) = p.finish(&mut buf, Cursor::new(31, 5)).unwrap();
    assert_eq!(index, 33);
    assert_eq!(buf[33], END_OF_DATA);
}

#[test]
fn test_extract_past_end_is_overflow() {
    let buf = [0u8; 4];
    let err = block_packer().extract(&buf, Cursor::new(3, 0), 16).unwrap_err();
    assert!(matches!(err, PackError::BufferOverflow { byte_index: 4, .. }));
}

#[test]
fn test_bit_offset_past_byte_is_rejected() {
    let mut buf = [0u8; 32];
    let p = block_packer();
    assert_eq!(
        p.append(&mut buf, Cursor::new(1, 8), 1, 1),
        Err(PackError::InvalidBitOffset(8))
    );
    assert_eq!(p.extract(&buf, Cursor::new(1, 8), 4), Err(PackError::InvalidBitOffset(8)));
    assert_eq!(buf, [0u8; 32]);
}

#[test]
fn test_packer_rejects_block_size_one() {
    let mut buf = [0u8; 8];
    let p = BitPacker::new(ReservedBytes::EveryBlock { block_size: 1 });
    assert_eq!(
        p.append(&mut buf, Cursor::new(1, 0), 5, 8),
        Err(PackError::InvalidBlockSize(1))
    );
}
