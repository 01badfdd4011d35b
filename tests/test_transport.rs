use teds_rust::teds_common_rs::record::core::bit_utils::ReservedBytes;
use teds_rust::teds_common_rs::record::core::checksum::verify_block_checksums;
use teds_rust::teds_common_rs::record::encoder::encode;
use teds_rust::teds_common_rs::record::types::field_record::FieldRecord;
use teds_rust::teds_common_rs::transport::{FileBank, InMemoryBank, MemoryBank, TedsWriter};

fn record() -> teds_rust::teds_common_rs::record::EncodedRecord {
    encode(
        &[
            FieldRecord::new("Manufacturer ID", "43", 14, "", "UNINT"),
            FieldRecord::new("Calibration Date", "2021-07-07", 16, "", "DATE"),
        ],
        64,
    )
    .unwrap()
}

#[test]
fn test_write_then_read_back_from_file_bank() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eeprom.bin");
    let record = record();

    let writer = TedsWriter::new();
    {
        let mut bank = FileBank::open(&path, 64).unwrap();
        writer.write_record(&mut bank, &record).unwrap();
    }

    let mut bank = FileBank::open(&path, 64).unwrap();
    let image = writer.read_back(&mut bank).unwrap();
    assert_eq!(image, record.buffer);
    assert!(verify_block_checksums(&image, ReservedBytes::default(), Some(record.terminator_index)).is_ok());
}

#[test]
fn test_clear_then_write() {
    let mut bank = InMemoryBank::new(64);
    bank.write(0, &[0x5A; 64]).unwrap();
    let writer = TedsWriter::new();
    writer.clear(&mut bank).unwrap();
    assert!(bank.contents().iter().all(|&b| b == 0));
    writer.write_record(&mut bank, &record()).unwrap();
    assert_eq!(bank.contents(), record().buffer.as_slice());
}

#[test]
fn test_bank_used_through_trait_object() {
    let mut bank: Box<dyn MemoryBank> = Box::new(InMemoryBank::new(64));
    TedsWriter::new().write_record(bank.as_mut(), &record()).unwrap();
    assert_eq!(bank.read(0, 64).unwrap(), record().buffer);
}
