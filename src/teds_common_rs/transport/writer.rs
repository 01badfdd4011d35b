use log::{debug, info};
use std::time::Instant;

use super::memory_bank::MemoryBank;
use crate::teds_common_rs::record::core::exceptions::{TedsResult, TransportError};
use crate::teds_common_rs::record::encoder::EncodedRecord;

/// Writes encoded records to a memory bank and checks them by reading back.
#[derive(Debug, Clone, Copy)]
pub struct TedsWriter {
    verify: bool,
}

impl TedsWriter {
    pub fn new() -> Self {
        Self { verify: true }
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Writes the whole record at offset 0.
    pub fn write_record<B: MemoryBank + ?Sized>(&self, bank: &mut B, record: &EncodedRecord) -> TedsResult<()> {
        self.write_image(bank, &record.buffer)
    }

    /// Zero-fills the bank.
    pub fn clear<B: MemoryBank + ?Sized>(&self, bank: &mut B) -> TedsResult<()> {
        info!("Erasing {}", bank.description());
        let zeros = vec![0u8; bank.size()];
        self.write_image(bank, &zeros)
    }

    /// Reads the full bank image.
    pub fn read_back<B: MemoryBank + ?Sized>(&self, bank: &mut B) -> TedsResult<Vec<u8>> {
        let size = bank.size();
        Ok(bank.read(0, size)?)
    }

    fn write_image<B: MemoryBank + ?Sized>(&self, bank: &mut B, image: &[u8]) -> TedsResult<()> {
        let bank_size = bank.size();
        if image.len() != bank_size {
            return Err(TransportError::OutOfBounds {
                offset: 0,
                len: image.len(),
                bank_size,
            }
            .into());
        }

        let start = Instant::now();
        bank.write(0, image)?;
        info!("Time to write: {}ms ({})", start.elapsed().as_millis(), bank.description());

        if self.verify {
            let read = bank.read(0, image.len())?;
            if let Some((offset, (&expected, &actual))) =
                image.iter().zip(read.iter()).enumerate().find(|(_, (a, b))| a != b)
            {
                return Err(TransportError::VerifyMismatch { offset, expected, actual }.into());
            }
            debug!("read-back of {} bytes matches", read.len());
        }
        Ok(())
    }
}

impl Default for TedsWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::teds_common_rs::record::core::exceptions::TedsError;
    use crate::teds_common_rs::record::encoder::encode;
    use crate::teds_common_rs::record::types::field_record::FieldRecord;
    use crate::teds_common_rs::transport::memory_bank::{InMemoryBank, MockMemoryBank};
    use mockall::predicate::eq;

    fn sample_record(size: usize) -> EncodedRecord {
        encode(&[FieldRecord::new("Value", "5", 8, "", "UNINT")], size).unwrap()
    }

    #[test]
    fn test_write_and_verify() {
        let record = sample_record(32);
        let mut bank = InMemoryBank::new(32);
        TedsWriter::new().write_record(&mut bank, &record).unwrap();
        assert_eq!(bank.contents(), record.buffer.as_slice());
    }

    #[test]
    fn test_size_mismatch() {
        let record = sample_record(32);
        let mut bank = InMemoryBank::new(64);
        let err = TedsWriter::new().write_record(&mut bank, &record).unwrap_err();
        assert!(matches!(err, TedsError::Transport(TransportError::OutOfBounds { .. })));
    }

    #[test]
    fn test_clear() {
        let mut bank = InMemoryBank::new(16);
        bank.write(0, &[0xFF; 16]).unwrap();
        TedsWriter::new().clear(&mut bank).unwrap();
        assert_eq!(bank.contents(), &[0u8; 16]);
    }

    #[test]
    fn test_verify_mismatch_from_faulty_bank() {
        let record = sample_record(32);
        let mut corrupted = record.buffer.clone();
        corrupted[1] = 0x04;

        let mut bank = MockMemoryBank::new();
        bank.expect_size().return_const(32usize);
        bank.expect_description().returning(|| "mock bank".to_string());
        bank.expect_write().withf(|offset, data| *offset == 0 && data.len() == 32).times(1).returning(|_, _| Ok(()));
        bank.expect_read().with(eq(0usize), eq(32usize)).times(1).returning(move |_, _| Ok(corrupted.clone()));

        let err = TedsWriter::new().write_record(&mut bank, &record).unwrap_err();
        assert_eq!(
            err,
            TedsError::Transport(TransportError::VerifyMismatch { offset: 1, expected: 0x05, actual: 0x04 })
        );
    }

    #[test]
    fn test_skip_verify() {
        let record = sample_record(32);
        let mut bank = MockMemoryBank::new();
        bank.expect_size().return_const(32usize);
        bank.expect_description().returning(|| "mock bank".to_string());
        bank.expect_write().times(1).returning(|_, _| Ok(()));
        bank.expect_read().never();
        TedsWriter::new().with_verify(false).write_record(&mut bank, &record).unwrap();
    }
}
