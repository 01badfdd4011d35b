use log::{debug, info, warn};

use crate::teds_common_rs::record::core::checksum::{calc_block_checksum, data_block_count};
use crate::teds_common_rs::record::encoder::EncodedRecord;
use crate::teds_common_rs::record::types::field_record::FieldRecord;

/// Record inspection helpers, used by the CLI and by `--debug` runs.
/// - Dumps the hex image and the per-block checksum verdict
/// - Lists where every field landed and what reads back from there
pub struct RecordDebugLogger;

impl RecordDebugLogger {
    pub fn log_record(record: &EncodedRecord) {
        info!("[RecordDebug] image={}", record.to_hex());

        let block_len = record.reserved.block_len(record.buffer.len());
        let blocks = data_block_count(record.buffer.len(), record.reserved, Some(record.terminator_index));
        for (i, block) in record.buffer.chunks(block_len).take(blocks).enumerate() {
            let expected = calc_block_checksum(block);
            if block[0] == expected {
                debug!("[RecordDebug] block {} chk=0x{:02X} ok", i, block[0]);
            } else {
                warn!("[RecordDebug] block {} chk=0x{:02X} expected=0x{:02X}", i, block[0], expected);
            }
        }

        for placement in &record.placements {
            let read_back = match record.decode_field(placement.index) {
                Some(Ok(value)) => value.to_string(),
                Some(Err(e)) => format!("<{}>", e),
                None => "<missing>".to_string(),
            };
            debug!(
                "[RecordDebug] #{} {} byte={} bit={} len={} bits=0x{:X} read_back={}",
                placement.index,
                placement.field.name,
                placement.start.byte_index,
                placement.start.bit_offset,
                placement.value.bit_length,
                placement.value.masked(),
                read_back
            );
        }
        debug!(
            "[RecordDebug] data_end=byte {} bit {} terminator={}",
            record.data_end.byte_index, record.data_end.bit_offset, record.terminator_index
        );
    }
}

/// "Data to be Written" listing of the raw field values.
pub fn format_field_listing(fields: &[FieldRecord]) -> String {
    let width = fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
    let mut out = String::from("Data to be Written:\n");
    for field in fields {
        out.push_str(&format!(
            "{:<width$}  {:<10} {:>2} bits  {}\n",
            field.name,
            field.type_tag.trim(),
            field.bit_length,
            field.raw_value,
            width = width
        ));
    }
    out
}
