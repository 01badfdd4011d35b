use crate::teds_common_rs::record::core::exceptions::SourceError;
use crate::teds_common_rs::record::types::converter::{parse_linear_range, parse_number, parse_relative_range};
use crate::teds_common_rs::record::types::field_record::{FieldRecord, TypeTag};

/// Hook run on every row as it is read from a field source.
pub trait RangeValidator {
    fn check(&self, record: &FieldRecord) -> Result<(), SourceError>;
}

/// Accepts every value. Used unless a stricter validator is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl RangeValidator for AcceptAll {
    fn check(&self, _record: &FieldRecord) -> Result<(), SourceError> {
        Ok(())
    }
}

/// Rejects ConRes / ConRelRes values that fall outside `<min> to <max>`.
///
/// Other types pass through untouched. Rows that fail to parse are left for
/// the encoder to report, so the error names the field and its index.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConResBounds;

impl RangeValidator for ConResBounds {
    fn check(&self, record: &FieldRecord) -> Result<(), SourceError> {
        let (min, max) = match record.type_tag.parse::<TypeTag>() {
            Ok(TypeTag::ConRes) => match parse_linear_range(&record.range_spec) {
                Ok(range) => (range.min, range.max),
                Err(_) => return Ok(()),
            },
            Ok(TypeTag::ConRelRes) => match parse_relative_range(&record.range_spec) {
                Ok(range) => (range.min, range.max),
                Err(_) => return Ok(()),
            },
            _ => return Ok(()),
        };

        let value = match parse_number(&record.raw_value) {
            Ok(value) => value,
            Err(_) => return Ok(()),
        };

        if value < min.min(max) || value > max.max(min) {
            return Err(SourceError::OutOfRange {
                field: record.name.clone(),
                value: record.raw_value.clone(),
                range: record.range_spec.clone(),
            });
        }
        Ok(())
    }
}
