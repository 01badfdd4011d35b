pub mod converter;
pub mod field_record;

pub use converter::{convert, decode_value, DecodedValue};
pub use field_record::{EncodedValue, FieldKind, FieldRecord, TypeTag, TypedField};
