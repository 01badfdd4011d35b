pub mod field_source;
pub mod range_check;

pub use field_source::{CachedFieldSource, FieldSheetLoader, FieldSource, StaticFieldSource};
pub use range_check::{AcceptAll, ConResBounds, RangeValidator};
