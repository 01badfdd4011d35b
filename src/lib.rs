/// TEDS Rust Implementation
/// IEEE 1451.4 TEDS record encoder and memory bank writer

pub mod teds_common_rs;

// 便利な再エクスポート
pub mod prelude {
    pub use crate::teds_common_rs::record::core::{Cursor, ReservedBytes, TedsError, TedsResult};
    pub use crate::teds_common_rs::record::types::{FieldRecord, TypeTag};
    pub use crate::teds_common_rs::record::{encode, EncodedRecord, EncoderConfig, FillPattern, TedsEncoder};
    pub use crate::teds_common_rs::sources::{FieldSheetLoader, FieldSource};
    pub use crate::teds_common_rs::transport::{FileBank, InMemoryBank, MemoryBank, TedsWriter};
}
