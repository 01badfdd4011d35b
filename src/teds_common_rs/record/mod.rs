//! TEDS レコード
//! 型変換・ビット詰め・チェックサム・符号化パイプライン

pub mod core;
pub mod debug;
pub mod encoder;
pub mod types;

pub use encoder::{data_extent, encode, EncodedRecord, EncoderConfig, FieldPlacement, FillPattern, TedsEncoder};
