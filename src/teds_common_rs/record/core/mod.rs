//! レコードコア機能
//! チェックサム計算、ビット操作、エラー処理等のコア機能

pub mod bit_utils;
pub mod checksum;
pub mod exceptions;

// 便利な再エクスポート
pub use bit_utils::{bytes_to_hex, mask_bits, BitPacker, Cursor, ReservedBytes, END_OF_DATA};
pub use checksum::{calc_block_checksum, embed_block_checksums, verify_block_checksums};
pub use exceptions::{
    ChecksumError, FieldErrorKind, FieldParseError, PackError, SourceError, TedsError, TedsResult, TransportError,
};
