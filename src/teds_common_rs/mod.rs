//! TEDS 共通ライブラリ
//! レコード符号化、フィールドソース、メモリバンク、設定・ログ

pub mod record;
pub mod sources;
pub mod transport;
pub mod utils;
