/// TEDS レコード処理用エラー型定義
/// 変換・ビット詰め・チェックサム・入出力の各段階に対応するエラー型

use std::error::Error;
use std::fmt;

/// フィールド値・レンジ指定の解析エラー
#[derive(Debug, Clone, PartialEq)]
pub enum FieldParseError {
    /// 数値として解釈できない
    InvalidNumber(String),
    /// 日付として解釈できない (YYYY-MM-DD)
    InvalidDate(String),
    /// レンジ指定の書式不正
    InvalidRangeSpec { spec: String, expected: &'static str },
    /// ビット長が 1..=32 の範囲外
    InvalidBitLength(String),
    /// 型としては解釈できるが符号化できない値
    UnsupportedValue { value: String, reason: String },
}

impl fmt::Display for FieldParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldParseError::InvalidNumber(raw) => write!(f, "invalid number: '{}'", raw),
            FieldParseError::InvalidDate(raw) => {
                write!(f, "invalid date '{}' (expected YYYY-MM-DD)", raw)
            }
            FieldParseError::InvalidRangeSpec { spec, expected } => {
                write!(f, "invalid range spec '{}' (expected '{}')", spec, expected)
            }
            FieldParseError::InvalidBitLength(raw) => {
                write!(f, "invalid bit length '{}' (expected 1..=32)", raw)
            }
            FieldParseError::UnsupportedValue { value, reason } => {
                write!(f, "cannot encode '{}': {}", value, reason)
            }
        }
    }
}

impl Error for FieldParseError {}

/// ビット詰めエラー
#[derive(Debug, Clone, PartialEq)]
pub enum PackError {
    /// 書き込み位置がバッファ末尾を越えた
    BufferOverflow {
        byte_index: usize,
        bit_offset: u8,
        buffer_len: usize,
    },
    /// 1..=32 以外のビット長
    InvalidLength(usize),
    /// 0..=7 以外のビットオフセット
    InvalidBitOffset(u8),
    /// 予約バイトを含められないブロック長（2 未満）
    InvalidBlockSize(usize),
}

impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackError::BufferOverflow { byte_index, bit_offset, buffer_len } => write!(
                f,
                "buffer overflow at byte {} bit {} (buffer is {} bytes)",
                byte_index, bit_offset, buffer_len
            ),
            PackError::InvalidLength(len) => write!(f, "invalid bit length {} (expected 1..=32)", len),
            PackError::InvalidBitOffset(offset) => write!(f, "invalid bit offset {} (expected 0..=7)", offset),
            PackError::InvalidBlockSize(size) => write!(f, "invalid block size {} (at least 2 bytes)", size),
        }
    }
}

impl Error for PackError {}

/// 1 フィールドの処理中に発生したエラーの種別
#[derive(Debug, Clone, PartialEq)]
pub enum FieldErrorKind {
    /// 値またはレンジ指定の解析失敗
    Parse(FieldParseError),
    /// 未対応の型タグ
    UnrecognizedType(String),
    /// バッファへの書き込み失敗
    Pack(PackError),
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldErrorKind::Parse(err) => write!(f, "parse error: {}", err),
            FieldErrorKind::UnrecognizedType(tag) => write!(f, "unrecognized data type '{}'", tag),
            FieldErrorKind::Pack(err) => write!(f, "{}", err),
        }
    }
}

impl Error for FieldErrorKind {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FieldErrorKind::Parse(err) => Some(err),
            FieldErrorKind::Pack(err) => Some(err),
            FieldErrorKind::UnrecognizedType(_) => None,
        }
    }
}

impl From<FieldParseError> for FieldErrorKind {
    fn from(err: FieldParseError) -> Self {
        FieldErrorKind::Parse(err)
    }
}

impl From<PackError> for FieldErrorKind {
    fn from(err: PackError) -> Self {
        FieldErrorKind::Pack(err)
    }
}

/// チェックサム検証エラー
#[derive(Debug, Clone, PartialEq)]
pub enum ChecksumError {
    /// ブロックのチェックサム不一致
    Mismatch { block: usize, expected: u8, actual: u8 },
}

impl fmt::Display for ChecksumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumError::Mismatch { block, expected, actual } => write!(
                f,
                "checksum mismatch in block {}: expected 0x{:02X}, found 0x{:02X}",
                block, expected, actual
            ),
        }
    }
}

impl Error for ChecksumError {}

/// フィールドソース（入力側）エラー
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    /// 読み込み失敗
    Io(String),
    /// 書式不正
    Format(String),
    /// 値がレンジ外
    OutOfRange { field: String, value: String, range: String },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Io(msg) => write!(f, "cannot read field source: {}", msg),
            SourceError::Format(msg) => write!(f, "malformed field source: {}", msg),
            SourceError::OutOfRange { field, value, range } => {
                write!(f, "{} is outside of the range for {} ({})", value, field, range)
            }
        }
    }
}

impl Error for SourceError {}

/// メモリバンク（出力側）エラー
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// I/O エラー
    Io(String),
    /// バンク範囲外へのアクセス
    OutOfBounds { offset: usize, len: usize, bank_size: usize },
    /// 書き込み後の読み戻しが一致しない
    VerifyMismatch { offset: usize, expected: u8, actual: u8 },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Io(msg) => write!(f, "bank I/O error: {}", msg),
            TransportError::OutOfBounds { offset, len, bank_size } => write!(
                f,
                "access of {} bytes at offset {} exceeds bank size {}",
                len, offset, bank_size
            ),
            TransportError::VerifyMismatch { offset, expected, actual } => write!(
                f,
                "read-back mismatch at offset {}: wrote 0x{:02X}, read 0x{:02X}",
                offset, expected, actual
            ),
        }
    }
}

impl Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

/// TEDS 処理の統合エラー型
#[derive(Debug, Clone, PartialEq)]
pub enum TedsError {
    /// 特定フィールドの変換・詰め込み失敗
    Field {
        index: usize,
        name: String,
        kind: FieldErrorKind,
    },
    /// 終端バイトの書き込み失敗
    Terminator(PackError),
    /// 予約バイト方針・バッファ配置の不正
    Layout(PackError),
    /// フィールドソースエラー
    Source(SourceError),
    /// メモリバンクエラー
    Transport(TransportError),
    /// チェックサム検証エラー
    Checksum(ChecksumError),
    /// 設定エラー
    Config(String),
}

impl TedsError {
    /// フィールド名・位置付きのエラーを作成
    pub fn field(index: usize, name: &str, kind: impl Into<FieldErrorKind>) -> Self {
        TedsError::Field {
            index,
            name: name.to_string(),
            kind: kind.into(),
        }
    }

    /// バッファ溢れかどうか
    pub fn is_overflow(&self) -> bool {
        matches!(
            self,
            TedsError::Field { kind: FieldErrorKind::Pack(PackError::BufferOverflow { .. }), .. }
                | TedsError::Terminator(PackError::BufferOverflow { .. })
        )
    }
}

impl fmt::Display for TedsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TedsError::Field { index, name, kind } => {
                write!(f, "field #{} '{}': {}", index, name, kind)
            }
            TedsError::Terminator(err) => write!(f, "end-of-data marker: {}", err),
            TedsError::Layout(err) => write!(f, "record layout: {}", err),
            TedsError::Source(err) => write!(f, "{}", err),
            TedsError::Transport(err) => write!(f, "{}", err),
            TedsError::Checksum(err) => write!(f, "{}", err),
            TedsError::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl Error for TedsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TedsError::Field { kind, .. } => Some(kind),
            TedsError::Terminator(err) => Some(err),
            TedsError::Layout(err) => Some(err),
            TedsError::Source(err) => Some(err),
            TedsError::Transport(err) => Some(err),
            TedsError::Checksum(err) => Some(err),
            TedsError::Config(_) => None,
        }
    }
}

impl From<SourceError> for TedsError {
    fn from(err: SourceError) -> Self {
        TedsError::Source(err)
    }
}

impl From<TransportError> for TedsError {
    fn from(err: TransportError) -> Self {
        TedsError::Transport(err)
    }
}

impl From<ChecksumError> for TedsError {
    fn from(err: ChecksumError) -> Self {
        TedsError::Checksum(err)
    }
}

/// Result型のエイリアス
pub type TedsResult<T> = Result<T, TedsError>;
