/// TEDS レコードの符号化パイプライン
/// 初期化パターン → 型変換 → ビット詰め → 終端マーカー → ブロックチェックサム

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::core::bit_utils::{bytes_to_hex, BitPacker, Cursor, ReservedBytes};
use super::core::checksum::{data_block_count, embed_block_checksums, verify_block_checksums};
use super::core::exceptions::{ChecksumError, PackError, TedsError, TedsResult};
use super::types::converter::{decode_value, DecodedValue};
use super::types::field_record::{EncodedValue, FieldRecord, TypedField};

/// 符号化前にバッファへ書いておく初期化パターン
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FillPattern {
    /// 全バイト 0
    Zeroed,
    /// 全バイト同じ値
    Uniform { value: u8 },
    /// 各ブロックの固定位置に「使用済みページ」マーカー、他は 0
    PageMarker { offset: usize, marker: u8 },
}

impl FillPattern {
    /// バッファに初期化パターンを書き込む
    pub fn apply(&self, buffer: &mut [u8], reserved: ReservedBytes) {
        match *self {
            FillPattern::Zeroed => buffer.fill(0),
            FillPattern::Uniform { value } => buffer.fill(value),
            FillPattern::PageMarker { offset, marker } => {
                buffer.fill(0);
                let block_len = reserved.block_len(buffer.len());
                for block in buffer.chunks_mut(block_len) {
                    if let Some(byte) = block.get_mut(offset) {
                        *byte = marker;
                    }
                }
            }
        }
    }
}

impl Default for FillPattern {
    fn default() -> Self {
        FillPattern::Zeroed
    }
}

/// エンコーダ設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderConfig {
    pub buffer_size: usize,
    pub reserved: ReservedBytes,
    pub fill: FillPattern,
}

impl EncoderConfig {
    pub const DEFAULT_BUFFER_SIZE: usize = 128;

    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            ..Self::default()
        }
    }

    pub fn with_reserved(mut self, reserved: ReservedBytes) -> Self {
        self.reserved = reserved;
        self
    }

    pub fn with_fill(mut self, fill: FillPattern) -> Self {
        self.fill = fill;
        self
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            buffer_size: Self::DEFAULT_BUFFER_SIZE,
            reserved: ReservedBytes::default(),
            fill: FillPattern::default(),
        }
    }
}

/// 1 フィールドの配置情報
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPlacement {
    pub index: usize,
    pub field: TypedField,
    pub start: Cursor,
    pub value: EncodedValue,
}

/// 符号化済みレコード
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRecord {
    pub buffer: Vec<u8>,
    pub placements: Vec<FieldPlacement>,
    /// 最後のフィールド直後（終端マーカー前）のカーソル
    pub data_end: Cursor,
    /// 終端マーカーを書いたバイト位置
    pub terminator_index: usize,
    pub reserved: ReservedBytes,
}

impl EncodedRecord {
    /// 大文字16進表現
    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.buffer)
    }

    /// データを含むブロックのチェックサムを検証する
    pub fn verify_checksums(&self) -> Result<(), ChecksumError> {
        verify_block_checksums(&self.buffer, self.reserved, Some(self.terminator_index))
    }

    /// 配置位置からフィールドの値を読み戻す
    pub fn read_field(&self, index: usize) -> Option<Result<EncodedValue, PackError>> {
        let placement = self.placements.get(index)?;
        let packer = BitPacker::new(self.reserved);
        Some(
            packer
                .extract(&self.buffer, placement.start, placement.value.bit_length)
                .map(|(bits, _)| EncodedValue::new(bits, placement.value.bit_length)),
        )
    }

    /// 読み戻した値を意味のある値に戻す
    pub fn decode_field(&self, index: usize) -> Option<Result<DecodedValue, PackError>> {
        let placement = self.placements.get(index)?;
        Some(self.read_field(index)?.map(|value| decode_value(&placement.field.kind, value)))
    }
}

/// TEDS エンコーダ
#[derive(Debug, Clone, Default)]
pub struct TedsEncoder {
    config: EncoderConfig,
}

impl TedsEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// 全フィールドの型を確定させる（詰め込み前の変換パス）
    pub fn prepare(&self, fields: &[FieldRecord]) -> TedsResult<Vec<TypedField>> {
        fields
            .iter()
            .enumerate()
            .map(|(i, record)| TypedField::from_record(record).map_err(|e| TedsError::field(i, &record.name, e)))
            .collect()
    }

    /// フィールド列を符号化する
    pub fn encode(&self, fields: &[FieldRecord]) -> TedsResult<EncodedRecord> {
        let typed = self.prepare(fields)?;
        self.encode_typed(typed)
    }

    /// 型確定済みのフィールド列を順番に詰め込む
    pub fn encode_typed(&self, fields: Vec<TypedField>) -> TedsResult<EncodedRecord> {
        let reserved = self.config.reserved;
        reserved.validate().map_err(TedsError::Layout)?;
        let packer = BitPacker::new(reserved);

        let mut buffer = vec![0u8; self.config.buffer_size];
        self.config.fill.apply(&mut buffer, reserved);

        let mut cursor = Cursor::start(reserved);
        let mut placements = Vec::with_capacity(fields.len());

        for (index, field) in fields.into_iter().enumerate() {
            let value = field.encode();
            let start = cursor;
            cursor = packer
                .append(&mut buffer, cursor, value.bits, value.bit_length)
                .map_err(|e| TedsError::field(index, &field.name, e))?;
            debug!(
                "packed '{}' = 0x{:X} ({} bits) at byte {} bit {}",
                field.name,
                value.masked(),
                value.bit_length,
                start.byte_index,
                start.bit_offset
            );
            placements.push(FieldPlacement { index, field, start, value });
        }

        let data_end = cursor;
        let (terminator_index, _) = packer.finish(&mut buffer, cursor).map_err(TedsError::Terminator)?;
        let blocks = embed_block_checksums(&mut buffer, reserved, Some(terminator_index));

        info!(
            "encoded {} fields into {} bytes ({} data bits, {} checksummed blocks)",
            placements.len(),
            buffer.len(),
            data_bits(&placements),
            blocks
        );

        Ok(EncodedRecord {
            buffer,
            placements,
            data_end,
            terminator_index,
            reserved,
        })
    }
}

impl TedsEncoder {
    /// バンクから読み戻したイメージのブロックチェックサムを検証する
    ///
    /// Args:
    ///     image: バンクイメージ全体
    ///     blocks: 検証するブロック数（None なら初期化パターンから外れた範囲）
    ///
    /// Returns:
    ///     検証したブロック数
    pub fn verify_image(&self, image: &[u8], blocks: Option<usize>) -> TedsResult<usize> {
        let reserved = self.config.reserved;
        reserved.validate().map_err(TedsError::Layout)?;

        let last_index = match blocks {
            Some(n) if n > 0 => n
                .checked_mul(reserved.block_len(image.len()))
                .map_or(usize::MAX, |end| end - 1)
                .min(image.len().saturating_sub(1)),
            _ => data_extent(image, reserved, self.config.fill),
        };
        verify_block_checksums(image, reserved, Some(last_index))?;

        let count = data_block_count(image.len(), reserved, Some(last_index));
        debug!("verified {} blocks up to byte {}", count, last_index);
        Ok(count)
    }
}

/// 初期化パターンのままのブロックを除いた、最後のブロックの末尾バイト位置
///
/// 書き込まれたブロックは先頭から連続する。どのブロックも初期化パターンと
/// 一致する場合は先頭ブロックの末尾を返す。
pub fn data_extent(image: &[u8], reserved: ReservedBytes, fill: FillPattern) -> usize {
    let block_len = reserved.block_len(image.len());
    let mut template = vec![0u8; image.len()];
    fill.apply(&mut template, reserved);

    let last_block = image
        .chunks(block_len)
        .zip(template.chunks(block_len))
        .rposition(|(written, blank)| written != blank)
        .unwrap_or(0);
    ((last_block + 1) * block_len - 1).min(image.len().saturating_sub(1))
}

fn data_bits(placements: &[FieldPlacement]) -> usize {
    placements.iter().map(|p| p.value.bit_length).sum()
}

/// 既定設定でフィールド列を符号化する
pub fn encode(fields: &[FieldRecord], buffer_size: usize) -> TedsResult<EncodedRecord> {
    TedsEncoder::new(EncoderConfig::new(buffer_size)).encode(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::teds_common_rs::record::core::exceptions::FieldErrorKind;

    #[test]
    fn test_single_unint_scenario() {
        let record = encode(&[FieldRecord::new("Value", "5", 8, "", "UNINT")], 32).unwrap();
        assert_eq!(record.buffer[1], 0x05);
        assert_eq!(record.data_end, Cursor::new(2, 0));
        assert_eq!(record.buffer[2], 0xFF);
        assert_eq!(record.buffer[0], 0xFC);
        assert!(record.verify_checksums().is_ok());
    }

    #[test]
    fn test_field_error_names_the_field() {
        let fields = [
            FieldRecord::new("Ok", "1", 4, "", "UNINT"),
            FieldRecord::new("Broken", "x", 4, "", "UNINT"),
        ];
        match encode(&fields, 32) {
            Err(TedsError::Field { index, name, kind }) => {
                assert_eq!(index, 1);
                assert_eq!(name, "Broken");
                assert!(matches!(kind, FieldErrorKind::Parse(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_overflow_reports_field() {
        let fields = [
            FieldRecord::new("A", "1", 32, "", "UNINT"),
            FieldRecord::new("B", "1", 32, "", "UNINT"),
        ];
        let err = encode(&fields, 8).unwrap_err();
        assert!(err.is_overflow());
        assert!(matches!(err, TedsError::Field { index: 1, .. }));
    }

    #[test]
    fn test_terminator_overflow() {
        let fields = [FieldRecord::new("A", "1", 24, "", "UNINT")];
        let err = encode(&fields, 4).unwrap_err();
        assert!(matches!(err, TedsError::Terminator(PackError::BufferOverflow { .. })));
    }

    #[test]
    fn test_page_marker_fill() {
        let config = EncoderConfig::new(64).with_fill(FillPattern::PageMarker { offset: 31, marker: 0xAA });
        let record = TedsEncoder::new(config)
            .encode(&[FieldRecord::new("A", "3", 2, "", "UNINT")])
            .unwrap();
        assert_eq!(record.buffer[31], 0xAA);
        assert_eq!(record.buffer[63], 0xAA);
        assert_eq!(record.buffer[32], 0x00);
        assert!(record.verify_checksums().is_ok());
    }

    #[test]
    fn test_invalid_block_size_rejected() {
        for block_size in [0, 1] {
            let config = EncoderConfig::new(32).with_reserved(ReservedBytes::EveryBlock { block_size });
            let err = TedsEncoder::new(config)
                .encode(&[FieldRecord::new("Value", "5", 8, "", "UNINT")])
                .unwrap_err();
            assert_eq!(err, TedsError::Layout(PackError::InvalidBlockSize(block_size)));
        }
    }

    #[test]
    fn test_data_extent_skips_blank_blocks() {
        let fill = FillPattern::Uniform { value: 0xEE };
        let encoder = TedsEncoder::new(EncoderConfig::new(96).with_fill(fill));
        let record = encoder.encode(&[FieldRecord::new("A", "1", 8, "", "UNINT")]).unwrap();
        assert_eq!(data_extent(&record.buffer, ReservedBytes::default(), fill), 31);
        assert_eq!(encoder.verify_image(&record.buffer, None).unwrap(), 1);
    }

    #[test]
    fn test_read_field_back() {
        let fields = [
            FieldRecord::new("Manufacturer", "17", 14, "", "UNINT"),
            FieldRecord::new("Model", "342", 15, "", "UNINT"),
            FieldRecord::new("Version", "AB", 10, "", "Chr5"),
        ];
        let record = encode(&fields, 32).unwrap();
        assert_eq!(record.read_field(1).unwrap().unwrap(), EncodedValue::new(342, 15));
        assert_eq!(
            record.decode_field(2).unwrap().unwrap(),
            DecodedValue::Text("AB".to_string())
        );
        assert!(record.read_field(3).is_none());
    }
}
