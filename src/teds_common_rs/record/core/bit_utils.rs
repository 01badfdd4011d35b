/// ビット操作ユーティリティ
/// 可変長フィールドを MSB 先頭でバイト列へ詰め込み、予約（チェックサム）バイトを飛ばす

use super::exceptions::PackError;
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

/// 終端マーカー（データ末尾を示す 0xFF）
pub const END_OF_DATA: u8 = 0xFF;

/// 予約バイト（チェックサム格納位置）の配置方針
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReservedBytes {
    /// 先頭バイトのみ予約。チェックサムはバッファ全体で 1 つ
    LeadingByte,
    /// 各ブロックの先頭バイトを予約
    EveryBlock { block_size: usize },
}

impl ReservedBytes {
    pub const DEFAULT_BLOCK_SIZE: usize = 32;

    /// 指定バイトが予約バイトかどうか
    pub fn is_reserved(&self, index: usize) -> bool {
        match self {
            ReservedBytes::LeadingByte => index == 0,
            ReservedBytes::EveryBlock { block_size } => *block_size > 0 && index % block_size == 0,
        }
    }

    /// チェックサムを計算する単位（ブロック長）
    pub fn block_len(&self, buffer_len: usize) -> usize {
        match self {
            ReservedBytes::LeadingByte => buffer_len.max(1),
            ReservedBytes::EveryBlock { block_size } => (*block_size).max(1),
        }
    }

    /// ブロック長が 2 未満だとデータ用のバイトが残らない
    pub fn validate(&self) -> Result<(), PackError> {
        match *self {
            ReservedBytes::EveryBlock { block_size } if block_size < 2 => Err(PackError::InvalidBlockSize(block_size)),
            _ => Ok(()),
        }
    }

    /// 予約バイト上なら次のバイトへ進める
    pub fn skip(&self, index: usize) -> usize {
        if self.is_reserved(index) {
            index + 1
        } else {
            index
        }
    }
}

impl Default for ReservedBytes {
    fn default() -> Self {
        ReservedBytes::EveryBlock {
            block_size: Self::DEFAULT_BLOCK_SIZE,
        }
    }
}

/// 次に書き込むビット位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub byte_index: usize,
    /// 現在のバイト内で使用済みのビット数 (0..=7)
    pub bit_offset: u8,
}

impl Cursor {
    pub fn new(byte_index: usize, bit_offset: u8) -> Self {
        Self { byte_index, bit_offset }
    }

    /// 詰め込み開始位置（先頭の予約バイトを飛ばした位置）
    pub fn start(reserved: ReservedBytes) -> Self {
        Self::new(reserved.skip(0), 0)
    }

    /// バッファ先頭からの絶対ビット位置
    pub fn bit_position(&self) -> usize {
        self.byte_index * 8 + self.bit_offset as usize
    }
}

/// 下位 `length` ビットだけを残す
pub fn mask_bits(value: u32, length: usize) -> u32 {
    if length >= 32 {
        value
    } else {
        value & ((1u32 << length) - 1)
    }
}

/// `length` ビットの値を符号付きとして解釈する
pub fn sign_extend(value: u32, length: usize) -> i64 {
    if length == 0 || length > 32 {
        return value as i64;
    }
    let shift = 64 - length as u32;
    (((mask_bits(value, length) as u64) << shift) as i64) >> shift
}

/// バイト列を大文字16進文字列に変換（区切りなし）
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// ビットパッカー
///
/// 状態を持たず、カーソルを受け取って進めたカーソルを返す。
/// 予約バイトには決して書き込まない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitPacker {
    reserved: ReservedBytes,
}

impl BitPacker {
    pub fn new(reserved: ReservedBytes) -> Self {
        Self { reserved }
    }

    pub fn reserved(&self) -> ReservedBytes {
        self.reserved
    }

    /// `bits` の下位 `bit_length` ビットを MSB 先頭で追記する
    ///
    /// Args:
    ///     buffer: 書き込み先
    ///     cursor: 書き込み開始位置
    ///     bits: 値（下位 bit_length ビットのみ有効）
    ///     bit_length: 1..=32
    ///
    /// Returns:
    ///     進めたカーソル
    pub fn append(
        &self,
        buffer: &mut [u8],
        cursor: Cursor,
        bits: u32,
        bit_length: usize,
    ) -> Result<Cursor, PackError> {
        if bit_length == 0 || bit_length > 32 {
            return Err(PackError::InvalidLength(bit_length));
        }

        let mut cursor = cursor;
        // 上位チャンクから順に 8 ビット以下ずつ
        for chunk in (0..4usize).rev() {
            let remaining = bit_length as isize - (chunk * 8) as isize;
            if remaining <= 0 {
                continue;
            }
            let chunk_len = remaining.min(8) as usize;
            let value = mask_bits(bits >> (chunk * 8), chunk_len) as u8;
            cursor = self.append_chunk(buffer, cursor, value, chunk_len)?;
        }
        Ok(cursor)
    }

    /// 8 ビット以下のチャンクを 1 つ追記する
    pub fn append_chunk(
        &self,
        buffer: &mut [u8],
        cursor: Cursor,
        value: u8,
        length: usize,
    ) -> Result<Cursor, PackError> {
        if length == 0 || length > 8 {
            return Err(PackError::InvalidLength(length));
        }
        self.check_cursor(cursor)?;

        let index = self.reserved.skip(cursor.byte_index);
        self.check_bounds(buffer, index, cursor.bit_offset)?;

        // チャンクを左詰めにしたもの
        let aligned = value << (8 - length);

        let filled = if cursor.bit_offset == 0 {
            buffer[index] = aligned;
            length
        } else {
            let used = cursor.bit_offset as usize;
            let free = 8 - used;
            let kept = buffer[index] & !(0xFFu8 >> used);
            buffer[index] = kept | (aligned >> used);

            if length > free {
                // 溢れた下位ビットを次のバイトに左詰めで書く
                let next = self.next_byte(index);
                self.check_bounds(buffer, next, 0)?;
                buffer[next] = aligned << free;
                return Ok(Cursor::new(next, (length - free) as u8));
            }
            used + length
        };

        if filled == 8 {
            Ok(Cursor::new(self.next_byte(index), 0))
        } else {
            Ok(Cursor::new(index, filled as u8))
        }
    }

    /// 部分バイトを閉じて終端マーカー 0xFF を書き込む
    ///
    /// Returns:
    ///     (終端マーカーを書いたバイト位置, 終端後のカーソル)
    pub fn finish(&self, buffer: &mut [u8], cursor: Cursor) -> Result<(usize, Cursor), PackError> {
        let aligned = if cursor.bit_offset > 0 {
            Cursor::new(self.next_byte(cursor.byte_index), 0)
        } else {
            cursor
        };
        let index = self.reserved.skip(aligned.byte_index);
        let end = self.append_chunk(buffer, aligned, END_OF_DATA, 8)?;
        Ok((index, end))
    }

    /// `cursor` から `bit_length` ビットを読み出す（append の逆）
    ///
    /// Returns:
    ///     (値, 読み出し後のカーソル)
    pub fn extract(
        &self,
        buffer: &[u8],
        cursor: Cursor,
        bit_length: usize,
    ) -> Result<(u32, Cursor), PackError> {
        if bit_length == 0 || bit_length > 32 {
            return Err(PackError::InvalidLength(bit_length));
        }

        self.check_cursor(cursor)?;

        let bits = buffer.view_bits::<Msb0>();
        let mut cursor = cursor;
        let mut remaining = bit_length;
        let mut value = 0u32;

        while remaining > 0 {
            let index = self.reserved.skip(cursor.byte_index);
            self.check_bounds(buffer, index, cursor.bit_offset)?;

            let offset = cursor.bit_offset as usize;
            let take = (8 - offset).min(remaining);
            let start = index * 8 + offset;
            let part: u32 = bits[start..start + take].load_be();

            value = (value << take) | part;
            remaining -= take;

            cursor = if offset + take == 8 {
                Cursor::new(self.next_byte(index), 0)
            } else {
                Cursor::new(index, (offset + take) as u8)
            };
        }
        Ok((value, cursor))
    }

    fn next_byte(&self, index: usize) -> usize {
        self.reserved.skip(index + 1)
    }

    fn check_cursor(&self, cursor: Cursor) -> Result<(), PackError> {
        self.reserved.validate()?;
        if cursor.bit_offset > 7 {
            return Err(PackError::InvalidBitOffset(cursor.bit_offset));
        }
        Ok(())
    }

    fn check_bounds(&self, buffer: &[u8], index: usize, bit_offset: u8) -> Result<(), PackError> {
        if index >= buffer.len() {
            return Err(PackError::BufferOverflow {
                byte_index: index,
                bit_offset,
                buffer_len: buffer.len(),
            });
        }
        Ok(())
    }
}

impl Default for BitPacker {
    fn default() -> Self {
        Self::new(ReservedBytes::default())
    }
}
