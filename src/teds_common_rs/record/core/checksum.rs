/// TEDS ブロックチェックサムの計算・検証機能
/// 各ブロック先頭の予約バイトに、残りのバイト和の 2 の補数を格納する

use super::bit_utils::ReservedBytes;
use super::exceptions::ChecksumError;

/// ブロックのバイト和（mod 256）を計算する
///
/// 符号付き 8 ビットとして加算しても mod 256 では同じ値になる
pub fn block_sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// 1 ブロック分のチェックサムを計算する
///
/// Args:
///     block: 先頭が予約バイトのブロック（予約バイトの内容は無視）
///
/// Returns:
///     ブロック全体の和を 0 にするチェックサム値
pub fn calc_block_checksum(block: &[u8]) -> u8 {
    match block.split_first() {
        Some((_, data)) => block_sum(data).wrapping_neg(),
        None => 0,
    }
}

/// チェックサム対象のブロック数
///
/// Args:
///     buffer_len: バッファ長
///     reserved: 予約バイト方針
///     last_index: データが書かれた最後のバイト位置（None なら全ブロック）
pub fn data_block_count(buffer_len: usize, reserved: ReservedBytes, last_index: Option<usize>) -> usize {
    let block_len = reserved.block_len(buffer_len);
    let total = (buffer_len + block_len - 1) / block_len;
    match last_index {
        Some(index) => (index / block_len + 1).min(total),
        None => total,
    }
}

/// 各ブロックの予約バイトにチェックサムを埋め込む
///
/// Returns:
///     チェックサムを書いたブロック数
pub fn embed_block_checksums(buffer: &mut [u8], reserved: ReservedBytes, last_index: Option<usize>) -> usize {
    let block_len = reserved.block_len(buffer.len());
    let count = data_block_count(buffer.len(), reserved, last_index);

    for block in buffer.chunks_mut(block_len).take(count) {
        block[0] = calc_block_checksum(block);
    }
    count
}

/// 各ブロックのチェックサムを検証する
pub fn verify_block_checksums(
    buffer: &[u8],
    reserved: ReservedBytes,
    last_index: Option<usize>,
) -> Result<(), ChecksumError> {
    let block_len = reserved.block_len(buffer.len());
    let count = data_block_count(buffer.len(), reserved, last_index);

    for (i, block) in buffer.chunks(block_len).take(count).enumerate() {
        let expected = calc_block_checksum(block);
        if block[0] != expected {
            return Err(ChecksumError::Mismatch {
                block: i,
                expected,
                actual: block[0],
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calc_block_checksum_basic() {
        let mut block = [0u8; 32];
        block[1] = 0x05;
        block[2] = 0xFF;
        assert_eq!(calc_block_checksum(&block), 0xFC);
    }

    #[test]
    fn test_calc_block_checksum_ignores_reserved_byte() {
        let mut a = [0u8; 32];
        a[5] = 0x42;
        let mut b = a;
        b[0] = 0x99;
        assert_eq!(calc_block_checksum(&a), calc_block_checksum(&b));
    }

    #[test]
    fn test_calc_block_checksum_empty() {
        assert_eq!(calc_block_checksum(&[]), 0);
        assert_eq!(calc_block_checksum(&[0x10]), 0);
    }

    #[test]
    fn test_embedded_block_sums_to_zero() {
        let mut buf: Vec<u8> = (0..96).map(|i| (i * 7 % 256) as u8).collect();
        let count = embed_block_checksums(&mut buf, ReservedBytes::default(), None);
        assert_eq!(count, 3);
        for block in buf.chunks(32) {
            assert_eq!(block_sum(block), 0);
        }
    }

    #[test]
    fn test_only_data_blocks_are_touched() {
        let mut buf = vec![0x11u8; 96];
        embed_block_checksums(&mut buf, ReservedBytes::default(), Some(40));
        assert_eq!(block_sum(&buf[0..32]), 0);
        assert_eq!(block_sum(&buf[32..64]), 0);
        assert_eq!(buf[64], 0x11);
    }

    #[test]
    fn test_leading_byte_covers_whole_buffer() {
        let mut buf = vec![0x01u8; 64];
        let count = embed_block_checksums(&mut buf, ReservedBytes::LeadingByte, Some(10));
        assert_eq!(count, 1);
        assert_eq!(block_sum(&buf), 0);
        assert_eq!(buf[32], 0x01);
    }

    #[test]
    fn test_embed_is_idempotent() {
        let mut buf: Vec<u8> = (0..64).map(|i| i as u8).collect();
        embed_block_checksums(&mut buf, ReservedBytes::default(), None);
        let once = buf.clone();
        embed_block_checksums(&mut buf, ReservedBytes::default(), None);
        assert_eq!(buf, once);
    }

    #[test]
    fn test_verify_detects_corruption() {
        let mut buf = vec![0u8; 64];
        buf[33] = 0x20;
        embed_block_checksums(&mut buf, ReservedBytes::default(), None);
        assert!(verify_block_checksums(&buf, ReservedBytes::default(), None).is_ok());

        buf[40] ^= 0x01;
        assert_eq!(
            verify_block_checksums(&buf, ReservedBytes::default(), None),
            Err(ChecksumError::Mismatch { block: 1, expected: 0xDF, actual: 0xE0 })
        );
    }

    #[test]
    fn test_partial_trailing_block() {
        let mut buf = vec![0x01u8; 40];
        assert_eq!(data_block_count(40, ReservedBytes::default(), None), 2);
        embed_block_checksums(&mut buf, ReservedBytes::default(), None);
        assert_eq!(block_sum(&buf[32..]), 0);
    }
}
