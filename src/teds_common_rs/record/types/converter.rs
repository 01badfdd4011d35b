/// TEDS データ型の変換
/// 生の値（文字列）と型タグ・レンジ指定から、詰め込み用の符号なし整数を求める

use chrono::{Duration, NaiveDate};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use super::field_record::{
    check_bit_length, EncodedValue, FieldKind, FieldRecord, LinearRange, RelativeRange, TypeTag, TypedField,
};
use crate::teds_common_rs::record::core::bit_utils::sign_extend;
use crate::teds_common_rs::record::core::exceptions::{FieldErrorKind, FieldParseError};

/// DATE 型の基準日
pub static DATE_EPOCH: Lazy<NaiveDate> =
    Lazy::new(|| NaiveDate::from_ymd_opt(1998, 1, 1).expect("valid epoch date"));

const NUMBER: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";

static LINEAR_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^\s*(?P<min>{n})\s*to\s*(?P<max>{n})\s*step\s*(?P<step>{n})\s*$",
        n = NUMBER
    ))
    .expect("linear range pattern")
});

static RELATIVE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^\s*(?P<min>{n})\s*to\s*(?P<max>{n})\s*(?:±|\+/-|\+-)\s*(?P<pct>{n})\s*%\s*$",
        n = NUMBER
    ))
    .expect("relative range pattern")
});

const LINEAR_FORMAT: &str = "<min> to <max> step <step>";
const RELATIVE_FORMAT: &str = "<min> to <max> ±<percent>%";

/// 生の値を型タグに従って変換する
///
/// Args:
///     raw_value: 生の値
///     type_tag: 型タグ（UNINT, Chr5, DATE, ConRes, ConRelRes, Single）
///     range_spec: レンジ指定（ConRes / ConRelRes のみ使用）
///
/// Returns:
///     詰め込み用の 32 ビット値（符号付きは 2 の補数）
pub fn convert(raw_value: &str, type_tag: &str, range_spec: &str) -> Result<u32, FieldErrorKind> {
    let tag: TypeTag = type_tag.parse()?;
    Ok(parse_kind(raw_value, tag, range_spec)?.to_bits())
}

/// 生の値を解析して型付きの値にする
pub fn parse_kind(raw_value: &str, tag: TypeTag, range_spec: &str) -> Result<FieldKind, FieldParseError> {
    match tag {
        TypeTag::UnInt => Ok(FieldKind::UnInt { value: parse_number(raw_value)? }),
        TypeTag::Chr5 => Ok(FieldKind::Chr5 { text: raw_value.to_string() }),
        TypeTag::Date => Ok(FieldKind::Date { date: parse_date(raw_value)? }),
        TypeTag::ConRes => {
            let value = parse_number(raw_value)?;
            let range = parse_linear_range(range_spec)?;
            Ok(FieldKind::ConRes { value, range })
        }
        TypeTag::ConRelRes => {
            let value = parse_number(raw_value)?;
            let range = parse_relative_range(range_spec)?;
            if value <= 0.0 {
                return Err(FieldParseError::UnsupportedValue {
                    value: raw_value.to_string(),
                    reason: "relative resolution values must be positive".to_string(),
                });
            }
            Ok(FieldKind::ConRelRes { value, range })
        }
        TypeTag::Single => {
            let value = raw_value
                .trim()
                .parse::<f32>()
                .map_err(|_| FieldParseError::InvalidNumber(raw_value.to_string()))?;
            Ok(FieldKind::Single { value })
        }
    }
}

impl FieldKind {
    /// 詰め込み用の 32 ビット値を求める
    pub fn to_bits(&self) -> u32 {
        match self {
            FieldKind::UnInt { value } => value.trunc() as i64 as u32,
            FieldKind::Chr5 { text } => chr5_bits(text),
            FieldKind::Date { date } => date.signed_duration_since(*DATE_EPOCH).num_days() as u32,
            FieldKind::ConRes { value, range } => ((value - range.min) / range.step).round() as i64 as u32,
            FieldKind::ConRelRes { value, range } => {
                ((value / range.min).ln() / range.ratio().ln()).round() as i64 as u32
            }
            FieldKind::Single { value } => value.to_bits(),
        }
    }
}

impl TypedField {
    /// FieldRecord の型を確定させる
    pub fn from_record(record: &FieldRecord) -> Result<Self, FieldErrorKind> {
        let tag: TypeTag = record.type_tag.parse()?;
        let bit_length = check_bit_length(record.bit_length)?;
        let kind = parse_kind(&record.raw_value, tag, &record.range_spec)?;

        if let FieldKind::Chr5 { text } = &kind {
            let encoded_len = text.chars().count() * 5;
            if encoded_len != bit_length {
                warn!(
                    "Chr5 field '{}' encodes {} bits but is declared {} bits",
                    record.name, encoded_len, bit_length
                );
            }
        }

        Ok(Self {
            name: record.name.clone(),
            bit_length,
            kind,
        })
    }

    pub fn encode(&self) -> EncodedValue {
        EncodedValue::new(self.kind.to_bits(), self.bit_length)
    }
}

/// Chr5 符号化
///
/// 各文字を (8 ビットに切り詰めた文字コード - 64) とし、i 文字目を 5*i ビット
/// 左シフトして加算する。'@'..='_' 以外の文字は隣のレーンへ桁借り・桁上がりする。
pub fn chr5_bits(text: &str) -> u32 {
    let mut acc = 0i32;
    for (i, ch) in text.chars().enumerate() {
        let code = (ch as u32 as u8 as i8 as i32) - 64;
        if !(0..32).contains(&code) {
            warn!("character {:?} is outside the Chr5 alphabet", ch);
        }
        acc = acc.wrapping_add(code.wrapping_shl((5 * i) as u32));
    }
    acc as u32
}

/// Chr5 の各 5 ビットレーンを文字に戻す
pub fn chr5_text(bits: u32, bit_length: usize) -> String {
    (0..bit_length / 5)
        .map(|i| {
            let code = (bits >> (5 * i)) & 0x1F;
            (code as u8 + 64) as char
        })
        .collect()
}

pub(crate) fn parse_number(raw: &str) -> Result<f64, FieldParseError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| FieldParseError::InvalidNumber(raw.to_string()))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FieldParseError::InvalidNumber(raw.to_string()))
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, FieldParseError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| FieldParseError::InvalidDate(raw.to_string()))
}

fn range_number(spec: &str, value: &str, expected: &'static str) -> Result<f64, FieldParseError> {
    value.parse::<f64>().map_err(|_| FieldParseError::InvalidRangeSpec {
        spec: spec.to_string(),
        expected,
    })
}

/// `<min> to <max> step <step>` を解析する
pub fn parse_linear_range(spec: &str) -> Result<LinearRange, FieldParseError> {
    let invalid = || FieldParseError::InvalidRangeSpec {
        spec: spec.to_string(),
        expected: LINEAR_FORMAT,
    };
    let caps = LINEAR_RANGE.captures(spec).ok_or_else(invalid)?;
    let range = LinearRange {
        min: range_number(spec, &caps["min"], LINEAR_FORMAT)?,
        max: range_number(spec, &caps["max"], LINEAR_FORMAT)?,
        step: range_number(spec, &caps["step"], LINEAR_FORMAT)?,
    };
    if range.step == 0.0 {
        return Err(invalid());
    }
    Ok(range)
}

/// `<min> to <max> ±<percent>%` を解析する
pub fn parse_relative_range(spec: &str) -> Result<RelativeRange, FieldParseError> {
    let invalid = || FieldParseError::InvalidRangeSpec {
        spec: spec.to_string(),
        expected: RELATIVE_FORMAT,
    };
    let caps = RELATIVE_RANGE.captures(spec).ok_or_else(invalid)?;
    let range = RelativeRange {
        min: range_number(spec, &caps["min"], RELATIVE_FORMAT)?,
        max: range_number(spec, &caps["max"], RELATIVE_FORMAT)?,
        resolution_percent: range_number(spec, &caps["pct"], RELATIVE_FORMAT)?,
    };
    if range.min <= 0.0 || range.resolution_percent <= 0.0 {
        return Err(invalid());
    }
    Ok(range)
}

/// 詰め込まれたビットを意味のある値に戻したもの
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Unsigned(u32),
    Text(String),
    Date(NaiveDate),
    Real(f64),
    Single(f32),
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Unsigned(v) => write!(f, "{}", v),
            DecodedValue::Text(s) => write!(f, "{}", s),
            DecodedValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            DecodedValue::Real(v) => write!(f, "{}", v),
            DecodedValue::Single(v) => write!(f, "{}", v),
        }
    }
}

/// 逆変換。レンジ情報は `kind` から取る
///
/// Args:
///     kind: 同じフィールドの型付き値（型とレンジの参照用）
///     encoded: バッファから取り出した値
pub fn decode_value(kind: &FieldKind, encoded: EncodedValue) -> DecodedValue {
    let bits = encoded.masked();
    let length = encoded.bit_length;
    match kind {
        FieldKind::UnInt { .. } => DecodedValue::Unsigned(bits),
        FieldKind::Chr5 { .. } => DecodedValue::Text(chr5_text(bits, length)),
        FieldKind::Date { .. } => DATE_EPOCH
            .checked_add_signed(Duration::days(sign_extend(bits, length)))
            .map(DecodedValue::Date)
            .unwrap_or(DecodedValue::Unsigned(bits)),
        FieldKind::ConRes { range, .. } => {
            DecodedValue::Real(range.min + range.step * sign_extend(bits, length) as f64)
        }
        FieldKind::ConRelRes { range, .. } => {
            DecodedValue::Real(range.min * range.ratio().powi(sign_extend(bits, length) as i32))
        }
        FieldKind::Single { .. } => DecodedValue::Single(f32::from_bits(bits)),
    }
}
