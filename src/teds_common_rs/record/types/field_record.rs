use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::teds_common_rs::record::core::bit_utils::mask_bits;
use crate::teds_common_rs::record::core::exceptions::{FieldErrorKind, FieldParseError};

/// Raw field row as supplied by a field source.
///
/// Values are kept as text; they are parsed into a [`FieldKind`] once,
/// before packing starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name: String,
    #[serde(rename = "value")]
    pub raw_value: String,
    #[serde(rename = "length")]
    pub bit_length: usize,
    #[serde(rename = "range", default)]
    pub range_spec: String,
    #[serde(rename = "type")]
    pub type_tag: String,
}

impl FieldRecord {
    pub fn new(name: &str, raw_value: &str, bit_length: usize, range_spec: &str, type_tag: &str) -> Self {
        Self {
            name: name.to_string(),
            raw_value: raw_value.to_string(),
            bit_length,
            range_spec: range_spec.to_string(),
            type_tag: type_tag.to_string(),
        }
    }
}

/// The six TEDS data types understood by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    UnInt,
    Chr5,
    Date,
    ConRes,
    ConRelRes,
    Single,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::UnInt => "UNINT",
            TypeTag::Chr5 => "Chr5",
            TypeTag::Date => "DATE",
            TypeTag::ConRes => "ConRes",
            TypeTag::ConRelRes => "ConRelRes",
            TypeTag::Single => "Single",
        }
    }
}

impl FromStr for TypeTag {
    type Err = FieldErrorKind;

    /// Whitespace is ignored and the match is case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        match compact.to_ascii_uppercase().as_str() {
            "UNINT" => Ok(TypeTag::UnInt),
            "CHR5" => Ok(TypeTag::Chr5),
            "DATE" => Ok(TypeTag::Date),
            "CONRES" => Ok(TypeTag::ConRes),
            "CONRELRES" => Ok(TypeTag::ConRelRes),
            "SINGLE" => Ok(TypeTag::Single),
            _ => Err(FieldErrorKind::UnrecognizedType(s.to_string())),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `<min> to <max> step <step>`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// `<min> to <max> ±<percent>%`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeRange {
    pub min: f64,
    pub max: f64,
    pub resolution_percent: f64,
}

impl RelativeRange {
    /// Ratio between two neighbouring table entries.
    pub fn ratio(&self) -> f64 {
        1.0 + 2.0 * self.resolution_percent / 100.0
    }
}

/// A field value parsed according to its type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    UnInt { value: f64 },
    Chr5 { text: String },
    Date { date: NaiveDate },
    ConRes { value: f64, range: LinearRange },
    ConRelRes { value: f64, range: RelativeRange },
    Single { value: f32 },
}

impl FieldKind {
    pub fn tag(&self) -> TypeTag {
        match self {
            FieldKind::UnInt { .. } => TypeTag::UnInt,
            FieldKind::Chr5 { .. } => TypeTag::Chr5,
            FieldKind::Date { .. } => TypeTag::Date,
            FieldKind::ConRes { .. } => TypeTag::ConRes,
            FieldKind::ConRelRes { .. } => TypeTag::ConRelRes,
            FieldKind::Single { .. } => TypeTag::Single,
        }
    }
}

/// The integer that is actually handed to the bit packer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedValue {
    pub bits: u32,
    pub bit_length: usize,
}

impl EncodedValue {
    pub fn new(bits: u32, bit_length: usize) -> Self {
        Self { bits, bit_length }
    }

    /// Bits that survive packing.
    pub fn masked(&self) -> u32 {
        mask_bits(self.bits, self.bit_length)
    }
}

/// A field whose type has been decided and whose value has been parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedField {
    pub name: String,
    pub bit_length: usize,
    pub kind: FieldKind,
}

/// Validate a bit length read from a field source.
pub fn check_bit_length(bit_length: usize) -> Result<usize, FieldParseError> {
    if (1..=32).contains(&bit_length) {
        Ok(bit_length)
    } else {
        Err(FieldParseError::InvalidBitLength(bit_length.to_string()))
    }
}
