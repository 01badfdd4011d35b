use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::range_check::{AcceptAll, RangeValidator};
use crate::teds_common_rs::record::core::exceptions::{SourceError, TedsResult};
use crate::teds_common_rs::record::types::field_record::FieldRecord;

/// Supplies the ordered field sequence to encode.
pub trait FieldSource {
    fn get_fields(&mut self) -> TedsResult<Vec<FieldRecord>>;
}

/// Fixed in-memory field list.
#[derive(Debug, Clone, Default)]
pub struct StaticFieldSource {
    fields: Vec<FieldRecord>,
}

impl StaticFieldSource {
    pub fn new(fields: Vec<FieldRecord>) -> Self {
        Self { fields }
    }
}

impl FieldSource for StaticFieldSource {
    fn get_fields(&mut self) -> TedsResult<Vec<FieldRecord>> {
        Ok(self.fields.clone())
    }
}

/// Reads the inner source once and serves the cached rows afterwards.
pub struct CachedFieldSource<S> {
    inner: S,
    cache: Option<Vec<FieldRecord>>,
}

impl<S: FieldSource> CachedFieldSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, cache: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.is_some()
    }
}

impl<S: FieldSource> FieldSource for CachedFieldSource<S> {
    fn get_fields(&mut self) -> TedsResult<Vec<FieldRecord>> {
        if let Some(fields) = &self.cache {
            return Ok(fields.clone());
        }
        let fields = self.inner.get_fields()?;
        self.cache = Some(fields.clone());
        Ok(fields)
    }
}

/// A sheet cell: numbers and text are both accepted, as in a spreadsheet.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Cell {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl Cell {
    fn into_text(self) -> String {
        match self {
            Cell::Integer(v) => v.to_string(),
            Cell::Number(v) => v.to_string(),
            Cell::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SheetRow {
    name: Option<String>,
    length: Cell,
    #[serde(default)]
    range: Option<Cell>,
    #[serde(rename = "type")]
    type_tag: Cell,
    value: Cell,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Sheet {
    Table { field: Vec<SheetRow> },
    Rows(Vec<SheetRow>),
}

/// Loads a field sheet from a TOML (`[[field]]` tables) or JSON file.
///
/// Columns: `name`, `length`, `range`, `type`, `value`. Rows without a name
/// are skipped. Row order is kept.
pub struct FieldSheetLoader {
    path: PathBuf,
    validator: Box<dyn RangeValidator>,
}

impl FieldSheetLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            validator: Box::new(AcceptAll),
        }
    }

    pub fn with_validator<V: RangeValidator + 'static>(mut self, validator: V) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_sheet(&self) -> Result<Sheet, SourceError> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| SourceError::Io(format!("{}: {}", self.path.display(), e)))?;
        match self.path.extension().and_then(|s| s.to_str()) {
            Some("toml") => parse_toml_sheet(&content),
            Some("json") => parse_json_sheet(&content),
            _ => Err(SourceError::Format(format!(
                "unsupported field sheet format: {}",
                self.path.display()
            ))),
        }
    }

    fn rows_to_records(&self, rows: Vec<SheetRow>) -> Result<Vec<FieldRecord>, SourceError> {
        let mut records = Vec::with_capacity(rows.len());
        for (row_no, row) in rows.into_iter().enumerate() {
            let name = match row.name {
                Some(name) if !name.trim().is_empty() => name,
                _ => {
                    debug!("skipping unnamed row {}", row_no);
                    continue;
                }
            };
            let record = FieldRecord {
                bit_length: parse_length(&name, row.length)?,
                raw_value: row.value.into_text(),
                range_spec: row.range.map(Cell::into_text).unwrap_or_default(),
                type_tag: row.type_tag.into_text(),
                name,
            };
            self.validator.check(&record)?;
            records.push(record);
        }
        Ok(records)
    }
}

impl FieldSource for FieldSheetLoader {
    fn get_fields(&mut self) -> TedsResult<Vec<FieldRecord>> {
        let rows = match self.read_sheet()? {
            Sheet::Table { field } => field,
            Sheet::Rows(rows) => rows,
        };
        let records = self.rows_to_records(rows)?;
        info!("loaded {} fields from {}", records.len(), self.path.display());
        Ok(records)
    }
}

fn parse_toml_sheet(content: &str) -> Result<Sheet, SourceError> {
    toml::from_str(content).map_err(|e| SourceError::Format(format!("TOML: {}", e)))
}

fn parse_json_sheet(content: &str) -> Result<Sheet, SourceError> {
    serde_json::from_str(content).map_err(|e| SourceError::Format(format!("JSON: {}", e)))
}

/// `8`, `8.0` and `"8"` are all a length of 8; fractions are truncated.
fn parse_length(name: &str, cell: Cell) -> Result<usize, SourceError> {
    let text = cell.into_text();
    let value = text
        .trim()
        .parse::<f64>()
        .map_err(|_| SourceError::Format(format!("field '{}' has a non-numeric length '{}'", name, text)))?;
    if !value.is_finite() || value < 0.0 {
        return Err(SourceError::Format(format!("field '{}' has an invalid length '{}'", name, text)));
    }
    Ok(value.trunc() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::teds_common_rs::record::core::exceptions::TedsError;

    struct CountingSource {
        calls: usize,
    }

    impl FieldSource for CountingSource {
        fn get_fields(&mut self) -> TedsResult<Vec<FieldRecord>> {
            self.calls += 1;
            Ok(vec![FieldRecord::new("A", "1", 4, "", "UNINT")])
        }
    }

    #[test]
    fn test_cached_source_reads_once() {
        let mut source = CachedFieldSource::new(CountingSource { calls: 0 });
        assert!(!source.is_loaded());
        let first = source.get_fields().unwrap();
        let second = source.get_fields().unwrap();
        assert_eq!(first, second);
        assert_eq!(source.inner.calls, 1);
    }

    #[test]
    fn test_parse_toml_rows() {
        let sheet = parse_toml_sheet(
            r#"
            [[field]]
            name = "Manufacturer ID"
            length = 14
            type = "UNINT"
            value = 17

            [[field]]
            name = "Version Letter"
            length = "5.0"
            range = ""
            type = "Chr5"
            value = "A"
            "#,
        )
        .unwrap();
        let rows = match sheet {
            Sheet::Table { field } => field,
            Sheet::Rows(_) => panic!("expected [[field]] tables"),
        };
        let records = FieldSheetLoader::new("unused.toml").rows_to_records(rows).unwrap();
        assert_eq!(records[0], FieldRecord::new("Manufacturer ID", "17", 14, "", "UNINT"));
        assert_eq!(records[1].bit_length, 5);
    }

    #[test]
    fn test_parse_json_rows_skips_unnamed() {
        let sheet = parse_json_sheet(
            r#"[
                {"name": "Gain", "length": 8.0, "range": "0 to 10 step 0.5", "type": "ConRes", "value": 2.5},
                {"name": null, "length": 1, "type": "UNINT", "value": 0}
            ]"#,
        )
        .unwrap();
        let rows = match sheet {
            Sheet::Rows(rows) => rows,
            Sheet::Table { .. } => panic!("expected a row array"),
        };
        let records = FieldSheetLoader::new("unused.json").rows_to_records(rows).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_value, "2.5");
        assert_eq!(records[0].bit_length, 8);
    }

    #[test]
    fn test_missing_file_is_source_error() {
        let mut loader = FieldSheetLoader::new("/nonexistent/teds_fields.toml");
        assert!(matches!(loader.get_fields(), Err(TedsError::Source(SourceError::Io(_)))));
    }
}
