//! Loading of the engine's tabular output artifacts
//!
//! Each indexing run leaves a fixed set of parquet tables under
//! `<run>/artifacts/`. They are read through the parquet row API into
//! generic rows; the search engines pick out the columns they need.

use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Field, Row};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use grag_core::{Error, Result};

/// Artifact table names produced by the external engine
pub mod tables {
    pub const ENTITY: &str = "create_final_nodes";
    pub const ENTITY_EMBEDDING: &str = "create_final_entities";
    pub const COMMUNITY_REPORT: &str = "create_final_community_reports";
    pub const RELATIONSHIP: &str = "create_final_relationships";
    pub const COVARIATE: &str = "create_final_covariates";
    pub const TEXT_UNIT: &str = "create_final_text_units";
}

/// Community hierarchy level queried by default
pub const DEFAULT_COMMUNITY_LEVEL: i64 = 2;

/// A single cell of an artifact row
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    TextList(Vec<String>),
    FloatList(Vec<f32>),
}

impl CellValue {
    pub fn from_field(field: &Field) -> CellValue {
        match field {
            Field::Null => CellValue::Null,
            Field::Bool(b) => CellValue::Bool(*b),
            Field::Byte(v) => CellValue::Int(*v as i64),
            Field::Short(v) => CellValue::Int(*v as i64),
            Field::Int(v) => CellValue::Int(*v as i64),
            Field::Long(v) => CellValue::Int(*v),
            Field::UByte(v) => CellValue::Int(*v as i64),
            Field::UShort(v) => CellValue::Int(*v as i64),
            Field::UInt(v) => CellValue::Int(*v as i64),
            Field::ULong(v) => CellValue::Int(*v as i64),
            Field::Float(v) => CellValue::Float(*v as f64),
            Field::Double(v) => CellValue::Float(*v),
            Field::Str(s) => CellValue::Text(s.clone()),
            Field::ListInternal(list) => {
                let elements = list.elements();
                let mut floats = Vec::with_capacity(elements.len());
                let mut texts = Vec::with_capacity(elements.len());
                let mut all_float = true;
                let mut all_text = true;
                for element in elements {
                    match element {
                        Field::Float(v) if all_float => floats.push(*v),
                        Field::Double(v) if all_float => floats.push(*v as f32),
                        Field::Str(s) if all_text => {
                            all_float = false;
                            texts.push(s.clone());
                        }
                        _ => {
                            all_float = false;
                            all_text = false;
                        }
                    }
                    if matches!(element, Field::Float(_) | Field::Double(_)) {
                        all_text = false;
                    }
                }
                if all_float && !floats.is_empty() {
                    CellValue::FloatList(floats)
                } else if all_text && !texts.is_empty() {
                    CellValue::TextList(texts)
                } else if elements.is_empty() {
                    CellValue::TextList(Vec::new())
                } else {
                    CellValue::Text(field.to_string())
                }
            }
            other => CellValue::Text(other.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(v) => Some(*v),
            CellValue::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_float_list(&self) -> Option<&[f32]> {
        match self {
            CellValue::FloatList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text_list(&self) -> Option<&[String]> {
        match self {
            CellValue::TextList(v) => Some(v),
            _ => None,
        }
    }

    /// Human-readable rendering for context tables
    pub fn display(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Int(v) => v.to_string(),
            CellValue::Float(v) => format!("{:.2}", v),
            CellValue::Text(s) => s.clone(),
            CellValue::TextList(v) => v.join(","),
            CellValue::FloatList(v) => format!("[{} floats]", v.len()),
        }
    }
}

/// One artifact row: column name to cell value
pub type ArtifactRow = BTreeMap<String, CellValue>;

/// A whole artifact table
#[derive(Debug, Clone)]
pub struct ArtifactTable {
    pub name: String,
    pub rows: Vec<ArtifactRow>,
}

impl ArtifactTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn row_to_artifact_row(row: &Row) -> ArtifactRow {
    row.get_column_iter()
        .map(|(name, field)| (name.clone(), CellValue::from_field(field)))
        .collect()
}

/// Load a named artifact table from a run's artifacts directory
pub fn load_table(dir: &Path, name: &str) -> Result<ArtifactTable> {
    let path = dir.join(format!("{}.parquet", name));
    let file = File::open(&path).map_err(|e| {
        Error::Workspace(format!("missing artifact table {}: {}", path.display(), e))
    })?;
    let reader = SerializedFileReader::new(file)
        .map_err(|e| Error::Serialization(format!("{}: {}", path.display(), e)))?;

    let mut rows = Vec::new();
    let iter = reader
        .get_row_iter(None)
        .map_err(|e| Error::Serialization(format!("{}: {}", path.display(), e)))?;
    for row in iter {
        let row = row.map_err(|e| Error::Serialization(format!("{}: {}", path.display(), e)))?;
        rows.push(row_to_artifact_row(&row));
    }

    Ok(ArtifactTable {
        name: name.to_string(),
        rows,
    })
}

/// Load a table that may legitimately be absent (e.g. covariates when claim
/// extraction was disabled)
pub fn load_optional_table(dir: &Path, name: &str) -> Result<Option<ArtifactTable>> {
    let path = dir.join(format!("{}.parquet", name));
    if !path.exists() {
        return Ok(None);
    }
    load_table(dir, name).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_from_scalar_fields() {
        assert_eq!(
            CellValue::from_field(&Field::Str("alpha".to_string())),
            CellValue::Text("alpha".to_string())
        );
        assert_eq!(CellValue::from_field(&Field::Long(7)), CellValue::Int(7));
        assert_eq!(
            CellValue::from_field(&Field::Double(0.5)),
            CellValue::Float(0.5)
        );
        assert_eq!(CellValue::from_field(&Field::Null), CellValue::Null);
    }

    #[test]
    fn test_cell_accessors() {
        assert_eq!(CellValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(CellValue::Float(2.9).as_i64(), Some(2));
        assert_eq!(CellValue::Text("x".to_string()).as_str(), Some("x"));
        assert_eq!(CellValue::Null.as_str(), None);
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Null.display(), "");
        assert_eq!(CellValue::Float(1.234).display(), "1.23");
        assert_eq!(
            CellValue::TextList(vec!["a".to_string(), "b".to_string()]).display(),
            "a,b"
        );
        assert_eq!(CellValue::FloatList(vec![0.1, 0.2]).display(), "[2 floats]");
    }

    #[test]
    fn test_load_table_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_table(dir.path(), tables::ENTITY).unwrap_err();
        assert!(matches!(err, Error::Workspace(_)));

        let missing = load_optional_table(dir.path(), tables::COVARIATE).unwrap();
        assert!(missing.is_none());
    }
}
