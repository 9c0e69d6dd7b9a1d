//! Column definitions.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use folio_types::ColumnId;

use crate::cell::{CellValue, SelectTag};

/// Column type. Persisted as its kebab-case name (`"multi-select"`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ColumnType {
    RichText,
    Number,
    Progress,
    Select,
    MultiSelect,
}

impl ColumnType {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::RichText => "rich-text",
            ColumnType::Number => "number",
            ColumnType::Progress => "progress",
            ColumnType::Select => "select",
            ColumnType::MultiSelect => "multi-select",
        }
    }

    /// Whether `value` has the shape this column type stores.
    pub fn accepts(&self, value: &CellValue) -> bool {
        match (self, value) {
            (ColumnType::RichText, CellValue::Text(_)) => true,
            (ColumnType::Number | ColumnType::Progress, CellValue::Number(_)) => true,
            (ColumnType::Select, CellValue::Tags(tags)) => tags.len() <= 1,
            (ColumnType::MultiSelect, CellValue::Tags(_)) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed field shared by every row of a database block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    pub width: f64,
    /// Selectable tags (select / multi-select only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectTag>,
}

/// Input to `update_column`: a column definition whose id may be absent.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSpec {
    /// `None` creates a new column with a fresh id.
    pub id: Option<ColumnId>,
    pub name: String,
    pub kind: ColumnType,
    /// `None` keeps the existing width, or uses the configured default.
    pub width: Option<f64>,
    pub options: Vec<SelectTag>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            id: None,
            name: name.into(),
            kind,
            width: None,
            options: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: ColumnId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_options(mut self, options: Vec<SelectTag>) -> Self {
        self.options = options;
        self
    }
}

impl From<Column> for ColumnSpec {
    fn from(column: Column) -> Self {
        Self {
            id: Some(column.id),
            name: column.name,
            kind: column.kind,
            width: Some(column.width),
            options: column.options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_names() {
        for kind in [
            ColumnType::RichText,
            ColumnType::Number,
            ColumnType::Progress,
            ColumnType::Select,
            ColumnType::MultiSelect,
        ] {
            assert_eq!(ColumnType::from_str(kind.as_str()), Some(kind));
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
        }
        assert_eq!(ColumnType::from_str("Multi-Select"), Some(ColumnType::MultiSelect));
        assert_eq!(ColumnType::from_str("date"), None);
    }

    #[test]
    fn test_accepts() {
        assert!(ColumnType::Select.accepts(&CellValue::tags(["a"])));
        assert!(!ColumnType::Select.accepts(&CellValue::tags(["a", "b"])));
        assert!(ColumnType::MultiSelect.accepts(&CellValue::tags(["a", "b"])));
        assert!(ColumnType::Progress.accepts(&CellValue::Number(10.0)));
        assert!(!ColumnType::RichText.accepts(&CellValue::Number(10.0)));
    }

    #[test]
    fn test_column_serde_shape() {
        let column = Column {
            id: ColumnId::from("c1"),
            name: "Status".into(),
            kind: ColumnType::Select,
            width: 200.0,
            options: vec![SelectTag::new("Done")],
        };
        let json = serde_json::to_value(&column).unwrap();
        assert_eq!(json["type"], "select");
        assert_eq!(json["options"][0]["value"], "Done");

        let plain = Column {
            options: vec![],
            ..column
        };
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("options").is_none());
    }
}
