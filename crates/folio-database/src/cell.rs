//! Cell values and the per-type conversion table.
//!
//! A cell's value shape depends on its column type. Rather than inspecting
//! shapes at runtime, `CellValue` is a tagged union and every conversion
//! matches exhaustively on `(value, target type)`.

use serde::{Deserialize, Serialize};

use folio_types::ColumnId;

use crate::column::ColumnType;

/// One selectable tag of a select / multi-select column.
///
/// Tags are identified by `value`; use [`SelectTag::same_tag`] when matching.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectTag {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SelectTag {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Value equality, ignoring presentation (color).
    pub fn same_tag(&self, other: &SelectTag) -> bool {
        self.value == other.value
    }
}

/// A cell value, keyed by the column type family it belongs to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum CellValue {
    /// `number` and `progress` columns.
    Number(f64),
    /// `rich-text` columns.
    Text(String),
    /// `select` and `multi-select` columns.
    Tags(Vec<SelectTag>),
}

impl CellValue {
    /// Tag list built from plain values.
    pub fn tags<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        CellValue::Tags(values.into_iter().map(SelectTag::new).collect())
    }

    /// Falsy values carry nothing to convert: zero, NaN, empty text, and
    /// empty tag lists.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Number(n) => *n == 0.0 || n.is_nan(),
            CellValue::Text(s) => s.is_empty(),
            CellValue::Tags(tags) => tags.is_empty(),
        }
    }

    pub fn as_tags(&self) -> Option<&[SelectTag]> {
        match self {
            CellValue::Tags(tags) => Some(tags),
            _ => None,
        }
    }

    /// Every searchable string in this value.
    pub fn flatten(&self) -> Vec<String> {
        match self {
            CellValue::Number(n) => vec![format_number(*n)],
            CellValue::Text(s) => vec![s.clone()],
            CellValue::Tags(tags) => tags.iter().map(|t| t.value.clone()).collect(),
        }
    }

    /// Re-encode for `target`. `None` means the cell is left as it is.
    ///
    /// Narrowing to `select` keeps only the first tag.
    pub fn convert_to(&self, target: ColumnType) -> Option<CellValue> {
        if self.is_empty() {
            return None;
        }
        match (self, target) {
            (CellValue::Tags(tags), ColumnType::Select) => {
                Some(CellValue::Tags(tags.iter().take(1).cloned().collect()))
            }
            (CellValue::Tags(_), ColumnType::MultiSelect) => Some(self.clone()),
            (CellValue::Tags(tags), ColumnType::RichText) => Some(CellValue::Text(
                tags.iter()
                    .map(|t| t.value.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            )),
            (CellValue::Tags(_), ColumnType::Number | ColumnType::Progress) => None,

            (CellValue::Number(n), ColumnType::RichText) => {
                Some(CellValue::Text(format_number(*n)))
            }
            (CellValue::Number(n), ColumnType::Number) => Some(CellValue::Number(*n)),
            (CellValue::Number(n), ColumnType::Progress) => {
                Some(CellValue::Number(n.clamp(0.0, 100.0)))
            }
            (CellValue::Number(_), ColumnType::Select | ColumnType::MultiSelect) => None,

            (CellValue::Text(_), ColumnType::RichText) => Some(self.clone()),
            (CellValue::Text(s), ColumnType::Number) => parse_finite(s).map(CellValue::Number),
            (CellValue::Text(s), ColumnType::Progress) => {
                parse_finite(s).map(|n| CellValue::Number(n.clamp(0.0, 100.0)))
            }
            (CellValue::Text(_), ColumnType::Select | ColumnType::MultiSelect) => None,
        }
    }
}

/// `"inf"` and `"NaN"` parse as floats but cannot be stored.
fn parse_finite(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Render whole numbers without a trailing `.0`.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A single row/column value pair.
///
/// `column_id` duplicates the key the cell is stored under; every write
/// keeps the two identical.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub column_id: ColumnId,
    pub value: CellValue,
}

impl Cell {
    pub fn new(column_id: ColumnId, value: CellValue) -> Self {
        Self { column_id, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_values(value: &CellValue) -> Vec<&str> {
        value
            .as_tags()
            .unwrap()
            .iter()
            .map(|t| t.value.as_str())
            .collect()
    }

    #[test]
    fn test_select_keeps_first_tag() {
        let value = CellValue::tags(["x", "y", "z"]);
        let narrowed = value.convert_to(ColumnType::Select).unwrap();
        assert_eq!(tag_values(&narrowed), vec!["x"]);

        let again = narrowed.convert_to(ColumnType::Select).unwrap();
        assert_eq!(again, narrowed);
    }

    #[test]
    fn test_number_to_rich_text() {
        assert_eq!(
            CellValue::Number(42.0).convert_to(ColumnType::RichText),
            Some(CellValue::Text("42".into()))
        );
        assert_eq!(
            CellValue::Number(0.5).convert_to(ColumnType::RichText),
            Some(CellValue::Text("0.5".into()))
        );
        assert_eq!(CellValue::Number(0.0).convert_to(ColumnType::RichText), None);
        assert_eq!(CellValue::Number(f64::NAN).convert_to(ColumnType::RichText), None);
    }

    #[test]
    fn test_tags_to_rich_text_joined() {
        let value = CellValue::tags(["a", "b"]);
        assert_eq!(
            value.convert_to(ColumnType::RichText),
            Some(CellValue::Text("a, b".into()))
        );
    }

    #[test]
    fn test_text_to_number() {
        assert_eq!(
            CellValue::Text(" 12.5 ".into()).convert_to(ColumnType::Number),
            Some(CellValue::Number(12.5))
        );
        assert_eq!(CellValue::Text("n/a".into()).convert_to(ColumnType::Number), None);
        assert_eq!(CellValue::Text("inf".into()).convert_to(ColumnType::Number), None);
        assert_eq!(CellValue::Text("NaN".into()).convert_to(ColumnType::Progress), None);
        assert_eq!(
            CellValue::Text("250".into()).convert_to(ColumnType::Progress),
            Some(CellValue::Number(100.0))
        );
    }

    #[test]
    fn test_empty_values_are_skipped() {
        assert_eq!(CellValue::Text(String::new()).convert_to(ColumnType::RichText), None);
        assert_eq!(CellValue::Tags(vec![]).convert_to(ColumnType::Select), None);
    }

    #[test]
    fn test_incompatible_targets_skip() {
        assert_eq!(CellValue::Number(3.0).convert_to(ColumnType::Select), None);
        assert_eq!(CellValue::Text("a".into()).convert_to(ColumnType::MultiSelect), None);
        assert_eq!(CellValue::tags(["a"]).convert_to(ColumnType::Number), None);
    }

    #[test]
    fn test_same_tag_ignores_color() {
        let plain = SelectTag::new("A");
        let red = SelectTag::new("A").with_color("red");
        assert!(plain.same_tag(&red));
        assert_ne!(plain, red);
        assert!(!plain.same_tag(&SelectTag::new("a")));
    }

    #[test]
    fn test_flatten() {
        assert_eq!(CellValue::Number(7.0).flatten(), vec!["7"]);
        assert_eq!(CellValue::tags(["p", "q"]).flatten(), vec!["p", "q"]);
    }

    #[test]
    fn test_cell_serde_shape() {
        let cell = Cell::new(ColumnId::from("c1"), CellValue::tags(["A"]));
        let json = serde_json::to_value(&cell).unwrap();
        assert_eq!(json["columnId"], "c1");
        assert_eq!(json["value"]["kind"], "tags");
        assert_eq!(json["value"]["data"][0]["value"], "A");
    }
}
