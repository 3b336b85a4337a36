//! Result table types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One entry accumulated by a `List` Value.
///
/// A plain capture is stored as [`ListItem::Text`]. When the Value's regex
/// defines named sub-groups, each match is stored as a map of sub-group name
/// to captured text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListItem {
    Text(String),
    Groups(BTreeMap<String, String>),
}

/// Content of one column in a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field {
    Text(String),
    List(Vec<ListItem>),
}

impl Field {
    /// Returns `true` for the empty string and the empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            Field::Text(text) => text.is_empty(),
            Field::List(items) => items.is_empty(),
        }
    }

    /// Returns the text of a scalar field.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Field::Text(text) => Some(text),
            Field::List(_) => None,
        }
    }

    /// Returns the items of a list field.
    pub fn as_list(&self) -> Option<&[ListItem]> {
        match self {
            Field::Text(_) => None,
            Field::List(items) => Some(items),
        }
    }
}

impl Default for Field {
    fn default() -> Self {
        Field::Text(String::new())
    }
}

impl From<&str> for Field {
    fn from(text: &str) -> Self {
        Field::Text(text.to_string())
    }
}

impl From<String> for Field {
    fn from(text: String) -> Self {
        Field::Text(text)
    }
}

impl fmt::Display for ListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListItem::Text(text) => f.write_str(text),
            ListItem::Groups(groups) => {
                let pairs: Vec<String> = groups.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Text(text) => f.write_str(text),
            Field::List(items) => {
                let items: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

/// A completed record: one field per Value, in declaration order.
pub type Row = Vec<Field>;

/// Header and rows produced by a parse run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    /// Value names in declaration order.
    pub header: Vec<String>,
    /// Records in the order they were appended.
    pub rows: Vec<Row>,
}

impl ParseResult {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` when no record was produced.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the named column of every row.
    pub fn column(&self, name: &str) -> Option<Vec<&Field>> {
        let index = self.header.iter().position(|h| h == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Converts each row into a map keyed by Value name.
    ///
    /// # Examples
    ///
    /// ```
    /// use textfsm_core::{Field, ParseResult};
    ///
    /// let result = ParseResult {
    ///     header: vec!["Interface".into()],
    ///     rows: vec![vec![Field::from("eth0")]],
    /// };
    /// let records = result.records();
    /// assert_eq!(records[0]["Interface"], Field::from("eth0"));
    /// ```
    pub fn records(&self) -> Vec<BTreeMap<String, Field>> {
        self.rows
            .iter()
            .map(|row| {
                self.header
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_emptiness() {
        assert!(Field::default().is_empty());
        assert!(Field::List(Vec::new()).is_empty());
        assert!(!Field::from("x").is_empty());
        assert!(!Field::List(vec![ListItem::Text(String::new())]).is_empty());
    }

    #[test]
    fn test_field_display() {
        let mut groups = BTreeMap::new();
        groups.insert("name".to_string(), "bob".to_string());
        let field = Field::List(vec![
            ListItem::Text("a".to_string()),
            ListItem::Groups(groups),
        ]);
        assert_eq!(field.to_string(), "[a, {name=bob}]");
    }

    #[test]
    fn test_field_serializes_untagged() {
        let field = Field::List(vec![ListItem::Text("a".to_string())]);
        assert_eq!(serde_json::to_string(&field).unwrap(), r#"["a"]"#);
        assert_eq!(serde_json::to_string(&Field::from("b")).unwrap(), r#""b""#);
    }

    #[test]
    fn test_column_lookup() {
        let result = ParseResult {
            header: vec!["A".into(), "B".into()],
            rows: vec![
                vec![Field::from("1"), Field::from("2")],
                vec![Field::from("3"), Field::from("4")],
            ],
        };
        let column = result.column("B").unwrap();
        assert_eq!(column, vec![&Field::from("2"), &Field::from("4")]);
        assert!(result.column("C").is_none());
    }
}
