use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::cell::Cell;

/// A named, rectangular output table: one header row plus data rows.
///
/// Every table the engine emits (tidy exports, merged report, discrepancy
/// reports) has this shape, so emitters never need to know which is which.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<S: Into<String>>(name: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or truncating it to the column count.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }
}

/// Rows serialize as objects keyed by column name, in column order.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Row<'a>(&'a [String], &'a [Cell]);

        impl Serialize for Row<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (col, cell) in self.0.iter().zip(self.1) {
                    map.serialize_entry(col, cell)?;
                }
                map.end()
            }
        }

        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&Row(&self.columns, row))?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_row_normalizes_width() {
        let mut t = Table::new("T", ["a", "b", "c"]);
        t.push_row(vec![Cell::text("1")]);
        t.push_row(vec![Cell::text("1"), Cell::text("2"), Cell::text("3"), Cell::text("4")]);
        assert_eq!(t.len(), 2);
        assert!(t.rows.iter().all(|r| r.len() == 3));
        assert_eq!(t.rows[0][2], Cell::Empty);
    }

    #[test]
    fn column_lookup() {
        let mut t = Table::new("T", ["Day", "Value"]);
        t.push_row(vec![Cell::Number(1.0), Cell::text("GO")]);
        assert_eq!(t.column_index("Value"), Some(1));
        assert_eq!(t.column("Value").unwrap(), vec![&Cell::text("GO")]);
        assert!(t.column("Nope").is_none());
    }
}
