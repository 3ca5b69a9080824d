use std::collections::BTreeMap;

use crate::types::RowValues;

/// A row from a database query result, with shared column metadata
///
/// Column names are shared across all rows in a result set; lookups by name
/// go through a prebuilt name-to-index cache.
#[derive(Debug, Clone)]
pub struct ObjectRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: std::sync::Arc<Vec<String>>,
    /// The values for this row
    pub values: Vec<RowValues>,
    // Internal cache for faster column lookups (to avoid repeated string comparisons)
    #[doc(hidden)]
    pub(crate) column_index_cache: std::sync::Arc<std::collections::HashMap<String, usize>>,
}

impl ObjectRow {
    /// Create a new row from shared column names and its values
    #[must_use]
    pub fn new(column_names: std::sync::Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let cache = std::sync::Arc::new(
            column_names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i))
                .collect::<std::collections::HashMap<_, _>>(),
        );

        Self {
            column_names,
            values,
            column_index_cache: cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        // First check the cache
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }

        // Fall back to linear search
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        let index_opt = self.get_column_index(column_name);
        if let Some(idx) = index_opt {
            self.values.get(idx)
        } else {
            None
        }
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }
}

/// A materialized result row in the shape the connection was configured for
///
/// `FetchMode::Object` produces [`Row::Object`]; `FetchMode::Assoc` produces
/// [`Row::Assoc`]. `get` answers by column name for either shape.
#[derive(Debug, Clone)]
pub enum Row {
    /// Shared-column-metadata row with positional values
    Object(ObjectRow),
    /// Associative name-to-value mapping
    Assoc(BTreeMap<String, RowValues>),
}

impl Row {
    /// Get a value by column name, regardless of shape
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        match self {
            Row::Object(row) => row.get(column_name),
            Row::Assoc(map) => map.get(column_name),
        }
    }

    /// Borrow the object-shaped row, if this row is one
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRow> {
        match self {
            Row::Object(row) => Some(row),
            Row::Assoc(_) => None,
        }
    }

    /// Borrow the associative mapping, if this row is one
    #[must_use]
    pub fn as_assoc(&self) -> Option<&BTreeMap<String, RowValues>> {
        match self {
            Row::Object(_) => None,
            Row::Assoc(map) => Some(map),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn object_row_lookup_by_name_and_index() {
        let cols = Arc::new(vec!["id".to_string(), "name".to_string()]);
        let row = ObjectRow::new(cols, vec![RowValues::Int(1), RowValues::Text("a".into())]);

        assert_eq!(row.get("id"), Some(&RowValues::Int(1)));
        assert_eq!(row.get_by_index(1), Some(&RowValues::Text("a".into())));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn row_get_answers_for_both_shapes() {
        let cols = Arc::new(vec!["n".to_string()]);
        let object = Row::Object(ObjectRow::new(cols, vec![RowValues::Int(5)]));
        let assoc = Row::Assoc(BTreeMap::from([("n".to_string(), RowValues::Int(5))]));

        assert_eq!(object.get("n"), Some(&RowValues::Int(5)));
        assert_eq!(assoc.get("n"), Some(&RowValues::Int(5)));
        assert!(object.as_object().is_some());
        assert!(assoc.as_assoc().is_some());
    }
}
