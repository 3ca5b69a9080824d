use std::collections::BTreeMap;

use super::row::{ObjectRow, Row};
use crate::types::{FetchMode, RowValues};

/// A fully materialized result set from a database query
///
/// Rows are buffered in full before the set is handed to the caller; there is
/// no incremental delivery.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<Row>,
    /// The number of rows affected (for DML statements)
    pub rows_affected: usize,
    /// Row shape this set materializes into
    fetch_mode: FetchMode,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Option<std::sync::Arc<Vec<String>>>,
    /// Name-to-index cache shared by all object-shaped rows
    column_index_cache: Option<std::sync::Arc<std::collections::HashMap<String, usize>>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity and row shape
    #[must_use]
    pub fn with_capacity(capacity: usize, fetch_mode: FetchMode) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            rows_affected: 0,
            fetch_mode,
            column_names: None,
            column_index_cache: None,
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: std::sync::Arc<Vec<String>>) {
        self.column_index_cache = Some(std::sync::Arc::new(
            column_names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i))
                .collect::<std::collections::HashMap<_, _>>(),
        ));
        self.column_names = Some(column_names);
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&std::sync::Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Row shape this set materializes into
    #[must_use]
    pub fn fetch_mode(&self) -> FetchMode {
        self.fetch_mode
    }

    /// Add a row to the result set, shaped per the set's fetch mode
    ///
    /// Values are positional, in column order. Has no effect until column
    /// names have been set.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        let Some(column_names) = &self.column_names else {
            return;
        };

        let row = match self.fetch_mode {
            FetchMode::Object => {
                let cache = self
                    .column_index_cache
                    .get_or_insert_with(|| {
                        std::sync::Arc::new(
                            column_names
                                .iter()
                                .enumerate()
                                .map(|(i, name)| (name.clone(), i))
                                .collect::<std::collections::HashMap<_, _>>(),
                        )
                    })
                    .clone();
                Row::Object(ObjectRow {
                    column_names: column_names.clone(),
                    values: row_values,
                    column_index_cache: cache,
                })
            }
            FetchMode::Assoc => Row::Assoc(
                column_names
                    .iter()
                    .cloned()
                    .zip(row_values)
                    .collect::<BTreeMap<_, _>>(),
            ),
        };

        self.results.push(row);
        self.rows_affected += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn columns() -> Arc<Vec<String>> {
        Arc::new(vec!["id".to_string(), "name".to_string()])
    }

    #[test]
    fn object_mode_rows_share_column_metadata() {
        let mut rs = ResultSet::with_capacity(2, FetchMode::Object);
        rs.set_column_names(columns());
        rs.add_row_values(vec![RowValues::Int(1), RowValues::Text("a".into())]);
        rs.add_row_values(vec![RowValues::Int(2), RowValues::Text("b".into())]);

        assert_eq!(rs.rows_affected, 2);
        let first = rs.results[0].as_object().unwrap();
        let second = rs.results[1].as_object().unwrap();
        assert!(Arc::ptr_eq(&first.column_names, &second.column_names));
        assert_eq!(rs.results[1].get("name"), Some(&RowValues::Text("b".into())));
    }

    #[test]
    fn assoc_mode_rows_map_names_to_values() {
        let mut rs = ResultSet::with_capacity(1, FetchMode::Assoc);
        rs.set_column_names(columns());
        rs.add_row_values(vec![RowValues::Int(1), RowValues::Text("a".into())]);

        let map = rs.results[0].as_assoc().unwrap();
        assert_eq!(map.get("id"), Some(&RowValues::Int(1)));
        assert_eq!(map.get("name"), Some(&RowValues::Text("a".into())));
    }

    #[test]
    fn rows_without_column_names_are_dropped() {
        let mut rs = ResultSet::with_capacity(1, FetchMode::Object);
        rs.add_row_values(vec![RowValues::Int(1)]);
        assert!(rs.results.is_empty());
        assert_eq!(rs.rows_affected, 0);
    }
}
