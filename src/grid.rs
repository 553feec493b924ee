//! Table preview sent to the page's data grid.

use polars::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GridPreview {
    pub columns: Vec<String>,
    /// Column data types, as polars names them
    pub dtypes: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Rows in the full table (rows beyond the preview are not sent)
    pub total_rows: usize,
}

impl GridPreview {
    /// First `limit` rows of `df`, each cell rendered as text. Nulls render as empty cells.
    pub fn from_frame(df: &DataFrame, limit: usize) -> Self {
        let columns = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let dtypes = df.dtypes().iter().map(|dtype| dtype.to_string()).collect();

        let shown = df.height().min(limit);
        let rows = (0..shown)
            .map(|row| {
                df.get_columns()
                    .iter()
                    .map(|column| column.get(row).map(format_cell).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self {
            columns,
            dtypes,
            rows,
            total_rows: df.height(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn format_cell(value: AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Boolean(b) => b.to_string(),
        AnyValue::Float64(f) => f.to_string(),
        AnyValue::Float32(f) => f.to_string(),
        AnyValue::Int64(i) => i.to_string(),
        AnyValue::Int32(i) => i.to_string(),
        AnyValue::UInt64(u) => u.to_string(),
        AnyValue::UInt32(u) => u.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_limits_rows() {
        let df = df!("a" => &[1i64, 2, 3], "b" => &["x", "y", "z"]).unwrap();
        let grid = GridPreview::from_frame(&df, 2);
        assert_eq!(grid.columns, vec!["a", "b"]);
        assert_eq!(grid.total_rows, 3);
        assert_eq!(
            grid.rows,
            vec![vec!["1".to_string(), "x".to_string()], vec!["2".to_string(), "y".to_string()]]
        );
    }

    #[test]
    fn nulls_are_blank() {
        let df = df!("a" => &[Some(1.5_f64), None]).unwrap();
        let grid = GridPreview::from_frame(&df, 10);
        assert_eq!(grid.rows[1], vec![String::new()]);
        assert_eq!(grid.rows[0], vec!["1.5".to_string()]);
    }

    #[test]
    fn empty_frame_is_empty_grid() {
        let grid = GridPreview::from_frame(&DataFrame::empty(), 10);
        assert!(grid.is_empty());
        assert_eq!(grid.total_rows, 0);
    }
}
