//! Tabular results shared by every stage: printed with `tabled`,
//! exported with `csv`.

use crate::error::OpsResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};

/// A titled grid of stringified cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn new<S: Into<String>>(title: impl Into<String>, headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            title: title.into(),
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push<S: Into<String>>(&mut self, row: impl IntoIterator<Item = S>) {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by header name.
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cell at (`row`, `header`).
    pub fn cell(&self, row: usize, header: &str) -> Option<&str> {
        let col = self.column(header)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// ASCII grid of the first `limit` rows (all rows when `None`).
    pub fn render(&self, limit: Option<usize>) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.headers.iter().cloned());
        let take = limit.unwrap_or(self.rows.len());
        for row in self.rows.iter().take(take) {
            builder.push_record(row.iter().cloned());
        }
        let mut table = builder.build();
        table.with(Style::ascii());
        table.to_string()
    }

    /// Write headers and every row to `path`, creating parent directories.
    pub fn write_csv(&self, path: &Path) -> OpsResult<PathBuf> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        log::info!("exported {} rows to {}", self.rows.len(), path.display());
        Ok(path.to_path_buf())
    }
}

/// `"Failure Reasons"` → `"failure_reasons"`.
pub fn snake_case(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Fixed two-decimal rendering used for every numeric cell.
pub fn fmt2(value: f64) -> String {
    format!("{value:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_limits_rows() {
        let mut t = ReportTable::new("demo", ["a", "b"]);
        for i in 0..20 {
            t.push([i.to_string(), (i * 2).to_string()]);
        }
        let out = t.render(Some(3));
        assert!(out.contains("| 2 "));
        assert!(!out.contains("| 3 "));
    }

    #[test]
    fn csv_contains_header_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = ReportTable::new("demo", ["metric", "value"]);
        t.push(["count", "3"]);
        let path = t.write_csv(&dir.path().join("nested/out.csv")).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text, "metric,value\ncount,3\n");
    }

    #[test]
    fn snake_names() {
        assert_eq!(snake_case("Performance Per Crypto"), "performance_per_crypto");
    }

    #[test]
    fn cell_lookup_by_header() {
        let mut t = ReportTable::new("demo", ["x", "y"]);
        t.push(["1", "2"]);
        assert_eq!(t.cell(0, "y"), Some("2"));
        assert_eq!(t.cell(1, "y"), None);
        assert_eq!(t.cell(0, "z"), None);
    }
}
