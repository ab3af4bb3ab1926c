//! Minimal Plotly figure model rendered to standalone HTML.
//!
//! Traces and layout are plain `serde_json` values in Plotly's schema; the
//! page loads plotly.js from its CDN.

use crate::error::OpsResult;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

pub mod palette {
    pub const PRIMARY: &str = "#1f77b4";
    pub const SUCCESS: &str = "#2ecc71";
    pub const DANGER: &str = "#e74c3c";
    pub const WARNING: &str = "#f39c12";
    pub const INFO: &str = "#3498db";
    pub const DARK: &str = "#2c3e50";
    pub const LIGHT: &str = "#ecf0f1";
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub data: Vec<Value>,
    pub layout: Map<String, Value>,
}

impl Figure {
    pub fn new(title: &str) -> Self {
        let mut layout = Map::new();
        layout.insert(
            "title".into(),
            json!({ "text": title, "x": 0.5, "xanchor": "center", "font": { "size": 20 } }),
        );
        layout.insert("template".into(), json!("plotly_white"));
        Self {
            data: Vec::new(),
            layout,
        }
    }

    pub fn add_trace(&mut self, trace: Value) -> &mut Self {
        self.data.push(trace);
        self
    }

    pub fn set(&mut self, key: &str, value: Value) -> &mut Self {
        self.layout.insert(key.into(), value);
        self
    }

    /// Merge `value` into the object at `key`, creating it when absent.
    pub fn merge(&mut self, key: &str, value: Value) -> &mut Self {
        let slot = self
            .layout
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let (Value::Object(target), Value::Object(extra)) = (slot, value) {
            for (k, v) in extra {
                target.insert(k, v);
            }
        }
        self
    }

    fn push_to(&mut self, key: &str, item: Value) {
        let slot = self
            .layout
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = slot {
            items.push(item);
        }
    }

    pub fn add_shape(&mut self, shape: Value) -> &mut Self {
        self.push_to("shapes", shape);
        self
    }

    pub fn add_annotation(&mut self, annotation: Value) -> &mut Self {
        self.push_to("annotations", annotation);
        self
    }

    pub fn title(&self) -> &str {
        self.layout
            .get("title")
            .and_then(|t| t.get("text"))
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn to_json(&self) -> Value {
        json!({ "data": self.data, "layout": self.layout })
    }

    /// A `<div>` plus the script drawing this figure into it.
    pub fn embed(&self, div_id: &str) -> OpsResult<String> {
        let data = serde_json::to_string(&self.data)?;
        let layout = serde_json::to_string(&self.layout)?;
        Ok(format!(
            "<div id=\"{div_id}\" class=\"plotly-graph-div\"></div>\n\
             <script>Plotly.newPlot(\"{div_id}\", {data}, {layout}, {{\"responsive\": true}});</script>"
        ))
    }

    pub fn to_html(&self) -> OpsResult<String> {
        Ok(format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
             <script src=\"{PLOTLY_CDN}\"></script>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
            title = html_escape(self.title()),
            body = self.embed("figure")?,
        ))
    }

    /// Write `<dir>/<stem>.html`, creating `dir` if missing.
    pub fn write_html(&self, dir: &Path, stem: &str) -> OpsResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{stem}.html"));
        std::fs::write(&path, self.to_html()?)?;
        log::info!("saved {}", path.display());
        Ok(path)
    }
}

pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ── Subplot grid ───────────────────────────────────────────────────

/// Explicit-domain subplot layout. Cells are 1-based, row 1 on top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    pub h_gap: f64,
    pub v_gap: f64,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows: rows.max(1),
            cols: cols.max(1),
            h_gap: 0.08,
            v_gap: 0.12,
        }
    }

    pub fn with_gaps(mut self, h_gap: f64, v_gap: f64) -> Self {
        self.h_gap = h_gap;
        self.v_gap = v_gap;
        self
    }

    fn index(&self, row: usize, col: usize) -> usize {
        (row.clamp(1, self.rows) - 1) * self.cols + col.clamp(1, self.cols)
    }

    /// Trace-side axis ids: `("x", "y")` for the first cell, then `x2`, `y2`...
    pub fn axis_ids(&self, row: usize, col: usize) -> (String, String) {
        match self.index(row, col) {
            1 => ("x".into(), "y".into()),
            n => (format!("x{n}"), format!("y{n}")),
        }
    }

    /// Layout-side keys: `("xaxis", "yaxis")`, then `xaxis2`, `yaxis2`...
    pub fn axis_keys(&self, row: usize, col: usize) -> (String, String) {
        match self.index(row, col) {
            1 => ("xaxis".into(), "yaxis".into()),
            n => (format!("xaxis{n}"), format!("yaxis{n}")),
        }
    }

    /// Paper-coordinate `([x0, x1], [y0, y1])` of a cell.
    pub fn domain(&self, row: usize, col: usize) -> ([f64; 2], [f64; 2]) {
        let row = row.clamp(1, self.rows);
        let col = col.clamp(1, self.cols);
        let width = (1.0 - self.h_gap * (self.cols - 1) as f64) / self.cols as f64;
        let height = (1.0 - self.v_gap * (self.rows - 1) as f64) / self.rows as f64;
        let x0 = (col - 1) as f64 * (width + self.h_gap);
        let y1 = 1.0 - (row - 1) as f64 * (height + self.v_gap);
        ([round4(x0), round4(x0 + width)], [round4(y1 - height), round4(y1)])
    }

    /// Write axis domains and anchors plus one title per cell into `fig`.
    pub fn apply(&self, fig: &mut Figure, titles: &[&str]) {
        for row in 1..=self.rows {
            for col in 1..=self.cols {
                let (x_domain, y_domain) = self.domain(row, col);
                let (x_key, y_key) = self.axis_keys(row, col);
                let (x_id, y_id) = self.axis_ids(row, col);
                fig.merge(&x_key, json!({ "domain": x_domain, "anchor": y_id }));
                fig.merge(&y_key, json!({ "domain": y_domain, "anchor": x_id }));
                if let Some(title) = titles.get(self.index(row, col) - 1) {
                    fig.add_annotation(json!({
                        "text": format!("<b>{title}</b>"),
                        "xref": "paper",
                        "yref": "paper",
                        "x": (x_domain[0] + x_domain[1]) / 2.0,
                        "y": y_domain[1],
                        "xanchor": "center",
                        "yanchor": "bottom",
                        "showarrow": false,
                        "font": { "size": 14 },
                    }));
                }
            }
        }
    }

    /// Bind a cartesian trace to a cell.
    pub fn place(&self, mut trace: Value, row: usize, col: usize) -> Value {
        let (x, y) = self.axis_ids(row, col);
        if let Value::Object(obj) = &mut trace {
            obj.insert("xaxis".into(), json!(x));
            obj.insert("yaxis".into(), json!(y));
        }
        trace
    }

    /// Bind a domain trace (pie, indicator) to a cell.
    pub fn place_domain(&self, mut trace: Value, row: usize, col: usize) -> Value {
        let (x, y) = self.domain(row, col);
        if let Value::Object(obj) = &mut trace {
            obj.insert("domain".into(), json!({ "x": x, "y": y }));
        }
        trace
    }

    pub fn axis_titles(&self, fig: &mut Figure, row: usize, col: usize, x_title: &str, y_title: &str) {
        let (x_key, y_key) = self.axis_keys(row, col);
        fig.merge(&x_key, json!({ "title": { "text": x_title } }));
        fig.merge(&y_key, json!({ "title": { "text": y_title } }));
    }

    /// Shaded vertical band over `[x0, x1]` inside one cell.
    pub fn vrect(&self, row: usize, col: usize, x0: f64, x1: f64, color: &str) -> Value {
        let (x, y) = self.axis_ids(row, col);
        json!({
            "type": "rect",
            "xref": x,
            "yref": format!("{y} domain"),
            "x0": x0,
            "x1": x1,
            "y0": 0,
            "y1": 1,
            "fillcolor": color,
            "opacity": 0.2,
            "layer": "below",
            "line": { "width": 0 },
        })
    }

    /// Dashed horizontal line at `y` across one cell.
    pub fn hline(&self, row: usize, col: usize, y_value: f64, color: &str) -> Value {
        let (x, y) = self.axis_ids(row, col);
        json!({
            "type": "line",
            "xref": format!("{x} domain"),
            "yref": y,
            "x0": 0,
            "x1": 1,
            "y0": y_value,
            "y1": y_value,
            "line": { "color": color, "dash": "dash", "width": 2 },
        })
    }

    /// Dashed vertical line at `x` across one cell.
    pub fn vline(&self, row: usize, col: usize, x_value: f64, color: &str) -> Value {
        let (x, y) = self.axis_ids(row, col);
        json!({
            "type": "line",
            "xref": x,
            "yref": format!("{y} domain"),
            "x0": x_value,
            "x1": x_value,
            "y0": 0,
            "y1": 1,
            "line": { "color": color, "dash": "dash", "width": 2 },
        })
    }

    /// Text label in the top-left corner of a cell.
    pub fn label(&self, row: usize, col: usize, text: &str) -> Value {
        let (x, y) = self.axis_ids(row, col);
        json!({
            "text": text,
            "xref": format!("{x} domain"),
            "yref": format!("{y} domain"),
            "x": 0.02,
            "y": 0.98,
            "xanchor": "left",
            "yanchor": "top",
            "showarrow": false,
        })
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
