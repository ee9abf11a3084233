//! HTML chart files.
//!
//! Turns a [`ChartSpec`] into a standalone page that loads Plotly from its
//! CDN. The file name carries a timestamp; a numeric suffix is added when a
//! chart from the same second already exists, so files are never replaced.

use serde_json::{json, Value};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use tradewise_core::{AppError, AppResult};
use tradewise_sql::{ChartSpec, ChartType};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

/// Suffixes tried for one timestamp before giving up.
const MAX_SUFFIX: u32 = 100;

pub struct HtmlChartRenderer {
    output_dir: PathBuf,
}

impl HtmlChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write the chart and return its path.
    pub fn render(&self, spec: &ChartSpec) -> AppResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let html = page(spec)?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();

        for suffix in 0..MAX_SUFFIX {
            let name = match suffix {
                0 => format!("chart_{}.html", stamp),
                n => format!("chart_{}_{}.html", stamp, n),
            };
            let path = self.output_dir.join(name);

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            file.write_all(html.as_bytes())?;

            tracing::info!("Chart written to {}", path.display());
            return Ok(path);
        }

        Err(AppError::Other(format!(
            "Too many charts for timestamp {} in {}",
            stamp,
            self.output_dir.display()
        )))
    }
}

fn page(spec: &ChartSpec) -> AppResult<String> {
    let traces = script_json(&Value::Array(traces(spec)))?;
    let layout = script_json(&layout(spec))?;

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <script src="{cdn}"></script>
</head>
<body>
  <div id="chart" style="width:100%;height:90vh;"></div>
  <script>
    Plotly.newPlot("chart", {traces}, {layout});
  </script>
</body>
</html>
"#,
        title = escape_html(&spec.title),
        cdn = PLOTLY_CDN,
        traces = traces,
        layout = layout,
    ))
}

/// JSON safe to inline in a `<script>` block: cell values cannot close the
/// tag or open a comment.
fn script_json(value: &Value) -> AppResult<String> {
    Ok(serde_json::to_string(value)?
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}

fn traces(spec: &ChartSpec) -> Vec<Value> {
    spec.series
        .iter()
        .map(|series| match spec.chart_type {
            ChartType::Line => json!({
                "type": "scatter",
                "mode": "lines+markers",
                "name": series.name,
                "x": spec.x_values,
                "y": series.values,
            }),
            ChartType::Bar => json!({
                "type": "bar",
                "name": series.name,
                "x": spec.x_values,
                "y": series.values,
            }),
            ChartType::Pie => json!({
                "type": "pie",
                "name": series.name,
                "labels": spec.x_values,
                "values": series.values,
            }),
        })
        .collect()
}

fn layout(spec: &ChartSpec) -> Value {
    let mut layout = json!({ "title": spec.title });
    if spec.chart_type != ChartType::Pie {
        layout["xaxis"] = json!({ "title": spec.x_column.clone().unwrap_or_default() });
        layout["yaxis"] = json!({ "title": spec.y_columns.join(", ") });
    }
    layout
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
