//! Decides whether and how a result set should be charted.
//!
//! The output is a [`ChartSpec`]; rendering is left to a collaborator.

use crate::result::{display_value, ResultSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tradewise_core::AppResult;

const VISUALIZATION_KEYWORDS: &[&str] = &[
    "trend", "performance", "report", "last", "months", "weeks", "days", "compare",
    "comparison", "distribution", "gain", "daily", "weekly", "monthly", "chart", "graph",
    "visualize", "period", "from", "to", "top", "list", "2023", "2024", "2025",
];

const VISUALIZATION_PHRASES: &[&str] = &["over time", "loss over", "profit over", "show me"];

const MONTHS: &[&str] = &[
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const COMPARISON_WORDS: &[&str] = &["compare", "vs", "versus", "top", "best", "worst"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
    Bar,
    Pie,
}

/// One plotted series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<Value>,
}

/// What to render, not how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub chart_type: ChartType,

    /// Column on the x axis (or pie labels); `None` means row index
    pub x_column: Option<String>,

    pub y_columns: Vec<String>,

    pub title: String,

    pub x_values: Vec<Value>,

    pub series: Vec<ChartSeries>,
}

/// Secondary yes/no judgment used when no keyword matches.
#[async_trait]
pub trait ChartAdvisor: Send + Sync {
    async fn advise(&self, intent: &str, rows: &ResultSet) -> AppResult<bool>;
}

/// Keyword gate with an optional advisory fallback.
#[derive(Clone, Default)]
pub struct VisualizationPolicy {
    advisor: Option<Arc<dyn ChartAdvisor>>,
}

impl VisualizationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_advisor(advisor: Arc<dyn ChartAdvisor>) -> Self {
        Self {
            advisor: Some(advisor),
        }
    }

    /// Empty and scalar results are never charted. Keyword matches always
    /// are. Otherwise the advisor decides, and without one (or when it
    /// fails) any multi-row result is charted.
    pub async fn should_visualize(&self, intent: &str, rows: &ResultSet) -> bool {
        if rows.is_empty() || rows.is_scalar() {
            return false;
        }

        if matches_keywords(intent) {
            return true;
        }

        match &self.advisor {
            Some(advisor) => match advisor.advise(intent, rows).await {
                Ok(decision) => decision,
                Err(e) => {
                    tracing::debug!("Chart advisor failed, using row-count fallback: {}", e);
                    rows.len() > 1
                }
            },
            None => rows.len() > 1,
        }
    }
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn matches_keywords(intent: &str) -> bool {
    let words = words(intent);
    let joined = words.join(" ");

    words.iter().any(|w| {
        VISUALIZATION_KEYWORDS.contains(&w.as_str()) || MONTHS.iter().any(|m| w.starts_with(m))
    }) || VISUALIZATION_PHRASES.iter().any(|p| joined.contains(p))
}

fn is_temporal_column(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("date") || lower.contains("time")
}

/// Numeric-ness is judged by the first row.
fn numeric_columns(rows: &ResultSet) -> Vec<usize> {
    match rows.rows.first() {
        Some(first) => first
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_number())
            .map(|(i, _)| i)
            .collect(),
        None => Vec::new(),
    }
}

/// Pick a chart type for a non-empty result set.
pub fn detect_chart_type(rows: &ResultSet, intent: &str) -> ChartType {
    let intent_words = words(intent);
    let has_temporal = rows.columns.iter().any(|c| is_temporal_column(c));
    let has_numeric = !numeric_columns(rows).is_empty();

    if has_temporal && has_numeric {
        return ChartType::Line;
    }

    if intent_words
        .iter()
        .any(|w| w == "distribution" || w == "breakdown")
    {
        return ChartType::Pie;
    }

    if (2..20).contains(&rows.len())
        && intent_words
            .iter()
            .any(|w| COMPARISON_WORDS.contains(&w.as_str()))
    {
        return ChartType::Bar;
    }

    if rows.len() > 2 {
        return ChartType::Line;
    }

    ChartType::Bar
}

/// Build the chart description, or `None` when nothing plottable exists.
pub fn build_chart_spec(rows: &ResultSet, intent: &str) -> Option<ChartSpec> {
    if rows.is_empty() || rows.columns.is_empty() {
        return None;
    }

    let numeric = numeric_columns(rows);
    if numeric.is_empty() && rows.columns.len() > 1 {
        return None;
    }

    let chart_type = detect_chart_type(rows, intent);
    match chart_type {
        ChartType::Line if !numeric.is_empty() => Some(line_spec(rows, &numeric)),
        // a lone text column has nothing to draw a line through
        ChartType::Line | ChartType::Bar => Some(categorical_spec(rows, &numeric, ChartType::Bar)),
        ChartType::Pie => Some(categorical_spec(rows, &numeric, ChartType::Pie)),
    }
}

fn line_spec(rows: &ResultSet, numeric: &[usize]) -> ChartSpec {
    let date_column = rows.columns.iter().position(|c| is_temporal_column(c));
    let x_values = match date_column {
        Some(idx) => rows.column_values(idx),
        None => (0..rows.len()).map(Value::from).collect(),
    };

    let series: Vec<ChartSeries> = numeric
        .iter()
        .map(|&idx| ChartSeries {
            name: rows.columns[idx].clone(),
            values: rows.column_values(idx),
        })
        .collect();

    ChartSpec {
        chart_type: ChartType::Line,
        x_column: date_column.map(|idx| rows.columns[idx].clone()),
        y_columns: series.iter().map(|s| s.name.clone()).collect(),
        title: "Performance Over Time".to_string(),
        x_values,
        series,
    }
}

/// Bar and pie: first column as category, first numeric column as value,
/// or a frequency count of the categories when nothing is numeric.
fn categorical_spec(rows: &ResultSet, numeric: &[usize], chart_type: ChartType) -> ChartSpec {
    let x_column = rows.columns[0].clone();

    let (x_values, series) = match numeric.first() {
        Some(&idx) => (
            rows.column_values(0),
            ChartSeries {
                name: rows.columns[idx].clone(),
                values: rows.column_values(idx),
            },
        ),
        None => {
            let mut labels: Vec<Value> = Vec::new();
            let mut counts: Vec<u64> = Vec::new();
            for value in rows.column_values(0) {
                let key = display_value(&value);
                match labels.iter().position(|l| display_value(l) == key) {
                    Some(pos) => counts[pos] += 1,
                    None => {
                        labels.push(value);
                        counts.push(1);
                    }
                }
            }
            (
                labels,
                ChartSeries {
                    name: "Count".to_string(),
                    values: counts.into_iter().map(Value::from).collect(),
                },
            )
        }
    };

    let title = match (chart_type, numeric.is_empty()) {
        (ChartType::Pie, _) => "Distribution Analysis",
        (_, true) => "Frequency Distribution",
        _ => "Performance Comparison",
    };

    ChartSpec {
        chart_type,
        x_column: Some(x_column),
        y_columns: vec![series.name.clone()],
        title: title.to_string(),
        x_values,
        series: vec![series],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tradewise_core::AppError;

    fn rs(columns: &[&str], rows: Vec<Vec<Value>>) -> ResultSet {
        ResultSet::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    fn daily() -> ResultSet {
        rs(
            &["Trade_Date", "Daily_PnL"],
            vec![
                vec![json!("2024-01-01"), json!(10.5)],
                vec![json!("2024-01-02"), json!(-3.0)],
                vec![json!("2024-01-03"), json!(7.25)],
            ],
        )
    }

    struct FixedAdvisor(AppResult<bool>);

    #[async_trait]
    impl ChartAdvisor for FixedAdvisor {
        async fn advise(&self, _intent: &str, _rows: &ResultSet) -> AppResult<bool> {
            match &self.0 {
                Ok(v) => Ok(*v),
                Err(_) => Err(AppError::Llm("offline".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_scalar_and_empty_never_visualized() {
        let policy = VisualizationPolicy::with_advisor(Arc::new(FixedAdvisor(Ok(true))));
        let scalar = rs(&["total"], vec![vec![json!(1234.5)]]);

        assert!(!policy.should_visualize("show me a chart of the trend", &scalar).await);
        assert!(!policy.should_visualize("chart", &rs(&["a"], vec![])).await);
    }

    #[tokio::test]
    async fn test_keyword_forces_visualization() {
        let policy = VisualizationPolicy::with_advisor(Arc::new(FixedAdvisor(Ok(false))));
        assert!(policy.should_visualize("daily pnl in March", &daily()).await);
        assert!(policy.should_visualize("profit over the quarter", &daily()).await);
    }

    #[tokio::test]
    async fn test_advisor_consulted_without_keywords() {
        let no = VisualizationPolicy::with_advisor(Arc::new(FixedAdvisor(Ok(false))));
        assert!(!no.should_visualize("pnl per symbol", &daily()).await);

        let failing = VisualizationPolicy::with_advisor(Arc::new(FixedAdvisor(Err(
            AppError::Llm(String::new()),
        ))));
        assert!(failing.should_visualize("pnl per symbol", &daily()).await);

        let single_row = rs(&["Symbol", "PnL"], vec![vec![json!("EURUSD"), json!(1)]]);
        assert!(!VisualizationPolicy::new().should_visualize("pnl per symbol", &single_row).await);
    }

    #[test]
    fn test_date_and_numeric_always_line() {
        for intent in ["distribution of pnl", "compare days", "anything"] {
            assert_eq!(detect_chart_type(&daily(), intent), ChartType::Line);
        }
        let spec = build_chart_spec(&daily(), "breakdown").unwrap();
        assert_eq!(spec.chart_type, ChartType::Line);
        assert_eq!(spec.x_column.as_deref(), Some("Trade_Date"));
        assert_eq!(spec.y_columns, vec!["Daily_PnL".to_string()]);
        assert_eq!(spec.x_values[1], json!("2024-01-02"));
    }

    #[test]
    fn test_chart_type_priorities() {
        let by_symbol = rs(
            &["Symbol", "Total"],
            vec![
                vec![json!("EURUSD"), json!(5)],
                vec![json!("GBPUSD"), json!(3)],
                vec![json!("USDJPY"), json!(1)],
            ],
        );
        assert_eq!(detect_chart_type(&by_symbol, "pnl breakdown"), ChartType::Pie);
        assert_eq!(detect_chart_type(&by_symbol, "top symbols"), ChartType::Bar);
        assert_eq!(detect_chart_type(&by_symbol, "symbols"), ChartType::Line);
        assert_eq!(detect_chart_type(&by_symbol.head(2), "symbols"), ChartType::Bar);
    }

    #[test]
    fn test_line_without_date_uses_row_index() {
        let rows = rs(
            &["a", "b"],
            vec![
                vec![json!(1), json!(2)],
                vec![json!(3), json!(4)],
                vec![json!(5), json!(6)],
            ],
        );
        let spec = build_chart_spec(&rows, "numbers").unwrap();
        assert_eq!(spec.chart_type, ChartType::Line);
        assert_eq!(spec.x_column, None);
        assert_eq!(spec.x_values, vec![json!(0), json!(1), json!(2)]);
        assert_eq!(spec.series.len(), 2);
    }

    #[test]
    fn test_bar_frequency_count_for_text_column() {
        let rows = rs(
            &["Symbol"],
            vec![
                vec![json!("EURUSD")],
                vec![json!("GBPUSD")],
                vec![json!("EURUSD")],
            ],
        );
        let spec = build_chart_spec(&rows, "compare symbols").unwrap();
        assert_eq!(spec.chart_type, ChartType::Bar);
        assert_eq!(spec.x_values, vec![json!("EURUSD"), json!("GBPUSD")]);
        assert_eq!(spec.series[0].values, vec![json!(2), json!(1)]);
        assert_eq!(spec.y_columns, vec!["Count".to_string()]);
    }

    #[test]
    fn test_no_numeric_multiple_text_columns_gives_none() {
        let rows = rs(
            &["Symbol", "Side"],
            vec![vec![json!("EURUSD"), json!("buy")], vec![json!("GBPUSD"), json!("sell")]],
        );
        assert!(build_chart_spec(&rows, "chart").is_none());
    }
}
