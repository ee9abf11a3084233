//! End-to-end query handling over a temporary trading database and QA index.

use rusqlite::{params, Connection};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tradewise_agent::setup::open_retriever;
use tradewise_agent::{QueryRequest, QueryService};
use tradewise_core::AppConfig;
use tradewise_knowledge::QaPair;
use tradewise_llm::MockLlmClient;
use tradewise_sql::ChartType;

fn create_trades(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        r#"CREATE TABLE forex_trades (
            "Trade_Date" TEXT NOT NULL,
            "Symbol" TEXT NOT NULL,
            "Daily_PnL" REAL NOT NULL,
            "Volume" REAL NOT NULL
        );"#,
    )
    .unwrap();

    for (date, symbol, pnl, volume) in [
        ("2024-01-02", "EURUSD", 100.0, 1.5),
        ("2024-01-03", "GBPUSD", -20.0, 0.8),
        ("2024-01-04", "EURUSD", 70.0, 2.0),
    ] {
        conn.execute(
            r#"INSERT INTO forex_trades ("Trade_Date", "Symbol", "Daily_PnL", "Volume")
               VALUES (?1, ?2, ?3, ?4)"#,
            params![date, symbol, pnl, volume],
        )
        .unwrap();
    }
}

fn workspace() -> (TempDir, AppConfig) {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".tradewise")).unwrap();
    create_trades(&dir.path().join(".tradewise/trades.db"));

    let mut config = AppConfig {
        workspace: dir.path().to_path_buf(),
        ..AppConfig::default()
    };
    config.database.min_connections = 1;
    config.database.max_connections = 2;
    (dir, config)
}

fn execute(sql: &str) -> String {
    json!({"tool": "validate_and_execute", "arguments": {"sql_query": sql}}).to_string()
}

fn request(query: &str) -> QueryRequest {
    QueryRequest {
        query: query.to_string(),
    }
}

#[tokio::test]
async fn test_total_profit_from_database() {
    let (_dir, config) = workspace();
    let client = Arc::new(MockLlmClient::scripted([
        execute(r#"SELECT SUM("Daily_PnL") AS total FROM forex_trades"#),
        "Your total profit is 150.00.".to_string(),
    ]));
    let service = QueryService::with_client(&config, client.clone()).unwrap();

    let response = service.handle(&request("What is my total profit?")).await.unwrap();
    assert!(response.success);
    assert_eq!(response.response, "Your total profit is 150.00.");
    assert_eq!(response.agent_used.as_deref(), Some("database"));
    assert!(response.chart.is_none());

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].prompt.contains("TABLE: forex_trades"));
    assert!(requests[0].prompt.contains("Daily_PnL (REAL)"));
    assert!(requests[1].prompt.contains("150"));
}

#[tokio::test]
async fn test_rejected_statement_is_regenerated() {
    let (_dir, config) = workspace();
    let client = Arc::new(MockLlmClient::scripted([
        execute(r#"SELECT "Daily_PnL" FROM forex_trades"#),
        execute(r#"SELECT SUM("Daily_PnL") FROM forex_trades"#),
        "Total profit is 150.".to_string(),
    ]));
    let service = QueryService::with_client(&config, client.clone()).unwrap();

    let response = service.handle(&request("What is my total profit?")).await.unwrap();
    assert!(response.success);
    assert_eq!(response.response, "Total profit is 150.");

    let retry = &client.requests()[1].prompt;
    assert!(retry.contains("Attempt 1 was rejected"));
    assert!(retry.contains("INTENT_VIOLATION: Total query needs SUM()."));
}

#[tokio::test]
async fn test_unknown_column_feedback_names_column() {
    let (_dir, config) = workspace();
    let client = Arc::new(MockLlmClient::scripted([
        execute("SELECT SUM(Profit) FROM forex_trades"),
        execute(r#"SELECT SUM("Daily_PnL") FROM forex_trades"#),
        "Total profit is 150.".to_string(),
    ]));
    let service = QueryService::with_client(&config, client.clone()).unwrap();

    let response = service.handle(&request("What is my total profit?")).await.unwrap();
    assert!(response.success);

    let retry = &client.requests()[1].prompt;
    assert!(retry.contains("EXECUTION ERROR (Attempt 1/3)"));
    assert!(retry.contains("Column 'Profit' not found."));
}

#[tokio::test]
async fn test_retry_budget_exhaustion_reports_failure() {
    let (_dir, config) = workspace();
    let bad = execute("SELECT SUM(Profit) FROM forex_trades");
    let client = Arc::new(MockLlmClient::scripted([bad.clone(), bad.clone(), bad]));
    let service = QueryService::with_client(&config, client.clone()).unwrap();

    let response = service.handle(&request("What is my total profit?")).await.unwrap();
    assert!(!response.success);
    assert_eq!(response.agent_used.as_deref(), Some("database"));
    assert!(response.response.contains("Query failed after 3 attempts"));
    assert_eq!(client.requests().len(), 3);
}

#[tokio::test]
async fn test_time_series_question_gets_line_chart() {
    let (_dir, config) = workspace();
    let client = Arc::new(MockLlmClient::scripted([
        execute(r#"SELECT "Trade_Date", "Daily_PnL" FROM forex_trades ORDER BY "Trade_Date""#),
        "Daily PnL ranged from -20 to 100. A chart has been generated.".to_string(),
    ]));
    let service = QueryService::with_client(&config, client.clone()).unwrap();

    let response = service.handle(&request("Show daily pnl over time")).await.unwrap();
    assert!(response.success);

    let chart = response.chart.unwrap();
    assert_eq!(chart.chart_type, ChartType::Line);
    assert_eq!(chart.x_column.as_deref(), Some("Trade_Date"));
    assert_eq!(chart.y_columns, vec!["Daily_PnL".to_string()]);
    assert_eq!(chart.x_values.len(), 3);

    let answer_request = &client.requests()[1];
    assert!(answer_request
        .system
        .as_deref()
        .unwrap()
        .contains("chart has been generated"));
}

#[tokio::test]
async fn test_conceptual_question_is_condensed() {
    let (_dir, config) = workspace();
    open_retriever(&config)
        .unwrap()
        .add_pair(&QaPair {
            qa_id: "QA_014".into(),
            question: "What is a stop loss order?".into(),
            answer: "An order that closes a position once price crosses a set level.".into(),
            source: "faq".into(),
        })
        .await
        .unwrap();

    let client = Arc::new(MockLlmClient::scripted([
        "A stop loss closes your position automatically at a chosen price.",
    ]));
    let service = QueryService::with_client(&config, client.clone()).unwrap();

    let response = service
        .handle(&request("Explain how a stop order works"))
        .await
        .unwrap();
    assert!(response.success);
    assert_eq!(response.agent_used.as_deref(), Some("retrieval"));
    assert_eq!(
        response.response,
        "A stop loss closes your position automatically at a chosen price."
    );
    assert!(client.requests()[0]
        .prompt
        .contains("Question: What is a stop loss order?"));
}

#[tokio::test]
async fn test_health_reports_store_and_index() {
    let (_dir, config) = workspace();
    let service =
        QueryService::with_client(&config, Arc::new(MockLlmClient::default())).unwrap();

    let report = service.health().await;
    assert!(report.database);
    assert_eq!(report.knowledge_pairs, Some(0));
}
