//! Process-scoped schema description cache.
//!
//! Populated on the first successful fetch and kept until restart; nothing
//! in this system writes schema. A failed fetch is not cached.

use crate::store::DataStore;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tradewise_core::{AppError, AppResult};

pub struct SchemaCache {
    store: Arc<dyn DataStore>,
    table: String,
    description: OnceCell<String>,
}

impl SchemaCache {
    pub fn new(store: Arc<dyn DataStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
            description: OnceCell::new(),
        }
    }

    /// Schema text handed to the statement generator.
    pub async fn describe(&self) -> AppResult<&str> {
        let text = self
            .description
            .get_or_try_init(|| async {
                let columns = self.store.fetch_schema(&self.table).await?;
                if columns.is_empty() {
                    return Err(AppError::Database(format!(
                        "Table '{}' not found",
                        self.table
                    )));
                }

                let listing: Vec<String> = columns
                    .iter()
                    .map(|c| format!("  - {} ({})", c.name, c.data_type))
                    .collect();
                tracing::debug!("Cached schema for {} ({} columns)", self.table, columns.len());

                Ok(format!(
                    "TABLE: {}\n\nCOLUMNS:\n{}\n\nNOTE: Use double quotes for mixed-case columns!",
                    self.table,
                    listing.join("\n")
                ))
            })
            .await?;
        Ok(text.as_str())
    }

    pub fn is_cached(&self) -> bool {
        self.description.initialized()
    }
}
