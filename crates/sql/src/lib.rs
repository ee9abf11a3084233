//! Guarded SQL execution for Tradewise.
//!
//! Every generated statement passes the [`QueryValidator`] before the
//! [`ExecutionGateway`] runs it against a read-only store. Results are
//! bounded for display and checked against the visualization policy.

pub mod error;
pub mod gateway;
pub mod policy;
pub mod pool;
pub mod result;
pub mod schema;
pub mod store;
pub mod validator;
pub mod visualization;

pub use error::{ErrorKind, StoreError};
pub use gateway::{ExecutionGateway, ExecutionResult, ExecutionStatus, MAX_ATTEMPTS, PREVIEW_ROWS};
pub use policy::{IntentPolicy, IntentRule, KeywordIntentPolicy};
pub use pool::{ConnectionPool, PoolOptions, PooledConnection};
pub use result::ResultSet;
pub use schema::SchemaCache;
pub use store::{ColumnInfo, DataStore, SqliteStore};
pub use validator::{QueryValidator, ValidationVerdict};
pub use visualization::{
    build_chart_spec, detect_chart_type, ChartAdvisor, ChartSeries, ChartSpec, ChartType,
    VisualizationPolicy,
};
