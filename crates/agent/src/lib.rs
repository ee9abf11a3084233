//! Query delegation for Tradewise.
//!
//! [`QueryService`] classifies each question, dispatches it to the database
//! and/or retrieval responder and synthesizes one answer.

pub mod advisor;
pub mod error;
pub mod generator;
pub mod prompting;
pub mod responders;
pub mod router;
pub mod service;
pub mod setup;
pub mod synthesis;

pub use advisor::LlmChartAdvisor;
pub use error::{ErrorKind, ResponderError};
pub use generator::{LlmSqlGenerator, SqlDraft, SqlGenerator};
pub use responders::{DatabaseAnswer, DatabaseResponder, RetrievalResponder};
pub use router::{Responder, Route, RoutingDecision, RoutingRules};
pub use service::{HealthReport, QueryRequest, QueryResponse, QueryService};
pub use synthesis::{LlmSynthesizer, Synthesizer, NO_INFORMATION};
