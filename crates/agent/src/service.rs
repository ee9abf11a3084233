//! Per-query coordination: Classify, Dispatch, Synthesize, Done.

use crate::error::{router_failure, ResponderError};
use crate::responders::{DatabaseAnswer, DatabaseResponder, RetrievalResponder};
use crate::router::{Responder, Route, RoutingDecision, RoutingRules};
use crate::synthesis::{format_hits, Synthesizer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;
use tradewise_core::AppResult;
use tradewise_knowledge::RankedHit;
use tradewise_sql::ChartSpec;

const GREETING_REPLY: &str = "Hello! I can answer questions about your trading data \
    (profit, volume, performance) and explain trading concepts from the knowledge base. \
    What would you like to know?";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,

    pub response: String,

    /// "database", "retrieval", "database+retrieval"; none for greetings
    #[serde(rename = "agentUsed")]
    pub agent_used: Option<String>,

    /// Handed to a renderer, not part of the wire format
    #[serde(skip)]
    pub chart: Option<ChartSpec>,
}

impl QueryResponse {
    fn failure(message: impl Into<String>, agent_used: Option<String>) -> Self {
        Self {
            success: false,
            response: message.into(),
            agent_used,
            chart: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub database: bool,

    /// None when the index could not be read
    pub knowledge_pairs: Option<u64>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.database && self.knowledge_pairs.is_some()
    }
}

/// Joined output of the dispatched branches; `None` means not dispatched.
struct Dispatched {
    database: Option<Result<DatabaseAnswer, ResponderError>>,
    retrieval: Option<Result<Vec<RankedHit>, ResponderError>>,
}

enum State {
    Classify,
    Dispatch(RoutingDecision),
    Synthesize(RoutingDecision, Dispatched),
    Done(QueryResponse),
}

pub struct QueryService {
    rules: RoutingRules,
    database: DatabaseResponder,
    retrieval: RetrievalResponder,
    synthesizer: Arc<dyn Synthesizer>,
}

impl QueryService {
    pub fn new(
        rules: RoutingRules,
        database: DatabaseResponder,
        retrieval: RetrievalResponder,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        Self {
            rules,
            database,
            retrieval,
            synthesizer,
        }
    }

    /// Answer one query. Responder failures are folded into the response;
    /// only a synthesis failure is returned as an error.
    pub async fn handle(&self, request: &QueryRequest) -> AppResult<QueryResponse> {
        let query = request.query.trim();
        let span = tracing::info_span!("query", len = query.len());
        self.run(query).instrument(span).await
    }

    /// Like [`handle`](Self::handle), but a router failure also becomes a
    /// `success: false` response.
    pub async fn respond(&self, request: &QueryRequest) -> QueryResponse {
        match self.handle(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Query failed: {}", e);
                QueryResponse::failure(e.to_string(), None)
            }
        }
    }

    pub async fn health(&self) -> HealthReport {
        let database = match self.database.gateway().store().ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Database ping failed: {}", e);
                false
            }
        };

        let knowledge_pairs = match self.retrieval.retriever().pair_count() {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!("Knowledge index unavailable: {}", e);
                None
            }
        };

        HealthReport {
            database,
            knowledge_pairs,
        }
    }

    async fn run(&self, query: &str) -> AppResult<QueryResponse> {
        let mut state = State::Classify;
        loop {
            state = match state {
                State::Classify => match self.rules.classify(query) {
                    Route::Greeting => {
                        tracing::debug!("Greeting, no dispatch");
                        State::Done(QueryResponse {
                            success: true,
                            response: GREETING_REPLY.to_string(),
                            agent_used: None,
                            chart: None,
                        })
                    }
                    Route::Dispatch(decision) => {
                        tracing::info!(route = %decision.label(), "{}", decision.reason);
                        State::Dispatch(decision)
                    }
                },
                State::Dispatch(decision) => {
                    let dispatched = self.dispatch(query, &decision).await;
                    State::Synthesize(decision, dispatched)
                }
                State::Synthesize(decision, dispatched) => {
                    State::Done(self.synthesize(query, &decision, dispatched).await?)
                }
                State::Done(response) => return Ok(response),
            };
        }
    }

    /// Both branches run concurrently; one failing does not cancel the other.
    async fn dispatch(&self, query: &str, decision: &RoutingDecision) -> Dispatched {
        let database = async {
            if decision.includes(Responder::Database) {
                Some(self.database.respond(query).await)
            } else {
                None
            }
        };
        let retrieval = async {
            if decision.includes(Responder::Retrieval) {
                Some(self.retrieval.respond(query).await)
            } else {
                None
            }
        };

        let (database, retrieval) = tokio::join!(database, retrieval);
        if let Some(Err(e)) = &database {
            tracing::warn!("{}", e);
        }
        if let Some(Err(e)) = &retrieval {
            tracing::warn!("{}", e);
        }

        Dispatched {
            database,
            retrieval,
        }
    }

    async fn synthesize(
        &self,
        query: &str,
        decision: &RoutingDecision,
        dispatched: Dispatched,
    ) -> AppResult<QueryResponse> {
        let agent_used = Some(decision.label());

        match (dispatched.database, dispatched.retrieval) {
            (Some(Ok(answer)), None) => Ok(QueryResponse {
                success: true,
                response: answer.text,
                agent_used,
                chart: answer.chart,
            }),
            (None, Some(Ok(hits))) => {
                let text = self
                    .synthesizer
                    .condense(query, &hits)
                    .await
                    .map_err(router_failure)?;
                Ok(QueryResponse {
                    success: true,
                    response: text,
                    agent_used,
                    chart: None,
                })
            }
            (Some(Err(db)), Some(Err(kb))) => Ok(QueryResponse::failure(
                format!("{}\n{}", db, kb),
                agent_used,
            )),
            (Some(database), Some(retrieval)) => {
                let (db_text, chart) = match database {
                    Ok(answer) => (answer.text, answer.chart),
                    Err(e) => (e.to_string(), None),
                };
                let kb_text = match retrieval {
                    Ok(hits) => format_hits(&hits),
                    Err(e) => e.to_string(),
                };

                let text = self
                    .synthesizer
                    .combine(query, &db_text, &kb_text)
                    .await
                    .map_err(router_failure)?;
                Ok(QueryResponse {
                    success: true,
                    response: text,
                    agent_used,
                    chart,
                })
            }
            (Some(Err(e)), None) => Ok(QueryResponse::failure(e.to_string(), agent_used)),
            (None, Some(Err(e))) => Ok(QueryResponse::failure(e.to_string(), agent_used)),
            (None, None) => Err(router_failure("No responder was dispatched")),
        }
    }
}
