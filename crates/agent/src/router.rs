//! Query classification.
//!
//! Vocabulary-based routing: numeric and metric wording goes to the
//! database responder, conceptual and how-to wording to the retrieval
//! responder, both kinds of wording to both. Greetings are answered
//! without dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Responder {
    Database,
    Retrieval,
}

impl Responder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Responder::Database => "database",
            Responder::Retrieval => "retrieval",
        }
    }
}

impl fmt::Display for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which responders to run, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub targets: Vec<Responder>,
    pub reason: String,
}

impl RoutingDecision {
    pub fn includes(&self, responder: Responder) -> bool {
        self.targets.contains(&responder)
    }

    /// "database", "retrieval" or "database+retrieval".
    pub fn label(&self) -> String {
        self.targets
            .iter()
            .map(Responder::as_str)
            .collect::<Vec<_>>()
            .join("+")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Greeting,
    Dispatch(RoutingDecision),
}

/// Routing vocabulary. Entries are lowercase words or phrases matched on
/// word boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRules {
    pub greetings: Vec<String>,
    pub database_keywords: Vec<String>,
    pub retrieval_keywords: Vec<String>,

    /// Weak retrieval cues ("what is"), ignored when database wording is
    /// present so "what is my total profit" stays a data question
    pub question_openers: Vec<String>,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for RoutingRules {
    fn default() -> Self {
        Self {
            greetings: owned(&[
                "hi", "hello", "hey", "good morning", "good afternoon", "good evening",
                "greetings", "thanks", "thank you",
            ]),
            database_keywords: owned(&[
                "profit", "profits", "loss", "losses", "pnl", "trade", "trades", "trading data",
                "calculate", "show", "total", "win rate", "how much", "how many", "average",
                "percentage", "sum", "count", "highest", "lowest", "best", "worst", "top",
                "performance", "daily", "weekly", "monthly", "symbol", "symbols",
            ]),
            retrieval_keywords: owned(&[
                "explain", "definition", "define", "meaning", "procedure", "how to", "how do i",
                "how can i", "what does", "tell me about", "difference between", "why",
                "suggest", "improve", "advice", "is it good", "what affects",
            ]),
            question_openers: owned(&["what is", "what are", "what's"]),
        }
    }
}

impl RoutingRules {
    pub fn classify(&self, query: &str) -> Route {
        let normalized = normalize(query);
        if normalized.is_empty() || self.is_greeting(&normalized) {
            return Route::Greeting;
        }

        let database = matches_any(&normalized, &self.database_keywords);
        let retrieval = matches_any(&normalized, &self.retrieval_keywords);

        let decision = match (database, retrieval) {
            (Some(d), Some(r)) => RoutingDecision {
                targets: vec![Responder::Database, Responder::Retrieval],
                reason: format!("data wording '{}' and conceptual wording '{}'", d, r),
            },
            (Some(d), None) => decision(Responder::Database, format!("data wording '{}'", d)),
            (None, Some(r)) => decision(Responder::Retrieval, format!("conceptual wording '{}'", r)),
            (None, None) => match matches_any(&normalized, &self.question_openers) {
                Some(opener) => decision(Responder::Retrieval, format!("question opener '{}'", opener)),
                None if normalized.chars().any(|c| c.is_ascii_digit())
                    || contains_phrase(&normalized, "my") =>
                {
                    decision(Responder::Database, "personal or numeric question".to_string())
                }
                None => decision(Responder::Retrieval, "no data wording".to_string()),
            },
        };

        tracing::debug!(targets = %decision.label(), reason = %decision.reason, "Routed query");
        Route::Dispatch(decision)
    }

    /// A greeting phrase, optionally followed by at most two more words and
    /// no routing vocabulary.
    fn is_greeting(&self, normalized: &str) -> bool {
        self.greetings.iter().any(|g| {
            if normalized == g {
                return true;
            }
            match normalized.strip_prefix(g.as_str()).and_then(|rest| rest.strip_prefix(' ')) {
                Some(rest) => {
                    rest.split(' ').count() <= 2
                        && matches_any(normalized, &self.database_keywords).is_none()
                        && matches_any(normalized, &self.retrieval_keywords).is_none()
                }
                None => false,
            }
        })
    }
}

fn decision(responder: Responder, reason: String) -> RoutingDecision {
    RoutingDecision {
        targets: vec![responder],
        reason,
    }
}

/// Lowercase words separated by single spaces; apostrophes kept.
fn normalize(query: &str) -> String {
    query
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    format!(" {} ", normalized).contains(&format!(" {} ", phrase))
}

fn matches_any<'a>(normalized: &str, phrases: &'a [String]) -> Option<&'a str> {
    phrases
        .iter()
        .find(|p| contains_phrase(normalized, p))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(query: &str) -> Vec<Responder> {
        match RoutingRules::default().classify(query) {
            Route::Dispatch(decision) => decision.targets,
            Route::Greeting => panic!("{} classified as greeting", query),
        }
    }

    #[test]
    fn test_greetings_short_circuit() {
        let rules = RoutingRules::default();
        for query in ["hi", "Hello!", "hey there", "Good morning, team", "thanks", "  "] {
            assert_eq!(rules.classify(query), Route::Greeting, "{}", query);
        }
    }

    #[test]
    fn test_greeting_with_question_is_dispatched() {
        assert_eq!(targets("hi, what is my total profit?"), vec![Responder::Database]);
        assert_eq!(targets("hello can you explain margin"), vec![Responder::Retrieval]);
    }

    #[test]
    fn test_data_questions_go_to_database() {
        for query in [
            "what is my total profit",
            "Show me trades from last week",
            "Calculate my win rate",
            "How much did I make in March?",
        ] {
            assert_eq!(targets(query), vec![Responder::Database], "{}", query);
        }
    }

    #[test]
    fn test_conceptual_questions_go_to_retrieval() {
        for query in ["what is leverage", "How do I verify my account?", "Explain margin trading"] {
            assert_eq!(targets(query), vec![Responder::Retrieval], "{}", query);
        }
    }

    #[test]
    fn test_mixed_questions_go_to_both() {
        let rules = RoutingRules::default();
        match rules.classify("Show my profit and explain what affects it") {
            Route::Dispatch(decision) => {
                assert_eq!(
                    decision.targets,
                    vec![Responder::Database, Responder::Retrieval]
                );
                assert_eq!(decision.label(), "database+retrieval");
                assert!(decision.reason.contains("profit"));
                assert!(decision.reason.contains("explain"));
            }
            Route::Greeting => panic!("expected dispatch"),
        }
    }

    #[test]
    fn test_fallback_rules() {
        assert_eq!(targets("EURUSD in 2024"), vec![Responder::Database]);
        assert_eq!(targets("my account"), vec![Responder::Database]);
        assert_eq!(targets("swap rates on gold"), vec![Responder::Retrieval]);
    }

    #[test]
    fn test_keywords_match_whole_words() {
        // "shower" must not match "show", "totally" not "total"
        assert_eq!(targets("shower thoughts totally unrelated"), vec![Responder::Retrieval]);
    }
}
