//! Knowledge base types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored question/answer pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaPair {
    /// Stable identifier (e.g., "QA_001")
    pub qa_id: String,

    pub question: String,

    pub answer: String,

    /// Where the pair came from (file name, URL, "manual")
    #[serde(default)]
    pub source: String,
}

/// One of the two independent similarity searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchChannel {
    Question,
    Answer,
}

impl SearchChannel {
    /// Embedding column backing this channel.
    pub(crate) fn column(self) -> &'static str {
        match self {
            SearchChannel::Question => "question_embedding",
            SearchChannel::Answer => "answer_embedding",
        }
    }
}

/// Which channel(s) contributed to a ranked hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchChannel {
    Question,
    Answer,
    Both,
}

impl From<SearchChannel> for MatchChannel {
    fn from(channel: SearchChannel) -> Self {
        match channel {
            SearchChannel::Question => MatchChannel::Question,
            SearchChannel::Answer => MatchChannel::Answer,
        }
    }
}

impl fmt::Display for MatchChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchChannel::Question => "question",
            MatchChannel::Answer => "answer",
            MatchChannel::Both => "both",
        };
        f.write_str(name)
    }
}

/// A single-channel search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityHit {
    pub item_id: String,
    pub question: String,
    pub answer: String,
    pub source: String,

    /// Cosine similarity clamped to [0, 1]
    pub similarity: f32,

    #[serde(rename = "matchChannel")]
    pub channel: SearchChannel,
}

impl SimilarityHit {
    pub fn new(pair: QaPair, similarity: f32, channel: SearchChannel) -> Self {
        Self {
            item_id: pair.qa_id,
            question: pair.question,
            answer: pair.answer,
            source: pair.source,
            similarity,
            channel,
        }
    }
}

/// A fused result across both channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedHit {
    pub item_id: String,
    pub question: String,
    pub answer: String,
    pub source: String,

    pub final_score: f32,

    #[serde(rename = "matchChannel")]
    pub channel: MatchChannel,
}

impl RankedHit {
    /// An exact id match, ranked above any similarity result.
    pub fn exact(pair: QaPair) -> Self {
        Self {
            item_id: pair.qa_id,
            question: pair.question,
            answer: pair.answer,
            source: pair.source,
            final_score: 1.0,
            channel: MatchChannel::Both,
        }
    }
}
