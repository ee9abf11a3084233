//! Dual-channel rank fusion.
//!
//! Question-side similarity is weighted above answer-side similarity. An
//! item found by both channels accumulates both contributions, so pairs
//! confirmed twice outrank pairs matched once at similar strength. This is
//! a fusion, not an intersection: an item only needs to appear in one list.

use crate::types::{MatchChannel, RankedHit, SearchChannel, SimilarityHit};

pub const QUESTION_WEIGHT: f32 = 0.7;
pub const ANSWER_WEIGHT: f32 = 0.3;

/// Merge both channels into one ranking, highest `final_score` first.
///
/// Equal scores keep first-seen order (question channel first). Within one
/// channel a repeated item counts once, at its best similarity. `k == 0` or
/// two empty inputs yield an empty ranking.
pub fn rank(
    question_hits: &[SimilarityHit],
    answer_hits: &[SimilarityHit],
    k: usize,
) -> Vec<RankedHit> {
    if k == 0 {
        return Vec::new();
    }

    let mut merged: Vec<RankedHit> = Vec::new();

    for hit in best_per_item(question_hits) {
        merged.push(ranked(hit, hit.similarity * QUESTION_WEIGHT, SearchChannel::Question));
    }

    for hit in best_per_item(answer_hits) {
        let weighted = hit.similarity * ANSWER_WEIGHT;
        match merged.iter_mut().find(|m| m.item_id == hit.item_id) {
            Some(existing) => {
                existing.final_score += weighted;
                existing.channel = MatchChannel::Both;
            }
            None => merged.push(ranked(hit, weighted, SearchChannel::Answer)),
        }
    }

    // sort_by is stable
    merged.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    merged.truncate(k);
    merged
}

fn ranked(hit: &SimilarityHit, score: f32, channel: SearchChannel) -> RankedHit {
    RankedHit {
        item_id: hit.item_id.clone(),
        question: hit.question.clone(),
        answer: hit.answer.clone(),
        source: hit.source.clone(),
        final_score: score,
        channel: channel.into(),
    }
}

/// First-seen order, best similarity per item.
fn best_per_item(hits: &[SimilarityHit]) -> Vec<&SimilarityHit> {
    let mut best: Vec<&SimilarityHit> = Vec::with_capacity(hits.len());
    for hit in hits {
        match best.iter_mut().find(|b| b.item_id == hit.item_id) {
            Some(slot) if hit.similarity > slot.similarity => *slot = hit,
            Some(_) => {}
            None => best.push(hit),
        }
    }
    best
}
