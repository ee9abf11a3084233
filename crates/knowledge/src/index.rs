//! SQLite-backed QA index with one embedding per channel.

use crate::types::{QaPair, SearchChannel, SimilarityHit};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tradewise_core::{AppError, AppResult};

/// Similarity boundary the retriever depends on.
///
/// Implementations return hits for one channel, ordered by descending
/// similarity.
pub trait SimilarityIndex: Send + Sync {
    /// Insert or replace a pair together with both embeddings.
    fn upsert_pair(
        &self,
        pair: &QaPair,
        question_embedding: &[f32],
        answer_embedding: &[f32],
    ) -> AppResult<()>;

    /// Top-k pairs for one channel.
    fn nearest(
        &self,
        channel: SearchChannel,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<SimilarityHit>>;

    /// Exact, case-insensitive id lookup.
    fn find_by_qa_id(&self, qa_id: &str) -> AppResult<Option<QaPair>>;

    /// Number of stored pairs.
    fn count(&self) -> AppResult<u64>;
}

/// QA index stored in a single SQLite file.
pub struct QaIndex {
    conn: Mutex<Connection>,
}

impl QaIndex {
    /// Open (creating if needed) the index database.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS qa_pairs (
                qa_id TEXT PRIMARY KEY,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                question_embedding BLOB NOT NULL,
                answer_embedding BLOB NOT NULL,
                added_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_qa_pairs_upper_id ON qa_pairs(UPPER(qa_id));
            "#,
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Opened QA index at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Knowledge("QA index lock poisoned".to_string()))
    }
}

impl SimilarityIndex for QaIndex {
    fn upsert_pair(
        &self,
        pair: &QaPair,
        question_embedding: &[f32],
        answer_embedding: &[f32],
    ) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO qa_pairs
                (qa_id, question, answer, source, question_embedding, answer_embedding, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                pair.qa_id,
                pair.question,
                pair.answer,
                pair.source,
                embedding_to_bytes(question_embedding),
                embedding_to_bytes(answer_embedding),
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to insert QA pair: {}", e)))?;

        Ok(())
    }

    fn nearest(
        &self,
        channel: SearchChannel,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<SimilarityHit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let sql = format!(
            "SELECT qa_id, question, answer, source, {} FROM qa_pairs",
            channel.column()
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let pair = QaPair {
                    qa_id: row.get(0)?,
                    question: row.get(1)?,
                    answer: row.get(2)?,
                    source: row.get(3)?,
                };
                let bytes: Vec<u8> = row.get(4)?;
                Ok((pair, bytes))
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to query QA pairs: {}", e)))?;

        let mut hits = Vec::new();
        for row in rows {
            let (pair, bytes) =
                row.map_err(|e| AppError::Knowledge(format!("Failed to read QA pair: {}", e)))?;
            let embedding = bytes_to_embedding(&bytes)?;
            let similarity = cosine_similarity(query_embedding, &embedding).clamp(0.0, 1.0);
            hits.push(SimilarityHit::new(pair, similarity, channel));
        }

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        tracing::debug!(
            "Retrieved {} {:?}-channel hits (requested top-{})",
            hits.len(),
            channel,
            top_k
        );
        Ok(hits)
    }

    fn find_by_qa_id(&self, qa_id: &str) -> AppResult<Option<QaPair>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT qa_id, question, answer, source FROM qa_pairs
             WHERE UPPER(qa_id) = UPPER(?1) LIMIT 1",
            params![qa_id.trim()],
            |row| {
                Ok(QaPair {
                    qa_id: row.get(0)?,
                    question: row.get(1)?,
                    answer: row.get(2)?,
                    source: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(|e| AppError::Knowledge(format!("Failed to look up QA id: {}", e)))
    }

    fn count(&self) -> AppResult<u64> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM qa_pairs", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u64)
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to count QA pairs: {}", e)))
    }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
