use pdfqa_core::Chunk;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Something that carries an embedding and can hold a similarity score.
pub trait Rankable {
    fn embedding(&self) -> Option<&[f32]>;
    fn score(&self) -> Option<f32>;
    fn set_score(&mut self, score: f32);
}

impl Rankable for Chunk {
    fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }

    fn score(&self) -> Option<f32> {
        self.score
    }

    fn set_score(&mut self, score: f32) {
        self.score = Some(score);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingSummary {
    pub candidates: usize,
    pub selected: usize,
    /// Mean score of the selected items, 0.0 when nothing was selected
    pub average_score: f32,
}

/// Cosine similarity. Zero when either vector has zero norm or the
/// lengths differ, so a failed (zero) embedding never ranks above a real one.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// Scores every item against `query`, then keeps the `k` best. The sort is
/// stable: equal scores keep their input order.
pub fn rank<T: Rankable>(items: Vec<T>, query: &[f32], k: usize) -> Vec<T> {
    rank_with_summary(items, query, k, None).0
}

/// [`rank`] plus an optional score floor applied after truncation.
pub fn rank_with_summary<T: Rankable>(
    mut items: Vec<T>,
    query: &[f32],
    k: usize,
    min_score: Option<f32>,
) -> (Vec<T>, RankingSummary) {
    let candidates = items.len();

    for item in items.iter_mut() {
        let score = item
            .embedding()
            .map(|e| cosine_similarity(e, query))
            .unwrap_or(0.0);
        item.set_score(score);
    }

    items.sort_by(|a, b| {
        let sa = a.score().unwrap_or(0.0);
        let sb = b.score().unwrap_or(0.0);
        sb.partial_cmp(&sa).unwrap_or(Ordering::Equal)
    });
    items.truncate(k);

    if let Some(floor) = min_score {
        items.retain(|item| item.score().unwrap_or(0.0) >= floor);
    }

    let average_score = if items.is_empty() {
        0.0
    } else {
        items.iter().map(|i| i.score().unwrap_or(0.0)).sum::<f32>() / items.len() as f32
    };

    let summary = RankingSummary {
        candidates,
        selected: items.len(),
        average_score,
    };
    debug!(
        "Ranked {} candidates, kept {} (avg score {:.3})",
        summary.candidates, summary.selected, summary.average_score
    );

    (items, summary)
}
