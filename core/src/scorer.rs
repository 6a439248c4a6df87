//! Cosine-similarity ranking of documents against a free-text query.
//!
//! The query side is weighted by idf only; document weights come precomputed
//! from the index. Scores are `q·d / (||q|| ||d||)`.

use crate::index::{DocCount, DocId, InvertedIndex, Posting, Term};
use crate::tokenizer::normalize;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    pub doc_count: DocCount,
    /// Keep at most this many hits after ranking.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub title: String,
    pub score: f64,
}

/// Term -> idf for one query, in order of first occurrence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryVector {
    weights: IndexMap<Term, f64>,
}

impl QueryVector {
    /// Weight each token by `ln(total_docs / df)`; unindexed tokens get 0.
    /// A repeated token is recomputed and overwrites its earlier value.
    pub fn build<S: AsRef<str>>(tokens: &[S], index: &InvertedIndex, total_docs: usize) -> Self {
        let mut weights = IndexMap::with_capacity(tokens.len());
        for token in tokens {
            let term = token.as_ref();
            let df = index.document_frequency(term);
            let idf = if df > 0 { (total_docs as f64 / df as f64).ln() } else { 0.0 };
            weights.insert(term.to_string(), idf);
        }
        Self { weights }
    }

    pub fn get(&self, term: &str) -> Option<f64> { self.weights.get(term).copied() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(t, w)| (t.as_str(), *w))
    }

    pub fn len(&self) -> usize { self.weights.len() }

    pub fn is_empty(&self) -> bool { self.weights.is_empty() }

    /// Euclidean norm over every entry, zero weights included.
    pub fn magnitude(&self) -> f64 {
        self.weights.values().map(|w| w * w).sum::<f64>().sqrt()
    }
}

#[derive(Debug, Clone)]
struct Candidate<'a> {
    title: &'a str,
    dot: f64,
}

/// Running dot products per document for a single query.
#[derive(Debug, Default)]
pub struct ScoreAccumulator<'a> {
    candidates: IndexMap<DocId, Candidate<'a>>,
}

impl<'a> ScoreAccumulator<'a> {
    pub fn new() -> Self { Self { candidates: IndexMap::new() } }

    /// Add every posting of every indexed query term, weighted by its idf.
    pub fn accumulate(query: &QueryVector, index: &'a InvertedIndex) -> Self {
        let mut acc = Self::new();
        for (term, query_score) in query.iter() {
            if let Some(postings) = index.postings(term) {
                for posting in postings {
                    acc.add(posting, query_score);
                }
            }
        }
        acc
    }

    pub fn add(&mut self, posting: &'a Posting, query_score: f64) {
        let entry = self
            .candidates
            .entry(posting.doc_id)
            .or_insert(Candidate { title: &posting.title, dot: 0.0 });
        entry.dot += query_score * posting.weight;
        entry.title = &posting.title;
    }

    pub fn dot(&self, doc_id: DocId) -> Option<f64> {
        self.candidates.get(&doc_id).map(|c| c.dot)
    }

    pub fn len(&self) -> usize { self.candidates.len() }

    pub fn is_empty(&self) -> bool { self.candidates.is_empty() }

    /// Normalize each dot product into a cosine similarity and rank, best first.
    /// Documents with a zero norm keep their raw dot product.
    pub fn into_ranked(self, query_magnitude: f64, index: &InvertedIndex) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .candidates
            .into_iter()
            .map(|(doc_id, c)| {
                let doc_norm = index.doc_norm(doc_id);
                let divisor = if doc_norm != 0.0 { query_magnitude * doc_norm } else { 1.0 };
                SearchHit { doc_id, title: c.title.to_string(), score: c.dot / divisor }
            })
            .collect();
        // stable: ties keep first-seen order
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits
    }
}

/// Rank documents for `query` with default options.
pub fn search(query: &str, index: &InvertedIndex) -> Vec<SearchHit> {
    search_with(query, index, &SearchOptions::default())
}

pub fn search_with(query: &str, index: &InvertedIndex, options: &SearchOptions) -> Vec<SearchHit> {
    let tokens = normalize(query);
    search_terms(&tokens, index, options)
}

/// Rank documents for already-normalized query terms.
///
/// Returns an empty list when the query vector has zero magnitude, i.e. no
/// token is indexed or every indexed token occurs in all `N` documents.
pub fn search_terms<S: AsRef<str>>(tokens: &[S], index: &InvertedIndex, options: &SearchOptions) -> Vec<SearchHit> {
    let total_docs = index.total_docs(options.doc_count);
    let query = QueryVector::build(tokens, index, total_docs);
    let magnitude = query.magnitude();
    if magnitude == 0.0 {
        tracing::debug!(tokens = tokens.len(), "query vector has zero magnitude");
        return Vec::new();
    }

    let acc = ScoreAccumulator::accumulate(&query, index);
    let candidates = acc.len();
    let mut hits = acc.into_ranked(magnitude, index);
    if let Some(limit) = options.limit {
        hits.truncate(limit);
    }
    tracing::debug!(tokens = tokens.len(), terms = query.len(), candidates, total_docs, "scored query");
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pets() -> InvertedIndex {
        InvertedIndex::from_terms([
            ("dog", vec![Posting::new(1, "A", 0.8), Posting::new(2, "B", 0.2)]),
            ("cat", vec![Posting::new(1, "A", 0.1)]),
        ])
        .unwrap()
    }

    #[test]
    fn query_vector_uses_idf_and_zero_for_unknown() {
        let idx = pets();
        let q = QueryVector::build(&["cat", "zebra", "dog"], &idx, 2);
        assert!((q.get("cat").unwrap() - 2f64.ln()).abs() < 1e-12);
        assert_eq!(q.get("zebra"), Some(0.0));
        assert_eq!(q.get("dog"), Some(0.0));
        let order: Vec<&str> = q.iter().map(|(t, _)| t).collect();
        assert_eq!(order, vec!["cat", "zebra", "dog"]);
    }

    #[test]
    fn repeated_tokens_do_not_add_weight() {
        let idx = pets();
        let once = QueryVector::build(&["cat"], &idx, 2);
        let thrice = QueryVector::build(&["cat", "cat", "cat"], &idx, 2);
        assert_eq!(once, thrice);
        assert_eq!(thrice.len(), 1);
    }

    #[test]
    fn magnitude_counts_zero_entries() {
        let idx = pets();
        let q = QueryVector::build(&["cat", "zebra"], &idx, 2);
        assert!((q.magnitude() - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn accumulator_sums_weighted_postings() {
        let idx = pets();
        let q = QueryVector::build(&["dog", "cat"], &idx, 4);
        let acc = ScoreAccumulator::accumulate(&q, &idx);
        assert_eq!(acc.len(), 2);
        let expected = 2f64.ln() * 0.8 + 4f64.ln() * 0.1;
        assert!((acc.dot(1).unwrap() - expected).abs() < 1e-12);
        assert!((acc.dot(2).unwrap() - 2f64.ln() * 0.2).abs() < 1e-12);
        assert_eq!(acc.dot(3), None);
    }

    #[test]
    fn zero_norm_document_keeps_raw_dot() {
        let idx = InvertedIndex::from_terms([
            ("dog", vec![Posting::new(1, "A", 0.0)]),
            ("cat", vec![Posting::new(2, "B", 1.0)]),
        ])
        .unwrap();
        let hits = search_terms(&["dog"], &idx, &SearchOptions::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 1);
        assert_eq!(hits[0].score, 0.0);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let idx = InvertedIndex::from_terms([
            ("dog", vec![Posting::new(5, "E", 0.5), Posting::new(3, "C", 0.5)]),
            ("cat", vec![Posting::new(9, "I", 1.0)]),
        ])
        .unwrap();
        let hits = search_terms(&["dog"], &idx, &SearchOptions::default());
        let ids: Vec<DocId> = hits.iter().map(|h| h.doc_id).collect();
        assert_eq!(ids, vec![5, 3]);
    }

    #[test]
    fn limit_truncates_after_ranking() {
        let idx = InvertedIndex::from_terms([
            ("dog", vec![Posting::new(1, "A", 0.1), Posting::new(2, "B", 0.9)]),
            ("fish", vec![Posting::new(1, "A", 0.9), Posting::new(3, "C", 0.5)]),
        ])
        .unwrap();
        let options = SearchOptions { limit: Some(1), ..Default::default() };
        let hits = search_terms(&["dog"], &idx, &options);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 2);
    }
}
