use crate::error::{Result, SearchError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

pub type Term = String;
pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub title: String,
    pub weight: f64, // precomputed tf-idf weight of the term in this document
}

impl Posting {
    pub fn new(doc_id: DocId, title: impl Into<String>, weight: f64) -> Self {
        Self { doc_id, title: title.into(), weight }
    }
}

/// How `N` in `idf = ln(N / df)` is derived from the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocCount {
    /// Number of distinct document ids across all postings.
    #[default]
    DistinctDocuments,
    /// Number of distinct terms. Matches indexes scored by the legacy tool.
    Terms,
}

impl FromStr for DocCount {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docs" | "documents" => Ok(DocCount::DistinctDocuments),
            "terms" => Ok(DocCount::Terms),
            other => Err(format!("unknown doc count mode '{other}', expected 'docs' or 'terms'")),
        }
    }
}

impl fmt::Display for DocCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocCount::DistinctDocuments => f.write_str("docs"),
            DocCount::Terms => f.write_str("terms"),
        }
    }
}

/// Term -> postings mapping, immutable once built.
///
/// Document magnitudes and titles are derived once at construction so a query
/// never has to rescan the whole index.
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    terms: IndexMap<Term, Vec<Posting>>,
    doc_norms: HashMap<DocId, f64>,
    titles: HashMap<DocId, String>,
    num_postings: usize,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Build an index from `(term, postings)` pairs, keeping their order.
    ///
    /// Fails with [`SearchError::IndexUnavailable`] when a term is listed twice,
    /// a document appears twice in one postings list, or a weight is negative or
    /// not finite.
    pub fn from_terms<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<Posting>)>,
        S: Into<Term>,
    {
        let mut terms: IndexMap<Term, Vec<Posting>> = IndexMap::new();
        for (term, postings) in entries {
            let term = term.into();
            let mut seen: HashSet<DocId> = HashSet::with_capacity(postings.len());
            for p in &postings {
                if !seen.insert(p.doc_id) {
                    return Err(SearchError::unavailable(format_args!(
                        "duplicate posting for doc {} under term '{}'",
                        p.doc_id, term
                    )));
                }
                if !p.weight.is_finite() || p.weight < 0.0 {
                    return Err(SearchError::unavailable(format_args!(
                        "invalid weight {} for doc {} under term '{}'",
                        p.weight, p.doc_id, term
                    )));
                }
            }
            if terms.contains_key(&term) {
                return Err(SearchError::unavailable(format_args!("term '{term}' listed twice")));
            }
            terms.insert(term, postings);
        }

        let mut squares: HashMap<DocId, f64> = HashMap::new();
        let mut titles: HashMap<DocId, String> = HashMap::new();
        let mut num_postings = 0usize;
        for postings in terms.values() {
            num_postings += postings.len();
            for p in postings {
                *squares.entry(p.doc_id).or_insert(0.0) += p.weight * p.weight;
                titles.insert(p.doc_id, p.title.clone());
            }
        }
        let doc_norms = squares.into_iter().map(|(doc_id, sq)| (doc_id, sq.sqrt())).collect();

        tracing::debug!(num_terms = terms.len(), num_docs = titles.len(), num_postings, "built inverted index");
        Ok(Self { terms, doc_norms, titles, num_postings })
    }

    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.terms.get(term).map(Vec::as_slice)
    }

    pub fn contains_term(&self, term: &str) -> bool { self.terms.contains_key(term) }

    /// Number of postings for `term`; 0 when the term is not indexed.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.terms.get(term).map_or(0, Vec::len)
    }

    pub fn num_terms(&self) -> usize { self.terms.len() }

    pub fn num_docs(&self) -> usize { self.titles.len() }

    pub fn num_postings(&self) -> usize { self.num_postings }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    /// The `N` used for idf under the given convention.
    pub fn total_docs(&self, mode: DocCount) -> usize {
        match mode {
            DocCount::DistinctDocuments => self.num_docs(),
            DocCount::Terms => self.num_terms(),
        }
    }

    /// Euclidean norm of the document's weight vector; 0 for unknown documents.
    pub fn doc_norm(&self, doc_id: DocId) -> f64 {
        self.doc_norms.get(&doc_id).copied().unwrap_or(0.0)
    }

    pub fn title(&self, doc_id: DocId) -> Option<&str> {
        self.titles.get(&doc_id).map(String::as_str)
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &[Posting])> {
        self.terms.iter().map(|(t, p)| (t.as_str(), p.as_slice()))
    }

    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.titles.keys().copied()
    }

    pub(crate) fn term_map(&self) -> &IndexMap<Term, Vec<Posting>> { &self.terms }
}
