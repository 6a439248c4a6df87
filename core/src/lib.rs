pub mod error;
pub mod index;
pub mod persist;
pub mod scorer;
pub mod tokenizer;

pub use error::{Result, SearchError};
pub use index::{DocCount, DocId, InvertedIndex, Posting, Term};
pub use scorer::{search, search_terms, search_with, QueryVector, ScoreAccumulator, SearchHit, SearchOptions};
