use crate::error::{Result, SearchError};
use crate::index::{InvertedIndex, Posting, Term};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

pub const INDEX_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub num_terms: usize,
    pub num_docs: usize,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn postings(&self) -> PathBuf { self.root.join("postings.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut f = File::open(path).map_err(|e| SearchError::unavailable(format_args!("{}: {e}", path.display())))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).map_err(|e| SearchError::unavailable(format_args!("{}: {e}", path.display())))?;
    Ok(buf)
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut f = File::create(path).map_err(|e| SearchError::write_failed(format_args!("{}: {e}", path.display())))?;
    f.write_all(bytes).map_err(|e| SearchError::write_failed(format_args!("{}: {e}", path.display())))?;
    Ok(())
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root).map_err(|e| SearchError::write_failed(format_args!("{}: {e}", paths.root.display())))?;
    let json = serde_json::to_string_pretty(meta).map_err(SearchError::write_failed)?;
    write_bytes(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let path = paths.meta();
    let bytes = read_bytes(&path)?;
    serde_json::from_slice(&bytes).map_err(|e| SearchError::unavailable(format_args!("{}: {e}", path.display())))
}

/// Persist the postings and a meta header describing them.
pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    create_dir_all(&paths.root).map_err(|e| SearchError::write_failed(format_args!("{}: {e}", paths.root.display())))?;
    let bytes = bincode::serialize(index.term_map()).map_err(SearchError::write_failed)?;
    write_bytes(&paths.postings(), &bytes)?;

    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    let meta = MetaFile { version: INDEX_VERSION, num_terms: index.num_terms(), num_docs: index.num_docs(), created_at };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), num_terms = meta.num_terms, num_docs = meta.num_docs, "saved index");
    Ok(())
}

/// Load an index directory written by [`save_index`].
///
/// Every failure (missing files, undecodable data, a header that does not
/// describe the postings) is reported as [`SearchError::IndexUnavailable`].
pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex> {
    let meta = load_meta(paths)?;
    if meta.version != INDEX_VERSION {
        return Err(SearchError::unavailable(format_args!(
            "unsupported index version {} (expected {INDEX_VERSION})",
            meta.version
        )));
    }

    let path = paths.postings();
    let bytes = read_bytes(&path)?;
    let terms: IndexMap<Term, Vec<Posting>> =
        bincode::deserialize(&bytes).map_err(|e| SearchError::unavailable(format_args!("{}: {e}", path.display())))?;
    if terms.len() != meta.num_terms {
        return Err(SearchError::unavailable(format_args!(
            "meta.json lists {} terms but postings hold {}",
            meta.num_terms,
            terms.len()
        )));
    }

    let index = InvertedIndex::from_terms(terms)?;
    if index.num_docs() != meta.num_docs {
        return Err(SearchError::unavailable(format_args!(
            "meta.json lists {} documents but postings hold {}",
            meta.num_docs,
            index.num_docs()
        )));
    }
    tracing::info!(root = %paths.root.display(), num_terms = index.num_terms(), num_docs = index.num_docs(), "loaded index");
    Ok(index)
}

/// Read a JSON object mapping each term to its postings. A posting is either
/// `{"doc_id": .., "title": .., "weight": ..}` or a `[doc_id, title, weight]` triple.
pub fn load_json_index(path: &Path) -> Result<InvertedIndex> {
    let f = File::open(path).map_err(|e| SearchError::unavailable(format_args!("{}: {e}", path.display())))?;
    // serde accepts a struct as either a map or a sequence, which covers both posting shapes
    let terms: IndexMap<Term, Vec<Posting>> = serde_json::from_reader(BufReader::new(f))
        .map_err(|e| SearchError::unavailable(format_args!("{}: {e}", path.display())))?;
    InvertedIndex::from_terms(terms)
}
