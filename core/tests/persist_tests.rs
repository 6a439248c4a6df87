use search_core::persist::{load_index, load_json_index, load_meta, save_index, save_meta, IndexPaths, INDEX_VERSION};
use search_core::{search, InvertedIndex, Posting, SearchError};
use std::fs;
use tempfile::tempdir;

fn pets() -> InvertedIndex {
    InvertedIndex::from_terms([
        ("dog", vec![Posting::new(1, "A", 0.8), Posting::new(2, "B", 0.2)]),
        ("cat", vec![Posting::new(1, "A", 0.1)]),
    ])
    .unwrap()
}

#[test]
fn saved_index_loads_back_with_same_results() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path().join("idx"));
    let idx = pets();
    save_index(&paths, &idx).unwrap();

    let meta = load_meta(&paths).unwrap();
    assert_eq!(meta.version, INDEX_VERSION);
    assert_eq!(meta.num_terms, 2);
    assert_eq!(meta.num_docs, 2);
    assert!(!meta.created_at.is_empty());

    let loaded = load_index(&paths).unwrap();
    let order: Vec<&str> = loaded.terms().map(|(t, _)| t).collect();
    assert_eq!(order, vec!["dog", "cat"]);
    assert_eq!(search("dog cat", &loaded), search("dog cat", &idx));
}

#[test]
fn missing_directory_is_unavailable() {
    let dir = tempdir().unwrap();
    let err = load_index(&IndexPaths::new(dir.path().join("nope"))).unwrap_err();
    assert!(matches!(err, SearchError::IndexUnavailable(_)));
}

#[test]
fn corrupt_postings_are_unavailable() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    save_index(&paths, &pets()).unwrap();
    fs::write(paths.postings(), b"\x01\x02").unwrap();
    let err = load_index(&paths).unwrap_err();
    assert!(matches!(err, SearchError::IndexUnavailable(_)));
}

#[test]
fn mismatched_meta_is_unavailable() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    save_index(&paths, &pets()).unwrap();

    let mut meta = load_meta(&paths).unwrap();
    meta.num_terms = 5;
    save_meta(&paths, &meta).unwrap();
    let err = load_index(&paths).unwrap_err();
    assert!(err.to_string().contains("terms"));

    meta.num_terms = 2;
    meta.version = INDEX_VERSION + 1;
    save_meta(&paths, &meta).unwrap();
    let err = load_index(&paths).unwrap_err();
    assert!(err.to_string().contains("unsupported index version"));
}

#[test]
fn json_mapping_accepts_records_and_triples() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("index.json");
    fs::write(
        &file,
        r#"{
            "dog": [{"doc_id": 1, "title": "A", "weight": 0.8}, [2, "B", 0.2]],
            "cat": [[1, "A", 0.1]]
        }"#,
    )
    .unwrap();
    let idx = load_json_index(&file).unwrap();
    assert_eq!(idx.num_terms(), 2);
    assert_eq!(idx.num_docs(), 2);
    assert_eq!(idx.postings("dog").unwrap()[1], Posting::new(2, "B", 0.2));
    assert_eq!(search("dog cat", &idx), search("dog cat", &pets()));
}

#[test]
fn json_mapping_with_duplicate_doc_is_unavailable() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("index.json");
    fs::write(&file, r#"{"dog": [[1, "A", 0.8], [1, "A", 0.3]]}"#).unwrap();
    assert!(matches!(load_json_index(&file), Err(SearchError::IndexUnavailable(_))));
}
