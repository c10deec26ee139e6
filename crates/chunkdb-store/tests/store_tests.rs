use chunkdb_core::{ChunkPayload, ErrorKind};
use chunkdb_store::{ChunkIndex, DocumentIndex, PersistentIndex};
use tempfile::TempDir;

fn payload(text: &str, parent: &str) -> ChunkPayload {
    ChunkPayload { text: text.to_string(), parent_id: parent.to_string(), parent_text: format!("{text},..."), granularity: 1 }
}

#[test]
fn document_index_put_and_remove_are_idempotent() {
    let index = DocumentIndex::in_memory();
    assert!(index.put("a"));
    assert!(!index.put("a"), "second put is a no-op");
    assert!(index.put("b"));
    assert_eq!(index.size(), 2);

    assert!(index.remove("a"));
    assert!(!index.remove("a"), "removing an absent id is a no-op");
    assert!(!index.remove("never-there"));
    assert_eq!(index.size(), 1);
    assert!(index.contains("b"));
    assert!(!index.contains("a"));
}

#[test]
fn chunk_index_get_missing_is_not_found() {
    let index = ChunkIndex::in_memory();
    assert!(index.put("c1", payload("x no", "p")).is_none());
    assert_eq!(index.get("c1").expect("present").parent_id, "p");

    let err = index.get("c2").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert!(index.remove("c1").is_some());
    assert!(index.remove("c1").is_none());
    assert!(index.is_empty());
}

#[test]
fn chunk_index_put_returns_replaced_payload() {
    let index = ChunkIndex::in_memory();
    index.put("c1", payload("old", "p"));
    let previous = index.put("c1", payload("new", "p")).expect("replaced");
    assert_eq!(previous.text, "old");
    assert_eq!(index.size(), 1);
}

#[test]
fn indexes_reload_with_identical_contents() {
    let tmp = TempDir::new().expect("tmp");
    let doc_path = tmp.path().join("docidx.json");
    let chunk_path = tmp.path().join("chunkidx.json");

    {
        let docs = DocumentIndex::open(&doc_path).expect("open");
        let chunks = ChunkIndex::open(&chunk_path).expect("open");
        assert!(docs.is_empty());
        docs.put("1111111111111111");
        docs.put("2222222222222222");
        chunks.put("c1", payload("a ijk", "1111111111111111"));
        chunks.put("c2", payload("w mno", "2222222222222222"));
        docs.flush().expect("flush");
        chunks.flush().expect("flush");
    }

    let docs = DocumentIndex::open(&doc_path).expect("reopen");
    let chunks = ChunkIndex::open(&chunk_path).expect("reopen");
    assert_eq!(docs.size(), 2);
    assert_eq!(docs.ids(), vec!["1111111111111111".to_string(), "2222222222222222".to_string()]);
    assert_eq!(chunks.size(), 2);
    assert_eq!(chunks.get("c2").expect("c2"), payload("w mno", "2222222222222222"));
}

#[test]
fn flush_creates_file_for_empty_index() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("nested").join("docidx.json");
    let docs = DocumentIndex::open(&path).expect("open");
    docs.flush().expect("flush");
    assert!(path.exists());
    assert_eq!(DocumentIndex::open(&path).expect("reopen").size(), 0);
}

#[test]
fn opening_a_file_of_another_kind_fails() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("docidx.json");
    let docs = DocumentIndex::open(&path).expect("open");
    docs.put("a");
    docs.flush().expect("flush");

    let err = ChunkIndex::open(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageFailure);
}
