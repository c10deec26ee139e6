use chunkdb_core::{ErrorKind, IndexKind};
use chunkdb_store::PersistentIndex;
use chunkdb_vector::VectorIndex;
use tempfile::TempDir;

#[test]
fn search_is_best_first_and_bounded_by_k() {
    let index = VectorIndex::in_memory(3);
    index.put("x", vec![1.0, 0.0, 0.0]).expect("put");
    index.put("xy", vec![1.0, 1.0, 0.0]).expect("put");
    index.put("z", vec![0.0, 0.0, 1.0]).expect("put");

    let hits = index.search(&[1.0, 0.1, 0.0], 2).expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "x");
    assert_eq!(hits[1].id, "xy");
    assert!(hits[0].score >= hits[1].score);

    assert_eq!(index.search(&[1.0, 0.0, 0.0], 10).expect("search").len(), 3);
    assert!(index.search(&[1.0, 0.0, 0.0], 0).expect("search").is_empty());
}

#[test]
fn zero_vectors_score_zero() {
    let index = VectorIndex::in_memory(2);
    index.put("zero", vec![0.0, 0.0]).expect("put");
    let hits = index.search(&[1.0, 0.0], 1).expect("search");
    assert_eq!(hits[0].score, 0.0);
    assert_eq!(index.search(&[0.0, 0.0], 1).expect("search")[0].score, 0.0);
}

#[test]
fn wrong_dimension_is_a_storage_failure() {
    let index = VectorIndex::in_memory(4);
    let err = index.put("a", vec![1.0; 3]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageFailure);
    let err = index.put("a", vec![f32::NAN, 0.0, 0.0, 0.0]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageFailure);
    assert!(index.search(&[1.0], 1).is_err());
    assert_eq!(index.size(), 0);
}

#[test]
fn remove_is_idempotent() {
    let index = VectorIndex::in_memory(2);
    index.put("a", vec![1.0, 0.0]).expect("put");
    assert!(index.remove("a").is_some());
    assert!(index.remove("a").is_none());
    assert!(index.is_empty());
}

#[test]
fn reload_reproduces_size_contents_and_order() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("vecidx.json");
    {
        let index = VectorIndex::open(&path, 2).expect("open");
        index.put("first", vec![0.5, 0.5]).expect("put");
        index.put("second", vec![0.5, 0.5]).expect("put");
        index.put("third", vec![0.25, -0.75]).expect("put");
        index.remove("third");
        index.flush().expect("flush");
    }

    let index = VectorIndex::load(&path).expect("load");
    assert_eq!(index.kind(), IndexKind::Vector);
    assert_eq!(index.dim(), 2);
    assert_eq!(index.size(), 2);
    assert_eq!(index.get("second"), Some(vec![0.5, 0.5]));
    let hits = index.search(&[1.0, 1.0], 2).expect("search");
    assert_eq!(hits[0].id, "first", "insertion order survives a reload");

    // a new key after reload lands behind the old ones
    index.put("fourth", vec![0.5, 0.5]).expect("put");
    let hits = index.search(&[1.0, 1.0], 3).expect("search");
    assert_eq!(hits[2].id, "fourth");

    assert!(VectorIndex::open(&path, 3).is_err(), "dimension is fixed per file");
}
