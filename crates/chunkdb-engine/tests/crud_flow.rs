//! Index three documents, replace one of them (delete + index) and query the
//! resulting corpus at chunk granularity.

use chunkdb_core::{Document, EngineConfig, IndexKind};
use chunkdb_engine::{load_index, IndexResponse, SearchOptions, Workspace};
use tempfile::TempDir;

fn docs_to_index(contents: &[&str]) -> Vec<Document> {
    contents.iter().enumerate().map(|(i, text)| Document::new(i.to_string().repeat(16), *text)).collect()
}

fn docs_to_delete(responses: &[&IndexResponse]) -> Vec<Document> {
    responses
        .iter()
        .enumerate()
        .map(|(i, r)| Document::with_chunks(i.to_string().repeat(16), r.document.chunks.clone()))
        .collect()
}

fn validate_index(config: &EngineConfig, expected: [(IndexKind, usize); 3]) {
    let paths = [config.document_path(), config.chunk_path(), config.vector_path()];
    for (path, (kind, size)) in paths.iter().zip(expected) {
        let index = load_index(path).expect("load index");
        assert_eq!(index.kind(), kind);
        assert_eq!(index.size(), size, "size of {}", path.display());
    }
}

#[test]
fn crud_advanced_example() {
    let tmp = TempDir::new().expect("tmp");
    let config = EngineConfig::with_workspace(tmp.path());

    let responses = {
        let workspace = Workspace::open(config.clone()).expect("workspace");
        let report = workspace
            .index(&docs_to_index(&["0,1,2,3,4,5,6,7,8,9", "a ijk,b ijk,c jk", "w mno,x no,y op,z i"]))
            .expect("index");
        assert!(report.all_succeeded());
        report.into_values()
    };
    validate_index(&config, [(IndexKind::Document, 3), (IndexKind::Chunk, 17), (IndexKind::Vector, 17)]);
    assert_eq!(responses[0].document.chunks.len(), 10);

    {
        let workspace = Workspace::open(config.clone()).expect("workspace");
        let report = workspace.delete(&docs_to_delete(&[&responses[0]])).expect("delete");
        let (_, deleted) = report.succeeded().next().expect("one delete");
        assert!(deleted.document_removed);
        assert_eq!(deleted.chunks_removed, 10);
    }
    validate_index(&config, [(IndexKind::Document, 2), (IndexKind::Chunk, 7), (IndexKind::Vector, 7)]);

    {
        let workspace = Workspace::open(config.clone()).expect("workspace");
        workspace.index(&docs_to_index(&["1 ijk,2 jk,3 k"])).expect("index");
    }
    validate_index(&config, [(IndexKind::Document, 3), (IndexKind::Chunk, 10), (IndexKind::Vector, 10)]);

    let workspace = Workspace::open(config).expect("workspace");
    let queries: Vec<Document> =
        ["2 jk", "i", "m"].iter().enumerate().map(|(i, text)| Document::new(format!("q{i}"), *text)).collect();
    let report = workspace.search(&queries, &SearchOptions::top_k(3));
    assert!(report.all_succeeded());
    let docs = report.into_values();

    assert_eq!(docs.len(), 3);
    for doc in &docs {
        assert_eq!(doc.granularity, 0);
        assert_eq!(doc.matches.len(), 3);
        assert_eq!(doc.matches[0].granularity, 0);
        let scores: Vec<f32> = doc.matches.iter().filter_map(|m| m.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]), "best first: {scores:?}");
    }

    assert_eq!(docs[0].text, "2 jk");
    assert_eq!(docs[0].matches[0].text, "1 ijk,2 jk,3 k");
    assert_eq!(docs[0].matches[0].chunks[0].text, "2 jk", "the matched chunk travels with the parent");

    assert_eq!(docs[1].text, "i");
    assert_eq!(docs[1].matches[0].text, "w mno,x no,y op,z i");

    assert_eq!(docs[2].text, "m");
    assert_eq!(docs[2].matches[0].text, "w mno,x no,y op,z i");
}
