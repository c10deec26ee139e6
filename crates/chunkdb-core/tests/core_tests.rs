use chunkdb_core::config::{EmbedderKind, EngineConfig};
use chunkdb_core::types::{BatchReport, Document};
use chunkdb_core::{Error, ErrorKind, Segmenter};

#[test]
fn segmenter_counts_delimited_segments() {
    let segmenter = Segmenter::default();
    let doc = Document::new("0000000000000000", "0,1,2,3,4,5,6,7,8,9");
    assert_eq!(segmenter.segment(&doc).len(), 10);
    let doc = Document::new("2222222222222222", "w mno,x no,y op,z i");
    assert_eq!(segmenter.segment(&doc).len(), 4);
}

#[test]
fn chunk_granularity_follows_parent() {
    let mut doc = Document::new("p", "x;y");
    doc.granularity = 2;
    let mut config = chunkdb_core::config::SegmenterConfig::default();
    config.delimiter = ";".to_string();
    let chunks = Segmenter::new(config).segment(&doc);
    assert!(chunks.iter().all(|c| c.granularity == 3));
}

#[test]
fn figment_layers_toml_and_env() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "chunkdb.toml",
            r#"
            workspace = "/tmp/chunkdb-ws"
            workers = 4

            [segmenter]
            delimiter = "|"

            [embedder]
            dim = 64
            "#,
        )?;
        jail.set_env("CHUNKDB_SEARCH__DEFAULT_K", "3");

        let config = EngineConfig::from_figment(EngineConfig::figment("dev")).expect("config");
        assert_eq!(config.workspace, std::path::PathBuf::from("/tmp/chunkdb-ws"));
        assert_eq!(config.workers, 4);
        assert_eq!(config.segmenter.delimiter, "|");
        assert!(config.segmenter.trim, "unset keys keep their defaults");
        assert_eq!(config.embedder.dim, 64);
        assert_eq!(config.embedder.kind, EmbedderKind::Hashing);
        assert_eq!(config.search.default_k, 3);
        assert_eq!(config.vector_path(), std::path::PathBuf::from("/tmp/chunkdb-ws/vecidx.json"));
        Ok(())
    });
}

#[test]
fn workspace_path_expands_env_vars() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("WS_ROOT_FOR_TEST", "/srv/data");
        jail.set_env("CHUNKDB_WORKSPACE", "${WS_ROOT_FOR_TEST}/ws");
        let config = EngineConfig::from_figment(EngineConfig::figment("dev")).expect("config");
        assert_eq!(config.workspace, std::path::PathBuf::from("/srv/data/ws"));
        Ok(())
    });
    assert_eq!(chunkdb_core::config::expand_path("$NO_SUCH_VAR_FOR_TEST/x"), std::path::PathBuf::from("$NO_SUCH_VAR_FOR_TEST/x"));
}

#[test]
fn validation_rejects_bad_values() {
    let mut config = EngineConfig::default();
    config.segmenter.delimiter.clear();
    assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

    let mut config = EngineConfig::default();
    config.embedder.dim = 7;
    assert!(config.validate().is_err());

    let mut config = EngineConfig::default();
    config.search.default_k = config.search.max_k + 1;
    assert!(config.validate().is_err());

    let mut config = EngineConfig::default();
    config.files.chunk = config.files.vector.clone();
    assert!(config.validate().is_err());

    assert!(EngineConfig::default().validate().is_ok());
}

#[test]
fn batch_report_separates_failures() {
    let mut report: BatchReport<usize> = BatchReport::default();
    report.push("a", Ok(1));
    report.push("b", Err(Error::embedding("b", "unsupported")));
    report.push("c", Ok(3));

    assert_eq!(report.len(), 3);
    assert!(!report.all_succeeded());
    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "b");
    assert_eq!(failed[0].1.kind, ErrorKind::EmbeddingFailure);
    assert_eq!(report.into_values(), vec![1, 3]);
}
