use figment::providers::{Format, Toml};
use figment::Figment;

use docrag_core::config::{expand_path, Config, Settings};
use docrag_core::preprocess::TableMode;
use docrag_core::Error;

fn config(toml: &str) -> Config {
    Config::from_figment(Figment::new().merge(Toml::string(toml)))
}

#[test]
fn empty_config_yields_defaults() {
    let s = config("").settings().expect("settings");
    assert_eq!(s.chunking.target_chars, 1800);
    assert_eq!(s.chunking.min_chars, 300);
    assert_eq!(s.chunking.overlap_chars, 200);
    assert_eq!(s.search.rrf_k, 60);
    assert_eq!((s.search.prefetch_dense, s.search.prefetch_bm25), (30, 30));
    assert_eq!(s.vector.collection, "my_documents");
    assert_eq!(s.ingest.upsert_batch_size, 128);
    assert_eq!(s.retry.retry_count, 15);
    assert!(s.search.score_threshold.is_none());
    assert!(s.paths.export_path().ends_with("exports/chunks.jsonl"));
}

#[test]
fn nested_sections_override_defaults() {
    let s = config(
        r#"
        [chunking]
        target_chars = 500
        [search]
        score_threshold = 0.35
        [ingest]
        table_mode = "drop"
        "#,
    )
    .settings()
    .expect("settings");
    assert_eq!(s.chunking.target_chars, 500);
    assert_eq!(s.chunking.overlap_chars, 200, "unset keys keep defaults");
    assert_eq!(s.search.score_threshold, Some(0.35));
    assert_eq!(s.ingest.table_mode, TableMode::Drop);
}

#[test]
fn invalid_chunking_is_rejected() {
    let err = config("[chunking]\ntarget_chars = 100\noverlap_chars = 100").settings().unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn settings_default_validates() {
    Settings::default().validate().expect("defaults are valid");
}

#[test]
fn path_settings_expand_environment_variables() {
    std::env::set_var("DOCRAG_TEST_ROOT", "/srv/docrag");
    let s = config("[paths]\nexports_dir = \"${DOCRAG_TEST_ROOT}/exports\"").settings().expect("settings");
    assert_eq!(s.paths.export_path(), std::path::PathBuf::from("/srv/docrag/exports/chunks.jsonl"));
    assert_eq!(expand_path("/abs/db"), std::path::PathBuf::from("/abs/db"));
}
