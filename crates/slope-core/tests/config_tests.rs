use figment::providers::{Format, Serialized, Toml};
use figment::Figment;

use slope_core::config::{expand_path, Settings};

fn from_toml(toml: &str) -> anyhow::Result<Settings> {
    Settings::extract(Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(toml)))
}

#[test]
fn defaults_match_documented_values() {
    let s = from_toml("").expect("defaults");
    assert_eq!(s.retrieve_k, 50);
    assert_eq!(s.rerank_top_n, 5);
    assert_eq!(s.chunk_size, 512);
    assert_eq!(s.chunk_overlap, 50);
    assert!(s.elasticsearch_url.is_none());
    assert!(s.openai_endpoint().is_none());
}

#[test]
fn toml_overrides_are_applied() {
    let s = from_toml("retrieve_k = 7\nelasticsearch_url = \"http://localhost:9200\"\nopenai_base_url = \"http://x/v1\"\nopenai_api_key = \"k\"")
        .expect("settings");
    assert_eq!(s.retrieve_k, 7);
    assert_eq!(s.elasticsearch_url.as_deref(), Some("http://localhost:9200"));
    assert_eq!(s.openai_endpoint(), Some(("http://x/v1", "k")));
}

#[test]
fn invalid_chunk_overlap_is_fatal() {
    let err = from_toml("chunk_size = 100\nchunk_overlap = 100").unwrap_err();
    assert!(err.to_string().contains("chunk_overlap"));
}

#[test]
fn path_helpers_expand_variables() {
    std::env::set_var("SLOPE_TEST_ROOT", "/srv/slope");
    assert_eq!(expand_path("${SLOPE_TEST_ROOT}/index"), std::path::PathBuf::from("/srv/slope/index"));
    assert_eq!(expand_path("plain/rel"), std::path::PathBuf::from("plain/rel"));
    let s = Settings { index_dir: "$SLOPE_TEST_ROOT/idx".to_string(), ..Settings::default() };
    assert_eq!(s.index_dir(), std::path::PathBuf::from("/srv/slope/idx"));
}
