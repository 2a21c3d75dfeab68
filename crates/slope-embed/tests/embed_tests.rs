use slope_core::config::Settings;
use slope_core::traits::{Embedder, RelevanceScorer};
use slope_embed::{load_embedder, load_scorer, HashEmbedder, LazyModel, TermOverlapScorer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = Settings { use_fake_models: true, ..Settings::default() };
    let embedder = load_embedder(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_documents(&texts).expect("embed_documents");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), embedder.dim());

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn shared_terms_score_higher() {
    let e = HashEmbedder::new(256);
    let q = e.embed_query("rainfall slope failure").unwrap();
    let docs = e
        .embed_documents(&["rainfall triggers slope failure".to_string(), "retaining wall drainage".to_string()])
        .unwrap();
    assert!(dot(&q, &docs[0]) > dot(&q, &docs[1]));
}

#[test]
fn empty_text_embeds_to_zero_vector() {
    let e = HashEmbedder::new(8);
    let v = e.embed_query("").unwrap();
    assert!(v.iter().all(|x| *x == 0.0));
}

#[test]
fn term_overlap_scores_fraction_of_query_terms() {
    let s = TermOverlapScorer;
    let scores = s
        .score("降雨 slope", &["slope under 降雨".to_string(), "slope only".to_string(), "nothing".to_string()])
        .unwrap();
    assert!((scores[0] - 1.0).abs() < 1e-6);
    assert!(scores[1] > 0.0 && scores[1] < 1.0);
    assert_eq!(scores[2], 0.0);
}

#[test]
fn fake_scorer_selected_by_settings() {
    let settings = Settings { use_fake_models: true, ..Settings::default() };
    let scorer = load_scorer(&settings).unwrap();
    assert_eq!(scorer.score("a", &["a".to_string()]).unwrap(), vec![1.0]);
}

#[test]
fn missing_model_dir_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        embedding_model_id: dir.path().join("absent").to_string_lossy().to_string(),
        reranker_model_id: dir.path().join("absent").to_string_lossy().to_string(),
        ..Settings::default()
    };
    assert!(load_embedder(&settings).is_err());
    assert!(load_scorer(&settings).is_err());
}

#[test]
fn lazy_model_loads_once_across_threads() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let lazy = Arc::new(LazyModel::new("test", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(20));
        Ok(42usize)
    }));
    assert!(!lazy.is_loaded());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let l = lazy.clone();
            std::thread::spawn(move || *l.get().unwrap())
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 42);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(lazy.is_loaded());
}

#[test]
fn lazy_model_retries_after_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let lazy = LazyModel::new("flaky", move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            anyhow::bail!("first load fails")
        }
        Ok("ready")
    });
    assert!(lazy.get().is_err());
    assert_eq!(*lazy.get().unwrap(), "ready");
}
