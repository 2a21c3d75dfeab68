mod common;

use std::collections::HashSet;
use std::sync::Arc;

use slope_rag::eval::{load_questions, mrr, ndcg_at_k, recall_at_k, run_eval, write_report, RESULTS_FILE};
use slope_rag::ScriptedGenerator;

fn ids(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn gold(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn recall_counts_distinct_gold_hits() {
    let retrieved = ids(&["a:1", "b:2", "c:3"]);
    assert_eq!(recall_at_k(&retrieved, &gold(&["b:2", "z:9"]), 1), 0.0);
    assert_eq!(recall_at_k(&retrieved, &gold(&["b:2", "z:9"]), 3), 0.5);
    assert_eq!(recall_at_k(&retrieved, &gold(&[]), 3), 0.0);
}

#[test]
fn mrr_uses_first_relevant_rank() {
    assert_eq!(mrr(&ids(&["a:1", "b:2", "c:3"]), &gold(&["c:3", "b:2"])), 0.5);
    assert_eq!(mrr(&ids(&["a:1"]), &gold(&["c:3"])), 0.0);
}

#[test]
fn ndcg_is_one_for_ideal_ranking() {
    let g = gold(&["a:1", "b:2"]);
    assert!((ndcg_at_k(&ids(&["a:1", "b:2", "c:3"]), &g, 5) - 1.0).abs() < 1e-12);
    let swapped = ndcg_at_k(&ids(&["c:3", "a:1", "b:2"]), &g, 5);
    assert!(swapped > 0.0 && swapped < 1.0);
    assert_eq!(ndcg_at_k(&ids(&["c:3"]), &g, 5), 0.0);
}

#[tokio::test]
async fn eval_writes_summary_and_details() {
    let dir = tempfile::tempdir().unwrap();
    let questions_path = dir.path().join("questions.jsonl");
    std::fs::write(
        &questions_path,
        concat!(
            r#"{"question": "rainfall pore water pressure", "answers": [{"doc_id": "sample.pdf", "page": 1}]}"#,
            "\n\n",
            r#"{"question": "shear strength of soil", "answers": [{"doc_id": "soil.pdf", "page": 5}]}"#,
            "\n"
        ),
    )
    .unwrap();
    let questions = load_questions(&questions_path).unwrap();
    assert_eq!(questions.len(), 2);

    let p = common::pipeline(Arc::new(ScriptedGenerator::new("not json")), common::config()).await;
    let report = run_eval(&p, &questions).await.unwrap();
    assert_eq!(report.details.len(), 2);
    assert_eq!(report.summary.recall_at_5, 1.0);
    assert_eq!(report.summary.recall_at_1, 1.0);
    assert_eq!(report.details[0].gold_citations, vec!["sample.pdf:1".to_string()]);

    let path = write_report(&report, dir.path()).unwrap();
    assert_eq!(path.file_name().unwrap(), RESULTS_FILE);
    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(saved["summary"]["recall@5"], 1.0);
    assert!(saved["summary"].get("ndcg@5").is_some());
    assert_eq!(saved["details"][1]["metrics"]["r@5"], 1.0);
}
