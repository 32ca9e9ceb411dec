use voucher_batch::{
    aggregate::ResultAggregator,
    error::BatchError,
    model::{Batch, BatchOutcome, ItemResult, Settlement, SourceItem},
};

fn batch(index: usize, names: &[&str]) -> Batch {
    Batch {
        index,
        items: names.iter().map(|n| SourceItem::new(*n, vec![0u8; 4])).collect(),
    }
}

#[test]
fn concatenates_in_dispatch_order() {
    let mut agg = ResultAggregator::new();
    agg.push(
        0,
        BatchOutcome::from_results(vec![
            ItemResult::ok("a", serde_json::json!({})),
            ItemResult::failed("b", "blurry"),
        ]),
        None,
    );
    agg.push(1, BatchOutcome::from_results(vec![ItemResult::ok("c", serde_json::json!({}))]), None);

    let names: Vec<&str> = agg.results().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(agg.success_count(), 2);
    assert_eq!(agg.failed_count(), 1);
    assert_eq!(agg.batch_reports().len(), 2);
}

#[test]
fn failed_batch_becomes_per_item_failures() {
    let b = batch(3, &["x.jpg", "y.jpg", "z.jpg"]);
    let (outcome, error) = Settlement::Failed(BatchError::Transport("timeout".into())).into_outcome(&b);
    assert_eq!(error.as_deref(), Some("timeout"));
    assert_eq!(outcome.success_count, 0);
    assert_eq!(outcome.failed_count, 3);
    let names: Vec<&str> = outcome.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["x.jpg", "y.jpg", "z.jpg"]);
    let all_timed_out = outcome
        .results
        .iter()
        .all(|r| !r.success && r.error.as_deref() == Some("timeout"));
    assert!(all_timed_out);
}

#[test]
fn mismatched_result_count_is_rejected() {
    let b = batch(0, &["x.jpg", "y.jpg"]);
    let short = BatchOutcome::from_results(vec![ItemResult::ok("x.jpg", serde_json::json!({}))]);
    let (outcome, error) = Settlement::Recognized(short).into_outcome(&b);
    assert_eq!(
        error.as_deref(),
        Some("recognizer returned 1 results for 2 items")
    );
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.failed_count, 2);
}

#[test]
fn counts_are_recomputed_from_results() {
    let b = batch(0, &["x.jpg", "y.jpg"]);
    let lying = BatchOutcome {
        success_count: 2,
        failed_count: 0,
        results: vec![
            ItemResult::ok("x.jpg", serde_json::json!({})),
            ItemResult::failed("y.jpg", "no text"),
        ],
    };
    let (outcome, error) = Settlement::Recognized(lying).into_outcome(&b);
    assert!(error.is_none());
    assert_eq!((outcome.success_count, outcome.failed_count), (1, 1));
}
