#![forbid(unsafe_code)]

use rp_core::{Key, Node};
use rp_reporting::{
    ANALYSIS, CALLS, ReportError, ReportingOptions, Rejection, SCHEMA, SaveOutcome, save,
    save_to_store,
};
use rp_storage::{DocumentStore, SqliteStore};
use serde_json::{Value, json};
use std::path::Path;
use tempfile::TempDir;

fn options(dir: &Path) -> ReportingOptions {
    ReportingOptions {
        storage_dir: dir.to_path_buf(),
        ..ReportingOptions::default()
    }
}

fn reopen(dir: &Path) -> SqliteStore {
    SqliteStore::open(dir, "reports").expect("reopen store")
}

fn report(task_id: i64, calls: usize) -> Node {
    let calls: Vec<Value> = (0..calls)
        .map(|n| json!({"api": "NtCreateFile", "index": n}))
        .collect();
    Node::from(json!({
        "info": {"id": task_id},
        "target": {"file": {"name": "sample.exe", "sha256": "ab".repeat(32)}},
        "behavior": {
            "processes": [{"process_id": 1234, "process_name": "sample.exe", "calls": calls}]
        }
    }))
}

fn stored_report(store: &SqliteStore, task_id: i64) -> Value {
    let mut found = store
        .find_by_i64(ANALYSIS, "info.id", task_id)
        .expect("find report");
    assert_eq!(found.len(), 1, "exactly one report for task {task_id}");
    found.remove(0).body
}

#[test]
fn save_stores_report_and_schema_marker() {
    let dir = TempDir::new().expect("temp dir");
    let outcome = save(report(42, 3), &options(dir.path())).expect("save");
    assert!(matches!(outcome, SaveOutcome::Stored { task_id: 42, ref dropped, .. } if dropped.is_empty()));

    let store = reopen(dir.path());
    let schema = store.find_one(SCHEMA).expect("schema").expect("marker");
    assert_eq!(schema.body, json!({"version": "1"}));

    let body = stored_report(&store, 42);
    assert_eq!(body["network"], json!({}));
    assert_eq!(body["target"]["file"]["name"], json!("sample.exe"));
}

#[test]
fn saving_twice_leaves_a_single_report() {
    let dir = TempDir::new().expect("temp dir");
    let opts = options(dir.path());
    let first = save(report(42, 1), &opts).expect("first save");
    let second = save(report(42, 1), &opts).expect("second save");
    assert_ne!(first.document_id(), second.document_id());

    let store = reopen(dir.path());
    assert_eq!(store.count(ANALYSIS).expect("count"), 1);
    stored_report(&store, 42);
}

#[test]
fn call_records_are_detached_and_replaced() {
    let dir = TempDir::new().expect("temp dir");
    let opts = options(dir.path());

    save(report(7, 250), &opts).expect("first save");
    {
        let store = reopen(dir.path());
        assert_eq!(store.count(CALLS).expect("count calls"), 3);
        let body = stored_report(&store, 7);
        let ids = body["behavior"]["processes"][0]["calls"]
            .as_array()
            .expect("call ids")
            .clone();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(Value::is_i64));

        let first_chunk = store
            .find_one(CALLS)
            .expect("find chunk")
            .expect("chunk exists");
        assert_eq!(first_chunk.body["pid"], json!(1234));
        assert_eq!(first_chunk.body["calls"].as_array().map(Vec::len), Some(100));
    }

    save(report(7, 1), &opts).expect("second save");
    let store = reopen(dir.path());
    assert_eq!(store.count(CALLS).expect("count calls"), 1);
    assert_eq!(store.count(ANALYSIS).expect("count reports"), 1);
}

#[test]
fn oversized_logs_are_dropped_when_fixing_is_enabled() {
    let dir = TempDir::new().expect("temp dir");
    let mut document = report(5, 1);
    document
        .insert("logs", Node::from("x".repeat(20 * 1024 * 1024)))
        .expect("insert logs");

    let opts = ReportingOptions {
        fix_large_docs: true,
        ..options(dir.path())
    };
    let outcome = save(document, &opts).expect("save");
    let SaveOutcome::Stored { dropped, .. } = outcome else {
        panic!("expected the report to be stored, got {outcome:?}");
    };
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].path, "results['logs']");
    assert_eq!(dropped[0].size, 20 * 1024 * 1024);

    let body = stored_report(&reopen(dir.path()), 5);
    assert!(body.get("logs").is_none());
    assert_eq!(body["info"]["id"], json!(5));
}

#[test]
fn oversized_logs_are_rejected_when_fixing_is_disabled() {
    let dir = TempDir::new().expect("temp dir");
    let mut document = report(6, 1);
    document
        .insert("logs", Node::from("x".repeat(20 * 1024 * 1024)))
        .expect("insert logs");

    let outcome = save(document, &options(dir.path())).expect("save");
    match &outcome {
        SaveOutcome::Rejected {
            task_id: 6,
            reason: Rejection::OversizeNotFixed { largest },
        } => {
            let largest = largest.as_ref().expect("largest key");
            assert_eq!(largest.key, "logs");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(matches!(outcome.into_result(), Err(ReportError::SizeLimit(_))));

    let store = reopen(dir.path());
    assert_eq!(store.count(ANALYSIS).expect("count"), 0);
}

#[test]
fn rejected_saves_leave_no_call_records() {
    let dir = TempDir::new().expect("temp dir");
    let opts = options(dir.path());
    for _ in 0..3 {
        let mut document = report(60, 5);
        document
            .insert("logs", Node::from("x".repeat(20 * 1024 * 1024)))
            .expect("insert logs");
        let outcome = save(document, &opts).expect("save");
        assert!(matches!(outcome, SaveOutcome::Rejected { task_id: 60, .. }));
    }

    let store = reopen(dir.path());
    assert_eq!(store.count(ANALYSIS).expect("count reports"), 0);
    assert_eq!(store.count(CALLS).expect("count calls"), 0);
}

#[test]
fn call_records_of_dropped_processes_are_removed() {
    let dir = TempDir::new().expect("temp dir");
    let mut document = report(61, 5);
    document
        .get_mut("behavior")
        .and_then(|behavior| behavior.get_mut("processes"))
        .and_then(Node::as_array_mut)
        .expect("processes")[0]
        .insert("environ", Node::from("e".repeat(20 * 1024 * 1024)))
        .expect("insert environ");

    let opts = ReportingOptions {
        fix_large_docs: true,
        ..options(dir.path())
    };
    let outcome = save(document, &opts).expect("save");
    let SaveOutcome::Stored { dropped, .. } = outcome else {
        panic!("expected the report to be stored, got {outcome:?}");
    };
    assert_eq!(dropped[0].path, "results['behavior']['processes']");

    let store = reopen(dir.path());
    assert!(stored_report(&store, 61)["behavior"].get("processes").is_none());
    assert_eq!(store.count(CALLS).expect("count calls"), 0);
}

#[test]
fn second_save_replaces_first_content() {
    let dir = TempDir::new().expect("temp dir");
    let opts = options(dir.path());
    save(
        Node::from(json!({"info": {"id": 42}, "only_first": "a"})),
        &opts,
    )
    .expect("first save");
    save(
        Node::from(json!({"info": {"id": 42}, "only_second": "b"})),
        &opts,
    )
    .expect("second save");

    let body = stored_report(&reopen(dir.path()), 42);
    assert!(body.get("only_first").is_none());
    assert_eq!(body["only_second"], json!("b"));
}

#[test]
fn integer_keys_are_stored_as_strings() {
    let dir = TempDir::new().expect("temp dir");
    let mut document = report(8, 0);
    let mut summary = Node::empty_map();
    summary
        .insert(Key::Int(5), Node::from("five"))
        .expect("insert int key");
    summary
        .insert(Key::Bool(true), Node::from("yes"))
        .expect("insert bool key");
    document
        .get_mut("behavior")
        .expect("behavior")
        .insert("summary", summary)
        .expect("insert summary");

    let outcome = save(document, &options(dir.path())).expect("save");
    assert!(matches!(outcome, SaveOutcome::Stored { .. }));

    let body = stored_report(&reopen(dir.path()), 8);
    assert_eq!(body["behavior"]["summary"], json!({"5": "five", "true": "yes"}));
}

#[test]
fn forbidden_keys_fall_back_to_section_by_section_save() {
    let dir = TempDir::new().expect("temp dir");
    let mut document = report(9, 0);
    document
        .insert("registry", Node::from(json!({"HKLM.Software": 1})))
        .expect("insert registry");

    let outcome = save(document, &options(dir.path())).expect("save");
    let SaveOutcome::Partial { skipped, task_id, .. } = outcome else {
        panic!("expected partial save, got {outcome:?}");
    };
    assert_eq!(task_id, 9);
    assert_eq!(skipped, vec!["registry".to_string()]);

    let body = stored_report(&reopen(dir.path()), 9);
    assert!(body.get("registry").is_none());
    assert_eq!(body["target"]["file"]["name"], json!("sample.exe"));
    assert_eq!(body["network"], json!({}));
}

#[test]
fn invalid_text_is_repaired_before_insert() {
    let dir = TempDir::new().expect("temp dir");
    let mut document = report(10, 0);
    document
        .insert("strings", Node::Array(vec![Node::Bytes(vec![0xff, b'o', b'k'])]))
        .expect("insert strings");

    save(document, &options(dir.path())).expect("save");
    let body = stored_report(&reopen(dir.path()), 10);
    assert_eq!(body["strings"], json!(["\u{fffd}ok"]));
}

#[test]
fn schema_version_mismatch_aborts_before_writing() {
    let dir = TempDir::new().expect("temp dir");
    {
        let mut store = reopen(dir.path());
        store
            .insert_one(SCHEMA, &Node::from(json!({"version": "0"})))
            .expect("seed old marker");
    }

    let err = save(report(11, 5), &options(dir.path())).expect_err("must abort");
    assert!(matches!(err, ReportError::SchemaMismatch { ref found, .. } if found == "0"));

    let store = reopen(dir.path());
    assert_eq!(store.count(ANALYSIS).expect("count reports"), 0);
    assert_eq!(store.count(CALLS).expect("count calls"), 0);
}

#[test]
fn task_id_override_and_main_task_id_decide_the_stored_id() {
    let dir = TempDir::new().expect("temp dir");

    let mut document = report(12, 0);
    document
        .get_mut("info")
        .expect("info")
        .insert("options", Node::from(json!({"main_task_id": "300"})))
        .expect("insert options");
    let outcome = save(document, &options(dir.path())).expect("save main task");
    assert_eq!(outcome.task_id(), 300);

    let opts = ReportingOptions {
        task_id_override: Some(500),
        ..options(dir.path())
    };
    let outcome = save(report(12, 0), &opts).expect("save override");
    assert_eq!(outcome.task_id(), 500);

    let store = reopen(dir.path());
    assert_eq!(stored_report(&store, 300)["info"]["id"], json!(300));
    assert_eq!(stored_report(&store, 500)["info"]["id"], json!(500));
    assert!(store.find_by_i64(ANALYSIS, "info.id", 12).expect("find").is_empty());
}

#[test]
fn remediation_stops_when_nothing_is_left_to_drop() {
    let dir = TempDir::new().expect("temp dir");
    let mut store = SqliteStore::open_with_limit(dir.path(), "reports", 512).expect("open store");
    let counters: Vec<Node> = (0..400).map(Node::Int).collect();
    let document = Node::from_entries([
        ("info", Node::from(json!({"id": 13}))),
        ("counters", Node::Array(counters)),
    ]);

    let opts = ReportingOptions {
        fix_large_docs: true,
        ..options(dir.path())
    };
    let outcome = save_to_store(&mut store, document, &opts).expect("save");
    assert!(matches!(
        outcome,
        SaveOutcome::Rejected {
            reason: Rejection::RemediationExhausted { .. },
            ..
        }
    ));
    assert_eq!(store.count(ANALYSIS).expect("count"), 0);
}

#[test]
fn reports_without_a_task_id_are_invalid() {
    let dir = TempDir::new().expect("temp dir");
    let document = Node::from(json!({"target": {"category": "file"}}));
    let err = save(document, &options(dir.path())).expect_err("must fail");
    assert!(matches!(err, ReportError::InvalidReport(_)));
}
