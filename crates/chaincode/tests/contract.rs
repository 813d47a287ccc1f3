//! End-to-end behavior of the contract over the in-memory ledger.

mod common;

use common::{Harness, model_data, sample_row};
use sollytch_ledger_classifier::{FEATURE_COLUMNS, NodeSpec};
use sollytch_ledger_chaincode::Contract;
use sollytch_ledger_state::{MemoryLedger, StubError};
use sollytch_ledger_test_utils::{sample_hash, sample_payload, sample_record, tx_time};
use sollytch_ledger_types::{ErrorCode, Purpose};

// =============================================================================
// Test records
// =============================================================================

#[test]
fn test_store_without_row_keeps_payload_labels() {
    let h = Harness::new();
    let mut record = sample_record("T1");
    record.qc_status = "manual".to_string();
    let payload = serde_json::to_string(&record).unwrap();

    let stored = h.ok_json("storeTest", &["T1", &payload]);
    assert_eq!(stored["version"], 1);
    assert_eq!(stored["qc_status"], "manual");
    assert_eq!(stored["acao_recomendada"], "");
    assert_eq!(stored["created_at"], "2024-03-01T12:00:01.000000000Z");
    assert_eq!(stored["created_at"], stored["last_updated_at"]);
}

#[test]
fn test_store_with_row_classifies_all_three() {
    let h = Harness::new();
    h.install_models();

    let stored = h.ok_json("storeTest", &["T1", &sample_payload("T1"), &sample_row()]);
    assert_eq!(stored["acao_recomendada"], "release");
    assert_eq!(stored["result_class"], "negative");
    assert_eq!(stored["qc_status"], "pass");

    let queried = h.ok_json("queryTest", &["T1"]);
    assert_eq!(queried, stored);
}

#[test]
fn test_store_with_json_row() {
    let h = Harness::new();
    h.install_models();

    let values: Vec<String> = sample_row().split(',').map(str::to_string).collect();
    let row: serde_json::Map<String, serde_json::Value> = FEATURE_COLUMNS
        .iter()
        .zip(values)
        .map(|(column, value)| (column.name.to_string(), serde_json::Value::String(value)))
        .collect();
    let row = serde_json::Value::Object(row).to_string();

    let stored = h.ok_json("storeTest", &["T1", &sample_payload("T1"), &row]);
    assert_eq!(stored["qc_status"], "pass");
}

#[test]
fn test_writes_with_earlier_clock_rejected() {
    let h = Harness::new();
    h.set_next_second(100);
    h.ok_json("storeTest", &["T1", &sample_payload("T1")]);
    h.ok_json("storeImage", &["img-1", "T1", &sample_hash(1)]);

    h.set_next_second(50);
    let response = h.invoke("updateTest", &["T1", &sample_payload("T1")]);
    assert_eq!(response.status, 400);
    assert!(response.message.contains("is not after last update"));
    let response = h.invoke("storeImage", &["img-1", "T1", &sample_hash(2)]);
    assert_eq!(response.status, 400);

    // Same instant as the stored write.
    h.set_next_second(100);
    assert_eq!(h.invoke("updateTest", &["T1", &sample_payload("T1")]).status, 400);

    let stored = h.ok_json("queryTest", &["T1"]);
    assert_eq!(stored["version"], 1);
    assert_eq!(stored["last_updated_at"], "2024-03-01T12:01:40.000000000Z");

    let updated = h.ok_json("updateTest", &["T1", &sample_payload("T1")]);
    assert_eq!(updated["version"], 2);
    assert_eq!(updated["created_at"], "2024-03-01T12:01:40.000000000Z");
}

#[test]
fn test_flag_spelling_does_not_change_labels() {
    let h = Harness::new();
    h.install_models();

    let row = sample_row();
    assert!(row.ends_with(",true,pass"));
    for (id, spelling) in [("T1", "true"), ("T2", "1"), ("T3", "TRUE")] {
        let row = row.replace(",true,pass", &format!(",{spelling},pass"));
        let stored = h.ok_json("storeTest", &[id, &sample_payload(id), &row]);
        assert_eq!(stored["result_class"], "negative", "spelling {spelling}");
    }

    let row = row.replace(",true,pass", ",0,pass");
    let stored = h.ok_json("storeTest", &["T4", &sample_payload("T4"), &row]);
    assert_eq!(stored["result_class"], "invalid");
}

#[test]
fn test_classification_is_all_or_nothing() {
    let h = Harness::new();
    h.install(Purpose::RecommendedAction, NodeSpec::leaf("release"));
    h.install(Purpose::QcStatus, NodeSpec::leaf("pass"));

    let response = h.invoke("storeTest", &["T1", &sample_payload("T1"), &sample_row()]);
    assert_eq!(response.status, 404);
    assert!(response.message.contains("result_class"), "{}", response.message);
    assert_eq!(h.invoke("queryTest", &["T1"]).status, 404);
}

#[test]
fn test_corrupt_model_aborts_store() {
    let h = Harness::new();
    h.install_models();
    h.ok_json("storeModel", &["qc_status", "bm90IGEgdHJlZQ=="]);

    let response = h.invoke("storeTest", &["T1", &sample_payload("T1"), &sample_row()]);
    assert_eq!(response.status, 500);
    let details = response.details.unwrap();
    assert_eq!(details.error_code, ErrorCode::Corrupt.as_u16());
    assert!(!details.is_retryable);
    assert_eq!(h.invoke("queryTest", &["T1"]).status, 404);
}

#[test]
fn test_feature_row_shape_errors() {
    let h = Harness::new();
    h.install_models();

    let short = "1,2,3";
    let response = h.invoke("storeTest", &["T1", &sample_payload("T1"), short]);
    assert_eq!(response.status, 422);

    let bad_value = sample_row().replacen("-23.55", "south", 1);
    let response = h.invoke("storeTest", &["T1", &sample_payload("T1"), &bad_value]);
    assert_eq!(response.status, 400);
    assert!(response.message.contains("lat"), "{}", response.message);
}

#[test]
fn test_duplicate_create_wins_over_classification_errors() {
    let h = Harness::new();
    h.ok_json("storeTest", &["T1", &sample_payload("T1")]);

    // No models are installed; the duplicate is still reported first.
    let response = h.invoke("storeTest", &["T1", &sample_payload("T1"), &sample_row()]);
    assert_eq!(response.status, 409);
    assert_eq!(response.details.unwrap().error_code, ErrorCode::AlreadyExists.as_u16());
}

#[test]
fn test_store_rejects_bad_arguments() {
    let h = Harness::new();
    assert_eq!(h.invoke("storeTest", &["", &sample_payload("")]).status, 400);
    assert_eq!(h.invoke("storeTest", &["T1", "not json"]).status, 400);
    assert_eq!(h.invoke("storeTest", &["T1", "   "]).status, 400);
    assert_eq!(h.invoke("storeTest", &["T1", &sample_payload("T2")]).status, 400);
    assert_eq!(h.invoke("storeTest", &["T\u{0}1", &sample_payload("T\u{0}1")]).status, 400);
    assert!(h.ledger.is_empty());
}

#[test]
fn test_update_versions_and_timestamps() {
    let h = Harness::new();
    h.install_models();
    let created = h.ok_json("storeTest", &["T1", &sample_payload("T1"), &sample_row()]);

    let mut record = sample_record("T1");
    record.sample_ph = 6.4;
    let payload = serde_json::to_string(&record).unwrap();
    let first = h.ok_json("updateTest", &["T1", &payload]);
    let second = h.ok_json("updateTest", &["T1", &payload]);

    assert_eq!(first["version"], 2);
    assert_eq!(second["version"], 3);
    assert_eq!(second["created_at"], created["created_at"]);
    assert!(second["last_updated_at"].as_str() > first["last_updated_at"].as_str());
    assert_eq!(second["sample_pH"], 6.4);
    assert_eq!(second["qc_status"], "pass", "labels carried from the stored record");
}

#[test]
fn test_update_unknown_is_not_found() {
    let h = Harness::new();
    let response = h.invoke("updateTest", &["T9", &sample_payload("T9")]);
    assert_eq!(response.status, 404);
    assert_eq!(response.message, "test record T9 not found");
}

#[test]
fn test_get_all_tests_skips_models_and_images() {
    let h = Harness::new();
    h.install_models();
    for id in ["T2", "T1", "T3"] {
        h.ok_json("storeTest", &[id, &sample_payload(id)]);
    }
    h.ok_json("storeImage", &["img-1", "T1", &sample_hash(1)]);

    let all = h.ok_json("getAllTests", &[]);
    let ids: Vec<_> = all.as_array().unwrap().iter().map(|r| r["test_id"].clone()).collect();
    assert_eq!(ids, ["T1", "T2", "T3"]);
}

#[test]
fn test_get_all_tests_empty_ledger() {
    let h = Harness::new();
    assert_eq!(h.ok_json("getAllTests", &[]), serde_json::json!([]));
}

#[test]
fn test_corrupt_record_aborts_listing() {
    let h = Harness::new();
    h.ok_json("storeTest", &["T1", &sample_payload("T1")]);
    h.ledger.seed("T2", b"{broken".to_vec());

    let response = h.invoke("getAllTests", &[]);
    assert_eq!(response.status, 500);
    assert!(response.payload.is_empty());
    assert!(response.message.contains("T2"));
}

// =============================================================================
// Models
// =============================================================================

#[test]
fn test_store_model_twice_uses_latest() {
    let h = Harness::new();
    h.install_models();
    let first = h.install(Purpose::QcStatus, NodeSpec::leaf("hold"));
    assert_eq!(first["version"], 2);
    assert_eq!(first["modelKey"], "qc_status");
    assert!(first.get("modelData").is_none());

    let info = h.ok_json("getModelInfo", &["qc_status"]);
    assert_eq!(info["version"], 2);
    assert_eq!(info["payload_len"], model_data(Purpose::QcStatus, NodeSpec::leaf("hold")).len());

    let stored = h.ok_json("storeTest", &["T1", &sample_payload("T1"), &sample_row()]);
    assert_eq!(stored["qc_status"], "hold");
}

#[test]
fn test_store_model_rejects_bad_arguments() {
    let h = Harness::new();
    assert_eq!(h.invoke("storeModel", &["risk_score", "AAAA"]).status, 400);
    assert_eq!(h.invoke("storeModel", &["", "AAAA"]).status, 400);
    assert_eq!(h.invoke("storeModel", &["qc_status", ""]).status, 400);
    assert_eq!(h.invoke("getModelInfo", &["qc_status"]).status, 404);
}

// =============================================================================
// Images
// =============================================================================

#[test]
fn test_image_lifecycle() {
    let h = Harness::new();
    let first = h.ok_json("storeImage", &["img-1", "T1", &sample_hash(1)]);
    assert_eq!(first["version"], 1);
    assert_eq!(first["parent_id"], "T1");

    let second = h.ok_json("storeImage", &["img-1", "T1", &sample_hash(2)]);
    assert_eq!(second["version"], 2);
    assert_eq!(second["hash"], sample_hash(2));
    assert_eq!(second["captured_at"], first["captured_at"]);

    h.ok_json("storeImage", &["img-2", "T1", &sample_hash(3)]);
    h.ok_json("storeImage", &["img-3", "T2", &sample_hash(4)]);

    let listed = h.ok_json("getImagesByParent", &["T1"]);
    let ids: Vec<_> = listed.as_array().unwrap().iter().map(|i| i["image_id"].clone()).collect();
    assert_eq!(ids, ["img-1", "img-2"]);
    assert_eq!(h.ok_json("getImagesByParent", &["T9"]), serde_json::json!([]));

    assert_eq!(h.invoke("imageExists", &["img-3"]).payload_str(), Some("true"));
    assert_eq!(h.invoke("imageExists", &["img-4"]).payload_str(), Some("false"));
    assert_eq!(h.ok_json("getImage", &["img-1"]), second);
}

#[test]
fn test_image_argument_errors() {
    let h = Harness::new();
    h.ok_json("storeImage", &["img-1", "T1", &sample_hash(1)]);

    assert_eq!(h.invoke("storeImage", &["img-1", "T2", &sample_hash(1)]).status, 400);
    assert_eq!(h.invoke("storeImage", &["img-2", "T1", "xyz"]).status, 400);
    assert_eq!(h.invoke("storeImage", &["img-2", "T1", "abc"]).status, 400);
    assert_eq!(h.invoke("storeImage", &["img-2", "", &sample_hash(1)]).status, 400);
    assert_eq!(h.invoke("getImage", &["img-2"]).status, 404);
}

#[test]
fn test_image_id_colliding_with_record_is_rejected() {
    let h = Harness::new();
    h.ok_json("storeTest", &["T1", &sample_payload("T1")]);
    let response = h.invoke("storeImage", &["T1", "P1", &sample_hash(1)]);
    assert_eq!(response.status, 400);
    assert_eq!(h.invoke("queryTest", &["T1"]).status, 200);
}

// =============================================================================
// Platform semantics
// =============================================================================

#[test]
fn test_missing_clock_is_retryable_upstream() {
    let h = Harness::new();
    let mut tx = h.ledger.begin_without_clock("tx-no-clock");
    let args = vec!["T1".to_string(), sample_payload("T1")];
    let response = h.contract.invoke(&mut tx, "storeTest", &args);
    assert_eq!(response.status, 500);
    assert!(response.details.unwrap().is_retryable);
}

#[test]
fn test_concurrent_creates_conflict_at_commit() {
    let ledger = MemoryLedger::new();
    let contract = Contract::default();
    let args = vec!["T1".to_string(), sample_payload("T1")];

    let mut first = ledger.begin("tx-a", tx_time(1));
    let mut second = ledger.begin("tx-b", tx_time(1));
    assert!(contract.invoke(&mut first, "storeTest", &args).is_ok());
    assert!(contract.invoke(&mut second, "storeTest", &args).is_ok());

    first.commit().unwrap();
    let err = second.commit().unwrap_err();
    assert!(matches!(err, StubError::ReadConflict { .. }));
}

#[test]
fn test_failed_invocation_leaves_no_writes() {
    let ledger = MemoryLedger::new();
    let contract = Contract::default();
    let mut tx = ledger.begin("tx", tx_time(1));
    let args = vec!["T1".to_string(), sample_payload("T1"), sample_row()];
    let response = contract.invoke(&mut tx, "storeTest", &args);
    assert_eq!(response.status, 404);
    assert_eq!(tx.pending_writes().count(), 0);
}
