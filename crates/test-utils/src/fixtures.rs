//! Fixed sample values shared by unit and integration tests.

use sollytch_ledger_types::{NullableNumber, TestRecord, TxTimestamp};

/// 2024-03-01T12:00:00Z, the base of [`tx_time`].
pub const BASE_SECONDS: i64 = 1_709_294_400;

/// Transaction timestamp `offset` seconds after [`BASE_SECONDS`].
#[must_use]
pub fn tx_time(offset: i64) -> TxTimestamp {
    TxTimestamp::new(BASE_SECONDS + offset, 0)
}

/// A fully populated record for `test_id` with empty labels.
#[must_use]
pub fn sample_record(test_id: &str) -> TestRecord {
    TestRecord {
        test_id: test_id.to_string(),
        timestamp: "2024-03-01T11:58:00Z".to_string(),
        lat: -23.55,
        lon: -46.63,
        geo_hash: "6gyf4bf".to_string(),
        operator_id: "op-17".to_string(),
        operator_did: "did:example:op-17".to_string(),
        matrix_type: "water".to_string(),
        cassette_lot: "CL-2024-03".to_string(),
        reagent_lot: "RL-88".to_string(),
        expiry_days_left: 120,
        distance_mm: 23.5,
        time_to_migrate_s: 310.0,
        control_line_ok: true,
        sample_volume_ul: 80.0,
        sample_ph: 7.2,
        sample_turbidity_ntu: 3.4,
        sample_temp_c: 22.0,
        ambient_temp_c: 25.5,
        ambient_rh_pct: 61.0,
        lighting_lux: 540.0,
        tilt_deg: 1.5,
        preincubation_time_s: 60.0,
        time_since_sampling_min: 14.0,
        storage_condition: "refrigerated".to_string(),
        prefilter_used: true,
        image_taken: true,
        image_blur_score: NullableNumber(Some(0.12)),
        device_fw_version: "2.4.1".to_string(),
        product_id: "P-100".to_string(),
        kit_calibration_id: "CAL-7".to_string(),
        internal_control_result: "pass".to_string(),
        cold_chain_ok: true,
        transport_time_hours: 6.0,
        transport_condition: "cooled".to_string(),
        estimated_concentration_ppb: 3.1,
        estimate_uncertainty_ppb: 0.4,
        ..TestRecord::default()
    }
}

/// [`sample_record`] as a JSON payload string.
///
/// # Panics
///
/// Panics if the record cannot be serialized.
#[must_use]
#[allow(clippy::expect_used)]
pub fn sample_payload(test_id: &str) -> String {
    serde_json::to_string(&sample_record(test_id)).expect("sample record serializes")
}

/// A 64-character lowercase SHA-256-shaped hex string derived from `seed`.
#[must_use]
pub fn sample_hash(seed: u8) -> String {
    (0u8..32).map(|i| format!("{:02x}", i.wrapping_mul(7).wrapping_add(seed))).collect()
}
