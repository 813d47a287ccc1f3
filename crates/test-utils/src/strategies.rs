//! Proptest strategies for custody chaincode domain types.
//!
//! Reusable generators for property-based testing across crates. Strategies produce
//! well-formed domain values while exploring edge cases through random variation.
//!
//! # Usage
//!
//! ```no_run
//! use sollytch_ledger_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(record in strategies::arb_test_record()) {
//!         // test invariant with a randomly generated record
//!     }
//! }
//! ```

use proptest::prelude::*;
use sollytch_ledger_types::{NullableNumber, TestRecord, TxTimestamp};

/// Generates an identifier of 1-32 characters matching `[A-Za-z0-9][A-Za-z0-9_.:-]{0,31}`.
pub fn arb_identifier() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9_.:-]{0,31}"
}

/// Generates a lowercase hex hash of 2-128 characters (even length).
pub fn arb_hash_hex() -> impl Strategy<Value = String> {
    proptest::collection::vec(any::<u8>(), 1..=64)
        .prop_map(|bytes| bytes.iter().map(|b| format!("{b:02x}")).collect())
}

/// Generates a transaction timestamp between 2000-01-01 and 2100-01-01.
pub fn arb_tx_timestamp() -> impl Strategy<Value = TxTimestamp> {
    (946_684_800i64..4_102_444_800, 0u32..1_000_000_000)
        .prop_map(|(seconds, nanos)| TxTimestamp::new(seconds, nanos))
}

/// Generates a strictly increasing sequence of 1-16 transaction timestamps.
pub fn arb_tx_clock() -> impl Strategy<Value = Vec<TxTimestamp>> {
    (arb_tx_timestamp(), proptest::collection::vec(1u64..10_000_000_000, 0..16)).prop_map(
        |(start, steps)| {
            let mut nanos_total =
                i128::from(start.seconds) * 1_000_000_000 + i128::from(start.nanos);
            let mut clock = vec![start];
            for step in steps {
                nanos_total += i128::from(step);
                let seconds = (nanos_total / 1_000_000_000) as i64;
                let nanos = (nanos_total % 1_000_000_000) as u32;
                clock.push(TxTimestamp::new(seconds, nanos));
            }
            clock
        },
    )
}

fn arb_measurement(range: std::ops::Range<f64>) -> impl Strategy<Value = f64> {
    // Two decimals keeps generated values printable without exponent notation.
    range.prop_map(|v| (v * 100.0).round() / 100.0)
}

/// Generates a test record with plausible field measurements and empty labels.
///
/// Classifier outputs and store-owned fields (`version`, timestamps) are left
/// at their defaults.
pub fn arb_test_record() -> impl Strategy<Value = TestRecord> {
    let location =
        (arb_identifier(), arb_measurement(-90.0..90.0), arb_measurement(-180.0..180.0));
    let assay = (
        -30i64..720,
        arb_measurement(0.0..60.0),
        arb_measurement(0.0..900.0),
        any::<bool>(),
        arb_measurement(0.0..200.0),
        arb_measurement(0.0..14.0),
        arb_measurement(0.0..1000.0),
        arb_measurement(-5.0..45.0),
    );
    let environment = (
        arb_measurement(-20.0..50.0),
        arb_measurement(0.0..100.0),
        arb_measurement(0.0..100_000.0),
        arb_measurement(0.0..90.0),
        arb_measurement(0.0..3600.0),
        arb_measurement(0.0..1440.0),
        proptest::option::of(arb_measurement(0.0..1.0)),
    );
    let chain = (
        prop::sample::select(vec!["pass", "fail", "invalid"]),
        arb_measurement(0.0..240.0),
        arb_measurement(0.0..5000.0),
        arb_measurement(0.0..50.0),
        any::<bool>(),
    );

    (location, assay, environment, chain).prop_map(
        |(
            (test_id, lat, lon),
            (expiry, distance, migrate, control, volume, ph, turbidity, sample_temp),
            (ambient_temp, humidity, lux, tilt, preincubation, since_sampling, blur),
            (internal_control, transport, concentration, uncertainty, cold_chain),
        )| TestRecord {
            test_id,
            lat,
            lon,
            expiry_days_left: expiry,
            distance_mm: distance,
            time_to_migrate_s: migrate,
            control_line_ok: control,
            sample_volume_ul: volume,
            sample_ph: ph,
            sample_turbidity_ntu: turbidity,
            sample_temp_c: sample_temp,
            ambient_temp_c: ambient_temp,
            ambient_rh_pct: humidity,
            lighting_lux: lux,
            tilt_deg: tilt,
            preincubation_time_s: preincubation,
            time_since_sampling_min: since_sampling,
            image_blur_score: NullableNumber(blur),
            internal_control_result: internal_control.to_string(),
            transport_time_hours: transport,
            estimated_concentration_ppb: concentration,
            estimate_uncertainty_ppb: uncertainty,
            cold_chain_ok: cold_chain,
            ..TestRecord::default()
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn strategy_produces_usable_identifiers(id in arb_identifier()) {
            prop_assert!(!id.is_empty());
            prop_assert!(id.len() <= 32);
            prop_assert!(!id.contains('\0'), "identifier contains NUL");
        }

        #[test]
        fn strategy_produces_even_lowercase_hashes(hash in arb_hash_hex()) {
            prop_assert_eq!(hash.len() % 2, 0);
            prop_assert!(hash.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }

        #[test]
        fn strategy_produces_formattable_timestamps(ts in arb_tx_timestamp()) {
            prop_assert!(ts.to_rfc3339().is_some());
        }

        #[test]
        fn strategy_produces_increasing_clocks(clock in arb_tx_clock()) {
            for pair in clock.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
        }

        #[test]
        fn strategy_produces_unlabelled_records(record in arb_test_record()) {
            prop_assert!(!record.test_id.is_empty());
            prop_assert!(record.recommended_action.is_empty());
            prop_assert_eq!(record.version, 0);
        }
    }
}
