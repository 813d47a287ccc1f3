//! Core domain types for the custody chaincode.
//!
//! - Transaction timestamps supplied by the platform
//! - Classifier purposes and derived labels
//! - Ledger documents: test records, classifier models, image assets
//!
//! JSON field names are a wire contract with existing clients and differ from
//! the Rust field names in places; every rename is explicit.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Version assigned to an entity on its first write.
pub const INITIAL_VERSION: u64 = 1;

// ============================================================================
// Transaction Clock
// ============================================================================

/// Deterministic transaction timestamp supplied by the ledger platform.
///
/// Identical on every validating node that executes the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxTimestamp {
    /// Seconds since the Unix epoch.
    pub seconds: i64,
    /// Nanosecond fraction, `0..1_000_000_000`.
    pub nanos: u32,
}

impl TxTimestamp {
    /// Creates a timestamp from its platform components.
    pub const fn new(seconds: i64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    /// Converts to a UTC datetime, or `None` if out of range.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if self.nanos >= 1_000_000_000 {
            return None;
        }
        DateTime::from_timestamp(self.seconds, self.nanos)
    }

    /// Formats as RFC 3339 UTC with fixed nanosecond precision and a `Z` suffix.
    ///
    /// Fixed width keeps lexicographic order equal to temporal order.
    pub fn to_rfc3339(self) -> Option<String> {
        self.to_datetime().map(|dt| dt.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }
}

impl fmt::Display for TxTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

// ============================================================================
// Document Kinds
// ============================================================================

/// Discriminator stored as `docType` in every ledger document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    /// A diagnostic test record.
    Test,
    /// A serialized classifier.
    Model,
    /// An image integrity record.
    Image,
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Test => "test record",
            Self::Model => "classifier model",
            Self::Image => "image asset",
        })
    }
}

// ============================================================================
// Classifier Purposes
// ============================================================================

/// One of the three fixed classification targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Purpose {
    /// Recommended follow-up action.
    #[serde(rename = "acao_recomendada")]
    RecommendedAction,
    /// Test result class.
    #[serde(rename = "result_class")]
    ResultClass,
    /// Quality-control status.
    #[serde(rename = "qc_status")]
    QcStatus,
}

impl Purpose {
    /// All purposes in pipeline order.
    pub const ALL: [Purpose; 3] = [Self::RecommendedAction, Self::ResultClass, Self::QcStatus];

    /// Ledger key and target column name for this purpose.
    pub const fn key(self) -> &'static str {
        match self {
            Self::RecommendedAction => "acao_recomendada",
            Self::ResultClass => "result_class",
            Self::QcStatus => "qc_status",
        }
    }

    /// Parses a purpose key. Returns `None` for anything outside the allow-list.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The three classifier-derived labels of a test record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    /// Recommended action.
    pub action: String,
    /// Result class.
    pub result_class: String,
    /// QC status.
    pub qc_status: String,
}

impl Labels {
    /// Returns the label for `purpose`.
    pub fn get(&self, purpose: Purpose) -> &str {
        match purpose {
            Purpose::RecommendedAction => &self.action,
            Purpose::ResultClass => &self.result_class,
            Purpose::QcStatus => &self.qc_status,
        }
    }

    /// Sets the label for `purpose`.
    pub fn set(&mut self, purpose: Purpose, label: String) {
        match purpose {
            Purpose::RecommendedAction => self.action = label,
            Purpose::ResultClass => self.result_class = label,
            Purpose::QcStatus => self.qc_status = label,
        }
    }
}

// ============================================================================
// Test Records
// ============================================================================

/// A numeric measurement that may be JSON `null`.
///
/// `null` is preserved as `null` on re-encode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NullableNumber(pub Option<f64>);

impl NullableNumber {
    /// The value, with `null` read as zero.
    pub fn or_zero(self) -> f64 {
        self.0.unwrap_or(0.0)
    }
}

impl From<f64> for NullableNumber {
    fn from(value: f64) -> Self {
        Self(Some(value))
    }
}

/// One diagnostic test event.
///
/// Missing payload fields decode to their zero value and unknown fields are
/// ignored. `version`, `created_at` and `last_updated_at` are owned by the
/// record store; caller-supplied values are overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestRecord {
    /// Monotonic version, [`INITIAL_VERSION`] on create.
    pub version: u64,
    /// Transaction time of the latest write.
    pub last_updated_at: String,
    /// Transaction time of the first write.
    pub created_at: String,

    /// Test identifier, equal to the storage key.
    pub test_id: String,
    /// Client-reported test time, opaque to the chaincode.
    pub timestamp: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
    /// Geohash of the test location.
    pub geo_hash: String,
    /// Operator identifier.
    pub operator_id: String,
    /// Operator decentralized identifier.
    pub operator_did: String,
    /// Sample matrix type.
    pub matrix_type: String,
    /// Cassette lot.
    pub cassette_lot: String,
    /// Reagent lot.
    pub reagent_lot: String,
    /// Days until the kit expires.
    pub expiry_days_left: i64,
    /// Migration distance in millimetres.
    pub distance_mm: f64,
    /// Migration time in seconds.
    pub time_to_migrate_s: f64,
    /// Whether the control line appeared.
    pub control_line_ok: bool,
    /// Sample volume in microlitres.
    #[serde(rename = "sample_volume_uL")]
    pub sample_volume_ul: f64,
    /// Sample pH.
    #[serde(rename = "sample_pH")]
    pub sample_ph: f64,
    /// Sample turbidity in NTU.
    #[serde(rename = "sample_turbidity_NTU")]
    pub sample_turbidity_ntu: f64,
    /// Sample temperature in °C.
    #[serde(rename = "sample_temp_C")]
    pub sample_temp_c: f64,
    /// Ambient temperature in °C.
    #[serde(rename = "ambient_T_C")]
    pub ambient_temp_c: f64,
    /// Ambient relative humidity in percent.
    #[serde(rename = "ambient_RH_pct")]
    pub ambient_rh_pct: f64,
    /// Lighting in lux.
    pub lighting_lux: f64,
    /// Device tilt in degrees.
    pub tilt_deg: f64,
    /// Pre-incubation time in seconds.
    pub preincubation_time_s: f64,
    /// Minutes between sampling and test.
    pub time_since_sampling_min: f64,
    /// Storage condition description.
    pub storage_condition: String,
    /// Whether a prefilter was used.
    pub prefilter_used: bool,
    /// Whether an image was captured.
    pub image_taken: bool,
    /// Image blur score, `null` when no image was scored.
    pub image_blur_score: NullableNumber,
    /// Device firmware version.
    pub device_fw_version: String,
    /// Product identifier.
    #[serde(rename = "produto_id")]
    pub product_id: String,
    /// Kit calibration identifier.
    pub kit_calibration_id: String,
    /// Internal control outcome.
    #[serde(rename = "controle_interno_result")]
    pub internal_control_result: String,
    /// Whether the cold chain was preserved.
    #[serde(rename = "cadeia_frio_status")]
    pub cold_chain_ok: bool,
    /// Transport time in hours.
    #[serde(rename = "tempo_transporte_horas")]
    pub transport_time_hours: f64,
    /// Transport condition description.
    #[serde(rename = "condicao_transporte")]
    pub transport_condition: String,
    /// Estimated analyte concentration in ppb.
    pub estimated_concentration_ppb: f64,
    /// Uncertainty of the concentration estimate in ppb.
    #[serde(rename = "incerteza_estimativa_ppb")]
    pub estimate_uncertainty_ppb: f64,

    /// Classifier output: recommended action.
    #[serde(rename = "acao_recomendada")]
    pub recommended_action: String,
    /// Classifier output: result class.
    pub result_class: String,
    /// Classifier output: QC status.
    pub qc_status: String,
}

impl TestRecord {
    /// The derived labels currently on the record.
    pub fn labels(&self) -> Labels {
        Labels {
            action: self.recommended_action.clone(),
            result_class: self.result_class.clone(),
            qc_status: self.qc_status.clone(),
        }
    }

    /// Overwrites the derived labels.
    pub fn apply_labels(&mut self, labels: Labels) {
        self.recommended_action = labels.action;
        self.result_class = labels.result_class;
        self.qc_status = labels.qc_status;
    }
}

// ============================================================================
// Classifier Models
// ============================================================================

/// A versioned classifier stored as ledger state under its purpose key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierModel {
    /// Purpose, also the storage key.
    #[serde(rename = "modelKey")]
    pub purpose: Purpose,
    /// Monotonic version, [`INITIAL_VERSION`] on first store.
    pub version: u64,
    /// Transaction time of the latest store.
    pub updated_at: String,
    /// Base64 text of the serialized classifier, exactly as submitted.
    #[serde(rename = "modelData")]
    pub payload: String,
}

/// Model metadata without the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Purpose key.
    #[serde(rename = "modelKey")]
    pub purpose: Purpose,
    /// Current version.
    pub version: u64,
    /// Transaction time of the latest store.
    pub updated_at: String,
    /// Length of the base64 payload text.
    pub payload_len: usize,
}

impl From<&ClassifierModel> for ModelInfo {
    fn from(model: &ClassifierModel) -> Self {
        Self {
            purpose: model.purpose,
            version: model.version,
            updated_at: model.updated_at.clone(),
            payload_len: model.payload.len(),
        }
    }
}

// ============================================================================
// Image Assets
// ============================================================================

/// Integrity record for one image, linked to a parent entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    /// Image identifier, also the storage key.
    pub image_id: String,
    /// Parent entity identifier. Fixed at first write.
    pub parent_id: String,
    /// Lowercase hex content hash.
    pub hash: String,
    /// Transaction time of the first write.
    pub captured_at: String,
    /// Equal to `captured_at`; kept for symmetry with other documents.
    pub created_at: String,
    /// Transaction time of the latest write.
    pub last_updated_at: String,
    /// Monotonic version, [`INITIAL_VERSION`] on first write.
    pub version: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_formats_with_fixed_nanos() {
        let ts = TxTimestamp::new(1_700_000_000, 5);
        assert_eq!(ts.to_rfc3339().unwrap(), "2023-11-14T22:13:20.000000005Z");

        let ts = TxTimestamp::new(0, 0);
        assert_eq!(ts.to_rfc3339().unwrap(), "1970-01-01T00:00:00.000000000Z");
    }

    #[test]
    fn test_timestamp_string_order_matches_time_order() {
        let earlier = TxTimestamp::new(1_700_000_000, 999_999_999).to_rfc3339().unwrap();
        let later = TxTimestamp::new(1_700_000_001, 0).to_rfc3339().unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn test_timestamp_out_of_range() {
        assert!(TxTimestamp::new(i64::MAX, 0).to_rfc3339().is_none());
        assert!(TxTimestamp::new(0, 1_000_000_000).to_rfc3339().is_none());
    }

    #[test]
    fn test_purpose_allow_list() {
        assert_eq!(Purpose::from_key("acao_recomendada"), Some(Purpose::RecommendedAction));
        assert_eq!(Purpose::from_key("result_class"), Some(Purpose::ResultClass));
        assert_eq!(Purpose::from_key("qc_status"), Some(Purpose::QcStatus));
        assert_eq!(Purpose::from_key("Result_Class"), None);
        assert_eq!(Purpose::from_key(""), None);
    }

    #[test]
    fn test_purpose_serde_uses_ledger_key() {
        let json = serde_json::to_string(&Purpose::QcStatus).unwrap();
        assert_eq!(json, "\"qc_status\"");
        let back: Purpose = serde_json::from_str("\"acao_recomendada\"").unwrap();
        assert_eq!(back, Purpose::RecommendedAction);
    }

    #[test]
    fn test_nullable_number_preserves_null() {
        let record: TestRecord =
            serde_json::from_str(r#"{"test_id":"T1","image_blur_score":null}"#).unwrap();
        assert_eq!(record.image_blur_score, NullableNumber(None));
        assert_eq!(record.image_blur_score.or_zero(), 0.0);

        let json = serde_json::to_value(&record).unwrap();
        assert!(json["image_blur_score"].is_null());

        let record: TestRecord = serde_json::from_str(r#"{"image_blur_score":0.42}"#).unwrap();
        assert_eq!(record.image_blur_score, NullableNumber(Some(0.42)));
    }

    #[test]
    fn test_record_uses_wire_field_names() {
        let record: TestRecord = serde_json::from_str(
            r#"{"sample_pH":7.1,"ambient_T_C":24.5,"produto_id":"P-9","cadeia_frio_status":true,
                "acao_recomendada":"repeat","unknown_field":1}"#,
        )
        .unwrap();
        assert_eq!(record.sample_ph, 7.1);
        assert_eq!(record.ambient_temp_c, 24.5);
        assert_eq!(record.product_id, "P-9");
        assert!(record.cold_chain_ok);
        assert_eq!(record.recommended_action, "repeat");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["sample_pH"], 7.1);
        assert_eq!(json["incerteza_estimativa_ppb"], 0.0);
        assert!(json.get("sample_ph").is_none());
    }

    #[test]
    fn test_labels_by_purpose() {
        let mut labels = Labels::default();
        labels.set(Purpose::RecommendedAction, "discard".to_string());
        labels.set(Purpose::ResultClass, "positive".to_string());
        labels.set(Purpose::QcStatus, "pass".to_string());

        let mut record = TestRecord::default();
        record.apply_labels(labels.clone());
        assert_eq!(record.labels(), labels);
        assert_eq!(labels.get(Purpose::ResultClass), "positive");
    }

    #[test]
    fn test_model_info_omits_payload() {
        let model = ClassifierModel {
            purpose: Purpose::ResultClass,
            version: 2,
            updated_at: "2024-01-01T00:00:00.000000000Z".to_string(),
            payload: "AAEC".to_string(),
        };
        let info = ModelInfo::from(&model);
        assert_eq!(info.payload_len, 4);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["modelKey"], "result_class");
        assert!(json.get("modelData").is_none());
    }

    proptest::proptest! {
        #[test]
        fn formatted_timestamps_sort_like_time(
            a in (0i64..4_102_444_800, 0u32..1_000_000_000),
            b in (0i64..4_102_444_800, 0u32..1_000_000_000),
        ) {
            let (a, b) = (TxTimestamp::new(a.0, a.1), TxTimestamp::new(b.0, b.1));
            let (fa, fb) = (a.to_rfc3339().unwrap(), b.to_rfc3339().unwrap());
            proptest::prop_assert_eq!(fa.len(), 30);
            proptest::prop_assert_eq!(a.cmp(&b), fa.cmp(&fb));
        }
    }
}
