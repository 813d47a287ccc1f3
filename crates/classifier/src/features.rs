//! Feature encoding for classifier inference.
//!
//! Trained classifiers address attributes by column name, so the column order
//! and names below are a fixed contract with every stored model. A feature row
//! arrives either as 21 comma-separated positional values or as a JSON object
//! keyed by column name, and is re-emitted in canonical order.

use serde_json::Value;

use sollytch_ledger_types::{ChaincodeError, Purpose, Result, TestRecord};

use crate::dataset::MISSING;

/// How a column's raw text is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Finite decimal number.
    Number,
    /// Signed integer.
    Integer,
    /// Boolean flag: `0`, `1`, `true` or `false`, any case. Encoded as
    /// [`FLAG_TRUE`] or [`FLAG_FALSE`].
    Flag,
    /// Free categorical text.
    Category,
    /// Finite decimal number; an absent value encodes as `0`.
    NullableNumber,
}

/// One column of the canonical feature layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Header name, as used by trained classifiers.
    pub name: &'static str,
    /// Value check applied to the column.
    pub kind: ColumnKind,
}

const fn column(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind }
}

/// Number of feature columns.
pub const FEATURE_COUNT: usize = 21;

/// Encoded spelling of a set flag. Category splits on flags match this text.
pub const FLAG_TRUE: &str = "true";

/// Encoded spelling of a cleared flag.
pub const FLAG_FALSE: &str = "false";

/// The canonical feature columns, in encoding order.
pub const FEATURE_COLUMNS: [Column; FEATURE_COUNT] = [
    column("lat", ColumnKind::Number),
    column("lon", ColumnKind::Number),
    column("expiry_days_left", ColumnKind::Integer),
    column("distance_mm", ColumnKind::Number),
    column("time_to_migrate_s", ColumnKind::Number),
    column("sample_volume_uL", ColumnKind::Number),
    column("sample_pH", ColumnKind::Number),
    column("sample_turbidity_NTU", ColumnKind::Number),
    column("sample_temp_C", ColumnKind::Number),
    column("ambient_T_C", ColumnKind::Number),
    column("ambient_RH_pct", ColumnKind::Number),
    column("lighting_lux", ColumnKind::Number),
    column("tilt_deg", ColumnKind::Number),
    column("preincubation_time_s", ColumnKind::Number),
    column("time_since_sampling_min", ColumnKind::Number),
    column("image_blur_score", ColumnKind::NullableNumber),
    column("tempo_transporte_horas", ColumnKind::Number),
    column("estimated_concentration_ppb", ColumnKind::Number),
    column("incerteza_estimativa_ppb", ColumnKind::Number),
    column("control_line_ok", ColumnKind::Flag),
    column("controle_interno_result", ColumnKind::Category),
];

/// The comma-joined header line, without the target column.
pub fn header() -> String {
    FEATURE_COLUMNS.iter().map(|c| c.name).collect::<Vec<_>>().join(",")
}

fn invalid_value(column: &Column, raw: &str, expected: &str) -> ChaincodeError {
    ChaincodeError::invalid_argument(format!(
        "feature {} value {raw:?} is not {expected}",
        column.name
    ))
}

/// Checks `raw` against the column kind and returns the text to encode.
fn check_value(column: &Column, raw: &str) -> Result<String> {
    let text = raw.trim();
    match column.kind {
        ColumnKind::Number => match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(text.to_string()),
            _ => Err(invalid_value(column, raw, "a finite number")),
        },
        ColumnKind::NullableNumber => {
            if text.is_empty() || text == MISSING || text.eq_ignore_ascii_case("null") {
                return Ok("0".to_string());
            }
            match text.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(text.to_string()),
                _ => Err(invalid_value(column, raw, "a finite number or empty")),
            }
        },
        ColumnKind::Integer => text
            .parse::<i64>()
            .map(|_| text.to_string())
            .map_err(|_| invalid_value(column, raw, "an integer")),
        ColumnKind::Flag => match text.to_ascii_lowercase().as_str() {
            "1" | "true" => Ok(FLAG_TRUE.to_string()),
            "0" | "false" => Ok(FLAG_FALSE.to_string()),
            _ => Err(invalid_value(column, raw, "0, 1, true or false")),
        },
        ColumnKind::Category => {
            if text.is_empty() || text == MISSING || text.contains([',', '\n', '\r']) {
                Err(invalid_value(column, raw, "a non-empty label without commas"))
            } else {
                Ok(text.to_string())
            }
        },
    }
}

/// A type-checked feature row in canonical column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRow {
    values: Vec<String>,
}

impl FeatureRow {
    /// Parses a raw row: a JSON object when it starts with `{`, positional
    /// comma-separated values otherwise.
    ///
    /// # Errors
    ///
    /// See [`FeatureRow::from_csv`] and [`FeatureRow::from_json`].
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim_start().starts_with('{') { Self::from_json(raw) } else { Self::from_csv(raw) }
    }

    /// Parses exactly [`FEATURE_COUNT`] comma-separated values.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::SchemaMismatch`] if the field count is wrong,
    /// or [`ChaincodeError::InvalidArgument`] naming the first column whose
    /// value does not match its kind.
    pub fn from_csv(raw: &str) -> Result<Self> {
        let fields: Vec<&str> = raw.trim().split(',').collect();
        if fields.len() != FEATURE_COUNT {
            return Err(ChaincodeError::SchemaMismatch {
                message: format!(
                    "feature row has {} fields, expected {FEATURE_COUNT}",
                    fields.len()
                ),
            });
        }
        let values = FEATURE_COLUMNS
            .iter()
            .zip(fields)
            .map(|(column, raw)| check_value(column, raw))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { values })
    }

    /// Parses a JSON object keyed by column name.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::InvalidArgument`] if the text is not a JSON
    /// object or a value does not match its column,
    /// [`ChaincodeError::SchemaMismatch`] if a column is missing or an
    /// unknown name is present.
    pub fn from_json(raw: &str) -> Result<Self> {
        let object = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(object)) => object,
            Ok(_) => return Err(ChaincodeError::invalid_argument("feature row is not an object")),
            Err(err) => {
                return Err(ChaincodeError::invalid_argument(format!("feature row: {err}")));
            },
        };

        if let Some(unknown) =
            object.keys().find(|name| !FEATURE_COLUMNS.iter().any(|c| c.name == name.as_str()))
        {
            return Err(ChaincodeError::SchemaMismatch {
                message: format!("unknown feature column {unknown}"),
            });
        }

        let mut values = Vec::with_capacity(FEATURE_COUNT);
        for column in &FEATURE_COLUMNS {
            let value = object.get(column.name).ok_or_else(|| ChaincodeError::SchemaMismatch {
                message: format!("feature column {} is missing", column.name),
            })?;
            let text = match value {
                Value::String(text) => text.clone(),
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                Value::Null if column.kind == ColumnKind::NullableNumber => String::new(),
                other => {
                    return Err(invalid_value(column, &other.to_string(), "a scalar value"));
                },
            };
            values.push(check_value(column, &text)?);
        }
        Ok(Self { values })
    }

    /// Derives a row from a record's measurement fields.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::InvalidArgument`] if a measurement is not
    /// finite or the internal control result is not a usable label.
    pub fn from_record(record: &TestRecord) -> Result<Self> {
        let raw = [
            record.lat.to_string(),
            record.lon.to_string(),
            record.expiry_days_left.to_string(),
            record.distance_mm.to_string(),
            record.time_to_migrate_s.to_string(),
            record.sample_volume_ul.to_string(),
            record.sample_ph.to_string(),
            record.sample_turbidity_ntu.to_string(),
            record.sample_temp_c.to_string(),
            record.ambient_temp_c.to_string(),
            record.ambient_rh_pct.to_string(),
            record.lighting_lux.to_string(),
            record.tilt_deg.to_string(),
            record.preincubation_time_s.to_string(),
            record.time_since_sampling_min.to_string(),
            record.image_blur_score.0.map(|v| v.to_string()).unwrap_or_default(),
            record.transport_time_hours.to_string(),
            record.estimated_concentration_ppb.to_string(),
            record.estimate_uncertainty_ppb.to_string(),
            record.control_line_ok.to_string(),
            record.internal_control_result.clone(),
        ];
        let values = FEATURE_COLUMNS
            .iter()
            .zip(&raw)
            .map(|(column, raw)| check_value(column, raw))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { values })
    }

    /// Checked values in canonical column order.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// The two-line dataset text for inferring `target`: the header plus the
    /// target column, then this row with a missing label.
    pub fn encode(&self, target: Purpose) -> String {
        format!("{},{}\n{},{MISSING}", header(), target.key(), self.values.join(","))
    }
}

/// Parses `raw_row` and encodes it for inferring `target`.
///
/// # Errors
///
/// See [`FeatureRow::parse`].
pub fn encode(raw_row: &str, target: Purpose) -> Result<String> {
    Ok(FeatureRow::parse(raw_row)?.encode(target))
}
