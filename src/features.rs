//! External field mapping, value coercion, and feature-vector assembly.
//!
//! This is the logic shared between training and serving: callers send a
//! partial set of public field names, and the mapper produces a complete
//! numeric vector in the exact order the model was trained on. Anything
//! missing or unparseable degrades to the feature's impute value (its
//! training-set mean) instead of failing the request.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single inbound field value. JSON numbers, strings, and nulls are the
/// supported shapes; anything else falls into `Other` and coerces to the
/// impute default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Null,
    Other(serde_json::Value),
}

/// Translation table from public field names to internal feature names.
///
/// This is configuration data, not fixed semantics: the built-in default
/// mirrors the original deployment, and `field_map.json` next to the
/// artifacts overrides it for models trained on a different feature space.
#[derive(Debug, Clone)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

/// Default public-field → model-feature pairs.
const DEFAULT_FIELD_MAP: &[(&str, &str)] = &[
    ("age", "TLTimeFirst"),
    ("annual_income", "Income"),
    ("employment_years", "TLTimeLast"),
    ("derogatory_marks", "DerogCnt"),
    ("inquiries_last6m", "InqCnt06"),
    ("inquiries_finance_24m", "InqFinanceCnt24"),
    ("total_accounts", "TLCnt"),
    ("active_accounts", "TLSatCnt"),
    ("high_credit_util_75", "TL75UtilCnt"),
    ("util_50_plus", "TL50UtilCnt"),
    ("balance_high_credit_pct", "TLBalHCPct"),
    ("satisfied_pct", "TLSatPct"),
    ("delinquency_30_60_24m", "TLDel3060Cnt24"),
    ("delinquency_90d_24m", "TLDel90Cnt24"),
    ("delinquencies_60d", "TLDel60Cnt"),
    ("chargeoffs_last24m", "TLBadCnt24"),
    ("derog_or_bad_cnt", "TLBadDerogCnt"),
    ("accounts_open_last24m", "TLOpen24Pct"),
    ("max_account_balance", "TLMaxSum"),
    ("total_balance", "TLSum"),
];

/// Errors loading a field-map override file.
#[derive(Debug, Error)]
pub enum FieldMapError {
    #[error("failed to read field map {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid field map {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            entries: DEFAULT_FIELD_MAP
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl FieldMap {
    /// Load a field map from a JSON object of `external name → feature name`.
    pub fn from_json_file(path: &Path) -> Result<Self, FieldMapError> {
        let display = path.display().to_string();
        let bytes = std::fs::read(path).map_err(|source| FieldMapError::Read {
            path: display.clone(),
            source,
        })?;
        let map: BTreeMap<String, String> =
            serde_json::from_slice(&bytes).map_err(|source| FieldMapError::Parse {
                path: display,
                source,
            })?;
        Ok(Self {
            entries: map.into_iter().collect(),
        })
    }

    /// Iterate `(external name, internal feature name)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Internal feature names, in declaration order.
    pub fn feature_names(&self) -> Vec<String> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }
}

/// Parse cleaned-up numeric text: trim whitespace, strip `$`, `%`, and `,`,
/// then parse the remainder as a decimal number.
pub fn clean_numeric_text(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | '%' | ','))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Coerce one inbound value to a number, falling back to `impute` when the
/// value is absent, null, unparseable, or of an unsupported shape.
pub fn coerce_field(value: Option<&FieldValue>, impute: f64) -> f64 {
    match value {
        Some(FieldValue::Number(n)) => *n,
        Some(FieldValue::Text(text)) => clean_numeric_text(text).unwrap_or(impute),
        Some(FieldValue::Null) | Some(FieldValue::Other(_)) | None => impute,
    }
}

/// Build a complete feature vector in `feature_names` order.
///
/// Mapped features take their value from the caller's fields (via
/// [`coerce_field`]); every other feature always receives its impute value.
/// Features missing from the impute table default to 0.
pub fn build_feature_vector(
    fields: &HashMap<String, FieldValue>,
    field_map: &FieldMap,
    feature_names: &[String],
    impute_values: &BTreeMap<String, f64>,
) -> Vec<f64> {
    let mut mapped: HashMap<&str, f64> = HashMap::new();
    for (external, feature) in field_map.iter() {
        if !feature_names.iter().any(|name| name == feature) {
            continue;
        }
        let impute = impute_values.get(feature).copied().unwrap_or(0.0);
        mapped.insert(feature, coerce_field(fields.get(external), impute));
    }
    feature_names
        .iter()
        .map(|name| {
            mapped
                .get(name.as_str())
                .copied()
                .unwrap_or_else(|| impute_values.get(name).copied().unwrap_or(0.0))
        })
        .collect()
}
