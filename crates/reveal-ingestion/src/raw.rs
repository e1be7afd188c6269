// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Normalization of loosely typed dataset rows.

Rows come from spreadsheets exported to JSON, so the same concept appears under
several keys and booleans arrive as `true`, `"true"`, `1` or `"1"`. Everything is
turned into one canonical [`Record`] here; nothing downstream looks at raw rows.
*/

use reveal_structures::{LngLat, Record};
use serde_json::{Map, Value};
use tracing::warn;

/// Keys tried, in order, for the name fragment of the stable identifier
pub const NAME_FRAGMENT_KEYS: [&str; 3] = ["Nombre_placa", "Nombre_placafinal", "Nombre"];

/// Keys tried, in order, for the caption label
pub const LABEL_KEYS: [&str; 4] = ["Nombre_placafinal", "Nombre", "Nombre_placa", "razonSocial"];

pub const LOCALITY_KEYS: [&str; 2] = ["Localidad", "localidad"];

/// Label used when a row has no usable name
pub const FALLBACK_LABEL: &str = "—";

/// A dataset row after normalization
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    /// Campaign identifier, distinct from the stable identifier
    pub numeric_id: u32,
    pub record: Record,
    pub active: bool,
}

/// Non-empty text under `key`; numbers are rendered as text
fn text(row: &Map<String, Value>, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_text(row: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| text(row, k))
}

fn coordinate(row: &Map<String, Value>, key: &str) -> Option<f64> {
    let v = match row.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// `true`, `"true"`, `1` and `"1"` are active; anything else is not
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        Some(Value::String(s)) => matches!(s.trim(), "true" | "1"),
        _ => false,
    }
}

fn numeric_id(row: &Map<String, Value>) -> Option<u32> {
    match row.get("id")? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Normalize a single row. `index` is the row position, used when it has no numeric id.
pub fn normalize_row(value: &Value, index: usize) -> Option<NormalizedRow> {
    let Some(row) = value.as_object() else {
        warn!(target: "reveal-ingestion", "Row {} is not an object, skipped", index);
        return None;
    };

    let (lat, lng) = match (coordinate(row, "lat"), coordinate(row, "lng")) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => {
            warn!(target: "reveal-ingestion", "Row {} has missing or non-finite coordinates, skipped", index);
            return None;
        }
    };
    let coords = match LngLat::checked(lat, lng) {
        Ok(c) => c,
        Err(e) => {
            warn!(target: "reveal-ingestion", "Row {} skipped: {}", index, e);
            return None;
        }
    };

    let numeric_id = numeric_id(row).unwrap_or_else(|| u32::try_from(index).unwrap_or(u32::MAX));
    let name_fragment = first_text(row, &NAME_FRAGMENT_KEYS).unwrap_or_default();
    let label = first_text(row, &LABEL_KEYS).unwrap_or_else(|| FALLBACK_LABEL.to_string());

    let mut record = Record::new(numeric_id.to_string(), label, coords).with_name_fragment(name_fragment);
    if let Some(locality) = first_text(row, &LOCALITY_KEYS) {
        record = record.with_locality(locality);
    }

    Some(NormalizedRow {
        numeric_id,
        record,
        active: is_truthy(row.get("activo")),
    })
}

/// Normalize every row, dropping the unusable ones
pub fn normalize_rows(rows: &[Value]) -> Vec<NormalizedRow> {
    rows.iter()
        .enumerate()
        .filter_map(|(i, v)| normalize_row(v, i))
        .collect()
}
