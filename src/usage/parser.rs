//! Normalizes a tool's JSON report into canonical entries.
//!
//! Parsing never fails: bad JSON, an unexpected top-level shape or an
//! unusable row simply produce fewer (possibly zero) entries.

use super::dialect::Dialect;
use super::CanonicalUsageEntry;
use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Date layouts seen in tool output, ISO first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%m/%d/%Y",
];

pub fn parse_report(raw: &str, dialect: &Dialect) -> Vec<CanonicalUsageEntry> {
    let value: Value = match serde_json::from_str(raw.trim()) {
        Ok(value) => value,
        Err(e) => {
            if !raw.trim().is_empty() {
                tracing::debug!("Usage report is not valid JSON: {}", e);
            }
            return Vec::new();
        }
    };

    let Some(rows) = value.get(dialect.rows_key).and_then(Value::as_array) else {
        tracing::debug!(
            "Usage report has no `{}` array at the top level",
            dialect.rows_key
        );
        return Vec::new();
    };

    rows.iter()
        .filter_map(Value::as_object)
        .filter_map(|row| parse_row(row, dialect))
        .collect()
}

fn parse_row(row: &Map<String, Value>, dialect: &Dialect) -> Option<CanonicalUsageEntry> {
    let date = first_field(row, dialect.date_fields)
        .and_then(Value::as_str)
        .and_then(normalize_date);
    let Some(date) = date else {
        tracing::debug!("Skipping usage row without a recognizable date");
        return None;
    };

    let cost = first_field(row, dialect.cost_fields)
        .and_then(Value::as_f64)
        .filter(|cost| cost.is_finite() && *cost >= 0.0);
    let Some(cost_usd) = cost else {
        tracing::debug!("Skipping usage row for {} without a numeric cost", date);
        return None;
    };

    let input_tokens = token_count(row, dialect.input_fields);
    let output_tokens = token_count(row, dialect.output_fields);
    let cache_creation_tokens = token_count(row, dialect.cache_creation_fields);
    let cache_read_tokens = token_count(row, dialect.cache_read_fields);
    let component_sum = input_tokens
        .saturating_add(output_tokens)
        .saturating_add(cache_creation_tokens)
        .saturating_add(cache_read_tokens);

    let total_tokens = match first_field(row, dialect.total_fields).and_then(as_token_count) {
        Some(total) => {
            if total != component_sum {
                tracing::debug!(
                    "Data quality: {} reports totalTokens={} but components sum to {}",
                    date,
                    total,
                    component_sum
                );
            }
            total
        }
        None => component_sum,
    };

    Some(CanonicalUsageEntry {
        date,
        models: first_field(row, dialect.model_fields)
            .map(model_names)
            .unwrap_or_default(),
        input_tokens,
        output_tokens,
        cache_creation_tokens,
        cache_read_tokens,
        total_tokens,
        cost_usd,
    })
}

/// Accepts ISO dates, ISO timestamps and the locale strings tools print.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.split('T').next().unwrap_or(trimmed);

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        })
}

/// Model ids from either `["a", "b"]` or `{"a": {...}, "b": {...}}`.
fn model_names(value: &Value) -> Vec<String> {
    let mut names: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    };
    names.retain(|name| !name.is_empty());
    let mut seen = std::collections::HashSet::new();
    names.retain(|name| seen.insert(name.clone()));
    names
}

fn first_field<'a>(row: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .find_map(|field| row.get(*field).filter(|v| !v.is_null()))
}

fn token_count(row: &Map<String, Value>, fields: &[&str]) -> u64 {
    first_field(row, fields).and_then(as_token_count).unwrap_or(0)
}

fn as_token_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n.round() as u64)
    })
}

#[cfg(test)]
#[path = "tests/parser_tests.rs"]
mod tests;
