//! Combines adapter outputs into one submission and derives its hashes.
//!
//! Entries are grouped by date. Several sources may report the same day; all
//! distinct entries are kept and the service decides how to reconcile them.
//! Hashes are SHA-256 over the exact serialized bytes that go on the wire, so
//! identical content always produces the identical idempotency key.

use crate::sync_plan::DateRange;
use crate::usage::{AdapterOutput, CanonicalUsageEntry, UsageSource};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionEntry {
    pub date: NaiveDate,
    pub source: UsageSource,
    pub data: CanonicalUsageEntry,
    /// Hash of the serialized `data`.
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub entries: Vec<SubmissionEntry>,
    /// Hash of the serialized `entries` array; the batch idempotency key.
    pub hash: String,
}

impl SubmitRequest {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.entries.iter().map(|e| e.date).collect();
        dates.dedup();
        dates
    }

    pub fn total_cost(&self) -> f64 {
        self.entries.iter().map(|e| e.data.cost_usd).sum()
    }

    pub fn total_tokens(&self) -> u64 {
        self.entries.iter().map(|e| e.data.total_tokens).sum()
    }
}

/// Builds the submission for `range` from every adapter's output.
pub fn build_submission(outputs: &[AdapterOutput], range: &DateRange) -> Result<SubmitRequest> {
    let mut by_date: BTreeMap<NaiveDate, Vec<(UsageSource, &CanonicalUsageEntry)>> =
        BTreeMap::new();

    for output in outputs {
        for entry in output.entries.iter().filter(|e| range.contains(e.date)) {
            let day = by_date.entry(entry.date).or_default();
            let duplicate = day
                .iter()
                .any(|(source, existing)| *source == output.source && *existing == entry);
            if duplicate {
                tracing::debug!("Dropping duplicate {} entry for {}", output.source, entry.date);
                continue;
            }
            day.push((output.source, entry));
        }
    }

    let mut entries = Vec::new();
    for (date, day) in by_date {
        if day.len() > 1 {
            tracing::debug!("{} has {} entries from multiple reports", date, day.len());
        }
        for (source, data) in day {
            entries.push(SubmissionEntry {
                date,
                source,
                data: data.clone(),
                hash: content_hash(data)?,
            });
        }
    }

    let hash = content_hash(&entries)?;
    Ok(SubmitRequest { entries, hash })
}

/// Lowercase hex SHA-256 of the value's JSON serialization.
pub fn content_hash<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let bytes = serde_json::to_vec(value).context("Failed to serialize usage payload")?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn entry(date: NaiveDate, cost: f64) -> CanonicalUsageEntry {
        CanonicalUsageEntry {
            date,
            models: vec!["model-a".to_string()],
            input_tokens: 10,
            output_tokens: 20,
            cache_creation_tokens: 0,
            cache_read_tokens: 5,
            total_tokens: 35,
            cost_usd: cost,
        }
    }

    fn output(source: UsageSource, entries: Vec<CanonicalUsageEntry>) -> AdapterOutput {
        AdapterOutput {
            source,
            entries,
        }
    }

    fn window() -> DateRange {
        DateRange {
            start: day(12),
            end: day(14),
        }
    }

    #[test]
    fn test_entries_are_grouped_by_date_in_order() {
        let outputs = vec![
            output(UsageSource::Claude, vec![entry(day(14), 1.0), entry(day(12), 2.0)]),
            output(UsageSource::Codex, vec![entry(day(13), 3.0)]),
        ];
        let request = build_submission(&outputs, &window()).unwrap();

        let dates: Vec<NaiveDate> = request.entries.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![day(12), day(13), day(14)]);
        assert_eq!(request.dates(), vec![day(12), day(13), day(14)]);
    }

    #[test]
    fn test_same_date_from_two_sources_keeps_both() {
        let outputs = vec![
            output(UsageSource::Claude, vec![entry(day(14), 1.0)]),
            output(UsageSource::Codex, vec![entry(day(14), 1.0)]),
        ];
        let request = build_submission(&outputs, &window()).unwrap();

        assert_eq!(request.entries.len(), 2);
        assert_eq!(request.entries[0].source, UsageSource::Claude);
        assert_eq!(request.entries[1].source, UsageSource::Codex);
        assert!((request.total_cost() - 2.0).abs() < f64::EPSILON);
        assert_eq!(request.total_tokens(), 70);
    }

    #[test]
    fn test_exact_duplicates_from_one_source_collapse() {
        let outputs = vec![output(
            UsageSource::Claude,
            vec![entry(day(14), 1.0), entry(day(14), 1.0), entry(day(14), 4.0)],
        )];
        let request = build_submission(&outputs, &window()).unwrap();
        assert_eq!(request.entries.len(), 2);
    }

    #[test]
    fn test_entries_outside_window_are_dropped() {
        let outputs = vec![output(
            UsageSource::Claude,
            vec![entry(day(1), 1.0), entry(day(15), 1.0), entry(day(13), 1.0)],
        )];
        let request = build_submission(&outputs, &window()).unwrap();
        assert_eq!(request.entries.len(), 1);
        assert_eq!(request.entries[0].date, day(13));
    }

    #[test]
    fn test_hash_is_deterministic() {
        let outputs = vec![output(UsageSource::Claude, vec![entry(day(14), 1.5)])];
        let first = build_submission(&outputs, &window()).unwrap();
        let second = build_submission(&outputs, &window()).unwrap();

        assert_eq!(first.hash, second.hash);
        assert_eq!(first.hash.len(), 64);
        assert!(first.hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = build_submission(
            &[output(UsageSource::Claude, vec![entry(day(14), 1.5)])],
            &window(),
        )
        .unwrap();
        let b = build_submission(
            &[output(UsageSource::Claude, vec![entry(day(14), 1.6)])],
            &window(),
        )
        .unwrap();

        assert_ne!(a.hash, b.hash);
        assert_ne!(a.entries[0].hash, b.entries[0].hash);
    }

    #[test]
    fn test_hashes_cover_serialized_bytes() {
        let request = build_submission(
            &[output(UsageSource::Codex, vec![entry(day(13), 0.25)])],
            &window(),
        )
        .unwrap();

        let data_bytes = serde_json::to_vec(&request.entries[0].data).unwrap();
        assert_eq!(request.entries[0].hash, hex::encode(Sha256::digest(&data_bytes)));

        let entries_bytes = serde_json::to_vec(&request.entries).unwrap();
        assert_eq!(request.hash, hex::encode(Sha256::digest(&entries_bytes)));
        assert_eq!(request.hash.len(), 64);
        assert!(request
            .hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_empty_outputs_give_empty_request() {
        let request = build_submission(&[], &window()).unwrap();
        assert!(request.is_empty());
        assert_eq!(request.hash, content_hash(&Vec::<SubmissionEntry>::new()).unwrap());
    }

    #[test]
    fn test_wire_shape() {
        let request = build_submission(
            &[output(UsageSource::Claude, vec![entry(day(14), 1.0)])],
            &window(),
        )
        .unwrap();
        let json = serde_json::to_value(&request).unwrap();

        let first = &json["entries"][0];
        assert_eq!(first["date"], "2026-03-14");
        assert_eq!(first["source"], "claude");
        assert_eq!(first["data"]["inputTokens"], 10);
        assert_eq!(first["data"]["cacheReadTokens"], 5);
        assert_eq!(first["data"]["costUSD"], 1.0);
        assert!(json["hash"].is_string());
    }
}
