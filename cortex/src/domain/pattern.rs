// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Recurring-pattern extraction used by consolidation.
//!
//! Two episodes share a pattern when their inputs normalize to the same key
//! (lowercased, whitespace collapsed). A pattern's value is the output of its
//! most recent episode.

use std::collections::BTreeMap;

use crate::domain::memory::InteractionRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub key: String,
    pub value: String,
    pub occurrences: u64,
}

pub fn pattern_key(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Patterns seen at least `min_occurrences` times, ordered by key.
///
/// `records` must be oldest first. Blank inputs never form a pattern.
pub fn extract_patterns<'a>(
    records: impl IntoIterator<Item = &'a InteractionRecord>,
    min_occurrences: usize,
) -> Vec<Pattern> {
    let mut seen: BTreeMap<String, Pattern> = BTreeMap::new();

    for record in records {
        let key = pattern_key(&record.input);
        if key.is_empty() {
            continue;
        }
        seen.entry(key.clone())
            .and_modify(|p| {
                p.value = record.output.clone();
                p.occurrences += 1;
            })
            .or_insert_with(|| Pattern {
                key,
                value: record.output.clone(),
                occurrences: 1,
            });
    }

    let min = min_occurrences.max(1) as u64;
    seen.into_values().filter(|p| p.occurrences >= min).collect()
}
