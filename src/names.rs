use std::collections::HashSet;

use route_search::search_data::{SearchData, StopId};
use tst::TSTMap;
use unicode_normalization::UnicodeNormalization;

/// Canonical form of a stop name for matching: trimmed, NFKC-normalized and
/// case-folded, so that `"ZÜRICH HB"`, `"zürich hb"` and width or ligature
/// variants all compare equal
pub fn normalize(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let composed: String = trimmed.nfkc().collect();
    caseless::default_case_fold_str(&composed)
}

struct Entry {
    normalized: String,
    display: String,
    stop: StopId,
}

/// Station name lookup over the feed's stops.
///
/// Entries keep feed file order; a ternary search tree over the normalized
/// names serves the exact and prefix queries, substring queries scan.
pub struct StationIndex {
    entries: Vec<Entry>,
    by_name: TSTMap<Vec<usize>>,
}

impl StationIndex {
    pub fn new(data: &SearchData) -> StationIndex {
        let mut entries = Vec::new();
        let mut by_name = TSTMap::new();
        for stop in data.stops_in_order() {
            let normalized = normalize(&stop.stop_name);
            if normalized.is_empty() {
                continue;
            }
            let indices = by_name.entry(&normalized).or_insert(Vec::new());
            indices.push(entries.len());
            entries.push(Entry {
                normalized,
                display: stop.stop_name.clone(),
                stop: stop.stop_id,
            });
        }
        StationIndex { entries, by_name }
    }

    /// The stop a query names: the first stop in feed order whose normalized
    /// name equals the query, else the first whose name starts with it
    pub fn resolve_exact(&self, name: &str) -> Option<StopId> {
        let query = normalize(name);
        if query.is_empty() {
            return None;
        }
        if let Some(first) = self.by_name.get(&query).and_then(|indices| indices.first()) {
            return Some(self.entries[*first].stop);
        }
        self.by_name
            .prefix_iter(&query)
            .flat_map(|(_, indices)| indices.iter().copied())
            .min()
            .map(|index| self.entries[index].stop)
    }

    /// Display names of all stops whose normalized name equals or starts
    /// with the query: exact matches first in feed order, the rest ordered
    /// by normalized name; duplicate display names collapsed
    pub fn match_prefix(&self, name: &str) -> Vec<String> {
        let query = normalize(name);
        if query.is_empty() {
            return Vec::new();
        }
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        if let Some(indices) = self.by_name.get(&query) {
            for &index in indices {
                push_display(&self.entries[index], &mut seen, &mut result);
            }
        }
        let mut rest: Vec<(String, usize)> = Vec::new();
        for (key, indices) in self.by_name.prefix_iter(&query) {
            if key == query {
                continue;
            }
            for &index in indices {
                rest.push((key.clone(), index));
            }
        }
        rest.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        for (_, index) in rest {
            push_display(&self.entries[index], &mut seen, &mut result);
        }
        result
    }

    /// Display names of stops whose normalized name contains the query,
    /// best matches first, at most `limit` entries
    pub fn match_substring(&self, name: &str, limit: usize) -> Vec<String> {
        let query = normalize(name);
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }
        let mut ranked: Vec<(u8, u8, &str, usize)> = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            if !entry.normalized.contains(&query) {
                continue;
            }
            let exact = (entry.normalized != query) as u8;
            let prefixed = (!entry.normalized.starts_with(&query)) as u8;
            ranked.push((exact, prefixed, entry.normalized.as_str(), index));
        }
        ranked.sort();
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for (_, _, _, index) in ranked {
            push_display(&self.entries[index], &mut seen, &mut result);
            if result.len() == limit {
                break;
            }
        }
        result
    }
}

fn push_display(entry: &Entry, seen: &mut HashSet<String>, result: &mut Vec<String>) {
    if seen.insert(entry.display.clone()) {
        result.push(entry.display.clone());
    }
}
