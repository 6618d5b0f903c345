//! Execution results: per-shot register values and aggregated counts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-shot values of one memory region: `rows[shot][index]`.
pub type Readout = Vec<Vec<i64>>;

/// Memory contents captured at the end of every shot, keyed by region name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterMap(BTreeMap<String, Readout>);

impl RegisterMap {
    /// Create an empty register map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows recorded for a region.
    pub fn get(&self, name: &str) -> Option<&Readout> {
        self.0.get(name)
    }

    /// Append one shot's values for a region.
    pub fn push_row(&mut self, name: &str, row: Vec<i64>) {
        self.0.entry(name.to_string()).or_default().push(row);
    }

    /// Region names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Readout)> for RegisterMap {
    fn from_iter<I: IntoIterator<Item = (String, Readout)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Measurement outcome histogram, keyed by bitstring.
///
/// Bitstrings list element 0 first, so `"01"` means `ro[0] = 0, ro[1] = 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts(BTreeMap<String, u64>);

impl Counts {
    /// Create an empty histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a histogram from readout rows.
    pub fn from_rows(rows: &[Vec<i64>]) -> Self {
        let mut counts = Self::new();
        for row in rows {
            let bitstring: String = row
                .iter()
                .map(|&v| if v == 0 { '0' } else { '1' })
                .collect();
            counts.insert(bitstring, 1);
        }
        counts
    }

    /// Add `count` observations of `bitstring`.
    pub fn insert(&mut self, bitstring: impl Into<String>, count: u64) {
        *self.0.entry(bitstring.into()).or_insert(0) += count;
    }

    /// Count for a bitstring (0 if never observed).
    pub fn get(&self, bitstring: &str) -> u64 {
        self.0.get(bitstring).copied().unwrap_or(0)
    }

    /// Total number of observations.
    pub fn total_shots(&self) -> u64 {
        self.0.values().sum()
    }

    /// Outcomes sorted by descending count, ties by bitstring.
    pub fn sorted(&self) -> Vec<(&String, &u64)> {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// The most frequent outcome.
    pub fn most_frequent(&self) -> Option<(&String, &u64)> {
        self.sorted().into_iter().next()
    }

    /// Number of distinct outcomes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the histogram is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of executing a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Number of shots executed.
    pub shots: u32,
    /// Memory captured at the end of each shot.
    pub registers: RegisterMap,
    /// Wall time of the execution in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    /// Backend-specific extras.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ExecutionResult {
    /// Create a result.
    pub fn new(registers: RegisterMap, shots: u32) -> Self {
        Self {
            shots,
            registers,
            execution_time_ms: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Set the execution time.
    #[must_use]
    pub fn with_execution_time(mut self, ms: u64) -> Self {
        self.execution_time_ms = Some(ms);
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// All recorded regions.
    pub fn get_register_map(&self) -> &RegisterMap {
        &self.registers
    }

    /// Rows recorded for `name`; empty when the region was never declared.
    pub fn readout(&self, name: &str) -> &[Vec<i64>] {
        self.registers.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Histogram of the rows recorded for `name`.
    pub fn counts(&self, name: &str) -> Counts {
        Counts::from_rows(self.readout(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> ExecutionResult {
        let mut registers = RegisterMap::new();
        registers.push_row("ro", vec![0, 1]);
        registers.push_row("ro", vec![1, 1]);
        registers.push_row("ro", vec![0, 1]);
        ExecutionResult::new(registers, 3)
    }

    #[test]
    fn test_readout_rows() {
        let result = sample_result();
        assert_eq!(result.readout("ro").len(), 3);
        assert_eq!(result.readout("ro")[1], vec![1, 1]);
        assert!(result.readout("missing").is_empty());
    }

    #[test]
    fn test_counts_from_rows() {
        let counts = sample_result().counts("ro");
        assert_eq!(counts.get("01"), 2);
        assert_eq!(counts.get("11"), 1);
        assert_eq!(counts.get("00"), 0);
        assert_eq!(counts.total_shots(), 3);
        assert_eq!(counts.most_frequent(), Some((&"01".to_string(), &2)));
    }

    #[test]
    fn test_counts_sorted_breaks_ties_by_bitstring() {
        let mut counts = Counts::new();
        counts.insert("11", 5);
        counts.insert("00", 5);
        counts.insert("01", 9);
        let order: Vec<&str> = counts.sorted().into_iter().map(|(b, _)| b.as_str()).collect();
        assert_eq!(order, vec!["01", "00", "11"]);
    }

    #[test]
    fn test_result_json_roundtrip() {
        let result = sample_result()
            .with_execution_time(12)
            .with_metadata("backend", serde_json::json!("2q-qvm"));
        let json = serde_json::to_string(&result).unwrap();
        let back: ExecutionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
        assert_eq!(back.get_register_map().names().collect::<Vec<_>>(), vec!["ro"]);
    }
}
