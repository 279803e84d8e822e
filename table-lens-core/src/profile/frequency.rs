use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub value: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyResult {
    pub top_values: Vec<FrequencyEntry>,
    pub unique_count: usize,
    pub total_count: u64,
}

/// Value counts that remember first appearance for tie-breaking.
pub struct FrequencyCounter {
    index: HashMap<String, usize>,
    entries: Vec<(String, u64)>,
    total: u64,
}

impl FrequencyCounter {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
            total: 0,
        }
    }

    pub fn add(&mut self, val: &str) {
        match self.index.get(val) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(val.to_owned(), self.entries.len());
                self.entries.push((val.to_owned(), 1));
            }
        }
        self.total += 1;
    }

    pub fn unique_count(&self) -> usize {
        self.entries.len()
    }

    pub fn top_n(self, n: usize) -> FrequencyResult {
        let total = self.total;
        let unique_count = self.entries.len();
        let mut entries = self.entries;
        // stable sort keeps first-appearance order among equal counts
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        let top_values = entries
            .into_iter()
            .take(n)
            .map(|(v, c)| FrequencyEntry {
                percentage: if total > 0 {
                    c as f64 / total as f64 * 100.0
                } else {
                    0.0
                },
                value: v,
                count: c,
            })
            .collect();
        FrequencyResult {
            top_values,
            unique_count,
            total_count: total,
        }
    }
}

impl Default for FrequencyCounter {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests_frequency {
    use super::*;

    fn count(values: &[&str], n: usize) -> FrequencyResult {
        let mut c = FrequencyCounter::new();
        values.iter().for_each(|v| c.add(v));
        c.top_n(n)
    }

    #[test] fn empty() { let r = count(&[], 5); assert!(r.top_values.is_empty()); assert_eq!(r.unique_count, 0); }
    #[test] fn ordered_by_count() { let r = count(&["a", "b", "b", "c", "b", "c"], 5); let v: Vec<_> = r.top_values.iter().map(|e| e.value.as_str()).collect(); assert_eq!(v, ["b", "c", "a"]); }
    #[test] fn ties_by_first_appearance() { let r = count(&["z", "y", "x", "y", "z", "x"], 2); let v: Vec<_> = r.top_values.iter().map(|e| e.value.as_str()).collect(); assert_eq!(v, ["z", "y"]); }
    #[test] fn percentages() { let r = count(&["a", "a", "b", "c"], 5); assert_eq!(r.top_values[0].percentage, 50.0); assert_eq!(r.total_count, 4); assert_eq!(r.unique_count, 3); }
}
