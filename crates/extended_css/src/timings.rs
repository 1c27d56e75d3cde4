//! Per-rule matching statistics for debug output.

use core::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;

/// Accumulated matching cost of one rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RuleTiming {
    /// Apply passes that evaluated the rule.
    pub runs: u64,
    /// Elements matched by the latest pass.
    pub matched: usize,
    pub last_micros: u64,
    pub total_micros: u64,
}

#[derive(Serialize)]
struct RuleReport<'stats> {
    selector: &'stats str,
    #[serde(flatten)]
    timing: &'stats RuleTiming,
}

#[derive(Debug, Default)]
pub(crate) struct TimingStats {
    rules: IndexMap<String, RuleTiming>,
}

impl TimingStats {
    pub(crate) fn record(&mut self, selector: &str, elapsed: Duration, matched: usize) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        let entry = self.rules.entry(selector.to_owned()).or_default();
        entry.runs = entry.runs.saturating_add(1);
        entry.matched = matched;
        entry.last_micros = micros;
        entry.total_micros = entry.total_micros.saturating_add(micros);
    }

    pub(crate) fn get(&self, selector: &str) -> Option<&RuleTiming> {
        self.rules.get(selector)
    }

    /// JSON array with one object per selector that has statistics.
    pub(crate) fn report(&self, selectors: &[&str]) -> serde_json::Result<String> {
        let entries: Vec<RuleReport<'_>> = selectors
            .iter()
            .filter_map(|selector| {
                self.rules
                    .get_key_value(*selector)
                    .map(|(key, timing)| RuleReport {
                        selector: key,
                        timing,
                    })
            })
            .collect();
        serde_json::to_string(&entries)
    }

    pub(crate) fn clear(&mut self) {
        self.rules.clear();
    }
}
