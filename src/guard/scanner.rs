use std::time::Instant;

use serde::Serialize;

use super::registry::PatternRegistry;

/// Outcome of scanning one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanResult {
    pub matched: bool,
    /// Time from request entry to decision, in milliseconds rounded to two decimals.
    pub elapsed_ms: f64,
    /// Index of the first rule that matched.
    pub matched_rule: Option<usize>,
}

impl ScanResult {
    /// Elapsed time formatted with exactly two decimals, as used in responses.
    pub fn elapsed_display(&self) -> String {
        format!("{:.2}", self.elapsed_ms)
    }
}

/// Evaluates scan targets against a [`PatternRegistry`].
pub struct ThreatScanner;

impl ThreatScanner {
    /// Check `target` against every rule in order; the first match wins.
    ///
    /// `started_at` marks request entry so the reported time covers sampling
    /// as well as the scan itself.
    pub fn scan(target: &str, registry: &PatternRegistry, started_at: Instant) -> ScanResult {
        let matched_rule = registry
            .rules()
            .iter()
            .position(|rule| rule.is_match(target));

        ScanResult {
            matched: matched_rule.is_some(),
            elapsed_ms: elapsed_ms(started_at),
            matched_rule,
        }
    }

    /// Indices of all rules that match `target`. Diagnostic only; blocking
    /// decisions go through [`ThreatScanner::scan`].
    pub fn matching_rules(target: &str, registry: &PatternRegistry) -> Vec<usize> {
        registry
            .rules()
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.is_match(target))
            .map(|(index, _)| index)
            .collect()
    }
}

fn elapsed_ms(started_at: Instant) -> f64 {
    let ms = started_at.elapsed().as_secs_f64() * 1000.0;
    (ms * 100.0).round() / 100.0
}
