#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cases::CaseId;

/// Case-identifier to verdict mapping shared across the resolver sequence.
///
/// Writes are first-writer-wins: once a case has a verdict, later resolver
/// stages cannot overwrite it. Every stage guard and write is keyed by
/// `CaseId`, so the invariant is structural rather than a per-stage
/// bookkeeping convention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultLedger {
    entries: BTreeMap<CaseId, String>,
}

impl ResultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a verdict unless the case already has one. Returns whether
    /// the write landed.
    pub fn record(&mut self, case_id: &CaseId, verdict: impl Into<String>) -> bool {
        if self.entries.contains_key(case_id) {
            return false;
        }
        self.entries.insert(case_id.clone(), verdict.into());
        true
    }

    pub fn contains(&self, case_id: &CaseId) -> bool {
        self.entries.contains_key(case_id)
    }

    pub fn get(&self, case_id: &CaseId) -> Option<&str> {
        self.entries.get(case_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CaseId, &str)> {
        self.entries.iter().map(|(id, v)| (id, v.as_str()))
    }

    pub fn into_entries(self) -> BTreeMap<CaseId, String> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> CaseId {
        CaseId(s.to_string())
    }

    #[test]
    fn ledger_contract_01_first_writer_wins() {
        let mut ledger = ResultLedger::new();
        assert!(ledger.record(&id("CF-1"), "Expungeable."));
        assert!(!ledger.record(&id("CF-1"), "Not expungeable."));
        assert_eq!(ledger.get(&id("CF-1")), Some("Expungeable."));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn ledger_contract_02_distinct_cases_do_not_collide() {
        let mut ledger = ResultLedger::new();
        assert!(ledger.record(&id("CF-1"), "a"));
        assert!(ledger.record(&id("CM-1"), "b"));
        assert_eq!(ledger.len(), 2);
    }
}
