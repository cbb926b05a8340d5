#![forbid(unsafe_code)]

use expunge_contracts::cases::{Arrest, CaseKind};
use expunge_contracts::findings::{CaseFinding, VerdictClass};
use expunge_contracts::ledger::ResultLedger;

use crate::messages;
use crate::outcome::assign;

pub mod reason_codes {
    use expunge_contracts::ReasonCodeId;

    // Arrest resolver reason-code namespace.
    pub const ARREST_OK_NO_CHARGES: ReasonCodeId = ReasonCodeId(0x4152_0001);
}

/// Arrest-only cases are expungeable unconditionally: no charges were ever
/// filed. Pure apart from the ledger writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrestResolver;

impl ArrestResolver {
    pub fn run(
        &self,
        arrests: &[Arrest],
        ledger: &mut ResultLedger,
        findings: &mut Vec<CaseFinding>,
    ) {
        for arrest in arrests {
            assign(
                ledger,
                findings,
                arrest.case_id(),
                CaseKind::Arrest,
                VerdictClass::Expungeable,
                reason_codes::ARREST_OK_NO_CHARGES,
                messages::GRANT_ARREST.to_string(),
                None,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expunge_contracts::cases::{CaseCommon, CaseId};

    fn arrest(case_id: &str) -> Arrest {
        Arrest::v1(
            CaseCommon::v1(
                CaseId(case_id.to_string()),
                "Tulsa PD".to_string(),
                "Tulsa County District Court".to_string(),
                true,
                None,
                false,
                false,
                false,
            )
            .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn at_arrest_01_every_arrest_is_granted() {
        let mut ledger = ResultLedger::new();
        let mut findings = Vec::new();
        ArrestResolver.run(&[arrest("AR-1"), arrest("AR-2")], &mut ledger, &mut findings);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get(&CaseId("AR-1".to_string())), Some(messages::GRANT_ARREST));
        assert!(findings
            .iter()
            .all(|f| f.verdict == VerdictClass::Expungeable));
    }

    #[test]
    fn at_arrest_02_rerun_is_idempotent() {
        let mut ledger = ResultLedger::new();
        let mut findings = Vec::new();
        let cases = [arrest("AR-1")];
        ArrestResolver.run(&cases, &mut ledger, &mut findings);
        let before = ledger.clone();
        ArrestResolver.run(&cases, &mut ledger, &mut findings);
        assert_eq!(ledger, before);
        assert_eq!(findings.len(), 1);
    }
}
