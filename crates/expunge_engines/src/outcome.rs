#![forbid(unsafe_code)]

use chrono::NaiveDate;
use expunge_contracts::cases::{CaseId, CaseKind};
use expunge_contracts::findings::{CaseFinding, VerdictClass};
use expunge_contracts::ledger::ResultLedger;
use expunge_contracts::ReasonCodeId;

/// Writes one verdict through the first-writer-wins ledger and mirrors it
/// into the structured findings. Returns whether the write landed; a `false`
/// return means an earlier stage already decided this case and the attempt
/// is a no-op.
pub(crate) fn assign(
    ledger: &mut ResultLedger,
    findings: &mut Vec<CaseFinding>,
    case_id: &CaseId,
    kind: CaseKind,
    verdict: VerdictClass,
    reason_code: ReasonCodeId,
    message: String,
    re_eligibility_date: Option<NaiveDate>,
) -> bool {
    if !ledger.record(case_id, message.clone()) {
        return false;
    }
    let finding = CaseFinding::v1(
        case_id.clone(),
        kind,
        verdict,
        reason_code,
        message,
        re_eligibility_date,
    )
    .expect("CaseFinding::v1 must construct for canned messages");
    findings.push(finding);
    true
}
