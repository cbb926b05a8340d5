#![forbid(unsafe_code)]

//! Misdemeanor eligibility cascade.
//!
//! Runs after the felony resolver because its entry gate is the felony
//! outcome: if any felony conviction stayed uncleared, every undecided
//! misdemeanor is denied outright. Only the resolved stage runs ahead of
//! that gate.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use expunge_contracts::cases::{CaseKind, Disposition, Misdemeanor};
use expunge_contracts::findings::{CaseFinding, VerdictClass};
use expunge_contracts::ledger::ResultLedger;
use expunge_contracts::ContractViolation;

use crate::messages::{
    self, eligibility_date, DEFERRED_MISDEMEANOR_WAIT_DAYS, FIVE_YEAR_WAIT_DAYS,
};
use crate::outcome::assign;

/// Fines at or above this amount disqualify the small-fine fast path.
pub const SMALL_FINE_LIMIT: u32 = 501;

pub mod reason_codes {
    use expunge_contracts::ReasonCodeId;

    // Misdemeanor resolver reason-code namespace.
    pub const MISD_OK_RESOLVED: ReasonCodeId = ReasonCodeId(0x4D49_0001);
    pub const MISD_OK_DRUG_COURT: ReasonCodeId = ReasonCodeId(0x4D49_0002);
    pub const MISD_OK_SMALL_FINE: ReasonCodeId = ReasonCodeId(0x4D49_0003);
    pub const MISD_OK_FIVE_YEAR: ReasonCodeId = ReasonCodeId(0x4D49_0004);
    pub const MISD_OK_DEFERRED: ReasonCodeId = ReasonCodeId(0x4D49_0005);
    pub const MISD_OK_SOL_EXPIRED: ReasonCodeId = ReasonCodeId(0x4D49_0006);

    pub const MISD_DENY_FELONY_BLOCK: ReasonCodeId = ReasonCodeId(0x4D49_00F1);
    pub const MISD_DENY_DRUG_PROGRAM: ReasonCodeId = ReasonCodeId(0x4D49_00F2);
    pub const MISD_DENY_DRUG_FINES: ReasonCodeId = ReasonCodeId(0x4D49_00F3);
    pub const MISD_DENY_FINES: ReasonCodeId = ReasonCodeId(0x4D49_00F4);
    pub const MISD_DENY_FIVE_YEAR_WAIT: ReasonCodeId = ReasonCodeId(0x4D49_00F5);
    pub const MISD_DENY_DEFERRED_FINES: ReasonCodeId = ReasonCodeId(0x4D49_00F6);
    pub const MISD_DENY_DEFERRED_WAIT: ReasonCodeId = ReasonCodeId(0x4D49_00F7);
    pub const MISD_DENY_SOL_NOT_EXPIRED: ReasonCodeId = ReasonCodeId(0x4D49_00F8);
}

#[derive(Debug, Clone, Copy)]
pub struct MisdemeanorResolver {
    today: NaiveDate,
}

impl MisdemeanorResolver {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// `can_waive` is the felony resolver's verdict on whether every felony
    /// conviction cleared. When false, undecided misdemeanors get the
    /// blanket felony-block denial and nothing else runs.
    ///
    /// Errors when a case that needs date arithmetic carries no sentencing
    /// date; contract-constructed records never do.
    pub fn run(
        &self,
        misdemeanors: &[Misdemeanor],
        can_waive: bool,
        ledger: &mut ResultLedger,
        findings: &mut Vec<CaseFinding>,
    ) -> Result<(), ContractViolation> {
        // Stage 1: favorably resolved cases clear even when felonies block
        // the rest.
        for misdemeanor in misdemeanors {
            if ledger.contains(misdemeanor.case_id()) {
                continue;
            }
            if misdemeanor.common.resolved {
                assign(
                    ledger,
                    findings,
                    misdemeanor.case_id(),
                    CaseKind::Misdemeanor,
                    VerdictClass::Expungeable,
                    reason_codes::MISD_OK_RESOLVED,
                    messages::GRANT_RESOLVED.to_string(),
                    None,
                );
            }
        }

        // Stage 2: felony gate.
        if !can_waive {
            for misdemeanor in misdemeanors {
                if ledger.contains(misdemeanor.case_id()) {
                    continue;
                }
                assign(
                    ledger,
                    findings,
                    misdemeanor.case_id(),
                    CaseKind::Misdemeanor,
                    VerdictClass::NotExpungeable,
                    reason_codes::MISD_DENY_FELONY_BLOCK,
                    messages::DENY_FELONY_BLOCK.to_string(),
                    None,
                );
            }
            return Ok(());
        }

        // Stage 3: drug-court dismissals.
        for misdemeanor in misdemeanors {
            if ledger.contains(misdemeanor.case_id()) {
                continue;
            }
            if misdemeanor.disposition == Disposition::DrugCourtDismissed {
                self.resolve_drug_court(misdemeanor, ledger, findings);
            }
        }

        // Stage 4: dismissals and convictions.
        for misdemeanor in misdemeanors {
            if ledger.contains(misdemeanor.case_id()) {
                continue;
            }
            if misdemeanor.disposition.is_dismissal() {
                self.resolve_dismissal(misdemeanor, ledger, findings)?;
            } else {
                self.resolve_conviction(misdemeanor, ledger, findings)?;
            }
        }
        Ok(())
    }

    fn resolve_drug_court(
        &self,
        misdemeanor: &Misdemeanor,
        ledger: &mut ResultLedger,
        findings: &mut Vec<CaseFinding>,
    ) {
        if !misdemeanor.common.treatment_complete {
            assign(
                ledger,
                findings,
                misdemeanor.case_id(),
                CaseKind::Misdemeanor,
                VerdictClass::NotExpungeable,
                reason_codes::MISD_DENY_DRUG_PROGRAM,
                messages::DENY_DRUG_PROGRAM.to_string(),
                None,
            );
            return;
        }
        if !misdemeanor.common.fines_paid {
            assign(
                ledger,
                findings,
                misdemeanor.case_id(),
                CaseKind::Misdemeanor,
                VerdictClass::NotExpungeable,
                reason_codes::MISD_DENY_DRUG_FINES,
                messages::DENY_FINES_UNPAID.to_string(),
                None,
            );
            return;
        }
        assign(
            ledger,
            findings,
            misdemeanor.case_id(),
            CaseKind::Misdemeanor,
            VerdictClass::Expungeable,
            reason_codes::MISD_OK_DRUG_COURT,
            messages::GRANT_DRUG_MISDEMEANOR.to_string(),
            None,
        );
    }

    fn resolve_conviction(
        &self,
        misdemeanor: &Misdemeanor,
        ledger: &mut ResultLedger,
        findings: &mut Vec<CaseFinding>,
    ) -> Result<(), ContractViolation> {
        // Small-fine fast path: fine under the limit and no prison time.
        if misdemeanor.fine_amount < Decimal::from(SMALL_FINE_LIMIT) && !misdemeanor.imprisoned {
            if !misdemeanor.common.fines_paid {
                assign(
                    ledger,
                    findings,
                    misdemeanor.case_id(),
                    CaseKind::Misdemeanor,
                    VerdictClass::NotExpungeable,
                    reason_codes::MISD_DENY_FINES,
                    messages::DENY_FINES_UNPAID.to_string(),
                    None,
                );
                return Ok(());
            }
            assign(
                ledger,
                findings,
                misdemeanor.case_id(),
                CaseKind::Misdemeanor,
                VerdictClass::Expungeable,
                reason_codes::MISD_OK_SMALL_FINE,
                messages::GRANT_SMALL_FINE.to_string(),
                None,
            );
            return Ok(());
        }
        if !misdemeanor.common.fines_paid {
            assign(
                ledger,
                findings,
                misdemeanor.case_id(),
                CaseKind::Misdemeanor,
                VerdictClass::NotExpungeable,
                reason_codes::MISD_DENY_FINES,
                messages::DENY_FINES_UNPAID.to_string(),
                None,
            );
            return Ok(());
        }
        let sentencing = required_sentencing_date(misdemeanor)?;
        if self.days_since(sentencing) < FIVE_YEAR_WAIT_DAYS {
            let eligible_after = eligibility_date(sentencing, FIVE_YEAR_WAIT_DAYS);
            assign(
                ledger,
                findings,
                misdemeanor.case_id(),
                CaseKind::Misdemeanor,
                VerdictClass::NotExpungeable,
                reason_codes::MISD_DENY_FIVE_YEAR_WAIT,
                messages::deny_misdemeanor_five_year(eligible_after),
                Some(eligible_after),
            );
            return Ok(());
        }
        assign(
            ledger,
            findings,
            misdemeanor.case_id(),
            CaseKind::Misdemeanor,
            VerdictClass::Expungeable,
            reason_codes::MISD_OK_FIVE_YEAR,
            messages::GRANT_MISDEMEANOR_FIVE_YEAR.to_string(),
            None,
        );
        Ok(())
    }

    fn resolve_dismissal(
        &self,
        misdemeanor: &Misdemeanor,
        ledger: &mut ResultLedger,
        findings: &mut Vec<CaseFinding>,
    ) -> Result<(), ContractViolation> {
        if misdemeanor.disposition == Disposition::Deferred {
            if !misdemeanor.common.fines_paid {
                assign(
                    ledger,
                    findings,
                    misdemeanor.case_id(),
                    CaseKind::Misdemeanor,
                    VerdictClass::NotExpungeable,
                    reason_codes::MISD_DENY_DEFERRED_FINES,
                    messages::DENY_DEFERRED_FINES.to_string(),
                    None,
                );
                return Ok(());
            }
            let sentencing = required_sentencing_date(misdemeanor)?;
            if self.days_since(sentencing) < DEFERRED_MISDEMEANOR_WAIT_DAYS {
                let eligible_after = eligibility_date(sentencing, DEFERRED_MISDEMEANOR_WAIT_DAYS);
                assign(
                    ledger,
                    findings,
                    misdemeanor.case_id(),
                    CaseKind::Misdemeanor,
                    VerdictClass::NotExpungeable,
                    reason_codes::MISD_DENY_DEFERRED_WAIT,
                    messages::deny_deferred_one_year(eligible_after),
                    Some(eligible_after),
                );
                return Ok(());
            }
            assign(
                ledger,
                findings,
                misdemeanor.case_id(),
                CaseKind::Misdemeanor,
                VerdictClass::Expungeable,
                reason_codes::MISD_OK_DEFERRED,
                messages::GRANT_DEFERRED.to_string(),
                None,
            );
            return Ok(());
        }
        if !misdemeanor.common.expir_no_risk {
            assign(
                ledger,
                findings,
                misdemeanor.case_id(),
                CaseKind::Misdemeanor,
                VerdictClass::NotExpungeable,
                reason_codes::MISD_DENY_SOL_NOT_EXPIRED,
                messages::DENY_SOL_NOT_EXPIRED.to_string(),
                None,
            );
            return Ok(());
        }
        assign(
            ledger,
            findings,
            misdemeanor.case_id(),
            CaseKind::Misdemeanor,
            VerdictClass::Expungeable,
            reason_codes::MISD_OK_SOL_EXPIRED,
            messages::GRANT_SOL_EXPIRED.to_string(),
            None,
        );
        Ok(())
    }

    fn days_since(&self, date: NaiveDate) -> i64 {
        (self.today - date).num_days()
    }
}

fn required_sentencing_date(misdemeanor: &Misdemeanor) -> Result<NaiveDate, ContractViolation> {
    misdemeanor
        .common
        .sentencing_date
        .ok_or(ContractViolation::MissingField {
            field: "misdemeanor.sentencing_date",
            reason: "required for every disposition except a dismissal",
        })
}
