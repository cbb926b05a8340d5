#![forbid(unsafe_code)]

//! Felony eligibility cascade.
//!
//! Stages run in fixed precedence over the whole felony set, each skipping
//! cases the ledger has already decided: favorably-resolved, reclassified,
//! drug-court, the global >2-convictions gate, the per-conviction cascade,
//! then either the blanket uncleared-convictions denial or the dismissal
//! cascade. The resolver also produces the signal that gates whether
//! misdemeanors may be considered at all.

use chrono::NaiveDate;

use expunge_contracts::cases::{CaseKind, Disposition, Felony, Misdemeanor};
use expunge_contracts::findings::{CaseFinding, VerdictClass};
use expunge_contracts::ledger::ResultLedger;
use expunge_contracts::ContractViolation;

use crate::messages::{
    self, eligibility_date, FIVE_YEAR_WAIT_DAYS, RECLASSIFIED_WAIT_DAYS,
    SEVEN_YEAR_LOOKBACK_DAYS, TEN_YEAR_WAIT_DAYS,
};
use crate::outcome::assign;
use crate::statute_match::StatuteMatcher;
use expunge_contracts::statutes::StatuteListId;

pub mod reason_codes {
    use expunge_contracts::ReasonCodeId;

    // Felony resolver reason-code namespace.
    pub const FEL_OK_RESOLVED: ReasonCodeId = ReasonCodeId(0x4645_0001);
    pub const FEL_OK_RECLASSIFIED: ReasonCodeId = ReasonCodeId(0x4645_0002);
    pub const FEL_OK_DRUG_COURT: ReasonCodeId = ReasonCodeId(0x4645_0003);
    pub const FEL_OK_NONVIOLENT: ReasonCodeId = ReasonCodeId(0x4645_0004);
    pub const FEL_OK_TEN_YEAR: ReasonCodeId = ReasonCodeId(0x4645_0005);
    pub const FEL_OK_SOL_EXPIRED: ReasonCodeId = ReasonCodeId(0x4645_0006);

    pub const FEL_DENY_RECLASSIFIED_WAIT: ReasonCodeId = ReasonCodeId(0x4645_00F1);
    pub const FEL_DENY_RECLASSIFIED_FINES: ReasonCodeId = ReasonCodeId(0x4645_00F2);
    pub const FEL_DENY_RECLASSIFIED_TREATMENT: ReasonCodeId = ReasonCodeId(0x4645_00F3);
    pub const FEL_DENY_DRUG_PROGRAM: ReasonCodeId = ReasonCodeId(0x4645_00F4);
    pub const FEL_DENY_DRUG_FINES: ReasonCodeId = ReasonCodeId(0x4645_00F5);
    pub const FEL_DENY_TOO_MANY_CONVICTIONS: ReasonCodeId = ReasonCodeId(0x4645_00F6);
    pub const FEL_DENY_MULTIPLE_CONVICTIONS: ReasonCodeId = ReasonCodeId(0x4645_00F7);
    pub const FEL_DENY_RECENT_MISDEMEANORS: ReasonCodeId = ReasonCodeId(0x4645_00F8);
    pub const FEL_DENY_VIOLENT_571: ReasonCodeId = ReasonCodeId(0x4645_00F9);
    pub const FEL_DENY_FINES: ReasonCodeId = ReasonCodeId(0x4645_00FA);
    pub const FEL_DENY_FIVE_YEAR_WAIT: ReasonCodeId = ReasonCodeId(0x4645_00FB);
    pub const FEL_DENY_FINES_WAIVER_PATH: ReasonCodeId = ReasonCodeId(0x4645_00FC);
    pub const FEL_DENY_PARDON_PATH: ReasonCodeId = ReasonCodeId(0x4645_00FD);
    pub const FEL_DENY_TOO_MANY_COUNTS: ReasonCodeId = ReasonCodeId(0x4645_00FE);
    pub const FEL_DENY_SECTION_13_OR_SORA: ReasonCodeId = ReasonCodeId(0x4645_00FF);
    pub const FEL_DENY_SOL_NOT_EXPIRED: ReasonCodeId = ReasonCodeId(0x4645_00E1);
    pub const FEL_DENY_UNCLEARED_CONVICTIONS: ReasonCodeId = ReasonCodeId(0x4645_00E2);
}

#[derive(Debug, Clone)]
pub struct FelonyResolver {
    today: NaiveDate,
    misdemeanor_conviction_dates: Vec<NaiveDate>,
}

impl FelonyResolver {
    /// Misdemeanors are needed up front because the conviction cascade's
    /// 7-year lookback is over misdemeanor conviction dates.
    pub fn new(today: NaiveDate, misdemeanors: &[Misdemeanor]) -> Self {
        let misdemeanor_conviction_dates = misdemeanors
            .iter()
            .filter(|m| m.is_convicted())
            .filter_map(|m| m.common.sentencing_date)
            .collect();
        Self {
            today,
            misdemeanor_conviction_dates,
        }
    }

    /// Runs the full cascade. Returns `can_waive_misdemeanors`: whether every
    /// felony conviction cleared, which gates the misdemeanor resolver.
    ///
    /// Errors when a case that needs date arithmetic carries no sentencing
    /// date. Contract-constructed records never do; a hand-assembled record
    /// surfaces the violation instead of a wrong verdict.
    pub fn run(
        &self,
        felonies: &[Felony],
        matcher: &dyn StatuteMatcher,
        ledger: &mut ResultLedger,
        findings: &mut Vec<CaseFinding>,
    ) -> Result<bool, ContractViolation> {
        let mut conviction_count = felonies.iter().filter(|f| f.is_convicted()).count();

        // Stage 1: favorably resolved cases are granted immediately and no
        // longer count as real convictions.
        for felony in felonies {
            if ledger.contains(felony.case_id()) {
                continue;
            }
            if felony.common.resolved {
                assign(
                    ledger,
                    findings,
                    felony.case_id(),
                    CaseKind::Felony,
                    VerdictClass::Expungeable,
                    reason_codes::FEL_OK_RESOLVED,
                    messages::GRANT_RESOLVED.to_string(),
                    None,
                );
                if felony.is_convicted() {
                    conviction_count -= 1;
                }
            }
        }

        // Stage 2: felonies whose every count is on the reclassified list
        // are treated as misdemeanors. Removal from the conviction count
        // happens before the verdict is decided.
        let mut reclassified: Vec<&Felony> = Vec::new();
        for felony in felonies {
            if ledger.contains(felony.case_id()) {
                continue;
            }
            if felony
                .counts
                .iter()
                .all(|count| matcher.matches(StatuteListId::Reclassified, count))
            {
                reclassified.push(felony);
                if felony.is_convicted() {
                    conviction_count -= 1;
                }
            }
        }
        for felony in reclassified {
            self.resolve_reclassified(felony, ledger, findings);
        }

        // Stage 3: drug-court dismissals.
        for felony in felonies {
            if ledger.contains(felony.case_id()) {
                continue;
            }
            if felony.disposition == Disposition::DrugCourtDismissed {
                self.resolve_drug_court(felony, ledger, findings);
            }
        }

        // Stage 4: global gate. More than two real convictions ends the
        // screening for every undecided felony.
        if conviction_count > 2 {
            for felony in felonies {
                if ledger.contains(felony.case_id()) {
                    continue;
                }
                assign(
                    ledger,
                    findings,
                    felony.case_id(),
                    CaseKind::Felony,
                    VerdictClass::NotExpungeable,
                    reason_codes::FEL_DENY_TOO_MANY_CONVICTIONS,
                    messages::deny_too_many_convictions(conviction_count),
                    None,
                );
            }
            return Ok(false);
        }

        // Stage 5: per-conviction cascade.
        let mut all_convictions_cleared = true;
        for felony in felonies {
            if ledger.contains(felony.case_id()) {
                continue;
            }
            if felony.is_convicted()
                && !self.resolve_conviction(felony, conviction_count, matcher, ledger, findings)?
            {
                all_convictions_cleared = false;
            }
        }

        // Stage 6: if any conviction stayed uncleared, dismissals are not
        // evaluated at all; everything undecided gets the blanket denial.
        if !all_convictions_cleared {
            for felony in felonies {
                if ledger.contains(felony.case_id()) {
                    continue;
                }
                assign(
                    ledger,
                    findings,
                    felony.case_id(),
                    CaseKind::Felony,
                    VerdictClass::NotExpungeable,
                    reason_codes::FEL_DENY_UNCLEARED_CONVICTIONS,
                    messages::DENY_UNCLEARED_FELONY_CONVICTIONS.to_string(),
                    None,
                );
            }
            return Ok(false);
        }

        // Stage 7: dismissal cascade for everything left.
        for felony in felonies {
            if ledger.contains(felony.case_id()) {
                continue;
            }
            self.resolve_dismissal(felony, matcher, ledger, findings)?;
        }
        Ok(true)
    }

    fn resolve_reclassified(
        &self,
        felony: &Felony,
        ledger: &mut ResultLedger,
        findings: &mut Vec<CaseFinding>,
    ) {
        if let Some(sentencing) = felony.common.sentencing_date {
            if self.days_since(sentencing) < RECLASSIFIED_WAIT_DAYS {
                assign(
                    ledger,
                    findings,
                    felony.case_id(),
                    CaseKind::Felony,
                    VerdictClass::NotExpungeable,
                    reason_codes::FEL_DENY_RECLASSIFIED_WAIT,
                    messages::DENY_RECLASSIFIED_WAIT.to_string(),
                    Some(eligibility_date(sentencing, RECLASSIFIED_WAIT_DAYS)),
                );
                return;
            }
        }
        if !felony.common.fines_paid {
            assign(
                ledger,
                findings,
                felony.case_id(),
                CaseKind::Felony,
                VerdictClass::NotExpungeable,
                reason_codes::FEL_DENY_RECLASSIFIED_FINES,
                messages::DENY_RECLASSIFIED_FINES.to_string(),
                None,
            );
            return;
        }
        if !felony.common.treatment_complete {
            assign(
                ledger,
                findings,
                felony.case_id(),
                CaseKind::Felony,
                VerdictClass::NotExpungeable,
                reason_codes::FEL_DENY_RECLASSIFIED_TREATMENT,
                messages::DENY_RECLASSIFIED_TREATMENT.to_string(),
                None,
            );
            return;
        }
        assign(
            ledger,
            findings,
            felony.case_id(),
            CaseKind::Felony,
            VerdictClass::Expungeable,
            reason_codes::FEL_OK_RECLASSIFIED,
            messages::GRANT_RECLASSIFIED.to_string(),
            None,
        );
    }

    fn resolve_drug_court(
        &self,
        felony: &Felony,
        ledger: &mut ResultLedger,
        findings: &mut Vec<CaseFinding>,
    ) {
        if !felony.common.treatment_complete {
            assign(
                ledger,
                findings,
                felony.case_id(),
                CaseKind::Felony,
                VerdictClass::NotExpungeable,
                reason_codes::FEL_DENY_DRUG_PROGRAM,
                messages::DENY_DRUG_PROGRAM.to_string(),
                None,
            );
            return;
        }
        if !felony.common.fines_paid {
            assign(
                ledger,
                findings,
                felony.case_id(),
                CaseKind::Felony,
                VerdictClass::NotExpungeable,
                reason_codes::FEL_DENY_DRUG_FINES,
                messages::DENY_FINES_UNPAID.to_string(),
                None,
            );
            return;
        }
        assign(
            ledger,
            findings,
            felony.case_id(),
            CaseKind::Felony,
            VerdictClass::Expungeable,
            reason_codes::FEL_OK_DRUG_COURT,
            messages::GRANT_DRUG_FELONY.to_string(),
            None,
        );
    }

    /// One conviction through the nonviolent/maybe-violent cascade. Returns
    /// whether this conviction cleared (was granted).
    fn resolve_conviction(
        &self,
        felony: &Felony,
        conviction_count: usize,
        matcher: &dyn StatuteMatcher,
        ledger: &mut ResultLedger,
        findings: &mut Vec<CaseFinding>,
    ) -> Result<bool, ContractViolation> {
        if conviction_count > 1 {
            assign(
                ledger,
                findings,
                felony.case_id(),
                CaseKind::Felony,
                VerdictClass::NotExpungeable,
                reason_codes::FEL_DENY_MULTIPLE_CONVICTIONS,
                messages::DENY_MULTIPLE_CONVICTIONS.to_string(),
                None,
            );
            return Ok(false);
        }
        if let Some(most_recent) = self.recent_misdemeanor_conviction() {
            // First applicable deny wins; the maybe-violent attempt below
            // cannot overwrite it.
            let screen_after = eligibility_date(most_recent, SEVEN_YEAR_LOOKBACK_DAYS);
            assign(
                ledger,
                findings,
                felony.case_id(),
                CaseKind::Felony,
                VerdictClass::NotExpungeable,
                reason_codes::FEL_DENY_RECENT_MISDEMEANORS,
                messages::deny_recent_misdemeanors(screen_after),
                Some(screen_after),
            );
        } else if self.nonviolent_single_count(felony, matcher, ledger, findings)? {
            return Ok(true);
        }
        self.maybe_violent(felony, matcher, ledger, findings)
    }

    /// Single-count nonviolent test: one count, not on the Section 571 list,
    /// fines paid, more than five years since sentencing. Anything else
    /// falls through to the maybe-violent test (a deny written here still
    /// wins over any later attempt).
    fn nonviolent_single_count(
        &self,
        felony: &Felony,
        matcher: &dyn StatuteMatcher,
        ledger: &mut ResultLedger,
        findings: &mut Vec<CaseFinding>,
    ) -> Result<bool, ContractViolation> {
        if felony.counts.len() != 1 {
            return Ok(false);
        }
        if felony
            .counts
            .iter()
            .any(|count| matcher.matches(StatuteListId::ViolentSection571, count))
        {
            assign(
                ledger,
                findings,
                felony.case_id(),
                CaseKind::Felony,
                VerdictClass::NotExpungeable,
                reason_codes::FEL_DENY_VIOLENT_571,
                messages::DENY_VIOLENT_SECTION_571.to_string(),
                None,
            );
            return Ok(false);
        }
        if !felony.common.fines_paid {
            assign(
                ledger,
                findings,
                felony.case_id(),
                CaseKind::Felony,
                VerdictClass::NotExpungeable,
                reason_codes::FEL_DENY_FINES,
                messages::DENY_FINES_NOT_PAID.to_string(),
                None,
            );
            return Ok(false);
        }
        let sentencing = required_sentencing_date(felony)?;
        if self.days_since(sentencing) > FIVE_YEAR_WAIT_DAYS {
            return Ok(assign(
                ledger,
                findings,
                felony.case_id(),
                CaseKind::Felony,
                VerdictClass::Expungeable,
                reason_codes::FEL_OK_NONVIOLENT,
                messages::GRANT_NONVIOLENT.to_string(),
                None,
            ));
        }
        let eligible_after = eligibility_date(sentencing, FIVE_YEAR_WAIT_DAYS);
        assign(
            ledger,
            findings,
            felony.case_id(),
            CaseKind::Felony,
            VerdictClass::NotExpungeable,
            reason_codes::FEL_DENY_FIVE_YEAR_WAIT,
            messages::deny_five_year_wait(eligible_after),
            Some(eligible_after),
        );
        Ok(false)
    }

    /// Fallback test for multi-count or otherwise unresolved convictions and
    /// deferred sentences: at most two counts, none on the Section 13 or
    /// registry lists, fines paid, more than ten years since sentencing.
    /// Partial failures differentiate the fines-waiver and pardon paths.
    fn maybe_violent(
        &self,
        felony: &Felony,
        matcher: &dyn StatuteMatcher,
        ledger: &mut ResultLedger,
        findings: &mut Vec<CaseFinding>,
    ) -> Result<bool, ContractViolation> {
        let not_too_many = felony.counts.len() <= 2;
        let not_forbidden = not_too_many
            && !felony
                .counts
                .iter()
                .any(|count| matcher.matches(StatuteListId::Section13, count))
            && !felony
                .counts
                .iter()
                .any(|count| matcher.matches(StatuteListId::SexOffenderRegistry, count));
        let fines_paid = felony.common.fines_paid;
        let sentencing = required_sentencing_date(felony)?;
        let waited_ten_years = self.days_since(sentencing) > TEN_YEAR_WAIT_DAYS;

        if fines_paid && waited_ten_years && not_forbidden {
            // Counts as cleared only if this write actually decided the
            // case; a deny from an earlier stage stays in force.
            return Ok(assign(
                ledger,
                findings,
                felony.case_id(),
                CaseKind::Felony,
                VerdictClass::Expungeable,
                reason_codes::FEL_OK_TEN_YEAR,
                messages::GRANT_TEN_YEAR.to_string(),
                None,
            ));
        }
        if !fines_paid && not_forbidden {
            let eligible_after = eligibility_date(sentencing, TEN_YEAR_WAIT_DAYS);
            assign(
                ledger,
                findings,
                felony.case_id(),
                CaseKind::Felony,
                VerdictClass::NotExpungeable,
                reason_codes::FEL_DENY_FINES_WAIVER_PATH,
                messages::deny_fines_waiver_path(eligible_after),
                Some(eligible_after),
            );
        } else if fines_paid {
            let pardon_after = eligibility_date(sentencing, FIVE_YEAR_WAIT_DAYS);
            let alternative = (not_forbidden && !waited_ten_years)
                .then(|| eligibility_date(sentencing, TEN_YEAR_WAIT_DAYS));
            assign(
                ledger,
                findings,
                felony.case_id(),
                CaseKind::Felony,
                VerdictClass::NotExpungeable,
                reason_codes::FEL_DENY_PARDON_PATH,
                messages::deny_pardon_path(pardon_after, alternative),
                Some(pardon_after),
            );
        } else if !not_too_many {
            assign(
                ledger,
                findings,
                felony.case_id(),
                CaseKind::Felony,
                VerdictClass::NotExpungeable,
                reason_codes::FEL_DENY_TOO_MANY_COUNTS,
                messages::DENY_TOO_MANY_COUNTS.to_string(),
                None,
            );
        } else {
            assign(
                ledger,
                findings,
                felony.case_id(),
                CaseKind::Felony,
                VerdictClass::NotExpungeable,
                reason_codes::FEL_DENY_SECTION_13_OR_SORA,
                messages::DENY_SECTION_13_OR_SORA.to_string(),
                None,
            );
        }
        Ok(false)
    }

    fn resolve_dismissal(
        &self,
        felony: &Felony,
        matcher: &dyn StatuteMatcher,
        ledger: &mut ResultLedger,
        findings: &mut Vec<CaseFinding>,
    ) -> Result<bool, ContractViolation> {
        if felony.disposition == Disposition::Deferred {
            if self.nonviolent_single_count(felony, matcher, ledger, findings)? {
                return Ok(true);
            }
            return self.maybe_violent(felony, matcher, ledger, findings);
        }
        if !felony.common.expir_no_risk {
            assign(
                ledger,
                findings,
                felony.case_id(),
                CaseKind::Felony,
                VerdictClass::NotExpungeable,
                reason_codes::FEL_DENY_SOL_NOT_EXPIRED,
                messages::DENY_SOL_NOT_EXPIRED.to_string(),
                None,
            );
            return Ok(false);
        }
        assign(
            ledger,
            findings,
            felony.case_id(),
            CaseKind::Felony,
            VerdictClass::Expungeable,
            reason_codes::FEL_OK_SOL_EXPIRED,
            messages::GRANT_SOL_EXPIRED.to_string(),
            None,
        );
        Ok(true)
    }

    /// Most recent misdemeanor conviction date, if any falls inside the
    /// 7-year lookback.
    fn recent_misdemeanor_conviction(&self) -> Option<NaiveDate> {
        let any_recent = self
            .misdemeanor_conviction_dates
            .iter()
            .any(|date| self.days_since(*date) <= SEVEN_YEAR_LOOKBACK_DAYS);
        if any_recent {
            self.misdemeanor_conviction_dates.iter().copied().max()
        } else {
            None
        }
    }

    fn days_since(&self, date: NaiveDate) -> i64 {
        (self.today - date).num_days()
    }
}

fn required_sentencing_date(felony: &Felony) -> Result<NaiveDate, ContractViolation> {
    felony
        .common
        .sentencing_date
        .ok_or(ContractViolation::MissingField {
            field: "felony.sentencing_date",
            reason: "required for every disposition except a dismissal",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statute_match::StaticStatuteMatcher;
    use chrono::Duration;
    use expunge_contracts::cases::{CaseCommon, CaseId};
    use expunge_contracts::statutes::StatuteList;
    use rust_decimal::Decimal;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn days_ago(days: i64) -> NaiveDate {
        today() - Duration::days(days)
    }

    struct FelonyBuilder {
        case_id: String,
        resolved: bool,
        sentencing_date: Option<NaiveDate>,
        fines_paid: bool,
        expir_no_risk: bool,
        treatment_complete: bool,
        counts: Vec<String>,
        disposition: Disposition,
    }

    impl FelonyBuilder {
        fn new(case_id: &str, disposition: Disposition) -> Self {
            Self {
                case_id: case_id.to_string(),
                resolved: false,
                sentencing_date: Some(days_ago(2200)),
                fines_paid: true,
                expir_no_risk: false,
                treatment_complete: true,
                counts: vec!["grand larceny".to_string()],
                disposition,
            }
        }

        fn resolved(mut self, resolved: bool) -> Self {
            self.resolved = resolved;
            self
        }

        fn sentenced_days_ago(mut self, days: i64) -> Self {
            self.sentencing_date = Some(days_ago(days));
            self
        }

        fn fines_paid(mut self, paid: bool) -> Self {
            self.fines_paid = paid;
            self
        }

        fn expir_no_risk(mut self, flag: bool) -> Self {
            self.expir_no_risk = flag;
            self
        }

        fn treatment_complete(mut self, done: bool) -> Self {
            self.treatment_complete = done;
            self
        }

        fn counts(mut self, counts: &[&str]) -> Self {
            self.counts = counts.iter().map(|c| c.to_string()).collect();
            self
        }

        fn build(self) -> Felony {
            Felony::v1(
                CaseCommon::v1(
                    CaseId(self.case_id),
                    "Tulsa PD".to_string(),
                    "Tulsa County District Court".to_string(),
                    self.resolved,
                    self.sentencing_date,
                    self.fines_paid,
                    self.expir_no_risk,
                    self.treatment_complete,
                )
                .unwrap(),
                self.counts,
                self.disposition,
            )
            .unwrap()
        }
    }

    fn misdemeanor_conviction(case_id: &str, sentenced_days_ago: i64) -> Misdemeanor {
        Misdemeanor::v1(
            CaseCommon::v1(
                CaseId(case_id.to_string()),
                "Tulsa PD".to_string(),
                "Tulsa County District Court".to_string(),
                false,
                Some(days_ago(sentenced_days_ago)),
                true,
                false,
                true,
            )
            .unwrap(),
            Decimal::from(800),
            false,
            Disposition::Conviction,
        )
        .unwrap()
    }

    fn run(
        felonies: &[Felony],
        misdemeanors: &[Misdemeanor],
        matcher: &dyn StatuteMatcher,
    ) -> (bool, ResultLedger, Vec<CaseFinding>) {
        let resolver = FelonyResolver::new(today(), misdemeanors);
        let mut ledger = ResultLedger::new();
        let mut findings = Vec::new();
        let can_waive = resolver
            .run(felonies, matcher, &mut ledger, &mut findings)
            .unwrap();
        (can_waive, ledger, findings)
    }

    fn id(s: &str) -> CaseId {
        CaseId(s.to_string())
    }

    #[test]
    fn at_fel_01_single_nonviolent_conviction_six_years_out_is_granted() {
        let felony = FelonyBuilder::new("CF-1", Disposition::Conviction)
            .sentenced_days_ago(2200)
            .build();
        let (can_waive, ledger, _) = run(&[felony], &[], &StaticStatuteMatcher::empty());
        assert!(can_waive);
        assert_eq!(ledger.get(&id("CF-1")), Some(messages::GRANT_NONVIOLENT));
    }

    #[test]
    fn at_fel_02_five_year_wait_not_reached_names_re_eligibility_date() {
        let felony = FelonyBuilder::new("CF-1", Disposition::Conviction)
            .sentenced_days_ago(730)
            .build();
        let (can_waive, ledger, findings) = run(&[felony], &[], &StaticStatuteMatcher::empty());
        assert!(!can_waive);
        let expected_date = eligibility_date(days_ago(730), FIVE_YEAR_WAIT_DAYS);
        let verdict = ledger.get(&id("CF-1")).unwrap();
        assert!(verdict.contains("5 year waiting period not yet reached"));
        assert!(verdict.contains(&messages::format_date_mdy(expected_date)));
        // The maybe-violent fallthrough must not overwrite the first deny.
        assert_eq!(
            findings[0].reason_code,
            reason_codes::FEL_DENY_FIVE_YEAR_WAIT
        );
        assert_eq!(findings[0].re_eligibility_date, Some(expected_date));
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn at_fel_03_resolved_cases_grant_and_decrement_conviction_count() {
        let felonies = vec![
            FelonyBuilder::new("CF-1", Disposition::Conviction)
                .resolved(true)
                .build(),
            FelonyBuilder::new("CF-2", Disposition::Conviction).build(),
            FelonyBuilder::new("CF-3", Disposition::Conviction).build(),
        ];
        // Three convictions, one resolved: counter drops to 2, so the global
        // gate does not fire; the remaining two fail the more-than-one test.
        let (can_waive, ledger, _) = run(&felonies, &[], &StaticStatuteMatcher::empty());
        assert!(!can_waive);
        assert_eq!(ledger.get(&id("CF-1")), Some(messages::GRANT_RESOLVED));
        assert_eq!(
            ledger.get(&id("CF-2")),
            Some(messages::DENY_MULTIPLE_CONVICTIONS)
        );
        assert_eq!(
            ledger.get(&id("CF-3")),
            Some(messages::DENY_MULTIPLE_CONVICTIONS)
        );
    }

    #[test]
    fn at_fel_04_three_convictions_trip_the_global_gate() {
        let felonies = vec![
            FelonyBuilder::new("CF-1", Disposition::Conviction).build(),
            FelonyBuilder::new("CF-2", Disposition::Conviction).build(),
            FelonyBuilder::new("CF-3", Disposition::Conviction).build(),
        ];
        let (can_waive, ledger, _) = run(&felonies, &[], &StaticStatuteMatcher::empty());
        assert!(!can_waive);
        let expected = messages::deny_too_many_convictions(3);
        for case in ["CF-1", "CF-2", "CF-3"] {
            assert_eq!(ledger.get(&id(case)), Some(expected.as_str()));
        }
    }

    #[test]
    fn at_fel_05_recent_misdemeanor_conviction_blocks_with_screen_again_date() {
        let felony = FelonyBuilder::new("CF-1", Disposition::Conviction)
            .sentenced_days_ago(2200)
            .build();
        let misdemeanors = vec![
            misdemeanor_conviction("CM-1", 400),
            misdemeanor_conviction("CM-2", 3000),
        ];
        let (can_waive, ledger, findings) =
            run(&[felony], &misdemeanors, &StaticStatuteMatcher::empty());
        assert!(!can_waive);
        let screen_after = eligibility_date(days_ago(400), SEVEN_YEAR_LOOKBACK_DAYS);
        let verdict = ledger.get(&id("CF-1")).unwrap();
        assert!(verdict.contains("Misdemeanor convictions within the last 7 years"));
        assert!(verdict.contains(&messages::format_date_mdy(screen_after)));
        assert_eq!(
            findings[0].reason_code,
            reason_codes::FEL_DENY_RECENT_MISDEMEANORS
        );
    }

    #[test]
    fn at_fel_06_violent_single_count_falls_to_section_13_deny() {
        let matcher = StaticStatuteMatcher::from_lists(&[
            StatuteList::v1(
                StatuteListId::ViolentSection571,
                vec!["assault with a deadly weapon".to_string()],
            )
            .unwrap(),
            StatuteList::v1(
                StatuteListId::Section13,
                vec!["assault with a deadly weapon".to_string()],
            )
            .unwrap(),
        ]);
        let felony = FelonyBuilder::new("CF-1", Disposition::Conviction)
            .counts(&["assault with a deadly weapon"])
            .sentenced_days_ago(4000)
            .build();
        let (can_waive, ledger, _) = run(&[felony], &[], &matcher);
        assert!(!can_waive);
        // Section 571 deny is written first and wins over the maybe-violent
        // attempt.
        assert_eq!(
            ledger.get(&id("CF-1")),
            Some(messages::DENY_VIOLENT_SECTION_571)
        );
    }

    #[test]
    fn at_fel_07_two_count_conviction_ten_years_out_is_granted() {
        let felony = FelonyBuilder::new("CF-1", Disposition::Conviction)
            .counts(&["burglary second degree", "possession of stolen property"])
            .sentenced_days_ago(4000)
            .build();
        let (can_waive, ledger, _) = run(&[felony], &[], &StaticStatuteMatcher::empty());
        assert!(can_waive);
        assert_eq!(ledger.get(&id("CF-1")), Some(messages::GRANT_TEN_YEAR));
    }

    #[test]
    fn at_fel_08_two_count_conviction_within_ten_years_offers_pardon_and_alternative() {
        let felony = FelonyBuilder::new("CF-1", Disposition::Conviction)
            .counts(&["burglary second degree", "possession of stolen property"])
            .sentenced_days_ago(2200)
            .build();
        let (can_waive, ledger, findings) = run(&[felony], &[], &StaticStatuteMatcher::empty());
        assert!(!can_waive);
        let verdict = ledger.get(&id("CF-1")).unwrap();
        assert!(verdict.contains("pardon from the Governor"));
        assert!(verdict.contains("Alternatively"));
        let pardon_after = eligibility_date(days_ago(2200), FIVE_YEAR_WAIT_DAYS);
        assert!(verdict.contains(&messages::format_date_mdy(pardon_after)));
        assert_eq!(findings[0].reason_code, reason_codes::FEL_DENY_PARDON_PATH);
    }

    #[test]
    fn at_fel_09_unpaid_fines_on_clean_counts_offers_waiver_path() {
        let felony = FelonyBuilder::new("CF-1", Disposition::Conviction)
            .counts(&["burglary second degree", "possession of stolen property"])
            .fines_paid(false)
            .sentenced_days_ago(2200)
            .build();
        let (_, ledger, _) = run(&[felony], &[], &StaticStatuteMatcher::empty());
        let verdict = ledger.get(&id("CF-1")).unwrap();
        assert!(verdict.contains("22 O.S."));
        let waiver_after = eligibility_date(days_ago(2200), TEN_YEAR_WAIT_DAYS);
        assert!(verdict.contains(&messages::format_date_mdy(waiver_after)));
    }

    #[test]
    fn at_fel_10_more_than_two_counts_denied_as_too_many() {
        let felony = FelonyBuilder::new("CF-1", Disposition::Conviction)
            .counts(&["count one", "count two", "count three"])
            .fines_paid(false)
            .sentenced_days_ago(4000)
            .build();
        let (_, ledger, _) = run(&[felony], &[], &StaticStatuteMatcher::empty());
        assert_eq!(
            ledger.get(&id("CF-1")),
            Some(messages::DENY_TOO_MANY_COUNTS)
        );
    }

    #[test]
    fn at_fel_11_reclassified_conviction_is_removed_from_the_gate_count() {
        let matcher = StaticStatuteMatcher::from_lists(&[StatuteList::v1(
            StatuteListId::Reclassified,
            vec!["larceny of merchandise".to_string()],
        )
        .unwrap()]);
        let felonies = vec![
            FelonyBuilder::new("CF-1", Disposition::Conviction)
                .counts(&["larceny of merchandise"])
                .build(),
            FelonyBuilder::new("CF-2", Disposition::Conviction)
                .sentenced_days_ago(2200)
                .build(),
            FelonyBuilder::new("CF-3", Disposition::Conviction)
                .resolved(true)
                .build(),
        ];
        // Counter: 3 convictions - 1 resolved - 1 reclassified = 1, so CF-2
        // proceeds alone through the nonviolent test and clears.
        let (can_waive, ledger, _) = run(&felonies, &[], &matcher);
        assert!(can_waive);
        assert_eq!(ledger.get(&id("CF-1")), Some(messages::GRANT_RECLASSIFIED));
        assert_eq!(ledger.get(&id("CF-2")), Some(messages::GRANT_NONVIOLENT));
    }

    #[test]
    fn at_fel_12_reclassified_cascade_denials() {
        let matcher = StaticStatuteMatcher::from_lists(&[StatuteList::v1(
            StatuteListId::Reclassified,
            vec!["larceny of merchandise".to_string()],
        )
        .unwrap()]);
        let felonies = vec![
            FelonyBuilder::new("CF-1", Disposition::Conviction)
                .counts(&["larceny of merchandise"])
                .sentenced_days_ago(10)
                .build(),
            FelonyBuilder::new("CF-2", Disposition::Conviction)
                .counts(&["larceny of merchandise"])
                .fines_paid(false)
                .build(),
            FelonyBuilder::new("CF-3", Disposition::Conviction)
                .counts(&["larceny of merchandise"])
                .treatment_complete(false)
                .build(),
        ];
        let (_, ledger, _) = run(&felonies, &[], &matcher);
        assert_eq!(
            ledger.get(&id("CF-1")),
            Some(messages::DENY_RECLASSIFIED_WAIT)
        );
        assert_eq!(
            ledger.get(&id("CF-2")),
            Some(messages::DENY_RECLASSIFIED_FINES)
        );
        assert_eq!(
            ledger.get(&id("CF-3")),
            Some(messages::DENY_RECLASSIFIED_TREATMENT)
        );
    }

    #[test]
    fn at_fel_13_drug_court_cascade() {
        let felonies = vec![
            FelonyBuilder::new("CF-1", Disposition::DrugCourtDismissed)
                .treatment_complete(false)
                .build(),
            FelonyBuilder::new("CF-2", Disposition::DrugCourtDismissed)
                .fines_paid(false)
                .build(),
            FelonyBuilder::new("CF-3", Disposition::DrugCourtDismissed).build(),
        ];
        let (can_waive, ledger, _) = run(&felonies, &[], &StaticStatuteMatcher::empty());
        assert!(can_waive);
        assert_eq!(ledger.get(&id("CF-1")), Some(messages::DENY_DRUG_PROGRAM));
        assert_eq!(ledger.get(&id("CF-2")), Some(messages::DENY_FINES_UNPAID));
        assert_eq!(ledger.get(&id("CF-3")), Some(messages::GRANT_DRUG_FELONY));
    }

    #[test]
    fn at_fel_14_plain_dismissal_gated_on_expir_no_risk() {
        let felonies = vec![
            FelonyBuilder::new("CF-1", Disposition::Dismissed)
                .expir_no_risk(false)
                .build(),
            FelonyBuilder::new("CF-2", Disposition::Dismissed)
                .expir_no_risk(true)
                .build(),
        ];
        let (can_waive, ledger, _) = run(&felonies, &[], &StaticStatuteMatcher::empty());
        assert!(can_waive);
        assert_eq!(
            ledger.get(&id("CF-1")),
            Some(messages::DENY_SOL_NOT_EXPIRED)
        );
        assert_eq!(ledger.get(&id("CF-2")), Some(messages::GRANT_SOL_EXPIRED));
    }

    #[test]
    fn at_fel_15_deferred_re_enters_the_nonviolent_test() {
        let felony = FelonyBuilder::new("CF-1", Disposition::Deferred)
            .sentenced_days_ago(2200)
            .build();
        let (can_waive, ledger, _) = run(&[felony], &[], &StaticStatuteMatcher::empty());
        assert!(can_waive);
        assert_eq!(ledger.get(&id("CF-1")), Some(messages::GRANT_NONVIOLENT));
    }

    #[test]
    fn at_fel_16_uncleared_conviction_blankets_remaining_dismissals() {
        let felonies = vec![
            FelonyBuilder::new("CF-1", Disposition::Conviction)
                .sentenced_days_ago(730)
                .build(),
            FelonyBuilder::new("CF-2", Disposition::Dismissed)
                .expir_no_risk(true)
                .build(),
        ];
        let (can_waive, ledger, _) = run(&felonies, &[], &StaticStatuteMatcher::empty());
        assert!(!can_waive);
        // The dismissal is never evaluated once a conviction stays uncleared.
        assert_eq!(
            ledger.get(&id("CF-2")),
            Some(messages::DENY_UNCLEARED_FELONY_CONVICTIONS)
        );
    }

    #[test]
    fn at_fel_17_rerun_against_settled_ledger_is_a_no_op() {
        let felonies = vec![
            FelonyBuilder::new("CF-1", Disposition::Conviction)
                .sentenced_days_ago(2200)
                .build(),
            FelonyBuilder::new("CF-2", Disposition::Dismissed)
                .expir_no_risk(true)
                .build(),
        ];
        let resolver = FelonyResolver::new(today(), &[]);
        let matcher = StaticStatuteMatcher::empty();
        let mut ledger = ResultLedger::new();
        let mut findings = Vec::new();
        resolver
            .run(&felonies, &matcher, &mut ledger, &mut findings)
            .unwrap();
        let settled = ledger.clone();
        let findings_len = findings.len();
        resolver
            .run(&felonies, &matcher, &mut ledger, &mut findings)
            .unwrap();
        assert_eq!(ledger, settled);
        assert_eq!(findings.len(), findings_len);
    }

    #[test]
    fn at_fel_18_hand_built_conviction_without_sentencing_date_is_a_violation() {
        // Construction as a dismissal makes the missing date legal; flipping
        // the disposition afterwards bypasses the constructor check.
        let mut felony = FelonyBuilder::new("CF-1", Disposition::Dismissed).build();
        felony.common.sentencing_date = None;
        felony.disposition = Disposition::Conviction;
        let resolver = FelonyResolver::new(today(), &[]);
        let mut ledger = ResultLedger::new();
        let mut findings = Vec::new();
        let err = resolver
            .run(
                &[felony],
                &StaticStatuteMatcher::empty(),
                &mut ledger,
                &mut findings,
            )
            .unwrap_err();
        assert!(matches!(err, ContractViolation::MissingField { .. }));
    }
}
