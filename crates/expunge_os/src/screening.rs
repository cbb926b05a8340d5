#![forbid(unsafe_code)]

//! The screening run: validates an intake docket and drives the resolvers
//! in their fixed order (arrests, then felonies, then misdemeanors).
//!
//! Resolver order is load-bearing twice over: the felony resolver consumes
//! misdemeanor conviction dates for its lookback, and the misdemeanor
//! resolver consumes the felony resolver's waiver verdict.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;

use expunge_contracts::cases::{Arrest, CaseId, Felony, Misdemeanor};
use expunge_contracts::findings::CaseFinding;
use expunge_contracts::ledger::ResultLedger;
use expunge_contracts::{ContractViolation, Validate};
use expunge_engines::arrest::ArrestResolver;
use expunge_engines::felony::FelonyResolver;
use expunge_engines::misdemeanor::MisdemeanorResolver;
use expunge_engines::statute_match::StatuteMatcher;

#[derive(Debug, Clone, PartialEq)]
pub enum ScreeningError {
    Contract(ContractViolation),
    DuplicateCaseId { case_id: CaseId },
}

impl fmt::Display for ScreeningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreeningError::Contract(violation) => {
                write!(f, "contract violation: {violation:?}")
            }
            ScreeningError::DuplicateCaseId { case_id } => {
                write!(f, "duplicate case id: {}", case_id.as_str())
            }
        }
    }
}

impl From<ContractViolation> for ScreeningError {
    fn from(violation: ContractViolation) -> Self {
        ScreeningError::Contract(violation)
    }
}

/// Output of one screening run. The ledger holds the human-readable verdict
/// per case; findings mirror them with structured detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreeningOutcome {
    pub ledger: ResultLedger,
    pub findings: Vec<CaseFinding>,
    pub can_waive_misdemeanors: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ScreeningRun {
    today: NaiveDate,
}

impl ScreeningRun {
    /// `today` is injected so a run is reproducible; callers pass the wall
    /// clock date.
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn run(
        &self,
        arrests: &[Arrest],
        misdemeanors: &[Misdemeanor],
        felonies: &[Felony],
        matcher: &dyn StatuteMatcher,
    ) -> Result<ScreeningOutcome, ScreeningError> {
        self.check_docket(arrests, misdemeanors, felonies)?;

        let mut ledger = ResultLedger::new();
        let mut findings = Vec::new();

        ArrestResolver.run(arrests, &mut ledger, &mut findings);
        let can_waive_misdemeanors = FelonyResolver::new(self.today, misdemeanors).run(
            felonies,
            matcher,
            &mut ledger,
            &mut findings,
        )?;
        MisdemeanorResolver::new(self.today).run(
            misdemeanors,
            can_waive_misdemeanors,
            &mut ledger,
            &mut findings,
        )?;

        Ok(ScreeningOutcome {
            ledger,
            findings,
            can_waive_misdemeanors,
        })
    }

    /// Every record must pass its contract and every case id must be unique
    /// across the whole docket. The ledger is keyed by case id, so a
    /// duplicate would silently make one case's verdict unreachable.
    fn check_docket(
        &self,
        arrests: &[Arrest],
        misdemeanors: &[Misdemeanor],
        felonies: &[Felony],
    ) -> Result<(), ScreeningError> {
        let mut seen: BTreeSet<&CaseId> = BTreeSet::new();
        let mut case_ids = Vec::new();
        for arrest in arrests {
            arrest.validate()?;
            case_ids.push(arrest.case_id());
        }
        for misdemeanor in misdemeanors {
            misdemeanor.validate()?;
            case_ids.push(misdemeanor.case_id());
        }
        for felony in felonies {
            felony.validate()?;
            case_ids.push(felony.case_id());
        }
        for case_id in case_ids {
            if !seen.insert(case_id) {
                return Err(ScreeningError::DuplicateCaseId {
                    case_id: case_id.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use expunge_contracts::cases::{CaseCommon, Disposition};
    use expunge_engines::messages;
    use expunge_engines::statute_match::StaticStatuteMatcher;
    use rust_decimal::Decimal;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn common(case_id: &str, sentenced_days_ago: Option<i64>) -> CaseCommon {
        CaseCommon::v1(
            CaseId(case_id.to_string()),
            "Tulsa PD".to_string(),
            "Tulsa County District Court".to_string(),
            false,
            sentenced_days_ago.map(|days| today() - Duration::days(days)),
            true,
            false,
            true,
        )
        .unwrap()
    }

    fn arrest(case_id: &str) -> Arrest {
        Arrest::v1(common(case_id, None)).unwrap()
    }

    fn felony(case_id: &str, sentenced_days_ago: i64) -> Felony {
        Felony::v1(
            common(case_id, Some(sentenced_days_ago)),
            vec!["grand larceny".to_string()],
            Disposition::Conviction,
        )
        .unwrap()
    }

    fn misdemeanor(case_id: &str, sentenced_days_ago: i64) -> Misdemeanor {
        Misdemeanor::v1(
            common(case_id, Some(sentenced_days_ago)),
            Decimal::from(250),
            false,
            Disposition::Conviction,
        )
        .unwrap()
    }

    fn id(s: &str) -> CaseId {
        CaseId(s.to_string())
    }

    #[test]
    fn at_screen_01_full_docket_runs_in_fixed_order() {
        let outcome = ScreeningRun::new(today())
            .run(
                &[arrest("AR-1")],
                &[misdemeanor("CM-1", 3000)],
                &[felony("CF-1", 2200)],
                &StaticStatuteMatcher::empty(),
            )
            .unwrap();
        assert!(outcome.can_waive_misdemeanors);
        assert_eq!(outcome.ledger.len(), 3);
        assert_eq!(outcome.ledger.get(&id("AR-1")), Some(messages::GRANT_ARREST));
        assert_eq!(
            outcome.ledger.get(&id("CF-1")),
            Some(messages::GRANT_NONVIOLENT)
        );
        assert_eq!(
            outcome.ledger.get(&id("CM-1")),
            Some(messages::GRANT_SMALL_FINE)
        );
    }

    #[test]
    fn at_screen_02_recent_misdemeanor_blocks_felony_then_felony_blocks_misdemeanor() {
        // The misdemeanor conviction is 400 days old: it trips the felony
        // resolver's 7-year lookback, the felony stays uncleared, and the
        // misdemeanor in turn is denied by the felony gate.
        let outcome = ScreeningRun::new(today())
            .run(
                &[],
                &[misdemeanor("CM-1", 400)],
                &[felony("CF-1", 2200)],
                &StaticStatuteMatcher::empty(),
            )
            .unwrap();
        assert!(!outcome.can_waive_misdemeanors);
        assert!(outcome
            .ledger
            .get(&id("CF-1"))
            .unwrap()
            .contains("Misdemeanor convictions within the last 7 years"));
        assert_eq!(
            outcome.ledger.get(&id("CM-1")),
            Some(messages::DENY_FELONY_BLOCK)
        );
    }

    #[test]
    fn at_screen_03_duplicate_case_id_rejected() {
        let out = ScreeningRun::new(today()).run(
            &[arrest("CASE-1")],
            &[misdemeanor("CASE-1", 3000)],
            &[],
            &StaticStatuteMatcher::empty(),
        );
        assert_eq!(
            out,
            Err(ScreeningError::DuplicateCaseId {
                case_id: id("CASE-1")
            })
        );
    }

    #[test]
    fn at_screen_04_invalid_record_rejected_before_any_resolver_runs() {
        let mut bad = felony("CF-1", 2200);
        bad.counts.clear();
        let out = ScreeningRun::new(today()).run(
            &[],
            &[],
            &[bad],
            &StaticStatuteMatcher::empty(),
        );
        assert!(matches!(out, Err(ScreeningError::Contract(_))));
    }

    #[test]
    fn at_screen_05_empty_docket_yields_empty_ledger() {
        let outcome = ScreeningRun::new(today())
            .run(&[], &[], &[], &StaticStatuteMatcher::empty())
            .unwrap();
        assert!(outcome.ledger.is_empty());
        assert!(outcome.can_waive_misdemeanors);
    }
}
