#![forbid(unsafe_code)]

//! JSON case-file format for batch screening.
//!
//! A case file carries the client's docket plus optional statute lists for
//! the offline matcher. The loader decodes the raw document with serde and
//! then rebuilds every record through its contract constructor, so a file
//! that parses but violates a contract is still rejected with a pointed
//! error.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use expunge_contracts::cases::{
    Arrest, CaseCommon, CaseId, Disposition, Felony, Misdemeanor,
};
use expunge_contracts::statutes::{StatuteList, StatuteListId};
use expunge_os::screening::ScreeningOutcome;

#[derive(Debug, Clone, Deserialize)]
struct CaseFileDoc {
    /// Screening date override; the CLI falls back to the wall clock.
    #[serde(default)]
    today: Option<NaiveDate>,
    #[serde(default)]
    statutes: BTreeMap<String, Vec<String>>,
    cases: Vec<CaseDoc>,
}

#[derive(Debug, Clone, Deserialize)]
struct CaseDoc {
    kind: String,
    case_id: String,
    arresting_agency: String,
    court: String,
    #[serde(default)]
    resolved: bool,
    #[serde(default)]
    disposition: Option<String>,
    #[serde(default)]
    sentencing_date: Option<NaiveDate>,
    #[serde(default)]
    fines_paid: bool,
    #[serde(default)]
    expir_no_risk: bool,
    #[serde(default)]
    treatment_complete: bool,
    #[serde(default)]
    counts: Vec<String>,
    #[serde(default)]
    fine_amount: Option<Decimal>,
    #[serde(default)]
    imprisoned: bool,
}

/// A decoded and contract-checked case file.
#[derive(Debug, Clone, Default)]
pub struct Docket {
    pub today: Option<NaiveDate>,
    pub arrests: Vec<Arrest>,
    pub misdemeanors: Vec<Misdemeanor>,
    pub felonies: Vec<Felony>,
    pub statute_lists: Vec<StatuteList>,
}

pub fn parse_case_file(text: &str) -> Result<Docket, String> {
    let doc: CaseFileDoc =
        serde_json::from_str(text).map_err(|e| format!("case file is not valid JSON: {e}"))?;

    let mut docket = Docket {
        today: doc.today,
        ..Docket::default()
    };
    for (key, entries) in doc.statutes {
        let id = StatuteListId::parse(&key)
            .ok_or_else(|| format!("unknown statute list '{key}'"))?;
        let list = StatuteList::v1(id, entries)
            .map_err(|violation| format!("statute list '{key}': {violation:?}"))?;
        docket.statute_lists.push(list);
    }

    for case in doc.cases {
        let case_id = case.case_id.clone();
        build_case(&mut docket, case)
            .map_err(|reason| format!("case '{case_id}': {reason}"))?;
    }
    Ok(docket)
}

fn build_case(docket: &mut Docket, case: CaseDoc) -> Result<(), String> {
    match case.kind.as_str() {
        "arrest" => {
            let common = common_from(&case, true)?;
            let arrest = Arrest::v1(common).map_err(|v| format!("{v:?}"))?;
            docket.arrests.push(arrest);
        }
        "misdemeanor" => {
            let disposition = disposition_from(&case)?;
            let common = common_from(&case, case.resolved)?;
            let fine_amount = case
                .fine_amount
                .ok_or_else(|| "misdemeanor requires fine_amount".to_string())?;
            let misdemeanor =
                Misdemeanor::v1(common, fine_amount, case.imprisoned, disposition)
                    .map_err(|v| format!("{v:?}"))?;
            docket.misdemeanors.push(misdemeanor);
        }
        "felony" => {
            let disposition = disposition_from(&case)?;
            let common = common_from(&case, case.resolved)?;
            let felony = Felony::v1(common, case.counts.clone(), disposition)
                .map_err(|v| format!("{v:?}"))?;
            docket.felonies.push(felony);
        }
        other => return Err(format!("unknown case kind '{other}'")),
    }
    Ok(())
}

fn common_from(case: &CaseDoc, resolved: bool) -> Result<CaseCommon, String> {
    CaseCommon::v1(
        CaseId(case.case_id.clone()),
        case.arresting_agency.clone(),
        case.court.clone(),
        resolved,
        case.sentencing_date,
        case.fines_paid,
        case.expir_no_risk,
        case.treatment_complete,
    )
    .map_err(|v| format!("{v:?}"))
}

fn disposition_from(case: &CaseDoc) -> Result<Disposition, String> {
    match case.disposition.as_deref() {
        Some("conviction") => Ok(Disposition::Conviction),
        Some("dismissed") => Ok(Disposition::Dismissed),
        Some("deferred") => Ok(Disposition::Deferred),
        Some("drug_court_dismissed") => Ok(Disposition::DrugCourtDismissed),
        Some(other) => Err(format!("unknown disposition '{other}'")),
        None => Err("disposition is required for this case kind".to_string()),
    }
}

/// Plain-text report: one "case_id: verdict" line per ledger entry, plus the
/// misdemeanor-waiver signal.
pub fn render_report(outcome: &ScreeningOutcome) -> String {
    let mut report = String::new();
    for (case_id, verdict) in outcome.ledger.iter() {
        report.push_str(case_id.as_str());
        report.push_str(": ");
        report.push_str(verdict);
        report.push('\n');
    }
    if !outcome.can_waive_misdemeanors {
        report.push_str("note: felony convictions block misdemeanor relief\n");
    }
    report
}

/// JSON report over the structured findings.
pub fn render_json_report(outcome: &ScreeningOutcome) -> Result<String, String> {
    serde_json::to_string_pretty(&outcome.findings).map_err(|e| e.to_string())
}
