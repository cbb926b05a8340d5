#![forbid(unsafe_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    common::{validate_label, validate_token_ascii},
    ContractViolation, SchemaVersion, Validate,
};

pub const CASES_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

const MAX_CHARGE_COUNTS: usize = 32;

/// Case identifier, the primary key into the result ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaseId(pub String);

impl CaseId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for CaseId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_token_ascii("case_id", &self.0, 96)
    }
}

/// Legal outcome of a charge. Exactly one per misdemeanor or felony case;
/// drives which rule branch of the resolvers applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Conviction,
    Dismissed,
    Deferred,
    DrugCourtDismissed,
}

impl Disposition {
    pub fn as_str(self) -> &'static str {
        match self {
            Disposition::Conviction => "CONVICTION",
            Disposition::Dismissed => "DISMISSED",
            Disposition::Deferred => "DEFERRED",
            Disposition::DrugCourtDismissed => "DRUG_COURT_DISMISSED",
        }
    }

    /// Non-deferred dismissals and deferred sentences both count as
    /// dismissals for resolver routing.
    pub fn is_dismissal(self) -> bool {
        matches!(self, Disposition::Dismissed | Disposition::Deferred)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseKind {
    Arrest,
    Misdemeanor,
    Felony,
}

impl CaseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CaseKind::Arrest => "ARREST",
            CaseKind::Misdemeanor => "MISDEMEANOR",
            CaseKind::Felony => "FELONY",
        }
    }
}

/// Fields shared by every case variant.
///
/// `resolved` means the case ended via an enumerated favorable disposition
/// category (acquittal, reversal, pardon, identity-theft finding) and is
/// independent of the disposition logic. `expir_no_risk` is the combined
/// "SOL expired, or DA will not refile, or dismissed with costs resolved"
/// flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseCommon {
    pub schema_version: SchemaVersion,
    pub case_id: CaseId,
    pub arresting_agency: String,
    pub court: String,
    pub resolved: bool,
    pub sentencing_date: Option<NaiveDate>,
    pub fines_paid: bool,
    pub expir_no_risk: bool,
    pub treatment_complete: bool,
}

impl CaseCommon {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        case_id: CaseId,
        arresting_agency: String,
        court: String,
        resolved: bool,
        sentencing_date: Option<NaiveDate>,
        fines_paid: bool,
        expir_no_risk: bool,
        treatment_complete: bool,
    ) -> Result<Self, ContractViolation> {
        let common = Self {
            schema_version: CASES_CONTRACT_VERSION,
            case_id,
            arresting_agency,
            court,
            resolved,
            sentencing_date,
            fines_paid,
            expir_no_risk,
            treatment_complete,
        };
        common.validate()?;
        Ok(common)
    }
}

impl Validate for CaseCommon {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != CASES_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "case_common.schema_version",
                reason: "must match CASES_CONTRACT_VERSION",
            });
        }
        self.case_id.validate()?;
        validate_label("case_common.arresting_agency", &self.arresting_agency, 120)?;
        validate_label("case_common.court", &self.court, 120)?;
        Ok(())
    }
}

/// A sentencing date is required for every disposition that can reach a
/// date-window rule. `Dismissed` is the single branch that never does date
/// arithmetic (it is gated on `expir_no_risk` alone), so it may omit the
/// date. A missing-but-required date is a data-validation error at
/// construction, never a silently wrong verdict downstream.
fn validate_sentencing_date(
    field: &'static str,
    common: &CaseCommon,
    disposition: Disposition,
) -> Result<(), ContractViolation> {
    if common.sentencing_date.is_none() && disposition != Disposition::Dismissed {
        return Err(ContractViolation::MissingField {
            field,
            reason: "sentencing or dismissal date required for this disposition",
        });
    }
    Ok(())
}

/// Felony case: charge-count descriptions are matched against statute lists
/// by the fuzzy statute matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Felony {
    pub common: CaseCommon,
    pub counts: Vec<String>,
    pub disposition: Disposition,
}

impl Felony {
    pub fn v1(
        common: CaseCommon,
        counts: Vec<String>,
        disposition: Disposition,
    ) -> Result<Self, ContractViolation> {
        let felony = Self {
            common,
            counts,
            disposition,
        };
        felony.validate()?;
        Ok(felony)
    }

    pub fn case_id(&self) -> &CaseId {
        &self.common.case_id
    }

    pub fn is_convicted(&self) -> bool {
        self.disposition == Disposition::Conviction
    }
}

impl Validate for Felony {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.common.validate()?;
        if self.counts.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "felony.counts",
                reason: "must contain at least one charge count",
            });
        }
        if self.counts.len() > MAX_CHARGE_COUNTS {
            return Err(ContractViolation::InvalidValue {
                field: "felony.counts",
                reason: "exceeds max charge counts",
            });
        }
        for count in &self.counts {
            validate_label("felony.counts", count, 200)?;
        }
        validate_sentencing_date("felony.sentencing_date", &self.common, self.disposition)
    }
}

/// Misdemeanor case: fine amount in currency units, plus whether the client
/// was imprisoned (both drive the small-fine shortcut path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Misdemeanor {
    pub common: CaseCommon,
    pub fine_amount: Decimal,
    pub imprisoned: bool,
    pub disposition: Disposition,
}

impl Misdemeanor {
    pub fn v1(
        common: CaseCommon,
        fine_amount: Decimal,
        imprisoned: bool,
        disposition: Disposition,
    ) -> Result<Self, ContractViolation> {
        let misdemeanor = Self {
            common,
            fine_amount,
            imprisoned,
            disposition,
        };
        misdemeanor.validate()?;
        Ok(misdemeanor)
    }

    pub fn case_id(&self) -> &CaseId {
        &self.common.case_id
    }

    pub fn is_convicted(&self) -> bool {
        self.disposition == Disposition::Conviction
    }
}

impl Validate for Misdemeanor {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.common.validate()?;
        if self.fine_amount < Decimal::ZERO {
            return Err(ContractViolation::InvalidValue {
                field: "misdemeanor.fine_amount",
                reason: "must not be negative",
            });
        }
        validate_sentencing_date(
            "misdemeanor.sentencing_date",
            &self.common,
            self.disposition,
        )
    }
}

/// Arrest-only case: no charges filed, always `resolved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrest {
    pub common: CaseCommon,
}

impl Arrest {
    pub fn v1(mut common: CaseCommon) -> Result<Self, ContractViolation> {
        common.resolved = true;
        let arrest = Self { common };
        arrest.validate()?;
        Ok(arrest)
    }

    pub fn case_id(&self) -> &CaseId {
        &self.common.case_id
    }
}

impl Validate for Arrest {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.common.validate()?;
        if !self.common.resolved {
            return Err(ContractViolation::InvalidValue {
                field: "arrest.resolved",
                reason: "must be true for arrest-only cases",
            });
        }
        Ok(())
    }
}

/// Tagged union over the three case variants, dispatched by exhaustive
/// pattern matching rather than field-presence probing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseRecord {
    Arrest(Arrest),
    Misdemeanor(Misdemeanor),
    Felony(Felony),
}

impl CaseRecord {
    pub fn common(&self) -> &CaseCommon {
        match self {
            CaseRecord::Arrest(a) => &a.common,
            CaseRecord::Misdemeanor(m) => &m.common,
            CaseRecord::Felony(f) => &f.common,
        }
    }

    pub fn case_id(&self) -> &CaseId {
        &self.common().case_id
    }

    pub fn kind(&self) -> CaseKind {
        match self {
            CaseRecord::Arrest(_) => CaseKind::Arrest,
            CaseRecord::Misdemeanor(_) => CaseKind::Misdemeanor,
            CaseRecord::Felony(_) => CaseKind::Felony,
        }
    }
}

impl Validate for CaseRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            CaseRecord::Arrest(a) => a.validate(),
            CaseRecord::Misdemeanor(m) => m.validate(),
            CaseRecord::Felony(f) => f.validate(),
        }
    }
}
