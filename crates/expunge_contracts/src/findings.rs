#![forbid(unsafe_code)]

use chrono::NaiveDate;
use serde::Serialize;

use crate::cases::{CaseId, CaseKind};
use crate::{ContractViolation, ReasonCodeId, SchemaVersion, Validate};

pub const FINDINGS_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictClass {
    Expungeable,
    NotExpungeable,
}

impl VerdictClass {
    pub fn as_str(self) -> &'static str {
        match self {
            VerdictClass::Expungeable => "EXPUNGEABLE",
            VerdictClass::NotExpungeable => "NOT_EXPUNGEABLE",
        }
    }
}

/// Per-case structured detail recorded next to the ledger's verdict string.
/// `re_eligibility_date` is present only for denials that name a date after
/// which the client may screen again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseFinding {
    pub schema_version: SchemaVersion,
    pub case_id: CaseId,
    pub kind: CaseKind,
    pub verdict: VerdictClass,
    pub reason_code: ReasonCodeId,
    pub message: String,
    pub re_eligibility_date: Option<NaiveDate>,
}

impl CaseFinding {
    pub fn v1(
        case_id: CaseId,
        kind: CaseKind,
        verdict: VerdictClass,
        reason_code: ReasonCodeId,
        message: String,
        re_eligibility_date: Option<NaiveDate>,
    ) -> Result<Self, ContractViolation> {
        let finding = Self {
            schema_version: FINDINGS_CONTRACT_VERSION,
            case_id,
            kind,
            verdict,
            reason_code,
            message,
            re_eligibility_date,
        };
        finding.validate()?;
        Ok(finding)
    }
}

impl Validate for CaseFinding {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != FINDINGS_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "case_finding.schema_version",
                reason: "must match FINDINGS_CONTRACT_VERSION",
            });
        }
        self.case_id.validate()?;
        if self.message.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "case_finding.message",
                reason: "must not be empty",
            });
        }
        if self.verdict == VerdictClass::Expungeable && self.re_eligibility_date.is_some() {
            return Err(ContractViolation::InvalidValue {
                field: "case_finding.re_eligibility_date",
                reason: "must be None for expungeable verdicts",
            });
        }
        Ok(())
    }
}
