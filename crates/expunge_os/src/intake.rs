#![forbid(unsafe_code)]

//! Question-driven intake session.
//!
//! The session hands typed question batches to a collaborating transport
//! (web form, CLI prompt loop) and consumes answer batches until it has a
//! full docket or the preliminary screen disqualifies the client. At most
//! one batch is outstanding at a time, and answer batches must echo the
//! batch id they answer.

use expunge_contracts::cases::{
    Arrest, CaseCommon, CaseId, CaseRecord, Disposition, Felony, Misdemeanor,
};
use expunge_contracts::intake::{
    AnswerBatch, AnswerValue, BatchId, IntakeSessionState, Question, QuestionBatch, ResponseKind,
};
use expunge_contracts::ContractViolation;

pub const DISQUALIFIED_MESSAGE: &str = "This client is not eligible for expungement.";

const MAX_SESSION_CASES: i64 = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum IntakeError {
    Contract(ContractViolation),
    /// Answer batch does not echo the outstanding question batch.
    BatchMismatch { expected: BatchId, got: BatchId },
    AnswerCount { expected: usize, got: usize },
    AnswerType {
        key: String,
        expected: ResponseKind,
        got: ResponseKind,
    },
    InvalidAnswer {
        key: &'static str,
        reason: &'static str,
    },
    /// `begin` called twice, or `submit` after the session finished.
    SessionClosed,
}

impl From<ContractViolation> for IntakeError {
    fn from(violation: ContractViolation) -> Self {
        IntakeError::Contract(violation)
    }
}

/// The docket assembled by a completed session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatheredCases {
    pub arrests: Vec<Arrest>,
    pub misdemeanors: Vec<Misdemeanor>,
    pub felonies: Vec<Felony>,
}

impl GatheredCases {
    /// Flattens the docket into tagged records, in intake order per kind.
    pub fn records(&self) -> Vec<CaseRecord> {
        let mut records = Vec::with_capacity(
            self.arrests.len() + self.misdemeanors.len() + self.felonies.len(),
        );
        records.extend(self.arrests.iter().cloned().map(CaseRecord::Arrest));
        records.extend(
            self.misdemeanors
                .iter()
                .cloned()
                .map(CaseRecord::Misdemeanor),
        );
        records.extend(self.felonies.iter().cloned().map(CaseRecord::Felony));
        records
    }
}

/// What the transport should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeStep {
    Ask(QuestionBatch),
    Disqualified { message: &'static str },
    Complete(GatheredCases),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseKindChoice {
    Felony,
    Misdemeanor,
    Arrest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Fresh,
    Prelim,
    CaseType { remaining: u32 },
    CaseDetail { remaining: u32, kind: CaseKindChoice },
    Complete,
    Disqualified,
}

#[derive(Debug, Clone)]
pub struct IntakeSession {
    phase: Phase,
    next_batch: u64,
    outstanding: Option<QuestionBatch>,
    gathered: GatheredCases,
}

impl Default for IntakeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl IntakeSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Fresh,
            next_batch: 0,
            outstanding: None,
            gathered: GatheredCases::default(),
        }
    }

    pub fn state(&self) -> IntakeSessionState {
        match self.phase {
            Phase::Complete => IntakeSessionState::Complete,
            Phase::Disqualified => IntakeSessionState::Disqualified,
            _ => IntakeSessionState::Collecting,
        }
    }

    /// Starts the session with the preliminary screen. Callable once.
    pub fn begin(&mut self) -> Result<IntakeStep, IntakeError> {
        if self.phase != Phase::Fresh {
            return Err(IntakeError::SessionClosed);
        }
        self.phase = Phase::Prelim;
        let batch = self.issue(vec![
            Question::v1(
                "pending_charges",
                "Does the client have any pending charges?",
                ResponseKind::Bool,
            )?,
            Question::v1(
                "out_of_state_convictions",
                "Does the client have convictions in another state?",
                ResponseKind::Bool,
            )?,
            Question::v1(
                "serving_sentence",
                "Is the client currently serving a sentence?",
                ResponseKind::Bool,
            )?,
            Question::v1(
                "num_cases",
                "How many cases should be screened?",
                ResponseKind::Int,
            )?,
        ])?;
        Ok(IntakeStep::Ask(batch))
    }

    /// Consumes one answer batch and advances the session.
    pub fn submit(&mut self, answers: &AnswerBatch) -> Result<IntakeStep, IntakeError> {
        self.check_echo(answers)?;
        match self.phase {
            Phase::Prelim => self.submit_prelim(answers),
            Phase::CaseType { remaining } => self.submit_case_type(answers, remaining),
            Phase::CaseDetail { remaining, kind } => {
                self.submit_case_detail(answers, remaining, kind)
            }
            Phase::Fresh | Phase::Complete | Phase::Disqualified => {
                Err(IntakeError::SessionClosed)
            }
        }
    }

    fn submit_prelim(&mut self, answers: &AnswerBatch) -> Result<IntakeStep, IntakeError> {
        let values = &answers.answers;
        let pending = bool_at(values, 0, "pending_charges")?;
        let out_of_state = bool_at(values, 1, "out_of_state_convictions")?;
        let serving = bool_at(values, 2, "serving_sentence")?;
        let num_cases = int_at(values, 3, "num_cases")?;

        if pending || out_of_state || serving {
            self.phase = Phase::Disqualified;
            self.outstanding = None;
            return Ok(IntakeStep::Disqualified {
                message: DISQUALIFIED_MESSAGE,
            });
        }
        if !(0..=MAX_SESSION_CASES).contains(&num_cases) {
            return Err(IntakeError::InvalidAnswer {
                key: "num_cases",
                reason: "must be between 0 and 200",
            });
        }
        if num_cases == 0 {
            return self.finish();
        }
        self.phase = Phase::CaseType {
            remaining: num_cases as u32,
        };
        self.ask_case_type()
    }

    fn submit_case_type(
        &mut self,
        answers: &AnswerBatch,
        remaining: u32,
    ) -> Result<IntakeStep, IntakeError> {
        let choice = match int_at(&answers.answers, 0, "case_type")? {
            0 => CaseKindChoice::Felony,
            1 => CaseKindChoice::Misdemeanor,
            2 => CaseKindChoice::Arrest,
            _ => {
                return Err(IntakeError::InvalidAnswer {
                    key: "case_type",
                    reason: "must be 0 (felony), 1 (misdemeanor), or 2 (arrest)",
                })
            }
        };
        self.phase = Phase::CaseDetail {
            remaining,
            kind: choice,
        };
        let questions = match choice {
            CaseKindChoice::Arrest => arrest_questions()?,
            CaseKindChoice::Misdemeanor => misdemeanor_questions()?,
            CaseKindChoice::Felony => felony_questions()?,
        };
        let batch = self.issue(questions)?;
        Ok(IntakeStep::Ask(batch))
    }

    fn submit_case_detail(
        &mut self,
        answers: &AnswerBatch,
        remaining: u32,
        kind: CaseKindChoice,
    ) -> Result<IntakeStep, IntakeError> {
        let values = &answers.answers;
        match kind {
            CaseKindChoice::Arrest => {
                let common = self.shared_common(values, /*resolved=*/ true, false)?;
                self.gathered.arrests.push(Arrest::v1(common)?);
            }
            CaseKindChoice::Misdemeanor => {
                let resolved = bool_at(values, 3, "resolved")?;
                let disposition = disposition_at(values, 4)?;
                let common = self.case_common(values, resolved)?;
                let fine_amount = money_at(values, 9, "fine_amount")?;
                let imprisoned = bool_at(values, 10, "imprisoned")?;
                self.gathered.misdemeanors.push(Misdemeanor::v1(
                    common,
                    fine_amount,
                    imprisoned,
                    disposition,
                )?);
            }
            CaseKindChoice::Felony => {
                let resolved = bool_at(values, 3, "resolved")?;
                let disposition = disposition_at(values, 4)?;
                let common = self.case_common(values, resolved)?;
                let counts = text_list_at(values, 9, "counts")?;
                self.gathered
                    .felonies
                    .push(Felony::v1(common, counts, disposition)?);
            }
        }
        if remaining <= 1 {
            return self.finish();
        }
        self.phase = Phase::CaseType {
            remaining: remaining - 1,
        };
        self.ask_case_type()
    }

    /// Common fields for the arrest batch (case id, agency, court only).
    fn shared_common(
        &self,
        values: &[AnswerValue],
        resolved: bool,
        expir_no_risk: bool,
    ) -> Result<CaseCommon, IntakeError> {
        Ok(CaseCommon::v1(
            CaseId(text_at(values, 0, "case_id")?),
            text_at(values, 1, "arresting_agency")?,
            text_at(values, 2, "court")?,
            resolved,
            None,
            false,
            expir_no_risk,
            false,
        )?)
    }

    /// Common fields for the full misdemeanor/felony batches.
    fn case_common(
        &self,
        values: &[AnswerValue],
        resolved: bool,
    ) -> Result<CaseCommon, IntakeError> {
        Ok(CaseCommon::v1(
            CaseId(text_at(values, 0, "case_id")?),
            text_at(values, 1, "arresting_agency")?,
            text_at(values, 2, "court")?,
            resolved,
            Some(date_at(values, 5, "sentencing_date")?),
            bool_at(values, 6, "fines_paid")?,
            bool_at(values, 7, "expir_no_risk")?,
            bool_at(values, 8, "treatment_complete")?,
        )?)
    }

    fn ask_case_type(&mut self) -> Result<IntakeStep, IntakeError> {
        let batch = self.issue(vec![Question::v1(
            "case_type",
            "What kind of case is this? 0 = felony, 1 = misdemeanor, 2 = arrest without charges",
            ResponseKind::Int,
        )?])?;
        Ok(IntakeStep::Ask(batch))
    }

    fn finish(&mut self) -> Result<IntakeStep, IntakeError> {
        self.phase = Phase::Complete;
        self.outstanding = None;
        Ok(IntakeStep::Complete(std::mem::take(&mut self.gathered)))
    }

    fn issue(&mut self, questions: Vec<Question>) -> Result<QuestionBatch, IntakeError> {
        self.next_batch += 1;
        let batch = QuestionBatch::v1(BatchId(self.next_batch), questions)?;
        self.outstanding = Some(batch.clone());
        Ok(batch)
    }

    /// Answer batches must echo the outstanding batch id, carry one answer
    /// per question, and type-match every question.
    fn check_echo(&self, answers: &AnswerBatch) -> Result<(), IntakeError> {
        let outstanding = self.outstanding.as_ref().ok_or(IntakeError::SessionClosed)?;
        if answers.batch_id != outstanding.batch_id {
            return Err(IntakeError::BatchMismatch {
                expected: outstanding.batch_id,
                got: answers.batch_id,
            });
        }
        if answers.answers.len() != outstanding.questions.len() {
            return Err(IntakeError::AnswerCount {
                expected: outstanding.questions.len(),
                got: answers.answers.len(),
            });
        }
        for (question, answer) in outstanding.questions.iter().zip(&answers.answers) {
            if answer.kind() != question.response_kind {
                return Err(IntakeError::AnswerType {
                    key: question.key.clone(),
                    expected: question.response_kind,
                    got: answer.kind(),
                });
            }
        }
        Ok(())
    }
}

fn shared_case_questions() -> Result<Vec<Question>, ContractViolation> {
    Ok(vec![
        Question::v1("case_id", "What is the case number?", ResponseKind::Text)?,
        Question::v1(
            "arresting_agency",
            "Which agency made the arrest?",
            ResponseKind::Text,
        )?,
        Question::v1("court", "Which court heard the case?", ResponseKind::Text)?,
        Question::v1(
            "resolved",
            "Was the case resolved favorably (acquittal, reversal, DNA dismissal, full pardon, identity theft)?",
            ResponseKind::Bool,
        )?,
        Question::v1(
            "disposition",
            "What was the outcome? 1 = conviction, 2 = dismissed, 3 = deferred, 4 = dismissed after drug court",
            ResponseKind::Int,
        )?,
        Question::v1(
            "sentencing_date",
            "When did the sentence end (or when was the case dismissed)?",
            ResponseKind::Date,
        )?,
        Question::v1(
            "fines_paid",
            "Have all fines, fees, and restitution been paid?",
            ResponseKind::Bool,
        )?,
        Question::v1(
            "expir_no_risk",
            "Has the statute of limitations expired, or has the DA confirmed they will not refile?",
            ResponseKind::Bool,
        )?,
        Question::v1(
            "treatment_complete",
            "Were all required treatment programs completed?",
            ResponseKind::Bool,
        )?,
    ])
}

fn felony_questions() -> Result<Vec<Question>, ContractViolation> {
    let mut questions = shared_case_questions()?;
    questions.push(Question::v1(
        "counts",
        "List each felony count with its exact charge wording.",
        ResponseKind::TextList,
    )?);
    Ok(questions)
}

fn misdemeanor_questions() -> Result<Vec<Question>, ContractViolation> {
    let mut questions = shared_case_questions()?;
    questions.push(Question::v1(
        "fine_amount",
        "What was the fine amount in dollars?",
        ResponseKind::Money,
    )?);
    questions.push(Question::v1(
        "imprisoned",
        "Was the client imprisoned for this case?",
        ResponseKind::Bool,
    )?);
    Ok(questions)
}

fn arrest_questions() -> Result<Vec<Question>, ContractViolation> {
    Ok(vec![
        Question::v1("case_id", "What is the case number?", ResponseKind::Text)?,
        Question::v1(
            "arresting_agency",
            "Which agency made the arrest?",
            ResponseKind::Text,
        )?,
        Question::v1("court", "Which court was the arrest filed in?", ResponseKind::Text)?,
    ])
}

fn bool_at(values: &[AnswerValue], idx: usize, key: &'static str) -> Result<bool, IntakeError> {
    match values.get(idx) {
        Some(AnswerValue::Bool(value)) => Ok(*value),
        _ => Err(IntakeError::InvalidAnswer {
            key,
            reason: "expected a boolean answer",
        }),
    }
}

fn int_at(values: &[AnswerValue], idx: usize, key: &'static str) -> Result<i64, IntakeError> {
    match values.get(idx) {
        Some(AnswerValue::Int(value)) => Ok(*value),
        _ => Err(IntakeError::InvalidAnswer {
            key,
            reason: "expected an integer answer",
        }),
    }
}

fn money_at(
    values: &[AnswerValue],
    idx: usize,
    key: &'static str,
) -> Result<rust_decimal::Decimal, IntakeError> {
    match values.get(idx) {
        Some(AnswerValue::Money(value)) => Ok(*value),
        _ => Err(IntakeError::InvalidAnswer {
            key,
            reason: "expected a money answer",
        }),
    }
}

fn text_at(values: &[AnswerValue], idx: usize, key: &'static str) -> Result<String, IntakeError> {
    match values.get(idx) {
        Some(AnswerValue::Text(value)) => Ok(value.clone()),
        _ => Err(IntakeError::InvalidAnswer {
            key,
            reason: "expected a text answer",
        }),
    }
}

fn date_at(
    values: &[AnswerValue],
    idx: usize,
    key: &'static str,
) -> Result<chrono::NaiveDate, IntakeError> {
    match values.get(idx) {
        Some(AnswerValue::Date(value)) => Ok(*value),
        _ => Err(IntakeError::InvalidAnswer {
            key,
            reason: "expected a date answer",
        }),
    }
}

fn text_list_at(
    values: &[AnswerValue],
    idx: usize,
    key: &'static str,
) -> Result<Vec<String>, IntakeError> {
    match values.get(idx) {
        Some(AnswerValue::TextList(value)) => Ok(value.clone()),
        _ => Err(IntakeError::InvalidAnswer {
            key,
            reason: "expected a list of text answers",
        }),
    }
}

fn disposition_at(values: &[AnswerValue], idx: usize) -> Result<Disposition, IntakeError> {
    match int_at(values, idx, "disposition")? {
        1 => Ok(Disposition::Conviction),
        2 => Ok(Disposition::Dismissed),
        3 => Ok(Disposition::Deferred),
        4 => Ok(Disposition::DrugCourtDismissed),
        _ => Err(IntakeError::InvalidAnswer {
            key: "disposition",
            reason: "must be 1 (conviction), 2 (dismissed), 3 (deferred), or 4 (drug court)",
        }),
    }
}
