#![forbid(unsafe_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::{validate_label, validate_token_ascii};
use crate::{ContractViolation, SchemaVersion, Validate};

pub const INTAKE_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

const MAX_BATCH_QUESTIONS: usize = 24;

/// Identifier of one question batch within an intake session. Batch ids are
/// monotonically increasing per session and must be echoed back on the
/// matching answer batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchId(pub u64);

/// Typed response expected for a question. The transport decodes raw form
/// values into exactly this kind before answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Bool,
    Int,
    Money,
    Text,
    Date,
    TextList,
}

impl ResponseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseKind::Bool => "BOOL",
            ResponseKind::Int => "INT",
            ResponseKind::Money => "MONEY",
            ResponseKind::Text => "TEXT",
            ResponseKind::Date => "DATE",
            ResponseKind::TextList => "TEXT_LIST",
        }
    }
}

/// A typed answer supplied by the collaborating transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerValue {
    Bool(bool),
    Int(i64),
    Money(Decimal),
    Text(String),
    Date(NaiveDate),
    TextList(Vec<String>),
}

impl AnswerValue {
    pub fn kind(&self) -> ResponseKind {
        match self {
            AnswerValue::Bool(_) => ResponseKind::Bool,
            AnswerValue::Int(_) => ResponseKind::Int,
            AnswerValue::Money(_) => ResponseKind::Money,
            AnswerValue::Text(_) => ResponseKind::Text,
            AnswerValue::Date(_) => ResponseKind::Date,
            AnswerValue::TextList(_) => ResponseKind::TextList,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub key: String,
    pub prompt: String,
    pub response_kind: ResponseKind,
}

impl Question {
    pub fn v1(
        key: &str,
        prompt: &str,
        response_kind: ResponseKind,
    ) -> Result<Self, ContractViolation> {
        let question = Self {
            key: key.to_string(),
            prompt: prompt.to_string(),
            response_kind,
        };
        question.validate()?;
        Ok(question)
    }
}

impl Validate for Question {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_token_ascii("question.key", &self.key, 64)?;
        validate_label("question.prompt", &self.prompt, 300)
    }
}

/// One batch of questions handed to the transport. At most one batch is
/// outstanding per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBatch {
    pub schema_version: SchemaVersion,
    pub batch_id: BatchId,
    pub questions: Vec<Question>,
}

impl QuestionBatch {
    pub fn v1(batch_id: BatchId, questions: Vec<Question>) -> Result<Self, ContractViolation> {
        let batch = Self {
            schema_version: INTAKE_CONTRACT_VERSION,
            batch_id,
            questions,
        };
        batch.validate()?;
        Ok(batch)
    }
}

impl Validate for QuestionBatch {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != INTAKE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "question_batch.schema_version",
                reason: "must match INTAKE_CONTRACT_VERSION",
            });
        }
        if self.questions.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "question_batch.questions",
                reason: "must not be empty",
            });
        }
        if self.questions.len() > MAX_BATCH_QUESTIONS {
            return Err(ContractViolation::InvalidValue {
                field: "question_batch.questions",
                reason: "exceeds max questions per batch",
            });
        }
        for question in &self.questions {
            question.validate()?;
        }
        Ok(())
    }
}

/// The transport's reply to a question batch: one answer per question, in
/// question order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerBatch {
    pub schema_version: SchemaVersion,
    pub batch_id: BatchId,
    pub answers: Vec<AnswerValue>,
}

impl AnswerBatch {
    pub fn v1(batch_id: BatchId, answers: Vec<AnswerValue>) -> Result<Self, ContractViolation> {
        let batch = Self {
            schema_version: INTAKE_CONTRACT_VERSION,
            batch_id,
            answers,
        };
        batch.validate()?;
        Ok(batch)
    }
}

impl Validate for AnswerBatch {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != INTAKE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "answer_batch.schema_version",
                reason: "must match INTAKE_CONTRACT_VERSION",
            });
        }
        if self.answers.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "answer_batch.answers",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeSessionState {
    Collecting,
    Complete,
    Disqualified,
}
