#![forbid(unsafe_code)]

//! Eligibility resolvers and the statute-matching oracle.
//!
//! Pure rule logic lives here; orchestration and record ingestion live in
//! `expunge_os`. Every resolver writes through the first-writer-wins ledger
//! in `expunge_contracts`, so running them in the fixed Arrest -> Felony ->
//! Misdemeanor order is what makes verdicts deterministic.

pub mod arrest;
pub mod felony;
pub mod messages;
pub mod misdemeanor;
pub mod statute_match;

mod outcome;
