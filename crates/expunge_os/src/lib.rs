#![forbid(unsafe_code)]

//! Orchestration layer: record ingestion, the fixed-order screening run,
//! and the question-driven intake session.

pub mod intake;
pub mod screening;
