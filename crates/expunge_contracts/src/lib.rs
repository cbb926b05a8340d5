#![forbid(unsafe_code)]

pub mod cases;
pub mod common;
pub mod findings;
pub mod intake;
pub mod ledger;
pub mod statutes;

pub use common::{ContractViolation, ReasonCodeId, SchemaVersion, Validate};
