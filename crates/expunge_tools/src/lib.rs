#![forbid(unsafe_code)]

//! Operator tooling: the case-file loader and the report renderer backing
//! the `expunge` binary.

pub mod case_file;
