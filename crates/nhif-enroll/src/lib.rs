//! NHIF student enrollment portal.
//!
//! Registrant accounts submit one registration record each; administrators manage
//! the dynamic reference data behind the form dropdowns, review submissions, and
//! export pending records to a spreadsheet document. The export workflow is the
//! correctness-critical piece: each record is exported at most logically once per
//! batch, and an export either fully commits or leaves the store untouched.

pub mod config;
pub mod error;
pub mod portal;
pub mod telemetry;
