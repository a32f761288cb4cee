//! Post-generation checks on heat sets.
//!
//! [`validate`] is the hard gate: any structural conflict rejects the
//! schedule. [`audit`] looks at fairness and completeness and only reports.

mod audit;
mod structure;

pub use audit::{audit, AuditReport, Finding};
pub use structure::validate;
