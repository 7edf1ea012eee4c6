//! Core data types for audit findings and run summaries.
//!
//! - [`VulnerabilityRecord`] - One advisory affecting a locked package
//! - [`AuditWarning`] - An informational finding (unmaintained, yanked, ...)
//! - [`Severity`] - Severity band derived from a CVSS score
//! - [`AuditResult`] - Outcome of auditing a single lockfile
//! - [`AuditSummary`] - Aggregate over every lockfile in a run
//!
//! # Example
//!
//! ```
//! use lockfile_audit::model::{AuditResult, AuditSummary};
//! use std::path::PathBuf;
//!
//! let result = AuditResult::clean(PathBuf::from("/proj/Cargo.lock"));
//! let summary = AuditSummary::new(PathBuf::from("/proj"), vec![result]);
//!
//! assert!(!summary.is_vulnerable());
//! ```

mod advisory;
mod result;

pub use advisory::*;
pub use result::*;
