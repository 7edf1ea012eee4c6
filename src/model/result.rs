use super::{AuditWarning, VulnerabilityRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of auditing one lockfile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResult {
    pub lockfile: PathBuf,
    /// Exit code of the audit tool, `None` if it was killed by a signal.
    pub returncode: Option<i32>,
    pub vulnerability_count: usize,
    pub vulnerabilities: Vec<VulnerabilityRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<AuditWarning>,
    /// Findings suppressed by the ignore list.
    #[serde(default)]
    pub ignored: usize,
}

impl AuditResult {
    pub fn clean(lockfile: PathBuf) -> Self {
        Self {
            lockfile,
            returncode: Some(0),
            vulnerability_count: 0,
            vulnerabilities: Vec::new(),
            warnings: Vec::new(),
            ignored: 0,
        }
    }

    pub fn has_vulnerabilities(&self) -> bool {
        self.vulnerability_count > 0
    }
}

/// Aggregate of every audited lockfile in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSummary {
    pub scan_time: DateTime<Utc>,
    pub source_dir: PathBuf,
    /// Lockfile produced by `cargo generate-lockfile`, when the tree had none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_lockfile: Option<PathBuf>,
    pub results: Vec<AuditResult>,
}

impl AuditSummary {
    pub fn new(source_dir: PathBuf, results: Vec<AuditResult>) -> Self {
        Self {
            scan_time: Utc::now(),
            source_dir,
            generated_lockfile: None,
            results,
        }
    }

    pub fn with_generated(mut self, lockfile: PathBuf) -> Self {
        self.generated_lockfile = Some(lockfile);
        self
    }

    /// True if any lockfile reported at least one vulnerability.
    pub fn is_vulnerable(&self) -> bool {
        self.results.iter().any(AuditResult::has_vulnerabilities)
    }

    pub fn total_vulnerabilities(&self) -> usize {
        self.results.iter().map(|r| r.vulnerability_count).sum()
    }

    pub fn vulnerable_lockfiles(&self) -> impl Iterator<Item = &AuditResult> {
        self.results.iter().filter(|r| r.has_vulnerabilities())
    }
}
