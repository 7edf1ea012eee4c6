//! `cargo audit` invocation and interpretation of its JSON report.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{Config, IgnoreConfig};
use crate::error::{Error, Result};
use crate::model::{AuditResult, AuditWarning, VulnerabilityRecord};
use crate::runner::{parent_dir, CommandOutput, CommandRunner, Invocation};

/// Lines of stderr kept on a malformed-output error.
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Deserialize)]
struct AuditReport {
    vulnerabilities: ReportVulnerabilities,
    #[serde(default)]
    warnings: BTreeMap<String, Vec<ReportWarning>>,
}

#[derive(Debug, Deserialize)]
struct ReportVulnerabilities {
    count: usize,
    #[serde(default)]
    list: Vec<ReportVulnerability>,
}

#[derive(Debug, Deserialize)]
struct ReportVulnerability {
    advisory: ReportAdvisory,
    package: Option<ReportPackage>,
    versions: Option<ReportVersions>,
}

#[derive(Debug, Deserialize)]
struct ReportAdvisory {
    id: String,
    package: String,
    cvss: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
    title: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReportPackage {
    name: String,
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReportVersions {
    #[serde(default)]
    patched: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReportWarning {
    kind: Option<String>,
    package: ReportPackage,
    advisory: Option<ReportWarningAdvisory>,
}

#[derive(Debug, Deserialize)]
struct ReportWarningAdvisory {
    id: String,
}

impl From<ReportVulnerability> for VulnerabilityRecord {
    fn from(v: ReportVulnerability) -> Self {
        let mut record = VulnerabilityRecord::new(v.advisory.id, v.advisory.package, v.advisory.cvss)
            .with_categories(v.advisory.categories);
        record.title = v.advisory.title;
        record.url = v.advisory.url;
        if let Some(version) = v.package.and_then(|p| p.version) {
            record = record.with_version(version);
        }
        if let Some(versions) = v.versions {
            record.patched = versions.patched;
        }
        record
    }
}

/// Runs `cargo audit` against single lockfiles.
pub struct Auditor<'a> {
    cargo: &'a str,
    advisory_db: Option<&'a Path>,
    ignore: &'a IgnoreConfig,
    runner: &'a dyn CommandRunner,
}

impl<'a> Auditor<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner) -> Self {
        Self {
            cargo: &config.cargo,
            advisory_db: config.advisory_db.as_deref(),
            ignore: &config.ignore,
            runner,
        }
    }

    /// Command line for auditing `lockfile` against the local advisory database.
    pub fn invocation(&self, lockfile: &Path) -> Invocation {
        let mut args = vec![
            "audit".to_string(),
            "--json".to_string(),
            "--no-fetch".to_string(),
            "--deny".to_string(),
            "warnings".to_string(),
        ];
        if let Some(db) = self.advisory_db {
            args.push("--db".to_string());
            args.push(db.display().to_string());
        }
        for id in &self.ignore.advisories {
            args.push("--ignore".to_string());
            args.push(id.clone());
        }
        args.push("--file".to_string());
        args.push(lockfile.display().to_string());

        Invocation::new(self.cargo, args).current_dir(parent_dir(lockfile))
    }

    /// Audits one lockfile.
    ///
    /// A non-zero exit status is expected when findings exist; the outcome is
    /// taken from the JSON report alone. Each finding is logged as a single
    /// diagnostic line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedOutput`] when stdout is not a `cargo audit`
    /// JSON report, and propagates spawn and timeout failures.
    pub async fn audit(&self, lockfile: &Path) -> Result<AuditResult> {
        tracing::info!(lockfile = %lockfile.display(), "auditing");

        let output = self.runner.run(&self.invocation(lockfile)).await?;
        let result = self.interpret(lockfile, &output)?;

        for record in &result.vulnerabilities {
            tracing::error!(
                lockfile = %lockfile.display(),
                advisory = %record.advisory_id,
                package = %record.package,
                cvss = %record.score(),
                categories = %record.categories_label(),
                "vulnerability found: {} in {} (cvss {}, categories: {})",
                record.advisory_id,
                record.package,
                record.score(),
                record.categories_label()
            );
        }
        for warning in &result.warnings {
            tracing::warn!(
                lockfile = %lockfile.display(),
                kind = %warning.kind,
                package = %warning.package,
                advisory = warning.advisory_id.as_deref().unwrap_or("-"),
                "advisory warning"
            );
        }
        if result.ignored > 0 {
            tracing::info!(
                lockfile = %lockfile.display(),
                ignored = result.ignored,
                "suppressed ignored findings"
            );
        }

        Ok(result)
    }

    fn interpret(&self, lockfile: &Path, output: &CommandOutput) -> Result<AuditResult> {
        let report: AuditReport =
            serde_json::from_str(&output.stdout).map_err(|source| Error::MalformedOutput {
                lockfile: lockfile.to_path_buf(),
                status: output.status_label(),
                stderr: stderr_tail(&output.stderr),
                source,
            })?;

        let reported = report.vulnerabilities.count;
        let (vulnerabilities, ignored): (Vec<_>, Vec<_>) = report
            .vulnerabilities
            .list
            .into_iter()
            .map(VulnerabilityRecord::from)
            .partition(|r| !self.is_ignored(r));

        let warnings = report
            .warnings
            .into_iter()
            .flat_map(|(kind, entries)| {
                entries.into_iter().map(move |w| AuditWarning {
                    kind: w.kind.unwrap_or_else(|| kind.clone()),
                    package: w.package.name,
                    version: w.package.version,
                    advisory_id: w.advisory.map(|a| a.id),
                })
            })
            .collect();

        Ok(AuditResult {
            lockfile: PathBuf::from(lockfile),
            returncode: output.code,
            vulnerability_count: reported.saturating_sub(ignored.len()),
            vulnerabilities,
            warnings,
            ignored: ignored.len(),
        })
    }

    fn is_ignored(&self, record: &VulnerabilityRecord) -> bool {
        self.ignore.should_ignore_advisory(&record.advisory_id)
            || self.ignore.should_ignore_package(&record.package)
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
