//! Final gate: outcome logging and the JSON report file.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::error::Error;
use crate::model::AuditSummary;

/// Logs the overall outcome of a run.
///
/// Per-finding diagnostics are emitted by the auditor; this only adds the
/// closing summary line.
pub fn log_outcome(summary: &AuditSummary) {
    if summary.is_vulnerable() {
        let lockfiles: Vec<String> = summary
            .vulnerable_lockfiles()
            .map(|r| r.lockfile.display().to_string())
            .collect();
        tracing::error!(
            vulnerabilities = summary.total_vulnerabilities(),
            lockfiles = ?lockfiles,
            "vulnerabilities found in {} lockfile(s)",
            lockfiles.len()
        );
    } else {
        tracing::info!(
            lockfiles = summary.results.len(),
            "no vulnerabilities found"
        );
    }
}

/// Logs the error that ended a run. This is the only place fatal errors are
/// logged; tool output carried by the error is attached as a field.
pub fn log_fatal(err: &anyhow::Error) {
    match err.downcast_ref::<Error>() {
        Some(Error::GenerationFailed { output, .. }) => {
            tracing::error!(output = %output, "{:#}", err)
        }
        Some(Error::MalformedOutput { stderr, .. }) => {
            tracing::error!(stderr = %stderr, "{:#}", err)
        }
        _ => tracing::error!("{:#}", err),
    }
}

/// Writes the summary as pretty JSON, creating parent directories.
pub fn write_report(summary: &AuditSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create report directory: {:?}", parent))?;
        }
    }

    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json).with_context(|| format!("Failed to write report: {:?}", path))?;
    tracing::info!(path = %path.display(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuditResult, VulnerabilityRecord};
    use crate::runner::testing::LogBuffer;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_write_report_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports/audit.json");

        let mut result = AuditResult::clean(PathBuf::from("/proj/Cargo.lock"));
        result.vulnerability_count = 1;
        result.vulnerabilities = vec![VulnerabilityRecord::new(
            "RUSTSEC-2021-0001",
            "foo",
            Some("7.5".to_string()),
        )];
        let summary = AuditSummary::new(PathBuf::from("/proj"), vec![result]);

        write_report(&summary, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: AuditSummary = serde_json::from_str(&content).unwrap();
        assert!(parsed.is_vulnerable());
        assert_eq!(parsed.results[0].vulnerabilities[0].advisory_id, "RUSTSEC-2021-0001");
    }

    #[test]
    fn test_log_outcome_clean() {
        let logs = LogBuffer::default();
        let _guard = logs.install();

        let summary = AuditSummary::new(
            PathBuf::from("/proj"),
            vec![AuditResult::clean(PathBuf::from("/proj/Cargo.lock"))],
        );
        log_outcome(&summary);

        assert_eq!(logs.count("no vulnerabilities found"), 1);
        assert_eq!(logs.count("ERROR"), 0);
    }

    #[test]
    fn test_log_outcome_vulnerable() {
        let logs = LogBuffer::default();
        let _guard = logs.install();

        let mut vulnerable = AuditResult::clean(PathBuf::from("/proj/b/Cargo.lock"));
        vulnerable.vulnerability_count = 2;
        let summary = AuditSummary::new(
            PathBuf::from("/proj"),
            vec![AuditResult::clean(PathBuf::from("/proj/a/Cargo.lock")), vulnerable],
        );
        log_outcome(&summary);

        let line = logs.contents();
        assert_eq!(logs.count("vulnerabilities found in 1 lockfile(s)"), 1);
        assert!(line.contains("vulnerabilities=2"));
        assert!(line.contains("/proj/b/Cargo.lock"));
        assert!(!line.contains("/proj/a/Cargo.lock"));
    }

    #[test]
    fn test_log_fatal_attaches_tool_output_once() {
        let logs = LogBuffer::default();
        let _guard = logs.install();

        let err = anyhow::Error::from(Error::GenerationFailed {
            manifest: PathBuf::from("/proj/Cargo.toml"),
            status: "exit status: 101".to_string(),
            output: "error: failed to parse manifest".to_string(),
        });
        log_fatal(&err);

        assert_eq!(logs.count("lockfile generation failed"), 1);
        assert_eq!(logs.count("failed to parse manifest"), 1);
    }

    #[test]
    fn test_log_fatal_includes_context_chain() {
        let logs = LogBuffer::default();
        let _guard = logs.install();

        let err = anyhow::Error::from(Error::NoManifest {
            root: PathBuf::from("/proj"),
        })
        .context("audit run failed");
        log_fatal(&err);

        assert_eq!(
            logs.count("audit run failed: no Cargo.lock or Cargo.toml found under /proj"),
            1
        );
    }
}
