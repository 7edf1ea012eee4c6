//! Error types for the audit pipeline.
//!
//! Vulnerability findings are not errors: they are carried by
//! [`AuditSummary`](crate::model::AuditSummary). Every variant here is fatal
//! to the run and maps to exit code 1 in the binary.

use std::path::PathBuf;

/// Fatal conditions raised while locating, generating or auditing lockfiles.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source directory is missing or cannot be resolved.
    #[error("cannot read source directory {}: {source}", path.display())]
    SourceDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither a lockfile nor a manifest exists under the source directory.
    #[error("no Cargo.lock or Cargo.toml found under {}", root.display())]
    NoManifest { root: PathBuf },

    /// An external tool could not be started.
    #[error("failed to execute `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool did not finish within the configured timeout.
    #[error("`{program}` did not finish within {secs}s")]
    Timeout { program: String, secs: u64 },

    /// `cargo generate-lockfile` exited unsuccessfully.
    #[error("lockfile generation failed for {} ({status})", manifest.display())]
    GenerationFailed {
        manifest: PathBuf,
        status: String,
        output: String,
    },

    /// Generation succeeded but no lockfile appeared on disk.
    #[error("no Cargo.lock present after generating from {}", manifest.display())]
    LockfileMissing { manifest: PathBuf },

    /// `cargo audit` printed something that is not its JSON report.
    #[error("unparseable audit output for {} ({status}): {source}", lockfile.display())]
    MalformedOutput {
        lockfile: PathBuf,
        status: String,
        stderr: String,
        #[source]
        source: serde_json::Error,
    },

    /// The local advisory database is not on disk. Audits run with
    /// `--no-fetch`, so it is never downloaded.
    #[error("advisory database not found at {} (set advisory_db or --advisory-db)", path.display())]
    AdvisoryDbMissing { path: PathBuf },

    /// The configuration file could not be read or parsed.
    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
