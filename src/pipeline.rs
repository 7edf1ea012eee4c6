//! Locate, generate if needed, then audit every lockfile under a source tree.

use futures::future::join_all;
use std::path::{Path, PathBuf};

use crate::auditor::Auditor;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::generator::LockfileGenerator;
use crate::locator::{Locator, LOCKFILE};
use crate::model::{AuditResult, AuditSummary};
use crate::runner::{parent_dir, CommandRunner};

/// One audit run over a source tree.
///
/// # Example
///
/// ```no_run
/// use lockfile_audit::{Config, Pipeline, ProcessRunner};
/// use std::path::Path;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = Config::default();
///     let runner = ProcessRunner::new(config.timeout());
///     let summary = Pipeline::new(&config, &runner).run(Path::new(".")).await?;
///     println!("vulnerable: {}", summary.is_vulnerable());
///     Ok(())
/// }
/// ```
pub struct Pipeline<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
    parallel: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner) -> Self {
        Self {
            config,
            runner,
            parallel: false,
        }
    }

    /// Audit lockfiles concurrently instead of one after another.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Runs the whole pipeline.
    ///
    /// Findings are reported through the returned summary. Any error is
    /// fatal to the run.
    pub async fn run(&self, srcdir: &Path) -> Result<AuditSummary> {
        let root = std::fs::canonicalize(srcdir).map_err(|source| Error::SourceDir {
            path: srcdir.to_path_buf(),
            source,
        })?;
        let locator = Locator::from_config(self.config);

        let mut lockfiles = locator.find(&root, LOCKFILE)?;
        let mut generated = None;

        if lockfiles.is_empty() {
            let lockfile = self.generate(&locator, &root).await?;
            generated = Some(lockfile.clone());
            lockfiles.push(lockfile);
        }

        tracing::info!(root = %root.display(), count = lockfiles.len(), "lockfiles to audit");

        let results = self.audit_all(&lockfiles).await?;
        let summary = AuditSummary::new(root, results);
        Ok(match generated {
            Some(lockfile) => summary.with_generated(lockfile),
            None => summary,
        })
    }

    async fn generate(&self, locator: &Locator, root: &Path) -> Result<PathBuf> {
        let manifest = LockfileGenerator::find_manifest(locator, root)?;
        LockfileGenerator::new(&self.config.cargo, self.runner)
            .generate(&manifest)
            .await?;

        // Workspace members get their lockfile at the workspace root, which
        // may sit elsewhere under `root`.
        let expected = parent_dir(&manifest).join(LOCKFILE);
        if expected.is_file() {
            return Ok(expected);
        }
        locator
            .find(root, LOCKFILE)?
            .into_iter()
            .next()
            .ok_or(Error::LockfileMissing { manifest })
    }

    async fn audit_all(&self, lockfiles: &[PathBuf]) -> Result<Vec<AuditResult>> {
        let auditor = Auditor::new(self.config, self.runner);

        if self.parallel && lockfiles.len() > 1 {
            let audits = lockfiles.iter().map(|lockfile| auditor.audit(lockfile));
            return join_all(audits).await.into_iter().collect();
        }

        let mut results = Vec::with_capacity(lockfiles.len());
        for lockfile in lockfiles {
            results.push(auditor.audit(lockfile).await?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::{output, ScriptedRunner};
    use std::fs;
    use tempfile::TempDir;

    const CLEAN: &str = r#"{"vulnerabilities":{"count":0,"list":[]}}"#;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[tokio::test]
    async fn test_empty_tree_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        let runner = ScriptedRunner::new(|_| Ok(output(0, CLEAN)));

        let err = Pipeline::new(&config, &runner)
            .run(dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoManifest { .. }));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_srcdir() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        let runner = ScriptedRunner::new(|_| Ok(output(0, CLEAN)));

        let err = Pipeline::new(&config, &runner)
            .run(&dir.path().join("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SourceDir { .. }));
    }

    #[tokio::test]
    async fn test_generation_then_audit() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Cargo.toml");
        let root = fs::canonicalize(dir.path()).unwrap();

        let lock_path = root.join("Cargo.lock");
        let runner = ScriptedRunner::new(move |inv| {
            if inv.has_arg("generate-lockfile") {
                fs::write(&lock_path, "# generated").unwrap();
                Ok(output(0, ""))
            } else {
                Ok(output(0, CLEAN))
            }
        });
        let config = Config::default();

        let summary = Pipeline::new(&config, &runner).run(dir.path()).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        let expected_manifest = root.join("Cargo.toml").display().to_string();
        assert_eq!(calls[0].arg_value("--manifest-path"), Some(expected_manifest.as_str()));
        let expected_lock = root.join("Cargo.lock").display().to_string();
        assert_eq!(calls[1].arg_value("--file"), Some(expected_lock.as_str()));
        assert_eq!(summary.generated_lockfile, Some(root.join("Cargo.lock")));
        assert!(!summary.is_vulnerable());
    }

    #[tokio::test]
    async fn test_generated_workspace_lockfile_is_found_by_locator() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "ws/member/Cargo.toml");
        let root = fs::canonicalize(dir.path()).unwrap();

        let workspace_lock = root.join("ws/Cargo.lock");
        let written = workspace_lock.clone();
        let runner = ScriptedRunner::new(move |inv| {
            if inv.has_arg("generate-lockfile") {
                fs::write(&written, "# generated").unwrap();
                Ok(output(0, ""))
            } else {
                Ok(output(0, CLEAN))
            }
        });
        let config = Config::default();

        let summary = Pipeline::new(&config, &runner).run(dir.path()).await.unwrap();

        let calls = runner.calls();
        let member = root.join("ws/member/Cargo.toml").display().to_string();
        assert_eq!(calls[0].arg_value("--manifest-path"), Some(member.as_str()));
        let audited = workspace_lock.display().to_string();
        assert_eq!(calls[1].arg_value("--file"), Some(audited.as_str()));
        assert_eq!(summary.generated_lockfile, Some(workspace_lock));
    }

    #[tokio::test]
    async fn test_manifest_dir_lockfile_wins_over_locator() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a/Cargo.toml");
        let root = fs::canonicalize(dir.path()).unwrap();

        let (sibling, own) = (root.join("0/Cargo.lock"), root.join("a/Cargo.lock"));
        let (s, o) = (sibling.clone(), own.clone());
        let runner = ScriptedRunner::new(move |inv| {
            if inv.has_arg("generate-lockfile") {
                fs::create_dir_all(s.parent().unwrap()).unwrap();
                fs::write(&s, "").unwrap();
                fs::write(&o, "").unwrap();
                Ok(output(0, ""))
            } else {
                Ok(output(0, CLEAN))
            }
        });
        let config = Config::default();

        let summary = Pipeline::new(&config, &runner).run(dir.path()).await.unwrap();

        assert_eq!(summary.generated_lockfile, Some(own));
        assert_eq!(summary.results.len(), 1);
    }

    #[tokio::test]
    async fn test_generation_without_lockfile_on_disk() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Cargo.toml");
        let runner = ScriptedRunner::new(|_| Ok(output(0, "")));
        let config = Config::default();

        let err = Pipeline::new(&config, &runner)
            .run(dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LockfileMissing { .. }));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_parallel_keeps_worklist_order() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a/Cargo.lock");
        touch(dir.path(), "b/Cargo.lock");
        touch(dir.path(), "c/Cargo.lock");
        let runner = ScriptedRunner::new(|_| Ok(output(0, CLEAN)));
        let config = Config::default();

        let summary = Pipeline::new(&config, &runner)
            .parallel(true)
            .run(dir.path())
            .await
            .unwrap();

        let names: Vec<_> = summary
            .results
            .iter()
            .map(|r| {
                r.lockfile
                    .parent()
                    .unwrap()
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(runner.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_audit_error_stops_sequential_run() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a/Cargo.lock");
        touch(dir.path(), "b/Cargo.lock");
        let runner = ScriptedRunner::new(|_| Ok(output(1, "garbage")));
        let config = Config::default();

        let err = Pipeline::new(&config, &runner)
            .run(dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedOutput { .. }));
        assert_eq!(runner.calls().len(), 1);
    }
}
