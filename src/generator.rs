//! Lockfile generation for projects that do not commit `Cargo.lock`.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::locator::{Locator, MANIFEST};
use crate::runner::{parent_dir, CommandRunner, Invocation};

pub struct LockfileGenerator<'a> {
    cargo: &'a str,
    runner: &'a dyn CommandRunner,
}

impl<'a> LockfileGenerator<'a> {
    pub fn new(cargo: &'a str, runner: &'a dyn CommandRunner) -> Self {
        Self { cargo, runner }
    }

    /// Picks the manifest to generate from: `<root>/Cargo.toml` if present,
    /// otherwise the shallowest non-vendored manifest under `root`.
    pub fn find_manifest(locator: &Locator, root: &Path) -> Result<PathBuf> {
        let top = root.join(MANIFEST);
        if top.is_file() {
            return Ok(top);
        }

        locator
            .find(root, MANIFEST)?
            .into_iter()
            .min_by_key(|p| p.components().count())
            .ok_or_else(|| Error::NoManifest {
                root: root.to_path_buf(),
            })
    }

    pub fn invocation(&self, manifest: &Path) -> Invocation {
        Invocation::new(
            self.cargo,
            [
                "generate-lockfile".to_string(),
                "--manifest-path".to_string(),
                manifest.display().to_string(),
            ],
        )
        .current_dir(parent_dir(manifest))
    }

    /// Runs `cargo generate-lockfile` against `manifest`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GenerationFailed`] on a non-zero exit, carrying the
    /// combined output of the command.
    pub async fn generate(&self, manifest: &Path) -> Result<()> {
        tracing::info!(manifest = %manifest.display(), "no Cargo.lock found, generating one");

        let output = self.runner.run(&self.invocation(manifest)).await?;
        if output.success() {
            return Ok(());
        }

        Err(Error::GenerationFailed {
            manifest: manifest.to_path_buf(),
            status: output.status_label(),
            output: output.combined(),
        })
    }
}
