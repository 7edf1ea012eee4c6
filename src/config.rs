//! Configuration file handling.
//!
//! The configuration file is optional. When `--config` is not given it is
//! looked up at:
//! - Linux: `~/.config/lockfile-audit/config.toml`
//! - macOS: `~/Library/Application Support/lockfile-audit/config.toml`
//! - Windows: `%APPDATA%\lockfile-audit\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! cargo = "cargo"
//! advisory_db = "/opt/advisory-db"   # must exist, it is never fetched
//! timeout_secs = 600
//! exclude_dirs = ["third_party"]
//! default_format = "table"
//!
//! [ignore]
//! advisories = ["RUSTSEC-2020-0071"]
//! packages = ["chrono", "tokio-*"]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Directory name that is never descended into when looking for lockfiles.
pub const VENDOR_DIR: &str = "vendor";

/// Application configuration.
///
/// Built once at program entry and passed by reference to each stage.
///
/// # Example
///
/// ```
/// use lockfile_audit::Config;
///
/// let config = Config::default();
/// assert_eq!(config.cargo, "cargo");
/// assert!(config.excluded_dirs().contains(&"vendor"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cargo executable used for both `generate-lockfile` and `audit`.
    ///
    /// Default: "cargo"
    pub cargo: String,

    /// Local advisory database passed as `--db`. The database is never fetched,
    /// so it must already exist on disk.
    ///
    /// Default: `$CARGO_HOME/advisory-db`, or `~/.cargo/advisory-db`
    pub advisory_db: Option<PathBuf>,

    /// Per-command timeout in seconds. No timeout when unset.
    pub timeout_secs: Option<u64>,

    /// Directory names skipped during discovery, in addition to `vendor`.
    pub exclude_dirs: Vec<String>,

    /// Summary format when no `--format` flag is provided.
    ///
    /// Valid values: "table", "json"
    /// Default: "table"
    pub default_format: String,

    /// Ignore list for accepted advisories.
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

/// Configuration for suppressing specific advisories or packages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Advisory IDs to ignore (e.g., "RUSTSEC-2020-0071").
    ///
    /// These are also forwarded to `cargo audit --ignore`.
    pub advisories: Vec<String>,

    /// Package names whose findings are suppressed.
    /// Supports glob patterns (e.g., "tokio-*").
    pub packages: Vec<String>,
}

impl IgnoreConfig {
    pub fn should_ignore_advisory(&self, advisory_id: &str) -> bool {
        self.advisories.iter().any(|id| id == advisory_id)
    }

    pub fn should_ignore_package(&self, package: &str) -> bool {
        self.packages
            .iter()
            .any(|pattern| glob_match(pattern, package))
    }
}

/// Matches a crate name against a pattern where `*` spans any run of characters.
///
/// Crate names are case-sensitive, but `-` and `_` are interchangeable
/// (`openssl_sys` and `openssl-sys` name the same crate on crates.io).
fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().map(fold_separator).collect();
    let name: Vec<char> = name.chars().map(fold_separator).collect();

    let (mut p, mut n) = (0, 0);
    // Position of the last `*` seen and the name index it currently absorbs up to.
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, n));
            p += 1;
        } else if p < pattern.len() && pattern[p] == name[n] {
            p += 1;
            n += 1;
        } else if let Some((star_p, star_n)) = star {
            p = star_p + 1;
            n = star_n + 1;
            star = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

fn fold_separator(c: char) -> char {
    if c == '_' {
        '-'
    } else {
        c
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cargo: "cargo".to_string(),
            advisory_db: None,
            timeout_secs: None,
            exclude_dirs: Vec::new(),
            default_format: "table".to_string(),
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or from [`Config::config_path`] when `None`.
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// file that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(Error::Config {
                    path,
                    message: "file does not exist".to_string(),
                });
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| Error::Config {
            path,
            message: e.to_string(),
        })
    }

    /// Returns the default path of the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lockfile-audit")
            .join("config.toml")
    }

    /// Directory names excluded from discovery. Always contains `vendor`.
    pub fn excluded_dirs(&self) -> Vec<&str> {
        let mut names = vec![VENDOR_DIR];
        for name in &self.exclude_dirs {
            if !names.contains(&name.as_str()) {
                names.push(name.as_str());
            }
        }
        names
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Location cargo-audit reads when no `--db` is given.
    pub fn default_advisory_db() -> PathBuf {
        let cargo_home = std::env::var_os("CARGO_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".cargo")))
            .unwrap_or_else(|| PathBuf::from(".cargo"));
        cargo_home.join("advisory-db")
    }

    /// The advisory database the audit will read: the configured one, or
    /// [`Config::default_advisory_db`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::AdvisoryDbMissing`] when that path is not a directory.
    pub fn resolve_advisory_db(&self) -> Result<PathBuf> {
        let path = self
            .advisory_db
            .clone()
            .unwrap_or_else(Self::default_advisory_db);
        if !path.is_dir() {
            return Err(Error::AdvisoryDbMissing { path });
        }
        Ok(path)
    }
}
