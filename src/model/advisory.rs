use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

impl Severity {
    /// Bands a CVSS score into a severity level.
    ///
    /// Accepts both numeric base scores (`"7.5"`) and vector strings
    /// (`"CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H"`). Vectors are banded
    /// by their impact metrics since the base score is not embedded.
    pub fn from_cvss(score: &str) -> Self {
        let score = score.trim();

        if let Ok(cvss) = score.parse::<f32>() {
            return match cvss {
                s if s >= 9.0 => Severity::Critical,
                s if s >= 7.0 => Severity::High,
                s if s >= 4.0 => Severity::Medium,
                s if s > 0.0 => Severity::Low,
                _ => Severity::Unknown,
            };
        }

        if score.starts_with("CVSS:") {
            if score.contains("/C:H") || score.contains("/I:H") || score.contains("/A:H") {
                return Severity::High;
            }
            if score.contains("/C:L") || score.contains("/I:L") || score.contains("/A:L") {
                return Severity::Medium;
            }
            return Severity::Low;
        }

        Severity::Unknown
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A published advisory matched against a package pinned in a lockfile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityRecord {
    pub advisory_id: String,
    pub package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Raw severity score as reported by the advisory, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cvss: Option<String>,
    pub severity: Severity,
    pub categories: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patched: Vec<String>,
}

impl VulnerabilityRecord {
    pub fn new(
        advisory_id: impl Into<String>,
        package: impl Into<String>,
        cvss: Option<String>,
    ) -> Self {
        let severity = cvss
            .as_deref()
            .map(Severity::from_cvss)
            .unwrap_or(Severity::Unknown);
        Self {
            advisory_id: advisory_id.into(),
            package: package.into(),
            version: None,
            cvss,
            severity,
            categories: BTreeSet::new(),
            title: None,
            url: None,
            patched: Vec::new(),
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Score for display: the raw cvss string, or `"n/a"` when the advisory has none.
    pub fn score(&self) -> &str {
        self.cvss.as_deref().unwrap_or("n/a")
    }

    /// Comma separated category tags, `"-"` when there are none.
    pub fn categories_label(&self) -> String {
        if self.categories.is_empty() {
            "-".to_string()
        } else {
            self.categories
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}

/// An informational advisory (unmaintained, yanked, unsound, ...).
///
/// Warnings are logged but never fail a run on their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    pub kind: String,
    pub package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory_id: Option<String>,
}
