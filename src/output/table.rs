use crate::model::{AuditSummary, Severity};
use anyhow::Result;
use std::io::IsTerminal;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct LockfileRow {
    #[tabled(rename = "Lockfile")]
    lockfile: String,
    #[tabled(rename = "Exit")]
    exit: String,
    #[tabled(rename = "Vulnerabilities")]
    vulnerabilities: usize,
    #[tabled(rename = "Warnings")]
    warnings: usize,
    #[tabled(rename = "Ignored")]
    ignored: usize,
}

#[derive(Tabled)]
struct VulnRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Advisory")]
    advisory: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "CVSS")]
    cvss: String,
    #[tabled(rename = "Categories")]
    categories: String,
    #[tabled(rename = "Patched")]
    patched: String,
}

/// Prints the summary tables. Severities are coloured only when stdout is a
/// terminal and `NO_COLOR` is unset.
pub fn print_table(summary: &AuditSummary) -> Result<()> {
    let color = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    print!("{}", render_table(summary, color));
    Ok(())
}

fn render_table(summary: &AuditSummary, color: bool) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\nAudit completed at: {}\n",
        summary.scan_time.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(generated) = &summary.generated_lockfile {
        out.push_str(&format!("Generated lockfile: {}\n", generated.display()));
    }
    out.push('\n');

    let rows: Vec<LockfileRow> = summary
        .results
        .iter()
        .map(|r| LockfileRow {
            lockfile: relative_to(&r.lockfile, &summary.source_dir),
            exit: r
                .returncode
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
            vulnerabilities: r.vulnerability_count,
            warnings: r.warnings.len(),
            ignored: r.ignored,
        })
        .collect();
    out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
    out.push('\n');

    for result in summary.vulnerable_lockfiles() {
        let mut vulns = result.vulnerabilities.clone();
        vulns.sort_by_key(|v| v.severity);

        out.push_str(&format!(
            "\n{}: {} vulnerabilities\n\n",
            relative_to(&result.lockfile, &summary.source_dir),
            result.vulnerability_count
        ));

        let rows: Vec<VulnRow> = vulns
            .iter()
            .map(|v| VulnRow {
                severity: format_severity(&v.severity, color),
                advisory: v.advisory_id.clone(),
                package: match &v.version {
                    Some(version) => format!("{} {}", v.package, version),
                    None => v.package.clone(),
                },
                cvss: truncate(v.score(), 16),
                categories: v.categories_label(),
                patched: if v.patched.is_empty() {
                    "-".to_string()
                } else {
                    v.patched.join(", ")
                },
            })
            .collect();
        out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
        out.push('\n');
    }

    out.push_str(&format!(
        "\nSummary: {} lockfile(s), {} vulnerabilities\n",
        summary.results.len(),
        summary.total_vulnerabilities()
    ));
    out
}

fn format_severity(severity: &Severity, color: bool) -> String {
    if !color {
        return severity.as_str().to_uppercase();
    }
    match severity {
        Severity::Critical => "\x1b[31mCRITICAL\x1b[0m".to_string(),
        Severity::High => "\x1b[91mHIGH\x1b[0m".to_string(),
        Severity::Medium => "\x1b[33mMEDIUM\x1b[0m".to_string(),
        Severity::Low => "\x1b[32mLOW\x1b[0m".to_string(),
        Severity::Unknown => "UNKNOWN".to_string(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

fn relative_to(path: &std::path::Path, root: &std::path::Path) -> String {
    path.strip_prefix(root)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuditResult, VulnerabilityRecord};
    use std::path::PathBuf;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("7.5", 16), "7.5");
        assert_eq!(
            truncate("CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H", 16),
            "CVSS:3.1/AV:N..."
        );
    }

    #[test]
    fn test_relative_to() {
        let root = PathBuf::from("/proj");
        assert_eq!(relative_to(&root.join("a/Cargo.lock"), &root), "a/Cargo.lock");
        assert_eq!(
            relative_to(&PathBuf::from("/other/Cargo.lock"), &root),
            "/other/Cargo.lock"
        );
    }

    #[test]
    fn test_render_lists_findings() {
        let mut result = AuditResult::clean(PathBuf::from("/proj/Cargo.lock"));
        result.returncode = Some(1);
        result.vulnerability_count = 1;
        result.vulnerabilities = vec![VulnerabilityRecord::new(
            "RUSTSEC-2021-0001",
            "foo",
            Some("7.5".to_string()),
        )
        .with_categories(["memory-corruption"])];

        let summary = AuditSummary::new(PathBuf::from("/proj"), vec![result]);
        let rendered = render_table(&summary, false);

        assert!(rendered.contains("Cargo.lock"));
        assert!(rendered.contains("RUSTSEC-2021-0001"));
        assert!(rendered.contains("memory-corruption"));
        assert!(rendered.contains("1 lockfile(s), 1 vulnerabilities"));
    }

    #[test]
    fn test_render_clean_has_no_findings_table() {
        let summary = AuditSummary::new(
            PathBuf::from("/proj"),
            vec![AuditResult::clean(PathBuf::from("/proj/Cargo.lock"))],
        );
        let rendered = render_table(&summary, false);
        assert!(!rendered.contains("Advisory"));
        assert!(rendered.contains("0 vulnerabilities"));
    }

    #[test]
    fn test_plain_output_has_no_escape_codes() {
        let mut result = AuditResult::clean(PathBuf::from("/proj/Cargo.lock"));
        result.vulnerability_count = 1;
        result.vulnerabilities = vec![VulnerabilityRecord::new(
            "RUSTSEC-2021-0001",
            "foo",
            Some("9.8".to_string()),
        )];
        let summary = AuditSummary::new(PathBuf::from("/proj"), vec![result]);

        let plain = render_table(&summary, false);
        assert!(!plain.contains('\x1b'));
        assert!(plain.contains("CRITICAL"));

        let colored = render_table(&summary, true);
        assert!(colored.contains("\x1b[31mCRITICAL\x1b[0m"));
    }

    #[test]
    fn test_format_severity_plain() {
        assert_eq!(format_severity(&Severity::High, false), "HIGH");
        assert_eq!(format_severity(&Severity::Unknown, false), "UNKNOWN");
        assert_eq!(format_severity(&Severity::Low, true), "\x1b[32mLOW\x1b[0m");
    }
}
