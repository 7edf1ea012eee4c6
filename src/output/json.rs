use crate::model::AuditSummary;
use anyhow::Result;

pub fn print_json(summary: &AuditSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    println!("{}", json);
    Ok(())
}
