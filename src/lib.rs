pub mod auditor;
pub mod config;
pub mod error;
pub mod generator;
pub mod locator;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod runner;

pub use config::Config;
pub use error::Error;
pub use model::{AuditResult, AuditSummary, Severity, VulnerabilityRecord};
pub use pipeline::Pipeline;
pub use runner::{CommandOutput, CommandRunner, Invocation, ProcessRunner};
