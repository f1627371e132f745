//! Command-line interface.
//!
//! `serve` (the default) runs the JSON-RPC server on stdio. `report` prints
//! one admin report as JSON to stdout and exits.

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::server::AppState;
use crate::services::zero_fill_months;

/// Portfolio backend: inquiries, case studies, testimonials, and admin reports.
#[derive(Parser, Debug)]
#[command(name = "portfolio-admin", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve JSON-RPC requests on stdin/stdout
    Serve,

    /// Print one report as JSON
    Report {
        /// Which report to print
        #[arg(value_enum)]
        kind: ReportKind,
    },
}

/// Reports available from the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Composed admin dashboard
    Dashboard,
    /// System totals and breakdowns
    Stats,
    /// Inquiry summary with zero-filled status counts and monthly series
    Inquiries,
}

/// Result of CLI command execution.
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }

    fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(text) => Self::success(text),
            Err(e) => Self::error(format!("Failed to serialize report: {}", e)),
        }
    }
}

/// Compute one report.
pub async fn execute_report(kind: ReportKind, state: &AppState) -> CliResult {
    let window = state.report_window();

    match kind {
        ReportKind::Dashboard => match state.dashboard.compose(&window).await {
            Ok(dashboard) => CliResult::json(&dashboard),
            Err(e) => CliResult::error(format!("Dashboard failed: {}", e)),
        },
        ReportKind::Stats => match state.aggregation.system_stats(&window).await {
            Ok(stats) => CliResult::json(&stats),
            Err(e) => CliResult::error(format!("Stats failed: {}", e)),
        },
        ReportKind::Inquiries => {
            let summary = match state.aggregation.inquiry_summary(&window).await {
                Ok(summary) => summary,
                Err(e) => return CliResult::error(format!("Inquiry summary failed: {}", e)),
            };
            let status_counts = match state.aggregation.inquiry_status_counts().await {
                Ok(counts) => counts,
                Err(e) => return CliResult::error(format!("Status counts failed: {}", e)),
            };
            CliResult::json(&serde_json::json!({
                "monthly": zero_fill_months(&window, &summary.monthly),
                "status_counts": status_counts,
                "summary": summary,
            }))
        }
    }
}
