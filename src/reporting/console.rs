//! # Console Reporting Module / 控制台报告模块
//!
//! A listener that prints colored, per-node status lines as the run
//! progresses, plus a formatted summary table printed at the end.
//!
//! 在运行过程中打印彩色的节点状态行的监听器，以及在结束时打印的
//! 格式化摘要表格。

use colored::*;

use crate::core::config::{ConfigurationParameters, CONSOLE_VERBOSE_PROPERTY};
use crate::core::listener::ExecutionListener;
use crate::core::models::{ReportEntry, TestExecutionResult};
use crate::core::node::TestNode;
use crate::reporting::summary::ExecutionSummary;

/// Prints one line per finished node; with verbose output enabled, started
/// events and report entries are printed too.
/// 每个完成的节点打印一行；开启详细输出后，也会打印开始事件和报告条目。
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleExecutionListener {
    verbose: bool,
}

impl ConsoleExecutionListener {
    pub fn new(verbose: bool) -> Self {
        ConsoleExecutionListener { verbose }
    }

    /// Reads verbosity from the run configuration.
    pub fn from_config(configuration: &ConfigurationParameters) -> Self {
        ConsoleExecutionListener {
            verbose: configuration
                .get_boolean(CONSOLE_VERBOSE_PROPERTY)
                .unwrap_or(false),
        }
    }
}

impl ExecutionListener for ConsoleExecutionListener {
    fn execution_started(&self, node: &dyn TestNode) {
        if self.verbose {
            println!("{} {}", "▶".blue(), node.display_name());
        }
    }

    fn execution_finished(&self, node: &dyn TestNode, result: &TestExecutionResult) {
        let line = match result {
            TestExecutionResult::Successful => {
                format!("{} {}", "✓".green(), node.display_name())
            }
            TestExecutionResult::Skipped { reason } => format!(
                "{} {} {}",
                "-".dimmed(),
                node.display_name().dimmed(),
                reason
                    .as_deref()
                    .map(|r| format!("({r})"))
                    .unwrap_or_default()
                    .dimmed()
            ),
            TestExecutionResult::Aborted { .. } => {
                format!("{} {} (aborted)", "!".yellow(), node.display_name().yellow())
            }
            TestExecutionResult::Failed { failures } => {
                let mut line =
                    format!("{} {}", "✗".red(), node.display_name().red());
                for failure in failures {
                    line.push_str(&format!("\n    {}", failure.to_string().red()));
                }
                line
            }
        };
        println!("{line}");
    }

    fn report_entry_published(&self, node: &dyn TestNode, entry: &ReportEntry) {
        if self.verbose {
            let rendered = serde_json::to_string(entry.key_value_pairs()).unwrap_or_default();
            println!(
                "  {} {} {}",
                "#".cyan(),
                node.display_name().cyan(),
                rendered
            );
        }
    }
}

/// Prints a formatted summary of the run to the console.
///
/// # Output Format / 输出格式
/// ```text
/// --- Execution Summary ---
///   containers:  3   tests: 12
///   successful: 10   failed: 1   skipped: 1   aborted: 0
///   duration: 1.42s
///   ✗ slow_api_test: before hook failed: connection refused
/// ```
pub fn print_summary(summary: &ExecutionSummary) {
    println!("\n{}", "--- Execution Summary ---".bold());
    println!(
        "  containers: {:>2}   tests: {:>2}",
        summary.containers, summary.tests
    );
    println!(
        "  successful: {:>2}   failed: {:>2}   skipped: {:>2}   aborted: {:>2}",
        summary.successful.to_string().green(),
        if summary.failed > 0 {
            summary.failed.to_string().red()
        } else {
            summary.failed.to_string().normal()
        },
        summary.skipped.to_string().dimmed(),
        summary.aborted.to_string().yellow(),
    );
    if let Some(duration) = summary.duration_secs() {
        println!("  duration: {duration:.2}s");
    }
    for failure in &summary.failures {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failure.node.red(),
            failure.message
        );
    }
}
