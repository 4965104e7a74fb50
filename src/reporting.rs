//! # Reporting Module / 报告模块
//!
//! Execution listeners that turn lifecycle events into human- and
//! machine-readable output: colored console lines and an aggregated run
//! summary exportable as JSON.
//!
//! 将生命周期事件转换为人类可读与机器可读输出的执行监听器：
//! 彩色控制台行以及可导出为 JSON 的聚合运行摘要。

pub mod console;
pub mod summary;

// Re-exports
pub use console::ConsoleExecutionListener;
pub use summary::{ExecutionSummary, SummaryGeneratingListener};
