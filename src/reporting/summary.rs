//! # Run Summary Module / 运行摘要模块
//!
//! A listener that aggregates finished events into an [`ExecutionSummary`]:
//! per-outcome counts, failure details and the wall-clock span of the run.
//! The summary is serde-serializable, so callers can persist it as JSON
//! next to their own reporting.
//!
//! 将完成事件聚合为 [`ExecutionSummary`] 的监听器：各结果的计数、失败
//! 详情以及运行的墙钟时间跨度。摘要可通过 serde 序列化，调用方可以将
//! 其作为 JSON 与自己的报告一起保存。

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;

use crate::core::listener::ExecutionListener;
use crate::core::models::{FailureKind, TestExecutionResult};
use crate::core::node::TestNode;

/// Failure details for one node, flattened for serialization.
#[derive(Debug, Clone, Serialize)]
pub struct FailureDetail {
    pub node: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Aggregated outcome of one run.
/// 一次运行的聚合结果。
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionSummary {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub containers: u64,
    pub tests: u64,
    pub successful: u64,
    pub failed: u64,
    pub skipped: u64,
    pub aborted: u64,
    pub failures: Vec<FailureDetail>,
}

impl ExecutionSummary {
    pub fn total(&self) -> u64 {
        self.successful + self.failed + self.skipped + self.aborted
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Seconds between the first started event and the last finished
    /// event, when both were observed.
    pub fn duration_secs(&self) -> Option<f64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => {
                Some((end - start).num_milliseconds() as f64 / 1000.0)
            }
            _ => None,
        }
    }

    /// Serializes the summary as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize execution summary")
    }
}

/// Collects an [`ExecutionSummary`] from listener events. Thread-safe:
/// events for concurrent siblings arrive from different worker tasks.
///
/// 从监听器事件收集 [`ExecutionSummary`]。线程安全：并发兄弟节点的
/// 事件会从不同的工作任务到达。
#[derive(Debug, Default)]
pub struct SummaryGeneratingListener {
    summary: Mutex<ExecutionSummary>,
}

impl SummaryGeneratingListener {
    pub fn new() -> Self {
        SummaryGeneratingListener::default()
    }

    /// A snapshot of the summary collected so far.
    pub fn summary(&self) -> ExecutionSummary {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ExecutionSummary> {
        self.summary.lock().expect("summary mutex poisoned")
    }
}

impl ExecutionListener for SummaryGeneratingListener {
    fn execution_started(&self, node: &dyn TestNode) {
        let mut summary = self.lock();
        if summary.started_at.is_none() {
            summary.started_at = Some(Utc::now());
        }
        if node.node_type().is_container() {
            summary.containers += 1;
        }
        if node.node_type().is_test() {
            summary.tests += 1;
        }
    }

    fn execution_finished(&self, node: &dyn TestNode, result: &TestExecutionResult) {
        let mut summary = self.lock();
        summary.finished_at = Some(Utc::now());
        match result {
            TestExecutionResult::Successful => summary.successful += 1,
            TestExecutionResult::Skipped { .. } => summary.skipped += 1,
            TestExecutionResult::Aborted { .. } => summary.aborted += 1,
            TestExecutionResult::Failed { failures } => {
                summary.failed += 1;
                for failure in failures {
                    summary.failures.push(FailureDetail {
                        node: node.display_name().to_string(),
                        kind: failure.kind,
                        message: format!("{:#}", failure.error),
                    });
                }
            }
        }
    }
}
