//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout the
//! executor: skip decisions, per-node execution results, the failure
//! taxonomy and the per-branch failure collector, plus report entries
//! published through the listener protocol.
//!
//! 此模块定义了在整个执行器中使用的核心数据结构：跳过判定、每个节点的
//! 执行结果、失败分类与每个分支的失败收集器，以及通过监听器协议发布的
//! 报告条目。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

/// The verdict of a node's skip predicate, checked before any hook runs.
/// 节点跳过判定的结论，在任何钩子运行之前检查。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipDecision {
    /// Execute the node normally.
    DoNotSkip,
    /// Bypass all hooks and report the node as skipped.
    Skip {
        /// Optional human-readable explanation surfaced in the result.
        reason: Option<String>,
    },
}

impl SkipDecision {
    pub fn do_not_skip() -> Self {
        SkipDecision::DoNotSkip
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        SkipDecision::Skip {
            reason: Some(reason.into()),
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, SkipDecision::Skip { .. })
    }
}

/// Classifies a captured failure for reporting purposes.
/// 为报告目的对捕获到的失败进行分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// A failure raised by user test code or its lifecycle hooks.
    /// Recovered locally, recorded, never aborts siblings.
    /// 由用户测试代码或其生命周期钩子引发的失败。就地恢复并记录，
    /// 绝不中止兄弟节点。
    Test,
    /// A failure of the execution machinery itself (for example a panicked
    /// worker task). Attached to the node's result but considered more
    /// severe for reporting.
    /// 执行机制本身的失败（例如工作任务 panic）。附加到节点结果上，
    /// 但在报告中被视为更严重。
    Infrastructure,
}

/// One captured failure together with its severity classification.
#[derive(Debug)]
pub struct Failure {
    pub kind: FailureKind,
    pub error: anyhow::Error,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.error)
    }
}

/// The final result of a single node's execution, delivered to the
/// listener as part of the node's finished event.
///
/// 单个节点执行的最终结果，作为该节点完成事件的一部分传递给监听器。
#[derive(Debug)]
pub enum TestExecutionResult {
    /// The node and its subtree completed without captured failures.
    /// 节点及其子树在没有捕获到失败的情况下完成。
    Successful,
    /// The node's skip predicate fired; no hooks ran.
    /// 节点的跳过判定生效；没有钩子运行。
    Skipped { reason: Option<String> },
    /// Cancellation was signaled before the node started; the node's work
    /// was abandoned rather than executed.
    /// 在节点启动之前收到了取消信号；节点的工作被放弃而不是执行。
    Aborted { reason: Option<String> },
    /// One or more failures were captured from the node's hooks or its
    /// execution machinery.
    /// 从节点的钩子或其执行机制中捕获到一个或多个失败。
    Failed { failures: Vec<Failure> },
}

impl TestExecutionResult {
    pub fn is_successful(&self) -> bool {
        matches!(self, TestExecutionResult::Successful)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TestExecutionResult::Skipped { .. })
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, TestExecutionResult::Aborted { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TestExecutionResult::Failed { .. })
    }

    /// Returns `true` if any captured failure came from the execution
    /// machinery rather than user code.
    pub fn has_infrastructure_failure(&self) -> bool {
        match self {
            TestExecutionResult::Failed { failures } => failures
                .iter()
                .any(|failure| failure.kind == FailureKind::Infrastructure),
            _ => false,
        }
    }

    /// A short status label for display and summaries.
    /// 用于显示和摘要的简短状态标签。
    pub fn status_label(&self) -> &'static str {
        match self {
            TestExecutionResult::Successful => "successful",
            TestExecutionResult::Skipped { .. } => "skipped",
            TestExecutionResult::Aborted { .. } => "aborted",
            TestExecutionResult::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for TestExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestExecutionResult::Failed { failures } => {
                write!(f, "failed ({} failure(s))", failures.len())
            }
            other => f.write_str(other.status_label()),
        }
    }
}

/// Accumulates failures from a node's own execution and its lifecycle
/// hooks without aborting sibling execution. Each task owns one collector;
/// it is private to that task's branch until read by the reporting step,
/// and reading it is terminal (the collector is drained).
///
/// 累积节点自身执行及其生命周期钩子产生的失败，而不中止兄弟节点的
/// 执行。每个任务拥有一个收集器；在报告步骤读取之前，它对该任务的
/// 分支是私有的，并且读取是终结性的（收集器会被清空）。
#[derive(Debug, Default)]
pub struct FailureCollector {
    failures: Mutex<Vec<Failure>>,
}

impl FailureCollector {
    pub fn new() -> Self {
        FailureCollector::default()
    }

    /// Records one failure with its severity classification.
    pub fn record(&self, kind: FailureKind, error: anyhow::Error) {
        self.lock().push(Failure { kind, error });
    }

    /// Captures the error of a failed result, passing successes through.
    pub fn capture<T>(&self, kind: FailureKind, result: anyhow::Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.record(kind, error);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Drains the collector into the node's final result. Terminal: a
    /// second call observes an empty collector.
    pub fn to_execution_result(&self) -> TestExecutionResult {
        let failures = std::mem::take(&mut *self.lock());
        if failures.is_empty() {
            TestExecutionResult::Successful
        } else {
            TestExecutionResult::Failed { failures }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Failure>> {
        self.failures
            .lock()
            .expect("failure collector mutex poisoned")
    }
}

/// A timestamped set of key/value pairs published by a node through the
/// listener protocol while it is running.
///
/// 节点在运行期间通过监听器协议发布的带时间戳的键值对集合。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    timestamp: DateTime<Utc>,
    key_value_pairs: BTreeMap<String, String>,
}

impl ReportEntry {
    /// Creates an entry from a set of key/value pairs, stamped now.
    pub fn from_pairs(key_value_pairs: BTreeMap<String, String>) -> Self {
        ReportEntry {
            timestamp: Utc::now(),
            key_value_pairs,
        }
    }

    /// Creates an entry holding a single key/value pair.
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut pairs = BTreeMap::new();
        pairs.insert(key.into(), value.into());
        ReportEntry::from_pairs(pairs)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn key_value_pairs(&self) -> &BTreeMap<String, String> {
        &self.key_value_pairs
    }
}
