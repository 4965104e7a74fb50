//! # Execution Listener Module / 执行监听器模块
//!
//! The listener protocol through which the executor reports lifecycle
//! events: one started event and one finished event per node, properly
//! nested, plus report entries published while a node is running.
//!
//! 执行器报告生命周期事件所用的监听器协议：每个节点一个开始事件和
//! 一个完成事件，严格嵌套，此外还有节点运行期间发布的报告条目。

use std::sync::Arc;

use crate::core::models::{ReportEntry, TestExecutionResult};
use crate::core::node::TestNode;

/// Receives ordered lifecycle events from the executor. Implementations
/// must be cheap and thread-safe: events for concurrent siblings arrive
/// from different worker tasks.
///
/// 从执行器接收有序的生命周期事件。实现必须足够廉价且线程安全：
/// 并发兄弟节点的事件会从不同的工作任务到达。
pub trait ExecutionListener: Send + Sync {
    /// The node is about to run; always followed by exactly one
    /// `execution_finished` for the same node.
    fn execution_started(&self, _node: &dyn TestNode) {}

    /// The node finished with the given outcome. Child events always fall
    /// between their parent's started and finished events.
    fn execution_finished(&self, _node: &dyn TestNode, _result: &TestExecutionResult) {}

    /// A node published additional report data while running.
    fn report_entry_published(&self, _node: &dyn TestNode, _entry: &ReportEntry) {}
}

/// A listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExecutionListener;

impl ExecutionListener for NoopExecutionListener {}

/// Fans every event out to a list of listeners, in registration order.
/// 将每个事件按注册顺序转发给一组监听器。
#[derive(Default)]
pub struct CompositeExecutionListener {
    listeners: Vec<Arc<dyn ExecutionListener>>,
}

impl CompositeExecutionListener {
    pub fn new(listeners: Vec<Arc<dyn ExecutionListener>>) -> Self {
        CompositeExecutionListener { listeners }
    }
}

impl ExecutionListener for CompositeExecutionListener {
    fn execution_started(&self, node: &dyn TestNode) {
        for listener in &self.listeners {
            listener.execution_started(node);
        }
    }

    fn execution_finished(&self, node: &dyn TestNode, result: &TestExecutionResult) {
        for listener in &self.listeners {
            listener.execution_finished(node, result);
        }
    }

    fn report_entry_published(&self, node: &dyn TestNode, entry: &ReportEntry) {
        for listener in &self.listeners {
            listener.report_entry_published(node, entry);
        }
    }
}
