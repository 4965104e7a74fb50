//! # Node Task Execution Module / 节点任务执行模块
//!
//! This module provides the unit of work for one node of the tree: it
//! acquires the node's resolved resource lock, runs the lifecycle hooks in
//! order, recurses into children (concurrently or sequentially, per the
//! planner's verdict), collects failures without aborting unrelated work,
//! and reports exactly one started and one finished event to the listener.
//!
//! 此模块提供树中单个节点的工作单元：获取该节点解析出的资源锁，按序
//! 运行生命周期钩子，（根据执行计划）并发或串行地递归进入子节点，在
//! 不中止无关工作的前提下收集失败，并向监听器报告恰好一个开始事件和
//! 一个完成事件。
//!
//! ## State machine / 状态机
//!
//! CREATED → cancellation poll → lock acquisition → skip check →
//! started event → BEFORE → EXECUTE (own work, then children) → AFTER →
//! lock release → finished event.

use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use futures::{stream, FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::core::context::ExecutionContext;
use crate::core::listener::ExecutionListener;
use crate::core::models::{FailureCollector, FailureKind, SkipDecision, TestExecutionResult};
use crate::core::node::{ExecutionMode, TestNode};
use crate::core::planner::NodeExecutionAdvisor;

/// Run-wide collaborators shared by every task of one execution.
/// 一次执行中所有任务共享的运行级协作者。
pub(crate) struct NodeTaskContext {
    pub(crate) listener: Arc<dyn ExecutionListener>,
    pub(crate) advisor: Arc<NodeExecutionAdvisor>,
    pub(crate) cancellation_token: CancellationToken,
    pub(crate) parallelism: usize,
}

/// The unit of work for one node. A task owns its own derived context;
/// sibling tasks never share mutable state.
///
/// 单个节点的工作单元。任务拥有自己派生的上下文；兄弟任务之间绝不
/// 共享可变状态。
pub struct NodeTestTask {
    task_context: Arc<NodeTaskContext>,
    node: Arc<dyn TestNode>,
    parent_context: ExecutionContext,
}

impl NodeTestTask {
    pub(crate) fn new(
        task_context: Arc<NodeTaskContext>,
        node: Arc<dyn TestNode>,
        parent_context: ExecutionContext,
    ) -> Self {
        NodeTestTask {
            task_context,
            node,
            parent_context,
        }
    }

    /// Runs the task to completion. Never fails: every failure is captured
    /// into the node's result and surfaced through the listener.
    ///
    /// Boxed so the task can recurse into child tasks of the same type.
    pub fn run(self) -> BoxFuture<'static, ()> {
        self.run_inner().boxed()
    }

    async fn run_inner(self) {
        let listener = Arc::clone(&self.task_context.listener);

        // Cancellation is polled before the node starts anything,
        // including its lock wait; in-flight work is never interrupted.
        if self.task_context.cancellation_token.is_cancelled() {
            listener.execution_started(self.node.as_ref());
            listener.execution_finished(
                self.node.as_ref(),
                &TestExecutionResult::Aborted {
                    reason: Some("execution cancelled before node start".to_string()),
                },
            );
            return;
        }

        // The resolved lock covers this node and, for lock roots, its
        // whole subtree. Acquisition may block indefinitely.
        let resource_lock = self.task_context.advisor.resource_lock(&self.node);
        let lock_guard = resource_lock.acquire().await;

        let collector = Arc::new(FailureCollector::new());
        let mut context = self
            .parent_context
            .extend()
            .with_failure_collector(Arc::clone(&collector))
            .build();

        match caught(self.node.should_be_skipped(&context)).await {
            Ok(SkipDecision::Skip { reason }) => {
                listener.execution_started(self.node.as_ref());
                listener.execution_finished(
                    self.node.as_ref(),
                    &TestExecutionResult::Skipped { reason },
                );
                drop(lock_guard);
                return;
            }
            Ok(SkipDecision::DoNotSkip) => {}
            Err(error) => {
                // A failing skip check counts against the node itself;
                // hooks are not attempted.
                collector.record(FailureKind::Test, error);
                listener.execution_started(self.node.as_ref());
                listener
                    .execution_finished(self.node.as_ref(), &collector.to_execution_result());
                drop(lock_guard);
                return;
            }
        }

        listener.execution_started(self.node.as_ref());

        // Task-local, deliberately outside the cloneable context state:
        // it must survive context swaps within this task.
        let mut before_hooks_attempted = false;

        // BEFORE phase
        if collector.is_empty() {
            before_hooks_attempted = true;
            if let Some(next) = collector.capture(
                FailureKind::Test,
                caught(self.node.before(context.clone())).await,
            ) {
                context = next;
            }
        }

        // EXECUTE phase: the node's own work, then its children. Children
        // are not dispatched when the node's own hooks already failed.
        if collector.is_empty() {
            if let Some(next) = collector.capture(
                FailureKind::Test,
                caught(self.node.execute(context.clone())).await,
            ) {
                context = next;
            }
            if collector.is_empty() {
                self.execute_children(&context, &collector).await;
            }
        }

        // AFTER phase: runs on every path where BEFORE was attempted,
        // including failure paths.
        if before_hooks_attempted {
            collector.capture(
                FailureKind::Test,
                caught(self.node.after(&context)).await,
            );
        }

        // Release before reporting completion so a waiting conflicting
        // task is not serialized behind listener work.
        drop(lock_guard);

        listener.execution_finished(self.node.as_ref(), &collector.to_execution_result());
    }

    /// Dispatches the node's children: concurrent children are spawned
    /// onto the runtime with bounded parallelism, sequential children run
    /// inline preserving declaration order. Each child polls the
    /// cancellation token itself at its own start boundary.
    async fn execute_children(&self, context: &ExecutionContext, collector: &FailureCollector) {
        let children = self.node.children();
        if children.is_empty() {
            return;
        }

        let advisor = &self.task_context.advisor;
        let parallelism = self.task_context.parallelism.max(1);
        let parallel_permitted = parallelism > 1;

        let (concurrent, sequential): (Vec<_>, Vec<_>) =
            children.into_iter().partition(|child| {
                parallel_permitted
                    && advisor.resolved_execution_mode(child) == ExecutionMode::Concurrent
            });

        // Fork the concurrent children first so they make progress while
        // the sequential ones run inline below.
        let mut concurrent_futures: Vec<BoxFuture<'static, ()>> =
            Vec::with_capacity(concurrent.len());
        for child in concurrent {
            let task =
                NodeTestTask::new(Arc::clone(&self.task_context), child, context.clone());
            concurrent_futures.push(task.run());
        }
        let join_results: Vec<Result<(), tokio::task::JoinError>> =
            stream::iter(concurrent_futures.into_iter().map(spawn_boxed))
                .buffer_unordered(parallelism)
                .collect::<Vec<_>>()
                .boxed()
                .await;

        for join_result in join_results {
            if let Err(error) = join_result {
                // The child task itself fell over before it could report;
                // that is a defect of the machinery, not of a test.
                collector.record(
                    FailureKind::Infrastructure,
                    anyhow!("child task failed to complete: {error}"),
                );
            }
        }

        for child in sequential {
            let task =
                NodeTestTask::new(Arc::clone(&self.task_context), child, context.clone());
            task.run().await;
        }
    }
}

/// Spawns an already-boxed child task future. A non-generic fn item so the
/// compiler sees a single concrete `'static` signature when proving the
/// recursive task future `Send`.
fn spawn_boxed(future: BoxFuture<'static, ()>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(future)
}

/// Awaits a hook future, converting panics into ordinary captured errors
/// so an assertion panic in user code behaves like a returned `Err` and
/// never unwinds across branch boundaries.
async fn caught<T>(future: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(anyhow!("panicked: {}", panic_message(&payload))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
