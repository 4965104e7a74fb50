//! # Hierarchical Executor Module / 分层执行器模块
//!
//! The top-level driver of a run: performs the one-time planner walk,
//! builds the root task bound to the root context, submits it to the
//! runtime and returns a future that completes when the whole tree has
//! finished. Individual node failures are encoded in listener events, not
//! in the returned future; only setup failures before any event surface
//! as errors here.
//!
//! 一次运行的顶层驱动：执行一次性的计划遍历，构建绑定到根上下文的根
//! 任务，将其提交到运行时，并返回在整棵树完成时完成的 future。单个
//! 节点的失败通过监听器事件表达，而不是通过返回的 future；只有在任何
//! 事件之前发生的启动失败才会在此处表现为错误。

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::config::{
    ConfigurationParameters, PARALLELISM_PROPERTY, PARALLEL_ENABLED_PROPERTY,
};
use crate::core::context::ExecutionContext;
use crate::core::execution::{NodeTaskContext, NodeTestTask};
use crate::core::listener::ExecutionListener;
use crate::core::node::TestNode;
use crate::core::planner::NodeTreeWalker;

/// Everything the executor consumes: the already-built node tree, the
/// resolved listener, opaque configuration and a poll-only cancellation
/// signal.
///
/// 执行器消费的全部内容：已构建好的节点树、解析后的监听器、不透明的
/// 配置以及仅供轮询的取消信号。
pub struct ExecutionRequest {
    root: Arc<dyn TestNode>,
    listener: Arc<dyn ExecutionListener>,
    configuration: Arc<ConfigurationParameters>,
    cancellation_token: CancellationToken,
}

impl ExecutionRequest {
    pub fn new(root: Arc<dyn TestNode>, listener: Arc<dyn ExecutionListener>) -> Self {
        ExecutionRequest {
            root,
            listener,
            configuration: Arc::new(ConfigurationParameters::empty()),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn with_configuration(mut self, configuration: Arc<ConfigurationParameters>) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn with_cancellation_token(mut self, cancellation_token: CancellationToken) -> Self {
        self.cancellation_token = cancellation_token;
        self
    }
}

/// Default upper bound on concurrent child dispatch when the
/// configuration does not pin one.
fn default_parallelism() -> usize {
    num_cpus::get() / 2 + 1
}

/// Drives one execution of a node tree.
/// 驱动一棵节点树的一次执行。
pub struct HierarchicalTestExecutor {
    request: ExecutionRequest,
}

impl HierarchicalTestExecutor {
    pub fn new(request: ExecutionRequest) -> Self {
        HierarchicalTestExecutor { request }
    }

    /// Builds the execution plan, submits the root task and returns the
    /// handle representing overall completion.
    ///
    /// # Errors
    /// Fails only when the execution plan cannot be built; this happens
    /// before any listener event is emitted and aborts the whole run.
    pub fn execute(self) -> Result<JoinHandle<()>> {
        let ExecutionRequest {
            root,
            listener,
            configuration,
            cancellation_token,
        } = self.request;

        let advisor = NodeTreeWalker::new()
            .walk(&root)
            .context("failed to build the execution plan for the node tree")?;

        let parallel_enabled = configuration
            .get_boolean(PARALLEL_ENABLED_PROPERTY)
            .unwrap_or(true);
        let parallelism = if parallel_enabled {
            configuration
                .get_usize(PARALLELISM_PROPERTY)
                .unwrap_or_else(default_parallelism)
                .max(1)
        } else {
            1
        };

        let task_context = Arc::new(NodeTaskContext {
            listener: Arc::clone(&listener),
            advisor: Arc::new(advisor),
            cancellation_token,
            parallelism,
        });

        let root_context = ExecutionContext::new(listener, configuration);
        let root_task = NodeTestTask::new(task_context, root, root_context);
        Ok(tokio::spawn(root_task.run()))
    }
}
