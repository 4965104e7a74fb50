//! # Hierarchy Runner Library / Hierarchy Runner 库
//!
//! This library provides the core of a hierarchical test executor: it walks
//! a tree of test and container nodes, manages per-node lifecycle state,
//! coordinates exclusive-resource locking across concurrent branches, and
//! reports results through a listener protocol.
//!
//! 此库提供分层测试执行器的核心：它遍历由测试节点和容器节点组成的树，
//! 管理每个节点的生命周期状态，在并发分支之间协调独占资源锁，
//! 并通过监听器协议报告结果。
//!
//! ## Modules / 模块
//!
//! - `core` - Node contract, execution planning, task state machine and context
//! - `reporting` - Execution listeners for console output and run summaries
//!
//! - `core` - 节点契约、执行计划、任务状态机和上下文
//! - `reporting` - 用于控制台输出和运行摘要的执行监听器
//!
//! The crate never discovers or constructs nodes; callers hand it an
//! already-built tree (see [`core::node::TestNode`]) plus a listener and
//! configuration, and drive the run through
//! [`core::executor::HierarchicalTestExecutor`].

pub mod core;
pub mod reporting;

// Re-export commonly used items
pub use core::context::ExecutionContext;
pub use core::executor::{ExecutionRequest, HierarchicalTestExecutor};
pub use core::listener::ExecutionListener;
pub use core::models::TestExecutionResult;
pub use core::node::TestNode;
pub use core::resources::{ExclusiveResource, LockMode};
