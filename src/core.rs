//! # Core Module / 核心模块
//!
//! This module contains the core functionality of Hierarchy Runner:
//! the node contract, resource locking, execution planning, the per-node
//! task state machine and the execution context threaded through the tree.
//!
//! 此模块包含 Hierarchy Runner 的核心功能：
//! 节点契约、资源锁、执行计划、每个节点的任务状态机
//! 以及贯穿整棵树的执行上下文。

pub mod config;
pub mod context;
pub mod execution;
pub mod executor;
pub mod listener;
pub mod models;
pub mod node;
pub mod planner;
pub mod resources;

// Re-exports
pub use executor::HierarchicalTestExecutor;
pub use models::TestExecutionResult;
pub use node::TestNode;
pub use planner::NodeExecutionAdvisor;
