//! # Node Contract Module / 节点契约模块
//!
//! This module defines the contract between the executor and the tree it
//! runs: a [`TestNode`] declares its lifecycle hooks, its children and its
//! exclusive-resource requirements. The executor only traverses and invokes
//! nodes; it never constructs them.
//!
//! 此模块定义了执行器与其运行的树之间的契约：[`TestNode`] 声明其生命周期
//! 钩子、子节点和独占资源需求。执行器只遍历和调用节点，从不构造它们。

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::core::context::ExecutionContext;
use crate::core::models::SkipDecision;
use crate::core::resources::ExclusiveResource;

/// The capability set of a node in the execution tree.
/// 执行树中节点的能力集合。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// A node that only groups other nodes.
    /// 仅用于组织其他节点的节点。
    Container,
    /// A leaf node carrying actual test work.
    /// 承载实际测试工作的叶子节点。
    Test,
    /// A node that is both a container and a test.
    /// 既是容器又是测试的节点。
    ContainerAndTest,
}

impl NodeType {
    /// Returns `true` if nodes of this type may have children.
    pub fn is_container(self) -> bool {
        matches!(self, NodeType::Container | NodeType::ContainerAndTest)
    }

    /// Returns `true` if nodes of this type carry test work of their own.
    pub fn is_test(self) -> bool {
        matches!(self, NodeType::Test | NodeType::ContainerAndTest)
    }
}

/// How a node may be dispatched relative to its siblings.
/// 节点相对于其兄弟节点的调度方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// The node may run in parallel with its siblings.
    /// 节点可以与其兄弟节点并行运行。
    Concurrent,
    /// The node must run inline, preserving declaration order.
    /// 节点必须按声明顺序串行运行。
    Sequential,
}

/// A vertex in the test tree. Implementations declare lifecycle hooks
/// (`before`/`execute`/`after`), an ordered child sequence, a skip
/// predicate and a set of required exclusive resources.
///
/// The tree is built before execution begins and must not change during the
/// run; the executor shares node handles freely across worker tasks.
///
/// 测试树中的一个顶点。实现者声明生命周期钩子（`before`/`execute`/`after`）、
/// 有序的子节点序列、跳过判定以及所需的独占资源集合。
/// 树在执行开始前构建完成，运行期间不得变更。
#[async_trait]
pub trait TestNode: Send + Sync {
    /// Human-readable name used in listener events and reports.
    fn display_name(&self) -> &str;

    /// The capability set of this node.
    fn node_type(&self) -> NodeType;

    /// The ordered children of this node. Leaves return an empty vec.
    fn children(&self) -> Vec<Arc<dyn TestNode>> {
        Vec::new()
    }

    /// The declared dispatch mode of this node. The advisor may override
    /// this with [`ExecutionMode::Sequential`] when an ancestor's resource
    /// declarations make concurrent dispatch unsafe.
    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::Concurrent
    }

    /// The exclusive resources this node requires while it (and its
    /// subtree) executes.
    fn exclusive_resources(&self) -> Vec<ExclusiveResource> {
        Vec::new()
    }

    /// Decides whether this node should be skipped. Hooks are bypassed for
    /// skipped nodes and the skip is reported as the node's outcome.
    async fn should_be_skipped(&self, _context: &ExecutionContext) -> Result<SkipDecision> {
        Ok(SkipDecision::do_not_skip())
    }

    /// Runs before the node's own work and before any children. May derive
    /// a new context for the subtree.
    async fn before(&self, context: ExecutionContext) -> Result<ExecutionContext> {
        Ok(context)
    }

    /// The node's own work (for leaves, the test body). Containers usually
    /// leave this as the identity; children are dispatched by the executor
    /// afterwards.
    async fn execute(&self, context: ExecutionContext) -> Result<ExecutionContext> {
        Ok(context)
    }

    /// Runs after the node's work and children, on every path where
    /// `before` was attempted, including failure paths.
    async fn after(&self, _context: &ExecutionContext) -> Result<()> {
        Ok(())
    }
}

/// Identity key for advisor lookups. Based on the node's allocation
/// address, which is stable because the tree is immutable for the whole
/// run and node handles are shared, not rebuilt.
///
/// 用于执行计划查询的身份键。基于节点的分配地址；由于树在整个运行期间
/// 不可变且节点句柄是共享的，该地址是稳定的。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Derives the identity of a shared node handle.
    pub fn of(node: &Arc<dyn TestNode>) -> Self {
        NodeId(Arc::as_ptr(node).cast::<()>() as usize)
    }
}
