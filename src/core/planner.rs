//! # Execution Planner Module / 执行计划模块
//!
//! A single pre-run walk over the node tree resolves, per node, which
//! exclusive-resource lock applies and whether the node is forced to run
//! sequentially. The resulting advisor is immutable and shared read-only
//! across all concurrent tasks, so per-task decisions are O(1) lookups
//! instead of repeated tree climbs.
//!
//! 对节点树的一次运行前遍历为每个节点解析适用的独占资源锁，以及该节点
//! 是否被强制串行运行。得到的执行计划是不可变的，被所有并发任务只读
//! 共享，因此任务内的决策是 O(1) 查询而不是反复爬树。

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::node::{ExecutionMode, NodeId, TestNode};
use crate::core::resources::{ExclusiveResource, LockManager, LockMode, ResourceLock, GLOBAL_KEY};

/// Immutable per-node execution constraints, built once before any task
/// runs and never mutated during execution.
///
/// 不可变的节点级执行约束，在任何任务运行前构建一次，执行期间绝不修改。
#[derive(Default)]
pub struct NodeExecutionAdvisor {
    forced_modes: HashMap<NodeId, ExecutionMode>,
    locks: HashMap<NodeId, ResourceLock>,
}

impl NodeExecutionAdvisor {
    /// The mode the planner forced onto this node, if any.
    pub fn forced_execution_mode(&self, node: &Arc<dyn TestNode>) -> Option<ExecutionMode> {
        self.forced_modes.get(&NodeId::of(node)).copied()
    }

    /// The effective dispatch mode of a node: the forced mode when present,
    /// otherwise the node's own declaration.
    pub fn resolved_execution_mode(&self, node: &Arc<dyn TestNode>) -> ExecutionMode {
        self.forced_execution_mode(node)
            .unwrap_or_else(|| node.execution_mode())
    }

    /// The lock a task must hold while executing this node's subtree.
    /// Nodes without resolved resources get a free [`ResourceLock::Nop`].
    pub fn resource_lock(&self, node: &Arc<dyn TestNode>) -> ResourceLock {
        self.locks
            .get(&NodeId::of(node))
            .cloned()
            .unwrap_or(ResourceLock::Nop)
    }

    fn force_sequential(&mut self, node: &Arc<dyn TestNode>) {
        self.forced_modes
            .insert(NodeId::of(node), ExecutionMode::Sequential);
    }

    fn use_resource_lock(&mut self, node: &Arc<dyn TestNode>, lock: ResourceLock) {
        self.locks.insert(NodeId::of(node), lock);
    }
}

/// Builds a [`NodeExecutionAdvisor`] with one top-down traversal.
///
/// A node that declares exclusive resources becomes a lock root: every
/// resource declared anywhere in its subtree is hoisted into one composite
/// lock held at the root, and all descendants are forced sequential and
/// left lock-free (they run under the held composite). Lock roots are
/// never nested, so no task ever re-acquires a key an ancestor already
/// holds, and deterministic acquisition order inside a composite rules out
/// deadlock between tasks needing several resources.
///
/// 通过一次自顶向下的遍历构建 [`NodeExecutionAdvisor`]。声明了独占资源
/// 的节点成为锁根：其子树中任何位置声明的资源都被提升到锁根处的一把
/// 组合锁中，所有后代被强制串行且不再持锁（它们在已持有的组合锁下
/// 运行）。锁根之间绝不嵌套。
pub struct NodeTreeWalker {
    lock_manager: LockManager,
}

impl NodeTreeWalker {
    pub fn new() -> Self {
        NodeTreeWalker {
            lock_manager: LockManager::new(),
        }
    }

    /// Walks the tree rooted at `root` and produces the execution plan.
    ///
    /// # Errors
    /// Fails when a resource declaration is invalid (empty key). The
    /// caller treats this as fatal: it happens before any listener event.
    pub fn walk(&self, root: &Arc<dyn TestNode>) -> Result<NodeExecutionAdvisor> {
        let mut advisor = NodeExecutionAdvisor::default();

        // A global read-write declaration anywhere serializes everything.
        if Self::declares_global_read_write(root) {
            Self::force_subtree_sequential(root, &mut advisor);
        }

        self.visit(root, &mut advisor)?;
        Ok(advisor)
    }

    fn visit(&self, node: &Arc<dyn TestNode>, advisor: &mut NodeExecutionAdvisor) -> Result<()> {
        let declared = node.exclusive_resources();
        if declared.is_empty() {
            for child in node.children() {
                self.visit(&child, advisor)?;
            }
            return Ok(());
        }

        // Lock root: hoist the whole subtree's resources into one
        // composite and run the subtree sequentially under it.
        let mut all_resources = declared;
        for child in node.children() {
            Self::collect_and_force(&child, &mut all_resources, advisor);
        }
        let lock = self.lock_manager.lock_for_resources(&all_resources)?;
        advisor.use_resource_lock(node, lock);
        Ok(())
    }

    fn collect_and_force(
        node: &Arc<dyn TestNode>,
        all_resources: &mut Vec<ExclusiveResource>,
        advisor: &mut NodeExecutionAdvisor,
    ) {
        advisor.force_sequential(node);
        all_resources.extend(node.exclusive_resources());
        for child in node.children() {
            Self::collect_and_force(&child, all_resources, advisor);
        }
    }

    fn force_subtree_sequential(node: &Arc<dyn TestNode>, advisor: &mut NodeExecutionAdvisor) {
        advisor.force_sequential(node);
        for child in node.children() {
            Self::force_subtree_sequential(&child, advisor);
        }
    }

    fn declares_global_read_write(node: &Arc<dyn TestNode>) -> bool {
        let here = node
            .exclusive_resources()
            .iter()
            .any(|resource| resource.key() == GLOBAL_KEY && resource.mode() == LockMode::ReadWrite);
        here || node
            .children()
            .iter()
            .any(Self::declares_global_read_write)
    }
}

impl Default for NodeTreeWalker {
    fn default() -> Self {
        NodeTreeWalker::new()
    }
}
