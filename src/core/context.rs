//! # Execution Context Module / 执行上下文模块
//!
//! The per-branch state bundle threaded down the tree: listener,
//! configuration, extension values, the branch's failure collector and an
//! optional test-instance provider. Contexts are immutable; a child branch
//! derives a new context through [`ExecutionContext::extend`], which clones
//! the underlying state lazily exactly once and overrides only the fields
//! that were explicitly set. An ancestor task may therefore keep reading
//! its own context concurrently on another branch without any locking.
//!
//! 贯穿树向下传递的分支级状态包：监听器、配置、扩展值、该分支的失败
//! 收集器以及可选的测试实例提供者。上下文是不可变的；子分支通过
//! [`ExecutionContext::extend`] 派生新上下文，该方法惰性地、恰好一次地
//! 克隆底层状态，并且只覆盖显式设置的字段。因此祖先任务可以在另一个
//! 分支上继续并发读取自己的上下文，无需任何锁。

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::config::ConfigurationParameters;
use crate::core::listener::ExecutionListener;
use crate::core::models::{FailureCollector, ReportEntry};
use crate::core::node::TestNode;

/// Provides the object under test to the nodes of a branch. What an
/// "instance" is belongs to the engine built on top of this crate; the
/// executor only threads the provider through the tree.
pub trait TestInstanceProvider: Send + Sync {
    fn provide(&self) -> Arc<dyn Any + Send + Sync>;
}

/// A keyed store of engine-specific values with an optional parent chain,
/// the seam where an engine hangs its extension registry and extension
/// context equivalents. Stores are immutable once placed in a context;
/// a branch that needs additional values builds a child store.
///
/// 带可选父链的引擎专有值存储，是引擎挂载其扩展注册表和扩展上下文
/// 等价物的接缝。存储一旦放入上下文即不可变；需要附加值的分支会构建
/// 一个子存储。
#[derive(Default)]
pub struct ExtensionValues {
    values: HashMap<String, Arc<dyn Any + Send + Sync>>,
    parent: Option<Arc<ExtensionValues>>,
}

impl ExtensionValues {
    pub fn new() -> Self {
        ExtensionValues::default()
    }

    /// Creates an empty store whose lookups fall through to `parent`.
    pub fn child_of(parent: Arc<ExtensionValues>) -> Self {
        ExtensionValues {
            values: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Stores a value under `key`, replacing any previous value.
    pub fn put(&mut self, key: impl Into<String>, value: Arc<dyn Any + Send + Sync>) {
        self.values.insert(key.into(), value);
    }

    /// Looks up a value by key and downcasts it, walking the parent chain
    /// on a miss. A present value of a different type yields `None`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        match self.values.get(key) {
            Some(value) => value.clone().downcast::<T>().ok(),
            None => self.parent.as_ref().and_then(|parent| parent.get::<T>(key)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.parent.is_none()
    }
}

/// The cloneable state snapshot behind a context. Fields shared between a
/// parent and an extended child point at the same allocations.
#[derive(Clone)]
struct State {
    listener: Arc<dyn ExecutionListener>,
    configuration: Arc<ConfigurationParameters>,
    extension_values: Arc<ExtensionValues>,
    failure_collector: Arc<FailureCollector>,
    instance_provider: Option<Arc<dyn TestInstanceProvider>>,
}

/// Immutable per-branch execution state. Cloning a context is cheap (one
/// `Arc` bump); deriving a modified context goes through [`Self::extend`].
///
/// 不可变的分支级执行状态。克隆上下文的开销很低（一次 `Arc` 计数递增）；
/// 派生修改后的上下文通过 [`Self::extend`] 完成。
#[derive(Clone)]
pub struct ExecutionContext {
    state: Arc<State>,
}

impl ExecutionContext {
    /// Creates the root context for a run. The extension store starts
    /// empty, the failure collector fresh, and no instance provider is set.
    pub fn new(
        listener: Arc<dyn ExecutionListener>,
        configuration: Arc<ConfigurationParameters>,
    ) -> Self {
        ExecutionContext {
            state: Arc::new(State {
                listener,
                configuration,
                extension_values: Arc::new(ExtensionValues::new()),
                failure_collector: Arc::new(FailureCollector::new()),
                instance_provider: None,
            }),
        }
    }

    pub fn listener(&self) -> &Arc<dyn ExecutionListener> {
        &self.state.listener
    }

    pub fn configuration(&self) -> &Arc<ConfigurationParameters> {
        &self.state.configuration
    }

    pub fn extension_values(&self) -> &Arc<ExtensionValues> {
        &self.state.extension_values
    }

    pub fn failure_collector(&self) -> &Arc<FailureCollector> {
        &self.state.failure_collector
    }

    pub fn instance_provider(&self) -> Option<&Arc<dyn TestInstanceProvider>> {
        self.state.instance_provider.as_ref()
    }

    /// Forwards a report entry from a running node to the listener.
    pub fn publish_report_entry(&self, node: &dyn TestNode, entry: &ReportEntry) {
        self.state.listener.report_entry_published(node, entry);
    }

    /// Returns a builder seeded with this context's state. The state is
    /// cloned lazily on the first override; `build` without overrides
    /// shares the parent state outright.
    pub fn extend(&self) -> ExecutionContextBuilder {
        ExecutionContextBuilder {
            original: Arc::clone(&self.state),
            new_state: None,
        }
    }
}

/// Mutable builder over an immutable context snapshot. Repeated overrides
/// mutate the same cloned state; the clone happens at most once.
///
/// 基于不可变上下文快照的可变构建器。重复覆盖会修改同一份克隆状态；
/// 克隆最多发生一次。
pub struct ExecutionContextBuilder {
    original: Arc<State>,
    new_state: Option<State>,
}

impl ExecutionContextBuilder {
    pub fn with_extension_values(mut self, extension_values: Arc<ExtensionValues>) -> Self {
        self.state_mut().extension_values = extension_values;
        self
    }

    pub fn with_failure_collector(mut self, failure_collector: Arc<FailureCollector>) -> Self {
        self.state_mut().failure_collector = failure_collector;
        self
    }

    pub fn with_instance_provider(
        mut self,
        instance_provider: Arc<dyn TestInstanceProvider>,
    ) -> Self {
        self.state_mut().instance_provider = Some(instance_provider);
        self
    }

    /// Produces the derived context. Fields that were never overridden are
    /// shared with the parent context.
    pub fn build(self) -> ExecutionContext {
        let state = match self.new_state {
            Some(state) => Arc::new(state),
            None => self.original,
        };
        ExecutionContext { state }
    }

    fn state_mut(&mut self) -> &mut State {
        let original = &self.original;
        self.new_state
            .get_or_insert_with(|| (**original).clone())
    }
}
