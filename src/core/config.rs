//! # Configuration Parameters Module / 配置参数模块
//!
//! An opaque, read-only key/value lookup consumed by the executor and its
//! listeners. Parameters may be chained: a lookup that misses in the
//! explicit values falls through to an optional parent set.
//!
//! 执行器及其监听器使用的不透明只读键值查询。参数可以链式组合：
//! 在显式值中未命中的查询会回退到可选的父级参数集。

use std::collections::HashMap;
use std::sync::Arc;

/// Upper bound on parallel child dispatch, as a decimal integer.
/// Defaults to a value derived from the number of CPUs.
pub const PARALLELISM_PROPERTY: &str = "hierarchy.execution.parallelism";

/// Set to `false` to collapse all child dispatch to sequential execution.
pub const PARALLEL_ENABLED_PROPERTY: &str = "hierarchy.execution.parallel.enabled";

/// Set to `true` to make the console listener print started events too.
pub const CONSOLE_VERBOSE_PROPERTY: &str = "hierarchy.reporting.console.verbose";

/// A read-only configuration lookup with an optional fallback chain.
/// 带可选回退链的只读配置查询。
#[derive(Debug, Default, Clone)]
pub struct ConfigurationParameters {
    values: HashMap<String, String>,
    parent: Option<Arc<ConfigurationParameters>>,
}

impl ConfigurationParameters {
    /// An empty parameter set; every lookup misses.
    pub fn empty() -> Self {
        ConfigurationParameters::default()
    }

    /// Creates a parameter set from explicit values.
    pub fn from_map(values: HashMap<String, String>) -> Self {
        ConfigurationParameters {
            values,
            parent: None,
        }
    }

    /// Chains this set in front of a parent set consulted on misses.
    pub fn with_parent(mut self, parent: Arc<ConfigurationParameters>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Looks up a raw string value, walking the fallback chain.
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(value) => Some(value.as_str()),
            None => self.parent.as_ref().and_then(|parent| parent.get(key)),
        }
    }

    /// Looks up a boolean value. Values that are present but not parseable
    /// as `true`/`false` are treated as absent.
    pub fn get_boolean(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|value| value.parse().ok())
    }

    /// Looks up an unsigned integer value. Unparseable values are treated
    /// as absent.
    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|value| value.parse().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.parent.is_none()
    }
}
