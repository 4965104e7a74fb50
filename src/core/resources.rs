//! # Exclusive Resources & Locks Module / 独占资源与锁模块
//!
//! This module names shared resources (files, environment variables, any
//! external state) and resolves sets of resource declarations into concrete
//! lock combinations. Two declarations conflict when they share a key and
//! at least one of them requires read-write access; same-key readers may
//! hold their locks concurrently.
//!
//! 此模块为共享资源（文件、环境变量、任何外部状态）命名，并将资源声明
//! 集合解析为具体的锁组合。当两个声明共享同一个键且其中至少一个需要
//! 读写访问时，它们相互冲突；同键的读者可以同时持有锁。

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// The key of the global resource. Declaring it with read-write access
/// serializes the entire tree.
/// 全局资源的键。以读写模式声明它会使整棵树串行执行。
pub const GLOBAL_KEY: &str = "hierarchy.global";

/// Shared read access to the global resource.
pub static GLOBAL_READ: Lazy<ExclusiveResource> =
    Lazy::new(|| ExclusiveResource::new(GLOBAL_KEY, LockMode::Read));

/// Exclusive access to the global resource.
pub static GLOBAL_READ_WRITE: Lazy<ExclusiveResource> =
    Lazy::new(|| ExclusiveResource::new(GLOBAL_KEY, LockMode::ReadWrite));

/// The access mode requested for a resource.
/// 请求的资源访问模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockMode {
    /// Shared access; compatible with other readers of the same key.
    /// 共享访问；与同键的其他读者兼容。
    Read,
    /// Exclusive access; conflicts with every other holder of the same key.
    /// 独占访问；与同键的任何其他持有者冲突。
    ReadWrite,
}

impl LockMode {
    /// Returns `true` if this mode excludes every other holder.
    pub fn is_exclusive(self) -> bool {
        matches!(self, LockMode::ReadWrite)
    }
}

/// A named, mode-tagged lockable entity representing shared external state.
/// 一个带名称和模式标记的可加锁实体，代表共享的外部状态。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExclusiveResource {
    key: String,
    mode: LockMode,
}

impl ExclusiveResource {
    /// Creates a resource declaration for `key` with the given access mode.
    pub fn new(key: impl Into<String>, mode: LockMode) -> Self {
        ExclusiveResource {
            key: key.into(),
            mode,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Returns `true` if this declaration names the global resource.
    pub fn is_global(&self) -> bool {
        self.key == GLOBAL_KEY
    }
}

/// Interns one read-write lock per resource key and composes resource sets
/// into [`ResourceLock`]s. One manager exists per run; every task that
/// names the same key therefore contends on the same underlying lock.
///
/// 每个资源键对应一个读写锁，由本管理器统一持有，并把资源集合组合成
/// [`ResourceLock`]。每次运行只有一个管理器；命名相同键的所有任务
/// 因此在同一把底层锁上竞争。
pub struct LockManager {
    locks_by_key: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl LockManager {
    pub fn new() -> Self {
        LockManager {
            locks_by_key: Mutex::new(HashMap::new()),
        }
    }

    /// Composes a single lock out of a set of resource declarations.
    ///
    /// Duplicate keys are collapsed to their strongest mode, and the
    /// resulting entries are ordered deterministically (the global key
    /// first, then lexicographically by key) so that two tasks needing
    /// multiple resources always acquire them in the same order and cannot
    /// deadlock against each other.
    ///
    /// # Errors
    /// Fails on an empty resource key; this is a setup error detected
    /// before any execution starts.
    pub fn lock_for_resources(&self, resources: &[ExclusiveResource]) -> Result<ResourceLock> {
        // Collapse duplicates, keeping the strongest requested mode per key.
        let mut mode_by_key: BTreeMap<String, LockMode> = BTreeMap::new();
        for resource in resources {
            if resource.key().is_empty() {
                bail!("exclusive resource with an empty key");
            }
            mode_by_key
                .entry(resource.key().to_string())
                .and_modify(|mode| {
                    if resource.mode().is_exclusive() {
                        *mode = LockMode::ReadWrite;
                    }
                })
                .or_insert(resource.mode());
        }

        // BTreeMap iteration is lexicographic; pull the global key to the
        // front so it is always the outermost lock.
        let mut ordered: Vec<(String, LockMode)> = Vec::with_capacity(mode_by_key.len());
        if let Some(mode) = mode_by_key.remove(GLOBAL_KEY) {
            ordered.push((GLOBAL_KEY.to_string(), mode));
        }
        ordered.extend(mode_by_key);

        let mut entries = Vec::with_capacity(ordered.len());
        for (key, mode) in ordered {
            let lock = self.lock_for_key(&key);
            entries.push(ResourceLockEntry {
                resource: ExclusiveResource::new(key, mode),
                lock,
            });
        }

        Ok(match entries.len() {
            0 => ResourceLock::Nop,
            1 => ResourceLock::Single(entries.into_iter().next().expect("one entry")),
            _ => ResourceLock::Composite(entries),
        })
    }

    fn lock_for_key(&self, key: &str) -> Arc<RwLock<()>> {
        let mut locks = self
            .locks_by_key
            .lock()
            .expect("lock manager mutex poisoned");
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }
}

impl Default for LockManager {
    fn default() -> Self {
        LockManager::new()
    }
}

/// One resource bound to the concrete lock guarding its key.
#[derive(Clone)]
pub struct ResourceLockEntry {
    resource: ExclusiveResource,
    lock: Arc<RwLock<()>>,
}

impl ResourceLockEntry {
    pub fn resource(&self) -> &ExclusiveResource {
        &self.resource
    }

    async fn acquire(&self) -> ModeGuard {
        match self.resource.mode() {
            LockMode::Read => ModeGuard::Read(self.lock.clone().read_owned().await),
            LockMode::ReadWrite => ModeGuard::Write(self.lock.clone().write_owned().await),
        }
    }

    fn try_acquire(&self) -> Option<ModeGuard> {
        match self.resource.mode() {
            LockMode::Read => self.lock.clone().try_read_owned().ok().map(ModeGuard::Read),
            LockMode::ReadWrite => self
                .lock
                .clone()
                .try_write_owned()
                .ok()
                .map(ModeGuard::Write),
        }
    }
}

impl std::fmt::Debug for ResourceLockEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLockEntry")
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

/// A runtime lock handle bound to zero, one or several resources.
/// Acquisition is scoped: it returns a guard whose drop releases every
/// underlying lock exactly once, on every exit path including failure.
///
/// 绑定到零个、一个或多个资源的运行时锁句柄。获取是有作用域的：
/// 返回的守卫在被丢弃时恰好释放一次所有底层锁，任何退出路径（包括
/// 失败路径）都是如此。
#[derive(Debug, Clone)]
pub enum ResourceLock {
    /// No resources; acquisition is free.
    Nop,
    /// Exactly one resource.
    Single(ResourceLockEntry),
    /// Several resources, acquired in their deterministic order.
    Composite(Vec<ResourceLockEntry>),
}

impl ResourceLock {
    /// Acquires every underlying lock in order. May block indefinitely
    /// until the resources become available; there is no timeout.
    pub async fn acquire(&self) -> ResourceLockGuard {
        let mut guards = Vec::new();
        match self {
            ResourceLock::Nop => {}
            ResourceLock::Single(entry) => guards.push(entry.acquire().await),
            ResourceLock::Composite(entries) => {
                for entry in entries {
                    guards.push(entry.acquire().await);
                }
            }
        }
        ResourceLockGuard { _guards: guards }
    }

    /// Non-blocking acquisition; returns `None` if any underlying lock is
    /// currently held in a conflicting mode.
    pub fn try_acquire(&self) -> Option<ResourceLockGuard> {
        let mut guards = Vec::new();
        match self {
            ResourceLock::Nop => {}
            ResourceLock::Single(entry) => guards.push(entry.try_acquire()?),
            ResourceLock::Composite(entries) => {
                for entry in entries {
                    // Partially acquired guards are released by drop when
                    // a later entry is unavailable.
                    guards.push(entry.try_acquire()?);
                }
            }
        }
        Some(ResourceLockGuard { _guards: guards })
    }

    /// The resources protected by this lock, in acquisition order.
    pub fn resources(&self) -> Vec<&ExclusiveResource> {
        match self {
            ResourceLock::Nop => Vec::new(),
            ResourceLock::Single(entry) => vec![entry.resource()],
            ResourceLock::Composite(entries) => {
                entries.iter().map(ResourceLockEntry::resource).collect()
            }
        }
    }

    pub fn is_nop(&self) -> bool {
        matches!(self, ResourceLock::Nop)
    }
}

enum ModeGuard {
    Read(#[allow(dead_code)] OwnedRwLockReadGuard<()>),
    Write(#[allow(dead_code)] OwnedRwLockWriteGuard<()>),
}

/// RAII guard over an acquired [`ResourceLock`]. Dropping it releases all
/// underlying locks.
pub struct ResourceLockGuard {
    _guards: Vec<ModeGuard>,
}
