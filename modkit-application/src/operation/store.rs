//! 操作追踪存储（OperationStore）
//!
//! 总线在发布时写入初始记录，订阅者完成后写回最新记录。
//! 内存实现带显式保留策略：按存活时长与条目上限淘汰，避免无界增长；
//! 淘汰沿创建时间索引进行，每次写入的开销与淘汰数量成正比。
//!
use super::{OperationId, OperationRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use modkit_domain::AppResult;
use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[async_trait]
pub trait OperationStore: Send + Sync {
    async fn save(&self, record: OperationRecord) -> AppResult<()>;

    async fn find(&self, id: &OperationId) -> AppResult<Option<OperationRecord>>;

    /// 当前保留的记录数
    async fn count(&self) -> AppResult<usize>;
}

/// 保留策略：`None` 表示该维度不限制
#[derive(Clone, Copy, Debug)]
pub struct RetentionPolicy {
    /// 按 `created_at` 计算的最大存活时长
    pub max_age: Option<Duration>,
    /// 最大条目数，超出时淘汰最早创建的记录
    pub max_entries: Option<usize>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age: Some(Duration::from_secs(60 * 60)),
            max_entries: Some(10_000),
        }
    }
}

impl RetentionPolicy {
    pub fn unbounded() -> Self {
        Self {
            max_age: None,
            max_entries: None,
        }
    }
}

/// 按创建时间排序的索引键
type AgeKey = (DateTime<Utc>, OperationId);

/// 基于 DashMap 的内存操作存储，每次写入时执行淘汰
///
/// `order` 按创建时间索引全部记录，淘汰只需从最早的一端弹出。
#[derive(Default)]
pub struct InMemoryOperationStore {
    records: DashMap<OperationId, OperationRecord>,
    order: Mutex<BTreeSet<AgeKey>>,
    retention: RetentionPolicy,
}

impl InMemoryOperationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: RetentionPolicy) -> Self {
        Self {
            retention,
            ..Self::default()
        }
    }

    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    /// 按保留策略淘汰记录，返回淘汰数量
    pub fn evict(&self, now: DateTime<Utc>) -> usize {
        let mut order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
        self.evict_locked(&mut order, now)
    }

    fn evict_locked(&self, order: &mut BTreeSet<AgeKey>, now: DateTime<Utc>) -> usize {
        let mut evicted = 0;

        let cutoff = self
            .retention
            .max_age
            .and_then(|age| chrono::Duration::from_std(age).ok())
            .and_then(|age| now.checked_sub_signed(age));
        if let Some(cutoff) = cutoff {
            while order.first().is_some_and(|(created_at, _)| *created_at < cutoff) {
                if let Some((_, id)) = order.pop_first() {
                    self.records.remove(&id);
                    evicted += 1;
                }
            }
        }

        if let Some(max_entries) = self.retention.max_entries {
            while order.len() > max_entries {
                let Some((_, id)) = order.pop_first() else { break };
                self.records.remove(&id);
                evicted += 1;
            }
        }

        if evicted > 0 {
            tracing::debug!(evicted, remaining = order.len(), "evicted operation records");
        }
        evicted
    }
}

#[async_trait]
impl OperationStore for InMemoryOperationStore {
    async fn save(&self, record: OperationRecord) -> AppResult<()> {
        let mut order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
        order.insert((record.created_at, record.id));
        self.records.insert(record.id, record);
        self.evict_locked(&mut order, Utc::now());
        Ok(())
    }

    async fn find(&self, id: &OperationId) -> AppResult<Option<OperationRecord>> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.records.len())
    }
}
