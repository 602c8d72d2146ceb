// ==========================================
// 航空主运单草稿 - 带过期与容量上限的内存缓存
// ==========================================
// 职责: 通用 key → value 缓存,用于计算结果记忆化与参考数据缓存
// 存储: moka::sync::Cache (并发读写,维护任务在 run_pending_tasks 中批量执行)
// 淘汰: 超出容量时淘汰最久未访问条目 (LRU)
// 统计: 命中/未命中由本层计数; 淘汰/过期由 eviction_listener 计数
// ==========================================

use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::sync::Cache as MokaCache;
use serde::Serialize;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 缓存配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// 条目存活时间
    pub ttl: Duration,
    /// 最大条目数（0 表示禁用缓存）
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            max_entries: 1024,
        }
    }
}

/// 缓存统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

// ==========================================
// TtlCache
// ==========================================
pub struct TtlCache<K, V> {
    name: String,
    config: CacheConfig,
    inner: MokaCache<K, V>,
    stats: Arc<CacheStats>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// 创建缓存
    ///
    /// # 参数
    /// - name: 缓存名称（用于日志与统计）
    /// - config: 过期时间与容量上限
    pub fn new(name: impl Into<String>, config: CacheConfig) -> Self {
        let name = name.into();
        let stats = Arc::new(CacheStats::default());

        let listener_stats = Arc::clone(&stats);
        let listener_name = name.clone();
        let inner = MokaCache::builder()
            .name(&name)
            .max_capacity(config.max_entries as u64)
            .time_to_live(config.ttl)
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(move |_key, _value, cause| match cause {
                RemovalCause::Size => {
                    listener_stats.evictions.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(cache = %listener_name, "缓存容量已满,淘汰最久未访问条目");
                }
                RemovalCause::Expired => {
                    listener_stats.expirations.fetch_add(1, Ordering::Relaxed);
                }
                // 显式删除与覆盖写入不计入统计
                _ => {}
            })
            .build();

        Self {
            name,
            config,
            inner,
            stats,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    /// 读取未过期的条目
    pub fn get(&self, key: &K) -> Option<V> {
        match self.inner.get(key) {
            Some(v) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(v)
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// 写入条目
    ///
    /// 同 key 重复写入视为新写入（刷新过期时间）
    pub fn insert(&self, key: K, value: V) {
        if self.config.max_entries == 0 {
            return;
        }
        self.inner.insert(key, value);
    }

    /// 记忆化读取: 命中直接返回; 未命中时计算并写入
    ///
    /// 计算失败不写入缓存
    pub fn get_or_try_insert_with<E, F>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(v) = self.get(&key) {
            return Ok(v);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// 移除条目
    pub fn invalidate(&self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    /// 清空缓存
    pub fn clear(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks();
    }

    /// 当前条目数
    ///
    /// 写入在维护任务执行后才计入,调用 purge_expired 后为准确值
    pub fn len(&self) -> usize {
        self.inner.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 执行待处理的维护任务（应用写入、容量淘汰、回收过期条目）
    ///
    /// 返回本次回收的过期条目数
    pub fn purge_expired(&self) -> usize {
        let before = self.stats.expirations.load(Ordering::Relaxed);
        self.inner.run_pending_tasks();
        let after = self.stats.expirations.load(Ordering::Relaxed);
        after.saturating_sub(before) as usize
    }

    /// 统计快照
    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            expirations: self.stats.expirations.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
