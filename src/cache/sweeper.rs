// ==========================================
// 航空主运单草稿 - 缓存过期清扫线程
// ==========================================
// 职责: 独立于请求处理,周期性执行各缓存的维护任务 (run_pending_tasks)
// 约束: 维护任务与 get/insert 并发执行,请求线程不承担批量回收
// ==========================================

use crate::cache::ttl_cache::TtlCache;
use std::hash::Hash;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// 可被清扫的缓存
pub trait Sweepable: Send + Sync {
    fn cache_name(&self) -> &str;

    /// 回收过期条目,返回回收数量
    fn sweep(&self) -> usize;
}

impl<K, V> Sweepable for TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn cache_name(&self) -> &str {
        self.name()
    }

    fn sweep(&self) -> usize {
        self.purge_expired()
    }
}

/// 后台清扫器
///
/// Drop 时通知线程退出并等待其结束
pub struct CacheSweeper {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CacheSweeper {
    /// 启动清扫线程
    ///
    /// # 参数
    /// - caches: 需要清扫的缓存
    /// - interval: 清扫周期
    pub fn spawn(caches: Vec<Arc<dyn Sweepable>>, interval: Duration) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = std::thread::Builder::new()
            .name("draft-mawb-cache-sweeper".to_string())
            .spawn(move || {
                tracing::debug!(caches = caches.len(), ?interval, "缓存清扫线程启动");
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            for cache in &caches {
                                let removed = cache.sweep();
                                if removed > 0 {
                                    tracing::debug!(
                                        cache = cache.cache_name(),
                                        removed,
                                        "回收过期缓存条目"
                                    );
                                }
                            }
                        }
                        // 收到停止信号或发送端已释放
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("缓存清扫线程退出");
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// 停止清扫线程（幂等）
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("缓存清扫线程异常退出");
            }
        }
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ttl_cache::CacheConfig;

    #[test]
    fn test_sweeper_purges_in_background() {
        let cache: Arc<TtlCache<String, i64>> = Arc::new(TtlCache::new(
            "sweep-test",
            CacheConfig {
                ttl: Duration::from_millis(5),
                max_entries: 16,
            },
        ));
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);

        let mut sweeper =
            CacheSweeper::spawn(vec![cache.clone() as Arc<dyn Sweepable>], Duration::from_millis(10))
                .unwrap();

        // stats() 不触发维护任务,过期计数只能来自清扫线程
        let mut waited = 0;
        while cache.stats().expirations < 2 && waited < 100 {
            std::thread::sleep(Duration::from_millis(10));
            waited += 1;
        }
        sweeper.stop();

        assert_eq!(cache.stats().expirations, 2, "过期条目应由清扫线程回收");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut sweeper = CacheSweeper::spawn(Vec::new(), Duration::from_secs(3600)).unwrap();
        sweeper.stop();
        sweeper.stop();
    }
}
