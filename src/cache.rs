//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 响应缓存实现
//!
//! 以不透明指纹为键的时限缓存，支持新鲜期与陈旧供应（stale-while-revalidate）。
//!
//! # 特性
//!
//! - **三态读取**: `Fresh` / `Stale` / `Miss`，陈旧命中仍返回值但附带显式的
//!   刷新信号，由调用方触发异步刷新，读路径内不做任何隐式重算
//! - **整体替换**: `put` 总是整条替换并重置创建时间，读者不会观察到部分写入
//! - **创建序淘汰**: 超出容量时淘汰创建时间最旧的一条（非 LRU，刻意选择
//!   廉价的创建序策略）
//! - **过期清扫**: 超过陈旧期的条目由周期清扫移除
//!
//! 同一缓存被用于计算结果缓存与后端查询结果缓存，策略完全一致，
//! 指纹派生是调用方的职责。

use crate::config::CacheLayerConfig;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, trace};

/// 缓存读取结果
///
/// `Stale` 携带的值仍可直接返回给调用方（避免热路径上的同步重算），
/// 同时表示调用方应当触发一次异步刷新。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome<V> {
    /// 新鲜命中
    Fresh(V),
    /// 陈旧命中，调用方应触发异步刷新
    Stale(V),
    /// 未命中或已彻底过期
    Miss,
}

impl<V> CacheOutcome<V> {
    /// 是否有可用值（新鲜或陈旧）
    pub fn is_usable(&self) -> bool {
        !matches!(self, CacheOutcome::Miss)
    }
}

/// 缓存条目
///
/// 仅通过整体替换修改，创建后不可部分更新。
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
}

/// 缓存内部状态
///
/// `order` 记录条目的创建顺序用于淘汰；替换条目时旧记录惰性失效，
/// 淘汰时按 `created_at` 是否匹配判断记录是否仍然有效。
struct CacheInner<V> {
    map: AHashMap<String, CacheEntry<V>>,
    order: VecDeque<(String, Instant)>,
}

/// 缓存统计信息
#[derive(Debug, Default)]
pub struct CacheStats {
    fresh_hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    evictions: AtomicU64,
    writes: AtomicU64,
}

impl CacheStats {
    pub fn fresh_hits(&self) -> u64 {
        self.fresh_hits.load(Ordering::Relaxed)
    }

    pub fn stale_hits(&self) -> u64 {
        self.stale_hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.fresh_hits() + self.stale_hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// 响应缓存
///
/// 读写均为单个短临界区，不跨越任何挂起点持锁。
///
/// # 示例
/// ```rust
/// use steward::cache::{CacheOutcome, ResponseCache};
/// use steward::config::CacheLayerConfig;
///
/// let cache: ResponseCache<String> = ResponseCache::new(CacheLayerConfig::default());
/// cache.put("fp-1", "result".to_string());
/// assert!(matches!(cache.get("fp-1"), CacheOutcome::Fresh(_)));
/// ```
pub struct ResponseCache<V> {
    config: CacheLayerConfig,
    inner: Mutex<CacheInner<V>>,
    stats: CacheStats,
}

impl<V: Clone> ResponseCache<V> {
    /// 创建新的响应缓存
    pub fn new(config: CacheLayerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(CacheInner {
                map: AHashMap::new(),
                order: VecDeque::new(),
            }),
            stats: CacheStats::default(),
        }
    }

    /// 读取（以当前时刻）
    pub fn get(&self, fingerprint: &str) -> CacheOutcome<V> {
        self.get_at(fingerprint, Instant::now())
    }

    /// 读取（以指定时刻）
    ///
    /// 设条目年龄为 `now - created_at`：
    /// - 年龄 ≤ 新鲜期 → `Fresh`
    /// - 新鲜期 < 年龄 ≤ 陈旧期 → `Stale`
    /// - 否则条目作废并返回 `Miss`
    pub fn get_at(&self, fingerprint: &str, now: Instant) -> CacheOutcome<V> {
        let mut inner = self.inner.lock();
        match inner.map.get(fingerprint) {
            Some(entry) => {
                let age = now.duration_since(entry.created_at);
                if age <= self.config.max_age() {
                    self.stats.fresh_hits.fetch_add(1, Ordering::Relaxed);
                    CacheOutcome::Fresh(entry.value.clone())
                } else if age <= self.config.stale_horizon() {
                    self.stats.stale_hits.fetch_add(1, Ordering::Relaxed);
                    trace!("陈旧命中: {}", fingerprint);
                    CacheOutcome::Stale(entry.value.clone())
                } else {
                    inner.map.remove(fingerprint);
                    self.stats.expirations.fetch_add(1, Ordering::Relaxed);
                    self.stats.misses.fetch_add(1, Ordering::Relaxed);
                    CacheOutcome::Miss
                }
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                CacheOutcome::Miss
            }
        }
    }

    /// 写入（以当前时刻）
    pub fn put(&self, fingerprint: &str, value: V) {
        self.put_at(fingerprint, value, Instant::now());
    }

    /// 写入（以指定时刻）
    ///
    /// 总是整条替换已有条目并重置创建时间。插入会超出容量时，
    /// 先淘汰创建时间最旧的一条。
    pub fn put_at(&self, fingerprint: &str, value: V, now: Instant) {
        let mut inner = self.inner.lock();

        let replacing = inner.map.contains_key(fingerprint);
        if !replacing && inner.map.len() >= self.config.max_entries {
            Self::evict_oldest(&mut inner, &self.stats);
        }

        inner.map.insert(
            fingerprint.to_string(),
            CacheEntry {
                value,
                created_at: now,
            },
        );
        inner.order.push_back((fingerprint.to_string(), now));
        self.stats.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// 显式移除条目
    pub fn evict(&self, fingerprint: &str) -> bool {
        let mut inner = self.inner.lock();
        inner.map.remove(fingerprint).is_some()
    }

    /// 淘汰创建时间最旧的有效条目
    ///
    /// 队列头部可能是被替换或已移除条目留下的失效记录，按 `created_at`
    /// 是否与现存条目一致来跳过。
    fn evict_oldest(inner: &mut CacheInner<V>, stats: &CacheStats) {
        while let Some((key, created_at)) = inner.order.pop_front() {
            let live = inner
                .map
                .get(&key)
                .map(|entry| entry.created_at == created_at)
                .unwrap_or(false);
            if live {
                inner.map.remove(&key);
                stats.evictions.fetch_add(1, Ordering::Relaxed);
                debug!("容量淘汰: {}", key);
                return;
            }
        }
    }

    /// 清扫彻底过期的条目（以当前时刻）
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    /// 清扫彻底过期的条目（以指定时刻）
    ///
    /// 同时顺带剔除淘汰队列中已失效的记录，防止其无界增长。
    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        let stale_horizon = self.config.stale_horizon();
        let mut inner = self.inner.lock();
        let before = inner.map.len();
        inner
            .map
            .retain(|_, entry| now.duration_since(entry.created_at) <= stale_horizon);
        let CacheInner { map, order } = &mut *inner;
        order.retain(|(key, created_at)| {
            map.get(key)
                .map(|entry| entry.created_at == *created_at)
                .unwrap_or(false)
        });
        let swept = before - inner.map.len();
        if swept > 0 {
            self.stats
                .expirations
                .fetch_add(swept as u64, Ordering::Relaxed);
            debug!("清扫了 {} 条过期缓存", swept);
        }
        swept
    }

    /// 当前条目数
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    /// 缓存是否为空
    pub fn is_empty(&self) -> bool {
        self.inner.lock().map.is_empty()
    }

    /// 获取统计信息
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// 获取配置
    pub fn config(&self) -> &CacheLayerConfig {
        &self.config
    }
}

// ============================================================================
// 单元测试
// ============================================================================
