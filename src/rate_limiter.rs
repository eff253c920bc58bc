//! 限流器模块
//!
//! 固定窗口限流：为每个 (identity, classification) 组合维护一个准入窗口。
//!
//! # 特性
//! - 固定窗口语义：每个 identity 仅需 O(1) 内存与查找
//! - 窗口边界处允许突发（跨边界最多 2x 上限），这是文档化的既定行为，
//!   调用方可能依赖"每窗口上限"语义，不可替换为滑动窗口
//! - 使用 DashMap 的分条目锁保证同一 key 内按到达顺序判定
//! - 判定过程不挂起，可在任意并发单元中调用
//! - 空闲窗口（超过 2x 窗口长度无准入尝试）由周期清扫回收

use crate::config::{Classification, RateLimitingConfig};
use crate::constants::IDLE_WINDOW_PURGE_FACTOR;
use crate::error::AdmissionDecision;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, trace};

/// 单个 (identity, classification) 的准入窗口
///
/// 窗口跨越边界时整体替换，不做原地滚动。
#[derive(Debug, Clone)]
struct RateWindow {
    /// 窗口起始时刻
    started_at: Instant,
    /// 当前窗口内已准入的请求数
    count: u64,
    /// 最近一次准入尝试（含被拒绝的），用于空闲回收
    last_attempt: Instant,
}

impl RateWindow {
    fn fresh(now: Instant) -> Self {
        Self {
            started_at: now,
            count: 1,
            last_attempt: now,
        }
    }
}

/// 限流统计信息
#[derive(Debug, Default)]
pub struct RateLimiterStats {
    admitted: AtomicU64,
    rejected: AtomicU64,
    purged: AtomicU64,
}

impl RateLimiterStats {
    pub fn admitted(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn purged(&self) -> u64 {
        self.purged.load(Ordering::Relaxed)
    }
}

/// 固定窗口限流器
///
/// # 示例
/// ```rust
/// use steward::config::{Classification, RateLimitingConfig};
/// use steward::rate_limiter::RateLimiter;
///
/// let limiter = RateLimiter::new(RateLimitingConfig::default());
/// let decision = limiter.admit("user-1", Classification::Api);
/// assert!(decision.is_admitted());
/// ```
pub struct RateLimiter {
    /// 不可变配置快照
    config: RateLimitingConfig,
    /// 按 (identity, classification) 惰性创建的窗口表
    windows: DashMap<(String, Classification), RateWindow, ahash::RandomState>,
    /// 统计信息
    stats: RateLimiterStats,
}

impl RateLimiter {
    /// 创建新的限流器
    pub fn new(config: RateLimitingConfig) -> Self {
        Self {
            config,
            windows: DashMap::with_hasher(ahash::RandomState::new()),
            stats: RateLimiterStats::default(),
        }
    }

    /// 准入判定（以当前时刻）
    pub fn admit(&self, identity: &str, classification: Classification) -> AdmissionDecision {
        self.admit_at(identity, classification, Instant::now())
    }

    /// 准入判定（以指定时刻）
    ///
    /// 判定规则：
    /// - 无窗口或当前窗口已过期：开启新窗口，计数置 1，准入
    /// - 计数未达上限：递增并准入
    /// - 否则拒绝，`retry_after` 为当前窗口的剩余时长
    ///
    /// DashMap 的条目锁保证同一 key 的判定严格按到达顺序执行，
    /// 后到的请求不会抢占先到请求在同一窗口内的配额。
    pub fn admit_at(
        &self,
        identity: &str,
        classification: Classification,
        now: Instant,
    ) -> AdmissionDecision {
        let rule = self.config.rule_for(classification);
        let window_len = rule.window();

        let mut entry = self
            .windows
            .entry((identity.to_string(), classification))
            .or_insert_with(|| {
                trace!("为 {}/{} 创建新窗口", identity, classification);
                // count 置 0，由下方统一走递增路径
                RateWindow {
                    started_at: now,
                    count: 0,
                    last_attempt: now,
                }
            });

        entry.last_attempt = now;

        // 窗口在严格超过 start + window_len 后才整体替换，边界时刻本身
        // 仍属于旧窗口
        if now.duration_since(entry.started_at) > window_len {
            *entry = RateWindow::fresh(now);
            self.stats.admitted.fetch_add(1, Ordering::Relaxed);
            return AdmissionDecision::Admit;
        }

        if entry.count < rule.max {
            entry.count += 1;
            self.stats.admitted.fetch_add(1, Ordering::Relaxed);
            AdmissionDecision::Admit
        } else {
            let window_end = entry.started_at + window_len;
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            trace!(
                "拒绝 {}/{}: 窗口内已达上限 {}",
                identity,
                classification,
                rule.max
            );
            AdmissionDecision::Reject {
                retry_after: window_end.duration_since(now),
            }
        }
    }

    /// 清扫空闲窗口（以当前时刻）
    pub fn purge_idle(&self) -> usize {
        self.purge_idle_at(Instant::now())
    }

    /// 清扫空闲窗口（以指定时刻）
    ///
    /// 超过 2x 窗口长度没有任何准入尝试的窗口会被移除，以约束内存。
    pub fn purge_idle_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|(_, classification), window| {
            let idle_horizon = self.config.rule_for(*classification).window()
                * IDLE_WINDOW_PURGE_FACTOR;
            now.duration_since(window.last_attempt) <= idle_horizon
        });
        let purged = before.saturating_sub(self.windows.len());
        if purged > 0 {
            self.stats.purged.fetch_add(purged as u64, Ordering::Relaxed);
            debug!("清扫了 {} 个空闲窗口", purged);
        }
        purged
    }

    /// 当前跟踪的窗口数
    pub fn tracked_windows(&self) -> usize {
        self.windows.len()
    }

    /// 获取统计信息
    pub fn stats(&self) -> &RateLimiterStats {
        &self.stats
    }
}

// ============================================================================
// 单元测试
// ============================================================================
