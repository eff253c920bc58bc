//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 资源治理门面
//!
//! 将限流器、响应缓存、连接池与健康监控组合为单一入口，供服务端
//! 请求路径按以下顺序消费：
//!
//! 1. [`Governor::check_admission`] —— 按身份与分类做限流裁决
//! 2. [`Governor::cache_lookup`] —— 按指纹查询缓存
//! 3. [`Governor::with_connection`] —— 未命中时借用后端连接
//! 4. [`Governor::cache_store`] —— 回填缓存
//!
//! # 示例
//!
//! ```rust,no_run
//! use steward::prelude::*;
//!
//! # struct MyFactory;
//! # #[async_trait::async_trait]
//! # impl ConnectionFactory for MyFactory {
//! #     type Conn = ();
//! #     async fn connect(&self) -> Result<(), StewardError> { Ok(()) }
//! # }
//! # async fn demo() -> Result<(), StewardError> {
//! let governor = Governor::new(GovernorConfig::default(), MyFactory).await?;
//!
//! match governor.check_admission("10.0.0.1", Classification::Api) {
//!     AdmissionDecision::Admit => { /* 继续处理 */ }
//!     AdmissionDecision::Reject { retry_after } => {
//!         println!("请求被限流，{:?} 后重试", retry_after);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::cache::{CacheOutcome, ResponseCache};
use crate::config::{Classification, GovernorConfig};
use crate::constants::DEFAULT_CACHE_SWEEP_INTERVAL_MS;
use crate::error::{AdmissionDecision, StewardError};
use crate::health::{HealthMonitor, HealthReport};
use crate::pool::{ConnectionFactory, ConnectionPool, Lease};
use crate::rate_limiter::RateLimiter;
use crate::sampler::{MetricSampler, SystemSampler};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// 治理门面的聚合统计
#[derive(Debug, Clone)]
pub struct GovernorStats {
    /// 限流准入次数
    pub admitted: u64,
    /// 限流拒绝次数
    pub rejected: u64,
    /// 响应缓存新鲜命中
    pub response_fresh_hits: u64,
    /// 响应缓存陈旧命中
    pub response_stale_hits: u64,
    /// 响应缓存未命中
    pub response_misses: u64,
    /// 连接池累计建连数
    pub connections_created: u64,
    /// 租约超时被强制回收的次数
    pub leases_reclaimed: u64,
    /// 当前在途请求数
    pub active_requests: u64,
}

/// 资源治理门面
///
/// 各组件完全独立运作，相互之间只通过本门面编排；任一组件的判定
/// 不会阻塞其余组件。后台任务（健康采样、缓存清扫、闲置窗口清理）
/// 在构造时启动，关停或丢弃时终止。
pub struct Governor<F: ConnectionFactory> {
    config: GovernorConfig,
    rate_limiter: Arc<RateLimiter>,
    /// 主响应缓存层
    response_cache: Arc<ResponseCache<serde_json::Value>>,
    /// 次级查询缓存层，口径独立
    query_cache: Arc<ResponseCache<serde_json::Value>>,
    pool: ConnectionPool<F>,
    monitor: Arc<HealthMonitor>,
    active_requests: Arc<AtomicU64>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<F: ConnectionFactory> Governor<F> {
    /// 以默认系统采样器创建治理门面
    ///
    /// 配置校验失败立即返回 [`StewardError::ConfigError`]，不做降级。
    pub async fn new(config: GovernorConfig, factory: F) -> Result<Self, StewardError> {
        Self::with_sampler(config, factory, Arc::new(SystemSampler::new())).await
    }

    /// 以自定义指标采样器创建治理门面
    pub async fn with_sampler(
        config: GovernorConfig,
        factory: F,
        sampler: Arc<dyn MetricSampler>,
    ) -> Result<Self, StewardError> {
        config.validate()?;

        let active_requests = Arc::new(AtomicU64::new(0));
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limiting.clone()));
        let response_cache = Arc::new(ResponseCache::new(config.caching.response.clone()));
        let query_cache = Arc::new(ResponseCache::new(config.caching.query.clone()));
        let pool = ConnectionPool::new(factory, config.pool.clone()).await?;
        let monitor = Arc::new(HealthMonitor::new(
            sampler,
            config.monitoring.clone(),
            config.thresholds.clone(),
            Arc::clone(&active_requests),
        ));

        let governor = Self {
            config,
            rate_limiter,
            response_cache,
            query_cache,
            pool,
            monitor,
            active_requests,
            tasks: Mutex::new(Vec::new()),
        };
        governor.start_background_tasks();

        info!("资源治理门面已启动");
        Ok(governor)
    }

    /// 启动后台维护任务
    fn start_background_tasks(&self) {
        let mut tasks = self.tasks.lock();
        tasks.push(self.monitor.spawn());

        let rate_limiter = Arc::clone(&self.rate_limiter);
        let response_cache = Arc::clone(&self.response_cache);
        let query_cache = Arc::clone(&self.query_cache);
        tasks.push(tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_millis(DEFAULT_CACHE_SWEEP_INTERVAL_MS));
            interval.tick().await;
            loop {
                interval.tick().await;
                let purged = rate_limiter.purge_idle();
                let swept = response_cache.sweep_expired() + query_cache.sweep_expired();
                if purged > 0 || swept > 0 {
                    debug!("后台清扫: 闲置窗口 {} 个, 过期缓存 {} 条", purged, swept);
                }
            }
        }));
    }

    // ========================================================================
    // 请求路径操作
    // ========================================================================

    /// 限流裁决
    ///
    /// 裁决本身永不失败；拒绝通过 [`AdmissionDecision::Reject`] 表达，
    /// 含到当前窗口结束的建议重试间隔。
    pub fn check_admission(
        &self,
        identity: &str,
        classification: Classification,
    ) -> AdmissionDecision {
        self.rate_limiter.admit(identity, classification)
    }

    /// 按指纹查询主响应缓存
    pub fn cache_lookup(&self, fingerprint: &str) -> CacheOutcome<serde_json::Value> {
        self.response_cache.get(fingerprint)
    }

    /// 向主响应缓存写入或整体替换
    pub fn cache_store(&self, fingerprint: &str, value: serde_json::Value) {
        self.response_cache.put(fingerprint, value);
    }

    /// 借用一个后端连接执行回调
    ///
    /// `timeout` 是本次调用愿意等待空闲槽位的上限，可严于或宽于配置的
    /// 默认值；不关心的调用方使用 [`Self::with_connection_default`]。
    /// 在途请求计数覆盖从排队到回调返回的完整区间。租约在回调结束时
    /// 自动归还，包括提前返回与 panic 展开路径。
    ///
    /// # 错误
    ///
    /// - [`StewardError::PoolExhausted`]: 等待超过 `timeout` 仍无容量
    /// - [`StewardError::PoolClosed`]: 门面已关停
    /// - 回调自身的错误原样透传
    pub async fn with_connection<T, Fut>(
        &self,
        timeout: Duration,
        f: impl FnOnce(Lease<F>) -> Fut,
    ) -> Result<T, StewardError>
    where
        Fut: Future<Output = Result<T, StewardError>>,
    {
        self.active_requests.fetch_add(1, Ordering::Relaxed);
        let guard = ActiveRequestGuard {
            gauge: &self.active_requests,
        };

        let lease = self.pool.acquire(timeout).await?;
        let result = f(lease).await;
        drop(guard);
        result
    }

    /// 以配置的获取超时借用连接执行回调
    pub async fn with_connection_default<T, Fut>(
        &self,
        f: impl FnOnce(Lease<F>) -> Fut,
    ) -> Result<T, StewardError>
    where
        Fut: Future<Output = Result<T, StewardError>>,
    {
        self.with_connection(self.config.pool.acquire_timeout(), f)
            .await
    }

    /// 当前健康报告
    pub fn current_health(&self) -> HealthReport {
        self.monitor.report()
    }

    // ========================================================================
    // 组件访问与统计
    // ========================================================================

    /// 次级查询缓存层
    pub fn query_cache(&self) -> &ResponseCache<serde_json::Value> {
        &self.query_cache
    }

    /// 主响应缓存层
    pub fn response_cache(&self) -> &ResponseCache<serde_json::Value> {
        &self.response_cache
    }

    /// 限流器
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// 连接池
    pub fn pool(&self) -> &ConnectionPool<F> {
        &self.pool
    }

    /// 健康监控器
    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    /// 生效配置
    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// 聚合统计快照
    pub fn stats(&self) -> GovernorStats {
        GovernorStats {
            admitted: self.rate_limiter.stats().admitted(),
            rejected: self.rate_limiter.stats().rejected(),
            response_fresh_hits: self.response_cache.stats().fresh_hits(),
            response_stale_hits: self.response_cache.stats().stale_hits(),
            response_misses: self.response_cache.stats().misses(),
            connections_created: self.pool.stats().created(),
            leases_reclaimed: self.pool.stats().reclaimed(),
            active_requests: self.active_requests.load(Ordering::Relaxed),
        }
    }

    /// 关停门面
    ///
    /// 终止全部后台任务并关闭连接池；此后的获取请求立即返回
    /// [`StewardError::PoolClosed`]。
    pub fn shutdown(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.pool.shutdown();
        info!("资源治理门面已关停");
    }
}

impl<F: ConnectionFactory> Drop for Governor<F> {
    fn drop(&mut self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

/// 在途请求计数守卫，提前返回路径也能正确递减
struct ActiveRequestGuard<'a> {
    gauge: &'a AtomicU64,
}

impl Drop for ActiveRequestGuard<'_> {
    fn drop(&mut self) {
        self.gauge.fetch_sub(1, Ordering::Relaxed);
    }
}

// ============================================================================
// 单元测试
// ============================================================================
