//! 连接池实现
//!
//! 管理一组有界的可复用后端连接句柄。
//!
//! # 特性
//!
//! - **有界租用**: 并发租出的槽位数永不超过 `max`，等待者按 FIFO 顺序获得
//!   槽位（依赖 tokio 公平信号量），无优先级饥饿
//! - **获取超时**: `acquire` 只阻塞当前任务；超时返回 [`StewardError::PoolExhausted`]，
//!   与后端资源错误严格区分，且超时的等待者不会泄漏槽位
//! - **租约超时**: 租约持有超过配置时长后被强制回收，之后对该租约的任何
//!   使用返回 [`StewardError::LeaseExpired`]
//! - **空闲回收**: 空闲连接超过 `idle_timeout` 被主动关闭（保留 `min` 底座），
//!   需要时惰性重建
//! - **作用域释放**: [`Lease`] 在任何退出路径（包括错误路径）上都会归还槽位
//!
//! 容量归还是恰好一次的：正常释放与强制回收对同一租约的竞争由租约注册表
//! 的原子移除裁决，先移除者负责归还信号量容量。

use crate::config::PoolConfig;
use crate::constants::POOL_REAPER_INTERVAL_MS;
use crate::error::StewardError;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// 后端连接工厂
///
/// 连接池对后端存储的语义一无所知，只负责管理对它的访问；
/// 建立连接的方式由使用方通过该 trait 注入。
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// 连接句柄类型
    type Conn: Send + 'static;

    /// 建立一条新连接
    async fn connect(&self) -> Result<Self::Conn, StewardError>;
}

/// 空闲槽位中的连接
struct IdleConn<C> {
    conn: C,
    idle_since: Instant,
}

/// 连接池统计信息
#[derive(Debug, Default)]
pub struct PoolStats {
    created: AtomicU64,
    closed_idle: AtomicU64,
    reclaimed: AtomicU64,
    acquire_timeouts: AtomicU64,
}

impl PoolStats {
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    pub fn closed_idle(&self) -> u64 {
        self.closed_idle.load(Ordering::Relaxed)
    }

    pub fn reclaimed(&self) -> u64 {
        self.reclaimed.load(Ordering::Relaxed)
    }

    pub fn acquire_timeouts(&self) -> u64 {
        self.acquire_timeouts.load(Ordering::Relaxed)
    }
}

/// 池内部共享状态
struct PoolShared<F: ConnectionFactory> {
    factory: F,
    config: PoolConfig,
    /// 容量信号量：许可数即剩余可租槽位，tokio 信号量按 FIFO 唤醒等待者
    semaphore: Arc<Semaphore>,
    /// 空闲连接栈
    idle: Mutex<Vec<IdleConn<F::Conn>>>,
    /// 活动租约注册表: token -> 租出时刻
    leases: DashMap<Uuid, Instant>,
    /// 现存连接总数（空闲 + 已租出）
    total: AtomicUsize,
    stats: PoolStats,
}

impl<F: ConnectionFactory> PoolShared<F> {
    /// 强制回收超时租约并关闭过期空闲连接
    fn reap_at(&self, now: Instant) {
        let lease_timeout = self.config.lease_timeout();
        let mut expired = Vec::new();
        for entry in self.leases.iter() {
            if now.duration_since(*entry.value()) > lease_timeout {
                expired.push(*entry.key());
            }
        }
        for token in expired {
            // remove 只会成功一次；与正常释放竞争时由先到者归还容量
            if self.leases.remove(&token).is_some() {
                self.semaphore.add_permits(1);
                self.stats.reclaimed.fetch_add(1, Ordering::Relaxed);
                warn!("强制回收超时租约: {}", token);
            }
        }

        let idle_timeout = self.config.idle_timeout();
        let min = self.config.min;
        let mut idle = self.idle.lock();
        while self.total.load(Ordering::Relaxed) > min {
            // 栈底是空闲最久的连接
            let expired_bottom = idle
                .first()
                .map(|slot| now.duration_since(slot.idle_since) > idle_timeout)
                .unwrap_or(false);
            if !expired_bottom {
                break;
            }
            idle.remove(0);
            self.total.fetch_sub(1, Ordering::Relaxed);
            self.stats.closed_idle.fetch_add(1, Ordering::Relaxed);
            debug!("关闭过期空闲连接");
        }
    }
}

/// 有界连接池
///
/// # 示例
/// ```no_run
/// use steward::config::PoolConfig;
/// use steward::pool::{ConnectionFactory, ConnectionPool};
/// use steward::error::StewardError;
/// use std::time::Duration;
///
/// struct MyFactory;
///
/// #[async_trait::async_trait]
/// impl ConnectionFactory for MyFactory {
///     type Conn = String;
///     async fn connect(&self) -> Result<String, StewardError> {
///         Ok("connection".to_string())
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), StewardError> {
///     let pool = ConnectionPool::new(MyFactory, PoolConfig::default()).await?;
///     let mut lease = pool.acquire(Duration::from_secs(1)).await?;
///     let conn = lease.conn()?;
///     // 使用连接...
///     drop(lease); // 槽位立即归还给下一个等待者
///     Ok(())
/// }
/// ```
pub struct ConnectionPool<F: ConnectionFactory> {
    shared: Arc<PoolShared<F>>,
    reaper_handle: Option<JoinHandle<()>>,
}

impl<F: ConnectionFactory> ConnectionPool<F> {
    /// 创建连接池并预热 `min` 条连接
    ///
    /// 池的边界在构造时固定，之后不做动态扩缩。
    pub async fn new(factory: F, config: PoolConfig) -> Result<Self, StewardError> {
        config.validate().map_err(StewardError::ConfigError)?;

        let shared = Arc::new(PoolShared {
            semaphore: Arc::new(Semaphore::new(config.max)),
            factory,
            idle: Mutex::new(Vec::with_capacity(config.max)),
            leases: DashMap::new(),
            total: AtomicUsize::new(0),
            stats: PoolStats::default(),
            config,
        });

        for _ in 0..shared.config.min {
            let conn = shared.factory.connect().await?;
            shared.idle.lock().push(IdleConn {
                conn,
                idle_since: Instant::now(),
            });
            shared.total.fetch_add(1, Ordering::Relaxed);
            shared.stats.created.fetch_add(1, Ordering::Relaxed);
        }

        let reaper_handle = Self::start_reaper(Arc::clone(&shared));

        Ok(Self {
            shared,
            reaper_handle: Some(reaper_handle),
        })
    }

    /// 启动回收任务（租约超时 + 空闲关闭）
    ///
    /// 回收独立于调用方的取消逻辑运行，是池对不守规矩调用方的安全网。
    fn start_reaper(shared: Arc<PoolShared<F>>) -> JoinHandle<()> {
        let period = Duration::from_millis(POOL_REAPER_INTERVAL_MS)
            .min(shared.config.lease_timeout() / 2)
            .min(shared.config.idle_timeout() / 2)
            .max(Duration::from_millis(10));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                shared.reap_at(Instant::now());
            }
        })
    }

    /// 获取一个租约
    ///
    /// 阻塞当前任务直至出现空闲槽位或超时。超时返回
    /// [`StewardError::PoolExhausted`]；超时的等待者会干净地退出等待队列，
    /// 不会占用任何槽位。
    pub async fn acquire(&self, timeout: Duration) -> Result<Lease<F>, StewardError> {
        let start = Instant::now();

        let permit = match tokio::time::timeout(
            timeout,
            Arc::clone(&self.shared.semaphore).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(StewardError::PoolClosed),
            Err(_) => {
                self.shared
                    .stats
                    .acquire_timeouts
                    .fetch_add(1, Ordering::Relaxed);
                return Err(StewardError::PoolExhausted {
                    waited: start.elapsed(),
                });
            }
        };
        // 容量改由租约注册表归还（释放或强制回收，恰好一次）
        permit.forget();

        let conn = match self.checkout_conn().await {
            Ok(conn) => conn,
            Err(e) => {
                // 建连失败不占用容量
                self.shared.semaphore.add_permits(1);
                return Err(e);
            }
        };

        let token = Uuid::new_v4();
        self.shared.leases.insert(token, Instant::now());
        trace!("租出槽位: {}", token);

        Ok(Lease {
            token,
            conn: Some(conn),
            shared: Arc::clone(&self.shared),
        })
    }

    /// 取出空闲连接，否则新建
    async fn checkout_conn(&self) -> Result<F::Conn, StewardError> {
        if let Some(slot) = self.shared.idle.lock().pop() {
            return Ok(slot.conn);
        }

        let conn = self.shared.factory.connect().await?;
        self.shared.total.fetch_add(1, Ordering::Relaxed);
        self.shared.stats.created.fetch_add(1, Ordering::Relaxed);
        debug!("惰性新建连接，当前总数 {}", self.current_size());
        Ok(conn)
    }

    /// 当前已租出的槽位数
    pub fn leased(&self) -> usize {
        self.shared.leases.len()
    }

    /// 当前空闲连接数
    pub fn idle_count(&self) -> usize {
        self.shared.idle.lock().len()
    }

    /// 现存连接总数（空闲 + 已租出）
    pub fn current_size(&self) -> usize {
        self.shared.total.load(Ordering::Relaxed)
    }

    /// 获取统计信息
    pub fn stats(&self) -> &PoolStats {
        &self.shared.stats
    }

    /// 手动触发一次回收（主要供测试和外部调度使用）
    pub fn reap(&self) {
        self.shared.reap_at(Instant::now());
    }

    /// 关闭池：后续 acquire 返回 [`StewardError::PoolClosed`]
    pub fn shutdown(&self) {
        self.shared.semaphore.close();
        if let Some(handle) = &self.reaper_handle {
            handle.abort();
        }
    }
}

impl<F: ConnectionFactory> Drop for ConnectionPool<F> {
    fn drop(&mut self) {
        if let Some(handle) = self.reaper_handle.take() {
            handle.abort();
        }
    }
}

/// 连接租约
///
/// 调用方对一个池内槽位的临时独占使用权。Drop 时槽位必然归还，
/// 任何提前退出路径都不会泄漏。
pub struct Lease<F: ConnectionFactory> {
    token: Uuid,
    conn: Option<F::Conn>,
    shared: Arc<PoolShared<F>>,
}

impl<F: ConnectionFactory> Lease<F> {
    /// 租约令牌
    pub fn token(&self) -> Uuid {
        self.token
    }

    /// 租约是否仍然有效（未被强制回收）
    pub fn is_valid(&self) -> bool {
        self.shared.leases.contains_key(&self.token)
    }

    /// 访问租用的连接
    ///
    /// 租约已被强制回收时返回 [`StewardError::LeaseExpired`]。
    pub fn conn(&mut self) -> Result<&mut F::Conn, StewardError> {
        if !self.shared.leases.contains_key(&self.token) {
            return Err(StewardError::LeaseExpired(self.token.to_string()));
        }
        self.conn
            .as_mut()
            .ok_or_else(|| StewardError::LeaseExpired(self.token.to_string()))
    }
}

impl<F: ConnectionFactory> Drop for Lease<F> {
    fn drop(&mut self) {
        let conn = self.conn.take();
        if self.shared.leases.remove(&self.token).is_some() {
            // 正常释放：连接回到空闲栈，容量立即交给下一个 FIFO 等待者
            if let Some(conn) = conn {
                self.shared.idle.lock().push(IdleConn {
                    conn,
                    idle_since: Instant::now(),
                });
            } else {
                self.shared.total.fetch_sub(1, Ordering::Relaxed);
            }
            self.shared.semaphore.add_permits(1);
            trace!("释放槽位: {}", self.token);
        } else {
            // 已被强制回收：容量早已归还，连接不可信，直接丢弃
            self.shared.total.fetch_sub(1, Ordering::Relaxed);
            debug!("丢弃已回收租约持有的连接: {}", self.token);
        }
    }
}

// ============================================================================
// 单元测试
// ============================================================================
