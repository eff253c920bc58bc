//! 连接池模块集成测试
//!
//! 验证容量上限、FIFO 等待、租约回收与闲置收缩在真实时间下的行为。

use crate::common::{fast_pool_config, SharedFactory, TestFactory};
use std::sync::Arc;
use std::time::Duration;
use steward::config::PoolConfig;
use steward::error::StewardError;
use steward::pool::ConnectionPool;

#[tokio::test]
async fn test_capacity_ceiling_and_timeout() {
    let pool = ConnectionPool::new(SharedFactory(Arc::new(TestFactory::new())), fast_pool_config())
        .await
        .unwrap();

    let _a = pool.acquire(Duration::from_millis(100)).await.unwrap();
    let _b = pool.acquire(Duration::from_millis(100)).await.unwrap();
    let _c = pool.acquire(Duration::from_millis(100)).await.unwrap();

    // 三个租约占满容量，第四个在超时内等不到
    let result = pool.acquire(Duration::from_millis(50)).await;
    assert!(matches!(result, Err(StewardError::PoolExhausted { .. })));
    assert_eq!(pool.stats().acquire_timeouts(), 1);
}

#[tokio::test]
async fn test_release_wakes_waiter_and_reuses_connection() {
    let factory = Arc::new(TestFactory::new());
    let pool = Arc::new(
        ConnectionPool::new(
            SharedFactory(Arc::clone(&factory)),
            PoolConfig {
                min: 0,
                max: 1,
                acquire_timeout_ms: 1_000,
                idle_timeout_ms: 10_000,
                lease_timeout_ms: 10_000,
            },
        )
        .await
        .unwrap(),
    );

    let mut first = pool.acquire(Duration::from_millis(500)).await.unwrap();
    let first_id = *first.conn().unwrap();

    let waiter = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            let mut lease = pool.acquire(Duration::from_millis(500)).await.unwrap();
            *lease.conn().unwrap()
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(first);

    // 等待者拿到的是归还的同一条连接，工厂没有新建
    assert_eq!(waiter.await.unwrap(), first_id);
    assert_eq!(factory.connections_made(), 1);
}

#[tokio::test]
async fn test_expired_lease_is_reclaimed() {
    let pool = ConnectionPool::new(
        SharedFactory(Arc::new(TestFactory::new())),
        PoolConfig {
            min: 0,
            max: 1,
            acquire_timeout_ms: 1_000,
            idle_timeout_ms: 10_000,
            lease_timeout_ms: 50,
        },
    )
    .await
    .unwrap();

    let mut stale = pool.acquire(Duration::from_millis(100)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    // 回收任务已强制收回容量，持有者随后的访问失败
    assert!(!stale.is_valid());
    assert!(matches!(stale.conn(), Err(StewardError::LeaseExpired(_))));
    assert_eq!(pool.stats().reclaimed(), 1);

    // 收回的容量可立即再分配
    let fresh = pool.acquire(Duration::from_millis(200)).await;
    assert!(fresh.is_ok());

    // 失效租约的落锤释放不会重复归还容量
    drop(stale);
    assert_eq!(pool.leased(), 1);
}

#[tokio::test]
async fn test_idle_connections_close_down_to_floor() {
    let factory = Arc::new(TestFactory::new());
    let pool = ConnectionPool::new(
        SharedFactory(Arc::clone(&factory)),
        PoolConfig {
            min: 1,
            max: 3,
            acquire_timeout_ms: 1_000,
            idle_timeout_ms: 50,
            lease_timeout_ms: 10_000,
        },
    )
    .await
    .unwrap();

    // 撑到三条连接后全部归还
    let a = pool.acquire(Duration::from_millis(100)).await.unwrap();
    let b = pool.acquire(Duration::from_millis(100)).await.unwrap();
    let c = pool.acquire(Duration::from_millis(100)).await.unwrap();
    drop(a);
    drop(b);
    drop(c);

    tokio::time::sleep(Duration::from_millis(200)).await;

    // 闲置收缩到下限为止
    assert_eq!(pool.current_size(), 1);
    assert!(pool.stats().closed_idle() >= 2);
}

#[tokio::test]
async fn test_factory_failure_does_not_leak_capacity() {
    let factory = Arc::new(TestFactory::new());
    let pool = ConnectionPool::new(
        SharedFactory(Arc::clone(&factory)),
        PoolConfig {
            min: 0,
            max: 1,
            acquire_timeout_ms: 1_000,
            idle_timeout_ms: 10_000,
            lease_timeout_ms: 10_000,
        },
    )
    .await
    .unwrap();

    factory.set_failing(true);
    let result = pool.acquire(Duration::from_millis(100)).await;
    assert!(matches!(result, Err(StewardError::ConnectionError(_))));

    // 失败的建连把容量退回，恢复后仍可用满
    factory.set_failing(false);
    assert!(pool.acquire(Duration::from_millis(100)).await.is_ok());
}

#[tokio::test]
async fn test_shutdown_rejects_new_acquires() {
    let pool = ConnectionPool::new(SharedFactory(Arc::new(TestFactory::new())), fast_pool_config())
        .await
        .unwrap();

    pool.shutdown();
    let result = pool.acquire(Duration::from_millis(50)).await;
    assert!(matches!(result, Err(StewardError::PoolClosed)));
}
