//! 健康监控模块集成测试
//!
//! 用脚本化采样器驱动监控周期，验证建议的产生与消退。

use parking_lot::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use steward::config::{MonitoringConfig, ThresholdConfig};
use steward::error::StewardError;
use steward::health::{HealthMonitor, RecommendationCategory, Severity};
use steward::sampler::{MetricReading, MetricSampler};

/// 可外部调节读数的采样器
struct TunableSampler {
    reading: Mutex<MetricReading>,
}

impl TunableSampler {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            reading: Mutex::new(MetricReading {
                memory_used_bytes: 100,
                cpu_percent: 10.0,
                disk_percent: 20.0,
            }),
        })
    }

    fn set(&self, memory: u64, cpu: f64, disk: f64) {
        *self.reading.lock() = MetricReading {
            memory_used_bytes: memory,
            cpu_percent: cpu,
            disk_percent: disk,
        };
    }
}

impl MetricSampler for TunableSampler {
    fn sample(&self) -> Result<MetricReading, StewardError> {
        Ok(self.reading.lock().clone())
    }
}

fn monitor_over(sampler: Arc<TunableSampler>) -> HealthMonitor {
    HealthMonitor::new(
        sampler,
        MonitoringConfig::default(),
        ThresholdConfig {
            memory_bytes: 1_000,
            cpu_percent: 80.0,
            disk_percent: 90.0,
        },
        Arc::new(AtomicU64::new(0)),
    )
}

#[tokio::test]
async fn test_recommendation_lifecycle_follows_breach() {
    let sampler = TunableSampler::new();
    let monitor = monitor_over(Arc::clone(&sampler));

    monitor.tick();
    assert!(monitor.current_recommendations().is_empty());

    // 内存越限期间每个周期恰好一条 memory 建议
    sampler.set(5_000, 10.0, 20.0);
    monitor.tick();
    monitor.tick();
    let recs = monitor.current_recommendations();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].category, RecommendationCategory::Memory);

    // 条件解除后建议随下一个周期消失
    sampler.set(100, 10.0, 20.0);
    monitor.tick();
    assert!(monitor.current_recommendations().is_empty());
}

#[tokio::test]
async fn test_disk_breach_marks_report_unhealthy() {
    let sampler = TunableSampler::new();
    let monitor = monitor_over(Arc::clone(&sampler));

    sampler.set(100, 10.0, 95.0);
    monitor.tick();

    let report = monitor.report();
    assert!(!report.healthy);
    assert_eq!(report.recommendations[0].severity, Severity::Critical);
    assert_eq!(report.recommendations[0].message, "low disk space");

    // 磁盘恢复后报告回到健康
    sampler.set(100, 10.0, 20.0);
    monitor.tick();
    assert!(monitor.report().healthy);
}

#[tokio::test]
async fn test_history_accumulates_across_ticks() {
    let sampler = TunableSampler::new();
    let monitor = monitor_over(sampler);

    for _ in 0..4 {
        monitor.tick();
    }
    let samples = monitor.samples();
    assert_eq!(samples.len(), 4);
    assert!(samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}
