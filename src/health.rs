//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 健康监控与建议引擎
//!
//! 按固定周期调用指标采样器，维护有界的滚动历史，并在阈值被突破时
//! 派生可执行的运维建议。
//!
//! # 特性
//!
//! - **独立定时**: 采样任务完全独立于请求路径，互不阻塞
//! - **滚动历史**: 超出保留时长的样本从队首丢弃
//! - **拉取式建议**: 建议通过 [`HealthMonitor::current_recommendations`]
//!   按需查询，不做推送；条件未解除时每个采样周期恰好重算一次
//! - **快照读取**: 历史只由监控自身的定时任务写入，外部轮询者读取快照，
//!   不会阻塞写入方
//! - **降级采样**: 指标源不可用时记录一条降级样本，不传播错误

use crate::config::{MonitoringConfig, ThresholdConfig};
use crate::sampler::MetricSampler;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// 一次健康采样的不可变快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSample {
    /// 采样时刻
    pub timestamp: DateTime<Utc>,
    /// 已用内存（字节）
    pub memory_used_bytes: u64,
    /// CPU 使用率（百分比）
    pub cpu_percent: f64,
    /// 磁盘使用率（百分比）
    pub disk_percent: f64,
    /// 采样时刻的在途请求数
    pub active_requests: u64,
    /// 指标源不可用时为 true，数值字段全部为 0
    pub degraded: bool,
}

/// 建议类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationCategory {
    Memory,
    Cpu,
    Disk,
}

/// 建议严重级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

/// 运维建议
///
/// 每个采样周期瞬态产生，不做持久化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: RecommendationCategory,
    pub severity: Severity,
    pub message: String,
    pub suggested_action: String,
}

/// 面向运维端点的健康报告
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// 滚动历史快照
    pub samples: Vec<HealthSample>,
    /// 最近一个采样周期的建议
    pub recommendations: Vec<Recommendation>,
    /// 总体健康：不存在任何 critical 建议
    pub healthy: bool,
}

/// 健康监控器
pub struct HealthMonitor {
    sampler: Arc<dyn MetricSampler>,
    config: MonitoringConfig,
    thresholds: ThresholdConfig,
    /// 滚动历史，只由监控自身的定时任务写入
    history: RwLock<VecDeque<HealthSample>>,
    /// 最近一个周期的建议，整体替换
    recommendations: RwLock<Vec<Recommendation>>,
    /// 在途请求数计数器（由治理门面维护）
    active_requests: Arc<AtomicU64>,
}

impl HealthMonitor {
    /// 创建健康监控器
    pub fn new(
        sampler: Arc<dyn MetricSampler>,
        config: MonitoringConfig,
        thresholds: ThresholdConfig,
        active_requests: Arc<AtomicU64>,
    ) -> Self {
        Self {
            sampler,
            config,
            thresholds,
            history: RwLock::new(VecDeque::new()),
            recommendations: RwLock::new(Vec::new()),
            active_requests,
        }
    }

    /// 启动采样任务
    ///
    /// 返回任务句柄，由持有方负责在关停时 abort。
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        let period = monitor.config.collect_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // 首个 tick 立即触发，跳过以对齐采样周期
            interval.tick().await;
            loop {
                interval.tick().await;
                monitor.tick();
            }
        })
    }

    /// 执行一次采样与评估
    ///
    /// 公开主要供测试与外部调度驱动；生产路径由 [`Self::spawn`] 的定时任务调用。
    pub fn tick(&self) {
        let now = Utc::now();
        let sample = match self.sampler.sample() {
            Ok(reading) => HealthSample {
                timestamp: now,
                memory_used_bytes: reading.memory_used_bytes,
                cpu_percent: reading.cpu_percent,
                disk_percent: reading.disk_percent,
                active_requests: self.active_requests.load(Ordering::Relaxed),
                degraded: false,
            },
            Err(e) => {
                warn!("指标采样失败，记录降级样本: {}", e);
                HealthSample {
                    timestamp: now,
                    memory_used_bytes: 0,
                    cpu_percent: 0.0,
                    disk_percent: 0.0,
                    active_requests: self.active_requests.load(Ordering::Relaxed),
                    degraded: true,
                }
            }
        };

        let recommendations = if sample.degraded {
            Vec::new()
        } else {
            self.evaluate(&sample)
        };

        {
            let mut history = self.history.write();
            history.push_back(sample);
            let retention = chrono::Duration::milliseconds(self.config.retention_ms as i64);
            while let Some(oldest) = history.front() {
                if now.signed_duration_since(oldest.timestamp) > retention {
                    history.pop_front();
                } else {
                    break;
                }
            }
        }

        *self.recommendations.write() = recommendations;
    }

    /// 以最新样本评估阈值规则
    fn evaluate(&self, sample: &HealthSample) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        if sample.memory_used_bytes > self.thresholds.memory_bytes {
            debug!(
                "内存用量 {} 超过阈值 {}",
                sample.memory_used_bytes, self.thresholds.memory_bytes
            );
            recommendations.push(Recommendation {
                category: RecommendationCategory::Memory,
                severity: Severity::Warning,
                message: "high memory usage".to_string(),
                suggested_action: "restart".to_string(),
            });
        }

        if sample.cpu_percent > self.thresholds.cpu_percent {
            debug!(
                "CPU 使用率 {:.1}% 超过阈值 {:.1}%",
                sample.cpu_percent, self.thresholds.cpu_percent
            );
            recommendations.push(Recommendation {
                category: RecommendationCategory::Cpu,
                severity: Severity::Warning,
                message: "high cpu usage".to_string(),
                suggested_action: "scale".to_string(),
            });
        }

        if sample.disk_percent > self.thresholds.disk_percent {
            warn!(
                "磁盘使用率 {:.1}% 超过阈值 {:.1}%",
                sample.disk_percent, self.thresholds.disk_percent
            );
            recommendations.push(Recommendation {
                category: RecommendationCategory::Disk,
                severity: Severity::Critical,
                message: "low disk space".to_string(),
                suggested_action: "cleanup".to_string(),
            });
        }

        recommendations
    }

    /// 最近一个采样周期的建议快照
    pub fn current_recommendations(&self) -> Vec<Recommendation> {
        self.recommendations.read().clone()
    }

    /// 滚动历史快照
    pub fn samples(&self) -> Vec<HealthSample> {
        self.history.read().iter().cloned().collect()
    }

    /// 生成健康报告
    ///
    /// `healthy` 为真当且仅当当前不存在任何 critical 建议。
    pub fn report(&self) -> HealthReport {
        let recommendations = self.current_recommendations();
        let healthy = !recommendations
            .iter()
            .any(|r| r.severity == Severity::Critical);
        HealthReport {
            samples: self.samples(),
            recommendations,
            healthy,
        }
    }
}

// ============================================================================
// 单元测试
// ============================================================================
