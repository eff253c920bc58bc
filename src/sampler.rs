//! 指标采样模块
//!
//! 读取宿主进程的即时资源用量（内存、CPU、磁盘）。叶子组件，无依赖。
//!
//! 采样失败只会降级监控（[`StewardError::MetricUnavailable`]），
//! 绝不向上传播为致命错误。

use crate::error::StewardError;
use parking_lot::Mutex;
use sysinfo::{CpuExt, DiskExt, System, SystemExt};

/// 一次即时资源读数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricReading {
    /// 已用内存（字节）
    pub memory_used_bytes: u64,
    /// 全局 CPU 使用率（百分比，0-100）
    pub cpu_percent: f64,
    /// 磁盘使用率最高的挂载点的占用（百分比，0-100）
    pub disk_percent: f64,
}

/// 指标源抽象
///
/// 生产环境使用 [`SystemSampler`]；测试中可注入固定读数的假实现。
pub trait MetricSampler: Send + Sync {
    /// 采集一次读数
    fn sample(&self) -> Result<MetricReading, StewardError>;
}

/// 基于 sysinfo 的系统采样器
///
/// sysinfo 的刷新需要 `&mut System`，用互斥锁串行化；采样只由监控自身的
/// 定时任务调用，不会出现在请求路径上。
pub struct SystemSampler {
    sys: Mutex<System>,
}

impl SystemSampler {
    /// 创建系统采样器
    pub fn new() -> Self {
        Self {
            sys: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSampler for SystemSampler {
    fn sample(&self) -> Result<MetricReading, StewardError> {
        let mut sys = self.sys.lock();
        sys.refresh_memory();
        // CPU 使用率基于两次刷新间的差值，进程启动后的首个读数可能为 0
        sys.refresh_cpu();
        sys.refresh_disks_list();
        sys.refresh_disks();

        let memory_used_bytes = sys.used_memory();
        let cpu_percent = sys.global_cpu_info().cpu_usage() as f64;

        let disk_percent = sys
            .disks()
            .iter()
            .filter(|disk| disk.total_space() > 0)
            .map(|disk| {
                let used = disk.total_space() - disk.available_space();
                used as f64 / disk.total_space() as f64 * 100.0
            })
            .fold(None::<f64>, |acc, pct| {
                Some(acc.map_or(pct, |a| a.max(pct)))
            })
            .ok_or_else(|| StewardError::MetricUnavailable("没有可读的磁盘".to_string()))?;

        Ok(MetricReading {
            memory_used_bytes,
            cpu_percent,
            disk_percent,
        })
    }
}
