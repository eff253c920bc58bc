//! 配置模块
//!
//! 定义资源治理层的配置结构。
//!
//! 配置在进程启动时加载一次，之后作为不可变快照传入各组件的构造函数；
//! 任何组件都不会在初始化之后重新读取全局状态。

use crate::constants::*;
use crate::error::StewardError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// 请求分类
///
/// 每个 (identity, classification) 组合拥有独立的准入窗口。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// 普通页面请求
    General,
    /// 认证相关请求（登录、改密）
    Auth,
    /// API 调用
    Api,
    /// 文件上传
    Upload,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::General => write!(f, "general"),
            Classification::Auth => write!(f, "auth"),
            Classification::Api => write!(f, "api"),
            Classification::Upload => write!(f, "upload"),
        }
    }
}

/// 单个分类的限流规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRule {
    /// 窗口长度（毫秒）
    pub window_ms: u64,
    /// 窗口内的准入上限
    pub max: u64,
}

impl RateRule {
    /// 窗口长度
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// 校验规则
    pub fn validate(&self, name: &str) -> Result<(), String> {
        if self.window_ms == 0 {
            return Err(format!("分类 {} 的窗口长度必须大于0", name));
        }
        if self.max == 0 {
            return Err(format!("分类 {} 的准入上限必须大于0", name));
        }
        Ok(())
    }
}

/// 限流配置：按分类枚举各自的窗口与上限
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitingConfig {
    pub general: RateRule,
    pub auth: RateRule,
    pub api: RateRule,
    pub upload: RateRule,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            general: RateRule {
                window_ms: DEFAULT_GENERAL_WINDOW_MS,
                max: DEFAULT_GENERAL_MAX,
            },
            auth: RateRule {
                window_ms: DEFAULT_AUTH_WINDOW_MS,
                max: DEFAULT_AUTH_MAX,
            },
            api: RateRule {
                window_ms: DEFAULT_API_WINDOW_MS,
                max: DEFAULT_API_MAX,
            },
            upload: RateRule {
                window_ms: DEFAULT_UPLOAD_WINDOW_MS,
                max: DEFAULT_UPLOAD_MAX,
            },
        }
    }
}

impl RateLimitingConfig {
    /// 获取指定分类的规则
    pub fn rule_for(&self, classification: Classification) -> &RateRule {
        match classification {
            Classification::General => &self.general,
            Classification::Auth => &self.auth,
            Classification::Api => &self.api,
            Classification::Upload => &self.upload,
        }
    }

    /// 校验限流配置
    pub fn validate(&self) -> Result<(), String> {
        self.general.validate("general")?;
        self.auth.validate("auth")?;
        self.api.validate("api")?;
        self.upload.validate("upload")?;
        Ok(())
    }
}

/// 单层缓存配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheLayerConfig {
    /// 新鲜期（毫秒）
    pub max_age_ms: u64,
    /// 过期后仍可陈旧供应的延展期（毫秒）
    pub stale_while_revalidate_ms: u64,
    /// 最大条目数，超出时按创建时间淘汰最旧的一条
    pub max_entries: usize,
}

impl Default for CacheLayerConfig {
    fn default() -> Self {
        Self {
            max_age_ms: DEFAULT_CACHE_MAX_AGE_MS,
            stale_while_revalidate_ms: DEFAULT_STALE_WHILE_REVALIDATE_MS,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

impl CacheLayerConfig {
    /// 新鲜期
    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }

    /// 陈旧期（从创建时刻起算的总可用时长）
    pub fn stale_horizon(&self) -> Duration {
        Duration::from_millis(self.max_age_ms + self.stale_while_revalidate_ms)
    }

    /// 校验缓存层配置
    pub fn validate(&self, name: &str) -> Result<(), String> {
        if self.max_age_ms == 0 {
            return Err(format!("缓存层 {} 的新鲜期必须大于0", name));
        }
        if self.max_entries == 0 {
            return Err(format!("缓存层 {} 的最大条目数必须大于0", name));
        }
        Ok(())
    }
}

/// 缓存配置
///
/// 响应缓存与后端查询缓存策略完全一致，仅由调用方负责指纹派生。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachingConfig {
    pub response: CacheLayerConfig,
    pub query: CacheLayerConfig,
}

impl CachingConfig {
    /// 校验缓存配置
    pub fn validate(&self) -> Result<(), String> {
        self.response.validate("response")?;
        self.query.validate("query")?;
        Ok(())
    }
}

/// 连接池配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// 常驻的最小连接数
    pub min: usize,
    /// 并发租出的最大槽位数（构造后固定，不做动态扩缩）
    pub max: usize,
    /// 获取槽位的等待超时（毫秒）
    pub acquire_timeout_ms: u64,
    /// 空闲连接被主动关闭前的空闲时长（毫秒）
    pub idle_timeout_ms: u64,
    /// 租约超时（毫秒），超过后槽位被强制回收
    pub lease_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min: DEFAULT_POOL_MIN,
            max: DEFAULT_POOL_MAX,
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            lease_timeout_ms: DEFAULT_LEASE_TIMEOUT_MS,
        }
    }
}

impl PoolConfig {
    /// 获取槽位的等待超时
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// 空闲超时
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// 租约超时
    pub fn lease_timeout(&self) -> Duration {
        Duration::from_millis(self.lease_timeout_ms)
    }

    /// 校验连接池配置
    pub fn validate(&self) -> Result<(), String> {
        if self.max == 0 {
            return Err("连接池最大槽位数必须大于0".to_string());
        }
        if self.min > self.max {
            return Err(format!(
                "连接池最小连接数 {} 不能大于最大槽位数 {}",
                self.min, self.max
            ));
        }
        if self.acquire_timeout_ms == 0 {
            return Err("获取超时必须大于0".to_string());
        }
        if self.lease_timeout_ms == 0 {
            return Err("租约超时必须大于0".to_string());
        }
        Ok(())
    }
}

/// 健康监控配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// 采样周期（毫秒）
    pub collect_interval_ms: u64,
    /// 滚动历史的保留时长（毫秒）
    pub retention_ms: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            collect_interval_ms: DEFAULT_COLLECT_INTERVAL_MS,
            retention_ms: DEFAULT_RETENTION_MS,
        }
    }
}

impl MonitoringConfig {
    /// 采样周期
    pub fn collect_interval(&self) -> Duration {
        Duration::from_millis(self.collect_interval_ms)
    }

    /// 历史保留时长
    pub fn retention(&self) -> Duration {
        Duration::from_millis(self.retention_ms)
    }

    /// 校验监控配置
    pub fn validate(&self) -> Result<(), String> {
        if self.collect_interval_ms == 0 {
            return Err("采样周期必须大于0".to_string());
        }
        if self.retention_ms < self.collect_interval_ms {
            return Err("历史保留时长不能小于采样周期".to_string());
        }
        Ok(())
    }
}

/// 建议触发阈值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// 内存用量上限（字节）
    pub memory_bytes: u64,
    /// CPU 使用率上限（百分比，0-100）
    pub cpu_percent: f64,
    /// 磁盘使用率上限（百分比，0-100）
    pub disk_percent: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            memory_bytes: DEFAULT_MEMORY_THRESHOLD_BYTES,
            cpu_percent: DEFAULT_CPU_THRESHOLD_PERCENT,
            disk_percent: DEFAULT_DISK_THRESHOLD_PERCENT,
        }
    }
}

impl ThresholdConfig {
    /// 校验阈值配置
    pub fn validate(&self) -> Result<(), String> {
        if self.memory_bytes == 0 {
            return Err("内存阈值必须大于0".to_string());
        }
        if !(0.0..=100.0).contains(&self.cpu_percent) || self.cpu_percent == 0.0 {
            return Err(format!("CPU阈值必须在 (0, 100] 之间: {}", self.cpu_percent));
        }
        if !(0.0..=100.0).contains(&self.disk_percent) || self.disk_percent == 0.0 {
            return Err(format!(
                "磁盘阈值必须在 (0, 100] 之间: {}",
                self.disk_percent
            ));
        }
        Ok(())
    }
}

/// 资源治理配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    pub rate_limiting: RateLimitingConfig,
    pub caching: CachingConfig,
    pub pool: PoolConfig,
    pub monitoring: MonitoringConfig,
    pub thresholds: ThresholdConfig,
}

impl GovernorConfig {
    /// 校验整体配置
    ///
    /// 配置非法在启动阶段是致命错误，初始化会被中止。
    pub fn validate(&self) -> Result<(), StewardError> {
        self.rate_limiting
            .validate()
            .and_then(|_| self.caching.validate())
            .and_then(|_| self.pool.validate())
            .and_then(|_| self.monitoring.validate())
            .and_then(|_| self.thresholds.validate())
            .map_err(StewardError::ConfigError)
    }

    /// 从 YAML 字符串解析配置
    pub fn from_yaml(content: &str) -> Result<Self, StewardError> {
        let config: GovernorConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 字符串解析配置
    pub fn from_toml(content: &str) -> Result<Self, StewardError> {
        let config: GovernorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载配置，按扩展名选择解析器
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StewardError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            Some("toml") => Self::from_toml(&content),
            other => Err(StewardError::ConfigError(format!(
                "不支持的配置文件格式: {:?}",
                other
            ))),
        }
    }
}
