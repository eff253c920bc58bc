//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 错误类型定义
//!
//! 使用thiserror定义所有错误类型。
//!
//! 按照传播策略，准入和缓存的判定结果（[`AdmissionDecision`]）是正常的
//! 控制流返回值，不走错误通道；只有池、租约和配置问题才是错误。

use std::time::Duration;
use thiserror::Error;

/// Steward 错误类型
#[derive(Error, Debug)]
pub enum StewardError {
    /// 配置错误（仅在启动时致命）
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 连接池耗尽：等待超时后仍无空闲槽位，调用方应退避重试
    #[error("连接池耗尽: 等待 {waited:?} 后超时")]
    PoolExhausted {
        /// 实际等待的时长
        waited: Duration,
    },

    /// 租约已过期：持有时间超过租约超时，槽位已被强制回收
    #[error("租约已过期: {0}")]
    LeaseExpired(String),

    /// 连接池已关闭
    #[error("连接池已关闭")]
    PoolClosed,

    /// 后端连接建立失败
    #[error("连接错误: {0}")]
    ConnectionError(String),

    /// 指标源不可用（仅降级监控，不致命）
    #[error("指标不可用: {0}")]
    MetricUnavailable(String),

    /// IO错误
    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerdeError(#[from] serde_json::Error),

    /// YAML解析错误
    #[error("YAML解析错误: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML解析错误
    #[error("TOML解析错误: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// 准入判定结果
///
/// `Reject` 是正常的控制流结果，不是错误；`retry_after` 为当前窗口的
/// 剩余时长，供调用方实现退避。窗口计数等内部状态不对外暴露。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// 允许通过
    Admit,
    /// 拒绝，附带重试提示
    Reject {
        /// 距当前窗口结束的剩余时间
        retry_after: Duration,
    },
}

impl AdmissionDecision {
    /// 是否被允许
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionDecision::Admit)
    }
}
