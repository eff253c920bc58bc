//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! Steward - Resource Governor for Server Workloads
//!
//! Provides per-identity rate limiting, response caching with
//! stale-while-revalidate semantics, bounded connection pooling, and
//! system health monitoring behind a single facade.
//!
//! # API Layers
//!
//! ## Prelude (Quick Start)
//!
//! Use `use steward::prelude::*;` to import all commonly used types.
//!
//! ## Core API
//!
//! - [`Governor`] - Facade composing all four subsystems
//! - [`GovernorConfig`] - Configuration with YAML/TOML loading
//! - [`AdmissionDecision`] - Result of a rate-limit check
//! - [`StewardError`] - Error types
//!
//! ## Subsystems
//!
//! - [`RateLimiter`] - Fixed-window admission per identity and classification
//! - [`ResponseCache`] - Fresh / stale / miss response cache with
//!   creation-order eviction
//! - [`ConnectionPool`] - Bounded pool with FIFO waiters and lease timeouts
//! - [`HealthMonitor`] - Rolling metric history and operational recommendations
//!
//! # Examples
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
//! #[tokio::main]
//! async fn main() -> Result<(), StewardError> {
//!     let governor = Governor::new(GovernorConfig::default(), MyFactory).await?;
//!
//!     if governor
//!         .check_admission("10.0.0.1", Classification::Api)
//!         .is_admitted()
//!     {
//!         // serve the request
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - **Fixed-window rate limiting**: Independent counters per identity and
//!   traffic classification with retry hints on rejection
//! - **Stale-while-revalidate caching**: Stale entries stay usable for a
//!   configurable horizon while a refresh is signalled
//! - **Bounded pooling**: Hard capacity ceiling, fair FIFO waiters, lease
//!   timeouts with forced reclamation, idle closing down to a floor
//! - **Health monitoring**: Periodic memory/CPU/disk sampling with
//!   threshold-driven recommendations

pub mod prelude;

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod governor;
pub mod health;
pub mod pool;
pub mod rate_limiter;
pub mod sampler;

pub use cache::{CacheOutcome, CacheStats, ResponseCache};
pub use config::{
    CacheLayerConfig, CachingConfig, Classification, GovernorConfig, MonitoringConfig, PoolConfig,
    RateLimitingConfig, RateRule, ThresholdConfig,
};
pub use error::{AdmissionDecision, StewardError};
pub use governor::{Governor, GovernorStats};
pub use health::{
    HealthMonitor, HealthReport, HealthSample, Recommendation, RecommendationCategory, Severity,
};
pub use pool::{ConnectionFactory, ConnectionPool, Lease, PoolStats};
pub use rate_limiter::{RateLimiter, RateLimiterStats};
pub use sampler::{MetricReading, MetricSampler, SystemSampler};
