//! Prelude module - Commonly used types for quick imports
//!
//! This module re-exports the most commonly used types from Steward,
//! allowing users to import them with a single `use steward::prelude::*;`
//! statement instead of importing each type individually.

// Core types - always available
pub use crate::config::{Classification, GovernorConfig};
pub use crate::error::{AdmissionDecision, StewardError};
pub use crate::governor::{Governor, GovernorStats};

// Subsystem types
pub use crate::cache::{CacheOutcome, ResponseCache};
pub use crate::health::{HealthReport, Recommendation, Severity};
pub use crate::pool::{ConnectionFactory, ConnectionPool, Lease};
pub use crate::rate_limiter::RateLimiter;

// Metric sampling
pub use crate::sampler::{MetricReading, MetricSampler, SystemSampler};
