//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! Centralized configuration constants for Steward.
//!
//! This module provides well-documented constants used throughout the library.
//! All magic numbers are defined here with their purpose and usage context.

// ============================================================================
// Rate Limiter Constants
// ============================================================================

/// Default admission window for the `general` classification (15 minutes).
pub const DEFAULT_GENERAL_WINDOW_MS: u64 = 15 * 60 * 1000;

/// Default admission ceiling for the `general` classification.
pub const DEFAULT_GENERAL_MAX: u64 = 100;

/// Default admission window for the `auth` classification (15 minutes).
pub const DEFAULT_AUTH_WINDOW_MS: u64 = 15 * 60 * 1000;

/// Default admission ceiling for the `auth` classification.
///
/// Deliberately tight: credential-guessing is the main abuse vector.
pub const DEFAULT_AUTH_MAX: u64 = 5;

/// Default admission window for the `api` classification (1 minute).
pub const DEFAULT_API_WINDOW_MS: u64 = 60 * 1000;

/// Default admission ceiling for the `api` classification.
pub const DEFAULT_API_MAX: u64 = 60;

/// Default admission window for the `upload` classification (1 hour).
pub const DEFAULT_UPLOAD_WINDOW_MS: u64 = 60 * 60 * 1000;

/// Default admission ceiling for the `upload` classification.
pub const DEFAULT_UPLOAD_MAX: u64 = 10;

/// Multiplier applied to a window length to decide when an idle window
/// becomes eligible for purge (no admission attempt for 2x window length).
pub const IDLE_WINDOW_PURGE_FACTOR: u32 = 2;

// ============================================================================
// Response Cache Constants
// ============================================================================

/// Default freshness horizon for cache entries (5 minutes).
pub const DEFAULT_CACHE_MAX_AGE_MS: u64 = 5 * 60 * 1000;

/// Default staleness horizon (24 hours).
///
/// Entries older than the freshness horizon but inside this horizon are
/// served stale with an explicit refresh signal.
pub const DEFAULT_STALE_WHILE_REVALIDATE_MS: u64 = 24 * 60 * 60 * 1000;

/// Default maximum entry count per cache layer.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;

/// Default interval between cache expiry sweeps (1 minute).
pub const DEFAULT_CACHE_SWEEP_INTERVAL_MS: u64 = 60 * 1000;

// ============================================================================
// Connection Pool Constants
// ============================================================================

/// Default minimum pool size kept warm.
pub const DEFAULT_POOL_MIN: usize = 2;

/// Default maximum number of concurrently leased slots.
pub const DEFAULT_POOL_MAX: usize = 10;

/// Default acquisition timeout (30 seconds).
pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 30_000;

/// Default idle timeout before a surplus idle connection is closed (30 seconds).
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 30_000;

/// Default lease timeout before a held slot is forcibly reclaimed (60 seconds).
pub const DEFAULT_LEASE_TIMEOUT_MS: u64 = 60_000;

/// Interval between pool reaper passes (lease reclamation + idle closing).
pub const POOL_REAPER_INTERVAL_MS: u64 = 1_000;

// ============================================================================
// Health Monitor Constants
// ============================================================================

/// Default sampling cadence (30 seconds).
pub const DEFAULT_COLLECT_INTERVAL_MS: u64 = 30_000;

/// Default history retention (24 hours at the default cadence).
pub const DEFAULT_RETENTION_MS: u64 = 24 * 60 * 60 * 1000;

/// Default memory-used ceiling before a warning recommendation (1 GiB).
pub const DEFAULT_MEMORY_THRESHOLD_BYTES: u64 = 1024 * 1024 * 1024;

/// Default CPU usage ceiling before a warning recommendation (percent).
pub const DEFAULT_CPU_THRESHOLD_PERCENT: f64 = 80.0;

/// Default disk usage ceiling before a critical recommendation (percent).
pub const DEFAULT_DISK_THRESHOLD_PERCENT: f64 = 90.0;
