//! # Application State Management
//!
//! Shared state handed to every request handler: the runtime-updatable
//! configuration and the service metrics.
//!
//! ## Arc<RwLock<T>> Pattern:
//! - **Arc**: Every actix worker holds a reference to the same data
//! - **RwLock**: Many concurrent readers or one writer
//!
//! The container codec itself keeps no state; each conversion only touches
//! its own buffers. What lives here is purely operational.

use crate::config::AppConfig;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// State shared across all HTTP request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration (can be updated at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// Request and conversion metrics
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,
}

/// Metrics collected since server start.
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed
    pub request_count: u64,

    /// Total number of requests that ended in a 4xx/5xx
    pub error_count: u64,

    /// Successful conversions (ZIP bundles returned)
    pub conversions: u64,

    /// Samples packed into containers across all conversions
    pub samples_packed: u64,

    /// Bytes of encoded container produced across all conversions
    pub container_bytes_written: u64,

    /// Containers decoded by the inspect endpoint
    pub inspections: u64,

    /// Per-endpoint statistics, keyed by "METHOD /path"
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Performance metrics for a single endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the read lock immediately so a slow upload never
    /// blocks a config update.
    pub fn get_config(&self) -> AppConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the configuration after validating it.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        new_config.validate().map_err(|e| e.to_string())?;
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = new_config;
        Ok(())
    }

    pub fn increment_request_count(&self) {
        self.metrics_mut().request_count += 1;
    }

    pub fn increment_error_count(&self) {
        self.metrics_mut().error_count += 1;
    }

    /// Record timing and outcome for one request to an endpoint.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics_mut();
        let endpoint_metric = metrics
            .endpoint_metrics
            .entry(endpoint.to_string())
            .or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Record a successful conversion.
    pub fn record_conversion(&self, sample_count: usize, container_bytes: usize) {
        let mut metrics = self.metrics_mut();
        metrics.conversions += 1;
        metrics.samples_packed += sample_count as u64;
        metrics.container_bytes_written += container_bytes as u64;
    }

    pub fn record_inspection(&self) {
        self.metrics_mut().inspections += 1;
    }

    /// Get a consistent copy of the metrics (used by /metrics and /health).
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics_ref().clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    // Counters stay meaningful even if a holder panicked mid-update, so a
    // poisoned lock is recovered rather than propagated.
    fn metrics_ref(&self) -> RwLockReadGuard<'_, AppMetrics> {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn metrics_mut(&self) -> RwLockWriteGuard<'_, AppMetrics> {
        self.metrics.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AppMetrics {
    /// Fraction of requests that failed (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

impl EndpointMetric {
    /// Average response time in milliseconds.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Fraction of requests to this endpoint that failed.
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_conversion_accumulates() {
        let state = AppState::new(AppConfig::default());
        state.record_conversion(3, 1000);
        state.record_conversion(1, 24);

        let metrics = state.get_metrics_snapshot();
        assert_eq!(metrics.conversions, 2);
        assert_eq!(metrics.samples_packed, 4);
        assert_eq!(metrics.container_bytes_written, 1024);
    }

    #[test]
    fn test_endpoint_metrics() {
        let state = AppState::new(AppConfig::default());
        state.record_endpoint_request("POST /api/convert", 10, false);
        state.record_endpoint_request("POST /api/convert", 30, true);

        let metrics = state.get_metrics_snapshot();
        let endpoint = &metrics.endpoint_metrics["POST /api/convert"];
        assert_eq!(endpoint.request_count, 2);
        assert_eq!(endpoint.average_duration_ms(), 20.0);
        assert_eq!(endpoint.error_rate(), 0.5);
    }

    #[test]
    fn test_update_config_validates() {
        let state = AppState::new(AppConfig::default());

        let mut bad = AppConfig::default();
        bad.upload.max_samples = 0;
        assert!(state.update_config(bad).is_err());
        assert_eq!(state.get_config().upload.max_samples, 128);

        let mut good = AppConfig::default();
        good.upload.max_samples = 8;
        assert!(state.update_config(good).is_ok());
        assert_eq!(state.get_config().upload.max_samples, 8);
    }
}
