//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the pool-hall orchestration
//! service using Prometheus metrics.

use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;

/// Main metrics collector for the orchestration service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Pool scan metrics
    pool_metrics: PoolMetrics,

    /// Ignore list metrics
    ignore_metrics: IgnoreMetrics,

    /// Proposal pipeline metrics
    proposal_metrics: ProposalMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Total orchestration API requests by method
    pub requests_total: IntCounterVec,

    /// Orchestration API errors by method and wire code
    pub request_errors_total: IntCounterVec,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,
}

/// Pool scan metrics
#[derive(Clone)]
pub struct PoolMetrics {
    /// Scans accepted
    pub scans_started_total: IntCounter,

    /// Scans that delivered their finished chunk
    pub scans_completed_total: IntCounter,

    /// Scans abandoned because the consumer went away
    pub scans_cancelled_total: IntCounter,

    /// Result chunks emitted across all scans
    pub chunks_emitted_total: IntCounter,

    /// Players matched across all completed scans
    pub players_matched_total: IntCounter,

    /// Wall-clock duration of completed scans
    pub scan_duration_seconds: Histogram,
}

/// Ignore list metrics
#[derive(Clone)]
pub struct IgnoreMetrics {
    /// Players newly reserved by accepted proposals
    pub players_reserved_total: IntCounter,

    /// Reservation rollbacks after persistence failures
    pub reserve_rollbacks_total: IntCounter,

    /// Current entries per ignore list
    pub ignored_players: IntGaugeVec,
}

/// Proposal pipeline metrics
#[derive(Clone)]
pub struct ProposalMetrics {
    /// Submissions by outcome (committed / error_recorded)
    pub proposals_total: IntCounterVec,

    /// Persistence retry attempts
    pub persist_retries_total: IntCounter,

    /// Submission processing time
    pub submit_duration_seconds: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with a shared registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let pool_metrics = PoolMetrics::new(&registry)?;
        let ignore_metrics = IgnoreMetrics::new(&registry)?;
        let proposal_metrics = ProposalMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            pool_metrics,
            ignore_metrics,
            proposal_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get pool scan metrics
    pub fn pool(&self) -> &PoolMetrics {
        &self.pool_metrics
    }

    /// Get ignore list metrics
    pub fn ignore(&self) -> &IgnoreMetrics {
        &self.ignore_metrics
    }

    /// Get proposal pipeline metrics
    pub fn proposal(&self) -> &ProposalMetrics {
        &self.proposal_metrics
    }

    /// Record an orchestration API request
    pub fn record_request(&self, method: &str) {
        self.service_metrics
            .requests_total
            .with_label_values(&[method])
            .inc();
    }

    /// Record an orchestration API error
    pub fn record_request_error(&self, method: &str, code: &str) {
        self.service_metrics
            .request_errors_total
            .with_label_values(&[method, code])
            .inc();
    }

    /// Update the exported health status gauge
    pub fn update_health_status(&self, status: i64) {
        self.service_metrics.health_status.set(status);
    }

    /// Update the current entry count for one ignore list
    pub fn set_ignored_players(&self, list: &str, count: usize) {
        self.ignore_metrics
            .ignored_players
            .with_label_values(&[list])
            .set(count as i64);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        // Registering into a fresh registry cannot produce name collisions.
        Self::new().expect("metrics registration on a fresh registry")
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds = IntGauge::with_opts(Opts::new(
            "pool_hall_uptime_seconds",
            "Service uptime in seconds",
        ))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let requests_total = IntCounterVec::new(
            Opts::new(
                "pool_hall_requests_total",
                "Orchestration API requests by method",
            ),
            &["method"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_errors_total = IntCounterVec::new(
            Opts::new(
                "pool_hall_request_errors_total",
                "Orchestration API errors by method and code",
            ),
            &["method", "code"],
        )?;
        registry.register(Box::new(request_errors_total.clone()))?;

        let health_status = IntGauge::with_opts(Opts::new(
            "pool_hall_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        ))?;
        registry.register(Box::new(health_status.clone()))?;

        Ok(Self {
            uptime_seconds,
            requests_total,
            request_errors_total,
            health_status,
        })
    }
}

impl PoolMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let scans_started_total = IntCounter::with_opts(Opts::new(
            "pool_hall_scans_started_total",
            "Pool scans accepted",
        ))?;
        registry.register(Box::new(scans_started_total.clone()))?;

        let scans_completed_total = IntCounter::with_opts(Opts::new(
            "pool_hall_scans_completed_total",
            "Pool scans that delivered their finished chunk",
        ))?;
        registry.register(Box::new(scans_completed_total.clone()))?;

        let scans_cancelled_total = IntCounter::with_opts(Opts::new(
            "pool_hall_scans_cancelled_total",
            "Pool scans abandoned by their consumer",
        ))?;
        registry.register(Box::new(scans_cancelled_total.clone()))?;

        let chunks_emitted_total = IntCounter::with_opts(Opts::new(
            "pool_hall_chunks_emitted_total",
            "Result chunks emitted across all scans",
        ))?;
        registry.register(Box::new(chunks_emitted_total.clone()))?;

        let players_matched_total = IntCounter::with_opts(Opts::new(
            "pool_hall_players_matched_total",
            "Players matched across completed scans",
        ))?;
        registry.register(Box::new(players_matched_total.clone()))?;

        let scan_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "pool_hall_scan_duration_seconds",
            "Wall-clock duration of completed pool scans",
        ))?;
        registry.register(Box::new(scan_duration_seconds.clone()))?;

        Ok(Self {
            scans_started_total,
            scans_completed_total,
            scans_cancelled_total,
            chunks_emitted_total,
            players_matched_total,
            scan_duration_seconds,
        })
    }
}

impl IgnoreMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let players_reserved_total = IntCounter::with_opts(Opts::new(
            "pool_hall_players_reserved_total",
            "Players newly reserved by accepted proposals",
        ))?;
        registry.register(Box::new(players_reserved_total.clone()))?;

        let reserve_rollbacks_total = IntCounter::with_opts(Opts::new(
            "pool_hall_reserve_rollbacks_total",
            "Reservation rollbacks after persistence failures",
        ))?;
        registry.register(Box::new(reserve_rollbacks_total.clone()))?;

        let ignored_players = IntGaugeVec::new(
            Opts::new(
                "pool_hall_ignored_players",
                "Current entries per ignore list",
            ),
            &["list"],
        )?;
        registry.register(Box::new(ignored_players.clone()))?;

        Ok(Self {
            players_reserved_total,
            reserve_rollbacks_total,
            ignored_players,
        })
    }
}

impl ProposalMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let proposals_total = IntCounterVec::new(
            Opts::new(
                "pool_hall_proposals_total",
                "Proposal submissions by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(proposals_total.clone()))?;

        let persist_retries_total = IntCounter::with_opts(Opts::new(
            "pool_hall_persist_retries_total",
            "Proposal persistence retry attempts",
        ))?;
        registry.register(Box::new(persist_retries_total.clone()))?;

        let submit_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "pool_hall_submit_duration_seconds",
            "Proposal submission processing time",
        ))?;
        registry.register(Box::new(submit_duration_seconds.clone()))?;

        Ok(Self {
            proposals_total,
            persist_retries_total,
            submit_duration_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_creation_and_gather() {
        let collector = MetricsCollector::new().unwrap();
        collector.record_request("get_profile");
        collector.record_request_error("get_profile", "not_found");
        collector.pool().scans_started_total.inc();
        collector.update_health_status(2);

        let families = collector.registry().gather();
        assert!(!families.is_empty());
        assert!(families
            .iter()
            .any(|f| f.get_name() == "pool_hall_requests_total"));
    }

    #[test]
    fn test_ignored_players_gauge_by_list() {
        let collector = MetricsCollector::new().unwrap();
        collector.set_ignored_players("proposed", 7);
        collector.set_ignored_players("banned", 2);

        let gauge = collector
            .ignore()
            .ignored_players
            .with_label_values(&["proposed"]);
        assert_eq!(gauge.get(), 7);
    }

    #[test]
    fn test_default_collector_does_not_panic() {
        let collector = MetricsCollector::default();
        collector.pool().chunks_emitted_total.inc_by(3);
        assert_eq!(collector.pool().chunks_emitted_total.get(), 3);
    }
}
