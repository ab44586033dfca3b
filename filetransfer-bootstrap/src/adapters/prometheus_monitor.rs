// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Prometheus-Backed Monitor Adapter
//!
//! Implements the domain's [`Monitor`] port. Unlike the teacher's
//! `MetricsService` (which pre-declares one typed metric per
//! measurement), this port takes an arbitrary `name` at call time, so
//! each metric is registered lazily on first use and cached by name —
//! still one real `prometheus` counter/gauge/histogram per distinct
//! name, just created on demand instead of up front.

use std::collections::HashMap;
use std::sync::Mutex;

use prometheus::{Counter, Gauge, Histogram, HistogramOpts, Opts, Registry};

use filetransfer_domain::services::ports::{HealthReport, HealthStatus, Monitor};

const NAMESPACE: &str = "filetransfer";

#[derive(Default)]
struct MetricTables {
    counters: HashMap<String, Counter>,
    gauges: HashMap<String, Gauge>,
    histograms: HashMap<String, Histogram>,
}

pub struct PrometheusMonitor {
    registry: Registry,
    metrics: Mutex<MetricTables>,
}

impl PrometheusMonitor {
    pub fn new() -> Self {
        Self { registry: Registry::new(), metrics: Mutex::new(MetricTables::default()) }
    }

    /// The registry backing this monitor, for wiring into an HTTP
    /// `/metrics` exporter at the composition root.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn counter_for(&self, name: &str) -> Counter {
        let mut tables = self.metrics.lock().unwrap();
        if let Some(counter) = tables.counters.get(name) {
            return counter.clone();
        }
        let counter = Counter::with_opts(Opts::new(name, name).namespace(NAMESPACE)).expect("valid counter name");
        let _ = self.registry.register(Box::new(counter.clone()));
        tables.counters.insert(name.to_string(), counter.clone());
        counter
    }

    fn gauge_for(&self, name: &str) -> Gauge {
        let mut tables = self.metrics.lock().unwrap();
        if let Some(gauge) = tables.gauges.get(name) {
            return gauge.clone();
        }
        let gauge = Gauge::with_opts(Opts::new(name, name).namespace(NAMESPACE)).expect("valid gauge name");
        let _ = self.registry.register(Box::new(gauge.clone()));
        tables.gauges.insert(name.to_string(), gauge.clone());
        gauge
    }

    fn histogram_for(&self, name: &str) -> Histogram {
        let mut tables = self.metrics.lock().unwrap();
        if let Some(histogram) = tables.histograms.get(name) {
            return histogram.clone();
        }
        let histogram = Histogram::with_opts(HistogramOpts::new(name, name).namespace(NAMESPACE)).expect("valid histogram name");
        let _ = self.registry.register(Box::new(histogram.clone()));
        tables.histograms.insert(name.to_string(), histogram.clone());
        histogram
    }
}

impl Default for PrometheusMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor for PrometheusMonitor {
    fn record_counter(&self, name: &str, value: u64) {
        self.counter_for(name).inc_by(value as f64);
    }

    fn record_gauge(&self, name: &str, value: f64) {
        self.gauge_for(name).set(value);
    }

    fn record_histogram(&self, name: &str, value: f64) {
        self.histogram_for(name).observe(value);
    }

    fn health_check(&self) -> HealthReport {
        let tables = self.metrics.lock().unwrap();
        let metrics = tables
            .gauges
            .iter()
            .map(|(name, gauge)| (name.clone(), gauge.get()))
            .chain(tables.counters.iter().map(|(name, counter)| (name.clone(), counter.get())))
            .collect();
        HealthReport { status: HealthStatus::Healthy, message: "prometheus monitor operational".to_string(), metrics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_accumulates_across_calls() {
        let monitor = PrometheusMonitor::new();
        monitor.record_counter("chunks_sent", 3);
        monitor.record_counter("chunks_sent", 4);
        assert_eq!(monitor.counter_for("chunks_sent").get(), 7.0);
    }

    #[test]
    fn gauge_holds_last_value() {
        let monitor = PrometheusMonitor::new();
        monitor.record_gauge("queue_depth", 10.0);
        monitor.record_gauge("queue_depth", 2.0);
        assert_eq!(monitor.gauge_for("queue_depth").get(), 2.0);
    }

    #[test]
    fn health_check_reports_healthy() {
        let monitor = PrometheusMonitor::new();
        monitor.record_gauge("queue_depth", 1.0);
        let report = monitor.health_check();
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.metrics.iter().any(|(name, _)| name == "queue_depth"));
    }
}
