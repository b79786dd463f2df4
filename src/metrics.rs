use prometheus::{
    opts, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Registry,
    TextEncoder,
};

use crate::error::ConsoleResult;

/// Prometheus counters for gateway traffic and polling
pub struct MetricsCollector {
    registry: Registry,

    pub poll_ticks: IntCounter,
    pub poll_failures: IntCounter,
    pub poll_interval_ms: IntGauge,

    pub api_requests: IntCounterVec,
    pub api_errors: IntCounterVec,
    pub api_request_duration: Histogram,
}

impl MetricsCollector {
    pub fn new() -> ConsoleResult<Self> {
        let registry = Registry::new();

        let poll_ticks = IntCounter::with_opts(opts!(
            "gw_poll_ticks_total",
            "Total number of poll fetches issued"
        ))?;

        let poll_failures = IntCounter::with_opts(opts!(
            "gw_poll_failures_total",
            "Poll fetches that failed or returned a non-success envelope"
        ))?;

        let poll_interval_ms = IntGauge::with_opts(opts!(
            "gw_poll_interval_ms",
            "Current delay between poll fetches"
        ))?;

        let api_requests = IntCounterVec::new(
            opts!("gw_api_requests_total", "Gateway API requests by path"),
            &["path"],
        )?;

        let api_errors = IntCounterVec::new(
            opts!("gw_api_errors_total", "Gateway API requests that failed, by path"),
            &["path"],
        )?;

        let api_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "gw_api_request_duration_ms",
                "Gateway API request duration in milliseconds",
            )
            .buckets(vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0]),
        )?;

        registry.register(Box::new(poll_ticks.clone()))?;
        registry.register(Box::new(poll_failures.clone()))?;
        registry.register(Box::new(poll_interval_ms.clone()))?;
        registry.register(Box::new(api_requests.clone()))?;
        registry.register(Box::new(api_errors.clone()))?;
        registry.register(Box::new(api_request_duration.clone()))?;

        Ok(Self {
            registry,
            poll_ticks,
            poll_failures,
            poll_interval_ms,
            api_requests,
            api_errors,
            api_request_duration,
        })
    }

    pub fn gather(&self) -> ConsoleResult<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| crate::error::ConsoleError::MetricsError(e.to_string()))
    }

    pub fn record_request(&self, path: &str, duration_ms: f64, ok: bool) {
        self.api_requests.with_label_values(&[path]).inc();
        self.api_request_duration.observe(duration_ms);
        if !ok {
            self.api_errors.with_label_values(&[path]).inc();
        }
    }

    pub fn record_poll(&self, ok: bool) {
        self.poll_ticks.inc();
        if !ok {
            self.poll_failures.inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_includes_recorded_values() {
        let metrics = MetricsCollector::new().unwrap();
        metrics.record_poll(true);
        metrics.record_poll(false);
        metrics.record_request("/session/status", 12.0, false);
        metrics.poll_interval_ms.set(1000);

        assert_eq!(metrics.poll_ticks.get(), 2);
        assert_eq!(metrics.poll_failures.get(), 1);

        let text = metrics.gather().unwrap();
        assert!(text.contains("gw_poll_ticks_total 2"));
        assert!(text.contains("gw_poll_interval_ms 1000"));
        assert!(text.contains("gw_api_errors_total{path=\"/session/status\"} 1"));
    }
}
