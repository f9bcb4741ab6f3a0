use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub submissions_total: IntCounterVec,
    pub route_polls_total: IntCounterVec,
    pub poll_latency_seconds: HistogramVec,
    pub conflicts_detected_total: IntCounter,
    pub active_pollers: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let submissions_total = IntCounterVec::new(
            Opts::new("submissions_total", "Assignment submissions by outcome"),
            &["outcome"],
        )
        .expect("valid submissions_total metric");

        let route_polls_total = IntCounterVec::new(
            Opts::new("route_polls_total", "Route trace polls by outcome"),
            &["outcome"],
        )
        .expect("valid route_polls_total metric");

        let poll_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "poll_latency_seconds",
                "Latency of route trace polls in seconds",
            ),
            &["outcome"],
        )
        .expect("valid poll_latency_seconds metric");

        let conflicts_detected_total = IntCounter::new(
            "conflicts_detected_total",
            "Capacity conflicts surfaced during evaluation",
        )
        .expect("valid conflicts_detected_total metric");

        let active_pollers = IntGauge::new("active_pollers", "Route pollers currently running")
            .expect("valid active_pollers metric");

        registry
            .register(Box::new(submissions_total.clone()))
            .expect("register submissions_total");
        registry
            .register(Box::new(route_polls_total.clone()))
            .expect("register route_polls_total");
        registry
            .register(Box::new(poll_latency_seconds.clone()))
            .expect("register poll_latency_seconds");
        registry
            .register(Box::new(conflicts_detected_total.clone()))
            .expect("register conflicts_detected_total");
        registry
            .register(Box::new(active_pollers.clone()))
            .expect("register active_pollers");

        Self {
            registry,
            submissions_total,
            route_polls_total,
            poll_latency_seconds,
            conflicts_detected_total,
            active_pollers,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
