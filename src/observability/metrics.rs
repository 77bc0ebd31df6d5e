use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub workflow_commands_total: IntCounterVec,
    pub recommendation_latency_seconds: Histogram,
    pub recommendations_returned: Histogram,
    pub installer_active_jobs: GaugeVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let workflow_commands_total = IntCounterVec::new(
            Opts::new(
                "workflow_commands_total",
                "Workflow commands by command and outcome",
            ),
            &["command", "outcome"],
        )
        .expect("valid workflow_commands_total metric");

        let recommendation_latency_seconds = Histogram::with_opts(HistogramOpts::new(
            "recommendation_latency_seconds",
            "Latency of recommendation queries in seconds",
        ))
        .expect("valid recommendation_latency_seconds metric");

        let recommendations_returned = Histogram::with_opts(
            HistogramOpts::new(
                "recommendations_returned",
                "Number of installers returned per recommendation query",
            )
            .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        )
        .expect("valid recommendations_returned metric");

        let installer_active_jobs = GaugeVec::new(
            Opts::new("installer_active_jobs", "Active jobs per installer"),
            &["installer_id"],
        )
        .expect("valid installer_active_jobs metric");

        registry
            .register(Box::new(workflow_commands_total.clone()))
            .expect("register workflow_commands_total");
        registry
            .register(Box::new(recommendation_latency_seconds.clone()))
            .expect("register recommendation_latency_seconds");
        registry
            .register(Box::new(recommendations_returned.clone()))
            .expect("register recommendations_returned");
        registry
            .register(Box::new(installer_active_jobs.clone()))
            .expect("register installer_active_jobs");

        Self {
            registry,
            workflow_commands_total,
            recommendation_latency_seconds,
            recommendations_returned,
            installer_active_jobs,
        }
    }

    pub fn record_command(&self, command: &str, succeeded: bool) {
        let outcome = if succeeded { "success" } else { "error" };
        self.workflow_commands_total
            .with_label_values(&[command, outcome])
            .inc();
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
