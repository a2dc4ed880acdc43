use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // HTTP metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dashboard_http_requests_total",
        "Total HTTP requests by endpoint and status",
        &["endpoint", "status"]
    )
    .expect("metric can be created");

    pub static ref HTTP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "dashboard_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["endpoint"],
        vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("metric can be created");

    // Auth metrics
    pub static ref AUTH_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dashboard_auth_failures_total",
        "Rejected API requests by reason",
        &["reason"]
    )
    .expect("metric can be created");

    pub static ref LOGINS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dashboard_logins_total",
        "Login attempts by outcome",
        &["outcome"]
    )
    .expect("metric can be created");
}

/// Record one finished request
pub fn observe_request(endpoint: &str, status: u16, seconds: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[endpoint, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[endpoint])
        .observe(seconds);
}

/// Generate metrics output in Prometheus text format
pub fn metrics_handler() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handler() {
        observe_request("combined_submit", 200, 0.2);
        LOGINS_TOTAL.with_label_values(&["success"]).inc();
        let output = metrics_handler().unwrap();
        assert!(output.contains("dashboard_http_requests_total"));
        assert!(output.contains("dashboard_logins_total"));
    }
}
