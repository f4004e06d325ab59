use crate::config::LogLevel;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};
use std::collections::HashSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_tracing(log_level: &LogLevel) {
    let log_level = &format!("{},ort=info", log_level.as_str());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_level(true))
        .init();
}

pub struct Metrics {
    request_counter: IntCounterVec,
    inference_duration: HistogramVec,
    detected_objects: IntCounter,
    pub registry: Registry,
}

impl Metrics {
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let request_counter = IntCounterVec::new(
            Opts::new("requests_total", "Total number of requests").namespace(namespace),
            &["route"],
        )?;

        let boundaries = generate_boundaries((10, 50, 100, 500, 2000));

        let inference_duration = HistogramVec::new(
            HistogramOpts::new(
                "inference_duration_ms",
                "Duration of model inference in milliseconds",
            )
            .namespace(namespace)
            .buckets(boundaries),
            &["route"],
        )?;

        let detected_objects = IntCounter::with_opts(
            Opts::new("detected_objects_total", "Objects found by the detector")
                .namespace(namespace),
        )?;

        registry.register(Box::new(request_counter.clone()))?;
        registry.register(Box::new(inference_duration.clone()))?;
        registry.register(Box::new(detected_objects.clone()))?;

        Ok(Metrics {
            request_counter,
            inference_duration,
            detected_objects,
            registry,
        })
    }

    pub fn record_request(&self, route: &str) {
        self.request_counter.with_label_values(&[route]).inc();
    }

    pub fn record_inference_duration(&self, duration_ms: u64, route: &str) {
        self.inference_duration
            .with_label_values(&[route])
            .observe(duration_ms as f64);
    }

    pub fn record_detections(&self, count: usize) {
        self.detected_objects.inc_by(count as u64);
    }
}

fn generate_boundaries(parts: (i32, i32, i32, i32, i32)) -> Vec<f64> {
    let first_step: usize = 10;
    let middle_step: usize = 10;
    let end_step: usize = 50;
    let tail_step: usize = 500;
    let first_part = (parts.0..=parts.1).step_by(first_step);
    let middle_part = (parts.1..=parts.2).step_by(middle_step);
    let end_part = (parts.2..=parts.3).step_by(end_step);
    let tail_part = (parts.3..=parts.4).step_by(tail_step);

    let mut seen = HashSet::new();
    first_part
        .chain(middle_part)
        .chain(end_part)
        .chain(tail_part)
        .filter(|&x| seen.insert(x))
        .map(|x| x as f64)
        .collect()
}
