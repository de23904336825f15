use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

/// In-memory counter. Monotonically increasing.
struct Counter {
    value: AtomicU64,
}

impl Counter {
    fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }
    fn increment(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }
    fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// In-memory gauge. Can go up or down.
struct Gauge {
    // Store as i64 bits to support negative values and atomics
    value: AtomicI64,
}

impl Gauge {
    fn new() -> Self {
        Self {
            value: AtomicI64::new(0),
        }
    }
    fn set(&self, v: f64) {
        self.value.store(v.to_bits() as i64, Ordering::Relaxed);
    }
    fn increment(&self, delta: f64) {
        loop {
            let current = self.value.load(Ordering::Relaxed);
            let current_f = f64::from_bits(current as u64);
            let new_f = current_f + delta;
            if self
                .value
                .compare_exchange_weak(
                    current,
                    new_f.to_bits() as i64,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                break;
            }
        }
    }
    fn get(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed) as u64)
    }
}

/// In-memory histogram. Stores all observations for percentile computation.
struct Histogram {
    observations: Mutex<Vec<f64>>,
}

impl Histogram {
    fn new() -> Self {
        Self {
            observations: Mutex::new(Vec::new()),
        }
    }
    fn observe(&self, value: f64) {
        self.observations.lock().push(value);
    }
    fn summary(&self) -> HistogramSummary {
        let mut obs = self.observations.lock();
        if obs.is_empty() {
            return HistogramSummary::default();
        }
        obs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let count = obs.len();
        let sum: f64 = obs.iter().sum();
        let p50 = obs[count / 2];
        let p95 = obs[(count as f64 * 0.95) as usize];
        let p99 = obs[((count as f64 * 0.99) as usize).min(count - 1)];
        HistogramSummary {
            count: count as u64,
            sum,
            p50,
            p95,
            p99,
        }
    }
}

/// Summary statistics from a histogram.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HistogramSummary {
    pub count: u64,
    pub sum: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Metric key: name + labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
struct MetricKey {
    name: String,
    labels: Vec<(String, String)>,
}

impl MetricKey {
    fn new(name: impl Into<String>, labels: &[(&str, &str)]) -> Self {
        let mut sorted: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            name: name.into(),
            labels: sorted,
        }
    }
}

/// Thread-safe in-memory metrics recorder. The coordinator owns no
/// storage, so values live only as long as the process.
pub struct MetricsRecorder {
    counters: RwLock<HashMap<MetricKey, Counter>>,
    gauges: RwLock<HashMap<MetricKey, Gauge>>,
    histograms: RwLock<HashMap<MetricKey, Histogram>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
        }
    }

    /// Increment a counter by n.
    pub fn counter_inc(&self, name: &str, labels: &[(&str, &str)], n: u64) {
        let key = MetricKey::new(name, labels);
        let counters = self.counters.read();
        if let Some(c) = counters.get(&key) {
            c.increment(n);
            return;
        }
        drop(counters);
        let mut counters = self.counters.write();
        let c = counters.entry(key).or_insert_with(Counter::new);
        c.increment(n);
    }

    /// Set a gauge to a specific value.
    pub fn gauge_set(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let key = MetricKey::new(name, labels);
        let gauges = self.gauges.read();
        if let Some(g) = gauges.get(&key) {
            g.set(value);
            return;
        }
        drop(gauges);
        let mut gauges = self.gauges.write();
        let g = gauges.entry(key).or_insert_with(Gauge::new);
        g.set(value);
    }

    /// Increment/decrement a gauge by delta.
    pub fn gauge_inc(&self, name: &str, labels: &[(&str, &str)], delta: f64) {
        let key = MetricKey::new(name, labels);
        let gauges = self.gauges.read();
        if let Some(g) = gauges.get(&key) {
            g.increment(delta);
            return;
        }
        drop(gauges);
        let mut gauges = self.gauges.write();
        let g = gauges.entry(key).or_insert_with(Gauge::new);
        g.increment(delta);
    }

    /// Record a histogram observation.
    pub fn histogram_observe(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let key = MetricKey::new(name, labels);
        let histograms = self.histograms.read();
        if let Some(h) = histograms.get(&key) {
            h.observe(value);
            return;
        }
        drop(histograms);
        let mut histograms = self.histograms.write();
        let h = histograms.entry(key).or_insert_with(Histogram::new);
        h.observe(value);
    }

    /// Get a histogram summary.
    pub fn histogram_summary(&self, name: &str, labels: &[(&str, &str)]) -> HistogramSummary {
        let key = MetricKey::new(name, labels);
        let histograms = self.histograms.read();
        histograms
            .get(&key)
            .map(|h| h.summary())
            .unwrap_or_default()
    }

    /// Get current value of a counter.
    pub fn counter_get(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        let key = MetricKey::new(name, labels);
        self.counters.read().get(&key).map_or(0, |c| c.get())
    }

    /// Get current value of a gauge.
    pub fn gauge_get(&self, name: &str, labels: &[(&str, &str)]) -> f64 {
        let key = MetricKey::new(name, labels);
        self.gauges.read().get(&key).map_or(0.0, |g| g.get())
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_basic() {
        let recorder = MetricsRecorder::new();
        recorder.counter_inc("refresh.runs", &[("mode", "silent")], 1);
        recorder.counter_inc("refresh.runs", &[("mode", "silent")], 1);
        recorder.counter_inc("refresh.runs", &[("mode", "explicit")], 1);

        assert_eq!(recorder.counter_get("refresh.runs", &[("mode", "silent")]), 2);
        assert_eq!(recorder.counter_get("refresh.runs", &[("mode", "explicit")]), 1);
        assert_eq!(recorder.counter_get("refresh.runs", &[("mode", "manual")]), 0);
    }

    #[test]
    fn gauge_set_and_increment() {
        let recorder = MetricsRecorder::new();
        recorder.gauge_set("subscriptions.bound", &[], 2.0);
        assert_eq!(recorder.gauge_get("subscriptions.bound", &[]), 2.0);

        recorder.gauge_inc("subscriptions.bound", &[], 1.0);
        assert_eq!(recorder.gauge_get("subscriptions.bound", &[]), 3.0);

        recorder.gauge_inc("subscriptions.bound", &[], -3.0);
        assert_eq!(recorder.gauge_get("subscriptions.bound", &[]), 0.0);
    }

    #[test]
    fn histogram_observations() {
        let recorder = MetricsRecorder::new();
        let labels = &[("source", "course-list")];

        for v in [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0] {
            recorder.histogram_observe("refresh.duration_ms", labels, v);
        }

        let summary = recorder.histogram_summary("refresh.duration_ms", labels);
        assert_eq!(summary.count, 10);
        assert_eq!(summary.sum, 550.0);
        assert!(summary.p50 >= 50.0 && summary.p50 <= 60.0);
        assert!(summary.p95 >= 90.0);
    }

    #[test]
    fn histogram_empty() {
        let recorder = MetricsRecorder::new();
        let summary = recorder.histogram_summary("nonexistent", &[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.sum, 0.0);
    }

    #[test]
    fn label_ordering_independent() {
        let recorder = MetricsRecorder::new();
        // Labels in different order should map to the same metric
        recorder.counter_inc("test", &[("a", "1"), ("b", "2")], 1);
        recorder.counter_inc("test", &[("b", "2"), ("a", "1")], 1);

        assert_eq!(recorder.counter_get("test", &[("a", "1"), ("b", "2")]), 2);
        assert_eq!(recorder.counter_get("test", &[("b", "2"), ("a", "1")]), 2);
    }

    #[test]
    fn concurrent_counter_increments() {
        use std::sync::Arc;
        use std::thread;

        let recorder = Arc::new(MetricsRecorder::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let r = recorder.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    r.counter_inc("concurrent.test", &[], 1);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(recorder.counter_get("concurrent.test", &[]), 10_000);
    }
}
