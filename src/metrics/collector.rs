//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Recolecta y agrega métricas HTTP del servidor en tiempo real.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Máximo de latencias guardadas para los percentiles
const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Cantidad de rutas en el ranking
const TOP_PATHS: usize = 10;

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

#[derive(Default)]
struct MetricsData {
    total_requests: u64,
    status_codes: BTreeMap<u16, u64>,
    /// Ventana de latencias en microsegundos
    latencies: VecDeque<u64>,
    requests_per_path: HashMap<String, u64>,
    active_connections: u64,
}

/// Agrupa los paths con IDs de tarea bajo una misma etiqueta
///
/// `/api/v1/task/<uuid>` → `/api/v1/task/{id}`
pub fn path_label(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if Uuid::parse_str(segment).is_ok() {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData {
                latencies: VecDeque::with_capacity(MAX_LATENCY_SAMPLES),
                ..MetricsData::default()
            })),
            start_time: Instant::now(),
        }
    }

    /// Registra un request atendido
    pub fn record_request(&self, path: &str, status_code: u16, latency: Duration) {
        let mut data = self.inner.lock();

        data.total_requests += 1;
        *data.status_codes.entry(status_code).or_insert(0) += 1;

        if data.latencies.len() >= MAX_LATENCY_SAMPLES {
            data.latencies.pop_front();
        }
        data.latencies.push_back(latency.as_micros() as u64);

        *data
            .requests_per_path
            .entry(path_label(path))
            .or_insert(0) += 1;
    }

    pub fn increment_active_connections(&self) {
        self.inner.lock().active_connections += 1;
    }

    pub fn decrement_active_connections(&self) {
        let mut data = self.inner.lock();
        data.active_connections = data.active_connections.saturating_sub(1);
    }

    pub fn active_connections(&self) -> u64 {
        self.inner.lock().active_connections
    }

    /// Foto consistente de todas las métricas
    pub fn get_snapshot(&self) -> MetricsSnapshot {
        let data = self.inner.lock();
        let latencies: Vec<u64> = data.latencies.iter().copied().collect();
        let (p50, p95, p99, avg) = calculate_percentiles(&latencies);

        let mut top_paths: Vec<PathCount> = data
            .requests_per_path
            .iter()
            .map(|(path, count)| PathCount {
                path: path.clone(),
                count: *count,
            })
            .collect();
        top_paths.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.path.cmp(&b.path)));
        top_paths.truncate(TOP_PATHS);

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            total_requests: data.total_requests,
            active_connections: data.active_connections,
            status_codes: data.status_codes.clone(),
            top_paths,
            latency_us: LatencySummary {
                p50,
                p95,
                p99,
                avg,
                stddev: calculate_stddev(&latencies, avg),
                samples: latencies.len(),
            },
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn calculate_percentiles(latencies: &[u64]) -> (u64, u64, u64, u64) {
    if latencies.is_empty() {
        return (0, 0, 0, 0);
    }

    let mut sorted = latencies.to_vec();
    sorted.sort_unstable();

    let len = sorted.len();
    let p50 = sorted[len * 50 / 100];
    let p95 = sorted[len * 95 / 100];
    let p99 = sorted[len * 99 / 100];
    let avg = sorted.iter().sum::<u64>() / len as u64;

    (p50, p95, p99, avg)
}

fn calculate_stddev(latencies: &[u64], avg: u64) -> f64 {
    if latencies.is_empty() {
        return 0.0;
    }

    let variance = latencies
        .iter()
        .map(|&x| {
            let diff = x as f64 - avg as f64;
            diff * diff
        })
        .sum::<f64>()
        / latencies.len() as f64;

    variance.sqrt()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathCount {
    pub path: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub avg: u64,
    pub stddev: f64,
    pub samples: usize,
}

/// Snapshot de métricas, serializable para `/metrics`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub total_requests: u64,
    pub active_connections: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub top_paths: Vec<PathCount>,
    pub latency_us: LatencySummary,
}
