//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Métricas HTTP del servidor:
//! - Contadores de requests por status y por ruta
//! - Latencias (p50, p95, p99)
//! - Conexiones activas

pub mod collector;

pub use collector::{path_label, MetricsCollector, MetricsSnapshot};
