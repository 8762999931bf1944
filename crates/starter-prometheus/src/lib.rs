//! Prometheus metrics backend for the node starter.
//!
//! [`PrometheusMetrics`] implements [`starter_core::MetricsBackend`] and keeps
//! its collectors in a private [`Registry`]; expose them with [`PrometheusMetrics::gather`]
//! or [`PrometheusMetrics::encode`].
//!
//! ## Metrics
//! - `starter_builds_received_total` - Counter
//! - `starter_builds_started_total` - Counter
//! - `starter_builds_exited_total{outcome}` - Counter
//! - `starter_builds_running` - Gauge
//! - `starter_messages_rejected_total{channel, reason}` - Counter
//! - `starter_stop_requests_total` - Counter
//! - `starter_watchdog_kills_total` - Counter
//!
//! No HTTP endpoint is provided.

mod backend;
pub use backend::{MetricsError, PrometheusMetrics};

pub use prometheus::{Encoder, Registry, TextEncoder};
