//! Prometheus-backed [`MetricsSink`].
//!
//! Every gauge in [`Gauge::ALL`] is registered once in a private
//! [`Registry`] at construction. The core writes through the
//! [`MetricsSink`] trait; `GET /metrics` reads through
//! [`PrometheusSink::export_text`].
//!
//! Gauge writes take the sink's write lock and exports take its read
//! lock, so an export sees each published batch whole or not at all.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use beamline_core::sink::{Gauge, MetricsSink};
use prometheus::{Encoder, Registry, TextEncoder};

/// Content type of the text exposition, `text/plain; version=0.0.4`.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Errors from registering or exporting metrics.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// The Prometheus client rejected a gauge or failed to encode.
    #[error("prometheus error: {source}")]
    Prometheus {
        /// The underlying client error.
        #[from]
        source: prometheus::Error,
    },

    /// The encoded exposition was not valid UTF-8.
    #[error("exposition is not UTF-8: {source}")]
    Utf8 {
        /// The underlying conversion error.
        #[from]
        source: std::string::FromUtf8Error,
    },
}

/// The beamline gauges in a Prometheus registry.
pub struct PrometheusSink {
    registry: Registry,
    gauges: BTreeMap<Gauge, prometheus::Gauge>,
    /// Guards batches against exports; the gauges themselves are atomic.
    batch: RwLock<()>,
}

impl std::fmt::Debug for PrometheusSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusSink")
            .field("gauges", &self.gauges.len())
            .finish_non_exhaustive()
    }
}

impl PrometheusSink {
    /// Register every gauge, all starting at zero.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Prometheus`] if a gauge cannot be created
    /// or registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();
        let mut gauges = BTreeMap::new();
        for gauge in Gauge::ALL {
            let metric = prometheus::Gauge::new(gauge.name(), gauge.help())?;
            registry.register(Box::new(metric.clone()))?;
            gauges.insert(gauge, metric);
        }
        Ok(Self {
            registry,
            gauges,
            batch: RwLock::new(()),
        })
    }

    /// The current value of a gauge.
    pub fn value(&self, gauge: Gauge) -> Option<f64> {
        self.gauges.get(&gauge).map(prometheus::Gauge::get)
    }

    /// Encode every gauge in the text exposition format.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if encoding fails.
    pub fn export_text(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let families = {
            let _read = self.batch.read().unwrap_or_else(PoisonError::into_inner);
            self.registry.gather()
        };
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl PrometheusSink {
    fn write(&self, gauge: Gauge, value: f64) {
        match self.gauges.get(&gauge) {
            Some(metric) => metric.set(value),
            None => tracing::warn!(gauge = gauge.name(), "Gauge not registered"),
        }
    }
}

impl MetricsSink for PrometheusSink {
    fn set(&self, gauge: Gauge, value: f64) {
        self.publish(&[(gauge, value)]);
    }

    fn publish(&self, values: &[(Gauge, f64)]) {
        let _write = self.batch.write().unwrap_or_else(PoisonError::into_inner);
        for &(gauge, value) in values {
            self.write(gauge, value);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_gauge_with_help() {
        let sink = PrometheusSink::new().unwrap();
        let text = sink.export_text().unwrap();
        for gauge in Gauge::ALL {
            assert!(
                text.contains(&format!("# HELP {} {}", gauge.name(), gauge.help())),
                "missing help for {}",
                gauge.name()
            );
            assert!(text.contains(&format!("# TYPE {} gauge", gauge.name())));
        }
    }

    #[test]
    fn set_is_visible_in_export() {
        let sink = PrometheusSink::new().unwrap();
        sink.set(Gauge::BeamEnergyTev, 3.25);
        sink.set(Gauge::RfCavityPhaseAngle, 180.0);
        assert_eq!(
            sink.value(Gauge::BeamEnergyTev).map(f64::to_bits),
            Some(3.25_f64.to_bits())
        );
        let text = sink.export_text().unwrap();
        assert!(text.contains("beam_energy_tev 3.25"));
        assert!(text.contains("rf_cavity_phase_angle 180"));
    }

    #[test]
    fn export_never_splits_a_batch() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};

        let sink = Arc::new(PrometheusSink::new().unwrap());
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let sink = Arc::clone(&sink);
                let done = Arc::clone(&done);
                std::thread::spawn(move || {
                    let mut exports = 0_u32;
                    while !done.load(Ordering::Relaxed) || exports == 0 {
                        let text = sink.export_text().unwrap();
                        let values: Vec<f64> = Gauge::ALL
                            .iter()
                            .map(|gauge| {
                                text.lines()
                                    .find_map(|line| {
                                        line.strip_prefix(gauge.name())?.strip_prefix(' ')
                                    })
                                    .unwrap()
                                    .trim()
                                    .parse()
                                    .unwrap()
                            })
                            .collect();
                        let first = values.first().copied().unwrap();
                        assert!(
                            values.iter().all(|v| v.to_bits() == first.to_bits()),
                            "split batch: {values:?}"
                        );
                        exports = exports.saturating_add(1);
                    }
                })
            })
            .collect();

        for step in 1..=20_000_u32 {
            let value = f64::from(step);
            let batch: Vec<_> = Gauge::ALL.iter().map(|&gauge| (gauge, value)).collect();
            sink.publish(&batch);
        }
        done.store(true, Ordering::Relaxed);
        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[test]
    fn content_type_is_text_format() {
        assert_eq!(CONTENT_TYPE, "text/plain; version=0.0.4");
    }
}
