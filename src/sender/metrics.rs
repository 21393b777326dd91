use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const MAX_LATENCY_SAMPLES: usize = 1000;

/// Nearest-rank percentile over already sorted samples.
fn percentile(sorted: &[Duration], quantile: f64) -> Duration {
    let Some(last) = sorted.len().checked_sub(1) else {
        return Duration::ZERO;
    };

    let rank = quantile.clamp(0.0, 1.0) * last as f64;
    let index = if rank.is_finite() {
        (rank.floor() as usize).min(last)
    } else {
        0
    };
    sorted.get(index).copied().unwrap_or(Duration::ZERO)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliverySnapshot {
    pub records_sent: u64,
    pub bytes_sent: u64,
    pub failed_deliveries: u64,
    pub records_buffered: u64,
    pub bytes_buffered: u64,
    pub buffer_drains: u64,
    pub average_latency: Duration,
    pub p95_latency: Duration,
    pub p99_latency: Duration,
}

/// Delivery counters shared by every session of one appender.
#[derive(Clone, Default)]
pub struct DeliveryMetrics {
    records_sent: Arc<AtomicU64>,
    bytes_sent: Arc<AtomicU64>,
    failed_deliveries: Arc<AtomicU64>,
    records_buffered: Arc<AtomicU64>,
    bytes_buffered: Arc<AtomicU64>,
    buffer_drains: Arc<AtomicU64>,
    latency_samples: Arc<Mutex<VecDeque<Duration>>>,
}

impl DeliveryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&self, bytes: usize, latency: Duration) {
        self.records_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);

        let mut samples = self.latency_samples.lock();
        if samples.len() == MAX_LATENCY_SAMPLES {
            samples.pop_front();
        }
        samples.push_back(latency);
    }

    pub fn record_failure(&self) {
        self.failed_deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_buffered(&self, bytes: usize) {
        self.records_buffered.fetch_add(1, Ordering::Relaxed);
        self.bytes_buffered.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_drain(&self) {
        self.buffer_drains.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DeliverySnapshot {
        let (average_latency, p95_latency, p99_latency) = {
            let samples = self.latency_samples.lock();
            let mut sorted: Vec<Duration> = samples.iter().copied().collect();
            drop(samples);
            sorted.sort_unstable();

            let average = if sorted.is_empty() {
                Duration::ZERO
            } else {
                let total: Duration = sorted.iter().sum();
                total / sorted.len() as u32
            };
            (
                average,
                percentile(&sorted, 0.95),
                percentile(&sorted, 0.99),
            )
        };

        DeliverySnapshot {
            records_sent: self.records_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            failed_deliveries: self.failed_deliveries.load(Ordering::Relaxed),
            records_buffered: self.records_buffered.load(Ordering::Relaxed),
            bytes_buffered: self.bytes_buffered.load(Ordering::Relaxed),
            buffer_drains: self.buffer_drains.load(Ordering::Relaxed),
            average_latency,
            p95_latency,
            p99_latency,
        }
    }
}
