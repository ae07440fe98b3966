use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,
    questions_answered: AtomicUsize,

    // Timing (in microseconds)
    total_extract_time_us: AtomicU64,
    total_analysis_time_us: AtomicU64,

    // Counts
    documents_processed: AtomicUsize,
    total_entities_extracted: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            failed_requests: AtomicUsize::new(0),
            questions_answered: AtomicUsize::new(0),
            total_extract_time_us: AtomicU64::new(0),
            total_analysis_time_us: AtomicU64::new(0),
            documents_processed: AtomicUsize::new(0),
            total_entities_extracted: AtomicUsize::new(0),
        })
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_extract(&self, duration: Duration, entities: usize) {
        self.total_extract_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.total_entities_extracted
            .fetch_add(entities, Ordering::Relaxed);
    }

    /// Classification, summary and topics for one document.
    pub fn record_analysis(&self, duration: Duration) {
        self.total_analysis_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_questions(&self, count: usize) {
        self.questions_answered.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            total_entities_extracted: self.total_entities_extracted.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            avg_extract_time_ms: avg_time_ms(
                &self.total_extract_time_us,
                &self.documents_processed,
            ),
            avg_analysis_time_ms: avg_time_ms(
                &self.total_analysis_time_us,
                &self.documents_processed,
            ),
        }
    }
}

fn avg_time_ms(total_us: &AtomicU64, count: &AtomicUsize) -> f64 {
    let total = total_us.load(Ordering::Relaxed) as f64;
    let cnt = count.load(Ordering::Relaxed) as f64;
    if cnt > 0.0 {
        total / cnt / 1000.0 // Convert to ms
    } else {
        0.0
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub documents_processed: usize,
    pub total_entities_extracted: usize,
    pub questions_answered: usize,
    pub avg_extract_time_ms: f64,
    pub avg_analysis_time_ms: f64,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_averages() {
        let metrics = Metrics::new();
        metrics.record_request(true);
        metrics.record_request(false);
        metrics.record_extract(Duration::from_millis(10), 4);
        metrics.record_extract(Duration::from_millis(30), 2);
        metrics.record_analysis(Duration::from_millis(100));
        metrics.record_questions(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.documents_processed, 2);
        assert_eq!(snapshot.total_entities_extracted, 6);
        assert_eq!(snapshot.questions_answered, 3);
        assert!((snapshot.avg_extract_time_ms - 20.0).abs() < 1e-9);
        assert!((snapshot.avg_analysis_time_ms - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.avg_extract_time_ms, 0.0);
    }
}
