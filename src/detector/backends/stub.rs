//! Canned-output backend for tests and offline runs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ndarray::{Array2, Array4};

use crate::detector::neural::InferenceBackend;
use crate::error::{Result, ScanError};

/// Stub backend for testing. Replays one fixed prediction for every frame.
pub struct StubBackend {
    output: Array2<f32>,
    fail: bool,
    delay: Option<Duration>,
    stats: StubStats,
}

/// Counters shared with a [`StubBackend`] after it is moved into a detector
#[derive(Debug, Clone, Default)]
pub struct StubStats {
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl StubStats {
    /// Forward passes started so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most forward passes ever running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl StubBackend {
    /// Replay `output`, laid out `[4 + classes, anchors]`
    pub fn new(output: Array2<f32>) -> Self {
        Self {
            output,
            fail: false,
            delay: None,
            stats: StubStats::default(),
        }
    }

    /// Backend whose every run fails with an inference error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Array2::zeros((5, 0)))
        }
    }

    /// Single anchor predicting one box in network pixels
    pub fn single(cx: f32, cy: f32, w: f32, h: f32, score: f32) -> Self {
        let output = Array2::from_shape_vec((5, 1), vec![cx, cy, w, h, score])
            .unwrap_or_else(|_| Array2::zeros((5, 0)));
        Self::new(output)
    }

    /// Block the calling thread for `delay` on every run
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Handle that keeps counting after the backend is boxed
    pub fn stats(&self) -> StubStats {
        self.stats.clone()
    }
}

impl InferenceBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn run(&mut self, _input: Array4<f32>) -> Result<Array2<f32>> {
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Err(ScanError::inference("stub backend configured to fail"));
        }
        Ok(self.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_follow_boxed_backend() {
        let backend = StubBackend::single(10.0, 10.0, 4.0, 4.0, 0.9);
        let stats = backend.stats();
        let mut boxed: Box<dyn InferenceBackend> = Box::new(backend);
        let input = Array4::zeros((1, 3, 8, 8));
        boxed.run(input.clone()).unwrap();
        boxed.run(input).unwrap();
        assert_eq!(stats.calls(), 2);
        assert_eq!(stats.peak_in_flight(), 1);
    }
}
