//! Temporal smoothing of live detections.
//!
//! Attempts are kept in a short FIFO. A quad is only surfaced once enough of
//! the recent attempts agree, and what is surfaced is the corner-wise mean
//! of the successful attempts rather than the latest raw quad.

use std::collections::VecDeque;
use std::time::Instant;

use log::{debug, warn};

use crate::error::Result;
use crate::models::{DetectionMethod, DetectionResult, Frame, Point, Quad};
use crate::pipeline::Scanner;

/// One sampled detection attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    /// Detector reported a document
    pub detected: bool,
    /// Quad, only kept when well-formed
    pub quad: Option<Quad>,
    /// Detector score, 0 for failures
    pub confidence: f32,
    /// Strategy that produced the attempt
    pub method: DetectionMethod,
    /// When the attempt was recorded
    pub at: Instant,
}

impl Attempt {
    fn is_success(&self) -> bool {
        self.detected && self.quad.is_some()
    }
}

/// Stabilizer verdict for the current history
#[derive(Debug, Clone, PartialEq)]
pub enum Stabilized {
    /// Enough recent attempts agree; carries the smoothed detection
    Stable(DetectionResult),
    /// Keep scanning
    NotStable,
}

impl Stabilized {
    /// Whether a smoothed detection is available
    pub fn is_stable(&self) -> bool {
        matches!(self, Stabilized::Stable(_))
    }

    /// The smoothed detection, if stable
    pub fn into_result(self) -> Option<DetectionResult> {
        match self {
            Stabilized::Stable(result) => Some(result),
            Stabilized::NotStable => None,
        }
    }
}

/// Rolling-history stabilizer. Owns its history; one writer only.
#[derive(Debug, Clone)]
pub struct LiveStabilizer {
    history: VecDeque<Attempt>,
    capacity: usize,
    ratio: f32,
}

impl Default for LiveStabilizer {
    fn default() -> Self {
        Self::new(4, 0.75)
    }
}

impl LiveStabilizer {
    /// `capacity` attempts are kept; stable needs `ratio` of them to succeed
    pub fn new(capacity: usize, ratio: f32) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            ratio: ratio.clamp(0.0, 1.0),
        }
    }

    /// Maximum attempts held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Attempts currently held
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// No attempts held
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Attempts currently held, oldest first
    pub fn history(&self) -> impl Iterator<Item = &Attempt> {
        self.history.iter()
    }

    /// Drop all history (stream start/stop, strategy change)
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Successful attempts over attempts held; 0 when empty
    pub fn success_ratio(&self) -> f32 {
        if self.history.is_empty() {
            return 0.0;
        }
        let successes = self.history.iter().filter(|a| a.is_success()).count();
        successes as f32 / self.history.len() as f32
    }

    /// Successes needed before anything is surfaced, so a short history
    /// cannot turn a single hit into a stable detection
    fn min_successes(&self) -> usize {
        ((self.capacity as f32 * self.ratio).ceil() as usize).max(1)
    }

    /// Append a detection result, evicting the oldest beyond capacity
    pub fn record(&mut self, result: &DetectionResult) -> Stabilized {
        let quad = result.quad.filter(|q| result.detected && q.is_well_formed());
        self.push(Attempt {
            detected: result.detected && quad.is_some(),
            quad,
            confidence: result.confidence,
            method: result.method,
            at: Instant::now(),
        });
        self.evaluate()
    }

    /// Append a failed attempt (e.g. inference error)
    pub fn record_failure(&mut self, method: DetectionMethod) -> Stabilized {
        self.push(Attempt {
            detected: false,
            quad: None,
            confidence: 0.0,
            method,
            at: Instant::now(),
        });
        self.evaluate()
    }

    /// Record the outcome of one attempt; errors count as failures
    pub fn record_outcome(
        &mut self,
        outcome: Result<DetectionResult>,
        method: DetectionMethod,
    ) -> Stabilized {
        match outcome {
            Ok(result) => self.record(&result),
            Err(err) => {
                warn!("live: detection attempt failed: {err}");
                self.record_failure(method)
            }
        }
    }

    /// Run the scanner's active strategy on `frame` and record the attempt
    pub fn stabilize(&mut self, frame: &Frame, scanner: &mut Scanner) -> Stabilized {
        let method = scanner.active_method();
        let outcome = scanner.try_detect(frame);
        self.record_outcome(outcome, method)
    }

    /// Verdict for the current history
    pub fn evaluate(&self) -> Stabilized {
        let successes: Vec<&Attempt> = self.history.iter().filter(|a| a.is_success()).collect();
        let ratio = self.success_ratio();
        if successes.len() < self.min_successes() || ratio < self.ratio {
            debug!(
                "live: {}/{} successful, not stable",
                successes.len(),
                self.history.len()
            );
            return Stabilized::NotStable;
        }

        let quads: Vec<Quad> = successes.iter().filter_map(|a| a.quad).collect();
        let (Some(first), Some(quad)) = (successes.first(), mean_quad(&quads)) else {
            return Stabilized::NotStable;
        };
        let confidence =
            successes.iter().map(|a| a.confidence).sum::<f32>() / successes.len() as f32;
        // Oldest success in history names the method
        Stabilized::Stable(DetectionResult::found(quad, confidence, first.method))
    }

    fn push(&mut self, attempt: Attempt) {
        while self.history.len() >= self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(attempt);
    }
}

/// Corner-wise mean of a set of quads
pub fn mean_quad(quads: &[Quad]) -> Option<Quad> {
    if quads.is_empty() {
        return None;
    }
    let n = quads.len() as f32;
    let mut corners = [Point::new(0.0, 0.0); 4];
    for quad in quads {
        for (acc, p) in corners.iter_mut().zip(quad.corners()) {
            acc.x += p.x;
            acc.y += p.y;
        }
    }
    for acc in &mut corners {
        acc.x /= n;
        acc.y /= n;
    }
    Some(Quad::new(corners))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(offset: f32) -> DetectionResult {
        let quad = Quad::from_box(10.0 + offset, 20.0 + offset, 110.0 + offset, 220.0 + offset);
        DetectionResult::found(quad, 0.9, DetectionMethod::Contour)
    }

    fn miss() -> DetectionResult {
        DetectionResult::not_detected(DetectionMethod::Contour)
    }

    #[test]
    fn test_three_of_four_is_stable() {
        let mut stabilizer = LiveStabilizer::default();
        stabilizer.record(&hit(0.0));
        stabilizer.record(&hit(0.0));
        stabilizer.record(&hit(0.0));
        let verdict = stabilizer.record(&miss());
        assert_eq!(stabilizer.success_ratio(), 0.75);
        assert!(verdict.is_stable());
    }

    #[test]
    fn test_two_of_four_is_not_stable() {
        let mut stabilizer = LiveStabilizer::default();
        stabilizer.record(&hit(0.0));
        stabilizer.record(&hit(0.0));
        stabilizer.record(&miss());
        let verdict = stabilizer.record(&miss());
        assert_eq!(stabilizer.success_ratio(), 0.5);
        assert_eq!(verdict, Stabilized::NotStable);
    }

    #[test]
    fn test_latest_success_alone_is_not_enough() {
        let mut stabilizer = LiveStabilizer::default();
        assert!(!stabilizer.record(&hit(0.0)).is_stable());
        assert!(!stabilizer.record(&hit(0.0)).is_stable());
        assert!(stabilizer.record(&hit(0.0)).is_stable());
    }

    #[test]
    fn test_smoothing_is_corner_mean() {
        let mut stabilizer = LiveStabilizer::default();
        stabilizer.record(&hit(0.0));
        stabilizer.record(&hit(3.0));
        let verdict = stabilizer.record(&hit(6.0));
        let result = verdict.into_result().unwrap();
        let expected = hit(3.0).quad.unwrap();
        assert!(result.quad.unwrap().max_corner_distance(&expected) < 1e-4);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut stabilizer = LiveStabilizer::default();
        for _ in 0..4 {
            stabilizer.record(&miss());
        }
        for _ in 0..3 {
            stabilizer.record(&hit(0.0));
        }
        assert_eq!(stabilizer.len(), 4);
        assert!(stabilizer.evaluate().is_stable());
    }

    #[test]
    fn test_failures_and_clear() {
        let mut stabilizer = LiveStabilizer::default();
        for _ in 0..3 {
            stabilizer.record(&hit(0.0));
        }
        stabilizer.record_outcome(
            Err(crate::error::ScanError::inference("boom")),
            DetectionMethod::Neural,
        );
        stabilizer.record_failure(DetectionMethod::Neural);
        assert_eq!(stabilizer.success_ratio(), 0.5);
        assert!(!stabilizer.evaluate().is_stable());

        stabilizer.clear();
        assert!(stabilizer.is_empty());
        assert_eq!(stabilizer.success_ratio(), 0.0);
    }

    #[test]
    fn test_method_from_oldest_success() {
        let mut stabilizer = LiveStabilizer::default();
        stabilizer.record(&miss());
        let neural = |offset| DetectionResult {
            method: DetectionMethod::Neural,
            ..hit(offset)
        };
        stabilizer.record(&neural(0.0));
        stabilizer.record(&neural(1.0));
        let verdict = stabilizer.record(&neural(2.0));
        let result = verdict.into_result().unwrap();
        assert_eq!(result.method, DetectionMethod::Neural);

        stabilizer.clear();
        stabilizer.record(&hit(0.0));
        stabilizer.record(&hit(0.0));
        let verdict = stabilizer.record(&neural(0.0));
        assert_eq!(verdict.into_result().unwrap().method, DetectionMethod::Contour);
    }

    #[test]
    fn test_degenerate_quad_counts_as_failure() {
        let mut stabilizer = LiveStabilizer::default();
        let bad = DetectionResult::found(
            Quad::new([Point::new(5.0, 5.0); 4]),
            0.9,
            DetectionMethod::Neural,
        );
        stabilizer.record(&bad);
        assert_eq!(stabilizer.success_ratio(), 0.0);
    }
}
