//! Live stream sampling.
//!
//! A [`LiveSession`] owns one background task that samples the latest pushed
//! frame at a fixed cadence, runs the active detector off the async thread
//! and feeds the outcome into a [`LiveStabilizer`]. Attempts never overlap:
//! the next tick is only polled once the current attempt has finished, and
//! ticks missed meanwhile are skipped. History and verdict are published
//! together as one [`LiveSnapshot`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::{self, JoinHandle};
use tokio::time::{self, MissedTickBehavior};

use crate::detector::stabilizer::{LiveStabilizer, Stabilized};
use crate::error::ScanError;
use crate::models::{DetectionResult, Frame};
use crate::pipeline::{DetectionStrategy, Scanner};

/// Sampling cadence and stability rule
#[derive(Debug, Clone, PartialEq)]
pub struct LiveConfig {
    /// Time between detection attempts (a rate limit, not a per-frame promise)
    pub sample_interval: Duration,
    /// Attempts kept in the rolling history
    pub history_capacity: usize,
    /// Fraction of attempts that must succeed before a quad is surfaced
    pub stability_ratio: f32,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(600),
            history_capacity: 4,
            stability_ratio: 0.75,
        }
    }
}

/// Consistent view of the stabilizer after one update
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LiveSnapshot {
    /// Bumped on every publish
    pub sequence: u64,
    /// Bumped every time history is cleared by a strategy change
    pub generation: u64,
    /// Attempts currently in history
    pub attempts: usize,
    /// Successful attempts over attempts held
    pub success_ratio: f32,
    /// Strategy that produced the attempts in history
    pub strategy: DetectionStrategy,
    /// Smoothed detection, present only when stable
    pub stable: Option<DetectionResult>,
}

/// Handle to a running sampling loop. Must be started inside a tokio runtime.
pub struct LiveSession {
    frames: watch::Sender<Option<Arc<Frame>>>,
    strategy: watch::Sender<DetectionStrategy>,
    stop: watch::Sender<bool>,
    snapshots: watch::Receiver<LiveSnapshot>,
    scanner: Arc<Mutex<Scanner>>,
    worker: JoinHandle<()>,
}

impl LiveSession {
    /// Start sampling with a fresh, empty history
    pub fn start(scanner: Scanner, config: LiveConfig) -> Self {
        let initial = scanner.active_strategy();
        let scanner = Arc::new(Mutex::new(scanner));
        let (frames, frames_rx) = watch::channel(None);
        let (strategy, strategy_rx) = watch::channel(initial);
        let (stop, stop_rx) = watch::channel(false);
        let (snapshots_tx, snapshots) = watch::channel(LiveSnapshot {
            strategy: initial,
            ..LiveSnapshot::default()
        });

        info!(
            "live: sampling every {:?} with {:?}",
            config.sample_interval, initial
        );
        let sampler = Sampler {
            scanner: Arc::clone(&scanner),
            stabilizer: LiveStabilizer::new(config.history_capacity, config.stability_ratio),
            snapshots: snapshots_tx,
            strategy: initial,
            sequence: 0,
            generation: 0,
        };
        let worker = tokio::spawn(sampler.run(config.sample_interval, frames_rx, strategy_rx, stop_rx));

        Self {
            frames,
            strategy,
            stop,
            snapshots,
            scanner,
            worker,
        }
    }

    /// Replace the frame sampled on the next tick
    pub fn push_frame(&self, frame: Frame) {
        self.frames.send_replace(Some(Arc::new(frame)));
    }

    /// Switch detector; history is cleared once the switch is applied
    pub fn set_strategy(&self, strategy: DetectionStrategy) {
        self.strategy.send_replace(strategy);
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> LiveSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<LiveSnapshot> {
        self.snapshots.clone()
    }

    /// Shared scanner, e.g. to place manual corners mid-stream
    pub fn scanner(&self) -> Arc<Mutex<Scanner>> {
        Arc::clone(&self.scanner)
    }

    /// Cancel the loop and wait for it to exit. An attempt still running is
    /// abandoned and its outcome discarded; history is cleared.
    pub async fn stop(self) {
        self.stop.send_replace(true);
        if let Err(err) = self.worker.await {
            if !err.is_cancelled() {
                warn!("live: sampling task error: {err}");
            }
        }
    }
}

/// Loop-owned state; the only writer of the stabilizer history
struct Sampler {
    scanner: Arc<Mutex<Scanner>>,
    stabilizer: LiveStabilizer,
    snapshots: watch::Sender<LiveSnapshot>,
    strategy: DetectionStrategy,
    sequence: u64,
    generation: u64,
}

impl Sampler {
    async fn run(
        mut self,
        interval: Duration,
        mut frames: watch::Receiver<Option<Arc<Frame>>>,
        mut strategy: watch::Receiver<DetectionStrategy>,
        mut stop: watch::Receiver<bool>,
    ) {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = stop.changed() => break,
                changed = strategy.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let requested = *strategy.borrow_and_update();
                    let Ok(mut scanner) = self.scanner.lock() else {
                        warn!("live: scanner lock poisoned, stopping");
                        break;
                    };
                    self.strategy = scanner.set_strategy(requested);
                    drop(scanner);
                    self.stabilizer.clear();
                    self.generation += 1;
                    self.publish(Stabilized::NotStable);
                }
                _ = ticker.tick() => {
                    let Some(frame) = frames.borrow_and_update().clone() else {
                        continue;
                    };
                    let Ok(method) = self.scanner.lock().map(|s| s.active_method()) else {
                        warn!("live: scanner lock poisoned, stopping");
                        break;
                    };

                    let scanner = Arc::clone(&self.scanner);
                    let attempt = task::spawn_blocking(move || {
                        let mut scanner = scanner
                            .lock()
                            .map_err(|_| ScanError::inference("scanner lock poisoned"))?;
                        scanner.try_detect(&frame)
                    });
                    let outcome = tokio::select! {
                        biased;
                        _ = stop.changed() => break,
                        joined = attempt => joined.unwrap_or_else(|err| {
                            Err(ScanError::inference(format!("detection task failed: {err}")))
                        }),
                    };

                    let verdict = self.stabilizer.record_outcome(outcome, method);
                    self.publish(verdict);
                }
            }
        }

        self.stabilizer.clear();
        self.publish(Stabilized::NotStable);
        debug!("live: sampling stopped after {} updates", self.sequence);
    }

    fn publish(&mut self, verdict: Stabilized) {
        self.sequence += 1;
        self.snapshots.send_replace(LiveSnapshot {
            sequence: self.sequence,
            generation: self.generation,
            attempts: self.stabilizer.len(),
            success_ratio: self.stabilizer.success_ratio(),
            strategy: self.strategy,
            stable: verdict.into_result(),
        });
    }
}
