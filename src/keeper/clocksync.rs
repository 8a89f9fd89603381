//! Periodic logical clock synchronization across all backends.

use std::sync::Arc;

use crate::storage::Storage;

use tokio::sync::mpsc;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

/// Period between two synchronization rounds.
pub const CLOCK_SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Keeper-side clock synchronizer. Owns the keeper's view of the global
/// clock; only its own rounds ever change it.
pub struct ClockSync {
    /// Handles to every known backend.
    backs: Vec<Arc<dyn Storage>>,

    /// Best known global clock value.
    global: u64,
}

impl ClockSync {
    /// Creates a synchronizer over `backs` with the global clock at zero.
    pub fn new(backs: Vec<Arc<dyn Storage>>) -> Self {
        ClockSync { backs, global: 0 }
    }

    /// Current global clock value.
    pub fn global(&self) -> u64 {
        self.global
    }

    /// Global value following `prev` given the largest clock reported by
    /// backends in a round. Always strictly greater than `prev` unless
    /// saturated.
    pub fn next_global(prev: u64, max_seen: u64) -> u64 {
        if max_seen > prev {
            max_seen
        } else {
            prev.saturating_add(1)
        }
    }

    /// Runs one synchronization round: asks every backend in parallel to
    /// advance its clock to at least the current global value, waits for all
    /// of them, then moves the global value forward. A failed backend call
    /// is logged and counts as zero. Returns the new global value.
    pub async fn tick(&mut self) -> u64 {
        let (tx_clk, mut rx_clk) = mpsc::unbounded_channel();
        let at_least = self.global;

        for (idx, back) in self.backs.iter().enumerate() {
            let back = back.clone();
            let tx_clk = tx_clk.clone();
            tokio::spawn(async move {
                let clk = match back.clock(at_least).await {
                    Ok(clk) => clk,
                    Err(e) => {
                        pf_warn!("clock sync with back {} failed: {}", idx, e);
                        0
                    }
                };
                if let Err(e) = tx_clk.send(clk) {
                    pf_error!("error sending to clock channel: {}", e);
                }
            });
        }
        drop(tx_clk);

        let mut max_seen = 0;
        for _ in 0..self.backs.len() {
            match rx_clk.recv().await {
                Some(clk) => max_seen = max_seen.max(clk),
                None => break, // some task died without reporting
            }
        }

        self.global = Self::next_global(self.global, max_seen);
        pf_trace!("clock sync round done, global = {}", self.global);
        self.global
    }

    /// Runs synchronization rounds forever, one per `CLOCK_SYNC_INTERVAL`.
    /// There is no per-call timeout: an unresponsive backend stalls the
    /// round it is part of.
    pub async fn run(mut self) {
        pf_debug!("clock sync over {} backs started", self.backs.len());

        let mut interval = time::interval_at(
            Instant::now() + CLOCK_SYNC_INTERVAL,
            CLOCK_SYNC_INTERVAL,
        );
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            self.tick().await;
        }
    }
}
