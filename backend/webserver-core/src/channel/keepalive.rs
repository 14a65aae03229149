//! Periodic liveness probing of every registered connection.

use crate::channel::connection::ProbeOutcome;
use crate::channel::registry::ConnectionRegistry;

use std::time::Duration;

use log::{debug, info};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Totals for one probing round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeepaliveReport {
    pub probed: usize,
    pub evicted: usize,
}

pub struct KeepaliveLoop {
    registry: ConnectionRegistry,
    interval: Duration,
    max_missed: u32,
}

impl KeepaliveLoop {
    pub fn new(registry: ConnectionRegistry, interval: Duration, max_missed: u32) -> Self {
        Self {
            registry,
            interval,
            max_missed,
        }
    }

    /// Probe every connection once.
    ///
    /// Connections that could not be probed, or that left `max_missed` probes
    /// unanswered, are closed. Their connection task removes them from the
    /// registry.
    pub fn run_round(&self) -> KeepaliveReport {
        let mut report = KeepaliveReport::default();

        self.registry
            .for_each(|connection| match connection.probe(self.max_missed) {
                ProbeOutcome::Sent => report.probed += 1,
                ProbeOutcome::Skipped => {}
                ProbeOutcome::Unresponsive { missed } => {
                    info!(
                        "Closing {} ({}): {} keepalive probes unanswered",
                        connection.id(),
                        connection.remote_addr(),
                        missed
                    );
                    if connection.close() {
                        report.evicted += 1;
                    }
                }
                ProbeOutcome::Failed => {
                    info!(
                        "Closing {} ({}): keepalive probe could not be sent",
                        connection.id(),
                        connection.remote_addr()
                    );
                    if connection.close() {
                        report.evicted += 1;
                    }
                }
            });

        if report.probed > 0 || report.evicted > 0 {
            debug!(
                "Keepalive round: {} probed, {} evicted",
                report.probed, report.evicted
            );
        }
        report
    }

    /// Run rounds every `interval` until the task is aborted.
    ///
    /// The first round happens one interval after spawning.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                self.run_round();
            }
        })
    }
}
