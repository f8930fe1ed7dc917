//! Poll and render tickers, started and stopped with the surface set.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::CoreEvent;

#[derive(Debug, Clone, Copy)]
pub struct TickIntervals {
    pub poll: Duration,
    pub render: Duration,
}

/// Owns the cancellation token shared by the tickers and every request
/// spawned while surfaces are visible.
#[derive(Debug, Default)]
pub struct Lifecycle {
    token: Option<CancellationToken>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.token.is_some()
    }

    /// Token for background work, if running.
    pub fn token(&self) -> Option<CancellationToken> {
        self.token.clone()
    }

    /// Spawn both tickers.  Returns false when already running.  The poll
    /// ticker fires immediately.
    pub fn start(&mut self, intervals: TickIntervals, tx: &mpsc::Sender<CoreEvent>) -> bool {
        if self.token.is_some() {
            return false;
        }
        let token = CancellationToken::new();
        spawn_ticker(intervals.poll, token.clone(), tx.clone(), || CoreEvent::PollTick);
        spawn_ticker(intervals.render, token.clone(), tx.clone(), || CoreEvent::RenderTick);
        info!(
            "Lifecycle: started, poll every {:?}, render every {:?}",
            intervals.poll, intervals.render
        );
        self.token = Some(token);
        true
    }

    /// Cancel the tickers and any request still in flight.
    pub fn stop(&mut self) -> bool {
        match self.token.take() {
            Some(token) => {
                token.cancel();
                info!("Lifecycle: stopped");
                true
            }
            None => false,
        }
    }
}

fn spawn_ticker(
    period: Duration,
    token: CancellationToken,
    tx: mpsc::Sender<CoreEvent>,
    make: fn() -> CoreEvent,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if tx.send(make()).await.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("ticker {:?} exited", period);
    });
}
