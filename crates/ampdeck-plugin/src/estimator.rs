use tokio::time::Instant;

/// Local playback position between polls.
///
/// The anchor is only set while playing; without it the position is frozen.
#[derive(Debug, Clone, Default)]
pub struct PositionEstimate {
    position_ms: i64,
    anchor: Option<Instant>,
}

impl PositionEstimate {
    /// Record an authoritative position.  `playing` decides whether the
    /// estimate advances from here.
    pub fn set(&mut self, position_ms: i64, playing: bool, now: Instant) {
        self.position_ms = position_ms.max(0);
        self.anchor = playing.then_some(now);
    }

    /// Keep the position but start (or stop) extrapolating from `now`.
    pub fn set_playing(&mut self, playing: bool, now: Instant) {
        self.anchor = playing.then_some(now);
    }

    /// Advance to `now`, capped at `duration_ms`, and re-anchor.
    pub fn estimate(&mut self, duration_ms: i64, now: Instant) -> i64 {
        if let Some(anchor) = self.anchor {
            let elapsed = now.saturating_duration_since(anchor).as_millis() as i64;
            self.position_ms = (self.position_ms + elapsed).min(duration_ms.max(0));
            self.anchor = Some(now);
        }
        self.position_ms
    }

    pub fn position_ms(&self) -> i64 {
        self.position_ms
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }
}

/// Track progress in percent; zero for an unknown duration.
pub fn progress_percent(position_ms: i64, duration_ms: i64) -> f64 {
    if duration_ms > 0 {
        position_ms as f64 / duration_ms as f64 * 100.0
    } else {
        0.0
    }
}
