use std::sync::Arc;

use ampdeck_proto::state::{Connectivity, PlaybackState, RepeatMode, ServerHint, TrackIdentity};
use image::RgbaImage;
use tokio::time::Instant;

use crate::estimator::{progress_percent, PositionEstimate};
use crate::plex::Reachability;
use crate::render::color::{Color, DEFAULT_ACCENT};

pub const DEFAULT_VOLUME: u8 = 50;

/// Everything the engine knows about the player.  Owned by the core loop.
#[derive(Debug, Clone)]
pub struct PlaybackModel {
    pub state: PlaybackState,
    pub duration_ms: i64,
    pub volume: u8,
    /// Last non-zero volume before muting.
    pub previous_volume: u8,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub track: Option<TrackIdentity>,
    pub estimate: PositionEstimate,
    /// Unique key seen on the previous poll.
    pub last_key: Option<String>,
    pub server_hint: Option<ServerHint>,
    /// Album the cached track count belongs to.
    pub album_key: Option<String>,
    pub album_track_count: Option<u32>,
    /// Artwork path the cached raster belongs to.
    pub artwork_path: Option<String>,
    pub artwork: Option<Arc<RgbaImage>>,
    pub dominant_color: Color,
    pub connectivity: Connectivity,
}

impl Default for PlaybackModel {
    fn default() -> Self {
        Self {
            state: PlaybackState::Stopped,
            duration_ms: 0,
            volume: DEFAULT_VOLUME,
            previous_volume: 0,
            shuffle: false,
            repeat: RepeatMode::Off,
            track: None,
            estimate: PositionEstimate::default(),
            last_key: None,
            server_hint: None,
            album_key: None,
            album_track_count: None,
            artwork_path: None,
            artwork: None,
            dominant_color: DEFAULT_ACCENT,
            connectivity: Connectivity::default(),
        }
    }
}

impl PlaybackModel {
    /// Something is (or was, until now) playing.
    pub fn is_active(&self) -> bool {
        self.track.is_some() || self.state.is_active()
    }

    /// Advance the position estimate to `now`.
    pub fn tick(&mut self, now: Instant) -> i64 {
        self.estimate.estimate(self.duration_ms, now)
    }

    pub fn position_ms(&self) -> i64 {
        self.estimate.position_ms()
    }

    pub fn progress(&self) -> f64 {
        progress_percent(self.position_ms(), self.duration_ms)
    }

    pub fn player_id(&self) -> Option<&str> {
        self.track.as_ref().and_then(|t| t.player_id.as_deref())
    }

    pub fn apply_reach(&mut self, reach: Reachability) {
        if let Some(p) = reach.player {
            self.connectivity.player_reachable = p;
        }
        if let Some(s) = reach.server {
            self.connectivity.server_reachable = s;
        }
    }
}
