//! Surface rendering.
//!
//! Every routine here is a pure function of a [`RenderState`] (plus, for the
//! strip, that surface's own scroll and overlay records).  Nothing in this
//! module talks to the host.

pub mod canvas;
pub mod color;
pub mod keys;
pub mod strip;

use ampdeck_proto::state::{PlaybackState, RepeatMode, TrackIdentity};
use image::RgbaImage;

use crate::model::PlaybackModel;

use self::color::{accent, Color};

/// Edge of a key image.
pub const KEY_SIZE: u32 = 144;

/// Read-only view of the model plus the color settings, for one frame.
#[derive(Debug, Clone)]
pub struct RenderState<'a> {
    pub state: PlaybackState,
    pub track: Option<&'a TrackIdentity>,
    pub position_ms: i64,
    pub duration_ms: i64,
    /// 0..=100.
    pub progress: f64,
    pub volume: u8,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub album_track_count: Option<u32>,
    pub artwork: Option<&'a RgbaImage>,
    /// Primary text color as configured (`#RRGGBB`).
    pub text_color: &'a str,
    pub accent: Color,
}

impl<'a> RenderState<'a> {
    pub fn from_model(model: &'a PlaybackModel, text_color: &'a str, dynamic_colors: bool) -> Self {
        Self {
            state: model.state,
            track: model.track.as_ref(),
            position_ms: model.position_ms(),
            duration_ms: model.duration_ms,
            progress: model.progress(),
            volume: model.volume,
            shuffle: model.shuffle,
            repeat: model.repeat,
            album_track_count: model.album_track_count,
            artwork: model.artwork.as_deref(),
            text_color,
            accent: accent(dynamic_colors, model.dominant_color),
        }
    }

    /// Same frame drawn with a surface-local text color.
    pub fn with_text_color<'b>(&self, text_color: &'b str) -> RenderState<'b>
    where
        'a: 'b,
    {
        RenderState {
            state: self.state,
            track: self.track,
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
            progress: self.progress,
            volume: self.volume,
            shuffle: self.shuffle,
            repeat: self.repeat,
            album_track_count: self.album_track_count,
            artwork: self.artwork,
            text_color,
            accent: self.accent,
        }
    }
}

/// `m:ss`; zero or negative reads `0:00`.
pub fn format_time(ms: i64) -> String {
    if ms <= 0 {
        return "0:00".to_string();
    }
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(-5), "0:00");
        assert_eq!(format_time(999), "0:00");
        assert_eq!(format_time(61_000), "1:01");
        assert_eq!(format_time(3_725_000), "62:05");
    }
}
