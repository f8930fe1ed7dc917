//! Folding poll readings and fetch results into the [`PlaybackModel`].
//!
//! These are plain functions over the model; the core loop turns the
//! returned [`Effects`] into network tasks and redraws.

use ampdeck_proto::state::{ServerHint, SessionSnapshot, SnapshotSource, TrackIdentity};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::artwork::Artwork;
use crate::model::PlaybackModel;
use crate::render::color::DEFAULT_ACCENT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRequest {
    pub key: String,
    pub player_id: Option<String>,
    pub hint: Option<ServerHint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkRequest {
    pub path: String,
    pub hint: Option<ServerHint>,
}

/// Follow-up work produced by a model update.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Effects {
    pub redraw: bool,
    pub fetch_metadata: Option<MetadataRequest>,
    pub fetch_track_count: Option<String>,
    pub fetch_artwork: Option<ArtworkRequest>,
}

/// Apply a definitive poll reading; `None` is "no session".
pub fn apply_reading(
    model: &mut PlaybackModel,
    reading: Option<SessionSnapshot>,
    now: Instant,
) -> Effects {
    match reading {
        Some(snap) => apply_snapshot(model, snap, now),
        None => Effects {
            redraw: clear_session(model),
            ..Default::default()
        },
    }
}

/// Reset to the idle state.  Returns false (and changes nothing) when there
/// was nothing to clear.  Volume and connectivity survive.
pub fn clear_session(model: &mut PlaybackModel) -> bool {
    if !model.is_active() {
        return false;
    }
    info!("session ended");
    *model = PlaybackModel {
        volume: model.volume,
        previous_volume: model.previous_volume,
        connectivity: model.connectivity,
        ..PlaybackModel::default()
    };
    true
}

pub fn apply_snapshot(model: &mut PlaybackModel, snap: SessionSnapshot, now: Instant) -> Effects {
    let mut effects = Effects {
        redraw: true,
        ..Default::default()
    };

    let key_changed = snap.track_key != model.last_key;
    model.last_key = snap.track_key.clone();
    if key_changed {
        debug!("track transition {:?}", snap.track_key);
        model.album_track_count = None;
        model.album_key = None;
        model.artwork_path = None;
    }

    model.state = snap.state;
    model.duration_ms = snap.duration_ms.max(0);
    let mut position = snap.position_ms.max(0);
    if model.duration_ms > 0 {
        position = position.min(model.duration_ms);
    }
    model.estimate.set(position, snap.state.is_playing(), now);

    if let Some(v) = snap.volume {
        model.volume = v;
    }
    if let Some(s) = snap.shuffle {
        model.shuffle = s;
    }
    if let Some(r) = snap.repeat {
        model.repeat = r;
    }
    if snap.source == SnapshotSource::Player {
        model.server_hint = snap.server_hint.clone();
    }

    match snap.track {
        Some(track) => {
            let identity_changed = model.track.as_ref().map(|t| &t.key) != Some(&track.key);
            model.track = Some(track);
            if identity_changed || key_changed {
                resolve_extras(model, &mut effects);
            }
        }
        None => {
            if let (Some(t), Some(pid)) = (model.track.as_mut(), snap.player_id.as_ref()) {
                t.player_id = Some(pid.clone());
            }
            if key_changed {
                if let Some(key) = snap.track_key {
                    effects.fetch_metadata = Some(MetadataRequest {
                        key,
                        player_id: snap.player_id,
                        hint: snap.server_hint,
                    });
                }
            }
        }
    }
    effects
}

/// Queue track-count and artwork fetches for the current identity, unless
/// the caches already hold them.
fn resolve_extras(model: &mut PlaybackModel, effects: &mut Effects) {
    let Some(track) = model.track.as_ref() else {
        return;
    };

    if let Some(album) = &track.album_key {
        if model.album_key.as_ref() != Some(album) || model.album_track_count.is_none() {
            model.album_key = Some(album.clone());
            model.album_track_count = None;
            effects.fetch_track_count = Some(album.clone());
        }
    }

    match &track.artwork {
        Some(path) if model.artwork_path.as_ref() != Some(path) => {
            model.artwork_path = Some(path.clone());
            effects.fetch_artwork = Some(ArtworkRequest {
                path: path.clone(),
                hint: model.server_hint.clone(),
            });
        }
        Some(_) => {}
        None => {
            model.artwork_path = None;
            model.artwork = None;
            model.dominant_color = DEFAULT_ACCENT;
        }
    }
}

/// Install metadata fetched for `key`.  Dropped if the player has moved on.
pub fn apply_metadata(model: &mut PlaybackModel, key: &str, mut track: TrackIdentity) -> Effects {
    if model.last_key.as_deref() != Some(key) {
        debug!("dropping stale metadata for {}", key);
        return Effects::default();
    }
    if track.player_id.is_none() {
        track.player_id = model.player_id().map(str::to_string);
    }
    model.track = Some(track);
    model.album_track_count = None;
    let mut effects = Effects {
        redraw: true,
        ..Default::default()
    };
    resolve_extras(model, &mut effects);
    effects
}

pub fn apply_track_count(model: &mut PlaybackModel, album_key: &str, count: Option<u32>) -> bool {
    if model.album_key.as_deref() != Some(album_key) {
        return false;
    }
    model.album_track_count = count;
    true
}

/// Install decoded artwork for `path`.  `None` means the fetch or decode
/// failed: the accent falls back to the default.
pub fn apply_artwork(model: &mut PlaybackModel, path: &str, art: Option<Artwork>) -> bool {
    if model.artwork_path.as_deref() != Some(path) {
        return false;
    }
    match art {
        Some(a) => {
            model.artwork = Some(a.image);
            model.dominant_color = a.dominant;
        }
        None => {
            model.artwork = None;
            model.dominant_color = DEFAULT_ACCENT;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use ampdeck_proto::state::{PlaybackState, RepeatMode};
    use std::time::Duration;

    fn track(key: &str, album: &str, art: &str) -> TrackIdentity {
        TrackIdentity {
            key: key.into(),
            album_key: Some(album.into()),
            title: "T".into(),
            artist: "A".into(),
            album: "B".into(),
            artwork: Some(art.into()),
            player_id: Some("amp".into()),
            ..Default::default()
        }
    }

    fn snap(key: &str, with_track: bool) -> SessionSnapshot {
        SessionSnapshot {
            source: SnapshotSource::Player,
            state: PlaybackState::Playing,
            position_ms: 1_000,
            duration_ms: 100_000,
            volume: Some(70),
            shuffle: Some(true),
            repeat: Some(RepeatMode::All),
            track_key: Some(key.into()),
            player_id: Some("amp".into()),
            track: with_track.then(|| track(key, "alb", &format!("/art/{}", key))),
            server_hint: None,
        }
    }

    #[test]
    fn test_identical_keys_fetch_once() {
        let mut m = PlaybackModel::default();
        let now = Instant::now();
        let first = apply_snapshot(&mut m, snap("1", true), now);
        assert!(first.fetch_artwork.is_some());
        assert_eq!(first.fetch_track_count.as_deref(), Some("alb"));

        let second = apply_snapshot(&mut m, snap("1", true), now);
        assert!(second.fetch_artwork.is_none());
        assert!(second.fetch_track_count.is_none());
        assert!(second.redraw);
    }

    #[test]
    fn test_new_key_always_invalidates() {
        let mut m = PlaybackModel::default();
        let now = Instant::now();
        apply_snapshot(&mut m, snap("1", true), now);
        apply_track_count(&mut m, "alb", Some(12));
        let fx = apply_snapshot(&mut m, snap("2", true), now);
        assert_eq!(fx.fetch_artwork.map(|r| r.path).as_deref(), Some("/art/2"));
        assert_eq!(fx.fetch_track_count.as_deref(), Some("alb"));
        assert_eq!(m.album_track_count, None);
    }

    #[test]
    fn test_key_only_triggers_metadata_once() {
        let mut m = PlaybackModel::default();
        let now = Instant::now();
        let fx = apply_snapshot(&mut m, snap("9", false), now);
        assert_eq!(fx.fetch_metadata.map(|r| r.key).as_deref(), Some("9"));
        let fx = apply_snapshot(&mut m, snap("9", false), now);
        assert!(fx.fetch_metadata.is_none());

        let fx = apply_metadata(&mut m, "9", track("9", "alb", "/art/9"));
        assert!(fx.fetch_artwork.is_some());
        assert_eq!(m.track.as_ref().map(|t| t.key.as_str()), Some("9"));

        let stale = apply_metadata(&mut m, "8", track("8", "x", "/art/8"));
        assert_eq!(stale, Effects::default());
    }

    #[test]
    fn test_stopped_reading_clears_everything() {
        let mut m = PlaybackModel::default();
        let now = Instant::now();
        apply_snapshot(&mut m, snap("1", true), now);
        apply_artwork(
            &mut m,
            "/art/1",
            Some(Artwork {
                image: std::sync::Arc::new(image::RgbaImage::new(1, 1)),
                dominant: crate::render::color::Color(1, 2, 3),
            }),
        );

        let fx = apply_reading(&mut m, None, now + Duration::from_secs(1));
        assert!(fx.redraw);
        assert_eq!(m.state, PlaybackState::Stopped);
        assert!(m.track.is_none());
        assert_eq!(m.position_ms(), 0);
        assert_eq!(m.duration_ms, 0);
        assert!(!m.shuffle);
        assert_eq!(m.repeat, RepeatMode::Off);
        assert!(m.artwork.is_none());
        assert!(m.artwork_path.is_none());
        assert_eq!(m.dominant_color, DEFAULT_ACCENT);
        assert_eq!(m.volume, 70);

        let again = apply_reading(&mut m, None, now);
        assert!(!again.redraw);
    }

    #[test]
    fn test_position_clamped_and_paused_not_anchored() {
        let mut m = PlaybackModel::default();
        let mut s = snap("1", true);
        s.state = PlaybackState::Paused;
        s.position_ms = 500_000;
        apply_snapshot(&mut m, s, Instant::now());
        assert_eq!(m.position_ms(), 100_000);
        assert!(!m.estimate.is_anchored());
    }

    #[test]
    fn test_artwork_for_old_path_is_ignored() {
        let mut m = PlaybackModel::default();
        apply_snapshot(&mut m, snap("1", true), Instant::now());
        assert!(!apply_artwork(&mut m, "/art/other", None));
        assert!(apply_artwork(&mut m, "/art/1", None));
        assert_eq!(m.dominant_color, DEFAULT_ACCENT);
    }
}
