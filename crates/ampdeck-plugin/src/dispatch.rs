//! Turning user intents into player commands.
//!
//! Planning is synchronous and updates the model optimistically, so a second
//! press steps from the value the first one asked for.  Sending happens on a
//! spawned task through [`crate::plex::PlexClient::send_command`].

use ampdeck_proto::state::PlaybackState;
use tokio::time::Instant;

use crate::model::{PlaybackModel, DEFAULT_VOLUME};
use crate::plex::PlannedCommand;

pub const VOLUME_STEP: i64 = 5;

const PLAY: &str = "/player/playback/play";
const PAUSE: &str = "/player/playback/pause";
const SKIP_NEXT: &str = "/player/playback/skipNext";
const SKIP_PREVIOUS: &str = "/player/playback/skipPrevious";
const SEEK_TO: &str = "/player/playback/seekTo";
const SET_PARAMETERS: &str = "/player/playback/setParameters";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    TogglePlayPause,
    SkipNext,
    SkipPrevious,
    /// Relative seek in milliseconds.
    Seek(i64),
    /// Volume change in steps of [`VOLUME_STEP`] (dial ticks or ±1 for keys).
    Volume(i64),
    Mute,
    ToggleShuffle,
    CycleRepeat,
}

/// What to apply locally once the command has been delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    Seek(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub command: PlannedCommand,
    pub landing: Option<Landing>,
}

impl From<PlannedCommand> for Dispatch {
    fn from(command: PlannedCommand) -> Self {
        Self {
            command,
            landing: None,
        }
    }
}

/// Plan `intent` against the model.  `None` means there is nothing to send.
pub fn plan(model: &mut PlaybackModel, intent: Intent, now: Instant) -> Option<Dispatch> {
    match intent {
        Intent::TogglePlayPause => toggle_play_pause(model, now),
        Intent::SkipNext => Some(PlannedCommand::new(SKIP_NEXT).into()),
        Intent::SkipPrevious => Some(PlannedCommand::new(SKIP_PREVIOUS).into()),
        Intent::Seek(offset) => {
            let target = seek_target(model.tick(now), model.duration_ms, offset);
            Some(Dispatch {
                command: PlannedCommand::new(SEEK_TO).with("offset", target),
                landing: Some(Landing::Seek(target)),
            })
        }
        Intent::Volume(steps) => {
            let level = step_volume(model.volume, steps);
            model.volume = level;
            Some(PlannedCommand::new(SET_PARAMETERS).with("volume", level).into())
        }
        Intent::Mute => {
            let level = mute_target(model);
            model.volume = level;
            Some(PlannedCommand::new(SET_PARAMETERS).with("volume", level).into())
        }
        Intent::ToggleShuffle => {
            model.shuffle = !model.shuffle;
            Some(
                PlannedCommand::new(SET_PARAMETERS)
                    .with("shuffle", u8::from(model.shuffle))
                    .into(),
            )
        }
        Intent::CycleRepeat => {
            model.repeat = model.repeat.next();
            Some(
                PlannedCommand::new(SET_PARAMETERS)
                    .with("repeat", model.repeat.as_wire())
                    .into(),
            )
        }
    }
}

fn toggle_play_pause(model: &mut PlaybackModel, now: Instant) -> Option<Dispatch> {
    let path = match model.state {
        PlaybackState::Stopped => return None,
        PlaybackState::Playing => PAUSE,
        PlaybackState::Paused => PLAY,
    };
    model.tick(now);
    model.state = if path == PAUSE {
        PlaybackState::Paused
    } else {
        PlaybackState::Playing
    };
    model.estimate.set_playing(model.state.is_playing(), now);
    Some(PlannedCommand::new(path).into())
}

/// Apply a landing after delivery.
pub fn land(model: &mut PlaybackModel, landing: Landing, now: Instant) {
    match landing {
        Landing::Seek(target) => {
            model.estimate.set(target, model.state.is_playing(), now);
        }
    }
}

/// `position + offset`, clamped to `[0, duration]`.
pub fn seek_target(position_ms: i64, duration_ms: i64, offset_ms: i64) -> i64 {
    (position_ms + offset_ms).min(duration_ms).max(0)
}

pub fn step_volume(volume: u8, steps: i64) -> u8 {
    (volume as i64 + steps * VOLUME_STEP).clamp(0, 100) as u8
}

/// Mute remembers the current level; unmute restores it (or the default).
fn mute_target(model: &mut PlaybackModel) -> u8 {
    if model.volume > 0 {
        model.previous_volume = model.volume;
        0
    } else if model.previous_volume > 0 {
        model.previous_volume
    } else {
        DEFAULT_VOLUME
    }
}
