//! Press, hold and dial classification.
//!
//! A key press on a hold-capable key arms a timer task.  If the key is still
//! down when it fires, the core receives [`CoreEvent::HoldElapsed`] and runs
//! the hold action; seek holds keep posting [`CoreEvent::HoldRepeat`] until
//! release aborts the task.  Events carry the press generation so a late
//! event from an earlier press is ignored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ampdeck_proto::protocol::SurfaceKind;
use ampdeck_proto::settings::{DialAction, DialPressAction, SurfaceSettings};
use ampdeck_proto::state::PlaybackState;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::core::CoreEvent;
use crate::dispatch::Intent;
use crate::model::PlaybackModel;
use crate::render::strip::{OVERLAY_PAUSED, OVERLAY_PLAYING};

static NEXT_PRESS: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy)]
pub struct HoldTiming {
    pub threshold: Duration,
    pub repeat: Duration,
    pub seek_step_ms: i64,
}

/// One key press in progress.
#[derive(Debug)]
pub struct HoldState {
    pub generation: u64,
    /// The hold action has run; release must not fire the tap action.
    pub confirmed: bool,
    timer: Option<AbortHandle>,
}

impl HoldState {
    pub fn cancel(&self) {
        if let Some(t) = &self.timer {
            t.abort();
        }
    }
}

/// Key-down: remember the press and, for hold-capable keys, arm the timer.
pub fn press(
    context: &str,
    kind: SurfaceKind,
    timing: HoldTiming,
    tx: &mpsc::Sender<CoreEvent>,
) -> HoldState {
    let generation = NEXT_PRESS.fetch_add(1, Ordering::Relaxed);
    let timer = kind.supports_hold().then(|| {
        let tx = tx.clone();
        let context = context.to_string();
        let repeats = repeats(kind);
        tokio::spawn(async move {
            tokio::time::sleep(timing.threshold).await;
            let elapsed = CoreEvent::HoldElapsed {
                context: context.clone(),
                generation,
            };
            if tx.send(elapsed).await.is_err() || !repeats {
                return;
            }
            loop {
                tokio::time::sleep(timing.repeat).await;
                let again = CoreEvent::HoldRepeat {
                    context: context.clone(),
                    generation,
                };
                if tx.send(again).await.is_err() {
                    break;
                }
            }
        })
        .abort_handle()
    });
    HoldState {
        generation,
        confirmed: false,
        timer,
    }
}

/// Key-up: stop the timer and decide whether the press was a tap.
pub fn release(hold: Option<HoldState>, kind: SurfaceKind) -> Option<Intent> {
    if let Some(h) = &hold {
        h.cancel();
        if h.confirmed {
            return None;
        }
    }
    tap_intent(kind)
}

pub fn tap_intent(kind: SurfaceKind) -> Option<Intent> {
    match kind {
        SurfaceKind::AlbumArt | SurfaceKind::PlayPause => Some(Intent::TogglePlayPause),
        SurfaceKind::Previous => Some(Intent::SkipPrevious),
        SurfaceKind::Next => Some(Intent::SkipNext),
        SurfaceKind::Shuffle => Some(Intent::ToggleShuffle),
        SurfaceKind::Repeat => Some(Intent::CycleRepeat),
        SurfaceKind::VolumeUp => Some(Intent::Volume(1)),
        SurfaceKind::VolumeDown => Some(Intent::Volume(-1)),
        SurfaceKind::Info | SurfaceKind::Time | SurfaceKind::Strip => None,
    }
}

pub fn hold_intent(kind: SurfaceKind, seek_step_ms: i64) -> Option<Intent> {
    match kind {
        SurfaceKind::Previous => Some(Intent::Seek(-seek_step_ms)),
        SurfaceKind::Next => Some(Intent::Seek(seek_step_ms)),
        SurfaceKind::VolumeDown => Some(Intent::Mute),
        _ => None,
    }
}

fn repeats(kind: SurfaceKind) -> bool {
    matches!(kind, SurfaceKind::Previous | SurfaceKind::Next)
}

pub fn rotate_intent(settings: &SurfaceSettings, ticks: i64) -> Option<Intent> {
    match settings.dial_action() {
        DialAction::None => None,
        DialAction::Skip if ticks > 0 => Some(Intent::SkipNext),
        DialAction::Skip if ticks < 0 => Some(Intent::SkipPrevious),
        DialAction::Skip => None,
        DialAction::Volume => Some(Intent::Volume(ticks)),
    }
}

/// Dial presses only act when the dial has a rotation binding.
pub fn dial_press_intent(settings: &SurfaceSettings) -> Option<Intent> {
    if settings.dial_action() == DialAction::None {
        return None;
    }
    Some(match settings.dial_press_action() {
        DialPressAction::PlayPause => Intent::TogglePlayPause,
        DialPressAction::Shuffle => Intent::ToggleShuffle,
        DialPressAction::Repeat => Intent::CycleRepeat,
    })
}

/// Overlay shown on a strip after `intent` was planned against `model`.
pub fn overlay_for(intent: Intent, model: &PlaybackModel) -> Option<(&'static str, String)> {
    match intent {
        Intent::SkipNext => Some(("NEXT", "▶▶".to_string())),
        Intent::SkipPrevious => Some(("PREVIOUS", "◀◀".to_string())),
        Intent::Volume(_) => Some(("VOLUME", format!("{}%", model.volume))),
        Intent::TogglePlayPause => {
            let text = if model.state == PlaybackState::Playing {
                OVERLAY_PLAYING
            } else {
                OVERLAY_PAUSED
            };
            Some((text, String::new()))
        }
        Intent::ToggleShuffle => {
            let on = if model.shuffle { "ON" } else { "OFF" };
            Some(("SHUFFLE", on.to_string()))
        }
        Intent::CycleRepeat => Some(("REPEAT", model.repeat.label().to_string())),
        Intent::Seek(_) | Intent::Mute => None,
    }
}
