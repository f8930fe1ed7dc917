//! Touch-strip feedback: label, a text pixmap and a progress pixmap.
//!
//! The host keeps a structural layout per strip; callers compare
//! [`StripFrame::layout_key`] against what they last sent and only push
//! `setFeedbackLayout` on change.  The feedback content goes out every time.

use std::time::Duration;

use ampdeck_proto::protocol::{FeedbackPayload, Layout, LayoutFont, LayoutItem, LAYOUT_ID};
use ampdeck_proto::settings::{DisplayMode, SurfaceSettings};
use ampdeck_proto::state::PlaybackState;
use image::RgbaImage;
use tokio::time::Instant;

use super::canvas::{canvas, data_url, fill_polygon, fill_rect, Align, Painter};
use super::color::{secondary_for_strip, Color, TRACK_BG, WHITE};
use super::{format_time, RenderState};

pub const STRIP_WIDTH: u32 = 200;
const BAR_HEIGHT: u32 = 4;
const BAR_TOP: u32 = 82;
const LABEL_TOP: u32 = 15;

/// Text wider than this scrolls.
const SCROLL_THRESHOLD: f32 = 190.0;
const SCROLL_SPEED: f32 = 30.0;
const SCROLL_PAUSE: Duration = Duration::from_millis(2000);
const SCROLL_GAP: f32 = 40.0;

pub const OVERLAY_PLAYING: &str = "PLAYING";
pub const OVERLAY_PAUSED: &str = "PAUSED";

/// Marquee position for one strip.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollState {
    pub offset: f32,
    pub paused: bool,
    pub pause_start: Instant,
    pub last_tick: Instant,
    pub text: String,
}

impl ScrollState {
    pub fn new(text: &str, now: Instant) -> Self {
        Self {
            offset: 0.0,
            paused: true,
            pause_start: now,
            last_tick: now,
            text: text.to_string(),
        }
    }

    /// Step the marquee to `now` and return the offset to draw at.
    pub fn advance(&mut self, text: &str, text_width: f32, now: Instant) -> f32 {
        if self.text != text {
            self.offset = 0.0;
            self.paused = true;
            self.pause_start = now;
            self.text = text.to_string();
        }
        let max_offset = text_width - STRIP_WIDTH as f32 + SCROLL_GAP;
        let dt = now.saturating_duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;

        if self.paused {
            if now.saturating_duration_since(self.pause_start) >= SCROLL_PAUSE {
                self.paused = false;
            }
        } else {
            self.offset += SCROLL_SPEED * dt;
            if self.offset >= max_offset {
                self.offset = 0.0;
                self.paused = true;
                self.pause_start = now;
            }
        }
        self.offset
    }
}

/// Transient strip message shown after dial and touch input.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub text: String,
    pub subtext: String,
    pub expires: Instant,
}

impl Overlay {
    pub fn new(text: impl Into<String>, subtext: impl Into<String>, expires: Instant) -> Self {
        Self {
            text: text.into(),
            subtext: subtext.into(),
            expires,
        }
    }

    pub fn is_play_pause(&self) -> bool {
        self.text == OVERLAY_PLAYING || self.text == OVERLAY_PAUSED
    }
}

/// One strip render: the memo key, the layout it stands for, and content.
#[derive(Debug, Clone, PartialEq)]
pub struct StripFrame {
    pub layout_key: String,
    pub layout: Layout,
    pub feedback: FeedbackPayload,
}

fn label_size(font_size: u32) -> u32 {
    14.max((font_size as f32 * 0.85).round() as u32)
}

fn layout(label_color: String, label_size: u32, text_h: u32) -> Layout {
    Layout {
        id: LAYOUT_ID.to_string(),
        items: vec![
            LayoutItem::Text {
                key: "label".into(),
                rect: [0, LABEL_TOP, STRIP_WIDTH, label_size + 4],
                font: LayoutFont {
                    size: label_size,
                    weight: 700,
                },
                color: label_color,
                alignment: "center".into(),
            },
            LayoutItem::Pixmap {
                key: "displayText".into(),
                rect: [0, LABEL_TOP + label_size + 8, STRIP_WIDTH, text_h],
            },
            LayoutItem::Pixmap {
                key: "progressBar".into(),
                rect: [0, BAR_TOP, STRIP_WIDTH, BAR_HEIGHT],
            },
        ],
    }
}

fn display_text(mode: DisplayMode, rs: &RenderState<'_>) -> String {
    let Some(track) = rs.track else {
        return match mode {
            DisplayMode::Time => "0:00 / 0:00".to_string(),
            _ => "Not Playing".to_string(),
        };
    };
    let or_unknown = |s: &str| {
        if s.is_empty() {
            "Unknown".to_string()
        } else {
            s.to_string()
        }
    };
    match mode {
        DisplayMode::Artist => or_unknown(&track.artist),
        DisplayMode::Album => or_unknown(&track.album),
        DisplayMode::Track => or_unknown(&track.title),
        DisplayMode::Time => format!(
            "{} / {}",
            format_time(rs.position_ms),
            format_time(rs.duration_ms)
        ),
    }
}

/// Normal strip content.  `scroll` is created, advanced or dropped as the
/// text width requires.
pub fn render_strip(
    painter: &Painter,
    settings: &SurfaceSettings,
    rs: &RenderState<'_>,
    scroll: &mut Option<ScrollState>,
    now: Instant,
) -> Result<StripFrame, image::ImageError> {
    let mode = settings.display_mode();
    let font_size = settings.font_size();
    let label_size = label_size(font_size);
    let text_h = font_size + 8;

    let secondary = secondary_for_strip(rs.text_color);
    let label_color = if rs.state == PlaybackState::Paused {
        secondary.hex()
    } else {
        rs.text_color.to_string()
    };

    let layout_key = format!("px|{}|{}|{}", label_color, label_size, text_h);
    let layout = layout(label_color, label_size, text_h);

    let text = display_text(mode, rs);
    let size = font_size as f32;
    let width = painter.measure(&text, size);
    let mut img = canvas(STRIP_WIDTH, text_h, None);
    if width > SCROLL_THRESHOLD {
        let state = scroll.get_or_insert_with(|| ScrollState::new(&text, now));
        let offset = state.advance(&text, width, now);
        painter.text_top(&mut img, &text, -offset, 2.0, size, secondary, Align::Left);
    } else {
        *scroll = None;
        painter.text_top(
            &mut img,
            &text,
            STRIP_WIDTH as f32 / 2.0,
            2.0,
            size,
            secondary,
            Align::Center,
        );
    }

    let bar = progress_segment(
        settings.progress_position(),
        settings.progress_total_panels(),
        rs.progress,
        rs.accent,
    );

    Ok(StripFrame {
        layout_key,
        layout,
        feedback: FeedbackPayload {
            label: mode.label().to_string(),
            display_text: data_url(&img)?,
            progress_bar: data_url(&bar)?,
        },
    })
}

/// Overlay strip content.  Play/pause overlays draw an icon, the rest a
/// bold line of text; volume overlays fill the bar with the level.
pub fn render_overlay(
    painter: &Painter,
    settings: &SurfaceSettings,
    rs: &RenderState<'_>,
    overlay: &Overlay,
) -> Result<StripFrame, image::ImageError> {
    let font_size = settings.font_size();
    let label_size = label_size(font_size);
    let play_pause = overlay.is_play_pause();
    let accent = rs.accent.hex();

    let layout_key = format!(
        "overlay|{}|{}|{}|{}",
        accent,
        label_size,
        font_size,
        if play_pause { "pp" } else { "std" }
    );
    let sub_h = font_size + 16;
    let layout = layout(accent, label_size, sub_h);

    let mut img = canvas(STRIP_WIDTH, sub_h, None);
    if play_pause {
        draw_play_pause_icon(&mut img, overlay.text == OVERLAY_PLAYING);
    } else {
        painter.text_middle(
            &mut img,
            &overlay.subtext,
            STRIP_WIDTH as f32 / 2.0,
            sub_h as f32 / 2.0,
            font_size as f32,
            WHITE,
            Align::Center,
        );
    }

    let mut bar = canvas(STRIP_WIDTH, BAR_HEIGHT, Some(TRACK_BG));
    if overlay.text == "VOLUME" {
        let fill = (rs.volume as f32 / 100.0 * STRIP_WIDTH as f32).round();
        fill_rect(&mut bar, 0.0, 0.0, fill, BAR_HEIGHT as f32, rs.accent);
    }

    Ok(StripFrame {
        layout_key,
        layout,
        feedback: FeedbackPayload {
            label: overlay.text.clone(),
            display_text: data_url(&img)?,
            progress_bar: data_url(&bar)?,
        },
    })
}

/// Pause bars while playing, a play triangle while paused.
fn draw_play_pause_icon(img: &mut RgbaImage, playing: bool) {
    let h = img.height() as f32;
    let icon = (h - 4.0).min(24.0);
    let (cx, cy) = (STRIP_WIDTH as f32 / 2.0, h / 2.0);
    if playing {
        let bar_w = (icon * 0.25).round();
        let gap = (icon * 0.2).round();
        fill_rect(img, cx - gap - bar_w, cy - icon / 2.0, bar_w, icon, WHITE);
        fill_rect(img, cx + gap, cy - icon / 2.0, bar_w, icon, WHITE);
    } else {
        let tri_w = (icon * 0.8).round();
        fill_polygon(
            img,
            &[
                (cx - tri_w / 2.0, cy - icon / 2.0),
                (cx + tri_w / 2.0, cy),
                (cx - tri_w / 2.0, cy + icon / 2.0),
            ],
            WHITE,
        );
    }
}

/// Fill width of panel `position` out of `total` for `progress` percent.
pub fn segment_fill(position: u32, total: u32, progress: f64) -> u32 {
    if position == 0 || position > total {
        return 0;
    }
    let seg = 100.0 / total as f64;
    let start = (position - 1) as f64 * seg;
    let end = position as f64 * seg;
    if progress <= start {
        return 0;
    }
    ((progress.min(end) - start) / seg * STRIP_WIDTH as f64).round() as u32
}

/// The 200×4 progress pixmap for one panel of a multi-strip bar.
pub fn progress_segment(position: u32, total: u32, progress: f64, accent: Color) -> RgbaImage {
    let mut bar = canvas(STRIP_WIDTH, BAR_HEIGHT, Some(TRACK_BG));
    let fill = segment_fill(position, total, progress);
    fill_rect(&mut bar, 0.0, 0.0, fill as f32, BAR_HEIGHT as f32, accent);
    bar
}
