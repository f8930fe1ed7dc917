use ampdeck_proto::protocol::SurfaceKind;
use ampdeck_proto::state::{PlaybackState, RepeatMode};
use image::RgbaImage;

use super::canvas::{
    canvas, dim, fill_polygon, fill_rect, quad_curve, stroke_path, Align, Painter,
};
use super::color::{parse_or_white, secondary_for_key, Color, BLACK, DIM, TRACK_BG, WHITE};
use super::{format_time, RenderState, KEY_SIZE};

const CENTER: f32 = KEY_SIZE as f32 / 2.0;
const PLAY_TRIANGLE: [(f32, f32); 3] = [(50.0, 42.0), (110.0, 72.0), (50.0, 102.0)];
const ICON_STROKE: f32 = 6.0;

/// Draw a key, or `None` for kinds that keep their static icon.
pub fn render_key(painter: &Painter, kind: SurfaceKind, rs: &RenderState<'_>) -> Option<RgbaImage> {
    if !kind.is_drawn() {
        return None;
    }
    let img = match kind {
        SurfaceKind::AlbumArt => album_art(painter, rs),
        SurfaceKind::PlayPause => play_pause(rs),
        SurfaceKind::Info => info(painter, rs),
        SurfaceKind::Time => time(painter, rs),
        SurfaceKind::Shuffle => shuffle(painter, rs),
        SurfaceKind::Repeat => repeat(painter, rs),
        _ => return None,
    };
    Some(img)
}

fn blank() -> RgbaImage {
    canvas(KEY_SIZE, KEY_SIZE, Some(BLACK))
}

fn album_art(painter: &Painter, rs: &RenderState<'_>) -> RgbaImage {
    let mut img = blank();
    let Some(art) = rs.artwork else {
        painter.text_baseline(&mut img, "No Track", CENTER, 76.0, 14.0, DIM, Align::Center);
        return img;
    };
    image::imageops::overlay(&mut img, art, 0, 0);
    if rs.state == PlaybackState::Paused {
        dim(&mut img, 0.4);
        fill_rect(&mut img, 52.0, 47.0, 14.0, 50.0, WHITE);
        fill_rect(&mut img, 78.0, 47.0, 14.0, 50.0, WHITE);
    }
    img
}

fn play_pause(rs: &RenderState<'_>) -> RgbaImage {
    let mut img = blank();
    let text = parse_or_white(rs.text_color);
    match rs.state {
        PlaybackState::Stopped => fill_polygon(&mut img, &PLAY_TRIANGLE, DIM),
        PlaybackState::Playing => {
            fill_rect(&mut img, 45.0, 42.0, 18.0, 60.0, text);
            fill_rect(&mut img, 81.0, 42.0, 18.0, 60.0, text);
        }
        PlaybackState::Paused => fill_polygon(&mut img, &PLAY_TRIANGLE, text),
    }
    img
}

fn info(painter: &Painter, rs: &RenderState<'_>) -> RgbaImage {
    let mut img = blank();
    let Some(track) = rs.track else {
        painter.text_baseline(&mut img, "No Track", CENTER, 76.0, 16.0, DIM, Align::Center);
        return img;
    };
    let text = parse_or_white(rs.text_color);
    let secondary = secondary_for_key(rs.text_color);

    let format = track
        .codec
        .as_deref()
        .map(str::to_uppercase)
        .unwrap_or_else(|| "---".to_string());
    let bitrate = track
        .bitrate_kbps
        .map(|b| format!("{} kbps", b))
        .unwrap_or_default();
    let index = track
        .index
        .map(|i| i.to_string())
        .unwrap_or_else(|| "?".into());
    let total = rs
        .album_track_count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".into());

    painter.text_baseline(&mut img, &format, CENTER, 42.0, 28.0, text, Align::Center);
    painter.text_baseline(&mut img, &bitrate, CENTER, 62.0, 14.0, secondary, Align::Center);
    painter.text_baseline(&mut img, "TRACK", CENTER, 95.0, 16.0, text, Align::Center);
    painter.text_baseline(
        &mut img,
        &format!("{}/{}", index, total),
        CENTER,
        125.0,
        28.0,
        rs.accent,
        Align::Center,
    );
    img
}

fn time(painter: &Painter, rs: &RenderState<'_>) -> RgbaImage {
    let mut img = blank();
    if rs.state == PlaybackState::Stopped {
        painter.text_baseline(&mut img, "0:00", CENTER, 55.0, 36.0, DIM, Align::Center);
        painter.text_baseline(&mut img, "/ 0:00", CENTER, 82.0, 20.0, DIM, Align::Center);
        fill_rect(&mut img, 15.0, 108.0, 114.0, 10.0, TRACK_BG);
        return img;
    }
    let text = parse_or_white(rs.text_color);
    let secondary = secondary_for_key(rs.text_color);
    painter.text_baseline(
        &mut img,
        &format_time(rs.position_ms),
        CENTER,
        55.0,
        36.0,
        text,
        Align::Center,
    );
    painter.text_baseline(
        &mut img,
        &format!("/ {}", format_time(rs.duration_ms)),
        CENTER,
        82.0,
        20.0,
        secondary,
        Align::Center,
    );
    fill_rect(&mut img, 15.0, 108.0, 114.0, 10.0, TRACK_BG);
    if rs.progress > 0.0 {
        let w = (rs.progress / 100.0 * 114.0) as f32;
        fill_rect(&mut img, 15.0, 108.0, w, 10.0, rs.accent);
    }
    img
}

fn shuffle(painter: &Painter, rs: &RenderState<'_>) -> RgbaImage {
    let mut img = blank();
    let icon = if rs.shuffle { WHITE } else { DIM };

    stroke_path(
        &mut img,
        &[(30.0, 52.0), (65.0, 52.0), (85.0, 86.0), (110.0, 86.0)],
        ICON_STROKE,
        icon,
    );
    stroke_path(
        &mut img,
        &[(30.0, 86.0), (65.0, 86.0), (85.0, 52.0), (110.0, 52.0)],
        ICON_STROKE,
        icon,
    );
    fill_polygon(&mut img, &[(105.0, 41.0), (120.0, 52.0), (105.0, 63.0)], icon);
    fill_polygon(&mut img, &[(105.0, 75.0), (120.0, 86.0), (105.0, 97.0)], icon);

    if rs.shuffle {
        painter.text_baseline(&mut img, "ON", CENTER, 130.0, 16.0, rs.accent, Align::Center);
    }
    img
}

/// Rounded-rectangle loop used by the repeat key.
fn repeat_loop() -> Vec<(f32, f32)> {
    const STEPS: usize = 6;
    let mut pts = vec![(35.0, 48.0), (105.0, 48.0)];
    pts.extend(quad_curve((105.0, 48.0), (118.0, 48.0), (118.0, 61.0), STEPS));
    pts.push((118.0, 75.0));
    pts.extend(quad_curve((118.0, 75.0), (118.0, 88.0), (105.0, 88.0), STEPS));
    pts.push((35.0, 88.0));
    pts.extend(quad_curve((35.0, 88.0), (22.0, 88.0), (22.0, 75.0), STEPS));
    pts.push((22.0, 61.0));
    pts.extend(quad_curve((22.0, 61.0), (22.0, 48.0), (35.0, 48.0), STEPS));
    pts
}

fn repeat(painter: &Painter, rs: &RenderState<'_>) -> RgbaImage {
    let mut img = blank();
    let on = rs.repeat != RepeatMode::Off;
    let icon: Color = if on { WHITE } else { DIM };

    stroke_path(&mut img, &repeat_loop(), ICON_STROKE, icon);
    fill_polygon(&mut img, &[(95.0, 33.0), (115.0, 48.0), (95.0, 63.0)], icon);

    if rs.repeat == RepeatMode::One {
        painter.text_baseline(
            &mut img,
            "1",
            70.0,
            78.0,
            28.0,
            secondary_for_key(rs.text_color),
            Align::Center,
        );
    }
    if on {
        painter.text_baseline(
            &mut img,
            rs.repeat.label(),
            CENTER,
            128.0,
            16.0,
            rs.accent,
            Align::Center,
        );
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::color::DEFAULT_ACCENT;
    use ampdeck_proto::state::TrackIdentity;

    fn state<'a>(track: Option<&'a TrackIdentity>) -> RenderState<'a> {
        RenderState {
            state: PlaybackState::Stopped,
            track,
            position_ms: 0,
            duration_ms: 0,
            progress: 0.0,
            volume: 50,
            shuffle: false,
            repeat: RepeatMode::Off,
            album_track_count: None,
            artwork: None,
            text_color: "#FFFFFF",
            accent: DEFAULT_ACCENT,
        }
    }

    fn px(img: &RgbaImage, x: u32, y: u32) -> [u8; 4] {
        img.get_pixel(x, y).0
    }

    #[test]
    fn test_static_kinds_are_not_drawn() {
        let p = Painter::without_font();
        let rs = state(None);
        assert!(render_key(&p, SurfaceKind::Next, &rs).is_none());
        assert!(render_key(&p, SurfaceKind::VolumeDown, &rs).is_none());
        assert!(render_key(&p, SurfaceKind::Strip, &rs).is_none());
        let img = render_key(&p, SurfaceKind::Time, &rs).unwrap();
        assert_eq!(img.dimensions(), (KEY_SIZE, KEY_SIZE));
    }

    #[test]
    fn test_play_pause_icons() {
        let p = Painter::without_font();
        let mut rs = state(None);

        let stopped = render_key(&p, SurfaceKind::PlayPause, &rs).unwrap();
        assert_eq!(px(&stopped, 60, 72), [0x33, 0x33, 0x33, 255]);

        rs.state = PlaybackState::Playing;
        let playing = render_key(&p, SurfaceKind::PlayPause, &rs).unwrap();
        assert_eq!(px(&playing, 50, 70), [255, 255, 255, 255]);
        assert_eq!(px(&playing, 72, 70), [0, 0, 0, 255]);

        rs.state = PlaybackState::Paused;
        rs.text_color = "#E5A00D";
        let paused = render_key(&p, SurfaceKind::PlayPause, &rs).unwrap();
        assert_eq!(px(&paused, 60, 72), [0xE5, 0xA0, 0x0D, 255]);
    }

    #[test]
    fn test_time_bar_fills_with_accent() {
        let p = Painter::without_font();
        let mut rs = state(None);
        rs.state = PlaybackState::Playing;
        rs.progress = 50.0;
        rs.accent = Color(10, 20, 30);
        let img = render_key(&p, SurfaceKind::Time, &rs).unwrap();
        assert_eq!(px(&img, 20, 112), [10, 20, 30, 255]);
        assert_eq!(px(&img, 120, 112), [0x33, 0x33, 0x33, 255]);
    }

    #[test]
    fn test_paused_album_art_is_dimmed_with_bars() {
        let p = Painter::without_font();
        let art = RgbaImage::from_pixel(KEY_SIZE, KEY_SIZE, image::Rgba([100, 100, 100, 255]));
        let mut rs = state(None);
        rs.artwork = Some(&art);
        rs.state = PlaybackState::Paused;
        let img = render_key(&p, SurfaceKind::AlbumArt, &rs).unwrap();
        assert_eq!(px(&img, 5, 5), [60, 60, 60, 255]);
        assert_eq!(px(&img, 58, 70), [255, 255, 255, 255]);

        rs.state = PlaybackState::Playing;
        let img = render_key(&p, SurfaceKind::AlbumArt, &rs).unwrap();
        assert_eq!(px(&img, 58, 70), [100, 100, 100, 255]);
    }

    #[test]
    fn test_shuffle_icon_color_tracks_state() {
        let p = Painter::without_font();
        let mut rs = state(None);
        let off = render_key(&p, SurfaceKind::Shuffle, &rs).unwrap();
        assert_eq!(px(&off, 40, 52), [0x33, 0x33, 0x33, 255]);
        rs.shuffle = true;
        let on = render_key(&p, SurfaceKind::Shuffle, &rs).unwrap();
        assert_eq!(px(&on, 40, 52), [255, 255, 255, 255]);
    }
}
