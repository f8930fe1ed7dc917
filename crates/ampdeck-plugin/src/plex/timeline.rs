//! The player's timeline poll response.
//!
//! ```xml
//! <MediaContainer commandID="4">
//!   <Timeline type="music" state="playing" time="1200" duration="240000"
//!             volume="80" ratingKey="501" shuffle="0" repeat="2"
//!             machineIdentifier="..." address="..." port="32400"
//!             protocol="http" token="...">
//!     <Track ratingKey="501" title="..." ...>
//!       <Media audioCodec="flac" bitrate="1411"><Part><Stream samplingRate="44100" bitDepth="16"/></Part></Media>
//!     </Track>
//!   </Timeline>
//!   <Timeline type="video" state="stopped"/>
//! </MediaContainer>
//! ```
//!
//! Attributes are kept as strings and parsed leniently; a malformed number
//! reads as absent rather than failing the whole document.

use ampdeck_proto::settings::parse_leading_int;
use ampdeck_proto::state::{
    PlaybackState, RepeatMode, ServerHint, SessionSnapshot, SnapshotSource, TrackIdentity,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct Container {
    #[serde(rename = "Timeline", default)]
    timelines: Vec<TimelineXml>,
}

#[derive(Debug, Default, Deserialize)]
struct TimelineXml {
    #[serde(rename = "@type", default)]
    kind: Option<String>,
    #[serde(rename = "@state", default)]
    state: Option<String>,
    #[serde(rename = "@time", default)]
    time: Option<String>,
    #[serde(rename = "@duration", default)]
    duration: Option<String>,
    #[serde(rename = "@volume", default)]
    volume: Option<String>,
    #[serde(rename = "@ratingKey", default)]
    rating_key: Option<String>,
    #[serde(rename = "@shuffle", default)]
    shuffle: Option<String>,
    #[serde(rename = "@repeat", default)]
    repeat: Option<String>,
    #[serde(rename = "@machineIdentifier", default)]
    machine_identifier: Option<String>,
    #[serde(rename = "@address", default)]
    address: Option<String>,
    #[serde(rename = "@port", default)]
    port: Option<String>,
    #[serde(rename = "@protocol", default)]
    protocol: Option<String>,
    #[serde(rename = "@token", default)]
    token: Option<String>,
    #[serde(rename = "Track", default)]
    tracks: Vec<TrackXml>,
}

#[derive(Debug, Default, Deserialize)]
struct TrackXml {
    #[serde(rename = "@ratingKey", default)]
    rating_key: Option<String>,
    #[serde(rename = "@parentRatingKey", default)]
    parent_rating_key: Option<String>,
    #[serde(rename = "@title", default)]
    title: Option<String>,
    #[serde(rename = "@grandparentTitle", default)]
    grandparent_title: Option<String>,
    #[serde(rename = "@parentTitle", default)]
    parent_title: Option<String>,
    #[serde(rename = "@index", default)]
    index: Option<String>,
    #[serde(rename = "@thumb", default)]
    thumb: Option<String>,
    #[serde(rename = "@parentThumb", default)]
    parent_thumb: Option<String>,
    #[serde(rename = "@grandparentThumb", default)]
    grandparent_thumb: Option<String>,
    #[serde(rename = "Media", default)]
    media: Vec<MediaXml>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaXml {
    #[serde(rename = "@audioCodec", default)]
    audio_codec: Option<String>,
    #[serde(rename = "@bitrate", default)]
    bitrate: Option<String>,
    #[serde(rename = "Part", default)]
    parts: Vec<PartXml>,
}

#[derive(Debug, Default, Deserialize)]
struct PartXml {
    #[serde(rename = "Stream", default)]
    streams: Vec<StreamXml>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamXml {
    #[serde(rename = "@samplingRate", default)]
    sampling_rate: Option<String>,
    #[serde(rename = "@bitDepth", default)]
    bit_depth: Option<String>,
}

fn int(s: &Option<String>) -> Option<i64> {
    s.as_deref().and_then(parse_leading_int)
}

fn positive(s: &Option<String>) -> Option<u32> {
    int(s).filter(|v| *v > 0).map(|v| v.min(u32::MAX as i64) as u32)
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.clone().filter(|v| !v.is_empty())
}

/// Parse a poll response.  `Ok(None)` means no music session: either no
/// `Timeline` of type `music`, or one in state `stopped`.
pub fn parse_timeline(xml: &str) -> Result<Option<SessionSnapshot>, quick_xml::DeError> {
    let container: Container = quick_xml::de::from_str(xml)?;
    let Some(music) = container
        .timelines
        .into_iter()
        .find(|t| t.kind.as_deref() == Some("music"))
    else {
        return Ok(None);
    };

    let state_raw = music.state.as_deref().unwrap_or("stopped");
    if state_raw == "stopped" {
        return Ok(None);
    }

    let player_id = non_empty(&music.machine_identifier);
    let track = music
        .tracks
        .first()
        .map(|t| track_identity(t, player_id.clone()));

    Ok(Some(SessionSnapshot {
        source: SnapshotSource::Player,
        state: PlaybackState::from_wire(state_raw),
        position_ms: int(&music.time).unwrap_or(0),
        duration_ms: int(&music.duration).unwrap_or(0),
        volume: int(&music.volume).map(|v| v.clamp(0, 100) as u8),
        shuffle: music.shuffle.as_ref().map(|_| int(&music.shuffle).unwrap_or(0) != 0),
        repeat: music
            .repeat
            .as_ref()
            .map(|_| RepeatMode::from_wire(int(&music.repeat).unwrap_or(0))),
        track_key: non_empty(&music.rating_key),
        player_id,
        track,
        server_hint: server_hint(&music),
    }))
}

fn server_hint(t: &TimelineXml) -> Option<ServerHint> {
    let address = non_empty(&t.address)?;
    let protocol = non_empty(&t.protocol)?;
    let token = non_empty(&t.token)?;
    let port = int(&t.port).and_then(|p| u16::try_from(p).ok())?;
    Some(ServerHint {
        protocol,
        address,
        port,
        token,
    })
}

fn track_identity(t: &TrackXml, player_id: Option<String>) -> TrackIdentity {
    let media = t.media.first();
    let stream = media
        .and_then(|m| m.parts.first())
        .and_then(|p| p.streams.first());
    TrackIdentity {
        key: t.rating_key.clone().unwrap_or_default(),
        album_key: non_empty(&t.parent_rating_key),
        title: non_empty(&t.title).unwrap_or_else(|| "Unknown".into()),
        artist: non_empty(&t.grandparent_title).unwrap_or_else(|| "Unknown".into()),
        album: non_empty(&t.parent_title).unwrap_or_else(|| "Unknown".into()),
        index: positive(&t.index),
        codec: media.and_then(|m| non_empty(&m.audio_codec)),
        bitrate_kbps: media.and_then(|m| positive(&m.bitrate)),
        sample_rate_hz: stream.and_then(|s| positive(&s.sampling_rate)),
        bit_depth: stream.and_then(|s| positive(&s.bit_depth)),
        artwork: TrackIdentity::pick_artwork(&[
            t.thumb.as_deref(),
            t.parent_thumb.as_deref(),
            t.grandparent_thumb.as_deref(),
        ]),
        player_id,
    }
}
