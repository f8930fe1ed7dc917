//! JSON documents returned by the media server: session listings, library
//! metadata and album children all share the `MediaContainer.Metadata[]`
//! shape.

use ampdeck_proto::settings::{lenient_i64, lenient_string};
use ampdeck_proto::state::TrackIdentity;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(rename = "MediaContainer", default)]
    pub media_container: MediaContainer,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaContainer {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub size: Option<i64>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<MetadataItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataItem {
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rating_key: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub parent_rating_key: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub grandparent_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub parent_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub index: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub duration: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub view_offset: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub thumb: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub parent_thumb: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub grandparent_thumb: Option<String>,
    #[serde(rename = "Media", default)]
    pub media: Vec<Media>,
    #[serde(rename = "Player", default)]
    pub player: Option<Player>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(default, deserialize_with = "lenient_string")]
    pub audio_codec: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub bitrate: Option<i64>,
    #[serde(rename = "Part", default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Part {
    #[serde(rename = "Stream", default)]
    pub streams: Vec<Stream>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub sampling_rate: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub bit_depth: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub product: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub machine_identifier: Option<String>,
}

fn positive(n: Option<i64>) -> Option<u32> {
    n.filter(|v| *v > 0).map(|v| v.min(u32::MAX as i64) as u32)
}

impl MetadataItem {
    /// Build a track identity.  The player reference comes from the embedded
    /// `Player` unless the caller supplies one.
    pub fn to_track(&self, player_id: Option<String>) -> TrackIdentity {
        let media = self.media.first();
        let stream = media
            .and_then(|m| m.parts.first())
            .and_then(|p| p.streams.first());
        TrackIdentity {
            key: self.rating_key.clone().unwrap_or_default(),
            album_key: self.parent_rating_key.clone().filter(|s| !s.is_empty()),
            title: self.title.clone().unwrap_or_else(|| "Unknown".into()),
            artist: self
                .grandparent_title
                .clone()
                .unwrap_or_else(|| "Unknown".into()),
            album: self.parent_title.clone().unwrap_or_else(|| "Unknown".into()),
            index: positive(self.index),
            codec: media
                .and_then(|m| m.audio_codec.clone())
                .filter(|s| !s.is_empty()),
            bitrate_kbps: positive(media.and_then(|m| m.bitrate)),
            sample_rate_hz: positive(stream.and_then(|s| s.sampling_rate)),
            bit_depth: positive(stream.and_then(|s| s.bit_depth)),
            artwork: TrackIdentity::pick_artwork(&[
                self.thumb.as_deref(),
                self.parent_thumb.as_deref(),
                self.grandparent_thumb.as_deref(),
            ]),
            player_id: player_id.or_else(|| {
                self.player
                    .as_ref()
                    .and_then(|p| p.machine_identifier.clone())
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_to_track() {
        let env: Envelope = serde_json::from_str(
            r#"{"MediaContainer":{"size":1,"Metadata":[{
                "type":"track","ratingKey":"501","parentRatingKey":42,
                "title":"Song","grandparentTitle":"Band","parentTitle":"Record",
                "index":"3","duration":240000,"thumb":"","parentThumb":"/art/42",
                "Media":[{"audioCodec":"flac","bitrate":1411,
                  "Part":[{"Stream":[{"samplingRate":44100,"bitDepth":16}]}]}],
                "Player":{"machineIdentifier":"m-1","product":"Plexamp"}
            }]}}"#,
        )
        .unwrap();
        let track = env.media_container.metadata[0].to_track(None);
        assert_eq!(track.key, "501");
        assert_eq!(track.album_key.as_deref(), Some("42"));
        assert_eq!(track.index, Some(3));
        assert_eq!(track.codec.as_deref(), Some("flac"));
        assert_eq!(track.bitrate_kbps, Some(1411));
        assert_eq!(track.sample_rate_hz, Some(44100));
        assert_eq!(track.bit_depth, Some(16));
        assert_eq!(track.artwork.as_deref(), Some("/art/42"));
        assert_eq!(track.player_id.as_deref(), Some("m-1"));
    }

    #[test]
    fn test_missing_titles_read_unknown() {
        let item = MetadataItem::default();
        let track = item.to_track(Some("p".into()));
        assert_eq!(track.title, "Unknown");
        assert_eq!(track.artist, "Unknown");
        assert_eq!(track.player_id.as_deref(), Some("p"));
        assert!(track.artwork.is_none());
    }
}
