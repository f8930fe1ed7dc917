use ampdeck_proto::state::{PlaybackState, SessionSnapshot, SnapshotSource};

use super::metadata::{Envelope, MetadataItem};

/// First track session (server order) whose player is ours: its title
/// matches the configured client name, or its product matches.
pub fn find_session<'a>(
    env: &'a Envelope,
    client_name: &str,
    product_name: &str,
) -> Option<&'a MetadataItem> {
    env.media_container.metadata.iter().find(|item| {
        if item.kind.as_deref() != Some("track") {
            return false;
        }
        let Some(player) = &item.player else {
            return false;
        };
        player.title.as_deref().unwrap_or_default() == client_name
            || player.product.as_deref() == Some(product_name)
    })
}

/// Turn a matched session into a snapshot.  The sync offset is added to the
/// reported position.
pub fn session_snapshot(item: &MetadataItem, sync_offset_ms: i64) -> SessionSnapshot {
    let state = item
        .player
        .as_ref()
        .and_then(|p| p.state.as_deref())
        .map(PlaybackState::from_wire)
        .unwrap_or(PlaybackState::Playing);
    let track = item.to_track(None);
    SessionSnapshot {
        source: SnapshotSource::Server,
        state,
        position_ms: item.view_offset.unwrap_or(0) + sync_offset_ms,
        duration_ms: item.duration.unwrap_or(0),
        volume: None,
        shuffle: None,
        repeat: None,
        track_key: Some(track.key.clone()).filter(|k| !k.is_empty()),
        player_id: track.player_id.clone(),
        track: Some(track),
        server_hint: None,
    }
}
