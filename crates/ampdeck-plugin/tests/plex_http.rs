use ampdeck::artwork;
use ampdeck::error::DeckError;
use ampdeck::plex::{Endpoints, PlannedCommand, PlexClient, PollResult};
use ampdeck::render::canvas::encode_png;
use ampdeck_proto::config::Config;
use ampdeck_proto::settings::GlobalSettings;
use ampdeck_proto::state::PlaybackState;
use image::{Rgba, RgbaImage};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STOPPED_TIMELINE: &str = r#"<MediaContainer commandID="1">
  <Timeline type="music" state="stopped" time="0"/>
</MediaContainer>"#;

fn client() -> PlexClient {
    let mut config = Config::default();
    config.http.timeout_ms = 2000;
    PlexClient::new(&config).unwrap()
}

fn endpoints(player: &MockServer, server: Option<&MockServer>) -> Endpoints {
    let mut settings = json!({
        "playerUrl": player.uri(),
        "clientName": "desk",
        "syncOffset": "500",
    });
    if let Some(s) = server {
        settings["plexServerUrl"] = json!(format!("{}/", s.uri()));
        settings["plexToken"] = json!("tok");
    }
    Endpoints::from_settings(&GlobalSettings::from_value(&settings), &Config::default())
}

#[tokio::test]
async fn test_poll_falls_back_to_server_sessions_once() {
    let player = MockServer::start().await;
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/player/timeline/poll"))
        .and(header("X-Plex-Client-Identifier", "com.rackemrack.ampdeck"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&player)
        .await;
    Mock::given(method("GET"))
        .and(path("/status/sessions"))
        .and(query_param("X-Plex-Token", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "MediaContainer": {"Metadata": [
                {"type": "track", "ratingKey": "9", "title": "Elsewhere",
                 "Player": {"title": "phone", "product": "Plex Web"}},
                {"type": "track", "ratingKey": "501", "parentRatingKey": "42",
                 "title": "Song", "grandparentTitle": "Band", "parentTitle": "Record",
                 "duration": 240000, "viewOffset": 30000,
                 "Player": {"title": "desk", "state": "paused", "machineIdentifier": "amp-1"}}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client().poll(&endpoints(&player, Some(&server))).await;
    assert_eq!(outcome.reach.player, Some(false));
    assert_eq!(outcome.reach.server, Some(true));
    let snap = match outcome.result {
        PollResult::Reading(Some(s)) => s,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(snap.state, PlaybackState::Paused);
    assert_eq!(snap.position_ms, 30_500);
    assert_eq!(snap.player_id.as_deref(), Some("amp-1"));
    assert_eq!(snap.track.unwrap().title, "Song");
}

#[tokio::test]
async fn test_stopped_timeline_is_a_definitive_empty_reading() {
    let player = MockServer::start().await;
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/player/timeline/poll"))
        .and(query_param("includeMetadata", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STOPPED_TIMELINE))
        .mount(&player)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = client().poll(&endpoints(&player, Some(&server))).await;
    assert!(matches!(outcome.result, PollResult::Reading(None)));
    assert_eq!(outcome.reach.player, Some(true));
    assert_eq!(outcome.reach.server, None);
}

#[tokio::test]
async fn test_poll_without_server_config_is_unavailable() {
    let player = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&player)
        .await;

    let outcome = client().poll(&endpoints(&player, None)).await;
    assert!(matches!(outcome.result, PollResult::Unavailable));
    assert_eq!(outcome.reach.player, Some(false));
    assert_eq!(outcome.reach.server, None);
}

#[tokio::test]
async fn test_command_relays_through_server_with_target() {
    let player = MockServer::start().await;
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/player/playback/setParameters"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&player)
        .await;
    Mock::given(method("GET"))
        .and(path("/player/playback/setParameters"))
        .and(query_param("volume", "55"))
        .and(query_param("X-Plex-Token", "tok"))
        .and(query_param("X-Plex-Target-Client-Identifier", "amp-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let cmd = PlannedCommand::new("/player/playback/setParameters").with("volume", 55);
    let outcome = client()
        .send_command(&endpoints(&player, Some(&server)), Some("amp-1"), &cmd)
        .await;
    assert!(outcome.delivered);
    assert_eq!(outcome.reach.player, Some(false));
    assert_eq!(outcome.reach.server, Some(true));
}

#[tokio::test]
async fn test_command_accepted_by_player_skips_server() {
    let player = MockServer::start().await;
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/player/playback/skipNext"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&player)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cmd = PlannedCommand::new("/player/playback/skipNext");
    let outcome = client()
        .send_command(&endpoints(&player, Some(&server)), Some("amp-1"), &cmd)
        .await;
    assert!(outcome.delivered);
    assert_eq!(outcome.reach.player, Some(true));
}

#[tokio::test]
async fn test_command_without_target_is_not_delivered() {
    let player = MockServer::start().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&player)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cmd = PlannedCommand::new("/player/playback/play");
    let outcome = client()
        .send_command(&endpoints(&player, Some(&server)), None, &cmd)
        .await;
    assert!(!outcome.delivered);
    assert_eq!(outcome.reach.server, None);
}

#[tokio::test]
async fn test_metadata_and_track_count() {
    let player = MockServer::start().await;
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/library/metadata/501"))
        .and(query_param("X-Plex-Token", "tok"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "MediaContainer": {"Metadata": [{
                "ratingKey": "501", "parentRatingKey": "42", "title": "Song",
                "grandparentTitle": "Band", "parentTitle": "Record", "index": 3,
                "parentThumb": "/library/metadata/42/thumb/1",
                "Media": [{"audioCodec": "flac", "bitrate": 1411,
                           "Part": [{"Stream": [{"samplingRate": 96000, "bitDepth": 24}]}]}]
            }]}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/library/metadata/42/children"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"MediaContainer": {"size": 12}})),
        )
        .mount(&server)
        .await;

    let plex = client();
    let ep = endpoints(&player, Some(&server));
    let (base, token) = ep.server_with_hint(None).unwrap();
    let item = plex
        .fetch_metadata(&base, &token, "501")
        .await
        .unwrap()
        .unwrap();
    let track = item.to_track(Some("amp-1".into()));
    assert_eq!(track.album_key.as_deref(), Some("42"));
    assert_eq!(track.index, Some(3));
    assert_eq!(track.bit_depth, Some(24));
    assert_eq!(track.artwork.as_deref(), Some("/library/metadata/42/thumb/1"));
    assert_eq!(track.player_id.as_deref(), Some("amp-1"));

    assert_eq!(plex.fetch_track_count(&ep, "42").await.unwrap(), Some(12));
}

#[tokio::test]
async fn test_track_count_needs_server_config() {
    let player = MockServer::start().await;
    let err = client()
        .fetch_track_count(&endpoints(&player, None), "42")
        .await
        .unwrap_err();
    assert!(matches!(err, DeckError::ConfigMissing(_)));
}

#[tokio::test]
async fn test_artwork_fetch_and_decode() {
    let server = MockServer::start().await;
    let img = RgbaImage::from_pixel(32, 32, Rgba([200, 40, 40, 255]));
    Mock::given(method("GET"))
        .and(path("/library/metadata/42/thumb/1"))
        .and(query_param("X-Plex-Token", "tok"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/png")
                .set_body_bytes(encode_png(&img).unwrap()),
        )
        .mount(&server)
        .await;

    let bytes = client()
        .fetch_artwork(&server.uri(), "tok", "/library/metadata/42/thumb/1")
        .await
        .unwrap();
    let art = artwork::decode(&bytes).unwrap();
    assert_eq!(art.image.width(), 144);

    let missing = client()
        .fetch_artwork(&server.uri(), "tok", "/nope")
        .await
        .unwrap_err();
    assert!(matches!(missing, DeckError::Status(s) if s.as_u16() == 404));
}
