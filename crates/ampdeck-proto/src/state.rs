use serde::{Deserialize, Serialize};

/// Player transport state as the engine sees it.  `buffering` on the wire is
/// folded into `Playing`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    /// Map a wire state string.  Unknown values read as stopped.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "playing" | "buffering" => Self::Playing,
            "paused" => Self::Paused,
            _ => Self::Stopped,
        }
    }

    pub fn is_playing(&self) -> bool {
        *self == Self::Playing
    }

    pub fn is_active(&self) -> bool {
        *self != Self::Stopped
    }
}

/// Repeat mode with the player's numeric encoding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

impl RepeatMode {
    pub fn from_wire(n: i64) -> Self {
        match n {
            1 => Self::One,
            2 => Self::All,
            _ => Self::Off,
        }
    }

    pub fn as_wire(&self) -> u8 {
        match self {
            Self::Off => 0,
            Self::One => 1,
            Self::All => 2,
        }
    }

    /// Off → All → One → Off.
    pub fn next(&self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::One => "ONE",
            Self::All => "ALL",
        }
    }
}

/// What is playing.  Replaced wholesale whenever the unique key changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackIdentity {
    pub key: String,
    pub album_key: Option<String>,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub index: Option<u32>,
    pub codec: Option<String>,
    pub bitrate_kbps: Option<u32>,
    pub sample_rate_hz: Option<u32>,
    pub bit_depth: Option<u32>,
    /// Artwork path on the server (thumb, else parentThumb, else grandparentThumb).
    pub artwork: Option<String>,
    /// Machine identifier of the player the track plays on.
    pub player_id: Option<String>,
}

impl TrackIdentity {
    /// First non-empty artwork path in priority order.
    pub fn pick_artwork(candidates: &[Option<&str>]) -> Option<String> {
        candidates
            .iter()
            .flatten()
            .find(|s| !s.is_empty())
            .map(|s| s.to_string())
    }
}

/// Server connection hints embedded in a primary timeline.  Only used when
/// all four are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHint {
    pub protocol: String,
    pub address: String,
    pub port: u16,
    pub token: String,
}

impl ServerHint {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.address, self.port)
    }
}

/// Which source a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Player,
    Server,
}

/// One reading of the player, before it is reconciled into the model.
/// Fields the source does not report are `None` and leave the model as is.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub source: SnapshotSource,
    pub state: PlaybackState,
    pub position_ms: i64,
    pub duration_ms: i64,
    pub volume: Option<u8>,
    pub shuffle: Option<bool>,
    pub repeat: Option<RepeatMode>,
    pub track_key: Option<String>,
    pub player_id: Option<String>,
    /// Full identity when the response embedded track metadata.
    pub track: Option<TrackIdentity>,
    pub server_hint: Option<ServerHint>,
}

/// Reachability of the two endpoints, updated by every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Connectivity {
    pub player_reachable: bool,
    pub server_reachable: bool,
}
