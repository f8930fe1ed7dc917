use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix shared by every action UUID this plugin registers.
pub const ACTION_PREFIX: &str = "com.rackemrack.ampdeck.";

/// Identifier of the strip feedback layout.
pub const LAYOUT_ID: &str = "com.rackemrack.ampdeck.layout";

/// Messages the host sends to the plugin.  Anything not listed decodes as
/// `Unknown` and is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    WillAppear {
        action: String,
        context: String,
        #[serde(default)]
        payload: ActionPayload,
    },
    WillDisappear {
        action: String,
        context: String,
        #[serde(default)]
        payload: ActionPayload,
    },
    DidReceiveSettings {
        action: String,
        context: String,
        #[serde(default)]
        payload: ActionPayload,
    },
    DidReceiveGlobalSettings {
        #[serde(default)]
        payload: ActionPayload,
    },
    KeyDown {
        action: String,
        context: String,
        #[serde(default)]
        payload: ActionPayload,
    },
    KeyUp {
        action: String,
        context: String,
        #[serde(default)]
        payload: ActionPayload,
    },
    DialRotate {
        action: String,
        context: String,
        #[serde(default)]
        payload: ActionPayload,
    },
    DialDown {
        action: String,
        context: String,
        #[serde(default)]
        payload: ActionPayload,
    },
    TouchTap {
        action: String,
        context: String,
        #[serde(default)]
        payload: ActionPayload,
    },
    #[serde(other)]
    Unknown,
}

/// The `payload` object common to action events.  Only the fields the
/// engine reads are modelled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionPayload {
    #[serde(default)]
    pub settings: Value,
    #[serde(default)]
    pub ticks: i64,
}

impl HostEvent {
    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// The kind of control a surface is, derived from its action UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    AlbumArt,
    PlayPause,
    Previous,
    Next,
    Info,
    Time,
    Shuffle,
    Repeat,
    VolumeUp,
    VolumeDown,
    Strip,
}

impl SurfaceKind {
    pub fn from_action(uuid: &str) -> Option<Self> {
        let kind = uuid.strip_prefix(ACTION_PREFIX)?;
        Some(match kind {
            "album-art" => Self::AlbumArt,
            "play-pause" => Self::PlayPause,
            "previous" => Self::Previous,
            "next" => Self::Next,
            "info" => Self::Info,
            "time" => Self::Time,
            "shuffle" => Self::Shuffle,
            "repeat" => Self::Repeat,
            "volume-up" => Self::VolumeUp,
            "volume-down" => Self::VolumeDown,
            "strip" => Self::Strip,
            _ => return None,
        })
    }

    /// Keys whose press may turn into a hold.
    pub fn supports_hold(&self) -> bool {
        matches!(self, Self::Previous | Self::Next | Self::VolumeDown)
    }

    /// Keys whose image the plugin draws.  Strips get feedback payloads
    /// instead and the rest keep their static host icon.
    pub fn is_drawn(&self) -> bool {
        !matches!(
            self,
            Self::Previous | Self::Next | Self::VolumeUp | Self::VolumeDown | Self::Strip
        )
    }
}

/// Registration handshake.  The event name is supplied by the host on the
/// command line, so it is not part of [`Outbound`].
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub event: String,
    pub uuid: String,
}

/// Messages the plugin sends to the host.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Outbound {
    GetGlobalSettings {
        context: String,
    },
    SetGlobalSettings {
        context: String,
        payload: Value,
    },
    SetImage {
        context: String,
        payload: ImagePayload,
    },
    SetFeedback {
        context: String,
        payload: FeedbackPayload,
    },
    SetFeedbackLayout {
        context: String,
        payload: LayoutPayload,
    },
}

impl Outbound {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn set_image(context: &str, data_url: String) -> Self {
        Self::SetImage {
            context: context.to_string(),
            payload: ImagePayload {
                image: data_url,
                target: 0,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImagePayload {
    pub image: String,
    pub target: u8,
}

/// Content for the three strip layout items.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackPayload {
    pub label: String,
    pub display_text: String,
    pub progress_bar: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutPayload {
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub id: String,
    pub items: Vec<LayoutItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayoutItem {
    Text {
        key: String,
        rect: [u32; 4],
        font: LayoutFont,
        color: String,
        alignment: String,
    },
    Pixmap {
        key: String,
        rect: [u32; 4],
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutFont {
    pub size: u32,
    pub weight: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_key_down() {
        let ev = HostEvent::decode(
            r#"{"event":"keyDown","action":"com.rackemrack.ampdeck.next","context":"ctx1","device":"d","payload":{"settings":{},"coordinates":{"column":1,"row":0}}}"#,
        )
        .unwrap();
        match ev {
            HostEvent::KeyDown { action, context, .. } => {
                assert_eq!(SurfaceKind::from_action(&action), Some(SurfaceKind::Next));
                assert_eq!(context, "ctx1");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_dial_rotate_ticks() {
        let ev = HostEvent::decode(
            r#"{"event":"dialRotate","action":"com.rackemrack.ampdeck.strip","context":"s","payload":{"ticks":-2,"pressed":false,"settings":{"dialAction":"volume"}}}"#,
        )
        .unwrap();
        match ev {
            HostEvent::DialRotate { payload, .. } => {
                assert_eq!(payload.ticks, -2);
                assert_eq!(payload.settings["dialAction"], "volume");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_is_tolerated() {
        let ev = HostEvent::decode(r#"{"event":"deviceDidConnect","device":"x"}"#).unwrap();
        assert!(matches!(ev, HostEvent::Unknown));
    }

    #[test]
    fn test_encode_set_image() {
        let json = Outbound::set_image("ctx", "data:image/png;base64,AA".into())
            .encode()
            .unwrap();
        let v: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["event"], "setImage");
        assert_eq!(v["context"], "ctx");
        assert_eq!(v["payload"]["target"], 0);
    }

    #[test]
    fn test_encode_layout_items() {
        let msg = Outbound::SetFeedbackLayout {
            context: "c".into(),
            payload: LayoutPayload {
                layout: Layout {
                    id: LAYOUT_ID.into(),
                    items: vec![LayoutItem::Pixmap {
                        key: "progressBar".into(),
                        rect: [0, 82, 200, 4],
                    }],
                },
            },
        };
        let v: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(v["event"], "setFeedbackLayout");
        assert_eq!(v["payload"]["layout"]["items"][0]["type"], "pixmap");
        assert_eq!(v["payload"]["layout"]["items"][0]["rect"][1], 82);
    }

    #[test]
    fn test_surface_kind_rejects_foreign_actions() {
        assert_eq!(SurfaceKind::from_action("com.other.plugin.next"), None);
        assert_eq!(
            SurfaceKind::from_action("com.rackemrack.ampdeck.volume-down"),
            Some(SurfaceKind::VolumeDown)
        );
        assert!(SurfaceKind::VolumeDown.supports_hold());
        assert!(!SurfaceKind::Next.is_drawn());
        assert!(!SurfaceKind::Strip.is_drawn());
        assert!(SurfaceKind::Info.is_drawn());
    }
}
