//! Settings documents exchanged with the host.
//!
//! The property inspector stores every value as whatever the HTML form
//! produced, so numbers and booleans may arrive as strings.  All numeric and
//! boolean fields are therefore deserialized leniently and an unparseable
//! value is treated as absent.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_TEXT_COLOR: &str = "#FFFFFF";

/// Plugin-wide settings, persisted by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub plex_server_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub plex_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub player_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_i64")]
    pub sync_offset: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_bool")]
    pub dynamic_colors: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_bool")]
    pub debug_mode: Option<bool>,
}

impl GlobalSettings {
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    /// Copy every field present in `other` over ours.  Returns true when
    /// anything changed.
    pub fn merge_from(&mut self, other: &GlobalSettings) -> bool {
        let before = self.clone();
        if other.plex_server_url.is_some() {
            self.plex_server_url = other.plex_server_url.clone();
        }
        if other.plex_token.is_some() {
            self.plex_token = other.plex_token.clone();
        }
        if other.client_name.is_some() {
            self.client_name = other.client_name.clone();
        }
        if other.player_url.is_some() {
            self.player_url = other.player_url.clone();
        }
        if other.sync_offset.is_some() {
            self.sync_offset = other.sync_offset;
        }
        if other.text_color.is_some() {
            self.text_color = other.text_color.clone();
        }
        if other.dynamic_colors.is_some() {
            self.dynamic_colors = other.dynamic_colors;
        }
        if other.debug_mode.is_some() {
            self.debug_mode = other.debug_mode;
        }
        *self != before
    }

    /// Server URL without a trailing slash, if configured.
    pub fn server_url(&self) -> Option<&str> {
        self.plex_server_url
            .as_deref()
            .map(|s| s.trim_end_matches('/'))
            .filter(|s| !s.is_empty())
    }

    pub fn token(&self) -> Option<&str> {
        self.plex_token.as_deref().filter(|s| !s.is_empty())
    }

    pub fn has_server(&self) -> bool {
        self.server_url().is_some() && self.token().is_some()
    }

    pub fn text_color(&self) -> &str {
        self.text_color
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_TEXT_COLOR)
    }

    pub fn dynamic_colors(&self) -> bool {
        self.dynamic_colors.unwrap_or(true)
    }

    pub fn debug(&self) -> bool {
        self.debug_mode.unwrap_or(false)
    }

    pub fn sync_offset_ms(&self) -> i64 {
        self.sync_offset.unwrap_or(0)
    }
}

/// What a touch-strip segment shows in normal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Artist,
    Album,
    Track,
    Time,
}

impl DisplayMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "artist" => Some(Self::Artist),
            "album" => Some(Self::Album),
            "track" => Some(Self::Track),
            "time" => Some(Self::Time),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Artist => "ARTIST",
            Self::Album => "ALBUM",
            Self::Track => "TRACK",
            Self::Time => "TIME",
        }
    }
}

/// Dial rotation binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialAction {
    #[default]
    None,
    Skip,
    Volume,
}

/// Dial press binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialPressAction {
    #[default]
    PlayPause,
    Shuffle,
    Repeat,
}

/// Per-surface settings.  Only meaningful for the touch-strip kind, but every
/// surface may carry global fields which get merged into [`GlobalSettings`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceSettings {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub display_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_i64")]
    pub font_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_i64")]
    pub progress_position: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_i64")]
    pub progress_total_panels: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub dial_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub dial_press_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub text_color: Option<String>,
}

impl SurfaceSettings {
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
            .as_deref()
            .and_then(DisplayMode::parse)
            .unwrap_or_default()
    }

    /// Font size for the strip's main text; zero or garbage falls back to 16.
    pub fn font_size(&self) -> u32 {
        match self.font_size {
            Some(n) if n > 0 => n as u32,
            _ => 16,
        }
    }

    pub fn progress_total_panels(&self) -> u32 {
        match self.progress_total_panels {
            Some(n) if n > 0 => n as u32,
            _ => 3,
        }
    }

    pub fn progress_position(&self) -> u32 {
        match self.progress_position {
            Some(n) if n > 0 => n as u32,
            _ => 1,
        }
    }

    pub fn dial_action(&self) -> DialAction {
        match self.dial_action.as_deref() {
            Some("skip") => DialAction::Skip,
            Some("volume") => DialAction::Volume,
            _ => DialAction::None,
        }
    }

    pub fn dial_press_action(&self) -> DialPressAction {
        match self.dial_press_action.as_deref() {
            Some("shuffle") => DialPressAction::Shuffle,
            Some("repeat") => DialPressAction::Repeat,
            _ => DialPressAction::PlayPause,
        }
    }

    /// Strip-local text color override.
    pub fn text_color(&self) -> Option<&str> {
        self.text_color.as_deref().filter(|s| !s.is_empty())
    }
}

// ── lenient field decoding ────────────────────────────────────────────────────

pub fn lenient_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

pub fn lenient_i64<'de, D>(d: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => parse_leading_int(&s),
        _ => None,
    })
}

pub fn lenient_bool<'de, D>(d: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => Some(b),
        Value::String(s) => match s.as_str() {
            "true" | "1" | "on" => Some(true),
            "false" | "0" | "off" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    })
}

/// Parse an optionally signed integer prefix, ignoring trailing junk
/// ("250ms" → 250).  Returns None when there are no digits.
pub fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (neg, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let n: i64 = digits.parse().ok()?;
    Some(if neg { -n } else { n })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_global_settings_accepts_string_numbers() {
        let s = GlobalSettings::from_value(&json!({
            "plexServerUrl": "http://nas:32400/",
            "plexToken": "abc",
            "syncOffset": "-250",
            "dynamicColors": "false",
            "debugMode": true
        }));
        assert_eq!(s.server_url(), Some("http://nas:32400"));
        assert_eq!(s.sync_offset_ms(), -250);
        assert!(!s.dynamic_colors());
        assert!(s.debug());
        assert!(s.has_server());
    }

    #[test]
    fn test_global_defaults() {
        let s = GlobalSettings::default();
        assert_eq!(s.text_color(), "#FFFFFF");
        assert!(s.dynamic_colors());
        assert!(!s.debug());
        assert!(!s.has_server());
    }

    #[test]
    fn test_merge_only_overrides_present_fields() {
        let mut g = GlobalSettings {
            plex_token: Some("old".into()),
            client_name: Some("desk".into()),
            ..Default::default()
        };
        let changed = g.merge_from(&GlobalSettings {
            plex_token: Some("new".into()),
            ..Default::default()
        });
        assert!(changed);
        assert_eq!(g.token(), Some("new"));
        assert_eq!(g.client_name.as_deref(), Some("desk"));
        assert!(!g.merge_from(&GlobalSettings::default()));
    }

    #[test]
    fn test_surface_settings_defaults_and_parsing() {
        let s = SurfaceSettings::from_value(&json!({
            "displayMode": "album",
            "fontSize": "20",
            "progressPosition": 2,
            "progressTotalPanels": "4",
            "dialAction": "volume",
            "dialPressAction": "repeat"
        }));
        assert_eq!(s.display_mode(), DisplayMode::Album);
        assert_eq!(s.font_size(), 20);
        assert_eq!(s.progress_position(), 2);
        assert_eq!(s.progress_total_panels(), 4);
        assert_eq!(s.dial_action(), DialAction::Volume);
        assert_eq!(s.dial_press_action(), DialPressAction::Repeat);

        let d = SurfaceSettings::from_value(&json!({ "fontSize": "abc" }));
        assert_eq!(d.display_mode(), DisplayMode::Artist);
        assert_eq!(d.font_size(), 16);
        assert_eq!(d.progress_total_panels(), 3);
        assert_eq!(d.dial_action(), DialAction::None);
        assert_eq!(d.dial_press_action(), DialPressAction::PlayPause);
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("42"), Some(42));
        assert_eq!(parse_leading_int("-7x"), Some(-7));
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("x1"), None);
    }
}
