//! HTTP access to the player (primary) and the media server (secondary).
//!
//! Every request is built from an [`Endpoints`] snapshot taken when the
//! request starts, so settings changes never race an in-flight call.

pub mod metadata;
pub mod sessions;
pub mod timeline;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ampdeck_proto::config::Config;
use ampdeck_proto::settings::GlobalSettings;
use ampdeck_proto::state::{ServerHint, SessionSnapshot};
use tracing::{debug, warn};
use url::Url;

use crate::error::{DeckError, Result};
use crate::fallback::{with_fallback, Fallback, Rejected};
use crate::logging::redact_token;

use self::metadata::{Envelope, MetadataItem};

// ── endpoints ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub player_url: String,
    pub server_url: Option<String>,
    pub token: Option<String>,
    pub client_name: String,
    pub sync_offset_ms: i64,
}

impl Endpoints {
    pub fn from_settings(global: &GlobalSettings, config: &Config) -> Self {
        let player_url = global
            .player_url
            .as_deref()
            .map(|s| s.trim_end_matches('/'))
            .filter(|s| !s.is_empty())
            .unwrap_or(&config.player.default_url)
            .to_string();
        Self {
            player_url,
            server_url: global.server_url().map(str::to_string),
            token: global.token().map(str::to_string),
            client_name: global.client_name.clone().unwrap_or_default(),
            sync_offset_ms: global.sync_offset_ms(),
        }
    }

    /// Configured server base and token.
    pub fn server(&self) -> Result<(&str, &str)> {
        match (self.server_url.as_deref(), self.token.as_deref()) {
            (Some(url), Some(token)) => Ok((url, token)),
            (None, _) => Err(DeckError::ConfigMissing("server URL")),
            (_, None) => Err(DeckError::ConfigMissing("server token")),
        }
    }

    /// Server base and token, preferring the connection hint reported by the
    /// player.
    pub fn server_with_hint(&self, hint: Option<&ServerHint>) -> Result<(String, String)> {
        if let Some(h) = hint {
            return Ok((h.base_url(), h.token.clone()));
        }
        self.server().map(|(u, t)| (u.to_string(), t.to_string()))
    }
}

/// Which endpoint answered, and whether each one was reachable.  `None`
/// means the endpoint was not contacted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reachability {
    pub player: Option<bool>,
    pub server: Option<bool>,
}

#[derive(Debug)]
pub enum PollResult {
    /// A definitive reading.  `None` is "no session".
    Reading(Option<SessionSnapshot>),
    /// Neither endpoint produced a usable answer.  State is left alone.
    Unavailable,
}

#[derive(Debug)]
pub struct PollOutcome {
    pub result: PollResult,
    pub reach: Reachability,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// The command was accepted by either endpoint.
    pub delivered: bool,
    pub reach: Reachability,
}

/// A command path plus its extra query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommand {
    pub path: &'static str,
    pub params: Vec<(&'static str, String)>,
}

impl PlannedCommand {
    pub fn new(path: &'static str) -> Self {
        Self {
            path,
            params: Vec::new(),
        }
    }

    pub fn with(mut self, key: &'static str, value: impl ToString) -> Self {
        self.params.push((key, value.to_string()));
        self
    }
}

/// Status plus body text of a finished request.
#[derive(Debug)]
struct Reply {
    status: reqwest::StatusCode,
    body: String,
}

fn accepted(r: &Reply) -> bool {
    r.status.is_success()
}

// ── client ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PlexClient {
    http: reqwest::Client,
    client_identifier: String,
    product_name: String,
    /// `commandID` sequence, shared by every clone of this client.
    command_seq: Arc<AtomicU64>,
}

impl PlexClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http.timeout_ms))
            .build()?;
        Ok(Self {
            http,
            client_identifier: config.player.client_identifier.clone(),
            product_name: config.player.product_name.clone(),
            command_seq: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Next monotonic sequence number for a player request.
    pub fn next_command_id(&self) -> u64 {
        self.command_seq.fetch_add(1, Ordering::Relaxed)
    }

    fn build_url(base: &str, path: &str, params: &[(&str, String)]) -> Result<Url> {
        Url::parse_with_params(&format!("{}{}", base, path), params)
            .map_err(|e| DeckError::Parse(format!("bad url {}{}: {}", redact_token(base), path, e)))
    }

    async fn get_player(&self, url: Url) -> Result<Reply> {
        debug!("player GET {}", redact_token(url.as_str()));
        let resp = self
            .http
            .get(url)
            .header("X-Plex-Client-Identifier", &self.client_identifier)
            .send()
            .await?;
        read_reply(resp).await
    }

    async fn get_server(&self, url: Url) -> Result<Reply> {
        debug!("server GET {}", redact_token(url.as_str()));
        let resp = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;
        read_reply(resp).await
    }

    /// One poll tick: the player's timeline, falling back to the server's
    /// session list.
    pub async fn poll(&self, ep: &Endpoints) -> PollOutcome {
        let primary = async {
            let url = Self::build_url(
                &ep.player_url,
                "/player/timeline/poll",
                &[
                    ("wait", "0".to_string()),
                    ("includeMetadata", "1".to_string()),
                    ("commandID", self.next_command_id().to_string()),
                ],
            )?;
            self.get_player(url).await
        };
        let secondary = || async {
            let (server, token) = ep.server()?;
            let url = Self::build_url(
                server,
                "/status/sessions",
                &[("X-Plex-Token", token.to_string())],
            )?;
            self.get_server(url).await
        };

        match with_fallback(primary, secondary, accepted).await {
            Fallback::Primary(reply) => {
                let result = match timeline::parse_timeline(&reply.body) {
                    Ok(reading) => PollResult::Reading(reading),
                    Err(e) => {
                        warn!("timeline poll: unparseable response: {}", e);
                        PollResult::Reading(None)
                    }
                };
                PollOutcome {
                    result,
                    reach: Reachability {
                        player: Some(true),
                        server: None,
                    },
                }
            }
            Fallback::Secondary { rejected, result } => {
                log_rejected("timeline poll", &rejected);
                let mut reach = Reachability {
                    player: Some(false),
                    server: None,
                };
                let result = match result {
                    Err(DeckError::ConfigMissing(what)) => {
                        debug!("server poll skipped: missing {}", what);
                        PollResult::Unavailable
                    }
                    Err(e) => {
                        warn!("server poll failed: {}", e);
                        reach.server = Some(false);
                        PollResult::Unavailable
                    }
                    Ok(reply) if !accepted(&reply) => {
                        warn!("server poll failed: HTTP {}", reply.status);
                        reach.server = Some(false);
                        PollResult::Unavailable
                    }
                    Ok(reply) => {
                        reach.server = Some(true);
                        PollResult::Reading(self.session_from_body(&reply.body, ep))
                    }
                };
                PollOutcome { result, reach }
            }
        }
    }

    fn session_from_body(&self, body: &str, ep: &Endpoints) -> Option<SessionSnapshot> {
        let env: Envelope = match serde_json::from_str(body) {
            Ok(env) => env,
            Err(e) => {
                warn!("server poll: unparseable sessions: {}", e);
                return None;
            }
        };
        sessions::find_session(&env, &ep.client_name, &self.product_name)
            .map(|item| sessions::session_snapshot(item, ep.sync_offset_ms))
    }

    /// Send a transport command to the player, relaying through the server
    /// when the player refuses or is unreachable.
    pub async fn send_command(
        &self,
        ep: &Endpoints,
        player_id: Option<&str>,
        cmd: &PlannedCommand,
    ) -> CommandOutcome {
        let command_id = self.next_command_id();
        let primary = async {
            let mut params = vec![("commandID", command_id.to_string())];
            params.extend(cmd.params.iter().cloned());
            let url = Self::build_url(&ep.player_url, cmd.path, &params)?;
            self.get_player(url).await
        };
        let secondary = || async {
            let target = player_id.ok_or(DeckError::ConfigMissing("player machine identifier"))?;
            let (server, token) = ep.server()?;
            let mut params = vec![
                ("commandID", command_id.to_string()),
                ("X-Plex-Token", token.to_string()),
                ("X-Plex-Target-Client-Identifier", target.to_string()),
            ];
            params.extend(cmd.params.iter().cloned());
            let url = Self::build_url(server, cmd.path, &params)?;
            self.get_server(url).await
        };

        match with_fallback(primary, secondary, accepted).await {
            Fallback::Primary(_) => {
                debug!("command {} ok", cmd.path);
                CommandOutcome {
                    delivered: true,
                    reach: Reachability {
                        player: Some(true),
                        server: None,
                    },
                }
            }
            Fallback::Secondary { rejected, result } => {
                log_rejected(cmd.path, &rejected);
                let mut reach = Reachability {
                    player: Some(false),
                    server: None,
                };
                let delivered = match result {
                    Ok(reply) if accepted(&reply) => {
                        debug!("command {} relayed via server", cmd.path);
                        reach.server = Some(true);
                        true
                    }
                    Ok(reply) => {
                        warn!("server command {} failed: HTTP {}", cmd.path, reply.status);
                        reach.server = Some(false);
                        false
                    }
                    Err(DeckError::ConfigMissing(what)) => {
                        warn!("server command {} not sent: missing {}", cmd.path, what);
                        false
                    }
                    Err(e) => {
                        warn!("server command {} failed: {}", cmd.path, e);
                        reach.server = Some(false);
                        false
                    }
                };
                CommandOutcome { delivered, reach }
            }
        }
    }

    /// Extended metadata for one item.
    pub async fn fetch_metadata(
        &self,
        base: &str,
        token: &str,
        key: &str,
    ) -> Result<Option<MetadataItem>> {
        let url = Self::build_url(
            base,
            &format!("/library/metadata/{}", key),
            &[("X-Plex-Token", token.to_string())],
        )?;
        let reply = self.get_server(url).await?;
        if !accepted(&reply) {
            return Err(DeckError::Status(reply.status));
        }
        let env: Envelope = serde_json::from_str(&reply.body)?;
        Ok(env.media_container.metadata.into_iter().next())
    }

    /// Number of tracks on an album (`MediaContainer.size` of its children).
    pub async fn fetch_track_count(&self, ep: &Endpoints, album_key: &str) -> Result<Option<u32>> {
        let (server, token) = ep.server()?;
        let url = Self::build_url(
            server,
            &format!("/library/metadata/{}/children", album_key),
            &[("X-Plex-Token", token.to_string())],
        )?;
        let reply = self.get_server(url).await?;
        if !accepted(&reply) {
            return Err(DeckError::Status(reply.status));
        }
        let env: Envelope = serde_json::from_str(&reply.body)?;
        Ok(env
            .media_container
            .size
            .filter(|n| *n > 0)
            .map(|n| n.min(u32::MAX as i64) as u32))
    }

    /// Raw artwork bytes.
    pub async fn fetch_artwork(&self, base: &str, token: &str, path: &str) -> Result<Vec<u8>> {
        let url = Self::build_url(base, path, &[("X-Plex-Token", token.to_string())])?;
        debug!("artwork GET {}", redact_token(url.as_str()));
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DeckError::Status(status));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

async fn read_reply(resp: reqwest::Response) -> Result<Reply> {
    let status = resp.status();
    if !status.is_success() {
        return Ok(Reply {
            status,
            body: String::new(),
        });
    }
    let body = resp.text().await?;
    Ok(Reply { status, body })
}

fn log_rejected(what: &str, rejected: &Rejected<Reply, DeckError>) {
    match rejected {
        Rejected::Unaccepted(reply) => {
            warn!("{}: player returned HTTP {}, falling back to server", what, reply.status)
        }
        Rejected::Failed(e) => warn!(
            "{}: player unreachable ({}), falling back to server",
            what,
            redact_token(&e.to_string())
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_ids_increase_across_clones() {
        let client = PlexClient::new(&Config::default()).unwrap();
        let copy = client.clone();
        let a = client.next_command_id();
        let b = copy.next_command_id();
        let c = client.next_command_id();
        assert_eq!((a, b, c), (1, 2, 3));
        let other = PlexClient::new(&Config::default()).unwrap();
        assert_eq!(other.next_command_id(), 1);
    }

    #[test]
    fn test_endpoints_defaults_and_trim() {
        let config = Config::default();
        let ep = Endpoints::from_settings(&GlobalSettings::default(), &config);
        assert_eq!(ep.player_url, "http://localhost:32500");
        assert!(matches!(ep.server(), Err(DeckError::ConfigMissing(_))));

        let global = GlobalSettings {
            player_url: Some("http://amp:32500/".into()),
            plex_server_url: Some("http://nas:32400".into()),
            plex_token: Some("t".into()),
            ..Default::default()
        };
        let ep = Endpoints::from_settings(&global, &config);
        assert_eq!(ep.player_url, "http://amp:32500");
        assert_eq!(ep.server().unwrap(), ("http://nas:32400", "t"));
    }

    #[test]
    fn test_hint_overrides_configured_server() {
        let ep = Endpoints {
            player_url: "http://p".into(),
            server_url: Some("http://cfg:32400".into()),
            token: Some("cfg".into()),
            client_name: String::new(),
            sync_offset_ms: 0,
        };
        let hint = ServerHint {
            protocol: "https".into(),
            address: "10.1.1.1".into(),
            port: 443,
            token: "hinted".into(),
        };
        assert_eq!(
            ep.server_with_hint(Some(&hint)).unwrap(),
            ("https://10.1.1.1:443".to_string(), "hinted".to_string())
        );
        assert_eq!(
            ep.server_with_hint(None).unwrap(),
            ("http://cfg:32400".to_string(), "cfg".to_string())
        );
    }

    #[test]
    fn test_build_url_keeps_param_order() {
        let url = PlexClient::build_url(
            "http://srv:32400",
            "/player/playback/seekTo",
            &[("commandID", "7".into()), ("offset", "1000".into())],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "http://srv:32400/player/playback/seekTo?commandID=7&offset=1000"
        );
    }
}
