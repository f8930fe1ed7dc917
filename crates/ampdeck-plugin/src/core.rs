/// PluginCore: single-owner event loop for all mutable plugin state.
///
/// Host messages, ticks, hold timers and finished network requests all
/// arrive as [`CoreEvent`]s on one channel.  The core owns the settings, the
/// playback model and the surface registry; no other task touches them.
/// Network work is spawned with the lifecycle's cancellation token and
/// reports back through the same channel.
use ampdeck_proto::config::Config;
use ampdeck_proto::platform;
use ampdeck_proto::protocol::{HostEvent, LayoutPayload, Outbound, SurfaceKind};
use ampdeck_proto::settings::{GlobalSettings, SurfaceSettings};
use ampdeck_proto::state::TrackIdentity;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::artwork::{self, Artwork};
use crate::dispatch::{self, Dispatch, Intent, Landing};
use crate::error::DeckError;
use crate::host::HostHandle;
use crate::input::{self, HoldTiming};
use crate::logging::{redact_token, LogControl};
use crate::model::PlaybackModel;
use crate::plex::{CommandOutcome, Endpoints, PlexClient, PollOutcome, PollResult, Reachability};
use crate::reconcile::{self, ArtworkRequest, Effects, MetadataRequest};
use crate::render::canvas::{data_url, Painter};
use crate::render::keys::render_key;
use crate::render::strip::{render_overlay, render_strip, Overlay};
use crate::render::RenderState;
use crate::surface::{Surface, SurfaceRegistry};
use crate::timers::{Lifecycle, TickIntervals};

// ── CoreEvent ─────────────────────────────────────────────────────────────────

/// All inputs into the PluginCore loop.
#[derive(Debug)]
pub enum CoreEvent {
    /// A decoded message from the host.
    Host(HostEvent),
    PollTick,
    RenderTick,
    Polled(PollOutcome),
    CommandFinished {
        outcome: CommandOutcome,
        landing: Option<Landing>,
    },
    MetadataResolved {
        key: String,
        track: TrackIdentity,
    },
    TrackCountResolved {
        album_key: String,
        count: Option<u32>,
    },
    ArtworkResolved {
        path: String,
        artwork: Option<Artwork>,
    },
    HoldElapsed {
        context: String,
        generation: u64,
    },
    HoldRepeat {
        context: String,
        generation: u64,
    },
    OverlayExpired {
        context: String,
        expires: Instant,
    },
    /// Host connection closed.
    Shutdown,
}

// ── PluginCore ────────────────────────────────────────────────────────────────

pub struct PluginCore {
    config: Config,
    plugin_uuid: String,
    host: HostHandle,
    plex: PlexClient,
    painter: Painter,
    log: LogControl,
    /// Sender side of our own event channel, cloned into spawned tasks.
    events: mpsc::Sender<CoreEvent>,
    global: GlobalSettings,
    model: PlaybackModel,
    surfaces: SurfaceRegistry,
    lifecycle: Lifecycle,
    poll_in_flight: bool,
    debug_logging: bool,
}

impl PluginCore {
    pub fn new(
        config: Config,
        plugin_uuid: String,
        host: HostHandle,
        events: mpsc::Sender<CoreEvent>,
        log: LogControl,
    ) -> anyhow::Result<Self> {
        let plex = PlexClient::new(&config)?;
        let painter = Painter::load(
            config.render.font_path.as_deref(),
            &platform::font_candidates(),
        );
        if !painter.has_font() {
            warn!("PluginCore: no usable font found, strip and key text will be blank");
        }
        Ok(Self::with_parts(config, plugin_uuid, host, plex, painter, events, log))
    }

    fn with_parts(
        config: Config,
        plugin_uuid: String,
        host: HostHandle,
        plex: PlexClient,
        painter: Painter,
        events: mpsc::Sender<CoreEvent>,
        log: LogControl,
    ) -> Self {
        Self {
            config,
            plugin_uuid,
            host,
            plex,
            painter,
            log,
            events,
            global: GlobalSettings::default(),
            model: PlaybackModel::default(),
            surfaces: SurfaceRegistry::new(),
            lifecycle: Lifecycle::new(),
            poll_in_flight: false,
            debug_logging: false,
        }
    }

    /// Run until the host goes away.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<CoreEvent>) -> anyhow::Result<()> {
        info!("PluginCore: starting event loop");
        while let Some(evt) = event_rx.recv().await {
            if !self.handle(evt).await {
                break;
            }
        }
        self.lifecycle.stop();
        info!("PluginCore: event loop finished");
        Ok(())
    }

    /// Process one event.  Returns false on shutdown.
    pub async fn handle(&mut self, evt: CoreEvent) -> bool {
        match evt {
            CoreEvent::Shutdown => {
                info!("PluginCore: shutdown requested");
                return false;
            }
            CoreEvent::Host(ev) => self.handle_host(ev).await,
            CoreEvent::PollTick => self.spawn_poll(),
            CoreEvent::RenderTick => {
                self.model.tick(Instant::now());
                self.render(None).await;
            }
            CoreEvent::Polled(outcome) => self.on_polled(outcome).await,
            CoreEvent::CommandFinished { outcome, landing } => {
                self.apply_reach(outcome.reach);
                if let (true, Some(l)) = (outcome.delivered, landing) {
                    dispatch::land(&mut self.model, l, Instant::now());
                    self.render(None).await;
                }
            }
            CoreEvent::MetadataResolved { key, track } => {
                let effects = reconcile::apply_metadata(&mut self.model, &key, track);
                self.apply_effects(effects).await;
            }
            CoreEvent::TrackCountResolved { album_key, count } => {
                if reconcile::apply_track_count(&mut self.model, &album_key, count) {
                    self.render(None).await;
                }
            }
            CoreEvent::ArtworkResolved { path, artwork } => {
                if reconcile::apply_artwork(&mut self.model, &path, artwork) {
                    self.render(None).await;
                }
            }
            CoreEvent::HoldElapsed {
                context,
                generation,
            } => self.on_hold(&context, generation, true).await,
            CoreEvent::HoldRepeat {
                context,
                generation,
            } => self.on_hold(&context, generation, false).await,
            CoreEvent::OverlayExpired { context, expires } => {
                let Some(surface) = self.surfaces.get_mut(&context) else {
                    return true;
                };
                if surface.overlay.as_ref().map(|o| o.expires) == Some(expires) {
                    surface.overlay = None;
                    surface.layout_key = None;
                    self.render(Some(&context)).await;
                }
            }
        }
        true
    }

    // ── host events ───────────────────────────────────────────────────────────

    async fn handle_host(&mut self, ev: HostEvent) {
        match ev {
            HostEvent::WillAppear {
                action,
                context,
                payload,
            } => {
                let Some(kind) = SurfaceKind::from_action(&action) else {
                    warn!("PluginCore: unknown action {}", action);
                    return;
                };
                debug!("PluginCore: {:?} appeared ({})", kind, context);
                self.merge_globals(&payload.settings);
                let settings = SurfaceSettings::from_value(&payload.settings);
                if self.surfaces.insert(&context, Surface::new(kind, settings)) {
                    self.start_lifecycle();
                }
            }

            HostEvent::WillDisappear { context, .. } => {
                debug!("PluginCore: {} disappeared", context);
                if self.surfaces.remove(&context) && self.lifecycle.stop() {
                    self.poll_in_flight = false;
                }
            }

            HostEvent::DidReceiveGlobalSettings { payload } => {
                self.global = GlobalSettings::from_value(&payload.settings);
                self.sync_log_level();
                debug!(
                    "PluginCore: global settings received (server {:?}, token {})",
                    self.global.server_url().map(redact_token),
                    if self.global.token().is_some() { "set" } else { "unset" }
                );
                if self.global.has_server() {
                    self.spawn_poll();
                }
            }

            HostEvent::DidReceiveSettings {
                context, payload, ..
            } => {
                if let Some(surface) = self.surfaces.get_mut(&context) {
                    surface.settings = SurfaceSettings::from_value(&payload.settings);
                    surface.invalidate();
                }
                self.merge_globals(&payload.settings);
                self.save_globals().await;
                self.render(None).await;
            }

            HostEvent::KeyDown { context, .. } => {
                let timing = self.hold_timing();
                let Some(surface) = self.surfaces.get_mut(&context) else {
                    return;
                };
                if let Some(old) = surface.hold.take() {
                    old.cancel();
                }
                surface.hold = Some(input::press(&context, surface.kind, timing, &self.events));
            }

            HostEvent::KeyUp {
                action, context, ..
            } => {
                let (hold, kind) = match self.surfaces.get_mut(&context) {
                    Some(s) => (s.hold.take(), Some(s.kind)),
                    None => (None, SurfaceKind::from_action(&action)),
                };
                let Some(kind) = kind else { return };
                if let Some(intent) = input::release(hold, kind) {
                    self.execute(intent).await;
                }
            }

            HostEvent::DialRotate {
                context, payload, ..
            } => {
                let Some(surface) = self.surfaces.get(&context) else {
                    return;
                };
                if let Some(intent) = input::rotate_intent(&surface.settings, payload.ticks) {
                    self.execute(intent).await;
                    self.show_overlay(&context, intent).await;
                }
            }

            HostEvent::DialDown { context, .. } => {
                let Some(surface) = self.surfaces.get(&context) else {
                    return;
                };
                if let Some(intent) = input::dial_press_intent(&surface.settings) {
                    self.execute(intent).await;
                    self.show_overlay(&context, intent).await;
                }
            }

            HostEvent::TouchTap { context, .. } => {
                self.execute(Intent::TogglePlayPause).await;
                self.show_overlay(&context, Intent::TogglePlayPause).await;
            }

            HostEvent::Unknown => {}
        }
    }

    /// Fold global fields carried by a surface's settings into ours.
    fn merge_globals(&mut self, settings: &serde_json::Value) {
        let incoming = GlobalSettings::from_value(settings);
        if self.global.merge_from(&incoming) {
            debug!("PluginCore: global settings updated from surface settings");
        }
        self.sync_log_level();
    }

    async fn save_globals(&self) {
        match serde_json::to_value(&self.global) {
            Ok(payload) => {
                self.host
                    .send(Outbound::SetGlobalSettings {
                        context: self.plugin_uuid.clone(),
                        payload,
                    })
                    .await
            }
            Err(e) => warn!("PluginCore: failed to serialize global settings: {}", e),
        }
    }

    fn sync_log_level(&mut self) {
        let debug = self.global.debug();
        if debug != self.debug_logging {
            self.debug_logging = debug;
            self.log.set_debug(debug);
        }
    }

    fn start_lifecycle(&mut self) {
        let intervals = TickIntervals {
            poll: Duration::from_millis(self.config.timing.poll_interval_ms),
            render: Duration::from_millis(self.config.timing.render_interval_ms),
        };
        self.lifecycle.start(intervals, &self.events);
    }

    fn hold_timing(&self) -> HoldTiming {
        HoldTiming {
            threshold: Duration::from_millis(self.config.timing.hold_threshold_ms),
            repeat: Duration::from_millis(self.config.timing.seek_repeat_ms),
            seek_step_ms: self.config.timing.seek_step_ms,
        }
    }

    // ── input ─────────────────────────────────────────────────────────────────

    async fn on_hold(&mut self, context: &str, generation: u64, first: bool) {
        let seek_step = self.config.timing.seek_step_ms;
        let Some(surface) = self.surfaces.get_mut(context) else {
            return;
        };
        let Some(hold) = surface.hold.as_mut() else {
            return;
        };
        // HoldElapsed arms the hold once; HoldRepeat only follows a confirmed one.
        if hold.generation != generation || hold.confirmed == first {
            return;
        }
        hold.confirmed = true;
        if let Some(intent) = input::hold_intent(surface.kind, seek_step) {
            debug!("PluginCore: hold on {} -> {:?}", context, intent);
            self.execute(intent).await;
        }
    }

    async fn execute(&mut self, intent: Intent) {
        match dispatch::plan(&mut self.model, intent, Instant::now()) {
            Some(d) => {
                self.spawn_command(d);
                self.render(None).await;
            }
            None => debug!("PluginCore: {:?} has nothing to send", intent),
        }
    }

    async fn show_overlay(&mut self, context: &str, intent: Intent) {
        let Some((text, subtext)) = input::overlay_for(intent, &self.model) else {
            return;
        };
        let Some(surface) = self.surfaces.get_mut(context) else {
            return;
        };
        let expires =
            Instant::now() + Duration::from_millis(self.config.timing.overlay_dwell_ms);
        surface.overlay = Some(Overlay::new(text, subtext, expires));

        let tx = self.events.clone();
        let context = context.to_string();
        tokio::spawn(async move {
            tokio::time::sleep_until(expires).await;
            let _ = tx.send(CoreEvent::OverlayExpired { context, expires }).await;
        });
        self.render(None).await;
    }

    // ── network ───────────────────────────────────────────────────────────────

    fn endpoints(&self) -> Endpoints {
        Endpoints::from_settings(&self.global, &self.config)
    }

    /// Token for spawned requests.  Outside a lifecycle the request runs
    /// uncancelled.
    fn background_token(&self) -> CancellationToken {
        self.lifecycle.token().unwrap_or_default()
    }

    fn spawn_poll(&mut self) {
        if self.poll_in_flight {
            debug!("PluginCore: previous poll still running, skipping tick");
            return;
        }
        self.poll_in_flight = true;
        let ep = self.endpoints();
        let plex = self.plex.clone();
        let tx = self.events.clone();
        let token = self.background_token();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                outcome = plex.poll(&ep) => {
                    let _ = tx.send(CoreEvent::Polled(outcome)).await;
                }
            }
        });
    }

    async fn on_polled(&mut self, outcome: PollOutcome) {
        self.poll_in_flight = false;
        self.apply_reach(outcome.reach);
        match outcome.result {
            PollResult::Reading(reading) => {
                let effects = reconcile::apply_reading(&mut self.model, reading, Instant::now());
                self.apply_effects(effects).await;
            }
            PollResult::Unavailable => debug!("PluginCore: no reading this tick"),
        }
    }

    fn apply_reach(&mut self, reach: Reachability) {
        let before = self.model.connectivity;
        self.model.apply_reach(reach);
        let after = self.model.connectivity;
        if before.player_reachable != after.player_reachable {
            info!("PluginCore: player reachable: {}", after.player_reachable);
        }
        if before.server_reachable != after.server_reachable {
            info!("PluginCore: server reachable: {}", after.server_reachable);
        }
    }

    async fn apply_effects(&mut self, effects: Effects) {
        if let Some(req) = effects.fetch_metadata {
            self.spawn_metadata(req);
        }
        if let Some(album) = effects.fetch_track_count {
            self.spawn_track_count(album);
        }
        if let Some(req) = effects.fetch_artwork {
            self.spawn_artwork(req);
        }
        if effects.redraw {
            self.render(None).await;
        }
    }

    fn spawn_command(&self, d: Dispatch) {
        let ep = self.endpoints();
        let player_id = self.model.player_id().map(str::to_string);
        let plex = self.plex.clone();
        let tx = self.events.clone();
        let token = self.background_token();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                outcome = plex.send_command(&ep, player_id.as_deref(), &d.command) => {
                    let _ = tx
                        .send(CoreEvent::CommandFinished { outcome, landing: d.landing })
                        .await;
                }
            }
        });
    }

    fn spawn_metadata(&self, req: MetadataRequest) {
        let (base, token) = match self.endpoints().server_with_hint(req.hint.as_ref()) {
            Ok(pair) => pair,
            Err(e) => {
                debug!("PluginCore: metadata for {} skipped: {}", req.key, e);
                return;
            }
        };
        let plex = self.plex.clone();
        let tx = self.events.clone();
        let cancel = self.background_token();
        tokio::spawn(async move {
            let fetch = plex.fetch_metadata(&base, &token, &req.key);
            let item = tokio::select! {
                _ = cancel.cancelled() => return,
                r = fetch => r,
            };
            match item {
                Ok(Some(item)) => {
                    let track = item.to_track(req.player_id);
                    let _ = tx
                        .send(CoreEvent::MetadataResolved { key: req.key, track })
                        .await;
                }
                Ok(None) => debug!("PluginCore: no metadata for {}", req.key),
                Err(e) => warn!("PluginCore: metadata fetch for {} failed: {}", req.key, e),
            }
        });
    }

    fn spawn_track_count(&self, album_key: String) {
        let ep = self.endpoints();
        let plex = self.plex.clone();
        let tx = self.events.clone();
        let cancel = self.background_token();
        tokio::spawn(async move {
            let fetch = plex.fetch_track_count(&ep, &album_key);
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                r = fetch => r,
            };
            match result {
                Ok(count) => {
                    let _ = tx
                        .send(CoreEvent::TrackCountResolved { album_key, count })
                        .await;
                }
                Err(DeckError::ConfigMissing(what)) => {
                    debug!("PluginCore: track count skipped: missing {}", what)
                }
                Err(e) => warn!("PluginCore: track count for {} failed: {}", album_key, e),
            }
        });
    }

    fn spawn_artwork(&self, req: ArtworkRequest) {
        let (base, token) = match self.endpoints().server_with_hint(req.hint.as_ref()) {
            Ok(pair) => pair,
            Err(e) => {
                debug!("PluginCore: artwork skipped: {}", e);
                return;
            }
        };
        let plex = self.plex.clone();
        let tx = self.events.clone();
        let cancel = self.background_token();
        tokio::spawn(async move {
            let fetch = async {
                let bytes = plex.fetch_artwork(&base, &token, &req.path).await?;
                let art = tokio::task::spawn_blocking(move || artwork::decode(&bytes))
                    .await
                    .map_err(|e| DeckError::Parse(format!("decode task failed: {}", e)))??;
                Ok::<_, DeckError>(art)
            };
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                r = fetch => r,
            };
            let artwork = match result {
                Ok(a) => Some(a),
                Err(e) => {
                    warn!("PluginCore: artwork {} unavailable: {}", req.path, e);
                    None
                }
            };
            let _ = tx
                .send(CoreEvent::ArtworkResolved {
                    path: req.path,
                    artwork,
                })
                .await;
        });
    }

    // ── rendering ─────────────────────────────────────────────────────────────

    /// Redraw every surface, or only `only`, and send what changed.
    async fn render(&mut self, only: Option<&str>) {
        for msg in self.frames(only, Instant::now()) {
            self.host.send(msg).await;
        }
    }

    fn frames(&mut self, only: Option<&str>, now: Instant) -> Vec<Outbound> {
        let text_color = self.global.text_color().to_string();
        let base = RenderState::from_model(&self.model, &text_color, self.global.dynamic_colors());
        let painter = &self.painter;
        let mut out = Vec::new();

        for (context, surface) in self.surfaces.iter_mut() {
            if only.is_some_and(|c| c != context.as_str()) {
                continue;
            }
            if surface.kind == SurfaceKind::Strip {
                let strip_color = surface
                    .settings
                    .text_color()
                    .unwrap_or(&text_color)
                    .to_string();
                let rs = base.with_text_color(&strip_color);
                let frame = match &surface.overlay {
                    Some(ov) => render_overlay(painter, &surface.settings, &rs, ov),
                    None => render_strip(painter, &surface.settings, &rs, &mut surface.scroll, now),
                };
                let frame = match frame {
                    Ok(f) => f,
                    Err(e) => {
                        warn!("PluginCore: strip render failed: {}", e);
                        continue;
                    }
                };
                if surface.layout_changed(&frame.layout_key) {
                    out.push(Outbound::SetFeedbackLayout {
                        context: context.clone(),
                        payload: LayoutPayload {
                            layout: frame.layout,
                        },
                    });
                }
                out.push(Outbound::SetFeedback {
                    context: context.clone(),
                    payload: frame.feedback,
                });
                continue;
            }

            let Some(img) = render_key(painter, surface.kind, &base) else {
                continue;
            };
            match data_url(&img) {
                Ok(url) => {
                    if surface.image_changed(&url) {
                        out.push(Outbound::set_image(context, url));
                    }
                }
                Err(e) => warn!("PluginCore: key encode failed: {}", e),
            }
        }
        out
    }
}
