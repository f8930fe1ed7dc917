use std::borrow::Cow;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

const DEFAULT_FILTER: &str = "info,ampdeck=info,hyper_util=warn,reqwest=warn";
const DEBUG_FILTER: &str = "debug,ampdeck=debug,hyper_util=warn,reqwest=warn";

/// Runtime switch for the log level, driven by the host's debug toggle.
#[derive(Clone)]
pub struct LogControl {
    handle: Option<reload::Handle<EnvFilter, Registry>>,
    /// True when RUST_LOG was set; the toggle then leaves the filter alone.
    pinned: bool,
}

impl LogControl {
    /// A control that does nothing.  Used by tests and when logging could
    /// not be initialised.
    pub fn disabled() -> Self {
        Self {
            handle: None,
            pinned: true,
        }
    }

    pub fn set_debug(&self, debug: bool) {
        if self.pinned {
            return;
        }
        let Some(handle) = &self.handle else { return };
        let directives = if debug { DEBUG_FILTER } else { DEFAULT_FILTER };
        let level = if debug { "debug" } else { "info" };
        match handle.reload(EnvFilter::new(directives)) {
            Ok(()) => info!("log level switched to {}", level),
            Err(e) => eprintln!("ampdeck: failed to reload log filter: {}", e),
        }
    }
}

/// Install the file logger at `log_path`.
pub fn init(log_path: &Path) -> anyhow::Result<LogControl> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let (filter, pinned) = match EnvFilter::try_from_default_env() {
        Ok(f) => (f, true),
        Err(_) => (EnvFilter::new(DEFAULT_FILTER), false),
    };
    let (filter_layer, handle) = reload::Layer::new(filter);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    Ok(LogControl {
        handle: Some(handle),
        pinned,
    })
}

fn token_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"X-Plex-Token=[^&\s"']+"#).ok())
        .as_ref()
}

/// Mask the credential in a URL or log line.
pub fn redact_token(s: &str) -> Cow<'_, str> {
    match token_pattern() {
        Some(re) => re.replace_all(s, "X-Plex-Token=***"),
        None => Cow::Borrowed(s),
    }
}
