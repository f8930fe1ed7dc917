use ampdeck::core::{CoreEvent, PluginCore};
use ampdeck::{host, logging};
use ampdeck_proto::config::Config;
use ampdeck_proto::platform;
use clap::Parser;
use tracing::{info, warn};

/// Arguments the Stream Deck host passes on launch.
#[derive(Parser, Debug)]
#[command(name = "ampdeck", version, about)]
struct Args {
    /// Websocket port of the host.
    #[arg(long)]
    port: u16,

    /// Opaque id to register with.
    #[arg(long = "pluginUUID")]
    plugin_uuid: String,

    /// Event name for the registration message.
    #[arg(long = "registerEvent")]
    register_event: String,

    /// Host and device description (JSON).  Unused.
    #[arg(long)]
    info: Option<String>,
}

/// The host uses single-dash long flags (`-port 1234`).
fn normalize_flag(arg: String) -> String {
    if arg.starts_with('-') && !arg.starts_with("--") && arg.len() > 2 {
        format!("-{}", arg)
    } else {
        arg
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse_from(std::env::args().map(normalize_flag));

    let log_path = platform::log_path();
    let log = match logging::init(&log_path) {
        Ok(control) => control,
        Err(e) => {
            eprintln!("ampdeck: logging disabled: {}", e);
            logging::LogControl::disabled()
        }
    };
    info!("Log file: {:?}", log_path);

    let config = match Config::load() {
        Ok(c) => {
            info!("Config loaded from: {:?}", Config::config_path());
            c
        }
        Err(e) => {
            warn!("Config unreadable ({}), using defaults", e);
            Config::default()
        }
    };

    // Event channel: every input funnels into PluginCore
    let (event_tx, event_rx) = tokio::sync::mpsc::channel::<CoreEvent>(256);

    let host = host::connect(
        args.port,
        &args.register_event,
        &args.plugin_uuid,
        event_tx.clone(),
    )
    .await?;

    let core = PluginCore::new(config, args.plugin_uuid, host, event_tx, log)?;
    info!("Plugin registered, running event loop");
    core.run(event_rx).await
}
