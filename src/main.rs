//! # ZivyObraz Client Entry Point
//!
//! Wires configuration, device identity, HTTP transport and display driver
//! together and runs the polling loop until SIGINT or SIGTERM.
//!
//! Flags:
//! - `--stdout`: draw to the terminal instead of the e-ink panel
//! - `--once`: run a single check/update iteration and exit
//! - `--config=PATH`: read configuration from PATH instead of zivyobraz.toml

// Test modules
#[cfg(test)]
mod tests;

use std::env;
use std::sync::Arc;
use tracing::{info, info_span, warn};
use tracing_subscriber::EnvFilter;
use zivyobraz_lib::{
    client::{Client, Shutdown},
    config::Config,
    display::{AsciiDisplay, DisplayDriver},
    identity::DeviceIdentity,
    protocol::{DeviceQuery, Poller},
    transport::HttpTransport,
};

/// Command line flags
struct Args {
    development_mode: bool,
    once: bool,
    config_path: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let mut args = Args {
            development_mode: false,
            once: false,
            config_path: None,
        };
        for arg in env::args().skip(1) {
            match arg.as_str() {
                "--stdout" => args.development_mode = true,
                "--once" => args.once = true,
                other => match other.strip_prefix("--config=") {
                    Some(path) => args.config_path = Some(path.to_string()),
                    None => warn!("Ignoring unknown argument {}", other),
                },
            }
        }
        args
    }
}

/// Pick the panel driver: the Waveshare HAT in production, the terminal
/// otherwise.
fn open_display(config: &Config, development_mode: bool) -> anyhow::Result<Box<dyn DisplayDriver>> {
    if development_mode {
        info!("Development mode: rendering to stdout");
        return Ok(Box::new(AsciiDisplay::stdout()));
    }

    #[cfg(all(target_os = "linux", feature = "hardware"))]
    {
        let epd = zivyobraz_lib::epd7in5_v2::open(&config.display.hardware)?;
        info!("E-ink display opened");
        Ok(Box::new(epd))
    }

    #[cfg(not(all(target_os = "linux", feature = "hardware")))]
    {
        let _ = config;
        warn!("E-ink display support not enabled. Rebuild with --features hardware for display functionality.");
        warn!("Showing ASCII output instead");
        Ok(Box::new(AsciiDisplay::stdout()))
    }
}

/// Trigger `shutdown` on Ctrl+C or SIGTERM.
async fn watch_signals(shutdown: Arc<Shutdown>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown requested, finishing current iteration");
    shutdown.trigger();
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("ZivyObraz client {}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    let identity = match &config.device.mac {
        Some(mac) => {
            info!("Using configured MAC address");
            DeviceIdentity::from_mac(mac)
        }
        None => DeviceIdentity::discover(&config.device.interfaces),
    };
    let span = info_span!("device", mac = %identity.mac());

    let display = open_display(&config, args.development_mode)?;
    let transport = HttpTransport::new(config.server.url())?;
    info!("Content server: {}", transport.url());

    let query = DeviceQuery::new(&identity, &config);
    let poller = Poller::new(transport, query, &config.server, span.clone());
    let mut client = Client::new(poller, display, identity, &config, span);

    // Single-threaded runtime; the loop is strictly sequential
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        if args.once {
            let sleep = client.tick().await;
            info!("Single run complete, next check advised in {:?}", sleep);
            return;
        }

        let shutdown = Arc::new(Shutdown::new());
        tokio::spawn(watch_signals(shutdown.clone()));
        client.run(&shutdown).await;
    });

    Ok(())
}
