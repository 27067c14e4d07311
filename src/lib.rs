pub mod bridge;
pub mod collector;
pub mod context;
pub mod error;
pub mod events;
pub mod models;
pub mod performance;
pub mod settings;
pub mod transport;
pub mod usability;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub use bridge::HostMessage;
pub use collector::TelemetryCollector;
pub use context::{TelemetryContext, TelemetryHandle};
pub use error::TransportError;
pub use models::{InteractionType, TelemetryPayload, TelemetryStats};
pub use performance::{HostEnvironment, PerformanceSampler, ProcessHost};
pub use settings::TelemetrySettings;
pub use transport::{Collector, HttpCollector, RecordingCollector, TransportService};
pub use usability::{InteractionAggregator, SessionState};

const PAGE_URL_ENV: &str = "STOREFRONT_TELEMETRY_PAGE_URL";
const SCREEN_ENV: &str = "STOREFRONT_TELEMETRY_SCREEN";

/// Runs the pipeline against stdin: one JSON message per line until EOF or
/// Ctrl-C, answering queries on stdout.
pub fn run() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("storefront telemetry starting up...");

    let settings = TelemetrySettings::from_env()?;
    let runtime = tokio::runtime::Runtime::new().context("failed to build tokio runtime")?;
    runtime.block_on(serve(settings))
}

async fn serve(settings: TelemetrySettings) -> Result<()> {
    let page_url = std::env::var(PAGE_URL_ENV).unwrap_or_else(|_| "/".to_string());
    let mut host = ProcessHost::new(page_url);
    let screen = std::env::var(SCREEN_ENV).ok();
    if let Some((width, height)) = screen.as_deref().and_then(parse_screen) {
        host = host.with_screen(width, height);
    }
    let host = Arc::new(host);
    let collector = Arc::new(HttpCollector::new(settings.endpoint.clone()));
    let context = TelemetryContext::create(settings, host, collector);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupted; flushing telemetry");
                None
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let message = match HostMessage::parse(&line) {
            Ok(message) => message,
            Err(err) => {
                log::warn!("ignoring malformed message: {err}");
                continue;
            }
        };

        if let Some(reply) = bridge::dispatch(&context, message).await {
            let mut out = serde_json::to_vec(&reply)?;
            out.push(b'\n');
            stdout.write_all(&out).await?;
            stdout.flush().await?;
        }
    }

    context.dispose().await
}

/// Parses `WIDTHxHEIGHT`, e.g. `390x844`.
fn parse_screen(value: &str) -> Option<(u32, u32)> {
    let (width, height) = value.trim().split_once('x')?;
    Some((width.parse().ok()?, height.parse().ok()?))
}
