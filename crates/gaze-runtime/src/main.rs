//! Gaze runtime binary.
//!
//! Reads bus events as JSON lines on stdin, steps the driver at the
//! actuation rate and writes winner changes as JSON lines on stdout.
//! `gaze-runtime schema` prints the JSON schema of the inbound events.

use std::time::Instant;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use gaze_arbiter::SharedFrames;
use gaze_models::{FrameTransform, GazeEvent, Timestamp};
use gaze_runtime::bus::{self, OutboundMessage};
use gaze_runtime::logging::init_tracing;
use gaze_runtime::{GazeDriver, RuntimeConfig, RuntimeError};

/// Monotonic clock anchored at process start.
#[derive(Clone, Copy)]
struct Clock(Instant);

impl Clock {
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.0.elapsed().as_nanos() as u64)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    if std::env::args().nth(1).as_deref() == Some("schema") {
        let schema = schemars::schema_for!(GazeEvent);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    init_tracing();
    info!("Starting gaze-runtime");

    let config = RuntimeConfig::from_env();
    info!("Runtime config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| RuntimeError::Metrics(e.to_string()))?;
        info!(%addr, "Prometheus exporter listening");
    }

    let gaze_config = config.gaze_config().context("loading gaze config")?;

    let frames = SharedFrames::default();
    for sensor in &config.sensors {
        frames.insert(sensor.frame(), FrameTransform::identity());
    }

    let clock = Clock(Instant::now());
    let mut driver = GazeDriver::new(&gaze_config, frames)?;
    driver.start(clock.now())?;

    let (tx, rx) = mpsc::channel(config.event_queue_capacity);
    let reader = tokio::spawn(bus::read_events(BufReader::new(tokio::io::stdin()), tx));

    let result = run(&mut driver, &config, rx, clock).await;

    driver.shutdown();
    reader.abort();
    result?;

    info!("Gaze runtime shutdown complete");
    Ok(())
}

async fn run(
    driver: &mut GazeDriver,
    config: &RuntimeConfig,
    mut rx: mpsc::Receiver<GazeEvent>,
    clock: Clock,
) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut ticker = tokio::time::interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_diagnostics = Instant::now();

    if let Some(period) = driver.min_period() {
        if config.tick_interval > period {
            warn!(
                tick_ms = config.tick_interval.as_millis() as u64,
                fastest_ms = period.as_millis() as u64,
                "Tick interval is slower than the fastest contributor"
            );
        }
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Received shutdown signal");
                return Ok(());
            }
            _ = ticker.tick() => {
                while let Ok(event) = rx.try_recv() {
                    driver.enqueue(event);
                }

                for change in driver.step(clock.now()) {
                    bus::write_message(&mut stdout, &OutboundMessage::Winner(&change)).await?;
                }

                if let Some(every) = config.diagnostics_interval {
                    if last_diagnostics.elapsed() >= every {
                        last_diagnostics = Instant::now();
                        let snapshot = driver.diagnostics();
                        bus::write_message(&mut stdout, &OutboundMessage::Diagnostics(&snapshot)).await?;
                    }
                }
            }
        }
    }
}
