//! diywheeld: runs the wheel against a CAN gateway.
//!
//! Line records are read from stdin; accessory frames from an optional
//! serial device.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use diywheel_engine::{
    DEFAULT_LOG_FILTER, HostInterface, JsonLinesHost, Runtime, TraceHost, WheelConfig,
};
use diywheel_motor_link::{CanMotorLink, UdpGatewayBus};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "diywheeld", about = "DIY force-feedback wheel controller", version)]
struct Args {
    /// JSON configuration file; stock settings when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device carrying accessory button frames
    #[arg(short, long)]
    accessory: Option<PathBuf>,

    /// CAN gateway address (host:port)
    #[arg(short, long)]
    gateway: Option<String>,

    /// Write every controller report to stdout as a JSON line
    #[arg(long)]
    print_reports: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();
    info!("Starting diywheeld v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => WheelConfig::load_from_path(path)?,
        None => WheelConfig::default(),
    };
    if let Some(gateway) = args.gateway {
        config.motor.gateway = Some(gateway);
    }
    if let Some(device) = args.accessory {
        config.accessory.device = Some(device);
    }
    config.validate().context("Invalid configuration")?;

    let gateway = config
        .motor
        .gateway
        .clone()
        .context("No CAN gateway configured (use --gateway or motor.gateway)")?;
    let bus = UdpGatewayBus::connect(config.motor.bind.as_str(), gateway.as_str())
        .with_context(|| format!("Failed to open CAN gateway {gateway}"))?;
    let motor = CanMotorLink::new(bus, config.motor.node, config.motor_timeout())
        .context("Failed to create motor link")?;

    let runtime = Runtime::new();
    info!(capabilities = ?runtime.effects().lock().capabilities(), "effect engine ready");

    let line = runtime.spawn_line_listener(
        config.line_listener(),
        BufReader::new(std::io::stdin()),
    )?;

    let accessory = match &config.accessory.device {
        Some(path) => {
            let device = File::open(path)
                .with_context(|| format!("Failed to open accessory device: {path:?}"))?;
            Some(runtime.spawn_frame_listener(config.frame_listener(), device)?)
        }
        None => None,
    };

    let host: Box<dyn HostInterface> = if args.print_reports {
        Box::new(JsonLinesHost::new(std::io::stdout()))
    } else {
        Box::new(TraceHost)
    };

    let control = runtime.start_control(&config, motor, host, None)?;
    control
        .join()
        .map_err(|_panic| anyhow::anyhow!("control loop thread panicked"))?;

    // The listeners block on their readers; only report the ones already done.
    for handle in [Some(line), accessory].into_iter().flatten() {
        if handle.is_finished() {
            let stats = handle
                .join()
                .map_err(|_panic| anyhow::anyhow!("listener thread panicked"))?;
            info!(accepted = stats.accepted, rejected = stats.rejected, "listener summary");
        }
    }
    Ok(())
}
