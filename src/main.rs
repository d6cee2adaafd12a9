use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info, warn};

use tie_scope::capture::{
    export_csv_file, render_channel_png, render_overlay_png, CaptureSession, ChannelSet,
    ChartStyle, DemoSource, InstrumentSource, LineSource,
};
use tie_scope::config::MonitorConfig;
use tie_scope::device;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "TIE measurement capture for PTP hardware clocks",
    long_about = None
)]
struct Cli {
    /// JSON config file overriding the built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List PTP clock devices found under /dev.
    Devices,
    /// Run a capture session and export the results.
    Capture {
        /// Device path handed to the instrument, e.g. /dev/ptp1.
        #[arg(short, long)]
        device: Option<String>,
        /// Shorthand for /dev/ptp<N>.
        #[arg(long, conflicts_with = "device")]
        ptp: Option<u32>,
        /// Use the built-in synthetic source instead of hardware.
        #[arg(long, conflicts_with_all = ["device", "ptp"])]
        demo: bool,
        /// Stop after this many seconds; without it the session runs until
        /// the instrument exits.
        #[arg(long)]
        duration: Option<u64>,
        /// Directory for the CSV export and charts.
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
        /// Also write per-channel and overlay chart PNGs.
        #[arg(long)]
        charts: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };
    match cli.command {
        Command::Devices => list_devices(),
        Command::Capture {
            device,
            ptp,
            demo,
            duration,
            output_dir,
            charts,
        } => run_capture(
            &config,
            device,
            ptp,
            demo,
            duration.map(Duration::from_secs),
            &output_dir,
            charts,
        ),
    }
}

fn list_devices() -> Result<()> {
    let devices = device::scan().context("failed to scan /dev for PTP devices")?;
    if devices.is_empty() {
        println!("No PTP devices found.");
        return Ok(());
    }
    println!("{:<16} {:<8} Status", "Device", "Number");
    for dev in devices {
        let status = if dev.accessible {
            "accessible"
        } else {
            "not accessible (root may be required)"
        };
        println!("{:<16} {:<8} {}", dev.path.display(), dev.number, status);
    }
    Ok(())
}

fn run_capture(
    config: &MonitorConfig,
    device: Option<String>,
    ptp: Option<u32>,
    demo: bool,
    duration: Option<Duration>,
    output_dir: &Path,
    charts: bool,
) -> Result<()> {
    let target = if demo {
        None
    } else {
        Some(resolve_device(device, ptp)?)
    };

    let mut channels = ChannelSet::new(config.buffer_capacity);
    let mut session = CaptureSession::new(config.reset_on_start);
    let instrument = config.instrument_path.clone();
    session.start(&mut channels, || match &target {
        None => Ok(Box::new(DemoSource::new()) as Box<dyn LineSource>),
        Some(device) => InstrumentSource::spawn(&instrument, device)
            .map(|source| Box::new(source) as Box<dyn LineSource>),
    })?;
    info!(
        "capturing from {}",
        target.as_deref().unwrap_or("demo source")
    );

    let interval = Duration::from_millis(config.poll_interval_ms.max(1));
    let deadline = duration.map(|d| Instant::now() + d);
    loop {
        thread::sleep(interval);
        let report = session.poll(&mut channels);
        if report.total_appended() > 0 {
            debug!("appended {} samples", report.total_appended());
        }
        for line in &report.unmatched {
            info!("instrument: {line}");
        }
        if report.closed {
            warn!("measurement source closed");
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            session.stop();
            break;
        }
    }

    log_statistics(&channels);
    let csv = export_csv_file(&channels, output_dir).context("CSV export failed")?;
    println!("Exported {}", csv.display());
    if charts {
        write_charts(&channels, output_dir)?;
    }
    Ok(())
}

fn resolve_device(device: Option<String>, ptp: Option<u32>) -> Result<String> {
    if let Some(path) = device {
        return Ok(path);
    }
    if let Some(number) = ptp {
        return Ok(device::device_by_number(number)?.display().to_string());
    }
    let picked = device::first_accessible().context("failed to scan /dev for PTP devices")?;
    match picked {
        Some(dev) => {
            info!("auto-selected {}", dev.path.display());
            Ok(dev.path.display().to_string())
        }
        None => bail!("no accessible PTP devices found; use --device, --ptp or --demo"),
    }
}

fn log_statistics(channels: &ChannelSet) {
    for (index, buffer) in channels.iter().enumerate() {
        let label = ChannelSet::label(index + 1);
        match (buffer.min_ns(), buffer.max_ns(), buffer.average_ns()) {
            (Some(min), Some(max), Some(avg)) => info!(
                "{label}: {} samples ({} lifetime), min {min} ns, max {max} ns, avg {avg:.1} ns",
                buffer.count(),
                buffer.total_count(),
            ),
            _ => info!("{label}: no measurements"),
        }
    }
}

fn write_charts(channels: &ChannelSet, dir: &Path) -> Result<()> {
    let style = ChartStyle::default();
    for (index, buffer) in channels.iter().enumerate() {
        let wire = index + 1;
        let png = render_channel_png(buffer, wire, &style)?;
        let path = dir.join(format!("tie_chart_sma{wire}.png"));
        fs::write(&path, png).with_context(|| format!("failed to write {}", path.display()))?;
    }
    let overlay = render_overlay_png(channels, &style)?;
    let path = dir.join("tie_chart_all.png");
    fs::write(&path, overlay).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Charts written to {}", dir.display());
    Ok(())
}
