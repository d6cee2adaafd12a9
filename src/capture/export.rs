use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::info;

use crate::capture::buffer::ChannelSet;

/// Writes a CSV snapshot of every retained sample across all channels,
/// channel-major, oldest first within each channel.
pub fn write_csv<W: Write>(channels: &ChannelSet, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "Timestamp,Channel,Value_ns")?;
    for (index, buffer) in channels.iter().enumerate() {
        for sample in buffer.iter_chronological() {
            writeln!(
                writer,
                "{},{},{}",
                sample.observed_at,
                index + 1,
                sample.value_ns
            )?;
        }
    }
    Ok(())
}

/// `tie_measurements_<YYYYMMDD>_<HHMMSS>.csv` for the given local time.
pub fn export_filename(stamp: DateTime<Local>) -> String {
    format!("tie_measurements_{}.csv", stamp.format("%Y%m%d_%H%M%S"))
}

/// Exports the snapshot into `dir` under a timestamped name and returns the
/// full path.
pub fn export_csv_file(channels: &ChannelSet, dir: &Path) -> io::Result<PathBuf> {
    let path = dir.join(export_filename(Local::now()));
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    write_csv(channels, &mut writer)?;
    writer.flush()?;
    info!("exported measurements to {}", path.display());
    Ok(path)
}
