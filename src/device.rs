use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// One PTP clock character device found under `/dev`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PtpDevice {
    pub path: PathBuf,
    pub number: u32,
    pub accessible: bool,
}

/// Scans `/dev` for PTP clock devices, lowest number first.
pub fn scan() -> io::Result<Vec<PtpDevice>> {
    scan_dir(Path::new("/dev"))
}

/// Scans an arbitrary directory; split out so tests can point it at a
/// populated temp directory.
pub fn scan_dir(dir: &Path) -> io::Result<Vec<PtpDevice>> {
    let mut devices = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(number) = name.strip_prefix("ptp").and_then(|n| n.parse::<u32>().ok()) else {
            continue;
        };
        let path = entry.path();
        let accessible = is_accessible(&path);
        devices.push(PtpDevice {
            path,
            number,
            accessible,
        });
    }
    devices.sort_by_key(|d| d.number);
    Ok(devices)
}

// The instrument needs both read and write access to the clock device.
fn is_accessible(path: &Path) -> bool {
    OpenOptions::new().read(true).write(true).open(path).is_ok()
}

/// Resolves `/dev/ptp<N>`, checking it exists and is usable.
pub fn device_by_number(number: u32) -> io::Result<PathBuf> {
    let path = PathBuf::from(format!("/dev/ptp{number}"));
    if !path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        ));
    }
    if !is_accessible(&path) {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!(
                "no read/write access to {} (root may be required)",
                path.display()
            ),
        ));
    }
    Ok(path)
}

/// First accessible device, for when the caller gives no explicit path.
pub fn first_accessible() -> io::Result<Option<PtpDevice>> {
    Ok(scan()?.into_iter().find(|d| d.accessible))
}
