use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};

pub const FLAG_PAUSED: u64 = 1 << 4;
pub const FLAG_AUTO_MANAGED: u64 = 1 << 5;
pub const FLAG_SEQUENTIAL_DOWNLOAD: u64 = 1 << 9;

/// Torrent identity as reported by the daemon: the v1 and v2 info-hashes.
///
/// Serialises as a two-element array. The v1 hash is always written as a
/// string; a missing v2 hash is written as `null`. The daemon sometimes
/// reports a missing v2 hash as `""`, which is read back as absent too.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoHash(
    String,
    #[serde_as(deserialize_as = "NoneAsEmptyString")] Option<String>,
);

impl InfoHash {
    pub fn new(v1: impl Into<String>, v2: Option<String>) -> Self {
        Self(v1.into(), v2.filter(|hash| !hash.is_empty()))
    }

    pub fn v1(&self) -> &str {
        &self.0
    }

    pub fn v2(&self) -> Option<&str> {
        self.1.as_deref()
    }

    pub fn is_hybrid(&self) -> bool {
        self.1.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Torrent {
    pub download_rate: u64,
    pub upload_rate: u64,
    pub error: bool,
    pub flags: u64,
    pub info_hash: InfoHash,
    pub list_peers: u64,
    pub list_seeds: u64,
    pub name: String,
    pub num_peers: u64,
    pub num_seeds: u64,
    pub progress: f64,
    pub queue_position: i64,
    pub save_path: String,
    pub size: u64,
    pub state: u32,
    pub total: u64,
    pub total_done: u64,
}

impl Torrent {
    pub fn is_paused(&self) -> bool {
        has_flag(self.flags, FLAG_PAUSED)
    }

    pub fn is_auto_managed(&self) -> bool {
        has_flag(self.flags, FLAG_AUTO_MANAGED)
    }

    pub fn status(&self) -> TorrentStatus {
        TorrentStatus::from_reported(self.state, self.flags, self.error)
    }

    /// Remaining seconds at the current download rate. Only meaningful while
    /// downloading; `None` means the rate is zero.
    pub fn eta(&self) -> Option<u64> {
        if self.download_rate == 0 {
            return None;
        }
        let remaining = (1.0 - self.progress.clamp(0.0, 1.0)) * self.size as f64;
        Some((remaining / self.download_rate as f64).round() as u64)
    }
}

pub fn has_flag(flags: u64, flag: u64) -> bool {
    flags & flag == flag
}

/// Display status derived from the daemon's `state` code and flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorrentStatus {
    Error,
    FileCheckQueued,
    CheckingFiles,
    DownloadingMetadata,
    Queued,
    Paused,
    Downloading,
    Finished,
    SeedingQueued,
    Seeding,
    Unknown,
}

impl TorrentStatus {
    pub const STATE_CHECKING_FILES: u32 = 1;
    pub const STATE_DOWNLOADING_METADATA: u32 = 2;
    pub const STATE_DOWNLOADING: u32 = 3;
    pub const STATE_FINISHED: u32 = 4;
    pub const STATE_SEEDING: u32 = 5;

    pub fn from_reported(state: u32, flags: u64, error: bool) -> Self {
        if error {
            return TorrentStatus::Error;
        }
        let paused = has_flag(flags, FLAG_PAUSED);
        let auto_managed = has_flag(flags, FLAG_AUTO_MANAGED);
        match state {
            Self::STATE_CHECKING_FILES if paused => TorrentStatus::FileCheckQueued,
            Self::STATE_CHECKING_FILES => TorrentStatus::CheckingFiles,
            Self::STATE_DOWNLOADING_METADATA => TorrentStatus::DownloadingMetadata,
            Self::STATE_DOWNLOADING if paused && auto_managed => TorrentStatus::Queued,
            Self::STATE_DOWNLOADING if paused => TorrentStatus::Paused,
            Self::STATE_DOWNLOADING => TorrentStatus::Downloading,
            Self::STATE_FINISHED => TorrentStatus::Finished,
            Self::STATE_SEEDING if paused && auto_managed => TorrentStatus::SeedingQueued,
            Self::STATE_SEEDING if paused => TorrentStatus::Finished,
            Self::STATE_SEEDING => TorrentStatus::Seeding,
            _ => TorrentStatus::Unknown,
        }
    }
}

/// One page of the daemon's torrent collection. `torrents_total` counts the
/// whole collection, not just this page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TorrentListPage {
    pub page: usize,
    pub page_size: usize,
    pub torrents: Vec<Torrent>,
    pub torrents_total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TorrentProperties {
    pub flags: u64,
    pub download_limit: i64,
    pub upload_limit: i64,
    pub max_connections: i64,
    pub max_uploads: i64,
}

impl TorrentProperties {
    pub fn is_auto_managed(&self) -> bool {
        has_flag(self.flags, FLAG_AUTO_MANAGED)
    }

    pub fn is_sequential_download(&self) -> bool {
        has_flag(self.flags, FLAG_SEQUENTIAL_DOWNLOAD)
    }
}

/// Values submitted from the torrent settings form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TorrentSettings {
    pub auto_managed: bool,
    pub sequential_download: bool,
    pub download_limit: i64,
    pub max_connections: i64,
    pub max_uploads: i64,
    pub upload_limit: i64,
}

impl TorrentSettings {
    pub fn set_flags(&self) -> u64 {
        let mut flags = 0;
        if self.auto_managed {
            flags |= FLAG_AUTO_MANAGED;
        }
        if self.sequential_download {
            flags |= FLAG_SEQUENTIAL_DOWNLOAD;
        }
        flags
    }

    pub fn unset_flags(&self) -> u64 {
        (FLAG_AUTO_MANAGED | FLAG_SEQUENTIAL_DOWNLOAD) & !self.set_flags()
    }
}

pub fn format_speed(value: u64) -> String {
    format!("{}/s", format_bytes(value))
}

pub fn format_progress(value: f64) -> String {
    format!("{:5.1}%", value.clamp(0.0, 1.0) * 100.0)
}

pub fn format_eta(seconds: Option<u64>) -> String {
    match seconds {
        None => "∞".to_string(),
        Some(raw) => {
            let duration = Duration::from_secs(raw);
            let days = duration.as_secs() / 86_400;
            let hours = (duration.as_secs() % 86_400) / 3_600;
            let minutes = (duration.as_secs() % 3_600) / 60;
            let seconds = duration.as_secs() % 60;
            if days > 0 {
                format!("{}d{}h", days, hours)
            } else if hours > 0 {
                format!("{}h{}m", hours, minutes)
            } else if minutes > 0 {
                format!("{}m{}s", minutes, seconds)
            } else {
                format!("{}s", seconds)
            }
        }
    }
}

pub fn format_bytes(value: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut magnitude = value as f64;
    let mut unit = 0;
    while magnitude >= 1024.0 && unit < UNITS.len() - 1 {
        magnitude /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", magnitude, UNITS[unit])
}
