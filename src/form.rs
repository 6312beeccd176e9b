use thiserror::Error;

use crate::model::{TorrentProperties, TorrentSettings};

/// How the add-torrent source field is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddSource {
    #[default]
    MagnetLink,
    TorrentFile,
}

impl AddSource {
    pub fn toggled(self) -> Self {
        match self {
            AddSource::MagnetLink => AddSource::TorrentFile,
            AddSource::TorrentFile => AddSource::MagnetLink,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    value: String,
}

impl TextField {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    pub fn push(&mut self, c: char) {
        self.value.push(c);
    }

    pub fn push_str(&mut self, text: &str) {
        self.value.push_str(text);
    }

    pub fn backspace(&mut self) {
        self.value.pop();
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddTorrentForm {
    pub source: TextField,
    pub save_path: TextField,
    pub mode: AddSource,
}

impl AddTorrentForm {
    pub const ENTRIES: usize = 2;

    pub fn field_mut(&mut self, cursor: usize) -> Option<&mut TextField> {
        match cursor {
            0 => Some(&mut self.source),
            1 => Some(&mut self.save_path),
            _ => None,
        }
    }

    /// `None` until both the source and the save path are filled in.
    pub fn submission(&self) -> Option<(String, String, AddSource)> {
        if self.source.is_blank() || self.save_path.is_blank() {
            return None;
        }
        Some((
            self.source.value().trim().to_string(),
            self.save_path.value().trim().to_string(),
            self.mode,
        ))
    }

    pub fn clear(&mut self) {
        self.source.clear();
        self.save_path.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsToggle {
    AutoManaged,
    SequentialDownload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsNumber {
    DownloadLimit,
    MaxConnections,
    MaxUploads,
    UploadLimit,
}

impl SettingsNumber {
    pub fn name(self) -> &'static str {
        match self {
            SettingsNumber::DownloadLimit => "download limit",
            SettingsNumber::MaxConnections => "max connections",
            SettingsNumber::MaxUploads => "max uploads",
            SettingsNumber::UploadLimit => "upload limit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsEntry {
    Toggle(SettingsToggle),
    Number(SettingsNumber),
}

/// Sub-menu order of the settings form.
pub const SETTINGS_ENTRIES: [SettingsEntry; 6] = [
    SettingsEntry::Toggle(SettingsToggle::AutoManaged),
    SettingsEntry::Toggle(SettingsToggle::SequentialDownload),
    SettingsEntry::Number(SettingsNumber::DownloadLimit),
    SettingsEntry::Number(SettingsNumber::MaxConnections),
    SettingsEntry::Number(SettingsNumber::MaxUploads),
    SettingsEntry::Number(SettingsNumber::UploadLimit),
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{} must be a whole number, got {value:?}", field.name())]
pub struct InvalidNumber {
    pub field: SettingsNumber,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsForm {
    auto_managed: bool,
    sequential_download: bool,
    download_limit: TextField,
    max_connections: TextField,
    max_uploads: TextField,
    upload_limit: TextField,
}

impl SettingsForm {
    pub fn from_properties(props: &TorrentProperties) -> Self {
        let mut form = Self {
            auto_managed: props.is_auto_managed(),
            sequential_download: props.is_sequential_download(),
            ..Self::default()
        };
        form.download_limit.set(props.download_limit.to_string());
        form.max_connections.set(props.max_connections.to_string());
        form.max_uploads.set(props.max_uploads.to_string());
        form.upload_limit.set(props.upload_limit.to_string());
        form
    }

    pub fn is_enabled(&self, toggle: SettingsToggle) -> bool {
        match toggle {
            SettingsToggle::AutoManaged => self.auto_managed,
            SettingsToggle::SequentialDownload => self.sequential_download,
        }
    }

    pub fn toggle(&mut self, toggle: SettingsToggle) {
        match toggle {
            SettingsToggle::AutoManaged => self.auto_managed = !self.auto_managed,
            SettingsToggle::SequentialDownload => {
                self.sequential_download = !self.sequential_download
            }
        }
    }

    pub fn number(&self, field: SettingsNumber) -> &TextField {
        match field {
            SettingsNumber::DownloadLimit => &self.download_limit,
            SettingsNumber::MaxConnections => &self.max_connections,
            SettingsNumber::MaxUploads => &self.max_uploads,
            SettingsNumber::UploadLimit => &self.upload_limit,
        }
    }

    pub fn number_mut(&mut self, field: SettingsNumber) -> &mut TextField {
        match field {
            SettingsNumber::DownloadLimit => &mut self.download_limit,
            SettingsNumber::MaxConnections => &mut self.max_connections,
            SettingsNumber::MaxUploads => &mut self.max_uploads,
            SettingsNumber::UploadLimit => &mut self.upload_limit,
        }
    }

    pub fn settings(&self) -> Result<TorrentSettings, InvalidNumber> {
        let parse = |field: SettingsNumber| {
            let raw = self.number(field).value().trim();
            raw.parse::<i64>().map_err(|_| InvalidNumber {
                field,
                value: raw.to_string(),
            })
        };
        Ok(TorrentSettings {
            auto_managed: self.auto_managed,
            sequential_download: self.sequential_download,
            download_limit: parse(SettingsNumber::DownloadLimit)?,
            max_connections: parse(SettingsNumber::MaxConnections)?,
            max_uploads: parse(SettingsNumber::MaxUploads)?,
            upload_limit: parse(SettingsNumber::UploadLimit)?,
        })
    }
}
