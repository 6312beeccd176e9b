use std::str::FromStr;

use thiserror::Error;

use crate::{form::SettingsNumber, model::TorrentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    French,
}

#[derive(Debug, Error)]
#[error("unknown language {0:?} (expected english or french)")]
pub struct UnknownLanguage(String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "english" | "en" => Ok(Language::English),
            "french" | "fr" | "français" => Ok(Language::French),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

impl Language {
    pub fn strings(self) -> &'static Strings {
        match self {
            Language::English => &ENGLISH,
            Language::French => &FRENCH,
        }
    }
}

pub struct Keybinds {
    pub yes: &'static str,
    pub no: &'static str,
    pub back: &'static str,
    pub quit: &'static str,
    pub done: &'static str,
    pub select: &'static str,
    pub change_page: &'static str,
    pub select_reduced: &'static str,
    pub add_torrent: &'static str,
    pub pause_resume: &'static str,
    pub remove_torrent: &'static str,
    pub move_torrent: &'static str,
    pub toggle_source: &'static str,
    pub torrent_settings: &'static str,
    pub toggle_option: &'static str,
    pub ninja_mode: &'static str,
}

pub struct TorrentStatusLabels {
    pub error: &'static str,
    pub file_check_queued: &'static str,
    pub checking_files: &'static str,
    pub downloading_metadata: &'static str,
    pub queued: &'static str,
    pub paused: &'static str,
    pub downloading: &'static str,
    pub finished: &'static str,
    pub seeding_queued: &'static str,
    pub seeding: &'static str,
    pub unknown: &'static str,
}

/// Status line, toast and validation texts.
pub struct Messages {
    pub notice: &'static str,
    pub ninja_on: &'static str,
    pub ninja_off: &'static str,
    pub torrent_added: &'static str,
    pub removed: &'static str,
    pub paused: &'static str,
    pub resumed: &'static str,
    pub settings_updated: &'static str,
    pub settings_unavailable: &'static str,
    pub list_failed: &'static str,
    pub add_failed: &'static str,
    pub remove_failed: &'static str,
    pub move_failed: &'static str,
    pub pause_resume_failed: &'static str,
    pub settings_update_failed: &'static str,
    pub not_a_number: &'static str,
}

pub struct Strings {
    pub add_torrent: &'static str,
    pub magnet_link: &'static str,
    pub torrent_file: &'static str,
    pub save_path: &'static str,
    pub deleting: &'static str,
    pub delete_data_question: &'static str,
    pub moving: &'static str,
    pub new_save_path: &'static str,
    pub settings_for: &'static str,
    pub auto_managed: &'static str,
    pub sequential_download: &'static str,
    pub download_limit: &'static str,
    pub download_limit_hint: &'static str,
    pub max_connections: &'static str,
    pub max_uploads: &'static str,
    pub upload_limit: &'static str,
    pub torrent: &'static str,
    pub torrents: &'static str,
    pub active: &'static str,
    pub page: &'static str,
    pub max_results: &'static str,
    pub no_torrents: &'static str,
    pub magnet_placeholder: &'static str,
    pub torrent_file_placeholder: &'static str,
    pub save_dir_placeholder: &'static str,
    pub new_save_dir_placeholder: &'static str,
    pub see_you_later: &'static str,
    pub connecting: &'static str,
    pub keybinds: Keybinds,
    pub states: TorrentStatusLabels,
    pub messages: Messages,
}

impl Strings {
    pub fn status(&self, status: TorrentStatus) -> &'static str {
        let labels = &self.states;
        match status {
            TorrentStatus::Error => labels.error,
            TorrentStatus::FileCheckQueued => labels.file_check_queued,
            TorrentStatus::CheckingFiles => labels.checking_files,
            TorrentStatus::DownloadingMetadata => labels.downloading_metadata,
            TorrentStatus::Queued => labels.queued,
            TorrentStatus::Paused => labels.paused,
            TorrentStatus::Downloading => labels.downloading,
            TorrentStatus::Finished => labels.finished,
            TorrentStatus::SeedingQueued => labels.seeding_queued,
            TorrentStatus::Seeding => labels.seeding,
            TorrentStatus::Unknown => labels.unknown,
        }
    }

    pub fn number_label(&self, field: SettingsNumber) -> &'static str {
        match field {
            SettingsNumber::DownloadLimit => self.download_limit,
            SettingsNumber::MaxConnections => self.max_connections,
            SettingsNumber::MaxUploads => self.max_uploads,
            SettingsNumber::UploadLimit => self.upload_limit,
        }
    }

    pub fn torrent_count(&self, count: usize) -> String {
        let noun = if count == 1 { self.torrent } else { self.torrents };
        format!("{count} {noun} {}", self.active)
    }
}

pub static ENGLISH: Strings = Strings {
    add_torrent: "Add torrent",
    magnet_link: "Magnet link",
    torrent_file: "Path to .torrent file",
    save_path: "Save path",
    deleting: "Deleting",
    delete_data_question: "Delete downloaded data as well?",
    moving: "Moving",
    new_save_path: "New save path",
    settings_for: "Torrent settings for",
    auto_managed: "Automatically managed",
    sequential_download: "Sequential download",
    download_limit: "Download limit",
    download_limit_hint: "The download limit for this torrent. -1 means unlimited.",
    max_connections: "Max connections",
    max_uploads: "Max uploads",
    upload_limit: "Upload limit",
    torrent: "torrent",
    torrents: "torrents",
    active: "active",
    page: "Page",
    max_results: "max results",
    no_torrents: "No torrents",
    magnet_placeholder: "magnet:...",
    torrent_file_placeholder: "/path/to/torrent/file",
    save_dir_placeholder: "/path/to/save/dir/",
    new_save_dir_placeholder: "/path/to/new/save/dir/",
    see_you_later: "See you later!",
    connecting: "Establishing connection to Porla backend.",
    keybinds: Keybinds {
        yes: "y: yes",
        no: "n: no",
        back: "esc: back",
        quit: "q: quit",
        done: "enter: done",
        select: "j/k, up/down: select",
        change_page: "g/h, left/right: change page",
        select_reduced: "up/down: select",
        add_torrent: "a: add new torrent",
        pause_resume: "p: pause/resume torrent",
        remove_torrent: "r: remove torrent",
        move_torrent: "m: move torrent",
        toggle_source: "tab: toggle magnet/.torrent",
        torrent_settings: "s: torrent settings",
        toggle_option: "space: toggle option",
        ninja_mode: "n: toggle ninja mode",
    },
    states: TorrentStatusLabels {
        error: "error",
        file_check_queued: "file check queued",
        checking_files: "checking files",
        downloading_metadata: "downloading metadata",
        queued: "queued",
        paused: "paused",
        downloading: "downloading",
        finished: "finished",
        seeding_queued: "seeding queued",
        seeding: "seeding",
        unknown: "unknown",
    },
    messages: Messages {
        notice: " Notice ",
        ninja_on: "Ninja mode on",
        ninja_off: "Ninja mode off",
        torrent_added: "Torrent submitted",
        removed: "Removed",
        paused: "Paused",
        resumed: "Resumed",
        settings_updated: "Updated settings of",
        settings_unavailable: "Settings unavailable",
        list_failed: "RPC error",
        add_failed: "Add failed",
        remove_failed: "Remove failed",
        move_failed: "Move failed",
        pause_resume_failed: "Pause/resume failed",
        settings_update_failed: "Settings update failed",
        not_a_number: "must be a whole number",
    },
};

pub static FRENCH: Strings = Strings {
    add_torrent: "Ajout de torrent",
    magnet_link: "Lien aimant",
    torrent_file: "Chemin du fichier .torrent",
    save_path: "Chemin d'enregistrement",
    deleting: "Suppression de",
    delete_data_question: "Supprimer aussi les données?",
    moving: "Déplacement de",
    new_save_path: "Nouveau chemin d'enregistrement",
    settings_for: "Réglages du torrent",
    auto_managed: "Géré automatiquement",
    sequential_download: "Téléchargement séquentiel",
    download_limit: "Limite de la vitesse de téléchargement",
    download_limit_hint:
        "La limite de la vitesse de téléchargement pour ce torrent. -1 veut dire illimité.",
    max_connections: "Nombre max. de connexions",
    max_uploads: "Nombre max. de partages",
    upload_limit: "Limite de la vitesse d'envoi",
    torrent: "torrent",
    torrents: "torrents",
    active: "actif(s)",
    page: "Page",
    max_results: "résultats max.",
    no_torrents: "Aucun torrent",
    magnet_placeholder: "magnet:...",
    torrent_file_placeholder: "/chemin/du/fichier/torrent",
    save_dir_placeholder: "/chemin/du/dossier/denregistrement/",
    new_save_dir_placeholder: "/chemin/du/nouveau/dossier/denregistrement/",
    see_you_later: "Au revoir!",
    connecting: "Connexion au backend de Porla.",
    keybinds: Keybinds {
        yes: "y: oui",
        no: "n: non",
        back: "esc: retour",
        quit: "q: quitter",
        done: "enter: finir",
        select: "j/k, up/down: sélectionner",
        change_page: "g/h, left/right: changer de page",
        select_reduced: "up/down: sélectionner",
        add_torrent: "a: ajouter un torrent",
        pause_resume: "p: interrompre/relancer le torrent",
        remove_torrent: "r: supprimer torrent",
        move_torrent: "m: déplacer torrent",
        toggle_source: "tab: basculer lien magnet/fichier .torrent",
        torrent_settings: "s: réglages du torrent",
        toggle_option: "espace: basculer l'option",
        ninja_mode: "n: mode ninja",
    },
    states: TorrentStatusLabels {
        error: "erreur",
        file_check_queued: "vérification en attente",
        checking_files: "vérification des fichiers",
        downloading_metadata: "téléchargement des métadonnées",
        queued: "en file d'attente",
        paused: "interrompu",
        downloading: "téléchargement",
        finished: "terminé",
        seeding_queued: "diffusion en attente",
        seeding: "diffusion",
        unknown: "inconnu",
    },
    messages: Messages {
        notice: " Avis ",
        ninja_on: "Mode ninja activé",
        ninja_off: "Mode ninja désactivé",
        torrent_added: "Torrent ajouté",
        removed: "Supprimé :",
        paused: "Interrompu :",
        resumed: "Relancé :",
        settings_updated: "Réglages mis à jour pour",
        settings_unavailable: "Réglages indisponibles",
        list_failed: "Erreur RPC",
        add_failed: "Échec de l'ajout",
        remove_failed: "Échec de la suppression",
        move_failed: "Échec du déplacement",
        pause_resume_failed: "Échec de l'interruption/relance",
        settings_update_failed: "Échec de la mise à jour des réglages",
        not_a_number: "doit être un nombre entier",
    },
};
