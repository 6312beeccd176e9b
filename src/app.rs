use std::time::{Duration, Instant};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{debug, error, warn};

use crate::{
    form::{AddTorrentForm, SettingsEntry, SettingsForm, TextField, SETTINGS_ENTRIES},
    i18n::{Language, Strings},
    model::{Torrent, TorrentListPage},
    pagination::{page_count, PaginationCoordinator},
    rpc::{PauseAction, PorlaError, RpcResult, TorrentService},
};

/// Rows the list screen spends on anything but torrents.
const RESERVED_ROWS: u16 = 11;
/// Rows a single torrent takes on the list screen.
const ROWS_PER_TORRENT: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Loading,
    List,
    AddTorrent,
    RemoveConfirm,
    MoveTorrent,
    TorrentSettings,
    Quitting,
}

impl Screen {
    pub fn is_sub_menu(self) -> bool {
        matches!(
            self,
            Screen::AddTorrent
                | Screen::RemoveConfirm
                | Screen::MoveTorrent
                | Screen::TorrentSettings
        )
    }
}

#[derive(Clone)]
pub struct StatusUpdate {
    text: String,
    level: StatusLevel,
}

impl StatusUpdate {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            level: StatusLevel::Info,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            level: StatusLevel::Success,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            level: StatusLevel::Warning,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            level: StatusLevel::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
    expires_at: Instant,
}

impl StatusMessage {
    fn from_update(update: StatusUpdate) -> Self {
        let duration = match update.level {
            StatusLevel::Info => Duration::from_secs(4),
            StatusLevel::Success => Duration::from_secs(5),
            StatusLevel::Warning => Duration::from_secs(6),
            StatusLevel::Error => Duration::from_secs(8),
        };
        Self {
            text: update.text,
            level: update.level,
            expires_at: Instant::now() + duration,
        }
    }
}

/// View state of the dashboard and the transitions between its screens.
///
/// All daemon calls block; nothing else touches this state while one is in
/// flight. Mutations never refresh the list themselves, the next tick picks
/// up whatever the daemon did.
pub struct App<S> {
    service: S,
    strings: &'static Strings,
    pagination: PaginationCoordinator,
    screen: Screen,
    cursor: usize,
    page: usize,
    sub_menu_cursor: usize,
    sub_menu_entries: usize,
    list: TorrentListPage,
    add_form: AddTorrentForm,
    move_path: TextField,
    settings_form: SettingsForm,
    ninja_mode: bool,
    status: Option<StatusMessage>,
    toast: Option<StatusMessage>,
}

impl<S: TorrentService> App<S> {
    pub fn new(service: S, page_size: usize, language: Language) -> Self {
        Self {
            service,
            strings: language.strings(),
            pagination: PaginationCoordinator::new(page_size),
            screen: Screen::List,
            cursor: 0,
            page: 0,
            sub_menu_cursor: 0,
            sub_menu_entries: 0,
            list: TorrentListPage::default(),
            add_form: AddTorrentForm::default(),
            move_path: TextField::default(),
            settings_form: SettingsForm::default(),
            ninja_mode: false,
            status: None,
            toast: None,
        }
    }

    /// Shows the loading screen until the first tick has polled the daemon.
    pub fn begin_loading(&mut self) {
        self.screen = Screen::Loading;
    }

    #[cfg(test)]
    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn strings(&self) -> &'static Strings {
        self.strings
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.pagination.page_size()
    }

    pub fn page_count(&self) -> usize {
        page_count(self.list.torrents_total, self.pagination.page_size())
    }

    pub fn list(&self) -> &TorrentListPage {
        &self.list
    }

    pub fn torrents(&self) -> &[Torrent] {
        &self.list.torrents
    }

    pub fn selected_torrent(&self) -> Option<&Torrent> {
        self.list.torrents.get(self.cursor)
    }

    pub fn sub_menu_cursor(&self) -> usize {
        self.sub_menu_cursor
    }

    pub fn add_form(&self) -> &AddTorrentForm {
        &self.add_form
    }

    pub fn move_path(&self) -> &TextField {
        &self.move_path
    }

    pub fn settings_form(&self) -> &SettingsForm {
        &self.settings_form
    }

    pub fn ninja_mode(&self) -> bool {
        self.ninja_mode
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn toast(&self) -> Option<&StatusMessage> {
        self.toast.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.screen == Screen::Quitting
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Resize(_, height) => self.resize(height),
            Event::Paste(text) => self.handle_paste(&text),
            _ => {}
        }
    }

    pub fn on_tick(&mut self) {
        self.expire_status();
        match self.screen {
            Screen::List => self.refresh(),
            Screen::Loading => {
                self.refresh();
                self.screen = Screen::List;
            }
            _ => {}
        }
    }

    /// Adjusts the page size used by the next list request.
    pub fn resize(&mut self, height: u16) {
        let page_size = height.saturating_sub(RESERVED_ROWS) / ROWS_PER_TORRENT;
        if page_size != 0 {
            self.pagination.set_page_size(usize::from(page_size));
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }
        if self.screen.is_sub_menu() {
            match key.code {
                KeyCode::Esc => {
                    self.leave_sub_menu();
                    return;
                }
                KeyCode::Up => {
                    self.sub_menu_cursor = self.sub_menu_cursor.saturating_sub(1);
                    return;
                }
                KeyCode::Down => {
                    if self.sub_menu_cursor + 1 < self.sub_menu_entries {
                        self.sub_menu_cursor += 1;
                    }
                    return;
                }
                _ => {}
            }
        }
        match self.screen {
            Screen::List => self.handle_list_key(key),
            Screen::Loading => {
                if key.code == KeyCode::Char('q') {
                    self.quit();
                }
            }
            Screen::AddTorrent => self.handle_add_key(key),
            Screen::RemoveConfirm => self.handle_remove_key(key),
            Screen::MoveTorrent => self.handle_move_key(key),
            Screen::TorrentSettings => self.handle_settings_key(key),
            Screen::Quitting => {}
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Char('a') => {
                self.open_sub_menu(Screen::AddTorrent, AddTorrentForm::ENTRIES);
            }
            KeyCode::Char('r') => {
                if !self.list.torrents.is_empty() {
                    self.open_sub_menu(Screen::RemoveConfirm, 0);
                }
            }
            KeyCode::Char('m') => {
                if let Some(torrent) = self.selected_torrent() {
                    let save_path = torrent.save_path.clone();
                    self.move_path.set(save_path);
                    self.open_sub_menu(Screen::MoveTorrent, 1);
                }
            }
            KeyCode::Char('s') => self.open_settings(),
            KeyCode::Char('p') => self.pause_or_resume_selected(),
            KeyCode::Char('n') => {
                self.ninja_mode = !self.ninja_mode;
                let messages = &self.strings().messages;
                let text = if self.ninja_mode {
                    messages.ninja_on
                } else {
                    messages.ninja_off
                };
                self.set_status(StatusUpdate::info(text));
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                } else {
                    self.previous_page();
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < self.list.torrents.len() {
                    self.cursor += 1;
                } else {
                    self.next_page();
                }
            }
            KeyCode::Left | KeyCode::Char('g') => self.previous_page(),
            KeyCode::Right | KeyCode::Char('h') => self.next_page(),
            _ => {}
        }
    }

    fn handle_add_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab => self.add_form.mode = self.add_form.mode.toggled(),
            KeyCode::Enter => self.submit_add(),
            KeyCode::Backspace => {
                if let Some(field) = self.add_form.field_mut(self.sub_menu_cursor) {
                    field.backspace();
                }
            }
            KeyCode::Char(c) => {
                if let Some(field) = self.add_form.field_mut(self.sub_menu_cursor) {
                    field.push(c);
                }
            }
            _ => {}
        }
    }

    fn handle_remove_key(&mut self, key: KeyEvent) {
        let keep_data = match key.code {
            KeyCode::Char('y') => false,
            KeyCode::Char('n') => true,
            _ => return,
        };
        if let Some(torrent) = self.selected_torrent().cloned() {
            let result = self.service.remove(&torrent, keep_data);
            let messages = &self.strings().messages;
            if self.report("remove", messages.remove_failed, result).is_some() {
                self.set_status(StatusUpdate::success(format!(
                    "{} {}",
                    messages.removed, torrent.name
                )));
            }
        }
        self.return_to_list();
    }

    fn handle_move_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                if self.move_path.is_blank() {
                    return;
                }
                let path = self.move_path.value().trim().to_string();
                if let Some(torrent) = self.selected_torrent().cloned() {
                    let result = self.service.move_storage(&torrent, &path);
                    let strings = self.strings;
                    if self
                        .report("move", strings.messages.move_failed, result)
                        .is_some()
                    {
                        self.set_status(StatusUpdate::success(format!(
                            "{} {} → {path}",
                            strings.moving, torrent.name
                        )));
                    }
                }
                self.move_path.clear();
                self.return_to_list();
            }
            KeyCode::Backspace => self.move_path.backspace(),
            KeyCode::Char(c) => self.move_path.push(c),
            _ => {}
        }
    }

    fn handle_settings_key(&mut self, key: KeyEvent) {
        let entry = SETTINGS_ENTRIES.get(self.sub_menu_cursor).copied();
        match (key.code, entry) {
            (KeyCode::Enter, _) => self.submit_settings(),
            (KeyCode::Char(' '), Some(SettingsEntry::Toggle(toggle))) => {
                self.settings_form.toggle(toggle);
            }
            (KeyCode::Backspace, Some(SettingsEntry::Number(field))) => {
                self.settings_form.number_mut(field).backspace();
            }
            (KeyCode::Char(c), Some(SettingsEntry::Number(field))) if !c.is_whitespace() => {
                self.settings_form.number_mut(field).push(c);
            }
            _ => {}
        }
    }

    fn handle_paste(&mut self, text: &str) {
        match self.screen {
            Screen::List => {
                self.open_sub_menu(Screen::AddTorrent, AddTorrentForm::ENTRIES);
                self.add_form.source.push_str(text.trim());
            }
            Screen::AddTorrent => {
                if let Some(field) = self.add_form.field_mut(self.sub_menu_cursor) {
                    field.push_str(text);
                }
            }
            Screen::MoveTorrent => self.move_path.push_str(text),
            Screen::TorrentSettings => {
                if let Some(SettingsEntry::Number(field)) =
                    SETTINGS_ENTRIES.get(self.sub_menu_cursor).copied()
                {
                    self.settings_form.number_mut(field).push_str(text.trim());
                }
            }
            _ => {}
        }
    }

    fn open_sub_menu(&mut self, screen: Screen, entries: usize) {
        self.sub_menu_cursor = 0;
        self.sub_menu_entries = entries;
        self.screen = screen;
    }

    fn open_settings(&mut self) {
        let Some(torrent) = self.selected_torrent().cloned() else {
            return;
        };
        match self.service.properties(&torrent) {
            Ok(props) => {
                self.settings_form = SettingsForm::from_properties(&props);
                self.open_sub_menu(Screen::TorrentSettings, SETTINGS_ENTRIES.len());
            }
            Err(err) => {
                warn!("cannot load settings of {}: {err}", torrent.name);
                self.set_status(StatusUpdate::error(format!(
                    "{}: {err}",
                    self.strings.messages.settings_unavailable
                )));
            }
        }
    }

    fn submit_add(&mut self) {
        let Some((source, save_path, mode)) = self.add_form.submission() else {
            return;
        };
        let result = self.service.add(&source, &save_path, mode);
        let messages = &self.strings().messages;
        if self.report("add", messages.add_failed, result).is_some() {
            self.set_status(StatusUpdate::success(messages.torrent_added));
        }
        self.add_form.clear();
        self.return_to_list();
    }

    fn submit_settings(&mut self) {
        let settings = match self.settings_form.settings() {
            Ok(settings) => settings,
            Err(invalid) => {
                debug!("settings rejected: {invalid}");
                let strings = self.strings;
                self.set_status(StatusUpdate::error(format!(
                    "{}: {} ({:?})",
                    strings.number_label(invalid.field),
                    strings.messages.not_a_number,
                    invalid.value
                )));
                return;
            }
        };
        if let Some(torrent) = self.selected_torrent().cloned() {
            let result = self.service.set_properties(&torrent, &settings);
            let messages = &self.strings().messages;
            if self
                .report("settings update", messages.settings_update_failed, result)
                .is_some()
            {
                self.set_status(StatusUpdate::success(format!(
                    "{} {}",
                    messages.settings_updated, torrent.name
                )));
            }
        }
        self.return_to_list();
    }

    fn pause_or_resume_selected(&mut self) {
        let Some(torrent) = self.selected_torrent().cloned() else {
            return;
        };
        let result = self.service.pause_or_resume(&torrent);
        let messages = &self.strings().messages;
        let label = match self.report("pause/resume", messages.pause_resume_failed, result) {
            Some(PauseAction::Paused) => messages.paused,
            Some(PauseAction::Resumed) => messages.resumed,
            None => return,
        };
        self.set_status(StatusUpdate::success(format!("{label} {}", torrent.name)));
    }

    fn leave_sub_menu(&mut self) {
        match self.screen {
            Screen::AddTorrent => self.add_form.clear(),
            Screen::MoveTorrent => self.move_path.clear(),
            Screen::TorrentSettings => self.settings_form = SettingsForm::default(),
            _ => {}
        }
        self.return_to_list();
    }

    fn return_to_list(&mut self) {
        self.screen = Screen::List;
        self.sub_menu_cursor = 0;
        self.sub_menu_entries = 0;
        self.clamp_cursor();
    }

    fn quit(&mut self) {
        debug!("quitting");
        self.screen = Screen::Quitting;
    }

    fn previous_page(&mut self) {
        if self.page == 0 {
            return;
        }
        match self.load_page(self.page - 1) {
            Ok(()) => self.cursor = self.last_index(),
            Err(err) => self.list_failed(err),
        }
        self.clamp_cursor();
    }

    fn next_page(&mut self) {
        if self.page + 1 >= self.page_count() {
            return;
        }
        match self.load_page(self.page + 1) {
            Ok(()) => self.cursor = 0,
            Err(err) => self.list_failed(err),
        }
        self.clamp_cursor();
    }

    fn refresh(&mut self) {
        if let Err(err) = self.reconcile() {
            self.list_failed(err);
        }
        self.clamp_cursor();
    }

    /// Reloads the current page and restores the page and cursor bounds
    /// against whatever the daemon reports now.
    fn reconcile(&mut self) -> RpcResult<()> {
        let requested = self.page;
        self.load_page(requested)?;
        let pages = self.page_count();
        if pages > 0 && self.page > pages - 1 {
            debug!("page {} past the last page {}, reloading", self.page, pages - 1);
            self.load_page(pages - 1)?;
        }
        if self.page < requested {
            // An empty page past the end only moves the index back; fetch the
            // rows of the page it settled on so the cursor lands on a torrent.
            if self.list.torrents.is_empty() && self.list.torrents_total > 0 {
                debug!("page {requested} came back empty, loading page {}", self.page);
                self.load_page(self.page)?;
            }
            self.cursor = self.last_index();
        }
        Ok(())
    }

    fn load_page(&mut self, target: usize) -> RpcResult<()> {
        let (list, page) = self.pagination.request_page(&self.service, target)?;
        self.list = list;
        self.page = page;
        Ok(())
    }

    fn last_index(&self) -> usize {
        self.list.torrents.len().saturating_sub(1)
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.last_index());
    }

    /// The last list stays on screen and the next tick tries again.
    fn list_failed(&mut self, err: PorlaError) {
        warn!("torrent list request failed: {err}");
        self.set_status(StatusUpdate::warning(format!(
            "{}: {err}",
            self.strings.messages.list_failed
        )));
    }

    /// Surfaces a failed mutation; the caller moves on either way.
    fn report<T>(&mut self, action: &str, label: &str, result: RpcResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                error!("{action} failed: {err}");
                self.set_status(StatusUpdate::error(format!("{label}: {err}")));
                None
            }
        }
    }

    fn set_status(&mut self, update: StatusUpdate) {
        let message = StatusMessage::from_update(update);
        if matches!(message.level, StatusLevel::Warning | StatusLevel::Error) {
            self.toast = Some(message.clone());
        }
        self.status = Some(message);
    }

    fn expire_status(&mut self) {
        let now = Instant::now();
        if self.status.as_ref().is_some_and(|s| now >= s.expires_at) {
            self.status = None;
        }
        if self.toast.as_ref().is_some_and(|t| now >= t.expires_at) {
            self.toast = None;
        }
    }
}
