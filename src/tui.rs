use std::{
    io::{self, Stdout},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, error, info};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::{
    app::{App, Screen, StatusLevel},
    config::AppConfig,
    form::{AddSource, SettingsNumber, SettingsToggle, TextField},
    i18n::Strings,
    model::{format_bytes, format_eta, format_progress, format_speed, Torrent, TorrentStatus},
    pagination::page_count,
    poll::{LoopEvent, PollDriver},
    rpc::{PorlaClient, TorrentService},
};

type Backend = ratatui::backend::CrosstermBackend<Stdout>;

const PROGRESS_WIDTH: usize = 20;
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Names shown instead of the real ones while ninja mode is on.
const DISGUISES: [&str; 10] = [
    "archlinux-2022.10.01-x86_64.iso",
    "archlinux-2022.11.01-x86_64.iso",
    "archlinux-2022.12.01-x86_64.iso",
    "debian-11.6.0-amd64-netinst.iso",
    "debian-edu-11.6.0-amd64-netinst.iso",
    "debian-mac-11.6.0-amd64-netinst.iso",
    "ubuntu-20.04.5-desktop-amd64.iso",
    "ubuntu-20.04.5-live-server-amd64.iso",
    "ubuntu-22.04.1-desktop-amd64.iso",
    "ubuntu-22.04.1-live-server-amd64.iso",
];

pub fn run(config: AppConfig) -> Result<()> {
    let client =
        PorlaClient::new(config.rpc.clone()).context("failed to construct Porla RPC client")?;
    info!("connecting to {}", config.rpc.url);

    let mut terminal = setup_terminal()?;
    let (event_tx, event_rx) = unbounded();
    let shutdown = Arc::new(AtomicBool::new(false));
    let input_handle = spawn_input_thread(event_tx, Arc::clone(&shutdown));

    let mut app = App::new(client, config.page_size, config.language);
    if let Ok(size) = terminal.size() {
        app.resize(size.height);
    }
    app.begin_loading();

    let loop_result = run_loop(
        &mut terminal,
        &mut app,
        &event_rx,
        PollDriver::new(config.poll_interval),
    );

    shutdown.store(true, Ordering::Relaxed);
    drop(event_rx);
    restore_terminal(&mut terminal)?;
    input_handle.join().ok();

    loop_result
}

fn run_loop<S: TorrentService>(
    terminal: &mut Terminal<Backend>,
    app: &mut App<S>,
    events: &Receiver<Event>,
    mut driver: PollDriver,
) -> Result<()> {
    driver.fire_now();
    terminal.draw(|f| render(f, app))?;
    while let Some(event) = driver.next_event(events) {
        match event {
            LoopEvent::Input(event) => app.handle_event(event),
            LoopEvent::Tick => app.on_tick(),
        }
        terminal.draw(|f| render(f, app))?;
        if app.should_quit() {
            break;
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<Backend>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Terminal<Backend>) -> Result<()> {
    disable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, DisableBracketedPaste, LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Forwards terminal events until the loop goes away or `shutdown` is set.
fn spawn_input_thread(tx: Sender<Event>, shutdown: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let poll_rate = Duration::from_millis(250);
        while !shutdown.load(Ordering::Relaxed) {
            match event::poll(poll_rate) {
                Ok(true) => match event::read() {
                    Ok(evt) => {
                        if tx.send(evt).is_err() {
                            break;
                        }
                    }
                    Err(err) => error!("input error: {err}"),
                },
                Ok(false) => {}
                Err(err) => {
                    error!("input poll failed: {err}");
                    break;
                }
            }
        }
        debug!("input thread stopped");
    })
}

pub fn render<S: TorrentService>(frame: &mut Frame, app: &App<S>) {
    let strings = app.strings();
    let area = frame.size();
    match app.screen() {
        Screen::Loading => render_loading(frame, area, strings),
        Screen::List => render_list(frame, area, app, strings),
        Screen::AddTorrent => render_add(frame, area, app, strings),
        Screen::RemoveConfirm => render_remove(frame, area, app, strings),
        Screen::MoveTorrent => render_move(frame, area, app, strings),
        Screen::TorrentSettings => render_settings(frame, area, app, strings),
        Screen::Quitting => {
            let paragraph = Paragraph::new(vec![Line::from(""), Line::from(strings.see_you_later)]);
            frame.render_widget(paragraph, indented(area));
            return;
        }
    }
    render_toast(frame, app, strings);
}

fn render_loading(frame: &mut Frame, area: Rect, strings: &Strings) {
    let lines = vec![
        version_line(),
        Line::from(""),
        Line::from(progress_bar(0.0)),
        Line::from(""),
        Line::from(strings.connecting),
        Line::from(""),
        hints(&[strings.keybinds.quit]),
    ];
    frame.render_widget(Paragraph::new(lines), indented(area));
}

fn render_list<S: TorrentService>(frame: &mut Frame, area: Rect, app: &App<S>, strings: &Strings) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(indented(area));

    let list = app.list();
    let mut header = vec![
        version_line(),
        Line::from(""),
        Line::from(strings.torrent_count(list.torrents_total)),
    ];
    if let Some(status) = app.status() {
        header.push(Line::from(Span::styled(
            status.text.clone(),
            status_style(status.level),
        )));
    }
    frame.render_widget(Paragraph::new(header), chunks[0]);

    let mut body = Vec::new();
    if list.torrents.is_empty() {
        body.push(Line::from(Span::styled(
            strings.no_torrents,
            Style::default().fg(Color::DarkGray),
        )));
    }
    for (index, torrent) in list.torrents.iter().enumerate() {
        body.extend(torrent_lines(
            torrent,
            index,
            app.ninja_mode(),
            index == app.cursor(),
            strings,
        ));
    }
    frame.render_widget(Paragraph::new(body), chunks[1]);

    let pages = page_count(list.torrents_total, app.page_size()).max(1);
    let keys = &strings.keybinds;
    let footer = vec![
        Line::from(Span::styled(
            format!(
                "{} {}/{} ({} {})",
                strings.page,
                app.page() + 1,
                pages,
                app.page_size(),
                strings.max_results
            ),
            Style::default().fg(Color::DarkGray),
        )),
        hints(&[keys.select, keys.change_page, keys.pause_resume, keys.add_torrent]),
        hints(&[
            keys.remove_torrent,
            keys.move_torrent,
            keys.torrent_settings,
            keys.ninja_mode,
            keys.quit,
        ]),
    ];
    frame.render_widget(Paragraph::new(footer), chunks[2]);
}

fn torrent_lines(
    torrent: &Torrent,
    index: usize,
    ninja_mode: bool,
    selected: bool,
    strings: &Strings,
) -> Vec<Line<'static>> {
    let name = if ninja_mode {
        DISGUISES[index % DISGUISES.len()].to_string()
    } else {
        torrent.name.clone()
    };
    let status = torrent.status();
    let hybrid = if torrent.info_hash.is_hybrid() {
        " (v1+v2)"
    } else {
        ""
    };
    let title_style = if selected {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(status_color(status))
    };
    let mut stats = format!(
        "↓ {:<11} ↑ {:<11} ↔ {:<9} P {:<6} S {:<6}",
        format_speed(torrent.download_rate),
        format_speed(torrent.upload_rate),
        format_bytes(torrent.size),
        torrent.num_peers,
        torrent.num_seeds
    );
    if status == TorrentStatus::Downloading {
        stats.push_str(&format!("  E {}", format_eta(torrent.eta())));
    }
    vec![
        Line::from(Span::styled(
            format!("- {:<11} {name}{hybrid}", format!("[{}]", strings.status(status))),
            title_style,
        )),
        Line::from(Span::styled(stats, Style::default().fg(Color::Cyan))),
        Line::from(progress_bar(torrent.progress)),
        Line::from(""),
    ]
}

fn render_add<S: TorrentService>(frame: &mut Frame, area: Rect, app: &App<S>, strings: &Strings) {
    let form = app.add_form();
    let (source_label, source_placeholder) = match form.mode {
        AddSource::MagnetLink => (strings.magnet_link, strings.magnet_placeholder),
        AddSource::TorrentFile => (strings.torrent_file, strings.torrent_file_placeholder),
    };
    let keys = &strings.keybinds;
    let lines = vec![
        heading(strings.add_torrent.to_string()),
        Line::from(""),
        label(source_label),
        input_line(&form.source, source_placeholder, app.sub_menu_cursor() == 0),
        Line::from(""),
        label(strings.save_path),
        input_line(
            &form.save_path,
            strings.save_dir_placeholder,
            app.sub_menu_cursor() == 1,
        ),
        Line::from(""),
        hints(&[keys.toggle_source, keys.select_reduced, keys.done, keys.back]),
    ];
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }),
        indented(area),
    );
}

fn render_remove<S: TorrentService>(
    frame: &mut Frame,
    area: Rect,
    app: &App<S>,
    strings: &Strings,
) {
    let keys = &strings.keybinds;
    let lines = vec![
        heading(format!("{} {}", strings.deleting, selected_name(app))),
        Line::from(""),
        Line::from(strings.delete_data_question),
        Line::from(""),
        hints(&[keys.yes, keys.no, keys.back]),
    ];
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }),
        indented(area),
    );
}

fn render_move<S: TorrentService>(frame: &mut Frame, area: Rect, app: &App<S>, strings: &Strings) {
    let keys = &strings.keybinds;
    let lines = vec![
        heading(format!("{} {}", strings.moving, selected_name(app))),
        Line::from(""),
        label(strings.new_save_path),
        input_line(app.move_path(), strings.new_save_dir_placeholder, true),
        Line::from(""),
        hints(&[keys.done, keys.back]),
    ];
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }),
        indented(area),
    );
}

fn render_settings<S: TorrentService>(
    frame: &mut Frame,
    area: Rect,
    app: &App<S>,
    strings: &Strings,
) {
    let form = app.settings_form();
    let cursor = app.sub_menu_cursor();
    let number = |field: SettingsNumber, position: usize| {
        input_line(form.number(field), "", cursor == position)
    };
    let keys = &strings.keybinds;
    let lines = vec![
        heading(format!("{} {}", strings.settings_for, selected_name(app))),
        Line::from(""),
        checkbox(
            strings.auto_managed,
            form.is_enabled(SettingsToggle::AutoManaged),
            cursor == 0,
        ),
        checkbox(
            strings.sequential_download,
            form.is_enabled(SettingsToggle::SequentialDownload),
            cursor == 1,
        ),
        Line::from(""),
        label(strings.download_limit),
        number(SettingsNumber::DownloadLimit, 2),
        Line::from(Span::styled(
            strings.download_limit_hint,
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
        label(strings.max_connections),
        number(SettingsNumber::MaxConnections, 3),
        Line::from(""),
        label(strings.max_uploads),
        number(SettingsNumber::MaxUploads, 4),
        Line::from(""),
        label(strings.upload_limit),
        number(SettingsNumber::UploadLimit, 5),
        Line::from(""),
        hints(&[keys.select_reduced, keys.toggle_option, keys.done, keys.back]),
    ];
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }),
        indented(area),
    );
}

fn render_toast<S: TorrentService>(frame: &mut Frame, app: &App<S>, strings: &Strings) {
    let Some(toast) = app.toast() else {
        return;
    };
    let frame_area = frame.size();
    if frame_area.width < 20 || frame_area.height < 5 {
        return;
    }
    let padding = 2;
    let max_width = frame_area.width.saturating_sub(padding * 2);
    let width = max_width.clamp(20, 60);
    let height = 3;
    let x = frame_area
        .x
        .saturating_add(frame_area.width.saturating_sub(width + padding));
    let y = frame_area
        .y
        .saturating_add(frame_area.height.saturating_sub(height + padding));
    let area = Rect::new(x, y, width, height);
    let text = Line::from(Span::styled(toast.text.clone(), status_style(toast.level)));
    let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::raw(strings.messages.notice)),
    );
    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn selected_name<S: TorrentService>(app: &App<S>) -> String {
    app.selected_torrent()
        .map(|torrent| torrent.name.clone())
        .unwrap_or_default()
}

fn version_line() -> Line<'static> {
    Line::from(vec![
        Span::raw("osprey "),
        Span::styled(VERSION, Style::default().fg(Color::Yellow)),
    ])
}

fn heading(text: String) -> Line<'static> {
    Line::from(Span::styled(
        text,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))
}

fn label(text: &'static str) -> Line<'static> {
    Line::from(Span::styled(text, Style::default().fg(Color::Cyan)))
}

fn input_line(field: &TextField, placeholder: &'static str, focused: bool) -> Line<'static> {
    let prompt = if focused { "> " } else { "  " };
    let content = if field.value().is_empty() {
        Span::styled(placeholder, Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(field.value().to_string())
    };
    let mut spans = vec![Span::raw(prompt), content];
    if focused {
        spans.push(Span::styled(
            "_",
            Style::default().add_modifier(Modifier::SLOW_BLINK),
        ));
    }
    Line::from(spans)
}

fn checkbox(text: &'static str, checked: bool, selected: bool) -> Line<'static> {
    let mark = if checked { "[x]" } else { "[ ]" };
    let style = if selected {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Line::from(Span::styled(format!("{mark} {text}"), style))
}

fn hints(keybinds: &[&'static str]) -> Line<'static> {
    let mut spans = Vec::new();
    for (index, keybind) in keybinds.iter().enumerate() {
        if index != 0 {
            spans.push(Span::styled(" • ", Style::default().fg(Color::DarkGray)));
        }
        spans.push(Span::styled(*keybind, Style::default().fg(Color::DarkGray)));
    }
    Line::from(spans)
}

fn progress_bar(progress: f64) -> String {
    let progress = progress.clamp(0.0, 1.0);
    let full = (progress * PROGRESS_WIDTH as f64).round() as usize;
    format!(
        "{}{} {}",
        "█".repeat(full),
        "░".repeat(PROGRESS_WIDTH - full),
        format_progress(progress)
    )
}

fn status_color(status: TorrentStatus) -> Color {
    match status {
        TorrentStatus::Error => Color::Red,
        TorrentStatus::Paused => Color::DarkGray,
        TorrentStatus::Downloading | TorrentStatus::DownloadingMetadata => Color::Blue,
        TorrentStatus::Finished | TorrentStatus::Seeding => Color::Green,
        TorrentStatus::CheckingFiles
        | TorrentStatus::FileCheckQueued
        | TorrentStatus::Queued
        | TorrentStatus::SeedingQueued => Color::Magenta,
        TorrentStatus::Unknown => Color::White,
    }
}

fn status_style(level: StatusLevel) -> Style {
    match level {
        StatusLevel::Info => Style::default().fg(Color::Blue),
        StatusLevel::Success => Style::default().fg(Color::Green),
        StatusLevel::Warning => Style::default().fg(Color::Yellow),
        StatusLevel::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

fn indented(area: Rect) -> Rect {
    Rect {
        x: area.x.saturating_add(2).min(area.right()),
        y: area.y.saturating_add(1).min(area.bottom()),
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(1),
    }
}
