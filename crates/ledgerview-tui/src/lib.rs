// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ledgerview_app::{
    AppCommand, AppEvent, AppMode, AppState, BulkAck, BulkAction, BulkDecision, BulkRequest,
    BusinessProfile, CellRendering, CollectionPage, Column, FetchRequest, FetchStatus, PageCheck,
    PromptKind, QueryState, RequestToken, SelectionBanner, SortDirection, TransactionId,
    YearRequest, format_date, parse_date, render_cell, rendering_for,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use time::Date;
use tracing::warn;

const EVENT_POLL: Duration = Duration::from_millis(60);
const STATUS_TTL: Duration = Duration::from_secs(4);
const CHECKED: &str = "[x]";
const UNCHECKED: &str = "[ ]";
const PARTIAL: &str = "[-]";

/// Data access used by the event loop. The blocking calls are the contract;
/// the `spawn_*` hooks run them inline by default and report back over `tx`,
/// so a runtime only overrides them to move work onto other threads.
pub trait AppRuntime {
    fn fetch_page(&mut self, query: &QueryState) -> Result<CollectionPage>;
    fn fetch_years(&mut self, client_id: &str) -> Result<Vec<i32>>;
    fn list_business_profiles(&mut self) -> Result<Vec<BusinessProfile>>;
    fn submit_bulk_action(&mut self, request: &BulkRequest) -> Result<BulkAck>;

    fn spawn_fetch_page(&mut self, request: FetchRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self
            .fetch_page(&request.query)
            .map_err(|error| error.to_string());
        send(
            &tx,
            InternalEvent::PageLoaded {
                token: request.token,
                result,
            },
        )
    }

    fn spawn_fetch_years(&mut self, request: YearRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self
            .fetch_years(&request.client_id)
            .map_err(|error| error.to_string());
        send(
            &tx,
            InternalEvent::YearsLoaded {
                token: request.token,
                result,
            },
        )
    }

    fn spawn_load_profiles(&mut self, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self
            .list_business_profiles()
            .map_err(|error| error.to_string());
        send(&tx, InternalEvent::ProfilesLoaded(result))
    }

    fn spawn_bulk_action(&mut self, request: BulkRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self
            .submit_bulk_action(&request)
            .map_err(|error| error.to_string());
        send(
            &tx,
            InternalEvent::BulkCompleted {
                action: request.action,
                result,
            },
        )
    }
}

pub fn send(tx: &Sender<InternalEvent>, event: InternalEvent) -> Result<()> {
    tx.send(event)
        .map_err(|_| anyhow!("internal event channel closed"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    PageLoaded {
        token: RequestToken,
        result: Result<CollectionPage, String>,
    },
    YearsLoaded {
        token: RequestToken,
        result: Result<Vec<i32>, String>,
    },
    ProfilesLoaded(Result<Vec<BusinessProfile>, String>),
    BulkCompleted {
        action: BulkAction,
        result: Result<BulkAck, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PickerValue {
    Client(Option<String>),
    Year(Option<i32>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct PickerUiState {
    query: String,
    cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct PreviewUiState {
    title: String,
    text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    cursor_row: usize,
    cursor_col: usize,
    picker: PickerUiState,
    date_input: String,
    preview: PreviewUiState,
    status_token: u64,
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    if let Err(error) = runtime.spawn_load_profiles(internal_tx.clone()) {
        emit_status(
            state,
            &mut view_data,
            &internal_tx,
            format!("client list unavailable: {error}"),
        );
    }

    let mut result = Ok(());
    loop {
        pump(
            state,
            runtime,
            &mut view_data,
            &internal_tx,
            &internal_rx,
            Instant::now(),
        );

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        match next_key() {
            Ok(Some(key)) => {
                if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                    break;
                }
            }
            Ok(None) => {}
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn next_key() -> Result<Option<KeyEvent>> {
    if !event::poll(EVENT_POLL).context("poll event")? {
        return Ok(None);
    }
    match event::read().context("read event")? {
        Event::Key(key) => Ok(Some(key)),
        _ => Ok(None),
    }
}

/// One loop iteration's worth of bookkeeping: apply worker results, let the
/// search debouncer fire, then issue whatever requests the state now wants.
fn pump<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
    now: Instant,
) {
    process_internal_events(state, view_data, tx, rx);
    apply_command(state, view_data, tx, AppCommand::Tick(now));
    issue_pending_requests(state, runtime, view_data, tx);
}

fn issue_pending_requests<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    if let Some(request) = state.take_fetch_request() {
        let token = request.token;
        if let Err(error) = runtime.spawn_fetch_page(request, tx.clone()) {
            warn!(%error, "could not start collection fetch");
            state.apply_page(token, Err(error.to_string()));
        }
    }
    if let Some(request) = state.take_year_request()
        && let Err(error) = runtime.spawn_fetch_years(request, tx.clone())
    {
        warn!(%error, "could not start year lookup");
        emit_status(state, view_data, tx, format!("year list unavailable: {error}"));
    }
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        let events = match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus)
            }
            InternalEvent::ClearStatus { .. } => Vec::new(),
            InternalEvent::PageLoaded { token, result } => {
                let events = state.apply_page(token, result);
                clamp_cursor(state, view_data);
                events
            }
            InternalEvent::YearsLoaded { token, result } => state.apply_years(token, result),
            InternalEvent::ProfilesLoaded(result) => state.apply_profiles(result),
            InternalEvent::BulkCompleted { action, result } => {
                state.apply_bulk_outcome(action, result)
            }
        };
        schedule_clears(&events, view_data, tx);
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_TTL);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn schedule_clears(events: &[AppEvent], view_data: &mut ViewData, tx: &Sender<InternalEvent>) {
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::StatusUpdated(_)))
    {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(tx, view_data.status_token);
    }
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    apply_command(
        state,
        view_data,
        internal_tx,
        AppCommand::SetStatus(message.into()),
    );
}

fn apply_command(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) -> Vec<AppEvent> {
    let events = state.dispatch(command);
    schedule_clears(&events, view_data, internal_tx);
    events
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match state.mode {
        AppMode::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
                apply_command(state, view_data, internal_tx, AppCommand::ExitToNav);
            }
            false
        }
        AppMode::Preview => {
            view_data.preview = PreviewUiState::default();
            apply_command(state, view_data, internal_tx, AppCommand::ExitToNav);
            false
        }
        AppMode::Search => {
            handle_search_key(state, view_data, internal_tx, key);
            false
        }
        AppMode::Prompt(PromptKind::DateRange) => {
            handle_date_range_key(state, view_data, internal_tx, key);
            false
        }
        AppMode::Prompt(kind) => {
            handle_picker_key(state, view_data, internal_tx, kind, key);
            false
        }
        AppMode::Nav => handle_nav_key(state, runtime, view_data, internal_tx, key),
    }
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let command = match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('j') | KeyCode::Down => {
            move_row(state, view_data, 1);
            return false;
        }
        KeyCode::Char('k') | KeyCode::Up => {
            move_row(state, view_data, -1);
            return false;
        }
        KeyCode::Char('l') | KeyCode::Right => {
            move_col(state, view_data, 1);
            return false;
        }
        KeyCode::Char('h') | KeyCode::Left => {
            move_col(state, view_data, -1);
            return false;
        }
        KeyCode::Char('g') => {
            view_data.cursor_row = 0;
            return false;
        }
        KeyCode::Char('G') => {
            view_data.cursor_row = state.fetch().rows.len().saturating_sub(1);
            return false;
        }
        KeyCode::Enter => {
            open_preview(state, view_data, tx);
            return false;
        }
        KeyCode::Char('B') => {
            run_bulk_action(state, runtime, view_data, tx);
            return false;
        }
        KeyCode::Char('s') => match current_column(state, view_data) {
            Some(column) => match column.sort_field() {
                Some(field) => AppCommand::ToggleSort(field),
                None => {
                    emit_status(state, view_data, tx, format!("{} is not sortable", column.label()));
                    return false;
                }
            },
            None => return false,
        },
        KeyCode::Char(' ') => match current_row_id(state, view_data) {
            Some(id) => AppCommand::ToggleRow(id),
            None => return false,
        },
        KeyCode::Char('n') | KeyCode::PageDown => AppCommand::NextPage,
        KeyCode::Char('p') | KeyCode::PageUp => AppCommand::PrevPage,
        KeyCode::Char('a') => AppCommand::TogglePage,
        KeyCode::Char('A') => AppCommand::SelectAllMatching,
        KeyCode::Char('x') => AppCommand::ClearSelection,
        KeyCode::Char('/') => AppCommand::EnterSearch,
        KeyCode::Char('c') => {
            view_data.picker = PickerUiState::default();
            AppCommand::OpenPrompt(PromptKind::Client)
        }
        KeyCode::Char('y') => {
            view_data.picker = PickerUiState::default();
            AppCommand::OpenPrompt(PromptKind::Year)
        }
        KeyCode::Char('D') => {
            view_data.date_input = date_range_text(state);
            AppCommand::OpenPrompt(PromptKind::DateRange)
        }
        KeyCode::Char('C') => AppCommand::ClearFilters,
        KeyCode::Char('z') => AppCommand::CyclePageSize,
        KeyCode::Char('v') => AppCommand::ToggleColumnSet,
        KeyCode::Char('b') => AppCommand::CycleBulkAction,
        KeyCode::Char('r') => AppCommand::Refresh,
        KeyCode::Char('?') => AppCommand::OpenHelp,
        KeyCode::Esc => AppCommand::ClearStatus,
        _ => return false,
    };

    let events = apply_command(state, view_data, tx, command);
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::ColumnSetChanged(_)))
    {
        clamp_cursor(state, view_data);
    }
    false
}

fn handle_search_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let mut draft = state.search_draft().to_owned();
    match key.code {
        KeyCode::Enter => {
            apply_command(state, view_data, tx, AppCommand::FlushSearch);
            apply_command(state, view_data, tx, AppCommand::ExitToNav);
            return;
        }
        KeyCode::Esc => {
            apply_command(state, view_data, tx, AppCommand::CancelSearch);
            return;
        }
        KeyCode::Backspace => {
            draft.pop();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => draft.clear(),
        KeyCode::Char(ch) => draft.push(ch),
        _ => return,
    }
    apply_command(
        state,
        view_data,
        tx,
        AppCommand::SearchInput {
            value: draft,
            at: Instant::now(),
        },
    );
}

fn handle_picker_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    kind: PromptKind,
    key: KeyEvent,
) {
    let entries = picker_entries(state, kind, &view_data.picker.query);
    match key.code {
        KeyCode::Esc => {
            apply_command(state, view_data, tx, AppCommand::ExitToNav);
        }
        KeyCode::Down | KeyCode::Tab => {
            if view_data.picker.cursor + 1 < entries.len() {
                view_data.picker.cursor += 1;
            }
        }
        KeyCode::Up | KeyCode::BackTab => {
            view_data.picker.cursor = view_data.picker.cursor.saturating_sub(1);
        }
        KeyCode::Backspace => {
            view_data.picker.query.pop();
            view_data.picker.cursor = 0;
        }
        KeyCode::Char(ch) => {
            view_data.picker.query.push(ch);
            view_data.picker.cursor = 0;
        }
        KeyCode::Enter => {
            let command = match entries.get(view_data.picker.cursor) {
                Some((_, value)) => picker_command(value.clone()),
                None => match typed_picker_command(kind, &view_data.picker.query) {
                    Ok(command) => command,
                    Err(error) => {
                        emit_status(state, view_data, tx, error.to_string());
                        return;
                    }
                },
            };
            apply_command(state, view_data, tx, AppCommand::ExitToNav);
            apply_command(state, view_data, tx, command);
        }
        _ => {}
    }
}

fn picker_command(value: PickerValue) -> AppCommand {
    match value {
        PickerValue::Client(client_id) => AppCommand::SetClient(client_id),
        PickerValue::Year(year) => AppCommand::SetYear(year),
    }
}

fn typed_picker_command(kind: PromptKind, query: &str) -> Result<AppCommand> {
    let query = query.trim();
    match kind {
        PromptKind::Client if query.is_empty() => Ok(AppCommand::SetClient(None)),
        PromptKind::Client => Ok(AppCommand::SetClient(Some(query.to_owned()))),
        PromptKind::Year => match query.parse::<i32>() {
            Ok(year) if (1900..=9999).contains(&year) => Ok(AppCommand::SetYear(Some(year))),
            _ => bail!("{query:?} is not a year"),
        },
        PromptKind::DateRange => bail!("date range uses its own prompt"),
    }
}

/// Choices offered by a picker, narrowed by a case-insensitive substring of
/// the typed query. The first entry always clears the filter.
fn picker_entries(state: &AppState, kind: PromptKind, query: &str) -> Vec<(String, PickerValue)> {
    let needle = query.trim().to_lowercase();
    let keep = |label: &str| needle.is_empty() || label.to_lowercase().contains(&needle);
    let mut entries = Vec::new();
    match kind {
        PromptKind::Client => {
            if needle.is_empty() {
                entries.push(("all clients".to_owned(), PickerValue::Client(None)));
            }
            entries.extend(
                state
                    .profiles
                    .iter()
                    .map(|profile| (profile.label(), profile))
                    .filter(|(label, _)| keep(label))
                    .map(|(label, profile)| {
                        (label, PickerValue::Client(Some(profile.client_id.clone())))
                    }),
            );
        }
        PromptKind::Year => {
            if needle.is_empty() {
                entries.push(("any year".to_owned(), PickerValue::Year(None)));
            }
            entries.extend(
                state
                    .year_options()
                    .iter()
                    .map(|year| (year.to_string(), *year))
                    .filter(|(label, _)| keep(label))
                    .map(|(label, year)| (label, PickerValue::Year(Some(year)))),
            );
        }
        PromptKind::DateRange => {}
    }
    entries
}

fn handle_date_range_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            apply_command(state, view_data, tx, AppCommand::ExitToNav);
        }
        KeyCode::Backspace => {
            view_data.date_input.pop();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.date_input.clear();
        }
        KeyCode::Char(ch) => view_data.date_input.push(ch),
        KeyCode::Enter => match parse_date_range(&view_data.date_input) {
            Ok((start, end)) => {
                apply_command(state, view_data, tx, AppCommand::ExitToNav);
                apply_command(state, view_data, tx, AppCommand::SetDateRange { start, end });
            }
            Err(error) => emit_status(state, view_data, tx, error.to_string()),
        },
        _ => {}
    }
}

/// Parses `START..END` where either side may be blank; a blank input clears
/// the range.
fn parse_date_range(input: &str) -> Result<(Option<Date>, Option<Date>)> {
    let input = input.trim();
    if input.is_empty() {
        return Ok((None, None));
    }
    let (start, end) = input.split_once("..").unwrap_or((input, ""));
    let side = |raw: &str| -> Result<Option<Date>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        parse_date(raw)
            .map(Some)
            .ok_or_else(|| anyhow!("expected YYYY-MM-DD, got {raw:?}"))
    };
    Ok((side(start)?, side(end)?))
}

fn date_range_text(state: &AppState) -> String {
    let filter = &state.query.filter;
    match (filter.start_date, filter.end_date) {
        (None, None) => String::new(),
        (start, end) => format!(
            "{}..{}",
            start.map(format_date).unwrap_or_default(),
            end.map(format_date).unwrap_or_default()
        ),
    }
}

fn run_bulk_action<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    match state.bulk_request() {
        BulkDecision::Submit(request) => {
            let action = request.action;
            let message = format!("{}...", request.describe(state.total()));
            emit_status(state, view_data, tx, message);
            if let Err(error) = runtime.spawn_bulk_action(request, tx.clone()) {
                let events = state.apply_bulk_outcome(action, Err(error.to_string()));
                schedule_clears(&events, view_data, tx);
            }
        }
        BulkDecision::NeedsConfirmation(action) => {
            let count = state.selection.count(state.total());
            emit_status(
                state,
                view_data,
                tx,
                format!(
                    "press B again to {} {count} row(s)",
                    action.label().to_lowercase()
                ),
            );
        }
        BulkDecision::Unavailable(reason) => emit_status(state, view_data, tx, reason.message()),
        BulkDecision::InFlight => {
            emit_status(state, view_data, tx, "a bulk action is already running");
        }
    }
}

fn open_preview(state: &mut AppState, view_data: &mut ViewData, tx: &Sender<InternalEvent>) {
    let Some(column) = current_column(state, view_data) else {
        return;
    };
    let Some(row) = state.fetch().rows.get(view_data.cursor_row) else {
        return;
    };
    match render_cell(column, &row.value(column)).tooltip {
        Some(text) => {
            view_data.preview = PreviewUiState {
                title: column.label().to_owned(),
                text,
            };
            apply_command(state, view_data, tx, AppCommand::OpenPreview);
        }
        None => emit_status(state, view_data, tx, "nothing hidden in this cell"),
    }
}

fn current_column(state: &AppState, view_data: &ViewData) -> Option<Column> {
    state.visible_columns().get(view_data.cursor_col).copied()
}

fn current_row_id(state: &AppState, view_data: &ViewData) -> Option<TransactionId> {
    state
        .fetch()
        .rows
        .get(view_data.cursor_row)
        .map(|row| row.id)
}

fn move_row(state: &AppState, view_data: &mut ViewData, delta: isize) {
    let rows = state.fetch().rows.len();
    if rows == 0 {
        view_data.cursor_row = 0;
        return;
    }
    view_data.cursor_row = view_data
        .cursor_row
        .saturating_add_signed(delta)
        .min(rows - 1);
}

fn move_col(state: &AppState, view_data: &mut ViewData, delta: isize) {
    let columns = state.visible_columns().len();
    if columns == 0 {
        view_data.cursor_col = 0;
        return;
    }
    view_data.cursor_col = view_data
        .cursor_col
        .saturating_add_signed(delta)
        .min(columns - 1);
}

fn clamp_cursor(state: &AppState, view_data: &mut ViewData) {
    view_data.cursor_row = view_data
        .cursor_row
        .min(state.fetch().rows.len().saturating_sub(1));
    view_data.cursor_col = view_data
        .cursor_col
        .min(state.visible_columns().len().saturating_sub(1));
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_text(state))
        .block(Block::default().title("ledgerview").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    let banner = Paragraph::new(banner_text(state.banner()))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    frame.render_widget(banner, layout[1]);

    render_table(frame, layout[2], state, view_data);

    let status = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[3]);

    match state.mode {
        AppMode::Help => {
            let area = centered_rect(80, 72, frame.area());
            frame.render_widget(Clear, area);
            let help = Paragraph::new(help_overlay_text())
                .block(Block::default().title("help").borders(Borders::ALL));
            frame.render_widget(help, area);
        }
        AppMode::Preview => {
            let area = centered_rect(70, 52, frame.area());
            frame.render_widget(Clear, area);
            let preview = Paragraph::new(render_preview_overlay_text(&view_data.preview))
                .block(
                    Block::default()
                        .title(view_data.preview.title.as_str())
                        .borders(Borders::ALL),
                );
            frame.render_widget(preview, area);
        }
        AppMode::Prompt(PromptKind::DateRange) => {
            let area = centered_rect(50, 24, frame.area());
            frame.render_widget(Clear, area);
            let prompt = Paragraph::new(render_date_prompt_text(&view_data.date_input))
                .block(Block::default().title("date range").borders(Borders::ALL));
            frame.render_widget(prompt, area);
        }
        AppMode::Prompt(kind) => {
            let area = centered_rect(50, 60, frame.area());
            frame.render_widget(Clear, area);
            let title = if kind == PromptKind::Client {
                "client"
            } else {
                "year"
            };
            let picker = Paragraph::new(render_picker_text(state, kind, &view_data.picker))
                .block(Block::default().title(title).borders(Borders::ALL));
            frame.render_widget(picker, area);
        }
        AppMode::Nav | AppMode::Search => {}
    }
}

fn header_text(state: &AppState) -> String {
    let filter = &state.query.filter;
    let search = if state.mode == AppMode::Search {
        format!("/{}▏", state.search_draft())
    } else if filter.search.is_empty() {
        "-".to_owned()
    } else {
        format!("{:?}", filter.search)
    };
    let year = filter
        .year
        .map_or_else(|| "any".to_owned(), |year| year.to_string());
    let dates = match date_range_text(state) {
        text if text.is_empty() => "any".to_owned(),
        text => text,
    };
    let arrow = match state.query.sort_direction {
        SortDirection::Asc => "↑",
        SortDirection::Desc => "↓",
    };
    let verb = state
        .bulk_action
        .map_or("none", |action| action.as_str());

    [
        format!(
            "client: {} | search: {search} | year: {year} | dates: {dates}",
            filter.client_id.as_deref().unwrap_or("all"),
        ),
        format!(
            "sort: {} {arrow} | page {}/{} | {} per page | columns: {} | action: {verb}",
            state.query.sort_field.column().label(),
            state.query.page_index + 1,
            state.page_count(),
            state.query.page_size.get(),
            state.column_set.as_str(),
        ),
    ]
    .join("\n")
}

fn banner_text(banner: SelectionBanner) -> String {
    match banner {
        SelectionBanner::Hidden => String::new(),
        SelectionBanner::OfferAllMatching { page_rows, total } => format!(
            " All {page_rows} rows on this page are selected. Press A to select all {total} matching rows."
        ),
        SelectionBanner::AllMatching { total } => {
            format!(" All {total} matching rows are selected. Press x to clear.")
        }
    }
}

fn empty_table_text(state: &AppState) -> &'static str {
    match state.fetch().status {
        FetchStatus::Idle | FetchStatus::Loading => "loading...",
        FetchStatus::Error => "could not load transactions; press r to retry",
        // Results shrank under the current page.
        FetchStatus::Ready if state.query.page_index >= state.page_count() => {
            "no rows on this page; press p to go back"
        }
        FetchStatus::Ready => "no matching transactions",
    }
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    view_data: &ViewData,
) {
    let fetch = state.fetch();
    let columns = state.visible_columns();
    let title = table_title(state);

    if fetch.rows.is_empty() {
        let empty =
            Paragraph::new(empty_table_text(state)).block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(empty, area);
        return;
    }

    let mut widths = vec![Constraint::Length(3)];
    widths.extend(columns.iter().map(|column| match rendering_for(*column) {
        CellRendering::IconOnly => Constraint::Length(4),
        CellRendering::Truncate { .. } => Constraint::Min(20),
        CellRendering::Plain => Constraint::Min(8),
    }));

    let mut header_cells = vec![Cell::from(page_check_marker(state.page_check()))];
    header_cells.extend(
        columns
            .iter()
            .map(|column| Cell::from(header_label_for_column(state, *column))),
    );
    let header = Row::new(header_cells).style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let rows = fetch.rows.iter().enumerate().map(|(row_index, row)| {
        let selected_row = row_index == view_data.cursor_row;
        let marker = if state.selection.contains(row.id) {
            CHECKED
        } else {
            UNCHECKED
        };
        let mut cells = vec![Cell::from(marker)];
        cells.extend(columns.iter().enumerate().map(|(column_index, column)| {
            let rendered = render_cell(*column, &row.value(*column));
            let mut style = Style::default();
            if selected_row {
                style = style.bg(Color::DarkGray);
            }
            if selected_row && column_index == view_data.cursor_col {
                style = Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD);
            }
            Cell::from(rendered.text).style(style)
        }));
        Row::new(cells)
    });

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn page_check_marker(check: PageCheck) -> &'static str {
    match check {
        PageCheck::Unchecked => UNCHECKED,
        PageCheck::Partial => PARTIAL,
        PageCheck::Checked => CHECKED,
    }
}

fn header_label_for_column(state: &AppState, column: Column) -> String {
    let mut label = column.label().to_owned();
    if column.sort_field() == Some(state.query.sort_field) {
        label.push_str(match state.query.sort_direction {
            SortDirection::Asc => " ↑",
            SortDirection::Desc => " ↓",
        });
    }
    label
}

fn table_title(state: &AppState) -> String {
    let fetch = state.fetch();
    let mut title = format!("transactions ({})", fetch.total);
    let selected = state.selection.count(fetch.total);
    if selected > 0 {
        title.push_str(&format!(" | {selected} selected"));
    }
    match fetch.status {
        FetchStatus::Loading => title.push_str(" | loading"),
        FetchStatus::Error => {
            if let Some(error) = &fetch.error {
                title.push_str(&format!(" | error: {error}"));
            }
        }
        FetchStatus::Idle | FetchStatus::Ready => {}
    }
    title
}

fn status_text(state: &AppState) -> String {
    let mode = match state.mode {
        AppMode::Nav => "NAV",
        AppMode::Search => "SEARCH",
        AppMode::Prompt(_) => "PROMPT",
        AppMode::Preview => "PREVIEW",
        AppMode::Help => "HELP",
    };
    let hints = match state.mode {
        AppMode::Search => "type to filter | enter apply | esc cancel",
        AppMode::Prompt(_) => "type to filter | up/down | enter choose | esc cancel",
        AppMode::Preview => "any key close",
        AppMode::Help => "? or esc close",
        AppMode::Nav => {
            "j/k/h/l | n/p page | s sort | space/a/A select | / search | c/y/D filter | b/B action | ? help | q"
        }
    };
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
}

fn render_preview_overlay_text(preview: &PreviewUiState) -> String {
    [
        preview.text.clone(),
        String::new(),
        "press any key to close".to_owned(),
    ]
    .join("\n")
}

fn render_date_prompt_text(input: &str) -> String {
    [
        "START..END (YYYY-MM-DD, either side optional)".to_owned(),
        String::new(),
        format!("> {input}▏"),
        String::new(),
        "enter apply | blank clears | esc cancel".to_owned(),
    ]
    .join("\n")
}

fn render_picker_text(state: &AppState, kind: PromptKind, picker: &PickerUiState) -> String {
    let mut lines = vec![format!("> {}▏", picker.query), String::new()];
    let entries = picker_entries(state, kind, &picker.query);
    if entries.is_empty() {
        lines.push(match kind {
            PromptKind::Year => "enter a four-digit year".to_owned(),
            _ => "enter uses the typed value".to_owned(),
        });
    }
    for (index, (label, _)) in entries.iter().enumerate() {
        let marker = if index == picker.cursor { ">" } else { " " };
        lines.push(format!("{marker} {label}"));
    }
    lines.join("\n")
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | q quit (nav)\n\
nav: j/k rows | h/l columns | g/G first/last row | n/p next/prev page | z page size\n\
sort: s sort by column (again to flip)\n\
select: space row | a page | A all matching | x clear\n\
filter: / search | c client | y year | D date range | C clear filters\n\
view: v summary/full columns | enter preview cell | r refresh\n\
actions: b choose action | B run (delete asks twice)\n\
search: type | enter apply now | esc cancel\n\
picker: type to filter | up/down | enter choose | esc cancel\n\
preview: any key close"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerview_app::{Record, Selection, SelectionDescriptor, SortField, ViewOptions};
    use ledgerview_testkit::MemoryCollection;
    use ratatui::backend::TestBackend;

    struct TestRuntime {
        collection: MemoryCollection,
        fetches: Vec<QueryState>,
        submitted: Vec<BulkRequest>,
        fail_profiles: bool,
    }

    impl TestRuntime {
        fn seeded() -> Self {
            Self::with_collection(MemoryCollection::seeded(11, 60, &[2023, 2024]))
        }

        fn with_collection(collection: MemoryCollection) -> Self {
            Self {
                collection,
                fetches: Vec::new(),
                submitted: Vec::new(),
                fail_profiles: false,
            }
        }
    }

    impl AppRuntime for TestRuntime {
        fn fetch_page(&mut self, query: &QueryState) -> Result<CollectionPage> {
            self.fetches.push(query.clone());
            Ok(self.collection.page(query))
        }

        fn fetch_years(&mut self, client_id: &str) -> Result<Vec<i32>> {
            Ok(self.collection.years(client_id))
        }

        fn list_business_profiles(&mut self) -> Result<Vec<BusinessProfile>> {
            if self.fail_profiles {
                bail!("connection refused");
            }
            Ok(self.collection.profiles())
        }

        fn submit_bulk_action(&mut self, request: &BulkRequest) -> Result<BulkAck> {
            self.submitted.push(request.clone());
            self.collection.apply_bulk(request)
        }
    }

    struct Harness {
        state: AppState,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: Sender<InternalEvent>,
        rx: Receiver<InternalEvent>,
    }

    impl Harness {
        fn new(runtime: TestRuntime) -> Self {
            let (tx, rx) = mpsc::channel();
            let mut harness = Self {
                state: AppState::new(ViewOptions::default()),
                runtime,
                view_data: ViewData::default(),
                tx,
                rx,
            };
            harness
                .runtime
                .spawn_load_profiles(harness.tx.clone())
                .expect("profiles should load inline");
            harness.settle();
            harness
        }

        fn seeded() -> Self {
            Self::new(TestRuntime::seeded())
        }

        fn settle(&mut self) {
            self.settle_at(Instant::now());
        }

        fn settle_at(&mut self, now: Instant) {
            for _ in 0..3 {
                pump(
                    &mut self.state,
                    &mut self.runtime,
                    &mut self.view_data,
                    &self.tx,
                    &self.rx,
                    now,
                );
                pump_internal(&mut self.state, &mut self.view_data, &self.tx, &self.rx);
            }
        }

        fn press(&mut self, key: KeyEvent) -> bool {
            let quit = handle_key_event(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                key,
            );
            self.settle();
            quit
        }

        fn run_key_script(&mut self, keys: &[KeyEvent]) {
            for key in keys {
                self.press(*key);
            }
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.press(char_key(ch));
            }
        }

        fn status(&self) -> &str {
            self.state.status_line.as_deref().unwrap_or_default()
        }
    }

    fn pump_internal(
        state: &mut AppState,
        view_data: &mut ViewData,
        tx: &Sender<InternalEvent>,
        rx: &Receiver<InternalEvent>,
    ) {
        process_internal_events(state, view_data, tx, rx);
    }

    fn char_key(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn choose_client(harness: &mut Harness, client_id: &str) {
        harness.press(char_key('c'));
        harness.type_text(client_id);
        harness.press(key(KeyCode::Enter));
    }

    #[test]
    fn startup_loads_first_page_and_client_list() {
        let harness = Harness::seeded();
        assert_eq!(harness.state.fetch().rows.len(), 25);
        assert_eq!(harness.state.total(), 240);
        assert_eq!(harness.state.profiles.len(), 4);
        assert_eq!(harness.runtime.fetches.len(), 1);
        assert_eq!(harness.state.fetch().status, FetchStatus::Ready);
    }

    #[test]
    fn profile_failure_leaves_empty_client_list() {
        let mut runtime = TestRuntime::seeded();
        runtime.fail_profiles = true;
        let harness = Harness::new(runtime);
        assert!(harness.state.profiles.is_empty());
        assert!(harness.status().contains("client list unavailable"));
        assert_eq!(harness.state.fetch().rows.len(), 25);
    }

    #[test]
    fn row_and_page_selection_drive_banner() {
        let mut harness = Harness::seeded();
        let first = harness.state.fetch().rows[0].id;

        harness.press(char_key(' '));
        assert!(harness.state.selection.contains(first));
        assert_eq!(harness.state.page_check(), PageCheck::Partial);
        assert_eq!(banner_text(harness.state.banner()), "");

        harness.press(char_key('a'));
        assert_eq!(harness.state.page_check(), PageCheck::Checked);
        assert!(banner_text(harness.state.banner()).contains("Press A to select all 240"));

        harness.press(char_key('A'));
        assert_eq!(harness.state.selection, Selection::AllMatchingFilter);
        assert!(banner_text(harness.state.banner()).contains("All 240 matching rows"));
        assert_eq!(harness.status(), "all 240 matching rows selected");

        harness.press(char_key('x'));
        assert!(harness.state.selection.is_empty());
    }

    #[test]
    fn select_all_matching_needs_full_page_first() {
        let mut harness = Harness::seeded();
        harness.press(char_key(' '));
        harness.press(char_key('A'));
        assert!(!harness.state.selection.is_all_matching());
        assert_eq!(harness.status(), "select every row on this page first");
    }

    #[test]
    fn search_commits_on_enter_and_drops_selection() {
        let mut harness = Harness::seeded();
        harness.press(char_key(' '));
        harness.press(char_key('/'));
        assert_eq!(harness.state.mode, AppMode::Search);

        harness.type_text("no-such-merchant-xyz");
        harness.press(key(KeyCode::Enter));

        assert_eq!(harness.state.mode, AppMode::Nav);
        assert_eq!(harness.state.query.filter.search, "no-such-merchant-xyz");
        assert!(harness.state.selection.is_empty());
        assert_eq!(harness.state.total(), 0);
        let last = harness.runtime.fetches.last().expect("search should refetch");
        assert_eq!(last.filter.search, "no-such-merchant-xyz");
    }

    #[test]
    fn search_waits_for_quiet_period() {
        let mut harness = Harness::seeded();
        harness.press(char_key('/'));
        harness.type_text("blue");
        assert_eq!(harness.runtime.fetches.len(), 1);
        assert!(harness.state.search_pending());

        harness.settle_at(Instant::now() + Duration::from_secs(1));
        assert_eq!(harness.runtime.fetches.len(), 2);
        assert_eq!(harness.state.query.filter.search, "blue");
        assert_eq!(harness.state.mode, AppMode::Search);

        harness.press(key(KeyCode::Esc));
        assert_eq!(harness.state.mode, AppMode::Nav);
        assert_eq!(harness.state.query.filter.search, "blue");
    }

    #[test]
    fn search_escape_discards_draft() {
        let mut harness = Harness::seeded();
        harness.press(char_key('/'));
        harness.type_text("shell");
        harness.press(key(KeyCode::Esc));
        assert_eq!(harness.state.mode, AppMode::Nav);
        assert_eq!(harness.state.query.filter.search, "");
        assert_eq!(harness.runtime.fetches.len(), 1);
    }

    #[test]
    fn sort_key_uses_cursor_column() {
        let mut harness = Harness::seeded();
        harness.press(char_key('s'));
        assert_eq!(harness.state.query.sort_direction, SortDirection::Asc);

        harness.press(char_key('l'));
        harness.press(char_key('s'));
        assert_eq!(
            harness.state.query.sort_field,
            SortField::Amount
        );
        let last = harness.runtime.fetches.last().expect("sort should refetch");
        assert_eq!(last.sort_field, SortField::Amount);

        harness.view_data.cursor_col = 7;
        assert_eq!(current_column(&harness.state, &harness.view_data), Some(Column::Reasoning));
        harness.press(char_key('s'));
        assert_eq!(harness.status(), "reasoning is not sortable");
    }

    #[test]
    fn paging_keys_stay_in_bounds() {
        let mut harness = Harness::seeded();
        harness.press(char_key('p'));
        assert_eq!(harness.state.query.page_index, 0);
        assert_eq!(harness.runtime.fetches.len(), 1);

        harness.press(char_key('n'));
        assert_eq!(harness.state.query.page_index, 1);
        assert_eq!(harness.runtime.fetches.last().map(QueryState::offset), Some(25));

        for _ in 0..20 {
            harness.press(char_key('n'));
        }
        assert_eq!(harness.state.query.page_index, 9);
        assert!(header_text(&harness.state).contains("page 10/10"));
    }

    #[test]
    fn emptied_page_points_back_until_user_pages() {
        let mut harness = Harness::seeded();
        harness.press(char_key('n'));
        harness.press(char_key('n'));
        assert_eq!(harness.state.query.page_index, 2);

        let shrunk = CollectionPage {
            rows: Vec::new(),
            total: 30,
            columns: None,
        };
        apply_command(
            &mut harness.state,
            &mut harness.view_data,
            &harness.tx,
            AppCommand::Refresh,
        );
        let request = harness.state.take_fetch_request().expect("refresh request");
        send(
            &harness.tx,
            InternalEvent::PageLoaded {
                token: request.token,
                result: Ok(shrunk),
            },
        )
        .expect("send");
        pump_internal(&mut harness.state, &mut harness.view_data, &harness.tx, &harness.rx);

        assert_eq!(harness.state.query.page_index, 2);
        assert_eq!(
            empty_table_text(&harness.state),
            "no rows on this page; press p to go back"
        );

        harness.press(char_key('p'));
        assert_eq!(harness.state.query.page_index, 1);
        assert_eq!(harness.runtime.fetches.last().map(QueryState::offset), Some(25));
    }

    #[test]
    fn page_size_cycles_with_status() {
        let mut harness = Harness::seeded();
        harness.press(char_key('z'));
        assert_eq!(harness.state.query.page_size.get(), 50);
        assert_eq!(harness.state.fetch().rows.len(), 50);
        assert_eq!(harness.status(), "50 rows per page");
    }

    #[test]
    fn client_picker_filters_profiles() {
        let mut harness = Harness::seeded();
        harness.press(char_key('c'));
        assert_eq!(harness.state.mode, AppMode::Prompt(PromptKind::Client));
        let entries = picker_entries(&harness.state, PromptKind::Client, "");
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].1, PickerValue::Client(None));

        harness.type_text("glob");
        harness.press(key(KeyCode::Enter));
        assert_eq!(harness.state.mode, AppMode::Nav);
        assert_eq!(harness.state.query.filter.client_id.as_deref(), Some("GLOBEX"));
        assert_eq!(harness.state.total(), 60);
        assert_eq!(harness.state.year_options(), &[2024, 2023]);
    }

    #[test]
    fn year_picker_offers_client_years() {
        let mut harness = Harness::seeded();
        choose_client(&mut harness, "ACME");

        harness.press(char_key('y'));
        harness.press(key(KeyCode::Down));
        harness.press(key(KeyCode::Enter));
        assert_eq!(harness.state.query.filter.year, Some(2024));
        assert_eq!(harness.state.total(), 30);

        harness.press(char_key('y'));
        harness.type_text("abc");
        harness.press(key(KeyCode::Enter));
        assert_eq!(harness.status(), "\"abc\" is not a year");
        assert_eq!(harness.state.mode, AppMode::Prompt(PromptKind::Year));

        harness.press(key(KeyCode::Esc));
        assert_eq!(harness.state.query.filter.year, Some(2024));
    }

    #[test]
    fn date_range_input_parses_either_side() {
        let start = parse_date("2024-01-01");
        let end = parse_date("2024-03-31");
        assert_eq!(
            parse_date_range("2024-01-01..2024-03-31").ok(),
            Some((start, end))
        );
        assert_eq!(parse_date_range("..2024-03-31").ok(), Some((None, end)));
        assert_eq!(parse_date_range(" 2024-01-01 ").ok(), Some((start, None)));
        assert_eq!(parse_date_range("").ok(), Some((None, None)));
        assert!(parse_date_range("2024-13-01..").is_err());
    }

    #[test]
    fn date_range_prompt_applies_filter() {
        let mut harness = Harness::seeded();
        harness.press(char_key('D'));
        harness.type_text("2024-01-01..");
        harness.press(key(KeyCode::Enter));
        assert_eq!(harness.state.mode, AppMode::Nav);
        assert_eq!(harness.state.query.filter.start_date, parse_date("2024-01-01"));
        assert_eq!(harness.state.query.filter.end_date, None);
        assert_eq!(harness.state.total(), 120);

        harness.press(char_key('D'));
        assert_eq!(harness.view_data.date_input, "2024-01-01..");
        harness.type_text("x");
        harness.press(key(KeyCode::Enter));
        assert!(harness.status().contains("expected YYYY-MM-DD"));

        harness.press(key(KeyCode::Esc));
        harness.press(char_key('C'));
        assert!(harness.state.query.filter.is_unfiltered());
        assert_eq!(harness.state.total(), 240);
    }

    #[test]
    fn delete_all_matching_requires_confirmation() {
        let mut harness = Harness::seeded();
        choose_client(&mut harness, "ACME");
        harness.press(char_key('a'));
        harness.press(char_key('A'));
        apply_command(
            &mut harness.state,
            &mut harness.view_data,
            &harness.tx,
            AppCommand::ChooseBulkAction(Some(BulkAction::Delete)),
        );

        harness.press(char_key('B'));
        assert!(harness.status().starts_with("press B again to delete 60"));
        assert!(harness.runtime.submitted.is_empty());

        harness.press(char_key('v'));
        harness.press(char_key('B'));
        assert!(harness.runtime.submitted.is_empty());

        harness.press(char_key('B'));
        assert_eq!(harness.runtime.submitted.len(), 1);
        let SelectionDescriptor::Filter(payload) = &harness.runtime.submitted[0].target else {
            panic!("expected a filter descriptor");
        };
        assert_eq!(payload.client_id.as_deref(), Some("ACME"));
        assert!(harness.state.selection.is_empty());
        assert!(harness.status().contains("60 affected"));
        assert!(!harness.state.bulk_in_flight());

        harness.press(char_key('r'));
        assert_eq!(harness.state.total(), 0);
    }

    #[test]
    fn bulk_action_explains_missing_inputs() {
        let mut harness = Harness::seeded();
        harness.press(char_key('B'));
        assert_eq!(harness.status(), "choose a bulk action first");

        harness.press(char_key('b'));
        assert!(header_text(&harness.state).contains(BulkAction::ALL[0].as_str()));
        harness.press(char_key('B'));
        assert_eq!(harness.status(), "select at least one row");

        harness.press(char_key(' '));
        harness.press(char_key('B'));
        assert_eq!(harness.runtime.submitted.len(), 1);
        let id = harness.runtime.submitted[0].target.clone();
        assert!(matches!(id, SelectionDescriptor::Ids(ids) if ids.len() == 1));
    }

    #[test]
    fn preview_shows_hidden_cell_text() {
        let description = "WIRE TRANSFER TO FIRST NATIONAL BANK OF SPRINGFIELD REF 99812";
        let record = Record {
            id: TransactionId::new(1),
            amount_cents: Some(-1200),
            description: Some(description.to_owned()),
            ..Record::default()
        };
        let mut harness = Harness::new(TestRuntime::with_collection(MemoryCollection::new(
            vec![record],
            Vec::new(),
        )));

        harness.press(char_key('l'));
        harness.press(key(KeyCode::Enter));
        assert_eq!(harness.status(), "nothing hidden in this cell");
        assert_eq!(harness.state.mode, AppMode::Nav);

        harness.press(char_key('l'));
        harness.press(key(KeyCode::Enter));
        assert_eq!(harness.state.mode, AppMode::Preview);
        assert_eq!(harness.view_data.preview.title, "description");
        assert_eq!(harness.view_data.preview.text, description);

        harness.press(char_key('j'));
        assert_eq!(harness.state.mode, AppMode::Nav);
        assert_eq!(harness.view_data.preview, PreviewUiState::default());
    }

    #[test]
    fn column_set_toggle_clamps_cursor() {
        let mut harness = Harness::seeded();
        harness.press(char_key('v'));
        assert_eq!(harness.state.visible_columns().len(), 18);
        for _ in 0..20 {
            harness.press(char_key('l'));
        }
        assert_eq!(harness.view_data.cursor_col, 17);

        harness.press(char_key('v'));
        assert_eq!(harness.status(), "summary columns");
        assert_eq!(harness.view_data.cursor_col, 7);
    }

    #[test]
    fn stale_results_never_replace_newer_page() {
        let mut harness = Harness::seeded();
        let query_a = harness.state.query.clone();
        apply_command(
            &mut harness.state,
            &mut harness.view_data,
            &harness.tx,
            AppCommand::Refresh,
        );
        let older = harness.state.take_fetch_request().expect("first request");
        apply_command(
            &mut harness.state,
            &mut harness.view_data,
            &harness.tx,
            AppCommand::NextPage,
        );
        let newer = harness.state.take_fetch_request().expect("second request");

        let newer_page = harness.runtime.collection.page(&newer.query);
        let expected = newer_page.rows.clone();
        send(
            &harness.tx,
            InternalEvent::PageLoaded {
                token: newer.token,
                result: Ok(newer_page),
            },
        )
        .expect("send");
        send(
            &harness.tx,
            InternalEvent::PageLoaded {
                token: older.token,
                result: Ok(harness.runtime.collection.page(&query_a)),
            },
        )
        .expect("send");
        pump_internal(&mut harness.state, &mut harness.view_data, &harness.tx, &harness.rx);

        assert_eq!(harness.state.fetch().rows, expected);
        assert_eq!(harness.state.fetch().request_token, Some(newer.token));
    }

    #[test]
    fn fetch_failure_keeps_rows_and_shows_error() {
        let mut harness = Harness::seeded();
        let rows = harness.state.fetch().rows.clone();
        apply_command(
            &mut harness.state,
            &mut harness.view_data,
            &harness.tx,
            AppCommand::Refresh,
        );
        let request = harness.state.take_fetch_request().expect("refresh request");
        assert!(table_title(&harness.state).contains("loading"));
        send(
            &harness.tx,
            InternalEvent::PageLoaded {
                token: request.token,
                result: Err("server returned 502".to_owned()),
            },
        )
        .expect("send");
        pump_internal(&mut harness.state, &mut harness.view_data, &harness.tx, &harness.rx);

        assert_eq!(harness.state.fetch().rows, rows);
        assert!(table_title(&harness.state).contains("error: server returned 502"));
    }

    #[test]
    fn stale_status_clear_is_ignored() {
        let mut harness = Harness::seeded();
        emit_status(&mut harness.state, &mut harness.view_data, &harness.tx, "first");
        let first = harness.view_data.status_token;
        emit_status(&mut harness.state, &mut harness.view_data, &harness.tx, "second");
        let second = harness.view_data.status_token;
        assert!(second > first);

        send(&harness.tx, InternalEvent::ClearStatus { token: first }).expect("send");
        pump_internal(&mut harness.state, &mut harness.view_data, &harness.tx, &harness.rx);
        assert_eq!(harness.status(), "second");

        send(&harness.tx, InternalEvent::ClearStatus { token: second }).expect("send");
        pump_internal(&mut harness.state, &mut harness.view_data, &harness.tx, &harness.rx);
        assert_eq!(harness.state.status_line, None);
    }

    #[test]
    fn quit_keys_depend_on_mode() {
        let mut harness = Harness::seeded();
        harness.press(char_key('/'));
        assert!(!harness.press(char_key('q')));
        assert_eq!(harness.state.search_draft(), "q");
        assert!(harness.press(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL)));

        harness.press(key(KeyCode::Esc));
        assert!(harness.press(char_key('q')));
    }

    #[test]
    fn help_overlay_toggles() {
        let mut harness = Harness::seeded();
        harness.run_key_script(&[char_key('?')]);
        assert_eq!(harness.state.mode, AppMode::Help);
        assert!(status_text(&harness.state).starts_with("HELP"));
        assert!(help_overlay_text().contains("A all matching"));

        harness.run_key_script(&[char_key('j'), char_key('?')]);
        assert_eq!(harness.state.mode, AppMode::Nav);
    }

    #[test]
    fn render_draws_table_and_overlays() {
        let mut harness = Harness::seeded();
        harness.press(char_key(' '));
        let mut terminal = Terminal::new(TestBackend::new(160, 40)).expect("test terminal");
        terminal
            .draw(|frame| render(frame, &harness.state, &harness.view_data))
            .expect("draw table");
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("transactions (240)"));
        assert!(screen.contains(CHECKED));

        harness.press(char_key('?'));
        terminal
            .draw(|frame| render(frame, &harness.state, &harness.view_data))
            .expect("draw help");
    }
}
