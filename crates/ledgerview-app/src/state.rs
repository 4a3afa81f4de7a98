// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

use time::Date;
use tracing::{debug, info, warn};

use crate::{
    BulkAck, BulkAction, BulkRequest, BulkUnavailable, BusinessProfile, CollectionFetcher,
    CollectionPage, Column, ColumnSet, FetchOutcome, FetchResult, FilterSpec, PageCheck, PageSize,
    QueryCommand, QueryState, RequestToken, SearchDebouncer, Selection, SelectionBanner,
    SortField, TransactionId, YearOptions, visible_columns,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Client,
    Year,
    DateRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Nav,
    Search,
    Prompt(PromptKind),
    Preview,
    Help,
}

/// Startup knobs that come from configuration rather than user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewOptions {
    pub page_size: PageSize,
    pub column_set: ColumnSet,
    pub search_debounce: Duration,
    pub client_id: Option<String>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            column_set: ColumnSet::default(),
            search_debounce: crate::DEFAULT_SEARCH_DEBOUNCE,
            client_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub token: RequestToken,
    pub query: QueryState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearRequest {
    pub token: RequestToken,
    pub client_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkDecision {
    Submit(BulkRequest),
    /// Destructive verb armed; the same request again submits it.
    NeedsConfirmation(BulkAction),
    Unavailable(BulkUnavailable),
    InFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub query: QueryState,
    pub selection: Selection,
    pub column_set: ColumnSet,
    pub bulk_action: Option<BulkAction>,
    pub profiles: Vec<BusinessProfile>,
    pub status_line: Option<String>,
    search: SearchDebouncer,
    fetcher: CollectionFetcher,
    years: YearOptions,
    fetch_pending: bool,
    years_pending: bool,
    /// Filter of the newest request handed out.
    requested_filter: Option<FilterSpec>,
    /// Filter the committed rows were fetched under.
    shown_filter: Option<FilterSpec>,
    armed: Option<BulkAction>,
    bulk_in_flight: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ViewOptions::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    EnterSearch,
    OpenPrompt(PromptKind),
    OpenPreview,
    OpenHelp,
    ExitToNav,
    SearchInput { value: String, at: Instant },
    Tick(Instant),
    FlushSearch,
    CancelSearch,
    SetClient(Option<String>),
    SetYear(Option<i32>),
    SetDateRange {
        start: Option<Date>,
        end: Option<Date>,
    },
    ClearFilters,
    ToggleSort(SortField),
    NextPage,
    PrevPage,
    CyclePageSize,
    ToggleRow(TransactionId),
    TogglePage,
    SelectAllMatching,
    ClearSelection,
    CycleBulkAction,
    ChooseBulkAction(Option<BulkAction>),
    ToggleColumnSet,
    Refresh,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    SearchCommitted(String),
    QueryChanged { filter_changed: bool },
    SelectionChanged,
    BulkActionChosen(Option<BulkAction>),
    ColumnSetChanged(ColumnSet),
    PageLoaded,
    FetchFailed(String),
    YearsLoaded,
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn new(options: ViewOptions) -> Self {
        let mut query = QueryState {
            page_size: options.page_size,
            ..QueryState::default()
        };
        query.filter.client_id = options.client_id.filter(|id| !id.trim().is_empty());
        let years_pending = query.filter.client_id.is_some();
        Self {
            mode: AppMode::Nav,
            query,
            selection: Selection::default(),
            column_set: options.column_set,
            bulk_action: None,
            profiles: Vec::new(),
            status_line: None,
            search: SearchDebouncer::new(options.search_debounce),
            fetcher: CollectionFetcher::default(),
            years: YearOptions::default(),
            fetch_pending: true,
            years_pending,
            requested_filter: None,
            shown_filter: None,
            armed: None,
            bulk_in_flight: false,
        }
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        if !matches!(
            command,
            AppCommand::Tick(_) | AppCommand::SetStatus(_) | AppCommand::ClearStatus
        ) {
            self.armed = None;
        }

        match command {
            AppCommand::EnterSearch => {
                self.search.reset(&self.query.filter.search);
                self.set_mode(AppMode::Search)
            }
            AppCommand::OpenPrompt(kind) => self.set_mode(AppMode::Prompt(kind)),
            AppCommand::OpenPreview => self.set_mode(AppMode::Preview),
            AppCommand::OpenHelp => self.set_mode(AppMode::Help),
            AppCommand::ExitToNav => self.set_mode(AppMode::Nav),
            AppCommand::SearchInput { value, at } => {
                self.search.input(value, at);
                Vec::new()
            }
            AppCommand::Tick(now) => match self.search.poll(now) {
                Some(term) => self.commit_search(term),
                None => Vec::new(),
            },
            AppCommand::FlushSearch => match self.search.flush() {
                Some(term) => self.commit_search(term),
                None => Vec::new(),
            },
            AppCommand::CancelSearch => {
                self.search.reset(&self.query.filter.search);
                self.set_mode(AppMode::Nav)
            }
            AppCommand::SetClient(client_id) => self.apply_query(QueryCommand::SetClient(client_id)),
            AppCommand::SetYear(year) => self.apply_query(QueryCommand::SetYear(year)),
            AppCommand::SetDateRange { start, end } => {
                self.apply_query(QueryCommand::SetDateRange { start, end })
            }
            AppCommand::ClearFilters => {
                self.search.reset("");
                self.apply_query(QueryCommand::ClearFilters)
            }
            AppCommand::ToggleSort(field) => self.apply_query(QueryCommand::ToggleSort(field)),
            AppCommand::NextPage => {
                let next = self.query.page_index + 1;
                if next >= self.page_count() {
                    return Vec::new();
                }
                self.apply_query(QueryCommand::SetPage(next))
            }
            AppCommand::PrevPage => {
                // A page left behind by shrinking results steps back to the last real one.
                let last_page = self.page_count().saturating_sub(1);
                match self.query.page_index.checked_sub(1) {
                    Some(previous) => {
                        self.apply_query(QueryCommand::SetPage(previous.min(last_page)))
                    }
                    None => Vec::new(),
                }
            }
            AppCommand::CyclePageSize => {
                let size = self.query.page_size.next();
                let mut events = self.apply_query(QueryCommand::SetPageSize(size));
                events.push(self.set_status(&format!("{} rows per page", size.get())));
                events
            }
            AppCommand::ToggleRow(_) | AppCommand::TogglePage | AppCommand::SelectAllMatching
                if !self.rows_match_filter() =>
            {
                vec![self.set_status("wait for rows matching the current filter")]
            }
            AppCommand::ToggleRow(id) => {
                self.selection.toggle_row(id);
                vec![AppEvent::SelectionChanged]
            }
            AppCommand::TogglePage => {
                let page_ids = self.page_ids();
                let checked = self.page_check() != PageCheck::Checked;
                self.selection.toggle_page(checked, &page_ids);
                vec![AppEvent::SelectionChanged]
            }
            AppCommand::SelectAllMatching => {
                let page_ids = self.page_ids();
                let total = self.total();
                if self.selection.select_all_matching(&page_ids, total) {
                    let message = format!("all {total} matching rows selected");
                    vec![AppEvent::SelectionChanged, self.set_status(&message)]
                } else if self.selection.is_all_matching() {
                    vec![self.set_status("all matching rows already selected")]
                } else if total <= page_ids.len() {
                    vec![self.set_status("every matching row is already on this page")]
                } else {
                    vec![self.set_status("select every row on this page first")]
                }
            }
            AppCommand::ClearSelection => {
                self.selection.clear();
                vec![AppEvent::SelectionChanged]
            }
            AppCommand::CycleBulkAction => {
                self.bulk_action = BulkAction::cycle(self.bulk_action);
                vec![AppEvent::BulkActionChosen(self.bulk_action)]
            }
            AppCommand::ChooseBulkAction(action) => {
                self.bulk_action = action;
                vec![AppEvent::BulkActionChosen(self.bulk_action)]
            }
            AppCommand::ToggleColumnSet => {
                self.column_set = self.column_set.toggled();
                vec![
                    AppEvent::ColumnSetChanged(self.column_set),
                    self.set_status(&format!("{} columns", self.column_set.as_str())),
                ]
            }
            AppCommand::Refresh => {
                self.fetch_pending = true;
                self.years_pending = true;
                Vec::new()
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    /// Hands out at most one collection request for everything dispatched
    /// since the last call, always for the latest query.
    pub fn take_fetch_request(&mut self) -> Option<FetchRequest> {
        if !std::mem::take(&mut self.fetch_pending) {
            return None;
        }
        self.requested_filter = Some(self.query.filter.clone());
        Some(FetchRequest {
            token: self.fetcher.issue(),
            query: self.query.clone(),
        })
    }

    pub fn take_year_request(&mut self) -> Option<YearRequest> {
        if !std::mem::take(&mut self.years_pending) {
            return None;
        }
        match self.query.filter.client_id.clone() {
            Some(client_id) => Some(YearRequest {
                token: self.years.issue(&client_id),
                client_id,
            }),
            None => {
                self.years.reset();
                None
            }
        }
    }

    pub fn apply_page(
        &mut self,
        token: RequestToken,
        response: Result<CollectionPage, String>,
    ) -> Vec<AppEvent> {
        match self.fetcher.resolve(token, response) {
            FetchOutcome::Stale => Vec::new(),
            FetchOutcome::Failed => {
                let message = self.fetcher.result().error.clone().unwrap_or_default();
                vec![AppEvent::FetchFailed(message)]
            }
            FetchOutcome::Committed => {
                self.shown_filter = self.requested_filter.clone();
                if self.query.page_index >= self.page_count() {
                    debug!(
                        page = self.query.page_index,
                        pages = self.page_count(),
                        "page past end of results"
                    );
                }
                vec![AppEvent::PageLoaded]
            }
        }
    }

    pub fn apply_years(
        &mut self,
        token: RequestToken,
        response: Result<Vec<i32>, String>,
    ) -> Vec<AppEvent> {
        if self.years.resolve(token, response) {
            vec![AppEvent::YearsLoaded]
        } else {
            Vec::new()
        }
    }

    pub fn apply_profiles(&mut self, response: Result<Vec<BusinessProfile>, String>) -> Vec<AppEvent> {
        match response {
            Ok(mut profiles) => {
                profiles.sort_by(|a, b| a.client_id.cmp(&b.client_id));
                profiles.dedup_by(|a, b| a.client_id == b.client_id);
                self.profiles = profiles;
                Vec::new()
            }
            Err(message) => {
                warn!(error = %message, "business profiles unavailable");
                self.profiles.clear();
                vec![self.set_status(&format!("client list unavailable: {message}"))]
            }
        }
    }

    /// Resolves the chosen verb against the current selection. Destructive
    /// verbs must be requested twice in a row before they submit.
    pub fn bulk_request(&mut self) -> BulkDecision {
        if self.bulk_in_flight {
            return BulkDecision::InFlight;
        }
        let request = match BulkRequest::build(self.bulk_action, &self.selection, &self.query.filter)
        {
            Ok(request) => request,
            Err(reason) => {
                self.armed = None;
                return BulkDecision::Unavailable(reason);
            }
        };
        if request.action.is_destructive() && self.armed != Some(request.action) {
            self.armed = Some(request.action);
            return BulkDecision::NeedsConfirmation(request.action);
        }
        self.armed = None;
        self.bulk_in_flight = true;
        info!(
            action = request.action.as_str(),
            target = %request.describe(self.total()),
            filter = %self.query.filter.describe(),
            "bulk action dispatched"
        );
        BulkDecision::Submit(request)
    }

    pub fn apply_bulk_outcome(
        &mut self,
        action: BulkAction,
        outcome: Result<BulkAck, String>,
    ) -> Vec<AppEvent> {
        self.bulk_in_flight = false;
        match outcome {
            Ok(ack) => {
                self.selection.clear();
                let summary = ack.summary(action);
                vec![AppEvent::SelectionChanged, self.set_status(&summary)]
            }
            Err(message) => {
                warn!(action = action.as_str(), error = %message, "bulk action failed");
                vec![self.set_status(&format!("{} failed: {message}", action.label()))]
            }
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn bulk_in_flight(&self) -> bool {
        self.bulk_in_flight
    }

    pub fn search_draft(&self) -> &str {
        self.search.draft()
    }

    pub fn search_pending(&self) -> bool {
        self.search.pending()
    }

    pub fn fetch(&self) -> &FetchResult {
        self.fetcher.result()
    }

    pub fn year_options(&self) -> &[i32] {
        self.years.years()
    }

    pub fn total(&self) -> usize {
        self.fetcher.result().total
    }

    /// False while the shown rows were fetched under a filter that has
    /// since changed, or before any page has landed.
    pub fn rows_match_filter(&self) -> bool {
        self.shown_filter.as_ref() == Some(&self.query.filter)
    }

    pub fn page_count(&self) -> usize {
        self.query.page_count(self.total())
    }

    pub fn page_ids(&self) -> Vec<TransactionId> {
        self.fetcher.result().page_ids()
    }

    pub fn page_check(&self) -> PageCheck {
        self.selection.page_check(&self.page_ids())
    }

    pub fn banner(&self) -> SelectionBanner {
        self.selection.banner(&self.page_ids(), self.total())
    }

    pub fn visible_columns(&self) -> Vec<Column> {
        visible_columns(self.column_set, &self.fetcher.result().columns_present)
    }

    fn commit_search(&mut self, term: String) -> Vec<AppEvent> {
        let mut events = vec![AppEvent::SearchCommitted(term.trim().to_owned())];
        events.extend(self.apply_query(QueryCommand::CommitSearch(term)));
        events
    }

    fn apply_query(&mut self, command: QueryCommand) -> Vec<AppEvent> {
        let client_before = self.query.filter.client_id.clone();
        let change = match self.query.apply(command) {
            Ok(change) => change,
            Err(error) => return vec![self.set_status(&error.to_string())],
        };
        if !change.refetch {
            return Vec::new();
        }

        debug!(
            filter = %self.query.filter.describe(),
            sort = self.query.sort_field.as_str(),
            direction = self.query.sort_direction.as_str(),
            page = self.query.page_index,
            size = self.query.page_size.get(),
            "query changed"
        );
        self.fetch_pending = true;
        let mut events = vec![AppEvent::QueryChanged {
            filter_changed: change.filter_changed,
        }];
        if change.filter_changed {
            if !self.selection.is_empty() {
                events.push(AppEvent::SelectionChanged);
            }
            self.selection.clear();
        }
        if self.query.filter.client_id != client_before {
            self.years_pending = true;
        }
        events
    }

    fn set_mode(&mut self, mode: AppMode) -> Vec<AppEvent> {
        self.mode = mode;
        vec![AppEvent::ModeChanged(mode)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
