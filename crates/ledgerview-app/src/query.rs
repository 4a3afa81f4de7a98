// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use time::Date;

use crate::{PageSize, SortDirection, SortField, format_date};

/// The filter-affecting subset of the query. Two queries with equal filters
/// match the same set of records regardless of sort or page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub client_id: Option<String>,
    pub search: String,
    pub year: Option<i32>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

impl FilterSpec {
    pub fn is_unfiltered(&self) -> bool {
        *self == Self::default()
    }

    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(client) = &self.client_id {
            parts.push(format!("client={client}"));
        }
        if !self.search.is_empty() {
            parts.push(format!("search={:?}", self.search));
        }
        if let Some(year) = self.year {
            parts.push(format!("year={year}"));
        }
        match (self.start_date, self.end_date) {
            (None, None) => {}
            (start, end) => parts.push(format!(
                "dates={}..{}",
                start.map(format_date).unwrap_or_default(),
                end.map(format_date).unwrap_or_default()
            )),
        }
        if parts.is_empty() {
            "all records".to_owned()
        } else {
            parts.join(" ")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub filter: FilterSpec,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub page_index: usize,
    pub page_size: PageSize,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            filter: FilterSpec::default(),
            sort_field: SortField::TransactionDate,
            sort_direction: SortDirection::Desc,
            page_index: 0,
            page_size: PageSize::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryCommand {
    SetClient(Option<String>),
    CommitSearch(String),
    SetYear(Option<i32>),
    SetDateRange {
        start: Option<Date>,
        end: Option<Date>,
    },
    ClearFilters,
    ToggleSort(SortField),
    SetPage(usize),
    SetPageSize(PageSize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryChange {
    /// The set of matching records changed; selections made under the old
    /// filter no longer apply.
    pub filter_changed: bool,
    /// Anything that alters the requested page changed.
    pub refetch: bool,
}

impl QueryState {
    pub fn offset(&self) -> usize {
        self.page_index * self.page_size.get()
    }

    pub fn limit(&self) -> usize {
        self.page_size.get()
    }

    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size.get()).max(1)
    }

    pub fn apply(&mut self, command: QueryCommand) -> Result<QueryChange> {
        let before = self.clone();

        match command {
            QueryCommand::SetClient(client_id) => {
                self.filter.client_id = client_id.filter(|id| !id.trim().is_empty());
            }
            QueryCommand::CommitSearch(search) => {
                self.filter.search = search.trim().to_owned();
                // A commit lands on the first page even when the term is unchanged.
                self.page_index = 0;
            }
            QueryCommand::SetYear(year) => {
                self.filter.year = year;
                if year.is_some() {
                    self.filter.start_date = None;
                    self.filter.end_date = None;
                }
            }
            QueryCommand::SetDateRange { start, end } => {
                if let (Some(start), Some(end)) = (start, end)
                    && start > end
                {
                    bail!(
                        "start date {} is after end date {}",
                        format_date(start),
                        format_date(end)
                    );
                }
                self.filter.start_date = start;
                self.filter.end_date = end;
                if start.is_some() || end.is_some() {
                    self.filter.year = None;
                }
            }
            QueryCommand::ClearFilters => {
                self.filter = FilterSpec::default();
            }
            QueryCommand::ToggleSort(field) => {
                if self.sort_field == field {
                    self.sort_direction = self.sort_direction.flipped();
                } else {
                    self.sort_field = field;
                    self.sort_direction = SortDirection::Asc;
                }
            }
            QueryCommand::SetPage(page_index) => {
                self.page_index = page_index;
            }
            QueryCommand::SetPageSize(page_size) => {
                // Keep the first visible row on screen.
                let first_row = self.offset();
                self.page_size = page_size;
                self.page_index = first_row / page_size.get();
            }
        }

        let filter_changed = self.filter != before.filter;
        if filter_changed {
            self.page_index = 0;
        }

        Ok(QueryChange {
            filter_changed,
            refetch: *self != before,
        })
    }
}
