// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::{Column, Record, TransactionId};

/// Identifies the request that produced a response. Tokens only grow, so a
/// response is current exactly when its token is the latest one issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// One page of the collection, normalized from whichever response shape the
/// service used.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectionPage {
    pub rows: Vec<Record>,
    pub total: usize,
    /// Field list declared by the service, when it sends one.
    pub columns: Option<Vec<Column>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub rows: Vec<Record>,
    pub total: usize,
    pub columns_present: Vec<Column>,
    pub status: FetchStatus,
    pub request_token: Option<RequestToken>,
    pub error: Option<String>,
}

impl Default for FetchResult {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            total: 0,
            columns_present: Column::ALL.to_vec(),
            status: FetchStatus::Idle,
            request_token: None,
            error: None,
        }
    }
}

impl FetchResult {
    pub fn page_ids(&self) -> Vec<TransactionId> {
        self.rows.iter().map(|row| row.id).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Committed,
    Failed,
    Stale,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionFetcher {
    issued: u64,
    result: FetchResult,
}

impl CollectionFetcher {
    pub fn result(&self) -> &FetchResult {
        &self.result
    }

    pub fn latest(&self) -> Option<RequestToken> {
        (self.issued > 0).then_some(RequestToken(self.issued))
    }

    pub fn is_loading(&self) -> bool {
        self.result.status == FetchStatus::Loading
    }

    pub fn issue(&mut self) -> RequestToken {
        self.issued += 1;
        self.result.status = FetchStatus::Loading;
        let token = RequestToken(self.issued);
        debug!(token = token.get(), "collection request issued");
        token
    }

    /// Applies a response. Anything but the latest token is dropped without
    /// touching visible state; failures keep the last good rows and total.
    pub fn resolve(
        &mut self,
        token: RequestToken,
        response: Result<CollectionPage, String>,
    ) -> FetchOutcome {
        if Some(token) != self.latest() {
            debug!(
                token = token.get(),
                latest = self.issued,
                "discarding stale collection response"
            );
            return FetchOutcome::Stale;
        }

        match response {
            Ok(page) => {
                self.result = FetchResult {
                    columns_present: page.columns.unwrap_or_else(|| Column::ALL.to_vec()),
                    rows: page.rows,
                    total: page.total,
                    status: FetchStatus::Ready,
                    request_token: Some(token),
                    error: None,
                };
                FetchOutcome::Committed
            }
            Err(message) => {
                warn!(token = token.get(), error = %message, "collection request failed");
                self.result.status = FetchStatus::Error;
                self.result.error = Some(message);
                FetchOutcome::Failed
            }
        }
    }
}

/// Distinct years offered by the year filter for the active client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearOptions {
    issued: u64,
    client_id: Option<String>,
    years: Vec<i32>,
}

impl YearOptions {
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Starts a lookup for `client_id`; the previous client's years are
    /// dropped right away so they are never offered for the new client.
    pub fn issue(&mut self, client_id: &str) -> RequestToken {
        self.issued += 1;
        self.client_id = Some(client_id.to_owned());
        self.years.clear();
        RequestToken(self.issued)
    }

    pub fn reset(&mut self) {
        self.issued += 1;
        self.client_id = None;
        self.years.clear();
    }

    /// Failures degrade to an empty list without surfacing an error.
    pub fn resolve(&mut self, token: RequestToken, response: Result<Vec<i32>, String>) -> bool {
        if token != RequestToken(self.issued) {
            return false;
        }
        self.years = match response {
            Ok(mut years) => {
                years.sort_unstable_by(|a, b| b.cmp(a));
                years.dedup();
                years
            }
            Err(message) => {
                debug!(error = %message, "year options unavailable");
                Vec::new()
            }
        };
        true
    }
}

pub fn distinct_years(rows: &[Record]) -> Vec<i32> {
    let years: BTreeSet<i32> = rows
        .iter()
        .filter_map(|row| row.transaction_date.map(|date| date.year()))
        .collect();
    years.into_iter().rev().collect()
}
