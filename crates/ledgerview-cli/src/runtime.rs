// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use ledgerview_app::{
    BulkAck, BulkRequest, BusinessProfile, CollectionPage, FetchRequest, QueryState, YearRequest,
};
use ledgerview_client::Client;
use ledgerview_testkit::MemoryCollection;
use ledgerview_tui::{AppRuntime, InternalEvent};
use std::sync::mpsc::Sender;
use std::thread;
use tracing::debug;

const DEMO_SEED: u64 = 20_240_101;
const DEMO_ROWS_PER_CLIENT: usize = 180;
const DEMO_YEARS: [i32; 3] = [2022, 2023, 2024];

/// Talks to the collection service. Every request runs on its own worker
/// thread so the event loop keeps drawing while the server answers.
pub struct HttpRuntime {
    client: Client,
}

impl HttpRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn spawn_worker<F>(&self, name: &str, work: F) -> Result<()>
    where
        F: FnOnce(Client) + Send + 'static,
    {
        let client = self.client.clone();
        thread::Builder::new()
            .name(format!("ledgerview-{name}"))
            .spawn(move || work(client))
            .with_context(|| format!("spawn {name} worker"))?;
        Ok(())
    }
}

impl AppRuntime for HttpRuntime {
    fn fetch_page(&mut self, query: &QueryState) -> Result<CollectionPage> {
        self.client.list_page(query)
    }

    fn fetch_years(&mut self, client_id: &str) -> Result<Vec<i32>> {
        self.client.list_years(client_id)
    }

    fn list_business_profiles(&mut self) -> Result<Vec<BusinessProfile>> {
        self.client.list_business_profiles()
    }

    fn submit_bulk_action(&mut self, request: &BulkRequest) -> Result<BulkAck> {
        self.client.submit_bulk_action(request)
    }

    fn spawn_fetch_page(&mut self, request: FetchRequest, tx: Sender<InternalEvent>) -> Result<()> {
        debug!(token = request.token.get(), "spawning page fetch");
        self.spawn_worker("fetch", move |client| {
            let result = client
                .list_page(&request.query)
                .map_err(|error| error.to_string());
            let _ = tx.send(InternalEvent::PageLoaded {
                token: request.token,
                result,
            });
        })
    }

    fn spawn_fetch_years(&mut self, request: YearRequest, tx: Sender<InternalEvent>) -> Result<()> {
        self.spawn_worker("years", move |client| {
            let result = client
                .list_years(&request.client_id)
                .map_err(|error| error.to_string());
            let _ = tx.send(InternalEvent::YearsLoaded {
                token: request.token,
                result,
            });
        })
    }

    fn spawn_load_profiles(&mut self, tx: Sender<InternalEvent>) -> Result<()> {
        self.spawn_worker("profiles", move |client| {
            let result = client
                .list_business_profiles()
                .map_err(|error| error.to_string());
            let _ = tx.send(InternalEvent::ProfilesLoaded(result));
        })
    }

    fn spawn_bulk_action(&mut self, request: BulkRequest, tx: Sender<InternalEvent>) -> Result<()> {
        self.spawn_worker("bulk", move |client| {
            let result = client
                .submit_bulk_action(&request)
                .map_err(|error| error.to_string());
            let _ = tx.send(InternalEvent::BulkCompleted {
                action: request.action,
                result,
            });
        })
    }
}

/// In-memory collection for `--demo`; requests resolve inline.
pub struct DemoRuntime {
    collection: MemoryCollection,
}

impl DemoRuntime {
    pub fn seeded() -> Self {
        Self {
            collection: MemoryCollection::seeded(DEMO_SEED, DEMO_ROWS_PER_CLIENT, &DEMO_YEARS),
        }
    }
}

impl AppRuntime for DemoRuntime {
    fn fetch_page(&mut self, query: &QueryState) -> Result<CollectionPage> {
        Ok(self.collection.page(query))
    }

    fn fetch_years(&mut self, client_id: &str) -> Result<Vec<i32>> {
        Ok(self.collection.years(client_id))
    }

    fn list_business_profiles(&mut self) -> Result<Vec<BusinessProfile>> {
        Ok(self.collection.profiles())
    }

    fn submit_bulk_action(&mut self, request: &BulkRequest) -> Result<BulkAck> {
        self.collection.apply_bulk(request)
    }
}
