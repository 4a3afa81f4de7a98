// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use ledgerview_app::{
    BulkAck, BulkAction, BulkRequest, BusinessProfile, CollectionPage, FilterPayload, FilterSpec,
    QueryState, Record, SelectionDescriptor, SortDirection, SortField, TransactionId,
    distinct_years, parse_date,
};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use time::{Date, Duration, Month};

const MERCHANTS: [(&str, &str, &str); 16] = [
    ("SQ *BLUE BOTTLE COFFEE", "Blue Bottle Coffee", "Meals"),
    ("AMZN MKTP US*2K4", "Amazon", "Office Supplies"),
    ("UBER *TRIP HELP.UBER.COM", "Uber", "Travel"),
    ("SHELL OIL 57442", "Shell", "Auto"),
    ("ADOBE *CREATIVE CLD", "Adobe", "Software"),
    ("COSTCO WHSE #0113", "Costco", "Groceries"),
    ("DELTA AIR 0062345", "Delta Air Lines", "Travel"),
    ("COMCAST CABLE COMM", "Comcast", "Utilities"),
    ("WHOLEFDS MKT 10234", "Whole Foods", "Groceries"),
    ("GITHUB INC", "GitHub", "Software"),
    ("HOME DEPOT #4021", "Home Depot", "Repairs"),
    ("STAPLES 00117", "Staples", "Office Supplies"),
    ("CHEVRON 0093821", "Chevron", "Auto"),
    ("MARRIOTT HOTELS SEA", "Marriott", "Travel"),
    ("ZOOM.US 888-799-9666", "Zoom", "Software"),
    ("TRADER JOE S #552", "Trader Joe's", "Groceries"),
];

const SOURCES: [&str; 4] = ["chase_checking", "amex_gold", "apple_card", "wells_fargo_visa"];
const CLASSIFICATION_TYPES: [&str; 3] = ["business", "personal", "unclassified"];
const WORKSHEETS: [&str; 4] = ["6A", "Auto", "HomeOffice", "Personal"];
const CONFIDENCE: [&str; 3] = ["high", "medium", "low"];
const CLASSIFICATION_METHODS: [&str; 3] = ["AI", "Human", "None"];
const PAYEE_METHODS: [&str; 4] = ["AI", "AI+Search", "Human", "None"];

const REASONING_WORDS: [&str; 20] = [
    "recurring",
    "subscription",
    "charge",
    "matches",
    "vendor",
    "history",
    "client",
    "business",
    "profile",
    "travel",
    "meal",
    "with",
    "customer",
    "personal",
    "household",
    "purchase",
    "software",
    "used",
    "for",
    "work",
];

pub const DEMO_CLIENTS: [(&str, &str, &str); 4] = [
    ("ACME", "LLC", "Industrial design consultancy"),
    ("GLOBEX", "S-Corp", "Logistics software"),
    ("INITECH", "Sole Proprietor", "IT contracting"),
    ("UMBRELLA", "LLC", "Biotech lab services"),
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn chance(&mut self, percent: usize) -> bool {
        self.int_n(100) < percent
    }
}

/// Seeded generator of plausible statement transactions.
#[derive(Debug, Clone)]
pub struct TransactionFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl TransactionFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn transaction(&mut self, id: i64, client_id: &str, year: i32) -> Record {
        let (description, payee, category) = MERCHANTS[self.rng.int_n(MERCHANTS.len())];
        let source = self.pick(&SOURCES);
        let date = self.date_in_year(year);
        let processed = self.rng.chance(70);
        let classification_type = self.pick(&CLASSIFICATION_TYPES);
        let business_percentage = match classification_type {
            "business" => 100,
            "personal" => 0,
            _ => [25, 50, 75][self.rng.int_n(3)],
        };

        Record {
            id: TransactionId::new(id),
            client_id: Some(client_id.to_owned()),
            transaction_date: Some(date),
            amount_cents: Some(self.amount_cents()),
            description: Some(format!("{description} {}", self.reference_number())),
            normalized_description: processed.then(|| description.to_lowercase()),
            payee: processed.then(|| payee.to_owned()),
            category: Some(category.to_owned()),
            classification_type: processed.then(|| classification_type.to_owned()),
            worksheet: processed.then(|| self.pick(&WORKSHEETS).to_owned()),
            business_percentage: Some(business_percentage),
            confidence: processed.then(|| self.pick(&CONFIDENCE).to_owned()),
            source: Some(source.to_owned()),
            file_path: Some(format!(
                "statements/{}/{year}/{source}_{:02}.pdf",
                client_id.to_lowercase(),
                u8::from(date.month())
            )),
            account_number: Some(format!("****{:04}", self.rng.int_n(10_000))),
            reasoning: processed.then(|| self.sentence(6, 14)),
            payee_reasoning: (processed && self.rng.chance(60)).then(|| self.sentence(4, 10)),
            classification_method: Some(
                if processed {
                    self.pick(&CLASSIFICATION_METHODS[..2])
                } else {
                    "None"
                }
                .to_owned(),
            ),
            payee_extraction_method: Some(
                if processed {
                    self.pick(&PAYEE_METHODS[..3])
                } else {
                    "None"
                }
                .to_owned(),
            ),
        }
    }

    pub fn date_in_year(&mut self, year: i32) -> Date {
        let start = Date::from_calendar_date(year, Month::January, 1).unwrap_or(Date::MIN);
        let days = if time::util::is_leap_year(year) { 366 } else { 365 };
        start
            .checked_add(Duration::days(self.rng.int_n(days) as i64))
            .unwrap_or(start)
    }

    fn amount_cents(&mut self) -> i64 {
        let magnitude = 100 + self.rng.int_n(250_000) as i64;
        if self.rng.chance(12) {
            magnitude
        } else {
            -magnitude
        }
    }

    fn reference_number(&mut self) -> String {
        format!("{:06}", self.rng.int_n(1_000_000))
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        let count = min_words + self.rng.int_n(max_words.saturating_sub(min_words) + 1);
        let words = (0..count)
            .map(|_| self.pick(&REASONING_WORDS))
            .collect::<Vec<_>>();
        let mut sentence = words.join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence.push('.');
        sentence
    }
}

/// In-memory stand-in for the collection service. Filters, sorts, and pages
/// the same way the service does, and applies bulk actions to its records.
#[derive(Debug, Clone, Default)]
pub struct MemoryCollection {
    records: Vec<Record>,
    profiles: Vec<BusinessProfile>,
}

impl MemoryCollection {
    pub fn new(records: Vec<Record>, profiles: Vec<BusinessProfile>) -> Self {
        Self { records, profiles }
    }

    /// `per_client` records for every demo client, spread across `years`.
    pub fn seeded(seed: u64, per_client: usize, years: &[i32]) -> Self {
        let mut faker = TransactionFaker::new(seed);
        let mut records = Vec::with_capacity(per_client * DEMO_CLIENTS.len());
        let mut next_id = 1;
        for (client_id, _, _) in DEMO_CLIENTS {
            for index in 0..per_client {
                let year = years.get(index % years.len().max(1)).copied().unwrap_or(2024);
                records.push(faker.transaction(next_id, client_id, year));
                next_id += 1;
            }
        }
        let profiles = DEMO_CLIENTS
            .iter()
            .map(|(client_id, business_type, description)| BusinessProfile {
                client_id: (*client_id).to_owned(),
                business_type: Some((*business_type).to_owned()),
                business_description: Some((*description).to_owned()),
            })
            .collect();
        Self { records, profiles }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn profiles(&self) -> Vec<BusinessProfile> {
        self.profiles.clone()
    }

    pub fn page(&self, query: &QueryState) -> CollectionPage {
        let mut matching = self
            .records
            .iter()
            .filter(|record| matches_filter(record, &query.filter))
            .collect::<Vec<_>>();
        matching.sort_by(|a, b| {
            let ordering = compare_field(a, b, query.sort_field);
            let ordering = match query.sort_direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            ordering.then_with(|| a.id.cmp(&b.id))
        });
        let total = matching.len();
        let rows = matching
            .into_iter()
            .skip(query.offset())
            .take(query.limit())
            .cloned()
            .collect();
        CollectionPage {
            rows,
            total,
            columns: None,
        }
    }

    pub fn years(&self, client_id: &str) -> Vec<i32> {
        let rows = self
            .records
            .iter()
            .filter(|record| record.client_id.as_deref() == Some(client_id))
            .cloned()
            .collect::<Vec<_>>();
        distinct_years(&rows)
    }

    pub fn apply_bulk(&mut self, request: &BulkRequest) -> Result<BulkAck> {
        let targets: BTreeSet<TransactionId> = match &request.target {
            SelectionDescriptor::Ids(ids) => {
                if ids.is_empty() {
                    bail!("ids must not be empty");
                }
                ids.iter().copied().collect()
            }
            SelectionDescriptor::Filter(payload) => {
                let filter = filter_from_payload(payload)?;
                self.records
                    .iter()
                    .filter(|record| matches_filter(record, &filter))
                    .map(|record| record.id)
                    .collect()
            }
        };

        let mut affected = 0_u64;
        if request.action == BulkAction::Delete {
            let before = self.records.len();
            self.records.retain(|record| !targets.contains(&record.id));
            affected = (before - self.records.len()) as u64;
        } else {
            for record in self
                .records
                .iter_mut()
                .filter(|record| targets.contains(&record.id))
            {
                apply_action(record, request.action);
                affected += 1;
            }
        }

        Ok(BulkAck {
            message: Some(format!("{} applied", request.action.label())),
            task_id: None,
            affected: Some(affected),
        })
    }
}

fn apply_action(record: &mut Record, action: BulkAction) {
    match action {
        BulkAction::MarkPersonal => {
            record.classification_type = Some("personal".to_owned());
            record.business_percentage = Some(0);
            record.classification_method = Some("Human".to_owned());
        }
        BulkAction::MarkBusiness => {
            record.classification_type = Some("business".to_owned());
            record.business_percentage = Some(100);
            record.classification_method = Some("Human".to_owned());
        }
        BulkAction::MarkUnclassified => {
            record.classification_type = Some("unclassified".to_owned());
            record.classification_method = Some("None".to_owned());
        }
        BulkAction::ResetProcessing => {
            record.payee = None;
            record.normalized_description = None;
            record.classification_type = None;
            record.confidence = None;
            record.reasoning = None;
            record.payee_reasoning = None;
            record.classification_method = Some("None".to_owned());
            record.payee_extraction_method = Some("None".to_owned());
        }
        BulkAction::ExtractPayee | BulkAction::BatchExtractPayee => {
            if record.payee.is_none() {
                record.payee = record
                    .description
                    .as_deref()
                    .and_then(|text| text.split_whitespace().next())
                    .map(str::to_owned);
            }
            record.payee_extraction_method = Some("AI".to_owned());
        }
        BulkAction::Classify | BulkAction::BatchClassify => {
            if record.classification_type.is_none() {
                record.classification_type = Some("unclassified".to_owned());
            }
            record.classification_method = Some("AI".to_owned());
        }
        BulkAction::Delete => {}
    }
}

fn filter_from_payload(payload: &FilterPayload) -> Result<FilterSpec> {
    let date = |raw: &Option<String>, name: &str| -> Result<Option<Date>> {
        match raw {
            None => Ok(None),
            Some(raw) => match parse_date(raw) {
                Some(date) => Ok(Some(date)),
                None => bail!("{name} {raw:?} is not YYYY-MM-DD"),
            },
        }
    };
    Ok(FilterSpec {
        client_id: payload.client_id.clone(),
        search: payload.search.clone().unwrap_or_default(),
        year: payload.year,
        start_date: date(&payload.start_date, "start_date")?,
        end_date: date(&payload.end_date, "end_date")?,
    })
}

pub fn matches_filter(record: &Record, filter: &FilterSpec) -> bool {
    if let Some(client_id) = &filter.client_id
        && record.client_id.as_deref() != Some(client_id.as_str())
    {
        return false;
    }
    if let Some(year) = filter.year
        && record.transaction_date.map(|date| date.year()) != Some(year)
    {
        return false;
    }
    if let Some(start) = filter.start_date
        && record.transaction_date.is_none_or(|date| date < start)
    {
        return false;
    }
    if let Some(end) = filter.end_date
        && record.transaction_date.is_none_or(|date| date > end)
    {
        return false;
    }
    if filter.search.is_empty() {
        return true;
    }
    let needle = filter.search.to_lowercase();
    [
        &record.description,
        &record.normalized_description,
        &record.payee,
        &record.category,
    ]
    .into_iter()
    .flatten()
    .any(|text| text.to_lowercase().contains(&needle))
}

fn compare_field(a: &Record, b: &Record, field: SortField) -> Ordering {
    let text = |record: &Record| -> Option<String> {
        let value = match field {
            SortField::Description => &record.description,
            SortField::Payee => &record.payee,
            SortField::Category => &record.category,
            SortField::ClassificationType => &record.classification_type,
            SortField::Confidence => &record.confidence,
            SortField::Source => &record.source,
            SortField::TransactionDate | SortField::Amount => return None,
        };
        value.as_ref().map(|value| value.to_lowercase())
    };
    match field {
        SortField::TransactionDate => a.transaction_date.cmp(&b.transaction_date),
        SortField::Amount => a.amount_cents.cmp(&b.amount_cents),
        _ => text(a).cmp(&text(b)),
    }
}
