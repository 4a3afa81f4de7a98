// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use ledgerview_app::{
    BulkAck, BulkRequest, BusinessProfile, CollectionPage, Column, QueryState, Record,
    TransactionId, distinct_years, format_date, parse_date,
};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, Response};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use time::Date;
use tracing::debug;
use url::Url;

const TRANSACTIONS_PATH: &str = "transactions/";
const BULK_ACTION_PATH: &str = "transactions/bulk-action/";
const BUSINESS_PROFILES_PATH: &str = "business-profiles/";
const YEAR_SCAN_LIMIT: usize = 1000;

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            bail!("server.base_url must not be empty");
        }
        let mut base_url =
            Url::parse(trimmed).with_context(|| format!("parse server.base_url {trimmed:?}"))?;
        if base_url.cannot_be_a_base() {
            bail!("server.base_url {trimmed:?} is not an http(s) URL");
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches the page described by `query`.
    pub fn list_page(&self, query: &QueryState) -> Result<CollectionPage> {
        let mut url = self.endpoint(TRANSACTIONS_PATH)?;
        url.query_pairs_mut().extend_pairs(query_pairs(query));
        let body = self.get_json(url)?;
        normalize_page(body)
    }

    /// Every distinct year with transactions for `client_id`, newest first.
    /// Walks every page of the client's transactions, since the service caps
    /// page size.
    pub fn list_years(&self, client_id: &str) -> Result<Vec<i32>> {
        let mut rows = Vec::new();
        loop {
            let mut url = self.endpoint(TRANSACTIONS_PATH)?;
            url.query_pairs_mut()
                .append_pair("client_id", client_id)
                .append_pair("offset", &rows.len().to_string())
                .append_pair("limit", &YEAR_SCAN_LIMIT.to_string());
            let page = normalize_page(self.get_json(url)?)?;
            let fetched = page.rows.len();
            rows.extend(page.rows);
            if fetched == 0 || rows.len() >= page.total {
                break;
            }
        }
        Ok(distinct_years(&rows))
    }

    pub fn list_business_profiles(&self) -> Result<Vec<BusinessProfile>> {
        let url = self.endpoint(BUSINESS_PROFILES_PATH)?;
        let body = self.get_json(url)?;
        let items = match body {
            Value::Array(items) => items,
            Value::Object(mut object) => take_items(&mut object)
                .ok_or_else(|| anyhow!("business profile response has no item list"))?,
            other => bail!("unexpected business profile response: {}", kind_of(&other)),
        };
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value(item)
                    .with_context(|| format!("decode business profile {index}"))
            })
            .collect()
    }

    pub fn submit_bulk_action(&self, request: &BulkRequest) -> Result<BulkAck> {
        let url = self.endpoint(BULK_ACTION_PATH)?;
        debug!(%url, action = request.action.as_str(), "POST bulk action");
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .map_err(|error| connection_error(self.base_url.as_str(), error))?;
        let body = read_success(response)?;
        Ok(parse_ack(&body))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("build URL for {path}"))
    }

    fn get_json(&self, url: Url) -> Result<Value> {
        debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| connection_error(self.base_url.as_str(), error))?;
        let body = read_success(response)?;
        serde_json::from_str(&body).context("decode response body")
    }
}

/// Wire parameters for one page request. Dates go out as `YYYY-MM-DD`; empty
/// optional filters are omitted entirely.
pub fn query_pairs(query: &QueryState) -> Vec<(&'static str, String)> {
    let filter = &query.filter;
    let mut pairs = vec![
        ("offset", query.offset().to_string()),
        ("limit", query.limit().to_string()),
    ];
    if let Some(client_id) = &filter.client_id {
        pairs.push(("client_id", client_id.clone()));
    }
    if !filter.search.is_empty() {
        pairs.push(("search", filter.search.clone()));
    }
    pairs.push(("sort", query.sort_direction.as_str().to_owned()));
    pairs.push(("sort_by", query.sort_field.as_str().to_owned()));
    if let Some(year) = filter.year {
        pairs.push(("year", year.to_string()));
    }
    if let Some(start) = filter.start_date {
        pairs.push(("start_date", format_date(start)));
    }
    if let Some(end) = filter.end_date {
        pairs.push(("end_date", format_date(end)));
    }
    pairs
}

/// Accepts a bare array, or an object with `items`/`results` and
/// `total`/`count`, and an optional `columns` declaration.
pub fn normalize_page(body: Value) -> Result<CollectionPage> {
    let (items, total, columns) = match body {
        Value::Array(items) => (items, None, None),
        Value::Object(mut object) => {
            let items = take_items(&mut object)
                .ok_or_else(|| anyhow!("collection response has no items or results list"))?;
            let total = ["total", "count"]
                .iter()
                .find_map(|key| object.get(*key).and_then(Value::as_u64));
            let columns = object.get("columns").and_then(Value::as_array).map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(Column::parse)
                    .collect::<Vec<_>>()
            });
            (items, total, columns)
        }
        other => bail!("unexpected collection response: {}", kind_of(&other)),
    };

    let rows = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let wire: WireRecord = serde_json::from_value(item)
                .with_context(|| format!("decode transaction row {index}"))?;
            Ok(wire.into_record())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CollectionPage {
        total: total.map_or(rows.len(), |total| total as usize),
        rows,
        columns,
    })
}

fn take_items(object: &mut Map<String, Value>) -> Option<Vec<Value>> {
    ["items", "results"]
        .iter()
        .find_map(|key| match object.remove(*key) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn read_success(response: Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(clean_error_response(status, &body));
    }
    response.text().context("read response body")
}

fn parse_ack(body: &str) -> BulkAck {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return BulkAck::default();
    }
    match serde_json::from_str::<BulkAck>(trimmed) {
        Ok(ack) => ack,
        Err(_) if trimmed.len() < 100 && !trimmed.contains('{') => BulkAck {
            message: Some(trimmed.to_owned()),
            ..BulkAck::default()
        },
        Err(error) => {
            debug!(%error, "ignoring unrecognized bulk acknowledgement");
            BulkAck::default()
        }
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check server.base_url or start the service ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(detail) = parsed.detail.or(parsed.error).or(parsed.message)
        && !detail.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), detail);
    }

    if !body.is_empty() && body.len() < 100 && !body.contains('{') && !body.contains('<') {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    detail: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    id: i64,
    client_id: Option<Value>,
    transaction_date: Option<String>,
    amount: Option<Value>,
    description: Option<String>,
    normalized_description: Option<String>,
    payee: Option<String>,
    category: Option<String>,
    classification_type: Option<String>,
    worksheet: Option<String>,
    business_percentage: Option<Value>,
    confidence: Option<Value>,
    source: Option<String>,
    file_path: Option<String>,
    account_number: Option<Value>,
    reasoning: Option<String>,
    payee_reasoning: Option<String>,
    classification_method: Option<String>,
    payee_extraction_method: Option<String>,
}

impl WireRecord {
    fn into_record(self) -> Record {
        Record {
            id: TransactionId::new(self.id),
            client_id: self.client_id.as_ref().and_then(value_text),
            transaction_date: self.transaction_date.as_deref().and_then(parse_wire_date),
            amount_cents: self.amount.as_ref().and_then(value_cents),
            description: self.description,
            normalized_description: self.normalized_description,
            payee: self.payee,
            category: self.category,
            classification_type: self.classification_type,
            worksheet: self.worksheet,
            business_percentage: self
                .business_percentage
                .as_ref()
                .and_then(value_whole_number),
            confidence: self.confidence.as_ref().and_then(value_text),
            source: self.source,
            file_path: self.file_path,
            account_number: self.account_number.as_ref().and_then(value_text),
            reasoning: self.reasoning,
            payee_reasoning: self.payee_reasoning,
            classification_method: self.classification_method,
            payee_extraction_method: self.payee_extraction_method,
        }
    }
}

/// Dates may arrive as plain dates or full timestamps.
fn parse_wire_date(raw: &str) -> Option<Date> {
    parse_date(raw).or_else(|| raw.get(..10).and_then(parse_date))
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn value_whole_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.round() as i64)),
        Value::String(text) => text.trim().parse::<f64>().ok().map(|float| float.round() as i64),
        _ => None,
    }
}

fn value_cents(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => match number.as_i64() {
            Some(whole) => whole.checked_mul(100),
            None => number.as_f64().map(|float| (float * 100.0).round() as i64),
        },
        Value::String(text) => parse_cents(text),
        _ => None,
    }
}

/// Parses decimal money text such as `-1,234.5` or `$12.00` into cents
/// without going through floating point.
fn parse_cents(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, ',' | '$' | ' '))
        .collect();
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().all(|ch| ch.is_ascii_digit()) || !fraction.chars().all(|ch| ch.is_ascii_digit())
    {
        return None;
    }
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut fraction_digits = fraction.chars();
    let tens = fraction_digits.next().and_then(|ch| ch.to_digit(10)).unwrap_or(0) as i64;
    let ones = fraction_digits.next().and_then(|ch| ch.to_digit(10)).unwrap_or(0) as i64;
    let round_up = fraction_digits
        .next()
        .and_then(|ch| ch.to_digit(10))
        .is_some_and(|digit| digit >= 5);
    let cents = whole
        .checked_mul(100)?
        .checked_add(tens * 10 + ones + i64::from(round_up))?;
    Some(if negative { -cents } else { cents })
}

#[cfg(test)]
mod tests {
    use super::{clean_error_response, normalize_page, parse_ack, parse_cents, query_pairs};
    use anyhow::Result;
    use ledgerview_app::{
        Column, QueryCommand, QueryState, SortField, TransactionId, parse_date,
    };
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn bare_array_uses_length_as_total() -> Result<()> {
        let page = normalize_page(json!([
            {"id": 1, "amount": "12.50", "transaction_date": "2024-03-01"},
            {"id": 2, "amount": -7},
        ]))?;
        assert_eq!(page.total, 2);
        assert_eq!(page.columns, None);
        assert_eq!(page.rows[0].id, TransactionId::new(1));
        assert_eq!(page.rows[0].amount_cents, Some(1_250));
        assert_eq!(page.rows[0].transaction_date, parse_date("2024-03-01"));
        assert_eq!(page.rows[1].amount_cents, Some(-700));
        Ok(())
    }

    #[test]
    fn object_shapes_accept_aliases() -> Result<()> {
        let items = normalize_page(json!({"items": [{"id": 5}], "total": 120}))?;
        assert_eq!(items.total, 120);
        assert_eq!(items.rows.len(), 1);

        let results = normalize_page(json!({"results": [{"id": 5}, {"id": 6}], "count": 44}))?;
        assert_eq!(results.total, 44);

        let no_total = normalize_page(json!({"results": [{"id": 5}]}))?;
        assert_eq!(no_total.total, 1);
        Ok(())
    }

    #[test]
    fn declared_columns_skip_unknown_names() -> Result<()> {
        let page = normalize_page(json!({
            "items": [],
            "total": 0,
            "columns": ["transaction_date", "amount", "mystery", "payee"],
        }))?;
        assert_eq!(
            page.columns,
            Some(vec![Column::TransactionDate, Column::Amount, Column::Payee])
        );
        assert!(page.rows.is_empty());
        Ok(())
    }

    #[test]
    fn unexpected_shapes_are_errors() {
        assert!(normalize_page(json!({"data": []})).is_err());
        assert!(normalize_page(json!("nope")).is_err());
        assert!(normalize_page(json!([{"amount": "1.00", "id": "x"}])).is_err());

        let error = normalize_page(json!([{"payee": "A"}, {"payee": "B"}]))
            .expect_err("rows without an id should fail");
        assert!(error.to_string().contains("decode transaction row 0"));
    }

    #[test]
    fn loose_field_types_are_tolerated() -> Result<()> {
        let page = normalize_page(json!([{
            "id": 9,
            "client_id": 42,
            "transaction_date": "2024-03-01T10:00:00Z",
            "business_percentage": "50",
            "confidence": 0.9,
            "account_number": "1234",
            "payee": null,
            "unknown_field": true,
        }]))?;
        let row = &page.rows[0];
        assert_eq!(row.client_id.as_deref(), Some("42"));
        assert_eq!(row.transaction_date, parse_date("2024-03-01"));
        assert_eq!(row.business_percentage, Some(50));
        assert_eq!(row.confidence.as_deref(), Some("0.9"));
        assert_eq!(row.payee, None);
        Ok(())
    }

    #[test]
    fn parse_cents_handles_money_text() {
        assert_eq!(parse_cents("1,234.56"), Some(123_456));
        assert_eq!(parse_cents("$12"), Some(1_200));
        assert_eq!(parse_cents("-0.5"), Some(-50));
        assert_eq!(parse_cents(".125"), Some(13));
        assert_eq!(parse_cents("abc"), None);
        assert_eq!(parse_cents(""), None);
    }

    #[test]
    fn query_pairs_follow_query_state() -> Result<()> {
        let mut query = QueryState::default();
        query.apply(QueryCommand::SetClient(Some("ACME".to_owned())))?;
        query.apply(QueryCommand::SetYear(Some(2024)))?;
        query.apply(QueryCommand::ToggleSort(SortField::Amount))?;
        query.apply(QueryCommand::SetPage(2))?;

        let pairs = query_pairs(&query);
        let pairs: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("offset", "50"),
                ("limit", "25"),
                ("client_id", "ACME"),
                ("sort", "asc"),
                ("sort_by", "amount"),
                ("year", "2024"),
            ]
        );
        Ok(())
    }

    #[test]
    fn query_pairs_format_dates_and_search() -> Result<()> {
        let mut query = QueryState::default();
        query.apply(QueryCommand::CommitSearch(" coffee ".to_owned()))?;
        query.apply(QueryCommand::SetDateRange {
            start: parse_date("2024-01-01"),
            end: parse_date("2024-03-31"),
        })?;
        let pairs = query_pairs(&query);
        assert!(pairs.contains(&("search", "coffee".to_owned())));
        assert!(pairs.contains(&("start_date", "2024-01-01".to_owned())));
        assert!(pairs.contains(&("end_date", "2024-03-31".to_owned())));
        assert!(!pairs.iter().any(|(key, _)| *key == "client_id" || *key == "year"));
        Ok(())
    }

    #[test]
    fn error_bodies_are_cleaned() {
        let detail = clean_error_response(StatusCode::BAD_REQUEST, r#"{"detail":"bad filter"}"#);
        assert_eq!(detail.to_string(), "server error (400): bad filter");

        let plain = clean_error_response(StatusCode::SERVICE_UNAVAILABLE, "maintenance");
        assert_eq!(plain.to_string(), "server error (503): maintenance");

        let html = clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert_eq!(html.to_string(), "server returned 500");
    }

    #[test]
    fn acknowledgements_tolerate_empty_and_plain_bodies() {
        assert_eq!(parse_ack("").message, None);
        assert_eq!(parse_ack("queued").message.as_deref(), Some("queued"));
        let ack = parse_ack(r#"{"message":"ok","task_id":"abc","affected":3}"#);
        assert_eq!(ack.task_id.as_deref(), Some("abc"));
        assert_eq!(ack.affected, Some(3));
    }
}
