// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::Date;
use time::macros::format_description;

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    TransactionDate,
    Amount,
    Description,
    Payee,
    Category,
    ClassificationType,
    Confidence,
    Source,
}

impl SortField {
    pub const ALL: [Self; 8] = [
        Self::TransactionDate,
        Self::Amount,
        Self::Description,
        Self::Payee,
        Self::Category,
        Self::ClassificationType,
        Self::Confidence,
        Self::Source,
    ];

    pub const fn as_str(self) -> &'static str {
        self.column().as_str()
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == value)
    }

    pub const fn column(self) -> Column {
        match self {
            Self::TransactionDate => Column::TransactionDate,
            Self::Amount => Column::Amount,
            Self::Description => Column::Description,
            Self::Payee => Column::Payee,
            Self::Category => Column::Category,
            Self::ClassificationType => Column::ClassificationType,
            Self::Confidence => Column::Confidence,
            Self::Source => Column::Source,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PageSize {
    Ten,
    #[default]
    TwentyFive,
    Fifty,
    Hundred,
}

impl PageSize {
    pub const ALL: [Self; 4] = [Self::Ten, Self::TwentyFive, Self::Fifty, Self::Hundred];

    pub const fn get(self) -> usize {
        match self {
            Self::Ten => 10,
            Self::TwentyFive => 25,
            Self::Fifty => 50,
            Self::Hundred => 100,
        }
    }

    pub fn from_rows(rows: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|size| size.get() == rows)
    }

    pub fn next(self) -> Self {
        let index = Self::ALL
            .iter()
            .position(|size| *size == self)
            .unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

/// Every field the collection service may report for a transaction, in the
/// order the full column set displays them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    ClientId,
    TransactionDate,
    Amount,
    Description,
    NormalizedDescription,
    Payee,
    Category,
    ClassificationType,
    Worksheet,
    BusinessPercentage,
    Confidence,
    Source,
    FilePath,
    AccountNumber,
    Reasoning,
    PayeeReasoning,
    ClassificationMethod,
    PayeeExtractionMethod,
}

impl Column {
    pub const ALL: [Self; 18] = [
        Self::ClientId,
        Self::TransactionDate,
        Self::Amount,
        Self::Description,
        Self::NormalizedDescription,
        Self::Payee,
        Self::Category,
        Self::ClassificationType,
        Self::Worksheet,
        Self::BusinessPercentage,
        Self::Confidence,
        Self::Source,
        Self::FilePath,
        Self::AccountNumber,
        Self::Reasoning,
        Self::PayeeReasoning,
        Self::ClassificationMethod,
        Self::PayeeExtractionMethod,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClientId => "client_id",
            Self::TransactionDate => "transaction_date",
            Self::Amount => "amount",
            Self::Description => "description",
            Self::NormalizedDescription => "normalized_description",
            Self::Payee => "payee",
            Self::Category => "category",
            Self::ClassificationType => "classification_type",
            Self::Worksheet => "worksheet",
            Self::BusinessPercentage => "business_percentage",
            Self::Confidence => "confidence",
            Self::Source => "source",
            Self::FilePath => "file_path",
            Self::AccountNumber => "account_number",
            Self::Reasoning => "reasoning",
            Self::PayeeReasoning => "payee_reasoning",
            Self::ClassificationMethod => "classification_method",
            Self::PayeeExtractionMethod => "payee_extraction_method",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|column| column.as_str() == value)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ClientId => "client",
            Self::TransactionDate => "date",
            Self::Amount => "amount",
            Self::Description => "description",
            Self::NormalizedDescription => "normalized",
            Self::Payee => "payee",
            Self::Category => "category",
            Self::ClassificationType => "class",
            Self::Worksheet => "worksheet",
            Self::BusinessPercentage => "biz %",
            Self::Confidence => "confidence",
            Self::Source => "source",
            Self::FilePath => "file",
            Self::AccountNumber => "account",
            Self::Reasoning => "reasoning",
            Self::PayeeReasoning => "payee reasoning",
            Self::ClassificationMethod => "class method",
            Self::PayeeExtractionMethod => "payee method",
        }
    }

    pub fn sort_field(self) -> Option<SortField> {
        SortField::ALL
            .into_iter()
            .find(|field| field.column() == self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Empty,
    Text(String),
    Money(i64),
    Date(Date),
    Percent(i64),
}

impl CellValue {
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(value) => value.clone(),
            Self::Money(cents) => format_money(*cents),
            Self::Date(date) => format_date(*date),
            Self::Percent(value) => format!("{value}%"),
        }
    }

    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// A transaction row as reported by the collection service. Every field but
/// the id is optional because the service omits what it has not computed yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    pub id: TransactionId,
    pub client_id: Option<String>,
    pub transaction_date: Option<Date>,
    pub amount_cents: Option<i64>,
    pub description: Option<String>,
    pub normalized_description: Option<String>,
    pub payee: Option<String>,
    pub category: Option<String>,
    pub classification_type: Option<String>,
    pub worksheet: Option<String>,
    pub business_percentage: Option<i64>,
    pub confidence: Option<String>,
    pub source: Option<String>,
    pub file_path: Option<String>,
    pub account_number: Option<String>,
    pub reasoning: Option<String>,
    pub payee_reasoning: Option<String>,
    pub classification_method: Option<String>,
    pub payee_extraction_method: Option<String>,
}

impl Record {
    pub fn value(&self, column: Column) -> CellValue {
        let text = |value: &Option<String>| match value {
            Some(value) if !value.is_empty() => CellValue::Text(value.clone()),
            _ => CellValue::Empty,
        };

        match column {
            Column::ClientId => text(&self.client_id),
            Column::TransactionDate => self
                .transaction_date
                .map_or(CellValue::Empty, CellValue::Date),
            Column::Amount => self.amount_cents.map_or(CellValue::Empty, CellValue::Money),
            Column::Description => text(&self.description),
            Column::NormalizedDescription => text(&self.normalized_description),
            Column::Payee => text(&self.payee),
            Column::Category => text(&self.category),
            Column::ClassificationType => text(&self.classification_type),
            Column::Worksheet => text(&self.worksheet),
            Column::BusinessPercentage => self
                .business_percentage
                .map_or(CellValue::Empty, CellValue::Percent),
            Column::Confidence => text(&self.confidence),
            Column::Source => text(&self.source),
            Column::FilePath => text(&self.file_path),
            Column::AccountNumber => text(&self.account_number),
            Column::Reasoning => text(&self.reasoning),
            Column::PayeeReasoning => text(&self.payee_reasoning),
            Column::ClassificationMethod => text(&self.classification_method),
            Column::PayeeExtractionMethod => text(&self.payee_extraction_method),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub client_id: String,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub business_description: Option<String>,
}

impl BusinessProfile {
    pub fn label(&self) -> String {
        match self.business_type.as_deref() {
            Some(kind) if !kind.is_empty() => format!("{} ({kind})", self.client_id),
            _ => self.client_id.clone(),
        }
    }
}

pub fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let dollars = abs / 100;
    let rest = abs % 100;

    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}.{rest:02}")
}

pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}
