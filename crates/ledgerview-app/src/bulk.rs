// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::{FilterSpec, Selection, TransactionId, format_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BulkAction {
    ExtractPayee,
    Classify,
    BatchExtractPayee,
    BatchClassify,
    Delete,
    MarkPersonal,
    MarkBusiness,
    MarkUnclassified,
    ResetProcessing,
}

impl BulkAction {
    pub const ALL: [Self; 9] = [
        Self::ExtractPayee,
        Self::Classify,
        Self::BatchExtractPayee,
        Self::BatchClassify,
        Self::Delete,
        Self::MarkPersonal,
        Self::MarkBusiness,
        Self::MarkUnclassified,
        Self::ResetProcessing,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExtractPayee => "extract-payee",
            Self::Classify => "classify",
            Self::BatchExtractPayee => "batch-extract-payee",
            Self::BatchClassify => "batch-classify",
            Self::Delete => "delete",
            Self::MarkPersonal => "mark-personal",
            Self::MarkBusiness => "mark-business",
            Self::MarkUnclassified => "mark-unclassified",
            Self::ResetProcessing => "reset-processing",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ExtractPayee => "Extract payee",
            Self::Classify => "Classify",
            Self::BatchExtractPayee => "Batch extract payee",
            Self::BatchClassify => "Batch classify",
            Self::Delete => "Delete",
            Self::MarkPersonal => "Mark personal",
            Self::MarkBusiness => "Mark business",
            Self::MarkUnclassified => "Mark unclassified",
            Self::ResetProcessing => "Reset processing status",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == value)
    }

    pub const fn is_destructive(self) -> bool {
        matches!(self, Self::Delete)
    }

    /// Cycles through the verbs, passing through "no verb chosen" after the
    /// last one.
    pub fn cycle(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(Self::ALL[0]),
            Some(action) => {
                let index = Self::ALL
                    .iter()
                    .position(|candidate| *candidate == action)
                    .unwrap_or_default();
                Self::ALL.get(index + 1).copied()
            }
        }
    }
}

/// Filter predicate as sent on the wire. Sort and page never travel with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPayload {
    pub client_id: Option<String>,
    pub search: Option<String>,
    pub year: Option<i32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl From<&FilterSpec> for FilterPayload {
    fn from(filter: &FilterSpec) -> Self {
        Self {
            client_id: filter.client_id.clone(),
            search: (!filter.search.is_empty()).then(|| filter.search.clone()),
            year: filter.year,
            start_date: filter.start_date.map(format_date),
            end_date: filter.end_date.map(format_date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionDescriptor {
    Ids(Vec<TransactionId>),
    Filter(FilterPayload),
}

/// Serializes as `{"action": ..., "ids": [...]}` or `{"action": ..., "filter": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRequest {
    pub action: BulkAction,
    #[serde(flatten)]
    pub target: SelectionDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkUnavailable {
    NoAction,
    EmptySelection,
}

impl BulkUnavailable {
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoAction => "choose a bulk action first",
            Self::EmptySelection => "select at least one row",
        }
    }
}

impl BulkRequest {
    pub fn build(
        action: Option<BulkAction>,
        selection: &Selection,
        filter: &FilterSpec,
    ) -> Result<Self, BulkUnavailable> {
        let action = action.ok_or(BulkUnavailable::NoAction)?;
        let target = match selection {
            Selection::Explicit(ids) if ids.is_empty() => {
                return Err(BulkUnavailable::EmptySelection);
            }
            Selection::Explicit(ids) => SelectionDescriptor::Ids(ids.iter().copied().collect()),
            Selection::AllMatchingFilter => SelectionDescriptor::Filter(filter.into()),
        };
        Ok(Self { action, target })
    }

    pub fn describe(&self, total: usize) -> String {
        match &self.target {
            SelectionDescriptor::Ids(ids) => {
                format!("{} {} selected row(s)", self.action.label(), ids.len())
            }
            SelectionDescriptor::Filter(_) => {
                format!("{} all {total} matching row(s)", self.action.label())
            }
        }
    }
}

/// Acknowledgement body; every field is optional and an empty 2xx is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkAck {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub affected: Option<u64>,
}

impl BulkAck {
    pub fn summary(&self, action: BulkAction) -> String {
        let mut text = self
            .message
            .clone()
            .unwrap_or_else(|| format!("{} submitted", action.label()));
        if let Some(affected) = self.affected {
            text.push_str(&format!(" ({affected} affected)"));
        }
        if let Some(task_id) = &self.task_id {
            text.push_str(&format!(" [task {task_id}]"));
        }
        text
    }
}
