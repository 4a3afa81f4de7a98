// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::{CellValue, Column};

pub const TRUNCATE_CHARS: usize = 40;
pub const INFO_GLYPH: &str = "🛈";

pub const SUMMARY_COLUMNS: [Column; 8] = [
    Column::TransactionDate,
    Column::Amount,
    Column::Description,
    Column::Payee,
    Column::Category,
    Column::ClassificationType,
    Column::Confidence,
    Column::Reasoning,
];

pub const FULL_COLUMNS: [Column; 18] = Column::ALL;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnSet {
    #[default]
    Summary,
    Full,
}

impl ColumnSet {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Full => "full",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "summary" => Some(Self::Summary),
            "full" => Some(Self::Full),
            _ => None,
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Summary => Self::Full,
            Self::Full => Self::Summary,
        }
    }

    pub const fn configured(self) -> &'static [Column] {
        match self {
            Self::Summary => &SUMMARY_COLUMNS,
            Self::Full => &FULL_COLUMNS,
        }
    }
}

/// The configured columns of `set` that the collection actually declares,
/// in configured order.
pub fn visible_columns(set: ColumnSet, present: &[Column]) -> Vec<Column> {
    set.configured()
        .iter()
        .copied()
        .filter(|column| present.contains(column))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRendering {
    Plain,
    Truncate { max_chars: usize },
    IconOnly,
}

pub const fn rendering_for(column: Column) -> CellRendering {
    match column {
        Column::Description | Column::NormalizedDescription | Column::FilePath => {
            CellRendering::Truncate {
                max_chars: TRUNCATE_CHARS,
            }
        }
        Column::Reasoning | Column::PayeeReasoning => CellRendering::IconOnly,
        _ => CellRendering::Plain,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCell {
    pub text: String,
    /// Full value for a preview when the rendered text hides part of it.
    pub tooltip: Option<String>,
}

pub fn render_cell(column: Column, value: &CellValue) -> RenderedCell {
    let full = value.display();
    match rendering_for(column) {
        CellRendering::Plain => RenderedCell {
            text: full,
            tooltip: None,
        },
        CellRendering::Truncate { max_chars } => {
            let text = truncate_label(&full, max_chars);
            let tooltip = (text != full).then_some(full);
            RenderedCell { text, tooltip }
        }
        CellRendering::IconOnly if value.is_empty() => RenderedCell {
            text: String::new(),
            tooltip: None,
        },
        CellRendering::IconOnly => RenderedCell {
            text: INFO_GLYPH.to_owned(),
            tooltip: Some(full),
        },
    }
}

pub fn truncate_label(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}…")
    } else {
        truncated
    }
}
