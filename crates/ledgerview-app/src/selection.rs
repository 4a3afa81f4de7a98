// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::TransactionId;

/// Rows targeted by the next bulk action.
///
/// `AllMatchingFilter` refers to the active filter predicate and never carries
/// ids: the matching set may be far larger than anything loaded locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Explicit(BTreeSet<TransactionId>),
    AllMatchingFilter,
}

impl Default for Selection {
    fn default() -> Self {
        Self::Explicit(BTreeSet::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCheck {
    Unchecked,
    Partial,
    Checked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionBanner {
    Hidden,
    /// Every row on the page is selected and more rows match the filter.
    OfferAllMatching { page_rows: usize, total: usize },
    AllMatching { total: usize },
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Explicit(ids) => ids.is_empty(),
            Self::AllMatchingFilter => false,
        }
    }

    pub fn is_all_matching(&self) -> bool {
        matches!(self, Self::AllMatchingFilter)
    }

    pub fn contains(&self, id: TransactionId) -> bool {
        match self {
            Self::Explicit(ids) => ids.contains(&id),
            Self::AllMatchingFilter => true,
        }
    }

    /// Number of records a bulk action would touch.
    pub fn count(&self, total: usize) -> usize {
        match self {
            Self::Explicit(ids) => ids.len(),
            Self::AllMatchingFilter => total,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Flips one row. Inside `AllMatchingFilter` the complement set cannot be
    /// represented without enumerating every match, so the toggle drops back
    /// to an empty explicit selection instead.
    pub fn toggle_row(&mut self, id: TransactionId) {
        match self {
            Self::AllMatchingFilter => self.clear(),
            Self::Explicit(ids) => {
                if !ids.remove(&id) {
                    ids.insert(id);
                }
            }
        }
    }

    pub fn toggle_page(&mut self, checked: bool, page_ids: &[TransactionId]) {
        if checked {
            *self = Self::Explicit(page_ids.iter().copied().collect());
        } else {
            self.clear();
        }
    }

    pub fn can_select_all_matching(&self, page_ids: &[TransactionId], total: usize) -> bool {
        match self {
            Self::AllMatchingFilter => false,
            Self::Explicit(ids) => {
                !page_ids.is_empty()
                    && ids.len() == page_ids.len()
                    && page_ids.iter().all(|id| ids.contains(id))
                    && total > page_ids.len()
            }
        }
    }

    /// Returns false and leaves the selection untouched unless the current
    /// page is fully selected and more rows match than are shown.
    pub fn select_all_matching(&mut self, page_ids: &[TransactionId], total: usize) -> bool {
        if !self.can_select_all_matching(page_ids, total) {
            return false;
        }
        *self = Self::AllMatchingFilter;
        true
    }

    pub fn page_check(&self, page_ids: &[TransactionId]) -> PageCheck {
        if page_ids.is_empty() {
            return PageCheck::Unchecked;
        }
        match self {
            Self::AllMatchingFilter => PageCheck::Checked,
            Self::Explicit(ids) => {
                let selected = page_ids.iter().filter(|id| ids.contains(id)).count();
                if selected == 0 {
                    PageCheck::Unchecked
                } else if selected == page_ids.len() {
                    PageCheck::Checked
                } else {
                    PageCheck::Partial
                }
            }
        }
    }

    pub fn banner(&self, page_ids: &[TransactionId], total: usize) -> SelectionBanner {
        match self {
            Self::AllMatchingFilter => SelectionBanner::AllMatching { total },
            Self::Explicit(_) if self.can_select_all_matching(page_ids, total) => {
                SelectionBanner::OfferAllMatching {
                    page_rows: page_ids.len(),
                    total,
                }
            }
            Self::Explicit(_) => SelectionBanner::Hidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PageCheck, Selection, SelectionBanner};
    use crate::TransactionId;
    use proptest::prelude::*;

    fn ids(range: std::ops::Range<i64>) -> Vec<TransactionId> {
        range.map(TransactionId::new).collect()
    }

    #[test]
    fn toggle_row_adds_and_removes() {
        let mut selection = Selection::default();
        selection.toggle_row(TransactionId::new(3));
        assert!(selection.contains(TransactionId::new(3)));
        selection.toggle_row(TransactionId::new(3));
        assert!(selection.is_empty());
    }

    #[test]
    fn toggle_row_in_all_matching_degrades_to_empty() {
        let page = ids(1..26);
        let mut selection = Selection::default();
        selection.toggle_page(true, &page);
        assert!(selection.select_all_matching(&page, 120));

        selection.toggle_row(TransactionId::new(5));
        assert_eq!(selection, Selection::default());
    }

    #[test]
    fn toggle_page_exits_all_matching() {
        let page = ids(1..11);
        let mut selection = Selection::AllMatchingFilter;
        selection.toggle_page(true, &page);
        assert_eq!(selection.count(500), 10);
        assert!(!selection.is_all_matching());

        selection = Selection::AllMatchingFilter;
        selection.toggle_page(false, &page);
        assert!(selection.is_empty());
    }

    #[test]
    fn select_all_matching_requires_full_page_and_more_rows() {
        let page = ids(1..26);
        let mut selection = Selection::default();
        assert!(!selection.select_all_matching(&page, 120));

        for id in &page[..24] {
            selection.toggle_row(*id);
        }
        assert!(!selection.select_all_matching(&page, 120));
        assert_eq!(selection.banner(&page, 120), SelectionBanner::Hidden);

        selection.toggle_row(page[24]);
        assert_eq!(
            selection.banner(&page, 120),
            SelectionBanner::OfferAllMatching {
                page_rows: 25,
                total: 120,
            }
        );
        assert!(!selection.clone().select_all_matching(&page, 25));
        assert!(selection.select_all_matching(&page, 120));
        assert_eq!(
            selection.banner(&page, 120),
            SelectionBanner::AllMatching { total: 120 }
        );
        assert_eq!(selection.count(120), 120);
    }

    #[test]
    fn selections_from_other_pages_block_select_all_matching() {
        let first = ids(1..11);
        let second = ids(11..21);
        let mut selection = Selection::default();
        selection.toggle_row(first[0]);
        for id in &second {
            selection.toggle_row(*id);
        }
        assert_eq!(selection.page_check(&second), PageCheck::Checked);
        assert!(!selection.can_select_all_matching(&second, 100));
    }

    #[test]
    fn page_check_reflects_current_page_only() {
        let first = ids(1..4);
        let second = ids(4..7);
        let mut selection = Selection::default();
        selection.toggle_page(true, &first);

        assert_eq!(selection.page_check(&first), PageCheck::Checked);
        assert_eq!(selection.page_check(&second), PageCheck::Unchecked);

        selection.toggle_row(second[1]);
        assert_eq!(selection.page_check(&second), PageCheck::Partial);
        assert_eq!(selection.page_check(&[]), PageCheck::Unchecked);
    }

    proptest! {
        #[test]
        fn all_matching_is_only_reachable_from_a_full_page(
            toggles in proptest::collection::vec(0i64..12, 0..30),
            total in 0usize..40,
        ) {
            let page = ids(0..10);
            let mut selection = Selection::default();
            for id in toggles {
                selection.toggle_row(TransactionId::new(id));
            }
            let allowed = match &selection {
                Selection::Explicit(set) => set.len() == page.len()
                    && page.iter().all(|id| set.contains(id))
                    && total > page.len(),
                Selection::AllMatchingFilter => false,
            };
            prop_assert_eq!(selection.select_all_matching(&page, total), allowed);
            prop_assert_eq!(selection.is_all_matching(), allowed);
        }
    }
}
