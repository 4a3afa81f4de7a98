// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Holds raw search keystrokes until input has been quiet for `window`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDebouncer {
    window: Duration,
    draft: String,
    last_input: Option<Instant>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEBOUNCE)
    }
}

impl SearchDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            draft: String::new(),
            last_input: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn pending(&self) -> bool {
        self.last_input.is_some()
    }

    /// Replaces the draft and restarts the quiescence window.
    pub fn input(&mut self, value: impl Into<String>, now: Instant) {
        self.draft = value.into();
        self.last_input = Some(now);
    }

    /// Returns the draft once the window has elapsed since the last input.
    /// Yields at most once per burst of keystrokes.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let last = self.last_input?;
        if now.saturating_duration_since(last) < self.window {
            return None;
        }
        self.last_input = None;
        Some(self.draft.clone())
    }

    /// Commits the draft immediately, for example on Enter.
    pub fn flush(&mut self) -> Option<String> {
        self.last_input.take().map(|_| self.draft.clone())
    }

    /// Aligns the draft with an externally committed term without scheduling a commit.
    pub fn reset(&mut self, committed: &str) {
        self.draft = committed.to_owned();
        self.last_input = None;
    }
}
