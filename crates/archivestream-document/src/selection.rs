// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page range resolution — turns expressions like "1, 3-5" into concrete page
// lists.
//
// Resolution never fails. Tokens that are not numbers, pages outside the
// document, and ranges that are empty after clamping are dropped silently.

use std::collections::BTreeSet;

use tracing::trace;

/// Resolved, strictly ascending, duplicate-free list of 1-based page numbers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageSelection(Vec<u32>);

impl PageSelection {
    /// Resolve `expression` against a document of `page_count` pages.
    pub fn resolve(expression: &str, page_count: u32) -> Self {
        let expression = expression.trim();
        if expression.is_empty() || expression.eq_ignore_ascii_case("all") {
            return Self((1..=page_count).collect());
        }

        let mut pages = BTreeSet::new();
        for token in expression.split(',').map(str::trim) {
            match token.split_once('-') {
                Some((start, end)) if !end.contains('-') => {
                    let (Ok(start), Ok(end)) = (start.trim().parse::<u32>(), end.trim().parse::<u32>())
                    else {
                        trace!(token, "dropping malformed range");
                        continue;
                    };
                    let start = start.max(1);
                    let end = end.min(page_count);
                    // Empty when start > end after clamping.
                    pages.extend(start..=end);
                }
                Some(_) => trace!(token, "dropping token with several hyphens"),
                None => match token.parse::<u32>() {
                    Ok(page) if (1..=page_count).contains(&page) => {
                        pages.insert(page);
                    }
                    _ => trace!(token, page_count, "dropping page token"),
                },
            }
        }

        Self(pages.into_iter().collect())
    }

    pub fn pages(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.0
    }
}

/// Shorthand for [`PageSelection::resolve`] returning the page numbers.
pub fn resolve(expression: &str, page_count: u32) -> Vec<u32> {
    PageSelection::resolve(expression, page_count).into_vec()
}
