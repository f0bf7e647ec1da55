// SPDX-License-Identifier: MIT OR Apache-2.0
//! Component charsets shared by parsing and construction, so both stay in
//! sync with the single source of truth in the shape table.

use regex::Regex;
use std::sync::OnceLock;

fn compiled(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static charset pattern is valid regex")
}

macro_rules! charset_pattern {
    ($name:ident, $pattern:literal) => {
        pub(crate) fn $name() -> &'static Regex {
            static CELL: OnceLock<Regex> = OnceLock::new();
            CELL.get_or_init(|| compiled($pattern))
        }
    };
}

charset_pattern!(segment, "^[a-z0-9_-]+$");
charset_pattern!(domain, "^[a-z0-9._-]+$");
charset_pattern!(id, "^[a-zA-Z0-9._-]+$");
charset_pattern!(timestamp, r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d{3})?Z$");

/// Validates `universe`, `galaxy`, and `star` segments: `^[a-z0-9_-]+$`.
#[must_use]
pub fn is_valid_segment(s: &str) -> bool {
    segment().is_match(s)
}

/// Validates the `domain` component: `^[a-z0-9._-]+$`.
#[must_use]
pub fn is_valid_domain(s: &str) -> bool {
    domain().is_match(s)
}

/// Validates the entity `id` component: `^[a-zA-Z0-9._-]+$`.
#[must_use]
pub fn is_valid_id(s: &str) -> bool {
    id().is_match(s)
}

/// Validates a canonical timestamp: `YYYY-MM-DDTHH:mm:ss(.sss)?Z`.
#[must_use]
pub fn is_valid_timestamp(s: &str) -> bool {
    timestamp().is_match(s)
}
