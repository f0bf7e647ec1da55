// SPDX-License-Identifier: MIT OR Apache-2.0
//! `parseEntityUri`: regex-based, deterministic parsing of the five shapes.

use crate::charset::{is_valid_domain, is_valid_id, is_valid_segment, is_valid_timestamp};
use crate::model::{EntityUriParams, ParsedUri, RegistryUriParams};
use ocan_error::{ErrorCode, OcanError, OcanResult};
use regex::Regex;
use std::sync::OnceLock;

fn uri_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^https://(?P<domain>[^/]+)
            /universe/(?P<universe>[^/]+)
            /galaxy/(?P<galaxy>[^/]+)
            /star/(?P<star>[^/]+)
            /(?:
                entity-types
                |
                entity/(?P<id>[^/]+)
                (?:
                    /patch(?:/(?P<baseline>[^/]+))?
                    |
                    /at/(?P<timestamp>[^/]+)
                )?
            )
            $
            ",
        )
        .expect("static URI pattern is valid regex")
    })
}

/// Parse `uri` into one of the five resource shapes.
///
/// Parsing is regex-based and deterministic: components are extracted
/// first, then validated against their charsets. Unknown suffixes (e.g. a
/// path component the five shapes don't define) are rejected with
/// [`ErrorCode::InvalidUri`].
pub fn parse_entity_uri(uri: &str) -> OcanResult<ParsedUri> {
    let caps = uri_regex()
        .captures(uri)
        .ok_or_else(|| invalid_uri(uri, "does not match any known resource shape"))?;

    let domain = &caps["domain"];
    let universe = &caps["universe"];
    let galaxy = &caps["galaxy"];
    let star = &caps["star"];

    if !is_valid_domain(domain) {
        return Err(invalid_uri(uri, "domain fails charset validation"));
    }
    for (label, value) in [("universe", universe), ("galaxy", galaxy), ("star", star)] {
        if !is_valid_segment(value) {
            return Err(invalid_uri(uri, &format!("{label} fails charset validation")));
        }
    }

    let Some(id_match) = caps.name("id") else {
        return Ok(ParsedUri::Registry(RegistryUriParams {
            domain: domain.to_string(),
            universe: universe.to_string(),
            galaxy: galaxy.to_string(),
            star: star.to_string(),
        }));
    };
    let id = id_match.as_str();
    if !is_valid_id(id) {
        return Err(invalid_uri(uri, "id fails charset validation"));
    }

    let params = EntityUriParams {
        domain: domain.to_string(),
        universe: universe.to_string(),
        galaxy: galaxy.to_string(),
        star: star.to_string(),
        id: id.to_string(),
    };

    if let Some(ts) = caps.name("timestamp") {
        let ts = ts.as_str();
        if !is_valid_timestamp(ts) {
            return Err(invalid_uri(uri, "timestamp fails canonical-format validation"));
        }
        return Ok(ParsedUri::Historical { params, timestamp: ts.to_string() });
    }

    if let Some(baseline) = caps.name("baseline") {
        let baseline = baseline.as_str();
        if !is_valid_timestamp(baseline) {
            return Err(invalid_uri(uri, "baseline fails canonical-format validation"));
        }
        return Ok(ParsedUri::PatchRead { params, baseline: baseline.to_string() });
    }

    // Matched `/patch` with no baseline, or bare `/entity/{id}`.
    if uri.ends_with("/patch") {
        Ok(ParsedUri::PatchSubscription(params))
    } else {
        Ok(ParsedUri::Current(params))
    }
}

fn invalid_uri(uri: &str, reason: &str) -> OcanError {
    OcanError::new(ErrorCode::InvalidUri, format!("invalid resource uri: {reason}"))
        .with_context("uri", uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_current() {
        let uri = "https://example.com/universe/u1/galaxy/g1/star/s1/entity/e1";
        let parsed = parse_entity_uri(uri).unwrap();
        assert!(matches!(parsed, ParsedUri::Current(_)));
    }

    #[test]
    fn parses_patch_subscription() {
        let uri = "https://example.com/universe/u1/galaxy/g1/star/s1/entity/e1/patch";
        let parsed = parse_entity_uri(uri).unwrap();
        assert!(matches!(parsed, ParsedUri::PatchSubscription(_)));
    }

    #[test]
    fn parses_patch_read() {
        let uri = "https://example.com/universe/u1/galaxy/g1/star/s1/entity/e1/patch/1970-01-01T00:00:00.000Z";
        match parse_entity_uri(uri).unwrap() {
            ParsedUri::PatchRead { baseline, .. } => assert_eq!(baseline, "1970-01-01T00:00:00.000Z"),
            other => panic!("expected PatchRead, got {other:?}"),
        }
    }

    #[test]
    fn parses_historical() {
        let uri = "https://example.com/universe/u1/galaxy/g1/star/s1/entity/e1/at/1970-01-01T00:00:00Z";
        match parse_entity_uri(uri).unwrap() {
            ParsedUri::Historical { timestamp, .. } => assert_eq!(timestamp, "1970-01-01T00:00:00Z"),
            other => panic!("expected Historical, got {other:?}"),
        }
    }

    #[test]
    fn parses_registry() {
        let uri = "https://example.com/universe/u1/galaxy/g1/star/s1/entity-types";
        assert!(matches!(parse_entity_uri(uri).unwrap(), ParsedUri::Registry(_)));
    }

    #[test]
    fn rejects_unknown_suffix() {
        let uri = "https://example.com/universe/u1/galaxy/g1/star/s1/entity/e1/unknown";
        let err = parse_entity_uri(uri).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidUri);
    }

    #[test]
    fn rejects_bad_charset_in_segment() {
        let uri = "https://example.com/universe/U1/galaxy/g1/star/s1/entity/e1";
        let err = parse_entity_uri(uri).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidUri);
    }

    #[test]
    fn rejects_malformed_timestamp() {
        let uri = "https://example.com/universe/u1/galaxy/g1/star/s1/entity/e1/at/not-a-timestamp";
        let err = parse_entity_uri(uri).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidUri);
    }
}
