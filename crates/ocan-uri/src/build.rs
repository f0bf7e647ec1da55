// SPDX-License-Identifier: MIT OR Apache-2.0
//! `buildEntityUri`: construction, validating each component before
//! substitution so the result is guaranteed parseable.

use crate::charset::{is_valid_domain, is_valid_id, is_valid_segment, is_valid_timestamp};
use crate::model::{EntityUriParams, ParsedUri, RegistryUriParams};
use ocan_error::{ErrorCode, OcanError, OcanResult};

fn validate_entity_params(params: &EntityUriParams) -> OcanResult<()> {
    validate_registry_params(&RegistryUriParams {
        domain: params.domain.clone(),
        universe: params.universe.clone(),
        galaxy: params.galaxy.clone(),
        star: params.star.clone(),
    })?;
    if !is_valid_id(&params.id) {
        return Err(invalid(&params.id, "id"));
    }
    Ok(())
}

fn validate_registry_params(params: &RegistryUriParams) -> OcanResult<()> {
    if !is_valid_domain(&params.domain) {
        return Err(invalid(&params.domain, "domain"));
    }
    for (label, value) in [
        ("universe", &params.universe),
        ("galaxy", &params.galaxy),
        ("star", &params.star),
    ] {
        if !is_valid_segment(value) {
            return Err(invalid(value, label));
        }
    }
    Ok(())
}

fn invalid(value: &str, field: &str) -> OcanError {
    OcanError::new(ErrorCode::InvalidUri, format!("{field} fails charset validation"))
        .with_context("field", field)
        .with_context("value", value)
}

fn entity_prefix(p: &EntityUriParams) -> String {
    format!(
        "https://{}/universe/{}/galaxy/{}/star/{}/entity/{}",
        p.domain, p.universe, p.galaxy, p.star, p.id
    )
}

/// Build the URI string for a [`ParsedUri`], validating every component
/// first so construction never produces a string that fails to
/// round-trip through [`crate::parse_entity_uri`].
pub fn build_entity_uri(shape: &ParsedUri) -> OcanResult<String> {
    match shape {
        ParsedUri::Current(p) => {
            validate_entity_params(p)?;
            Ok(entity_prefix(p))
        }
        ParsedUri::PatchSubscription(p) => {
            validate_entity_params(p)?;
            Ok(format!("{}/patch", entity_prefix(p)))
        }
        ParsedUri::PatchRead { params, baseline } => {
            validate_entity_params(params)?;
            if !is_valid_timestamp(baseline) {
                return Err(invalid(baseline, "baseline"));
            }
            Ok(format!("{}/patch/{}", entity_prefix(params), baseline))
        }
        ParsedUri::Historical { params, timestamp } => {
            validate_entity_params(params)?;
            if !is_valid_timestamp(timestamp) {
                return Err(invalid(timestamp, "timestamp"));
            }
            Ok(format!("{}/at/{}", entity_prefix(params), timestamp))
        }
        ParsedUri::Registry(p) => {
            validate_registry_params(p)?;
            Ok(format!(
                "https://{}/universe/{}/galaxy/{}/star/{}/entity-types",
                p.domain, p.universe, p.galaxy, p.star
            ))
        }
    }
}
