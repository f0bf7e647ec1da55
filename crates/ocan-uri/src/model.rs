// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parsed/buildable forms of the five resource URI shapes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The coordinates shared by every entity URI shape: which domain,
/// universe/galaxy/star, and entity id it addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EntityUriParams {
    /// Host domain.
    pub domain: String,
    /// Universe segment.
    pub universe: String,
    /// Galaxy segment.
    pub galaxy: String,
    /// Star segment.
    pub star: String,
    /// Entity id.
    pub id: String,
}

/// Coordinates for the registry (entity-types) shape, which has no entity
/// id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RegistryUriParams {
    /// Host domain.
    pub domain: String,
    /// Universe segment.
    pub universe: String,
    /// Galaxy segment.
    pub galaxy: String,
    /// Star segment.
    pub star: String,
}

/// A successfully parsed resource URI, tagged by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedUri {
    /// `.../entity/{id}`
    Current(EntityUriParams),
    /// `.../entity/{id}/patch`
    PatchSubscription(EntityUriParams),
    /// `.../entity/{id}/patch/{baseline}`
    PatchRead {
        /// Entity coordinates.
        params: EntityUriParams,
        /// The `validFrom` the patch is computed against.
        baseline: String,
    },
    /// `.../entity/{id}/at/{timestamp}`
    Historical {
        /// Entity coordinates.
        params: EntityUriParams,
        /// The valid-time instant to read at.
        timestamp: String,
    },
    /// `.../entity-types`
    Registry(RegistryUriParams),
}

impl ParsedUri {
    /// True if this shape is writable via `resources/subscribe`
    /// (`subscribe` rejects read-only shapes: [`Self::PatchRead`] and
    /// [`Self::Historical`]).
    #[must_use]
    pub fn is_subscribable(&self) -> bool {
        matches!(self, Self::Current(_) | Self::PatchSubscription(_))
    }
}
