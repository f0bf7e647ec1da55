// SPDX-License-Identifier: MIT OR Apache-2.0
//! Entity-type definitions: composite `(name, version)` key, latest-version
//! lookup for the store's upsert guard.

use ocan_error::{ErrorCode, OcanError, OcanResult};
use ocan_store::EntityTypeValidator;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// A registered entity-type schema.
#[derive(Debug, Clone)]
pub struct EntityTypeDefinition {
    pub name: String,
    pub version: u32,
    pub json_schema: Value,
    pub description: Option<String>,
}

fn valid_type_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// Registers `(name, version)` entity-type definitions and validates
/// candidate values against them.
#[derive(Default)]
pub struct EntityTypeRegistry {
    definitions: RwLock<HashMap<(String, u32), EntityTypeDefinition>>,
}

impl EntityTypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new `(name, version)` pair. Fails if it already exists,
    /// the name is malformed, or the version is not a positive integer.
    pub fn add_entity_type_definition(
        &self,
        name: impl Into<String>,
        version: u32,
        json_schema: Value,
        description: Option<String>,
    ) -> OcanResult<()> {
        let name = name.into();
        if !valid_type_name(&name) {
            return Err(OcanError::new(ErrorCode::ParameterValidation, "entity type name must match ^[a-z0-9_-]+$")
                .with_context("name", name));
        }
        if version == 0 {
            return Err(OcanError::new(ErrorCode::ParameterValidation, "entity type version must be a positive integer")
                .with_context("name", name));
        }

        jsonschema::validator_for(&json_schema).map_err(|e| {
            OcanError::new(ErrorCode::ParameterValidation, "entity type jsonSchema does not compile")
                .with_context("name", name.clone())
                .with_context("version", version)
                .with_context("reason", e.to_string())
        })?;

        let mut definitions = self.definitions.write().expect("entity-type registry lock poisoned");
        let key = (name.clone(), version);
        if definitions.contains_key(&key) {
            return Err(OcanError::new(ErrorCode::EntityTypeAlreadyExists, "entity type version already registered")
                .with_context("name", name)
                .with_context("version", version));
        }
        definitions.insert(key, EntityTypeDefinition { name, version, json_schema, description });
        Ok(())
    }

    /// The highest-version definition registered for `name`, if any.
    #[must_use]
    pub fn get_latest_entity_type_definition(&self, name: &str) -> Option<EntityTypeDefinition> {
        let definitions = self.definitions.read().expect("entity-type registry lock poisoned");
        definitions
            .values()
            .filter(|d| d.name == name)
            .max_by_key(|d| d.version)
            .cloned()
    }

    /// Every registered entity-type definition, sorted by `(name, version)`.
    #[must_use]
    pub fn list(&self) -> Vec<EntityTypeDefinition> {
        let definitions = self.definitions.read().expect("entity-type registry lock poisoned");
        let mut list: Vec<_> = definitions.values().cloned().collect();
        list.sort_by(|a, b| (a.name.as_str(), a.version).cmp(&(b.name.as_str(), b.version)));
        list
    }
}

impl EntityTypeValidator for EntityTypeRegistry {
    fn latest_version(&self, name: &str) -> Option<u32> {
        self.get_latest_entity_type_definition(name).map(|d| d.version)
    }

    fn validate(&self, name: &str, version: u32, value: &Value) -> OcanResult<()> {
        let definitions = self.definitions.read().expect("entity-type registry lock poisoned");
        let definition = definitions
            .get(&(name.to_string(), version))
            .ok_or_else(|| OcanError::new(ErrorCode::EntityTypeNotFound, "entity type version not registered")
                .with_context("name", name)
                .with_context("version", version))?;

        let validator = jsonschema::validator_for(&definition.json_schema).map_err(|e| {
            OcanError::new(ErrorCode::ParameterValidation, "entity type jsonSchema does not compile")
                .with_context("name", name)
                .with_context("reason", e.to_string())
        })?;
        if validator.is_valid(value) {
            Ok(())
        } else {
            Err(OcanError::new(ErrorCode::ParameterValidation, "value failed entity-type schema validation")
                .with_context("name", name)
                .with_context("version", version))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({"type": "object", "properties": {"name": {"type": "string"}}, "required": ["name"]})
    }

    #[test]
    fn registers_and_finds_latest_version() {
        let reg = EntityTypeRegistry::new();
        reg.add_entity_type_definition("user", 1, schema(), None).unwrap();
        reg.add_entity_type_definition("user", 2, schema(), None).unwrap();
        let latest = reg.get_latest_entity_type_definition("user").unwrap();
        assert_eq!(latest.version, 2);
    }

    #[test]
    fn rejects_duplicate_name_version() {
        let reg = EntityTypeRegistry::new();
        reg.add_entity_type_definition("user", 1, schema(), None).unwrap();
        let err = reg.add_entity_type_definition("user", 1, schema(), None).unwrap_err();
        assert_eq!(err.code, ErrorCode::EntityTypeAlreadyExists);
    }

    #[test]
    fn validator_rejects_non_latest_version() {
        let reg = EntityTypeRegistry::new();
        reg.add_entity_type_definition("user", 1, schema(), None).unwrap();
        assert_eq!(EntityTypeValidator::latest_version(&reg, "user"), Some(1));
        assert!(EntityTypeValidator::validate(&reg, "user", 1, &json!({"name": "a"})).is_ok());
        assert!(EntityTypeValidator::validate(&reg, "user", 2, &json!({"name": "a"})).is_err());
    }

    #[test]
    fn validator_rejects_value_failing_schema() {
        let reg = EntityTypeRegistry::new();
        reg.add_entity_type_definition("user", 1, schema(), None).unwrap();
        let err = EntityTypeValidator::validate(&reg, "user", 1, &json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::ParameterValidation);
    }

    #[test]
    fn rejects_zero_version() {
        let reg = EntityTypeRegistry::new();
        let err = reg.add_entity_type_definition("user", 0, schema(), None).unwrap_err();
        assert_eq!(err.code, ErrorCode::ParameterValidation);
    }
}
