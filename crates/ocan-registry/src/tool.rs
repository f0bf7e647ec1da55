// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tool registration and invocation with input-schema validation.

use jsonschema::Validator;
use ocan_error::{ErrorCode, OcanError, OcanResult};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

/// A registered tool's handler. Receives validated `args` and returns a
/// result or an [`OcanError`].
pub type ToolHandler = Arc<dyn Fn(Value) -> OcanResult<Value> + Send + Sync>;

/// Behavioral hints a tool reports about itself (read-only, destructive,
/// idempotent, ...); carried through unvalidated to callers.
pub type ToolAnnotations = Value;

/// A registered tool: schema, optional output schema, and its handler.
pub struct ToolDefinition {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
    pub output_schema: Option<Value>,
    pub annotations: Option<ToolAnnotations>,
    pub handler: ToolHandler,
    input_validator: Validator,
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish_non_exhaustive()
    }
}

fn valid_tool_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// Registers tools by name, rejecting duplicates and malformed schemas.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<ToolDefinition>>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool. Fails if the name is malformed, already
    /// registered, or `input_schema` doesn't compile.
    pub fn register(
        &self,
        name: impl Into<String>,
        description: Option<String>,
        input_schema: Value,
        output_schema: Option<Value>,
        annotations: Option<ToolAnnotations>,
        handler: ToolHandler,
    ) -> OcanResult<()> {
        let name = name.into();
        if !valid_tool_name(&name) {
            return Err(OcanError::new(ErrorCode::ParameterValidation, "tool name must match ^[a-z0-9_-]+$")
                .with_context("name", name));
        }

        let input_validator = jsonschema::validator_for(&input_schema).map_err(|e| {
            OcanError::new(ErrorCode::ParameterValidation, "tool inputSchema does not compile")
                .with_context("name", name.clone())
                .with_context("reason", e.to_string())
        })?;

        let mut tools = self.tools.write().expect("tool registry lock poisoned");
        if tools.contains_key(&name) {
            return Err(OcanError::new(ErrorCode::ToolAlreadyExists, "tool already registered")
                .with_context("name", name));
        }

        tools.insert(
            name.clone(),
            Arc::new(ToolDefinition {
                name,
                description,
                input_schema,
                output_schema,
                annotations,
                handler,
                input_validator,
            }),
        );
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<ToolDefinition>> {
        self.tools.read().expect("tool registry lock poisoned").get(name).cloned()
    }

    /// All registered tools' public metadata (MCP `tools/list` shape),
    /// sorted by name for deterministic output.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<ToolDefinition>> {
        let tools = self.tools.read().expect("tool registry lock poisoned");
        let mut list: Vec<_> = tools.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Validate `args` against the tool's input schema, then invoke its
    /// handler. Domain errors from the handler propagate unchanged; a panic
    /// is caught and wrapped as [`ErrorCode::ToolExecution`].
    pub fn call(&self, name: &str, args: Value) -> OcanResult<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| OcanError::new(ErrorCode::ToolNotFound, "no tool registered with this name").with_context("name", name))?;

        if !tool.input_validator.is_valid(&args) {
            return Err(OcanError::new(ErrorCode::ParameterValidation, "tool arguments failed schema validation")
                .with_context("name", name));
        }

        let handler = tool.handler.clone();
        match catch_unwind(AssertUnwindSafe(|| handler(args))) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "tool handler panicked".to_string());
                Err(OcanError::new(ErrorCode::ToolExecution, message).with_context("name", name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
    }

    fn echo_handler() -> ToolHandler {
        Arc::new(|args| Ok(args))
    }

    #[test]
    fn registers_and_calls_a_tool() {
        let reg = registry();
        reg.register(
            "echo",
            Some("echoes its input".into()),
            json!({"type": "object", "properties": {"msg": {"type": "string"}}, "required": ["msg"]}),
            None,
            None,
            echo_handler(),
        )
        .unwrap();

        let result = reg.call("echo", json!({"msg": "hi"})).unwrap();
        assert_eq!(result, json!({"msg": "hi"}));
    }

    #[test]
    fn rejects_duplicate_registration() {
        let reg = registry();
        reg.register("echo", None, json!({"type": "object"}), None, None, echo_handler()).unwrap();
        let err = reg.register("echo", None, json!({"type": "object"}), None, None, echo_handler()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ToolAlreadyExists);
    }

    #[test]
    fn rejects_malformed_name() {
        let reg = registry();
        let err = reg.register("Echo Tool", None, json!({"type": "object"}), None, None, echo_handler()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ParameterValidation);
    }

    #[test]
    fn unknown_tool_call_is_not_found() {
        let reg = registry();
        let err = reg.call("missing", json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::ToolNotFound);
    }

    #[test]
    fn args_failing_schema_are_rejected() {
        let reg = registry();
        reg.register(
            "echo",
            None,
            json!({"type": "object", "properties": {"msg": {"type": "string"}}, "required": ["msg"]}),
            None,
            None,
            echo_handler(),
        )
        .unwrap();
        let err = reg.call("echo", json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::ParameterValidation);
    }

    #[test]
    fn domain_error_from_handler_propagates_unchanged() {
        let reg = registry();
        let handler: ToolHandler = Arc::new(|_| Err(OcanError::new(ErrorCode::EntityNotFound, "no such record")));
        reg.register("lookup", None, json!({"type": "object"}), None, None, handler).unwrap();
        let err = reg.call("lookup", json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::EntityNotFound);
    }

    #[test]
    fn panicking_handler_is_wrapped_as_tool_execution_error() {
        let reg = registry();
        let handler: ToolHandler = Arc::new(|_| panic!("boom"));
        reg.register("boom", None, json!({"type": "object"}), None, None, handler).unwrap();
        let err = reg.call("boom", json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::ToolExecution);
    }

    #[test]
    fn list_is_sorted_by_name() {
        let reg = registry();
        reg.register("zebra", None, json!({"type": "object"}), None, None, echo_handler()).unwrap();
        reg.register("alpha", None, json!({"type": "object"}), None, None, echo_handler()).unwrap();
        let names: Vec<_> = reg.list().into_iter().map(|t| t.name.clone()).collect();
        assert_eq!(names, vec!["alpha", "zebra"]);
    }
}
