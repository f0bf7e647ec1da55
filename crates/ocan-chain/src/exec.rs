// SPDX-License-Identifier: MIT OR Apache-2.0
//! Chain execution: walks an [`OperationChain`] against a target,
//! substituting nested chains and the `$result` placeholder.

use ocan_error::{ErrorCode, OcanError, OcanResult};
use serde_json::Value;

use crate::step::{ChainArg, OperationChain, OperationStep, RESULT_PLACEHOLDER};

/// Something an [`OperationChain`] can be executed against.
///
/// Rust has no generic dynamic member access, so unlike the proxy-backed
/// original this trait is implemented directly by whatever owns the
/// actor's callable surface (typically the actor itself). `path` carries
/// the accumulated `get` keys since the last `call`, letting an
/// implementation namespace methods the way `.session.store(...)` would.
pub trait ChainTarget {
    /// Resolve a property read. `path` is the get-key path leading to this
    /// property (excluding `key` itself).
    fn get_property(&self, path: &[String], key: &str) -> OcanResult<Value>;

    /// Invoke a method. `path` is the get-key path that qualifies `key`
    /// (the "immediate receiver" the call is bound to).
    fn call_method(&mut self, path: &[String], key: &str, args: Vec<Value>) -> OcanResult<Value>;
}

/// Walk `chain`'s steps against `target`, returning the final step's
/// result (or `Value::Null` for an empty chain).
///
/// `get` steps resolve by property read; `call` steps bind to the
/// immediate receiver built up by the preceding `get`s, then reset the
/// path. Nested-chain arguments are resolved by executing them against the
/// same `target` first, left-to-right, innermost-first. If any step
/// throws, execution aborts and the error propagates unchanged.
pub fn execute_operation_chain(
    chain: &OperationChain,
    target: &mut dyn ChainTarget,
) -> OcanResult<Value> {
    let mut path: Vec<String> = Vec::new();
    let mut last = Value::Null;

    for step in chain.steps() {
        match step {
            OperationStep::Get { key } => {
                last = target.get_property(&path, key)?;
                path.push(key.clone());
            }
            OperationStep::Call { key, args } => {
                let resolved = resolve_args(args, target)?;
                last = target.call_method(&path, key, resolved)?;
                path.clear();
            }
        }
    }

    Ok(last)
}

/// Resolve a step's arguments into plain JSON values, executing any nested
/// chains against `target` first.
fn resolve_args(args: &[ChainArg], target: &mut dyn ChainTarget) -> OcanResult<Vec<Value>> {
    args.iter().map(|arg| resolve_arg(arg, target)).collect()
}

fn resolve_arg(arg: &ChainArg, target: &mut dyn ChainTarget) -> OcanResult<Value> {
    match arg {
        ChainArg::Value(v) => Ok(v.clone()),
        ChainArg::Nested(chain) => execute_operation_chain(chain, target),
        ChainArg::ResultPlaceholder => Err(OcanError::new(
            ErrorCode::ParameterValidation,
            "unsubstituted $result placeholder reached execution",
        )),
    }
}

/// Substitute the `$result` placeholder inside `chain`'s call arguments
/// with `value`, returning a new chain. Used to inject either a success
/// result or an error into a handler continuation before executing it.
///
/// Substitution recurses into nested chains' arguments too, and into plain
/// JSON values that themselves carry the literal `$result` string at any
/// depth (arrays and objects are traversed).
#[must_use]
pub fn replace_nested_operation_markers(chain: &OperationChain, value: &Value) -> OperationChain {
    let steps = chain
        .steps()
        .iter()
        .map(|step| substitute_step(step, value))
        .collect();
    OperationChain::from_steps(steps)
}

fn substitute_step(step: &OperationStep, value: &Value) -> OperationStep {
    match step {
        OperationStep::Get { key } => OperationStep::Get { key: key.clone() },
        OperationStep::Call { key, args } => OperationStep::Call {
            key: key.clone(),
            args: args.iter().map(|a| substitute_arg(a, value)).collect(),
        },
    }
}

fn substitute_arg(arg: &ChainArg, value: &Value) -> ChainArg {
    match arg {
        ChainArg::ResultPlaceholder => ChainArg::Value(value.clone()),
        ChainArg::Value(v) => ChainArg::Value(substitute_json(v, value)),
        ChainArg::Nested(chain) => ChainArg::Nested(replace_nested_operation_markers(chain, value)),
    }
}

fn substitute_json(v: &Value, value: &Value) -> Value {
    match v {
        Value::String(s) if s == RESULT_PLACEHOLDER => value.clone(),
        Value::Array(items) => Value::Array(items.iter().map(|i| substitute_json(i, value)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute_json(v, value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::new_continuation;
    use std::collections::HashMap;

    /// A toy actor for exercising chain execution in tests: properties are
    /// a flat string->json map, methods are closures keyed by name.
    struct TestActor {
        props: HashMap<String, Value>,
        calls: Vec<(String, Vec<Value>)>,
    }

    impl TestActor {
        fn new() -> Self {
            Self {
                props: HashMap::new(),
                calls: Vec::new(),
            }
        }
    }

    impl ChainTarget for TestActor {
        fn get_property(&self, _path: &[String], key: &str) -> OcanResult<Value> {
            Ok(self.props.get(key).cloned().unwrap_or(Value::Null))
        }

        fn call_method(&mut self, _path: &[String], key: &str, args: Vec<Value>) -> OcanResult<Value> {
            self.calls.push((key.to_string(), args.clone()));
            match key {
                "getData" => Ok(Value::String("v".into())),
                "store" => Ok(args.first().cloned().unwrap_or(Value::Null)),
                other => Err(OcanError::new(ErrorCode::ToolNotFound, format!("no such method {other}"))),
            }
        }
    }

    #[test]
    fn executes_simple_call() {
        let chain = new_continuation()
            .call("getData", vec![ChainArg::Value(serde_json::json!("k"))])
            .build();
        let mut actor = TestActor::new();
        let result = execute_operation_chain(&chain, &mut actor).unwrap();
        assert_eq!(result, serde_json::json!("v"));
        assert_eq!(actor.calls, vec![("getData".to_string(), vec![serde_json::json!("k")])]);
    }

    #[test]
    fn propagates_thrown_errors() {
        let chain = new_continuation().call("noSuchMethod", vec![]).build();
        let mut actor = TestActor::new();
        let err = execute_operation_chain(&chain, &mut actor).unwrap_err();
        assert_eq!(err.code, ErrorCode::ToolNotFound);
    }

    #[test]
    fn nested_chain_with_result_injection_matches_direct_call() {
        // remote = ctn().getData("k")
        let remote = new_continuation()
            .call("getData", vec![ChainArg::Value(serde_json::json!("k"))])
            .build();
        // handler = ctn().store(remote, $result)
        let handler = new_continuation()
            .call(
                "store",
                vec![ChainArg::Nested(remote.clone()), ChainArg::ResultPlaceholder],
            )
            .build();

        let mut actor = TestActor::new();
        let remote_result = execute_operation_chain(&remote, &mut actor).unwrap();
        assert_eq!(remote_result, serde_json::json!("v"));

        let substituted = replace_nested_operation_markers(&handler, &remote_result);
        let mut actor2 = TestActor::new();
        execute_operation_chain(&substituted, &mut actor2).unwrap();

        // Equivalent to actor.store("v", "v").
        assert_eq!(
            actor2.calls,
            vec![("store".to_string(), vec![serde_json::json!("v"), serde_json::json!("v")])]
        );
    }

    #[test]
    fn unsubstituted_placeholder_is_rejected_at_execution() {
        let chain = new_continuation().call("store", vec![ChainArg::ResultPlaceholder]).build();
        let mut actor = TestActor::new();
        let err = execute_operation_chain(&chain, &mut actor).unwrap_err();
        assert_eq!(err.code, ErrorCode::ParameterValidation);
    }

    #[test]
    fn substitution_is_deep_through_arrays_and_objects() {
        let chain = new_continuation()
            .call(
                "store",
                vec![ChainArg::Value(serde_json::json!({"list": ["$result", "kept"]}))],
            )
            .build();
        let substituted = replace_nested_operation_markers(&chain, &serde_json::json!(42));
        let mut actor = TestActor::new();
        execute_operation_chain(&substituted, &mut actor).unwrap();
        assert_eq!(
            actor.calls[0].1[0],
            serde_json::json!({"list": [42, "kept"]})
        );
    }
}
