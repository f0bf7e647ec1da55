// SPDX-License-Identifier: MIT OR Apache-2.0
//! Async call protocol: `call`, the worker variant, and the
//! proxy-fetch cancellation race.

use ocan_chain::{execute_operation_chain, replace_nested_operation_markers, ChainTarget, IntoOperationChain};
use ocan_error::{ErrorCode, OcanError, OcanErrorDto, OcanResult};
use ocan_protocol::{call_raw, CallStub, CallerIdentity};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// `call(calleeBinding, calleeInstanceNameOrId, remoteContinuation, handlerContinuation?)`.
///
/// Requires the caller already knows its own `bindingName` (fails fast
/// otherwise, per the design). Awaits [`call_raw`]; on success, the result
/// is substituted into `handler_chain` and executed against `target`. On
/// failure, the error (as an [`OcanErrorDto`]) is substituted instead. If
/// no handler is supplied, both outcomes are silently dropped
/// (fire-and-forget).
///
/// This function itself awaits the remote call and, when a handler is
/// given, its execution — giving the caller a way to observe completion in
/// tests. A deployment that needs the "returns immediately, handler runs
/// detached" property wraps this in `tokio::spawn` at the call site, where
/// `target` is reachable through an `Arc`-shared, interior-mutable actor
/// handle.
///
/// # Errors
///
/// Fails fast with [`ErrorCode::MissingInstanceName`] if `caller` has no
/// `binding_name` yet. Propagates handler-execution errors.
pub async fn call(
    stub: &dyn CallStub,
    caller: &CallerIdentity,
    callee_binding: impl Into<String>,
    callee_instance_name_or_id: Option<String>,
    remote_chain: impl IntoOperationChain,
    handler_chain: Option<ocan_chain::OperationChain>,
    target: &mut dyn ChainTarget,
) -> OcanResult<()> {
    if caller.binding_name.is_none() {
        return Err(OcanError::new(
            ErrorCode::MissingInstanceName,
            "caller must know its own bindingName before calling",
        ));
    }

    let result = call_raw(stub, caller, callee_binding, callee_instance_name_or_id, remote_chain).await;
    apply_result_to_handler(result, handler_chain, target)
}

/// Worker variant of [`call`]: stateless callers are ephemeral and have no
/// serialization contract, so this omits the serialized-region framing and
/// is directly awaitable; the handler continuation is mandatory and its
/// result is returned to the caller.
pub async fn call_from_worker(
    stub: &dyn CallStub,
    callee_binding: impl Into<String>,
    callee_instance_name_or_id: Option<String>,
    remote_chain: impl IntoOperationChain,
    handler_chain: ocan_chain::OperationChain,
    target: &mut dyn ChainTarget,
) -> OcanResult<serde_json::Value> {
    let caller = CallerIdentity {
        kind: ocan_protocol::ActorKind::StatelessWorker,
        binding_name: None,
        instance_name_or_id: None,
    };
    let result = call_raw(stub, &caller, callee_binding, callee_instance_name_or_id, remote_chain).await;
    let value = result_or_error_dto(result);
    let substituted = replace_nested_operation_markers(&handler_chain, &value);
    execute_operation_chain(&substituted, target)
}

fn apply_result_to_handler(
    result: OcanResult<serde_json::Value>,
    handler_chain: Option<ocan_chain::OperationChain>,
    target: &mut dyn ChainTarget,
) -> OcanResult<()> {
    let Some(handler) = handler_chain else {
        // Fire-and-forget: drop both successes and errors.
        return Ok(());
    };
    let value = result_or_error_dto(result);
    let substituted = replace_nested_operation_markers(&handler, &value);
    execute_operation_chain(&substituted, target)?;
    Ok(())
}

fn result_or_error_dto(result: OcanResult<serde_json::Value>) -> serde_json::Value {
    match result {
        Ok(v) => v,
        Err(e) => serde_json::to_value(OcanErrorDto::from(&e)).unwrap_or(serde_json::Value::Null),
    }
}

/// A cancel-by-id race between two independent completers (the executor
/// and a timeout alarm) for `proxyFetchSimple`. The first side to call
/// [`ProxyFetchCompleter::try_complete`] wins; the loser's call is a no-op.
#[derive(Debug, Clone)]
pub struct ProxyFetchCompleter {
    done: Arc<AtomicBool>,
}

impl ProxyFetchCompleter {
    /// A fresh, uncompleted race.
    #[must_use]
    pub fn new() -> Self {
        Self {
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attempt to win the race. Returns `true` exactly once across all
    /// clones of this completer.
    pub fn try_complete(&self) -> bool {
        self.done.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
    }
}

impl Default for ProxyFetchCompleter {
    fn default() -> Self {
        Self::new()
    }
}

/// `__handleProxyFetchSimpleResult(reqId, result, serializedUserChain)`.
///
/// If `completer` has already been won by the other side, this is a
/// silent no-op. Otherwise the result is substituted into `user_chain` and
/// executed against `target`.
pub fn handle_proxy_fetch_simple_result(
    completer: &ProxyFetchCompleter,
    result: &serde_json::Value,
    user_chain: &ocan_chain::OperationChain,
    target: &mut dyn ChainTarget,
) -> OcanResult<()> {
    if !completer.try_complete() {
        return Ok(());
    }
    let substituted = replace_nested_operation_markers(user_chain, result);
    execute_operation_chain(&substituted, target)?;
    Ok(())
}
