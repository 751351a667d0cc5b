//! JSON request/response handling for Rust-side handlers.
//!
//! The webview library delivers arguments as a JSON array and expects the
//! result (or error) as JSON text through `native_return`.

use super::Dispatch;
use crate::error::{CallError, ErrorCode};
use crate::native::{ReturnStatus, WebviewNative};
use crate::registry::OwnerHandle;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Decode the request payload into its argument list
pub fn parse_args(request: &str) -> Result<Vec<Value>, CallError> {
    match serde_json::from_str::<Value>(request) {
        Ok(Value::Array(args)) => Ok(args),
        Ok(other) => Err(CallError::bad_request(format!(
            "expected a JSON array of arguments, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(CallError::bad_request(format!("malformed request: {}", e))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse, run `handler`, and map every failure to a [`CallError`].
///
/// Panics inside the handler are caught here so the promise is still
/// rejected.
pub(crate) fn run_handler<F>(name: &str, request: &str, handler: F) -> Result<Value, CallError>
where
    F: FnOnce(Vec<Value>) -> anyhow::Result<Value>,
{
    let args = parse_args(request).map_err(|e| e.with_binding(name))?;

    match catch_unwind(AssertUnwindSafe(|| handler(args))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            Err(CallError::handler_failed(format!("{:#}", err)).with_binding(name))
        }
        Err(_) => Err(
            CallError::new(ErrorCode::HandlerPanicked, "handler panicked").with_binding(name),
        ),
    }
}

/// Complete the JS promise for `seq`.
///
/// A failed `native_return` is logged; there is nobody left to report it to.
pub fn complete(native: &dyn WebviewNative, seq: &str, result: Result<Value, CallError>) {
    let (status, json) = match result {
        Ok(value) => (ReturnStatus::Resolve, value.to_string()),
        Err(err) => {
            debug!(seq = %seq, code = %err.code, "Rejecting call: {}", err.message);
            (ReturnStatus::Reject, err.to_json())
        }
    };

    if let Err(status_err) = native.ret(seq, status, &json) {
        warn!(seq = %seq, error = %status_err, "native_return failed");
    }
}

/// Synchronous JSON handler running on the event-loop thread.
///
/// The handler receives the owner handle while the collector is suspended.
pub struct JsonDispatch<H> {
    native: Arc<dyn WebviewNative>,
    handler: H,
}

impl<H> JsonDispatch<H>
where
    H: Fn(OwnerHandle, Vec<Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    /// Create a dispatch that completes calls through `native`
    pub fn new(native: Arc<dyn WebviewNative>, handler: H) -> Self {
        Self { native, handler }
    }

    /// Wrap as a shareable dispatch function
    pub fn shared(native: Arc<dyn WebviewNative>, handler: H) -> Arc<dyn Dispatch> {
        Arc::new(Self::new(native, handler))
    }
}

impl<H> Dispatch for JsonDispatch<H>
where
    H: Fn(OwnerHandle, Vec<Value>) -> anyhow::Result<Value> + Send + Sync,
{
    fn dispatch(&self, owner: OwnerHandle, name: &str, seq: &str, request: &str) {
        let result = run_handler(name, request, |args| (self.handler)(owner, args));
        complete(self.native.as_ref(), seq, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::RecordingNative;
    use serde_json::json;

    fn sum(_: OwnerHandle, args: Vec<Value>) -> anyhow::Result<Value> {
        let mut total = 0.0;
        for arg in args {
            total += arg
                .as_f64()
                .ok_or_else(|| anyhow::anyhow!("argument {} is not a number", arg))?;
        }
        Ok(json!(total))
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(parse_args("[1,\"a\"]").unwrap(), vec![json!(1), json!("a")]);
        assert_eq!(parse_args("[]").unwrap(), Vec::<Value>::new());

        let err = parse_args("{\"a\":1}").unwrap_err();
        assert_eq!(err.code, ErrorCode::SerializationError);
        assert!(err.message.contains("an object"));

        assert!(parse_args("[1,").is_err());
    }

    #[test]
    fn test_resolves_result() {
        let native = Arc::new(RecordingNative::new());
        let dispatch = JsonDispatch::shared(native.clone(), sum);

        dispatch.dispatch(OwnerHandle::from_id(1), "sum", "1", "[1,2]");

        let returns = native.returns();
        assert_eq!(returns.len(), 1);
        assert_eq!(returns[0].0, "1");
        assert_eq!(returns[0].1, ReturnStatus::Resolve);
        assert_eq!(serde_json::from_str::<Value>(&returns[0].2).unwrap(), json!(3.0));
    }

    #[test]
    fn test_rejects_handler_error() {
        let native = Arc::new(RecordingNative::new());
        let dispatch = JsonDispatch::shared(native.clone(), sum);

        dispatch.dispatch(OwnerHandle::from_id(1), "sum", "2", "[1,\"x\"]");

        let (seq, status, payload) = native.returns().remove(0);
        assert_eq!(seq, "2");
        assert_eq!(status, ReturnStatus::Reject);
        let err: CallError = serde_json::from_str(&payload).unwrap();
        assert_eq!(err.code, ErrorCode::HandlerFailed);
        assert!(err.message.contains("not a number"));
        assert_eq!(err.binding.as_deref(), Some("sum"));
    }

    #[test]
    fn test_rejects_malformed_request() {
        let native = Arc::new(RecordingNative::new());
        let dispatch = JsonDispatch::shared(native.clone(), sum);

        dispatch.dispatch(OwnerHandle::from_id(1), "sum", "3", "not json");

        let (_, status, payload) = native.returns().remove(0);
        assert_eq!(status, ReturnStatus::Reject);
        let err: CallError = serde_json::from_str(&payload).unwrap();
        assert_eq!(err.code, ErrorCode::SerializationError);
    }

    #[test]
    fn test_rejects_panicking_handler() {
        let native = Arc::new(RecordingNative::new());
        let dispatch = JsonDispatch::shared(
            native.clone(),
            |_: OwnerHandle, _: Vec<Value>| -> anyhow::Result<Value> { panic!("boom") },
        );

        dispatch.dispatch(OwnerHandle::from_id(1), "boom", "4", "[]");

        let (_, status, payload) = native.returns().remove(0);
        assert_eq!(status, ReturnStatus::Reject);
        assert!(payload.contains("HANDLER_PANICKED"));
    }

    #[test]
    fn test_handler_sees_owner() {
        let native = Arc::new(RecordingNative::new());
        let dispatch = JsonDispatch::shared(native.clone(), |owner: OwnerHandle, _| {
            Ok(json!(owner.id()))
        });

        dispatch.dispatch(OwnerHandle::from_id(42), "whoami", "5", "[]");

        assert_eq!(native.returns()[0].2, "42");
    }
}
