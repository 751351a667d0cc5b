//! End-to-end scenarios through a bridge with in-memory collaborators.

mod common;

use common::{Harness, Observed};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use webview_bridge::native::NativeCall;
use webview_bridge::{
    BindingIndex, BridgeConfig, BridgeError, DispatchOutcome, DropReason, GcControl, JsonDispatch,
    OffloadQueue, OwnerHandle, ReturnStatus, WebviewNative,
};

const H1: usize = 0x1001;

#[test]
fn test_sum_is_dispatched_once_with_owner() {
    let harness = Harness::new(BridgeConfig::default());
    let index = harness
        .bridge
        .register_binding("sum", OwnerHandle::from_id(H1), harness.recorder())
        .unwrap();
    assert_eq!(index, BindingIndex::new(0));

    let outcome = harness.bridge.dispatch("1", "[1,2]", index);

    assert_eq!(outcome, DispatchOutcome::Dispatched);
    assert_eq!(
        harness.seen(),
        vec![Observed {
            owner: H1,
            name: "sum".to_string(),
            seq: "1".to_string(),
            request: "[1,2]".to_string(),
            gc_enabled_during: false,
        }]
    );
    assert!(harness.native.returns().is_empty());
}

#[test]
fn test_unregistered_sum_is_dropped() {
    let harness = Harness::new(BridgeConfig::default());
    let index = harness
        .bridge
        .register_binding("sum", OwnerHandle::from_id(H1), harness.recorder())
        .unwrap();
    harness.bridge.unregister_binding("sum");

    let outcome = harness.bridge.dispatch("2", "[1,2]", index);

    assert_eq!(outcome, DispatchOutcome::Dropped(DropReason::Inactive));
    assert!(harness.seen().is_empty());

    let (seq, status, payload) = harness.native.returns().remove(0);
    assert_eq!(seq, "2");
    assert_eq!(status, ReturnStatus::Reject);
    let payload: Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(payload["code"], "INACTIVE_BINDING");
}

#[test]
fn test_fill_then_free_then_reuse() {
    const N: usize = 4;
    let harness = Harness::new(BridgeConfig::new().with_capacity(N));

    for i in 0..N {
        let index = harness
            .bridge
            .register_binding(&format!("fn{}", i), OwnerHandle::from_id(i + 1), harness.recorder())
            .unwrap();
        assert_eq!(index.get(), i);
    }

    let err = harness
        .bridge
        .register_binding("overflow", OwnerHandle::from_id(99), harness.recorder())
        .unwrap_err();
    assert!(matches!(err, BridgeError::NoCapacity { capacity: N }));

    assert_eq!(
        harness.bridge.unregister_binding("fn2"),
        Some(BindingIndex::new(2))
    );
    let reused = harness
        .bridge
        .register_binding("overflow", OwnerHandle::from_id(99), harness.recorder())
        .unwrap();
    assert_eq!(reused, BindingIndex::new(2));

    harness.bridge.dispatch("7", "[]", reused);
    assert_eq!(harness.seen()[0].owner, 99);
    assert_eq!(harness.seen()[0].name, "overflow");
}

#[test]
fn test_unregister_unknown_name_is_noop() {
    let harness = Harness::new(BridgeConfig::default());
    harness
        .bridge
        .register_binding("sum", OwnerHandle::from_id(H1), harness.recorder())
        .unwrap();

    assert_eq!(harness.bridge.unregister_binding("ghost"), None);
    assert_eq!(harness.bridge.index_of("sum"), Some(BindingIndex::new(0)));
}

#[test]
fn test_gc_bracketing_when_enabled() {
    let harness = Harness::new(BridgeConfig::default());
    let index = harness
        .bridge
        .register_binding("sum", OwnerHandle::from_id(H1), harness.recorder())
        .unwrap();

    for seq in 0..3 {
        harness.bridge.dispatch(&seq.to_string(), "[]", index);
        assert!(harness.gc.is_enabled());
    }

    assert!(harness.seen().iter().all(|call| !call.gc_enabled_during));
    assert_eq!(harness.gc.suspend_count(), 3);
    assert_eq!(harness.gc.resume_count(), 3);
}

#[test]
fn test_gc_stays_disabled_when_already_off() {
    let harness = Harness::with_gc(BridgeConfig::default(), false);
    let index = harness
        .bridge
        .register_binding("sum", OwnerHandle::from_id(H1), harness.recorder())
        .unwrap();

    harness.bridge.dispatch("1", "[]", index);

    assert!(!harness.gc.is_enabled());
    assert!(!harness.seen()[0].gc_enabled_during);
    assert_eq!(harness.gc.suspend_count(), 0);
    assert_eq!(harness.gc.resume_count(), 0);
}

#[test]
fn test_garbage_indices_never_dispatch() {
    let harness = Harness::new(BridgeConfig::new().with_capacity(2));
    harness
        .bridge
        .register_binding("sum", OwnerHandle::from_id(H1), harness.recorder())
        .unwrap();

    for raw in [1, 2, 64, usize::MAX] {
        let outcome = harness.bridge.dispatch("x", "[]", BindingIndex::new(raw));
        assert!(!outcome.is_dispatched());
    }
    assert!(harness.seen().is_empty());
    assert_eq!(harness.bridge.metrics().dropped(DropReason::InvalidIndex), 3);
    assert_eq!(harness.bridge.metrics().dropped(DropReason::Inactive), 1);
}

#[test]
fn test_register_unregister_sequence_tracks_latest() {
    let harness = Harness::new(BridgeConfig::new().with_capacity(3));
    let ops: [(&str, bool); 8] = [
        ("a", true),
        ("b", true),
        ("a", false),
        ("c", true),
        ("d", true),
        ("b", false),
        ("a", true),
        ("c", false),
    ];

    for (step, (name, add)) in ops.iter().enumerate() {
        if *add {
            harness
                .bridge
                .register_binding(name, OwnerHandle::from_id(step + 1), harness.recorder())
                .unwrap();
        } else {
            harness.bridge.unregister_binding(name);
        }
    }

    // a:0 b:1 -a c:0 d:2 -b a:1 -c
    let bindings = harness.bridge.bindings();
    assert_eq!(
        bindings,
        vec![
            (BindingIndex::new(1), "a".to_string()),
            (BindingIndex::new(2), "d".to_string()),
        ]
    );
    assert_eq!(harness.bridge.lookup(BindingIndex::new(1)).unwrap().owner().id(), 7);
    assert!(harness.bridge.lookup(BindingIndex::new(0)).is_none());
}

#[test]
fn test_json_handler_resolves_promise() {
    let harness = Harness::new(BridgeConfig::default());
    let native: Arc<dyn WebviewNative> = harness.native.clone();
    let sum = JsonDispatch::shared(native, |_: OwnerHandle, args: Vec<Value>| {
        let total: i64 = args.iter().filter_map(Value::as_i64).sum();
        Ok(json!(total))
    });

    let index = harness
        .bridge
        .register_binding("sum", OwnerHandle::from_id(H1), sum)
        .unwrap();
    harness.bridge.dispatch("1", "[1,2]", index);

    assert_eq!(
        harness.native.returns(),
        vec![("1".to_string(), ReturnStatus::Resolve, "3".to_string())]
    );
}

#[test]
fn test_native_sees_bind_and_unbind() {
    let harness = Harness::new(BridgeConfig::default());
    let index = harness
        .bridge
        .register_binding("sum", OwnerHandle::from_id(H1), harness.recorder())
        .unwrap();
    harness.bridge.unregister_binding("sum");

    assert_eq!(
        harness.native.calls(),
        vec![
            NativeCall::Bind {
                name: "sum".to_string(),
                index
            },
            NativeCall::Unbind {
                name: "sum".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn test_offloaded_handler_completes_after_trampoline_returns() {
    let harness = Harness::new(BridgeConfig::default());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let queue = OffloadQueue::from_config(harness.native.clone(), harness.bridge.config()).unwrap();

    let index = harness
        .bridge
        .register_binding(
            "slow",
            OwnerHandle::from_id(H1),
            queue.dispatch(move |args: Vec<Value>| {
                std::thread::sleep(Duration::from_millis(20));
                let _ = tx.send(());
                Ok(json!(args.len()))
            }),
        )
        .unwrap();

    let outcome = harness.bridge.dispatch("5", "[1,2,3]", index);
    assert_eq!(outcome, DispatchOutcome::Dispatched);

    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while queue.completed() < 1 {
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(
        harness.native.returns(),
        vec![("5".to_string(), ReturnStatus::Resolve, "3".to_string())]
    );

    tokio::task::spawn_blocking(move || queue.shutdown(Duration::from_secs(1)))
        .await
        .unwrap();
}
