//! Windowless backend that records every call.

use super::{NativeResult, NativeStatus, ReturnStatus, WebviewNative};
use crate::registry::BindingIndex;
use parking_lot::Mutex;
use std::collections::HashMap;

/// A call observed by [`RecordingNative`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    /// `bind(name, index)`
    Bind {
        /// JS-visible name
        name: String,
        /// Slot index carried as the opaque argument
        index: BindingIndex,
    },
    /// `unbind(name)`
    Unbind {
        /// JS-visible name
        name: String,
    },
    /// `ret(seq, status, json)`
    Return {
        /// Sequence id of the completed call
        seq: String,
        /// Resolve or reject
        status: ReturnStatus,
        /// JSON payload
        json: String,
    },
}

/// Headless [`WebviewNative`] that keeps a log of calls.
///
/// Tracks bound names like the real library does, so binding a name twice
/// reports `Duplicate` and unbinding an unknown name reports `NotFound`.
#[derive(Debug, Default)]
pub struct RecordingNative {
    calls: Mutex<Vec<NativeCall>>,
    bound: Mutex<HashMap<String, BindingIndex>>,
    fail_bind: Mutex<Option<NativeStatus>>,
}

impl RecordingNative {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `bind` calls fail with `status` (`None` clears)
    pub fn fail_binds_with(&self, status: Option<NativeStatus>) {
        *self.fail_bind.lock() = status;
    }

    /// All calls so far
    pub fn calls(&self) -> Vec<NativeCall> {
        self.calls.lock().clone()
    }

    /// Only the `ret` calls, as `(seq, status, json)`
    pub fn returns(&self) -> Vec<(String, ReturnStatus, String)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                NativeCall::Return { seq, status, json } => {
                    Some((seq.clone(), *status, json.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Index a name is currently bound to
    pub fn bound_index(&self, name: &str) -> Option<BindingIndex> {
        self.bound.lock().get(name).copied()
    }

    /// Forget recorded calls, keeping bound names
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl WebviewNative for RecordingNative {
    fn bind(&self, name: &str, index: BindingIndex) -> NativeResult {
        self.calls.lock().push(NativeCall::Bind {
            name: name.to_string(),
            index,
        });
        if let Some(status) = *self.fail_bind.lock() {
            return Err(status);
        }
        let mut bound = self.bound.lock();
        if bound.contains_key(name) {
            return Err(NativeStatus::Duplicate);
        }
        bound.insert(name.to_string(), index);
        Ok(())
    }

    fn unbind(&self, name: &str) -> NativeResult {
        self.calls.lock().push(NativeCall::Unbind {
            name: name.to_string(),
        });
        match self.bound.lock().remove(name) {
            Some(_) => Ok(()),
            None => Err(NativeStatus::NotFound),
        }
    }

    fn ret(&self, seq: &str, status: ReturnStatus, json: &str) -> NativeResult {
        self.calls.lock().push(NativeCall::Return {
            seq: seq.to_string(),
            status,
            json: json.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_bind() {
        let native = RecordingNative::new();
        let index = BindingIndex::new(0);
        assert!(native.bind("sum", index).is_ok());
        assert_eq!(native.bind("sum", index), Err(NativeStatus::Duplicate));
        assert_eq!(native.bound_index("sum"), Some(index));
    }

    #[test]
    fn test_unbind_unknown() {
        let native = RecordingNative::new();
        assert_eq!(native.unbind("nope"), Err(NativeStatus::NotFound));
    }

    #[test]
    fn test_returns_filter() {
        let native = RecordingNative::new();
        native.bind("sum", BindingIndex::new(1)).unwrap();
        native.ret("7", ReturnStatus::Resolve, "3").unwrap();

        assert_eq!(native.calls().len(), 2);
        assert_eq!(
            native.returns(),
            vec![("7".to_string(), ReturnStatus::Resolve, "3".to_string())]
        );
    }

    #[test]
    fn test_forced_bind_failure() {
        let native = RecordingNative::new();
        native.fail_binds_with(Some(NativeStatus::InvalidState));
        assert_eq!(
            native.bind("x", BindingIndex::new(0)),
            Err(NativeStatus::InvalidState)
        );
        assert_eq!(native.bound_index("x"), None);
    }
}
