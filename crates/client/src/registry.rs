//! Registry of calls awaiting a correlated response.
//!
//! Each outstanding call is owned by the registry from registration until it
//! is taken out, either by a matching response or by abandonment. [`take`]
//! is the single extraction point and removes atomically, so a completion
//! can be invoked at most once even when responses, timeouts and teardown
//! race on different threads.
//!
//! [`take`]: PendingCalls::take

use std::fmt;
use std::sync::{Mutex, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use protocol::{CorrelationId, RequestType};
use serde_json::Value;

use crate::error::{ClientError, Result};

/// Continuation invoked exactly once with the outcome of a call.
pub type Completion = Box<dyn FnOnce(Result<Value>) + Send + 'static>;

/// A call awaiting its response.
///
/// The completion is only `Send`; the mutex makes the call shareable so the
/// registry can be used from several threads.
pub struct PendingCall {
    kind: RequestType,
    completion: Mutex<Completion>,
}

impl PendingCall {
    pub fn new(kind: RequestType, completion: Completion) -> Self {
        Self {
            kind,
            completion: Mutex::new(completion),
        }
    }

    /// The operation this call was issued for.
    pub fn kind(&self) -> RequestType {
        self.kind
    }

    /// Consume the call and deliver its outcome.
    pub fn complete(self, outcome: Result<Value>) {
        let completion = self
            .completion
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        completion(outcome)
    }
}

impl fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Thread-safe registry of pending calls keyed by correlation id.
#[derive(Debug, Default)]
pub struct PendingCalls {
    calls: DashMap<CorrelationId, PendingCall>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a call under `id`.
    ///
    /// Ids must not be reused while outstanding; a duplicate is rejected and
    /// the existing entry is left untouched.
    pub fn register(&self, id: CorrelationId, call: PendingCall) -> Result<()> {
        match self.calls.entry(id) {
            Entry::Occupied(_) => Err(ClientError::DuplicateId(id)),
            Entry::Vacant(slot) => {
                slot.insert(call);
                Ok(())
            }
        }
    }

    /// Remove and return the call registered under `id`.
    pub fn take(&self, id: CorrelationId) -> Option<PendingCall> {
        self.calls.remove(&id).map(|(_, call)| call)
    }

    /// Returns true if a call is outstanding under `id`.
    pub fn contains(&self, id: CorrelationId) -> bool {
        self.calls.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Remove every outstanding call.
    ///
    /// Calls registered concurrently with the drain may survive it.
    pub fn drain(&self) -> Vec<(CorrelationId, PendingCall)> {
        let ids: Vec<CorrelationId> = self.calls.iter().map(|entry| *entry.key()).collect();
        ids.into_iter()
            .filter_map(|id| self.take(id).map(|call| (id, call)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_call(log: &Arc<Mutex<Vec<Result<Value>>>>) -> PendingCall {
        let log = Arc::clone(log);
        PendingCall::new(
            RequestType::ReadFileText,
            Box::new(move |outcome| log.lock().unwrap().push(outcome)),
        )
    }

    #[test]
    fn test_register_and_take() {
        let registry = PendingCalls::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.register(1, recording_call(&log)).unwrap();
        assert!(registry.contains(1));
        assert_eq!(registry.len(), 1);

        let call = registry.take(1).unwrap();
        assert_eq!(call.kind(), RequestType::ReadFileText);
        assert!(registry.is_empty());

        call.complete(Ok(Value::String("hi".to_string())));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_take_is_at_most_once() {
        let registry = PendingCalls::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.register(5, recording_call(&log)).unwrap();
        assert!(registry.take(5).is_some());
        assert!(registry.take(5).is_none());
    }

    #[test]
    fn test_take_unknown_id() {
        let registry = PendingCalls::new();
        assert!(registry.take(99).is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let registry = PendingCalls::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.register(3, recording_call(&log)).unwrap();
        let err = registry.register(3, recording_call(&log)).unwrap_err();
        assert_eq!(err, ClientError::DuplicateId(3));
        assert_eq!(registry.len(), 1);

        // The original entry is still the one delivered.
        registry.take(3).unwrap().complete(Ok(Value::Null));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_drain_empties_registry() {
        let registry = PendingCalls::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for id in 0..4 {
            registry.register(id, recording_call(&log)).unwrap();
        }

        let mut drained = registry.drain();
        drained.sort_by_key(|(id, _)| *id);
        assert_eq!(
            drained.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_take_delivers_once() {
        let registry = Arc::new(PendingCalls::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.register(7, recording_call(&log)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    if let Some(call) = registry.take(7) {
                        call.complete(Ok(Value::Null));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_registry_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PendingCall>();
        assert_send_sync::<PendingCalls>();
    }
}
