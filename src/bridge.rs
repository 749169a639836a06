//! Outbound side of the native bridge.
//!
//! Requests are method calls with named arguments. Most of them are answered
//! through events; the few that expect a direct answer get a request id, and
//! the native side hands the answer back through [`PendingCalls::complete`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use serde_json::Value;

pub use crossbeam_channel::RecvTimeoutError;

use crate::Result;

pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeMethod {
    Initialize,
    QueryProducts,
    BuyProduct,
    RestorePurchases,
    GetPastPurchases,
    FinishTransaction,
}

impl BridgeMethod {
    /// Method name as the native plugin registers it.
    pub fn name(&self) -> &'static str {
        match self {
            BridgeMethod::Initialize => "initialize",
            BridgeMethod::QueryProducts => "query_products",
            BridgeMethod::BuyProduct => "buy_product",
            BridgeMethod::RestorePurchases => "restore_purchases",
            BridgeMethod::GetPastPurchases => "get_past_purchases",
            BridgeMethod::FinishTransaction => "finish_transaction",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeRequest {
    pub id: RequestId,
    pub method: BridgeMethod,
    /// Named arguments, or `Value::Null` when the method takes none.
    pub arguments: Value,
    pub wait_for_result: bool,
}

/// Transport to the native store layer.
///
/// `send` must not block on the store: fire-and-forget requests return once
/// handed off, and requests with `wait_for_result` are answered later through
/// [`PendingCalls::complete`] with the same request id.
pub trait Bridge: Send + Sync {
    fn send(&self, request: BridgeRequest) -> Result<()>;
}

/// Correlation table for requests that wait for a result.
///
/// Each waiting request owns a one-slot channel; whoever holds the answer
/// completes it by id. Answers for ids nobody waits on anymore are dropped.
#[derive(Debug, Default)]
pub struct PendingCalls {
    next_id: AtomicU64,
    slots: Mutex<HashMap<RequestId, Sender<Option<String>>>>,
}

/// Receiving half of a pending call, returned by [`PendingCalls::register`].
#[derive(Debug)]
pub struct PendingCall {
    pub id: RequestId,
    receiver: Receiver<Option<String>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> RequestId {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn register(&self) -> PendingCall {
        let id = self.next_id();
        let (sender, receiver) = bounded(1);
        self.slots().insert(id, sender);
        PendingCall { id, receiver }
    }

    /// Delivers the answer for `id`. Returns `false` when no call is waiting
    /// for it (unknown id, already answered, or timed out).
    pub fn complete(&self, id: RequestId, result: Option<String>) -> bool {
        match self.slots().remove(&id) {
            Some(sender) => sender.try_send(result).is_ok(),
            None => false,
        }
    }

    pub fn cancel(&self, id: RequestId) {
        self.slots().remove(&id);
    }

    /// Blocks until the call is completed or `timeout` elapses. `Ok(None)` is
    /// an answer that carried nothing; on error the call is forgotten.
    pub fn wait(
        &self,
        call: PendingCall,
        timeout: Duration,
    ) -> std::result::Result<Option<String>, RecvTimeoutError> {
        call.receiver.recv_timeout(timeout).map_err(|err| {
            self.cancel(call.id);
            err
        })
    }

    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<RequestId, Sender<Option<String>>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Allows one native call of a kind to be outstanding at a time.
///
/// A native call that never returns keeps its blocking thread parked even after
/// the caller has timed out. Refusing to start another one while it is parked
/// bounds that to a single thread.
#[derive(Debug, Default, Clone)]
pub struct InFlight(Arc<AtomicBool>);

/// Held while a call is outstanding; dropping it frees the slot.
#[derive(Debug)]
pub struct InFlightGuard(Arc<AtomicBool>);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self) -> Option<InFlightGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(self.0.clone()))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn completed_call_returns_result() {
        let pending = PendingCalls::new();
        let call = pending.register();
        assert!(pending.complete(call.id, Some("[]".into())));
        assert_eq!(
            pending.wait(call, Duration::from_secs(1)),
            Ok(Some("[]".to_string()))
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn completion_from_another_thread() {
        let pending = Arc::new(PendingCalls::new());
        let call = pending.register();
        let id = call.id;
        let completer = {
            let pending = pending.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                pending.complete(id, Some("done".into()))
            })
        };
        assert_eq!(
            pending.wait(call, Duration::from_secs(5)),
            Ok(Some("done".to_string()))
        );
        assert!(completer.join().unwrap());
    }

    #[test]
    fn timeout_forgets_the_call() {
        let pending = PendingCalls::new();
        let call = pending.register();
        let id = call.id;
        let started = Instant::now();
        assert_eq!(
            pending.wait(call, Duration::from_millis(30)),
            Err(RecvTimeoutError::Timeout)
        );
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert!(pending.is_empty());
        assert!(!pending.complete(id, Some("late".into())));
    }

    #[test]
    fn ids_are_unique() {
        let pending = PendingCalls::new();
        let a = pending.register();
        let b = pending.register();
        assert_ne!(a.id, b.id);
        assert_eq!(pending.len(), 2);
        assert!(!pending.complete(999, None));
    }

    #[test]
    fn empty_answer_is_not_a_timeout() {
        let pending = PendingCalls::new();
        let call = pending.register();
        assert!(pending.complete(call.id, None));
        assert_eq!(pending.wait(call, Duration::from_secs(1)), Ok(None));
    }

    #[test]
    fn in_flight_allows_one_call_at_a_time() {
        let in_flight = InFlight::new();
        let guard = in_flight.try_begin().unwrap();
        assert!(in_flight.is_busy());
        assert!(in_flight.try_begin().is_none());
        assert!(in_flight.clone().try_begin().is_none());

        drop(guard);
        assert!(!in_flight.is_busy());
        assert!(in_flight.try_begin().is_some());
    }

    #[test]
    fn in_flight_guard_can_move_to_another_thread() {
        let in_flight = InFlight::new();
        let guard = in_flight.try_begin().unwrap();
        thread::spawn(move || drop(guard)).join().unwrap();
        assert!(!in_flight.is_busy());
    }
}
