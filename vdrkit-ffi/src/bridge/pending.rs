//! Registry of in-flight asynchronous calls and the trampolines that complete them.
use super::Bridge;
use crate::error::{Error, ErrorCode, Result};
use crate::handle::CallbackId;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::ffi::c_char;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::oneshot::Sender;
use tracing::debug;

static PENDING: Lazy<DashMap<CallbackId, PendingCall>> = Lazy::new(DashMap::new);
static NEXT_CALLBACK_ID: AtomicI64 = AtomicI64::new(1);
/// Frees results delivered to callbacks without a registration.
static ORPHAN_OWNER: Lazy<Mutex<Option<Bridge>>> = Lazy::new(Mutex::default);

pub(crate) enum Completion {
    Empty(Sender<Result<()>>),
    String(Sender<Result<String>>),
}

pub(crate) struct PendingCall {
    bridge: Bridge,
    completion: Completion,
}

pub(crate) fn register(bridge: Bridge, completion: Completion) -> CallbackId {
    let cb_id = NEXT_CALLBACK_ID.fetch_add(1, Ordering::Relaxed);
    *ORPHAN_OWNER.lock().unwrap_or_else(PoisonError::into_inner) = Some(bridge.clone());
    PENDING.insert(cb_id, PendingCall { bridge, completion });
    cb_id
}

/// Drops a registration whose native call was rejected synchronously.
pub(crate) fn discard(cb_id: CallbackId) {
    PENDING.remove(&cb_id);
}

/// The number of asynchronous calls awaiting their native callback.
pub fn pending_calls() -> usize {
    PENDING.len()
}

fn take(cb_id: CallbackId) -> Option<PendingCall> {
    match PENDING.remove(&cb_id) {
        Some((_, pending)) => Some(pending),
        None => {
            debug!(cb_id, "callback already fulfilled");
            None
        }
    }
}

fn release_orphan(owner: Option<Bridge>, cb_id: CallbackId, result: *const c_char) {
    if result.is_null() {
        return;
    }
    match owner {
        // SAFETY: the engine hands over ownership of `result` with the callback.
        Some(bridge) => drop(unsafe { bridge.adopt_string(result) }),
        None => debug!(cb_id, "no library to release an orphaned result"),
    }
}

fn deliver<T>(cb_id: CallbackId, sender: Sender<Result<T>>, outcome: Result<T>) {
    // The receiver wakes its task on the task's own executor.
    if sender.send(outcome).is_err() {
        debug!(cb_id, "callback previously cancelled");
    }
}

pub(crate) extern "C" fn empty_callback(cb_id: CallbackId, err: i64) {
    let Some(pending) = take(cb_id) else {
        return;
    };
    let outcome = pending.bridge.check(ErrorCode::from(err));
    match pending.completion {
        Completion::Empty(sender) => deliver(cb_id, sender, outcome),
        Completion::String(sender) => deliver(cb_id, sender, outcome.map(|()| String::new())),
    }
}

pub(crate) extern "C" fn string_callback(cb_id: CallbackId, err: i64, result: *const c_char) {
    let Some(pending) = take(cb_id) else {
        let owner = ORPHAN_OWNER.lock().unwrap_or_else(PoisonError::into_inner).clone();
        release_orphan(owner, cb_id, result);
        return;
    };
    // SAFETY: the engine hands over ownership of `result` with the callback.
    let value = unsafe { pending.bridge.adopt_string(result) };
    let outcome = pending.bridge.check(ErrorCode::from(err)).and_then(|()| {
        value?.ok_or_else(|| Error::Unexpected(String::from("missing result string")))
    });
    match pending.completion {
        Completion::String(sender) => deliver(cb_id, sender, outcome),
        Completion::Empty(sender) => deliver(cb_id, sender, outcome.map(|_| ())),
    }
}
