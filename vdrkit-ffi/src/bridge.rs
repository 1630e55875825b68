//! Uniform synchronous and asynchronous access to a [`NativeLibrary`].
mod pending;

pub use self::pending::pending_calls;
use self::pending::Completion;
use crate::encode::encode_json;
use crate::error::{Error, ErrorCode, Result};
use crate::handle::CallbackId;
use crate::native::{EmptyCallback, NativeLibrary, StringCallback};
use crate::string::LibString;
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::ffi::{c_char, CString};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::ptr;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot::{self, Receiver};
use tracing::{trace, warn};

/// Context object for calls into a native engine.
///
/// Cloning is cheap; all clones share the same engine.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<Inner>,
}

struct Inner {
    lib: Arc<dyn NativeLibrary>,
    logger: OnceCell<()>,
}

impl Bridge {
    pub fn new<L>(lib: Arc<L>) -> Self
    where
        L: NativeLibrary,
    {
        Self { inner: Arc::new(Inner { lib, logger: OnceCell::new() }) }
    }
    pub fn library(&self) -> &dyn NativeLibrary {
        self.inner.lib.as_ref()
    }
    /// Installs the engine's default logger. Repeated calls are no-ops.
    pub fn initialize(&self) -> Result<()> {
        self.inner.logger.get_or_try_init(|| self.check(self.library().set_default_logger()))?;
        Ok(())
    }
    /// The version string reported by the engine.
    pub fn version(&self) -> Result<String> {
        // SAFETY: the engine transfers ownership of the returned string.
        unsafe { self.adopt_string(self.library().version()) }?.ok_or_else(Error::unknown)
    }
    pub fn set_config<T>(&self, config: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.check(self.library().set_config(&encode_json(config)?))
    }
    pub fn set_protocol_version(&self, version: i64) -> Result<()> {
        self.check(self.library().set_protocol_version(version))
    }
    pub fn set_socks_proxy(&self, socks_proxy: &str) -> Result<()> {
        self.check(self.library().set_socks_proxy(&CString::new(socks_proxy)?))
    }
    /// Retrieves the most recent failure recorded for the calling thread.
    pub fn current_error(&self) -> Option<Error> {
        if let Some(error) = self.library().take_local_error() {
            return Some(error);
        }
        let mut json = ptr::null();
        if !self.library().get_current_error(&mut json).is_success() {
            return None;
        }
        // SAFETY: the engine transfers ownership of the error record.
        let record = unsafe { LibString::from_raw(self.inner.lib.clone(), json) }?;
        let parsed = record.to_str().ok().and_then(Error::from_native_json);
        if parsed.is_none() {
            warn!(record = ?record, "unusable native error record");
        }
        parsed
    }
    /// Turns a native status into an outcome, fetching the structured error on failure.
    pub fn check(&self, status: ErrorCode) -> Result<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(self.current_error().unwrap_or_else(Error::unknown))
        }
    }
    /// Takes ownership of a library-allocated string, copying it out and releasing it.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a string allocated by this bridge's engine that nobody else frees.
    pub unsafe fn adopt_string(&self, ptr: *const c_char) -> Result<Option<String>> {
        LibString::from_raw(self.inner.lib.clone(), ptr).map(LibString::into_string).transpose()
    }
    /// Runs a synchronous call that writes a string out-parameter.
    pub fn call_string<F>(&self, call: F) -> Result<String>
    where
        F: FnOnce(&dyn NativeLibrary, &mut *const c_char) -> ErrorCode,
    {
        let mut out = ptr::null();
        let status = call(self.library(), &mut out);
        // SAFETY: anything written to `out` is owned by us from here on.
        let value = unsafe { self.adopt_string(out) };
        self.check(status)?;
        value?.ok_or_else(Error::unknown)
    }
    /// Issues an asynchronous call without a result value.
    ///
    /// The call is issued immediately; the returned future only observes its completion.
    pub fn call_async<F>(&self, issue: F) -> CallFuture<()>
    where
        F: FnOnce(&dyn NativeLibrary, EmptyCallback, CallbackId) -> ErrorCode,
    {
        let (tx, rx) = oneshot::channel();
        let cb_id = pending::register(self.clone(), Completion::Empty(tx));
        self.issue(cb_id, rx, |lib| issue(lib, pending::empty_callback, cb_id))
    }
    /// Issues an asynchronous call producing a string.
    ///
    /// The call is issued immediately; the returned future only observes its completion.
    pub fn call_async_string<F>(&self, issue: F) -> CallFuture<String>
    where
        F: FnOnce(&dyn NativeLibrary, StringCallback, CallbackId) -> ErrorCode,
    {
        let (tx, rx) = oneshot::channel();
        let cb_id = pending::register(self.clone(), Completion::String(tx));
        self.issue(cb_id, rx, |lib| issue(lib, pending::string_callback, cb_id))
    }
    fn issue<T, F>(&self, cb_id: CallbackId, rx: Receiver<Result<T>>, call: F) -> CallFuture<T>
    where
        F: FnOnce(&dyn NativeLibrary) -> ErrorCode,
    {
        trace!(cb_id, "issuing native call");
        let status = call(self.library());
        if status.is_success() {
            CallFuture { state: State::Pending(rx) }
        } else {
            pending::discard(cb_id);
            let error = self.current_error().unwrap_or_else(Error::unknown);
            CallFuture { state: State::Failed(Some(error)) }
        }
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge").field("initialized", &self.inner.logger.get().is_some()).finish()
    }
}

/// The outcome of an asynchronous native call.
///
/// Dropping it cancels interest in the result; the native callback still runs and
/// releases its resources when it eventually fires.
#[must_use = "futures do nothing unless polled"]
pub struct CallFuture<T> {
    state: State<T>,
}

enum State<T> {
    Failed(Option<Error>),
    Pending(Receiver<Result<T>>),
}

impl<T> CallFuture<T> {
    /// Whether the native call was rejected before it was accepted.
    pub fn is_failed(&self) -> bool {
        matches!(self.state, State::Failed(_))
    }
}

impl<T> Future for CallFuture<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            State::Failed(error) => Poll::Ready(Err(error.take().unwrap_or(Error::Canceled))),
            State::Pending(rx) => {
                Pin::new(rx).poll(cx).map(|received| received.unwrap_or(Err(Error::Canceled)))
            }
        }
    }
}

impl<T> fmt::Debug for CallFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Failed(_) => "failed",
            State::Pending(_) => "pending",
        };
        f.debug_struct("CallFuture").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::PoolHandle;
    use crate::mock::{MockEngine, MockOp};
    use serde_json::json;
    use std::time::Duration;

    fn open_pool(bridge: &Bridge) -> PoolHandle {
        let mut handle = PoolHandle::EMPTY;
        let params = CString::new(r#"{"transactions":"{}"}"#).expect("params");
        assert!(bridge.library().pool_create(&params, &mut handle).is_success());
        handle
    }

    #[test]
    fn initialize_once() -> Result<()> {
        let engine = Arc::new(MockEngine::new());
        let bridge = Bridge::new(engine.clone());
        bridge.initialize()?;
        bridge.initialize()?;
        bridge.clone().initialize()?;
        assert_eq!(engine.calls("indy_vdr_set_default_logger"), 1);
        Ok(())
    }

    #[test]
    fn version_is_copied_and_freed() -> Result<()> {
        let engine = Arc::new(MockEngine::new());
        let bridge = Bridge::new(engine.clone());
        assert_eq!(bridge.version()?, MockEngine::VERSION);
        assert_eq!(engine.live_strings(), 0);
        Ok(())
    }

    #[test]
    fn sync_failure_uses_current_error() {
        let engine = Arc::new(MockEngine::new());
        let bridge = Bridge::new(engine.clone());
        engine.fail_next(ErrorCode::Input, "Invalid protocol version");
        let err = bridge.set_protocol_version(7).expect_err("should fail");
        assert_eq!(err.code(), ErrorCode::Input);
        assert_eq!(err.to_string(), "input error: Invalid protocol version");
        assert_eq!(engine.live_strings(), 0);
    }

    #[test]
    fn error_record_is_consumed() {
        let engine = Arc::new(MockEngine::new());
        let bridge = Bridge::new(engine.clone());
        assert!(bridge.set_protocol_version(9).is_err());
        assert!(bridge.current_error().is_none());
        assert_eq!(engine.live_strings(), 0);
        bridge.set_protocol_version(2).expect("valid version");
        assert!(bridge.current_error().is_none());
    }

    #[test]
    fn sync_failure_without_error_record() {
        let engine = Arc::new(MockEngine::new());
        let bridge = Bridge::new(engine.clone());
        engine.fail_next_silently(ErrorCode::Unexpected);
        let err = bridge.set_socks_proxy("127.0.0.1:9050").expect_err("should fail");
        assert_eq!(err.code(), ErrorCode::Wrapper);
        assert_eq!(err.to_string(), "Unknown error");
    }

    #[tokio::test]
    async fn async_call_resolves_from_foreign_thread() -> Result<()> {
        let engine = Arc::new(MockEngine::new());
        let bridge = Bridge::new(engine.clone());
        let pool = open_pool(&bridge);
        let status =
            bridge.call_async_string(|lib, cb, id| lib.pool_get_status(pool, cb, id)).await?;
        let status: serde_json::Value = serde_json::from_str(&status)?;
        assert!(status.get("mt_size").is_some());
        assert_eq!(engine.live_strings(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn async_call_rejected_synchronously() {
        let engine = Arc::new(MockEngine::new());
        let bridge = Bridge::new(engine.clone());
        let before = engine.callbacks_fired();
        let fut = bridge.call_async(|lib, cb, id| lib.pool_refresh(PoolHandle(404), cb, id));
        assert!(fut.is_failed());
        let err = fut.await.expect_err("should fail");
        assert_eq!(err.code(), ErrorCode::Input);
        assert_eq!(engine.callbacks_fired(), before);
    }

    #[tokio::test]
    async fn async_failure_carries_native_error() -> Result<()> {
        let engine = Arc::new(MockEngine::new());
        engine.respond(|op| match op {
            MockOp::Submit { .. } => Err((ErrorCode::PoolTimeout, String::from("timed out"))),
            _ => Ok(json!({})),
        });
        let bridge = Bridge::new(engine.clone());
        let pool = open_pool(&bridge);
        let mut request = crate::handle::RequestHandle::EMPTY;
        let call = crate::native::BuilderCall::new("indy_vdr_build_custom_request")
            .str(Some(r#"{"operation":{"type":"105"}}"#))?;
        bridge.check(engine.build_request(&call, &mut request))?;
        let err = bridge
            .call_async_string(|lib, cb, id| lib.pool_submit_request(pool, request, cb, id))
            .await
            .expect_err("should fail");
        assert_eq!(err.code(), ErrorCode::PoolTimeout);
        assert_eq!(engine.live_strings(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_call_is_not_resolved_again() -> Result<()> {
        let engine = Arc::new(MockEngine::new());
        let bridge = Bridge::new(engine.clone());
        let pool = open_pool(&bridge);
        engine.hold_callbacks();
        let fut = bridge.call_async_string(|lib, cb, id| lib.pool_get_verifiers(pool, cb, id));
        assert!(tokio::time::timeout(Duration::from_millis(20), fut).await.is_err());
        engine.release_callbacks();
        for _ in 0..100 {
            if engine.live_strings() == 0 && engine.callbacks_fired() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(engine.callbacks_fired(), 1);
        assert_eq!(engine.live_strings(), 0);
        // the bridge stays usable afterwards
        let verifiers =
            bridge.call_async_string(|lib, cb, id| lib.pool_get_verifiers(pool, cb, id)).await?;
        assert!(verifiers.starts_with('{'));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_calls_complete_independently() -> Result<()> {
        let engine = Arc::new(MockEngine::new());
        let bridge = Bridge::new(engine.clone());
        let pool = open_pool(&bridge);
        let results = futures::future::join_all((0..16).map(|_| {
            bridge.call_async_string(|lib, cb, id| lib.pool_get_transactions(pool, cb, id))
        }))
        .await;
        assert_eq!(results.len(), 16);
        for result in results {
            assert_eq!(result?, "{}");
        }
        assert_eq!(engine.live_strings(), 0);
        Ok(())
    }

    #[test]
    fn string_call_frees_output() -> Result<()> {
        let engine = Arc::new(MockEngine::new());
        let bridge = Bridge::new(engine.clone());
        let mut request = crate::handle::RequestHandle::EMPTY;
        let call = crate::native::BuilderCall::new("indy_vdr_build_custom_request")
            .str(Some(r#"{"operation":{"type":"1"}}"#))?;
        bridge.check(engine.build_request(&call, &mut request))?;
        let body = bridge.call_string(|lib, out| lib.request_get_body(request, out))?;
        assert!(body.contains("\"operation\""));
        assert_eq!(engine.live_strings(), 0);
        Ok(())
    }
}
