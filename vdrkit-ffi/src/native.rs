//! The boundary between the bridge and a concrete native engine.
use crate::encode::{encode_i32, encode_i64, encode_str, ByteBuffer, JsonInput};
use crate::error::{Error, ErrorCode, Result};
use crate::handle::{CallbackId, PoolHandle, RequestHandle};
use std::ffi::{c_char, CStr, CString};
use std::ptr;

/// Trampoline for asynchronous calls without a result value.
pub type EmptyCallback = extern "C" fn(cb_id: CallbackId, err: i64);
/// Trampoline for asynchronous calls producing a library-allocated string.
pub type StringCallback = extern "C" fn(cb_id: CallbackId, err: i64, result: *const c_char);

/// One argument of a request builder call.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeArg {
    Str(Option<CString>),
    I32(i32),
    I64(i64),
}

impl NativeArg {
    /// The pointer to pass for a string argument, null when absent.
    pub fn as_ptr(&self) -> *const c_char {
        match self {
            Self::Str(Some(s)) => s.as_ptr(),
            _ => ptr::null(),
        }
    }
}

/// A request builder invocation: the native symbol plus its encoded arguments in order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderCall {
    pub symbol: &'static str,
    pub args: Vec<NativeArg>,
}

impl BuilderCall {
    pub fn new(symbol: &'static str) -> Self {
        Self { symbol, args: Vec::new() }
    }
    pub fn str(mut self, value: Option<&str>) -> Result<Self> {
        self.args.push(NativeArg::Str(encode_str(value)?));
        Ok(self)
    }
    pub fn json(mut self, value: Option<&JsonInput>) -> Result<Self> {
        self.args.push(NativeArg::Str(value.map(JsonInput::to_cstring).transpose()?));
        Ok(self)
    }
    pub fn i32(mut self, value: Option<i32>) -> Self {
        self.args.push(NativeArg::I32(encode_i32(value)));
        self
    }
    pub fn i64(mut self, value: Option<i64>) -> Self {
        self.args.push(NativeArg::I64(encode_i64(value)));
        self
    }
    /// The decoded string argument at `index`, if present.
    pub fn str_arg(&self, index: usize) -> Option<&str> {
        match self.args.get(index) {
            Some(NativeArg::Str(Some(s))) => s.to_str().ok(),
            _ => None,
        }
    }
}

/// A native ledger client engine.
///
/// Methods mirror the engine's C entry points: synchronous calls report an [`ErrorCode`]
/// and write out-parameters, asynchronous calls accept a trampoline and a correlation
/// token and report only whether the operation was accepted. Strings written to
/// out-parameters or passed to trampolines are owned by the engine and must be released
/// through [`NativeLibrary::string_free`].
pub trait NativeLibrary: Send + Sync + 'static {
    fn version(&self) -> *mut c_char;
    fn set_default_logger(&self) -> ErrorCode;
    fn set_config(&self, config: &CStr) -> ErrorCode;
    fn set_protocol_version(&self, version: i64) -> ErrorCode;
    fn set_socks_proxy(&self, socks_proxy: &CStr) -> ErrorCode;
    fn get_current_error(&self, error_json: &mut *const c_char) -> ErrorCode;
    /// A failure raised on this side of the boundary, e.g. a missing symbol.
    fn take_local_error(&self) -> Option<Error> {
        None
    }
    /// # Safety
    ///
    /// `s` must have been allocated by this engine and not yet released.
    unsafe fn string_free(&self, s: *mut c_char);

    fn build_request(&self, call: &BuilderCall, handle: &mut RequestHandle) -> ErrorCode;
    fn request_free(&self, handle: RequestHandle) -> ErrorCode;
    fn request_get_body(&self, handle: RequestHandle, body: &mut *const c_char) -> ErrorCode;
    fn request_get_signature_input(
        &self,
        handle: RequestHandle,
        input: &mut *const c_char,
    ) -> ErrorCode;
    fn request_set_endorser(&self, handle: RequestHandle, endorser: &CStr) -> ErrorCode;
    fn request_set_signature(&self, handle: RequestHandle, signature: ByteBuffer<'_>)
        -> ErrorCode;
    fn request_set_multi_signature(
        &self,
        handle: RequestHandle,
        identifier: &CStr,
        signature: ByteBuffer<'_>,
    ) -> ErrorCode;
    fn request_set_txn_author_agreement_acceptance(
        &self,
        handle: RequestHandle,
        acceptance: &CStr,
    ) -> ErrorCode;
    fn prepare_txn_author_agreement_acceptance(
        &self,
        text: Option<&CStr>,
        version: Option<&CStr>,
        taa_digest: Option<&CStr>,
        acc_mech_type: &CStr,
        time: u64,
        output: &mut *const c_char,
    ) -> ErrorCode;

    fn pool_create(&self, params: &CStr, handle: &mut PoolHandle) -> ErrorCode;
    fn pool_close(&self, handle: PoolHandle) -> ErrorCode;
    fn pool_refresh(&self, handle: PoolHandle, cb: EmptyCallback, cb_id: CallbackId)
        -> ErrorCode;
    fn pool_get_status(
        &self,
        handle: PoolHandle,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode;
    fn pool_get_transactions(
        &self,
        handle: PoolHandle,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode;
    fn pool_get_verifiers(
        &self,
        handle: PoolHandle,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode;
    fn pool_submit_request(
        &self,
        handle: PoolHandle,
        request: RequestHandle,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode;
    fn pool_submit_action(
        &self,
        handle: PoolHandle,
        request: RequestHandle,
        nodes: Option<&CStr>,
        timeout: i32,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode;
    fn resolve(
        &self,
        handle: PoolHandle,
        did: &CStr,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode;
    fn dereference(
        &self,
        handle: PoolHandle,
        did_url: &CStr,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode;
}
