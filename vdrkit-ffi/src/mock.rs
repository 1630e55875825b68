//! An in-memory [`NativeLibrary`] for tests.
//!
//! Asynchronous completions are delivered from freshly spawned OS threads, as a real
//! engine would from its worker pool.
use crate::encode::ByteBuffer;
use crate::error::ErrorCode;
use crate::handle::{CallbackId, PoolHandle, RequestHandle};
use crate::native::{BuilderCall, EmptyCallback, NativeArg, NativeLibrary, StringCallback};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::ffi::{c_char, CStr, CString};
use std::ptr;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// The failure half of a scripted reply.
pub type MockFailure = (ErrorCode, String);
type Responder = dyn Fn(&MockOp) -> Result<Value, MockFailure> + Send + Sync;
type Job = Box<dyn FnOnce() + Send>;

/// An asynchronous operation received by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOp {
    Submit { pool: PoolHandle, request: Value },
    Action { pool: PoolHandle, request: Value, nodes: Option<Vec<String>>, timeout: i32 },
    Resolve { pool: PoolHandle, did: String },
    Dereference { pool: PoolHandle, did_url: String },
}

#[derive(Debug)]
struct MockPool {
    transactions: Vec<String>,
    nodes: Vec<String>,
    refreshes: usize,
}

#[derive(Default)]
struct State {
    requests: HashMap<i64, Value>,
    pools: HashMap<i64, MockPool>,
    last_error: Option<MockFailure>,
    fail_next: Option<(ErrorCode, Option<String>)>,
    calls: HashMap<&'static str, usize>,
    held: Option<Vec<Job>>,
}

struct Shared {
    state: Mutex<State>,
    responder: RwLock<Arc<Responder>>,
    next_handle: AtomicI64,
    next_req_id: AtomicI64,
    live_strings: AtomicUsize,
    fired: AtomicUsize,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
    fn alloc_string(&self, s: String) -> *const c_char {
        self.live_strings.fetch_add(1, Ordering::SeqCst);
        CString::new(s).unwrap_or_default().into_raw()
    }
    fn fail(&self, code: ErrorCode, message: impl Into<String>) -> ErrorCode {
        self.state().last_error = Some((code, message.into()));
        code
    }
}

fn default_responder() -> Arc<Responder> {
    Arc::new(MockEngine::default_reply)
}

/// In-memory engine. See the module documentation.
#[derive(Clone)]
pub struct MockEngine {
    shared: Arc<Shared>,
}

macro_rules! enter {
    ($self:ident, $symbol:literal) => {
        if let Err(code) = $self.begin($symbol) {
            return code;
        }
    };
}

impl MockEngine {
    pub const VERSION: &'static str = "0.4.3-mock";

    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                responder: RwLock::new(default_responder()),
                next_handle: AtomicI64::new(1),
                next_req_id: AtomicI64::new(1_700_000_000_000),
                live_strings: AtomicUsize::new(0),
                fired: AtomicUsize::new(0),
            }),
        }
    }
    /// Replaces the handler producing replies for asynchronous operations.
    pub fn respond<F>(&self, responder: F)
    where
        F: Fn(&MockOp) -> Result<Value, MockFailure> + Send + Sync + 'static,
    {
        let responder: Arc<Responder> = Arc::new(responder);
        *self.shared.responder.write().unwrap_or_else(PoisonError::into_inner) = responder;
    }
    /// The reply produced when no responder is installed.
    pub fn default_reply(op: &MockOp) -> Result<Value, MockFailure> {
        match op {
            MockOp::Submit { request, .. } => Ok(json!({
                "op": "REPLY",
                "result": {
                    "type": request["operation"]["type"],
                    "identifier": request["identifier"],
                    "reqId": request["reqId"],
                    "data": null,
                    "seqNo": null,
                    "txnTime": null,
                }
            })),
            MockOp::Action { request, nodes, .. } => {
                let nodes = nodes.clone().unwrap_or_else(|| vec![String::from("Node1")]);
                let reply = json!({"op": "REPLY", "result": {"reqId": request["reqId"]}});
                Ok(nodes.into_iter().map(|node| (node, Value::String(reply.to_string()))).collect())
            }
            MockOp::Resolve { did, .. } => Err((ErrorCode::Input, format!("Unknown DID: {did}"))),
            MockOp::Dereference { did_url, .. } => {
                Err((ErrorCode::Input, format!("Unknown DID URL: {did_url}")))
            }
        }
    }
    /// Makes the next call fail with `code`, recording `message` as the current error.
    pub fn fail_next(&self, code: ErrorCode, message: impl Into<String>) {
        self.shared.state().fail_next = Some((code, Some(message.into())));
    }
    /// Makes the next call fail with `code` without recording a retrievable error.
    pub fn fail_next_silently(&self, code: ErrorCode) {
        self.shared.state().fail_next = Some((code, None));
    }
    /// Queues callbacks instead of delivering them until [`MockEngine::release_callbacks`].
    pub fn hold_callbacks(&self) {
        self.shared.state().held.get_or_insert_with(Vec::new);
    }
    pub fn release_callbacks(&self) {
        let jobs = self.shared.state().held.take().unwrap_or_default();
        for job in jobs {
            std::thread::spawn(job);
        }
    }
    /// How many times the entry point `symbol` was called.
    pub fn calls(&self, symbol: &str) -> usize {
        self.shared.state().calls.get(symbol).copied().unwrap_or_default()
    }
    pub fn live_strings(&self) -> usize {
        self.shared.live_strings.load(Ordering::SeqCst)
    }
    pub fn live_requests(&self) -> usize {
        self.shared.state().requests.len()
    }
    pub fn live_pools(&self) -> usize {
        self.shared.state().pools.len()
    }
    pub fn callbacks_fired(&self) -> usize {
        self.shared.fired.load(Ordering::SeqCst)
    }
    /// The current body of a live request.
    pub fn request_body(&self, handle: RequestHandle) -> Option<Value> {
        self.shared.state().requests.get(&handle.0).cloned()
    }
    pub fn pool_refreshes(&self, handle: PoolHandle) -> Option<usize> {
        self.shared.state().pools.get(&handle.0).map(|pool| pool.refreshes)
    }

    fn begin(&self, symbol: &'static str) -> Result<(), ErrorCode> {
        let mut state = self.shared.state();
        *state.calls.entry(symbol).or_default() += 1;
        match state.fail_next.take() {
            Some((code, message)) => {
                state.last_error = message.map(|message| (code, message));
                Err(code)
            }
            None => Ok(()),
        }
    }
    fn next_handle(&self) -> i64 {
        self.shared.next_handle.fetch_add(1, Ordering::SeqCst)
    }
    fn dispatch(&self, job: Job) {
        let mut state = self.shared.state();
        if let Some(queue) = state.held.as_mut() {
            queue.push(job);
            return;
        }
        drop(state);
        std::thread::spawn(job);
    }
    fn fire_empty(&self, cb: EmptyCallback, cb_id: CallbackId) {
        let shared = self.shared.clone();
        self.dispatch(Box::new(move || {
            cb(cb_id, ErrorCode::Success.into());
            shared.fired.fetch_add(1, Ordering::SeqCst);
        }));
    }
    fn fire_string<F>(&self, cb: StringCallback, cb_id: CallbackId, produce: F)
    where
        F: FnOnce() -> Result<Value, MockFailure> + Send + 'static,
    {
        let shared = self.shared.clone();
        self.dispatch(Box::new(move || {
            let (code, ptr) = match produce() {
                Ok(Value::String(s)) => (ErrorCode::Success, shared.alloc_string(s)),
                Ok(value) => (ErrorCode::Success, shared.alloc_string(value.to_string())),
                Err((code, message)) => (shared.fail(code, message), ptr::null()),
            };
            cb(cb_id, code.into(), ptr);
            shared.fired.fetch_add(1, Ordering::SeqCst);
        }));
    }
    fn reply(&self, cb: StringCallback, cb_id: CallbackId, op: MockOp) {
        let responder =
            self.shared.responder.read().unwrap_or_else(PoisonError::into_inner).clone();
        self.fire_string(cb, cb_id, move || responder(&op));
    }
    fn with_pool<T>(&self, handle: PoolHandle, f: impl FnOnce(&mut MockPool) -> T) -> Option<T> {
        self.shared.state().pools.get_mut(&handle.0).map(f)
    }
    fn with_request<T>(&self, handle: RequestHandle, f: impl FnOnce(&mut Value) -> T) -> Option<T> {
        self.shared.state().requests.get_mut(&handle.0).map(f)
    }
    fn invalid_pool(&self) -> ErrorCode {
        self.shared.fail(ErrorCode::Input, "Invalid pool handle")
    }
    fn invalid_request(&self) -> ErrorCode {
        self.shared.fail(ErrorCode::Input, "Invalid request handle")
    }
    fn write_string(&self, out: &mut *const c_char, s: String) -> ErrorCode {
        *out = self.shared.alloc_string(s);
        ErrorCode::Success
    }
    fn operation(&self, call: &BuilderCall) -> Result<Value, MockFailure> {
        let (txn_type, fields): (&str, &[&str]) = match call.symbol {
            "indy_vdr_build_nym_request" => {
                ("1", &["dest", "verkey", "alias", "role", "diddocContent", "version"])
            }
            "indy_vdr_build_attrib_request" => ("100", &["dest", "hash", "raw", "enc"]),
            "indy_vdr_build_get_attrib_request" => {
                ("104", &["dest", "raw", "hash", "enc", "seqNo", "timestamp"])
            }
            "indy_vdr_build_get_nym_request" => ("105", &["dest", "seqNo", "timestamp"]),
            "indy_vdr_build_schema_request" => ("101", &["data"]),
            "indy_vdr_build_get_schema_request" => ("107", &["schemaId"]),
            "indy_vdr_build_cred_def_request" => ("102", &["data"]),
            "indy_vdr_build_get_cred_def_request" => ("108", &["credDefId"]),
            "indy_vdr_build_revoc_reg_def_request" => ("113", &["data"]),
            "indy_vdr_build_get_revoc_reg_def_request" => ("115", &["id"]),
            "indy_vdr_build_revoc_reg_entry_request" => {
                ("114", &["revocRegDefId", "revocDefType", "value"])
            }
            "indy_vdr_build_get_revoc_reg_request" => ("116", &["revocRegDefId", "timestamp"]),
            "indy_vdr_build_get_revoc_reg_delta_request" => {
                ("117", &["revocRegDefId", "from", "to"])
            }
            "indy_vdr_build_get_txn_request" => ("3", &["ledgerId", "data"]),
            "indy_vdr_build_get_validator_info_request" => ("119", &[]),
            "indy_vdr_build_txn_author_agreement_request" => {
                ("4", &["text", "version", "ratification_ts", "retirement_ts"])
            }
            "indy_vdr_build_get_txn_author_agreement_request" => ("6", &["data"]),
            "indy_vdr_build_disable_all_txn_author_agreements_request" => ("8", &[]),
            "indy_vdr_build_acceptance_mechanisms_request" => {
                ("5", &["aml", "version", "amlContext"])
            }
            "indy_vdr_build_get_acceptance_mechanisms_request" => ("7", &["timestamp", "version"]),
            "indy_vdr_build_rich_schema_request" => (
                rich_schema_txn_type(call.str_arg(5))?,
                &["id", "content", "rsName", "rsVersion", "rsType", "ver"],
            ),
            "indy_vdr_build_get_rich_schema_object_by_id_request" => ("300", &["id"]),
            "indy_vdr_build_get_rich_schema_object_by_metadata_request" => {
                ("301", &["rsType", "rsName", "rsVersion"])
            }
            symbol => return Err((ErrorCode::Wrapper, format!("Unknown builder: {symbol}"))),
        };
        if call.args.len() != fields.len() + 1 {
            return Err((ErrorCode::Input, format!("Wrong argument count for {}", call.symbol)));
        }
        let mut operation = Map::new();
        operation.insert(String::from("type"), Value::from(txn_type));
        for (field, arg) in fields.iter().zip(&call.args[1..]) {
            let value = match arg {
                NativeArg::Str(Some(s)) => {
                    let s = s.to_string_lossy();
                    match serde_json::from_str::<Value>(&s) {
                        Ok(value @ (Value::Object(_) | Value::Array(_))) => value,
                        _ => Value::from(s.into_owned()),
                    }
                }
                NativeArg::I32(v) if *v != -1 => Value::from(*v),
                NativeArg::I64(v) if *v != -1 => Value::from(*v),
                _ => continue,
            };
            operation.insert((*field).to_string(), value);
        }
        Ok(Value::Object(operation))
    }
    fn build_body(&self, call: &BuilderCall) -> Result<Value, MockFailure> {
        let req_id = self.shared.next_req_id.fetch_add(1, Ordering::SeqCst);
        if call.symbol == "indy_vdr_build_custom_request" {
            let body = call
                .str_arg(0)
                .and_then(|s| serde_json::from_str::<Value>(s).ok())
                .filter(|v| v.get("operation").is_some_and(Value::is_object))
                .ok_or_else(|| (ErrorCode::Input, String::from("Invalid request JSON")))?;
            return Ok(body);
        }
        let operation = self.operation(call)?;
        Ok(json!({
            "identifier": call.str_arg(0).unwrap_or("LibindyDid111111111111"),
            "operation": operation,
            "protocolVersion": 2,
            "reqId": req_id,
        }))
    }
}

fn rich_schema_txn_type(rs_type: Option<&str>) -> Result<&'static str, MockFailure> {
    match rs_type {
        Some("ctx") => Ok("200"),
        Some("sch") => Ok("201"),
        Some("enc") => Ok("202"),
        Some("map") => Ok("203"),
        Some("cdf") => Ok("204"),
        Some("pdf") => Ok("205"),
        other => Err((ErrorCode::Input, format!("Invalid rich schema type: {other:?}"))),
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeLibrary for MockEngine {
    fn version(&self) -> *mut c_char {
        self.shared.alloc_string(String::from(Self::VERSION)).cast_mut()
    }
    fn set_default_logger(&self) -> ErrorCode {
        enter!(self, "indy_vdr_set_default_logger");
        ErrorCode::Success
    }
    fn set_config(&self, config: &CStr) -> ErrorCode {
        enter!(self, "indy_vdr_set_config");
        match serde_json::from_slice::<Value>(config.to_bytes()) {
            Ok(Value::Object(_)) => ErrorCode::Success,
            _ => self.shared.fail(ErrorCode::Input, "Invalid pool config"),
        }
    }
    fn set_protocol_version(&self, version: i64) -> ErrorCode {
        enter!(self, "indy_vdr_set_protocol_version");
        match version {
            1 | 2 => ErrorCode::Success,
            _ => self.shared.fail(ErrorCode::Input, "Invalid protocol version"),
        }
    }
    fn set_socks_proxy(&self, _socks_proxy: &CStr) -> ErrorCode {
        enter!(self, "indy_vdr_set_socks_proxy");
        ErrorCode::Success
    }
    fn get_current_error(&self, error_json: &mut *const c_char) -> ErrorCode {
        let last = self.shared.state().last_error.take();
        *error_json = match last {
            Some((code, message)) => self.shared.alloc_string(
                json!({"code": i64::from(code), "message": message}).to_string(),
            ),
            None => ptr::null(),
        };
        ErrorCode::Success
    }
    unsafe fn string_free(&self, s: *mut c_char) {
        if !s.is_null() {
            drop(CString::from_raw(s));
            self.shared.live_strings.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn build_request(&self, call: &BuilderCall, handle: &mut RequestHandle) -> ErrorCode {
        if let Err(code) = self.begin(call.symbol) {
            return code;
        }
        match self.build_body(call) {
            Ok(body) => {
                let id = self.next_handle();
                self.shared.state().requests.insert(id, body);
                *handle = RequestHandle(id);
                ErrorCode::Success
            }
            Err((code, message)) => self.shared.fail(code, message),
        }
    }
    fn request_free(&self, handle: RequestHandle) -> ErrorCode {
        enter!(self, "indy_vdr_request_free");
        let removed = self.shared.state().requests.remove(&handle.0);
        match removed {
            Some(_) => ErrorCode::Success,
            None => self.invalid_request(),
        }
    }
    fn request_get_body(&self, handle: RequestHandle, body: &mut *const c_char) -> ErrorCode {
        enter!(self, "indy_vdr_request_get_body");
        match self.request_body(handle) {
            Some(value) => self.write_string(body, value.to_string()),
            None => self.invalid_request(),
        }
    }
    fn request_get_signature_input(
        &self,
        handle: RequestHandle,
        input: &mut *const c_char,
    ) -> ErrorCode {
        enter!(self, "indy_vdr_request_get_signature_input");
        match self.request_body(handle) {
            Some(mut value) => {
                if let Some(map) = value.as_object_mut() {
                    map.remove("signature");
                    map.remove("signatures");
                }
                self.write_string(input, value.to_string())
            }
            None => self.invalid_request(),
        }
    }
    fn request_set_endorser(&self, handle: RequestHandle, endorser: &CStr) -> ErrorCode {
        enter!(self, "indy_vdr_request_set_endorser");
        let endorser = endorser.to_string_lossy().into_owned();
        if endorser.is_empty() {
            return self.shared.fail(ErrorCode::Input, "Invalid endorser DID");
        }
        self.with_request(handle, |body| body["endorser"] = Value::from(endorser))
            .map_or_else(|| self.invalid_request(), |()| ErrorCode::Success)
    }
    fn request_set_signature(
        &self,
        handle: RequestHandle,
        signature: ByteBuffer<'_>,
    ) -> ErrorCode {
        enter!(self, "indy_vdr_request_set_signature");
        let encoded = bs58::encode(signature.as_slice()).into_string();
        self.with_request(handle, |body| body["signature"] = Value::from(encoded))
            .map_or_else(|| self.invalid_request(), |()| ErrorCode::Success)
    }
    fn request_set_multi_signature(
        &self,
        handle: RequestHandle,
        identifier: &CStr,
        signature: ByteBuffer<'_>,
    ) -> ErrorCode {
        enter!(self, "indy_vdr_request_set_multi_signature");
        let identifier = identifier.to_string_lossy().into_owned();
        let encoded = bs58::encode(signature.as_slice()).into_string();
        self.with_request(handle, |body| {
            if !body["signatures"].is_object() {
                body["signatures"] = json!({});
            }
            body["signatures"][identifier] = Value::from(encoded);
        })
        .map_or_else(|| self.invalid_request(), |()| ErrorCode::Success)
    }
    fn request_set_txn_author_agreement_acceptance(
        &self,
        handle: RequestHandle,
        acceptance: &CStr,
    ) -> ErrorCode {
        enter!(self, "indy_vdr_request_set_txn_author_agreement_acceptance");
        let Ok(acceptance) = serde_json::from_slice::<Value>(acceptance.to_bytes()) else {
            return self.shared.fail(ErrorCode::Input, "Invalid TAA acceptance");
        };
        self.with_request(handle, |body| body["taaAcceptance"] = acceptance)
            .map_or_else(|| self.invalid_request(), |()| ErrorCode::Success)
    }
    fn prepare_txn_author_agreement_acceptance(
        &self,
        text: Option<&CStr>,
        version: Option<&CStr>,
        taa_digest: Option<&CStr>,
        acc_mech_type: &CStr,
        time: u64,
        output: &mut *const c_char,
    ) -> ErrorCode {
        enter!(self, "indy_vdr_prepare_txn_author_agreement_acceptance");
        let calculated = match (text, version) {
            (Some(text), Some(version)) => {
                let mut hasher = Sha256::new();
                hasher.update(version.to_bytes());
                hasher.update(text.to_bytes());
                Some(hex::encode(hasher.finalize()))
            }
            _ => None,
        };
        let digest = match (taa_digest.map(|d| d.to_string_lossy().into_owned()), calculated) {
            (Some(digest), Some(calculated)) if digest != calculated => {
                return self.shared.fail(ErrorCode::Input, "Calculated digest does not match");
            }
            (Some(digest), _) | (None, Some(digest)) => digest,
            _ => {
                return self.shared.fail(
                    ErrorCode::Input,
                    "Invalid combination of params: either taa_digest or text and version required",
                )
            }
        };
        let acceptance = json!({
            "mechanism": acc_mech_type.to_string_lossy(),
            "taaDigest": digest,
            "time": time / 86400 * 86400,
        });
        self.write_string(output, acceptance.to_string())
    }

    fn pool_create(&self, params: &CStr, handle: &mut PoolHandle) -> ErrorCode {
        enter!(self, "indy_vdr_pool_create");
        let Ok(params) = serde_json::from_slice::<Value>(params.to_bytes()) else {
            return self.shared.fail(ErrorCode::Input, "Invalid pool create parameters");
        };
        let transactions = match (params["transactions"].as_str(), params["transactions_path"].as_str())
        {
            (Some(txns), None) => txns.to_string(),
            (None, Some(path)) => match std::fs::read_to_string(path) {
                Ok(txns) => txns,
                Err(e) => return self.shared.fail(ErrorCode::FileSystem, e.to_string()),
            },
            _ => {
                return self.shared.fail(
                    ErrorCode::Input,
                    "Invalid pool create parameters: must provide transactions or transactions_path",
                )
            }
        };
        let transactions = transactions
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(String::from)
            .collect::<Vec<_>>();
        if transactions.is_empty() {
            return self.shared.fail(ErrorCode::Config, "Empty genesis transactions");
        }
        let nodes = transactions
            .iter()
            .enumerate()
            .map(|(i, txn)| {
                serde_json::from_str::<Value>(txn)
                    .ok()
                    .and_then(|v| v["txn"]["data"]["data"]["alias"].as_str().map(String::from))
                    .unwrap_or_else(|| format!("Node{}", i + 1))
            })
            .collect();
        let id = self.next_handle();
        self.shared.state().pools.insert(id, MockPool { transactions, nodes, refreshes: 0 });
        *handle = PoolHandle(id);
        ErrorCode::Success
    }
    fn pool_close(&self, handle: PoolHandle) -> ErrorCode {
        enter!(self, "indy_vdr_pool_close");
        let removed = self.shared.state().pools.remove(&handle.0);
        match removed {
            Some(_) => ErrorCode::Success,
            None => self.invalid_pool(),
        }
    }
    fn pool_refresh(&self, handle: PoolHandle, cb: EmptyCallback, cb_id: CallbackId) -> ErrorCode {
        enter!(self, "indy_vdr_pool_refresh");
        match self.with_pool(handle, |pool| pool.refreshes += 1) {
            Some(()) => {
                self.fire_empty(cb, cb_id);
                ErrorCode::Success
            }
            None => self.invalid_pool(),
        }
    }
    fn pool_get_status(
        &self,
        handle: PoolHandle,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode {
        enter!(self, "indy_vdr_pool_get_status");
        let Some(status) = self.with_pool(handle, |pool| {
            json!({
                "mt_root": bs58::encode(pool.transactions.join("\n")).into_string(),
                "mt_size": pool.transactions.len(),
                "nodes": pool.nodes,
            })
        }) else {
            return self.invalid_pool();
        };
        self.fire_string(cb, cb_id, move || Ok(status));
        ErrorCode::Success
    }
    fn pool_get_transactions(
        &self,
        handle: PoolHandle,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode {
        enter!(self, "indy_vdr_pool_get_transactions");
        let Some(txns) = self.with_pool(handle, |pool| pool.transactions.join("\n")) else {
            return self.invalid_pool();
        };
        self.fire_string(cb, cb_id, move || Ok(Value::String(txns)));
        ErrorCode::Success
    }
    fn pool_get_verifiers(
        &self,
        handle: PoolHandle,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode {
        enter!(self, "indy_vdr_pool_get_verifiers");
        let Some(verifiers) = self.with_pool(handle, |pool| {
            pool.nodes
                .iter()
                .map(|node| (node.clone(), json!({"client_addr": "127.0.0.1", "enabled": true})))
                .collect::<Map<_, _>>()
        }) else {
            return self.invalid_pool();
        };
        self.fire_string(cb, cb_id, move || Ok(Value::Object(verifiers)));
        ErrorCode::Success
    }
    fn pool_submit_request(
        &self,
        handle: PoolHandle,
        request: RequestHandle,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode {
        enter!(self, "indy_vdr_pool_submit_request");
        if self.with_pool(handle, |_| ()).is_none() {
            return self.invalid_pool();
        }
        let body = self.shared.state().requests.remove(&request.0);
        let Some(body) = body else {
            return self.invalid_request();
        };
        self.reply(cb, cb_id, MockOp::Submit { pool: handle, request: body });
        ErrorCode::Success
    }
    fn pool_submit_action(
        &self,
        handle: PoolHandle,
        request: RequestHandle,
        nodes: Option<&CStr>,
        timeout: i32,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode {
        enter!(self, "indy_vdr_pool_submit_action");
        if self.with_pool(handle, |_| ()).is_none() {
            return self.invalid_pool();
        }
        let nodes = match nodes.map(|n| serde_json::from_slice::<Vec<String>>(n.to_bytes())) {
            None => None,
            Some(Ok(nodes)) => Some(nodes),
            Some(Err(_)) => return self.shared.fail(ErrorCode::Input, "Invalid node aliases"),
        };
        let body = self.shared.state().requests.remove(&request.0);
        let Some(body) = body else {
            return self.invalid_request();
        };
        self.reply(cb, cb_id, MockOp::Action { pool: handle, request: body, nodes, timeout });
        ErrorCode::Success
    }
    fn resolve(
        &self,
        handle: PoolHandle,
        did: &CStr,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode {
        enter!(self, "indy_vdr_resolve");
        if self.with_pool(handle, |_| ()).is_none() {
            return self.invalid_pool();
        }
        let did = did.to_string_lossy().into_owned();
        self.reply(cb, cb_id, MockOp::Resolve { pool: handle, did });
        ErrorCode::Success
    }
    fn dereference(
        &self,
        handle: PoolHandle,
        did_url: &CStr,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode {
        enter!(self, "indy_vdr_dereference");
        if self.with_pool(handle, |_| ()).is_none() {
            return self.invalid_pool();
        }
        let did_url = did_url.to_string_lossy().into_owned();
        self.reply(cb, cb_id, MockOp::Dereference { pool: handle, did_url });
        ErrorCode::Success
    }
}
