//! [`NativeLibrary`] backed by the `indy_vdr` shared library.
use crate::encode::ByteBuffer;
use crate::error::{Error, ErrorCode, Result};
use crate::handle::{CallbackId, PoolHandle, RequestHandle};
use crate::native::{BuilderCall, EmptyCallback, NativeArg, NativeLibrary, StringCallback};
use libloading::{library_filename, Library};
use std::cell::RefCell;
use std::ffi::{c_char, CStr};
use std::path::{Path, PathBuf};
use std::ptr;
use tracing::{debug, trace};

/// Base name of the engine's shared library.
pub const LIBRARY_NAME: &str = "indy_vdr";

type FfiStr = *const c_char;
type StrOut = *mut *const c_char;
type PoolCall = unsafe extern "C" fn(PoolHandle, StringCallback, CallbackId) -> i64;

thread_local! {
    /// Failures raised on this side of the boundary, read back like the engine's own record.
    static LOCAL_ERROR: RefCell<Option<Error>> = const { RefCell::new(None) };
}

fn local_failure(error: Error) -> ErrorCode {
    LOCAL_ERROR.with(|local| *local.borrow_mut() = Some(error));
    ErrorCode::Wrapper
}

fn take_local_failure() -> Option<Error> {
    LOCAL_ERROR.with(|local| local.borrow_mut().take())
}

struct Symbols {
    version: unsafe extern "C" fn() -> *mut c_char,
    set_default_logger: unsafe extern "C" fn() -> i64,
    set_config: unsafe extern "C" fn(FfiStr) -> i64,
    set_protocol_version: unsafe extern "C" fn(i64) -> i64,
    set_socks_proxy: unsafe extern "C" fn(FfiStr) -> i64,
    get_current_error: unsafe extern "C" fn(StrOut) -> i64,
    string_free: unsafe extern "C" fn(*mut c_char),
    request_free: unsafe extern "C" fn(RequestHandle) -> i64,
    request_get_body: unsafe extern "C" fn(RequestHandle, StrOut) -> i64,
    request_get_signature_input: unsafe extern "C" fn(RequestHandle, StrOut) -> i64,
    request_set_endorser: unsafe extern "C" fn(RequestHandle, FfiStr) -> i64,
    request_set_signature: for<'a> unsafe extern "C" fn(RequestHandle, ByteBuffer<'a>) -> i64,
    request_set_multi_signature:
        for<'a> unsafe extern "C" fn(RequestHandle, FfiStr, ByteBuffer<'a>) -> i64,
    request_set_txn_author_agreement_acceptance:
        unsafe extern "C" fn(RequestHandle, FfiStr) -> i64,
    prepare_txn_author_agreement_acceptance:
        unsafe extern "C" fn(FfiStr, FfiStr, FfiStr, FfiStr, u64, StrOut) -> i64,
    pool_create: unsafe extern "C" fn(FfiStr, *mut PoolHandle) -> i64,
    pool_close: unsafe extern "C" fn(PoolHandle) -> i64,
    pool_refresh: unsafe extern "C" fn(PoolHandle, EmptyCallback, CallbackId) -> i64,
    pool_get_status: PoolCall,
    pool_get_transactions: PoolCall,
    pool_get_verifiers: PoolCall,
    pool_submit_request:
        unsafe extern "C" fn(PoolHandle, RequestHandle, StringCallback, CallbackId) -> i64,
    pool_submit_action: unsafe extern "C" fn(
        PoolHandle,
        RequestHandle,
        FfiStr,
        i32,
        StringCallback,
        CallbackId,
    ) -> i64,
    resolve: unsafe extern "C" fn(PoolHandle, FfiStr, StringCallback, CallbackId) -> i64,
    dereference: unsafe extern "C" fn(PoolHandle, FfiStr, StringCallback, CallbackId) -> i64,
}

/// # Safety
///
/// `T` must match the C signature of the exported symbol `name`.
unsafe fn load<T: Copy>(lib: &Library, name: &str) -> Result<T> {
    lib.get::<T>(name.as_bytes())
        .map(|symbol| *symbol)
        .map_err(|e| Error::Library(format!("{name}: {e}")))
}

fn opt_ptr(s: Option<&CStr>) -> FfiStr {
    s.map_or(ptr::null(), CStr::as_ptr)
}

/// The engine loaded from a shared library at runtime.
///
/// Core entry points are resolved when the library is loaded. Request builders are
/// resolved by name on each call, so a missing builder only fails its own calls.
pub struct DynamicLibrary {
    symbols: Symbols,
    path: PathBuf,
    lib: Library,
}

impl DynamicLibrary {
    /// Loads the engine from `path`, or searches the executable's directory and then the
    /// system library path when no path is given.
    ///
    /// A directory `path` is searched for the platform's library file name.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut failures = Vec::new();
        for candidate in candidates(path) {
            // SAFETY: loading runs the library's initialization routines.
            match unsafe { Library::new(&candidate) } {
                Ok(lib) => {
                    debug!(path = %candidate.display(), "loaded native library");
                    return Self::from_library(lib, candidate);
                }
                Err(e) => failures.push(format!("{}: {e}", candidate.display())),
            }
        }
        Err(Error::Library(failures.join("; ")))
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    fn from_library(lib: Library, path: PathBuf) -> Result<Self> {
        // SAFETY: every field type mirrors the corresponding declaration in libindy_vdr.h.
        let symbols = unsafe {
            Symbols {
                version: load(&lib, "indy_vdr_version")?,
                set_default_logger: load(&lib, "indy_vdr_set_default_logger")?,
                set_config: load(&lib, "indy_vdr_set_config")?,
                set_protocol_version: load(&lib, "indy_vdr_set_protocol_version")?,
                set_socks_proxy: load(&lib, "indy_vdr_set_socks_proxy")?,
                get_current_error: load(&lib, "indy_vdr_get_current_error")?,
                string_free: load(&lib, "indy_vdr_string_free")?,
                request_free: load(&lib, "indy_vdr_request_free")?,
                request_get_body: load(&lib, "indy_vdr_request_get_body")?,
                request_get_signature_input: load(&lib, "indy_vdr_request_get_signature_input")?,
                request_set_endorser: load(&lib, "indy_vdr_request_set_endorser")?,
                request_set_signature: load(&lib, "indy_vdr_request_set_signature")?,
                request_set_multi_signature: load(&lib, "indy_vdr_request_set_multi_signature")?,
                request_set_txn_author_agreement_acceptance: load(
                    &lib,
                    "indy_vdr_request_set_txn_author_agreement_acceptance",
                )?,
                prepare_txn_author_agreement_acceptance: load(
                    &lib,
                    "indy_vdr_prepare_txn_author_agreement_acceptance",
                )?,
                pool_create: load(&lib, "indy_vdr_pool_create")?,
                pool_close: load(&lib, "indy_vdr_pool_close")?,
                pool_refresh: load(&lib, "indy_vdr_pool_refresh")?,
                pool_get_status: load(&lib, "indy_vdr_pool_get_status")?,
                pool_get_transactions: load(&lib, "indy_vdr_pool_get_transactions")?,
                pool_get_verifiers: load(&lib, "indy_vdr_pool_get_verifiers")?,
                pool_submit_request: load(&lib, "indy_vdr_pool_submit_request")?,
                pool_submit_action: load(&lib, "indy_vdr_pool_submit_action")?,
                resolve: load(&lib, "indy_vdr_resolve")?,
                dereference: load(&lib, "indy_vdr_dereference")?,
            }
        };
        Ok(Self { symbols, path, lib })
    }
    fn invoke_builder(&self, call: &BuilderCall, handle: &mut RequestHandle) -> Result<i64> {
        use NativeArg::{Str, I32, I64};

        let out: *mut RequestHandle = handle;
        macro_rules! invoke {
            ($($ty:ty => $arg:expr),*) => {{
                // SAFETY: the argument shape selects the builder's C signature.
                let builder: unsafe extern "C" fn($($ty,)* *mut RequestHandle) -> i64 =
                    unsafe { load(&self.lib, call.symbol)? };
                unsafe { builder($($arg,)* out) }
            }};
        }

        trace!(symbol = call.symbol, "invoking request builder");
        let status = match call.args.as_slice() {
            [a @ Str(_)] => invoke!(FfiStr => a.as_ptr()),
            [a @ Str(_), b @ Str(_)] => invoke!(FfiStr => a.as_ptr(), FfiStr => b.as_ptr()),
            [a @ Str(_), b @ Str(_), I64(c)] => {
                invoke!(FfiStr => a.as_ptr(), FfiStr => b.as_ptr(), i64 => *c)
            }
            [a @ Str(_), b @ Str(_), I64(c), I64(d)] => {
                invoke!(FfiStr => a.as_ptr(), FfiStr => b.as_ptr(), i64 => *c, i64 => *d)
            }
            [a @ Str(_), I32(b), I32(c)] => invoke!(FfiStr => a.as_ptr(), i32 => *b, i32 => *c),
            [a @ Str(_), I64(b), c @ Str(_)] => {
                invoke!(FfiStr => a.as_ptr(), i64 => *b, FfiStr => c.as_ptr())
            }
            [a @ Str(_), b @ Str(_), I32(c), I64(d)] => {
                invoke!(FfiStr => a.as_ptr(), FfiStr => b.as_ptr(), i32 => *c, i64 => *d)
            }
            [a @ Str(_), b @ Str(_), c @ Str(_), d @ Str(_)] => invoke!(
                FfiStr => a.as_ptr(),
                FfiStr => b.as_ptr(),
                FfiStr => c.as_ptr(),
                FfiStr => d.as_ptr()
            ),
            [a @ Str(_), b @ Str(_), c @ Str(_), I64(d), I64(e)] => invoke!(
                FfiStr => a.as_ptr(),
                FfiStr => b.as_ptr(),
                FfiStr => c.as_ptr(),
                i64 => *d,
                i64 => *e
            ),
            [a @ Str(_), b @ Str(_), c @ Str(_), d @ Str(_), e @ Str(_)] => invoke!(
                FfiStr => a.as_ptr(),
                FfiStr => b.as_ptr(),
                FfiStr => c.as_ptr(),
                FfiStr => d.as_ptr(),
                FfiStr => e.as_ptr()
            ),
            [a @ Str(_), b @ Str(_), c @ Str(_), d @ Str(_), e @ Str(_), I32(f), I64(g)] => invoke!(
                FfiStr => a.as_ptr(),
                FfiStr => b.as_ptr(),
                FfiStr => c.as_ptr(),
                FfiStr => d.as_ptr(),
                FfiStr => e.as_ptr(),
                i32 => *f,
                i64 => *g
            ),
            [a @ Str(_), b @ Str(_), c @ Str(_), d @ Str(_), e @ Str(_), f @ Str(_), I32(g)] => {
                invoke!(
                    FfiStr => a.as_ptr(),
                    FfiStr => b.as_ptr(),
                    FfiStr => c.as_ptr(),
                    FfiStr => d.as_ptr(),
                    FfiStr => e.as_ptr(),
                    FfiStr => f.as_ptr(),
                    i32 => *g
                )
            }
            [a @ Str(_), b @ Str(_), c @ Str(_), d @ Str(_), e @ Str(_), f @ Str(_), g @ Str(_)] => {
                invoke!(
                    FfiStr => a.as_ptr(),
                    FfiStr => b.as_ptr(),
                    FfiStr => c.as_ptr(),
                    FfiStr => d.as_ptr(),
                    FfiStr => e.as_ptr(),
                    FfiStr => f.as_ptr(),
                    FfiStr => g.as_ptr()
                )
            }
            _ => {
                return Err(Error::Unexpected(format!(
                    "unsupported argument list for {}",
                    call.symbol
                )))
            }
        };
        Ok(status)
    }
}

fn candidates(path: Option<&Path>) -> Vec<PathBuf> {
    let filename = library_filename(LIBRARY_NAME);
    match path {
        Some(path) if path.is_dir() => vec![path.join(filename)],
        Some(path) => vec![path.to_path_buf()],
        None => {
            let mut candidates = Vec::new();
            if let Some(dir) = std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
            {
                candidates.push(dir.join(&filename));
            }
            candidates.push(PathBuf::from(filename));
            candidates
        }
    }
}

// SAFETY (all calls below): arguments are valid for the duration of the call and the
// function pointers were resolved with signatures matching libindy_vdr.h.
impl NativeLibrary for DynamicLibrary {
    fn version(&self) -> *mut c_char {
        unsafe { (self.symbols.version)() }
    }
    fn set_default_logger(&self) -> ErrorCode {
        unsafe { (self.symbols.set_default_logger)() }.into()
    }
    fn set_config(&self, config: &CStr) -> ErrorCode {
        unsafe { (self.symbols.set_config)(config.as_ptr()) }.into()
    }
    fn set_protocol_version(&self, version: i64) -> ErrorCode {
        unsafe { (self.symbols.set_protocol_version)(version) }.into()
    }
    fn set_socks_proxy(&self, socks_proxy: &CStr) -> ErrorCode {
        unsafe { (self.symbols.set_socks_proxy)(socks_proxy.as_ptr()) }.into()
    }
    fn get_current_error(&self, error_json: &mut *const c_char) -> ErrorCode {
        unsafe { (self.symbols.get_current_error)(error_json) }.into()
    }
    fn take_local_error(&self) -> Option<Error> {
        take_local_failure()
    }
    unsafe fn string_free(&self, s: *mut c_char) {
        (self.symbols.string_free)(s)
    }

    fn build_request(&self, call: &BuilderCall, handle: &mut RequestHandle) -> ErrorCode {
        match self.invoke_builder(call, handle) {
            Ok(status) => status.into(),
            Err(e) => local_failure(e),
        }
    }
    fn request_free(&self, handle: RequestHandle) -> ErrorCode {
        unsafe { (self.symbols.request_free)(handle) }.into()
    }
    fn request_get_body(&self, handle: RequestHandle, body: &mut *const c_char) -> ErrorCode {
        unsafe { (self.symbols.request_get_body)(handle, body) }.into()
    }
    fn request_get_signature_input(
        &self,
        handle: RequestHandle,
        input: &mut *const c_char,
    ) -> ErrorCode {
        unsafe { (self.symbols.request_get_signature_input)(handle, input) }.into()
    }
    fn request_set_endorser(&self, handle: RequestHandle, endorser: &CStr) -> ErrorCode {
        unsafe { (self.symbols.request_set_endorser)(handle, endorser.as_ptr()) }.into()
    }
    fn request_set_signature(
        &self,
        handle: RequestHandle,
        signature: ByteBuffer<'_>,
    ) -> ErrorCode {
        unsafe { (self.symbols.request_set_signature)(handle, signature) }.into()
    }
    fn request_set_multi_signature(
        &self,
        handle: RequestHandle,
        identifier: &CStr,
        signature: ByteBuffer<'_>,
    ) -> ErrorCode {
        unsafe { (self.symbols.request_set_multi_signature)(handle, identifier.as_ptr(), signature) }
            .into()
    }
    fn request_set_txn_author_agreement_acceptance(
        &self,
        handle: RequestHandle,
        acceptance: &CStr,
    ) -> ErrorCode {
        unsafe {
            (self.symbols.request_set_txn_author_agreement_acceptance)(handle, acceptance.as_ptr())
        }
        .into()
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
        unsafe {
            (self.symbols.prepare_txn_author_agreement_acceptance)(
                opt_ptr(text),
                opt_ptr(version),
                opt_ptr(taa_digest),
                acc_mech_type.as_ptr(),
                time,
                output,
            )
        }
        .into()
    }

    fn pool_create(&self, params: &CStr, handle: &mut PoolHandle) -> ErrorCode {
        unsafe { (self.symbols.pool_create)(params.as_ptr(), handle) }.into()
    }
    fn pool_close(&self, handle: PoolHandle) -> ErrorCode {
        unsafe { (self.symbols.pool_close)(handle) }.into()
    }
    fn pool_refresh(&self, handle: PoolHandle, cb: EmptyCallback, cb_id: CallbackId) -> ErrorCode {
        unsafe { (self.symbols.pool_refresh)(handle, cb, cb_id) }.into()
    }
    fn pool_get_status(
        &self,
        handle: PoolHandle,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode {
        unsafe { (self.symbols.pool_get_status)(handle, cb, cb_id) }.into()
    }
    fn pool_get_transactions(
        &self,
        handle: PoolHandle,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode {
        unsafe { (self.symbols.pool_get_transactions)(handle, cb, cb_id) }.into()
    }
    fn pool_get_verifiers(
        &self,
        handle: PoolHandle,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode {
        unsafe { (self.symbols.pool_get_verifiers)(handle, cb, cb_id) }.into()
    }
    fn pool_submit_request(
        &self,
        handle: PoolHandle,
        request: RequestHandle,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode {
        unsafe { (self.symbols.pool_submit_request)(handle, request, cb, cb_id) }.into()
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
        unsafe {
            (self.symbols.pool_submit_action)(handle, request, opt_ptr(nodes), timeout, cb, cb_id)
        }
        .into()
    }
    fn resolve(
        &self,
        handle: PoolHandle,
        did: &CStr,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode {
        unsafe { (self.symbols.resolve)(handle, did.as_ptr(), cb, cb_id) }.into()
    }
    fn dereference(
        &self,
        handle: PoolHandle,
        did_url: &CStr,
        cb: StringCallback,
        cb_id: CallbackId,
    ) -> ErrorCode {
        unsafe { (self.symbols.dereference)(handle, did_url.as_ptr(), cb, cb_id) }.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_is_the_only_candidate() {
        let path = Path::new("/opt/indy/libindy_vdr.so");
        assert_eq!(candidates(Some(path)), vec![path.to_path_buf()]);
    }

    #[test]
    fn directory_path_uses_platform_file_name() {
        let dir = std::env::temp_dir();
        assert_eq!(candidates(Some(&dir)), vec![dir.join(library_filename(LIBRARY_NAME))]);
    }

    #[test]
    fn default_search_ends_with_system_lookup() {
        let candidates = candidates(None);
        assert_eq!(
            candidates.last(),
            Some(&PathBuf::from(library_filename(LIBRARY_NAME)))
        );
    }

    #[test]
    fn local_failure_stays_on_its_thread() {
        let code = local_failure(Error::Unexpected(String::from("unsupported argument list")));
        assert_eq!(code, ErrorCode::Wrapper);
        let elsewhere = std::thread::spawn(take_local_failure).join().expect("thread");
        assert!(elsewhere.is_none());
        match take_local_failure() {
            Some(Error::Unexpected(message)) => assert_eq!(message, "unsupported argument list"),
            other => panic!("unexpected local failure: {other:?}"),
        }
        assert!(take_local_failure().is_none());
    }

    #[test]
    fn missing_library_reports_load_error() {
        let dir = std::env::temp_dir().join("vdrkit-no-such-dir");
        match DynamicLibrary::load(Some(&dir.join("libmissing.so"))) {
            Err(Error::Library(message)) => assert!(message.contains("libmissing.so")),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("library should not load"),
        }
    }
}
