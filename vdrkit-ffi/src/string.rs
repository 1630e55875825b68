use crate::error::Result;
use crate::native::NativeLibrary;
use std::ffi::{c_char, CStr};
use std::fmt;
use std::sync::Arc;

/// A string allocated by the native engine.
///
/// The string is released through the engine exactly once, when this value is dropped.
pub struct LibString {
    ptr: *const c_char,
    lib: Arc<dyn NativeLibrary>,
}

// SAFETY: the pointer is exclusively owned and only read through `&self`.
unsafe impl Send for LibString {}
unsafe impl Sync for LibString {}

impl LibString {
    /// Takes ownership of a library-allocated string. Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a nul-terminated string allocated by `lib` that nobody else frees.
    pub unsafe fn from_raw(lib: Arc<dyn NativeLibrary>, ptr: *const c_char) -> Option<Self> {
        if ptr.is_null() {
            None
        } else {
            Some(Self { ptr, lib })
        }
    }
    pub fn as_c_str(&self) -> &CStr {
        // SAFETY: non-null and nul-terminated per `from_raw`.
        unsafe { CStr::from_ptr(self.ptr) }
    }
    pub fn to_str(&self) -> Result<&str> {
        Ok(self.as_c_str().to_str()?)
    }
    pub fn as_bytes(&self) -> &[u8] {
        self.as_c_str().to_bytes()
    }
    /// Copies the contents out and releases the native string.
    pub fn into_string(self) -> Result<String> {
        self.to_str().map(String::from)
    }
}

impl Drop for LibString {
    fn drop(&mut self) {
        // SAFETY: owned since `from_raw` and released only here.
        unsafe { self.lib.string_free(self.ptr.cast_mut()) }
    }
}

impl fmt::Debug for LibString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LibString").field(&self.as_c_str()).finish()
    }
}
