#![cfg_attr(docsrs, feature(doc_cfg))]
//! Native call bridge for the indy-vdr ledger client engine.
//!
//! The engine is reached through the [`NativeLibrary`] trait. [`Bridge`] turns its
//! status-code and callback conventions into `Result`s and futures.
pub mod bridge;
pub mod encode;
pub mod error;
pub mod handle;
pub mod native;
pub mod string;

#[cfg_attr(docsrs, doc(cfg(feature = "dylib")))]
#[cfg(feature = "dylib")]
pub mod dylib;
#[cfg_attr(docsrs, doc(cfg(feature = "mock")))]
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use crate::bridge::{Bridge, CallFuture};
pub use crate::encode::{ByteBuffer, JsonInput};
pub use crate::error::{Error, ErrorCode, Result};
pub use crate::handle::{CallbackId, PoolHandle, RequestHandle};
pub use crate::native::{BuilderCall, NativeLibrary};

use once_cell::sync::OnceCell;

static LIBRARY: OnceCell<Bridge> = OnceCell::new();

/// Initializes the process-wide bridge with `bridge`, unless one is already installed.
///
/// Returns the bridge in effect afterwards.
pub fn install(bridge: Bridge) -> Result<&'static Bridge> {
    LIBRARY.get_or_try_init(|| {
        bridge.initialize()?;
        Ok(bridge)
    })
}

/// The process-wide bridge, loading the shared library on first use.
#[cfg_attr(docsrs, doc(cfg(feature = "dylib")))]
#[cfg(feature = "dylib")]
pub fn library() -> Result<&'static Bridge> {
    load(None)
}

/// Like [`library`], loading the shared library from `path` on first use.
///
/// `path` is ignored once the process-wide bridge exists.
#[cfg_attr(docsrs, doc(cfg(feature = "dylib")))]
#[cfg(feature = "dylib")]
pub fn load(path: Option<&std::path::Path>) -> Result<&'static Bridge> {
    LIBRARY.get_or_try_init(|| {
        let lib = dylib::DynamicLibrary::load(path)?;
        let bridge = Bridge::new(std::sync::Arc::new(lib));
        bridge.initialize()?;
        Ok(bridge)
    })
}
