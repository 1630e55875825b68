#![cfg_attr(docsrs, feature(doc_cfg))]
//! Client SDK for Hyperledger Indy ledgers.
//!
//! Ledger requests are prepared as [`Request`]s and submitted to a [`Pool`], both of
//! which own an engine-side handle. All calls go through a [`Bridge`] to the native
//! indy-vdr engine; [`library`] provides the process-wide one.
pub mod config;
pub mod error;
pub mod ledger;
pub mod pool;
pub mod request;

pub use crate::error::{Error, Result};
pub use crate::ledger::{
    prepare_txn_author_agreement_acceptance, LedgerType, RequestKind, RichSchemaType,
    TaaAcceptance,
};
pub use crate::pool::{Pool, PoolParams, Submission};
pub use crate::request::Request;
pub use vdrkit_ffi::{Bridge, ErrorCode, JsonInput, PoolHandle, RequestHandle};

/// The process-wide bridge, loading the shared library on first use.
#[cfg_attr(docsrs, doc(cfg(feature = "dylib")))]
#[cfg(feature = "dylib")]
pub fn library() -> Result<&'static Bridge> {
    Ok(vdrkit_ffi::library()?)
}

/// The version of the native engine behind `bridge`.
pub fn version(bridge: &Bridge) -> Result<String> {
    Ok(bridge.version()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vdrkit_ffi::mock::MockEngine;

    #[test]
    fn engine_version() -> Result<()> {
        let engine = Arc::new(MockEngine::new());
        let bridge = Bridge::new(engine.clone());
        assert_eq!(version(&bridge)?, MockEngine::VERSION);
        assert_eq!(engine.live_strings(), 0);
        Ok(())
    }
}
