//! Validator pools.
mod submission;

pub use self::submission::Submission;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ffi::CString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};
use vdrkit_ffi::encode::{encode_i32, encode_json};
use vdrkit_ffi::{Bridge, PoolHandle, RequestHandle};

/// Parameters for creating a pool.
///
/// Exactly one of `transactions` and `transactions_path` must be given. Empty values
/// count as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolParams {
    /// Newline-delimited genesis transactions.
    pub transactions: Option<String>,
    /// Path of a genesis transactions file.
    pub transactions_path: Option<PathBuf>,
    /// Node alias to selection weight. The engine's default weight is `1.0`; zero
    /// excludes a node.
    pub node_weights: Option<BTreeMap<String, f64>>,
}

impl PoolParams {
    pub fn from_transactions(transactions: impl Into<String>) -> Self {
        Self { transactions: Some(transactions.into()), ..Default::default() }
    }
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { transactions_path: Some(path.into()), ..Default::default() }
    }
    pub fn node_weights(mut self, weights: BTreeMap<String, f64>) -> Self {
        self.node_weights = Some(weights);
        self
    }
    fn transactions(&self) -> Option<&str> {
        self.transactions.as_deref().filter(|txns| !txns.is_empty())
    }
    fn path(&self) -> Option<&Path> {
        self.transactions_path.as_deref().filter(|path| !path.as_os_str().is_empty())
    }
    /// Checks that exactly one genesis source is given.
    pub fn validate(&self) -> Result<()> {
        match (self.transactions(), self.path()) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            _ => Err(Error::Vdr(vdrkit_ffi::Error::PoolParams(String::from(
                "Must provide one of transactions or transactions_path",
            )))),
        }
    }
    fn normalized(&self) -> Self {
        Self {
            transactions: self.transactions().map(String::from),
            transactions_path: self.path().map(Path::to_path_buf),
            node_weights: self.node_weights.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct StatusCache {
    last_status: Option<Value>,
    last_refresh: Option<DateTime<Utc>>,
}

/// An open connection context to a validator network.
///
/// The pool owns its engine-side handle and closes it on drop. Once closed, every
/// operation fails with [`vdrkit_ffi::Error::PoolClosed`].
pub struct Pool {
    bridge: Bridge,
    handle: RwLock<Option<PoolHandle>>,
    cache: RwLock<StatusCache>,
}

impl Pool {
    /// Creates a pool without contacting any node.
    pub fn create(bridge: &Bridge, params: PoolParams) -> Result<Self> {
        params.validate()?;
        let params = encode_json(&params.normalized())?;
        let mut handle = PoolHandle::EMPTY;
        bridge.check(bridge.library().pool_create(&params, &mut handle))?;
        debug!(%handle, "pool created");
        Ok(Self {
            bridge: bridge.clone(),
            handle: RwLock::new(Some(handle).filter(|h| !h.is_empty())),
            cache: RwLock::new(StatusCache::default()),
        })
    }
    /// Creates a pool and, unless `no_refresh` is set, synchronizes it with the network.
    pub async fn open(bridge: &Bridge, params: PoolParams, no_refresh: bool) -> Result<Self> {
        let pool = Self::create(bridge, params)?;
        if !no_refresh {
            pool.refresh().await?;
        }
        Ok(pool)
    }
    pub fn handle(&self) -> Option<PoolHandle> {
        *self.handle.read().unwrap_or_else(PoisonError::into_inner)
    }
    pub fn is_closed(&self) -> bool {
        self.handle().is_none()
    }
    fn live_handle(&self) -> Result<PoolHandle> {
        Ok(self.handle().ok_or(vdrkit_ffi::Error::PoolClosed)?)
    }
    fn cache(&self) -> RwLockReadGuard<'_, StatusCache> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }
    fn cache_mut(&self) -> RwLockWriteGuard<'_, StatusCache> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
    /// Fetches the current pool status and remembers it as [`Pool::last_status`].
    pub async fn get_status(&self) -> Result<Value> {
        let handle = self.live_handle()?;
        let status =
            self.bridge.call_async_string(|lib, cb, id| lib.pool_get_status(handle, cb, id));
        let status = serde_json::from_str::<Value>(&status.await?)?;
        self.cache_mut().last_status = Some(status.clone());
        Ok(status)
    }
    /// The pool's genesis transactions, newline-delimited.
    pub async fn get_transactions(&self) -> Result<String> {
        let handle = self.live_handle()?;
        Ok(self
            .bridge
            .call_async_string(|lib, cb, id| lib.pool_get_transactions(handle, cb, id))
            .await?)
    }
    pub async fn get_transaction_list(&self) -> Result<Vec<String>> {
        Ok(self
            .get_transactions()
            .await?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(String::from)
            .collect())
    }
    /// The active verifier nodes, keyed by alias.
    pub async fn get_verifiers(&self) -> Result<Value> {
        let handle = self.live_handle()?;
        let verifiers =
            self.bridge.call_async_string(|lib, cb, id| lib.pool_get_verifiers(handle, cb, id));
        Ok(serde_json::from_str(&verifiers.await?)?)
    }
    /// Checks the verifier pool, loads any new pool transactions and re-fetches the status.
    pub async fn refresh(&self) -> Result<Value> {
        let handle = self.live_handle()?;
        self.bridge.call_async(|lib, cb, id| lib.pool_refresh(handle, cb, id)).await?;
        let status = self.get_status().await?;
        self.cache_mut().last_refresh = Some(Utc::now());
        debug!(%handle, "pool refreshed");
        Ok(status)
    }
    /// The status recorded by the latest [`Pool::get_status`] or [`Pool::refresh`].
    pub fn last_status(&self) -> Option<Value> {
        self.cache().last_status.clone()
    }
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.cache().last_refresh
    }
    /// Seconds elapsed since the latest refresh.
    pub fn last_refresh_seconds(&self) -> Option<f64> {
        self.last_refresh()
            .map(|at| (Utc::now() - at).num_milliseconds() as f64 / 1000.0)
    }
    /// Hands the request over to the engine. The request is consumed even if the pool
    /// then rejects it.
    fn transfer(&self, submission: Submission<'_>) -> Result<(PoolHandle, RequestHandle)> {
        let mut request = submission.into_request(&self.bridge)?;
        let pool = self.live_handle()?;
        let handle = request.take_handle()?;
        Ok((pool, handle))
    }
    /// Submits a ledger request and returns the `result` member of the reply.
    pub async fn submit_request<'a>(&self, request: impl Into<Submission<'a>>) -> Result<Value> {
        let (pool, handle) = self.transfer(request.into())?;
        let reply = self
            .bridge
            .call_async_string(|lib, cb, id| lib.pool_submit_request(pool, handle, cb, id))
            .await?;
        let mut reply = serde_json::from_str::<Value>(&reply)?;
        match reply.get_mut("result") {
            Some(result) => Ok(result.take()),
            None => Err(Error::Reply(reply.to_string())),
        }
    }
    /// Submits a pool action, such as `GET_VALIDATOR_INFO`, to the verifier nodes.
    ///
    /// Returns the raw reply of each node, keyed by alias. `timeout` is in seconds.
    pub async fn submit_action<'a>(
        &self,
        request: impl Into<Submission<'a>>,
        node_aliases: Option<&[&str]>,
        timeout: Option<i32>,
    ) -> Result<Value> {
        let nodes = node_aliases.map(encode_json).transpose()?;
        let (pool, handle) = self.transfer(request.into())?;
        let reply = self
            .bridge
            .call_async_string(|lib, cb, id| {
                lib.pool_submit_action(pool, handle, nodes.as_deref(), encode_i32(timeout), cb, id)
            })
            .await?;
        Ok(serde_json::from_str(&reply)?)
    }
    /// Resolves a `did:indy` DID against this pool.
    pub async fn resolve(&self, did: &str) -> Result<Value> {
        let handle = self.live_handle()?;
        let did = CString::new(did).map_err(vdrkit_ffi::Error::from)?;
        let reply = self.bridge.call_async_string(|lib, cb, id| lib.resolve(handle, &did, cb, id));
        Ok(serde_json::from_str(&reply.await?)?)
    }
    /// Dereferences a `did:indy` DID URL against this pool.
    pub async fn dereference(&self, did_url: &str) -> Result<Value> {
        let handle = self.live_handle()?;
        let did_url = CString::new(did_url).map_err(vdrkit_ffi::Error::from)?;
        let reply =
            self.bridge.call_async_string(|lib, cb, id| lib.dereference(handle, &did_url, cb, id));
        Ok(serde_json::from_str(&reply.await?)?)
    }
    /// Closes the pool. Further calls are no-ops.
    pub fn close(&self) -> Result<()> {
        let handle = self.handle.write().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            self.bridge.check(self.bridge.library().pool_close(handle))?;
            debug!(%handle, "pool closed");
        }
        Ok(())
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close pool");
        }
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(handle) = self.handle() else {
            return write!(f, "Pool(closed)");
        };
        let cache = self.cache();
        let count = cache
            .last_status
            .as_ref()
            .and_then(|status| status["nodes"].as_array())
            .map_or(0, Vec::len);
        let mt_size = cache.last_status.as_ref().and_then(|status| status["mt_size"].as_u64());
        let last_refresh = cache.last_refresh.map(|at| (Utc::now() - at).num_seconds());
        write!(f, "Pool({}, count={count}, last_refresh=", handle.0)?;
        match last_refresh {
            Some(seconds) => write!(f, "{seconds}")?,
            None => write!(f, "None")?,
        }
        match mt_size {
            Some(size) => write!(f, ", mt_size={size})"),
            None => write!(f, ", mt_size=None)"),
        }
    }
}
