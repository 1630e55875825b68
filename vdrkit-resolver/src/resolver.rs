//! Namespace routing for `did:indy` resolution.
use crate::did::DidUrl;
use crate::document::{self, LedgerPoint, LegacyEndpoint, LEGACY_ENDPOINT_ATTRIBUTE};
use crate::error::{Error, Result};
use crate::genesis::GenesisSource;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use vdrkit::{Bridge, Pool, PoolParams, RequestKind};

#[derive(Clone, Debug)]
pub struct ResolverConfig<G> {
    pub bridge: Bridge,
    /// Provision pools for unknown namespaces from `genesis_source`.
    pub autopilot: bool,
    pub genesis_source: G,
}

/// Resolves `did:indy` DIDs through the pool registered for their namespace.
pub struct Resolver<G> {
    bridge: Bridge,
    autopilot: bool,
    genesis_source: G,
    pools: DashMap<String, Arc<Pool>>,
    provisioning: DashMap<String, Arc<Mutex<()>>>,
}

impl<G> Resolver<G> {
    pub fn new(config: ResolverConfig<G>) -> Self {
        Self {
            bridge: config.bridge,
            autopilot: config.autopilot,
            genesis_source: config.genesis_source,
            pools: DashMap::new(),
            provisioning: DashMap::new(),
        }
    }
    /// Registers `pool` for `namespace`.
    pub fn add_pool(&self, namespace: impl Into<String>, pool: Pool) -> Result<Arc<Pool>> {
        match self.pools.entry(namespace.into()) {
            Entry::Occupied(entry) => Err(Error::NamespaceExists(entry.key().clone())),
            Entry::Vacant(entry) => Ok(Arc::clone(&entry.insert(Arc::new(pool)))),
        }
    }
    /// Unregisters the pool of `namespace`. It is closed once the last reference is dropped.
    pub fn remove_pool(&self, namespace: &str) -> Result<Arc<Pool>> {
        self.pools
            .remove(namespace)
            .map(|(_, pool)| pool)
            .ok_or_else(|| Error::UnknownNamespace(namespace.to_string()))
    }
    pub fn pool(&self, namespace: &str) -> Option<Arc<Pool>> {
        self.pools.get(namespace).map(|pool| Arc::clone(&pool))
    }
    /// The registered namespaces, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces = self.pools.iter().map(|e| e.key().clone()).collect::<Vec<_>>();
        namespaces.sort();
        namespaces
    }
    /// Refreshes the pool of `namespace` and returns its status.
    pub async fn refresh(&self, namespace: &str) -> Result<Value> {
        let pool =
            self.pool(namespace).ok_or_else(|| Error::UnknownNamespace(namespace.to_string()))?;
        Ok(pool.refresh().await?)
    }
    /// Closes and unregisters every pool.
    ///
    /// All pools are closed even if some fail; the first failure is returned.
    pub fn close(&self) -> Result<()> {
        let mut result = Ok(());
        for namespace in self.namespaces() {
            if let Some((_, pool)) = self.pools.remove(&namespace) {
                if let Err(e) = pool.close() {
                    result = result.and(Err(e.into()));
                }
            }
        }
        result
    }
}

impl<G> Resolver<G>
where
    G: GenesisSource + Send + Sync + 'static,
{
    /// Resolves a DID to its resolution result.
    ///
    /// For DIDs without `diddocContent`, services are derived from the legacy `endpoint`
    /// attribute read at the same ledger point as the DID itself. A failed or unusable
    /// attribute lookup leaves the document without services.
    pub async fn resolve(&self, did: &str) -> Result<Value> {
        let did_url = DidUrl::parse(did)?;
        let pool = self.pool_for(did_url.namespace()).await?;
        let mut resolution = pool.resolve(did).await?;
        if let Some(point) = document::legacy_query(&resolution) {
            let endpoints = match legacy_endpoint(&self.bridge, &pool, did_url.id(), point).await
            {
                Ok(endpoints) => endpoints,
                Err(e) => {
                    debug!(did = %did_url.did(), error = %e, "legacy endpoint lookup failed");
                    None
                }
            };
            if let Some(doc) = resolution.get_mut("didDocument").filter(|d| d.is_object()) {
                document::expand_verification_keys(doc, did_url.id());
                if let Some(endpoints) = endpoints {
                    doc["service"] =
                        Value::Array(document::services(&did_url.did(), &endpoints));
                }
            }
        }
        Ok(resolution)
    }
    /// Dereferences a DID URL to the ledger object it points to.
    pub async fn dereference(&self, did_url: &str) -> Result<Value> {
        let parsed = DidUrl::parse(did_url)?;
        let pool = self.pool_for(parsed.namespace()).await?;
        Ok(pool.dereference(did_url).await?)
    }
    async fn pool_for(&self, namespace: &str) -> Result<Arc<Pool>> {
        if let Some(pool) = self.pool(namespace) {
            return Ok(pool);
        }
        if !self.autopilot {
            return Err(Error::UnknownNamespace(namespace.to_string()));
        }
        let lock = Arc::clone(&self.provisioning.entry(namespace.to_string()).or_default());
        let _guard = lock.lock().await;
        if let Some(pool) = self.pool(namespace) {
            return Ok(pool);
        }
        let genesis = self
            .genesis_source
            .genesis(namespace)
            .await?
            .ok_or_else(|| Error::UnknownNamespace(namespace.to_string()))?;
        debug!(namespace, transactions = genesis.len(), "provisioning pool");
        let params = PoolParams::from_transactions(genesis.to_string());
        let pool = Pool::open(&self.bridge, params, false).await?;
        self.add_pool(namespace, pool)
    }
}

async fn legacy_endpoint(
    bridge: &Bridge,
    pool: &Pool,
    id: &str,
    point: LedgerPoint,
) -> Result<Option<LegacyEndpoint>> {
    let request = RequestKind::GetAttrib {
        submitter_did: None,
        target_did: id.to_string(),
        raw: Some(String::from(LEGACY_ENDPOINT_ATTRIBUTE)),
        hash: None,
        enc: None,
        seq_no: point.seq_no,
        timestamp: point.timestamp,
    }
    .build(bridge)?;
    let result = pool.submit_request(request).await?;
    match result.get("data") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(data)) => Ok(Some(serde_json::from_str(data)?)),
        Some(data) => Ok(Some(serde_json::from_value(data.clone())?)),
    }
}
