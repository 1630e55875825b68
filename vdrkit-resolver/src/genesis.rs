//! Sources of genesis transactions for provisioning pools.
use crate::error::{Error, Result};
use crate::http_client::HttpClient;
use http::{Request, StatusCode, Uri};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// File name of a genesis transaction set within a network directory.
pub const GENESIS_FILENAME: &str = "pool_transactions_genesis.json";
/// Raw content root of the public registry of did:indy networks.
pub const DEFAULT_NETWORKS_URL: &str =
    "https://raw.githubusercontent.com/IDunion/indy-did-networks/main";

/// A genesis transaction set: one JSON object per line, in ledger order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisTransactions(Vec<String>);

impl GenesisTransactions {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        std::str::from_utf8(bytes).map_err(|e| Error::InvalidGenesis(e.to_string()))?.parse()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromStr for GenesisTransactions {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut transactions = Vec::new();
        for (i, line) in s.lines().map(str::trim).enumerate() {
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(Value::Object(_)) => transactions.push(line.to_string()),
                _ => return Err(Error::InvalidGenesis(format!("line {} is not a JSON object", i + 1))),
            }
        }
        if transactions.is_empty() {
            return Err(Error::InvalidGenesis(String::from("no transactions")));
        }
        Ok(Self(transactions))
    }
}

impl fmt::Display for GenesisTransactions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("\n"))
    }
}

/// Looks up the genesis transactions of a network namespace.
#[trait_variant::make(Send)]
pub trait GenesisSource {
    /// Returns `None` when the namespace is not known to this source.
    fn genesis(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<Option<GenesisTransactions>>>;
}

/// A source that knows no namespaces.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoGenesisSource;

impl GenesisSource for NoGenesisSource {
    async fn genesis(&self, _namespace: &str) -> Result<Option<GenesisTransactions>> {
        Ok(None)
    }
}

#[derive(Clone, Debug)]
pub struct GithubGenesisSourceConfig<T> {
    /// Content root of the networks repository, [`DEFAULT_NETWORKS_URL`] for the public one.
    pub networks_url: String,
    pub http_client: Arc<T>,
}

/// Fetches genesis files from a did:indy networks repository laid out as
/// `networks/<namespace>/<sub-namespace>/pool_transactions_genesis.json`.
pub struct GithubGenesisSource<T> {
    networks_url: String,
    http_client: Arc<T>,
}

impl<T> GithubGenesisSource<T> {
    pub fn new(config: GithubGenesisSourceConfig<T>) -> Self {
        Self { networks_url: config.networks_url, http_client: config.http_client }
    }
    fn uri(&self, namespace: &str) -> Result<Uri> {
        Ok(format!(
            "{}/networks/{}/{GENESIS_FILENAME}",
            self.networks_url.trim_end_matches('/'),
            namespace.replace(':', "/")
        )
        .parse()?)
    }
}

impl<T> GenesisSource for GithubGenesisSource<T>
where
    T: HttpClient + Send + Sync + 'static,
{
    async fn genesis(&self, namespace: &str) -> Result<Option<GenesisTransactions>> {
        let res = self
            .http_client
            .send_http(Request::builder().uri(self.uri(namespace)?).body(Vec::new())?)
            .await
            .map_err(Error::HttpClient)?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(Error::HttpStatus(res.status()));
        }
        GenesisTransactions::from_slice(res.body()).map(Some)
    }
}

/// Reads genesis files from a local directory laid out as
/// `<namespace>[/<sub-namespace>]/pool_transactions_genesis.json`.
#[derive(Clone, Debug)]
pub struct FolderGenesisSource {
    root: PathBuf,
    filename: String,
}

impl FolderGenesisSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf(), filename: String::from(GENESIS_FILENAME) }
    }
    /// Uses `filename` instead of [`GENESIS_FILENAME`].
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }
    fn path(&self, namespace: &str) -> PathBuf {
        namespace.split(':').fold(self.root.clone(), |path, segment| path.join(segment)).join(&self.filename)
    }
    /// Every namespace with a genesis file, mapped to the file's path.
    ///
    /// Hidden directories are skipped.
    pub fn namespaces(&self) -> Result<BTreeMap<String, PathBuf>> {
        let mut found = BTreeMap::new();
        for (namespace, dir) in subdirectories(&self.root)? {
            let file = dir.join(&self.filename);
            if file.is_file() {
                found.insert(namespace.clone(), file);
            }
            for (sub, dir) in subdirectories(&dir)? {
                let file = dir.join(&self.filename);
                if file.is_file() {
                    found.insert(format!("{namespace}:{sub}"), file);
                }
            }
        }
        Ok(found)
    }
}

fn subdirectories(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !name.starts_with('.') && entry.path().is_dir() {
            dirs.push((name, entry.path()));
        }
    }
    Ok(dirs)
}

impl GenesisSource for FolderGenesisSource {
    async fn genesis(&self, namespace: &str) -> Result<Option<GenesisTransactions>> {
        let path = self.path(namespace);
        if !path.is_file() {
            return Ok(None);
        }
        std::fs::read_to_string(path)?.parse().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Response;

    const GENESIS: &str = concat!(
        r#"{"txn":{"data":{"data":{"alias":"Node1"}},"type":"0"},"txnMetadata":{"seqNo":1}}"#,
        "\n",
        r#"{"txn":{"data":{"data":{"alias":"Node2"}},"type":"0"},"txnMetadata":{"seqNo":2}}"#,
        "\n",
    );

    struct MockHttpClient {
        responses: Vec<(&'static str, u16, &'static str)>,
    }

    impl HttpClient for MockHttpClient {
        async fn send_http(
            &self,
            request: Request<Vec<u8>>,
        ) -> core::result::Result<
            Response<Vec<u8>>,
            Box<dyn std::error::Error + Send + Sync + 'static>,
        > {
            let path = request.uri().path();
            let (status, body) = self
                .responses
                .iter()
                .find(|(p, _, _)| *p == path)
                .map_or((404, ""), |(_, status, body)| (*status, *body));
            Ok(Response::builder().status(status).body(body.as_bytes().to_vec())?)
        }
    }

    #[test]
    fn parse_genesis() -> Result<()> {
        let txns = GENESIS.parse::<GenesisTransactions>()?;
        assert_eq!(txns.len(), 2);
        assert!(txns.iter().next().is_some_and(|t| t.contains("Node1")));
        assert_eq!(format!("{txns}\n"), GENESIS);
        assert!(matches!("".parse::<GenesisTransactions>(), Err(Error::InvalidGenesis(_))));
        assert!(matches!("[1]\n".parse::<GenesisTransactions>(), Err(Error::InvalidGenesis(_))));
        Ok(())
    }

    #[test]
    fn folder_namespaces() -> Result<()> {
        let root = tempfile::tempdir()?;
        for dir in ["sovrin/staging", "sovrin/builder", "indicio", ".git/objects", "empty/sub"] {
            std::fs::create_dir_all(root.path().join(dir))?;
        }
        for dir in ["sovrin", "sovrin/staging", "sovrin/builder", "indicio", ".git/objects"] {
            std::fs::write(root.path().join(dir).join(GENESIS_FILENAME), GENESIS)?;
        }
        std::fs::write(root.path().join("README.md"), "networks")?;
        let source = FolderGenesisSource::new(root.path());
        let namespaces = source.namespaces()?;
        assert_eq!(
            namespaces.keys().collect::<Vec<_>>(),
            ["indicio", "sovrin", "sovrin:builder", "sovrin:staging"]
        );
        assert_eq!(
            namespaces["sovrin:staging"],
            root.path().join("sovrin").join("staging").join(GENESIS_FILENAME)
        );
        Ok(())
    }

    #[tokio::test]
    async fn folder_genesis() -> Result<()> {
        let root = tempfile::tempdir()?;
        std::fs::create_dir_all(root.path().join("sovrin/staging"))?;
        std::fs::write(root.path().join("sovrin/staging/genesis.txn"), GENESIS)?;
        let source = FolderGenesisSource::new(root.path()).filename("genesis.txn");
        assert_eq!(source.genesis("sovrin:staging").await?.map(|g| g.len()), Some(2));
        assert_eq!(source.genesis("sovrin").await?, None);
        assert_eq!(NoGenesisSource.genesis("sovrin").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn github_genesis() -> Result<()> {
        let source = GithubGenesisSource::new(GithubGenesisSourceConfig {
            networks_url: String::from("https://networks.example/main/"),
            http_client: Arc::new(MockHttpClient {
                responses: vec![
                    ("/main/networks/sovrin/staging/pool_transactions_genesis.json", 200, GENESIS),
                    ("/main/networks/broken/pool_transactions_genesis.json", 500, ""),
                ],
            }),
        });
        assert_eq!(source.genesis("sovrin:staging").await?.map(|g| g.len()), Some(2));
        assert_eq!(source.genesis("unknown").await?, None);
        assert!(matches!(
            source.genesis("broken").await,
            Err(Error::HttpStatus(StatusCode::INTERNAL_SERVER_ERROR))
        ));
        Ok(())
    }

    #[cfg(feature = "reqwest")]
    #[tokio::test]
    async fn github_genesis_over_http() -> Result<()> {
        use crate::http_client::ReqwestClient;

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/networks/indicio/test/pool_transactions_genesis.json")
            .with_status(200)
            .with_body(GENESIS)
            .create_async()
            .await;
        let source = GithubGenesisSource::new(GithubGenesisSourceConfig {
            networks_url: server.url(),
            http_client: Arc::new(ReqwestClient::default()),
        });
        assert_eq!(source.genesis("indicio:test").await?.map(|g| g.len()), Some(2));
        mock.assert_async().await;
        Ok(())
    }

    #[test]
    fn github_uri() -> Result<()> {
        let source = GithubGenesisSource::new(GithubGenesisSourceConfig {
            networks_url: String::from(DEFAULT_NETWORKS_URL),
            http_client: Arc::new(MockHttpClient { responses: Vec::new() }),
        });
        assert_eq!(
            source.uri("sovrin:staging")?.to_string(),
            "https://raw.githubusercontent.com/IDunion/indy-did-networks/main/networks/sovrin/staging/pool_transactions_genesis.json"
        );
        Ok(())
    }
}
