//! `did:indy` identifiers.
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

static DID_INDY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^did:indy:([a-z0-9_-]+(?::[a-z0-9_-]+)?):([1-9A-HJ-NP-Za-km-z]+)([/?#].*)?$",
    )
    .expect("invalid regex")
});

/// A parsed `did:indy` DID or DID URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DidUrl {
    namespace: String,
    id: String,
    remainder: Option<String>,
}

impl DidUrl {
    pub fn parse(input: &str) -> Result<Self> {
        let captures =
            DID_INDY_RE.captures(input).ok_or_else(|| Error::InvalidDid(input.to_string()))?;
        Ok(Self {
            namespace: captures[1].to_string(),
            id: captures[2].to_string(),
            remainder: captures.get(3).map(|m| m.as_str().to_string()),
        })
    }
    /// The ledger network, one or two colon-separated segments such as `sovrin:staging`.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
    /// The unqualified identifier on the ledger.
    pub fn id(&self) -> &str {
        &self.id
    }
    /// Any path, query or fragment following the identifier.
    pub fn remainder(&self) -> Option<&str> {
        self.remainder.as_deref()
    }
    /// The DID without path, query or fragment.
    pub fn did(&self) -> String {
        format!("did:indy:{}:{}", self.namespace, self.id)
    }
}

impl FromStr for DidUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DidUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "did:indy:{}:{}{}", self.namespace, self.id, self.remainder().unwrap_or_default())
    }
}
