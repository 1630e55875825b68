#![cfg_attr(docsrs, feature(doc_cfg))]
//! Resolver for `did:indy` DIDs over validator pools.
//!
//! A [`Resolver`] routes each DID to the [`Pool`](vdrkit::Pool) registered for its
//! namespace. With autopilot enabled, pools for unknown namespaces are provisioned on
//! demand from a [`GenesisSource`].
pub mod did;
pub mod document;
pub mod error;
pub mod genesis;
pub mod http_client;
mod resolver;

pub use crate::did::DidUrl;
pub use crate::error::{Error, Result};
pub use crate::genesis::{
    FolderGenesisSource, GenesisSource, GenesisTransactions, GithubGenesisSource,
    GithubGenesisSourceConfig, NoGenesisSource,
};
pub use crate::resolver::{Resolver, ResolverConfig};
